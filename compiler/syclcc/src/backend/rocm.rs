//! ROCm through hcc.
//!
//! The backend needs three tools: `hcc` itself, `hcc-config` for compiler
//! and linker flags, and `hipconfig` to find the HIP installation whose
//! runtime library gets linked.

use std::path::{Path, PathBuf};

use super::{compile_with_pipeline, reaches_link_stage, Platform, Session, LANGUAGE_STANDARD_FLAG};
use crate::error::DriverError;
use crate::pipeline::TransformedArgs;
use crate::process;

const COMPILER: &str = "hcc";
const CONFIG_TOOL: &str = "hcc-config";
const PATH_TOOL: &str = "hipconfig";
const HIP_RUNTIME_LIBRARY: &str = "hip_hcc";
const WARNING_SUPPRESSIONS: [&str; 2] = ["-Wno-ignored-attributes", "-Wno-unused-command-line-argument"];

/// hcc-based ROCm backend.
#[derive(Debug, Clone)]
pub struct RocmBackend {
    compiler: PathBuf,
    config_tool: PathBuf,
    path_tool: PathBuf,
}

impl Default for RocmBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Flags obtained from the ROCm helper tools.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RocmToolFlags {
    /// `hcc-config --cxxflags`
    pub cxx_flags: Vec<String>,
    /// `hcc-config --ldflags`
    pub ld_flags: Vec<String>,
    /// `-L<hip>/lib -lhip_hcc`
    pub link_args: Vec<String>,
}

impl RocmToolFlags {
    /// Build the flag set from raw tool output.
    pub fn from_tool_output(cxx_flags: &str, ld_flags: &str, hip_path: &str) -> Self {
        let hip_lib = Path::new(hip_path.trim()).join("lib");
        Self {
            cxx_flags: split_flags(cxx_flags),
            ld_flags: split_flags(ld_flags),
            link_args: vec![
                format!("-L{}", hip_lib.display()),
                format!("-l{HIP_RUNTIME_LIBRARY}"),
            ],
        }
    }
}

fn split_flags(output: &str) -> Vec<String> {
    output.split_whitespace().map(str::to_string).collect()
}

impl RocmBackend {
    pub fn new() -> Self {
        Self {
            compiler: PathBuf::from(COMPILER),
            config_tool: PathBuf::from(CONFIG_TOOL),
            path_tool: PathBuf::from(PATH_TOOL),
        }
    }

    /// All three tools must be launchable.
    pub fn probe(&self) -> bool {
        [&self.compiler, &self.config_tool, &self.path_tool]
            .into_iter()
            .all(|tool| process::can_launch(tool.as_os_str(), "--version"))
    }

    /// Query the helper tools. Each query runs exactly once per invocation.
    pub fn query_tool_flags(&self) -> Result<RocmToolFlags, DriverError> {
        let cxx_flags = process::query(&self.config_tool, &["--cxxflags"])?;
        let ld_flags = process::query(&self.config_tool, &["--ldflags"])?;
        let hip_path = process::query(&self.path_tool, &["--path"])?;
        Ok(RocmToolFlags::from_tool_output(&cxx_flags, &ld_flags, &hip_path))
    }

    pub fn run(&self, session: &Session, args: &[String]) -> Result<i32, DriverError> {
        let flags = self.query_tool_flags()?;
        let gpu_arch = session.config.gpu_arch.as_deref();
        compile_with_pipeline(session, Platform::Rocm, &self.compiler, args, |transformed, shared| {
            Ok(command_line(&flags, transformed, shared, gpu_arch, reaches_link_stage(args)))
        })
    }
}

/// Full hcc command line.
pub fn command_line(
    flags: &RocmToolFlags,
    transformed: &TransformedArgs,
    shared: Vec<String>,
    gpu_arch: Option<&str>,
    link_stage: bool,
) -> Vec<String> {
    let mut cmd = flags.cxx_flags.clone();
    if link_stage {
        cmd.extend(flags.ld_flags.iter().cloned());
        cmd.extend(flags.link_args.iter().cloned());
    }
    if let Some(arch) = gpu_arch {
        cmd.push(format!("-amdgpu-target={arch}"));
    }
    cmd.extend(shared);
    cmd.extend(transformed.args.iter().cloned());
    cmd.push(LANGUAGE_STANDARD_FLAG.to_string());
    cmd.extend(WARNING_SUPPRESSIONS.iter().map(ToString::to_string));
    cmd
}
