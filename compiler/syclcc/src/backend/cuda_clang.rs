//! CUDA through clang.
//!
//! clang compiles the rewritten `.cu` sources directly. The GPU architecture
//! comes from the override, from the user's own `--cuda-gpu-arch` flag, or
//! falls back to [`DEFAULT_GPU_ARCH`].

use std::path::{Path, PathBuf};

use super::{compile_with_pipeline, reaches_link_stage, Platform, Session, LANGUAGE_STANDARD_FLAG};
use crate::config::Config;
use crate::error::DriverError;
use crate::pipeline::TransformedArgs;
use crate::process;

/// Architecture used when neither the user nor the config picks one.
pub const DEFAULT_GPU_ARCH: &str = "sm_52";

const DEFAULT_COMPILER: &str = "clang++";
const ARCH_FLAG: &str = "--cuda-gpu-arch";
const WARNING_SUPPRESSIONS: [&str; 2] = ["-Wno-unused-command-line-argument", "-Wno-ignored-attributes"];
const LINK_LIBRARIES: [&str; 3] = ["-lcudart", "-lrt", "-ldl"];

/// clang-based CUDA backend.
#[derive(Debug, Clone)]
pub struct CudaClangBackend {
    compiler: PathBuf,
    gpu_arch: Option<String>,
}

impl CudaClangBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            compiler: config
                .cuda_clang_compiler
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_COMPILER)),
            gpu_arch: config.gpu_arch.clone(),
        }
    }

    /// The clang this backend invokes.
    pub fn compiler(&self) -> &Path {
        &self.compiler
    }

    pub fn probe(&self) -> bool {
        process::can_launch(self.compiler.as_os_str(), "--version")
    }

    pub fn run(&self, session: &Session, args: &[String]) -> Result<i32, DriverError> {
        compile_with_pipeline(session, Platform::Cuda, &self.compiler, args, |transformed, shared| {
            Ok(self.command_line(transformed, shared, reaches_link_stage(args)))
        })
    }

    /// Architecture flag to prepend, if any.
    fn arch_flag(&self, args: &[String]) -> Option<String> {
        match &self.gpu_arch {
            Some(arch) => Some(format!("{ARCH_FLAG}={arch}")),
            None if args.iter().any(|a| a.starts_with(ARCH_FLAG)) => None,
            None => Some(format!("{ARCH_FLAG}={DEFAULT_GPU_ARCH}")),
        }
    }

    /// Full clang command line.
    pub fn command_line(
        &self,
        transformed: &TransformedArgs,
        shared: Vec<String>,
        link_stage: bool,
    ) -> Vec<String> {
        let mut cmd = Vec::with_capacity(shared.len() + transformed.args.len() + 8);
        cmd.extend(self.arch_flag(&transformed.args));
        cmd.extend(shared);
        cmd.extend(transformed.args.iter().cloned());
        cmd.push(LANGUAGE_STANDARD_FLAG.to_string());
        cmd.push("-pthread".to_string());
        cmd.extend(WARNING_SUPPRESSIONS.iter().map(ToString::to_string));
        if link_stage {
            cmd.extend(LINK_LIBRARIES.iter().map(ToString::to_string));
        }
        cmd
    }
}
