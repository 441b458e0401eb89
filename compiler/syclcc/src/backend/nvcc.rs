//! CUDA through nvcc.
//!
//! nvcc rejects most host-compiler flags, so every argument is classified
//! against nvcc's own `--help` output:
//!
//! | Argument | Result |
//! |----------|--------|
//! | rewritten source, positional | unchanged |
//! | `-I`, `-L`, `-l`, `-D` | unchanged |
//! | known to nvcc | unchanged |
//! | `-Wl,a,b` | `-Xlinker a -Xlinker b` |
//! | anything else | `-Xcompiler <flag>` |
//!
//! "Known to nvcc" means the flag (up to any `=`) occurs *somewhere* in the
//! help text. This is a plain substring test, so a flag that only shares a
//! substring with an unrelated nvcc option is treated as native.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::{compile_with_pipeline, Platform, Session};
use crate::error::{DriverError, ToolError};
use crate::pipeline::TransformedArgs;
use crate::process;

const COMPILER: &str = "nvcc";
/// Flags nvcc shares with every host compiler.
const GLOBAL_FLAG_PREFIXES: [&str; 4] = ["-I", "-L", "-l", "-D"];
const EXTENDED_LANGUAGE_FLAGS: [&str; 2] = ["--expt-extended-lambda", "--expt-relaxed-constexpr"];
const DEPRECATION_SUPPRESSION: &str = "-Wno-deprecated-gpu-targets";

/// nvcc's help text, queried at most once per process.
static NVCC_HELP: OnceLock<String> = OnceLock::new();

/// nvcc-based CUDA backend.
#[derive(Debug, Clone)]
pub struct NvccBackend {
    compiler: PathBuf,
}

impl Default for NvccBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NvccBackend {
    pub fn new() -> Self {
        Self {
            compiler: PathBuf::from(COMPILER),
        }
    }

    pub fn probe(&self) -> bool {
        process::can_launch(self.compiler.as_os_str(), "--version")
    }

    pub fn run(&self, session: &Session, args: &[String]) -> Result<i32, DriverError> {
        let help = cached_help(&self.compiler)?;
        let classifier = NvccFlagClassifier::new(help);
        let gpu_arch = session.config.gpu_arch.as_deref();
        compile_with_pipeline(session, Platform::Nvcc, &self.compiler, args, |transformed, shared| {
            Ok(command_line(&classifier, transformed, shared, gpu_arch))
        })
    }
}

/// Query `nvcc --help` once and keep the result for the rest of the process.
fn cached_help(compiler: &Path) -> Result<&'static str, ToolError> {
    if let Some(help) = NVCC_HELP.get() {
        return Ok(help.as_str());
    }
    let help = process::query(compiler, &["--help"])?;
    Ok(NVCC_HELP.get_or_init(|| help).as_str())
}

/// Full nvcc command line.
pub fn command_line(
    classifier: &NvccFlagClassifier<'_>,
    transformed: &TransformedArgs,
    shared: Vec<String>,
    gpu_arch: Option<&str>,
) -> Vec<String> {
    let mut cmd = Vec::with_capacity(shared.len() + transformed.args.len() * 2 + 4);
    if let Some(arch) = gpu_arch {
        cmd.push(format!("--gpu-architecture={arch}"));
    }
    for arg in &shared {
        classifier.translate_into(arg, &mut cmd);
    }
    for arg in &transformed.args {
        if transformed.is_rewritten_source(arg) {
            cmd.push(arg.clone());
        } else {
            classifier.translate_into(arg, &mut cmd);
        }
    }
    cmd.extend(EXTENDED_LANGUAGE_FLAGS.iter().map(ToString::to_string));
    cmd.push(DEPRECATION_SUPPRESSION.to_string());
    cmd
}

/// Classifies host-compiler flags against nvcc's help text.
#[derive(Debug, Clone, Copy)]
pub struct NvccFlagClassifier<'h> {
    help: &'h str,
}

impl<'h> NvccFlagClassifier<'h> {
    pub fn new(help: &'h str) -> Self {
        Self { help }
    }

    /// Whether nvcc understands this flag itself.
    pub fn is_native(&self, flag: &str) -> bool {
        let key = flag.split('=').next().unwrap_or(flag);
        !key.is_empty() && self.help.contains(key)
    }

    /// Translate one argument, appending the result to `out`.
    pub fn translate_into(&self, arg: &str, out: &mut Vec<String>) {
        if !arg.starts_with('-')
            || GLOBAL_FLAG_PREFIXES.iter().any(|p| arg.starts_with(p))
            || self.is_native(arg)
        {
            out.push(arg.to_string());
        } else if let Some(linker_args) = arg.strip_prefix("-Wl,") {
            for part in linker_args.split(',').filter(|p| !p.is_empty()) {
                out.push("-Xlinker".to_string());
                out.push(part.to_string());
            }
        } else {
            out.push("-Xcompiler".to_string());
            out.push(arg.to_string());
        }
    }

    /// Translate a single argument into a fresh list.
    pub fn translate(&self, arg: &str) -> Vec<String> {
        let mut out = Vec::with_capacity(2);
        self.translate_into(arg, &mut out);
        out
    }
}
