//! Backend Registry
//!
//! The four backend toolchains and the argument rules they share.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       Backend                           │
//! │  - probe(): can the toolchain be launched?              │
//! │  - run(): pipeline + flag translation + compiler exec   │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//!     ┌──────────────┬─────┴────────┬──────────────┐
//!     ▼              ▼              ▼              ▼
//! ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐
//! │CudaClang │  │  Nvcc    │  │  Rocm    │  │  Host    │
//! │ (clang)  │  │ (nvcc)   │  │  (hcc)   │  │ (c++)    │
//! └──────────┘  └──────────┘  └──────────┘  └──────────┘
//! ```
//!
//! Backends are a closed set, so dispatch is an enum rather than a trait
//! object. Which backend runs is decided by the dispatcher alone; see
//! [`crate::dispatch`].
//!
//! Every backend invocation has the same shape:
//!
//! ```text
//! <backend prefix> -I<dir of each rewritten source> <common args> <translated args> <backend suffix>
//! ```

mod cuda_clang;
mod host;
mod nvcc;
mod rocm;

pub use cuda_clang::CudaClangBackend;
pub use host::{HostBackend, UNAVAILABLE_HINT as HOST_UNAVAILABLE_HINT};
pub use nvcc::{NvccBackend, NvccFlagClassifier};
pub use rocm::{RocmBackend, RocmToolFlags};

use std::fmt;
use std::path::Path;

use crate::config::Config;
use crate::error::DriverError;
use crate::install::Installation;
use crate::pipeline::{SourcePipeline, TransformedArgs};
use crate::process;

// --- Platform ---

/// User-facing name for a backend choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// CUDA through clang's CUDA support.
    Cuda,
    /// CUDA through NVIDIA's nvcc.
    Nvcc,
    /// ROCm through hcc.
    Rocm,
    /// Host-fallback on the CPU.
    Cpu,
}

impl Platform {
    /// All platforms, in probe order.
    pub const ALL: [Self; 4] = [Self::Cuda, Self::Nvcc, Self::Rocm, Self::Cpu];

    /// Human-readable list of accepted names, for error messages.
    pub const VALID_NAMES: &'static str =
        "cuda, nvidia, nvcc, rocm, amd, hcc, hip, cpu, host, hipcpu";

    /// Parse a canonical platform name or alias.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "cuda" | "nvidia" => Some(Self::Cuda),
            "nvcc" => Some(Self::Nvcc),
            "rocm" | "amd" | "hcc" | "hip" => Some(Self::Rocm),
            "cpu" | "host" | "hipcpu" => Some(Self::Cpu),
            _ => None,
        }
    }

    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cuda => "cuda",
            Self::Nvcc => "nvcc",
            Self::Rocm => "rocm",
            Self::Cpu => "cpu",
        }
    }

    /// hipSYCL runtime library linked for this platform.
    pub fn runtime_library(self) -> &'static str {
        match self {
            Self::Cuda | Self::Nvcc => "hipSYCL_cuda",
            Self::Rocm => "hipSYCL_rocm",
            Self::Cpu => "hipSYCL_cpu",
        }
    }

    /// Whether the source transformation must prune unused templates.
    ///
    /// clang and the host compilers cope with device annotations on
    /// uninstantiated templates; nvcc and hcc do not.
    pub fn requires_template_pruning(self) -> bool {
        matches!(self, Self::Nvcc | Self::Rocm)
    }

    /// Extension for rewritten sources, if the backend needs a specific one.
    ///
    /// Both CUDA compilers decide the input language from the extension.
    pub fn rewritten_source_extension(self) -> Option<&'static str> {
        match self {
            Self::Cuda | Self::Nvcc => Some("cu"),
            Self::Rocm | Self::Cpu => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// --- Session ---

/// Everything a backend needs from the outside world for one invocation.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: Config,
    pub install: Installation,
}

impl Session {
    pub fn new(config: Config, install: Installation) -> Self {
        Self { config, install }
    }
}

// --- Shared argument rules ---

/// Flags that stop compilation before the link step.
const SINGLE_TRANSLATION_UNIT_FLAGS: [&str; 4] = ["-E", "-S", "-c", "-fsyntax-only"];

/// Language standard passed to every backend.
pub const LANGUAGE_STANDARD_FLAG: &str = "-std=c++14";

/// Whether an invocation with these arguments reaches the link stage.
pub fn reaches_link_stage(args: &[String]) -> bool {
    !args
        .iter()
        .any(|a| SINGLE_TRANSLATION_UNIT_FLAGS.contains(&a.as_str()))
}

/// Platform-specific include and library flags.
///
/// The runtime library (and its search path) is only added when linking and
/// never in bootstrap mode, where the runtime is what is being built.
pub fn common_args(session: &Session, platform: Platform, link_stage: bool) -> Vec<String> {
    let install = &session.install;
    let mut args = vec![include_flag(&install.include_dir())];
    if link_stage && !session.config.bootstrap {
        args.push(format!("-L{}", install.lib_dir().display()));
        args.push(format!("-l{}", platform.runtime_library()));
    }
    if let Some(dir) = install.fallback_include_dir(platform) {
        args.push(include_flag(&dir));
    }
    args
}

/// `-I<dir>`
pub fn include_flag(dir: &Path) -> String {
    format!("-I{}", dir.display())
}

/// The part of a backend command line that every backend shares: include
/// flags for the rewritten sources, then the common arguments.
fn shared_invocation_args(
    session: &Session,
    platform: Platform,
    transformed: &TransformedArgs,
    link_stage: bool,
) -> Vec<String> {
    let mut args: Vec<String> = transformed
        .include_dirs()
        .iter()
        .map(|dir| include_flag(dir))
        .collect();
    args.extend(common_args(session, platform, link_stage));
    args
}

/// Run the source pipeline, build the compiler command line, and invoke it.
///
/// `build` receives the pipeline output and the shared invocation prefix and
/// returns the complete argument list. The pipeline (and with it the temp
/// workspace) is dropped only after the compiler has exited.
fn compile_with_pipeline<F>(
    session: &Session,
    platform: Platform,
    compiler: &Path,
    args: &[String],
    build: F,
) -> Result<i32, DriverError>
where
    F: FnOnce(&TransformedArgs, Vec<String>) -> Result<Vec<String>, DriverError>,
{
    let mut pipeline = SourcePipeline::new(session, platform);
    let transformed = pipeline.transform(args)?;
    let shared = shared_invocation_args(session, platform, &transformed, reaches_link_stage(args));
    let command_line = build(&transformed, shared)?;
    let code = process::run(compiler, &command_line)?;
    drop(pipeline);
    Ok(code)
}

// --- Backend Enum ---

/// Enum-based backend dispatch.
#[derive(Debug)]
pub enum Backend {
    CudaClang(CudaClangBackend),
    Nvcc(NvccBackend),
    Rocm(RocmBackend),
    Host(HostBackend),
}

/// Generates forwarding methods for `Backend` that dispatch to all variants.
macro_rules! impl_backend_forward {
    ($method:ident($($arg:ident: $ty:ty),* $(,)?) -> $ret:ty) => {
        pub fn $method(&self, $($arg: $ty),*) -> $ret {
            match self {
                Self::CudaClang(b) => b.$method($($arg),*),
                Self::Nvcc(b) => b.$method($($arg),*),
                Self::Rocm(b) => b.$method($($arg),*),
                Self::Host(b) => b.$method($($arg),*),
            }
        }
    };
}

impl Backend {
    /// Construct the backend for a platform. Nothing is launched yet.
    pub fn new(platform: Platform, config: &Config) -> Self {
        match platform {
            Platform::Cuda => Self::CudaClang(CudaClangBackend::new(config)),
            Platform::Nvcc => Self::Nvcc(NvccBackend::new()),
            Platform::Rocm => Self::Rocm(RocmBackend::new()),
            Platform::Cpu => Self::Host(HostBackend::new(config)),
        }
    }

    /// One backend per platform, in [`Platform::ALL`] order.
    pub fn all(config: &Config) -> Vec<Self> {
        Platform::ALL
            .into_iter()
            .map(|p| Self::new(p, config))
            .collect()
    }

    /// The platform this backend implements.
    pub fn platform(&self) -> Platform {
        match self {
            Self::CudaClang(_) => Platform::Cuda,
            Self::Nvcc(_) => Platform::Nvcc,
            Self::Rocm(_) => Platform::Rocm,
            Self::Host(_) => Platform::Cpu,
        }
    }

    impl_backend_forward!(probe() -> bool);
    impl_backend_forward!(run(session: &Session, args: &[String]) -> Result<i32, DriverError>);
}

// --- Backend Detection ---

/// Probe results for all backends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendDetection {
    /// Available platforms, in probe order.
    pub available: Vec<Platform>,
    /// Platforms that were probed but are not usable.
    pub not_found: Vec<Platform>,
}

impl BackendDetection {
    /// Probe each of `backends` in order.
    pub fn detect(backends: &[Backend]) -> Self {
        let mut detection = Self::default();
        for backend in backends {
            let platform = backend.platform();
            if backend.probe() {
                detection.available.push(platform);
            } else {
                detection.not_found.push(platform);
            }
        }
        tracing::debug!(available = ?detection.available, not_found = ?detection.not_found, "backend detection");
        detection
    }

    /// Build a detection result directly (tests, synthetic probes).
    pub fn from_available(available: &[Platform]) -> Self {
        Self {
            available: available.to_vec(),
            not_found: Platform::ALL
                .into_iter()
                .filter(|p| !available.contains(p))
                .collect(),
        }
    }

    pub fn is_available(&self, platform: Platform) -> bool {
        self.available.contains(&platform)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap_err to inspect failures")]
mod tests;
