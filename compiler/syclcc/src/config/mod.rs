//! Config Resolver
//!
//! Turns the environment snapshot and the raw argument list into one
//! immutable [`Config`]. Environment variables are applied first, then CLI
//! flags override them. Driver-only flags are consumed; every other argument
//! is forwarded to the backend in its original order.
//!
//! # Recognized flags
//!
//! | Flag | Effect |
//! |------|--------|
//! | `--force-alternative-compiler=<path>` | bypass backends, run `<path>` |
//! | `--cuda-clang-compiler=<path>` | clang for the `cuda` platform |
//! | `--hipsycl-platform=<name>` | select platform (aliases accepted) |
//! | `--hipsycl-gpu-arch=<arch>` | GPU architecture override |
//! | `--restrict-device-header-path=<path>`, `-RDI=<path>` | repeatable |
//! | `--keep-temporary-files` | keep the rewrite workspace |
//! | `--hipsycl-bootstrap` | skip include rewriting |
//! | `--help` | print options and exit |

mod environment;

pub use environment::{
    Environment, CUDA_CLANG_VAR, GPU_ARCH_VAR, HOST_COMPILER_VAR, INSTALL_PREFIX_VAR,
    PLATFORM_VAR,
};

use std::ffi::OsStr;
use std::fmt;
use std::path::PathBuf;

use crate::backend::Platform;
use crate::error::ConfigError;

/// What the driver should do for this invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No arguments at all: print banner and usage.
    Usage,
    /// `--help` was given: print the option list.
    Help,
    /// Normal compilation.
    Compile(Box<Config>),
}

/// Non-fatal observations made while resolving the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// `HIPSYCL_PLATFORM` and `--hipsycl-platform` disagree. The CLI wins.
    PlatformConflict { env: Platform, cli: Platform },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlatformConflict { env, cli } => write!(
                f,
                "{PLATFORM_VAR}={env} conflicts with --hipsycl-platform={cli}; using '{cli}'"
            ),
        }
    }
}

/// Immutable configuration snapshot for one invocation.
///
/// Created once by [`Config::resolve`] and only ever handed out by shared
/// reference afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Explicitly selected platform (env or CLI).
    pub platform: Option<Platform>,
    /// Clang used by the `cuda` platform.
    pub cuda_clang_compiler: Option<PathBuf>,
    /// GPU architecture override.
    pub gpu_arch: Option<String>,
    /// Host compiler override (`CXX`).
    pub host_compiler: Option<PathBuf>,
    /// Building the runtime itself: no include rewriting, no runtime linking.
    pub bootstrap: bool,
    /// Leave the rewrite workspace on disk.
    pub keep_temporaries: bool,
    /// Ordered, duplicate-free list of restricted device-header prefixes.
    pub restricted_device_header_paths: Vec<String>,
    /// Compiler that replaces the whole backend machinery.
    pub alternative_compiler: Option<PathBuf>,
    /// Installation prefix override.
    pub install_prefix: Option<PathBuf>,
    /// Everything that was not a driver flag, in original order.
    pub forwarded_args: Vec<String>,
    /// Warnings to surface to the user.
    pub warnings: Vec<ConfigWarning>,
}

/// Driver flags that carry a value after `=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompoundFlag {
    AlternativeCompiler,
    CudaClangCompiler,
    Platform,
    GpuArch,
    RestrictDeviceHeaderPath,
    RestrictDeviceHeaderPathShort,
}

impl CompoundFlag {
    const ALL: [Self; 6] = [
        Self::AlternativeCompiler,
        Self::CudaClangCompiler,
        Self::Platform,
        Self::GpuArch,
        Self::RestrictDeviceHeaderPath,
        Self::RestrictDeviceHeaderPathShort,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::AlternativeCompiler => "--force-alternative-compiler",
            Self::CudaClangCompiler => "--cuda-clang-compiler",
            Self::Platform => "--hipsycl-platform",
            Self::GpuArch => "--hipsycl-gpu-arch",
            Self::RestrictDeviceHeaderPath => "--restrict-device-header-path",
            Self::RestrictDeviceHeaderPathShort => "-RDI",
        }
    }

    fn expected(self) -> &'static str {
        match self {
            Self::AlternativeCompiler => "--force-alternative-compiler=<path>",
            Self::CudaClangCompiler => "--cuda-clang-compiler=<path>",
            Self::Platform => "--hipsycl-platform=<platform>",
            Self::GpuArch => "--hipsycl-gpu-arch=<arch>",
            Self::RestrictDeviceHeaderPath => "--restrict-device-header-path=<path>",
            Self::RestrictDeviceHeaderPathShort => "-RDI=<path>",
        }
    }

    /// Find the driver flag an argument starts with, if any.
    fn matching(arg: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| arg.starts_with(f.name()))
    }

    /// Split `--name=value`, requiring exactly two parts.
    fn value(self, arg: &str) -> Result<&str, ConfigError> {
        let mut parts = arg.split('=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(value), None) => Ok(value),
            _ => Err(ConfigError::MalformedFlag {
                flag: arg.to_string(),
                expected: self.expected(),
            }),
        }
    }
}

const KEEP_TEMPORARIES_FLAG: &str = "--keep-temporary-files";
const BOOTSTRAP_FLAG: &str = "--hipsycl-bootstrap";
const HELP_FLAG: &str = "--help";

impl Config {
    /// Resolve the configuration for one invocation.
    ///
    /// `args` excludes the program name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a malformed compound flag or an unknown
    /// platform name, in the environment or on the command line.
    pub fn resolve(env: &Environment, args: &[String]) -> Result<Resolution, ConfigError> {
        if args.is_empty() {
            return Ok(Resolution::Usage);
        }
        if args.iter().any(|a| a == HELP_FLAG) {
            return Ok(Resolution::Help);
        }

        let env_platform = env
            .get(PLATFORM_VAR)
            .map(|name| parse_platform(name, PLATFORM_VAR))
            .transpose()?;

        let mut config = Config {
            platform: env_platform,
            cuda_clang_compiler: env.get(CUDA_CLANG_VAR).map(PathBuf::from),
            gpu_arch: env.get(GPU_ARCH_VAR).map(str::to_string),
            host_compiler: env.get(HOST_COMPILER_VAR).map(PathBuf::from),
            install_prefix: env.get(INSTALL_PREFIX_VAR).map(PathBuf::from),
            ..Config::default()
        };

        let mut cli_platform = None;
        for arg in args {
            if arg == KEEP_TEMPORARIES_FLAG {
                config.keep_temporaries = true;
                continue;
            }
            if arg == BOOTSTRAP_FLAG {
                config.bootstrap = true;
                continue;
            }
            let Some(flag) = CompoundFlag::matching(arg) else {
                config.forwarded_args.push(arg.clone());
                continue;
            };

            let value = flag.value(arg)?;
            match flag {
                CompoundFlag::AlternativeCompiler => {
                    config.alternative_compiler = Some(PathBuf::from(value));
                }
                CompoundFlag::CudaClangCompiler => {
                    config.cuda_clang_compiler = Some(PathBuf::from(value));
                }
                CompoundFlag::Platform => {
                    cli_platform = Some(parse_platform(value, "--hipsycl-platform")?);
                }
                CompoundFlag::GpuArch => config.gpu_arch = Some(value.to_string()),
                CompoundFlag::RestrictDeviceHeaderPath
                | CompoundFlag::RestrictDeviceHeaderPathShort => {
                    if !config
                        .restricted_device_header_paths
                        .iter()
                        .any(|p| p == value)
                    {
                        config.restricted_device_header_paths.push(value.to_string());
                    }
                }
            }
        }

        if let Some(cli) = cli_platform {
            if let Some(from_env) = env_platform.filter(|p| *p != cli) {
                // TODO: decide whether an env/CLI platform mismatch should be fatal.
                config.warnings.push(ConfigWarning::PlatformConflict {
                    env: from_env,
                    cli,
                });
            }
            config.platform = Some(cli);
        }

        tracing::debug!(
            platform = ?config.platform,
            bootstrap = config.bootstrap,
            keep_temporaries = config.keep_temporaries,
            forwarded = config.forwarded_args.len(),
            "resolved configuration"
        );
        Ok(Resolution::Compile(Box::new(config)))
    }
}

/// Convert raw command-line arguments to UTF-8 strings.
///
/// # Errors
///
/// [`ConfigError::NonUtf8Argument`] for the first argument that is not
/// valid UTF-8, shown lossily.
pub fn utf8_args<A: AsRef<OsStr>>(args: &[A]) -> Result<Vec<String>, ConfigError> {
    args.iter()
        .map(|arg| {
            let arg = arg.as_ref();
            arg.to_str()
                .map(str::to_string)
                .ok_or_else(|| ConfigError::NonUtf8Argument {
                    arg: arg.to_string_lossy().into_owned(),
                })
        })
        .collect()
}

fn parse_platform(name: &str, origin: &'static str) -> Result<Platform, ConfigError> {
    Platform::parse(name).ok_or_else(|| ConfigError::UnknownPlatform {
        name: name.to_string(),
        origin,
        valid: Platform::VALID_NAMES,
    })
}

/// One-line banner printed before usage and help.
pub fn banner() -> String {
    format!(
        "syclcc {} [hipSYCL compilation driver]",
        env!("CARGO_PKG_VERSION")
    )
}

/// Short usage text for an invocation without arguments.
pub fn usage() -> String {
    format!(
        "{}\n\nUsage: syclcc <options> <source files...>\n\nRun `syclcc --help` for the list of options.",
        banner()
    )
}

/// Full option list for `--help`.
pub fn help() -> String {
    format!(
        "{}

Usage: syclcc <options> <source files...>

Driver options (consumed, not passed to the backend):
  --hipsycl-platform=<platform>
      Backend to use. One of: cuda (alias: nvidia), nvcc,
      rocm (aliases: amd, hcc, hip), cpu (aliases: host, hipcpu).
      Environment: {PLATFORM_VAR}
  --cuda-clang-compiler=<path>
      clang used for the cuda platform. Environment: {CUDA_CLANG_VAR}
  --hipsycl-gpu-arch=<arch>
      GPU architecture, e.g. sm_60 or gfx900. Environment: {GPU_ARCH_VAR}
  --force-alternative-compiler=<path>
      Skip all backend handling and invoke <path> with the remaining arguments.
  --restrict-device-header-path=<path>, -RDI=<path>
      Only treat headers below <path> as device code candidates. Repeatable.
  --keep-temporary-files
      Keep the rewritten sources in the temporary workspace.
  --hipsycl-bootstrap
      Build mode for the hipSYCL runtime itself: no include rewriting,
      no runtime library linking.
  --help
      Print this message.

Other environment variables:
  {HOST_COMPILER_VAR}                   Host compiler for the cpu platform.
  {INSTALL_PREFIX_VAR}  hipSYCL installation prefix.
  RUST_LOG              Enable driver debug logging (e.g. RUST_LOG=syclcc=debug).

All other arguments are passed to the selected backend compiler.",
        banner()
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap to panic on unexpected state")]
mod tests;
