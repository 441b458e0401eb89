//! Host-fallback on the CPU.
//!
//! Any reasonably recent C++ compiler works. `CXX` picks one explicitly;
//! otherwise the first launchable name from [`KNOWN_COMPILERS`] is used.

use std::cell::OnceCell;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use super::{compile_with_pipeline, Platform, Session, LANGUAGE_STANDARD_FLAG};
use crate::config::{Config, HOST_COMPILER_VAR};
use crate::error::DriverError;
use crate::pipeline::TransformedArgs;
use crate::process;

/// Candidate compilers, newest first.
pub const KNOWN_COMPILERS: [&str; 15] = [
    "clang++-11",
    "clang++-10",
    "clang++-9",
    "clang++-8",
    "clang++-7",
    "clang++-6.0",
    "clang++",
    "g++-10",
    "g++-9",
    "g++-8",
    "g++-7",
    "g++-6",
    "g++",
    "c++",
    "icpc",
];

/// Remediation hint when the backend was requested but not found.
pub const UNAVAILABLE_HINT: &str = "no host C++ compiler found; set CXX to the compiler to use";

const WARNING_SUPPRESSIONS: [&str; 2] = ["-Wno-ignored-attributes", "-Wno-unused-command-line-argument"];
/// Parallel execution of kernels in the CPU fallback.
const PARALLEL_FLAG: &str = "-fopenmp";

/// Host compiler backend.
#[derive(Debug, Clone)]
pub struct HostBackend {
    override_compiler: Option<PathBuf>,
    resolved: OnceCell<Option<PathBuf>>,
}

impl HostBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            override_compiler: config.host_compiler.clone(),
            resolved: OnceCell::new(),
        }
    }

    /// The concrete compiler, resolved on first use.
    pub fn compiler(&self) -> Option<&Path> {
        self.resolved
            .get_or_init(|| self.resolve_compiler())
            .as_deref()
    }

    fn resolve_compiler(&self) -> Option<PathBuf> {
        if let Some(cxx) = &self.override_compiler {
            tracing::debug!(compiler = %cxx.display(), "host compiler from {HOST_COMPILER_VAR}");
            return process::can_launch(cxx.as_os_str(), "--version").then(|| cxx.clone());
        }
        let found = first_launchable(&KNOWN_COMPILERS, |name| {
            process::can_launch(OsStr::new(name), "--version")
        });
        tracing::debug!(compiler = ?found, "host compiler search");
        found
    }

    pub fn probe(&self) -> bool {
        self.compiler().is_some()
    }

    pub fn run(&self, session: &Session, args: &[String]) -> Result<i32, DriverError> {
        let Some(compiler) = self.compiler() else {
            return Err(DriverError::BackendUnavailable {
                platform: Platform::Cpu,
                hint: Some(UNAVAILABLE_HINT),
            });
        };
        compile_with_pipeline(session, Platform::Cpu, compiler, args, |transformed, shared| {
            Ok(command_line(transformed, shared))
        })
    }
}

/// First candidate accepted by `launchable`.
pub fn first_launchable<F>(candidates: &[&str], mut launchable: F) -> Option<PathBuf>
where
    F: FnMut(&str) -> bool,
{
    candidates
        .iter()
        .find(|name| launchable(name))
        .map(|name| PathBuf::from(*name))
}

/// Full host compiler command line.
pub fn command_line(transformed: &TransformedArgs, shared: Vec<String>) -> Vec<String> {
    let mut cmd = shared;
    cmd.extend(transformed.args.iter().cloned());
    cmd.push(LANGUAGE_STANDARD_FLAG.to_string());
    cmd.extend(WARNING_SUPPRESSIONS.iter().map(ToString::to_string));
    cmd.push(PARALLEL_FLAG.to_string());
    cmd
}
