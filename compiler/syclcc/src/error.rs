//! Error taxonomy for the driver.
//!
//! Every failure the driver can report is one of the enums below. They are
//! all fatal: the dispatcher prints them once with the `fatal error:` prefix
//! and exits with [`FATAL_EXIT_CODE`]. A backend compiler that merely fails
//! is *not* an error here; its exit code is returned verbatim.

use std::path::PathBuf;

use crate::backend::Platform;

/// Exit code used for every fatal driver error.
pub const FATAL_EXIT_CODE: i32 = 255;

/// Malformed command line or environment.
///
/// Raised during config resolution, before any subprocess is started.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A `--name=value` flag that did not split into exactly two parts.
    #[error("invalid argument '{flag}': expected exactly one '=' in the form {expected}")]
    MalformedFlag {
        flag: String,
        expected: &'static str,
    },

    /// A command-line argument that is not valid UTF-8.
    #[error("argument '{arg}' is not valid UTF-8")]
    NonUtf8Argument { arg: String },

    /// A platform name that is neither canonical nor a known alias.
    #[error("unrecognized platform '{name}' (from {origin}); valid platforms are: {valid}")]
    UnknownPlatform {
        name: String,
        origin: &'static str,
        valid: &'static str,
    },
}

/// Failure to launch or query an external tool.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The program could not be started at all.
    #[error("could not execute '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A query (e.g. `hcc-config --cxxflags`) ran but did not succeed.
    #[error("'{command}' failed (exit code {exit_code:?})")]
    QueryFailed {
        command: String,
        exit_code: Option<i32>,
    },
}

/// Failure inside the two-stage source rewrite.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The temp workspace could not be created or written.
    #[error("temporary workspace error at '{}': {source}", .path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the original source (bootstrap copy) failed.
    #[error("cannot read source file '{}': {source}", .path.display())]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A rewrite tool could not be started.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// A rewrite stage exited with a non-zero status.
    #[error("{stage} failed for '{}' (exit code {exit_code:?})", .source_file.display())]
    StageFailed {
        stage: Stage,
        source_file: PathBuf,
        exit_code: Option<i32>,
    },

    /// A rewrite stage succeeded but did not produce its output file.
    #[error("{stage} did not produce expected output '{}'", .output.display())]
    MissingOutput { stage: Stage, output: PathBuf },
}

/// The two rewrite stages, for error messages and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Include expansion.
    RewriteIncludes,
    /// Device-code annotation injection.
    TransformSource,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RewriteIncludes => f.write_str("include rewriting"),
            Self::TransformSource => f.write_str("source transformation"),
        }
    }
}

/// Umbrella error returned by the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    /// An explicitly selected platform did not probe as available.
    #[error("selected platform '{platform}' is not available{}", .hint.map(|h| format!("; {h}")).unwrap_or_default())]
    BackendUnavailable {
        platform: Platform,
        hint: Option<&'static str>,
    },

    /// No platform was selected and no backend probed as available.
    #[error("no available backend; install a supported toolchain or set HIPSYCL_PLATFORM")]
    NoBackend,

    /// No platform was selected and several backends are available.
    #[error(
        "multiple backends are available ({}); specify one with --hipsycl-platform=<platform> or HIPSYCL_PLATFORM",
        .available.iter().map(Platform::name).collect::<Vec<_>>().join(", ")
    )]
    AmbiguousBackend { available: Vec<Platform> },

    /// A panic caught at the top level.
    #[error("internal error: {0}")]
    Internal(String),
}
