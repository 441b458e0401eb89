//! Dispatcher
//!
//! Runs backend selection, invokes the chosen backend, and turns the result
//! into a process exit code. This is the only place that reports fatal
//! errors; everything below it returns [`DriverError`].

use std::ffi::OsStr;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};

use crate::backend::{Backend, BackendDetection, Platform, Session};
use crate::config::{self, Config, Environment, Resolution};
use crate::error::{DriverError, FATAL_EXIT_CODE};
use crate::install::Installation;
use crate::process;

/// Pick the platform for this invocation.
///
/// An explicit platform must be available. Without one, exactly one backend
/// must be available; a silent choice among several is refused.
///
/// # Errors
///
/// [`DriverError::BackendUnavailable`], [`DriverError::NoBackend`], or
/// [`DriverError::AmbiguousBackend`].
pub fn select(config: &Config, detection: &BackendDetection) -> Result<Platform, DriverError> {
    if let Some(platform) = config.platform {
        if detection.is_available(platform) {
            return Ok(platform);
        }
        return Err(DriverError::BackendUnavailable {
            platform,
            hint: unavailable_hint(platform),
        });
    }
    match detection.available.as_slice() {
        [] => Err(DriverError::NoBackend),
        [only] => Ok(*only),
        several => Err(DriverError::AmbiguousBackend {
            available: several.to_vec(),
        }),
    }
}

fn unavailable_hint(platform: Platform) -> Option<&'static str> {
    match platform {
        Platform::Cpu => Some(crate::backend::HOST_UNAVAILABLE_HINT),
        Platform::Cuda | Platform::Nvcc | Platform::Rocm => None,
    }
}

/// Compile with a resolved configuration and return the backend's exit code.
///
/// # Errors
///
/// Any selection, pipeline, or tool failure.
pub fn dispatch(config: Config) -> Result<i32, DriverError> {
    if let Some(compiler) = &config.alternative_compiler {
        tracing::debug!(compiler = %compiler.display(), "alternative compiler bypasses backends");
        return Ok(process::run(compiler, &config.forwarded_args)?);
    }

    let backends = Backend::all(&config);
    let detection = BackendDetection::detect(&backends);
    let platform = select(&config, &detection)?;
    tracing::debug!(%platform, "selected backend");

    let install = Installation::detect(config.install_prefix.as_deref());
    let backend = backends
        .into_iter()
        .find(|b| b.platform() == platform)
        .ok_or_else(|| DriverError::Internal(format!("no backend registered for '{platform}'")))?;
    let session = Session::new(config, install);
    backend.run(&session, &session.config.forwarded_args)
}

/// Resolve, dispatch, and report. Returns the process exit code.
///
/// `args` excludes the program name and may contain arguments that are not
/// UTF-8. Fatal errors and panics are printed once to stderr as
/// `fatal error: ...` and mapped to [`FATAL_EXIT_CODE`].
pub fn run_main<A: AsRef<OsStr>>(args: &[A], env: &Environment) -> i32 {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| drive(args, env)));
    let result = match outcome {
        Ok(result) => result,
        Err(payload) => Err(DriverError::Internal(panic_message(payload.as_ref()))),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fatal error: {e}");
            FATAL_EXIT_CODE
        }
    }
}

fn drive<A: AsRef<OsStr>>(args: &[A], env: &Environment) -> Result<i32, DriverError> {
    let args = config::utf8_args(args)?;
    let config = match Config::resolve(env, &args)? {
        Resolution::Usage => return Ok(print_stdout(&config::usage())),
        Resolution::Help => return Ok(print_stdout(&config::help())),
        Resolution::Compile(config) => *config,
    };
    for warning in &config.warnings {
        eprintln!("warning: {warning}");
    }
    dispatch(config)
}

/// Print informational text; a closed stdout is not worth failing over.
fn print_stdout(text: &str) -> i32 {
    let mut out = std::io::stdout().lock();
    if let Err(e) = writeln!(out, "{text}") {
        tracing::debug!("failed to write to stdout: {e}");
    }
    0
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
