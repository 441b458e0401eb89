//! Child-process helpers.
//!
//! Every external program (rewrite tools, backend compilers, probe tools)
//! is started through here so that command lines are logged uniformly.
//! Nothing is retried and no timeout is imposed.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use crate::error::ToolError;

/// Render a command line for logs and error messages.
pub fn display_command<S: AsRef<str>>(program: &Path, args: &[S]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg.as_ref());
    }
    line
}

/// Exit code of a finished process. Termination by signal maps to 1.
pub fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

/// Check whether a program can be launched at all.
///
/// Runs `<program> <probe_arg>` with output captured and discarded. Only the
/// ability to start the process matters; its exit status is ignored.
pub fn can_launch(program: &OsStr, probe_arg: &str) -> bool {
    let available = Command::new(program)
        .arg(probe_arg)
        .stdin(Stdio::null())
        .output()
        .is_ok();
    tracing::debug!(program = %program.to_string_lossy(), available, "probe");
    available
}

/// Run a program with inherited stdio and return its exit code.
pub fn run(program: &Path, args: &[String]) -> Result<i32, ToolError> {
    tracing::debug!(command = %display_command(program, args), "exec");
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|source| launch_error(program, source))?;
    Ok(exit_code(status))
}

/// Run a program, capturing stdout while stderr goes to the terminal.
pub fn run_capture_stdout(
    program: &Path,
    args: &[String],
) -> Result<(ExitStatus, Vec<u8>), ToolError> {
    tracing::debug!(command = %display_command(program, args), "exec (capturing stdout)");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|source| launch_error(program, source))?;
    Ok((output.status, output.stdout))
}

/// Run a query command and return its stdout as text.
///
/// Used for `--help` text and `*-config` style tools.
pub fn query(program: &Path, args: &[&str]) -> Result<String, ToolError> {
    tracing::debug!(command = %display_command(program, args), "query");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| launch_error(program, source))?;
    if !output.status.success() {
        return Err(ToolError::QueryFailed {
            command: display_command(program, args),
            exit_code: output.status.code(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn launch_error(program: &Path, source: std::io::Error) -> ToolError {
    ToolError::Launch {
        program: program.display().to_string(),
        source,
    }
}
