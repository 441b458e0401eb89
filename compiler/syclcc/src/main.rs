//! syclcc command-line entry point.

use std::ffi::OsString;

use syclcc::{init_tracing, run_main, Environment};

fn main() {
    init_tracing();
    let args: Vec<OsString> = std::env::args_os().skip(1).collect();
    let env = Environment::capture();
    std::process::exit(run_main(&args, &env));
}
