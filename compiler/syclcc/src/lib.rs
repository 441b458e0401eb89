//! hipSYCL compilation driver.
//!
//! `syclcc` is invoked exactly like a single C++ compiler. It finds out which
//! backend toolchains are installed, picks one, rewrites every source file
//! through the two hipSYCL source tools, translates the remaining arguments
//! into the backend's flag dialect, and returns the backend's exit code.
//!
//! ```text
//! args + env ──► config ──► dispatch ──► backend ──► pipeline ──► compiler
//! ```
//!
//! # Debugging
//!
//! Enable tracing with environment variables:
//! - `RUST_LOG=syclcc=debug` - every spawned command line, probe results,
//!   and temp workspace lifecycle
//! - `RUST_LOG=syclcc=trace` - everything
//!
//! Logs go to stderr so the compiler output on stdout stays clean.

pub mod backend;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod install;
pub mod pipeline;
pub mod process;

pub use config::{Config, Environment, Resolution};
pub use dispatch::run_main;
pub use error::{DriverError, FATAL_EXIT_CODE};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=syclcc=debug` or `RUST_LOG=syclcc=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(filter)
                .init();
        }
    });
}
