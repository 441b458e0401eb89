//! Immutable snapshot of the process environment.
//!
//! The driver never calls `std::env::var` outside of [`Environment::capture`].
//! Everything downstream receives the snapshot explicitly, which keeps
//! config resolution deterministic under test.

use rustc_hash::FxHashMap;

/// Variable selecting the platform (`cuda`, `nvcc`, `rocm`, `cpu`, or an alias).
pub const PLATFORM_VAR: &str = "HIPSYCL_PLATFORM";
/// Variable overriding the clang used for the CUDA-via-Clang backend.
pub const CUDA_CLANG_VAR: &str = "HIPSYCL_CUDA_CLANG_COMPILER";
/// Variable overriding the GPU architecture.
pub const GPU_ARCH_VAR: &str = "HIPSYCL_GPU_ARCH";
/// Standard host compiler variable, used by the Host-fallback backend.
pub const HOST_COMPILER_VAR: &str = "CXX";
/// Variable overriding the installation prefix.
pub const INSTALL_PREFIX_VAR: &str = "HIPSYCL_INSTALL_PREFIX";

/// Environment variables visible to the driver.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: FxHashMap<String, String>,
}

impl Environment {
    /// Snapshot the current process environment.
    ///
    /// Variables that are not valid UTF-8 are skipped.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// Build a synthetic environment from key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a variable. Empty values count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}
