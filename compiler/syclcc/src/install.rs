//! hipSYCL installation layout.
//!
//! Discovery follows the usual sysroot pattern: an explicit prefix wins,
//! otherwise the prefix is the parent of the directory holding the running
//! driver (`<prefix>/bin/syclcc`).

use std::path::{Path, PathBuf};

use crate::backend::Platform;

/// Include-expansion tool (stage 1).
const REWRITE_INCLUDES_TOOL: &str = "hipsycl_rewrite_includes";
/// Device-annotation tool (stage 2).
const TRANSFORM_SOURCE_TOOL: &str = "hipsycl_transform_source";

/// Paths inside a hipSYCL installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    prefix: PathBuf,
}

impl Installation {
    /// Use an explicit installation prefix.
    #[must_use]
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Locate the installation.
    ///
    /// Order: explicit override, then `<exe>/../`, then the current
    /// directory as a last resort.
    pub fn detect(prefix_override: Option<&Path>) -> Self {
        if let Some(prefix) = prefix_override {
            return Self::new(prefix);
        }

        let from_exe = std::env::current_exe().ok().and_then(|exe| {
            // Canonicalize to resolve symlinks like /usr/bin/syclcc -> /opt/hipSYCL/bin/syclcc
            let exe = exe.canonicalize().unwrap_or(exe);
            exe.parent()?.parent().map(Path::to_path_buf)
        });

        match from_exe {
            Some(prefix) => Self::new(prefix),
            None => {
                tracing::warn!("cannot locate installation from executable path");
                Self::new(".")
            }
        }
    }

    /// Installation prefix.
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// `<prefix>/include`
    pub fn include_dir(&self) -> PathBuf {
        self.prefix.join("include")
    }

    /// `<prefix>/lib`
    pub fn lib_dir(&self) -> PathBuf {
        self.prefix.join("lib")
    }

    /// `<prefix>/bin`
    pub fn bin_dir(&self) -> PathBuf {
        self.prefix.join("bin")
    }

    /// Header subtree of the CPU fallback implementation.
    pub fn cpu_fallback_include_dir(&self) -> PathBuf {
        self.include_dir().join("hipSYCL").join("hipCPU")
    }

    /// Extra headers needed by the CUDA platforms.
    pub fn cuda_include_dir(&self) -> PathBuf {
        self.include_dir().join("hipSYCL").join("cuda")
    }

    /// Extra fallback include directory for a platform, if it needs one.
    pub fn fallback_include_dir(&self, platform: Platform) -> Option<PathBuf> {
        match platform {
            Platform::Cpu => Some(self.cpu_fallback_include_dir()),
            Platform::Cuda | Platform::Nvcc => Some(self.cuda_include_dir()),
            Platform::Rocm => None,
        }
    }

    /// Stage 1 tool.
    pub fn rewrite_includes_tool(&self) -> PathBuf {
        self.bin_dir().join(REWRITE_INCLUDES_TOOL)
    }

    /// Stage 2 tool.
    pub fn transform_source_tool(&self) -> PathBuf {
        self.bin_dir().join(TRANSFORM_SOURCE_TOOL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_explicit_prefix_wins() {
        let install = Installation::detect(Some(Path::new("/opt/hipSYCL")));
        assert_eq!(install.prefix(), Path::new("/opt/hipSYCL"));
        assert_eq!(install.include_dir(), PathBuf::from("/opt/hipSYCL/include"));
        assert_eq!(install.lib_dir(), PathBuf::from("/opt/hipSYCL/lib"));
    }

    #[test]
    fn test_tool_paths_live_in_bin() {
        let install = Installation::new("/opt/hipSYCL");
        assert_eq!(
            install.rewrite_includes_tool(),
            PathBuf::from("/opt/hipSYCL/bin/hipsycl_rewrite_includes")
        );
        assert_eq!(
            install.transform_source_tool(),
            PathBuf::from("/opt/hipSYCL/bin/hipsycl_transform_source")
        );
    }

    #[test]
    fn test_fallback_include_dirs() {
        let install = Installation::new("/p");
        assert_eq!(
            install.fallback_include_dir(Platform::Cpu),
            Some(PathBuf::from("/p/include/hipSYCL/hipCPU"))
        );
        assert_eq!(
            install.fallback_include_dir(Platform::Nvcc),
            Some(PathBuf::from("/p/include/hipSYCL/cuda"))
        );
        assert_eq!(install.fallback_include_dir(Platform::Rocm), None);
    }

    #[test]
    fn test_detect_without_override_is_not_empty() {
        let install = Installation::detect(None);
        assert!(!install.prefix().as_os_str().is_empty());
    }
}
