//! Private temp directory for rewritten sources.
//!
//! A workspace is a randomly named `syclcc-*` directory under the system
//! temp root, so parallel build jobs never collide. Every file the pipeline
//! creates is registered; [`TempWorkspace::release`] removes the registered
//! files and then the directory. Dropping an unreleased workspace releases
//! it, which covers early returns and unwinding.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::PipelineError;

const DIR_PREFIX: &str = "syclcc-";

/// Temp directory owned by one pipeline run.
#[derive(Debug)]
pub struct TempWorkspace {
    dir: Option<TempDir>,
    path: PathBuf,
    files: Vec<PathBuf>,
}

impl TempWorkspace {
    /// Create a fresh workspace under the system temp directory.
    pub fn create() -> Result<Self, PipelineError> {
        Self::create_in(&std::env::temp_dir())
    }

    /// Create a fresh workspace under `root`.
    pub fn create_in(root: &Path) -> Result<Self, PipelineError> {
        let dir = tempfile::Builder::new()
            .prefix(DIR_PREFIX)
            .tempdir_in(root)
            .map_err(|source| PipelineError::Workspace {
                path: root.to_path_buf(),
                source,
            })?;
        let path = dir.path().to_path_buf();
        tracing::debug!(path = %path.display(), "created temp workspace");
        Ok(Self {
            dir: Some(dir),
            path,
            files: Vec::new(),
        })
    }

    /// Workspace directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Files registered so far, in creation order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Reserve a path inside the workspace and register it for cleanup.
    ///
    /// The file itself is not created.
    pub fn register(&mut self, file_name: &str) -> PathBuf {
        let path = self.path.join(file_name);
        self.files.push(path.clone());
        path
    }

    /// Write a registered file.
    pub fn write(&mut self, file_name: &str, contents: &[u8]) -> Result<PathBuf, PipelineError> {
        let path = self.register(file_name);
        std::fs::write(&path, contents).map_err(|source| PipelineError::Workspace {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Release the workspace.
    ///
    /// With `keep` set, everything stays on disk and the directory path is
    /// returned. Otherwise registered files and the directory are removed;
    /// failures are logged and otherwise ignored.
    pub fn release(mut self, keep: bool) -> Option<PathBuf> {
        self.release_in_place(keep)
    }

    fn release_in_place(&mut self, keep: bool) -> Option<PathBuf> {
        let dir = self.dir.take()?;
        if keep {
            // into_path() disarms TempDir's own cleanup
            #[allow(deprecated, reason = "into_path is the only API across all tempfile 3.x")]
            let kept = dir.into_path();
            tracing::debug!(path = %kept.display(), "keeping temp workspace");
            return Some(kept);
        }

        for file in self.files.drain(..) {
            if let Err(e) = std::fs::remove_file(&file) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %file.display(), "failed to remove temporary file: {e}");
                }
            }
        }
        // Also sweeps anything a rewrite tool left behind
        if let Err(e) = dir.close() {
            tracing::warn!(path = %self.path.display(), "failed to remove temp workspace: {e}");
        }
        tracing::debug!(path = %self.path.display(), "released temp workspace");
        None
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        self.release_in_place(false);
    }
}
