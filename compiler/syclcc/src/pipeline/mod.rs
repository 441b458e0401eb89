//! Source Transformation Pipeline
//!
//! Every source file on the command line is rewritten in two external stages
//! before any backend compiler sees it:
//!
//! ```text
//! a.cpp ──► hipsycl_rewrite_includes ──► 0_a.stage1.cpp
//!                                            │
//!                                            ▼
//!           hipsycl_transform_source ──► 0_a.cpp (or 0_a.cu)
//! ```
//!
//! Stage 1 expands includes so that stage 2 can see and annotate all device
//! code. In bootstrap mode stage 1 is replaced by a verbatim copy with a
//! `#line` marker pointing at the original file.
//!
//! All intermediate files live in one [`TempWorkspace`], created on the first
//! source file and released when the [`SourcePipeline`] is dropped (unless
//! temporaries are kept). Backends keep the pipeline alive until their
//! compiler process has exited.

mod workspace;

pub use workspace::TempWorkspace;

use std::path::{Path, PathBuf};

use crate::backend::{common_args, include_flag, reaches_link_stage, Platform, Session};
use crate::error::{PipelineError, Stage};
use crate::process;

/// Recognized source extensions (compared case-insensitively).
const SOURCE_EXTENSIONS: [&str; 5] = ["c", "cc", "cpp", "cxx", "c++"];

/// Macro disabling OpenMP in the CPU fallback headers during include rewriting.
const NO_OPENMP_DEFINE: &str = "-DHIPCPU_NO_OPENMP";
const RESTRICT_HEADER_PATH_FLAG: &str = "--hipsycl-restrict-device-header-path";
const PRUNE_TEMPLATES_FLAG: &str = "--hipsycl-prune-templates";
const TOOL_ARGS_SEPARATOR: &str = "--";

/// Whether an argument names a source file the pipeline must rewrite.
pub fn is_source_file(arg: &str) -> bool {
    if arg.starts_with('-') {
        return false;
    }
    Path::new(arg)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SOURCE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Narrow forwarded arguments to what the rewrite tools understand.
///
/// Keeps `-std=`, `-I`, `-D`, positional arguments, and `-isystem` together
/// with its value. Everything else is backend-only and dropped.
pub fn rewrite_safe_args(args: &[String]) -> Vec<String> {
    let mut kept = Vec::with_capacity(args.len());
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "-isystem" {
            kept.push(arg.clone());
            if let Some(value) = iter.next() {
                kept.push(value.clone());
            }
        } else if !arg.starts_with('-')
            || arg.starts_with("-std=")
            || arg.starts_with("-I")
            || arg.starts_with("-D")
            || arg.starts_with("-isystem")
        {
            kept.push(arg.clone());
        }
    }
    kept
}

/// One rewritten source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedSource {
    /// Path as given on the command line.
    pub original: PathBuf,
    /// Final output of stage 2.
    pub transformed: PathBuf,
}

impl TransformedSource {
    /// Directory of the original file, so relative includes keep resolving.
    pub fn original_dir(&self) -> PathBuf {
        source_dir(&self.original)
    }
}

/// Forwarded arguments after source substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformedArgs {
    /// Arguments in original order, with each source replaced by its rewrite.
    pub args: Vec<String>,
    /// One entry per rewritten source, in command-line order.
    pub sources: Vec<TransformedSource>,
}

impl TransformedArgs {
    /// Unique original-source directories, in first-seen order.
    pub fn include_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        for source in &self.sources {
            let dir = source.original_dir();
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs
    }

    /// Whether `arg` is one of the substituted source paths.
    pub fn is_rewritten_source(&self, arg: &str) -> bool {
        self.sources
            .iter()
            .any(|s| s.transformed.as_os_str() == arg)
    }
}

fn source_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Rewrites all sources of one invocation and owns their temp workspace.
#[derive(Debug)]
pub struct SourcePipeline<'s> {
    session: &'s Session,
    platform: Platform,
    workspace: Option<TempWorkspace>,
}

impl<'s> SourcePipeline<'s> {
    pub fn new(session: &'s Session, platform: Platform) -> Self {
        Self {
            session,
            platform,
            workspace: None,
        }
    }

    /// Workspace directory, once one has been created.
    pub fn workspace_dir(&self) -> Option<&Path> {
        self.workspace.as_ref().map(TempWorkspace::path)
    }

    /// Rewrite every source in `args` and substitute the results in place.
    pub fn transform(&mut self, args: &[String]) -> Result<TransformedArgs, PipelineError> {
        let narrowed = rewrite_safe_args(args);
        let common = common_args(self.session, self.platform, reaches_link_stage(args));

        let mut result = TransformedArgs {
            args: Vec::with_capacity(args.len()),
            sources: Vec::new(),
        };
        for arg in args {
            if !is_source_file(arg) {
                result.args.push(arg.clone());
                continue;
            }
            let original = PathBuf::from(arg);
            let index = result.sources.len();
            let transformed = self.transform_file(&original, index, &narrowed, &common)?;
            result.args.push(transformed.display().to_string());
            result.sources.push(TransformedSource {
                original,
                transformed,
            });
        }
        Ok(result)
    }

    /// The workspace, created on first use.
    fn workspace(&mut self) -> Result<&mut TempWorkspace, PipelineError> {
        let workspace = match self.workspace.take() {
            Some(workspace) => workspace,
            None => TempWorkspace::create()?,
        };
        Ok(self.workspace.insert(workspace))
    }

    fn transform_file(
        &mut self,
        source: &Path,
        index: usize,
        narrowed: &[String],
        common: &[String],
    ) -> Result<PathBuf, PipelineError> {
        let names = OutputNames::new(source, index, self.platform);
        let stage1 = if self.session.config.bootstrap {
            self.copy_with_line_marker(source, &names.stage1)?
        } else {
            self.rewrite_includes(source, &names.stage1, narrowed, common)?
        };
        self.transform_source(source, &stage1, &names.stage2, narrowed, common)
    }

    /// Bootstrap replacement for stage 1.
    fn copy_with_line_marker(
        &mut self,
        source: &Path,
        output_name: &str,
    ) -> Result<PathBuf, PipelineError> {
        let contents = std::fs::read(source).map_err(|e| PipelineError::ReadSource {
            path: source.to_path_buf(),
            source: e,
        })?;
        let mut out = line_marker(source).into_bytes();
        out.extend_from_slice(&contents);
        self.workspace()?.write(output_name, &out)
    }

    /// Stage 1: include expansion. The rewritten source arrives on stdout.
    fn rewrite_includes(
        &mut self,
        source: &Path,
        output_name: &str,
        narrowed: &[String],
        common: &[String],
    ) -> Result<PathBuf, PipelineError> {
        let install = &self.session.install;
        let mut args = vec![
            source.display().to_string(),
            TOOL_ARGS_SEPARATOR.to_string(),
            include_flag(&source_dir(source)),
            include_flag(&install.cpu_fallback_include_dir()),
            NO_OPENMP_DEFINE.to_string(),
        ];
        args.extend_from_slice(narrowed);
        args.extend_from_slice(common);
        args.extend(
            self.session
                .config
                .restricted_device_header_paths
                .iter()
                .map(|p| format!("{RESTRICT_HEADER_PATH_FLAG}={p}")),
        );

        let tool = install.rewrite_includes_tool();
        // Make sure the workspace exists before spending time in the tool
        self.workspace()?;
        let (status, stdout) = process::run_capture_stdout(&tool, &args)?;
        if !status.success() {
            return Err(PipelineError::StageFailed {
                stage: Stage::RewriteIncludes,
                source_file: source.to_path_buf(),
                exit_code: status.code(),
            });
        }
        self.workspace()?.write(output_name, &stdout)
    }

    /// Stage 2: device-code annotation.
    fn transform_source(
        &mut self,
        source: &Path,
        stage1: &Path,
        output_name: &str,
        narrowed: &[String],
        common: &[String],
    ) -> Result<PathBuf, PipelineError> {
        let output = self.workspace()?.register(output_name);
        let mut args = vec![
            stage1.display().to_string(),
            format!("--output={}", output.display()),
            TOOL_ARGS_SEPARATOR.to_string(),
        ];
        args.extend_from_slice(narrowed);
        args.extend_from_slice(common);
        if self.platform.requires_template_pruning() {
            args.push(PRUNE_TEMPLATES_FLAG.to_string());
        }

        let tool = self.session.install.transform_source_tool();
        let code = process::run(&tool, &args)?;
        if code != 0 {
            return Err(PipelineError::StageFailed {
                stage: Stage::TransformSource,
                source_file: source.to_path_buf(),
                exit_code: Some(code),
            });
        }
        if !output.is_file() {
            return Err(PipelineError::MissingOutput {
                stage: Stage::TransformSource,
                output,
            });
        }
        Ok(output)
    }
}

impl Drop for SourcePipeline<'_> {
    fn drop(&mut self) {
        if let Some(workspace) = self.workspace.take() {
            if let Some(kept) = workspace.release(self.session.config.keep_temporaries) {
                eprintln!("note: temporary files kept in '{}'", kept.display());
            }
        }
    }
}

/// File names for the two stage outputs of one source.
struct OutputNames {
    stage1: String,
    stage2: String,
}

impl OutputNames {
    fn new(source: &Path, index: usize, platform: Platform) -> Self {
        let stem = source
            .file_stem()
            .map_or_else(|| "source".into(), |s| s.to_string_lossy());
        let ext = source
            .extension()
            .map_or_else(|| "cpp".into(), |e| e.to_string_lossy());
        let final_ext = platform
            .rewritten_source_extension()
            .map_or_else(|| ext.to_string(), str::to_string);
        Self {
            stage1: format!("{index}_{stem}.stage1.{ext}"),
            stage2: format!("{index}_{stem}.{final_ext}"),
        }
    }
}

/// `#line 1 "<path>"` for the original file, newline-terminated.
fn line_marker(source: &Path) -> String {
    let path = std::fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf());
    let escaped = path
        .display()
        .to_string()
        .replace('\\', "\\\\")
        .replace('"', "\\\"");
    format!("#line 1 \"{escaped}\"\n")
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "fixture setup and assertions use unwrap for clarity"
)]
