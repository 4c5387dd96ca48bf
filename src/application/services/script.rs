//! Script service
//!
//! Discovers script files below a directory, parses them, merges the
//! resulting forest and writes the rendered output.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{
    merge, read_lines, render_forest, Diagnostic, DomainError, Forest, MergeStats, ParsedFile,
    RenderOptions, ScriptParser, SourceId,
};
use crate::infrastructure::traits::FileSystem;

/// Parsed content of a directory.
#[derive(Debug, Clone, Default)]
pub struct LoadOutput {
    /// Files in discovery order
    pub files: Vec<PathBuf>,
    /// Concatenation of every file's forest, in discovery order
    pub forest: Forest,
    /// Diagnostics of all files, in discovery order
    pub diagnostics: Vec<Diagnostic>,
    /// Fold counts; zero until the forest was merged
    pub stats: MergeStats,
}

/// Summary of a `write_merged` run.
#[derive(Debug, Clone)]
pub struct MergeReport {
    /// Number of files read
    pub files: usize,
    /// Root nodes written
    pub roots: usize,
    /// Defines collected
    pub defines: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: MergeStats,
    /// Where the merged document was written
    pub output: PathBuf,
}

/// Service for parsing and merging script directories.
pub struct ScriptService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl ScriptService {
    /// Create a new script service.
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// Script files below `dir` in merge order.
    ///
    /// Subdirectories come before the files of their parent; siblings are
    /// ordered by name.
    #[instrument(level = "debug", skip(self))]
    pub fn discover(&self, dir: &Path) -> ApplicationResult<Vec<PathBuf>> {
        if !self.fs.is_dir(dir) {
            return Err(ApplicationError::NotADirectory(dir.to_path_buf()));
        }
        let files: Vec<PathBuf> = self
            .fs
            .walk_files(dir)
            .with_path_context("walk directory", dir)?
            .into_iter()
            .filter(|path| self.settings.matches_extension(path))
            .collect();
        debug!("discover: {} files", files.len());
        Ok(files)
    }

    /// Parse one file. Grammar problems come back as diagnostics.
    #[instrument(level = "debug", skip(self))]
    pub fn parse_file(&self, path: &Path) -> ApplicationResult<ParsedFile> {
        let reader = self.fs.open(path).map_err(|source| DomainError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let source: SourceId = Arc::from(path);
        let parsed = ScriptParser::new(source, read_lines(reader)).parse()?;
        debug!(
            roots = parsed.forest.roots.len(),
            defines = parsed.forest.defines.len(),
            diagnostics = parsed.diagnostics.len(),
            "parse_file"
        );
        Ok(parsed)
    }

    /// Parse every discovered file and concatenate the forests in discovery order.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, dir: &Path) -> ApplicationResult<LoadOutput> {
        let files = self.discover(dir)?;

        let parsed: Vec<ParsedFile> = if self.settings.parallel {
            files
                .par_iter()
                .map(|path| self.parse_file(path))
                .collect::<ApplicationResult<_>>()?
        } else {
            files
                .iter()
                .map(|path| self.parse_file(path))
                .collect::<ApplicationResult<_>>()?
        };

        let mut output = LoadOutput {
            files,
            ..LoadOutput::default()
        };
        for file in parsed {
            output.forest.extend(file.forest);
            output.diagnostics.extend(file.diagnostics);
        }
        if !output.diagnostics.is_empty() {
            warn!("load: {} diagnostics", output.diagnostics.len());
        }
        Ok(output)
    }

    /// Load `dir`, then run root merge and child merge.
    pub fn merge(&self, dir: &Path) -> ApplicationResult<LoadOutput> {
        let mut output = self.load(dir)?;
        output.stats = merge(&mut output.forest);
        Ok(output)
    }

    /// Render a forest, writing defines only when configured.
    pub fn render(&self, forest: &Forest) -> String {
        render_forest(
            forest,
            RenderOptions {
                emit_defines: self.settings.emit_defines,
            },
        )
    }

    /// Merge `dir` and write the rendered document to `output`.
    #[instrument(level = "debug", skip(self))]
    pub fn write_merged(&self, dir: &Path, output: &Path) -> ApplicationResult<MergeReport> {
        let merged = self.merge(dir)?;
        let text = self.render(&merged.forest);

        self.fs
            .ensure_parent(output)
            .with_path_context("create output directory", output)?;
        self.fs
            .write(output, &text)
            .with_path_context("write merged output", output)?;

        let report = MergeReport {
            files: merged.files.len(),
            roots: merged.forest.roots.len(),
            defines: merged.forest.defines.len(),
            diagnostics: merged.diagnostics,
            stats: merged.stats,
            output: output.to_path_buf(),
        };
        info!(
            files = report.files,
            roots = report.roots,
            output = %report.output.display(),
            "merged"
        );
        Ok(report)
    }
}
