//! Batch orchestration.
//!
//! Files are compiled on a fixed-size worker pool. Every file gets exactly one
//! `FileResult`; a failure or panic in one file never reaches its siblings.

use log::{debug, error, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Component, Path, PathBuf};

use crate::cache::IncrementalCache;
use crate::config::CompilerConfig;
use crate::parse::{EtsParser, JsonAstParser, SourceParser};
use crate::pipeline::{compile_source, CompileOutput};
use crate::validate::{CompilerError, ERR_IO, ERR_OUTPUT_COLLISION, ERR_PANIC};

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS AND RESULTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputFormat {
    #[default]
    Ets,
    /// Each input is a serialized `SourceFile`.
    AstJson,
}

impl InputFormat {
    fn parser(self) -> &'static (dyn SourceParser + Sync) {
        match self {
            InputFormat::Ets => &EtsParser,
            InputFormat::AstJson => &JsonAstParser,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub config: CompilerConfig,
    pub output_dir: PathBuf,
    /// Inputs under this directory keep their relative layout in `output_dir`.
    pub root: Option<PathBuf>,
    /// Worker count. Zero lets the pool pick one per core.
    pub jobs: usize,
    pub cache_dir: Option<PathBuf>,
    pub input_format: InputFormat,
}

impl BatchOptions {
    pub fn new(config: CompilerConfig, output_dir: &Path) -> Self {
        Self {
            config,
            output_dir: output_dir.to_path_buf(),
            root: None,
            jobs: 0,
            cache_dir: None,
            input_format: InputFormat::Ets,
        }
    }

    /// `<output_dir>/<path relative to root>` with a `.js` extension. Inputs
    /// outside the root land directly in `output_dir`.
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let relative = self
            .root
            .as_deref()
            .and_then(|root| input.strip_prefix(root).ok())
            .filter(|rel| rel.components().all(|c| matches!(c, Component::Normal(_))))
            .map(Path::to_path_buf)
            .or_else(|| input.file_name().map(PathBuf::from))
            .unwrap_or_else(|| input.to_path_buf());
        self.output_dir.join(relative).with_extension("js")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileStatus {
    Success,
    Failure,
    /// Unchanged since the cached compilation.
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
    pub path: PathBuf,
    pub status: FileStatus,
    pub output_path: Option<PathBuf>,
    pub diagnostics: Vec<CompilerError>,
    pub error: Option<CompilerError>,
}

impl FileResult {
    fn failure(path: &Path, error: CompilerError) -> Self {
        Self {
            path: path.to_path_buf(),
            status: FileStatus::Failure,
            output_path: None,
            diagnostics: Vec::new(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub warnings: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[FileResult]) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        Self {
            total: results.len(),
            succeeded: count(FileStatus::Success),
            failed: count(FileStatus::Failure),
            skipped: count(FileStatus::Skipped),
            warnings: results
                .iter()
                .flat_map(|r| &r.diagnostics)
                .filter(|d| d.is_warning())
                .count(),
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{} files: {} compiled, {} unchanged, {} failed, {} warnings",
            self.total, self.succeeded, self.skipped, self.failed, self.warnings
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BATCH COMPILATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Compiles `files` in parallel. Results come back in input order.
///
/// An input whose output path was already claimed by an earlier input fails
/// without being compiled.
pub fn compile_batch(files: &[PathBuf], options: &BatchOptions) -> Vec<FileResult> {
    let cache = options.cache_dir.as_deref().map(IncrementalCache::new);
    let owners = output_owners(files, options);
    let run = || {
        files
            .par_iter()
            .zip(owners.par_iter())
            .map(|(path, owner)| match owner {
                Some(first) => collision(path, first, options),
                None => compile_isolated(path, options, cache.as_ref()),
            })
            .collect::<Vec<_>>()
    };

    let results = match rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs)
        .build()
    {
        Ok(pool) => pool.install(run),
        Err(e) => {
            error!("Could not start worker pool ({}), using the global pool", e);
            run()
        }
    };

    let summary = BatchSummary::from_results(&results);
    info!("{}", summary.summary_line());
    results
}

/// For each input, the earlier input that writes the same output file.
fn output_owners(files: &[PathBuf], options: &BatchOptions) -> Vec<Option<PathBuf>> {
    let mut claimed: HashMap<PathBuf, &PathBuf> = HashMap::new();
    files
        .iter()
        .map(|path| match claimed.entry(options.output_path(path)) {
            Entry::Occupied(first) => Some(first.get().to_path_buf()),
            Entry::Vacant(slot) => {
                slot.insert(path);
                None
            }
        })
        .collect()
}

fn collision(path: &Path, first: &Path, options: &BatchOptions) -> FileResult {
    let display = path.to_string_lossy();
    let error = CompilerError::in_file(
        ERR_OUTPUT_COLLISION,
        &format!(
            "{} would overwrite the output of {} ({})",
            display,
            first.display(),
            options.output_path(path).display()
        ),
        &display,
    );
    error!("{}", error);
    FileResult::failure(path, error)
}

fn compile_isolated(
    path: &Path,
    options: &BatchOptions,
    cache: Option<&IncrementalCache>,
) -> FileResult {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| compile_one(path, options, cache)));
    let result = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => FileResult::failure(path, e),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            FileResult::failure(
                path,
                CompilerError::in_file(
                    ERR_PANIC,
                    &format!("Compiler crashed: {}", message),
                    &path.to_string_lossy(),
                ),
            )
        }
    };

    if let Some(e) = &result.error {
        error!("{}", e);
    }
    result
}

fn compile_one(
    path: &Path,
    options: &BatchOptions,
    cache: Option<&IncrementalCache>,
) -> Result<FileResult, CompilerError> {
    let display = path.to_string_lossy().to_string();
    let source = fs::read_to_string(path).map_err(|e| io_error(&display, "read", e))?;
    let output_path = options.output_path(path);

    if let Some(entry) = cache.and_then(|c| c.get(&display, &options.config, &source)) {
        if output_path.exists() {
            debug!("[{}] unchanged, skipping", display);
            return Ok(FileResult {
                path: path.to_path_buf(),
                status: FileStatus::Skipped,
                output_path: Some(output_path),
                diagnostics: Vec::new(),
                error: None,
            });
        }
        let output = CompileOutput {
            code: entry.code,
            source_map: entry.source_map,
            diagnostics: Vec::new(),
        };
        write_output(&output_path, &output)?;
        return Ok(FileResult {
            path: path.to_path_buf(),
            status: FileStatus::Skipped,
            output_path: Some(output_path),
            diagnostics: Vec::new(),
            error: None,
        });
    }

    let output = compile_source(
        &source,
        &display,
        &options.config,
        options.input_format.parser(),
    )?;
    write_output(&output_path, &output)?;
    if let Some(cache) = cache {
        cache.set(&display, &options.config, &source, &output);
    }

    Ok(FileResult {
        path: path.to_path_buf(),
        status: FileStatus::Success,
        output_path: Some(output_path),
        diagnostics: output.diagnostics,
        error: None,
    })
}

fn write_output(output_path: &Path, output: &CompileOutput) -> Result<(), CompilerError> {
    let display = output_path.to_string_lossy().to_string();
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error(&display, "create directory for", e))?;
    }
    fs::write(output_path, &output.code).map_err(|e| io_error(&display, "write", e))?;

    if let Some(map) = &output.source_map {
        let mut map_path = output_path.as_os_str().to_owned();
        map_path.push(".map");
        fs::write(PathBuf::from(map_path), map).map_err(|e| io_error(&display, "write map for", e))?;
    }
    Ok(())
}

fn io_error(file: &str, action: &str, e: std::io::Error) -> CompilerError {
    CompilerError::in_file(ERR_IO, &format!("Failed to {} {}: {}", action, file, e), file)
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP: &str = "@Entry\n@Component\nstruct App {\n  build() {\n    Text('hi')\n  }\n}\n";

    fn setup(files: &[(&str, &str)]) -> (tempfile::TempDir, Vec<PathBuf>) {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for (name, source) in files {
            let path = dir.path().join("src").join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, source).unwrap();
            paths.push(path);
        }
        (dir, paths)
    }

    fn options(dir: &Path) -> BatchOptions {
        let mut options = BatchOptions::new(CompilerConfig::default(), &dir.join("out"));
        options.root = Some(dir.join("src"));
        options.jobs = 2;
        options
    }

    #[test]
    fn outputs_mirror_the_input_tree() {
        let (dir, paths) = setup(&[("pages/Index.ets", APP), ("App.ets", APP)]);
        let results = compile_batch(&paths, &options(dir.path()));

        assert!(results.iter().all(|r| r.status == FileStatus::Success));
        let js = dir.path().join("out/pages/Index.js");
        assert!(fs::read_to_string(&js).unwrap().contains("Text.create('hi');"));
        assert!(dir.path().join("out/pages/Index.js.map").exists());
        assert!(dir.path().join("out/App.js").exists());
    }

    #[test]
    fn one_bad_file_does_not_stop_the_others() {
        let (dir, paths) = setup(&[("a.ets", APP), ("b.ets", "struct Broken {\n"), ("c.ets", APP)]);
        let results = compile_batch(&paths, &options(dir.path()));

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].status, FileStatus::Success);
        assert_eq!(results[1].status, FileStatus::Failure);
        assert_eq!(results[2].status, FileStatus::Success);
        assert!(results[1].error.is_some());

        let summary = BatchSummary::from_results(&results);
        assert!(summary.has_failures());
        assert_eq!(summary.succeeded, 2);
        assert!(summary.summary_line().starts_with("3 files: 2 compiled"));
    }

    #[test]
    fn missing_file_is_an_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let results = compile_batch(&[dir.path().join("nope.ets")], &options(dir.path()));
        assert_eq!(results[0].status, FileStatus::Failure);
        assert_eq!(results[0].error.as_ref().unwrap().code, ERR_IO);
    }

    #[test]
    fn cached_files_are_skipped() {
        let (dir, paths) = setup(&[("App.ets", APP)]);
        let mut options = options(dir.path());
        options.cache_dir = Some(dir.path().join("cache"));

        assert_eq!(compile_batch(&paths, &options)[0].status, FileStatus::Success);
        assert_eq!(compile_batch(&paths, &options)[0].status, FileStatus::Skipped);

        fs::write(&paths[0], APP.replace("'hi'", "'bye'")).unwrap();
        assert_eq!(compile_batch(&paths, &options)[0].status, FileStatus::Success);
    }

    #[test]
    fn no_source_map_when_disabled() {
        let (dir, paths) = setup(&[("App.ets", APP)]);
        let mut options = options(dir.path());
        options.config.generate_source_map = false;
        compile_batch(&paths, &options);
        assert!(dir.path().join("out/App.js").exists());
        assert!(!dir.path().join("out/App.js.map").exists());
    }

    #[test]
    fn inputs_outside_root_keep_their_file_name() {
        let options = BatchOptions::new(CompilerConfig::default(), Path::new("/out"));
        assert_eq!(options.output_path(Path::new("/x/y/Card.ets")), PathBuf::from("/out/Card.js"));

        let mut options = options;
        options.root = Some(PathBuf::new());
        assert_eq!(options.output_path(Path::new("a/Card.ets")), PathBuf::from("/out/a/Card.js"));
        assert_eq!(options.output_path(Path::new("/x/Card.ets")), PathBuf::from("/out/Card.js"));
        assert_eq!(options.output_path(Path::new("../x/Card.ets")), PathBuf::from("/out/Card.js"));
    }

    #[test]
    fn same_named_inputs_keep_apart_under_a_common_root() {
        let other = APP.replace("'hi'", "'b'");
        let (dir, paths) = setup(&[("a/Index.ets", APP), ("b/Index.ets", other.as_str())]);
        let results = compile_batch(&paths, &options(dir.path()));

        assert!(results.iter().all(|r| r.status == FileStatus::Success));
        assert!(fs::read_to_string(dir.path().join("out/a/Index.js")).unwrap().contains("'hi'"));
        assert!(fs::read_to_string(dir.path().join("out/b/Index.js")).unwrap().contains("'b'"));
    }

    #[test]
    fn colliding_outputs_fail_the_later_input() {
        let other = APP.replace("'hi'", "'b'");
        let (dir, paths) = setup(&[("a/Index.ets", APP), ("b/Index.ets", other.as_str())]);
        let mut options = options(dir.path());
        options.root = None;
        let results = compile_batch(&paths, &options);

        assert_eq!(results[0].status, FileStatus::Success);
        assert_eq!(results[1].status, FileStatus::Failure);
        assert_eq!(results[1].error.as_ref().unwrap().code, ERR_OUTPUT_COLLISION);
        assert!(fs::read_to_string(dir.path().join("out/Index.js")).unwrap().contains("'hi'"));
    }
}
