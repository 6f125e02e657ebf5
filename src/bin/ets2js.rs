use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::{error, warn, Level, LevelFilter, Log, Metadata, Record};

use ets_compiler_native::batch::{compile_batch, BatchOptions, BatchSummary, InputFormat};
use ets_compiler_native::config::CompilerConfig;
use ets_compiler_native::discovery::{common_root, find_source_files};
use ets_compiler_native::parse::{EtsParser, JsonAstParser, SourceParser};
use ets_compiler_native::pipeline::compile_source;
use ets_compiler_native::validate::CompilerError;

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "ets2js", about = "Compile ETS UI sources to JavaScript", version)]
struct Cli {
    /// Source files or directories
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory (defaults to writing next to each input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON compiler configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit initialRender() (true) or render() (false)
    #[arg(long)]
    partial_update: Option<bool>,

    /// Emit plain forEach/if instead of the reactive runtime protocol
    #[arg(long)]
    pure_js: bool,

    /// Do not write .js.map files
    #[arg(long)]
    no_source_map: bool,

    /// Re-parse emitted JavaScript and report syntax problems
    #[arg(long)]
    check_output: bool,

    /// Inputs are serialized syntax trees instead of ETS source
    #[arg(long)]
    ast_json: bool,

    /// Worker threads for batch compilation (0 = one per core)
    #[arg(short, long, default_value_t = 0)]
    jobs: usize,

    /// Incremental cache directory
    #[arg(long)]
    cache: Option<PathBuf>,

    /// More logging (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Errors only
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn load_config(&self) -> Result<CompilerConfig, CompilerError> {
        let mut config = match &self.config {
            Some(path) => CompilerConfig::from_file(path)?,
            None => CompilerConfig::default(),
        };
        if let Some(partial) = self.partial_update {
            config.partial_update_mode = partial;
        }
        config.pure_javascript |= self.pure_js;
        config.check_output |= self.check_output;
        if self.no_source_map {
            config.generate_source_map = false;
        }
        Ok(config)
    }

    fn level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

// ── Logging ──────────────────────────────────────────────────────

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "error",
            Level::Warn => "warning",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
        };
        eprintln!("[ets2js] {}: {}", tag, record.args());
    }

    fn flush(&self) {
        std::io::stderr().flush().ok();
    }
}

static LOGGER: StderrLogger = StderrLogger;

// ── Entry point ──────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(cli.level());
    }

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let single = cli.inputs.len() == 1 && cli.inputs[0].is_file() && cli.output.is_none();
    let ok = if single {
        compile_to_stdout(&cli.inputs[0], &config, &cli)
    } else {
        compile_to_files(&config, &cli)
    };
    if !ok {
        process::exit(1);
    }
}

fn compile_to_stdout(path: &Path, config: &CompilerConfig, cli: &Cli) -> bool {
    let display = path.to_string_lossy();
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to read {}: {}", display, e);
            return false;
        }
    };
    let parser: &dyn SourceParser = if cli.ast_json {
        &JsonAstParser
    } else {
        &EtsParser
    };
    match compile_source(&source, &display, config, parser) {
        Ok(output) => {
            // Diagnostics were logged as they were found
            print!("{}", output.code);
            true
        }
        Err(e) => {
            error!("{}", e);
            false
        }
    }
}

fn compile_to_files(config: &CompilerConfig, cli: &Cli) -> bool {
    let mut groups = Vec::new();
    for input in &cli.inputs {
        let (root, files) = if input.is_dir() {
            (input.clone(), find_source_files(input))
        } else {
            let parent = input.parent().map(Path::to_path_buf).unwrap_or_default();
            (parent, vec![input.clone()])
        };
        if files.is_empty() {
            warn!("No sources found in {}", input.display());
            continue;
        }
        groups.push((root, files));
    }

    // With one output directory, the layout is kept below the deepest
    // directory shared by every input so equal file names stay apart.
    if cli.output.is_some() {
        let roots: Vec<PathBuf> = groups.iter().map(|(root, _)| root.clone()).collect();
        let files: Vec<PathBuf> = groups.drain(..).flat_map(|(_, files)| files).collect();
        groups.push((common_root(&roots), files));
    }
    run_batches(config, cli, groups)
}

fn run_batches(
    config: &CompilerConfig,
    cli: &Cli,
    groups: Vec<(PathBuf, Vec<PathBuf>)>,
) -> bool {
    let mut results = Vec::new();
    for (root, files) in groups {
        let output_dir = cli.output.clone().unwrap_or_else(|| root.clone());
        let mut options = BatchOptions::new(config.clone(), &output_dir);
        options.root = Some(root);
        options.jobs = cli.jobs;
        options.cache_dir = cli.cache.clone();
        if cli.ast_json {
            options.input_format = InputFormat::AstJson;
        }
        results.extend(compile_batch(&files, &options));
    }

    let summary = BatchSummary::from_results(&results);
    if !cli.quiet {
        eprintln!("{}", summary.summary_line());
    }
    !summary.has_failures()
}
