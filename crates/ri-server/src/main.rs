use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ri_core::{FileContainer, SourceRangesContainer};
use ri_query::ClangQueryGatherer;
use ri_server::{logging, serve, LogFormat, ServerConfig, ServerError};
use ri_storage::StorageManager;

#[derive(Parser)]
#[command(name = "ri-backend", version, about = "C/C++ symbol indexing and refactoring backend")]
struct Cli {
    /// JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` or `ri_indexer=trace`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve JSON-lines requests on stdin, answering on stdout.
    Serve {
        #[arg(long)]
        storage_root: Option<PathBuf>,
        /// Feed file changes under this directory to the indexer.
        #[arg(long)]
        watch: Option<PathBuf>,
    },
    /// Index every C/C++ file under a directory once.
    Index {
        path: PathBuf,
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Run a matcher expression over files and print the matches.
    Query {
        query: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        jobs: Option<usize>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match ServerConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ri-backend: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => ServerConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    logging::init(&config.log_level, config.log_format);

    match run(cli.command, config) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "ri-backend failed");
            eprintln!("ri-backend: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, mut config: ServerConfig) -> Result<ExitCode, ServerError> {
    match command {
        Command::Serve { storage_root, watch } => {
            if storage_root.is_some() {
                config.storage_root = storage_root;
            }
            if watch.is_some() {
                config.watch_root = watch;
            }
            let storage = StorageManager::open(&config.storage_root()?)?;
            serve(&config, storage, std::io::stdin(), std::io::stdout())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Index { path, jobs } => {
            if jobs.is_some() {
                config.index.hardware_concurrency = jobs;
            }
            let report = ri_indexer::index(&path, &config.index)?;
            println!("files scanned:  {}", report.total_files_scanned);
            println!("sources:        {}", report.sources);
            println!("headers:        {}", report.headers);
            println!("state:          {:?}", report.state);
            println!("symbols:        {}", report.total_symbols);
            println!("locations:      {}", report.total_locations);
            println!("duration:       {:.2?}", report.duration);
            Ok(ExitCode::SUCCESS)
        }
        Command::Query { query, files, jobs } => {
            if jobs.is_some() {
                config.query.processing_slots = jobs;
            }
            let mut sources = Vec::with_capacity(files.len());
            for file in &files {
                let content = std::fs::read_to_string(file)?;
                sources.push(FileContainer::new(file.to_string_lossy(), content));
            }

            let mut gatherer = ClangQueryGatherer::new(sources, &[], &query, &config.query)?;
            if !gatherer.diagnostics().is_empty() {
                for diagnostic in gatherer.diagnostics() {
                    eprintln!("{}", diagnostic.render());
                }
                return Ok(ExitCode::FAILURE);
            }

            let mut merged = SourceRangesContainer::default();
            for message in gatherer.wait_for_finished() {
                merged.merge(message.source_ranges);
            }
            print_matches(&merged);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_matches(matches: &SourceRangesContainer) {
    let mut ranges: Vec<_> = matches
        .ranges
        .iter()
        .map(|range| (matches.path_of(range).unwrap_or("?"), range))
        .collect();
    ranges.sort_by_key(|(path, range)| (*path, range.range.start.line, range.range.start.column));
    for (path, range) in ranges {
        let first_line = range.text.lines().next().unwrap_or("");
        println!(
            "{path}:{}:{}: {first_line}",
            range.range.start.line, range.range.start.column
        );
    }
}
