use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use piscan::corpus::Corpus;
use piscan::index::{build_index, stats, BuildOptions};
use piscan::output::{self, ErrorResponse, FindResponse, RangeResponse};
use piscan::query::{validate_query, RangeReader};
use piscan::utils::AppConfig;
use piscan::{PiError, PiSearch};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "piscan")]
#[command(about = "Indexed digit search over the decimal expansion of pi")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to config.json in the app data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Digit corpus file
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Index store directory
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write logs to a file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and publish a new index store
    Index {
        /// Key width K (overrides the config file)
        #[arg(short = 'k', long)]
        prefix_len: Option<usize>,

        /// No progress output
        #[arg(short, long)]
        silent: bool,
    },
    /// Find the first offset of a digit string
    Find {
        /// Digits to look for
        query: String,

        /// Print a JSON response object
        #[arg(long)]
        json: bool,

        /// Scan the corpus linearly instead of using the index
        #[arg(long)]
        scan: bool,
    },
    /// Print the digits in START:END (end exclusive)
    Range {
        /// Offsets as START:END
        range: String,

        /// Print a JSON response object
        #[arg(long)]
        json: bool,
    },
    /// Show index statistics
    Stats,
    /// Show the effective configuration
    Config {
        /// Write it to the app data directory
        #[arg(long)]
        save: bool,
    },
}

fn setup_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    match log_file {
        Some(path) => {
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_writer(file)
                .with_ansi(false)
                .with_env_filter(filter)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_writer(io::stderr)
                .with_env_filter(filter)
                .init();
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.log_file.as_deref()).context("Failed to setup logging")?;

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.corpus.is_some() {
        config.corpus_path = cli.corpus.clone();
    }
    if cli.index_dir.is_some() {
        config.index_dir = cli.index_dir.clone();
    }

    match cli.command {
        Commands::Index { prefix_len, silent } => {
            if let Some(k) = prefix_len {
                config.prefix_len = k;
            }
            cmd_index(&config, silent)?;
        }
        Commands::Find { query, json, scan } => {
            cmd_find(&config, &query, json, scan)?;
        }
        Commands::Range { range, json } => {
            cmd_range(&config, &range, json)?;
        }
        Commands::Stats => {
            stats::show_stats(&config.resolved_index_dir()?)?;
        }
        Commands::Config { save } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                let path = config.save()?;
                println!("Saved to: {}", path.display());
            }
        }
    }

    Ok(())
}

fn cmd_index(config: &AppConfig, silent: bool) -> Result<()> {
    let corpus = config.resolved_corpus_path()?;
    let index_dir = config.resolved_index_dir()?;
    let options = BuildOptions {
        prefix_len: config.prefix_len,
        parallel_shards: config.effective_parallel_shard_count(),
        silent,
    };

    let report = build_index(&corpus, &index_dir, &options)
        .with_context(|| format!("Failed to index {}", corpus.display()))?;
    info!(
        "Generation {} published: {} keys, {} offsets in {:.2}s",
        report.generation,
        report.meta.key_count,
        report.meta.offset_count,
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

fn cmd_find(config: &AppConfig, query: &str, json: bool, scan: bool) -> Result<()> {
    info!(target: "audit", "find {}", query);
    let corpus_path = config.resolved_corpus_path()?;
    let start = Instant::now();

    let result = if scan {
        validate_query(query).and_then(|pattern| {
            Corpus::open(&corpus_path)
                .map_err(PiError::into_unavailable)
                .map(|corpus| corpus.scan_first(pattern, 0))
        })
    } else {
        PiSearch::open(&corpus_path, &config.resolved_index_dir()?).and_then(|s| s.find(query))
    };

    match result {
        Ok(offset) => {
            info!(target: "audit", "find {} => {:?}", query, offset);
            let response = FindResponse::new(query, offset, start.elapsed());
            output::write_find(&mut io::stdout().lock(), &response, json)?;
            Ok(())
        }
        Err(e) => reject(&format!("find {}", query), ErrorResponse::from(&e), json),
    }
}

fn cmd_range(config: &AppConfig, range: &str, json: bool) -> Result<()> {
    info!(target: "audit", "range {}", range);
    let request = format!("range {}", range);

    let (start_offset, end_offset) = match parse_range(range) {
        Ok(bounds) => bounds,
        Err(message) => return reject(&request, ErrorResponse::new(message), json),
    };

    let start = Instant::now();
    let corpus = match Corpus::open(&config.resolved_corpus_path()?) {
        Ok(corpus) => corpus,
        Err(e) => return reject(&request, ErrorResponse::from(&e.into_unavailable()), json),
    };

    // Bounds first, then the width cap
    if start_offset >= end_offset || end_offset > corpus.len() {
        let err = PiError::Range {
            start: start_offset,
            end: end_offset,
            len: corpus.len(),
        };
        return reject(&request, ErrorResponse::from(&err), json);
    }
    if end_offset - start_offset > config.max_range_width {
        let message = format!(
            "Too many digits requested, max range is {}.",
            config.max_range_width
        );
        return reject(&request, ErrorResponse::new(message), json);
    }

    match RangeReader::new(&corpus).read(start_offset, end_offset) {
        Ok(digits) => {
            info!(target: "audit", "range {} => {} digits", range, digits.len());
            let response =
                RangeResponse::new(start_offset, end_offset, digits.to_owned(), start.elapsed());
            output::write_range(&mut io::stdout().lock(), &response, json)?;
            Ok(())
        }
        Err(e) => reject(&request, ErrorResponse::from(&e), json),
    }
}

/// Report a failed request and exit non-zero
fn reject(request: &str, response: ErrorResponse, json: bool) -> Result<()> {
    warn!(target: "audit", "rejected {}: {}", request, response.message);
    if json {
        output::write_error(&mut io::stdout().lock(), &response)?;
        std::process::exit(1);
    }
    bail!(response.message)
}

/// Parse `START:END` into offsets
fn parse_range(range: &str) -> std::result::Result<(u64, u64), String> {
    let (start, end) = range
        .split_once(':')
        .ok_or_else(|| format!("Invalid range {:?}: expected START:END", range))?;

    let parse = |s: &str| -> std::result::Result<u64, String> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("Invalid range {:?}: offsets must be non-negative integers", range));
        }
        s.parse().map_err(|_| format!("Invalid range {:?}: offset too large", range))
    };

    Ok((parse(start)?, parse(end)?))
}
