use crate::corpus::Corpus;
use crate::error::{PiError, Result};
use crate::index::store::StorePaths;
use crate::index::types::*;
use crate::index::writer::{write_meta, ShardSummary, ShardWriter};
use crate::utils::progress::{ProgressBar, ProgressStyle};
use memchr::memchr_iter;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Parameters for one builder run
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Key width K
    pub prefix_len: usize,
    /// Shards built concurrently; bounds peak memory
    pub parallel_shards: usize,
    /// Suppress progress output
    pub silent: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            prefix_len: 5,
            parallel_shards: 0,
            silent: true,
        }
    }
}

/// Outcome of a successful build
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub generation: u32,
    pub generation_dir: PathBuf,
    pub meta: IndexMeta,
    pub elapsed: Duration,
}

/// Build a new store generation from `corpus_path` and publish it in `index_dir`
///
/// Nothing becomes visible to readers unless every shard and meta.json were
/// written; on failure the working directory is removed and `CURRENT` keeps
/// pointing at the previous generation.
pub fn build_index(corpus_path: &Path, index_dir: &Path, options: &BuildOptions) -> Result<BuildReport> {
    let start = Instant::now();
    let layout = KeyLayout::new(options.prefix_len)?;

    let corpus = Corpus::open(corpus_path)?;
    corpus.validate()?;

    if !options.silent {
        println!(
            "Indexing: {} ({} digits, K={})",
            corpus_path.display(),
            corpus.len(),
            layout.prefix_len
        );
    }
    info!(
        "Building index for {} ({} digits, prefix length {}, {} shards)",
        corpus_path.display(),
        corpus.len(),
        layout.prefix_len,
        layout.shard_count()
    );

    fs::create_dir_all(index_dir).map_err(|e| PiError::io(index_dir, e))?;
    let paths = StorePaths::from_root(index_dir);
    let generation = paths.next_generation()?;
    let partial = paths.create_partial(generation)?;

    let meta = match write_generation(&corpus, &layout, &partial, options) {
        Ok(meta) => meta,
        Err(e) => {
            warn!("Index build failed, discarding generation {}: {}", generation, e);
            paths.discard_partial(generation);
            return Err(e);
        }
    };

    if let Err(e) = paths.publish(generation) {
        warn!("Publishing generation {} failed: {}", generation, e);
        paths.discard_generation(generation);
        return Err(e);
    }

    if let Err(e) = paths.collect_garbage(generation) {
        warn!("Failed to clean up old generations: {}", e);
    }

    let generation_dir = paths.generation_dir(generation);
    let elapsed = start.elapsed();

    if !options.silent {
        println!(
            "Indexed {} keys, {} offsets in {:.2}s",
            meta.key_count,
            meta.offset_count,
            elapsed.as_secs_f64()
        );
        println!("Index stored at: {}", generation_dir.display());
    }

    Ok(BuildReport {
        generation,
        generation_dir,
        meta,
        elapsed,
    })
}

/// Write every shard and meta.json into `dir`
fn write_generation(
    corpus: &Corpus,
    layout: &KeyLayout,
    dir: &Path,
    options: &BuildOptions,
) -> Result<IndexMeta> {
    let shard_ids: Vec<ShardId> = (0..layout.shard_count()).collect();

    let progress_bar = if options.silent {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(shard_ids.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} shards {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░  "),
        );
        pb.set_message("Scanning corpus...");
        pb
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.parallel_shards)
        .build()
        .map_err(|e| PiError::Config(format!("cannot start builder threads: {}", e)))?;

    let summaries: Result<Vec<ShardSummary>> = pool.install(|| {
        shard_ids
            .par_iter()
            .map(|&shard| {
                let summary = build_shard(corpus, layout, shard, dir);
                progress_bar.inc(1);
                summary
            })
            .collect::<Result<Vec<_>>>()
    });

    let summaries = match summaries {
        Ok(s) => s,
        Err(e) => {
            progress_bar.abandon();
            return Err(e);
        }
    };
    progress_bar.finish_with_message("done");

    let meta = IndexMeta {
        version: FORMAT_VERSION,
        prefix_len: layout.prefix_len,
        shard_digits: layout.shard_digits,
        corpus_len: corpus.len(),
        key_count: summaries.iter().map(|s| s.key_count).sum(),
        offset_count: summaries.iter().map(|s| s.offset_count).sum(),
    };
    write_meta(dir, &meta)?;

    Ok(meta)
}

/// Collect and write the postings of one shard
///
/// Every window start `o` in `[0, L-K]` whose leading digits equal the
/// shard's prefix is recorded under the key `Corpus[o..o+K)`. Window starts
/// arrive in increasing order, so each list comes out ascending.
fn build_shard(corpus: &Corpus, layout: &KeyLayout, shard: ShardId, dir: &Path) -> Result<ShardSummary> {
    let digits = corpus.digits();
    let mut writer = ShardWriter::new(shard);

    if digits.len() >= layout.prefix_len {
        let prefix = layout.shard_prefix(shard);
        let window_starts = &digits[..=digits.len() - layout.prefix_len];

        for pos in memchr_iter(prefix[0], window_starts) {
            if digits[pos..pos + prefix.len()] == prefix[..] {
                writer.add(layout.key_of(&digits[pos..]), pos as Offset);
            }
        }
    }

    debug!("Shard {} holds {} keys", shard, writer.key_count());
    writer.write(dir, layout)
}
