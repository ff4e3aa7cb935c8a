use crate::index::reader::IndexReader;
use crate::index::store::StorePaths;
use anyhow::Result;
use std::path::Path;

/// Display index statistics
pub fn show_stats(index_dir: &Path) -> Result<()> {
    let reader = IndexReader::open(index_dir)?;
    let meta = &reader.meta;
    let layout = reader.layout();
    let paths = StorePaths::from_root(index_dir);

    println!("Index Statistics");
    println!("================");
    println!();
    println!("Index location:   {}", index_dir.display());
    println!("Generation:       {}", reader.generation_dir().display());
    println!("Format version:   {}", meta.version);
    println!("Prefix length:    {}", meta.prefix_len);
    println!("Shards:           {}", layout.shard_count());
    println!("Corpus digits:    {}", meta.corpus_len);
    println!(
        "Distinct keys:    {} of {} ({:.1}%)",
        meta.key_count,
        layout.key_space(),
        meta.key_count as f64 * 100.0 / layout.key_space() as f64
    );
    println!("Offsets:          {}", meta.offset_count);

    // Densest and sparsest shard-leading prefixes
    let mut per_prefix: Vec<(String, u64)> = (0..layout.shard_count())
        .map(|shard| {
            let (lo, hi) = layout.shard_keys(shard);
            let total = reader
                .keys_in_range(lo, hi)
                .iter()
                .map(|(_, count)| *count as u64)
                .sum();
            (String::from_utf8_lossy(&layout.shard_prefix(shard)).into_owned(), total)
        })
        .collect();
    per_prefix.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    if let (Some(most), Some(least)) = (per_prefix.first(), per_prefix.last()) {
        println!();
        println!("Busiest shard:    {} ({} offsets)", most.0, most.1);
        println!("Quietest shard:   {} ({} offsets)", least.0, least.1);
    }

    // Index size
    if let Ok(size) = dir_size(reader.generation_dir()) {
        println!();
        println!("Index size:       {}", format_size(size));
    }

    let generations = paths.list_generations()?;
    if generations.len() > 1 {
        println!("Generations kept: {:?}", generations);
    }

    Ok(())
}

/// Calculate directory size recursively
fn dir_size(path: &Path) -> std::io::Result<u64> {
    let mut size = 0;
    if path.is_dir() {
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() {
                size += entry.metadata()?.len();
            } else if path.is_dir() {
                size += dir_size(&path)?;
            }
        }
    }
    Ok(size)
}

/// Format byte size to human readable
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
