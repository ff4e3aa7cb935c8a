use crate::corpus::map_file;
use crate::error::{PiError, Result};
use crate::index::store::StorePaths;
use crate::index::types::*;
use crate::utils::{delta_decode, delta_first, u32_at, u64_at, DeltaIter};
use memmap2::Mmap;
use rayon::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Reader for a single shard
///
/// The dictionary is searched in place through the mapping; nothing is
/// decoded until a key is looked up.
struct ShardReader {
    shard_id: ShardId,
    dict: Mmap,
    /// `None` when the shard holds no keys
    postings: Option<Mmap>,
    entry_count: u64,
}

impl ShardReader {
    fn open(dir: &Path, layout: &KeyLayout, shard_id: ShardId) -> Result<Self> {
        let name = layout.shard_name(shard_id);
        let dict_path = dir.join(format!("{}.dict", name));
        let postings_path = dir.join(format!("{}.postings", name));

        let dict = map_file(&dict_path)?
            .ok_or_else(|| corrupt(&dict_path, "empty dictionary"))?;

        if dict.len() < DictHeader::SIZE {
            return Err(corrupt(&dict_path, "file too small"));
        }
        if u32_at(&dict, 0) != DICT_MAGIC {
            return Err(corrupt(&dict_path, "bad magic number"));
        }
        let version = u32_at(&dict, 4);
        if version != FORMAT_VERSION {
            return Err(corrupt(&dict_path, &format!("unsupported version {}", version)));
        }

        let entry_count = u64_at(&dict, 8);
        let expected = (entry_count as usize)
            .checked_mul(DictEntry::SIZE)
            .and_then(|n| n.checked_add(DictHeader::SIZE));
        if expected != Some(dict.len()) {
            return Err(corrupt(&dict_path, "entry count does not match file size"));
        }

        let postings = map_file(&postings_path)?;

        Ok(Self {
            shard_id,
            dict,
            postings,
            entry_count,
        })
    }

    /// Get dictionary entry at index i
    #[inline]
    fn entry(&self, i: u64) -> DictEntry {
        let pos = DictHeader::SIZE + i as usize * DictEntry::SIZE;
        DictEntry {
            key: u64_at(&self.dict, pos),
            offset: u64_at(&self.dict, pos + 8),
            length: u32_at(&self.dict, pos + 16),
            count: u32_at(&self.dict, pos + 20),
        }
    }

    /// First entry index whose key is >= `key`
    fn lower_bound(&self, key: Key) -> u64 {
        let mut lo: u64 = 0;
        let mut hi: u64 = self.entry_count;

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.entry(mid).key < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        lo
    }

    fn lookup(&self, key: Key) -> Option<DictEntry> {
        let i = self.lower_bound(key);
        if i < self.entry_count {
            let entry = self.entry(i);
            if entry.key == key {
                return Some(entry);
            }
        }
        None
    }

    /// Entries with keys in `[lo, hi)`, ascending
    fn entries_in(&self, lo: Key, hi: Key) -> impl Iterator<Item = DictEntry> + '_ {
        (self.lower_bound(lo)..self.entry_count)
            .map(move |i| self.entry(i))
            .take_while(move |e| e.key < hi)
    }

    /// Encoded postings bytes for an entry
    fn postings_bytes(&self, entry: &DictEntry) -> Result<&[u8]> {
        let end = entry.offset.checked_add(entry.length as u64);
        match (&self.postings, end) {
            (Some(map), Some(end)) if end <= map.len() as u64 => {
                Ok(&map[entry.offset as usize..end as usize])
            }
            _ => Err(PiError::NotAvailable(format!(
                "postings for key {} in shard {} run past the end of the file",
                entry.key, self.shard_id
            ))),
        }
    }

    fn decode(&self, entry: &DictEntry) -> Result<Vec<Offset>> {
        let offsets = delta_decode(self.postings_bytes(entry)?).ok_or_else(|| {
            PiError::NotAvailable(format!(
                "corrupt postings for key {} in shard {}",
                entry.key, self.shard_id
            ))
        })?;
        if offsets.len() != entry.count as usize {
            return Err(PiError::NotAvailable(format!(
                "postings for key {} in shard {} hold {} offsets, dictionary says {}",
                entry.key,
                self.shard_id,
                offsets.len(),
                entry.count
            )));
        }
        Ok(offsets)
    }

    fn first_offset(&self, entry: &DictEntry) -> Result<Offset> {
        delta_first(self.postings_bytes(entry)?).ok_or_else(|| {
            PiError::NotAvailable(format!(
                "corrupt postings for key {} in shard {}",
                entry.key, self.shard_id
            ))
        })
    }
}

/// Memory-mapped reader over the published store generation
///
/// Holds the generation's files open for its lifetime, so a later rebuild
/// never changes what an existing reader sees.
pub struct IndexReader {
    generation_dir: PathBuf,
    pub meta: IndexMeta,
    layout: KeyLayout,
    shards: Vec<ShardReader>,
}

impl IndexReader {
    /// Open the generation `CURRENT` points at
    pub fn open(index_dir: &Path) -> Result<Self> {
        let paths = StorePaths::from_root(index_dir);
        let generation_dir = paths
            .current_dir()
            .map_err(PiError::into_unavailable)?
            .ok_or_else(|| {
                PiError::NotAvailable(format!(
                    "no index published in {}. Run 'piscan index' first.",
                    index_dir.display()
                ))
            })?;

        Self::open_generation(&generation_dir)
    }

    /// Open a specific generation directory
    pub fn open_generation(generation_dir: &Path) -> Result<Self> {
        let meta_path = generation_dir.join("meta.json");
        let meta_file = File::open(&meta_path)
            .map_err(|e| PiError::io(&meta_path, e).into_unavailable())?;
        let meta: IndexMeta = serde_json::from_reader(meta_file)
            .map_err(|e| corrupt(&meta_path, &e.to_string()))?;

        if meta.version != FORMAT_VERSION {
            return Err(corrupt(
                &meta_path,
                &format!("unsupported version {}", meta.version),
            ));
        }
        let layout = meta.layout()?;

        // Load all shards in parallel
        let shards = (0..layout.shard_count())
            .into_par_iter()
            .map(|shard| ShardReader::open(generation_dir, &layout, shard))
            .collect::<Result<Vec<_>>>()
            .map_err(PiError::into_unavailable)?;

        Ok(Self {
            generation_dir: generation_dir.to_path_buf(),
            meta,
            layout,
            shards,
        })
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    pub fn prefix_len(&self) -> usize {
        self.layout.prefix_len
    }

    pub fn generation_dir(&self) -> &Path {
        &self.generation_dir
    }

    /// Ascending offsets of `key`; empty if the key never occurs
    pub fn postings(&self, key: Key) -> Result<Vec<Offset>> {
        if key >= self.layout.key_space() {
            return Ok(Vec::new());
        }
        let shard = &self.shards[self.layout.shard_of(key) as usize];
        match shard.lookup(key) {
            Some(entry) => shard.decode(&entry),
            None => Ok(Vec::new()),
        }
    }

    /// First offset of `key` that `accept` takes, decoding postings lazily
    pub fn find_offset(
        &self,
        key: Key,
        mut accept: impl FnMut(Offset) -> bool,
    ) -> Result<Option<Offset>> {
        if key >= self.layout.key_space() {
            return Ok(None);
        }
        let shard = &self.shards[self.layout.shard_of(key) as usize];
        let Some(entry) = shard.lookup(key) else {
            return Ok(None);
        };

        let mut offsets = DeltaIter::new(shard.postings_bytes(&entry)?);
        let found = offsets.by_ref().find(|&offset| accept(offset));
        if found.is_none() && offsets.is_corrupt() {
            return Err(PiError::NotAvailable(format!(
                "corrupt postings for key {} in shard {}",
                key, shard.shard_id
            )));
        }
        Ok(found)
    }

    /// Number of occurrences of `key`
    pub fn count(&self, key: Key) -> u32 {
        if key >= self.layout.key_space() {
            return 0;
        }
        self.shards[self.layout.shard_of(key) as usize]
            .lookup(key)
            .map(|e| e.count)
            .unwrap_or(0)
    }

    /// Smallest offset of any key in `[lo, hi)`
    ///
    /// Walks the sorted dictionaries of the shards overlapping the range; each
    /// list is ascending, so only its first offset is decoded.
    pub fn min_offset_in_range(&self, lo: Key, hi: Key) -> Result<Option<Offset>> {
        let hi = hi.min(self.layout.key_space());
        if lo >= hi {
            return Ok(None);
        }

        let first_shard = self.layout.shard_of(lo);
        let last_shard = self.layout.shard_of(hi - 1);

        let mut best: Option<Offset> = None;
        for shard in &self.shards[first_shard as usize..=last_shard as usize] {
            for entry in shard.entries_in(lo, hi) {
                let first = shard.first_offset(&entry)?;
                best = Some(best.map_or(first, |b| b.min(first)));
            }
        }

        Ok(best)
    }

    /// Keys in `[lo, hi)` with their occurrence counts, ascending
    pub fn keys_in_range(&self, lo: Key, hi: Key) -> Vec<(Key, u32)> {
        let hi = hi.min(self.layout.key_space());
        if lo >= hi {
            return Vec::new();
        }

        let first_shard = self.layout.shard_of(lo);
        let last_shard = self.layout.shard_of(hi - 1);

        self.shards[first_shard as usize..=last_shard as usize]
            .iter()
            .flat_map(|shard| shard.entries_in(lo, hi))
            .map(|e| (e.key, e.count))
            .collect()
    }
}

fn corrupt(path: &Path, what: &str) -> PiError {
    PiError::NotAvailable(format!("corrupt index file {}: {}", path.display(), what))
}
