use crate::error::{PiError, Result};
use crate::index::types::*;
use crate::utils::{delta_encode, write_u32_le, write_u64_le};
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// What a shard contributed to the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShardSummary {
    pub shard_id: ShardId,
    pub key_count: u64,
    pub offset_count: u64,
}

/// Accumulates postings for one shard and persists them
pub struct ShardWriter {
    shard_id: ShardId,
    /// Key -> ascending offsets (accumulated in scan order)
    postings: FxHashMap<Key, Vec<Offset>>,
}

impl ShardWriter {
    pub fn new(shard_id: ShardId) -> Self {
        Self {
            shard_id,
            postings: FxHashMap::default(),
        }
    }

    /// Record an occurrence. Offsets must arrive in increasing order.
    #[inline]
    pub fn add(&mut self, key: Key, offset: Offset) {
        let list = self.postings.entry(key).or_default();
        debug_assert!(list.last().is_none_or(|&last| last < offset));
        list.push(offset);
    }

    pub fn key_count(&self) -> usize {
        self.postings.len()
    }

    /// Write `shard_NN.dict` and `shard_NN.postings` into `dir`
    pub fn write(self, dir: &Path, layout: &KeyLayout) -> Result<ShardSummary> {
        let name = layout.shard_name(self.shard_id);
        let dict_path = dir.join(format!("{}.dict", name));
        let postings_path = dir.join(format!("{}.postings", name));

        // Keys in ascending order make the dictionary binary-searchable
        let mut entries: Vec<(Key, Vec<Offset>)> = self.postings.into_iter().collect();
        entries.sort_unstable_by_key(|(key, _)| *key);

        let mut dict_file = BufWriter::with_capacity(
            65536,
            File::create(&dict_path).map_err(|e| PiError::io(&dict_path, e))?,
        );
        let mut postings_file = BufWriter::with_capacity(
            65536,
            File::create(&postings_path).map_err(|e| PiError::io(&postings_path, e))?,
        );

        let header = DictHeader::new(entries.len() as u64);
        write_u32_le(&mut dict_file, header.magic)
            .and_then(|_| write_u32_le(&mut dict_file, header.version))
            .and_then(|_| write_u64_le(&mut dict_file, header.entry_count))
            .map_err(|e| PiError::io(&dict_path, e))?;

        let mut postings_offset: u64 = 0;
        let mut offset_count: u64 = 0;
        let mut encoded = Vec::new();

        for (key, offsets) in &entries {
            encoded.clear();
            delta_encode(offsets, &mut encoded);

            let count = u32::try_from(offsets.len()).map_err(|_| {
                PiError::Config(format!(
                    "key {} occurs {} times, more than a postings list can hold",
                    layout.format_key(*key),
                    offsets.len()
                ))
            })?;
            let length = u32::try_from(encoded.len()).map_err(|_| {
                PiError::Config(format!(
                    "postings for key {} exceed 4 GiB",
                    layout.format_key(*key)
                ))
            })?;

            // Dictionary entry: key, offset, length, count
            write_u64_le(&mut dict_file, *key)
                .and_then(|_| write_u64_le(&mut dict_file, postings_offset))
                .and_then(|_| write_u32_le(&mut dict_file, length))
                .and_then(|_| write_u32_le(&mut dict_file, count))
                .map_err(|e| PiError::io(&dict_path, e))?;

            postings_file
                .write_all(&encoded)
                .map_err(|e| PiError::io(&postings_path, e))?;

            postings_offset += encoded.len() as u64;
            offset_count += offsets.len() as u64;
        }

        finish(dict_file, &dict_path)?;
        finish(postings_file, &postings_path)?;

        Ok(ShardSummary {
            shard_id: self.shard_id,
            key_count: entries.len() as u64,
            offset_count,
        })
    }
}

/// Write meta.json into a generation directory
pub fn write_meta(dir: &Path, meta: &IndexMeta) -> Result<()> {
    let meta_path = dir.join("meta.json");
    let mut file = BufWriter::new(File::create(&meta_path).map_err(|e| PiError::io(&meta_path, e))?);
    serde_json::to_writer_pretty(&mut file, meta)
        .map_err(|e| PiError::io(&meta_path, e.into()))?;
    finish(file, &meta_path)
}

/// Flush and fsync a written file
fn finish(writer: BufWriter<File>, path: &Path) -> Result<()> {
    let file = writer
        .into_inner()
        .map_err(|e| PiError::io(path, e.into_error()))?;
    file.sync_all().map_err(|e| PiError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{delta_decode, u32_at, u64_at};
    use std::fs;

    #[test]
    fn test_write_shard_sorted_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let layout = KeyLayout::new(3).unwrap();

        let mut writer = ShardWriter::new(2);
        writer.add(265, 6);
        writer.add(238, 19);
        writer.add(264, 22);
        writer.add(238, 40);
        assert_eq!(writer.key_count(), 3);

        let summary = writer.write(dir.path(), &layout).unwrap();
        assert_eq!(summary.key_count, 3);
        assert_eq!(summary.offset_count, 4);

        let dict = fs::read(dir.path().join("shard_2.dict")).unwrap();
        assert_eq!(u32_at(&dict, 0), DICT_MAGIC);
        assert_eq!(u64_at(&dict, 8), 3);
        assert_eq!(dict.len(), DictHeader::SIZE + 3 * DictEntry::SIZE);

        let keys: Vec<u64> = (0..3)
            .map(|i| u64_at(&dict, DictHeader::SIZE + i * DictEntry::SIZE))
            .collect();
        assert_eq!(keys, vec![238, 264, 265]);

        // First entry's postings decode to both offsets of "238"
        let first = DictHeader::SIZE;
        let length = u32_at(&dict, first + 16) as usize;
        let postings = fs::read(dir.path().join("shard_2.postings")).unwrap();
        assert_eq!(delta_decode(&postings[..length]), Some(vec![19, 40]));
        assert_eq!(u32_at(&dict, first + 20), 2);
    }

    #[test]
    fn test_empty_shard_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let layout = KeyLayout::new(5).unwrap();

        let summary = ShardWriter::new(0).write(dir.path(), &layout).unwrap();
        assert_eq!(summary, ShardSummary { shard_id: 0, key_count: 0, offset_count: 0 });

        let dict = fs::read(dir.path().join("shard_00.dict")).unwrap();
        assert_eq!(dict.len(), DictHeader::SIZE);
        assert!(fs::read(dir.path().join("shard_00.postings")).unwrap().is_empty());
    }
}
