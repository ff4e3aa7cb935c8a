use crate::error::{PiError, Result};
use serde::{Deserialize, Serialize};

/// Numeric value of a K-digit key (leading zeros are implied by K)
pub type Key = u64;

/// Zero-based position in the corpus
pub type Offset = u64;

/// Shard identifier: the leading `shard_digits` digits of a key
pub type ShardId = u32;

/// Widest key the store accepts. Wider keys approach one key per window and
/// the store grows to the size of the corpus.
pub const MAX_PREFIX_LEN: usize = 12;

/// Magic number for shard dictionaries
pub const DICT_MAGIC: u32 = 0x5844_4950; // "PIDX" in little-endian

/// Current on-disk format version
pub const FORMAT_VERSION: u32 = 1;

/// Store metadata stored in meta.json
///
/// Holds no timestamps, so identical inputs give a bit-identical generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub version: u32,
    /// Key width K
    pub prefix_len: usize,
    /// Leading key digits that select a shard
    pub shard_digits: usize,
    /// Number of digits in the corpus the store was built from
    pub corpus_len: u64,
    /// Distinct keys stored
    pub key_count: u64,
    /// Total offsets stored (one per window)
    pub offset_count: u64,
}

impl IndexMeta {
    pub fn layout(&self) -> Result<KeyLayout> {
        let layout = KeyLayout::new(self.prefix_len)?;
        if layout.shard_digits != self.shard_digits {
            return Err(PiError::NotAvailable(format!(
                "meta.json shard digits {} do not match prefix length {}",
                self.shard_digits, self.prefix_len
            )));
        }
        Ok(layout)
    }
}

/// Dictionary entry mapping a key to its postings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictEntry {
    pub key: Key,
    /// Byte offset of the postings list in the shard's postings file
    pub offset: u64,
    /// Encoded length in bytes
    pub length: u32,
    /// Number of occurrences
    pub count: u32,
}

impl DictEntry {
    /// Size of a dictionary entry in bytes (fixed-size for mmap)
    pub const SIZE: usize = 8 + 8 + 4 + 4;
}

/// Header at the start of every shard dictionary
#[derive(Debug, Clone, Copy)]
pub struct DictHeader {
    pub magic: u32,
    pub version: u32,
    pub entry_count: u64,
}

impl DictHeader {
    pub const SIZE: usize = 4 + 4 + 8;

    pub fn new(entry_count: u64) -> Self {
        Self {
            magic: DICT_MAGIC,
            version: FORMAT_VERSION,
            entry_count,
        }
    }
}

/// Key width and shard partitioning derived from K
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyLayout {
    pub prefix_len: usize,
    pub shard_digits: usize,
    /// 10^(prefix_len - shard_digits): keys per shard
    shard_span: Key,
    /// 10^prefix_len: size of the key space
    key_space: Key,
}

impl KeyLayout {
    pub fn new(prefix_len: usize) -> Result<Self> {
        if prefix_len == 0 || prefix_len > MAX_PREFIX_LEN {
            return Err(PiError::Config(format!(
                "prefix length must be between 1 and {}, got {}",
                MAX_PREFIX_LEN, prefix_len
            )));
        }

        // 10 shards for small key spaces, 100 otherwise
        let shard_digits = if prefix_len >= 4 { 2 } else { 1 };

        Ok(Self {
            prefix_len,
            shard_digits,
            shard_span: pow10(prefix_len - shard_digits),
            key_space: pow10(prefix_len),
        })
    }

    pub fn shard_count(&self) -> ShardId {
        pow10(self.shard_digits) as ShardId
    }

    /// Keys `[0, 10^K)`
    pub fn key_space(&self) -> Key {
        self.key_space
    }

    #[inline]
    pub fn shard_of(&self, key: Key) -> ShardId {
        (key / self.shard_span) as ShardId
    }

    /// Half-open key range covered by a shard
    pub fn shard_keys(&self, shard: ShardId) -> (Key, Key) {
        let start = shard as Key * self.shard_span;
        (start, start + self.shard_span)
    }

    /// Key of the K leading digits of `digits`, which must hold at least K digits
    pub fn key_of(&self, digits: &[u8]) -> Key {
        digits[..self.prefix_len]
            .iter()
            .fold(0, |key, &d| key * 10 + (d - b'0') as Key)
    }

    /// Half-open range of keys that start with `prefix` (shorter than K)
    pub fn prefix_range(&self, prefix: &[u8]) -> (Key, Key) {
        debug_assert!(prefix.len() <= self.prefix_len);
        let value = prefix
            .iter()
            .fold(0, |key: Key, &d| key * 10 + (d - b'0') as Key);
        let span = pow10(self.prefix_len - prefix.len());
        (value * span, (value + 1) * span)
    }

    /// Render a key back to its K digits
    pub fn format_key(&self, key: Key) -> String {
        format!("{:0width$}", key, width = self.prefix_len)
    }

    /// Leading digits shared by every key of a shard
    pub fn shard_prefix(&self, shard: ShardId) -> Vec<u8> {
        format!("{:0width$}", shard, width = self.shard_digits).into_bytes()
    }

    /// File name stem for a shard, zero-padded to the shard digits
    pub fn shard_name(&self, shard: ShardId) -> String {
        format!("shard_{:0width$}", shard, width = self.shard_digits)
    }
}

#[inline]
fn pow10(exp: usize) -> Key {
    10u64.pow(exp as u32)
}
