//! Memory-mapped digit corpus
//!
//! The corpus is a flat file of ASCII digits addressed by zero-based offset.
//! Trailing ASCII whitespace (a final newline, typically) is not part of it.

use crate::error::{PiError, Result};
use memchr::memmem;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Read-only view over the digit sequence
pub struct Corpus {
    path: PathBuf,
    /// `None` for an empty file, which cannot be mapped
    data: Option<Mmap>,
    /// Number of digits, excluding trailing whitespace
    len: usize,
}

impl Corpus {
    /// Map a corpus file
    pub fn open(path: &Path) -> Result<Self> {
        let data = map_file(path)?;

        let bytes: &[u8] = data.as_deref().unwrap_or(&[]);
        let mut len = bytes.len();
        while len > 0 && bytes[len - 1].is_ascii_whitespace() {
            len -= 1;
        }

        Ok(Self {
            path: path.to_path_buf(),
            data,
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of digits
    #[inline]
    pub fn len(&self) -> u64 {
        self.len as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All digits as ASCII bytes
    #[inline]
    pub fn digits(&self) -> &[u8] {
        match &self.data {
            Some(map) => &map[..self.len],
            None => &[],
        }
    }

    /// Check that every byte is an ASCII digit
    ///
    /// Costs one linear pass, so it runs at build time rather than on open.
    pub fn validate(&self) -> Result<()> {
        match self.digits().iter().position(|b| !b.is_ascii_digit()) {
            Some(pos) => Err(PiError::Config(format!(
                "{} is not a digit corpus: byte 0x{:02x} at offset {}",
                self.path.display(),
                self.digits()[pos],
                pos
            ))),
            None => Ok(()),
        }
    }

    /// Digits in `[start, end)`, or `None` if the range is empty or out of bounds
    #[inline]
    pub fn slice(&self, start: u64, end: u64) -> Option<&[u8]> {
        if start >= end || end > self.len() {
            return None;
        }
        Some(&self.digits()[start as usize..end as usize])
    }

    /// Whether `pattern` occurs at `offset` in full
    #[inline]
    pub fn matches_at(&self, offset: u64, pattern: &[u8]) -> bool {
        let end = match offset.checked_add(pattern.len() as u64) {
            Some(end) => end,
            None => return false,
        };
        self.slice(offset, end) == Some(pattern)
    }

    /// First occurrence of `pattern` at or after `from`, by linear scan
    pub fn scan_first(&self, pattern: &[u8], from: u64) -> Option<u64> {
        if pattern.is_empty() || from >= self.len() {
            return None;
        }
        let haystack = &self.digits()[from as usize..];
        memmem::find(haystack, pattern).map(|pos| from + pos as u64)
    }
}

/// Map a file read-only; zero-length files map to `None`
pub(crate) fn map_file(path: &Path) -> Result<Option<Mmap>> {
    let file = File::open(path).map_err(|e| PiError::io(path, e))?;
    let len = file.metadata().map_err(|e| PiError::io(path, e))?.len();
    if len == 0 {
        return Ok(None);
    }
    // The store and corpus are immutable once published.
    let map = unsafe { Mmap::map(&file) }.map_err(|e| PiError::io(path, e))?;
    Ok(Some(map))
}
