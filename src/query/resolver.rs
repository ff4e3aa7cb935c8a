//! First-occurrence lookup through the prefix index
//!
//! Queries at least K digits long use their leading K digits as the key and
//! verify each candidate offset against the corpus, in ascending order.
//! Shorter queries take the smallest first offset across every key they
//! prefix, then fall back to the last K-1 corpus positions, which start no
//! K-digit window and so are absent from the index.

use crate::corpus::Corpus;
use crate::error::{PiError, Result};
use crate::index::reader::IndexReader;
use crate::index::types::Offset;
use tracing::trace;

/// Reject empty and non-digit queries
pub fn validate_query(query: &str) -> Result<&[u8]> {
    if query.is_empty() {
        return Err(PiError::Validation("query is empty".to_string()));
    }
    if let Some(c) = query.chars().find(|c| !c.is_ascii_digit()) {
        return Err(PiError::Validation(format!(
            "query {:?} contains non-digit {:?}",
            query, c
        )));
    }
    Ok(query.as_bytes())
}

/// Resolves queries against a corpus and the store built from it
pub struct QueryResolver<'a> {
    corpus: &'a Corpus,
    index: &'a IndexReader,
}

impl<'a> QueryResolver<'a> {
    pub fn new(corpus: &'a Corpus, index: &'a IndexReader) -> Self {
        Self { corpus, index }
    }

    /// Smallest offset where `query` occurs, or `None`
    pub fn find(&self, query: &str) -> Result<Option<Offset>> {
        let pattern = validate_query(query)?;

        if pattern.len() as u64 > self.corpus.len() {
            return Ok(None);
        }

        if pattern.len() >= self.index.prefix_len() {
            self.find_long(pattern)
        } else {
            self.find_short(pattern)
        }
    }

    /// Candidates from the key's postings, verified in ascending order
    fn find_long(&self, pattern: &[u8]) -> Result<Option<Offset>> {
        let key = self.index.layout().key_of(pattern);
        trace!("{} candidates for key {}", self.index.count(key), key);

        if pattern.len() == self.index.prefix_len() {
            return self.index.find_offset(key, |_| true);
        }

        self.index
            .find_offset(key, |offset| self.corpus.matches_at(offset, pattern))
    }

    /// Minimum over every key the pattern prefixes, then the unindexed tail
    fn find_short(&self, pattern: &[u8]) -> Result<Option<Offset>> {
        let (lo, hi) = self.index.layout().prefix_range(pattern);
        if let Some(offset) = self.index.min_offset_in_range(lo, hi)? {
            // Indexed offsets are all <= L-K, ahead of every tail position
            return Ok(Some(offset));
        }

        let k = self.index.prefix_len() as u64;
        let tail_start = (self.corpus.len() + 1).saturating_sub(k);
        trace!("no indexed key starts with {:?}, scanning tail from {}", pattern, tail_start);
        Ok(self.corpus.scan_first(pattern, tail_start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build::{build_index, BuildOptions};
    use std::fs;

    const PI_50: &str = "314159265358979323846264338327950288419716939937510";

    struct Fixture {
        _dir: tempfile::TempDir,
        corpus: Corpus,
        index: IndexReader,
    }

    fn fixture(content: &str, prefix_len: usize) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let corpus_path = dir.path().join("pi-digits");
        fs::write(&corpus_path, content).unwrap();
        let index_dir = dir.path().join("index");
        let options = BuildOptions {
            prefix_len,
            parallel_shards: 1,
            silent: true,
        };
        build_index(&corpus_path, &index_dir, &options).unwrap();

        Fixture {
            corpus: Corpus::open(&corpus_path).unwrap(),
            index: IndexReader::open(&index_dir).unwrap(),
            _dir: dir,
        }
    }

    #[test]
    fn test_validate_query() {
        assert_eq!(validate_query("1415").unwrap(), b"1415");
        assert!(matches!(validate_query(""), Err(PiError::Validation(_))));
        assert!(matches!(validate_query("14a5"), Err(PiError::Validation(_))));
        assert!(matches!(validate_query("-14"), Err(PiError::Validation(_))));
        assert!(matches!(validate_query("١٢"), Err(PiError::Validation(_))));
    }

    #[test]
    fn test_long_query_verifies_candidates() {
        let f = fixture(PI_50, 3);
        let resolver = QueryResolver::new(&f.corpus, &f.index);

        assert_eq!(resolver.find("26535").unwrap(), Some(6));
        // Key "264" has a single candidate at 21
        assert_eq!(resolver.find("2643").unwrap(), Some(21));
        // Key "265" exists but the longer query never verifies
        assert_eq!(resolver.find("2659").unwrap(), None);
        assert_eq!(resolver.find("99999").unwrap(), None);
    }

    #[test]
    fn test_exact_key_length() {
        let f = fixture(PI_50, 3);
        let resolver = QueryResolver::new(&f.corpus, &f.index);
        assert_eq!(resolver.find("314").unwrap(), Some(0));
        assert_eq!(resolver.find("510").unwrap(), Some(48));
        assert_eq!(resolver.find("000").unwrap(), None);
    }

    #[test]
    fn test_short_query_reaches_tail() {
        let f = fixture(PI_50, 3);
        let resolver = QueryResolver::new(&f.corpus, &f.index);

        assert_eq!(resolver.find("1").unwrap(), Some(1));
        assert_eq!(resolver.find("0").unwrap(), Some(32));
        // "10" only starts at 49, past the last window start (48)
        assert_eq!(resolver.find("10").unwrap(), Some(49));
        assert_eq!(resolver.find("00").unwrap(), None);
    }

    #[test]
    fn test_query_longer_than_corpus() {
        let f = fixture("3141", 3);
        let resolver = QueryResolver::new(&f.corpus, &f.index);
        assert_eq!(resolver.find("31415").unwrap(), None);
        assert_eq!(resolver.find("3141").unwrap(), Some(0));
    }

    #[test]
    fn test_corpus_shorter_than_prefix() {
        let f = fixture("31", 5);
        let resolver = QueryResolver::new(&f.corpus, &f.index);
        assert_eq!(resolver.find("1").unwrap(), Some(1));
        assert_eq!(resolver.find("31").unwrap(), Some(0));
        assert_eq!(resolver.find("4").unwrap(), None);
    }

    #[test]
    fn test_every_short_query_matches_scan() {
        let f = fixture(PI_50, 4);
        let resolver = QueryResolver::new(&f.corpus, &f.index);

        for len in 1..=4usize {
            for value in 0..10u64.pow(len as u32) {
                let query = format!("{:0width$}", value, width = len);
                assert_eq!(
                    resolver.find(&query).unwrap(),
                    f.corpus.scan_first(query.as_bytes(), 0),
                    "query {}",
                    query
                );
            }
        }
    }
}
