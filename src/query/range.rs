use crate::corpus::Corpus;
use crate::error::{PiError, Result};
use crate::index::types::Offset;

/// Direct reads of corpus digit ranges, without the index
pub struct RangeReader<'a> {
    corpus: &'a Corpus,
}

impl<'a> RangeReader<'a> {
    pub fn new(corpus: &'a Corpus) -> Self {
        Self { corpus }
    }

    /// Digits in `[start, end)`; requires `start < end <= L`
    pub fn read(&self, start: Offset, end: Offset) -> Result<&'a str> {
        let digits = self.corpus.slice(start, end).ok_or(PiError::Range {
            start,
            end,
            len: self.corpus.len(),
        })?;
        // A validated corpus is ASCII digits only; anything else is a corpus
        // that was swapped out under us.
        std::str::from_utf8(digits).map_err(|_| {
            PiError::NotAvailable(format!(
                "{} holds non-digit bytes in {}:{}",
                self.corpus.path().display(),
                start,
                end
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const PI_50: &str = "314159265358979323846264338327950288419716939937510";

    #[test]
    fn test_read_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pi-digits");
        fs::write(&path, format!("{}\n", PI_50)).unwrap();
        let corpus = Corpus::open(&path).unwrap();
        let reader = RangeReader::new(&corpus);

        assert_eq!(reader.read(6, 11).unwrap(), "26535");
        assert_eq!(reader.read(0, 3).unwrap(), "314");
        assert_eq!(reader.read(3, 6).unwrap(), "159");
        assert_eq!(reader.read(0, 6).unwrap(), "314159");
        assert_eq!(reader.read(50, 51).unwrap(), "0");
        assert_eq!(reader.read(0, 51).unwrap(), PI_50);
    }

    #[test]
    fn test_invalid_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pi-digits");
        fs::write(&path, PI_50).unwrap();
        let corpus = Corpus::open(&path).unwrap();
        let reader = RangeReader::new(&corpus);

        for (start, end) in [(5, 5), (6, 3), (0, 52), (51, 52), (u64::MAX - 1, u64::MAX)] {
            let err = reader.read(start, end).unwrap_err();
            assert!(
                matches!(err, PiError::Range { len: 51, .. }),
                "{}:{} should be rejected",
                start,
                end
            );
        }
    }
}
