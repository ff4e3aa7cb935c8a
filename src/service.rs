//! Long-lived search service
//!
//! Opens the corpus and the published store once and answers `find` and
//! `range` from any number of threads. Both handles are read-only mappings,
//! so the service is `Send + Sync` and needs no locking.

use crate::corpus::Corpus;
use crate::error::{PiError, Result};
use crate::index::reader::IndexReader;
use crate::index::types::Offset;
use crate::query::{QueryResolver, RangeReader};
use std::path::Path;
use tracing::{debug, info};

pub struct PiSearch {
    corpus: Corpus,
    index: IndexReader,
}

impl PiSearch {
    /// Open the corpus and the store generation `CURRENT` points at
    ///
    /// Fails with `NotAvailable` when either cannot be opened, or when the
    /// store was built from a corpus of a different length.
    pub fn open(corpus_path: &Path, index_dir: &Path) -> Result<Self> {
        let corpus = Corpus::open(corpus_path).map_err(PiError::into_unavailable)?;
        let index = IndexReader::open(index_dir)?;

        if index.meta.corpus_len != corpus.len() {
            return Err(PiError::NotAvailable(format!(
                "index in {} was built for {} digits, {} holds {}",
                index.generation_dir().display(),
                index.meta.corpus_len,
                corpus_path.display(),
                corpus.len()
            )));
        }

        info!(
            "Serving {} digits from {} with index {} (K={})",
            corpus.len(),
            corpus_path.display(),
            index.generation_dir().display(),
            index.prefix_len()
        );

        Ok(Self { corpus, index })
    }

    /// Smallest offset where `query` occurs; `None` when it never does
    pub fn find(&self, query: &str) -> Result<Option<Offset>> {
        let result = QueryResolver::new(&self.corpus, &self.index).find(query);
        debug!("find {:?} => {:?}", query, result);
        result
    }

    /// Digits in `[start, end)`
    pub fn range(&self, start: Offset, end: Offset) -> Result<String> {
        RangeReader::new(&self.corpus)
            .read(start, end)
            .map(str::to_owned)
    }

    /// Number of digits in the corpus
    pub fn corpus_len(&self) -> u64 {
        self.corpus.len()
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn index(&self) -> &IndexReader {
        &self.index
    }
}
