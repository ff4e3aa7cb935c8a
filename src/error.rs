//! Error types for index building, lookups and range reads

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the corpus, the index store and the query layer.
///
/// A query with no occurrence is not an error: [`crate::PiSearch::find`]
/// returns `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum PiError {
    /// Invalid build or startup parameters (prefix length, paths, corpus bytes)
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A corpus or store file could not be read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed query passed to the resolver
    #[error("Invalid query: {0}")]
    Validation(String),

    /// Range bounds outside the corpus
    #[error("Range {start}:{end} is invalid for a corpus of {len} digits")]
    Range { start: u64, end: u64, len: u64 },

    /// The index store or corpus cannot be used at query time
    #[error("Not available: {0}")]
    NotAvailable(String),
}

impl PiError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PiError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the request itself was bad and the caller may keep serving
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, PiError::Validation(_) | PiError::Range { .. })
    }

    /// True when the store or corpus could not be used
    pub fn is_unavailable(&self) -> bool {
        matches!(self, PiError::NotAvailable(_) | PiError::Io { .. })
    }

    /// Re-tag an I/O failure as unavailability, for the read path
    pub fn into_unavailable(self) -> Self {
        match self {
            PiError::Io { path, source } => {
                PiError::NotAvailable(format!("{}: {}", path.display(), source))
            }
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, PiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_message() {
        let err = PiError::Range {
            start: 10,
            end: 5,
            len: 51,
        };
        let msg = err.to_string();
        assert!(msg.contains("10:5"));
        assert!(msg.contains("51"));
        assert!(err.is_invalid_request());
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_io_becomes_unavailable() {
        let err = PiError::io(
            "/missing/pi-digits",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_unavailable());

        let err = err.into_unavailable();
        assert!(matches!(err, PiError::NotAvailable(ref m) if m.contains("/missing/pi-digits")));
    }
}
