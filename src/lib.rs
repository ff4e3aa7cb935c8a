//! # piscan - indexed digit search over pi
//!
//! piscan answers two questions about a large, fixed digit corpus (the
//! decimal expansion of pi): where does a digit string first occur, and which
//! digits occupy a given offset range.
//!
//! ## Architecture
//!
//! - [`corpus`] - Memory-mapped, read-only digit sequence
//! - [`index`] - Offline builder and reader for the K-digit prefix index
//! - [`query`] - First-occurrence resolution and range reads
//! - [`service`] - [`PiSearch`], the shared read-only service object
//! - [`output`] - Plain and JSON rendering of results for the CLI
//! - [`utils`] - Configuration, postings encoding, progress bars
//!
//! ## Quick Start
//!
//! ```no_run
//! use piscan::index::{build_index, BuildOptions};
//! use piscan::PiSearch;
//! use std::path::Path;
//!
//! let corpus = Path::new("/data/pi-digits");
//! let index_dir = Path::new("/data/index");
//!
//! // One-shot, offline: scan the corpus and publish a store
//! build_index(corpus, index_dir, &BuildOptions::default()).unwrap();
//!
//! // At startup: open once, share across threads
//! let search = PiSearch::open(corpus, index_dir).unwrap();
//! assert_eq!(search.range(0, 6).unwrap(), "314159");
//! println!("{:?}", search.find("26535").unwrap());
//! ```
//!
//! ## Index store
//!
//! For every K-digit window of the corpus the store records the window's
//! offset under the window's digits. Keys are sharded by their leading digits;
//! each shard keeps a sorted dictionary, which serves both exact lookups and
//! the prefix range scans that queries shorter than K need. Rebuilds write a
//! new generation directory and switch a `CURRENT` pointer atomically.

pub mod corpus;
pub mod error;
pub mod index;
pub mod output;
pub mod query;
pub mod service;
pub mod utils;

pub use error::{PiError, Result};
pub use service::PiSearch;
