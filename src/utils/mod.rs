//! Utility functions shared by the builder, the reader and the CLI.
//!
//! ## Modules
//!
//! - [`app_data`] - Configuration and the application data directory
//! - [`encoding`] - Varint and delta encoding for postings lists
//! - [`progress`] - Progress bars that compile away without the `progress` feature

pub mod app_data;
pub mod encoding;
pub mod progress;

pub use app_data::*;
pub use encoding::*;
