//! Query resolution and range reads
//!
//! - [`resolver`] - First occurrence of a digit string via the prefix index
//! - [`range`] - Direct reads of corpus digit ranges

pub mod range;
pub mod resolver;

pub use range::RangeReader;
pub use resolver::{validate_query, QueryResolver};
