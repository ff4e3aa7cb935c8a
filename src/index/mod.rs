pub mod build;
pub mod reader;
pub mod stats;
pub mod store;
pub mod types;
pub mod writer;

pub use build::{build_index, BuildOptions, BuildReport};
pub use reader::IndexReader;
pub use store::StorePaths;
pub use types::*;
