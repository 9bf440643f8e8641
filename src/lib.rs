//! # Rehost
//!
//! Extracts one region of a web page, moves its images to storage you
//! control, and emits the cleaned region as markup or as a script snippet.
//!
//! ## Modules
//!
//! - `core` - page processing pipeline, options and errors
//! - `parsers` - HTML parsing, traversal and tree transformations
//! - `network` - page/image fetching and blob sinks
//! - `builders` - output forms other than markup
//! - `utils` - URL helpers
//! - `env` - configuration from environment variables

pub mod builders;
pub mod core;
pub mod env;
pub mod network;
pub mod parsers;
pub mod utils;

// Re-export commonly used items for convenience
pub use core::*;
pub use network::*;
pub use parsers::*;
pub use utils::*;
