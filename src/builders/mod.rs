//! # Builders module
//!
//! Output forms other than plain markup:
//!
//! - `snippet` - script statements injecting marked elements into a live page

pub mod snippet;

// Re-export commonly used items for convenience
pub use snippet::{js_string_literal, SnippetBuilder, SnippetConfig};
