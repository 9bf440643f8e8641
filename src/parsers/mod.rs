//! # Parsers module
//!
//! - `html` - HTML parsing, traversal and the tree transformations applied to a page region

pub mod html;

// Re-export commonly used items for convenience
pub use html::{
    find_node_by_id, html_to_dom, normalize_whitespace, serialize_node, walk, ImageResolver,
    NodeVisitor, TextNormalizer,
};
