//! HTML tree handling
//!
//! - `dom`: parsing and basic node operations
//! - `walker`: document-order traversal, id/class lookups
//! - `whitespace`: comment stripping and whitespace collapsing
//! - `images`: image rehosting
//! - `metadata`: charset declared by the document
//! - `serializer`: markup output

pub mod dom;
pub mod images;
pub mod metadata;
pub mod serializer;
pub mod walker;
pub mod whitespace;

pub use dom::{detach_node, get_node_attr, get_node_name, html_to_dom};
pub use images::{
    image_identifier, DigestAlgorithm, ImageCache, ImageFailure, ImageOptions, ImageOutcome,
    ImageResolver, ImageResult, ImageRewrite,
};
pub use metadata::get_charset;
pub use serializer::{serialize_children, serialize_node};
pub use walker::{find_node_by_id, walk, NodeVisitor, Noop};
pub use whitespace::{normalize_whitespace, TextNormalizer};
