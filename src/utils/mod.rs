//! # Utility module
//!
//! - `url` - URL resolution, path extensions and content types for rehosted images

pub mod url;

// Re-export commonly used items for convenience
pub use url::{image_content_type, join_reference, path_extension, resolve_url, Url};
