//! # Network module
//!
//! - `session` - HTTP session, page and image sources
//! - `sink` - blob sinks for rehosted images (local directory, remote bucket)

pub mod session;
pub mod sink;

// Re-export commonly used items for convenience
pub use session::{ImageSource, Page, PageSource, Session};
pub use sink::{BlobSink, BucketSink, DirectorySink};
