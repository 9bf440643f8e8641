//! Image rehosting
//!
//! `ImageResolver` visits image elements, fetches what their source
//! attributes point at, names the bytes after their digest and stores them
//! through a `BlobSink`. The element is then rewritten to reference the
//! stored copy.
//!
//! Two caches live for one page run:
//!
//! - URL → identifier: a URL seen before is never fetched again. The entry is
//!   recorded as soon as the digest is known, before anything is stored, so a
//!   failed store still gives repeat URLs a stable name.
//! - persisted identifiers: two URLs serving identical bytes are only stored once.
//!
//! Nothing here aborts a walk. Every attribute processed yields an
//! `ImageOutcome`; failures are logged and the node is left as it was.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::{self, Write};
use std::ops::ControlFlow;

use markup5ever_rcdom::{Handle, NodeData};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::core::RehostError;
use crate::network::session::ImageSource;
use crate::network::sink::BlobSink;
use crate::utils::url::{image_content_type, join_reference, path_extension, resolve_url, Url};

use super::dom::{create_text_node, replace_node, set_node_attr_at};
use super::walker::NodeVisitor;

/// Hash used to name rehosted images
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DigestAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Some(DigestAlgorithm::Sha1),
            "sha256" | "sha-256" => Some(DigestAlgorithm::Sha256),
            _ => None,
        }
    }
}

/// How a resolved image ends up referenced in the tree
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImageRewrite {
    /// Replace the source attribute's value
    #[default]
    Attribute,
    /// Replace the whole element with a text node holding the reference
    Text,
}

#[derive(Clone, Debug)]
pub struct ImageOptions {
    /// (tag, attribute) pairs that carry image URLs
    pub targets: Vec<(String, String)>,
    /// Prepended to the identifier to form the storage key
    pub key_prefix: String,
    /// When set, references become `<reference_base>/<identifier>`
    pub reference_base: Option<String>,
    pub rewrite: ImageRewrite,
    pub digest: DigestAlgorithm,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            targets: vec![("img".to_string(), "src".to_string())],
            key_prefix: String::new(),
            reference_base: None,
            rewrite: ImageRewrite::Attribute,
            digest: DigestAlgorithm::Sha1,
        }
    }
}

/// Per-run caches; create a fresh one for every page
#[derive(Debug, Default)]
pub struct ImageCache {
    url_to_identifier: HashMap<String, String>,
    persisted: HashSet<String>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identifier_for(&self, url: &str) -> Option<&str> {
        self.url_to_identifier.get(url).map(String::as_str)
    }

    pub fn is_persisted(&self, identifier: &str) -> bool {
        self.persisted.contains(identifier)
    }

    pub fn known_urls(&self) -> usize {
        self.url_to_identifier.len()
    }

    pub fn persisted_count(&self) -> usize {
        self.persisted.len()
    }
}

/// Which step of resolving an image failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFailure {
    Resolve,
    Fetch,
    Persist,
}

impl fmt::Display for ImageFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ImageFailure::Resolve => write!(f, "resolve"),
            ImageFailure::Fetch => write!(f, "fetch"),
            ImageFailure::Persist => write!(f, "persist"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageResult {
    /// Fetched and stored under a new identifier
    Stored(String),
    /// Fetched, but identical bytes were already stored from another URL
    Deduplicated(String),
    /// URL seen earlier in this run; nothing fetched
    Cached(String),
    /// Nothing to fetch (empty value or inline `data:` URL)
    Skipped,
    Failed { step: ImageFailure, reason: String },
}

impl ImageResult {
    pub fn identifier(&self) -> Option<&str> {
        match self {
            ImageResult::Stored(id) | ImageResult::Deduplicated(id) | ImageResult::Cached(id) => {
                Some(id)
            }
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ImageResult::Failed { .. })
    }
}

/// What happened to one image attribute
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageOutcome {
    /// The attribute value as found in the document
    pub source: String,
    /// Absolute URL, when resolution succeeded
    pub url: Option<String>,
    pub result: ImageResult,
}

/// Hashes bytes while buffering them for persistence
struct DigestBuffer {
    hasher: Hasher,
    buf: Vec<u8>,
}

enum Hasher {
    Sha1(Sha1),
    Sha256(Sha256),
}

impl DigestBuffer {
    fn new(algorithm: DigestAlgorithm) -> Self {
        let hasher = match algorithm {
            DigestAlgorithm::Sha1 => Hasher::Sha1(Sha1::new()),
            DigestAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
        };

        Self {
            hasher,
            buf: Vec::new(),
        }
    }

    /// Lowercase hex digest and the buffered bytes
    fn finish(self) -> (String, Vec<u8>) {
        let digest = match self.hasher {
            Hasher::Sha1(h) => to_hex(&h.finalize()),
            Hasher::Sha256(h) => to_hex(&h.finalize()),
        };
        (digest, self.buf)
    }
}

impl Write for DigestBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match &mut self.hasher {
            Hasher::Sha1(h) => h.update(data),
            Hasher::Sha256(h) => h.update(data),
        }
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Computes the identifier `hex(digest(data)) + extension`
pub fn image_identifier(data: &[u8], extension: &str, algorithm: DigestAlgorithm) -> String {
    let mut buffer = DigestBuffer::new(algorithm);
    let _ = buffer.write_all(data);
    let (digest, _) = buffer.finish();
    format!("{digest}{extension}")
}

/// Visitor rehosting images found in a subtree
pub struct ImageResolver<'a> {
    base_url: Url,
    source: &'a dyn ImageSource,
    sink: &'a dyn BlobSink,
    options: &'a ImageOptions,
    cache: ImageCache,
    outcomes: Vec<ImageOutcome>,
}

impl<'a> ImageResolver<'a> {
    pub fn new(
        base_url: Url,
        source: &'a dyn ImageSource,
        sink: &'a dyn BlobSink,
        options: &'a ImageOptions,
    ) -> Self {
        Self {
            base_url,
            source,
            sink,
            options,
            cache: ImageCache::new(),
            outcomes: Vec::new(),
        }
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    pub fn outcomes(&self) -> &[ImageOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<ImageOutcome> {
        self.outcomes
    }

    fn reference(&self, identifier: &str) -> String {
        match &self.options.reference_base {
            Some(base) => join_reference(base, identifier),
            None => identifier.to_string(),
        }
    }

    /// Turns an absolute image URL into an identifier, fetching and storing it if needed
    pub fn resolve(&mut self, image_url: &Url) -> ImageResult {
        let key = image_url.to_string();

        if let Some(identifier) = self.cache.identifier_for(&key) {
            debug!(url = %key, identifier, "image URL already resolved");
            return ImageResult::Cached(identifier.to_string());
        }

        let mut buffer = DigestBuffer::new(self.options.digest);
        if let Err(e) = self.source.fetch_image(image_url, &mut buffer) {
            return ImageResult::Failed {
                step: ImageFailure::Fetch,
                reason: e.to_string(),
            };
        }

        let extension = path_extension(image_url);
        let (digest, data) = buffer.finish();
        let identifier = format!("{digest}{extension}");
        self.cache
            .url_to_identifier
            .insert(key, identifier.clone());

        if self.cache.is_persisted(&identifier) {
            return ImageResult::Deduplicated(identifier);
        }

        let storage_key = format!("{}{}", self.options.key_prefix, identifier);
        match self
            .sink
            .put(&storage_key, &data, image_content_type(&extension))
        {
            Ok(()) => {
                self.cache.persisted.insert(identifier.clone());
                ImageResult::Stored(identifier)
            }
            Err(e) => ImageResult::Failed {
                step: ImageFailure::Persist,
                reason: e.to_string(),
            },
        }
    }

    fn resolve_attribute(&mut self, value: &str) -> ImageOutcome {
        let value_trimmed = value.trim();
        if value_trimmed.is_empty() || value_trimmed.starts_with("data:") {
            return ImageOutcome {
                source: value.to_string(),
                url: None,
                result: ImageResult::Skipped,
            };
        }

        match resolve_url(&self.base_url, value) {
            Ok(image_url) => {
                let result = self.resolve(&image_url);
                ImageOutcome {
                    source: value.to_string(),
                    url: Some(image_url.to_string()),
                    result,
                }
            }
            Err(e) => ImageOutcome {
                source: value.to_string(),
                url: None,
                result: ImageResult::Failed {
                    step: ImageFailure::Resolve,
                    reason: RehostError::Url {
                        input: value.to_string(),
                        source: e,
                    }
                    .to_string(),
                },
            },
        }
    }
}

impl NodeVisitor for ImageResolver<'_> {
    fn visit(&mut self, node: &Handle) -> ControlFlow<()> {
        let NodeData::Element { name, attrs, .. } = &node.data else {
            return ControlFlow::Continue(());
        };

        let tag = name.local.as_ref();
        let wanted: Vec<&str> = self
            .options
            .targets
            .iter()
            .filter(|(target_tag, _)| target_tag.eq_ignore_ascii_case(tag))
            .map(|(_, attr)| attr.as_str())
            .collect();
        if wanted.is_empty() {
            return ControlFlow::Continue(());
        }

        let candidates: Vec<(usize, String)> = attrs
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, attr)| wanted.iter().any(|w| *w == &*attr.name.local))
            .map(|(i, attr)| (i, attr.value.to_string()))
            .collect();

        let mut replacement: Option<String> = None;
        for (index, value) in candidates {
            let outcome = self.resolve_attribute(&value);

            match &outcome.result {
                ImageResult::Failed { step, reason } => {
                    warn!(source = %outcome.source, %step, "could not rehost image: {reason}");
                }
                ImageResult::Skipped => {}
                result => {
                    if let Some(identifier) = result.identifier() {
                        let reference = self.reference(identifier);
                        match self.options.rewrite {
                            ImageRewrite::Attribute => set_node_attr_at(node, index, &reference),
                            ImageRewrite::Text => replacement = Some(reference),
                        }
                    }
                }
            }

            self.outcomes.push(outcome);
        }

        if let Some(reference) = replacement {
            replace_node(node, create_text_node(&reference));
        }

        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha1_identifier_is_lowercase_hex_plus_extension() {
        assert_eq!(
            image_identifier(b"abc", ".png", DigestAlgorithm::Sha1),
            "a9993e364706816aba3e25717850c26c9cd0d89d.png"
        );
        assert_eq!(
            image_identifier(b"", "", DigestAlgorithm::Sha1),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }

    #[test]
    fn sha256_identifier() {
        assert_eq!(
            image_identifier(b"abc", ".gif", DigestAlgorithm::Sha256),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad.gif"
        );
    }

    #[test]
    fn digest_names() {
        assert_eq!(DigestAlgorithm::from_name("SHA1"), Some(DigestAlgorithm::Sha1));
        assert_eq!(DigestAlgorithm::from_name("sha-256"), Some(DigestAlgorithm::Sha256));
        assert_eq!(DigestAlgorithm::from_name("md5"), None);
    }

    #[test]
    fn result_identifiers() {
        assert_eq!(ImageResult::Cached("a.png".into()).identifier(), Some("a.png"));
        assert_eq!(ImageResult::Skipped.identifier(), None);
        assert!(ImageResult::Failed {
            step: ImageFailure::Fetch,
            reason: String::new()
        }
        .is_failure());
    }
}
