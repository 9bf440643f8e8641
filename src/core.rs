use std::io::Write;

use encoding_rs::Encoding;
use markup5ever_rcdom::RcDom;
use thiserror::Error;
use tracing::{info, warn};

use crate::builders::snippet::{SnippetBuilder, SnippetConfig};
use crate::env::EnvError;
use crate::network::session::{ImageSource, PageSource};
use crate::network::sink::BlobSink;
use crate::parsers::html::{
    find_node_by_id, get_charset, html_to_dom, serialize_node, walk, ImageOptions, ImageOutcome,
    ImageResolver, TextNormalizer,
};
use crate::utils::url::Url;

/// Represents errors that can occur while processing a page
///
/// Only a few of these end a run: failing to fetch or parse the page, or
/// not finding the region of interest in it. Everything that goes wrong with
/// a single image is reported through `ImageOutcome` instead.
#[derive(Debug, Error)]
pub enum RehostError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to parse document: {0}")]
    Parse(#[source] std::io::Error),

    #[error("no element with id \"{0}\" in document")]
    RegionNotFound(String),

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid URL \"{input}\": {source}")]
    Url {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to store {key}: {message}")]
    Storage { key: String, message: String },

    #[error(transparent)]
    Env(#[from] EnvError),
}

/// Supported output forms for a processed region
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// The region serialized back into markup (default)
    #[default]
    Markup,
    /// Script statements injecting marked elements into a live page
    Snippet,
}

impl OutputMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "markup" | "html" => Some(OutputMode::Markup),
            "snippet" | "js" => Some(OutputMode::Snippet),
            _ => None,
        }
    }
}

/// Configuration options for processing pages
#[derive(Clone, Debug)]
pub struct RehostOptions {
    /// `id` of the element to extract
    pub region_id: String,
    pub output_mode: OutputMode,
    pub snippet_marker: String,
    /// Defaults to `#<region_id>`
    pub snippet_container: Option<String>,
    pub images: ImageOptions,
    /// Seconds; 0 waits forever
    pub timeout: u64,
    pub user_agent: Option<String>,
}

impl Default for RehostOptions {
    fn default() -> Self {
        Self {
            region_id: "main-content".to_string(),
            output_mode: OutputMode::Markup,
            snippet_marker: "story-tile".to_string(),
            snippet_container: None,
            images: ImageOptions::default(),
            timeout: 0,
            user_agent: None,
        }
    }
}

impl RehostOptions {
    pub fn snippet_config(&self) -> SnippetConfig {
        SnippetConfig {
            container: self
                .snippet_container
                .clone()
                .unwrap_or_else(|| format!("#{}", self.region_id)),
            marker: self.snippet_marker.clone(),
        }
    }
}

/// Result of processing one page
#[derive(Debug)]
pub struct PageReport {
    pub base_url: Url,
    pub output: String,
    pub images: Vec<ImageOutcome>,
    pub comments_removed: usize,
    pub text_nodes: usize,
}

impl PageReport {
    pub fn failed_images(&self) -> impl Iterator<Item = &ImageOutcome> {
        self.images.iter().filter(|outcome| outcome.result.is_failure())
    }
}

/// Processes a whole page: fetch, extract, rehost, clean, emit
pub fn process_page<S>(
    session: &S,
    sink: &dyn BlobSink,
    options: &RehostOptions,
    target: &str,
) -> Result<PageReport, RehostError>
where
    S: PageSource + ImageSource,
{
    let page = session.fetch_page(target)?;
    let input_encoding = Some(page.charset.as_str()).filter(|charset| !charset.is_empty());

    process_document(
        &page.data,
        input_encoding,
        &page.final_url,
        session,
        sink,
        options,
    )
}

/// Processes already-fetched page bytes
///
/// `base_url` is where the page came from; relative image references are
/// resolved against it.
pub fn process_document(
    input_data: &[u8],
    input_encoding: Option<&str>,
    base_url: &Url,
    images: &dyn ImageSource,
    sink: &dyn BlobSink,
    options: &RehostOptions,
) -> Result<PageReport, RehostError> {
    let dom = parse_with_declared_charset(input_data, input_encoding)?;

    let region = find_node_by_id(&dom.document, &options.region_id)
        .ok_or_else(|| RehostError::RegionNotFound(options.region_id.clone()))?;

    let mut resolver = ImageResolver::new(base_url.clone(), images, sink, &options.images);
    let _ = walk(&region, &mut resolver);
    let image_outcomes = resolver.into_outcomes();

    let mut normalizer = TextNormalizer::new();
    let _ = walk(&region, &mut normalizer);

    let output = match options.output_mode {
        OutputMode::Markup => {
            let mut markup = serialize_node(&region);
            if !markup.ends_with('\n') {
                markup.push('\n');
            }
            markup
        }
        OutputMode::Snippet => {
            let config = options.snippet_config();
            SnippetBuilder::new(&config).build(&region)
        }
    };

    let report = PageReport {
        base_url: base_url.clone(),
        output,
        images: image_outcomes,
        comments_removed: normalizer.comments_removed,
        text_nodes: normalizer.text_nodes,
    };

    info!(
        url = %report.base_url,
        images = report.images.len(),
        failed = report.failed_images().count(),
        comments_removed = report.comments_removed,
        "processed page"
    );

    Ok(report)
}

/// Processes pages one after another, writing each output to `out`
///
/// Stops at the first page that cannot be processed.
pub fn run<S>(
    session: &S,
    sink: &dyn BlobSink,
    options: &RehostOptions,
    targets: &[String],
    out: &mut dyn Write,
) -> Result<Vec<PageReport>, RehostError>
where
    S: PageSource + ImageSource,
{
    let mut reports = Vec::with_capacity(targets.len());

    for target in targets {
        let report = process_page(session, sink, options, target)?;

        out.write_all(report.output.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|source| RehostError::Io {
                path: "<output>".to_string(),
                source,
            })?;

        reports.push(report);
    }

    Ok(reports)
}

/// Parses the page, honouring a `<meta charset>` it declares
fn parse_with_declared_charset(
    input_data: &[u8],
    input_encoding: Option<&str>,
) -> Result<RcDom, RehostError> {
    let document_encoding = input_encoding.unwrap_or("utf-8");
    let dom = html_to_dom(input_data, document_encoding)?;

    if let Some(html_charset) = get_charset(&dom.document) {
        if let Some(declared) = Encoding::for_label_no_replacement(html_charset.as_bytes()) {
            let current = Encoding::for_label(document_encoding.as_bytes());
            if current != Some(declared) {
                return html_to_dom(input_data, declared.name());
            }
        } else if !html_charset.is_empty() {
            warn!(charset = %html_charset, "ignoring unknown charset declared by document");
        }
    }

    Ok(dom)
}

/// Parses Content-Type header value
pub fn parse_content_type(content_type: &str) -> (String, String, bool) {
    let mut media_type = String::new();
    let mut charset = String::new();
    let mut is_base64 = false;

    let parts: Vec<&str> = content_type.split(';').collect();

    if let Some(first) = parts.first() {
        media_type = first.trim().to_lowercase();
    }

    for part in parts.iter().skip(1) {
        let part = part.trim();
        if let Some(value) = part.strip_prefix("charset=") {
            charset = value.trim_matches('"').to_string();
        } else if part == "base64" {
            is_base64 = true;
        }
    }

    (media_type, charset, is_base64)
}
