//! Typed environment-variable configuration
//!
//! Every setting is a unit struct implementing `EnvVar`: its name, a
//! description, an optional default and a parser. `EnvConfig` gathers them.
//! Lookups go through a function so that configuration can be assembled from
//! something other than the process environment (a test table, say).

use std::env;
use std::fmt;

use crate::core::{OutputMode, RehostError, RehostOptions};
use crate::network::sink::{BlobSink, BucketConfig, BucketSink, DirectorySink};
use crate::parsers::html::{DigestAlgorithm, ImageOptions, ImageRewrite};
use crate::utils::url::Url;

/// Environment variable parse error
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// Reads a variable by name
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Looks variables up in the process environment
pub fn process_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

pub trait EnvVar<T> {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn default_value() -> Option<T> {
        None
    }

    /// Parsed value, the default when unset or empty, `None` when neither exists
    fn get_from(lookup: Lookup) -> EnvResult<Option<T>> {
        match lookup(Self::NAME) {
            Some(value) if !value.trim().is_empty() => Self::parse(value.trim()).map(Some),
            _ => Ok(Self::default_value()),
        }
    }

    fn get() -> EnvResult<Option<T>> {
        Self::get_from(&process_env)
    }
}

fn invalid(variable: &str, message: String) -> EnvError {
    EnvError {
        variable: variable.to_string(),
        message,
    }
}

/// Logging
pub mod general {
    use super::*;

    pub struct LogLevel;
    impl EnvVar<tracing::Level> for LogLevel {
        const NAME: &'static str = "REHOST_LOG_LEVEL";
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn default_value() -> Option<tracing::Level> {
            Some(tracing::Level::INFO)
        }

        fn parse(value: &str) -> EnvResult<tracing::Level> {
            value.parse().map_err(|_| {
                invalid(
                    Self::NAME,
                    format!("Invalid log level '{value}'. Use: trace, debug, info, warn, error"),
                )
            })
        }
    }

    pub struct Pages;
    impl EnvVar<Vec<String>> for Pages {
        const NAME: &'static str = "REHOST_PAGES";
        const DESCRIPTION: &'static str = "Pages to process (comma-separated URLs or paths)";

        fn parse(value: &str) -> EnvResult<Vec<String>> {
            Ok(value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect())
        }
    }
}

/// What to extract and how to emit it
pub mod extract {
    use super::*;

    pub struct RegionId;
    impl EnvVar<String> for RegionId {
        const NAME: &'static str = "REHOST_REGION_ID";
        const DESCRIPTION: &'static str = "id of the element to extract";

        fn default_value() -> Option<String> {
            Some("main-content".to_string())
        }

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.to_string())
        }
    }

    pub struct Output;
    impl EnvVar<OutputMode> for Output {
        const NAME: &'static str = "REHOST_OUTPUT";
        const DESCRIPTION: &'static str = "Output form: markup or snippet";

        fn default_value() -> Option<OutputMode> {
            Some(OutputMode::Markup)
        }

        fn parse(value: &str) -> EnvResult<OutputMode> {
            OutputMode::from_name(value).ok_or_else(|| {
                invalid(
                    Self::NAME,
                    format!("Invalid output '{value}'. Use: markup, snippet"),
                )
            })
        }
    }

    pub struct SnippetMarker;
    impl EnvVar<String> for SnippetMarker {
        const NAME: &'static str = "REHOST_SNIPPET_MARKER";
        const DESCRIPTION: &'static str = "Class substring marking elements to emit as snippets";

        fn default_value() -> Option<String> {
            Some("story-tile".to_string())
        }

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.to_string())
        }
    }

    pub struct SnippetContainer;
    impl EnvVar<String> for SnippetContainer {
        const NAME: &'static str = "REHOST_SNIPPET_CONTAINER";
        const DESCRIPTION: &'static str = "Selector of the snippet container (default: #<region id>)";

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.to_string())
        }
    }
}

/// Image naming and referencing
pub mod images {
    use super::*;

    pub struct KeyPrefix;
    impl EnvVar<String> for KeyPrefix {
        const NAME: &'static str = "REHOST_KEY_PREFIX";
        const DESCRIPTION: &'static str = "Prefix of storage keys (e.g. cc/img/)";

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.trim_start_matches('/').to_string())
        }
    }

    pub struct AssetBaseUrl;
    impl EnvVar<String> for AssetBaseUrl {
        const NAME: &'static str = "REHOST_ASSET_BASE_URL";
        const DESCRIPTION: &'static str = "Base prepended to identifiers in rewritten references";

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.to_string())
        }
    }

    pub struct Digest;
    impl EnvVar<DigestAlgorithm> for Digest {
        const NAME: &'static str = "REHOST_DIGEST";
        const DESCRIPTION: &'static str = "Digest naming rehosted images: sha1 or sha256";

        fn default_value() -> Option<DigestAlgorithm> {
            Some(DigestAlgorithm::Sha1)
        }

        fn parse(value: &str) -> EnvResult<DigestAlgorithm> {
            DigestAlgorithm::from_name(value).ok_or_else(|| {
                invalid(
                    Self::NAME,
                    format!("Invalid digest '{value}'. Use: sha1, sha256"),
                )
            })
        }
    }

    pub struct Rewrite;
    impl EnvVar<ImageRewrite> for Rewrite {
        const NAME: &'static str = "REHOST_IMAGE_REWRITE";
        const DESCRIPTION: &'static str = "Where references go: attribute or text";

        fn default_value() -> Option<ImageRewrite> {
            Some(ImageRewrite::Attribute)
        }

        fn parse(value: &str) -> EnvResult<ImageRewrite> {
            match value.to_ascii_lowercase().as_str() {
                "attribute" | "attr" => Ok(ImageRewrite::Attribute),
                "text" => Ok(ImageRewrite::Text),
                _ => Err(invalid(
                    Self::NAME,
                    format!("Invalid rewrite '{value}'. Use: attribute, text"),
                )),
            }
        }
    }
}

/// Where image bytes are persisted
pub mod storage {
    use super::*;

    pub struct OutputDir;
    impl EnvVar<String> for OutputDir {
        const NAME: &'static str = "REHOST_OUTPUT_DIR";
        const DESCRIPTION: &'static str = "Local directory receiving images";

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.to_string())
        }
    }

    pub struct Bucket;
    impl EnvVar<String> for Bucket {
        const NAME: &'static str = "REHOST_BUCKET";
        const DESCRIPTION: &'static str = "Remote bucket receiving images";

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.to_string())
        }
    }

    pub struct Region;
    impl EnvVar<String> for Region {
        const NAME: &'static str = "REHOST_REGION";
        const DESCRIPTION: &'static str = "Region of the remote bucket";

        fn default_value() -> Option<String> {
            Some("us-east-1".to_string())
        }

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.to_string())
        }
    }

    pub struct BucketEndpoint;
    impl EnvVar<Url> for BucketEndpoint {
        const NAME: &'static str = "REHOST_BUCKET_ENDPOINT";
        const DESCRIPTION: &'static str = "S3-compatible server holding the bucket, instead of AWS";

        fn parse(value: &str) -> EnvResult<Url> {
            let url = Url::parse(value)
                .map_err(|e| invalid(Self::NAME, format!("Invalid URL '{value}': {e}")))?;
            match url.scheme() {
                "http" | "https" => Ok(url),
                _ => Err(invalid(
                    Self::NAME,
                    "Endpoint must start with http:// or https://".to_string(),
                )),
            }
        }
    }
}

/// HTTP client
pub mod http {
    use super::*;

    pub struct Timeout;
    impl EnvVar<u64> for Timeout {
        const NAME: &'static str = "REHOST_TIMEOUT";
        const DESCRIPTION: &'static str = "Request timeout in seconds, 0 waits forever";

        fn default_value() -> Option<u64> {
            Some(0)
        }

        fn parse(value: &str) -> EnvResult<u64> {
            value
                .parse()
                .map_err(|_| invalid(Self::NAME, "Must be a whole number of seconds".to_string()))
        }
    }

    pub struct UserAgent;
    impl EnvVar<String> for UserAgent {
        const NAME: &'static str = "REHOST_USER_AGENT";
        const DESCRIPTION: &'static str = "User-Agent header sent with every request";

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.to_string())
        }
    }
}

/// Settings gathered from the environment
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub log_level: tracing::Level,
    pub pages: Vec<String>,

    pub region_id: String,
    pub output: OutputMode,
    pub snippet_marker: String,
    pub snippet_container: Option<String>,

    pub key_prefix: String,
    pub asset_base_url: Option<String>,
    pub digest: DigestAlgorithm,
    pub rewrite: ImageRewrite,

    pub output_dir: Option<String>,
    pub bucket: Option<String>,
    pub region: String,
    pub bucket_endpoint: Option<Url>,

    pub timeout: u64,
    pub user_agent: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> EnvResult<Self> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: Lookup) -> EnvResult<Self> {
        Ok(Self {
            log_level: general::LogLevel::get_from(lookup)?.unwrap_or(tracing::Level::INFO),
            pages: general::Pages::get_from(lookup)?.unwrap_or_default(),

            region_id: extract::RegionId::get_from(lookup)?.unwrap_or_default(),
            output: extract::Output::get_from(lookup)?.unwrap_or_default(),
            snippet_marker: extract::SnippetMarker::get_from(lookup)?.unwrap_or_default(),
            snippet_container: extract::SnippetContainer::get_from(lookup)?,

            key_prefix: images::KeyPrefix::get_from(lookup)?.unwrap_or_default(),
            asset_base_url: images::AssetBaseUrl::get_from(lookup)?,
            digest: images::Digest::get_from(lookup)?.unwrap_or_default(),
            rewrite: images::Rewrite::get_from(lookup)?.unwrap_or_default(),

            output_dir: storage::OutputDir::get_from(lookup)?,
            bucket: storage::Bucket::get_from(lookup)?,
            region: storage::Region::get_from(lookup)?.unwrap_or_default(),
            bucket_endpoint: storage::BucketEndpoint::get_from(lookup)?,

            timeout: http::Timeout::get_from(lookup)?.unwrap_or_default(),
            user_agent: http::UserAgent::get_from(lookup)?,
        })
    }

    pub fn validate(&self) -> EnvResult<()> {
        if self.region_id.is_empty() {
            return Err(invalid(
                extract::RegionId::NAME,
                "Region id cannot be empty".to_string(),
            ));
        }

        if self.output_dir.is_some() && (self.bucket.is_some() || self.bucket_endpoint.is_some()) {
            return Err(invalid(
                storage::OutputDir::NAME,
                "Choose either a local directory or a bucket, not both".to_string(),
            ));
        }

        if self.bucket_endpoint.is_some() && self.bucket.is_none() {
            return Err(invalid(
                storage::BucketEndpoint::NAME,
                format!("An endpoint needs a bucket; set {}", storage::Bucket::NAME),
            ));
        }

        Ok(())
    }

    pub fn to_options(&self) -> RehostOptions {
        RehostOptions {
            region_id: self.region_id.clone(),
            output_mode: self.output,
            snippet_marker: self.snippet_marker.clone(),
            snippet_container: self.snippet_container.clone(),
            images: ImageOptions {
                key_prefix: self.key_prefix.clone(),
                reference_base: self.asset_base_url.clone(),
                rewrite: self.rewrite,
                digest: self.digest,
                ..ImageOptions::default()
            },
            timeout: self.timeout,
            user_agent: self.user_agent.clone(),
        }
    }

    /// Sends images to a local directory, forgetting any bucket
    pub fn select_output_dir(&mut self, dir: String) {
        self.output_dir = Some(dir);
        self.bucket = None;
        self.bucket_endpoint = None;
    }

    /// Sends images to `bucket`; `endpoint` replaces whatever endpoint was configured
    pub fn select_bucket(&mut self, bucket: String, endpoint: Option<Url>) {
        self.bucket = Some(bucket);
        self.bucket_endpoint = endpoint;
        self.output_dir = None;
    }

    pub fn bucket_config(&self) -> Option<BucketConfig> {
        self.bucket.as_ref().map(|bucket| BucketConfig {
            bucket: bucket.clone(),
            region: self.region.clone(),
            endpoint: self.bucket_endpoint.clone(),
            timeout: self.timeout,
        })
    }

    /// Builds the configured blob sink
    pub fn sink(&self) -> Result<Box<dyn BlobSink>, RehostError> {
        if let Some(dir) = &self.output_dir {
            return Ok(Box::new(DirectorySink::new(dir)));
        }

        if let Some(bucket) = self.bucket_config() {
            return Ok(Box::new(BucketSink::new(&bucket)?));
        }

        Err(RehostError::Config(format!(
            "no image destination; set {} or {}",
            storage::OutputDir::NAME,
            storage::Bucket::NAME
        )))
    }
}

fn describe<V: EnvVar<T>, T>(docs: &mut String) {
    docs.push_str(&format!("- `{}`: {}\n", V::NAME, V::DESCRIPTION));
}

/// Markdown list of every variable
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables\n\n");

    docs.push_str("## General\n\n");
    describe::<general::LogLevel, _>(&mut docs);
    describe::<general::Pages, _>(&mut docs);

    docs.push_str("\n## Extraction\n\n");
    describe::<extract::RegionId, _>(&mut docs);
    describe::<extract::Output, _>(&mut docs);
    describe::<extract::SnippetMarker, _>(&mut docs);
    describe::<extract::SnippetContainer, _>(&mut docs);

    docs.push_str("\n## Images\n\n");
    describe::<images::KeyPrefix, _>(&mut docs);
    describe::<images::AssetBaseUrl, _>(&mut docs);
    describe::<images::Digest, _>(&mut docs);
    describe::<images::Rewrite, _>(&mut docs);

    docs.push_str("\n## Storage\n\n");
    describe::<storage::OutputDir, _>(&mut docs);
    describe::<storage::Bucket, _>(&mut docs);
    describe::<storage::Region, _>(&mut docs);
    describe::<storage::BucketEndpoint, _>(&mut docs);

    docs.push_str("\n## HTTP\n\n");
    describe::<http::Timeout, _>(&mut docs);
    describe::<http::UserAgent, _>(&mut docs);

    docs
}
