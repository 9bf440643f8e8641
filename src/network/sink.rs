//! Blob sinks: where rehosted image bytes end up
//!
//! The pipeline only needs `put`; whether that lands on local disk or in a
//! remote bucket is decided by configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use tokio::runtime::Runtime;
use tracing::debug;

use crate::core::RehostError;
use crate::utils::url::Url;

/// Persistence target for rehosted images
pub trait BlobSink {
    /// Stores `data` under `key`
    fn put(&self, key: &str, data: &[u8], content_type: Option<&str>) -> Result<(), RehostError>;
}

/// Writes blobs as files below a root directory, `key` being the relative path
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BlobSink for DirectorySink {
    fn put(&self, key: &str, data: &[u8], _content_type: Option<&str>) -> Result<(), RehostError> {
        let path = self.root.join(key);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| RehostError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }

        fs::write(&path, data).map_err(|source| RehostError::Io {
            path: path.display().to_string(),
            source,
        })?;

        debug!(path = %path.display(), bytes = data.len(), "wrote image");
        Ok(())
    }
}

/// Where and how to reach a remote bucket
#[derive(Debug, Clone)]
pub struct BucketConfig {
    pub bucket: String,
    pub region: String,
    /// S3-compatible server to use instead of AWS
    pub endpoint: Option<Url>,
    /// Seconds; 0 waits forever
    pub timeout: u64,
}

/// Uploads blobs to an S3 bucket as world-readable objects
///
/// Requests are signed with credentials from the standard AWS chain
/// (environment, shared profile, instance metadata) unless explicit ones
/// are given. Uploads block on a private current-thread runtime.
#[derive(Debug)]
pub struct BucketSink {
    runtime: Runtime,
    client: Client,
    bucket: String,
}

impl BucketSink {
    pub fn new(config: &BucketConfig) -> Result<Self, RehostError> {
        Self::build(config, None)
    }

    pub fn with_credentials(
        config: &BucketConfig,
        credentials: Credentials,
    ) -> Result<Self, RehostError> {
        Self::build(config, Some(credentials))
    }

    fn build(config: &BucketConfig, credentials: Option<Credentials>) -> Result<Self, RehostError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| RehostError::Io {
                path: "async runtime".to_string(),
                source,
            })?;

        let sdk_config = runtime.block_on(async {
            let mut loader = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(config.region.clone()));
            if let Some(endpoint) = &config.endpoint {
                loader = loader.endpoint_url(endpoint.as_str().trim_end_matches('/'));
            }
            if let Some(credentials) = credentials {
                loader = loader.credentials_provider(credentials);
            }
            if config.timeout > 0 {
                loader = loader.timeout_config(
                    TimeoutConfig::builder()
                        .operation_timeout(Duration::from_secs(config.timeout))
                        .build(),
                );
            }
            loader.load().await
        });

        // S3-compatible stores rarely serve virtual-hosted bucket names
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint.is_some())
            .build();

        Ok(Self {
            runtime,
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl BlobSink for BucketSink {
    fn put(&self, key: &str, data: &[u8], content_type: Option<&str>) -> Result<(), RehostError> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .acl(ObjectCannedAcl::PublicRead)
            .set_content_type(content_type.map(str::to_string))
            .body(ByteStream::from(data.to_vec()));

        self.runtime
            .block_on(request.send())
            .map_err(|e| RehostError::Storage {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        debug!(bucket = %self.bucket, key, bytes = data.len(), "uploaded image");
        Ok(())
    }
}
