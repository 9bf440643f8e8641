//! HTTP session and page/image sources
//!
//! `Session` is the production implementation of both collaborator traits the
//! pipeline talks to. Pages and images may also come from the local file
//! system (plain paths or `file://` URLs), which keeps offline runs possible.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use tracing::debug;

use crate::core::{parse_content_type, RehostError, RehostOptions};
use crate::utils::url::Url;

/// A fetched page, ready to be parsed
#[derive(Debug, Clone)]
pub struct Page {
    pub data: Vec<u8>,
    /// Final URL after redirects; relative references resolve against it
    pub final_url: Url,
    /// Charset announced by the transport, empty when unknown
    pub charset: String,
}

/// Where pages come from
pub trait PageSource {
    fn fetch_page(&self, target: &str) -> Result<Page, RehostError>;
}

/// Where image bytes come from
pub trait ImageSource {
    /// Streams the resource at `url` into `writer`, returning the number of bytes copied
    fn fetch_image(&self, url: &Url, writer: &mut dyn Write) -> Result<u64, RehostError>;
}

pub struct Session {
    client: Client,
    user_agent: Option<String>,
}

impl Session {
    pub fn new(options: &RehostOptions) -> Result<Session, RehostError> {
        let timeout = if options.timeout > 0 {
            Some(Duration::from_secs(options.timeout))
        } else {
            None
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| RehostError::Http {
                url: String::new(),
                source,
            })?;

        Ok(Session {
            client,
            user_agent: options.user_agent.clone(),
        })
    }

    fn get(&self, url: &Url) -> Result<Response, RehostError> {
        let mut request = self.client.get(url.clone());
        if let Some(user_agent) = &self.user_agent {
            request = request.header(USER_AGENT, user_agent);
        }

        let response = request.send().map_err(|source| RehostError::Http {
            url: url.to_string(),
            source,
        })?;

        if !response.status().is_success() {
            return Err(RehostError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response)
    }

    fn read_local_page(&self, path: &Path) -> Result<Page, RehostError> {
        let io_error = |source| RehostError::Io {
            path: path.display().to_string(),
            source,
        };

        let data = fs::read(path).map_err(io_error)?;
        let canonical_path = fs::canonicalize(path).map_err(io_error)?;
        let final_url = Url::from_file_path(&canonical_path)
            .map_err(|_| RehostError::Config(format!("could not map path \"{}\" to a URL", path.display())))?;

        Ok(Page {
            data,
            final_url,
            charset: String::new(),
        })
    }
}

impl PageSource for Session {
    fn fetch_page(&self, target: &str) -> Result<Page, RehostError> {
        if target.starts_with("http://") || target.starts_with("https://") {
            let url = Url::parse(target).map_err(|source| RehostError::Url {
                input: target.to_string(),
                source,
            })?;

            let response = self.get(&url)?;
            let final_url = response.url().clone();
            let (_media_type, charset, _is_base64) = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(parse_content_type)
                .unwrap_or_default();
            let data = response.bytes().map_err(|source| RehostError::Http {
                url: url.to_string(),
                source,
            })?;

            debug!(url = %final_url, bytes = data.len(), "fetched page");
            Ok(Page {
                data: data.to_vec(),
                final_url,
                charset,
            })
        } else if target.starts_with("file://") {
            let url = Url::parse(target).map_err(|source| RehostError::Url {
                input: target.to_string(),
                source,
            })?;
            let path = url
                .to_file_path()
                .map_err(|_| RehostError::Config(format!("not a local file URL: {target}")))?;

            self.read_local_page(&path)
        } else {
            self.read_local_page(Path::new(target))
        }
    }
}

impl ImageSource for Session {
    fn fetch_image(&self, url: &Url, writer: &mut dyn Write) -> Result<u64, RehostError> {
        match url.scheme() {
            "http" | "https" => {
                let mut response = self.get(url)?;
                let copied = response.copy_to(writer).map_err(|source| RehostError::Http {
                    url: url.to_string(),
                    source,
                })?;

                debug!(url = %url, bytes = copied, "fetched image");
                Ok(copied)
            }
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| RehostError::Config(format!("not a local file URL: {url}")))?;
                let io_error = |source| RehostError::Io {
                    path: path.display().to_string(),
                    source,
                };

                let mut file = fs::File::open(&path).map_err(io_error)?;
                io::copy(&mut file, writer).map_err(io_error)
            }
            scheme => Err(RehostError::Config(format!(
                "unsupported scheme \"{scheme}\" for {url}"
            ))),
        }
    }
}
