// Shared fakes for integration tests
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;

use rehost::core::RehostError;
use rehost::network::{BlobSink, ImageSource, Page, PageSource};
use rehost::utils::Url;

/// sha1("abc")
pub const ABC_SHA1: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";

/// In-memory web: pages and images by URL, with a log of image fetches
#[derive(Default)]
pub struct FakeWeb {
    pages: HashMap<String, Vec<u8>>,
    images: HashMap<String, Vec<u8>>,
    pub fetches: RefCell<Vec<String>>,
}

impl FakeWeb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.as_bytes().to_vec());
        self
    }

    pub fn with_image(mut self, url: &str, data: &[u8]) -> Self {
        self.images.insert(url.to_string(), data.to_vec());
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.borrow().len()
    }
}

impl PageSource for FakeWeb {
    fn fetch_page(&self, target: &str) -> Result<Page, RehostError> {
        let data = self.pages.get(target).ok_or_else(|| RehostError::Status {
            url: target.to_string(),
            status: 404,
        })?;

        Ok(Page {
            data: data.clone(),
            final_url: Url::parse(target).unwrap(),
            charset: String::new(),
        })
    }
}

impl ImageSource for FakeWeb {
    fn fetch_image(&self, url: &Url, writer: &mut dyn Write) -> Result<u64, RehostError> {
        self.fetches.borrow_mut().push(url.to_string());

        let data = self.images.get(url.as_str()).ok_or_else(|| RehostError::Status {
            url: url.to_string(),
            status: 404,
        })?;
        writer.write_all(data).unwrap();
        Ok(data.len() as u64)
    }
}

/// Records every `put`; optionally refuses them all
#[derive(Default)]
pub struct MemorySink {
    pub puts: RefCell<Vec<(String, Vec<u8>, Option<String>)>>,
    pub failing: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn put_count(&self) -> usize {
        self.puts.borrow().len()
    }

    pub fn keys(&self) -> Vec<String> {
        self.puts.borrow().iter().map(|(k, _, _)| k.clone()).collect()
    }
}

impl BlobSink for MemorySink {
    fn put(&self, key: &str, data: &[u8], content_type: Option<&str>) -> Result<(), RehostError> {
        if self.failing {
            return Err(RehostError::Status {
                url: key.to_string(),
                status: 403,
            });
        }

        self.puts.borrow_mut().push((
            key.to_string(),
            data.to_vec(),
            content_type.map(str::to_string),
        ));
        Ok(())
    }
}

pub fn base_url() -> Url {
    Url::parse("http://example.com/").unwrap()
}
