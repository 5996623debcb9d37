// src/fetch/mod.rs

use reqwest::Client;
use std::{
    future::Future,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;
use url::{form_urlencoded, Url};

use crate::config::Config;
use crate::error::MappingFetchError;

/// Where the reference table text comes from.
///
/// The loader only needs the eventual payload; swapping the source lets tests
/// and offline runs use a local fixture instead of the network.
pub trait MappingSource {
    /// Human readable origin, for logs.
    fn describe(&self) -> String;

    fn fetch_text(&self) -> impl Future<Output = Result<String, MappingFetchError>> + Send;
}

/// `prefix` followed by `target` percent-encoded as a single query value.
pub fn relay_url(prefix: &str, target: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
    format!("{}{}", prefix, encoded)
}

/// Fetches over HTTP, optionally through a relay. One attempt, bounded by the
/// client's timeout.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    url: Url,
}

impl HttpSource {
    pub fn new(
        client: Client,
        target: &str,
        relay_prefix: Option<&str>,
    ) -> Result<Self, MappingFetchError> {
        let raw = match relay_prefix {
            Some(prefix) => relay_url(prefix, target),
            None => target.to_string(),
        };
        let url = Url::parse(&raw).map_err(|source| MappingFetchError::Url {
            url: raw.clone(),
            source,
        })?;
        Ok(Self { client, url })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, MappingFetchError> {
        let client = build_client(cfg.fetch_timeout()).map_err(|source| {
            MappingFetchError::Http {
                url: cfg.mapping_url.clone(),
                source,
            }
        })?;
        Self::new(client, &cfg.mapping_url, cfg.relay_prefix.as_deref())
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).build()
}

impl MappingSource for HttpSource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    fn fetch_text(&self) -> impl Future<Output = Result<String, MappingFetchError>> + Send {
        async move {
            debug!("Fetching text from {}", self.url);
            let http_err = |source| MappingFetchError::Http {
                url: self.url.to_string(),
                source,
            };
            self.client
                .get(self.url.clone())
                .send()
                .await
                .map_err(http_err)?
                .error_for_status()
                .map_err(http_err)?
                .text()
                .await
                .map_err(http_err)
        }
    }
}

/// Reads the table from disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MappingSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch_text(&self) -> impl Future<Output = Result<String, MappingFetchError>> + Send {
        async move {
            let bytes = tokio::fs::read(&self.path)
                .await
                .map_err(|source| MappingFetchError::Io {
                    path: self.path.clone(),
                    source,
                })?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}
