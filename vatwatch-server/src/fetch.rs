//! Source retrieval over HTTP, from local files, or from memory.
//!
//! The scheduler only needs `fetch(source) -> bytes`. Parsing and decoding
//! happen here too so a refresh either yields a complete snapshot or an
//! error, never a partial one.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use vatwatch_core::config::SourcesConfig;
use vatwatch_core::{Catalog, LiveSnapshot, Result, WatchError};

/// Retrieves raw bytes for a named source.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, source: &str) -> Result<Vec<u8>>;
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// Plain GET with a shared connection pool. No timeout: a slow source only
/// delays the next refresh.
#[derive(Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        HttpFetcher {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, source: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(source)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| WatchError::Fetch(format!("{source}: {e}")))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| WatchError::Fetch(format!("{source}: {e}")))?;

        tracing::debug!(source, bytes = bytes.len(), "fetched");
        Ok(bytes.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Default)]
pub struct FileFetcher;

#[async_trait]
impl Fetcher for FileFetcher {
    async fn fetch(&self, source: &str) -> Result<Vec<u8>> {
        tokio::fs::read(source)
            .await
            .map_err(|e| WatchError::Fetch(format!("{source}: {e}")))
    }
}

/// Routes `http(s)://` sources to HTTP and everything else to the file
/// system.
#[derive(Clone, Default)]
pub struct AutoFetcher {
    http: HttpFetcher,
    file: FileFetcher,
}

impl AutoFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Fetcher for AutoFetcher {
    async fn fetch(&self, source: &str) -> Result<Vec<u8>> {
        if is_url(source) {
            self.http.fetch(source).await
        } else {
            self.file.fetch(source).await
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Serves bytes registered under source names. Unknown sources fail like
/// a transport error.
#[derive(Default)]
pub struct MemoryFetcher {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, source: &str, bytes: impl Into<Vec<u8>>) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(source.to_string(), bytes.into());
    }

    pub fn remove(&self, source: &str) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(source);
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, source: &str) -> Result<Vec<u8>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(source)
            .cloned()
            .ok_or_else(|| WatchError::Fetch(format!("{source}: not found")))
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// The three inputs of a refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Sources {
    pub catalog: String,
    pub boundaries: String,
    pub live: String,
}

impl From<&SourcesConfig> for Sources {
    fn from(cfg: &SourcesConfig) -> Self {
        Sources {
            catalog: cfg.catalog.clone(),
            boundaries: cfg.boundaries.clone(),
            live: cfg.live.clone(),
        }
    }
}

/// Fetch and parse both catalog files.
pub async fn fetch_catalog(fetcher: &dyn Fetcher, sources: &Sources) -> Result<Catalog> {
    let data = fetcher.fetch(&sources.catalog).await?;
    let boundaries = fetcher.fetch(&sources.boundaries).await?;
    Catalog::parse(&data, &boundaries)
}

/// Fetch and decode the live feed.
pub async fn fetch_live(fetcher: &dyn Fetcher, sources: &Sources) -> Result<LiveSnapshot> {
    let raw = fetcher.fetch(&sources.live).await?;
    LiveSnapshot::from_json(&raw)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
