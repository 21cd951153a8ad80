//! Asynchronous tile fetching.
//!
//! Each requested tile runs as its own network-bound task; completions come
//! back over a channel that the engine drains on its frame tick, so cache
//! mutation always happens on the frame loop. The fetch itself sits behind
//! the [`TileFetch`] trait, which is how tests substitute canned bytes for
//! the network.

use crate::core::geo::TileCoord;
use crate::tiles::cache::TileImage;
use crate::tiles::source::TileSource;
use crate::Result;
use async_trait::async_trait;
use crossbeam_channel::{unbounded, Receiver, Sender};
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;

/// Shared async HTTP client with a crate User-Agent so public tile servers
/// don't reject the requests. Built once; connection pooling does the rest.
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent("trackmap/0.1")
        .build()
        .expect("failed to build reqwest client")
});

/// Trait for fetching raw tile bytes for a URL.
#[async_trait]
pub trait TileFetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Production fetcher over the shared HTTP client.
pub struct HttpFetch;

#[async_trait]
impl TileFetch for HttpFetch {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = HTTP_CLIENT.get(url).send().await?;
        if !response.status().is_success() {
            return Err(format!("HTTP {} for {}", response.status(), url).into());
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Outcome of one tile fetch. `image` is `None` on failure or timeout; the
/// tile stays a placeholder and is not retried until an eviction pass.
#[derive(Debug)]
pub struct TileResult {
    pub coord: TileCoord,
    pub image: Option<TileImage>,
}

/// Spawns tile downloads and collects their results.
pub struct TileLoader {
    source: Arc<dyn TileSource>,
    fetch: Arc<dyn TileFetch>,
    timeout: Duration,
    result_tx: Sender<TileResult>,
    result_rx: Receiver<TileResult>,
}

impl TileLoader {
    pub fn new(source: Arc<dyn TileSource>, fetch: Arc<dyn TileFetch>, timeout: Duration) -> Self {
        let (result_tx, result_rx) = unbounded();
        Self {
            source,
            fetch,
            timeout,
            result_tx,
            result_rx,
        }
    }

    /// Start downloading one tile. Non-blocking: the caller must already
    /// have marked the key pending, which is what guarantees at most one
    /// outstanding fetch per tile.
    pub fn request(&self, coord: TileCoord) {
        let url = self.source.url(coord);
        let fetch = self.fetch.clone();
        let timeout = self.timeout;
        let tx = self.result_tx.clone();

        let task = async move {
            let image = match tokio::time::timeout(timeout, fetch.fetch(&url)).await {
                Ok(Ok(bytes)) => match image::load_from_memory(&bytes) {
                    Ok(decoded) => {
                        log::debug!("tile {:?} loaded ({} bytes)", coord, bytes.len());
                        Some(Arc::new(decoded.to_rgba8()))
                    }
                    Err(e) => {
                        log::warn!("tile {:?} decode failed: {}", coord, e);
                        None
                    }
                },
                Ok(Err(e)) => {
                    log::warn!("tile {:?} fetch failed: {}", coord, e);
                    None
                }
                Err(_) => {
                    log::warn!("tile {:?} fetch timed out after {:?}", coord, timeout);
                    None
                }
            };
            let _ = tx.send(TileResult { coord, image });
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(task);
            }
            Err(_) => {
                // No runtime on this thread; resolve to a failure so the
                // slot follows the normal failed-tile path.
                log::warn!("tile {:?} requested without an async runtime", coord);
                let _ = self
                    .result_tx
                    .send(TileResult { coord, image: None });
            }
        }
    }

    /// Drain completed downloads (non-blocking).
    pub fn try_recv_results(&self) -> Vec<TileResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            results.push(result);
        }
        results
    }

    /// Whether any completions are waiting.
    pub fn has_pending_results(&self) -> bool {
        !self.result_rx.is_empty()
    }
}
