//! Pre-rendered clip loading and caching.
//!
//! Clips are fetched through a [`ClipSource`] (HTTP or a local directory),
//! decoded by the session device and memoized per key for the lifetime of
//! the [`ClipCache`]. A key that cannot be loaded is remembered as absent,
//! so callers fall back to speech without hitting the network again.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::OnceCell;

use crate::config::ClipConfig;
use crate::device::{ClipBuffer, SharedDevice};
use crate::error::AudioError;
use crate::keys::ClipKey;

// ── Sources ────────────────────────────────────────────────────────

/// Where encoded clip payloads come from.
///
/// `Ok(None)` means the clip does not exist. Errors are reserved for
/// failures where trying again might help (see [`AudioError::is_transient`]).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClipSource: Send + Sync {
    async fn fetch(&self, key: &ClipKey) -> Result<Option<Bytes>, AudioError>;
}

/// Fetches `<base_url>/<key>.mp3` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpClipSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClipSource {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Absolute URL of a clip.
    #[must_use]
    pub fn url(&self, key: &ClipKey) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key.file_name())
    }
}

#[async_trait]
impl ClipSource for HttpClipSource {
    async fn fetch(&self, key: &ClipKey) -> Result<Option<Bytes>, AudioError> {
        let transport = |e: reqwest::Error| AudioError::Transport {
            key: key.to_string(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(self.url(key))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AudioError::HttpStatus {
                key: key.to_string(),
                status: status.as_u16(),
            });
        }

        response.bytes().await.map(Some).map_err(transport)
    }
}

/// Reads `<dir>/<key>.mp3` from disk.
#[derive(Debug, Clone)]
pub struct DirClipSource {
    root: PathBuf,
}

impl DirClipSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ClipSource for DirClipSource {
    async fn fetch(&self, key: &ClipKey) -> Result<Option<Bytes>, AudioError> {
        match tokio::fs::read(self.root.join(key.file_name())).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// ── Cache ──────────────────────────────────────────────────────────

type Slot = Arc<OnceCell<Option<ClipBuffer>>>;

/// Session-wide clip cache.
///
/// Concurrent first requests for the same key share one load. Once a key
/// resolves, present or absent, it never changes for the session.
pub struct ClipCache {
    source: Arc<dyn ClipSource>,
    device: SharedDevice,
    config: ClipConfig,
    entries: Mutex<HashMap<ClipKey, Slot>>,
    fetches: AtomicUsize,
}

impl ClipCache {
    #[must_use]
    pub fn new(source: Arc<dyn ClipSource>, device: SharedDevice, config: ClipConfig) -> Self {
        Self {
            source,
            device,
            config,
            entries: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Decoded clip for `key`, or `None` if it is absent or the device
    /// cannot play audio.
    pub async fn load(&self, key: &ClipKey) -> Option<ClipBuffer> {
        if self.device.is_silent() {
            return None;
        }

        let slot = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(entries.entry(key.clone()).or_default())
        };

        slot.get_or_init(|| self.fetch_and_decode(key)).await.clone()
    }

    /// Load and start a clip. Returns its length if it started.
    pub async fn start(&self, key: &ClipKey, volume: f32) -> Option<Duration> {
        let clip = self.load(key).await?;
        match self.device.play_clip(&clip, volume) {
            Ok(()) => Some(clip.duration()),
            Err(e) => {
                tracing::warn!(%key, error = %e, "Failed to start clip");
                None
            }
        }
    }

    /// Load and start a clip. `true` if it started.
    pub async fn play(&self, key: &ClipKey, volume: f32) -> bool {
        self.start(key, volume).await.is_some()
    }

    /// Warm the cache in the background.
    pub fn preload(self: &Arc<Self>, keys: impl IntoIterator<Item = ClipKey>) {
        if self.device.is_silent() {
            return;
        }
        for key in keys {
            let cache = Arc::clone(self);
            tokio::spawn(async move {
                cache.load(&key).await;
            });
        }
    }

    /// The cached result for `key`, if it has resolved.
    ///
    /// `Some(None)` means the key is known to be absent.
    #[must_use]
    pub fn cached(&self, key: &ClipKey) -> Option<Option<ClipBuffer>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Number of fetch attempts made so far, retries included.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    async fn fetch_and_decode(&self, key: &ClipKey) -> Option<ClipBuffer> {
        let bytes = match self.fetch_with_retry(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!(%key, "Clip not found, using speech fallback");
                return None;
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "Clip unavailable for this session");
                return None;
            }
        };

        match self.decode(bytes).await {
            Ok(clip) => {
                tracing::debug!(%key, duration = ?clip.duration(), "Clip cached");
                Some(clip)
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "Clip could not be decoded");
                None
            }
        }
    }

    /// Fetch with a per-attempt timeout, retrying transient failures with
    /// exponential backoff.
    async fn fetch_with_retry(&self, key: &ClipKey) -> Result<Option<Bytes>, AudioError> {
        let limit = self.config.fetch_timeout();
        let mut attempt = 0;

        loop {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let result = tokio::time::timeout(limit, self.source.fetch(key))
                .await
                .unwrap_or_else(|_| Err(AudioError::Timeout(limit)));

            match result {
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let delay = self
                        .config
                        .retry_backoff()
                        .saturating_mul(2u32.saturating_pow(attempt));
                    tracing::debug!(%key, error = %e, attempt, ?delay, "Retrying clip fetch");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn decode(&self, bytes: Bytes) -> Result<ClipBuffer, AudioError> {
        let device = Arc::clone(&self.device);
        let limit = self.config.decode_timeout();

        match tokio::time::timeout(
            limit,
            tokio::task::spawn_blocking(move || device.decode(&bytes)),
        )
        .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(AudioError::DecodeError(join.to_string())),
            Err(_) => Err(AudioError::Timeout(limit)),
        }
    }
}
