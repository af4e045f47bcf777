//! # Thumbnail Loader
//!
//! Downloads, resizes and caches the small images shown next to each car.
//!
//! ## Per-Key Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    (url, size) fetch states                             │
//! │                                                                         │
//! │   NotCached ──load──► Fetching ──ok────► Cached  (LRU, may be evicted)  │
//! │       ▲                  │                                              │
//! │       │                  └──fail──► Failed                              │
//! │       │                               │                                 │
//! │       └──────── next load retries ────┘                                 │
//! │                                                                         │
//! │   Concurrent loads of one key wait on the same in-flight lock, so the   │
//! │   image is downloaded once and the waiters read it from the cache.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Loading never fails loudly: a missing, slow (3 s timeout) or undecodable
//! image is `None` and the row is shown without a picture.

use image::imageops::FilterType;
use image::DynamicImage;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::url::thumbnail_url;

/// Default number of thumbnails kept in memory.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Per-download timeout.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(3);

// =============================================================================
// Types
// =============================================================================

/// Target thumbnail size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        ImageSize { width, height }
    }
}

/// 50×50, the table row thumbnail.
impl Default for ImageSize {
    fn default() -> Self {
        ImageSize::new(50, 50)
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Where a `(url, size)` pair stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    NotCached,
    Fetching,
    Cached,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    url: String,
    size: ImageSize,
}

impl CacheKey {
    fn new(url: &str, size: ImageSize) -> Self {
        CacheKey {
            url: url.to_string(),
            size,
        }
    }
}

// =============================================================================
// Loader
// =============================================================================

struct LoaderInner {
    http: reqwest::Client,
    cache: Mutex<LruCache<CacheKey, DynamicImage>>,
    in_flight: Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
    failed: Mutex<LruCache<CacheKey, ()>>,
}

/// Shared thumbnail loader.
///
/// Cheap to clone; clones share the cache.
///
/// ## Usage
/// ```rust,ignore
/// let loader = ImageLoader::new(256)?;
///
/// // Inline
/// let thumb = loader.load(&car.image_url, ImageSize::default()).await;
///
/// // Background; dropping the subscription cancels the callback
/// let sub = loader.load_async(url, ImageSize::default(), |img| show(img));
/// ```
#[derive(Clone)]
pub struct ImageLoader {
    inner: Arc<LoaderInner>,
}

impl fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageLoader")
            .field("cached", &self.len())
            .field("capacity", &lock(&self.inner.cache).cap())
            .finish()
    }
}

/// Poisoning only means another thread panicked mid-update of a cache
/// entry; the map itself is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ImageLoader {
    /// Creates a loader keeping at most `capacity` thumbnails (minimum 1).
    pub fn new(capacity: usize) -> MediaResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| MediaError::Client(e.to_string()))?;

        Ok(Self::with_client(http, capacity))
    }

    /// Creates a loader on an existing HTTP client.
    pub fn with_client(http: reqwest::Client, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        ImageLoader {
            inner: Arc::new(LoaderInner {
                http,
                cache: Mutex::new(LruCache::new(capacity)),
                in_flight: Mutex::new(HashMap::new()),
                failed: Mutex::new(LruCache::new(capacity)),
            }),
        }
    }

    /// Number of cached thumbnails.
    pub fn len(&self) -> usize {
        lock(&self.inner.cache).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached thumbnail.
    pub fn clear(&self) {
        lock(&self.inner.cache).clear();
        lock(&self.inner.failed).clear();
    }

    /// Current state of `(url, size)`.
    pub fn state(&self, url: &str, size: ImageSize) -> FetchState {
        let key = CacheKey::new(url, size);

        if lock(&self.inner.cache).contains(&key) {
            FetchState::Cached
        } else if lock(&self.inner.in_flight).contains_key(&key) {
            FetchState::Fetching
        } else if lock(&self.inner.failed).contains(&key) {
            FetchState::Failed
        } else {
            FetchState::NotCached
        }
    }

    /// Loads the thumbnail for `url` at `size`.
    ///
    /// ## Returns
    /// * `Some(image)` - From cache, or freshly downloaded and resized
    /// * `None` - Blank URL, HTTP error, timeout or undecodable body
    pub async fn load(&self, url: &str, size: ImageSize) -> Option<DynamicImage> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }

        let key = CacheKey::new(url, size);
        if let Some(hit) = self.cached(&key) {
            return Some(hit);
        }

        let in_flight = InFlight::register(self, key.clone());
        let _turn = in_flight.gate.lock().await;

        // Whoever held the lock before us may have filled the cache
        if let Some(hit) = self.cached(&key) {
            return Some(hit);
        }

        lock(&self.inner.failed).pop(&key);

        match self.fetch(&key).await {
            Some(image) => {
                lock(&self.inner.cache).put(key, image.clone());
                Some(image)
            }
            None => {
                lock(&self.inner.failed).put(key, ());
                None
            }
        }
    }

    /// Loads in the background and hands the result to `callback`.
    ///
    /// The callback runs on the tokio runtime. Cancelling or dropping the
    /// returned subscription aborts the task, so a view that went away is
    /// never called back.
    pub fn load_async<F>(
        &self,
        url: impl Into<String>,
        size: ImageSize,
        callback: F,
    ) -> ImageSubscription
    where
        F: FnOnce(Option<DynamicImage>) + Send + 'static,
    {
        let loader = self.clone();
        let url = url.into();

        let handle = tokio::spawn(async move {
            let image = loader.load(&url, size).await;
            callback(image);
        });

        ImageSubscription {
            handle: Some(handle),
        }
    }

    /// Loads and resizes a local image file. Not cached.
    pub fn load_from_path(&self, path: &Path, size: ImageSize) -> Option<DynamicImage> {
        match image::open(path) {
            Ok(image) => Some(fit(image, size)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not load local image");
                None
            }
        }
    }

    fn cached(&self, key: &CacheKey) -> Option<DynamicImage> {
        lock(&self.inner.cache).get(key).cloned()
    }

    async fn fetch(&self, key: &CacheKey) -> Option<DynamicImage> {
        let fetch_url = thumbnail_url(&key.url, key.size);
        debug!(url = %fetch_url, size = %key.size, "Downloading thumbnail");

        let response = match self.inner.http.get(&fetch_url).timeout(FETCH_TIMEOUT).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %fetch_url, error = %e, "Thumbnail request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(url = %fetch_url, status = %response.status(), "Thumbnail not available");
            return None;
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(url = %fetch_url, error = %e, "Thumbnail body could not be read");
                return None;
            }
        };

        match image::load_from_memory(&bytes) {
            Ok(image) => Some(fit(image, key.size)),
            Err(e) => {
                debug!(url = %fetch_url, error = %e, "Thumbnail could not be decoded");
                None
            }
        }
    }
}

/// Resizes to exactly `size` with Lanczos3, unless it already matches.
fn fit(image: DynamicImage, size: ImageSize) -> DynamicImage {
    if image.width() == size.width && image.height() == size.height {
        image
    } else {
        image.resize_exact(size.width, size.height, FilterType::Lanczos3)
    }
}

/// Registration in the in-flight map for the lifetime of one `load` call.
///
/// Dropping it (including when the load future is aborted) removes the
/// entry once no other caller holds the same gate.
struct InFlight<'a> {
    loader: &'a ImageLoader,
    key: CacheKey,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> InFlight<'a> {
    fn register(loader: &'a ImageLoader, key: CacheKey) -> Self {
        let gate = lock(&loader.inner.in_flight)
            .entry(key.clone())
            .or_default()
            .clone();

        InFlight { loader, key, gate }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut in_flight = lock(&self.loader.inner.in_flight);
        // One reference in the map, one here: nobody else is waiting
        if Arc::strong_count(&self.gate) <= 2 {
            in_flight.remove(&self.key);
        }
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// Handle to a background [`ImageLoader::load_async`] call.
#[must_use = "dropping the subscription cancels the load"]
#[derive(Debug)]
pub struct ImageSubscription {
    handle: Option<JoinHandle<()>>,
}

impl ImageSubscription {
    /// Stops the load; the callback will not run if it hasn't yet.
    pub fn cancel(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether the load (and callback) has completed or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the load and its callback to complete.
    pub async fn wait(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ImageSubscription {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    async fn serve_png(server: &MockServer, at: &str, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(png_bytes(120, 80)),
            )
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_load_resizes_and_caches() {
        let server = MockServer::start().await;
        serve_png(&server, "/car.png", 1).await;

        let loader = ImageLoader::new(8).unwrap();
        let url = format!("{}/car.png", server.uri());
        let size = ImageSize::default();

        assert_eq!(loader.state(&url, size), FetchState::NotCached);

        let first = loader.load(&url, size).await.unwrap();
        assert_eq!((first.width(), first.height()), (50, 50));
        assert_eq!(loader.state(&url, size), FetchState::Cached);

        // Served from cache: same pixels, still one request
        let second = loader.load(&url, size).await.unwrap();
        assert_eq!(first.to_rgba8(), second.to_rgba8());
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_keys_are_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let loader = ImageLoader::new(2).unwrap();
        let urls: Vec<String> = (0..20)
            .map(|i| format!("{}/missing-{i}.png", server.uri()))
            .collect();

        for url in &urls {
            assert!(loader.load(url, ImageSize::default()).await.is_none());
        }

        assert!(lock(&loader.inner.failed).len() <= 2);
        assert_eq!(loader.state(&urls[19], ImageSize::default()), FetchState::Failed);
        assert_eq!(loader.state(&urls[0], ImageSize::default()), FetchState::NotCached);
    }

    #[tokio::test]
    async fn test_size_is_part_of_the_key() {
        let server = MockServer::start().await;
        serve_png(&server, "/car.png", 2).await;

        let loader = ImageLoader::new(8).unwrap();
        let url = format!("{}/car.png", server.uri());

        let small = loader.load(&url, ImageSize::new(50, 50)).await.unwrap();
        let large = loader.load(&url, ImageSize::new(100, 100)).await.unwrap();

        assert_eq!(small.width(), 50);
        assert_eq!(large.width(), 100);
        assert_eq!(loader.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_download() {
        let server = MockServer::start().await;
        serve_png(&server, "/shared.png", 1).await;

        let loader = ImageLoader::new(8).unwrap();
        let url = format!("{}/shared.png", server.uri());

        let (a, b, c) = tokio::join!(
            loader.load(&url, ImageSize::default()),
            loader.load(&url, ImageSize::default()),
            loader.load(&url, ImageSize::default()),
        );

        assert!(a.is_some() && b.is_some() && c.is_some());
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken.png"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let loader = ImageLoader::new(8).unwrap();
        let url = format!("{}/broken.png", server.uri());

        assert!(loader.load(&url, ImageSize::default()).await.is_none());
        assert_eq!(loader.state(&url, ImageSize::default()), FetchState::Failed);

        assert!(loader.load(&url, ImageSize::default()).await.is_none());
        assert!(loader.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_body_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/text.png"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not an image"))
            .mount(&server)
            .await;

        let loader = ImageLoader::new(8).unwrap();
        let url = format!("{}/text.png", server.uri());
        assert!(loader.load(&url, ImageSize::default()).await.is_none());
    }

    #[tokio::test]
    async fn test_blank_url_is_none_without_request() {
        let loader = ImageLoader::new(8).unwrap();
        assert!(loader.load("   ", ImageSize::default()).await.is_none());
        assert_eq!(loader.state("   ", ImageSize::default()), FetchState::NotCached);
    }

    #[tokio::test]
    async fn test_cache_is_bounded() {
        let server = MockServer::start().await;
        serve_png(&server, "/a.png", 1).await;
        serve_png(&server, "/b.png", 1).await;

        let loader = ImageLoader::new(1).unwrap();
        let a = format!("{}/a.png", server.uri());
        let b = format!("{}/b.png", server.uri());

        loader.load(&a, ImageSize::default()).await.unwrap();
        loader.load(&b, ImageSize::default()).await.unwrap();

        assert_eq!(loader.len(), 1);
        assert_eq!(loader.state(&a, ImageSize::default()), FetchState::NotCached);
        assert_eq!(loader.state(&b, ImageSize::default()), FetchState::Cached);
    }

    #[tokio::test]
    async fn test_load_async_delivers_result() {
        let server = MockServer::start().await;
        serve_png(&server, "/async.png", 1).await;

        let loader = ImageLoader::new(8).unwrap();
        let delivered = Arc::new(AtomicBool::new(false));
        let flag = delivered.clone();

        let sub = loader.load_async(
            format!("{}/async.png", server.uri()),
            ImageSize::default(),
            move |image| flag.store(image.is_some(), Ordering::SeqCst),
        );
        sub.wait().await;

        assert!(delivered.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_dropped_subscription_never_calls_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(png_bytes(50, 50))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let loader = ImageLoader::new(8).unwrap();
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let url = format!("{}/slow.png", server.uri());

        let sub = loader.load_async(url.clone(), ImageSize::default(), move |_| {
            flag.store(true, Ordering::SeqCst)
        });
        sub.cancel();

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(!called.load(Ordering::SeqCst));
        assert_ne!(loader.state(&url, ImageSize::default()), FetchState::Fetching);
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("car.png");
        std::fs::write(&file, png_bytes(200, 100)).unwrap();

        let loader = ImageLoader::new(8).unwrap();
        let image = loader.load_from_path(&file, ImageSize::new(40, 30)).unwrap();
        assert_eq!((image.width(), image.height()), (40, 30));

        assert!(loader
            .load_from_path(&dir.path().join("missing.png"), ImageSize::default())
            .is_none());
    }
}
