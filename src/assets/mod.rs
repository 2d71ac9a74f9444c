//! # Image Acquisition
//!
//! Turns the image references found in templates and records into decoded
//! pixels. Three kinds of reference are understood:
//!
//! | Reference | Source |
//! |-----------|--------|
//! | `data:image/png;base64,...` | decoded inline |
//! | `/uploads/car.jpg` | file under the configured static root |
//! | `https://cdn.example.com/car.jpg` | one HTTP GET, no retry |
//!
//! Loading goes through the [`AssetLoader`] trait so the renderer can be
//! driven by other sources (and observed in tests). [`AssetFetcher`] is the
//! default implementation. It can share an [`ImageCache`] across the renders
//! of one batch; entries are keyed by the exact reference string.

mod data_uri;
mod placeholder;

pub use data_uri::{DataUri, decode_data_uri, encode_data_uri};
pub use placeholder::{PLACEHOLDER_FILL, PLACEHOLDER_LABEL, placeholder};

use async_trait::async_trait;
use image::DynamicImage;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::RenderConfig;
use crate::error::{CartelError, Result};

/// Decoded images shared by the renders of one batch.
pub type ImageCache = Arc<RwLock<HashMap<String, DynamicImage>>>;

/// Create an empty batch cache.
pub fn new_image_cache() -> ImageCache {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Classified image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef<'a> {
    /// Inline `data:` URI (not yet validated).
    Inline(&'a str),
    /// Path relative to the static asset root.
    Static(&'a str),
    /// `http://` or `https://` URL.
    Remote(&'a str),
}

impl<'a> ImageRef<'a> {
    /// Classify a reference; `None` for anything unsupported.
    pub fn parse(reference: &'a str) -> Option<Self> {
        let reference = reference.trim();
        if reference.starts_with("data:") {
            Some(ImageRef::Inline(reference))
        } else if reference.starts_with('/') {
            Some(ImageRef::Static(reference))
        } else if reference.starts_with("http://") || reference.starts_with("https://") {
            Some(ImageRef::Remote(reference))
        } else {
            None
        }
    }
}

/// Source of decoded images for the renderer.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// Load and decode the image behind `reference`.
    async fn load(&self, reference: &str) -> Result<DynamicImage>;
}

/// Decode image bytes, whatever the container format.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| CartelError::Image(format!("Failed to decode image: {}", e)))
}

/// Default loader: data URIs, static files, and HTTP(S).
pub struct AssetFetcher {
    http_client: reqwest::Client,
    static_root: PathBuf,
    cache: Option<ImageCache>,
}

impl AssetFetcher {
    /// Build a fetcher from the render configuration.
    pub fn new(config: &RenderConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.fetch_timeout() {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| CartelError::Fetch(format!("HTTP client error: {}", e)))?;
        Ok(Self {
            http_client,
            static_root: config.static_root.clone(),
            cache: None,
        })
    }

    /// Share decoded images through `cache`.
    pub fn with_cache(mut self, cache: ImageCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Resolve a `/`-prefixed reference under the static root.
    ///
    /// Query strings and fragments are dropped; `..` components are refused.
    pub fn static_path(&self, reference: &str) -> Result<PathBuf> {
        let path = reference
            .split(['?', '#'])
            .next()
            .unwrap_or(reference)
            .trim_start_matches('/');
        let relative = Path::new(path);
        if path.is_empty() || relative.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(CartelError::UnsupportedReference(reference.to_string()));
        }
        Ok(self.static_root.join(relative))
    }

    async fn read_static(&self, reference: &str) -> Result<DynamicImage> {
        let path = self.static_path(reference)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| CartelError::Image(format!("Failed to read {}: {}", path.display(), e)))?;
        decode_image(&bytes)
    }

    async fn download(&self, url: &str) -> Result<DynamicImage> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| CartelError::Fetch(format!("Failed to download {}: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(CartelError::Fetch(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CartelError::Fetch(format!("Failed to read image data: {}", e)))?;
        decode_image(&bytes)
    }

    async fn load_uncached(&self, reference: &str) -> Result<DynamicImage> {
        match ImageRef::parse(reference) {
            Some(ImageRef::Inline(uri)) => {
                let data = decode_data_uri(uri).ok_or_else(|| {
                    CartelError::Image("Malformed data URI".to_string())
                })?;
                decode_image(&data.bytes)
            }
            Some(ImageRef::Static(path)) => self.read_static(path).await,
            Some(ImageRef::Remote(url)) => self.download(url).await,
            None => Err(CartelError::UnsupportedReference(truncate_reference(reference))),
        }
    }
}

#[async_trait]
impl AssetLoader for AssetFetcher {
    async fn load(&self, reference: &str) -> Result<DynamicImage> {
        let Some(cache) = &self.cache else {
            return self.load_uncached(reference).await;
        };

        if let Some(image) = cache.read().await.get(reference) {
            return Ok(image.clone());
        }
        let image = self.load_uncached(reference).await?;
        cache
            .write()
            .await
            .insert(reference.to_string(), image.clone());
        Ok(image)
    }
}

/// Shorten a reference for logs; data URIs can be megabytes long.
pub fn truncate_reference(reference: &str) -> String {
    const MAX: usize = 64;
    if reference.chars().count() <= MAX {
        reference.to_string()
    } else {
        let head: String = reference.chars().take(MAX).collect();
        format!("{}...", head)
    }
}
