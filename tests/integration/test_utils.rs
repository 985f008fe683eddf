//! Test utilities for integration tests.
//!
//! This module provides a mock image server that serves a fixed manifest
//! and synthesizes a solid-color JPEG for every requested tile, recording
//! each tile request for later assertions.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use image::{Rgb, RgbImage};
use tokio::sync::RwLock;

use deepzoom_viewer::{FetchError, ManifestFetcher, TileFetcher};

// =============================================================================
// Manifest Builders
// =============================================================================

pub fn dzi_manifest(width: i64, height: i64) -> String {
    format!(
        r#"{{
            "format": "dzi",
            "width": {width},
            "height": {height},
            "copyright": "Example Museum",
            "caption": "Harbor at dusk"
        }}"#
    )
}

pub fn zoomify_manifest(width: i64, height: i64) -> String {
    dzi_manifest(width, height).replace("dzi", "zoomify")
}

// =============================================================================
// JPEG Synthesis
// =============================================================================

/// Encode a solid gray JPEG tile.
pub fn jpeg_tile(width: u32, height: u32, value: u8) -> Bytes {
    let img = RgbImage::from_pixel(width, height, Rgb([value, value, value]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .unwrap();
    Bytes::from(buf)
}

// =============================================================================
// Mock Image Server
// =============================================================================

/// Serves one manifest and a synthesized tile for any tile URL.
///
/// Clones share the request log, so tests can hold one handle for
/// assertions while the viewer owns another as its tile transport.
#[derive(Clone)]
pub struct MockImageServer {
    manifest: Bytes,
    tile_value: u8,
    fail_tiles: bool,
    requests: Arc<RwLock<Vec<String>>>,
}

impl MockImageServer {
    pub fn new(manifest: String) -> Self {
        Self {
            manifest: Bytes::from(manifest),
            tile_value: 120,
            fail_tiles: false,
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_tile_value(mut self, value: u8) -> Self {
        self.tile_value = value;
        self
    }

    /// Make every tile fetch fail with a connection error.
    pub fn failing_tiles(mut self) -> Self {
        self.fail_tiles = true;
        self
    }

    /// All tile URLs requested so far, in order.
    pub async fn tile_requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }

    /// Number of times one URL was requested.
    pub async fn request_count(&self, url: &str) -> usize {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| r.as_str() == url)
            .count()
    }
}

#[async_trait]
impl ManifestFetcher for MockImageServer {
    async fn fetch_manifest(&self, _url: &str) -> Result<Bytes, FetchError> {
        Ok(self.manifest.clone())
    }
}

#[async_trait]
impl TileFetcher for MockImageServer {
    async fn fetch_tile(&self, url: &str) -> Result<Bytes, FetchError> {
        self.requests.write().await.push(url.to_string());
        if self.fail_tiles {
            return Err(FetchError::Connection(format!("refused: {url}")));
        }
        Ok(jpeg_tile(256, 256, self.tile_value))
    }
}
