//! Image manifest: the JSON document describing one tiled source image.
//!
//! A manifest is fetched once per mount and is read-only thereafter. It
//! names the on-disk tile layout ([`TileFormat`]), the full source
//! dimensions, and the attribution strings shown next to the viewer.
//!
//! The fetch transport is abstract: hosts implement [`ManifestFetcher`]
//! over whatever I/O they have (HTTP, embedded assets, test fixtures).

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

use crate::error::{FetchError, ManifestError};

// =============================================================================
// Tile Format
// =============================================================================

/// The two supported on-disk pyramid layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileFormat {
    /// Power-of-two levels addressed by `{level}/{col}_{row}.jpg`.
    Dzi,

    /// Levels addressed by `TileGroup{N}/{level}-{col}-{row}.jpg`.
    Zoomify,
}

impl std::fmt::Display for TileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TileFormat::Dzi => write!(f, "dzi"),
            TileFormat::Zoomify => write!(f, "zoomify"),
        }
    }
}

// =============================================================================
// Manifest
// =============================================================================

/// A parsed image manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// On-disk tile layout.
    pub format: TileFormat,

    /// Full-resolution source width in pixels.
    pub width: i64,

    /// Full-resolution source height in pixels.
    pub height: i64,

    /// Rights holder string.
    pub copyright: String,

    /// Image caption.
    pub caption: String,

    /// Optional explicit tile-folder path. When absent, the folder is
    /// derived from the manifest URL.
    #[serde(default, rename = "imagePath")]
    pub image_path: Option<String>,
}

impl Manifest {
    /// Parse and validate a manifest document.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Parse`] for malformed JSON and
    /// [`ManifestError::InvalidDimensions`] when either dimension is
    /// non-positive or exceeds `u32::MAX` pixels (the bounds
    /// [`Manifest::dimensions`] and pyramid construction rely on).
    pub fn parse(bytes: &[u8]) -> Result<Self, ManifestError> {
        let manifest: Manifest =
            serde_json::from_slice(bytes).map_err(|e| ManifestError::Parse(e.to_string()))?;

        let in_bounds = |d: i64| d > 0 && d <= u32::MAX as i64;
        if !in_bounds(manifest.width) || !in_bounds(manifest.height) {
            return Err(ManifestError::InvalidDimensions {
                width: manifest.width,
                height: manifest.height,
            });
        }

        Ok(manifest)
    }

    /// Source dimensions as `(width, height)`.
    ///
    /// Only valid after [`Manifest::parse`], which rejects dimensions
    /// outside `1..=u32::MAX`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32)
    }

    /// The display caption: `"{copyright} | {caption}"`.
    pub fn caption_text(&self) -> String {
        format!("{} | {}", self.copyright, self.caption)
    }

    /// Resolve the tile folder for this image.
    ///
    /// `image_path` wins when present; otherwise the folder is the
    /// second-to-last segment of the manifest URL (the manifest sits inside
    /// its image's folder).
    pub fn image_folder(&self, manifest_url: &str) -> String {
        if let Some(ref path) = self.image_path {
            return path.trim_end_matches('/').to_string();
        }

        let mut segments = manifest_url.trim_end_matches('/').rsplit('/');
        segments.next(); // manifest file name
        segments.next().unwrap_or_default().to_string()
    }
}

// =============================================================================
// ManifestFetcher Trait
// =============================================================================

/// Abstract transport for fetching the manifest document.
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    /// Fetch the raw manifest bytes at `url`.
    async fn fetch_manifest(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// Fetch and parse a manifest in one step.
///
/// Failures are recoverable: the caller keeps its unmounted state and may
/// retry with the same or a corrected URL.
pub async fn fetch_manifest<F: ManifestFetcher>(
    fetcher: &F,
    url: &str,
) -> Result<Manifest, ManifestError> {
    let bytes = fetcher.fetch_manifest(url).await?;
    Manifest::parse(&bytes)
}

// =============================================================================
// Tests
// =============================================================================
