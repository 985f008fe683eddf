use thiserror::Error;

/// Errors from the abstract fetch transports (manifest and tile images).
///
/// The engine never talks to a network itself; hosts implement the fetcher
/// traits and surface their transport failures through this type.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The resource does not exist at the given URL
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Network or connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// The fetch was cancelled by the host
    #[error("fetch cancelled")]
    Cancelled,
}

/// Errors that can occur while mounting a manifest.
#[derive(Debug, Clone, Error)]
pub enum ManifestError {
    /// Transport failure while fetching the manifest document
    #[error("manifest fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The manifest document is not valid JSON or is missing fields
    #[error("manifest parse failed: {0}")]
    Parse(String),

    /// The manifest declares non-positive source dimensions
    #[error("invalid source dimensions: {width}x{height}")]
    InvalidDimensions { width: i64, height: i64 },
}

/// Errors from pyramid construction.
#[derive(Debug, Clone, Error)]
pub enum PyramidError {
    /// Source dimensions must be strictly positive
    #[error("invalid pyramid dimensions: {width}x{height}")]
    InvalidDimensions { width: i64, height: i64 },
}

/// Errors from the tile load pipeline.
///
/// Tile failures are local: a failed tile is re-offered on the next resolver
/// pass (bounded by the retry limit) and never corrupts the backing surface.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// Transport failure while fetching a tile image
    #[error("tile fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The fetched bytes could not be decoded as an image
    #[error("tile decode failed for {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Top-level errors from the viewer lifecycle.
#[derive(Debug, Clone, Error)]
pub enum ViewerError {
    /// The viewer configuration failed validation
    #[error("configuration error: {0}")]
    Config(String),

    /// The manifest could not be fetched or parsed
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The pyramid could not be derived from the manifest dimensions
    #[error(transparent)]
    Pyramid(#[from] PyramidError),
}
