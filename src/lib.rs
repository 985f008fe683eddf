//! # DeepZoom Viewer
//!
//! A viewport engine for very large tiled raster images.
//!
//! This library implements the full pipeline of a pan/zoom image viewer
//! over pre-tiled pyramids: it derives the resolution pyramid from a
//! manifest, tracks pan/zoom/pinch gestures, picks the pyramid level for
//! the current magnification, streams the visible tiles, and composites
//! them onto a memory-capped backing surface. Sources in the gigapixel
//! range stay responsive because only visible tiles of the active level
//! are ever fetched.
//!
//! ## Features
//!
//! - **Two tile layouts**: DeepZoom (DZI) and Zoomify folder conventions
//! - **Gesture engine**: wheel zoom, drag pan, and two-finger pinch with a
//!   shared anchor-point model
//! - **Level hysteresis**: selection slack plus an in-gesture latch keep
//!   level switches from thrashing
//! - **Debounced loading**: bursts of viewport changes coalesce into one
//!   tile-load pass
//! - **Generation-stamped loads**: tile completions that outlive their
//!   tile set are dropped, never painted
//! - **Capped compositing**: the persistent raster buffer never exceeds a
//!   configurable pixel area
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`manifest`] - manifest document and the fetch transport trait
//! - [`pyramid`] - pyramid level derivation
//! - [`viewport`] - viewport state and the gesture state machine
//! - [`resolver`] - level selection and visible-tile resolution
//! - [`loader`] - tile URLs, fetching, and decoding
//! - [`compositor`] - backing-surface compositing and the load debounce
//! - [`viewer`] - the mounted viewer tying everything together
//! - [`surface`] - the render-surface abstraction hosts implement
//! - [`config`] - tunables and their defaults
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Instant;
//! use deepzoom_viewer::{SoftwareSurface, Viewer, ViewerConfig};
//! # use async_trait::async_trait;
//! # use bytes::Bytes;
//! # use deepzoom_viewer::{FetchError, ManifestFetcher, TileFetcher};
//! # struct HttpClient;
//! # #[async_trait]
//! # impl ManifestFetcher for HttpClient {
//! #     async fn fetch_manifest(&self, _url: &str) -> Result<Bytes, FetchError> { unimplemented!() }
//! # }
//! # #[async_trait]
//! # impl TileFetcher for HttpClient {
//! #     async fn fetch_tile(&self, _url: &str) -> Result<Bytes, FetchError> { unimplemented!() }
//! # }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut viewer = Viewer::mount(
//!         &HttpClient,
//!         "/images/harbor/manifest.json",
//!         HttpClient,
//!         SoftwareSurface::new(1, 1),
//!         ViewerConfig::default(),
//!     )
//!     .await
//!     .expect("mount failed");
//!
//!     viewer.handle_resize(1024.0, 768.0, Instant::now());
//!     loop {
//!         // Forward input events, then give the loader a chance to run.
//!         viewer.pump(Instant::now()).await;
//!         # break;
//!     }
//! }
//! ```

pub mod compositor;
pub mod config;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod pyramid;
pub mod resolver;
pub mod surface;
pub mod viewer;
pub mod viewport;

// Re-export commonly used types
pub use compositor::{Compositor, LoadScheduler};
pub use config::{
    ViewerConfig, DEFAULT_BACKING_CAP_AREA, DEFAULT_BASE_TILE_SIZE, DEFAULT_DZI_BASE_LEVEL_OFFSET,
    DEFAULT_INITIAL_LOAD_DELAY, DEFAULT_LEVEL_HYSTERESIS, DEFAULT_QUIET_LOAD_DELAY,
    DEFAULT_TILE_RETRY_LIMIT, DEFAULT_ZOOMIFY_BASE_LEVEL_OFFSET, DEFAULT_ZOOMIFY_GROUP_SIZE,
    DEFAULT_ZOOM_SPEED,
};
pub use error::{FetchError, ManifestError, PyramidError, TileError, ViewerError};
pub use loader::{LoadedTile, TileFetcher, TileLoader};
pub use manifest::{fetch_manifest, Manifest, ManifestFetcher, TileFormat};
pub use pyramid::{Pyramid, PyramidLevel};
pub use resolver::{TileDescriptor, TileSet, TileSetResolver, TileState};
pub use surface::{Rect, RenderSurface, SoftwareSurface};
pub use viewer::Viewer;
pub use viewport::{
    GesturePhase, GestureState, PointerInput, ViewportChange, ViewportController, ViewportState,
};
