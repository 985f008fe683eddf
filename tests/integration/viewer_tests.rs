//! End-to-end viewer tests: mount, gestures, debounced loading, painting.
//!
//! Timing is driven with synthetic `Instant`s; no test sleeps.

use std::time::{Duration, Instant};

use deepzoom_viewer::{PointerInput, SoftwareSurface, Viewer, ViewerConfig};

use super::test_utils::{dzi_manifest, zoomify_manifest, MockImageServer};

async fn mount(server: &MockImageServer, url: &str) -> Viewer<MockImageServer, SoftwareSurface> {
    Viewer::mount(
        server,
        url,
        server.clone(),
        SoftwareSurface::new(1, 1),
        ViewerConfig::default(),
    )
    .await
    .unwrap()
}

// =============================================================================
// Mount and First Load
// =============================================================================

#[tokio::test]
async fn test_resize_loads_visible_tiles_after_initial_delay() {
    let server = MockImageServer::new(dzi_manifest(4096, 2048));
    let mut viewer = mount(&server, "/images/harbor/manifest.json").await;
    assert_eq!(viewer.caption(), "Example Museum | Harbor at dusk");

    let t0 = Instant::now();
    viewer.handle_resize(1000.0, 800.0, t0);

    // Still inside the debounce window: nothing fetched
    viewer.pump(t0).await;
    assert!(server.tile_requests().await.is_empty());

    // Deadline passes: the 1024x512 level (4x2 tiles) loads in full
    viewer.pump(t0 + Duration::from_millis(100)).await;
    let requests = server.tile_requests().await;
    assert_eq!(requests.len(), 8);
    assert!(requests.contains(&"harbor/10/0_0.jpg".to_string()));
    assert!(requests.contains(&"harbor/10/3_1.jpg".to_string()));

    // The image area of the display carries the tile pixels
    let pixel = viewer.display().pixels().get_pixel(500, 400);
    assert_eq!(pixel[3], 255);
    assert!((pixel[0] as i32 - 120).abs() < 8);

    // A quiet follow-up pass finds nothing left to load
    viewer.pump(t0 + Duration::from_millis(1200)).await;
    assert_eq!(server.tile_requests().await.len(), 8);
}

#[tokio::test]
async fn test_zoomify_layout_end_to_end() {
    let server = MockImageServer::new(zoomify_manifest(4096, 2048)).with_tile_value(90);
    let mut viewer = mount(&server, "/images/atlas/manifest.json").await;

    let t0 = Instant::now();
    viewer.handle_resize(300.0, 200.0, t0);
    viewer.pump(t0 + Duration::from_millis(100)).await;

    // A 300px display sits on the coarsest level: one tile, group 0
    let requests = server.tile_requests().await;
    assert_eq!(requests, vec!["atlas/TileGroup0/1-0-0.jpg".to_string()]);

    let pixel = viewer.display().pixels().get_pixel(150, 80);
    assert!((pixel[0] as i32 - 90).abs() < 8);
}

// =============================================================================
// Zooming and Level Selection
// =============================================================================

#[tokio::test]
async fn test_zoom_in_advances_to_finer_level() {
    let server = MockImageServer::new(dzi_manifest(4096, 2048));
    let mut viewer = mount(&server, "/images/harbor/manifest.json").await;

    let t0 = Instant::now();
    viewer.handle_resize(1000.0, 800.0, t0);
    viewer.pump(t0 + Duration::from_millis(100)).await;
    assert_eq!(viewer.tile_set().unwrap().slot(), 2);

    // Five wheel steps: 1000px grows past the 1024-level's slack
    let t1 = t0 + Duration::from_secs(2);
    for i in 0..5 {
        viewer.handle_wheel(-1.0, 500.0, 400.0, t1 + Duration::from_millis(i * 50));
    }
    assert_eq!(viewer.tile_set().unwrap().slot(), 3);

    viewer.pump(t1 + Duration::from_millis(200) + Duration::from_secs(1)).await;
    assert!(server
        .tile_requests()
        .await
        .iter()
        .any(|url| url.starts_with("harbor/11/")));
}

#[tokio::test]
async fn test_gesture_latch_defers_coarser_levels_until_quiet() {
    let server = MockImageServer::new(dzi_manifest(4096, 2048));
    let mut viewer = mount(&server, "/images/harbor/manifest.json").await;

    let t0 = Instant::now();
    viewer.handle_resize(1000.0, 800.0, t0);

    let mut t = t0 + Duration::from_secs(2);
    for _ in 0..5 {
        viewer.handle_wheel(-1.0, 500.0, 400.0, t);
        t += Duration::from_millis(50);
    }
    assert_eq!(viewer.tile_set().unwrap().slot(), 3);

    // Zooming back out mid-gesture: ~561px would select slot 1, but the
    // latch holds the finer level
    for _ in 0..10 {
        viewer.handle_wheel(1.0, 500.0, 400.0, t);
        t += Duration::from_millis(50);
    }
    assert_eq!(viewer.tile_set().unwrap().slot(), 3);

    // The quiet period ends the gesture and settles onto the coarser level
    viewer.pump(t + Duration::from_secs(1)).await;
    assert_eq!(viewer.tile_set().unwrap().slot(), 1);
    assert!(server
        .tile_requests()
        .await
        .iter()
        .any(|url| url.starts_with("harbor/9/")));
}

// =============================================================================
// Failure Handling
// =============================================================================

#[tokio::test]
async fn test_failed_tiles_are_retried_up_to_the_limit() {
    let server = MockImageServer::new(dzi_manifest(4096, 2048)).failing_tiles();
    let mut viewer = mount(&server, "/images/harbor/manifest.json").await;

    let mut t = Instant::now();
    viewer.handle_resize(1000.0, 800.0, t);

    // Each pass needs an armed deadline; a pointer tap re-arms between
    // passes without moving the viewport.
    for pass in 0..4u64 {
        viewer.pump(t + Duration::from_secs(2)).await;
        t += Duration::from_secs(4);
        viewer.handle_pointer_down(PointerInput::new(pass, 10.0, 10.0));
        viewer.handle_pointer_up(PointerInput::new(pass, 10.0, 10.0), t);
    }

    // Three attempts per tile, then the budget is exhausted
    assert_eq!(server.request_count("harbor/10/0_0.jpg").await, 3);
    assert_eq!(server.request_count("harbor/10/3_1.jpg").await, 3);
}

// =============================================================================
// Backing Cap and Teardown
// =============================================================================

#[tokio::test]
async fn test_oversized_source_is_capped() {
    let server = MockImageServer::new(dzi_manifest(20_000, 5_000));
    let mut viewer = mount(&server, "/images/mural/manifest.json").await;

    // 100MP source against a ~14.4MP cap: composited at 0.38 scale
    assert!((viewer.viewport().source_scale - 0.38).abs() < 1e-9);

    // Even a huge container cannot push the display past the backing
    viewer.handle_resize(9000.0, 9000.0, Instant::now());
    assert_eq!(viewer.viewport().display_width, 7600.0);
    assert_eq!(viewer.viewport().display_height, 1900.0);
}

#[tokio::test]
async fn test_teardown_clears_display_and_stops_loading() {
    let server = MockImageServer::new(dzi_manifest(4096, 2048));
    let mut viewer = mount(&server, "/images/harbor/manifest.json").await;

    let t0 = Instant::now();
    viewer.handle_resize(1000.0, 800.0, t0);
    viewer.pump(t0 + Duration::from_millis(100)).await;
    assert_eq!(viewer.display().pixels().get_pixel(500, 400)[3], 255);
    let loaded = server.tile_requests().await.len();

    viewer.teardown();
    assert_eq!(viewer.display().pixels().get_pixel(500, 400)[3], 0);

    // Neither events nor pumps do anything afterwards
    viewer.handle_wheel(-1.0, 500.0, 400.0, t0 + Duration::from_secs(5));
    viewer.pump(t0 + Duration::from_secs(10)).await;
    assert_eq!(server.tile_requests().await.len(), loaded);
}
