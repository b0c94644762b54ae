//! End-to-end capture tests against the scriptable synthetic source.

use std::time::Duration;

use framesheet::{
    CancellationToken, CaptureError, CaptureOptions, CaptureRequest, FileDownload, MediaSource,
    OutputMode, PlayerHost, ScrubSheet, SettleBehavior, SyntheticSource, capture,
    capture_with_options,
};

/// A [`PlayerHost`] that records everything routed to it.
struct RecordingHost {
    options: CaptureOptions,
    downloads: Vec<FileDownload>,
    posters: Vec<String>,
    scrub_sheets: Vec<ScrubSheet>,
}

impl RecordingHost {
    fn new(options: CaptureOptions) -> Self {
        Self {
            options,
            downloads: Vec::new(),
            posters: Vec::new(),
            scrub_sheets: Vec::new(),
        }
    }
}

impl PlayerHost for RecordingHost {
    fn capture_options(&self) -> CaptureOptions {
        self.options.clone()
    }

    fn save_file(&mut self, download: FileDownload) -> Result<(), CaptureError> {
        self.downloads.push(download);
        Ok(())
    }

    fn show_poster(&mut self, uri: String) -> Result<(), CaptureError> {
        self.posters.push(uri);
        Ok(())
    }

    fn install_scrub_sheet(&mut self, sheet: ScrubSheet) -> Result<(), CaptureError> {
        self.scrub_sheets.push(sheet);
        Ok(())
    }
}

// ── Download routing ───────────────────────────────────────────────

#[tokio::test]
async fn nine_second_video_downloads_a_three_by_three_sheet() {
    let mut source = SyntheticSource::new(9.0, 1280, 720);
    let mut host = RecordingHost::new(CaptureOptions::new().with_after(OutputMode::Download));

    capture(&mut source, &mut host, &CaptureRequest::new("clip", "3x3"))
        .await
        .expect("capture failed");

    // 9 sampling seeks plus the restore seek back to the start.
    assert_eq!(source.seek_count(), 10);
    assert_eq!(host.downloads.len(), 1);

    let download = &host.downloads[0];
    assert_eq!(download.filename, "clip.png");
    assert_eq!(download.media_type, "application/octet-stream");
    assert!(!download.bytes.is_empty());
    // PNG magic number.
    assert_eq!(&download.bytes[..4], &[0x89, b'P', b'N', b'G']);

    let decoded = image::load_from_memory(&download.bytes).expect("payload should be a valid PNG");
    // 3x3 grid of 128x72 cells (a tenth of 1280x720).
    assert_eq!(decoded.width(), 384);
    assert_eq!(decoded.height(), 216);

    // Step is 1s; requested offsets walk 1.075, 2.150, ... 9.675.
    for (index, requested) in source.seek_log()[..9].iter().enumerate() {
        assert!((requested - 1.075 * (index + 1) as f64).abs() < 1e-9);
    }
}

#[tokio::test]
async fn seeks_step_with_overshoot() {
    let mut source = SyntheticSource::new(100.0, 640, 480);
    let mut host = RecordingHost::new(CaptureOptions::new().with_after(OutputMode::Download));

    capture(&mut source, &mut host, &CaptureRequest::new("long", "10x10"))
        .await
        .expect("capture failed");

    // 100 cells, nominal step 1s, each seek overshoots by 7.5%. The final
    // entry is the restore seek.
    let log = source.seek_log();
    assert_eq!(log.len(), 101);
    assert!((log[0] - 1.075).abs() < 1e-9);
    assert!((log[1] - 2.15).abs() < 1e-9);

    // Requested targets are raw: the accumulated overshoot walks past the
    // duration near the end, and the source clamps.
    assert!(log[99] > 100.0);
}

// ── Degenerate grids ───────────────────────────────────────────────

#[tokio::test]
async fn sub_second_video_routes_an_empty_payload_without_seeking() {
    let mut source = SyntheticSource::new(0.5, 1920, 1080);
    let mut host = RecordingHost::new(CaptureOptions::new().with_after(OutputMode::Download));

    capture(&mut source, &mut host, &CaptureRequest::new("tiny", "0x0"))
        .await
        .expect("degenerate capture should succeed");

    assert_eq!(source.seek_count(), 0, "no cells means no seeks");
    assert_eq!(host.downloads.len(), 1);
    assert!(host.downloads[0].bytes.is_empty());
}

#[tokio::test]
async fn grid_token_does_not_control_sampling() {
    let mut source = SyntheticSource::new(9.0, 1280, 720);
    let mut host = RecordingHost::new(CaptureOptions::new().with_after(OutputMode::Download));

    // A wildly wrong token still produces the duration-derived 3x3 grid.
    capture(&mut source, &mut host, &CaptureRequest::new("clip", "99x99"))
        .await
        .expect("capture failed");

    assert_eq!(source.seek_count(), 10); // 9 cells + restore
}

// ── Sequentiality ──────────────────────────────────────────────────

#[tokio::test]
async fn seeks_never_overlap_with_delayed_settles() {
    let mut source = SyntheticSource::new(16.0, 800, 600)
        .with_settle(SettleBehavior::Delayed(Duration::from_millis(2)));
    let mut host = RecordingHost::new(CaptureOptions::new().with_after(OutputMode::Download));

    capture(&mut source, &mut host, &CaptureRequest::new("clip", "4x4"))
        .await
        .expect("capture failed");

    assert_eq!(source.seek_count(), 17); // 16 cells + restore
    assert_eq!(
        source.max_outstanding_seeks(),
        1,
        "a new seek must wait for the previous settle"
    );
}

// ── Settle failures ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn stalled_settle_times_out_instead_of_hanging() {
    let mut source = SyntheticSource::new(9.0, 1280, 720).with_settle(SettleBehavior::Never);
    let options = CaptureOptions::new()
        .with_after(OutputMode::Download)
        .with_settle_timeout(Duration::from_secs(3));
    let mut host = RecordingHost::new(options.clone());

    let result = capture_with_options(
        &mut source,
        &mut host,
        &CaptureRequest::new("stuck", "3x3"),
        &options,
    )
    .await;

    match result {
        Err(CaptureError::SeekTimeout { position, waited }) => {
            assert!((position - 1.075).abs() < 1e-9);
            assert_eq!(waited, Duration::from_secs(3));
        }
        other => panic!("expected SeekTimeout, got {other:?}"),
    }

    assert!(host.downloads.is_empty(), "nothing should be routed");
}

#[tokio::test]
async fn abandoned_settle_fails_as_seek_dropped() {
    let mut source = SyntheticSource::new(9.0, 1280, 720).with_settle(SettleBehavior::DropSender);
    let mut host = RecordingHost::new(CaptureOptions::new().with_after(OutputMode::Download));

    let result = capture(&mut source, &mut host, &CaptureRequest::new("gone", "3x3")).await;

    match result {
        Err(CaptureError::SeekDropped { position }) => {
            assert!((position - 1.075).abs() < 1e-9);
        }
        other => panic!("expected SeekDropped, got {other:?}"),
    }
}

#[tokio::test]
async fn blocked_extraction_fails_the_capture() {
    let mut source = SyntheticSource::new(9.0, 1280, 720).with_blocked_extraction();
    let mut host = RecordingHost::new(CaptureOptions::new().with_after(OutputMode::Download));

    let result = capture(&mut source, &mut host, &CaptureRequest::new("cors", "3x3")).await;

    assert!(matches!(result, Err(CaptureError::CaptureBlocked { .. })));
    assert!(host.downloads.is_empty());
}

// ── Position restoration ───────────────────────────────────────────

#[tokio::test]
async fn position_restored_after_successful_capture() {
    let mut source = SyntheticSource::new(25.0, 1280, 720).with_position(12.5);
    let mut host = RecordingHost::new(CaptureOptions::new().with_after(OutputMode::Download));

    capture(&mut source, &mut host, &CaptureRequest::new("clip", "5x5"))
        .await
        .expect("capture failed");

    assert_eq!(source.position(), 12.5);
    // 25 sampling seeks plus the restore seek.
    assert_eq!(source.seek_count(), 26);
    assert_eq!(*source.seek_log().last().unwrap(), 12.5);
}

#[tokio::test]
async fn position_restored_after_failed_capture() {
    let mut source = SyntheticSource::new(9.0, 1280, 720)
        .with_position(4.0)
        .with_blocked_extraction();
    let mut host = RecordingHost::new(CaptureOptions::new().with_after(OutputMode::Download));

    let result = capture(&mut source, &mut host, &CaptureRequest::new("clip", "3x3")).await;

    assert!(result.is_err());
    assert_eq!(source.position(), 4.0, "failure must still restore");
}

#[tokio::test(start_paused = true)]
async fn position_restored_after_timeout() {
    let mut source = SyntheticSource::new(9.0, 1280, 720)
        .with_position(2.0)
        .with_settle(SettleBehavior::Never);
    let options = CaptureOptions::new()
        .with_after(OutputMode::Download)
        .with_settle_timeout(Duration::from_millis(100));
    let mut host = RecordingHost::new(options.clone());

    let result = capture_with_options(
        &mut source,
        &mut host,
        &CaptureRequest::new("clip", "3x3"),
        &options,
    )
    .await;

    assert!(matches!(result, Err(CaptureError::SeekTimeout { .. })));
    assert_eq!(source.position(), 2.0);
}

#[tokio::test]
async fn degenerate_capture_performs_no_restore_seek() {
    // The position never moves, so the restore guard must stay silent.
    let mut source = SyntheticSource::new(0.2, 1280, 720).with_position(0.1);
    let mut host = RecordingHost::new(CaptureOptions::new().with_after(OutputMode::Download));

    capture(&mut source, &mut host, &CaptureRequest::new("tiny", "0x0"))
        .await
        .expect("capture failed");

    assert_eq!(source.seek_count(), 0);
}

// ── Cancellation ───────────────────────────────────────────────────

#[tokio::test]
async fn pre_cancelled_capture_stops_before_any_seek() {
    let token = CancellationToken::new();
    token.cancel();

    let options = CaptureOptions::new()
        .with_after(OutputMode::Download)
        .with_cancellation(token);
    let mut source = SyntheticSource::new(9.0, 1280, 720);
    let mut host = RecordingHost::new(options.clone());

    let result = capture_with_options(
        &mut source,
        &mut host,
        &CaptureRequest::new("clip", "3x3"),
        &options,
    )
    .await;

    assert!(matches!(result, Err(CaptureError::Cancelled)));
    assert_eq!(source.seek_count(), 0);
}

// ── Poster and scrub-sheet routing ─────────────────────────────────

#[tokio::test]
async fn poster_mode_delivers_a_png_data_uri() {
    let mut source = SyntheticSource::new(4.0, 1000, 500);
    let mut host = RecordingHost::new(CaptureOptions::new().with_after(OutputMode::Poster));

    capture(&mut source, &mut host, &CaptureRequest::new("clip", "2x2"))
        .await
        .expect("capture failed");

    assert_eq!(host.posters.len(), 1);
    assert!(host.downloads.is_empty());

    let uri = &host.posters[0];
    assert!(uri.starts_with("data:image/png;base64,"));

    let bytes = framesheet::decode_data_uri(uri).expect("URI should round-trip");
    let decoded = image::load_from_memory(&bytes).expect("poster should be a valid PNG");
    assert_eq!(decoded.width(), 200);
    assert_eq!(decoded.height(), 100);
}

#[tokio::test]
async fn thumbnail_sheet_mode_installs_a_descriptor() {
    let options = CaptureOptions::new()
        .with_after(OutputMode::ThumbnailSheet)
        .with_cell_size(160, 90);
    let mut source = SyntheticSource::new(16.0, 1280, 720);
    let mut host = RecordingHost::new(options.clone());

    capture_with_options(
        &mut source,
        &mut host,
        &CaptureRequest::new("clip", "4x4"),
        &options,
    )
    .await
    .expect("capture failed");

    assert_eq!(host.scrub_sheets.len(), 1);
    let sheet = &host.scrub_sheets[0];
    assert!(sheet.enabled);
    assert_eq!(sheet.frame_count, 16);
    assert_eq!((sheet.rows, sheet.cols), (4, 4));
    assert_eq!((sheet.cell_width, sheet.cell_height), (160, 90));
    assert_eq!((sheet.offset_x, sheet.offset_y), (0, 0));
    assert_eq!(sheet.image_uris.len(), 1);
    assert!(sheet.image_uris[0].starts_with("data:image/png;base64,"));
}

/// Persists downloads to a directory, as a real host would.
struct PersistingHost {
    options: CaptureOptions,
    dir: std::path::PathBuf,
}

impl PlayerHost for PersistingHost {
    fn capture_options(&self) -> CaptureOptions {
        self.options.clone()
    }

    fn save_file(&mut self, download: FileDownload) -> Result<(), CaptureError> {
        std::fs::write(self.dir.join(&download.filename), &download.bytes)?;
        Ok(())
    }

    fn show_poster(&mut self, _uri: String) -> Result<(), CaptureError> {
        Ok(())
    }

    fn install_scrub_sheet(&mut self, _sheet: ScrubSheet) -> Result<(), CaptureError> {
        Ok(())
    }
}

#[tokio::test]
async fn downloads_persist_as_loadable_png_files() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let options = CaptureOptions::new().with_after(OutputMode::Download);
    let mut source = SyntheticSource::new(4.0, 640, 480);
    let mut host = PersistingHost {
        options: options.clone(),
        dir: dir.path().to_path_buf(),
    };

    capture_with_options(
        &mut source,
        &mut host,
        &CaptureRequest::new("saved", "2x2"),
        &options,
    )
    .await
    .expect("capture failed");

    let path = dir.path().join("saved.png");
    let decoded = image::open(&path).expect("saved file should be a loadable PNG");
    assert_eq!(decoded.width(), 128); // 2 cells of 64px (a tenth of 640)
    assert_eq!(decoded.height(), 96);
}

#[tokio::test]
async fn missing_output_mode_discards_the_composite() {
    let mut source = SyntheticSource::new(9.0, 1280, 720);
    let mut host = RecordingHost::new(CaptureOptions::new());

    capture(&mut source, &mut host, &CaptureRequest::new("clip", "3x3"))
        .await
        .expect("a missing mode is not an error");

    assert!(host.downloads.is_empty());
    assert!(host.posters.is_empty());
    assert!(host.scrub_sheets.is_empty());
    // The frames were still sampled.
    assert_eq!(source.seek_count(), 10); // 9 cells + restore
}
