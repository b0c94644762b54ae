//! The capture operation.
//!
//! [`capture`] is the crate's single inbound entry point: plan the grid,
//! sample every cell sequentially, composite, and route the result. The
//! media source's playback position is restored on **every** exit path —
//! success, error, cancellation, or the future being dropped mid-await — via
//! an internal guard.
//!
//! A second concurrent capture on the same source is a compile error: the
//! operation takes the source by `&mut`. Hosts whose handles are cloneable
//! must serialise capture requests themselves.

use crate::configuration::CaptureOptions;
use crate::error::CaptureError;
use crate::grid::GridLayout;
use crate::output::finalize;
use crate::player::PlayerHost;
use crate::progress::ProgressTracker;
use crate::sampler::FrameSampler;
use crate::sheet::ContactSheet;
use crate::source::MediaSource;

/// A caller-supplied capture request.
///
/// The grid token is free text forwarded by the presentation layer (for
/// example `"3x3"` from a menu selection). It is informational only — it
/// appears in labels and log lines but never controls sampling density,
/// which always follows the duration-derived layout (see
/// [`GridLayout::plan`]).
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    /// Base name for generated artifacts; downloads become `"{label}.png"`.
    pub label: String,
    /// The requested grid size as free text. Labeling only.
    pub grid_token: String,
}

impl CaptureRequest {
    /// Create a request from a label and a grid token.
    pub fn new(label: impl Into<String>, grid_token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            grid_token: grid_token.into(),
        }
    }
}

/// Restores the source's starting position when dropped.
///
/// The restore is a superseding, fire-and-forget seek: it is not awaited, so
/// it also works when the capture future is dropped mid-wait or when the
/// failure was the settle signal itself. Skipped when the position never
/// moved (no cell was ever sampled).
struct PositionGuard<'a, S: MediaSource + ?Sized> {
    source: &'a mut S,
    origin: f64,
}

impl<'a, S: MediaSource + ?Sized> PositionGuard<'a, S> {
    fn new(source: &'a mut S) -> Self {
        let origin = source.position();
        Self { source, origin }
    }

    fn source(&mut self) -> &mut S {
        self.source
    }
}

impl<S: MediaSource + ?Sized> Drop for PositionGuard<'_, S> {
    fn drop(&mut self) {
        if self.source.position() != self.origin {
            log::debug!("Restoring playback position to {:.3}s", self.origin);
            let _ = self.source.begin_seek(self.origin);
        }
    }
}

/// Capture a contact sheet, reading options from the player.
///
/// Reads [`PlayerHost::capture_options`] once at the start, then behaves as
/// [`capture_with_options`].
///
/// # Errors
///
/// All failures are logged and returned to the caller; there is no internal
/// retry. See [`CaptureError`] for the taxonomy.
///
/// # Example
///
/// ```
/// use framesheet::{CaptureRequest, SyntheticSource, capture};
/// # use framesheet::{CaptureError, CaptureOptions, FileDownload, PlayerHost, ScrubSheet};
/// # struct Host;
/// # impl PlayerHost for Host {
/// #     fn capture_options(&self) -> CaptureOptions { CaptureOptions::new() }
/// #     fn save_file(&mut self, _: FileDownload) -> Result<(), CaptureError> { Ok(()) }
/// #     fn show_poster(&mut self, _: String) -> Result<(), CaptureError> { Ok(()) }
/// #     fn install_scrub_sheet(&mut self, _: ScrubSheet) -> Result<(), CaptureError> { Ok(()) }
/// # }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), framesheet::CaptureError> {
/// let mut source = SyntheticSource::new(9.0, 1280, 720);
/// let mut player = Host;
/// capture(&mut source, &mut player, &CaptureRequest::new("clip", "3x3")).await?;
/// # Ok(())
/// # }
/// ```
pub async fn capture<S, P>(
    source: &mut S,
    player: &mut P,
    request: &CaptureRequest,
) -> Result<(), CaptureError>
where
    S: MediaSource + ?Sized,
    P: PlayerHost + ?Sized,
{
    let options = player.capture_options();
    capture_with_options(source, player, request, &options).await
}

/// Capture a contact sheet with explicit options.
///
/// Like [`capture`] but bypasses the player's configuration block, for
/// callers that build a [`CaptureOptions`] directly.
pub async fn capture_with_options<S, P>(
    source: &mut S,
    player: &mut P,
    request: &CaptureRequest,
    options: &CaptureOptions,
) -> Result<(), CaptureError>
where
    S: MediaSource + ?Sized,
    P: PlayerHost + ?Sized,
{
    let result = run_capture(source, player, request, options).await;
    if let Err(error) = &result {
        log::error!("Capture {:?} failed: {error}", request.label);
    }
    result
}

async fn run_capture<S, P>(
    source: &mut S,
    player: &mut P,
    request: &CaptureRequest,
    options: &CaptureOptions,
) -> Result<(), CaptureError>
where
    S: MediaSource + ?Sized,
    P: PlayerHost + ?Sized,
{
    let layout = GridLayout::plan(
        source.duration(),
        source.frame_width(),
        source.frame_height(),
        options,
    );

    log::debug!(
        "Capture {:?} (token {:?}): {}x{} grid, {}x{} cells",
        request.label,
        request.grid_token,
        layout.rows,
        layout.cols,
        layout.cell_width,
        layout.cell_height,
    );

    let mut sheet = ContactSheet::new(layout);
    let mut tracker = ProgressTracker::new(options.progress.clone(), u64::from(layout.cell_count()));

    let mut guard = PositionGuard::new(source);
    {
        let mut sampler = FrameSampler::new(guard.source(), layout, options);
        while let Some(result) = sampler.next_sample().await {
            let sample = result?;
            sheet.draw(sample.row, sample.col, &sample.frame)?;
            tracker.advance(sample.position);
        }
    }
    tracker.finish();

    debug_assert!(sheet.is_complete());
    finalize(&sheet, request, options, player)?;

    // Restore happens here on success; the guard's Drop covers every
    // earlier exit.
    drop(guard);
    Ok(())
}
