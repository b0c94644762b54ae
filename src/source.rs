//! The media-source seam and settle-signal plumbing.
//!
//! [`MediaSource`] is the crate's view of the host player's playback facility:
//! duration, native dimensions, a mutable playback position driven through
//! [`begin_seek`](MediaSource::begin_seek), and access to the currently
//! paintable frame. The crate never constructs a source — it borrows one for
//! the duration of a single capture.
//!
//! Seek readiness is communicated through a single-fire settle signal: each
//! seek mints a fresh [`SettleSender`] / [`SettleSignal`] pair via
//! [`settle_channel`], and the backend fires the sender exactly once when the
//! sought frame has fully decoded. There is no polling anywhere.

use image::DynamicImage;
use tokio::sync::oneshot;

use crate::error::CaptureError;

/// A playable video resource owned by the host player.
///
/// Implementations must clamp requested seek positions into
/// `[0, duration()]`. Issuing a new seek while an earlier one is still
/// pending supersedes the earlier seek; a superseded settle signal may never
/// fire, and waiters on it observe the sender being dropped.
///
/// The crate ships two implementations:
/// [`SyntheticSource`](crate::SyntheticSource) (in-memory, scriptable) and,
/// behind the `ffmpeg` feature, [`FfmpegSource`](crate::ffmpeg::FfmpegSource).
pub trait MediaSource {
    /// Total duration of the resource in seconds. Never negative.
    fn duration(&self) -> f64;

    /// Native frame width in pixels.
    fn frame_width(&self) -> u32;

    /// Native frame height in pixels.
    fn frame_height(&self) -> u32;

    /// The current playback position in seconds.
    ///
    /// Reflects the most recently requested seek target (clamped), even while
    /// that seek is still settling.
    fn position(&self) -> f64;

    /// Start an asynchronous seek to `position` (seconds).
    ///
    /// Returns the settle signal for this seek. The backend fires it exactly
    /// once when the frame at the new position is decoded and paintable.
    fn begin_seek(&mut self, position: f64) -> SettleSignal;

    /// Grab the currently paintable frame.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::CaptureBlocked`] when the resource forbids
    /// pixel extraction, or [`CaptureError::Source`] when no decoded frame is
    /// available.
    fn current_frame(&mut self) -> Result<DynamicImage, CaptureError>;
}

/// The firing half of a settle channel, held by the media backend.
///
/// Consumed by [`fire`](SettleSender::fire); a sender that is dropped without
/// firing surfaces to the waiter as [`SettleLost`].
#[derive(Debug)]
pub struct SettleSender {
    sender: oneshot::Sender<()>,
}

impl SettleSender {
    /// Report the seek as settled. Consumes the sender — a settle signal
    /// fires at most once.
    pub fn fire(self) {
        let _ = self.sender.send(());
    }
}

/// The waiting half of a settle channel, returned from
/// [`MediaSource::begin_seek`].
#[derive(Debug)]
pub struct SettleSignal {
    receiver: oneshot::Receiver<()>,
}

impl SettleSignal {
    /// Suspend until the backend fires the paired [`SettleSender`].
    ///
    /// # Errors
    ///
    /// Returns [`SettleLost`] if the sender was dropped unfired — the backend
    /// abandoned or superseded the seek.
    pub async fn wait(self) -> Result<(), SettleLost> {
        self.receiver.await.map_err(|_| SettleLost)
    }
}

/// The settle sender was dropped without firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleLost;

/// Mint a fresh single-fire settle channel for one seek operation.
pub fn settle_channel() -> (SettleSender, SettleSignal) {
    let (sender, receiver) = oneshot::channel();
    (SettleSender { sender }, SettleSignal { receiver })
}
