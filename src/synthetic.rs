//! A scriptable in-memory media source.
//!
//! [`SyntheticSource`] stands in for a real player backend during tests,
//! demos, and host-integration development. Frames are painted procedurally
//! (fill colour varies with position, so grid cells are distinguishable),
//! and the settle behaviour of each seek is scriptable via
//! [`SettleBehavior`] — including pathological backends that never settle or
//! abandon their seeks.
//!
//! The source also instruments itself: it logs every requested seek position
//! and tracks the maximum number of simultaneously outstanding seeks, which
//! the sampler must keep at one.

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};
use std::time::Duration;

use image::{DynamicImage, Rgb, RgbImage};

use crate::error::CaptureError;
use crate::source::{MediaSource, SettleSender, SettleSignal, settle_channel};

/// How a [`SyntheticSource`] answers each seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleBehavior {
    /// Fire the settle signal inline from `begin_seek`.
    Immediate,
    /// Fire the settle signal from a spawned timer task after the delay.
    ///
    /// Requires a Tokio runtime context. Exercises real asynchrony: the
    /// waiter genuinely suspends between seek and settle.
    Delayed(Duration),
    /// Keep the sender alive but never fire it. Waiters hit their timeout.
    Never,
    /// Drop the sender unfired. Waiters observe an abandoned seek.
    DropSender,
}

/// An in-memory [`MediaSource`] with scriptable behaviour and
/// instrumentation.
///
/// # Example
///
/// ```
/// use framesheet::{MediaSource, SyntheticSource};
///
/// let mut source = SyntheticSource::new(9.0, 1280, 720);
/// assert_eq!(source.duration(), 9.0);
/// let _settle = source.begin_seek(4.0);
/// assert_eq!(source.position(), 4.0);
/// ```
pub struct SyntheticSource {
    duration: f64,
    width: u32,
    height: u32,
    position: f64,
    settle: SettleBehavior,
    block_extraction: bool,
    /// Requested (pre-clamp) seek positions, in order.
    seek_log: Vec<f64>,
    /// Senders parked by [`SettleBehavior::Never`]; superseded on the next
    /// seek.
    parked: Vec<SettleSender>,
    outstanding: Arc<AtomicU32>,
    max_outstanding: Arc<AtomicU32>,
}

impl SyntheticSource {
    /// Create a source with the given duration (seconds) and native frame
    /// dimensions, settling seeks immediately.
    pub fn new(duration: f64, width: u32, height: u32) -> Self {
        Self {
            duration,
            width,
            height,
            position: 0.0,
            settle: SettleBehavior::Immediate,
            block_extraction: false,
            seek_log: Vec::new(),
            parked: Vec::new(),
            outstanding: Arc::new(AtomicU32::new(0)),
            max_outstanding: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Script how seeks settle.
    #[must_use]
    pub fn with_settle(mut self, behavior: SettleBehavior) -> Self {
        self.settle = behavior;
        self
    }

    /// Start playback at `position` instead of zero.
    #[must_use]
    pub fn with_position(mut self, position: f64) -> Self {
        self.position = position.clamp(0.0, self.duration);
        self
    }

    /// Refuse pixel extraction, as a cross-origin resource would.
    #[must_use]
    pub fn with_blocked_extraction(mut self) -> Self {
        self.block_extraction = true;
        self
    }

    /// Every seek position requested so far, pre-clamp, in order.
    pub fn seek_log(&self) -> &[f64] {
        &self.seek_log
    }

    /// Number of seeks requested so far.
    pub fn seek_count(&self) -> usize {
        self.seek_log.len()
    }

    /// The highest number of seeks that were ever outstanding at once.
    ///
    /// A seek is outstanding from `begin_seek` until its settle signal fires
    /// or it is superseded. Sequential sampling keeps this at one.
    pub fn max_outstanding_seeks(&self) -> u32 {
        self.max_outstanding.load(Ordering::SeqCst)
    }
}

impl MediaSource for SyntheticSource {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn frame_width(&self) -> u32 {
        self.width
    }

    fn frame_height(&self) -> u32 {
        self.height
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn begin_seek(&mut self, position: f64) -> SettleSignal {
        // A new seek supersedes any still-parked one.
        for superseded in self.parked.drain(..) {
            drop(superseded);
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
        }

        self.seek_log.push(position);
        self.position = position.clamp(0.0, self.duration);

        let now = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_outstanding.fetch_max(now, Ordering::SeqCst);

        let (sender, signal) = settle_channel();
        match self.settle {
            SettleBehavior::Immediate => {
                self.outstanding.fetch_sub(1, Ordering::SeqCst);
                sender.fire();
            }
            SettleBehavior::Delayed(delay) => {
                let outstanding = Arc::clone(&self.outstanding);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    outstanding.fetch_sub(1, Ordering::SeqCst);
                    sender.fire();
                });
            }
            SettleBehavior::Never => {
                self.parked.push(sender);
            }
            SettleBehavior::DropSender => {
                self.outstanding.fetch_sub(1, Ordering::SeqCst);
                drop(sender);
            }
        }

        signal
    }

    fn current_frame(&mut self) -> Result<DynamicImage, CaptureError> {
        if self.block_extraction {
            return Err(CaptureError::CaptureBlocked {
                reason: "synthetic source configured to refuse pixel access".to_string(),
            });
        }

        // Position-dependent fill so every sampled cell looks different.
        let progress = if self.duration > 0.0 {
            (self.position / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let shade = (progress * 255.0) as u8;
        let fill = Rgb([shade, 255 - shade, 64]);

        let frame = RgbImage::from_pixel(self.width, self.height, fill);
        Ok(DynamicImage::ImageRgb8(frame))
    }
}
