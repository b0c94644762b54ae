//! Lazy, pull-based frame sampling.
//!
//! [`FrameSampler`] drives the media source's playback position through the
//! grid's timestamps, one cell at a time: advance the position, suspend on
//! that seek's settle signal, then grab the decoded frame. Each call to
//! [`next_sample`](FrameSampler::next_sample) performs exactly one of those
//! seek-wait-grab cycles.
//!
//! Sequentiality is the correctness-critical invariant here: seek `k + 1` is
//! issued only after seek `k` has settled and its frame has been consumed.
//! The underlying source has exactly one decode position, so overlapping
//! seeks would produce duplicate frames or undefined backend behaviour. The
//! sampler upholds the invariant structurally — there is no code path that
//! starts a seek while another is pending.

use std::time::Duration;

use image::DynamicImage;

use crate::configuration::CaptureOptions;
use crate::error::CaptureError;
use crate::grid::GridLayout;
use crate::progress::CancellationToken;
use crate::source::MediaSource;

/// Seek-target multiplier compensating for decoder seek rounding.
///
/// Decoders snap seeks to nearby keyframes; stepping 7.5% past the nominal
/// interval keeps successive cells visually distinct instead of re-sampling
/// the same keyframe.
const SEEK_OVERSHOOT: f64 = 1.075;

/// One captured grid cell.
#[derive(Debug)]
pub struct Sample {
    /// Destination row in the grid.
    pub row: u32,
    /// Destination column in the grid.
    pub col: u32,
    /// The decoded frame at the settled position.
    pub frame: DynamicImage,
    /// The source's effective position (seconds) when the frame was grabbed.
    pub position: f64,
}

/// A lazy sampler yielding one [`Sample`] per grid cell, in row-major order.
///
/// Borrows the media source mutably for its whole lifetime, so nothing else
/// can seek the source while sampling is in progress. Not restartable: it
/// walks forward from wherever the source's position was at construction.
///
/// Any failure (timeout, dropped settle, blocked extraction, cancellation)
/// ends the sequence; subsequent calls return `None`.
pub struct FrameSampler<'a, S: MediaSource + ?Sized> {
    source: &'a mut S,
    layout: GridLayout,
    /// Nominal seconds between samples: `duration / (rows * cols)`.
    step: f64,
    settle_timeout: Duration,
    cancellation: Option<CancellationToken>,
    next_index: u32,
    total: u32,
}

impl<'a, S: MediaSource + ?Sized> FrameSampler<'a, S> {
    /// Create a sampler over `source` for the given layout.
    pub fn new(source: &'a mut S, layout: GridLayout, options: &CaptureOptions) -> Self {
        let total = layout.cell_count();
        let step = if total > 0 {
            source.duration() / f64::from(total)
        } else {
            0.0
        };

        Self {
            source,
            layout,
            step,
            settle_timeout: options.settle_timeout,
            cancellation: options.cancellation.clone(),
            next_index: 0,
            total,
        }
    }

    /// The nominal sampling interval in seconds.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Capture the next cell, or `None` once the grid is exhausted.
    ///
    /// Suspends until this cell's seek settles. On `Err` the sampler is
    /// finished; the error carries the failed seek's position.
    pub async fn next_sample(&mut self) -> Option<Result<Sample, CaptureError>> {
        if self.next_index >= self.total {
            return None;
        }

        if self
            .cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
        {
            self.next_index = self.total;
            return Some(Err(CaptureError::Cancelled));
        }

        let index = self.next_index;
        self.next_index += 1;

        let row = index / self.layout.cols;
        let col = index % self.layout.cols;

        match self.capture_cell(row, col).await {
            Ok(sample) => Some(Ok(sample)),
            Err(error) => {
                // A failed cell ends the walk; later cells would sample
                // from an unknown decode position.
                self.next_index = self.total;
                Some(Err(error))
            }
        }
    }

    async fn capture_cell(&mut self, row: u32, col: u32) -> Result<Sample, CaptureError> {
        let target = self.source.position() + self.step * SEEK_OVERSHOOT;

        log::trace!("Sampling cell ({row}, {col}) at {target:.3}s");

        let settle = self.source.begin_seek(target);
        match tokio::time::timeout(self.settle_timeout, settle.wait()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                return Err(CaptureError::SeekDropped { position: target });
            }
            Err(_) => {
                return Err(CaptureError::SeekTimeout {
                    position: target,
                    waited: self.settle_timeout,
                });
            }
        }

        let frame = self.source.current_frame()?;
        Ok(Sample {
            row,
            col,
            frame,
            position: self.source.position(),
        })
    }
}
