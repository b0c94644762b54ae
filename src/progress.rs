//! Progress reporting and cancellation support.
//!
//! This module provides [`ProgressCallback`] for monitoring capture progress,
//! [`CancellationToken`] for cooperative cancellation, and [`ProgressInfo`]
//! for per-cell progress snapshots.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framesheet::{CaptureOptions, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("cell {}/{} ({:.1}%)", info.current_cell, info.total_cells, info.percentage);
//!     }
//! }
//!
//! let options = CaptureOptions::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// A snapshot of capture progress, delivered once per composited cell.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// How many grid cells have been captured and drawn so far.
    pub current_cell: u64,
    /// Total cells in the planned grid.
    pub total_cells: u64,
    /// Completion percentage (0.0 – 100.0).
    pub percentage: f32,
    /// Wall-clock time elapsed since the capture started.
    pub elapsed: Duration,
    /// Playback position (seconds) of the most recently captured cell, if any.
    pub position: Option<f64>,
}

/// Trait for receiving progress updates during a capture.
///
/// Implementations must be [`Send`] and [`Sync`] because callbacks may be
/// shared across tasks.
///
/// Progress callbacks are **infallible** — they observe but cannot halt the
/// capture. Use [`CancellationToken`] for cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called after each cell is captured, and once more when the capture
    /// finishes.
    fn on_progress(&self, info: &ProgressInfo);
}

/// A no-op implementation that discards all progress notifications.
///
/// This is the default when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it between tasks; call
/// [`cancel`](CancellationToken::cancel) from anywhere to request cancellation
/// of the associated capture. The capture loop checks
/// [`is_cancelled`](CancellationToken::is_cancelled) before each seek.
///
/// # Example
///
/// ```
/// use framesheet::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// // From another task (or a signal handler, etc.):
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// All clones of this token will observe the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal helper that tracks capture timing and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: u64,
    current: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: u64) -> Self {
        Self {
            callback,
            total,
            current: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one composited cell and fire the callback.
    pub(crate) fn advance(&mut self, position: f64) {
        self.current += 1;
        self.report(Some(position));
    }

    /// Unconditionally emit a final progress report.
    pub(crate) fn finish(&mut self) {
        self.report(None);
    }

    fn report(&self, position: Option<f64>) {
        let percentage = if self.total > 0 {
            (self.current as f32 / self.total as f32) * 100.0
        } else {
            100.0
        };

        let info = ProgressInfo {
            current_cell: self.current,
            total_cells: self.total,
            percentage,
            elapsed: self.start_time.elapsed(),
            position,
        };

        self.callback.on_progress(&info);
    }
}
