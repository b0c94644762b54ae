//! Capture configuration.
//!
//! [`CaptureOptions`] is a builder that carries cell-size overrides, the
//! output-mode selector, the settle timeout, and progress/cancellation
//! settings through a capture without polluting every function signature.
//!
//! It also understands the host player's raw configuration block (the
//! `thumbnailCreate` object, a JSON value with optional `width`, `height`,
//! and `after` fields) via [`CaptureOptions::from_player_config`], parsed
//! permissively: malformed fields fall back to defaults rather than failing.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use framesheet::{CancellationToken, CaptureOptions, OutputMode};
//!
//! let token = CancellationToken::new();
//! let options = CaptureOptions::new()
//!     .with_cell_size(160, 90)
//!     .with_after(OutputMode::Download)
//!     .with_settle_timeout(Duration::from_secs(5))
//!     .with_cancellation(token.clone());
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::output::OutputMode;
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Default upper bound on how long one seek may take to settle.
const DEFAULT_SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for one capture operation.
///
/// All fields have defaults — a default-constructed value captures with
/// native-derived cell sizes, no configured output mode (finalisation becomes
/// a no-op), a ten-second settle timeout, and no progress or cancellation.
#[derive(Clone)]
pub struct CaptureOptions {
    /// Cell width override in pixels. `None` or zero falls back to a tenth
    /// of the source's native width.
    pub(crate) cell_width: Option<u32>,
    /// Cell height override in pixels. Same fallback rule as the width.
    pub(crate) cell_height: Option<u32>,
    /// Where the finished composite goes. `None` discards it with a warning.
    pub(crate) after: Option<OutputMode>,
    /// Upper bound on each individual seek-settle wait.
    pub(crate) settle_timeout: Duration,
    /// Progress callback. Defaults to a no-op.
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// Cancellation token. `None` means never cancelled.
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Debug for CaptureOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CaptureOptions")
            .field("cell_width", &self.cell_width)
            .field("cell_height", &self.cell_height)
            .field("after", &self.after)
            .field("settle_timeout", &self.settle_timeout)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            cell_width: None,
            cell_height: None,
            after: None,
            settle_timeout: DEFAULT_SETTLE_TIMEOUT,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
        }
    }

    /// Parse the host player's raw `thumbnailCreate` configuration block.
    ///
    /// Parsing is deliberately permissive, matching how the player treats
    /// the block: missing or non-positive dimensions keep the native-derived
    /// default, and an unrecognised `after` string is logged and ignored
    /// (the capture then runs but routes nowhere).
    ///
    /// # Example
    ///
    /// ```
    /// use framesheet::{CaptureOptions, OutputMode};
    ///
    /// let block = serde_json::json!({ "width": 160, "height": 90, "after": "poster" });
    /// let options = CaptureOptions::from_player_config(&block);
    /// assert_eq!(options.after(), Some(OutputMode::Poster));
    /// ```
    pub fn from_player_config(block: &Value) -> Self {
        let mut options = Self::new();

        options.cell_width = block
            .get("width")
            .and_then(Value::as_u64)
            .filter(|width| *width > 0)
            .map(|width| width as u32);
        options.cell_height = block
            .get("height")
            .and_then(Value::as_u64)
            .filter(|height| *height > 0)
            .map(|height| height as u32);

        if let Some(after) = block.get("after").and_then(Value::as_str) {
            match OutputMode::parse(after) {
                Some(mode) => options.after = Some(mode),
                None => log::warn!("Unrecognised output mode {after:?}; composite will be discarded"),
            }
        }

        options
    }

    /// Override both cell dimensions in pixels.
    ///
    /// Zero values are ignored at planning time and keep the native-derived
    /// default for that dimension.
    #[must_use]
    pub fn with_cell_size(mut self, width: u32, height: u32) -> Self {
        self.cell_width = Some(width);
        self.cell_height = Some(height);
        self
    }

    /// Select where the finished composite is routed.
    #[must_use]
    pub fn with_after(mut self, mode: OutputMode) -> Self {
        self.after = Some(mode);
        self
    }

    /// Set the upper bound on each seek-settle wait.
    ///
    /// When a settle signal does not fire within this window the capture
    /// fails with [`CaptureError::SeekTimeout`](crate::CaptureError) instead
    /// of hanging.
    #[must_use]
    pub fn with_settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = timeout;
        self
    }

    /// Attach a progress callback, invoked once per composited cell.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// When the token is cancelled, the capture stops before its next seek
    /// and returns [`CaptureError::Cancelled`](crate::CaptureError).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The configured output mode, if any.
    pub fn after(&self) -> Option<OutputMode> {
        self.after
    }

    /// The configured settle timeout.
    pub fn settle_timeout(&self) -> Duration {
        self.settle_timeout
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
