//! Error types for the `framesheet` crate.
//!
//! This module defines [`CaptureError`], the unified error type returned by all
//! fallible operations in the crate. Errors carry enough context to diagnose a
//! failed capture, including seek positions and wait durations.

use std::{io::Error as IoError, time::Duration};

use image::ImageError;
use thiserror::Error;

/// The unified error type for all `framesheet` operations.
///
/// Every public method that can fail returns `Result<T, CaptureError>`.
/// A degenerate grid (duration under one second) is **not** an error; it
/// produces an empty composite that is still routed to the configured sink.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CaptureError {
    /// A seek was issued but its settle signal did not fire in time.
    ///
    /// Produced when the media backend never reports the sought frame as
    /// decoded and paintable. The capture's position-restore guard still runs.
    #[error("Seek to {position:.3}s did not settle within {waited:?}")]
    SeekTimeout {
        /// The requested seek position in seconds.
        position: f64,
        /// How long the sampler waited before giving up.
        waited: Duration,
    },

    /// The media backend dropped the settle sender without firing it.
    ///
    /// Indicates an abandoned or malformed resource: the backend gave up on
    /// the seek rather than stalling on it.
    #[error("Seek to {position:.3}s was abandoned by the media backend")]
    SeekDropped {
        /// The requested seek position in seconds.
        position: f64,
    },

    /// The media resource refuses pixel extraction.
    ///
    /// Raised instead of silently compositing a blank cell when frame data
    /// cannot be read (for example, a cross-origin resource).
    #[error("Frame pixel data cannot be extracted: {reason}")]
    CaptureBlocked {
        /// Why extraction was refused.
        reason: String,
    },

    /// The capture was cancelled via a
    /// [`CancellationToken`](crate::CancellationToken).
    #[error("Capture cancelled")]
    Cancelled,

    /// An error from the `image` crate during compositing or PNG encoding.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),

    /// An I/O error from an output sink.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// A backend-specific failure while opening or decoding the media source.
    #[error("Media source error: {reason}")]
    Source {
        /// Underlying reason reported by the backend.
        reason: String,
    },
}

#[cfg(feature = "ffmpeg")]
impl From<ffmpeg_next::Error> for CaptureError {
    fn from(error: ffmpeg_next::Error) -> Self {
        CaptureError::Source {
            reason: error.to_string(),
        }
    }
}
