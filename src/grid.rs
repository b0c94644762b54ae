//! Grid planning.
//!
//! [`GridLayout`] decides how many frames a capture samples and how large
//! each composited cell is. The layout is derived once per capture from the
//! source's duration and native dimensions; it is immutable afterwards.
//!
//! Note that the caller-supplied grid token (the `"3x3"` string on a
//! [`CaptureRequest`](crate::CaptureRequest)) never influences the layout —
//! it is label text only. Sampling density always follows the
//! square-root-of-duration rule below.

use crate::configuration::CaptureOptions;

/// Row/column layout and per-cell dimensions for one capture.
///
/// Planned via [`GridLayout::plan`]:
///
/// * `rows == cols == floor(sqrt(duration))` — roughly one frame every
///   `sqrt(duration)` seconds, giving a near-square grid that grows
///   sub-linearly with the video's length.
/// * A duration under one second yields a zero-cell layout. That is a
///   degenerate success, not an error: the capture performs no seeks and
///   still routes an empty composite.
/// * Cells default to a tenth of the source's native size (clamped to at
///   least one pixel); positive caller overrides are honoured per dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    /// Number of grid rows.
    pub rows: u32,
    /// Number of grid columns.
    pub cols: u32,
    /// Width of each cell in pixels.
    pub cell_width: u32,
    /// Height of each cell in pixels.
    pub cell_height: u32,
}

impl GridLayout {
    /// Plan a layout for a source of the given duration and native size.
    ///
    /// Planning is pure: the same inputs always produce the same layout.
    ///
    /// # Example
    ///
    /// ```
    /// use framesheet::{CaptureOptions, GridLayout};
    ///
    /// let layout = GridLayout::plan(9.0, 1280, 720, &CaptureOptions::new());
    /// assert_eq!((layout.rows, layout.cols), (3, 3));
    /// assert_eq!((layout.cell_width, layout.cell_height), (128, 72));
    /// ```
    pub fn plan(
        duration: f64,
        source_width: u32,
        source_height: u32,
        options: &CaptureOptions,
    ) -> Self {
        let side = if duration >= 1.0 {
            duration.sqrt().floor() as u32
        } else {
            0
        };

        let cell_width = options
            .cell_width
            .filter(|width| *width > 0)
            .unwrap_or_else(|| (source_width / 10).max(1));
        let cell_height = options
            .cell_height
            .filter(|height| *height > 0)
            .unwrap_or_else(|| (source_height / 10).max(1));

        Self {
            rows: side,
            cols: side,
            cell_width,
            cell_height,
        }
    }

    /// Total number of cells (`rows * cols`).
    pub fn cell_count(&self) -> u32 {
        self.rows * self.cols
    }

    /// `true` when the layout has no cells.
    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }

    /// Width of the composite canvas (`cols * cell_width`).
    pub fn sheet_width(&self) -> u32 {
        self.cols * self.cell_width
    }

    /// Height of the composite canvas (`rows * cell_height`).
    pub fn sheet_height(&self) -> u32 {
        self.rows * self.cell_height
    }
}
