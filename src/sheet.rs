//! The contact-sheet compositor.
//!
//! [`ContactSheet`] owns the raster canvas for one capture. Sampled frames
//! are blitted cell by cell via [`draw`](ContactSheet::draw), and the
//! finished composite is encoded to PNG bytes by
//! [`encode_png`](ContactSheet::encode_png).

use std::io::Cursor;

use image::{DynamicImage, GenericImage, ImageFormat, imageops::FilterType};

use crate::error::CaptureError;
use crate::grid::GridLayout;

/// A mutable composite canvas sized `cols * cell_width` by
/// `rows * cell_height`, zero-initialised (black) at creation.
///
/// Each cell is written at most once, in row-major order, by the capture
/// loop. The canvas is only finalised (encoded and routed) once every cell
/// has been drawn — [`is_complete`](ContactSheet::is_complete) gates that.
///
/// A zero-cell sheet (planned from a sub-second duration) has a zero-sized
/// canvas and encodes to an empty byte payload.
pub struct ContactSheet {
    layout: GridLayout,
    canvas: DynamicImage,
    drawn: Vec<bool>,
}

impl ContactSheet {
    /// Create an empty sheet for the given layout.
    pub fn new(layout: GridLayout) -> Self {
        Self {
            layout,
            canvas: DynamicImage::new_rgb8(layout.sheet_width(), layout.sheet_height()),
            drawn: vec![false; layout.cell_count() as usize],
        }
    }

    /// The layout this sheet was created with.
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Blit `frame` into cell `(row, col)`.
    ///
    /// The frame is stretched to exactly `cell_width x cell_height` —
    /// aspect distortion is preserved, no letterboxing — and copied to
    /// `x = col * cell_width, y = row * cell_height`.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Source`] for a cell outside the layout, or an
    /// image error if the blit itself fails.
    pub fn draw(&mut self, row: u32, col: u32, frame: &DynamicImage) -> Result<(), CaptureError> {
        if row >= self.layout.rows || col >= self.layout.cols {
            return Err(CaptureError::Source {
                reason: format!(
                    "cell ({row}, {col}) is outside the {}x{} grid",
                    self.layout.rows, self.layout.cols
                ),
            });
        }

        let index = (row * self.layout.cols + col) as usize;
        if self.drawn[index] {
            log::warn!("Cell ({row}, {col}) drawn more than once; overwriting");
        }

        let scaled = frame.resize_exact(
            self.layout.cell_width,
            self.layout.cell_height,
            FilterType::Triangle,
        );

        let x = col * self.layout.cell_width;
        let y = row * self.layout.cell_height;
        self.canvas.copy_from(&scaled, x, y)?;
        self.drawn[index] = true;

        Ok(())
    }

    /// How many cells have been drawn so far.
    pub fn cells_drawn(&self) -> u32 {
        self.drawn.iter().filter(|drawn| **drawn).count() as u32
    }

    /// `true` once every cell in the layout has been drawn.
    ///
    /// Vacuously `true` for a zero-cell layout.
    pub fn is_complete(&self) -> bool {
        self.drawn.iter().all(|drawn| *drawn)
    }

    /// The composite raster.
    pub fn image(&self) -> &DynamicImage {
        &self.canvas
    }

    /// Encode the composite to PNG bytes.
    ///
    /// A zero-cell sheet yields an empty byte vector: the PNG format has no
    /// representation for a 0x0 image, and downstream sinks still receive
    /// (and may persist) the empty payload.
    pub fn encode_png(&self) -> Result<Vec<u8>, CaptureError> {
        if self.layout.is_empty() {
            return Ok(Vec::new());
        }

        let mut bytes = Vec::new();
        self.canvas
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}
