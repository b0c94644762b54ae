//! The host-player seam.
//!
//! [`PlayerHost`] is the crate's outbound interface: where capture options
//! are read from at the start of a capture, and where finished composites
//! are delivered. The presentation layer (context menus, CSS, DOM wiring)
//! lives entirely on the other side of this trait.

use crate::configuration::CaptureOptions;
use crate::error::CaptureError;
use crate::output::{FileDownload, ScrubSheet};

/// The host player a capture reads its configuration from and routes its
/// output to.
///
/// The crate borrows the host mutably for one capture; it never retains it.
/// A terminal host might write downloads to a directory, while an embedded
/// player host forwards them to a browser's save dialog.
pub trait PlayerHost {
    /// The player's capture configuration block, read once at the start of
    /// each capture.
    fn capture_options(&self) -> CaptureOptions;

    /// Deliver a named byte payload to the file-save sink.
    ///
    /// # Errors
    ///
    /// Hosts report sink failures as [`CaptureError::Io`] or
    /// [`CaptureError::Source`]; the capture surfaces them to its caller.
    fn save_file(&mut self, download: FileDownload) -> Result<(), CaptureError>;

    /// Activate the poster display and set its background image to `uri`.
    ///
    /// `uri` is always a `data:image/png;base64,` URI of the composite.
    fn show_poster(&mut self, uri: String) -> Result<(), CaptureError>;

    /// Install a scrub-preview descriptor on the player's configuration.
    fn install_scrub_sheet(&mut self, sheet: ScrubSheet) -> Result<(), CaptureError>;
}
