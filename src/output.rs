//! Output routing.
//!
//! Converts a finished [`ContactSheet`] into the shape its destination
//! expects and dispatches it to the host player:
//!
//! * [`OutputMode::Download`] — PNG bytes wrapped as a [`FileDownload`] with
//!   a forced `application/octet-stream` media type, so browsers prompt to
//!   save instead of rendering inline.
//! * [`OutputMode::Poster`] — a `data:image/png;base64,` URI handed to the
//!   player's poster display (the raw image type here, not octet-stream —
//!   posters are rendered).
//! * [`OutputMode::ThumbnailSheet`] — a [`ScrubSheet`] descriptor installed
//!   on the player for its scrub-preview UI.
//!
//! No configured mode is a silent no-op beyond a logged warning; the
//! composite is simply discarded.

use serde::Serialize;

use crate::configuration::CaptureOptions;
use crate::error::CaptureError;
use crate::capture::CaptureRequest;
use crate::player::PlayerHost;
use crate::sheet::ContactSheet;

/// The declared media type for download payloads.
///
/// Deliberately generic so user agents offer a save dialog rather than
/// displaying the image inline.
pub const DOWNLOAD_MEDIA_TYPE: &str = "application/octet-stream";

/// Where a finished composite is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Hand the PNG bytes to the player's file-save sink.
    Download,
    /// Show the composite as the player's poster image.
    Poster,
    /// Install a [`ScrubSheet`] descriptor for scrub-preview thumbnails.
    ThumbnailSheet,
}

impl OutputMode {
    /// Parse the player-config spelling of a mode. Case-insensitive;
    /// unrecognised strings yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "download" => Some(Self::Download),
            "poster" => Some(Self::Poster),
            "thumbnail" | "thumbnail-sheet" => Some(Self::ThumbnailSheet),
            _ => None,
        }
    }
}

/// A named byte payload destined for the player's file-save sink.
#[derive(Debug, Clone)]
pub struct FileDownload {
    /// Suggested filename, always `"{label}.png"`.
    pub filename: String,
    /// Declared media type; see [`DOWNLOAD_MEDIA_TYPE`].
    pub media_type: &'static str,
    /// The encoded composite. Empty for a zero-cell capture.
    pub bytes: Vec<u8>,
}

/// Scrub-preview metadata describing a composite as a grid of individually
/// addressable preview frames.
///
/// Produced by the router and installed on the player; never mutated
/// afterwards. Serialises with camelCase field names, the shape the player's
/// scrub-preview UI consumes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrubSheet {
    /// Always `true` for an installed sheet.
    pub enabled: bool,
    /// Number of preview frames in the composite (`rows * cols`).
    pub frame_count: u32,
    /// Width of each preview frame in pixels.
    pub cell_width: u32,
    /// Height of each preview frame in pixels.
    pub cell_height: u32,
    /// Grid columns.
    pub cols: u32,
    /// Grid rows.
    pub rows: u32,
    /// Horizontal offset of the first frame. Always zero.
    pub offset_x: u32,
    /// Vertical offset of the first frame. Always zero.
    pub offset_y: u32,
    /// Image URIs backing the sheet. A single-element list containing the
    /// composite as a data URI.
    pub image_uris: Vec<String>,
}

/// Convert a finished sheet into its destination format and dispatch it.
///
/// The mode comes from `options.after`; `None` logs a warning and does
/// nothing. An empty sheet is still dispatched — the payload or URI is just
/// built from zero bytes.
///
/// # Errors
///
/// Propagates PNG-encoding failures and any error the player sink reports.
pub fn finalize<P: PlayerHost + ?Sized>(
    sheet: &ContactSheet,
    request: &CaptureRequest,
    options: &CaptureOptions,
    player: &mut P,
) -> Result<(), CaptureError> {
    match options.after {
        Some(OutputMode::Download) => {
            let download = FileDownload {
                filename: format!("{}.png", request.label),
                media_type: DOWNLOAD_MEDIA_TYPE,
                bytes: sheet.encode_png()?,
            };
            log::debug!(
                "Routing composite to download sink as {} ({} bytes)",
                download.filename,
                download.bytes.len()
            );
            player.save_file(download)
        }
        Some(OutputMode::Poster) => {
            let uri = data_uri(&sheet.encode_png()?);
            log::debug!("Routing composite to poster display");
            player.show_poster(uri)
        }
        Some(OutputMode::ThumbnailSheet) => {
            let layout = sheet.layout();
            let descriptor = ScrubSheet {
                enabled: true,
                frame_count: layout.cell_count(),
                cell_width: layout.cell_width,
                cell_height: layout.cell_height,
                cols: layout.cols,
                rows: layout.rows,
                offset_x: 0,
                offset_y: 0,
                image_uris: vec![data_uri(&sheet.encode_png()?)],
            };
            log::debug!(
                "Installing scrub sheet ({} frames of {}x{})",
                descriptor.frame_count,
                descriptor.cell_width,
                descriptor.cell_height
            );
            player.install_scrub_sheet(descriptor)
        }
        None => {
            log::warn!(
                "Capture {:?} finished with no output mode configured; composite discarded",
                request.label
            );
            Ok(())
        }
    }
}

/// Build a `data:image/png;base64,` URI from PNG bytes.
///
/// An empty payload yields a URI with an empty body.
pub fn data_uri(png_bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", base64_encode(png_bytes))
}

/// Recover the PNG bytes from a URI produced by [`data_uri`].
///
/// Returns `None` for URIs with a different prefix or malformed base64.
/// Hosts that persist posters or scrub sheets to disk use this to get the
/// raw image back.
pub fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let body = uri.strip_prefix("data:image/png;base64,")?;
    base64_decode(body)
}

const BASE64_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Minimal base64 encoder (avoids adding a new crate dependency).
fn base64_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 4 / 3 + 4);
    let mut i = 0;
    while i + 2 < data.len() {
        let b = ((data[i] as u32) << 16) | ((data[i + 1] as u32) << 8) | (data[i + 2] as u32);
        out.push(BASE64_CHARS[((b >> 18) & 63) as usize] as char);
        out.push(BASE64_CHARS[((b >> 12) & 63) as usize] as char);
        out.push(BASE64_CHARS[((b >> 6) & 63) as usize] as char);
        out.push(BASE64_CHARS[(b & 63) as usize] as char);
        i += 3;
    }
    let rem = data.len() - i;
    if rem == 1 {
        let b = (data[i] as u32) << 16;
        out.push(BASE64_CHARS[((b >> 18) & 63) as usize] as char);
        out.push(BASE64_CHARS[((b >> 12) & 63) as usize] as char);
        out.push('=');
        out.push('=');
    } else if rem == 2 {
        let b = ((data[i] as u32) << 16) | ((data[i + 1] as u32) << 8);
        out.push(BASE64_CHARS[((b >> 18) & 63) as usize] as char);
        out.push(BASE64_CHARS[((b >> 12) & 63) as usize] as char);
        out.push(BASE64_CHARS[((b >> 6) & 63) as usize] as char);
        out.push('=');
    }
    out
}

fn base64_decode(body: &str) -> Option<Vec<u8>> {
    fn value_of(ch: u8) -> Option<u32> {
        BASE64_CHARS
            .iter()
            .position(|candidate| *candidate == ch)
            .map(|index| index as u32)
    }

    let trimmed = body.trim_end_matches('=');
    let mut out = Vec::with_capacity(trimmed.len() * 3 / 4);
    let mut accumulator = 0u32;
    let mut bits = 0u32;

    for ch in trimmed.bytes() {
        accumulator = (accumulator << 6) | value_of(ch)?;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((accumulator >> bits) as u8);
        }
    }

    Some(out)
}
