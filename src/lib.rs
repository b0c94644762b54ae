//! # framesheet
//!
//! Sample frames from a playing video at computed timestamps and composite
//! them into a single grid image (a "contact sheet"), then route the result
//! to a file download, a poster image, or a sprite-sheet descriptor for
//! scrub-preview thumbnails.
//!
//! The crate is the capture engine only: it plans the grid, drives the media
//! source through a strictly sequential seek/settle/grab loop, composites
//! each frame into its cell, and hands the finished composite to the host
//! player. Menus, CSS, and event wiring live with the caller, behind the
//! [`PlayerHost`] seam; decoding lives with the host player, behind the
//! [`MediaSource`] seam.
//!
//! ## Quick Start
//!
//! ```no_run
//! use framesheet::{CaptureRequest, capture};
//! # use framesheet::{CaptureError, CaptureOptions, FileDownload, PlayerHost, ScrubSheet, SyntheticSource};
//! # struct MyPlayer;
//! # impl PlayerHost for MyPlayer {
//! #     fn capture_options(&self) -> CaptureOptions { CaptureOptions::new() }
//! #     fn save_file(&mut self, _: FileDownload) -> Result<(), CaptureError> { Ok(()) }
//! #     fn show_poster(&mut self, _: String) -> Result<(), CaptureError> { Ok(()) }
//! #     fn install_scrub_sheet(&mut self, _: ScrubSheet) -> Result<(), CaptureError> { Ok(()) }
//! # }
//!
//! # async fn example(source: &mut SyntheticSource, player: &mut MyPlayer) -> Result<(), CaptureError> {
//! // `source` is the host player's media handle; `player` receives the output.
//! capture(source, player, &CaptureRequest::new("my_clip", "3x3")).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## How a capture works
//!
//! - **Grid planning** — `rows == cols == floor(sqrt(duration))`; one frame
//!   roughly every `sqrt(duration)` seconds. Sub-second videos plan a
//!   zero-cell grid and still deliver an empty composite. The request's grid
//!   token (`"3x3"`) only labels the output.
//! - **Sampling** — the playback position advances by `step * 1.075` per
//!   cell (the overshoot keeps keyframe-snapped seeks visually distinct),
//!   and each seek suspends on a single-fire settle signal. Seeks never
//!   overlap: the source has one decode position.
//! - **Compositing** — each frame is stretched to its cell and blitted into
//!   a `cols * cell_width` by `rows * cell_height` canvas.
//! - **Routing** — the composite becomes an octet-stream download, a poster
//!   data URI, or a [`ScrubSheet`] descriptor, per the player's
//!   configuration.
//!
//! ## Features
//!
//! - **Settle timeouts** — a stalled seek fails with
//!   [`CaptureError::SeekTimeout`] instead of hanging forever
//! - **Position restoration** — the source's playback position is restored
//!   on every exit path, including errors and dropped futures
//! - **Progress & cancellation** — per-cell callbacks and a
//!   [`CancellationToken`] for long captures
//! - **Scriptable test source** — [`SyntheticSource`] simulates immediate,
//!   delayed, stalled, and abandoned settles, and instruments seek overlap
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ffmpeg` | [`ffmpeg::FfmpegSource`], a real-decoder [`MediaSource`] for files on disk |
//! | `cli` | The `framesheet` binary: single and batch contact-sheet generation |
//! | `full` | Enables all of the above |

pub mod capture;
pub mod configuration;
pub mod error;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod grid;
pub mod output;
pub mod player;
pub mod progress;
pub mod sampler;
pub mod sheet;
pub mod source;
pub mod synthetic;

pub use capture::{CaptureRequest, capture, capture_with_options};
pub use configuration::CaptureOptions;
pub use error::CaptureError;
#[cfg(feature = "ffmpeg")]
pub use ffmpeg::FfmpegSource;
pub use grid::GridLayout;
pub use output::{
    DOWNLOAD_MEDIA_TYPE, FileDownload, OutputMode, ScrubSheet, data_uri, decode_data_uri, finalize,
};
pub use player::PlayerHost;
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo};
pub use sampler::{FrameSampler, Sample};
pub use sheet::ContactSheet;
pub use source::{MediaSource, SettleLost, SettleSender, SettleSignal, settle_channel};
pub use synthetic::{SettleBehavior, SyntheticSource};
