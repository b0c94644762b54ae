//! FFmpeg-backed media source (feature `ffmpeg`).
//!
//! [`FfmpegSource`] adapts a real demuxer/decoder to the [`MediaSource`]
//! seam so the capture engine and CLI can run against files on disk. All
//! FFmpeg work happens on a dedicated decode thread the source owns; seeks
//! are requests sent to that thread, and each one's settle signal fires once
//! the worker has parked a freshly decoded RGB frame as the current frame.
//!
//! Superseding seeks behave like a real playback element: a request that is
//! still queued when a newer one arrives is dropped, and its settle sender
//! with it (waiters observe an abandoned seek). Decode failures likewise
//! drop the sender rather than firing it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::JoinHandle;

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::error::CaptureError;
use crate::source::{MediaSource, SettleSender, SettleSignal, settle_channel};

/// FFmpeg's format-level seek time base, in units per second.
const AV_TIME_BASE: f64 = 1_000_000.0;

/// Tolerance when matching decoded frame timestamps against a seek target.
const PTS_EPSILON: f64 = 1e-3;

struct SeekRequest {
    position: f64,
    settle: SettleSender,
}

struct Probe {
    duration: f64,
    width: u32,
    height: u32,
}

/// A [`MediaSource`] decoding a media file through FFmpeg.
///
/// # Example
///
/// ```no_run
/// use framesheet::{CaptureRequest, capture};
/// use framesheet::ffmpeg::FfmpegSource;
/// # use framesheet::{CaptureError, CaptureOptions, FileDownload, PlayerHost, ScrubSheet};
/// # struct Host;
/// # impl PlayerHost for Host {
/// #     fn capture_options(&self) -> CaptureOptions { CaptureOptions::new() }
/// #     fn save_file(&mut self, _: FileDownload) -> Result<(), CaptureError> { Ok(()) }
/// #     fn show_poster(&mut self, _: String) -> Result<(), CaptureError> { Ok(()) }
/// #     fn install_scrub_sheet(&mut self, _: ScrubSheet) -> Result<(), CaptureError> { Ok(()) }
/// # }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), framesheet::CaptureError> {
/// let mut source = FfmpegSource::open("input.mp4")?;
/// let mut player = Host;
/// capture(&mut source, &mut player, &CaptureRequest::new("input", "4x4")).await?;
/// # Ok(())
/// # }
/// ```
pub struct FfmpegSource {
    duration: f64,
    width: u32,
    height: u32,
    position: f64,
    requests: Option<mpsc::Sender<SeekRequest>>,
    current: Arc<Mutex<Option<DynamicImage>>>,
    worker: Option<JoinHandle<()>>,
}

impl FfmpegSource {
    /// Open a media file and spawn its decode worker.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Source`] when the file cannot be opened, has
    /// no video stream, or FFmpeg initialisation fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let path = path.as_ref().to_path_buf();

        // Safe to call repeatedly.
        ffmpeg_next::init().map_err(|error| CaptureError::Source {
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let (request_sender, request_receiver) = mpsc::channel();
        let (probe_sender, probe_receiver) = mpsc::channel();
        let current = Arc::new(Mutex::new(None));
        let worker_current = Arc::clone(&current);

        let worker = std::thread::Builder::new()
            .name("framesheet-decode".to_string())
            .spawn(move || {
                decode_worker(path, probe_sender, request_receiver, worker_current);
            })
            .map_err(CaptureError::Io)?;

        let probe = probe_receiver.recv().map_err(|_| CaptureError::Source {
            reason: "decode worker exited before reporting stream info".to_string(),
        })??;

        Ok(Self {
            duration: probe.duration,
            width: probe.width,
            height: probe.height,
            position: 0.0,
            requests: Some(request_sender),
            current,
            worker: Some(worker),
        })
    }
}

impl MediaSource for FfmpegSource {
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
        let clamped = position.clamp(0.0, self.duration);
        self.position = clamped;

        let (sender, signal) = settle_channel();
        let request = SeekRequest {
            position: clamped,
            settle: sender,
        };

        match &self.requests {
            Some(requests) => {
                if requests.send(request).is_err() {
                    log::warn!("Decode worker is gone; seek to {clamped:.3}s abandoned");
                }
            }
            None => drop(request),
        }

        signal
    }

    fn current_frame(&mut self) -> Result<DynamicImage, CaptureError> {
        let slot = self.current.lock().map_err(|_| CaptureError::Source {
            reason: "decode worker panicked while updating the current frame".to_string(),
        })?;
        slot.clone().ok_or_else(|| CaptureError::Source {
            reason: "no decoded frame is available yet".to_string(),
        })
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        // Closing the request channel lets the worker's recv loop end.
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Decode-thread entry point: probe the file, then serve seek requests until
/// the request channel closes.
fn decode_worker(
    path: PathBuf,
    probe_sender: mpsc::Sender<Result<Probe, CaptureError>>,
    requests: mpsc::Receiver<SeekRequest>,
    current: Arc<Mutex<Option<DynamicImage>>>,
) {
    let (mut input, stream_index, time_base) = match open_input(&path) {
        Ok(opened) => {
            let probe = probe_input(&opened.0, opened.1);
            let _ = probe_sender.send(Ok(probe));
            opened
        }
        Err(error) => {
            let _ = probe_sender.send(Err(error));
            return;
        }
    };

    while let Ok(mut request) = requests.recv() {
        // Only the newest queued request survives; superseded settle
        // senders are dropped unfired.
        while let Ok(newer) = requests.try_recv() {
            request = newer;
        }

        match decode_frame_at(&mut input, stream_index, time_base, request.position) {
            Ok(frame) => {
                match current.lock() {
                    Ok(mut slot) => *slot = Some(frame),
                    Err(poisoned) => *poisoned.into_inner() = Some(frame),
                }
                request.settle.fire();
            }
            Err(error) => {
                log::warn!("Decoding frame at {:.3}s failed: {error}", request.position);
                drop(request.settle);
            }
        }
    }
}

fn open_input(path: &Path) -> Result<(Input, usize, Rational), CaptureError> {
    let input = ffmpeg_next::format::input(&path).map_err(|error| CaptureError::Source {
        reason: format!("failed to open {}: {error}", path.display()),
    })?;

    let stream = input
        .streams()
        .best(Type::Video)
        .ok_or_else(|| CaptureError::Source {
            reason: format!("no video stream in {}", path.display()),
        })?;

    let stream_index = stream.index();
    let time_base = stream.time_base();

    Ok((input, stream_index, time_base))
}

fn probe_input(input: &Input, stream_index: usize) -> Probe {
    let duration = if input.duration() > 0 {
        input.duration() as f64 / AV_TIME_BASE
    } else {
        0.0
    };

    let (width, height) = input
        .stream(stream_index)
        .and_then(|stream| {
            CodecContext::from_parameters(stream.parameters())
                .ok()?
                .decoder()
                .video()
                .ok()
                .map(|decoder| (decoder.width(), decoder.height()))
        })
        .unwrap_or((0, 0));

    Probe {
        duration,
        width,
        height,
    }
}

/// Seek to the nearest keyframe before `target` (seconds) and decode forward
/// until a frame at or past the target materialises.
fn decode_frame_at(
    input: &mut Input,
    stream_index: usize,
    time_base: Rational,
    target: f64,
) -> Result<DynamicImage, CaptureError> {
    let seek_timestamp = (target * AV_TIME_BASE) as i64;
    input.seek(seek_timestamp, ..seek_timestamp)?;

    // Fresh decoder per seek; decoder state from a previous position would
    // produce stale frames.
    let stream = input
        .stream(stream_index)
        .ok_or_else(|| CaptureError::Source {
            reason: "video stream disappeared mid-capture".to_string(),
        })?;
    let decoder_context = CodecContext::from_parameters(stream.parameters())?;
    let mut decoder = decoder_context.decoder().video()?;

    let width = decoder.width();
    let height = decoder.height();
    let mut scaler = ScalingContext::get(
        decoder.format(),
        width,
        height,
        Pixel::RGB24,
        width,
        height,
        ScalingFlags::BILINEAR,
    )?;

    let mut decoded = VideoFrame::empty();
    let mut rgb = VideoFrame::empty();

    for (packet_stream, packet) in input.packets() {
        if packet_stream.index() != stream_index {
            continue;
        }

        decoder.send_packet(&packet)?;
        while decoder.receive_frame(&mut decoded).is_ok() {
            if pts_to_seconds(decoded.pts().unwrap_or(0), time_base) + PTS_EPSILON >= target {
                scaler.run(&decoded, &mut rgb)?;
                return rgb_frame_to_image(&rgb, width, height);
            }
        }
    }

    // Flush: the target may lie past the last packet. Keep the final frame
    // as a fallback.
    decoder.send_eof()?;
    let mut fallback = None;
    while decoder.receive_frame(&mut decoded).is_ok() {
        scaler.run(&decoded, &mut rgb)?;
        let image = rgb_frame_to_image(&rgb, width, height)?;
        if pts_to_seconds(decoded.pts().unwrap_or(0), time_base) + PTS_EPSILON >= target {
            return Ok(image);
        }
        fallback = Some(image);
    }

    fallback.ok_or_else(|| CaptureError::Source {
        reason: format!("no decodable frame at {target:.3}s"),
    })
}

fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Copy an RGB24 frame into an [`image`] buffer, stripping any per-row
/// stride padding FFmpeg may have added.
fn rgb_frame_to_image(
    frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Result<DynamicImage, CaptureError> {
    let stride = frame.stride(0);
    let row_bytes = (width as usize) * 3;
    let data = frame.data(0);

    let buffer = if stride == row_bytes {
        data[..row_bytes * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * (height as usize));
        for row in 0..(height as usize) {
            let start = row * stride;
            buffer.extend_from_slice(&data[start..start + row_bytes]);
        }
        buffer
    };

    let image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| CaptureError::Source {
        reason: "decoded frame data did not match the reported dimensions".to_string(),
    })?;
    Ok(DynamicImage::ImageRgb8(image))
}
