//! Generate a contact sheet from a real video file via FFmpeg.
//!
//! Run with: cargo run --example contact_sheet --features ffmpeg -- input.mp4

use framesheet::{
    CaptureError, CaptureOptions, CaptureRequest, FfmpegSource, FileDownload, MediaSource,
    OutputMode, PlayerHost, ScrubSheet, capture_with_options,
};

struct SaveHost {
    options: CaptureOptions,
}

impl PlayerHost for SaveHost {
    fn capture_options(&self) -> CaptureOptions {
        self.options.clone()
    }

    fn save_file(&mut self, download: FileDownload) -> Result<(), CaptureError> {
        std::fs::write(&download.filename, &download.bytes)?;
        println!("saved {} ({} bytes)", download.filename, download.bytes.len());
        Ok(())
    }

    fn show_poster(&mut self, _uri: String) -> Result<(), CaptureError> {
        Ok(())
    }

    fn install_scrub_sheet(&mut self, _sheet: ScrubSheet) -> Result<(), CaptureError> {
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("usage: contact_sheet <video file>")?;

    let mut source = FfmpegSource::open(&path)?;
    let side = source.duration().sqrt().floor() as u32;
    println!(
        "{}: {:.1}s, {}x{}, planning a {side}x{side} grid",
        path,
        source.duration(),
        source.frame_width(),
        source.frame_height()
    );

    let options = CaptureOptions::new().with_after(OutputMode::Download);
    let mut host = SaveHost {
        options: options.clone(),
    };

    capture_with_options(
        &mut source,
        &mut host,
        &CaptureRequest::new("contact_sheet", format!("{side}x{side}")),
        &options,
    )
    .await?;
    Ok(())
}
