//! Capture a contact sheet from the scriptable synthetic source.
//!
//! Run with: cargo run --example synthetic_capture

use std::sync::Arc;
use std::time::Duration;

use framesheet::{
    CaptureError, CaptureOptions, CaptureRequest, FileDownload, OutputMode, PlayerHost,
    ProgressCallback, ProgressInfo, ScrubSheet, SettleBehavior, SyntheticSource,
    capture_with_options,
};

struct PrintProgress;

impl ProgressCallback for PrintProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        match info.position {
            Some(position) => println!(
                "  cell {}/{} ({:.0}%) at {position:.2}s",
                info.current_cell, info.total_cells, info.percentage
            ),
            None => println!("  done in {:?}", info.elapsed),
        }
    }
}

/// Saves downloads to the working directory and prints everything else.
struct DemoHost {
    options: CaptureOptions,
}

impl PlayerHost for DemoHost {
    fn capture_options(&self) -> CaptureOptions {
        self.options.clone()
    }

    fn save_file(&mut self, download: FileDownload) -> Result<(), CaptureError> {
        std::fs::write(&download.filename, &download.bytes)?;
        println!(
            "saved {} ({} bytes, {})",
            download.filename,
            download.bytes.len(),
            download.media_type
        );
        Ok(())
    }

    fn show_poster(&mut self, uri: String) -> Result<(), CaptureError> {
        println!("poster URI: {} chars", uri.len());
        Ok(())
    }

    fn install_scrub_sheet(&mut self, sheet: ScrubSheet) -> Result<(), CaptureError> {
        println!(
            "scrub sheet: {} frames of {}x{}",
            sheet.frame_count, sheet.cell_width, sheet.cell_height
        );
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CaptureError> {
    // A 25-second synthetic video whose seeks settle after a short delay,
    // like a real decoder would.
    let mut source = SyntheticSource::new(25.0, 1280, 720)
        .with_settle(SettleBehavior::Delayed(Duration::from_millis(10)));

    let options = CaptureOptions::new()
        .with_after(OutputMode::Download)
        .with_progress(Arc::new(PrintProgress));
    let mut host = DemoHost {
        options: options.clone(),
    };

    println!("capturing a 5x5 sheet from a synthetic 25s video...");
    capture_with_options(
        &mut source,
        &mut host,
        &CaptureRequest::new("synthetic_demo", "5x5"),
        &options,
    )
    .await?;

    println!(
        "issued {} seeks, at most {} outstanding at once",
        source.seek_count(),
        source.max_outstanding_seeks()
    );
    Ok(())
}
