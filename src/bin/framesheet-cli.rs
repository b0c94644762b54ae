use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framesheet::{
    CaptureError, CaptureOptions, CaptureRequest, FfmpegSource, FileDownload, MediaSource,
    OutputMode, PlayerHost, ScrubSheet, capture_with_options, decode_data_uri,
};
use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

const CLI_AFTER_HELP: &str = "Examples:\n  framesheet generate input.mp4 --out sheets\n  framesheet generate input.mp4 --out sheets --after poster --cell-width 240 --cell-height 135\n  framesheet batch videos/ --out sheets --jobs 4\n  framesheet completions zsh > _framesheet";

/// File extensions the batch walker treats as video.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm", "m4v"];

#[derive(Debug, Parser)]
#[command(
    name = "framesheet",
    version,
    about = "Generate contact-sheet grids from video files",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args, Clone)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Cell width in pixels (defaults to a tenth of the source width).
    #[arg(long, global = true)]
    cell_width: Option<u32>,

    /// Cell height in pixels (defaults to a tenth of the source height).
    #[arg(long, global = true)]
    cell_height: Option<u32>,

    /// Per-seek settle timeout in seconds.
    #[arg(long, global = true, default_value_t = 10.0)]
    settle_timeout: f64,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate a contact sheet for one video.
    #[command(
        about = "Generate a contact sheet",
        after_help = "Examples:\n  framesheet generate input.mp4 --out sheets\n  framesheet generate input.mp4 --out sheets --after thumbnail-sheet --label preview"
    )]
    Generate {
        /// Input video path.
        input: PathBuf,

        /// Output directory for generated artifacts.
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// Output mode: download | poster | thumbnail-sheet.
        #[arg(long, default_value = "download")]
        after: String,

        /// Base name for generated artifacts (defaults to the input stem).
        #[arg(long)]
        label: Option<String>,

        /// Grid token recorded on the request, e.g. "4x4". Labeling only;
        /// sampling density always follows the video's duration.
        #[arg(long)]
        grid: Option<String>,
    },

    /// Generate contact sheets for every video under a directory.
    #[command(
        about = "Batch-generate contact sheets",
        after_help = "Examples:\n  framesheet batch videos/ --out sheets\n  framesheet batch videos/ --out sheets --jobs 8"
    )]
    Batch {
        /// Directory to walk for video files.
        input: PathBuf,

        /// Output directory for generated sheets.
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// How many videos to process concurrently.
        #[arg(long, default_value_t = 4)]
        jobs: usize,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// A [`PlayerHost`] that persists everything to a directory: downloads under
/// their payload filename, posters as `{stem}_poster.png`, scrub sheets as
/// `{stem}.png` plus a `{stem}.sheet.json` descriptor.
struct DirectoryHost {
    out_dir: PathBuf,
    stem: String,
    options: CaptureOptions,
}

impl PlayerHost for DirectoryHost {
    fn capture_options(&self) -> CaptureOptions {
        self.options.clone()
    }

    fn save_file(&mut self, download: FileDownload) -> Result<(), CaptureError> {
        let path = self.out_dir.join(&download.filename);
        fs::write(&path, &download.bytes)?;
        Ok(())
    }

    fn show_poster(&mut self, uri: String) -> Result<(), CaptureError> {
        let bytes = decode_data_uri(&uri).ok_or_else(|| CaptureError::Source {
            reason: "poster URI was not a PNG data URI".to_string(),
        })?;
        fs::write(self.out_dir.join(format!("{}_poster.png", self.stem)), bytes)?;
        Ok(())
    }

    fn install_scrub_sheet(&mut self, sheet: ScrubSheet) -> Result<(), CaptureError> {
        if let Some(bytes) = sheet.image_uris.first().and_then(|uri| decode_data_uri(uri)) {
            fs::write(self.out_dir.join(format!("{}.png", self.stem)), bytes)?;
        }
        let descriptor =
            serde_json::to_string_pretty(&sheet).map_err(|error| CaptureError::Source {
                reason: format!("descriptor serialisation failed: {error}"),
            })?;
        fs::write(
            self.out_dir.join(format!("{}.sheet.json", self.stem)),
            descriptor,
        )?;
        Ok(())
    }
}

fn base_capture_options(global: &GlobalOptions) -> CaptureOptions {
    let mut options =
        CaptureOptions::new().with_settle_timeout(Duration::from_secs_f64(global.settle_timeout));
    if let (Some(width), Some(height)) = (global.cell_width, global.cell_height) {
        options = options.with_cell_size(width, height);
    } else if let Some(width) = global.cell_width {
        options = options.with_cell_size(width, 0);
    } else if let Some(height) = global.cell_height {
        options = options.with_cell_size(0, height);
    }
    options
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sheet".to_string())
}

fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            VIDEO_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
        })
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// Run one capture in download mode, labelled with the batch naming scheme
/// `{file_name};@;{N}x{N};t;{unix_seconds}` so the saved sheet records its
/// grid size and creation time.
async fn generate_batch_sheet(
    video: &Path,
    out_dir: &Path,
    base_options: &CaptureOptions,
) -> Result<(), CaptureError> {
    let mut source = FfmpegSource::open(video)?;
    let side = source.duration().sqrt().floor() as u32;

    let file_name = video
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    let token = format!("{side}x{side}");
    let label = format!("{file_name};@;{token};t;{}", unix_seconds());
    let request = CaptureRequest::new(label, token);

    let options = base_options.clone().with_after(OutputMode::Download);
    let mut host = DirectoryHost {
        out_dir: out_dir.to_path_buf(),
        stem: file_stem(video),
        options: options.clone(),
    };

    capture_with_options(&mut source, &mut host, &request, &options).await
}

async fn run_generate(
    global: &GlobalOptions,
    input: PathBuf,
    out: PathBuf,
    after: String,
    label: Option<String>,
    grid: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mode = OutputMode::parse(&after).ok_or(format!("unsupported --after mode: {after}"))?;
    fs::create_dir_all(&out)?;

    let mut source = FfmpegSource::open(&input)?;
    let side = source.duration().sqrt().floor() as u32;
    let stem = file_stem(&input);
    let request = CaptureRequest::new(
        label.unwrap_or_else(|| stem.clone()),
        grid.unwrap_or_else(|| format!("{side}x{side}")),
    );

    if global.verbose {
        eprintln!(
            "{}x{} grid over {:.1}s of video",
            side,
            side,
            source.duration()
        );
    }

    let options = base_capture_options(global).with_after(mode);
    let mut host = DirectoryHost {
        out_dir: out.clone(),
        stem,
        options: options.clone(),
    };

    capture_with_options(&mut source, &mut host, &request, &options).await?;

    println!("{} artifacts in {}", "saved".green().bold(), out.display());
    Ok(())
}

async fn run_batch(
    global: &GlobalOptions,
    input: PathBuf,
    out: PathBuf,
    jobs: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(&out)?;

    // Filenames already in the output directory; a video whose name appears
    // inside one of them has its sheet already.
    let existing: Vec<String> = fs::read_dir(&out)?
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();

    let videos: Vec<PathBuf> = WalkDir::new(&input)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_video_file(path))
        .collect();

    if videos.is_empty() {
        println!("No video files found under {}", input.display());
        return Ok(());
    }

    let progress_bar = ProgressBar::new(videos.len() as u64);
    progress_bar.set_style(
        ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );

    let base_options = base_capture_options(global);
    let semaphore = Arc::new(tokio::sync::Semaphore::new(jobs.max(1)));
    let mut skipped = 0_usize;
    let mut handles = Vec::new();

    for video in videos {
        let video_name = video
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if existing.iter().any(|name| name.contains(&video_name)) {
            skipped += 1;
            progress_bar.inc(1);
            if global.verbose {
                eprintln!("{} {}", "skipped".magenta(), video.display());
            }
            continue;
        }

        let semaphore = Arc::clone(&semaphore);
        let out_dir = out.clone();
        let options = base_options.clone();
        let bar = progress_bar.clone();

        handles.push(tokio::spawn(async move {
            let permit = semaphore.acquire_owned().await;
            let result = match permit {
                Ok(_permit) => generate_batch_sheet(&video, &out_dir, &options).await,
                Err(_) => Err(CaptureError::Cancelled),
            };
            bar.inc(1);
            (video, result)
        }));
    }

    let mut succeeded = 0_usize;
    let mut failures: Vec<(PathBuf, String)> = Vec::new();
    for handle in handles {
        match handle.await {
            Ok((_, Ok(()))) => succeeded += 1,
            Ok((video, Err(error))) => failures.push((video, error.to_string())),
            Err(join_error) => failures.push((PathBuf::new(), join_error.to_string())),
        }
    }
    progress_bar.finish_with_message("done");

    println!("{}", "Summary:".cyan().bold());
    println!("{}", format!("  ok:      {succeeded}").green());
    println!("{}", format!("  skipped: {skipped}").magenta());
    println!("{}", format!("  failed:  {}", failures.len()).red());
    for (video, reason) in &failures {
        eprintln!("  {} {}: {}", "failed".red().bold(), video.display(), reason);
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(format!("{} video(s) failed", failures.len()).into())
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            input,
            out,
            after,
            label,
            grid,
        } => run_generate(&cli.global, input, out, after, label, grid).await,
        Commands::Batch { input, out, jobs } => run_batch(&cli.global, input, out, jobs).await,
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framesheet", &mut std::io::stdout());
            Ok(())
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{file_stem, is_video_file};

    #[test]
    fn video_extension_detection() {
        assert!(is_video_file(Path::new("clip.mp4")));
        assert!(is_video_file(Path::new("clip.MKV")));
        assert!(is_video_file(Path::new("dir/clip.webm")));
        assert!(!is_video_file(Path::new("clip.png")));
        assert!(!is_video_file(Path::new("clip")));
    }

    #[test]
    fn stem_fallback() {
        assert_eq!(file_stem(Path::new("videos/clip.mp4")), "clip");
        assert_eq!(file_stem(Path::new("/")), "sheet");
    }
}
