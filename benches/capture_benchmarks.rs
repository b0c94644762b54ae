//! Benchmarks for grid planning, compositing, and full synthetic captures.
//!
//! Run with: cargo bench

use criterion::Criterion;
use image::DynamicImage;
use tokio::runtime::Builder;

use framesheet::{
    CaptureError, CaptureOptions, CaptureRequest, ContactSheet, FileDownload, GridLayout,
    OutputMode, PlayerHost, ScrubSheet, SyntheticSource, capture_with_options,
};

struct NullHost {
    options: CaptureOptions,
}

impl PlayerHost for NullHost {
    fn capture_options(&self) -> CaptureOptions {
        self.options.clone()
    }

    fn save_file(&mut self, _download: FileDownload) -> Result<(), CaptureError> {
        Ok(())
    }

    fn show_poster(&mut self, _uri: String) -> Result<(), CaptureError> {
        Ok(())
    }

    fn install_scrub_sheet(&mut self, _sheet: ScrubSheet) -> Result<(), CaptureError> {
        Ok(())
    }
}

fn benchmark_grid_planning(criterion: &mut Criterion) {
    let options = CaptureOptions::new();

    criterion.bench_function("plan grid (2h video)", |bencher| {
        bencher.iter(|| {
            let layout = GridLayout::plan(std::hint::black_box(7200.0), 1920, 1080, &options);
            std::hint::black_box(layout)
        });
    });
}

fn benchmark_compositing(criterion: &mut Criterion) {
    let options = CaptureOptions::new().with_cell_size(192, 108);
    let layout = GridLayout::plan(100.0, 1920, 1080, &options);
    let frame = DynamicImage::new_rgb8(1920, 1080);

    criterion.bench_function("composite 10x10 sheet from 1080p frames", |bencher| {
        bencher.iter(|| {
            let mut sheet = ContactSheet::new(layout);
            for row in 0..layout.rows {
                for col in 0..layout.cols {
                    sheet.draw(row, col, &frame).unwrap();
                }
            }
            std::hint::black_box(sheet)
        });
    });
}

fn benchmark_png_encoding(criterion: &mut Criterion) {
    let options = CaptureOptions::new().with_cell_size(192, 108);
    let layout = GridLayout::plan(100.0, 1920, 1080, &options);
    let frame = DynamicImage::new_rgb8(192, 108);

    let mut sheet = ContactSheet::new(layout);
    for row in 0..layout.rows {
        for col in 0..layout.cols {
            sheet.draw(row, col, &frame).unwrap();
        }
    }

    criterion.bench_function("encode 10x10 sheet to PNG", |bencher| {
        bencher.iter(|| std::hint::black_box(sheet.encode_png().unwrap()));
    });
}

fn benchmark_full_capture(criterion: &mut Criterion) {
    let rt = Builder::new_current_thread().enable_time().build().unwrap();

    let mut group = criterion.benchmark_group("synthetic capture");
    group.sample_size(30);

    for (name, duration) in [("3x3", 9.0), ("7x7", 49.0)] {
        group.bench_function(name, |bencher| {
            bencher.iter(|| {
                rt.block_on(async {
                    let options = CaptureOptions::new().with_after(OutputMode::Download);
                    let mut source = SyntheticSource::new(duration, 1280, 720);
                    let mut host = NullHost {
                        options: options.clone(),
                    };
                    capture_with_options(
                        &mut source,
                        &mut host,
                        &CaptureRequest::new("bench", name),
                        &options,
                    )
                    .await
                    .unwrap();
                });
            });
        });
    }

    group.finish();
}

criterion::criterion_group!(
    benches,
    benchmark_grid_planning,
    benchmark_compositing,
    benchmark_png_encoding,
    benchmark_full_capture,
);
criterion::criterion_main!(benches);
