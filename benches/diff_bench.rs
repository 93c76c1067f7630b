use criterion::{criterion_group, criterion_main, Criterion};
use image::{Rgba, RgbaImage};
use pagewatch::diff::{compare_images, DiffConfig};

// Typical capture size: 1440 wide, a couple of viewports tall.
const W: u32 = 1440;
const H: u32 = 2160;

fn bench_compare_identical(c: &mut Criterion) {
    let baseline = RgbaImage::from_pixel(W, H, Rgba([250, 250, 250, 255]));
    let capture = baseline.clone();
    let config = DiffConfig::default();

    c.bench_function("compare_identical_1440x2160", |b| {
        b.iter(|| compare_images(&baseline, &capture, &config))
    });
}

fn bench_compare_with_changed_block(c: &mut Criterion) {
    let baseline = RgbaImage::from_pixel(W, H, Rgba([250, 250, 250, 255]));
    let mut capture = baseline.clone();
    for y in 400..700 {
        for x in 200..800 {
            capture.put_pixel(x, y, Rgba([20, 20, 20, 255]));
        }
    }
    let config = DiffConfig::default();

    c.bench_function("compare_changed_block_1440x2160", |b| {
        b.iter(|| compare_images(&baseline, &capture, &config))
    });
}

criterion_group!(benches, bench_compare_identical, bench_compare_with_changed_block);
criterion_main!(benches);
