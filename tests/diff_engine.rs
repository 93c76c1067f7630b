//! End-to-end scenarios for the diff engine, exercised at the PNG boundary
//! the way the check pipeline uses it.

use image::{Rgba, RgbaImage};
use pagewatch::diff::{self, DiffConfig, Status};

fn png_of(img: &RgbaImage) -> Vec<u8> {
    diff::encode_png(img).expect("encode test image")
}

fn white(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]))
}

#[test]
fn self_comparison_is_pixel_identical() {
    let img = png_of(&white(100, 100));

    let report = diff::compare_png(&img, &img, &DiffConfig::default()).unwrap();
    assert_eq!(report.diff_percent, 0.0);
    assert_eq!(report.status, Status::Clean);
    assert!(report.overlay.is_none());
}

#[test]
fn black_block_on_white_page() {
    let baseline = white(100, 100);
    let mut capture = baseline.clone();
    for y in 40..50 {
        for x in 20..30 {
            capture.put_pixel(x, y, Rgba([0, 0, 0, 255]));
        }
    }

    let report = diff::compare_png(
        &png_of(&baseline),
        &png_of(&capture),
        &DiffConfig::default(),
    )
    .unwrap();

    assert_eq!(report.differing_pixels, 100);
    assert!((report.diff_percent - 1.0).abs() < 1e-9);
    assert_eq!(report.status, Status::Changed);

    // The overlay highlights exactly the block, nothing else.
    let overlay = report.overlay.expect("overlay for a real change");
    assert_eq!(overlay.dimensions(), (100, 100));
    for (x, y, px) in overlay.enumerate_pixels() {
        let inside = (20..30).contains(&x) && (40..50).contains(&y);
        if inside {
            assert!(px[3] > 0, "block pixel ({x},{y}) not highlighted");
        } else {
            assert_eq!(px[3], 0, "pixel ({x},{y}) highlighted outside the block");
        }
    }
}

#[test]
fn height_drift_compares_the_overlap_only() {
    let baseline = white(100, 80);
    let mut capture = white(100, 100);
    // A change below row 80 must not be counted as a differing pixel.
    capture.put_pixel(50, 90, Rgba([0, 0, 0, 255]));

    let report = diff::compare_png(
        &png_of(&baseline),
        &png_of(&capture),
        &DiffConfig::default(),
    )
    .unwrap();

    assert_eq!((report.compared_width, report.compared_height), (100, 80));
    assert_eq!(report.differing_pixels, 0);
    // The excluded 20 rows are still charged to the percentage.
    assert!((report.diff_percent - 20.0).abs() < 1e-9);
    assert_eq!(report.status, Status::Changed);
}

#[test]
fn undecodable_input_is_never_clean() {
    let good = png_of(&white(10, 10));

    let report = diff::compare_or_failsafe(b"garbage", &good, &DiffConfig::default());
    assert_eq!(report.diff_percent, 100.0);
    assert_eq!(report.status, Status::Changed);

    let report = diff::compare_or_failsafe(&good, b"\x89PNG\r\n\x1a\ntruncated", &DiffConfig::default());
    assert_eq!(report.diff_percent, 100.0);
    assert_eq!(report.status, Status::Changed);
}

#[test]
fn decode_rejects_non_png() {
    assert!(diff::decode_png(b"not a png").is_err());
    assert!(diff::decode_png(&[]).is_err());
}
