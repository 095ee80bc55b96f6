mod common;

use std::fs;
use std::path::PathBuf;

use common::{all_filters, synthetic_glyphs};
use eqraster::{FilterOptions, Pipeline, PixelBuffer};

fn golden_path(name: &str) -> PathBuf {
    let mut p = PathBuf::from("tests/goldens/expected");
    p.push(name);
    p
}

/// Compare a fingerprint against a stored golden. Run with
/// `UPDATE_GOLDENS=1` to (re)create them after an intended output change.
fn check_golden(name: &str, fingerprint: &str) {
    let expected_path = golden_path(name);
    if std::env::var("UPDATE_GOLDENS").is_ok() {
        fs::create_dir_all("tests/goldens/expected").ok();
        fs::write(&expected_path, fingerprint).expect("write golden");
        println!("Updated golden: {:?}", expected_path);
        return;
    }

    let expected = fs::read_to_string(&expected_path).unwrap_or_else(|e| {
        panic!(
            "missing golden {:?} ({}); run with UPDATE_GOLDENS=1 to create it",
            expected_path, e
        )
    });
    assert_eq!(fingerprint, expected.trim());
}

/// Two-pixel stem, a half-transparent right edge, one soft pixel on the left
/// and a background speck in the corner.
fn small_stem() -> PixelBuffer {
    let mut buf = PixelBuffer::new(6, 5);
    for y in 0..5 {
        buf.set_pixel(2, y, [40, 40, 40, 255]);
        buf.set_pixel(3, y, [40, 40, 40, 255]);
        buf.set_pixel(4, y, [120, 120, 120, 160]);
    }
    buf.set_pixel(1, 2, [90, 90, 90, 200]);
    buf.set_pixel(0, 0, [200, 0, 0, 5]);
    buf
}

#[test]
fn default_pipeline_small_stem_is_exact() {
    const CLEAR: [u8; 4] = [0, 0, 0, 0];
    const INNER: [u8; 4] = [0, 0, 0, 255];
    const EDGE: [u8; 4] = [174, 174, 174, 160];
    let expected: [[[u8; 4]; 6]; 5] = [
        [[200, 0, 0, 5], CLEAR, [41, 41, 41, 255], INNER, EDGE, CLEAR],
        [CLEAR, CLEAR, [46, 46, 46, 255], INNER, EDGE, CLEAR],
        [CLEAR, [135, 135, 135, 200], [6, 6, 6, 255], INNER, EDGE, CLEAR],
        [CLEAR, CLEAR, [46, 46, 46, 255], INNER, EDGE, CLEAR],
        [CLEAR, CLEAR, [41, 41, 41, 255], INNER, EDGE, CLEAR],
    ];

    let out = Pipeline::from_options(&FilterOptions::default()).run(small_stem());
    for (y, row) in expected.iter().enumerate() {
        for (x, px) in row.iter().enumerate() {
            assert_eq!(out.pixel(x as u32, y as u32), *px, "pixel ({}, {})", x, y);
        }
    }
}

#[test]
fn default_pipeline_matches_golden() {
    let out = Pipeline::from_options(&FilterOptions::default()).run(synthetic_glyphs(48, 32));
    check_golden("default_pipeline.sha256", &out.fingerprint());
}

#[test]
fn full_pipeline_matches_golden() {
    let out = Pipeline::from_options(&all_filters()).run(synthetic_glyphs(48, 32));
    check_golden("full_pipeline.sha256", &out.fingerprint());
}

#[test]
fn vector_field_pipeline_matches_golden() {
    let opts = FilterOptions {
        vector_field_aa: true,
        supersample_factor: 2,
        ..all_filters()
    };
    let out = Pipeline::from_options(&opts).run(synthetic_glyphs(96, 64));
    assert_eq!(out.dimensions(), (48, 32));
    check_golden("vector_field_pipeline.sha256", &out.fingerprint());
}

#[tokio::test]
async fn end_to_end_png_is_stable() {
    let markup = r##"<svg width="24" height="12" viewBox="0 0 24 12"><path d="M2 6h20M6 1v10" stroke="#111" stroke-width="1.5"/></svg>"##;
    let first = eqraster::render(markup, 24, 12, &all_filters()).await.unwrap();
    let second = eqraster::render(markup, 24, 12, &all_filters()).await.unwrap();
    assert_eq!(first, second);
}
