mod common;

use common::{all_filters, reference_luminance, synthetic_glyphs};
use eqraster::filters::{
    AdaptiveContrast, Bilateral, ContrastAdaptiveSharpen, EdgePreservingAa, GlyphAlignment, MathStroke,
    MorphologicalEdge, SubpixelHinting, SymbolRecognition, TextSharpen, VectorFieldAa,
};
use eqraster::rendering::{is_background, pixel_luminance};
use eqraster::{EdgeType, FilterOptions, FilterPass, Pipeline, PixelBuffer};

fn every_pass() -> Vec<Box<dyn FilterPass>> {
    vec![
        Box::new(MathStroke::new(1.0)),
        Box::new(SymbolRecognition),
        Box::new(SubpixelHinting::new()),
        Box::new(TextSharpen),
        Box::new(EdgePreservingAa),
        Box::new(VectorFieldAa::new(0.7)),
        Box::new(ContrastAdaptiveSharpen),
        Box::new(MorphologicalEdge::new(EdgeType::TopHat, 1)),
        Box::new(MorphologicalEdge::new(EdgeType::BlackHat, 2)),
        Box::new(MorphologicalEdge::new(EdgeType::Gradient, 1)),
        Box::new(MorphologicalEdge::new(EdgeType::Erosion, 1)),
        Box::new(MorphologicalEdge::new(EdgeType::Dilation, 3)),
        Box::new(Bilateral::default()),
        Box::new(GlyphAlignment::new(0.3)),
        Box::new(AdaptiveContrast::new(2.0)),
    ]
}

#[test]
fn luminance_matches_reference_weights() {
    let samples = [
        [0, 0, 0, 255],
        [255, 255, 255, 255],
        [255, 0, 0, 0],
        [0, 255, 0, 10],
        [0, 0, 255, 200],
        [12, 200, 99, 77],
    ];
    for px in samples {
        let diff = (pixel_luminance(px) as f64 - reference_luminance(px)).abs();
        assert!(diff < 1e-3, "luminance mismatch for {:?}", px);
    }
}

#[test]
fn background_pixels_pass_through_every_pass() {
    let src = synthetic_glyphs(32, 24);
    for pass in every_pass() {
        let out = pass.apply(&src);
        for (x, y, px) in src.pixels() {
            if is_background(px) {
                assert_eq!(out.pixel(x, y), px, "{} changed background at ({}, {})", pass.name(), x, y);
            }
        }
    }
}

#[test]
fn background_pixels_pass_through_full_pipeline() {
    let src = synthetic_glyphs(32, 24);
    for vector_field_aa in [false, true] {
        let opts = FilterOptions {
            vector_field_aa,
            ..all_filters()
        };
        let out = Pipeline::from_options(&opts).run(src.clone());
        for (x, y, px) in src.pixels() {
            if is_background(px) {
                assert_eq!(out.pixel(x, y), px);
            }
        }
    }
}

#[test]
fn passes_preserve_dimensions() {
    for (w, h) in [(1, 1), (2, 7), (9, 3), (32, 24)] {
        let src = synthetic_glyphs(w.max(4), h.max(4));
        for pass in every_pass() {
            assert_eq!(pass.apply(&src).dimensions(), src.dimensions(), "{}", pass.name());
        }
        let tiny = PixelBuffer::filled(w, h, [90, 90, 90, 255]);
        for pass in every_pass() {
            assert_eq!(pass.apply(&tiny).dimensions(), (w, h), "{}", pass.name());
        }
    }
}

#[test]
fn pipeline_is_deterministic() {
    let src = synthetic_glyphs(40, 30);
    let pipeline = Pipeline::from_options(&all_filters());
    let first = pipeline.run(src.clone());
    let second = pipeline.run(src);
    assert_eq!(first.fingerprint(), second.fingerprint());
}

#[test]
fn overshooting_kernels_saturate_at_channel_bounds() {
    // 3*255 overshoots white, 0 - 4*0.5*255 undershoots black
    let mut src = PixelBuffer::filled(5, 5, [0, 0, 0, 255]);
    src.set_pixel(2, 2, [255, 255, 255, 255]);
    assert_eq!(TextSharpen.apply(&src).pixel(2, 2), [255, 255, 255, 255]);

    let mut src = PixelBuffer::filled(5, 5, [255, 255, 255, 255]);
    src.set_pixel(2, 2, [0, 0, 0, 255]);
    assert_eq!(TextSharpen.apply(&src).pixel(2, 2), [0, 0, 0, 255]);

    // a strong stroke weight pushes a low-contrast centre past both bounds
    let stroke = MathStroke::new(20.0);
    let mut src = PixelBuffer::filled(5, 5, [100, 100, 100, 255]);
    src.set_pixel(2, 2, [120, 120, 120, 255]);
    assert_eq!(stroke.apply(&src).pixel(2, 2), [255, 255, 255, 255]);
    src.set_pixel(2, 2, [80, 80, 80, 255]);
    assert_eq!(stroke.apply(&src).pixel(2, 2), [0, 0, 0, 255]);
}

#[test]
fn checkerboard_keeps_buffer_shape() {
    let mut src = PixelBuffer::new(16, 16);
    for y in 0..16 {
        for x in 0..16 {
            let v = if (x + y) % 2 == 0 { 255 } else { 0 };
            src.set_pixel(x, y, [v, 255 - v, v, 255]);
        }
    }
    for pass in every_pass() {
        let out = pass.apply(&src);
        assert_eq!(out.dimensions(), src.dimensions(), "{}", pass.name());
        assert_eq!(out.data().len(), src.data().len(), "{}", pass.name());
    }
    let out = Pipeline::from_options(&all_filters()).run(src);
    assert_eq!(out.dimensions(), (16, 16));
}

#[test]
fn flat_opaque_region_survives_default_pipeline() {
    let src = PixelBuffer::filled(12, 12, [70, 140, 210, 255]);
    let out = Pipeline::from_options(&FilterOptions::default()).run(src.clone());
    assert_eq!(out, src);
}

#[test]
fn supersampled_pipeline_returns_target_size() {
    let opts = FilterOptions {
        supersample_factor: 4,
        ..FilterOptions::default()
    };
    let out = Pipeline::from_options(&opts).run(synthetic_glyphs(64, 48));
    assert_eq!(out.dimensions(), (16, 12));
}
