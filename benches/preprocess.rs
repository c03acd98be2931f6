use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_scan::preprocess::{PreprocessingBank, clahe, deglare};
use rust_scan::quality::QualityAssessor;
use rust_scan::utils::binarization::{adaptive_binarize, otsu_binarize};
use rust_scan::utils::grayscale::to_luma;

mod common;

fn bench_to_luma_medium(c: &mut Criterion) {
    let image = vec![128u8; 640 * 480 * 3];
    c.bench_function("to_luma_640x480", |b| {
        b.iter(|| to_luma(black_box(&image), black_box(640), black_box(480), black_box(3)))
    });
}

fn bench_to_luma_large(c: &mut Criterion) {
    let image = vec![128u8; 1920 * 1080 * 3];
    c.bench_function("to_luma_1920x1080", |b| {
        b.iter(|| to_luma(black_box(&image), black_box(1920), black_box(1080), black_box(3)))
    });
}

fn bench_binarize_medium(c: &mut Criterion) {
    let gray = common::synthetic_scene(640, 480);
    c.bench_function("otsu_binarize_640x480", |b| b.iter(|| otsu_binarize(black_box(&gray))));
    c.bench_function("adaptive_binarize_640x480", |b| {
        b.iter(|| adaptive_binarize(black_box(&gray), black_box(15), black_box(2)))
    });
}

fn bench_clahe_medium(c: &mut Criterion) {
    let gray = common::synthetic_scene(640, 480);
    c.bench_function("clahe_640x480", |b| {
        b.iter(|| clahe(black_box(&gray), 6, 6, 2.5))
    });
}

fn bench_deglare_medium(c: &mut Criterion) {
    let gray = common::synthetic_scene(640, 480);
    c.bench_function("deglare_640x480", |b| {
        b.iter(|| deglare(black_box(&gray), 225, 4))
    });
}

fn bench_quality_and_variants(c: &mut Criterion) {
    let gray = common::synthetic_scene(640, 480);
    let assessor = QualityAssessor::default();
    let bank = PreprocessingBank::default();
    c.bench_function("assess_640x480", |b| b.iter(|| assessor.assess(black_box(&gray))));

    let verdict = assessor.assess(&gray);
    c.bench_function("variants_640x480", |b| {
        b.iter(|| bank.generate(black_box(&gray), black_box(&verdict)))
    });
}

criterion_group!(
    benches,
    bench_to_luma_medium,
    bench_to_luma_large,
    bench_binarize_medium,
    bench_clahe_medium,
    bench_deglare_medium,
    bench_quality_and_variants
);
criterion_main!(benches);
