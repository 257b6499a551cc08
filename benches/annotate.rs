use criterion::{criterion_group, criterion_main, Criterion};
use recordify_core::capture::{CaptureProvider, Hasher, ScreenCapture, SyntheticCapture};
use recordify_core::clock::SystemClock;
use recordify_core::geometry::{Point, Rectangle};
use recordify_core::providers::{NullExporter, NullOverlay, NullRenderer};
use recordify_core::writer::{Annotation, Writer};
use std::sync::Arc;
use std::time::Instant;

fn bench_annotation_churn(c: &mut Criterion) {
    let mut writer = Writer::new(
        Box::new(NullRenderer::new()),
        Box::new(NullOverlay::new()),
        Arc::new(NullExporter::new()),
        Arc::new(SystemClock),
    );
    writer.initialize().expect("writer init");

    c.bench_function("annotation_add_undo_redo", |b| {
        b.iter(|| {
            for i in 0..100 {
                let annotation = Annotation::new("click").with_points(vec![Point::new(i, i)]);
                writer.add_annotation(annotation).expect("add annotation");
            }
            for _ in 0..50 {
                writer.undo_last_annotation();
            }
            while writer.redo_annotation().is_some() {}
            writer.clear_annotations();
        })
    });
}

fn bench_change_detection(c: &mut Criterion) {
    let capture = SyntheticCapture::new();
    let area = Rectangle::new(0, 0, 1920, 1080);
    let now = Instant::now();
    let previous = ScreenCapture::from_pixels(area, capture.capture_pixels(area), now, 0).expect("frame");
    let current = ScreenCapture::from_pixels(area, capture.capture_pixels(area), now, 1).expect("frame");
    let hasher = Hasher::default();

    c.bench_function("changed_regions_1080p", |b| {
        b.iter(|| current.find_changed_regions(&previous, &hasher))
    });
}

criterion_group!(benches, bench_annotation_churn, bench_change_detection);
criterion_main!(benches);
