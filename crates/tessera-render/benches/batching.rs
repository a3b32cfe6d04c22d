//! Benchmarks for batch accumulation and text layout against the mock device.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use glam::Vec2;
use tessera_core::geometry::Rect;
use tessera_device::MockRenderContext;
use tessera_render::text::{Font, Glyph, LayoutOptions};
use tessera_render::{Color, PrimitiveOptions, Renderer2D, Texture2D};

fn bench_rectangles(c: &mut Criterion) {
    let mut group = c.benchmark_group("rectangles");
    let mock = Arc::new(MockRenderContext::new());
    let mut renderer = Renderer2D::new(mock.clone());
    let pages = [
        Texture2D::from_rgba8(&*mock, "a", 4, 4, &[255; 64]).unwrap(),
        Texture2D::from_rgba8(&*mock, "b", 4, 4, &[255; 64]).unwrap(),
    ];

    for count in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("shared_state", count), &count, |b, &count| {
            let options = PrimitiveOptions::default();
            b.iter(|| {
                renderer.begin().unwrap();
                for i in 0..count {
                    let region = Rect::new((i % 100) as f32 * 8.0, (i / 100) as f32 * 8.0, 6.0, 6.0);
                    renderer
                        .draw_filled_rectangle(black_box(region), Color::WHITE, &options)
                        .unwrap();
                }
                renderer.end();
                mock.clear_calls();
            });
        });

        group.bench_with_input(BenchmarkId::new("alternating_texture", count), &count, |b, &count| {
            b.iter(|| {
                renderer.begin().unwrap();
                for i in 0..count {
                    let options = PrimitiveOptions::default().with_texture(&pages[i % 2]);
                    let region = Rect::new(i as f32, 0.0, 6.0, 6.0);
                    renderer
                        .draw_filled_rectangle(black_box(region), Color::WHITE, &options)
                        .unwrap();
                }
                renderer.end();
                mock.clear_calls();
            });
        });
    }

    group.finish();
}

fn bench_ellipses(c: &mut Criterion) {
    let mut group = c.benchmark_group("ellipses");
    let mock = Arc::new(MockRenderContext::new());
    let mut renderer = Renderer2D::new(mock.clone());
    let options = PrimitiveOptions::default();

    for smoothness in [0.5f32, 1.0, 4.0] {
        group.bench_with_input(
            BenchmarkId::from_parameter(smoothness),
            &smoothness,
            |b, &smoothness| {
                b.iter(|| {
                    renderer.begin().unwrap();
                    for i in 0..100 {
                        let region = Rect::new(i as f32 * 10.0, 0.0, 40.0, 20.0);
                        renderer
                            .draw_filled_ellipse(region, Color::WHITE, black_box(smoothness), &options)
                            .unwrap();
                    }
                    renderer.end();
                    mock.clear_calls();
                });
            },
        );
    }

    group.finish();
}

fn bench_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("text");
    let mock = Arc::new(MockRenderContext::new());
    let mut renderer = Renderer2D::new(mock.clone());
    let page = Texture2D::from_rgba8(&*mock, "glyphs", 64, 64, &vec![255; 64 * 64 * 4]).unwrap();

    let mut font = Font::new("bench", 12.0).with_glyph(Glyph::new(' ', 4.0));
    for (i, character) in ('a'..='z').enumerate() {
        let region = Rect::new((i % 8) as f32 * 8.0, (i / 8) as f32 * 8.0, 8.0, 8.0);
        font.insert_glyph(Glyph::new(character, 7.0).with_bitmap(page.clone(), region, Vec2::ZERO));
    }
    let font = Arc::new(font);
    let paragraph = "the quick brown fox jumps over the lazy dog\n".repeat(20);

    group.throughput(Throughput::Bytes(paragraph.len() as u64));
    group.bench_function("measure", |b| {
        let options = LayoutOptions::default();
        b.iter(|| renderer.measure_text(&font, black_box(&paragraph), &options));
    });
    group.bench_function("draw_string", |b| {
        b.iter(|| {
            renderer.begin().unwrap();
            renderer
                .draw_string(&font, black_box(&paragraph), Vec2::ZERO, None)
                .unwrap();
            renderer.end();
            mock.clear_calls();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_rectangles, bench_ellipses, bench_text);
criterion_main!(benches);
