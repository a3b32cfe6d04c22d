//! Batch reconciliation tests against the recording mock device.
//!
//! These tests verify that adjacent draws sharing texture, sampler and alpha
//! test coalesce into one submission, and that submissions keep draw order.

use std::sync::Arc;

use glam::Vec2;
use tessera_core::geometry::Rect;
use tessera_device::{MockRenderContext, SubmitRecord};
use tessera_render::{
    AlphaTestRange, Color, PrimitiveOptions, Renderer2D, SamplerPreset, Sprite, Texture2D,
    TriangleVertex, Vertex2D,
};

fn setup() -> (Arc<MockRenderContext>, Renderer2D) {
    let mock = Arc::new(MockRenderContext::new());
    let renderer = Renderer2D::new(mock.clone());
    (mock, renderer)
}

fn texture(mock: &MockRenderContext, label: &str) -> Texture2D {
    Texture2D::from_rgba8(mock, label, 4, 4, &[255; 4 * 4 * 4]).unwrap()
}

fn vertices(record: &SubmitRecord) -> Vec<Vertex2D> {
    bytemuck::pod_collect_to_vec(&record.vertex_bytes)
}

fn square(x: f32) -> Rect<f32> {
    Rect::new(x, 0.0, 10.0, 10.0)
}

// ====================
// Ordering and coalescing
// ====================

#[test]
fn test_two_textures_yield_two_ordered_submissions() {
    let (mock, mut renderer) = setup();
    let t = texture(&mock, "t");
    let t2 = texture(&mock, "t2");
    renderer.begin().unwrap();
    let sampler = renderer
        .shared()
        .samplers()
        .get_or_create(&*mock, SamplerPreset::PointClamped.into());

    let with_t = PrimitiveOptions::default().with_texture(&t).with_sampler(&sampler);
    let with_t2 = PrimitiveOptions::default().with_texture(&t2).with_sampler(&sampler);
    renderer
        .draw_filled_rectangle(square(0.0), Color::WHITE, &with_t)
        .unwrap()
        .draw_filled_rectangle(square(20.0), Color::WHITE, &with_t)
        .unwrap()
        .draw_filled_rectangle(square(40.0), Color::WHITE, &with_t2)
        .unwrap()
        .end();

    let submissions = mock.submissions();
    assert_eq!(submissions.len(), 2);

    let first = &submissions[0];
    assert_eq!(first.draw_call.texture.id(), t.id());
    assert_eq!(first.draw_call.sampler.id(), sampler.id());
    assert_eq!(first.indices, vec![0, 1, 2, 2, 1, 3, 4, 5, 6, 6, 5, 7]);
    let v = vertices(first);
    assert_eq!(v.len(), 8);
    assert_eq!(v[0].xy(), Vec2::new(0.0, 0.0));
    assert_eq!(v[4].xy(), Vec2::new(20.0, 0.0));

    let second = &submissions[1];
    assert_eq!(second.draw_call.texture.id(), t2.id());
    let v = vertices(second);
    assert_eq!(v.len(), 4);
    assert_eq!(v[0].xy(), Vec2::new(40.0, 0.0));
}

#[test]
fn test_shared_state_coalesces_into_one_submission() {
    let (mock, mut renderer) = setup();
    let options = PrimitiveOptions::default();
    renderer.begin().unwrap();
    renderer
        .draw_loop(10, |r, i| {
            r.draw_filled_rectangle(square(i as f32 * 12.0), Color::GREEN, &options)
        })
        .unwrap();
    renderer.end();

    assert_eq!(mock.count_submissions(), 1);
    let stats = renderer.stats();
    assert_eq!(stats.submissions, 1);
    assert_eq!(stats.vertices, 40);
    assert_eq!(stats.indices, 60);
    assert_eq!(stats.batches_coalesced, 9);
}

#[test]
fn test_texture_change_flushes_before_new_geometry() {
    let (mock, mut renderer) = setup();
    let t = texture(&mock, "t");
    let t2 = texture(&mock, "t2");
    renderer.begin().unwrap();

    for i in 0..4 {
        let options = PrimitiveOptions::default().with_texture(&t);
        renderer
            .draw_filled_rectangle(square(i as f32 * 12.0), Color::WHITE, &options)
            .unwrap();
    }
    assert_eq!(mock.count_submissions(), 0);

    let options = PrimitiveOptions::default().with_texture(&t2);
    renderer
        .draw_filled_rectangle(square(100.0), Color::WHITE, &options)
        .unwrap();
    assert_eq!(mock.count_submissions(), 1);
    assert_eq!(vertices(&mock.submissions()[0]).len(), 16);

    renderer.end();
    assert_eq!(mock.count_submissions(), 2);
}

#[test]
fn test_topology_change_flushes() {
    let (mock, mut renderer) = setup();
    let options = PrimitiveOptions::default();
    let points = [
        TriangleVertex::new(Vec2::new(0.0, 0.0), Color::RED),
        TriangleVertex::new(Vec2::new(10.0, 0.0), Color::RED),
        TriangleVertex::new(Vec2::new(0.0, 10.0), Color::RED),
    ];
    renderer
        .begin()
        .unwrap()
        .draw_filled_rectangle(square(0.0), Color::RED, &options)
        .unwrap()
        .draw_triangle(points, &options)
        .unwrap()
        .end();

    let submissions = mock.submissions();
    assert_eq!(submissions.len(), 2);
    assert!(submissions[0].draw_call.is_indexed());
    assert!(!submissions[1].draw_call.is_indexed());
    assert_eq!(submissions[1].vertex_count(), 3);
}

#[test]
fn test_sprites_with_same_texture_share_a_submission() {
    let (mock, mut renderer) = setup();
    let t = texture(&mock, "atlas");
    let mut sprites: Vec<Sprite> = (0..3)
        .map(|i| {
            let mut sprite = Sprite::from_texture(t.clone());
            sprite.set_position(Vec2::new(i as f32 * 8.0, 0.0));
            sprite
        })
        .collect();

    renderer.begin().unwrap();
    renderer
        .draw_each(sprites.iter_mut(), |r, sprite| r.draw_sprite(sprite))
        .unwrap();
    renderer.end();

    let submissions = mock.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].draw_call.texture.id(), t.id());
    assert_eq!(submissions[0].vertex_count(), 12);
}

#[test]
fn test_adjacent_strips_are_kept_apart() {
    let (mock, mut renderer) = setup();
    let options = PrimitiveOptions::default();
    renderer
        .begin()
        .unwrap()
        .draw_filled_ellipse(Rect::new(0.0, 0.0, 20.0, 20.0), Color::WHITE, 1.0, &options)
        .unwrap()
        .draw_filled_ellipse(Rect::new(40.0, 0.0, 20.0, 20.0), Color::WHITE, 1.0, &options)
        .unwrap()
        .end();

    let submissions = mock.submissions();
    assert_eq!(submissions.len(), 1);
    // 64 segments give 130 strip vertices per ellipse, joined by two degenerates.
    let v = vertices(&submissions[0]);
    assert_eq!(v.len(), 130 * 2 + 2);
    assert_eq!(v[130], v[129]);
    assert_eq!(v[131], v[132]);
}

// ====================
// Degenerate input
// ====================

#[test]
fn test_degenerate_draws_neither_queue_nor_flush() {
    let (mock, mut renderer) = setup();
    let t = texture(&mock, "t");
    let t2 = texture(&mock, "t2");
    let with_t = PrimitiveOptions::default().with_texture(&t);
    let with_t2 = PrimitiveOptions::default().with_texture(&t2);

    renderer.begin().unwrap();
    renderer
        .draw_filled_rectangle(square(0.0), Color::WHITE, &with_t)
        .unwrap()
        .draw_filled_rectangle(Rect::new(5.0, 5.0, 0.0, 10.0), Color::WHITE, &with_t2)
        .unwrap()
        .draw_filled_rectangle(Rect::new(5.0, 5.0, 10.0, 0.0), Color::WHITE, &with_t2)
        .unwrap()
        .draw_line(Vec2::ONE, Vec2::ONE, Color::WHITE, 2.0, &with_t2)
        .unwrap()
        .draw_rectangle(square(30.0), Color::WHITE, 0.0, &with_t2)
        .unwrap()
        .draw_rectangle(square(30.0), Color::WHITE, -1.0, &with_t2)
        .unwrap()
        .draw_ellipse(square(30.0), Color::WHITE, 1.0, 0.0, &with_t2)
        .unwrap()
        .draw_filled_arc(square(30.0), Color::WHITE, 90.0, 90.0, 1.0, &with_t2)
        .unwrap();

    assert_eq!(mock.count_submissions(), 0);
    renderer.end();

    let submissions = mock.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].draw_call.texture.id(), t.id());
    assert_eq!(submissions[0].vertex_count(), 4);
}

// ====================
// Alpha test constants
// ====================

#[test]
fn test_alpha_test_uploaded_once_per_value() {
    let (mock, mut renderer) = setup();
    let options = PrimitiveOptions::default();

    renderer.begin().unwrap();
    let alpha_buffer = renderer
        .batch()
        .unwrap()
        .constants()
        .alpha_test()
        .buffer()
        .id();

    // The default range matches the initial upload.
    renderer
        .draw_loop(5, |r, i| {
            r.draw_filled_rectangle(square(i as f32 * 12.0), Color::WHITE, &options)
        })
        .unwrap();
    renderer.end();
    mock.clear_calls();

    renderer.set_primitive_alpha_test(Some(AlphaTestRange::new(0.0, 0.5)));
    renderer.begin().unwrap();
    renderer
        .draw_loop(5, |r, i| {
            r.draw_filled_rectangle(square(i as f32 * 12.0), Color::WHITE, &options)
        })
        .unwrap();
    renderer.end();
    assert_eq!(mock.count_writes_to(alpha_buffer), 1);

    mock.clear_calls();
    renderer.begin().unwrap();
    renderer
        .draw_filled_rectangle(square(0.0), Color::WHITE, &options)
        .unwrap();
    renderer.end();
    assert_eq!(mock.count_writes_to(alpha_buffer), 0);
}

#[test]
fn test_alpha_test_change_splits_batch() {
    let (mock, mut renderer) = setup();
    let options = PrimitiveOptions::default();
    renderer.begin().unwrap();
    renderer
        .draw_filled_rectangle(square(0.0), Color::WHITE, &options)
        .unwrap();
    renderer.set_primitive_alpha_test(None);
    renderer
        .draw_filled_rectangle(square(20.0), Color::WHITE, &options)
        .unwrap();
    renderer.end();

    assert_eq!(mock.count_submissions(), 2);
    let alpha = renderer.batch().unwrap().constants().alpha_test().value();
    assert!(!alpha.is_enabled());
}

// ====================
// Staging growth
// ====================

#[test]
fn test_vertex_buffer_grows_and_never_shrinks() {
    let (mock, mut renderer) = setup();
    let options = PrimitiveOptions::default();
    let quads = 400;

    renderer.begin().unwrap();
    renderer
        .draw_loop(quads, |r, i| {
            r.draw_filled_rectangle(square(i as f32), Color::WHITE, &options)
        })
        .unwrap();
    renderer.end();

    let stride = std::mem::size_of::<Vertex2D>() as u64;
    let submissions = mock.submissions();
    assert_eq!(submissions.len(), 1);
    let size = submissions[0].draw_call.vertex_buffer.buffer.size();
    assert!(size >= quads as u64 * 4 * stride);
    assert!(size >= 2 * renderer.descriptor().min_vertex_buffer_size);
    assert_eq!(renderer.stats().buffer_growths, 1);

    // A smaller session reuses the grown buffer.
    mock.clear_calls();
    renderer
        .begin()
        .unwrap()
        .draw_filled_rectangle(square(0.0), Color::WHITE, &options)
        .unwrap()
        .end();
    assert_eq!(mock.count_buffer_creates(), 0);
    assert_eq!(mock.submissions()[0].draw_call.vertex_buffer.buffer.size(), size);
}

#[test]
fn test_second_session_draws_from_buffer_start() {
    let (mock, mut renderer) = setup();
    let options = PrimitiveOptions::default();
    for _ in 0..2 {
        renderer
            .begin()
            .unwrap()
            .draw_filled_rectangle(square(0.0), Color::WHITE, &options)
            .unwrap()
            .end();
    }

    let submissions = mock.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(
        submissions[0].draw_call.range,
        submissions[1].draw_call.range
    );
}
