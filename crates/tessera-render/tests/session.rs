//! Session protocol, shared initialization and polygon submission tests.

use std::sync::{Arc, Barrier};
use std::thread;

use glam::Vec2;
use tessera_core::geometry::Rect;
use tessera_device::{
    GpuShaderModule, MockRenderContext, RenderContext, ResourceId, ShaderStage,
};
use tessera_render::{
    BatchState, BlendMode, Color, PolygonBuilder, PolygonData, PolygonVertex, PrimitiveOptions,
    ProtocolViolation, RenderError, Renderer2D, Renderer2DDescriptor, ShaderState,
    SharedResources, Texture2D, TimingData,
};

/// Shader modules created by one initialization of the shared defaults.
const DEFAULT_SHADER_COUNT: usize = 4;

fn setup() -> (Arc<MockRenderContext>, Renderer2D) {
    tessera_core::logging::init_with_filter("tessera_render=debug");
    let mock = Arc::new(MockRenderContext::new());
    let renderer = Renderer2D::new(mock.clone());
    (mock, renderer)
}

fn unit_square() -> Rect<f32> {
    Rect::new(0.0, 0.0, 10.0, 10.0)
}

fn triangle_builder() -> PolygonBuilder {
    PolygonBuilder::new()
        .with_vertices([
            PolygonVertex::new(Vec2::ZERO, Color::WHITE, Vec2::ZERO),
            PolygonVertex::new(Vec2::new(10.0, 0.0), Color::WHITE, Vec2::X),
            PolygonVertex::new(Vec2::new(0.0, 10.0), Color::WHITE, Vec2::Y),
        ])
        .with_indices([0, 1, 2])
}

// ====================
// Begin / End protocol
// ====================

#[test]
fn test_begin_defaults_match_explicit_none() {
    let (_, mut renderer) = setup();

    renderer.begin().unwrap();
    let implicit = renderer.active_state().cloned().unwrap();
    renderer.end();

    renderer.begin_with(None, None).unwrap();
    let explicit = renderer.active_state().cloned().unwrap();
    renderer.end();

    renderer
        .begin_with(Some(&BatchState::default()), None)
        .unwrap();
    let empty_partial = renderer.active_state().cloned().unwrap();
    renderer.end();

    assert_eq!(implicit, explicit);
    assert_eq!(implicit, empty_partial);
    assert_eq!(implicit.blend, BlendMode::Alpha);
}

#[test]
fn test_partial_state_fills_default_stages() {
    let (_, mut renderer) = setup();
    let state = BatchState::default().with_blend(BlendMode::Additive);

    renderer.begin_with(Some(&state), None).unwrap();
    let active = renderer.active_state().cloned().unwrap();
    let stages = renderer.batch().unwrap().stages().clone();
    renderer.end();

    assert_eq!(active.blend, BlendMode::Additive);
    assert_eq!(active.vertex_stage, stages.sprite_vertex);
    assert_eq!(active.pixel_stage, stages.sprite_pixel);
}

#[test]
fn test_end_is_idempotent() {
    let (mock, mut renderer) = setup();
    renderer
        .begin()
        .unwrap()
        .draw_filled_rectangle(unit_square(), Color::WHITE, &PrimitiveOptions::default())
        .unwrap()
        .end();
    assert_eq!(mock.count_submissions(), 1);

    let calls = mock.call_count();
    renderer.end().end();
    assert_eq!(mock.call_count(), calls);
    assert!(!renderer.is_active());
}

#[test]
fn test_nested_begin_keeps_the_first_session() {
    let (mock, mut renderer) = setup();
    let options = PrimitiveOptions::default();
    renderer.begin().unwrap();
    renderer
        .draw_filled_rectangle(unit_square(), Color::WHITE, &options)
        .unwrap();

    let err = renderer.begin().err();
    assert_eq!(
        err,
        Some(RenderError::ProtocolViolation(
            ProtocolViolation::SessionAlreadyActive
        ))
    );

    renderer.end();
    assert_eq!(mock.count_submissions(), 1);
}

#[test]
fn test_every_draw_requires_a_session() {
    let (mock, mut renderer) = setup();
    let options = PrimitiveOptions::default();
    let polygon = triangle_builder().build(&*mock).unwrap();
    let font = Arc::new(tessera_render::text::Font::new("empty", 10.0));
    let outside = |result: Result<&mut Renderer2D, RenderError>| {
        matches!(
            result.err(),
            Some(RenderError::ProtocolViolation(
                ProtocolViolation::DrawOutsideSession
            ))
        )
    };

    assert!(outside(renderer.draw_filled_rectangle(unit_square(), Color::WHITE, &options)));
    assert!(outside(renderer.draw_rectangle(unit_square(), Color::WHITE, 2.0, &options)));
    assert!(outside(renderer.draw_line(Vec2::ZERO, Vec2::ONE, Color::WHITE, 1.0, &options)));
    assert!(outside(renderer.draw_ellipse(unit_square(), Color::WHITE, 1.0, 1.0, &options)));
    assert!(outside(renderer.draw_filled_ellipse(unit_square(), Color::WHITE, 1.0, &options)));
    assert!(outside(renderer.draw_arc(
        unit_square(),
        Color::WHITE,
        0.0,
        90.0,
        1.0,
        1.0,
        &options
    )));
    assert!(outside(renderer.draw_filled_arc(
        unit_square(),
        Color::WHITE,
        0.0,
        90.0,
        1.0,
        &options
    )));
    assert!(outside(renderer.draw_polygon(&polygon)));
    assert!(outside(renderer.draw_string(&font, "A", Vec2::ZERO, None)));
    assert!(outside(renderer.flush()));
    assert_eq!(mock.count_submissions(), 0);
}

#[test]
fn test_draw_if_and_draw_each_chain() {
    let (mock, mut renderer) = setup();
    let options = PrimitiveOptions::default();
    let t = Texture2D::from_rgba8(&*mock, "t", 2, 2, &[255; 16]).unwrap();
    let textured = PrimitiveOptions::default().with_texture(&t);

    renderer.begin().unwrap();
    renderer
        .draw_if(false, |r| r.draw_filled_rectangle(unit_square(), Color::RED, &textured))
        .unwrap()
        .draw_each([0.0, 20.0, 40.0], |r, x| {
            r.draw_filled_rectangle(Rect::new(x, 0.0, 10.0, 10.0), Color::RED, &options)
        })
        .unwrap()
        .draw_if(true, |r| r.draw_filled_rectangle(unit_square(), Color::RED, &textured))
        .unwrap();
    renderer.end();

    let submissions = mock.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].vertex_count(), 12);
    assert_eq!(submissions[1].draw_call.texture.id(), t.id());
}

// ====================
// Shared initialization
// ====================

#[test]
fn test_concurrent_first_begin_initializes_once() {
    let mock = Arc::new(MockRenderContext::new());
    let shared = SharedResources::new();
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let mock = Arc::clone(&mock);
            let shared = Arc::clone(&shared);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut renderer =
                    Renderer2D::with_shared(mock, shared, Renderer2DDescriptor::default());
                barrier.wait();
                renderer.begin().unwrap().end();
                renderer
            })
        })
        .collect();
    let renderers: Vec<Renderer2D> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(mock.count_shader_creates(), DEFAULT_SHADER_COUNT);
    assert!(shared.is_initialized());

    drop(renderers);
    assert!(!shared.is_initialized());
}

#[test]
fn test_dispose_releases_shared_defaults_with_last_renderer() {
    let mock = Arc::new(MockRenderContext::new());
    let shared = SharedResources::new();
    let mut first =
        Renderer2D::with_shared(mock.clone(), shared.clone(), Renderer2DDescriptor::default());
    let mut second =
        Renderer2D::with_shared(mock.clone(), shared.clone(), Renderer2DDescriptor::default());
    first.begin().unwrap().end();
    second.begin().unwrap();

    assert_eq!(
        second.dispose(),
        Err(ProtocolViolation::SessionAlreadyActive.into())
    );
    second.end();

    first.dispose().unwrap();
    assert!(shared.is_initialized());
    second.dispose().unwrap();
    assert!(!shared.is_initialized());

    // A disposed renderer initializes again on its next begin.
    first.begin().unwrap().end();
    assert_eq!(mock.count_shader_creates(), DEFAULT_SHADER_COUNT * 2);
}

// ====================
// Constants
// ====================

#[test]
fn test_timing_is_uploaded_on_begin() {
    let (_, mut renderer) = setup();
    renderer.update_timing(1.5, 0.25);
    renderer.begin().unwrap();
    let constants = renderer.batch().unwrap().constants();
    assert_eq!(constants.timing().value(), &TimingData::new(1.5, 0.25, 1));
    let uploads = constants.timing().uploads();
    renderer.end();

    // Unchanged timing is not uploaded again.
    renderer.begin().unwrap();
    assert_eq!(renderer.batch().unwrap().constants().timing().uploads(), uploads);
    renderer.end();
}

// ====================
// Polygons
// ====================

#[test]
fn test_polygon_submits_immediately_and_restores_stages() {
    let (mock, mut renderer) = setup();
    let options = PrimitiveOptions::default();
    let mut polygon = triangle_builder().build(&*mock).unwrap();
    polygon.set_position(Vec2::new(50.0, 50.0));
    polygon.set_angle(90.0);
    polygon.set_flip_horizontal(true);

    renderer.begin().unwrap();
    let stages = renderer.batch().unwrap().stages().clone();
    renderer
        .draw_filled_rectangle(unit_square(), Color::WHITE, &options)
        .unwrap()
        .draw_polygon(&polygon)
        .unwrap();
    // The pending rectangle and the polygon are already on the device.
    assert_eq!(mock.count_submissions(), 2);
    assert_eq!(renderer.active_state().unwrap().vertex_stage, stages.sprite_vertex);
    assert_eq!(renderer.active_state().unwrap().pixel_stage, stages.sprite_pixel);

    renderer
        .draw_filled_rectangle(unit_square(), Color::WHITE, &options)
        .unwrap()
        .end();

    let submissions = mock.submissions();
    assert_eq!(submissions.len(), 3);
    let shader = |i: usize| {
        submissions[i]
            .draw_call
            .vertex_stage
            .shader
            .as_ref()
            .map(|s| s.id())
    };
    assert_eq!(shader(0), stages.sprite_vertex.shader_id());
    assert_eq!(shader(1), stages.polygon_vertex.shader_id());
    assert_eq!(shader(2), stages.sprite_vertex.shader_id());

    let immediate = &submissions[1];
    assert_eq!(
        immediate.draw_call.vertex_buffer.buffer.id(),
        polygon.vertex_buffer().id()
    );
    assert_eq!(
        immediate.draw_call.index_buffer.as_ref().map(|b| b.id()),
        Some(polygon.index_buffer().id())
    );
    assert_eq!(immediate.indices, vec![0, 1, 2]);

    let polygon_buffer = renderer.batch().unwrap().constants().polygon().buffer().id();
    let bytes = mock.buffer_contents(polygon_buffer).unwrap();
    let uploaded: PolygonData = bytemuck::pod_read_unaligned(&bytes);
    assert_eq!(uploaded, polygon.polygon_data());
    assert_eq!(uploaded.misc[0], 1.0);
    assert_eq!(uploaded.misc[1], 0.0);
    assert!(uploaded.misc[2].abs() < 1e-6);
    assert!((uploaded.misc[3] - 1.0).abs() < 1e-6);
}

#[test]
fn test_polygon_keeps_custom_vertex_stage() {
    let (mock, mut renderer) = setup();
    let custom = GpuShaderModule::new(ResourceId::new(9_999), ShaderStage::Vertex, "vs_custom");
    let state = BatchState::default().with_vertex_shader(ShaderState::new(custom));
    let polygon = triangle_builder().build(&*mock).unwrap();

    renderer.begin_with(Some(&state), None).unwrap();
    let stages = renderer.batch().unwrap().stages().clone();
    renderer.draw_polygon(&polygon).unwrap().end();

    let submission = &mock.submissions()[0];
    let vertex = submission.draw_call.vertex_stage.shader.as_ref().map(|s| s.id());
    let pixel = submission.draw_call.pixel_stage.shader.as_ref().map(|s| s.id());
    assert_eq!(vertex, Some(ResourceId::new(9_999)));
    assert_eq!(pixel, stages.polygon_pixel.shader_id());
}

// ====================
// Errors
// ====================

#[test]
fn test_multisampled_cube_view_is_device_capability_error() {
    let mock = MockRenderContext::new();
    let texture = mock.create_texture(&wgpu::TextureDescriptor {
        label: Some("msaa cube"),
        size: wgpu::Extent3d {
            width: 16,
            height: 16,
            depth_or_array_layers: 6,
        },
        mip_level_count: 1,
        sample_count: 4,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    let result = Texture2D::from_texture(&mock, &texture, wgpu::TextureViewDimension::Cube);
    assert!(matches!(result, Err(RenderError::DeviceCapability(_))));

    let view = Texture2D::from_texture(&mock, &texture, wgpu::TextureViewDimension::D2Array);
    assert!(view.is_ok());
}

#[test]
fn test_mis_sized_color_is_invalid_argument() {
    let values: &[f32] = &[1.0, 0.0, 0.0];
    assert!(matches!(
        Color::try_from(values),
        Err(RenderError::InvalidArgument(_))
    ));
    let values: &[f32] = &[1.0, 0.0, 0.0, 1.0];
    assert_eq!(Color::try_from(values).unwrap(), Color::RED);
}
