//! Procedural geometry for rectangles, lines, triangles, ellipses and arcs.
//!
//! Every function writes into a [`BatchRenderable`] and returns `false`
//! without touching it when the input is degenerate (empty region, thickness
//! not above zero, no segments, coincident endpoints). Degenerate shapes are
//! not errors; the caller simply skips them.

use std::f32::consts::TAU;

use glam::Vec2;
use tessera_core::geometry::Rect;
use tessera_core::math::{ceil_px, wrap_degrees};
use tessera_core::profiling::profile_function;
use tessera_device::GpuSampler;

use crate::color::Color;
use crate::renderable::BatchRenderable;
use crate::texture::Texture2D;

/// Most segments any ellipse or arc is split into.
pub const MAX_SEGMENTS: u32 = 2048;
/// Fewest segments a full ellipse is split into.
pub const MIN_ELLIPSE_SEGMENTS: u32 = 8;
/// Segments per full turn at a smoothness of 1.
pub const SEGMENTS_PER_TURN: f32 = 64.0;

const UNIT_UVS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(0.0, 1.0),
    Vec2::new(1.0, 1.0),
];

/// Texturing and depth options shared by the primitive draws.
///
/// ```
/// use tessera_render::PrimitiveOptions;
///
/// let options = PrimitiveOptions::default().with_depth(0.5);
/// assert!(options.texture.is_none());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimitiveOptions<'a> {
    pub texture: Option<&'a Texture2D>,
    /// Normalized sub-region of `texture`. Shape positions are remapped into it.
    pub texture_region: Option<Rect<f32>>,
    pub texture_array_index: u32,
    /// Falls back to the renderer's default sampler.
    pub sampler: Option<&'a GpuSampler>,
    pub depth: f32,
    /// Depth at the end point of a line. Defaults to `depth`.
    pub end_depth: Option<f32>,
}

impl<'a> PrimitiveOptions<'a> {
    pub fn with_texture(mut self, texture: &'a Texture2D) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_texture_region(mut self, region: Rect<f32>) -> Self {
        self.texture_region = Some(region);
        self
    }

    pub fn with_array_index(mut self, index: u32) -> Self {
        self.texture_array_index = index;
        self
    }

    pub fn with_sampler(mut self, sampler: &'a GpuSampler) -> Self {
        self.sampler = Some(sampler);
        self
    }

    pub fn with_depth(mut self, depth: f32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_end_depth(mut self, depth: f32) -> Self {
        self.end_depth = Some(depth);
        self
    }

    fn array_index(&self) -> f32 {
        if self.texture.is_some() {
            self.texture_array_index as f32
        } else {
            0.0
        }
    }

    /// UV for `point`, remapping against `bounds` when a region is set.
    fn uv(&self, point: Vec2, bounds: &Rect<f32>) -> Vec2 {
        match (self.texture, self.texture_region) {
            (None, _) => Vec2::ZERO,
            (Some(texture), None) => texture.to_uv(point),
            (Some(_), Some(region)) => bounds.remap(point, &region),
        }
    }
}

/// One corner of [`triangle`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleVertex {
    pub position: Vec2,
    pub color: Color,
    /// Used only when the triangle is textured.
    pub uv: Vec2,
    pub array_index: u32,
}

impl TriangleVertex {
    pub fn new(position: Vec2, color: Color) -> Self {
        Self {
            position,
            color,
            uv: Vec2::ZERO,
            array_index: 0,
        }
    }

    pub fn with_uv(mut self, uv: Vec2) -> Self {
        self.uv = uv;
        self
    }
}

/// Segment count for a full ellipse: `ceil(smoothness * 64)` clamped to `[8, 2048]`.
pub fn ellipse_segments(smoothness: f32) -> u32 {
    let segments = (smoothness * SEGMENTS_PER_TURN).ceil();
    if segments.is_nan() {
        return 0;
    }
    segments.clamp(MIN_ELLIPSE_SEGMENTS as f32, MAX_SEGMENTS as f32) as u32
}

/// Segment count for an arc, scaled by the wedge's share of a full turn.
///
/// Angles are in degrees; whole turns above 360 are removed first.
pub fn arc_segments(smoothness: f32, start_degrees: f32, end_degrees: f32) -> u32 {
    let ratio = wedge_ratio(start_degrees, end_degrees);
    let segments = (smoothness * SEGMENTS_PER_TURN * ratio).ceil();
    if segments.is_nan() {
        return 0;
    }
    segments.clamp(0.0, MAX_SEGMENTS as f32) as u32
}

fn wedge_ratio(start_degrees: f32, end_degrees: f32) -> f32 {
    (wrap_degrees(end_degrees) - wrap_degrees(start_degrees)).abs() / 360.0
}

/// A solid quad covering `region`.
pub fn filled_rectangle(
    renderable: &mut BatchRenderable,
    region: Rect<f32>,
    color: Color,
    options: &PrimitiveOptions<'_>,
) -> bool {
    if region.is_empty() {
        return false;
    }

    let corners = [
        region.top_left(),
        Vec2::new(region.right(), region.top()),
        Vec2::new(region.left(), region.bottom()),
        Vec2::new(region.right(), region.bottom()),
    ];
    let uvs = match (options.texture, options.texture_region) {
        (None, _) => UNIT_UVS,
        (Some(texture), None) => corners.map(|corner| texture.to_uv(corner)),
        (Some(_), Some(tr)) => [
            tr.top_left(),
            Vec2::new(tr.right(), tr.top()),
            Vec2::new(tr.left(), tr.bottom()),
            Vec2::new(tr.right(), tr.bottom()),
        ],
    };

    let array_index = options.array_index();
    renderable.set_geometry(4, 6, wgpu::PrimitiveTopology::TriangleList);
    for ((vertex, corner), uv) in renderable
        .active_vertices_mut()
        .iter_mut()
        .zip(corners)
        .zip(uvs)
    {
        vertex.set(corner, options.depth, color, uv, array_index);
    }
    renderable.bounds = region;
    true
}

/// The four edge strips of a rectangle outline, each paired with its texture region.
///
/// With a thickness above one the outline is centred on the edges of
/// `region`. Texture regions are mapped proportionally against the outer
/// bounds so the strips together cover the whole texture region.
pub fn rectangle_outline(
    region: Rect<f32>,
    thickness: f32,
    texture_region: Option<Rect<f32>>,
) -> Option<[(Rect<f32>, Option<Rect<f32>>); 4]> {
    if region.is_empty() || thickness <= 0.0 {
        return None;
    }

    let outer = if thickness > 1.0 {
        region.inflate(thickness / 2.0, thickness / 2.0)
    } else {
        region
    };
    let t = thickness;
    let pieces = [
        // top
        Rect::new(outer.x, outer.y, outer.width, t),
        // right
        Rect::new(outer.right() - t, outer.y + t, t, outer.height - t * 2.0),
        // bottom
        Rect::new(outer.x, outer.bottom() - t, outer.width, t),
        // left
        Rect::new(outer.x, outer.y + t, t, outer.height - t * 2.0),
    ];

    Some(pieces.map(|piece| {
        let mapped = texture_region.map(|target| {
            let top_left = outer.remap(piece.top_left(), &target);
            let bottom_right = outer.remap(Vec2::new(piece.right(), piece.bottom()), &target);
            Rect::from_ltrb(top_left.x, top_left.y, bottom_right.x, bottom_right.y)
        });
        (piece, mapped)
    }))
}

/// A non-indexed triangle. Vertex UVs apply only when a texture is set.
pub fn triangle(
    renderable: &mut BatchRenderable,
    points: [TriangleVertex; 3],
    options: &PrimitiveOptions<'_>,
) -> bool {
    renderable.set_geometry(3, 0, wgpu::PrimitiveTopology::TriangleList);
    let textured = options.texture.is_some();
    for (vertex, point) in renderable.active_vertices_mut().iter_mut().zip(points) {
        let (uv, array_index) = if textured {
            (point.uv, point.array_index as f32)
        } else {
            (Vec2::ZERO, 0.0)
        };
        vertex.set(point.position, options.depth, point.color, uv, array_index);
    }
    renderable.update_bounds();
    true
}

/// A line as an oriented quad, widened along the perpendicular of its direction.
pub fn line(
    renderable: &mut BatchRenderable,
    start: Vec2,
    end: Vec2,
    color: Color,
    thickness: f32,
    options: &PrimitiveOptions<'_>,
) -> bool {
    if start == end || thickness <= 0.0 {
        return false;
    }

    let delta = end - start;
    let cross = Vec2::new(delta.y, -delta.x).normalize() * (thickness / 2.0);
    let snap = |p: Vec2| Vec2::new(ceil_px(p.x), ceil_px(p.y));
    let positions = [
        snap(start + cross),
        snap(end + cross),
        snap(start - cross),
        snap(end - cross),
    ];
    let start_depth = options.depth;
    let end_depth = options.end_depth.unwrap_or(start_depth);
    let depths = [start_depth, end_depth, start_depth, end_depth];

    let bounds = Rect::bounding(positions);
    let uvs = match (options.texture, options.texture_region) {
        (None, _) => UNIT_UVS,
        (Some(_), Some(region)) if bounds.is_empty() => [region.top_left(); 4],
        _ => positions.map(|p| options.uv(p, &bounds)),
    };

    let array_index = options.array_index();
    renderable.set_geometry(4, 6, wgpu::PrimitiveTopology::TriangleList);
    for (i, vertex) in renderable.active_vertices_mut().iter_mut().enumerate() {
        vertex.set(positions[i], depths[i], color, uvs[i], array_index);
    }
    renderable.bounds = bounds;
    true
}

/// How a ring of samples is turned into strip vertices.
#[derive(Debug, Clone, Copy)]
enum RingStyle {
    /// Edge and centre per sample.
    Filled,
    /// Outer and inner point per sample, `thickness` apart.
    Outline { thickness: f32 },
}

/// Sample `segments + 1` points clockwise from `start` over `sweep` radians.
#[allow(clippy::too_many_arguments)]
fn ring(
    renderable: &mut BatchRenderable,
    region: Rect<f32>,
    color: Color,
    start: f32,
    sweep: f32,
    segments: u32,
    style: RingStyle,
    options: &PrimitiveOptions<'_>,
) {
    profile_function!();
    let center = region.center();
    let radius = Vec2::new(region.width * 0.5, region.height * 0.5);
    let array_index = options.array_index();
    let depth = options.depth;

    let count = (segments as usize) * 2 + 2;
    renderable.set_geometry(count, 0, wgpu::PrimitiveTopology::TriangleStrip);
    let vertices = renderable.active_vertices_mut();

    match style {
        RingStyle::Filled => {
            let center_uv = options.uv(center, &region);
            for (i, pair) in vertices.chunks_exact_mut(2).enumerate() {
                let angle = i as f32 / segments as f32 * sweep + start;
                let (sin, cos) = angle.sin_cos();
                let point = Vec2::new(sin * radius.x, cos * radius.y) + center;
                pair[0].set(point, depth, color, options.uv(point, &region), array_index);
                pair[1].set(center, depth, color, center_uv, array_index);
            }
        }
        RingStyle::Outline { thickness } => {
            let half = thickness * 0.5;
            let outer_radius = radius + half;
            let inner_radius = radius - half;
            let scale_region = region.inflate(half, half);
            for (i, pair) in vertices.chunks_exact_mut(2).enumerate() {
                let angle = i as f32 / segments as f32 * sweep + start;
                let direction = Vec2::new(angle.sin(), angle.cos());
                let outer = direction * outer_radius + center;
                let inner = direction * inner_radius + center;
                pair[0].set(outer, depth, color, options.uv(outer, &scale_region), array_index);
                pair[1].set(inner, depth, color, options.uv(inner, &scale_region), array_index);
            }
        }
    }
    renderable.update_bounds();
}

/// A solid ellipse inscribed in `region`.
pub fn filled_ellipse(
    renderable: &mut BatchRenderable,
    region: Rect<f32>,
    color: Color,
    smoothness: f32,
    options: &PrimitiveOptions<'_>,
) -> bool {
    let segments = ellipse_segments(smoothness);
    if segments == 0 || region.is_empty() {
        return false;
    }
    ring(
        renderable,
        region,
        color,
        0.0,
        TAU,
        segments,
        RingStyle::Filled,
        options,
    );
    true
}

/// An ellipse outline of `thickness` centred on the edge of `region`.
pub fn ellipse(
    renderable: &mut BatchRenderable,
    region: Rect<f32>,
    color: Color,
    smoothness: f32,
    thickness: f32,
    options: &PrimitiveOptions<'_>,
) -> bool {
    let segments = ellipse_segments(smoothness);
    if segments == 0 || thickness <= 0.0 || region.is_empty() {
        return false;
    }
    ring(
        renderable,
        region,
        color,
        0.0,
        TAU,
        segments,
        RingStyle::Outline { thickness },
        options,
    );
    true
}

/// A solid wedge from `start_degrees` to `end_degrees`.
pub fn filled_arc(
    renderable: &mut BatchRenderable,
    region: Rect<f32>,
    color: Color,
    start_degrees: f32,
    end_degrees: f32,
    smoothness: f32,
    options: &PrimitiveOptions<'_>,
) -> bool {
    let segments = arc_segments(smoothness, start_degrees, end_degrees);
    if segments == 0 || region.is_empty() {
        return false;
    }
    let start = wrap_degrees(start_degrees).to_radians();
    let sweep = wedge_ratio(start_degrees, end_degrees) * TAU;
    ring(
        renderable,
        region,
        color,
        start,
        sweep,
        segments,
        RingStyle::Filled,
        options,
    );
    true
}

/// An arc outline from `start_degrees` to `end_degrees`.
#[allow(clippy::too_many_arguments)]
pub fn arc(
    renderable: &mut BatchRenderable,
    region: Rect<f32>,
    color: Color,
    start_degrees: f32,
    end_degrees: f32,
    smoothness: f32,
    thickness: f32,
    options: &PrimitiveOptions<'_>,
) -> bool {
    let segments = arc_segments(smoothness, start_degrees, end_degrees);
    if segments == 0 || thickness <= 0.0 || region.is_empty() {
        return false;
    }
    let start = wrap_degrees(start_degrees).to_radians();
    let sweep = wedge_ratio(start_degrees, end_degrees) * TAU;
    ring(
        renderable,
        region,
        color,
        start,
        sweep,
        segments,
        RingStyle::Outline { thickness },
        options,
    );
    true
}
