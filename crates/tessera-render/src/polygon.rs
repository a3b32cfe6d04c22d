//! Polygon meshes drawn outside the shared batch.
//!
//! A [`PolygonSprite`] owns its vertex and index buffers. Drawing one flushes
//! the pending batch, swaps the default sprite stages for the polygon stages,
//! uploads the per-draw [`PolygonData`] and submits the mesh on its own.

use glam::{Mat4, Quat, Vec2, Vec3};
use tessera_core::geometry::Rect;
use tessera_core::profiling::profile_function;
use tessera_device::{GpuBuffer, GpuSampler, RenderContext};

use crate::batch::{DefaultStages, ImmediateDraw};
use crate::color::Color;
use crate::constants::PolygonData;
use crate::error::{RenderError, RenderResult};
use crate::renderable::{AlphaTestData, AlphaTestRange};
use crate::state::{ActiveBatchState, ShaderState};
use crate::texture::Texture2D;
use crate::vertex::Vertex2D;

/// One mesh vertex in local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonVertex {
    pub position: Vec2,
    pub color: Color,
    pub uv: Vec2,
}

impl PolygonVertex {
    pub fn new(position: Vec2, color: Color, uv: Vec2) -> Self {
        Self {
            position,
            color,
            uv,
        }
    }
}

/// Collects mesh data and uploads it into a [`PolygonSprite`].
///
/// ```
/// use glam::Vec2;
/// use tessera_render::{Color, PolygonBuilder, PolygonVertex};
///
/// let builder = PolygonBuilder::new()
///     .with_vertices([
///         PolygonVertex::new(Vec2::ZERO, Color::WHITE, Vec2::ZERO),
///         PolygonVertex::new(Vec2::new(10.0, 0.0), Color::WHITE, Vec2::X),
///         PolygonVertex::new(Vec2::new(0.0, 10.0), Color::WHITE, Vec2::Y),
///     ])
///     .with_indices([0, 1, 2]);
/// assert_eq!(builder.vertex_count(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PolygonBuilder {
    vertices: Vec<PolygonVertex>,
    indices: Vec<u32>,
}

impl PolygonBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vertices(mut self, vertices: impl IntoIterator<Item = PolygonVertex>) -> Self {
        self.vertices.extend(vertices);
        self
    }

    pub fn with_indices(mut self, indices: impl IntoIterator<Item = u32>) -> Self {
        self.indices.extend(indices);
        self
    }

    pub fn add_vertex(&mut self, vertex: PolygonVertex) -> &mut Self {
        self.vertices.push(vertex);
        self
    }

    pub fn add_index(&mut self, index: u32) -> &mut Self {
        self.indices.push(index);
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Validate the mesh and upload it into new device buffers.
    pub fn build(&self, ctx: &dyn RenderContext) -> RenderResult<PolygonSprite> {
        profile_function!();
        if self.vertices.len() < 3 {
            return Err(RenderError::InvalidArgument(format!(
                "a polygon needs at least 3 vertices, got {}",
                self.vertices.len()
            )));
        }
        if self.indices.len() < 3 {
            return Err(RenderError::InvalidArgument(format!(
                "a polygon needs at least 3 indices, got {}",
                self.indices.len()
            )));
        }
        if let Some(index) = self
            .indices
            .iter()
            .find(|&&index| index as usize >= self.vertices.len())
        {
            return Err(RenderError::InvalidArgument(format!(
                "polygon index {} is out of range for {} vertices",
                index,
                self.vertices.len()
            )));
        }

        let vertices: Vec<Vertex2D> = self
            .vertices
            .iter()
            .map(|v| Vertex2D::new(v.position, 0.0, v.color, v.uv, 0.0))
            .collect();
        let vertex_bytes: &[u8] = bytemuck::cast_slice(&vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(&self.indices);

        let vertex_buffer = ctx.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tessera polygon vertices"),
            size: vertex_bytes.len() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        ctx.write_buffer(&vertex_buffer, 0, vertex_bytes);
        let index_buffer = ctx.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tessera polygon indices"),
            size: index_bytes.len() as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        ctx.write_buffer(&index_buffer, 0, index_bytes);

        Ok(PolygonSprite {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
            local_bounds: Rect::bounding(self.vertices.iter().map(|v| v.position)),
            position: Vec2::ZERO,
            anchor: Vec2::ZERO,
            scale: Vec2::ONE,
            angle: 0.0,
            depth: 0.0,
            color: Color::WHITE,
            texture: None,
            sampler: None,
            array_index: 0,
            texture_transform: Rect::new(0.0, 0.0, 1.0, 1.0),
            flip_horizontal: false,
            flip_vertical: false,
            alpha_test: Some(AlphaTestRange::TRANSPARENT),
        })
    }
}

/// An uploaded triangle-list mesh plus its transform and material.
#[derive(Debug, Clone)]
pub struct PolygonSprite {
    vertex_buffer: GpuBuffer,
    index_buffer: GpuBuffer,
    index_count: u32,
    local_bounds: Rect<f32>,
    position: Vec2,
    anchor: Vec2,
    scale: Vec2,
    /// Degrees.
    angle: f32,
    depth: f32,
    color: Color,
    texture: Option<Texture2D>,
    sampler: Option<GpuSampler>,
    array_index: u32,
    /// Offset and scale applied to mesh UVs.
    texture_transform: Rect<f32>,
    flip_horizontal: bool,
    flip_vertical: bool,
    alpha_test: Option<AlphaTestRange>,
}

impl PolygonSprite {
    pub fn vertex_buffer(&self) -> &GpuBuffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &GpuBuffer {
        &self.index_buffer
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn set_anchor(&mut self, anchor: Vec2) {
        self.anchor = anchor;
    }

    pub fn set_scale(&mut self, scale: Vec2) {
        self.scale = scale;
    }

    pub fn set_angle(&mut self, degrees: f32) {
        self.angle = degrees;
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth;
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn set_texture(&mut self, texture: Option<Texture2D>) {
        self.texture = texture;
    }

    pub fn set_sampler(&mut self, sampler: Option<GpuSampler>) {
        self.sampler = sampler;
    }

    pub fn set_texture_array_index(&mut self, index: u32) {
        self.array_index = index;
    }

    pub fn texture_transform(&self) -> Rect<f32> {
        self.texture_transform
    }

    /// UV offset in `x`/`y` and UV scale in `width`/`height`.
    pub fn set_texture_transform(&mut self, transform: Rect<f32>) {
        self.texture_transform = transform;
    }

    pub fn set_flip_horizontal(&mut self, flip: bool) {
        self.flip_horizontal = flip;
    }

    pub fn set_flip_vertical(&mut self, flip: bool) {
        self.flip_vertical = flip;
    }

    pub fn set_alpha_test(&mut self, range: Option<AlphaTestRange>) {
        self.alpha_test = range;
    }

    /// `T(position, depth) * R(angle) * S(scale) * T(-anchor)`.
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale.extend(1.0),
            Quat::from_rotation_z(self.angle.to_radians()),
            self.position.extend(self.depth),
        ) * Mat4::from_translation(-self.anchor.extend(0.0))
    }

    /// The per-draw constant payload.
    pub fn polygon_data(&self) -> PolygonData {
        let (sin, cos) = self.angle.to_radians().sin_cos();
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        let t = self.texture_transform;
        PolygonData::new(
            self.world_matrix(),
            self.color.to_array(),
            [t.x, t.y, t.width, t.height],
            [flag(self.flip_horizontal), flag(self.flip_vertical), cos, sin],
            self.array_index as f32,
        )
    }

    /// Axis-aligned bounds of the transformed mesh.
    pub fn bounds(&self) -> Rect<f32> {
        let world = self.world_matrix();
        let b = self.local_bounds;
        Rect::bounding(
            [
                b.top_left(),
                Vec2::new(b.right(), b.top()),
                Vec2::new(b.left(), b.bottom()),
                Vec2::new(b.right(), b.bottom()),
            ]
            .map(|corner| world.transform_point3(Vec3::new(corner.x, corner.y, 0.0)).truncate()),
        )
    }

    pub(crate) fn immediate_draw(&self) -> ImmediateDraw<'_> {
        ImmediateDraw {
            vertex_buffer: &self.vertex_buffer,
            index_buffer: &self.index_buffer,
            index_count: self.index_count,
            topology: wgpu::PrimitiveTopology::TriangleList,
            texture: self.texture.as_ref(),
            sampler: self.sampler.as_ref(),
            alpha_test: AlphaTestData::from(self.alpha_test),
            polygon: self.polygon_data(),
        }
    }
}

/// Swaps the default sprite stages for the polygon stages while alive.
///
/// A stage is swapped only while it is the default sprite stage, so custom
/// shaders passed to `begin` stay in place. Dropping the guard restores the
/// previous stages.
pub(crate) struct StageOverride<'a> {
    state: &'a mut ActiveBatchState,
    vertex: Option<ShaderState>,
    pixel: Option<ShaderState>,
}

impl<'a> StageOverride<'a> {
    pub(crate) fn apply(state: &'a mut ActiveBatchState, stages: &DefaultStages) -> Self {
        let vertex = (state.vertex_stage == stages.sprite_vertex).then(|| {
            std::mem::replace(&mut state.vertex_stage, stages.polygon_vertex.clone())
        });
        let pixel = (state.pixel_stage == stages.sprite_pixel).then(|| {
            std::mem::replace(&mut state.pixel_stage, stages.polygon_pixel.clone())
        });
        Self {
            state,
            vertex,
            pixel,
        }
    }

    pub(crate) fn state(&self) -> &ActiveBatchState {
        self.state
    }
}

impl Drop for StageOverride<'_> {
    fn drop(&mut self) {
        if let Some(vertex) = self.vertex.take() {
            self.state.vertex_stage = vertex;
        }
        if let Some(pixel) = self.pixel.take() {
            self.state.pixel_stage = pixel;
        }
    }
}
