//! Change-tracked constant buffers.
//!
//! Every payload remembers the last value written to the device and skips
//! the upload when the new value compares equal.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2};
use tessera_device::{GpuBuffer, RenderContext, TargetInfo};

use crate::camera::Camera2D;
use crate::renderable::AlphaTestData;

/// A constant buffer holding one `T`, uploaded only when the value changes.
#[derive(Debug)]
pub struct ConstantBuffer<T> {
    buffer: GpuBuffer,
    last: T,
    uploads: u64,
}

impl<T: Pod + PartialEq> ConstantBuffer<T> {
    pub fn new(ctx: &dyn RenderContext, label: &str, initial: T) -> Self {
        let buffer = ctx.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<T>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        ctx.write_buffer(&buffer, 0, bytemuck::bytes_of(&initial));
        Self {
            buffer,
            last: initial,
            uploads: 1,
        }
    }

    /// Upload `value` if it differs from the last upload. Returns whether it did.
    pub fn set(&mut self, ctx: &dyn RenderContext, value: T) -> bool {
        if self.last == value {
            return false;
        }
        ctx.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&value));
        self.last = value;
        self.uploads += 1;
        true
    }

    pub fn buffer(&self) -> &GpuBuffer {
        &self.buffer
    }

    pub fn value(&self) -> &T {
        &self.last
    }

    pub fn uploads(&self) -> u64 {
        self.uploads
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraData {
    pub view_projection: [[f32; 4]; 4],
}

/// Viewport and render-target metadata.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ViewportData {
    /// `(x, y, width, height)` in pixels.
    pub viewport: [f32; 4],
    pub target_size: [f32; 2],
    pub depth_range: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TimingData {
    pub elapsed: f32,
    pub delta: f32,
    pub frame: u32,
    _padding: u32,
}

impl TimingData {
    pub fn new(elapsed: f32, delta: f32, frame: u32) -> Self {
        Self {
            elapsed,
            delta,
            frame,
            _padding: 0,
        }
    }
}

/// Per-draw payload for polygon meshes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PolygonData {
    pub world: [[f32; 4]; 4],
    pub color: [f32; 4],
    /// `(offset x, offset y, scale x, scale y)`.
    pub texture_transform: [f32; 4],
    /// `(horizontal flip, vertical flip, cos, sin)`.
    pub misc: [f32; 4],
    pub array_index: f32,
    _padding: [f32; 3],
}

impl PolygonData {
    pub fn new(
        world: Mat4,
        color: [f32; 4],
        texture_transform: [f32; 4],
        misc: [f32; 4],
        array_index: f32,
    ) -> Self {
        Self {
            world: world.to_cols_array_2d(),
            color,
            texture_transform,
            misc,
            array_index,
            _padding: [0.0; 3],
        }
    }
}

impl Default for PolygonData {
    fn default() -> Self {
        Self::new(
            Mat4::IDENTITY,
            [1.0; 4],
            [0.0, 0.0, 1.0, 1.0],
            [0.0, 0.0, 1.0, 0.0],
            0.0,
        )
    }
}

/// Owns the renderer's constant buffers.
#[derive(Debug)]
pub struct ConstantDataManager {
    alpha_test: ConstantBuffer<AlphaTestData>,
    camera: ConstantBuffer<CameraData>,
    viewport: ConstantBuffer<ViewportData>,
    timing: ConstantBuffer<TimingData>,
    polygon: ConstantBuffer<PolygonData>,
    pending_timing: Option<TimingData>,
}

impl ConstantDataManager {
    pub fn new(ctx: &dyn RenderContext) -> Self {
        Self {
            alpha_test: ConstantBuffer::new(
                ctx,
                "tessera alpha test",
                AlphaTestData::new(true, 0.0, 0.0),
            ),
            camera: ConstantBuffer::new(
                ctx,
                "tessera camera",
                CameraData {
                    view_projection: Mat4::IDENTITY.to_cols_array_2d(),
                },
            ),
            viewport: ConstantBuffer::new(ctx, "tessera viewport", ViewportData::zeroed()),
            timing: ConstantBuffer::new(ctx, "tessera timing", TimingData::zeroed()),
            polygon: ConstantBuffer::new(ctx, "tessera polygon data", PolygonData::default()),
            pending_timing: None,
        }
    }

    pub fn alpha_test(&self) -> &ConstantBuffer<AlphaTestData> {
        &self.alpha_test
    }

    pub fn camera(&self) -> &ConstantBuffer<CameraData> {
        &self.camera
    }

    pub fn viewport(&self) -> &ConstantBuffer<ViewportData> {
        &self.viewport
    }

    pub fn timing(&self) -> &ConstantBuffer<TimingData> {
        &self.timing
    }

    pub fn polygon(&self) -> &ConstantBuffer<PolygonData> {
        &self.polygon
    }

    pub fn update_alpha_test(&mut self, ctx: &dyn RenderContext, data: AlphaTestData) -> bool {
        self.alpha_test.set(ctx, data)
    }

    pub fn update_polygon(&mut self, ctx: &dyn RenderContext, data: PolygonData) -> bool {
        self.polygon.set(ctx, data)
    }

    /// Refresh camera and viewport payloads for the current target.
    pub fn update_target(&mut self, ctx: &dyn RenderContext, camera: &Camera2D, target: &TargetInfo) {
        let vp = target.viewport;
        let size = Vec2::new(vp.width, vp.height);
        self.camera.set(
            ctx,
            CameraData {
                view_projection: camera.view_projection(size).to_cols_array_2d(),
            },
        );
        self.viewport.set(
            ctx,
            ViewportData {
                viewport: [vp.x, vp.y, vp.width, vp.height],
                target_size: [target.target_width as f32, target.target_height as f32],
                depth_range: [vp.min_depth, vp.max_depth],
            },
        );
    }

    /// Stage a timing value; it is uploaded by the next [`resolve`](Self::resolve).
    pub fn set_timing(&mut self, timing: TimingData) {
        self.pending_timing = Some(timing);
    }

    /// Upload staged payloads that changed since their last upload.
    pub fn resolve(&mut self, ctx: &dyn RenderContext) {
        if let Some(timing) = self.pending_timing.take() {
            self.timing.set(ctx, timing);
        }
    }
}
