//! The draw-call descriptor handed to [`RenderContext::submit`](crate::RenderContext::submit).

use std::sync::Arc;

use crate::gpu_types::{GpuBuffer, GpuSampler, GpuShaderModule, GpuTextureView};

/// Number of constant-buffer slots per shader stage.
pub const MAX_CONSTANT_BUFFERS: usize = 4;

/// A shader plus the constant buffers bound to its slots.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShaderBinding {
    pub shader: Option<GpuShaderModule>,
    pub constant_buffers: [Option<GpuBuffer>; MAX_CONSTANT_BUFFERS],
}

#[derive(Clone, Debug, PartialEq)]
pub struct VertexBufferBinding {
    pub buffer: GpuBuffer,
    /// Bytes between consecutive vertices.
    pub stride: u64,
}

/// Vertex attribute layout shared by every draw using the same vertex type.
#[derive(Clone, Debug, PartialEq)]
pub struct InputLayout {
    pub stride: u64,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl InputLayout {
    pub fn new(stride: u64, attributes: &[wgpu::VertexAttribute]) -> Self {
        Self {
            stride,
            attributes: attributes.to_vec(),
        }
    }

    pub fn as_wgpu(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes,
        }
    }
}

/// Depth and stencil configuration, independent of the depth target format.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DepthStencilDesc {
    pub depth_write_enabled: bool,
    pub depth_compare: wgpu::CompareFunction,
    pub stencil: wgpu::StencilState,
}

impl DepthStencilDesc {
    pub fn to_wgpu(&self, format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format,
            depth_write_enabled: self.depth_write_enabled,
            depth_compare: self.depth_compare,
            stencil: self.stencil.clone(),
            bias: wgpu::DepthBiasState::default(),
        }
    }
}

/// Which elements of the bound buffers a submission draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawRange {
    NonIndexed {
        first_vertex: u32,
        vertex_count: u32,
    },
    Indexed {
        first_index: u32,
        index_count: u32,
        base_vertex: i32,
    },
}

impl DrawRange {
    pub fn is_indexed(&self) -> bool {
        matches!(self, DrawRange::Indexed { .. })
    }

    /// Vertices (non-indexed) or indices (indexed) consumed by the draw.
    pub fn element_count(&self) -> u32 {
        match *self {
            DrawRange::NonIndexed { vertex_count, .. } => vertex_count,
            DrawRange::Indexed { index_count, .. } => index_count,
        }
    }
}

/// One GPU submission unit.
///
/// Descriptors are built once per {buffers, state} combination and reused;
/// only `range` changes between submissions.
#[derive(Clone, Debug)]
pub struct DrawCall {
    pub vertex_buffer: VertexBufferBinding,
    pub index_buffer: Option<GpuBuffer>,
    pub input_layout: Arc<InputLayout>,
    pub primitive: wgpu::PrimitiveState,
    pub blend: Option<wgpu::BlendState>,
    pub depth_stencil: Option<DepthStencilDesc>,
    pub vertex_stage: ShaderBinding,
    pub pixel_stage: ShaderBinding,
    pub texture: GpuTextureView,
    pub sampler: GpuSampler,
    pub range: DrawRange,
}

impl DrawCall {
    pub fn is_indexed(&self) -> bool {
        self.index_buffer.is_some()
    }
}
