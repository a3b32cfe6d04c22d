//! GPU resource handles.
//!
//! Each handle is an id into the backend's resource storage plus the metadata
//! the renderer reads back (sizes, formats, sample counts). Equality is by id.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Backend-assigned identity of a GPU resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

macro_rules! impl_identity {
    ($ty:ty) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl Eq for $ty {}

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }
    };
}

/// A vertex, index or constant buffer.
#[derive(Clone, Debug)]
pub struct GpuBuffer {
    id: ResourceId,
    size: u64,
    usage: wgpu::BufferUsages,
}

impl GpuBuffer {
    pub fn new(id: ResourceId, size: u64, usage: wgpu::BufferUsages) -> Self {
        Self { id, size, usage }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn usage(&self) -> wgpu::BufferUsages {
        self.usage
    }
}

impl_identity!(GpuBuffer);

#[derive(Clone, Debug)]
pub struct GpuTexture {
    id: ResourceId,
    size: wgpu::Extent3d,
    format: wgpu::TextureFormat,
    sample_count: u32,
    dimension: wgpu::TextureDimension,
}

impl GpuTexture {
    pub fn new(
        id: ResourceId,
        size: wgpu::Extent3d,
        format: wgpu::TextureFormat,
        sample_count: u32,
        dimension: wgpu::TextureDimension,
    ) -> Self {
        Self {
            id,
            size,
            format,
            sample_count,
            dimension,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn array_layers(&self) -> u32 {
        self.size.depth_or_array_layers
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn dimension(&self) -> wgpu::TextureDimension {
        self.dimension
    }
}

impl_identity!(GpuTexture);

/// A shader-visible view of a texture.
#[derive(Clone, Debug)]
pub struct GpuTextureView {
    id: ResourceId,
    texture: ResourceId,
    width: u32,
    height: u32,
    array_layers: u32,
    format: wgpu::TextureFormat,
    dimension: wgpu::TextureViewDimension,
}

impl GpuTextureView {
    pub fn new(
        id: ResourceId,
        texture: &GpuTexture,
        format: wgpu::TextureFormat,
        dimension: wgpu::TextureViewDimension,
    ) -> Self {
        Self {
            id,
            texture: texture.id(),
            width: texture.width(),
            height: texture.height(),
            array_layers: texture.array_layers(),
            format,
            dimension,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Id of the texture this view was created from.
    pub fn texture_id(&self) -> ResourceId {
        self.texture
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn array_layers(&self) -> u32 {
        self.array_layers
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn dimension(&self) -> wgpu::TextureViewDimension {
        self.dimension
    }
}

impl_identity!(GpuTextureView);

#[derive(Clone, Debug)]
pub struct GpuSampler {
    id: ResourceId,
    address_mode: wgpu::AddressMode,
    filter: wgpu::FilterMode,
}

impl GpuSampler {
    pub fn new(id: ResourceId, address_mode: wgpu::AddressMode, filter: wgpu::FilterMode) -> Self {
        Self {
            id,
            address_mode,
            filter,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn address_mode(&self) -> wgpu::AddressMode {
        self.address_mode
    }

    pub fn filter(&self) -> wgpu::FilterMode {
        self.filter
    }
}

impl_identity!(GpuSampler);

/// Pipeline stage a shader module targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Source for [`RenderContext::create_shader_module`](crate::RenderContext::create_shader_module).
#[derive(Debug, Clone, Copy)]
pub struct ShaderSource<'a> {
    pub label: Option<&'a str>,
    pub wgsl: &'a str,
    pub entry_point: &'a str,
    pub stage: ShaderStage,
}

/// A compiled shader entry point.
#[derive(Clone, Debug)]
pub struct GpuShaderModule {
    id: ResourceId,
    stage: ShaderStage,
    entry_point: Arc<str>,
}

impl GpuShaderModule {
    pub fn new(id: ResourceId, stage: ShaderStage, entry_point: &str) -> Self {
        Self {
            id,
            stage,
            entry_point: Arc::from(entry_point),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }
}

impl_identity!(GpuShaderModule);

/// Pixel rectangle and depth range the rasterizer maps clip space onto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn from_size(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// The currently bound viewport, render target and depth target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetInfo {
    pub viewport: Viewport,
    pub target_width: u32,
    pub target_height: u32,
    pub target_format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
}

impl TargetInfo {
    pub fn new(width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            viewport: Viewport::from_size(width, height),
            target_width: width,
            target_height: height,
            target_format: format,
            depth_format: None,
        }
    }

    pub fn with_depth(mut self, format: wgpu::TextureFormat) -> Self {
        self.depth_format = Some(format);
        self
    }

    pub fn has_depth(&self) -> bool {
        self.depth_format.is_some()
    }
}
