//! Trait abstracting the GPU device.

use crate::draw::DrawCall;
use crate::error::{DeviceError, DeviceResult};
use crate::gpu_types::*;
use wgpu::{BufferDescriptor, SamplerDescriptor, TextureDescriptor, TextureViewDescriptor};

/// GPU operations the 2D renderer depends on.
///
/// All methods take `&self` and return owned handles, so one context can be
/// shared behind an `Arc` and mocked with interior mutability.
///
/// # Ordering
///
/// Buffer writes issued before a [`submit`](RenderContext::submit) must be
/// visible to that submission, and submissions execute in call order.
pub trait RenderContext: Send + Sync {
    /// Create a buffer.
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer;

    /// Upload `data` at `offset` bytes into `buffer`.
    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]);

    fn create_texture(&self, desc: &TextureDescriptor) -> GpuTexture;

    /// Upload tightly packed texel data covering the whole first mip level.
    fn write_texture(&self, texture: &GpuTexture, data: &[u8]);

    /// Create a view over `texture`.
    ///
    /// Fails with [`DeviceError::Unsupported`] when the device cannot provide
    /// the requested view, e.g. a cube view of a multisampled texture.
    fn create_texture_view(
        &self,
        texture: &GpuTexture,
        desc: &TextureViewDescriptor,
    ) -> DeviceResult<GpuTextureView>;

    fn create_sampler(&self, desc: &SamplerDescriptor) -> GpuSampler;

    /// Compile one shader entry point.
    fn create_shader_module(&self, source: &ShaderSource) -> DeviceResult<GpuShaderModule>;

    /// The currently bound viewport, render target and depth target.
    fn target_info(&self) -> TargetInfo;

    /// Queue a draw. Never blocks on the GPU.
    fn submit(
        &self,
        draw_call: &DrawCall,
        blend_factor: [f32; 4],
        sample_mask: u32,
        stencil_reference: u32,
    );
}

/// Check a view request against rules every backend shares.
pub fn validate_texture_view(
    texture: &GpuTexture,
    desc: &TextureViewDescriptor,
) -> DeviceResult<()> {
    let dimension = desc.dimension.unwrap_or(match texture.dimension() {
        wgpu::TextureDimension::D1 => wgpu::TextureViewDimension::D1,
        wgpu::TextureDimension::D2 if texture.array_layers() > 1 => {
            wgpu::TextureViewDimension::D2Array
        }
        wgpu::TextureDimension::D2 => wgpu::TextureViewDimension::D2,
        wgpu::TextureDimension::D3 => wgpu::TextureViewDimension::D3,
    });

    let is_cube = matches!(
        dimension,
        wgpu::TextureViewDimension::Cube | wgpu::TextureViewDimension::CubeArray
    );
    if is_cube && texture.sample_count() > 1 {
        return Err(DeviceError::Unsupported(format!(
            "cube view of multisampled texture {} (sample count {})",
            texture.id(),
            texture.sample_count()
        )));
    }
    if is_cube && texture.array_layers() % 6 != 0 {
        return Err(DeviceError::InvalidDescriptor(format!(
            "cube view needs a multiple of 6 layers, texture {} has {}",
            texture.id(),
            texture.array_layers()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture(layers: u32, samples: u32) -> GpuTexture {
        GpuTexture::new(
            ResourceId::new(9),
            wgpu::Extent3d {
                width: 16,
                height: 16,
                depth_or_array_layers: layers,
            },
            wgpu::TextureFormat::Rgba8Unorm,
            samples,
            wgpu::TextureDimension::D2,
        )
    }

    #[test]
    fn test_multisampled_cube_view_is_unsupported() {
        let desc = TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        };
        let result = validate_texture_view(&texture(6, 4), &desc);
        assert!(matches!(result, Err(DeviceError::Unsupported(_))));
    }

    #[test]
    fn test_single_sampled_cube_view_is_valid() {
        let desc = TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        };
        assert!(validate_texture_view(&texture(6, 1), &desc).is_ok());
    }

    #[test]
    fn test_default_view_dimension() {
        assert!(validate_texture_view(&texture(1, 4), &TextureViewDescriptor::default()).is_ok());
    }
}
