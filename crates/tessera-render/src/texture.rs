//! Textures, samplers and the sampler cache.

use std::sync::{PoisonError, RwLock};

use glam::Vec2;
use tessera_core::alloc::HashMap;
use tessera_core::profiling::profile_function;
use tessera_device::{GpuSampler, GpuTexture, GpuTextureView, RenderContext, ResourceId};

use crate::error::RenderResult;

/// A sampled 2D (or 2D array) texture as seen by the renderer.
///
/// Batching compares textures by the id of their view.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Texture2D {
    view: GpuTextureView,
}

impl Texture2D {
    pub fn from_view(view: GpuTextureView) -> Self {
        Self { view }
    }

    /// Create a view over `texture` and wrap it.
    ///
    /// Fails with [`RenderError::DeviceCapability`](crate::RenderError::DeviceCapability)
    /// when the device cannot create that view.
    pub fn from_texture(
        ctx: &dyn RenderContext,
        texture: &GpuTexture,
        dimension: wgpu::TextureViewDimension,
    ) -> RenderResult<Self> {
        let view = ctx.create_texture_view(
            texture,
            &wgpu::TextureViewDescriptor {
                label: None,
                dimension: Some(dimension),
                ..Default::default()
            },
        )?;
        Ok(Self { view })
    }

    /// Create and fill a 2D RGBA8 texture.
    pub fn from_rgba8(
        ctx: &dyn RenderContext,
        label: &str,
        width: u32,
        height: u32,
        texels: &[u8],
    ) -> RenderResult<Self> {
        profile_function!();
        let texture = ctx.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        ctx.write_texture(&texture, texels);
        Self::from_texture(ctx, &texture, wgpu::TextureViewDimension::D2)
    }

    /// A 2x2 texture filled with one color.
    pub(crate) fn solid(ctx: &dyn RenderContext, label: &str, rgba: [u8; 4]) -> RenderResult<Self> {
        Self::from_rgba8(ctx, label, 2, 2, &rgba.repeat(4))
    }

    pub fn id(&self) -> ResourceId {
        self.view.id()
    }

    pub fn view(&self) -> &GpuTextureView {
        &self.view
    }

    pub fn width(&self) -> u32 {
        self.view.width()
    }

    pub fn height(&self) -> u32 {
        self.view.height()
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.view.width() as f32, self.view.height() as f32)
    }

    pub fn array_layers(&self) -> u32 {
        self.view.array_layers()
    }

    /// Pixel position to normalized texture coordinates.
    pub fn to_uv(&self, pixel: Vec2) -> Vec2 {
        pixel / self.size().max(Vec2::ONE)
    }
}

/// Common sampler configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SamplerPreset {
    /// Repeat addressing with linear filtering. The renderer's default.
    #[default]
    Wrapping,
    /// Clamp addressing with linear filtering.
    Clamped,
    /// Clamp addressing with point filtering, for pixel art.
    PointClamped,
    /// Repeat addressing with point filtering.
    PointWrapping,
    Mirrored,
}

/// Hashable sampler description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerKey {
    pub address_mode: wgpu::AddressMode,
    pub filter: wgpu::FilterMode,
}

impl From<SamplerPreset> for SamplerKey {
    fn from(preset: SamplerPreset) -> Self {
        use wgpu::{AddressMode, FilterMode};
        let (address_mode, filter) = match preset {
            SamplerPreset::Wrapping => (AddressMode::Repeat, FilterMode::Linear),
            SamplerPreset::Clamped => (AddressMode::ClampToEdge, FilterMode::Linear),
            SamplerPreset::PointClamped => (AddressMode::ClampToEdge, FilterMode::Nearest),
            SamplerPreset::PointWrapping => (AddressMode::Repeat, FilterMode::Nearest),
            SamplerPreset::Mirrored => (AddressMode::MirrorRepeat, FilterMode::Linear),
        };
        Self {
            address_mode,
            filter,
        }
    }
}

impl SamplerKey {
    pub fn to_descriptor<'a>(&self, label: Option<&'a str>) -> wgpu::SamplerDescriptor<'a> {
        wgpu::SamplerDescriptor {
            label,
            address_mode_u: self.address_mode,
            address_mode_v: self.address_mode,
            address_mode_w: self.address_mode,
            mag_filter: self.filter,
            min_filter: self.filter,
            mipmap_filter: self.filter,
            ..Default::default()
        }
    }
}

/// Reuses samplers with identical keys.
#[derive(Default)]
pub struct SamplerCache {
    cache: RwLock<HashMap<SamplerKey, GpuSampler>>,
}

impl SamplerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached sampler for `key`, created on first use.
    pub fn get_or_create(&self, ctx: &dyn RenderContext, key: SamplerKey) -> GpuSampler {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(sampler) = cache.get(&key) {
                return sampler.clone();
            }
        }

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have inserted it while we waited for the write lock.
        if let Some(sampler) = cache.get(&key) {
            return sampler.clone();
        }
        tracing::trace!(?key, "creating sampler");
        let sampler = ctx.create_sampler(&key.to_descriptor(Some("tessera sampler")));
        cache.insert(key, sampler.clone());
        sampler
    }

    pub fn len(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cache.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
