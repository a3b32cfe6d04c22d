//! Pipeline state for a session: shader stages, blend, depth and raster.
//!
//! Callers pass a partial [`BatchState`] to `begin`; every unset piece is
//! filled from the renderer defaults to produce the [`ActiveBatchState`].

use tessera_device::{
    DepthStencilDesc, GpuBuffer, GpuShaderModule, MAX_CONSTANT_BUFFERS, ResourceId, ShaderBinding,
};

use crate::blend::BlendMode;
use crate::color::Color;

/// A shader plus constant-buffer slots. `None` slots are filled from defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderState {
    pub shader: Option<GpuShaderModule>,
    pub constant_buffers: [Option<GpuBuffer>; MAX_CONSTANT_BUFFERS],
}

impl ShaderState {
    pub fn new(shader: GpuShaderModule) -> Self {
        Self {
            shader: Some(shader),
            ..Default::default()
        }
    }

    /// Bind `buffer` at `slot`. Slots past the last are ignored.
    pub fn with_constant_buffer(mut self, slot: usize, buffer: GpuBuffer) -> Self {
        if let Some(entry) = self.constant_buffers.get_mut(slot) {
            *entry = Some(buffer);
        }
        self
    }

    /// Fill every unset slot (and an unset shader) from `defaults`.
    pub fn merged_with(&self, defaults: &ShaderState) -> ShaderState {
        let mut merged = self.clone();
        if merged.shader.is_none() {
            merged.shader = defaults.shader.clone();
        }
        for (slot, default) in merged
            .constant_buffers
            .iter_mut()
            .zip(defaults.constant_buffers.iter())
        {
            if slot.is_none() {
                *slot = default.clone();
            }
        }
        merged
    }

    pub fn shader_id(&self) -> Option<ResourceId> {
        self.shader.as_ref().map(GpuShaderModule::id)
    }

    pub fn to_binding(&self) -> ShaderBinding {
        ShaderBinding {
            shader: self.shader.clone(),
            constant_buffers: self.constant_buffers.clone(),
        }
    }

    fn fingerprint(&self) -> StageFingerprint {
        StageFingerprint {
            shader: self.shader_id(),
            constant_buffers: std::array::from_fn(|i| {
                self.constant_buffers[i].as_ref().map(GpuBuffer::id)
            }),
        }
    }
}

/// Depth/stencil presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthStencilMode {
    /// No depth or stencil testing. The 2D default.
    #[default]
    Disabled,
    /// Test against depth without writing it.
    DepthRead,
    /// Test and write depth (`LessEqual`).
    DepthReadWrite,
    /// Draw only where the stencil equals the reference value.
    StencilEqual,
}

impl DepthStencilMode {
    pub fn to_desc(self) -> Option<DepthStencilDesc> {
        use wgpu::{CompareFunction, StencilFaceState, StencilState};

        let depth = |write| DepthStencilDesc {
            depth_write_enabled: write,
            depth_compare: CompareFunction::LessEqual,
            stencil: StencilState::default(),
        };
        match self {
            DepthStencilMode::Disabled => None,
            DepthStencilMode::DepthRead => Some(depth(false)),
            DepthStencilMode::DepthReadWrite => Some(depth(true)),
            DepthStencilMode::StencilEqual => {
                let face = StencilFaceState {
                    compare: CompareFunction::Equal,
                    ..StencilFaceState::IGNORE
                };
                Some(DepthStencilDesc {
                    depth_write_enabled: false,
                    depth_compare: CompareFunction::Always,
                    stencil: StencilState {
                        front: face,
                        back: face,
                        read_mask: 0xFF,
                        write_mask: 0,
                    },
                })
            }
        }
    }
}

/// Rasterizer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterState {
    pub cull_mode: Option<wgpu::Face>,
    pub polygon_mode: wgpu::PolygonMode,
    pub front_face: wgpu::FrontFace,
}

impl Default for RasterState {
    fn default() -> Self {
        Self {
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            front_face: wgpu::FrontFace::Ccw,
        }
    }
}

impl RasterState {
    pub const WIREFRAME: Self = Self {
        cull_mode: None,
        polygon_mode: wgpu::PolygonMode::Line,
        front_face: wgpu::FrontFace::Ccw,
    };

    pub fn to_primitive(self, topology: wgpu::PrimitiveTopology) -> wgpu::PrimitiveState {
        wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: self.front_face,
            cull_mode: self.cull_mode,
            unclipped_depth: false,
            polygon_mode: self.polygon_mode,
            conservative: false,
        }
    }
}

/// Caller-supplied partial state for a session.
///
/// ```
/// use tessera_render::{BatchState, BlendMode};
///
/// let additive = BatchState::default().with_blend(BlendMode::Additive);
/// assert!(additive.vertex_shader.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchState {
    pub vertex_shader: Option<ShaderState>,
    pub pixel_shader: Option<ShaderState>,
    pub blend: Option<BlendMode>,
    pub depth_stencil: Option<DepthStencilMode>,
    pub raster: Option<RasterState>,
    pub blend_factor: Option<Color>,
    pub sample_mask: Option<u32>,
    pub stencil_reference: Option<u32>,
}

impl BatchState {
    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = Some(blend);
        self
    }

    pub fn with_vertex_shader(mut self, state: ShaderState) -> Self {
        self.vertex_shader = Some(state);
        self
    }

    pub fn with_pixel_shader(mut self, state: ShaderState) -> Self {
        self.pixel_shader = Some(state);
        self
    }

    pub fn with_depth_stencil(mut self, mode: DepthStencilMode) -> Self {
        self.depth_stencil = Some(mode);
        self
    }

    pub fn with_raster(mut self, raster: RasterState) -> Self {
        self.raster = Some(raster);
        self
    }

    pub fn with_blend_factor(mut self, factor: Color) -> Self {
        self.blend_factor = Some(factor);
        self
    }

    pub fn with_stencil_reference(mut self, reference: u32) -> Self {
        self.stencil_reference = Some(reference);
        self
    }
}

/// The fully resolved state for the active session.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveBatchState {
    pub vertex_stage: ShaderState,
    pub pixel_stage: ShaderState,
    pub blend: BlendMode,
    pub depth_stencil: DepthStencilMode,
    pub raster: RasterState,
    pub blend_factor: Color,
    pub sample_mask: u32,
    pub stencil_reference: u32,
}

impl ActiveBatchState {
    /// Merge a partial state with the default sprite stages.
    pub fn resolve(
        partial: Option<&BatchState>,
        default_vertex: &ShaderState,
        default_pixel: &ShaderState,
    ) -> Self {
        let stage = |custom: Option<&ShaderState>, default: &ShaderState| match custom {
            Some(custom) => custom.merged_with(default),
            None => default.clone(),
        };

        Self {
            vertex_stage: stage(partial.and_then(|s| s.vertex_shader.as_ref()), default_vertex),
            pixel_stage: stage(partial.and_then(|s| s.pixel_shader.as_ref()), default_pixel),
            blend: partial.and_then(|s| s.blend).unwrap_or_default(),
            depth_stencil: partial.and_then(|s| s.depth_stencil).unwrap_or_default(),
            raster: partial.and_then(|s| s.raster).unwrap_or_default(),
            blend_factor: partial.and_then(|s| s.blend_factor).unwrap_or(Color::WHITE),
            sample_mask: partial.and_then(|s| s.sample_mask).unwrap_or(u32::MAX),
            stencil_reference: partial.and_then(|s| s.stencil_reference).unwrap_or(0),
        }
    }

    pub fn fingerprint(&self) -> StateFingerprint {
        StateFingerprint {
            vertex: self.vertex_stage.fingerprint(),
            pixel: self.pixel_stage.fingerprint(),
            blend: self.blend,
            depth_stencil: self.depth_stencil,
            raster: self.raster,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct StageFingerprint {
    shader: Option<ResourceId>,
    constant_buffers: [Option<ResourceId>; MAX_CONSTANT_BUFFERS],
}

/// Hashable identity of everything in an [`ActiveBatchState`] baked into a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateFingerprint {
    vertex: StageFingerprint,
    pixel: StageFingerprint,
    blend: BlendMode,
    depth_stencil: DepthStencilMode,
    raster: RasterState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_device::ShaderStage;

    fn buffer(id: u64) -> GpuBuffer {
        GpuBuffer::new(ResourceId::new(id), 16, wgpu::BufferUsages::UNIFORM)
    }

    fn shader(id: u64) -> GpuShaderModule {
        GpuShaderModule::new(ResourceId::new(id), ShaderStage::Fragment, "fs_main")
    }

    #[test]
    fn test_partial_shader_state_keeps_custom_slots() {
        let defaults = ShaderState::new(shader(1))
            .with_constant_buffer(0, buffer(10))
            .with_constant_buffer(1, buffer(11));
        let custom = ShaderState::new(shader(2)).with_constant_buffer(1, buffer(20));

        let merged = custom.merged_with(&defaults);
        assert_eq!(merged.shader_id(), Some(ResourceId::new(2)));
        assert_eq!(merged.constant_buffers[0], Some(buffer(10)));
        assert_eq!(merged.constant_buffers[1], Some(buffer(20)));
        assert_eq!(merged.constant_buffers[2], None);
    }

    #[test]
    fn test_resolve_none_equals_resolve_default() {
        let vs = ShaderState::new(shader(1)).with_constant_buffer(0, buffer(10));
        let ps = ShaderState::new(shader(2)).with_constant_buffer(0, buffer(11));
        let a = ActiveBatchState::resolve(None, &vs, &ps);
        let b = ActiveBatchState::resolve(Some(&BatchState::default()), &vs, &ps);
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.blend, BlendMode::Alpha);
        assert_eq!(a.sample_mask, u32::MAX);
    }

    #[test]
    fn test_fingerprint_tracks_blend() {
        let vs = ShaderState::new(shader(1));
        let ps = ShaderState::new(shader(2));
        let a = ActiveBatchState::resolve(None, &vs, &ps);
        let b = ActiveBatchState::resolve(
            Some(&BatchState::default().with_blend(BlendMode::Additive)),
            &vs,
            &ps,
        );
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_stencil_mode_desc() {
        assert!(DepthStencilMode::Disabled.to_desc().is_none());
        let desc = DepthStencilMode::DepthReadWrite.to_desc().unwrap();
        assert!(desc.depth_write_enabled);
    }
}
