//! Per-object geometry records consumed by the batcher.

use bytemuck::{Pod, Zeroable};
use tessera_core::geometry::Rect;
use tessera_device::{GpuSampler, ResourceId};

use crate::texture::Texture2D;
use crate::vertex::Vertex2D;

/// Alpha interval whose pixels are discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlphaTestRange {
    pub min: f32,
    pub max: f32,
}

impl AlphaTestRange {
    /// Discards only fully transparent pixels.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0);

    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

/// Alpha-test constant payload, laid out for a 16-byte uniform.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AlphaTestData {
    pub enabled: u32,
    pub min: f32,
    pub max: f32,
    _padding: f32,
}

impl AlphaTestData {
    pub const DISABLED: Self = Self {
        enabled: 0,
        min: 0.0,
        max: 0.0,
        _padding: 0.0,
    };

    pub const fn new(enabled: bool, min: f32, max: f32) -> Self {
        Self {
            enabled: enabled as u32,
            min,
            max,
            _padding: 0.0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled != 0
    }
}

impl From<Option<AlphaTestRange>> for AlphaTestData {
    fn from(range: Option<AlphaTestRange>) -> Self {
        match range {
            Some(range) => Self::new(true, range.min, range.max),
            None => Self::DISABLED,
        }
    }
}

/// Value identity of the GPU state a renderable needs.
///
/// Two renderables with equal keys can share one draw submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchKey {
    pub texture: ResourceId,
    pub sampler: ResourceId,
    pub alpha_enabled: bool,
    pub alpha_min: f32,
    pub alpha_max: f32,
}

/// Mutable geometry plus the state references the batcher compares.
///
/// Vertex storage only grows; `vertex_count`/`index_count` mark the active part.
/// An index count of zero means the geometry is drawn non-indexed. Otherwise
/// the indices follow the quad pattern `0 1 2 2 1 3` per four vertices.
#[derive(Debug, Clone)]
pub struct BatchRenderable {
    pub(crate) vertices: Vec<Vertex2D>,
    pub(crate) vertex_count: usize,
    pub(crate) index_count: usize,
    pub(crate) topology: wgpu::PrimitiveTopology,
    pub(crate) texture: Option<Texture2D>,
    pub(crate) sampler: Option<GpuSampler>,
    pub(crate) alpha_test: AlphaTestData,
    pub(crate) state_changed: bool,
    pub(crate) bounds: Rect<f32>,
}

impl Default for BatchRenderable {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchRenderable {
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            vertex_count: 0,
            index_count: 0,
            topology: wgpu::PrimitiveTopology::TriangleList,
            texture: None,
            sampler: None,
            alpha_test: AlphaTestData::from(Some(AlphaTestRange::TRANSPARENT)),
            state_changed: true,
            bounds: Rect::ZERO,
        }
    }

    /// Four vertices and six indices, the shape of a sprite or glyph.
    pub(crate) fn quad() -> Self {
        let mut renderable = Self::new();
        renderable.set_geometry(4, 6, wgpu::PrimitiveTopology::TriangleList);
        renderable
    }

    /// Active vertices.
    pub fn vertices(&self) -> &[Vertex2D] {
        &self.vertices[..self.vertex_count]
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    pub fn topology(&self) -> wgpu::PrimitiveTopology {
        self.topology
    }

    pub fn texture(&self) -> Option<&Texture2D> {
        self.texture.as_ref()
    }

    pub fn sampler(&self) -> Option<&GpuSampler> {
        self.sampler.as_ref()
    }

    pub fn alpha_test(&self) -> AlphaTestData {
        self.alpha_test
    }

    pub fn state_changed(&self) -> bool {
        self.state_changed
    }

    pub fn bounds(&self) -> Rect<f32> {
        self.bounds
    }

    /// Resize the active geometry. Storage grows to at least double when short.
    pub(crate) fn set_geometry(
        &mut self,
        vertex_count: usize,
        index_count: usize,
        topology: wgpu::PrimitiveTopology,
    ) {
        if self.vertices.len() < vertex_count {
            let target = vertex_count.max(self.vertices.len() * 2);
            self.vertices.resize(target, Vertex2D::default());
        }
        self.vertex_count = vertex_count;
        self.index_count = index_count;
        self.topology = topology;
    }

    /// Append one indexed quad to the active geometry.
    pub(crate) fn push_quad(&mut self, quad: [Vertex2D; 4]) {
        let start = self.vertex_count;
        self.set_geometry(
            start + 4,
            self.index_count + 6,
            wgpu::PrimitiveTopology::TriangleList,
        );
        self.vertices[start..start + 4].copy_from_slice(&quad);
    }

    pub(crate) fn active_vertices_mut(&mut self) -> &mut [Vertex2D] {
        &mut self.vertices[..self.vertex_count]
    }

    pub(crate) fn set_texture(&mut self, texture: Option<&Texture2D>) {
        if self.texture.as_ref() != texture {
            self.texture = texture.cloned();
            self.state_changed = true;
        }
    }

    pub(crate) fn set_sampler(&mut self, sampler: Option<&GpuSampler>) {
        if self.sampler.as_ref() != sampler {
            self.sampler = sampler.cloned();
            self.state_changed = true;
        }
    }

    pub(crate) fn set_alpha_test(&mut self, alpha_test: AlphaTestData) {
        if self.alpha_test != alpha_test {
            self.alpha_test = alpha_test;
            self.state_changed = true;
        }
    }

    /// Recompute the bounding box from the active vertices.
    pub(crate) fn update_bounds(&mut self) {
        self.bounds = Rect::bounding(self.vertices().iter().map(Vertex2D::xy));
    }

    /// The batch key, with unset texture/sampler resolved to the given fallbacks.
    pub fn batch_key(&self, fallback_texture: &Texture2D, fallback_sampler: &GpuSampler) -> BatchKey {
        BatchKey {
            texture: self.texture.as_ref().unwrap_or(fallback_texture).id(),
            sampler: self.sampler.as_ref().unwrap_or(fallback_sampler).id(),
            alpha_enabled: self.alpha_test.is_enabled(),
            alpha_min: self.alpha_test.min,
            alpha_max: self.alpha_test.max,
        }
    }
}
