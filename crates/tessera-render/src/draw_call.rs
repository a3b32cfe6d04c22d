//! Draw-call descriptor cache.
//!
//! Building a [`DrawCall`] clones handles and converts state into device
//! structs, so descriptors are built once per {buffers, texture, sampler,
//! topology, state} combination and reused across frames. Only the draw range
//! is rewritten per submission.

use std::sync::Arc;

use tessera_core::alloc::HashMap;
use tessera_device::{
    DrawCall, DrawRange, GpuBuffer, GpuSampler, InputLayout, ResourceId, VertexBufferBinding,
};

use crate::state::{ActiveBatchState, StateFingerprint};
use crate::texture::Texture2D;

/// Index of a cached descriptor. Valid until the factory is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawCallId(usize);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DrawCallKey {
    vertex_buffer: ResourceId,
    index_buffer: Option<ResourceId>,
    texture: ResourceId,
    sampler: ResourceId,
    topology: wgpu::PrimitiveTopology,
    state: StateFingerprint,
}

/// Everything needed to look up or build a descriptor.
pub struct DrawCallRequest<'a> {
    pub vertex_buffer: &'a GpuBuffer,
    pub index_buffer: Option<&'a GpuBuffer>,
    pub texture: &'a Texture2D,
    pub sampler: &'a GpuSampler,
    pub topology: wgpu::PrimitiveTopology,
    pub state: &'a ActiveBatchState,
}

impl DrawCallRequest<'_> {
    pub fn key(&self) -> DrawCallKey {
        DrawCallKey {
            vertex_buffer: self.vertex_buffer.id(),
            index_buffer: self.index_buffer.map(GpuBuffer::id),
            texture: self.texture.id(),
            sampler: self.sampler.id(),
            topology: self.topology,
            state: self.state.fingerprint(),
        }
    }
}

pub struct DrawCallFactory {
    input_layout: Arc<InputLayout>,
    lookup: HashMap<DrawCallKey, DrawCallId>,
    calls: Vec<DrawCall>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl DrawCallFactory {
    pub fn new(input_layout: Arc<InputLayout>, capacity: usize) -> Self {
        Self {
            input_layout,
            lookup: HashMap::new(),
            calls: Vec::new(),
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get_or_create(&mut self, request: &DrawCallRequest<'_>) -> (DrawCallKey, DrawCallId) {
        let key = request.key();
        if let Some(id) = self.lookup.get(&key) {
            self.hits += 1;
            return (key, *id);
        }

        self.misses += 1;
        let state = request.state;
        let draw_call = DrawCall {
            vertex_buffer: VertexBufferBinding {
                buffer: request.vertex_buffer.clone(),
                stride: self.input_layout.stride,
            },
            index_buffer: request.index_buffer.cloned(),
            input_layout: Arc::clone(&self.input_layout),
            primitive: state.raster.to_primitive(request.topology),
            blend: state.blend.to_blend_state(),
            depth_stencil: state.depth_stencil.to_desc(),
            vertex_stage: state.vertex_stage.to_binding(),
            pixel_stage: state.pixel_stage.to_binding(),
            texture: request.texture.view().clone(),
            sampler: request.sampler.clone(),
            range: DrawRange::NonIndexed {
                first_vertex: 0,
                vertex_count: 0,
            },
        };
        let id = DrawCallId(self.calls.len());
        self.calls.push(draw_call);
        self.lookup.insert(key.clone(), id);
        tracing::debug!(cached = self.calls.len(), "created draw call descriptor");
        (key, id)
    }

    pub fn get_mut(&mut self, id: DrawCallId) -> Option<&mut DrawCall> {
        self.calls.get_mut(id.0)
    }

    /// Drop every descriptor once the cache outgrows its capacity.
    ///
    /// Only call this when no [`DrawCallId`] is held.
    pub fn trim(&mut self) {
        if self.calls.len() > self.capacity {
            tracing::debug!(
                cached = self.calls.len(),
                capacity = self.capacity,
                "draw call cache over capacity, clearing"
            );
            self.clear();
        }
    }

    pub fn clear(&mut self) {
        self.lookup.clear();
        self.calls.clear();
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// `(hits, misses)` since creation.
    pub fn hit_stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ShaderState;
    use crate::vertex::Vertex2D;
    use tessera_device::{MockRenderContext, RenderContext};

    fn buffer(mock: &MockRenderContext) -> GpuBuffer {
        mock.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size: 1024,
            usage: wgpu::BufferUsages::VERTEX,
            mapped_at_creation: false,
        })
    }

    #[test]
    fn test_descriptors_are_reused_by_key() {
        let mock = MockRenderContext::new();
        let mut factory = DrawCallFactory::new(Arc::new(Vertex2D::input_layout()), 16);
        let vb = buffer(&mock);
        let ib = buffer(&mock);
        let texture = Texture2D::solid(&mock, "t", [255; 4]).unwrap();
        let other = Texture2D::solid(&mock, "t2", [0; 4]).unwrap();
        let sampler = mock.create_sampler(&wgpu::SamplerDescriptor::default());
        let state = ActiveBatchState::resolve(None, &ShaderState::default(), &ShaderState::default());

        let ids: Vec<DrawCallId> = [&texture, &texture, &other]
            .into_iter()
            .map(|texture| {
                factory
                    .get_or_create(&DrawCallRequest {
                        vertex_buffer: &vb,
                        index_buffer: Some(&ib),
                        texture,
                        sampler: &sampler,
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        state: &state,
                    })
                    .1
            })
            .collect();
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(factory.len(), 2);
        assert_eq!(factory.hit_stats(), (1, 2));
        assert!(factory.get_mut(a).unwrap().is_indexed());
    }

    #[test]
    fn test_trim_clears_over_capacity() {
        let mock = MockRenderContext::new();
        let mut factory = DrawCallFactory::new(Arc::new(Vertex2D::input_layout()), 1);
        let vb = buffer(&mock);
        let sampler = mock.create_sampler(&wgpu::SamplerDescriptor::default());
        let state = ActiveBatchState::resolve(None, &ShaderState::default(), &ShaderState::default());
        for shade in 0..3u8 {
            let texture = Texture2D::solid(&mock, "t", [shade; 4]).unwrap();
            factory.get_or_create(&DrawCallRequest {
                vertex_buffer: &vb,
                index_buffer: None,
                texture: &texture,
                sampler: &sampler,
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                state: &state,
            });
        }
        assert_eq!(factory.len(), 3);
        factory.trim();
        assert!(factory.is_empty());
    }
}
