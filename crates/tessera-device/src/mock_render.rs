//! Mock implementation of RenderContext for testing.
//!
//! The mock keeps the bytes written to every buffer so each submission can be
//! recorded together with the exact vertices and indices it would draw.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::draw::{DrawCall, DrawRange};
use crate::error::{DeviceError, DeviceResult};
use crate::gpu_types::*;
use crate::render_context::{RenderContext, validate_texture_view};
use parking_lot::Mutex;
use wgpu::{
    BufferDescriptor, BufferUsages, SamplerDescriptor, TextureDescriptor, TextureFormat,
    TextureViewDescriptor, TextureViewDimension,
};

/// Records a GPU operation call for verification in tests.
#[derive(Debug, Clone)]
pub enum RenderCall {
    CreateBuffer {
        id: ResourceId,
        size: u64,
        usage: BufferUsages,
        label: Option<String>,
    },
    WriteBuffer {
        buffer_id: ResourceId,
        offset: u64,
        data: Vec<u8>,
    },
    CreateTexture {
        id: ResourceId,
        width: u32,
        height: u32,
        format: TextureFormat,
    },
    WriteTexture {
        texture_id: ResourceId,
        size: usize,
    },
    CreateTextureView {
        id: ResourceId,
        texture_id: ResourceId,
    },
    CreateSampler {
        id: ResourceId,
        label: Option<String>,
    },
    CreateShaderModule {
        id: ResourceId,
        label: Option<String>,
        entry_point: String,
    },
    Submit(SubmitRecord),
}

/// A recorded submission with the geometry it referenced at submit time.
#[derive(Debug, Clone)]
pub struct SubmitRecord {
    pub draw_call: DrawCall,
    pub blend_factor: [f32; 4],
    pub sample_mask: u32,
    pub stencil_reference: u32,
    /// Raw bytes of every vertex the draw touches, starting at its first vertex.
    pub vertex_bytes: Vec<u8>,
    /// Indices rebased so that 0 is the first vertex in `vertex_bytes`.
    pub indices: Vec<u32>,
}

impl SubmitRecord {
    /// Number of vertices captured for this submission.
    pub fn vertex_count(&self) -> usize {
        let stride = self.draw_call.vertex_buffer.stride as usize;
        if stride == 0 {
            0
        } else {
            self.vertex_bytes.len() / stride
        }
    }
}

/// Mock implementation of RenderContext for testing.
///
/// `&self` methods record into `parking_lot::Mutex`-guarded state so the mock
/// stays `Send + Sync` like a real device.
///
/// # Example
///
/// ```rust
/// use tessera_device::{MockRenderContext, RenderContext};
///
/// let mock = MockRenderContext::new();
/// assert_eq!(mock.count_submissions(), 0);
/// assert_eq!(mock.target_info().target_width, 800);
/// ```
pub struct MockRenderContext {
    calls: Mutex<Vec<RenderCall>>,
    buffer_contents: Mutex<HashMap<ResourceId, Vec<u8>>>,
    target: Mutex<TargetInfo>,
    next_id: AtomicU64,
}

impl MockRenderContext {
    /// Create a mock with an 800x600 RGBA target and no depth buffer.
    pub fn new() -> Self {
        Self::with_target(TargetInfo::new(800, 600, TextureFormat::Rgba8UnormSrgb))
    }

    pub fn with_target(target: TargetInfo) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            buffer_contents: Mutex::new(HashMap::new()),
            target: Mutex::new(target),
            next_id: AtomicU64::new(1),
        }
    }

    /// Change the target reported by [`RenderContext::target_info`].
    pub fn set_target(&self, target: TargetInfo) {
        *self.target.lock() = target;
    }

    fn allocate_id(&self) -> ResourceId {
        ResourceId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Get a copy of all recorded calls (for test assertions).
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().clone()
    }

    /// All submissions in the order they were issued.
    pub fn submissions(&self) -> Vec<SubmitRecord> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                RenderCall::Submit(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count_submissions(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::Submit(_)))
    }

    pub fn count_buffer_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateBuffer { .. }))
    }

    pub fn count_buffer_writes(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::WriteBuffer { .. }))
    }

    /// Count writes targeting one buffer.
    pub fn count_writes_to(&self, buffer: ResourceId) -> usize {
        self.count(
            |call| matches!(call, RenderCall::WriteBuffer { buffer_id, .. } if *buffer_id == buffer),
        )
    }

    pub fn count_texture_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateTexture { .. }))
    }

    pub fn count_shader_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateShaderModule { .. }))
    }

    pub fn count_sampler_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateSampler { .. }))
    }

    /// Current contents of a buffer, as accumulated from every write.
    pub fn buffer_contents(&self, buffer: ResourceId) -> Option<Vec<u8>> {
        self.buffer_contents.lock().get(&buffer).cloned()
    }

    /// Clear recorded calls (useful between test steps). Buffer contents are kept.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Get total number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn count(&self, predicate: impl Fn(&RenderCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    fn capture_geometry(&self, draw_call: &DrawCall) -> (Vec<u8>, Vec<u32>) {
        let contents = self.buffer_contents.lock();
        let stride = draw_call.vertex_buffer.stride as usize;
        let vertex_data = contents
            .get(&draw_call.vertex_buffer.buffer.id())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let slice_vertices = |first: usize, count: usize| -> Vec<u8> {
            let start = (first * stride).min(vertex_data.len());
            let end = ((first + count) * stride).min(vertex_data.len());
            vertex_data[start..end].to_vec()
        };

        match draw_call.range {
            DrawRange::NonIndexed {
                first_vertex,
                vertex_count,
            } => (
                slice_vertices(first_vertex as usize, vertex_count as usize),
                Vec::new(),
            ),
            DrawRange::Indexed {
                first_index,
                index_count,
                base_vertex,
            } => {
                let index_data = draw_call
                    .index_buffer
                    .as_ref()
                    .and_then(|buffer| contents.get(&buffer.id()))
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                let indices: Vec<u32> = index_data
                    .chunks_exact(4)
                    .skip(first_index as usize)
                    .take(index_count as usize)
                    .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect();
                let referenced = indices.iter().max().map_or(0, |max| *max as usize + 1);
                (
                    slice_vertices(base_vertex.max(0) as usize, referenced),
                    indices,
                )
            }
        }
    }
}

impl Default for MockRenderContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderContext for MockRenderContext {
    fn create_buffer(&self, desc: &BufferDescriptor) -> GpuBuffer {
        let id = self.allocate_id();
        self.buffer_contents
            .lock()
            .insert(id, vec![0; desc.size as usize]);
        self.calls.lock().push(RenderCall::CreateBuffer {
            id,
            size: desc.size,
            usage: desc.usage,
            label: desc.label.map(|s| s.to_string()),
        });
        GpuBuffer::new(id, desc.size, desc.usage)
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        {
            let mut contents = self.buffer_contents.lock();
            let storage = contents.entry(buffer.id()).or_default();
            let start = offset as usize;
            let end = start + data.len();
            if storage.len() < end {
                storage.resize(end, 0);
            }
            storage[start..end].copy_from_slice(data);
        }
        self.calls.lock().push(RenderCall::WriteBuffer {
            buffer_id: buffer.id(),
            offset,
            data: data.to_vec(),
        });
    }

    fn create_texture(&self, desc: &TextureDescriptor) -> GpuTexture {
        let id = self.allocate_id();
        self.calls.lock().push(RenderCall::CreateTexture {
            id,
            width: desc.size.width,
            height: desc.size.height,
            format: desc.format,
        });
        GpuTexture::new(id, desc.size, desc.format, desc.sample_count, desc.dimension)
    }

    fn write_texture(&self, texture: &GpuTexture, data: &[u8]) {
        self.calls.lock().push(RenderCall::WriteTexture {
            texture_id: texture.id(),
            size: data.len(),
        });
    }

    fn create_texture_view(
        &self,
        texture: &GpuTexture,
        desc: &TextureViewDescriptor,
    ) -> DeviceResult<GpuTextureView> {
        validate_texture_view(texture, desc)?;
        let id = self.allocate_id();
        self.calls.lock().push(RenderCall::CreateTextureView {
            id,
            texture_id: texture.id(),
        });
        let dimension = desc.dimension.unwrap_or(if texture.array_layers() > 1 {
            TextureViewDimension::D2Array
        } else {
            TextureViewDimension::D2
        });
        Ok(GpuTextureView::new(
            id,
            texture,
            desc.format.unwrap_or(texture.format()),
            dimension,
        ))
    }

    fn create_sampler(&self, desc: &SamplerDescriptor) -> GpuSampler {
        let id = self.allocate_id();
        self.calls.lock().push(RenderCall::CreateSampler {
            id,
            label: desc.label.map(|s| s.to_string()),
        });
        GpuSampler::new(id, desc.address_mode_u, desc.mag_filter)
    }

    fn create_shader_module(&self, source: &ShaderSource) -> DeviceResult<GpuShaderModule> {
        if source.wgsl.trim().is_empty() {
            return Err(DeviceError::InvalidDescriptor(
                "shader source is empty".to_string(),
            ));
        }
        if source.entry_point.is_empty() {
            return Err(DeviceError::InvalidDescriptor(
                "shader entry point is empty".to_string(),
            ));
        }
        let id = self.allocate_id();
        self.calls.lock().push(RenderCall::CreateShaderModule {
            id,
            label: source.label.map(|s| s.to_string()),
            entry_point: source.entry_point.to_string(),
        });
        Ok(GpuShaderModule::new(id, source.stage, source.entry_point))
    }

    fn target_info(&self) -> TargetInfo {
        *self.target.lock()
    }

    fn submit(
        &self,
        draw_call: &DrawCall,
        blend_factor: [f32; 4],
        sample_mask: u32,
        stencil_reference: u32,
    ) {
        let (vertex_bytes, indices) = self.capture_geometry(draw_call);
        self.calls.lock().push(RenderCall::Submit(SubmitRecord {
            draw_call: draw_call.clone(),
            blend_factor,
            sample_mask,
            stencil_reference,
            vertex_bytes,
            indices,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{InputLayout, ShaderBinding, VertexBufferBinding};
    use wgpu::{Extent3d, PrimitiveState, TextureDimension, TextureUsages};
    use std::sync::Arc;

    fn buffer(mock: &MockRenderContext, size: u64, usage: BufferUsages) -> GpuBuffer {
        mock.create_buffer(&BufferDescriptor {
            label: None,
            size,
            usage,
            mapped_at_creation: false,
        })
    }

    fn view(mock: &MockRenderContext) -> GpuTextureView {
        let texture = mock.create_texture(&TextureDescriptor {
            label: Some("test_texture"),
            size: Extent3d {
                width: 4,
                height: 4,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        mock.create_texture_view(&texture, &TextureViewDescriptor::default())
            .unwrap()
    }

    #[test]
    fn test_mock_buffer_creation() {
        let mock = MockRenderContext::new();
        let a = buffer(&mock, 1024, BufferUsages::VERTEX);
        let b = buffer(&mock, 1024, BufferUsages::VERTEX);
        assert_ne!(a.id(), b.id());
        assert_eq!(mock.count_buffer_creates(), 2);
    }

    #[test]
    fn test_mock_buffer_write_is_stored() {
        let mock = MockRenderContext::new();
        let b = buffer(&mock, 8, BufferUsages::VERTEX);
        mock.write_buffer(&b, 4, &[1, 2, 3, 4]);
        assert_eq!(mock.count_buffer_writes(), 1);
        assert_eq!(mock.buffer_contents(b.id()).unwrap(), vec![0, 0, 0, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_mock_shader_rejects_empty_source() {
        let mock = MockRenderContext::new();
        let result = mock.create_shader_module(&ShaderSource {
            label: None,
            wgsl: "  ",
            entry_point: "vs_main",
            stage: ShaderStage::Vertex,
        });
        assert!(matches!(result, Err(DeviceError::InvalidDescriptor(_))));
        assert_eq!(mock.count_shader_creates(), 0);
    }

    #[test]
    fn test_mock_shader_through_trait_object() {
        let mock = MockRenderContext::new();
        let ctx: &dyn RenderContext = &mock;
        let module = ctx
            .create_shader_module(&ShaderSource {
                label: Some("sprite"),
                wgsl: "@vertex fn vs_main() {}",
                entry_point: "vs_main",
                stage: ShaderStage::Vertex,
            })
            .unwrap();
        assert_eq!(mock.count_shader_creates(), 1);
        assert!(matches!(
            mock.calls().last(),
            Some(RenderCall::CreateShaderModule { id, .. }) if *id == module.id()
        ));
    }

    #[test]
    fn test_submit_captures_indexed_geometry() {
        let mock = MockRenderContext::new();
        let vb = buffer(&mock, 64, BufferUsages::VERTEX);
        let ib = buffer(&mock, 64, BufferUsages::INDEX);
        let vertices: Vec<u8> = (0u8..32).collect();
        mock.write_buffer(&vb, 0, &vertices);
        let indices: Vec<u8> = [0u32, 1, 2, 2, 1, 3]
            .iter()
            .flat_map(|i| i.to_le_bytes())
            .collect();
        mock.write_buffer(&ib, 0, &indices);

        let draw_call = DrawCall {
            vertex_buffer: VertexBufferBinding {
                buffer: vb,
                stride: 4,
            },
            index_buffer: Some(ib),
            input_layout: Arc::new(InputLayout::new(4, &[])),
            primitive: PrimitiveState::default(),
            blend: None,
            depth_stencil: None,
            vertex_stage: ShaderBinding::default(),
            pixel_stage: ShaderBinding::default(),
            texture: view(&mock),
            sampler: mock.create_sampler(&SamplerDescriptor::default()),
            range: DrawRange::Indexed {
                first_index: 0,
                index_count: 6,
                base_vertex: 2,
            },
        };
        mock.submit(&draw_call, [1.0; 4], u32::MAX, 0);

        let records = mock.submissions();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].indices, vec![0, 1, 2, 2, 1, 3]);
        assert_eq!(records[0].vertex_count(), 4);
        assert_eq!(records[0].vertex_bytes[0], 8);
    }

    #[test]
    fn test_clear_calls() {
        let mock = MockRenderContext::new();
        buffer(&mock, 16, BufferUsages::UNIFORM);
        assert_eq!(mock.call_count(), 1);
        mock.clear_calls();
        assert_eq!(mock.call_count(), 0);
    }
}
