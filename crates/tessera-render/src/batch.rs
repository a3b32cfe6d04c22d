//! The batch accumulator.
//!
//! Renderables are appended to shared CPU staging arenas. Adjacent renderables
//! with equal [`BatchKey`] and topology extend the pending batch; any other
//! renderable flushes it first. A flush is the only point at which geometry
//! reaches the device, so submissions keep the order of the draw calls that
//! produced them.

use std::sync::Arc;

use tessera_core::profiling::{profile_function, profile_scope};
use tessera_device::{DrawRange, GpuBuffer, GpuSampler, RenderContext, TargetInfo};

use crate::camera::Camera2D;
use crate::constants::{ConstantDataManager, PolygonData, TimingData};
use crate::draw_call::{DrawCallFactory, DrawCallId, DrawCallKey, DrawCallRequest};
use crate::init::DefaultResources;
use crate::renderable::{AlphaTestData, BatchKey, BatchRenderable};
use crate::renderer::Renderer2DDescriptor;
use crate::staging::{GrowableBuffer, StagingArena};
use crate::state::{ActiveBatchState, ShaderState};
use crate::texture::Texture2D;
use crate::vertex::Vertex2D;

const VERTEX_STRIDE: u64 = std::mem::size_of::<Vertex2D>() as u64;
const INDEX_STRIDE: u64 = std::mem::size_of::<u32>() as u64;

/// Per-session batching statistics, reset by every `begin`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Draw submissions, including immediate polygon draws.
    pub submissions: u32,
    pub vertices: u64,
    pub indices: u64,
    /// Renderables appended to an already pending batch.
    pub batches_coalesced: u32,
    /// Staging buffer reallocations.
    pub buffer_growths: u32,
}

/// The default shader stages with the renderer's constant buffers bound.
///
/// Slot layout, vertex stage: 0 camera, 1 polygon data, 2 timing.
/// Pixel stage: 0 alpha test, 1 viewport, 2 timing.
#[derive(Debug, Clone)]
pub struct DefaultStages {
    pub sprite_vertex: ShaderState,
    pub sprite_pixel: ShaderState,
    pub polygon_vertex: ShaderState,
    pub polygon_pixel: ShaderState,
}

impl DefaultStages {
    fn new(resources: &DefaultResources, constants: &ConstantDataManager) -> Self {
        let vertex = |shader| {
            ShaderState::new(shader)
                .with_constant_buffer(0, constants.camera().buffer().clone())
                .with_constant_buffer(1, constants.polygon().buffer().clone())
                .with_constant_buffer(2, constants.timing().buffer().clone())
        };
        let pixel = |shader| {
            ShaderState::new(shader)
                .with_constant_buffer(0, constants.alpha_test().buffer().clone())
                .with_constant_buffer(1, constants.viewport().buffer().clone())
                .with_constant_buffer(2, constants.timing().buffer().clone())
        };
        Self {
            sprite_vertex: vertex(resources.sprite_vertex.clone()),
            sprite_pixel: pixel(resources.sprite_pixel.clone()),
            polygon_vertex: vertex(resources.polygon_vertex.clone()),
            polygon_pixel: pixel(resources.polygon_pixel.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct BatchMode {
    topology: wgpu::PrimitiveTopology,
    indexed: bool,
}

impl BatchMode {
    fn of(renderable: &BatchRenderable) -> Self {
        Self {
            topology: renderable.topology,
            indexed: renderable.index_count > 0,
        }
    }
}

#[derive(Debug)]
struct PendingBatch {
    key: BatchKey,
    mode: BatchMode,
    texture: Texture2D,
    sampler: GpuSampler,
    alpha_test: AlphaTestData,
    /// Created by the first flush when reconciliation deferred it.
    draw_call: Option<(DrawCallKey, DrawCallId)>,
}

/// A draw that bypasses the shared staging buffers.
pub(crate) struct ImmediateDraw<'a> {
    pub vertex_buffer: &'a GpuBuffer,
    pub index_buffer: &'a GpuBuffer,
    pub index_count: u32,
    pub topology: wgpu::PrimitiveTopology,
    pub texture: Option<&'a Texture2D>,
    pub sampler: Option<&'a GpuSampler>,
    pub alpha_test: AlphaTestData,
    pub polygon: PolygonData,
}

/// Shared staging buffers plus the pending batch.
pub struct BatchAccumulator {
    resources: Arc<DefaultResources>,
    default_sampler: GpuSampler,
    constants: ConstantDataManager,
    stages: DefaultStages,
    draw_calls: DrawCallFactory,
    vertices: StagingArena<Vertex2D>,
    indices: StagingArena<u32>,
    vertex_buffer: GrowableBuffer,
    index_buffer: GrowableBuffer,
    // First free element of each device buffer in the current frame.
    vertex_cursor: u64,
    index_cursor: u64,
    pending: Option<PendingBatch>,
    stats: BatchStats,
}

impl BatchAccumulator {
    pub fn new(
        ctx: &dyn RenderContext,
        resources: Arc<DefaultResources>,
        default_sampler: GpuSampler,
        descriptor: &Renderer2DDescriptor,
    ) -> Self {
        let constants = ConstantDataManager::new(ctx);
        let stages = DefaultStages::new(&resources, &constants);
        let draw_calls = DrawCallFactory::new(
            Arc::clone(&resources.input_layout),
            descriptor.draw_call_capacity,
        );
        Self {
            default_sampler,
            constants,
            stages,
            draw_calls,
            vertices: StagingArena::with_capacity(descriptor.vertex_capacity),
            indices: StagingArena::with_capacity(descriptor.index_capacity),
            vertex_buffer: GrowableBuffer::new(
                "tessera vertex staging",
                wgpu::BufferUsages::VERTEX,
                descriptor.min_vertex_buffer_size,
            ),
            index_buffer: GrowableBuffer::new(
                "tessera index staging",
                wgpu::BufferUsages::INDEX,
                descriptor.min_index_buffer_size,
            ),
            vertex_cursor: 0,
            index_cursor: 0,
            pending: None,
            stats: BatchStats::default(),
            resources,
        }
    }

    pub fn stages(&self) -> &DefaultStages {
        &self.stages
    }

    pub fn constants(&self) -> &ConstantDataManager {
        &self.constants
    }

    pub fn draw_calls(&self) -> &DrawCallFactory {
        &self.draw_calls
    }

    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    /// Vertices staged for the pending batch.
    pub fn staged_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Prepare for a new session.
    pub fn begin_frame(&mut self, ctx: &dyn RenderContext, camera: &Camera2D, target: &TargetInfo) {
        self.draw_calls.trim();
        self.constants.update_target(ctx, camera, target);
        self.constants.resolve(ctx);
        self.vertex_cursor = 0;
        self.index_cursor = 0;
        self.vertices.clear();
        self.indices.clear();
        self.pending = None;
        self.stats = BatchStats::default();
    }

    /// Drop the pending batch. Staged geometry must already be flushed.
    pub fn end_frame(&mut self) {
        self.pending = None;
    }

    pub fn set_timing(&mut self, timing: TimingData) {
        self.constants.set_timing(timing);
    }

    /// Compare `renderable` against the pending batch and flush on any difference.
    ///
    /// A changed renderable opens a new pending batch for its state. With
    /// `create_draw_call` the draw call is looked up right away; otherwise the
    /// flush that submits the batch creates it. `force_flush` flushes even an
    /// unchanged batch. The renderable's change flag is always cleared.
    pub fn render_batch_on_change(
        &mut self,
        ctx: &dyn RenderContext,
        state: &ActiveBatchState,
        renderable: &mut BatchRenderable,
        create_draw_call: bool,
        force_flush: bool,
    ) {
        let key = renderable.batch_key(&self.resources.white, &self.default_sampler);
        let mode = BatchMode::of(renderable);
        let unchanged = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.key == key && pending.mode == mode);

        if unchanged && !force_flush {
            self.stats.batches_coalesced += 1;
            renderable.state_changed = false;
            return;
        }

        self.flush(ctx, state);
        let texture = renderable
            .texture
            .clone()
            .unwrap_or_else(|| self.resources.white.clone());
        let sampler = renderable
            .sampler
            .clone()
            .unwrap_or_else(|| self.default_sampler.clone());
        let draw_call = create_draw_call
            .then(|| self.request_draw_call(ctx, state, &texture, &sampler, mode));
        self.pending = Some(PendingBatch {
            key,
            mode,
            texture,
            sampler,
            alpha_test: renderable.alpha_test,
            draw_call,
        });
        renderable.state_changed = false;
    }

    /// Append the active geometry of `renderable` to the staging arenas.
    pub fn queue(&mut self, renderable: &BatchRenderable) {
        let vertices = renderable.vertices();
        if vertices.is_empty() {
            return;
        }

        if renderable.topology == wgpu::PrimitiveTopology::TriangleStrip {
            if let Some(&last) = self.vertices.last() {
                // Degenerate joins keep consecutive strips apart; an extra one
                // keeps the winding of the next strip.
                if self.vertices.len() % 2 == 1 {
                    self.vertices.push(last);
                }
                self.vertices.push(last);
                self.vertices.push(vertices[0]);
            }
        }

        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(vertices);

        for quad in 0..(renderable.index_count / 6) as u32 {
            let v = base + quad * 4;
            self.indices
                .extend_from_slice(&[v, v + 1, v + 2, v + 2, v + 1, v + 3]);
        }
    }

    /// Submit the staged geometry of the pending batch. No-op when nothing is staged.
    pub fn flush(&mut self, ctx: &dyn RenderContext, state: &ActiveBatchState) {
        if self.vertices.is_empty() {
            return;
        }
        let Some(mode) = self.pending.as_ref().map(|pending| pending.mode) else {
            tracing::warn!(
                vertices = self.vertices.len(),
                "discarding geometry queued without render_batch_on_change"
            );
            self.vertices.clear();
            self.indices.clear();
            return;
        };
        profile_function!();

        let vertex_count = self.vertices.len() as u64;
        let index_count = if mode.indexed { self.indices.len() as u64 } else { 0 };
        let grew = self.reserve_device_space(ctx, vertex_count, index_count);

        {
            profile_scope!("upload");
            if let Some(buffer) = self.vertex_buffer.buffer() {
                ctx.write_buffer(
                    buffer,
                    self.vertex_cursor * VERTEX_STRIDE,
                    bytemuck::cast_slice(self.vertices.as_slice()),
                );
            }
            if index_count > 0 {
                if let Some(buffer) = self.index_buffer.buffer() {
                    ctx.write_buffer(
                        buffer,
                        self.index_cursor * INDEX_STRIDE,
                        bytemuck::cast_slice(self.indices.as_slice()),
                    );
                }
            }
        }

        // A replaced buffer invalidates the cached draw call.
        let Some(pending) = self.pending.take() else {
            return;
        };
        let draw_call = match pending.draw_call {
            Some(draw_call) if !grew => draw_call,
            _ => self.request_draw_call(ctx, state, &pending.texture, &pending.sampler, mode),
        };
        let alpha_test = pending.alpha_test;
        self.pending = Some(PendingBatch {
            draw_call: Some(draw_call.clone()),
            ..pending
        });
        self.constants.update_alpha_test(ctx, alpha_test);
        self.constants.resolve(ctx);

        let range = if mode.indexed {
            DrawRange::Indexed {
                first_index: self.index_cursor as u32,
                index_count: index_count as u32,
                base_vertex: self.vertex_cursor as i32,
            }
        } else {
            DrawRange::NonIndexed {
                first_vertex: self.vertex_cursor as u32,
                vertex_count: vertex_count as u32,
            }
        };

        if let Some(draw_call) = self.draw_calls.get_mut(draw_call.1) {
            draw_call.range = range;
            ctx.submit(
                draw_call,
                state.blend_factor.to_array(),
                state.sample_mask,
                state.stencil_reference,
            );
            tracing::trace!(
                vertices = vertex_count,
                indices = index_count,
                "flushed batch"
            );
        }

        self.vertex_cursor += vertex_count;
        self.index_cursor += index_count;
        self.stats.submissions += 1;
        self.stats.vertices += vertex_count;
        self.stats.indices += index_count;
        self.vertices.clear();
        self.indices.clear();
    }

    /// Flush the pending batch and submit `draw` on its own.
    ///
    /// The accumulator has no pending batch afterwards, so the next queued
    /// renderable starts a fresh one.
    pub(crate) fn submit_immediate(
        &mut self,
        ctx: &dyn RenderContext,
        state: &ActiveBatchState,
        draw: &ImmediateDraw<'_>,
    ) {
        profile_function!();
        self.constants.update_alpha_test(ctx, draw.alpha_test);
        self.constants.update_polygon(ctx, draw.polygon);
        self.constants.resolve(ctx);

        let texture = draw.texture.unwrap_or(&self.resources.white);
        let sampler = draw.sampler.unwrap_or(&self.default_sampler);
        let (_, id) = self.draw_calls.get_or_create(&DrawCallRequest {
            vertex_buffer: draw.vertex_buffer,
            index_buffer: Some(draw.index_buffer),
            texture,
            sampler,
            topology: draw.topology,
            state,
        });

        if let Some(draw_call) = self.draw_calls.get_mut(id) {
            draw_call.range = DrawRange::Indexed {
                first_index: 0,
                index_count: draw.index_count,
                base_vertex: 0,
            };
            ctx.submit(
                draw_call,
                state.blend_factor.to_array(),
                state.sample_mask,
                state.stencil_reference,
            );
            self.stats.submissions += 1;
            self.stats.indices += u64::from(draw.index_count);
        }
    }

    /// Flush and close the pending batch ahead of an immediate draw.
    pub(crate) fn break_batch(&mut self, ctx: &dyn RenderContext, state: &ActiveBatchState) {
        self.flush(ctx, state);
        self.pending = None;
    }

    fn request_draw_call(
        &mut self,
        ctx: &dyn RenderContext,
        state: &ActiveBatchState,
        texture: &Texture2D,
        sampler: &GpuSampler,
        mode: BatchMode,
    ) -> (DrawCallKey, DrawCallId) {
        let vertex_buffer = self.vertex_buffer.acquire(ctx).clone();
        let index_buffer = mode
            .indexed
            .then(|| self.index_buffer.acquire(ctx).clone());
        self.draw_calls.get_or_create(&DrawCallRequest {
            vertex_buffer: &vertex_buffer,
            index_buffer: index_buffer.as_ref(),
            texture,
            sampler,
            topology: mode.topology,
            state,
        })
    }

    /// Make room after the cursors, replacing a buffer that is too small.
    ///
    /// A replaced buffer starts empty, so its cursor restarts at zero.
    /// Returns whether any buffer was replaced.
    fn reserve_device_space(
        &mut self,
        ctx: &dyn RenderContext,
        vertex_count: u64,
        index_count: u64,
    ) -> bool {
        let mut grew = false;
        let needed = (self.vertex_cursor + vertex_count) * VERTEX_STRIDE;
        if self.vertex_buffer.ensure(ctx, needed) {
            self.vertex_cursor = 0;
            self.stats.buffer_growths += 1;
            grew = true;
        }
        if index_count > 0 {
            let needed = (self.index_cursor + index_count) * INDEX_STRIDE;
            if self.index_buffer.ensure(ctx, needed) {
                self.index_cursor = 0;
                self.stats.buffer_growths += 1;
                grew = true;
            }
        }
        grew
    }
}
