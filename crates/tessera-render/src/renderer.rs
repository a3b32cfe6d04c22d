//! The public 2D renderer: session control and the draw API.
//!
//! A [`Renderer2D`] records draws between [`Renderer2D::begin`] and
//! [`Renderer2D::end`]. Sprites, text and primitives go through the shared
//! batch, so adjacent draws with equal texture, sampler and alpha test end up
//! in one submission. Polygon meshes are submitted immediately with their own
//! buffers.
//!
//! ```
//! use std::sync::Arc;
//! use tessera_core::geometry::Rect;
//! use tessera_device::MockRenderContext;
//! use tessera_render::{Color, PrimitiveOptions, Renderer2D};
//!
//! let mock = Arc::new(MockRenderContext::new());
//! let mut renderer = Renderer2D::new(mock.clone());
//! let options = PrimitiveOptions::default();
//!
//! renderer
//!     .begin()?
//!     .draw_filled_rectangle(Rect::new(0.0, 0.0, 10.0, 10.0), Color::RED, &options)?
//!     .draw_filled_rectangle(Rect::new(20.0, 0.0, 10.0, 10.0), Color::BLUE, &options)?
//!     .end();
//!
//! assert_eq!(mock.count_submissions(), 1);
//! # Ok::<(), tessera_render::RenderError>(())
//! ```

use std::sync::Arc;

use glam::Vec2;
use tessera_core::geometry::Rect;
use tessera_core::profiling::profile_function;
use tessera_device::RenderContext;

use crate::batch::{BatchAccumulator, BatchStats};
use crate::camera::Camera2D;
use crate::color::Color;
use crate::constants::TimingData;
use crate::error::{ProtocolViolation, RenderResult};
use crate::init::SharedResources;
use crate::polygon::{PolygonSprite, StageOverride};
use crate::primitives::{self, PrimitiveOptions, TriangleVertex};
use crate::renderable::{AlphaTestData, AlphaTestRange, BatchRenderable};
use crate::sprite::Sprite;
use crate::state::{ActiveBatchState, BatchState};
use crate::text::{Font, LayoutOptions, TextDrawMode, TextSprite, has_color_codes, measure_layout};
use crate::texture::SamplerPreset;

/// Configuration for a [`Renderer2D`].
#[derive(Debug, Clone)]
pub struct Renderer2DDescriptor {
    /// Debug label used in log output.
    pub label: Option<String>,
    /// Initial CPU staging capacity, in vertices.
    pub vertex_capacity: usize,
    /// Initial CPU staging capacity, in indices.
    pub index_capacity: usize,
    /// Smallest GPU vertex buffer ever created, in bytes.
    pub min_vertex_buffer_size: u64,
    /// Smallest GPU index buffer ever created, in bytes.
    pub min_index_buffer_size: u64,
    /// Alpha test applied to primitive draws.
    pub primitive_alpha_test: Option<AlphaTestRange>,
    /// Sampler used when a draw does not name one.
    pub sampler: SamplerPreset,
    /// Draw calls kept cached between sessions.
    pub draw_call_capacity: usize,
}

impl Default for Renderer2DDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            vertex_capacity: 4096,
            index_capacity: 6144,
            min_vertex_buffer_size: 64 * 1024,
            min_index_buffer_size: 16 * 1024,
            primitive_alpha_test: Some(AlphaTestRange::TRANSPARENT),
            sampler: SamplerPreset::default(),
            draw_call_capacity: 256,
        }
    }
}

/// Everything a draw needs while a session is active.
struct Frame<'a> {
    ctx: &'a dyn RenderContext,
    state: &'a mut ActiveBatchState,
    batch: &'a mut BatchAccumulator,
    primitive: &'a mut BatchRenderable,
    primitive_alpha_test: AlphaTestData,
}

impl Frame<'_> {
    /// Reconcile the primitive renderable with the batch and queue it.
    fn submit_primitive(&mut self, options: &PrimitiveOptions<'_>) {
        self.primitive.set_texture(options.texture);
        self.primitive.set_sampler(options.sampler);
        self.primitive.set_alpha_test(self.primitive_alpha_test);
        self.batch
            .render_batch_on_change(self.ctx, self.state, self.primitive, true, false);
        self.batch.queue(self.primitive);
    }
}

/// Batching 2D renderer.
///
/// Draw methods return `&mut Self` so calls chain; every one of them fails
/// with [`ProtocolViolation::DrawOutsideSession`] outside `begin`/`end`.
/// Degenerate shapes (empty rectangles, zero thickness, coincident line end
/// points) draw nothing and never flush the batch.
pub struct Renderer2D {
    ctx: Arc<dyn RenderContext>,
    shared: Arc<SharedResources>,
    descriptor: Renderer2DDescriptor,
    /// Created by the first `begin`, kept until dispose.
    batch: Option<BatchAccumulator>,
    /// The resolved state of the active session.
    session: Option<ActiveBatchState>,
    primitive: BatchRenderable,
    primitive_alpha_test: AlphaTestData,
    /// Backs `draw_string`.
    text: Option<TextSprite>,
    timing: TimingData,
}

impl Renderer2D {
    /// A renderer with its own shared defaults and the default descriptor.
    pub fn new(ctx: Arc<dyn RenderContext>) -> Self {
        Self::with_shared(ctx, SharedResources::new(), Renderer2DDescriptor::default())
    }

    /// A renderer drawing with defaults shared with other renderers.
    pub fn with_shared(
        ctx: Arc<dyn RenderContext>,
        shared: Arc<SharedResources>,
        descriptor: Renderer2DDescriptor,
    ) -> Self {
        Self {
            ctx,
            shared,
            primitive_alpha_test: AlphaTestData::from(descriptor.primitive_alpha_test),
            descriptor,
            batch: None,
            session: None,
            primitive: BatchRenderable::new(),
            text: None,
            timing: TimingData::new(0.0, 0.0, 0),
        }
    }

    pub fn descriptor(&self) -> &Renderer2DDescriptor {
        &self.descriptor
    }

    pub fn shared(&self) -> &Arc<SharedResources> {
        &self.shared
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// The resolved state of the active session.
    pub fn active_state(&self) -> Option<&ActiveBatchState> {
        self.session.as_ref()
    }

    /// The batch accumulator, once the first `begin` has created it.
    pub fn batch(&self) -> Option<&BatchAccumulator> {
        self.batch.as_ref()
    }

    /// Statistics of the current or last session.
    pub fn stats(&self) -> BatchStats {
        self.batch
            .as_ref()
            .map(BatchAccumulator::stats)
            .unwrap_or_default()
    }

    /// Start a session with the default state and camera.
    pub fn begin(&mut self) -> RenderResult<&mut Self> {
        self.begin_with(None, None)
    }

    /// Start a session.
    ///
    /// Unset slots of `state` fall back to the defaults, so a state that only
    /// sets a blend mode still draws with the default shaders. The camera
    /// defaults to one covering the viewport.
    pub fn begin_with(
        &mut self,
        state: Option<&BatchState>,
        camera: Option<&Camera2D>,
    ) -> RenderResult<&mut Self> {
        profile_function!();
        if self.session.is_some() {
            return Err(ProtocolViolation::SessionAlreadyActive.into());
        }

        let batch = match self.batch.take() {
            Some(batch) => batch,
            None => self.create_batch()?,
        };
        let ctx = self.ctx.as_ref();
        let batch = self.batch.insert(batch);

        batch.set_timing(self.timing);
        let camera = camera.copied().unwrap_or_default();
        batch.begin_frame(ctx, &camera, &ctx.target_info());

        let stages = batch.stages();
        self.session = Some(ActiveBatchState::resolve(
            state,
            &stages.sprite_vertex,
            &stages.sprite_pixel,
        ));
        Ok(self)
    }

    fn create_batch(&self) -> RenderResult<BatchAccumulator> {
        let ctx = self.ctx.as_ref();
        let resources = self.shared.get_or_init(ctx)?;
        let sampler = self
            .shared
            .samplers()
            .get_or_create(ctx, self.descriptor.sampler.into());
        tracing::debug!(
            label = self.descriptor.label.as_deref().unwrap_or("renderer2d"),
            "creating batch accumulator"
        );
        Ok(BatchAccumulator::new(ctx, resources, sampler, &self.descriptor))
    }

    /// Flush the remaining geometry and close the session.
    ///
    /// Calling `end` without an active session does nothing.
    pub fn end(&mut self) -> &mut Self {
        let Some(state) = self.session.take() else {
            tracing::debug!("end() called without an active session");
            return self;
        };
        if let Some(batch) = self.batch.as_mut() {
            batch.flush(self.ctx.as_ref(), &state);
            batch.end_frame();
        }
        self
    }

    /// Submit whatever the batch holds without ending the session.
    pub fn flush(&mut self) -> RenderResult<&mut Self> {
        let frame = self.frame()?;
        frame.batch.flush(frame.ctx, frame.state);
        Ok(self)
    }

    fn frame(&mut self) -> RenderResult<Frame<'_>> {
        match (self.session.as_mut(), self.batch.as_mut()) {
            (Some(state), Some(batch)) => Ok(Frame {
                ctx: self.ctx.as_ref(),
                state,
                batch,
                primitive: &mut self.primitive,
                primitive_alpha_test: self.primitive_alpha_test,
            }),
            _ => Err(ProtocolViolation::DrawOutsideSession.into()),
        }
    }

    /// Tessellate into the primitive renderable and queue it unless degenerate.
    fn draw_primitive(
        &mut self,
        options: &PrimitiveOptions<'_>,
        tessellate: impl FnOnce(&mut BatchRenderable) -> bool,
    ) -> RenderResult<&mut Self> {
        let mut frame = self.frame()?;
        if tessellate(&mut *frame.primitive) {
            frame.submit_primitive(options);
        }
        Ok(self)
    }

    /// Feed the timing constants. Uploaded at the next `begin` or flush if changed.
    pub fn update_timing(&mut self, elapsed: f32, delta: f32) -> &mut Self {
        self.timing = TimingData::new(elapsed, delta, self.timing.frame.wrapping_add(1));
        if let Some(batch) = self.batch.as_mut() {
            batch.set_timing(self.timing);
        }
        self
    }

    /// Alpha test for primitive draws. `None` disables it.
    pub fn set_primitive_alpha_test(&mut self, range: Option<AlphaTestRange>) -> &mut Self {
        self.primitive_alpha_test = AlphaTestData::from(range);
        self
    }

    pub fn draw_sprite(&mut self, sprite: &mut Sprite) -> RenderResult<&mut Self> {
        let frame = self.frame()?;
        let renderable = sprite.update();
        frame
            .batch
            .render_batch_on_change(frame.ctx, frame.state, renderable, true, false);
        frame.batch.queue(renderable);
        Ok(self)
    }

    /// Draw a text sprite. Glyphs from different textures flush in between.
    pub fn draw_text_run(&mut self, text: &mut TextSprite) -> RenderResult<&mut Self> {
        let frame = self.frame()?;
        text.render(frame.ctx, frame.state, frame.batch);
        Ok(self)
    }

    /// Draw `text` at `position` with a default text sprite.
    ///
    /// Color markup is honoured when the text contains both an opening and a
    /// closing tag. Fonts with an outline draw outlined.
    pub fn draw_string(
        &mut self,
        font: &Arc<Font>,
        text: &str,
        position: Vec2,
        color: Option<Color>,
    ) -> RenderResult<&mut Self> {
        self.frame()?;
        if text.trim().is_empty() {
            return Ok(self);
        }

        let mut sprite = self
            .text
            .take()
            .unwrap_or_else(|| TextSprite::new(Arc::clone(font), ""));
        sprite.set_font(Arc::clone(font));
        sprite.set_allow_color_codes(has_color_codes(text));
        sprite.set_text(text);
        sprite.set_position(position);
        sprite.set_color(color.unwrap_or(Color::WHITE));
        sprite.set_draw_mode(if font.has_outline() {
            TextDrawMode::OutlinedGlyphs
        } else {
            TextDrawMode::GlyphsOnly
        });

        let drawn = self.draw_text_run(&mut sprite).map(|_| ());
        self.text = Some(sprite);
        drawn?;
        Ok(self)
    }

    /// Draw a polygon mesh immediately with its own buffers.
    ///
    /// The pending batch is flushed first. Default sprite stages are swapped
    /// for the polygon stages only for this submission.
    pub fn draw_polygon(&mut self, polygon: &PolygonSprite) -> RenderResult<&mut Self> {
        profile_function!();
        let frame = self.frame()?;
        frame.batch.break_batch(frame.ctx, frame.state);
        let stages = frame.batch.stages().clone();
        let guard = StageOverride::apply(frame.state, &stages);
        frame
            .batch
            .submit_immediate(frame.ctx, guard.state(), &polygon.immediate_draw());
        drop(guard);
        Ok(self)
    }

    pub fn draw_filled_rectangle(
        &mut self,
        region: Rect<f32>,
        color: Color,
        options: &PrimitiveOptions<'_>,
    ) -> RenderResult<&mut Self> {
        self.draw_primitive(options, |r| {
            primitives::filled_rectangle(r, region, color, options)
        })
    }

    /// A rectangle outline, drawn as four filled edge strips.
    pub fn draw_rectangle(
        &mut self,
        region: Rect<f32>,
        color: Color,
        thickness: f32,
        options: &PrimitiveOptions<'_>,
    ) -> RenderResult<&mut Self> {
        let mut frame = self.frame()?;
        let Some(pieces) = primitives::rectangle_outline(region, thickness, options.texture_region)
        else {
            return Ok(self);
        };
        for (piece, texture_region) in pieces {
            let piece_options = PrimitiveOptions {
                texture_region,
                ..*options
            };
            if primitives::filled_rectangle(frame.primitive, piece, color, &piece_options) {
                frame.submit_primitive(&piece_options);
            }
        }
        Ok(self)
    }

    pub fn draw_line(
        &mut self,
        start: Vec2,
        end: Vec2,
        color: Color,
        thickness: f32,
        options: &PrimitiveOptions<'_>,
    ) -> RenderResult<&mut Self> {
        self.draw_primitive(options, |r| {
            primitives::line(r, start, end, color, thickness, options)
        })
    }

    pub fn draw_triangle(
        &mut self,
        points: [TriangleVertex; 3],
        options: &PrimitiveOptions<'_>,
    ) -> RenderResult<&mut Self> {
        self.draw_primitive(options, |r| primitives::triangle(r, points, options))
    }

    /// An ellipse outline inscribed in `region`.
    ///
    /// `smoothness` scales the segment count; 1.0 gives 64 segments.
    pub fn draw_ellipse(
        &mut self,
        region: Rect<f32>,
        color: Color,
        smoothness: f32,
        thickness: f32,
        options: &PrimitiveOptions<'_>,
    ) -> RenderResult<&mut Self> {
        self.draw_primitive(options, |r| {
            primitives::ellipse(r, region, color, smoothness, thickness, options)
        })
    }

    pub fn draw_filled_ellipse(
        &mut self,
        region: Rect<f32>,
        color: Color,
        smoothness: f32,
        options: &PrimitiveOptions<'_>,
    ) -> RenderResult<&mut Self> {
        self.draw_primitive(options, |r| {
            primitives::filled_ellipse(r, region, color, smoothness, options)
        })
    }

    /// An arc outline from `start_degrees` to `end_degrees`, clockwise from the top.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_arc(
        &mut self,
        region: Rect<f32>,
        color: Color,
        start_degrees: f32,
        end_degrees: f32,
        smoothness: f32,
        thickness: f32,
        options: &PrimitiveOptions<'_>,
    ) -> RenderResult<&mut Self> {
        self.draw_primitive(options, |r| {
            primitives::arc(
                r,
                region,
                color,
                start_degrees,
                end_degrees,
                smoothness,
                thickness,
                options,
            )
        })
    }

    pub fn draw_filled_arc(
        &mut self,
        region: Rect<f32>,
        color: Color,
        start_degrees: f32,
        end_degrees: f32,
        smoothness: f32,
        options: &PrimitiveOptions<'_>,
    ) -> RenderResult<&mut Self> {
        self.draw_primitive(options, |r| {
            primitives::filled_arc(
                r,
                region,
                color,
                start_degrees,
                end_degrees,
                smoothness,
                options,
            )
        })
    }

    /// Run `draw` only when `condition` holds.
    pub fn draw_if(
        &mut self,
        condition: bool,
        draw: impl FnOnce(&mut Self) -> RenderResult<&mut Self>,
    ) -> RenderResult<&mut Self> {
        if condition {
            draw(self)?;
        }
        Ok(self)
    }

    /// Run `draw` for every item, stopping at the first error.
    pub fn draw_each<I: IntoIterator>(
        &mut self,
        items: I,
        mut draw: impl FnMut(&mut Self, I::Item) -> RenderResult<&mut Self>,
    ) -> RenderResult<&mut Self> {
        for item in items {
            draw(self, item)?;
        }
        Ok(self)
    }

    /// Run `draw` with every index in `0..count`.
    pub fn draw_loop(
        &mut self,
        count: usize,
        mut draw: impl FnMut(&mut Self, usize) -> RenderResult<&mut Self>,
    ) -> RenderResult<&mut Self> {
        for index in 0..count {
            draw(self, index)?;
        }
        Ok(self)
    }

    pub fn measure_sprite(&self, sprite: &Sprite) -> Rect<f32> {
        sprite.bounds()
    }

    pub fn measure_polygon(&self, polygon: &PolygonSprite) -> Rect<f32> {
        polygon.bounds()
    }

    pub fn measure_text_sprite(&self, text: &TextSprite) -> Rect<f32> {
        text.bounds()
    }

    /// Local bounds of `text` laid out with `options`. Empty text measures empty.
    pub fn measure_text(&self, font: &Font, text: &str, options: &LayoutOptions) -> Rect<f32> {
        measure_layout(font, text, options)
    }

    /// Release the batch and drop the shared defaults if no other renderer uses them.
    pub fn dispose(&mut self) -> RenderResult<()> {
        if self.session.is_some() {
            return Err(ProtocolViolation::SessionAlreadyActive.into());
        }
        self.release();
        Ok(())
    }

    fn release(&mut self) {
        self.text = None;
        if self.batch.take().is_some() && self.shared.release_if_unused() {
            tracing::debug!("last renderer released the shared defaults");
        }
    }
}

impl Drop for Renderer2D {
    fn drop(&mut self) {
        self.session = None;
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_device::MockRenderContext;

    fn renderer() -> (Arc<MockRenderContext>, Renderer2D) {
        let mock = Arc::new(MockRenderContext::new());
        let renderer = Renderer2D::new(mock.clone());
        (mock, renderer)
    }

    #[test]
    fn test_draw_before_begin_is_protocol_error() {
        let (_, mut renderer) = renderer();
        let err = renderer
            .draw_filled_rectangle(Rect::new(0.0, 0.0, 1.0, 1.0), Color::RED, &Default::default())
            .err();
        assert_eq!(err, Some(ProtocolViolation::DrawOutsideSession.into()));
    }

    #[test]
    fn test_nested_begin_fails() {
        let (_, mut renderer) = renderer();
        renderer.begin().unwrap();
        let err = renderer.begin().err();
        assert_eq!(err, Some(ProtocolViolation::SessionAlreadyActive.into()));
        assert!(renderer.is_active());
    }

    #[test]
    fn test_end_without_begin_is_noop() {
        let (mock, mut renderer) = renderer();
        renderer.end().end();
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn test_draw_string_skips_whitespace() {
        let (mock, mut renderer) = renderer();
        let font = Arc::new(Font::new("empty", 12.0));
        renderer.begin().unwrap();
        renderer.draw_string(&font, " \t\n", Vec2::ZERO, None).unwrap();
        renderer.end();
        assert_eq!(mock.count_submissions(), 0);
        assert!(renderer.text.is_none());
    }

    #[test]
    fn test_update_timing_counts_frames() {
        let (_, mut renderer) = renderer();
        renderer.update_timing(0.5, 0.016).update_timing(0.516, 0.016);
        assert_eq!(renderer.timing.frame, 2);
        assert_eq!(renderer.timing.elapsed, 0.516);
    }

    #[test]
    fn test_dispose_rejected_during_session() {
        let (_, mut renderer) = renderer();
        renderer.begin().unwrap();
        assert!(renderer.dispose().is_err());
        renderer.end();
        renderer.dispose().unwrap();
        assert!(!renderer.shared().is_initialized());
    }
}
