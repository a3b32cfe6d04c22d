//! Text sprites: a font, a string and the renderable that carries its glyphs.

use std::convert::Infallible;
use std::sync::Arc;

use glam::Vec2;
use tessera_core::geometry::Rect;
use tessera_core::profiling::profile_function;
use tessera_device::{GpuSampler, RenderContext};

use super::color_codes::{ColorBlock, parse_color_codes};
use super::font::Font;
use super::layout::{Alignment, GlyphQuad, LayoutOptions, TextDrawMode, layout_text, measure_layout};
use crate::batch::BatchAccumulator;
use crate::color::Color;
use crate::renderable::{AlphaTestData, AlphaTestRange, BatchRenderable};
use crate::state::ActiveBatchState;
use crate::vertex::Vertex2D;

/// A positioned, styled run of text.
///
/// ```
/// # use std::sync::Arc;
/// use tessera_render::text::{Font, TextSprite};
///
/// let font = Arc::new(Font::new("ui", 16.0));
/// let mut label = TextSprite::new(font, "[c #FF0000]Score[/c]: 10");
/// label.set_allow_color_codes(true);
/// assert_eq!(label.text(), "Score: 10");
/// ```
#[derive(Debug, Clone)]
pub struct TextSprite {
    font: Arc<Font>,
    source: String,
    text: String,
    color_blocks: Vec<ColorBlock>,
    allow_color_codes: bool,
    position: Vec2,
    scale: Vec2,
    /// Degrees around `position`.
    angle: f32,
    depth: f32,
    color: Color,
    outline_color: Color,
    layout: LayoutOptions,
    sampler: Option<GpuSampler>,
    alpha_test: Option<AlphaTestRange>,
    renderable: BatchRenderable,
}

impl TextSprite {
    pub fn new(font: Arc<Font>, text: impl Into<String>) -> Self {
        let source = text.into();
        Self {
            font,
            text: source.clone(),
            source,
            color_blocks: Vec::new(),
            allow_color_codes: false,
            position: Vec2::ZERO,
            scale: Vec2::ONE,
            angle: 0.0,
            depth: 0.0,
            color: Color::WHITE,
            outline_color: Color::BLACK,
            layout: LayoutOptions::default(),
            sampler: None,
            alpha_test: Some(AlphaTestRange::TRANSPARENT),
            renderable: BatchRenderable::new(),
        }
    }

    pub fn font(&self) -> &Arc<Font> {
        &self.font
    }

    pub fn set_font(&mut self, font: Arc<Font>) {
        self.font = font;
    }

    /// Displayed text, with color markup removed when color codes are allowed.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.source = text.into();
        self.refresh_text();
    }

    pub fn color_blocks(&self) -> &[ColorBlock] {
        &self.color_blocks
    }

    pub fn allow_color_codes(&self) -> bool {
        self.allow_color_codes
    }

    pub fn set_allow_color_codes(&mut self, allow: bool) {
        if self.allow_color_codes != allow {
            self.allow_color_codes = allow;
            self.refresh_text();
        }
    }

    fn refresh_text(&mut self) {
        if self.allow_color_codes {
            (self.text, self.color_blocks) = parse_color_codes(&self.source);
        } else {
            self.text.clone_from(&self.source);
            self.color_blocks.clear();
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn set_scale(&mut self, scale: Vec2) {
        self.scale = scale;
    }

    pub fn set_angle(&mut self, degrees: f32) {
        self.angle = degrees;
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth;
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn set_outline_color(&mut self, color: Color) {
        self.outline_color = color;
    }

    pub fn layout(&self) -> &LayoutOptions {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut LayoutOptions {
        &mut self.layout
    }

    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.layout.alignment = alignment;
    }

    pub fn set_draw_mode(&mut self, mode: TextDrawMode) {
        self.layout.draw_mode = mode;
    }

    pub fn set_sampler(&mut self, sampler: Option<GpuSampler>) {
        self.sampler = sampler;
    }

    pub fn set_alpha_test(&mut self, range: Option<AlphaTestRange>) {
        self.alpha_test = range;
    }

    /// Axis-aligned bounds of the transformed glyph quads.
    pub fn bounds(&self) -> Rect<f32> {
        let local = measure_layout(&self.font, &self.text, &self.layout);
        if local.is_empty() {
            return Rect::ZERO;
        }
        let transform = self.transform();
        Rect::bounding(
            [
                local.top_left(),
                Vec2::new(local.right(), local.top()),
                Vec2::new(local.left(), local.bottom()),
                Vec2::new(local.right(), local.bottom()),
            ]
            .map(|corner| transform.apply(corner)),
        )
    }

    fn transform(&self) -> GlyphTransform {
        let (sin, cos) = self.angle.to_radians().sin_cos();
        GlyphTransform {
            origin: self.position,
            scale: self.scale,
            cos,
            sin,
            depth: self.depth,
            color: self.color,
            outline_color: self.outline_color,
        }
    }

    /// Lay out the glyphs and queue them on `batch`.
    ///
    /// Consecutive glyphs sharing a texture are queued together. When the
    /// texture changes mid-run the accumulated glyphs are queued first, so the
    /// batch flushes before the new texture's glyphs. Returns the glyph count.
    pub(crate) fn render(
        &mut self,
        ctx: &dyn RenderContext,
        state: &ActiveBatchState,
        batch: &mut BatchAccumulator,
    ) -> usize {
        profile_function!();
        let transform = self.transform();
        let Self {
            ref font,
            ref text,
            ref color_blocks,
            ref layout,
            ref sampler,
            alpha_test,
            ref mut renderable,
            ..
        } = *self;

        renderable.set_geometry(0, 0, wgpu::PrimitiveTopology::TriangleList);
        renderable.set_sampler(sampler.as_ref());
        renderable.set_alpha_test(AlphaTestData::from(alpha_test));

        let Ok(count) = layout_text(font, text, layout, color_blocks, |quad| {
            if renderable.texture() != Some(quad.texture) {
                if renderable.index_count() > 0 {
                    queue_segment(ctx, state, batch, renderable);
                }
                renderable.set_texture(Some(quad.texture));
            }
            renderable.push_quad(transform.quad(quad));
            Ok::<_, Infallible>(())
        });

        if renderable.index_count() > 0 {
            queue_segment(ctx, state, batch, renderable);
        }
        count
    }
}

fn queue_segment(
    ctx: &dyn RenderContext,
    state: &ActiveBatchState,
    batch: &mut BatchAccumulator,
    renderable: &mut BatchRenderable,
) {
    renderable.update_bounds();
    batch.render_batch_on_change(ctx, state, renderable, true, false);
    batch.queue(renderable);
    renderable.set_geometry(0, 0, wgpu::PrimitiveTopology::TriangleList);
}

/// Text space to world space for one sprite.
#[derive(Debug, Clone, Copy)]
struct GlyphTransform {
    origin: Vec2,
    scale: Vec2,
    cos: f32,
    sin: f32,
    depth: f32,
    color: Color,
    outline_color: Color,
}

impl GlyphTransform {
    fn apply(&self, local: Vec2) -> Vec2 {
        let p = local * self.scale;
        Vec2::new(
            p.x * self.cos - p.y * self.sin,
            p.x * self.sin + p.y * self.cos,
        ) + self.origin
    }

    /// Corners in TL, TR, BL, BR order.
    fn quad(&self, quad: &GlyphQuad<'_>) -> [Vertex2D; 4] {
        let color = if quad.outline {
            self.outline_color
        } else {
            quad.color.unwrap_or(self.color)
        };
        let texture = quad.texture;
        let array_index = quad.glyph.array_index as f32;
        let region = quad.region;
        let corners = [
            (Vec2::ZERO, region.top_left()),
            (Vec2::new(quad.size.x, 0.0), Vec2::new(region.right(), region.top())),
            (Vec2::new(0.0, quad.size.y), Vec2::new(region.left(), region.bottom())),
            (quad.size, Vec2::new(region.right(), region.bottom())),
        ];
        corners.map(|(offset, texel)| {
            let mut vertex = Vertex2D::new(
                self.apply(quad.position + offset),
                self.depth,
                color,
                texture.to_uv(texel),
                array_index,
            );
            vertex.angle = [self.cos, self.sin];
            vertex
        })
    }
}
