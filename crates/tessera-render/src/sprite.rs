//! Textured, transformable quads.

use bitflags::bitflags;
use glam::Vec2;
use tessera_core::geometry::Rect;
use tessera_device::GpuSampler;

use crate::color::Color;
use crate::renderable::{AlphaTestData, AlphaTestRange, BatchRenderable};
use crate::texture::Texture2D;

bitflags! {
    /// Which parts of a sprite's vertices are stale.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct SpriteDirty: u8 {
        /// Position, size, anchor, scale or angle changed.
        const TRANSFORM = 0b0001;
        const COLORS    = 0b0010;
        /// Texture region or flips changed.
        const UVS       = 0b0100;
        const DEPTH     = 0b1000;
    }
}

/// Corner order shared by colors and vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    UpperLeft = 0,
    UpperRight = 1,
    LowerLeft = 2,
    LowerRight = 3,
}

/// A quad with an optional texture, drawn through the shared batch.
///
/// Vertices are rebuilt lazily: setters only mark what changed, and the next
/// draw recomputes the affected attributes.
///
/// ```
/// use glam::Vec2;
/// use tessera_render::Sprite;
///
/// let mut sprite = Sprite::new(Vec2::new(32.0, 16.0));
/// sprite.set_position(Vec2::new(100.0, 100.0));
/// sprite.set_anchor(Vec2::new(16.0, 8.0));
/// assert_eq!(sprite.bounds().top_left(), Vec2::new(84.0, 92.0));
/// ```
#[derive(Debug, Clone)]
pub struct Sprite {
    position: Vec2,
    size: Vec2,
    /// Pivot in unscaled local pixels.
    anchor: Vec2,
    scale: Vec2,
    /// Degrees.
    angle: f32,
    depth: f32,
    colors: [Color; 4],
    texture: Option<Texture2D>,
    /// Normalized region of `texture`.
    texture_region: Rect<f32>,
    array_index: u32,
    sampler: Option<GpuSampler>,
    alpha_test: Option<AlphaTestRange>,
    flip_horizontal: bool,
    flip_vertical: bool,
    renderable: BatchRenderable,
    dirty: SpriteDirty,
}

impl Sprite {
    pub fn new(size: Vec2) -> Self {
        Self {
            position: Vec2::ZERO,
            size,
            anchor: Vec2::ZERO,
            scale: Vec2::ONE,
            angle: 0.0,
            depth: 0.0,
            colors: [Color::WHITE; 4],
            texture: None,
            texture_region: Rect::new(0.0, 0.0, 1.0, 1.0),
            array_index: 0,
            sampler: None,
            alpha_test: Some(AlphaTestRange::TRANSPARENT),
            flip_horizontal: false,
            flip_vertical: false,
            renderable: BatchRenderable::quad(),
            dirty: SpriteDirty::all(),
        }
    }

    /// A sprite the size of `texture`, showing all of it.
    pub fn from_texture(texture: Texture2D) -> Self {
        let mut sprite = Self::new(texture.size());
        sprite.set_texture(Some(texture));
        sprite
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        self.dirty |= SpriteDirty::TRANSFORM;
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
        self.dirty |= SpriteDirty::TRANSFORM;
    }

    pub fn set_anchor(&mut self, anchor: Vec2) {
        self.anchor = anchor;
        self.dirty |= SpriteDirty::TRANSFORM;
    }

    pub fn set_scale(&mut self, scale: Vec2) {
        self.scale = scale;
        self.dirty |= SpriteDirty::TRANSFORM;
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn set_angle(&mut self, degrees: f32) {
        self.angle = degrees;
        self.dirty |= SpriteDirty::TRANSFORM;
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth;
        self.dirty |= SpriteDirty::DEPTH;
    }

    /// Set every corner to one color.
    pub fn set_color(&mut self, color: Color) {
        self.colors = [color; 4];
        self.dirty |= SpriteDirty::COLORS;
    }

    pub fn set_corner_color(&mut self, corner: Corner, color: Color) {
        self.colors[corner as usize] = color;
        self.dirty |= SpriteDirty::COLORS;
    }

    pub fn corner_color(&self, corner: Corner) -> Color {
        self.colors[corner as usize]
    }

    pub fn texture(&self) -> Option<&Texture2D> {
        self.texture.as_ref()
    }

    pub fn set_texture(&mut self, texture: Option<Texture2D>) {
        self.renderable.set_texture(texture.as_ref());
        self.texture = texture;
        self.dirty |= SpriteDirty::UVS;
    }

    /// Normalized sub-rectangle of the texture to show.
    pub fn set_texture_region(&mut self, region: Rect<f32>) {
        self.texture_region = region;
        self.dirty |= SpriteDirty::UVS;
    }

    pub fn set_texture_array_index(&mut self, index: u32) {
        self.array_index = index;
        self.dirty |= SpriteDirty::UVS;
    }

    pub fn set_sampler(&mut self, sampler: Option<GpuSampler>) {
        self.renderable.set_sampler(sampler.as_ref());
        self.sampler = sampler;
    }

    pub fn set_alpha_test(&mut self, range: Option<AlphaTestRange>) {
        self.alpha_test = range;
        self.renderable.set_alpha_test(AlphaTestData::from(range));
    }

    pub fn set_flip_horizontal(&mut self, flip: bool) {
        self.flip_horizontal = flip;
        self.dirty |= SpriteDirty::UVS;
    }

    pub fn set_flip_vertical(&mut self, flip: bool) {
        self.flip_vertical = flip;
        self.dirty |= SpriteDirty::UVS;
    }

    /// World-space corners in upper-left, upper-right, lower-left, lower-right order.
    pub fn corners(&self) -> [Vec2; 4] {
        let (sin, cos) = self.angle.to_radians().sin_cos();
        let local = [
            Vec2::ZERO,
            Vec2::new(self.size.x, 0.0),
            Vec2::new(0.0, self.size.y),
            self.size,
        ];
        local.map(|corner| {
            let p = (corner - self.anchor) * self.scale;
            Vec2::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos) + self.position
        })
    }

    /// Axis-aligned bounds of the transformed quad.
    pub fn bounds(&self) -> Rect<f32> {
        Rect::bounding(self.corners())
    }

    fn uvs(&self) -> [Vec2; 4] {
        let r = self.texture_region;
        let (left, right) = if self.flip_horizontal {
            (r.right(), r.left())
        } else {
            (r.left(), r.right())
        };
        let (top, bottom) = if self.flip_vertical {
            (r.bottom(), r.top())
        } else {
            (r.top(), r.bottom())
        };
        [
            Vec2::new(left, top),
            Vec2::new(right, top),
            Vec2::new(left, bottom),
            Vec2::new(right, bottom),
        ]
    }

    /// Rebuild stale vertex attributes and return the renderable.
    pub(crate) fn update(&mut self) -> &mut BatchRenderable {
        if self.dirty.is_empty() {
            return &mut self.renderable;
        }

        let dirty = self.dirty;
        let corners = self.corners();
        let uvs = self.uvs();
        let (sin, cos) = self.angle.to_radians().sin_cos();
        let array_index = self.array_index as f32;
        let vertices = self.renderable.active_vertices_mut();

        for (i, vertex) in vertices.iter_mut().enumerate() {
            if dirty.contains(SpriteDirty::TRANSFORM) {
                vertex.position[0] = corners[i].x;
                vertex.position[1] = corners[i].y;
                vertex.angle = [cos, sin];
            }
            if dirty.contains(SpriteDirty::DEPTH) {
                vertex.position[2] = self.depth;
            }
            if dirty.contains(SpriteDirty::COLORS) {
                vertex.color = self.colors[i].to_array();
            }
            if dirty.contains(SpriteDirty::UVS) {
                vertex.uv = [uvs[i].x, uvs[i].y, array_index, 1.0];
            }
        }

        if dirty.contains(SpriteDirty::TRANSFORM) {
            self.renderable.update_bounds();
        }
        self.dirty = SpriteDirty::empty();
        &mut self.renderable
    }
}
