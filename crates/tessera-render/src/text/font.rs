//! Glyph metrics for pre-rasterized fonts.
//!
//! A [`Font`] does not rasterize anything. Glyph bitmaps live in textures
//! produced elsewhere; the font only records where each glyph sits in its
//! texture and how far it advances the pen.

use glam::Vec2;
use tessera_core::alloc::HashMap;
use tessera_core::geometry::{Rect, Size};
use tessera_core::math::floor_px;

use crate::texture::Texture2D;

/// Tab width, in spaces, used when no layout options say otherwise.
pub const DEFAULT_TAB_SPACES: u32 = 4;

/// Placement of one character in a glyph texture.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub character: char,
    /// Horizontal pen advance in pixels.
    pub advance: f32,
    /// Offset of the bitmap from the pen position.
    pub offset: Vec2,
    /// `None` for glyphs without a bitmap, such as spaces.
    pub texture: Option<Texture2D>,
    /// Pixel rectangle of the bitmap in `texture`.
    pub region: Rect<f32>,
    /// Pixel rectangle of the outline bitmap. Empty when the glyph has no outline.
    pub outline_region: Rect<f32>,
    pub outline_offset: Vec2,
    pub array_index: u32,
}

impl Glyph {
    /// A glyph that only advances the pen.
    pub fn new(character: char, advance: f32) -> Self {
        Self {
            character,
            advance,
            offset: Vec2::ZERO,
            texture: None,
            region: Rect::ZERO,
            outline_region: Rect::ZERO,
            outline_offset: Vec2::ZERO,
            array_index: 0,
        }
    }

    pub fn with_bitmap(mut self, texture: Texture2D, region: Rect<f32>, offset: Vec2) -> Self {
        self.texture = Some(texture);
        self.region = region;
        self.offset = offset;
        self
    }

    pub fn with_outline(mut self, region: Rect<f32>, offset: Vec2) -> Self {
        self.outline_region = region;
        self.outline_offset = offset;
        self
    }

    pub fn with_array_index(mut self, index: u32) -> Self {
        self.array_index = index;
        self
    }

    pub fn has_outline(&self) -> bool {
        !self.outline_region.is_empty()
    }

    /// Bitmap rectangle and offset for the fill or the outline pass.
    pub fn placement(&self, outline: bool) -> (Rect<f32>, Vec2) {
        if outline && self.has_outline() {
            (self.outline_region, self.outline_offset)
        } else {
            (self.region, self.offset)
        }
    }
}

/// Ordered character pair for kerning lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KerningPair {
    pub left: char,
    pub right: char,
}

impl KerningPair {
    pub fn new(left: char, right: char) -> Self {
        Self { left, right }
    }
}

/// A set of glyphs sharing a line height and kerning table.
#[derive(Debug, Clone)]
pub struct Font {
    name: String,
    line_height: f32,
    glyphs: HashMap<char, Glyph>,
    default_character: char,
    kerning: HashMap<KerningPair, f32>,
    use_kerning: bool,
    outline_size: f32,
}

impl Font {
    pub fn new(name: impl Into<String>, line_height: f32) -> Self {
        Self {
            name: name.into(),
            line_height,
            glyphs: HashMap::new(),
            default_character: ' ',
            kerning: HashMap::new(),
            use_kerning: true,
            outline_size: 0.0,
        }
    }

    pub fn with_glyph(mut self, glyph: Glyph) -> Self {
        self.insert_glyph(glyph);
        self
    }

    pub fn with_kerning(mut self, left: char, right: char, amount: f32) -> Self {
        self.kerning.insert(KerningPair::new(left, right), amount);
        self
    }

    /// Character drawn in place of any character the font lacks.
    pub fn with_default_character(mut self, character: char) -> Self {
        self.default_character = character;
        self
    }

    pub fn with_outline_size(mut self, size: f32) -> Self {
        self.outline_size = size.max(0.0);
        self
    }

    pub fn insert_glyph(&mut self, glyph: Glyph) {
        self.glyphs.insert(glyph.character, glyph);
    }

    pub fn set_use_kerning(&mut self, enabled: bool) {
        self.use_kerning = enabled;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    pub fn default_character(&self) -> char {
        self.default_character
    }

    pub fn outline_size(&self) -> f32 {
        self.outline_size
    }

    pub fn has_outline(&self) -> bool {
        self.outline_size > 0.0
    }

    /// Kerning is applied only when enabled and the table has entries.
    pub fn uses_kerning(&self) -> bool {
        self.use_kerning && !self.kerning.is_empty()
    }

    pub fn glyph(&self, character: char) -> Option<&Glyph> {
        self.glyphs.get(&character)
    }

    /// The glyph for `character`, or the default character's glyph.
    pub fn glyph_or_default(&self, character: char) -> Option<&Glyph> {
        self.glyphs
            .get(&character)
            .or_else(|| self.glyphs.get(&self.default_character))
    }

    pub fn kerning(&self, left: char, right: char) -> Option<f32> {
        self.kerning.get(&KerningPair::new(left, right)).copied()
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Pixel width of one line.
    ///
    /// Whitespace advances by its glyph; tabs by `tab_spaces` advances. The
    /// first visible glyph contributes its bitmap offset as well.
    pub fn line_width(&self, line: &str, outline: bool, tab_spaces: u32) -> f32 {
        let outline = outline && self.has_outline();
        let kerning = self.uses_kerning();
        let mut width = 0.0;
        let mut first = true;
        let mut chars = line.chars().peekable();

        while let Some(character) = chars.next() {
            if character == '\r' || character == '\n' {
                continue;
            }
            let Some(glyph) = self.glyph_or_default(character) else {
                continue;
            };
            if character == '\t' {
                width += glyph.advance * tab_spaces as f32;
                continue;
            }
            if character.is_whitespace() {
                width += glyph.advance;
                continue;
            }
            if first {
                width += glyph.placement(outline).1.x;
                first = false;
            }
            width += glyph.advance;
            if kerning {
                if let Some(amount) = chars.peek().and_then(|&next| self.kerning(character, next)) {
                    width += amount;
                }
            }
        }

        if outline {
            width += self.outline_size;
        }
        width
    }

    /// Width and spaced height of a single line.
    pub fn measure_line(&self, line: &str, outline: bool, line_spacing: f32) -> Size<f32> {
        if line.is_empty() {
            return Size::default();
        }
        Size::new(
            self.line_width(line, outline, DEFAULT_TAB_SPACES),
            floor_px(self.line_height) * line_spacing,
        )
    }

    /// Size of a block of text split on `'\n'`.
    ///
    /// Line spacing stretches the gaps between lines but not the last line.
    pub fn measure_text(
        &self,
        text: &str,
        outline: bool,
        tab_spaces: u32,
        line_spacing: f32,
    ) -> Size<f32> {
        if text.is_empty() {
            return Size::default();
        }
        let outline = outline && self.has_outline();
        let line_height = floor_px(self.line_height);
        let mut lines = 0usize;
        let mut width: f32 = 0.0;
        for line in text.split('\n') {
            lines += 1;
            width = width.max(self.line_width(line, outline, tab_spaces.max(1)));
        }

        let mut height = (lines - 1) as f32 * line_height * line_spacing + line_height;
        if outline {
            height += self.outline_size * 0.5;
        }
        Size::new(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_device::MockRenderContext;

    fn font(mock: &MockRenderContext) -> Font {
        let texture = Texture2D::from_rgba8(mock, "glyphs", 64, 64, &[0; 64 * 64 * 4]).unwrap();
        let glyph = |c: char, x: f32| {
            Glyph::new(c, 10.0).with_bitmap(
                texture.clone(),
                Rect::new(x, 0.0, 8.0, 12.0),
                Vec2::new(1.0, 2.0),
            )
        };
        Font::new("test", 16.5)
            .with_glyph(glyph('A', 0.0))
            .with_glyph(glyph('V', 8.0))
            .with_glyph(Glyph::new(' ', 5.0))
            .with_glyph(Glyph::new('\t', 5.0))
            .with_kerning('A', 'V', -2.0)
    }

    #[test]
    fn test_default_glyph_substitution() {
        let mock = MockRenderContext::new();
        let font = font(&mock);
        assert_eq!(font.glyph_or_default('Z').map(|g| g.character), Some(' '));
        let font = font.with_default_character('?');
        assert!(font.glyph_or_default('Z').is_none());
    }

    #[test]
    fn test_line_width_applies_offset_and_kerning() {
        let mock = MockRenderContext::new();
        let font = font(&mock);
        // offset 1 + A 10 - kern 2 + V 10
        assert_eq!(font.line_width("AV", false, 4), 19.0);
        assert_eq!(font.line_width("A V", false, 4), 26.0);
        assert_eq!(font.line_width("A\tV", false, 4), 41.0);
    }

    #[test]
    fn test_line_width_without_kerning() {
        let mock = MockRenderContext::new();
        let mut font = font(&mock);
        font.set_use_kerning(false);
        assert!(!font.uses_kerning());
        assert_eq!(font.line_width("AV", false, 4), 21.0);
    }

    #[test]
    fn test_measure_text_spacing_skips_last_line() {
        let mock = MockRenderContext::new();
        let font = font(&mock);
        let size = font.measure_text("A\nAV", false, 4, 2.0);
        // line height floors to 16; one stretched gap plus one plain line
        assert_eq!(size.height, 48.0);
        assert_eq!(size.width, 19.0);
        assert_eq!(font.measure_text("", false, 4, 1.0), Size::default());
    }

    #[test]
    fn test_outline_adds_size() {
        let mock = MockRenderContext::new();
        let font = font(&mock).with_outline_size(2.0);
        assert!(font.has_outline());
        assert_eq!(font.measure_line("A", true, 1.0).width, 13.0);
        assert_eq!(font.measure_line("A", false, 1.0).width, 11.0);
        assert_eq!(font.measure_text("A", true, 4, 1.0).height, 17.0);
    }
}
