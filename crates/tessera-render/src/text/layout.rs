//! Text layout: turns a string and a font into positioned glyph quads.
//!
//! Layout runs line by line. Each line is laid out once per pass: an outline
//! pass first when outlines are drawn, then the fill pass. Quads are handed
//! to a callback in draw order, so the caller can flush when a glyph's
//! texture changes mid-line.

use std::convert::Infallible;

use glam::Vec2;
use tessera_core::geometry::{Rect, Size};
use tessera_core::math::floor_px;
use tessera_core::profiling::profile_function;

use super::color_codes::{ColorBlock, color_for_character};
use super::font::{DEFAULT_TAB_SPACES, Font, Glyph};
use crate::color::Color;
use crate::texture::Texture2D;

/// Where lines sit inside the layout area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Alignment {
    #[default]
    UpperLeft,
    UpperCenter,
    UpperRight,
    CenterLeft,
    Center,
    CenterRight,
    LowerLeft,
    LowerCenter,
    LowerRight,
}

impl Alignment {
    /// Horizontal factor: 0 left, 0.5 centre, 1 right.
    fn horizontal(self) -> f32 {
        match self {
            Alignment::UpperLeft | Alignment::CenterLeft | Alignment::LowerLeft => 0.0,
            Alignment::UpperCenter | Alignment::Center | Alignment::LowerCenter => 0.5,
            Alignment::UpperRight | Alignment::CenterRight | Alignment::LowerRight => 1.0,
        }
    }

    /// Vertical factor: 0 top, 0.5 centre, 1 bottom.
    fn vertical(self) -> f32 {
        match self {
            Alignment::UpperLeft | Alignment::UpperCenter | Alignment::UpperRight => 0.0,
            Alignment::CenterLeft | Alignment::Center | Alignment::CenterRight => 0.5,
            Alignment::LowerLeft | Alignment::LowerCenter | Alignment::LowerRight => 1.0,
        }
    }
}

/// Which passes a text run draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextDrawMode {
    #[default]
    GlyphsOnly,
    /// Outline pass, then fill pass.
    OutlinedGlyphs,
    OutlineOnly,
}

/// Per-run layout parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub alignment: Alignment,
    /// Area lines are aligned within. The measured text size when `None`.
    pub layout_area: Option<Size<f32>>,
    /// Spaces a tab advances by.
    pub tab_spaces: u32,
    /// Multiplier on the floored line height.
    pub line_spacing: f32,
    pub draw_mode: TextDrawMode,
    /// Apply the font's kerning table, when it has one.
    pub kerning: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            alignment: Alignment::UpperLeft,
            layout_area: None,
            tab_spaces: DEFAULT_TAB_SPACES,
            line_spacing: 1.0,
            draw_mode: TextDrawMode::GlyphsOnly,
            kerning: true,
        }
    }
}

/// One glyph bitmap placed in text space.
#[derive(Debug, Clone, Copy)]
pub struct GlyphQuad<'a> {
    pub glyph: &'a Glyph,
    pub texture: &'a Texture2D,
    /// Top-left corner relative to the text origin.
    pub position: Vec2,
    pub size: Vec2,
    /// Pixel rectangle in `texture`.
    pub region: Rect<f32>,
    pub outline: bool,
    /// Color-block override. Never set on outline quads.
    pub color: Option<Color>,
}

impl GlyphQuad<'_> {
    pub fn bounds(&self) -> Rect<f32> {
        Rect::new(self.position.x, self.position.y, self.size.x, self.size.y)
    }
}

/// Lay out `text`, calling `emit` for every visible glyph quad.
///
/// Returns the number of quads emitted. An error from `emit` stops the layout.
pub fn layout_text<'f, E>(
    font: &'f Font,
    text: &str,
    options: &LayoutOptions,
    color_blocks: &[ColorBlock],
    mut emit: impl FnMut(&GlyphQuad<'f>) -> Result<(), E>,
) -> Result<usize, E> {
    profile_function!();
    if text.is_empty() {
        return Ok(0);
    }

    let draw_outlines = options.draw_mode != TextDrawMode::GlyphsOnly && font.has_outline();
    let passes: &[bool] = match (draw_outlines, options.draw_mode) {
        (true, TextDrawMode::OutlinedGlyphs) => &[true, false],
        (true, _) => &[true],
        (false, _) => &[false],
    };
    let kerning = options.kerning && font.uses_kerning();
    let tab_spaces = options.tab_spaces.max(1);
    let line_advance = floor_px(font.line_height()) * options.line_spacing;
    let aligned = options.alignment != Alignment::UpperLeft;

    let text_size = if aligned {
        font.measure_text(text, draw_outlines, tab_spaces, options.line_spacing)
    } else {
        Size::default()
    };
    let area = options.layout_area.unwrap_or(text_size);
    let offset_y = ((area.height - text_size.height) * options.alignment.vertical()).trunc();

    let mut emitted = 0usize;
    let mut char_index = 0usize;
    let mut pen_y = 0.0;

    for line in text.split('\n') {
        let line_chars = line.chars().count();

        for &outline_pass in passes {
            let offset_x = if aligned {
                let width = font.line_width(line, outline_pass, tab_spaces);
                ((area.width - width) * options.alignment.horizontal()).trunc()
            } else {
                0.0
            };

            let mut pen_x = 0.0;
            let mut chars = line.chars().enumerate().peekable();
            while let Some((i, character)) = chars.next() {
                let Some(glyph) = font.glyph_or_default(character) else {
                    continue;
                };

                let texture = match &glyph.texture {
                    Some(texture) if !character.is_whitespace() => texture,
                    _ => {
                        if character == '\t' {
                            pen_x += glyph.advance * tab_spaces as f32;
                        } else if character != '\r' {
                            pen_x += glyph.advance;
                        }
                        continue;
                    }
                };

                let color = if outline_pass {
                    None
                } else {
                    color_for_character(char_index + i, color_blocks)
                };
                let (region, offset) = glyph.placement(outline_pass);
                let quad = GlyphQuad {
                    glyph,
                    texture,
                    position: Vec2::new(pen_x + offset.x + offset_x, pen_y + offset.y + offset_y),
                    size: Vec2::new(region.width, region.height),
                    region,
                    outline: outline_pass,
                    color,
                };
                emit(&quad)?;
                emitted += 1;

                pen_x += glyph.advance;
                if kerning {
                    if let Some(amount) = chars
                        .peek()
                        .and_then(|&(_, next)| font.kerning(character, next))
                    {
                        pen_x += amount;
                    }
                }
            }
        }

        // The newline counts as a character for color blocks.
        char_index += line_chars + 1;
        pen_y += line_advance;
    }

    Ok(emitted)
}

/// Bounds of every glyph quad `text` would produce, relative to its origin.
///
/// Text without visible glyphs measures to an empty rectangle.
pub fn measure_layout(font: &Font, text: &str, options: &LayoutOptions) -> Rect<f32> {
    let mut corners = Vec::new();
    let Ok(_) = layout_text(font, text, options, &[], |quad| {
        corners.push(quad.position);
        corners.push(quad.position + quad.size);
        Ok::<_, Infallible>(())
    });
    Rect::bounding(corners)
}
