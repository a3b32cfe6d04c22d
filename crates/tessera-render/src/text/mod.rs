//! Bitmap-font text: glyph metrics, layout, color markup and text sprites.

mod color_codes;
mod font;
mod layout;
mod sprite;

pub use color_codes::{ColorBlock, color_for_character, has_color_codes, parse_color_codes};
pub use font::{DEFAULT_TAB_SPACES, Font, Glyph, KerningPair};
pub use layout::{Alignment, GlyphQuad, LayoutOptions, TextDrawMode, layout_text, measure_layout};
pub use sprite::TextSprite;
