//! Inline color markup for text runs.
//!
//! A run of text wrapped in `[c #RRGGBB]...[/c]` (or `[c #RRGGBBAA]`) is drawn
//! in that color. Tags are matched case-insensitively and do not nest; a tag
//! that cannot be parsed stays in the text as written.

use crate::color::Color;

const OPEN_TAG: &str = "[c";
const CLOSE_TAG: &str = "[/c]";

/// A color override for an inclusive range of character indices.
///
/// Indices count `char`s of the text with markup removed, newlines included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorBlock {
    pub start: usize,
    pub end: usize,
    pub color: Color,
}

impl ColorBlock {
    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index <= self.end
    }
}

/// Whether `text` has both an opening and a closing tag.
pub fn has_color_codes(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains(OPEN_TAG) && lower.contains(CLOSE_TAG)
}

/// Strip color markup from `text`, returning the plain text and its blocks.
///
/// ```
/// use tessera_render::text::parse_color_codes;
///
/// let (plain, blocks) = parse_color_codes("a [c #FF0000]red[/c] word");
/// assert_eq!(plain, "a red word");
/// assert_eq!((blocks[0].start, blocks[0].end), (2, 4));
/// ```
pub fn parse_color_codes(text: &str) -> (String, Vec<ColorBlock>) {
    let mut plain = String::with_capacity(text.len());
    let mut blocks = Vec::new();
    let mut emitted = 0usize;
    let mut rest = text;

    while let Some(open) = find_ignore_case(rest, OPEN_TAG) {
        let (before, tag) = rest.split_at(open);
        let Some((color, tag_len)) = parse_open_tag(tag) else {
            // Not a color tag; keep the bracket and scan past it.
            plain.push_str(before);
            plain.push('[');
            emitted += before.chars().count() + 1;
            rest = &tag[1..];
            continue;
        };

        let body_and_rest = &tag[tag_len..];
        let Some(close) = find_ignore_case(body_and_rest, CLOSE_TAG) else {
            break;
        };
        let body = &body_and_rest[..close];

        plain.push_str(before);
        emitted += before.chars().count();
        let len = body.chars().count();
        if len > 0 {
            blocks.push(ColorBlock {
                start: emitted,
                end: emitted + len - 1,
                color,
            });
        }
        plain.push_str(body);
        emitted += len;
        rest = &body_and_rest[close + CLOSE_TAG.len()..];
    }

    plain.push_str(rest);
    (plain, blocks)
}

/// The color block covering character `index`, if any.
pub fn color_for_character(index: usize, blocks: &[ColorBlock]) -> Option<Color> {
    blocks
        .iter()
        .find(|block| block.contains(index))
        .map(|block| block.color)
}

// ASCII lowercasing keeps byte offsets, so the index is valid in `haystack`.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(needle)
}

/// Parse `[c #RRGGBB]` or `[c #RRGGBBAA]` at the start of `tag`.
/// Returns the color and the tag length in bytes.
fn parse_open_tag(tag: &str) -> Option<(Color, usize)> {
    let end = tag.find(']')?;
    let inner = tag.get(OPEN_TAG.len()..end)?;
    let hex = inner.trim_start().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let value = u32::from_str_radix(hex, 16).ok()?;
    let color = match hex.len() {
        6 => Color::from_hex(value),
        8 => Color::from_hex_alpha(value),
        _ => return None,
    };
    Some((color, end + 1))
}
