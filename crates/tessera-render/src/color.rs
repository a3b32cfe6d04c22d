use crate::error::{RenderError, RenderResult};

/// A linear RGBA color with `f32` components.
///
/// `#[repr(C)]` and `Pod`, so it is written straight into vertex data.
///
/// ```
/// use tessera_render::Color;
///
/// let orange = Color::from_hex(0xFF8800);
/// let faded = Color::WHITE.with_alpha(0.5);
/// let parsed = Color::try_from([1.0, 0.5, 0.0, 1.0].as_slice()).unwrap();
/// assert_eq!(parsed, Color::rgb(1.0, 0.5, 0.0));
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// From a 24-bit `0xRRGGBB` value, fully opaque.
    pub fn from_hex(hex: u32) -> Self {
        Self::from_rgba_u8((hex >> 16) as u8, (hex >> 8) as u8, hex as u8, 255)
    }

    /// From a 32-bit `0xRRGGBBAA` value.
    pub fn from_hex_alpha(hex: u32) -> Self {
        Self::from_rgba_u8((hex >> 24) as u8, (hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Component-wise product, used to tint glyph and sprite colors.
    pub fn modulate(self, other: Color) -> Self {
        Self::rgba(
            self.r * other.r,
            self.g * other.g,
            self.b * other.b,
            self.a * other.a,
        )
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[f32; 4]> for Color {
    fn from(arr: [f32; 4]) -> Self {
        Self::rgba(arr[0], arr[1], arr[2], arr[3])
    }
}

impl From<Color> for [f32; 4] {
    fn from(color: Color) -> Self {
        color.to_array()
    }
}

impl TryFrom<&[f32]> for Color {
    type Error = RenderError;

    /// Accepts exactly four components.
    fn try_from(values: &[f32]) -> RenderResult<Self> {
        match values {
            [r, g, b, a] => Ok(Self::rgba(*r, *g, *b, *a)),
            _ => Err(RenderError::InvalidArgument(format!(
                "color needs 4 components, got {}",
                values.len()
            ))),
        }
    }
}
