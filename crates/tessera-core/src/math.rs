//! Math re-exports and small scalar helpers.

pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

/// Round toward negative infinity, matching pixel snapping used by text layout.
#[inline]
pub fn floor_px(value: f32) -> f32 {
    value.floor()
}

/// Round toward positive infinity, used when snapping line vertices.
#[inline]
pub fn ceil_px(value: f32) -> f32 {
    value.ceil()
}

/// Normalise an angle in degrees by removing whole turns above 360.
///
/// Angles above 360 map into `(0, 360]`, so 720 stays a full turn. Angles up
/// to 360 (including negative ones) are returned unchanged.
pub fn wrap_degrees(degrees: f32) -> f32 {
    if !degrees.is_finite() || degrees <= 360.0 {
        return degrees;
    }
    let rest = degrees % 360.0;
    if rest == 0.0 { 360.0 } else { rest }
}
