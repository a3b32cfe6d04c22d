//! Orthographic 2D camera.
//!
//! World units map to pixels at zoom 1. The y axis points down, matching
//! sprite and text layout coordinates.
//!
//! ```
//! use glam::Vec2;
//! use tessera_render::Camera2D;
//!
//! let mut camera = Camera2D::new();
//! camera.set_position(Vec2::new(100.0, 50.0));
//! let world = camera.screen_to_world(Vec2::ZERO, Vec2::new(800.0, 600.0));
//! assert_eq!(world, Vec2::new(100.0, 50.0));
//! ```

use glam::{Mat4, Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera2D {
    /// World position shown at the top-left of the view.
    position: Vec2,
    zoom: f32,
    /// Degrees, rotating around the view center.
    rotation: f32,
    /// Explicit view size; the viewport size is used when `None`.
    size: Option<Vec2>,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera2D {
    pub fn new() -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: 1.0,
            rotation: 0.0,
            size: None,
        }
    }

    /// A camera with a fixed view size independent of the viewport.
    pub fn with_size(width: f32, height: f32) -> Self {
        Self {
            size: Some(Vec2::new(width, height)),
            ..Self::new()
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Values below a tiny epsilon are clamped to keep the projection invertible.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.max(f32::EPSILON);
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation = degrees;
    }

    pub fn size(&self) -> Option<Vec2> {
        self.size
    }

    /// Size of the visible area for a given viewport.
    pub fn view_size(&self, viewport: Vec2) -> Vec2 {
        self.size.unwrap_or(viewport)
    }

    pub fn view_matrix(&self, viewport: Vec2) -> Mat4 {
        let center = (self.view_size(viewport) * 0.5).extend(0.0);
        Mat4::from_translation(center)
            * Mat4::from_rotation_z(-self.rotation.to_radians())
            * Mat4::from_scale(Vec3::new(self.zoom, self.zoom, 1.0))
            * Mat4::from_translation(-center - self.position.extend(0.0))
    }

    /// Pixel-space orthographic projection with depth in `0..=1`.
    pub fn projection_matrix(&self, viewport: Vec2) -> Mat4 {
        let size = self.view_size(viewport);
        Mat4::orthographic_lh(0.0, size.x, size.y, 0.0, 0.0, 1.0)
    }

    pub fn view_projection(&self, viewport: Vec2) -> Mat4 {
        self.projection_matrix(viewport) * self.view_matrix(viewport)
    }

    /// Convert a viewport pixel position to world coordinates.
    pub fn screen_to_world(&self, screen: Vec2, viewport: Vec2) -> Vec2 {
        let size = self.view_size(viewport);
        let view_point = screen * size / viewport.max(Vec2::ONE);
        self.view_matrix(viewport)
            .inverse()
            .transform_point3(view_point.extend(0.0))
            .truncate()
    }
}
