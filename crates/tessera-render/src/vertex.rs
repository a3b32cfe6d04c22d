//! The vertex format shared by every batched 2D draw.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use static_assertions::const_assert_eq;
use tessera_device::InputLayout;

use crate::color::Color;

/// One 2D vertex, 56 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex2D {
    /// `(x, y, depth, 1)`.
    pub position: [f32; 4],
    pub color: [f32; 4],
    /// `(u, v, texture array index, w)`.
    pub uv: [f32; 4],
    /// Rotation of the owning shape as `(cos, sin)`.
    pub angle: [f32; 2],
}

const_assert_eq!(std::mem::size_of::<Vertex2D>(), 56);

impl Default for Vertex2D {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0, 1.0],
            color: Color::WHITE.to_array(),
            uv: [0.0, 0.0, 0.0, 1.0],
            angle: [1.0, 0.0],
        }
    }
}

impl Vertex2D {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        // position (vec4)
        0 => Float32x4,
        // color (vec4)
        1 => Float32x4,
        // uv + array index (vec4)
        2 => Float32x4,
        // angle cos/sin (vec2)
        3 => Float32x2,
    ];

    pub fn new(position: Vec2, depth: f32, color: Color, uv: Vec2, array_index: f32) -> Self {
        Self {
            position: [position.x, position.y, depth, 1.0],
            color: color.to_array(),
            uv: [uv.x, uv.y, array_index, 1.0],
            angle: [1.0, 0.0],
        }
    }

    /// Input layout for the default sprite pipelines.
    pub fn input_layout() -> InputLayout {
        InputLayout::new(std::mem::size_of::<Vertex2D>() as u64, &Self::ATTRIBUTES)
    }

    #[inline]
    pub fn xy(&self) -> Vec2 {
        Vec2::new(self.position[0], self.position[1])
    }

    /// Write position, color and uv in one go, leaving `angle` untouched.
    #[inline]
    pub fn set(&mut self, position: Vec2, depth: f32, color: Color, uv: Vec2, array_index: f32) {
        self.position = [position.x, position.y, depth, 1.0];
        self.color = color.to_array();
        self.uv = [uv.x, uv.y, array_index, 1.0];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_offsets() {
        let offsets: Vec<u64> = Vertex2D::ATTRIBUTES.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 16, 32, 48]);
        assert_eq!(Vertex2D::input_layout().stride, 56);
    }

    #[test]
    fn test_vertex_new() {
        let v = Vertex2D::new(Vec2::new(1.0, 2.0), 0.5, Color::RED, Vec2::new(0.25, 0.75), 3.0);
        assert_eq!(v.position, [1.0, 2.0, 0.5, 1.0]);
        assert_eq!(v.uv, [0.25, 0.75, 3.0, 1.0]);
        assert_eq!(v.xy(), Vec2::new(1.0, 2.0));
    }
}
