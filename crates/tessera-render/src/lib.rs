//! Tessera Render
//!
//! A batching 2D renderer on top of the [`tessera_device::RenderContext`]
//! device contract. Sprites, text, procedural primitives and polygon meshes
//! are drawn between [`Renderer2D::begin`] and [`Renderer2D::end`]; adjacent
//! draws that share texture, sampler and alpha test are merged into one
//! submission, and submissions keep the order of the draws that produced them.
//!
//! # Overview
//!
//! - [`Renderer2D`] - session control and the draw API
//! - [`Sprite`], [`text::TextSprite`], [`PolygonSprite`] - long-lived drawables
//! - [`primitives`] - tessellation of rectangles, lines, ellipses and arcs
//! - [`text`] - bitmap fonts, layout and color markup
//! - [`SharedResources`] - default shaders, textures and samplers, created once

mod batch;
mod blend;
mod camera;
mod color;
mod constants;
mod draw_call;
mod error;
mod init;
mod polygon;
pub mod primitives;
mod renderable;
mod renderer;
mod sprite;
mod staging;
mod state;
pub mod text;
mod texture;
mod vertex;

pub use batch::{BatchAccumulator, BatchStats, DefaultStages};
pub use blend::BlendMode;
pub use camera::Camera2D;
pub use color::Color;
pub use constants::{ConstantBuffer, ConstantDataManager, PolygonData, TimingData};
pub use draw_call::DrawCallFactory;
pub use error::{ProtocolViolation, RenderError, RenderResult};
pub use init::{DefaultResources, InitGate, SharedResources};
pub use polygon::{PolygonBuilder, PolygonSprite, PolygonVertex};
pub use primitives::{PrimitiveOptions, TriangleVertex};
pub use renderable::{AlphaTestData, AlphaTestRange, BatchKey, BatchRenderable};
pub use renderer::{Renderer2D, Renderer2DDescriptor};
pub use sprite::{Corner, Sprite};
pub use state::{ActiveBatchState, BatchState, DepthStencilMode, RasterState, ShaderState};
pub use texture::{SamplerCache, SamplerKey, SamplerPreset, Texture2D};
pub use vertex::Vertex2D;
