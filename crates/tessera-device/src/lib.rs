//! Device contract for the tessera 2D renderer.
//!
//! The renderer never talks to a graphics API directly. Everything it needs
//! from the device (resource creation, buffer uploads, a viewport query and
//! draw submission) goes through the object-safe [`RenderContext`] trait.
//!
//! # Overview
//!
//! - [`RenderContext`] - trait implemented by device backends
//! - [`DrawCall`] - one GPU submission unit (buffers, layout, state, range)
//! - GPU handle types ([`GpuBuffer`], [`GpuTexture`], ...) - plain ids into the
//!   backend's resource arenas, cheap to clone and compare
//! - `MockRenderContext` - recording implementation for tests (requires `mock`)
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # {
//! use tessera_device::{MockRenderContext, RenderContext};
//! use wgpu::{BufferDescriptor, BufferUsages};
//!
//! let mock = MockRenderContext::new();
//! let buffer = mock.create_buffer(&BufferDescriptor {
//!     label: Some("vertices"),
//!     size: 1024,
//!     usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
//!     mapped_at_creation: false,
//! });
//! mock.write_buffer(&buffer, 0, &[0u8; 16]);
//!
//! assert_eq!(mock.count_buffer_creates(), 1);
//! assert_eq!(mock.count_writes_to(buffer.id()), 1);
//! # }
//! ```
//!
//! # Handles instead of references
//!
//! Handles carry a [`ResourceId`] plus the metadata the renderer needs
//! (sizes, formats, sample counts). Identity comparisons in the renderer are
//! therefore value comparisons of ids, which stay valid when a backend stores
//! its resources in index-based arenas.

pub mod draw;
pub mod error;
pub mod gpu_types;
#[cfg(feature = "mock")]
pub mod mock_render;
pub mod render_context;

pub use draw::*;
pub use error::*;
pub use gpu_types::*;
#[cfg(feature = "mock")]
pub use mock_render::*;
pub use render_context::*;
