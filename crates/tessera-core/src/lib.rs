//! Tessera Core
//!
//! Shared utilities for the tessera crates: logging setup, profiling scopes,
//! math re-exports, rectangle geometry and hash collections.

pub mod alloc;
pub mod geometry;
pub mod logging;
pub mod math;
pub mod profiling;
