//! Lazy, one-time creation of the resources every renderer shares.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tessera_core::profiling::profile_function;
use tessera_device::{GpuShaderModule, InputLayout, RenderContext, ShaderSource, ShaderStage};

use crate::error::{RenderError, RenderResult};
use crate::texture::{SamplerCache, Texture2D};
use crate::vertex::Vertex2D;

const SPRITE_SHADER: &str = include_str!("shaders/sprite2d.wgsl");

const UNINITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const INITIALIZED: u8 = 2;

/// One-shot initialization gate.
///
/// The first caller to win the compare-and-swap runs the initializer while
/// every other caller spins until it finishes. A failed or panicking
/// initializer returns the gate to uninitialized so a later call can retry.
#[derive(Debug)]
pub struct InitGate {
    state: AtomicU8,
}

impl Default for InitGate {
    fn default() -> Self {
        Self::new()
    }
}

struct ResetOnUnwind<'a>(&'a AtomicU8);

impl Drop for ResetOnUnwind<'_> {
    fn drop(&mut self) {
        self.0.store(UNINITIALIZED, Ordering::Release);
    }
}

impl InitGate {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(UNINITIALIZED),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == INITIALIZED
    }

    /// Run `init` unless it already completed. Returns whether this call ran it.
    pub fn run<E>(&self, init: impl FnOnce() -> Result<(), E>) -> Result<bool, E> {
        let mut spins = 0u32;
        loop {
            match self.state.compare_exchange(
                UNINITIALIZED,
                INITIALIZING,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    let guard = ResetOnUnwind(&self.state);
                    init()?;
                    std::mem::forget(guard);
                    self.state.store(INITIALIZED, Ordering::Release);
                    return Ok(true);
                }
                Err(INITIALIZED) => return Ok(false),
                Err(_) => {
                    if spins < 64 {
                        std::hint::spin_loop();
                    } else {
                        std::thread::yield_now();
                    }
                    spins = spins.saturating_add(1);
                }
            }
        }
    }

    /// Return to uninitialized. Only valid while nothing depends on the resources.
    pub fn reset(&self) {
        self.state.store(UNINITIALIZED, Ordering::Release);
    }
}

/// Shaders, fallback textures and layout used by every default pipeline.
#[derive(Debug)]
pub struct DefaultResources {
    pub sprite_vertex: GpuShaderModule,
    pub sprite_pixel: GpuShaderModule,
    pub polygon_vertex: GpuShaderModule,
    pub polygon_pixel: GpuShaderModule,
    /// Bound when a renderable has no texture.
    pub white: Texture2D,
    pub black: Texture2D,
    pub input_layout: Arc<InputLayout>,
}

impl DefaultResources {
    pub fn create(ctx: &dyn RenderContext) -> RenderResult<Self> {
        profile_function!();
        let shader = |entry_point: &str, stage: ShaderStage| {
            ctx.create_shader_module(&ShaderSource {
                label: Some("tessera sprite2d"),
                wgsl: SPRITE_SHADER,
                entry_point,
                stage,
            })
        };
        let resources = Self {
            sprite_vertex: shader("vs_sprite", ShaderStage::Vertex)?,
            sprite_pixel: shader("fs_sprite", ShaderStage::Fragment)?,
            polygon_vertex: shader("vs_polygon", ShaderStage::Vertex)?,
            polygon_pixel: shader("fs_polygon", ShaderStage::Fragment)?,
            white: Texture2D::solid(ctx, "tessera white", [255; 4])?,
            black: Texture2D::solid(ctx, "tessera black", [0, 0, 0, 255])?,
            input_layout: Arc::new(Vertex2D::input_layout()),
        };
        tracing::info!("created default 2D renderer resources");
        Ok(resources)
    }
}

/// Defaults shared by every renderer created from the same `Arc<SharedResources>`.
#[derive(Default)]
pub struct SharedResources {
    gate: InitGate,
    slot: Mutex<Option<Arc<DefaultResources>>>,
    samplers: SamplerCache,
}

impl SharedResources {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_initialized(&self) -> bool {
        self.gate.is_initialized()
    }

    pub fn samplers(&self) -> &SamplerCache {
        &self.samplers
    }

    /// The default resources, created on the first call.
    ///
    /// Concurrent first calls run exactly one initializer.
    pub fn get_or_init(&self, ctx: &dyn RenderContext) -> RenderResult<Arc<DefaultResources>> {
        loop {
            self.gate.run(|| {
                let resources = DefaultResources::create(ctx)?;
                *self.lock_slot() = Some(Arc::new(resources));
                Ok::<_, RenderError>(())
            })?;
            // A concurrent release may empty the slot between the gate and
            // this read; the gate is uninitialized again in that case.
            if let Some(resources) = self.lock_slot().clone() {
                return Ok(resources);
            }
        }
    }

    /// Drop the defaults and reset the gate when no renderer holds them.
    pub fn release_if_unused(&self) -> bool {
        let mut slot = self.lock_slot();
        let unused = slot
            .as_ref()
            .is_some_and(|resources| Arc::strong_count(resources) == 1);
        if unused {
            *slot = None;
            self.samplers.clear();
            self.gate.reset();
            tracing::debug!("released shared 2D renderer resources");
        }
        unused
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Option<Arc<DefaultResources>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
