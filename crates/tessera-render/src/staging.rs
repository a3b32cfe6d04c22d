//! Staging storage that grows geometrically and never shrinks.

use tessera_device::{GpuBuffer, RenderContext};

/// CPU-side arena reused across frames.
///
/// `clear` keeps the allocation, so after warm-up a frame allocates nothing.
#[derive(Debug)]
pub struct StagingArena<T> {
    items: Vec<T>,
}

impl<T: Copy> StagingArena<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Make room for `additional` items, at least doubling when short.
    pub fn reserve(&mut self, additional: usize) {
        let required = self.items.len() + additional;
        if required > self.items.capacity() {
            let target = required.max(self.items.capacity() * 2).next_power_of_two();
            self.items.reserve_exact(target - self.items.len());
        }
    }

    pub fn push(&mut self, item: T) {
        self.reserve(1);
        self.items.push(item);
    }

    pub fn extend_from_slice(&mut self, items: &[T]) {
        self.reserve(items.len());
        self.items.extend_from_slice(items);
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// A device buffer replaced by a larger one when it runs out of room.
#[derive(Debug)]
pub struct GrowableBuffer {
    label: &'static str,
    usage: wgpu::BufferUsages,
    min_size: u64,
    buffer: Option<GpuBuffer>,
}

impl GrowableBuffer {
    pub fn new(label: &'static str, usage: wgpu::BufferUsages, min_size: u64) -> Self {
        Self {
            label,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            min_size: min_size.max(wgpu::COPY_BUFFER_ALIGNMENT),
            buffer: None,
        }
    }

    pub fn buffer(&self) -> Option<&GpuBuffer> {
        self.buffer.as_ref()
    }

    pub fn capacity(&self) -> u64 {
        self.buffer.as_ref().map_or(0, GpuBuffer::size)
    }

    /// The current buffer, allocated at the minimum size on first use.
    pub fn acquire(&mut self, ctx: &dyn RenderContext) -> &GpuBuffer {
        let (label, usage, size) = (self.label, self.usage, self.min_size);
        self.buffer.get_or_insert_with(|| {
            ctx.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage,
                mapped_at_creation: false,
            })
        })
    }

    /// Ensure at least `required` bytes. Returns `true` when a new buffer was created.
    pub fn ensure(&mut self, ctx: &dyn RenderContext, required: u64) -> bool {
        let current = self.capacity();
        if self.buffer.is_some() && required <= current {
            return false;
        }
        let size = required
            .max(current * 2)
            .max(self.min_size)
            .next_power_of_two();
        if self.buffer.is_some() {
            tracing::debug!(
                label = self.label,
                from = current,
                to = size,
                "growing staging buffer"
            );
        }
        self.buffer = Some(ctx.create_buffer(&wgpu::BufferDescriptor {
            label: Some(self.label),
            size,
            usage: self.usage,
            mapped_at_creation: false,
        }));
        true
    }
}
