//! Dynamic GPU buffer management with automatic resizing
//!
//! Provides buffers that grow automatically when data exceeds capacity,
//! using a 2x growth strategy to minimize reallocations.

use std::marker::PhantomData;

/// Byte capacity after growing to hold `needed` bytes: 2x growth, at least
/// 1KB more than before.
fn grown_capacity(current: usize, needed: usize) -> usize {
    (needed * 2).max(current + 1024)
}

/// A GPU buffer that can grow dynamically
///
/// Uses a 2x growth strategy when capacity is exceeded.
/// Never shrinks (GPU buffers cannot be resized in place).
pub struct DynamicBuffer {
    buffer: wgpu::Buffer,
    capacity: usize, // Capacity in bytes
    usage: wgpu::BufferUsages,
    label: String,
}

impl DynamicBuffer {
    /// Buffer with the given initial byte capacity.
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        initial_capacity: usize,
        usage: wgpu::BufferUsages,
    ) -> Self {
        let capacity = initial_capacity.max(64); // Minimum 64 bytes

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: capacity as u64,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            capacity,
            usage,
            label: label.to_owned(),
        }
    }

    /// Write data to buffer, growing if necessary
    ///
    /// Returns `true` if buffer was reallocated (bind groups need recreation)
    pub fn write<T: bytemuck::Pod>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[T],
    ) -> bool {
        let data_bytes: &[u8] = bytemuck::cast_slice(data);
        let needed = data_bytes.len();

        let reallocated = if needed > self.capacity {
            let new_capacity = grown_capacity(self.capacity, needed);
            log::debug!(
                "growing '{}' from {} to {new_capacity} bytes",
                self.label,
                self.capacity
            );

            self.buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&self.label),
                size: new_capacity as u64,
                usage: self.usage | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            self.capacity = new_capacity;
            true
        } else {
            false
        };

        if needed > 0 {
            queue.write_buffer(&self.buffer, 0, data_bytes);
        }

        reallocated
    }

    /// The underlying GPU buffer.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

}

/// Typed wrapper for DynamicBuffer with cleaner API
///
/// Capacity is given in items rather than bytes.
pub struct TypedBuffer<T> {
    inner: DynamicBuffer,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> TypedBuffer<T> {
    /// Specified initial capacity (in items).
    pub fn with_capacity(
        device: &wgpu::Device,
        label: &str,
        capacity: usize,
        usage: wgpu::BufferUsages,
    ) -> Self {
        let initial_capacity = size_of::<T>() * capacity.max(1);
        Self {
            inner: DynamicBuffer::new(device, label, initial_capacity, usage),
            _marker: PhantomData,
        }
    }

    /// Write data to buffer, growing if necessary
    ///
    /// Returns `true` if buffer was reallocated (bind groups need recreation)
    pub fn write(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[T],
    ) -> bool {
        self.inner.write(device, queue, data)
    }

    /// The underlying GPU buffer.
    pub fn buffer(&self) -> &wgpu::Buffer {
        self.inner.buffer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_doubles_large_requests() {
        assert_eq!(grown_capacity(4096, 10_000), 20_000);
    }

    #[test]
    fn growth_adds_at_least_one_kilobyte() {
        assert_eq!(grown_capacity(64, 100), 1088);
    }
}
