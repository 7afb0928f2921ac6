use std::rc::Rc;

use bytemuck::Pod;
use log::warn;

use super::{impl_gpu_resource, GlObject, ResourceKind};
use crate::bind_cache::BindSlot;
use crate::errors::Result;
use crate::gpu::Gpu;
use crate::native::MAX_BUFFER_SIZE;
use crate::params::{BufferTarget, BufferUsage};

/// A native buffer object.
#[derive(Debug)]
pub struct Buffer {
    object: GlObject,
    /// size of the storage last allocated, in bytes
    size: usize,
}

impl_gpu_resource!(Buffer; object);

impl Buffer {
    pub fn new(gpu: &Rc<Gpu>) -> Result<Self> {
        let object = GlObject::create(gpu, ResourceKind::Buffer, |native| native.gen_buffer())?;
        Ok(Self { object, size: 0 })
    }

    /// Bind to `target`, `false` if the buffer's context is gone.
    pub fn bind(&self, target: BufferTarget) -> bool {
        self.object.bind(target.into())
    }

    pub fn is_bound(&self, target: BufferTarget) -> bool {
        self.object.is_bound(BindSlot::from(target))
    }

    /// Size in bytes of the buffer's storage.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Replace the storage with a copy of `data`.
    pub fn buffer_data<T: Pod>(
        &mut self,
        target: BufferTarget,
        data: &[T],
        usage: BufferUsage,
    ) -> &mut Self {
        if !self.bind(target) {
            return self;
        }
        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.object
            .native()
            .buffer_data(target, bytes.len(), Some(bytes), usage);
        self.size = bytes.len();
        self
    }

    /// Replace the storage with `size` uninitialized bytes.
    pub fn allocate(&mut self, target: BufferTarget, size: usize, usage: BufferUsage) -> &mut Self {
        if size > MAX_BUFFER_SIZE {
            warn!(
                "Buffer {} cannot allocate {} bytes, at most {} are supported",
                self.object.id(),
                size,
                MAX_BUFFER_SIZE
            );
            return self;
        }
        if !self.bind(target) {
            return self;
        }
        self.object.native().buffer_data(target, size, None, usage);
        self.size = size;
        self
    }

    /// Overwrite part of the storage starting at byte `offset`. Writes
    /// past the end of the storage are skipped.
    pub fn buffer_sub_data<T: Pod>(
        &mut self,
        target: BufferTarget,
        offset: usize,
        data: &[T],
    ) -> &mut Self {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if offset
            .checked_add(bytes.len())
            .map_or(true, |end| end > self.size)
        {
            warn!(
                "Buffer {} write of {} bytes at offset {} exceeds its size of {} bytes",
                self.object.id(),
                bytes.len(),
                offset,
                self.size
            );
            return self;
        }
        if !self.bind(target) {
            return self;
        }
        self.object.native().buffer_sub_data(target, offset, bytes);
        self
    }
}
