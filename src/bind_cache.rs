use std::collections::HashMap;

use crate::context::ContextId;
use crate::params::BufferTarget;
use crate::resources::ResourceKind;

/// A binding point that can hold one object per context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindSlot {
    ArrayBuffer,
    ElementArrayBuffer,
    Texture2D,
    VertexArray,
    Program,
}

impl BindSlot {
    pub const COUNT: usize = 5;

    pub const ALL: [BindSlot; BindSlot::COUNT] = [
        BindSlot::ArrayBuffer,
        BindSlot::ElementArrayBuffer,
        BindSlot::Texture2D,
        BindSlot::VertexArray,
        BindSlot::Program,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Kind of object that can be bound to this slot.
    pub fn kind(self) -> ResourceKind {
        match self {
            BindSlot::ArrayBuffer | BindSlot::ElementArrayBuffer => ResourceKind::Buffer,
            BindSlot::Texture2D => ResourceKind::Texture,
            BindSlot::VertexArray => ResourceKind::VertexArray,
            BindSlot::Program => ResourceKind::ShaderProgram,
        }
    }
}

impl From<BufferTarget> for BindSlot {
    fn from(target: BufferTarget) -> Self {
        match target {
            BufferTarget::Array => BindSlot::ArrayBuffer,
            BufferTarget::ElementArray => BindSlot::ElementArrayBuffer,
        }
    }
}

impl std::fmt::Display for BindSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindSlot::ArrayBuffer => write!(f, "array buffer"),
            BindSlot::ElementArrayBuffer => write!(f, "element array buffer"),
            BindSlot::Texture2D => write!(f, "texture"),
            BindSlot::VertexArray => write!(f, "vertex array"),
            BindSlot::Program => write!(f, "program"),
        }
    }
}

/// Per context record of which object is bound to each slot, 0 when
/// nothing is (or nothing is known to be).
///
/// The cache is advisory. Binds issued around this layer, directly
/// through the native API, are invisible to it and leave it stale until
/// the next bind through this layer for that slot.
#[derive(Debug, Default, Clone)]
pub struct BindCache {
    contexts: HashMap<ContextId, [u32; BindSlot::COUNT]>,
}

impl BindCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, context: ContextId, slot: BindSlot) -> u32 {
        self.contexts
            .get(&context)
            .map_or(0, |slots| slots[slot.index()])
    }

    pub fn set(&mut self, context: ContextId, slot: BindSlot, id: u32) {
        self.contexts
            .entry(context)
            .or_insert([0; BindSlot::COUNT])[slot.index()] = id;
    }

    pub fn invalidate(&mut self, context: ContextId, slot: BindSlot) {
        if let Some(slots) = self.contexts.get_mut(&context) {
            slots[slot.index()] = 0;
        }
    }

    /// Clear every slot of `kind` that names `id`, the native API
    /// unbinds objects when they are deleted.
    pub fn forget_object(&mut self, context: ContextId, kind: ResourceKind, id: u32) {
        if let Some(slots) = self.contexts.get_mut(&context) {
            BindSlot::ALL
                .iter()
                .filter(|slot| slot.kind() == kind)
                .for_each(|slot| {
                    if slots[slot.index()] == id {
                        slots[slot.index()] = 0;
                    }
                });
        }
    }

    pub fn forget_context(&mut self, context: ContextId) {
        self.contexts.remove(&context);
    }
}
