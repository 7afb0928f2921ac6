//! Ownership-safe handles over native GPU objects.
//!
//! Every handle owns exactly one native object: it is created with the
//! handle and released when the handle is dropped (or explicitly
//! [`GpuResource::release()`]d). Handles are move only, a moved-from
//! handle no longer exists so a native id is only ever released once.
//!
//! A handle remembers the context it was created in. Native calls on
//! it switch to that context first, and once that context is gone (or
//! every context is gone) the native object is presumed gone with it:
//! binds and releases become no-ops.

pub mod buffer;
pub mod shader;
pub mod shader_program;
pub mod texture;
pub mod vertex_array;

use std::rc::Rc;

use log::{debug, error};

use crate::bind_cache::BindSlot;
use crate::context::ContextId;
use crate::errors::{Error, Result};
use crate::gpu::Gpu;
use crate::native::NativeGl;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Buffer,
    Texture,
    Shader,
    ShaderProgram,
    VertexArray,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Buffer => write!(f, "Buffer"),
            ResourceKind::Texture => write!(f, "Texture"),
            ResourceKind::Shader => write!(f, "Shader"),
            ResourceKind::ShaderProgram => write!(f, "Program"),
            ResourceKind::VertexArray => write!(f, "Vertex array"),
        }
    }
}

/// Behavior shared by every handle.
pub trait GpuResource {
    /// Native id, 0 once released.
    fn id(&self) -> u32;

    fn kind(&self) -> ResourceKind;

    /// Context the object was created in.
    fn context(&self) -> ContextId;

    /// Whether the native object still exists: the handle has not been
    /// released and its context is still alive.
    fn is_alive(&self) -> bool;

    /// Release the native object now instead of on drop.
    fn release(&mut self);
}

/// Owner of a single native id, the part common to all handles.
pub(crate) struct GlObject {
    gpu: Rc<Gpu>,
    kind: ResourceKind,
    context: ContextId,
    id: u32,
}

impl GlObject {
    /// Create the native object with `create` in the current context.
    pub(crate) fn create<F>(gpu: &Rc<Gpu>, kind: ResourceKind, create: F) -> Result<Self>
    where
        F: FnOnce(&dyn NativeGl) -> u32,
    {
        let context = gpu.current_context().ok_or(Error::NoCurrentContext)?;

        let id = create(gpu.native());
        if id == 0 {
            error!("{} creation returned the null identifier", kind);
            return Err(Error::NullHandle(kind));
        }
        debug!("{} {} successfully created", kind, id);

        Ok(Self {
            gpu: gpu.clone(),
            kind,
            context,
            id,
        })
    }

    pub(crate) fn gpu(&self) -> &Rc<Gpu> {
        &self.gpu
    }

    pub(crate) fn native(&self) -> &dyn NativeGl {
        self.gpu.native()
    }

    pub(crate) fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub(crate) fn context(&self) -> ContextId {
        self.context
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.id != 0 && self.gpu.is_alive(self.context)
    }

    /// Switch to the owning context, `false` when it is gone.
    pub(crate) fn enter(&self) -> bool {
        self.gpu.enter(self.context)
    }

    pub(crate) fn bind(&self, slot: BindSlot) -> bool {
        self.gpu.bind(self.context, slot, self.id)
    }

    pub(crate) fn is_bound(&self, slot: BindSlot) -> bool {
        self.gpu.current_context() == Some(self.context) && self.gpu.bound(slot) == self.id
    }

    pub(crate) fn release(&mut self) {
        if self.id == 0 {
            return;
        }
        let id = std::mem::replace(&mut self.id, 0);
        self.gpu.release(self.kind, self.context, id);
    }
}

impl Drop for GlObject {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for GlObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlObject")
            .field("kind", &self.kind)
            .field("context", &self.context)
            .field("id", &self.id)
            .finish()
    }
}

/// Implement [`GpuResource`] for a handle through its `GlObject` field.
macro_rules! impl_gpu_resource {
    ( $handle:ty ; $object:ident ) => {
        impl $crate::resources::GpuResource for $handle {
            fn id(&self) -> u32 {
                self.$object.id()
            }

            fn kind(&self) -> $crate::resources::ResourceKind {
                self.$object.kind()
            }

            fn context(&self) -> $crate::context::ContextId {
                self.$object.context()
            }

            fn is_alive(&self) -> bool {
                self.$object.is_alive()
            }

            fn release(&mut self) {
                self.$object.release();
            }
        }
    };
}

pub(crate) use impl_gpu_resource;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextConfig;
    use crate::native::recording::{Headless, NativeCall};

    #[test]
    fn gl_object_requires_current_context() {
        let headless = Headless::new();

        let object = GlObject::create(&headless.gpu, ResourceKind::Buffer, |native| {
            native.gen_buffer()
        });

        assert!(matches!(object, Err(Error::NoCurrentContext)));
        assert!(headless.log().calls().is_empty());
    }

    #[test]
    fn gl_object_null_identifier() {
        let headless = Headless::new();
        headless
            .gpu
            .create_context(&ContextConfig::default())
            .unwrap();
        headless.native.fail_next_creation();

        let object = GlObject::create(&headless.gpu, ResourceKind::Texture, |native| {
            native.gen_texture()
        });

        assert!(matches!(
            object,
            Err(Error::NullHandle(ResourceKind::Texture))
        ));
        assert_eq!(headless.log().count(NativeCall::is_release), 0);
    }

    #[test]
    fn gl_object_release_is_idempotent() {
        let headless = Headless::new();
        let context = headless
            .gpu
            .create_context(&ContextConfig::default())
            .unwrap();

        let mut object = GlObject::create(&headless.gpu, ResourceKind::VertexArray, |native| {
            native.gen_vertex_array()
        })
        .unwrap();
        assert_eq!(object.context(), context);
        assert!(object.is_alive());

        object.release();
        object.release();
        assert_eq!(object.id(), 0);
        assert!(!object.is_alive());
        drop(object);

        assert_eq!(headless.log().count(NativeCall::is_release), 1);
    }
}
