use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, warn};

use crate::bind_cache::{BindCache, BindSlot};
use crate::config::ContextConfig;
use crate::context::{ContextId, ContextRegistry, Platform};
use crate::errors::Result;
use crate::glm;
use crate::native::opengl::OpenGl;
use crate::native::NativeGl;
use crate::params::BufferTarget;
use crate::resources::ResourceKind;
use crate::window::GlfwPlatform;

/// Root of the graphics subsystem.
///
/// Holds the native API, the [`ContextRegistry`] and the [`BindCache`].
/// Every resource handle keeps an `Rc<Gpu>`, so the root outlives all
/// of its handles. Single threaded: all of it must be used from the
/// thread that owns the contexts.
pub struct Gpu {
    native: Box<dyn NativeGl>,
    registry: RefCell<ContextRegistry>,
    bind_cache: RefCell<BindCache>,
}

impl Gpu {
    pub fn new(native: Box<dyn NativeGl>, platform: Box<dyn Platform>) -> Rc<Self> {
        Rc::new(Self {
            native,
            registry: RefCell::new(ContextRegistry::new(platform)),
            bind_cache: RefCell::new(BindCache::new()),
        })
    }

    /// OpenGL through the `gl` crate with GLFW windows.
    pub fn glfw() -> Rc<Self> {
        Self::new(Box::new(OpenGl::new()), Box::new(GlfwPlatform::new()))
    }

    pub fn native(&self) -> &dyn NativeGl {
        self.native.as_ref()
    }

    /// Create a new context, it becomes the current context.
    pub fn create_context(&self, config: &ContextConfig) -> Result<ContextId> {
        let id = self.registry.borrow_mut().register(config)?;
        if config.enable_blend {
            self.native.enable_alpha_blending();
        }
        Ok(id)
    }

    pub fn destroy_context(&self, id: ContextId) -> Result<()> {
        self.registry.borrow_mut().unregister(id)?;
        self.bind_cache.borrow_mut().forget_context(id);
        Ok(())
    }

    pub fn make_current(&self, id: ContextId) -> Result<()> {
        self.registry.borrow_mut().activate(id)
    }

    pub fn current_context(&self) -> Option<ContextId> {
        self.registry.borrow().current()
    }

    pub fn is_terminated(&self) -> bool {
        self.registry.borrow().is_terminated()
    }

    pub fn is_alive(&self, id: ContextId) -> bool {
        self.registry.borrow().is_alive(id)
    }

    pub fn context_count(&self) -> usize {
        self.registry.borrow().len()
    }

    /// Id bound to `slot` in the current context as far as the cache
    /// knows, 0 when nothing is.
    pub fn bound(&self, slot: BindSlot) -> u32 {
        match self.current_context() {
            Some(context) => self.bind_cache.borrow().get(context, slot),
            None => 0,
        }
    }

    /// Poll platform events and destroy every context whose surface
    /// asked to close. Returns the destroyed contexts.
    pub fn update(&self) -> Vec<ContextId> {
        let closed = self.registry.borrow_mut().poll_events();

        let mut destroyed = Vec::new();
        for id in closed {
            if self.destroy_context(id).is_ok() {
                destroyed.push(id);
            }
        }
        destroyed
    }

    pub fn swap_buffers(&self, id: ContextId) -> Result<()> {
        self.registry.borrow_mut().swap_buffers(id)
    }

    /// Make `id` current and clear its color buffer to `color`.
    pub fn clear(&self, id: ContextId, color: &glm::Vec4) -> Result<()> {
        self.make_current(id)?;
        self.native.clear(color);
        Ok(())
    }

    /// Unbind whatever is bound to `slot` in the current context.
    pub fn unbind(&self, slot: BindSlot) {
        let context = match self.current_context() {
            Some(context) => context,
            None => return,
        };
        self.bind_native(context, slot, 0);
    }

    /// Make `owner` current so that native calls on its objects land in
    /// the right context. `false` when the owner is gone, in which case
    /// its objects are gone too and nothing must be issued.
    pub(crate) fn enter(&self, owner: ContextId) -> bool {
        let mut registry = self.registry.borrow_mut();
        if registry.is_terminated() {
            debug!("All contexts are closed, skipping native call");
            return false;
        }
        if registry.activate(owner).is_err() {
            warn!(
                "Context {} was destroyed, its objects can no longer be used",
                owner
            );
            return false;
        }
        true
    }

    /// Bind `id` to `slot` in `owner`, skipping the native call when
    /// the cache says it is already bound. `false` when nothing could
    /// be bound because `owner` is gone.
    pub(crate) fn bind(&self, owner: ContextId, slot: BindSlot, id: u32) -> bool {
        if !self.enter(owner) {
            return false;
        }
        if id == 0 {
            warn!(
                "Attempting to bind a {} ID 0",
                slot.kind().to_string().to_lowercase()
            );
        }
        self.bind_native(owner, slot, id);
        true
    }

    /// Select texture `unit` in `owner`. The texture binding is per unit
    /// so the cached texture entry no longer applies.
    pub(crate) fn active_texture(&self, owner: ContextId, unit: u32) -> bool {
        if !self.enter(owner) {
            return false;
        }
        self.native.active_texture(unit);
        self.bind_cache
            .borrow_mut()
            .invalidate(owner, BindSlot::Texture2D);
        true
    }

    /// Release `id` if its owner is still alive. Returns whether the
    /// native release call was issued.
    pub(crate) fn release(&self, kind: ResourceKind, owner: ContextId, id: u32) -> bool {
        if !self.enter(owner) {
            debug!("{} {} already gone with its context", kind, id);
            return false;
        }

        match kind {
            ResourceKind::Buffer => self.native.delete_buffer(id),
            ResourceKind::Texture => self.native.delete_texture(id),
            ResourceKind::Shader => self.native.delete_shader(id),
            ResourceKind::ShaderProgram => self.native.delete_program(id),
            ResourceKind::VertexArray => self.native.delete_vertex_array(id),
        }
        let mut cache = self.bind_cache.borrow_mut();
        // deleting the bound vertex array falls back to array 0, which
        // has its own element array binding
        if kind == ResourceKind::VertexArray && cache.get(owner, BindSlot::VertexArray) == id {
            cache.invalidate(owner, BindSlot::ElementArrayBuffer);
        }
        cache.forget_object(owner, kind, id);
        drop(cache);

        debug!("{} {} destroyed", kind, id);
        true
    }

    fn bind_native(&self, context: ContextId, slot: BindSlot, id: u32) {
        let mut cache = self.bind_cache.borrow_mut();
        if cache.get(context, slot) == id {
            return;
        }

        match slot {
            BindSlot::ArrayBuffer => self.native.bind_buffer(BufferTarget::Array, id),
            BindSlot::ElementArrayBuffer => {
                self.native.bind_buffer(BufferTarget::ElementArray, id)
            }
            BindSlot::Texture2D => self.native.bind_texture(id),
            BindSlot::VertexArray => self.native.bind_vertex_array(id),
            BindSlot::Program => self.native.use_program(id),
        }
        cache.set(context, slot, id);

        // the element array binding is part of the vertex array state
        if slot == BindSlot::VertexArray {
            cache.invalidate(context, BindSlot::ElementArrayBuffer);
        }
    }
}

impl std::fmt::Debug for Gpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gpu")
            .field("registry", &self.registry)
            .field("bind_cache", &self.bind_cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::recording::{Headless, NativeCall};
    use crate::resources::buffer::Buffer;
    use crate::resources::vertex_array::VertexArray;
    use crate::resources::GpuResource;
    use crate::testing::{init_logger, take_messages};


    #[test]
    fn gpu_create_context_enables_blending() {
        init_logger();
        let headless = Headless::new();
        let gpu = &headless.gpu;

        let c1 = gpu.create_context(&ContextConfig::default()).unwrap();
        let _c2 = gpu
            .create_context(&ContextConfig {
                enable_blend: false,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(
            headless.log().count(|call| *call == NativeCall::EnableAlphaBlending),
            1
        );
        assert_eq!(
            headless.log().calls()[..4],
            [
                NativeCall::Init,
                NativeCall::CreateSurface(c1),
                NativeCall::MakeCurrent(c1),
                NativeCall::EnableAlphaBlending,
            ]
        );
    }

    #[test]
    fn gpu_move_then_destroy_releases_once() {
        init_logger();
        let headless = Headless::starting_at(7);
        let gpu = &headless.gpu;
        gpu.create_context(&ContextConfig::default()).unwrap();

        let a = Buffer::new(gpu).unwrap();
        assert_eq!(a.id(), 7);
        let b = a;
        assert_eq!(headless.log().count(NativeCall::is_release), 0);

        drop(b);
        assert_eq!(
            headless.log().count(NativeCall::is_release),
            1
        );
        assert_eq!(
            headless.log().count(|call| *call == NativeCall::DeleteBuffer(7)),
            1
        );
    }

    #[test]
    fn gpu_move_assign_releases_destination_first() {
        init_logger();
        let headless = Headless::new();
        let gpu = &headless.gpu;
        gpu.create_context(&ContextConfig::default()).unwrap();

        let mut a = Buffer::new(gpu).unwrap();
        let b = Buffer::new(gpu).unwrap();
        let (a_id, b_id) = (a.id(), b.id());

        a = b;
        assert_eq!(a.id(), b_id);
        assert_eq!(
            headless.log().calls().last(),
            Some(&NativeCall::DeleteBuffer(a_id))
        );

        drop(a);
        assert_eq!(headless.log().count(NativeCall::is_release), 2);
        assert_eq!(
            headless.log().count(|call| *call == NativeCall::DeleteBuffer(b_id)),
            1
        );
    }

    #[test]
    fn gpu_bind_twice_issues_one_native_bind() {
        init_logger();
        let headless = Headless::new();
        let gpu = &headless.gpu;
        gpu.create_context(&ContextConfig::default()).unwrap();

        let buffer = Buffer::new(gpu).unwrap();
        headless.log().clear();

        buffer.bind(BufferTarget::Array);
        buffer.bind(BufferTarget::Array);

        assert_eq!(headless.log().count(NativeCall::is_bind), 1);
        assert!(buffer.is_bound(BufferTarget::Array));
        assert_eq!(gpu.bound(BindSlot::ArrayBuffer), buffer.id());
    }

    #[test]
    fn gpu_bind_cache_per_context() {
        init_logger();
        let headless = Headless::new();
        let gpu = &headless.gpu;
        let config = ContextConfig::default();

        let c1 = gpu.create_context(&config).unwrap();
        let x = Buffer::new(gpu).unwrap();
        let c2 = gpu.create_context(&config).unwrap();
        let y = Buffer::new(gpu).unwrap();
        headless.log().clear();

        x.bind(BufferTarget::Array);
        y.bind(BufferTarget::Array);
        x.bind(BufferTarget::Array);

        assert_eq!(headless.log().count(NativeCall::is_bind), 2);
        assert_eq!(
            headless.log().calls(),
            vec![
                NativeCall::MakeCurrent(c1),
                NativeCall::BindBuffer(BufferTarget::Array, x.id()),
                NativeCall::MakeCurrent(c2),
                NativeCall::BindBuffer(BufferTarget::Array, y.id()),
                NativeCall::MakeCurrent(c1),
            ]
        );

        gpu.make_current(c1).unwrap();
        assert_eq!(gpu.bound(BindSlot::ArrayBuffer), x.id());
        gpu.make_current(c2).unwrap();
        assert_eq!(gpu.bound(BindSlot::ArrayBuffer), y.id());
    }

    #[test]
    fn gpu_terminated_skips_release_and_bind() {
        init_logger();
        let headless = Headless::new();
        let gpu = &headless.gpu;
        let c1 = gpu.create_context(&ContextConfig::default()).unwrap();

        let buffer = Buffer::new(gpu).unwrap();
        let vertex_array = VertexArray::new(gpu).unwrap();
        gpu.destroy_context(c1).unwrap();
        assert!(gpu.is_terminated());
        headless.log().clear();

        assert!(!buffer.bind(BufferTarget::Array));
        assert!(!vertex_array.bind());
        assert!(!buffer.is_alive());
        drop(buffer);
        drop(vertex_array);

        assert!(headless.log().calls().is_empty());
    }

    #[test]
    fn gpu_destroyed_owner_skips_release() {
        init_logger();
        let headless = Headless::new();
        let gpu = &headless.gpu;
        let config = ContextConfig::default();

        let c1 = gpu.create_context(&config).unwrap();
        let buffer = Buffer::new(gpu).unwrap();
        let _c2 = gpu.create_context(&config).unwrap();
        gpu.destroy_context(c1).unwrap();
        assert!(!gpu.is_terminated());
        headless.log().clear();

        drop(buffer);
        assert_eq!(headless.log().count(NativeCall::is_release), 0);
    }

    #[test]
    fn gpu_release_switches_to_owner() {
        init_logger();
        let headless = Headless::new();
        let gpu = &headless.gpu;
        let config = ContextConfig::default();

        let c1 = gpu.create_context(&config).unwrap();
        let buffer = Buffer::new(gpu).unwrap();
        let id = buffer.id();
        let _c2 = gpu.create_context(&config).unwrap();
        headless.log().clear();

        drop(buffer);
        assert_eq!(
            headless.log().calls(),
            vec![NativeCall::MakeCurrent(c1), NativeCall::DeleteBuffer(id)]
        );
    }

    #[test]
    fn gpu_release_clears_bind_cache() {
        init_logger();
        let headless = Headless::new();
        let gpu = &headless.gpu;
        gpu.create_context(&ContextConfig::default()).unwrap();

        let buffer = Buffer::new(gpu).unwrap();
        buffer.bind(BufferTarget::Array);
        assert_ne!(gpu.bound(BindSlot::ArrayBuffer), 0);

        drop(buffer);
        assert_eq!(gpu.bound(BindSlot::ArrayBuffer), 0);
    }

    #[test]
    fn gpu_unbind() {
        init_logger();
        let headless = Headless::new();
        let gpu = &headless.gpu;
        gpu.create_context(&ContextConfig::default()).unwrap();

        let buffer = Buffer::new(gpu).unwrap();
        buffer.bind(BufferTarget::Array);
        headless.log().clear();

        gpu.unbind(BindSlot::ArrayBuffer);
        gpu.unbind(BindSlot::ArrayBuffer);
        assert_eq!(
            headless.log().calls(),
            vec![NativeCall::BindBuffer(BufferTarget::Array, 0)]
        );
        assert!(!buffer.is_bound(BufferTarget::Array));
    }

    #[test]
    fn gpu_update_destroys_closed_contexts() {
        init_logger();
        let headless = Headless::new();
        let gpu = &headless.gpu;
        let config = ContextConfig::default();

        let c1 = gpu.create_context(&config).unwrap();
        let c2 = gpu.create_context(&config).unwrap();

        assert!(gpu.update().is_empty());

        headless.platform.request_close(c1);
        assert_eq!(gpu.update(), vec![c1]);
        assert!(!gpu.is_alive(c1));
        assert!(gpu.is_alive(c2));

        headless.platform.request_close(c2);
        assert_eq!(gpu.update(), vec![c2]);
        assert!(gpu.is_terminated());
        assert_eq!(gpu.context_count(), 0);
    }

    #[test]
    fn gpu_clear_and_swap() {
        init_logger();
        let headless = Headless::new();
        let gpu = &headless.gpu;
        let config = ContextConfig::default();

        let c1 = gpu.create_context(&config).unwrap();
        let _c2 = gpu.create_context(&config).unwrap();
        headless.log().clear();

        gpu.clear(c1, &config.clear_color).unwrap();
        gpu.swap_buffers(c1).unwrap();

        assert_eq!(
            headless.log().calls(),
            vec![
                NativeCall::MakeCurrent(c1),
                NativeCall::Clear(config.clear_color),
                NativeCall::SwapBuffers(c1),
            ]
        );
        assert!(gpu.swap_buffers(ContextId::new(9)).is_err());
    }

    #[test]
    fn gpu_release_bound_vertex_array_forgets_element_buffer() {
        init_logger();
        let headless = Headless::new();
        let gpu = &headless.gpu;
        gpu.create_context(&ContextConfig::default()).unwrap();

        let vertex_array = VertexArray::new(gpu).unwrap();
        let indices = Buffer::new(gpu).unwrap();
        vertex_array.bind();
        indices.bind(BufferTarget::ElementArray);
        assert!(indices.is_bound(BufferTarget::ElementArray));

        drop(vertex_array);
        assert!(!indices.is_bound(BufferTarget::ElementArray));
        headless.log().clear();

        indices.bind(BufferTarget::ElementArray);
        assert_eq!(
            headless.log().calls(),
            vec![NativeCall::BindBuffer(BufferTarget::ElementArray, indices.id())]
        );
    }

    #[test]
    fn gpu_release_unbound_vertex_array_keeps_element_buffer() {
        init_logger();
        let headless = Headless::new();
        let gpu = &headless.gpu;
        gpu.create_context(&ContextConfig::default()).unwrap();

        let bound = VertexArray::new(gpu).unwrap();
        let other = VertexArray::new(gpu).unwrap();
        let indices = Buffer::new(gpu).unwrap();
        bound.bind();
        indices.bind(BufferTarget::ElementArray);

        drop(other);
        assert!(bound.is_bound());
        assert!(indices.is_bound(BufferTarget::ElementArray));
    }

    #[test]
    fn gpu_bind_zero_warns() {
        init_logger();
        let headless = Headless::new();
        let gpu = &headless.gpu;
        gpu.create_context(&ContextConfig::default()).unwrap();

        let mut buffer = Buffer::new(gpu).unwrap();
        buffer.release();
        take_messages(log::Level::Warn);

        buffer.bind(BufferTarget::Array);

        assert_eq!(
            take_messages(log::Level::Warn),
            vec!["Attempting to bind a buffer ID 0".to_string()]
        );
    }

    #[test]
    fn gpu_unbind_does_not_warn() {
        init_logger();
        let headless = Headless::new();
        let gpu = &headless.gpu;
        gpu.create_context(&ContextConfig::default()).unwrap();
        let buffer = Buffer::new(gpu).unwrap();
        buffer.bind(BufferTarget::Array);
        take_messages(log::Level::Warn);

        gpu.unbind(BindSlot::ArrayBuffer);

        assert!(take_messages(log::Level::Warn).is_empty());
        assert_eq!(gpu.bound(BindSlot::ArrayBuffer), 0);
    }
}
