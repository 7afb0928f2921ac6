use std::collections::BTreeSet;

use log::{info, warn};

use crate::config::ContextConfig;
use crate::errors::{Error, Result};

/// Identity of a rendering context. Assigned monotonically starting at
/// 1 and never reused while the registry lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u32);

impl ContextId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The windowing side of the graphics subsystem: owns the native
/// surfaces and is the only thing allowed to switch the current
/// context.
pub trait Platform {
    /// One time subsystem initialization, done before the first
    /// surface is created.
    fn init(&mut self, config: &ContextConfig) -> Result<()>;

    /// Create the surface (and its context) for `id`. Must not change
    /// which context is current.
    fn create_surface(&mut self, id: ContextId, config: &ContextConfig) -> Result<()>;

    fn destroy_surface(&mut self, id: ContextId);

    fn make_current(&mut self, id: ContextId);

    /// Global teardown, done after the last surface is destroyed.
    fn terminate(&mut self);

    /// Process pending events, returns the contexts whose surface asked
    /// to be closed.
    fn poll_events(&mut self) -> Vec<ContextId> {
        Vec::new()
    }

    fn swap_buffers(&mut self, _id: ContextId) {}
}

/// Table of live rendering contexts.
///
/// Single source of truth for whether any context is alive and which
/// one is current. Creating the first context initializes the
/// platform, destroying the last one tears it down.
pub struct ContextRegistry {
    platform: Box<dyn Platform>,
    next_id: u32,
    contexts: BTreeSet<ContextId>,
    current: Option<ContextId>,
    initialized: bool,
}

impl ContextRegistry {
    pub fn new(platform: Box<dyn Platform>) -> Self {
        Self {
            platform,
            next_id: 1,
            contexts: BTreeSet::new(),
            current: None,
            initialized: false,
        }
    }

    /// Create and register a new context, it becomes the current
    /// context.
    pub fn register(&mut self, config: &ContextConfig) -> Result<ContextId> {
        if !self.initialized {
            self.platform.init(config)?;
            self.initialized = true;
            info!("Graphics subsystem initialized");
        }

        // burn the id even if creation fails, ids are never reused
        let id = ContextId(self.next_id);
        self.next_id += 1;

        if let Err(err) = self.platform.create_surface(id, config) {
            if self.contexts.is_empty() {
                self.teardown();
            }
            return Err(err);
        }

        self.contexts.insert(id);
        info!("Context {} successfully created", id);

        self.activate(id)?;

        Ok(id)
    }

    /// Remove the context, tears down the platform if it was the last
    /// one.
    pub fn unregister(&mut self, id: ContextId) -> Result<()> {
        if !self.contexts.remove(&id) {
            warn!(
                "Attempted to destroy context {} but could not find it",
                id
            );
            return Err(Error::UnknownContext(id));
        }

        self.platform.destroy_surface(id);
        if self.current == Some(id) {
            self.current = None;
        }
        info!("Context {} destroyed", id);

        if self.contexts.is_empty() {
            self.teardown();
        }

        Ok(())
    }

    /// Make `id` the current context. Free when it already is.
    pub fn activate(&mut self, id: ContextId) -> Result<()> {
        if !self.contexts.contains(&id) {
            return Err(Error::UnknownContext(id));
        }

        if self.current != Some(id) {
            self.platform.make_current(id);
            self.current = Some(id);
        }

        Ok(())
    }

    pub fn current(&self) -> Option<ContextId> {
        self.current
    }

    /// True iff no context is registered, every native object is
    /// presumed gone.
    pub fn is_terminated(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn is_alive(&self, id: ContextId) -> bool {
        self.contexts.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn contexts(&self) -> impl Iterator<Item = ContextId> + '_ {
        self.contexts.iter().copied()
    }

    pub fn poll_events(&mut self) -> Vec<ContextId> {
        self.platform.poll_events()
    }

    pub fn swap_buffers(&mut self, id: ContextId) -> Result<()> {
        if !self.contexts.contains(&id) {
            return Err(Error::UnknownContext(id));
        }
        self.platform.swap_buffers(id);
        Ok(())
    }

    fn teardown(&mut self) {
        if self.initialized {
            self.platform.terminate();
            self.initialized = false;
            self.current = None;
            info!("All contexts closed, graphics subsystem terminated");
        }
    }
}

impl std::fmt::Debug for ContextRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextRegistry")
            .field("next_id", &self.next_id)
            .field("contexts", &self.contexts)
            .field("current", &self.current)
            .field("initialized", &self.initialized)
            .finish()
    }
}
