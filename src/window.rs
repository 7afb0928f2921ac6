//! GLFW windows as rendering contexts.

use std::collections::HashMap;
use std::sync::mpsc::Receiver;

use glfw::Context;
use log::{debug, info};

use crate::config::ContextConfig;
use crate::context::{ContextId, Platform};
use crate::errors::{Error, Result};

struct Surface {
    window: glfw::Window,
    events: Receiver<(f64, glfw::WindowEvent)>,
    vsync: bool,
    swap_interval_set: bool,
    /// Framebuffer size reported while the window was not current.
    pending_viewport: Option<(i32, i32)>,
}

/// [`Platform`] where every context is a GLFW window.
pub struct GlfwPlatform {
    glfw: Option<glfw::Glfw>,
    windows: HashMap<ContextId, Surface>,
    current: Option<ContextId>,
    functions_loaded: bool,
}

impl GlfwPlatform {
    pub fn new() -> Self {
        Self {
            glfw: None,
            windows: HashMap::new(),
            current: None,
            functions_loaded: false,
        }
    }

    fn glfw_mut(&mut self) -> Result<&mut glfw::Glfw> {
        self.glfw
            .as_mut()
            .ok_or_else(|| Error::SubsystemInit("GLFW is not initialized".to_string()))
    }
}

impl Default for GlfwPlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn set_viewport(width: i32, height: i32) {
    unsafe {
        gl::Viewport(0, 0, width, height);
    }
}

impl Platform for GlfwPlatform {
    fn init(&mut self, _config: &ContextConfig) -> Result<()> {
        let glfw = glfw::init(glfw::LOG_ERRORS)
            .map_err(|err| Error::SubsystemInit(format!("{:?}", err)))?;
        info!("GLFW {} initialized", glfw::get_version_string());
        self.glfw = Some(glfw);
        Ok(())
    }

    fn create_surface(&mut self, id: ContextId, config: &ContextConfig) -> Result<()> {
        let glfw = self.glfw_mut()?;

        let (major, minor) = config.gl_version;
        glfw.window_hint(glfw::WindowHint::ContextVersion(major, minor));
        glfw.window_hint(glfw::WindowHint::OpenGlProfile(if config.core_profile {
            glfw::OpenGlProfileHint::Core
        } else {
            glfw::OpenGlProfileHint::Any
        }));
        #[cfg(target_os = "macos")]
        glfw.window_hint(glfw::WindowHint::OpenGlForwardCompat(true));

        let (mut window, events) = glfw
            .create_window(
                config.width,
                config.height,
                &config.title,
                glfw::WindowMode::Windowed,
            )
            .ok_or_else(|| {
                Error::ContextCreation(format!(
                    "GLFW could not create window \"{}\" ({}x{}, OpenGL {}.{})",
                    config.title, config.width, config.height, major, minor
                ))
            })?;
        window.set_framebuffer_size_polling(true);
        window.set_close_polling(true);

        self.windows.insert(
            id,
            Surface {
                window,
                events,
                vsync: config.vsync,
                swap_interval_set: false,
                pending_viewport: None,
            },
        );
        Ok(())
    }

    fn destroy_surface(&mut self, id: ContextId) {
        // dropping the window destroys it along with its context
        self.windows.remove(&id);
        if self.current == Some(id) {
            self.current = None;
        }
    }

    fn make_current(&mut self, id: ContextId) {
        let surface = match self.windows.get_mut(&id) {
            Some(surface) => surface,
            None => return,
        };
        surface.window.make_current();
        self.current = Some(id);

        if !self.functions_loaded {
            let window = &mut surface.window;
            gl::load_with(|symbol| window.get_proc_address(symbol));
            self.functions_loaded = true;
            debug!("OpenGL functions loaded");
        }

        if !surface.swap_interval_set {
            let interval = if surface.vsync {
                glfw::SwapInterval::Sync(1)
            } else {
                glfw::SwapInterval::None
            };
            if let Some(glfw) = self.glfw.as_mut() {
                glfw.set_swap_interval(interval);
            }
            surface.swap_interval_set = true;
        }

        if let Some((width, height)) = surface.pending_viewport.take() {
            set_viewport(width, height);
        }
    }

    fn terminate(&mut self) {
        self.windows.clear();
        self.current = None;
        self.functions_loaded = false;
        // GLFW terminates once its last handle is dropped
        self.glfw = None;
    }

    fn poll_events(&mut self) -> Vec<ContextId> {
        let glfw = match self.glfw.as_mut() {
            Some(glfw) => glfw,
            None => return Vec::new(),
        };
        glfw.poll_events();

        let current = self.current;
        let mut closed = Vec::new();
        for (id, surface) in self.windows.iter_mut() {
            for (_, event) in glfw::flush_messages(&surface.events) {
                if let glfw::WindowEvent::FramebufferSize(width, height) = event {
                    if current == Some(*id) {
                        set_viewport(width, height);
                    } else {
                        surface.pending_viewport = Some((width, height));
                    }
                }
            }
            if surface.window.should_close() {
                closed.push(*id);
            }
        }
        closed.sort();
        closed
    }

    fn swap_buffers(&mut self, id: ContextId) {
        if let Some(surface) = self.windows.get_mut(&id) {
            surface.window.swap_buffers();
        }
    }
}
