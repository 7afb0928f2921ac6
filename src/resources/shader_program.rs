use std::rc::Rc;

use log::{debug, error, info, warn};

use super::shader::Shader;
use super::{impl_gpu_resource, GlObject, GpuResource, ResourceKind};
use crate::bind_cache::BindSlot;
use crate::errors::{Error, Result};
use crate::glm;
use crate::gpu::Gpu;
use crate::native::Uniform;
use crate::params::ShaderStage;

/// A linkable program made of attached [`Shader`]s.
#[derive(Debug)]
pub struct ShaderProgram {
    object: GlObject,
    linked: bool,
}

impl_gpu_resource!(ShaderProgram; object);

impl ShaderProgram {
    pub fn new(gpu: &Rc<Gpu>) -> Result<Self> {
        let object = GlObject::create(gpu, ResourceKind::ShaderProgram, |native| {
            native.create_program()
        })?;
        Ok(Self {
            object,
            linked: false,
        })
    }

    /// Compile both stages, attach them and link. The shaders are
    /// released once linked.
    pub fn from_sources(gpu: &Rc<Gpu>, vertex: &str, fragment: &str) -> Result<Self> {
        let vertex = Shader::from_source(gpu, ShaderStage::Vertex, vertex)?;
        let fragment = Shader::from_source(gpu, ShaderStage::Fragment, fragment)?;

        let mut program = Self::new(gpu)?;
        program.attach(&vertex).attach(&fragment).link()?;
        Ok(program)
    }

    /// Attach `shader`. The program needs to be linked again afterwards.
    pub fn attach(&mut self, shader: &Shader) -> &mut Self {
        if !shader.is_compiled() {
            warn!(
                "Attaching {} shader {} to program {} before it compiled",
                shader.stage(),
                shader.id(),
                self.object.id()
            );
        }
        if self.object.enter() {
            self.object
                .native()
                .attach_shader(self.object.id(), shader.id());
        }
        self.linked = false;
        self
    }

    /// Link the attached shaders. Does nothing if already linked.
    pub fn link(&mut self) -> Result<&mut Self> {
        let id = self.object.id();
        if self.linked {
            info!(
                "Program {} ignored link request because it was already linked",
                id
            );
            return Ok(self);
        }
        if !self.object.enter() {
            return Err(Error::UnknownContext(self.object.context()));
        }

        match self.object.native().link_program(id) {
            Ok(()) => {
                debug!("Program {} successfully linked", id);
                self.linked = true;
                Ok(self)
            }
            Err(log) => {
                error!("Program {} failed to link: {}", id, log);
                Err(Error::ProgramLink { id, log })
            }
        }
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Make this the program used for drawing, `false` if the
    /// program's context is gone.
    pub fn bind(&self) -> bool {
        if !self.linked {
            warn!(
                "Program {} is bound before it was linked",
                self.object.id()
            );
        }
        self.object.bind(BindSlot::Program)
    }

    pub fn is_bound(&self) -> bool {
        self.object.is_bound(BindSlot::Program)
    }

    /// Location of the active uniform `name`, `None` when the program
    /// has no such uniform.
    pub fn uniform_location(&self, name: &str) -> Option<i32> {
        if !self.object.enter() {
            return None;
        }
        match self.object.native().uniform_location(self.object.id(), name) {
            -1 => None,
            location => Some(location),
        }
    }

    /// Set uniform `name` of this program, binding it first. Unknown
    /// names are skipped.
    pub fn set_uniform(&self, name: &str, value: Uniform) -> &Self {
        if !self.bind() {
            return self;
        }
        match self.uniform_location(name) {
            Some(location) => self.object.native().set_uniform(location, &value),
            None => debug!(
                "Program {} has no active uniform {}",
                self.object.id(),
                name
            ),
        }
        self
    }

    pub fn set_bool(&self, name: &str, value: bool) -> &Self {
        self.set_uniform(name, Uniform::Int(value as i32))
    }

    pub fn set_int(&self, name: &str, value: i32) -> &Self {
        self.set_uniform(name, Uniform::Int(value))
    }

    pub fn set_float(&self, name: &str, value: f32) -> &Self {
        self.set_uniform(name, Uniform::Float(value))
    }

    pub fn set_vec2(&self, name: &str, value: &glm::Vec2) -> &Self {
        self.set_uniform(name, Uniform::Vec2(*value))
    }

    pub fn set_vec3(&self, name: &str, value: &glm::Vec3) -> &Self {
        self.set_uniform(name, Uniform::Vec3(*value))
    }

    pub fn set_vec4(&self, name: &str, value: &glm::Vec4) -> &Self {
        self.set_uniform(name, Uniform::Vec4(*value))
    }

    pub fn set_mat2(&self, name: &str, value: &glm::Mat2) -> &Self {
        self.set_uniform(name, Uniform::Mat2(*value))
    }

    pub fn set_mat3(&self, name: &str, value: &glm::Mat3) -> &Self {
        self.set_uniform(name, Uniform::Mat3(*value))
    }

    pub fn set_mat4(&self, name: &str, value: &glm::Mat4) -> &Self {
        self.set_uniform(name, Uniform::Mat4(*value))
    }
}
