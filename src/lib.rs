pub mod bind_cache;
pub mod config;
pub mod context;
pub mod errors;
pub mod gpu;
pub mod native;
pub mod params;
pub mod resources;
pub mod window;

#[cfg(test)]
mod testing;

pub use nalgebra_glm as glm;

pub use crate::config::ContextConfig;
pub use crate::context::ContextId;
pub use crate::errors::{Error, Result};
pub use crate::gpu::Gpu;
pub use crate::resources::buffer::Buffer;
pub use crate::resources::shader::Shader;
pub use crate::resources::shader_program::ShaderProgram;
pub use crate::resources::texture::{ImageData, Texture};
pub use crate::resources::vertex_array::{VertexArray, VertexAttribute};
pub use crate::resources::GpuResource;
