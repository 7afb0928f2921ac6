//! The seam between the handle layer and the native graphics API.
//!
//! Every method maps to one native call (or one call plus its status
//! query). Implementations do no bookkeeping of their own, caching and
//! ownership live above this trait.

pub mod opengl;
pub mod recording;

use crate::glm;
use crate::params::{
    BufferTarget, BufferUsage, DrawMode, FilterMode, InternalFormat, MipmapFilter, PixelFormat,
    PixelType, ShaderStage, UnpackAlignment, WrapMode,
};
use crate::resources::vertex_array::VertexAttribute;

/// Largest count, stride or texture dimension the native API accepts.
pub const MAX_GL_SIZE: usize = i32::MAX as usize;

/// Largest buffer size or offset in bytes the native API accepts.
pub const MAX_BUFFER_SIZE: usize = isize::MAX as usize;

/// Value of a shader uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniform {
    Int(i32),
    Float(f32),
    Vec2(glm::Vec2),
    Vec3(glm::Vec3),
    Vec4(glm::Vec4),
    Mat2(glm::Mat2),
    Mat3(glm::Mat3),
    Mat4(glm::Mat4),
}

/// A single parameter of the currently bound 2D texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TexParameter {
    WrapS(WrapMode),
    WrapT(WrapMode),
    BorderColor(glm::Vec4),
    MinFilter(FilterMode),
    MinMipmapFilter(MipmapFilter),
    MagFilter(FilterMode),
}

/// Pixel data of a 2D texture upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexImage<'a> {
    pub level: i32,
    pub internal_format: InternalFormat,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixel_type: PixelType,
    /// `None` only allocates storage.
    pub pixels: Option<&'a [u8]>,
}

pub trait NativeGl {
    fn gen_buffer(&self) -> u32;
    fn delete_buffer(&self, id: u32);
    fn bind_buffer(&self, target: BufferTarget, id: u32);
    /// Allocate `size` bytes of storage for the bound buffer, filled
    /// with `data` when given.
    fn buffer_data(&self, target: BufferTarget, size: usize, data: Option<&[u8]>, usage: BufferUsage);
    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]);

    fn gen_texture(&self) -> u32;
    fn delete_texture(&self, id: u32);
    /// Select texture unit `unit`, must be in [0, 32).
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, id: u32);
    fn pixel_store_unpack_alignment(&self, alignment: UnpackAlignment);
    fn tex_image_2d(&self, image: &TexImage<'_>);
    fn generate_mipmap(&self);
    fn tex_parameter(&self, parameter: TexParameter);

    fn create_shader(&self, stage: ShaderStage) -> u32;
    fn delete_shader(&self, id: u32);
    /// Set the source and compile, `Err` carries the diagnostic log.
    fn compile_shader(&self, id: u32, source: &str) -> Result<(), String>;

    fn create_program(&self) -> u32;
    fn delete_program(&self, id: u32);
    fn attach_shader(&self, program: u32, shader: u32);
    /// Link, `Err` carries the diagnostic log.
    fn link_program(&self, program: u32) -> Result<(), String>;
    fn use_program(&self, id: u32);
    /// -1 when the program has no active uniform `name`.
    fn uniform_location(&self, program: u32, name: &str) -> i32;
    fn set_uniform(&self, location: i32, value: &Uniform);

    fn gen_vertex_array(&self) -> u32;
    fn delete_vertex_array(&self, id: u32);
    fn bind_vertex_array(&self, id: u32);
    fn vertex_attrib_pointer(&self, attribute: &VertexAttribute);
    fn enable_vertex_attrib_array(&self, location: u32);
    fn draw_arrays(&self, mode: DrawMode, first: usize, count: usize);

    /// SRC_ALPHA, ONE_MINUS_SRC_ALPHA blending on the current context.
    fn enable_alpha_blending(&self);
    fn clear(&self, color: &glm::Vec4);
}
