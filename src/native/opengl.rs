use std::convert::TryInto;
use std::ffi::CString;

use log::error;

use super::{NativeGl, TexImage, TexParameter, Uniform};
use crate::glm;
use crate::params::{
    AttribType, BufferTarget, BufferUsage, DrawMode, FilterMode, InternalFormat, MipmapFilter,
    PixelFormat, PixelType, ShaderStage, UnpackAlignment, WrapMode,
};
use crate::resources::vertex_array::VertexAttribute;

/// [`NativeGl`] backed by the `gl` crate.
///
/// Function pointers must have been loaded (`gl::load_with()`) and a
/// context must be current before any method is called, the
/// [`crate::window::GlfwPlatform`] does the loading on the first
/// activation.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenGl;

impl OpenGl {
    pub fn new() -> Self {
        Self
    }
}

impl BufferTarget {
    fn to_gl(self) -> gl::types::GLenum {
        match self {
            BufferTarget::Array => gl::ARRAY_BUFFER,
            BufferTarget::ElementArray => gl::ELEMENT_ARRAY_BUFFER,
        }
    }
}

impl BufferUsage {
    fn to_gl(self) -> gl::types::GLenum {
        match self {
            BufferUsage::StreamDraw => gl::STREAM_DRAW,
            BufferUsage::StaticDraw => gl::STATIC_DRAW,
            BufferUsage::DynamicDraw => gl::DYNAMIC_DRAW,
        }
    }
}

impl ShaderStage {
    fn to_gl(self) -> gl::types::GLenum {
        match self {
            ShaderStage::Vertex => gl::VERTEX_SHADER,
            ShaderStage::Fragment => gl::FRAGMENT_SHADER,
        }
    }
}

impl DrawMode {
    fn to_gl(self) -> gl::types::GLenum {
        match self {
            DrawMode::Points => gl::POINTS,
            DrawMode::Lines => gl::LINES,
            DrawMode::LineLoop => gl::LINE_LOOP,
            DrawMode::LineStrip => gl::LINE_STRIP,
            DrawMode::Triangles => gl::TRIANGLES,
            DrawMode::TriangleStrip => gl::TRIANGLE_STRIP,
            DrawMode::TriangleFan => gl::TRIANGLE_FAN,
        }
    }
}

impl AttribType {
    fn to_gl(self) -> gl::types::GLenum {
        match self {
            AttribType::I8 => gl::BYTE,
            AttribType::U8 => gl::UNSIGNED_BYTE,
            AttribType::I16 => gl::SHORT,
            AttribType::U16 => gl::UNSIGNED_SHORT,
            AttribType::I32 => gl::INT,
            AttribType::U32 => gl::UNSIGNED_INT,
            AttribType::F32 => gl::FLOAT,
        }
    }
}

impl PixelFormat {
    fn to_gl(self) -> gl::types::GLenum {
        match self {
            PixelFormat::Red => gl::RED,
            PixelFormat::Rg => gl::RG,
            PixelFormat::Rgb => gl::RGB,
            PixelFormat::Rgba => gl::RGBA,
        }
    }
}

impl PixelType {
    fn to_gl(self) -> gl::types::GLenum {
        match self {
            PixelType::U8 => gl::UNSIGNED_BYTE,
            PixelType::F32 => gl::FLOAT,
        }
    }
}

impl InternalFormat {
    fn to_gl(self) -> gl::types::GLenum {
        match self {
            InternalFormat::R8 => gl::R8,
            InternalFormat::Rg8 => gl::RG8,
            InternalFormat::Rgb8 => gl::RGB8,
            InternalFormat::Rgba8 => gl::RGBA8,
            InternalFormat::R32F => gl::R32F,
            InternalFormat::Rgba32F => gl::RGBA32F,
        }
    }
}

impl WrapMode {
    fn to_gl(self) -> gl::types::GLenum {
        match self {
            WrapMode::Repeat => gl::REPEAT,
            WrapMode::MirroredRepeat => gl::MIRRORED_REPEAT,
            WrapMode::ClampToEdge => gl::CLAMP_TO_EDGE,
            WrapMode::ClampToBorder(_) => gl::CLAMP_TO_BORDER,
        }
    }
}

impl FilterMode {
    fn to_gl(self) -> gl::types::GLenum {
        match self {
            FilterMode::Nearest => gl::NEAREST,
            FilterMode::Linear => gl::LINEAR,
        }
    }
}

impl MipmapFilter {
    fn to_gl(self) -> gl::types::GLenum {
        match self {
            MipmapFilter::NearestMipmapNearest => gl::NEAREST_MIPMAP_NEAREST,
            MipmapFilter::LinearMipmapNearest => gl::LINEAR_MIPMAP_NEAREST,
            MipmapFilter::NearestMipmapLinear => gl::NEAREST_MIPMAP_LINEAR,
            MipmapFilter::LinearMipmapLinear => gl::LINEAR_MIPMAP_LINEAR,
        }
    }
}

fn get_shader_error_log(shader: gl::types::GLuint) -> String {
    let mut max_length = 0;
    unsafe {
        gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut max_length);
    }

    let mut log: Vec<u8> = vec![0; max_length.max(0) as usize];
    let mut length = 0;
    unsafe {
        gl::GetShaderInfoLog(
            shader,
            max_length,
            &mut length,
            log.as_mut_ptr() as *mut gl::types::GLchar,
        );
    }
    log.truncate(length.max(0) as usize);

    String::from_utf8_lossy(&log).to_string()
}

fn get_program_error_log(program: gl::types::GLuint) -> String {
    let mut max_length = 0;
    unsafe {
        gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut max_length);
    }

    let mut log: Vec<u8> = vec![0; max_length.max(0) as usize];
    let mut length = 0;
    unsafe {
        gl::GetProgramInfoLog(
            program,
            max_length,
            &mut length,
            log.as_mut_ptr() as *mut gl::types::GLchar,
        );
    }
    log.truncate(length.max(0) as usize);

    String::from_utf8_lossy(&log).to_string()
}

fn gl_sizeiptr(size: usize) -> gl::types::GLsizeiptr {
    // slices never exceed isize::MAX bytes, allocations are checked by Buffer
    size.try_into().unwrap()
}

impl NativeGl for OpenGl {
    fn gen_buffer(&self) -> u32 {
        let mut id = 0;
        unsafe {
            gl::GenBuffers(1, &mut id);
        }
        id
    }

    fn delete_buffer(&self, id: u32) {
        unsafe {
            gl::DeleteBuffers(1, &id);
        }
    }

    fn bind_buffer(&self, target: BufferTarget, id: u32) {
        unsafe {
            gl::BindBuffer(target.to_gl(), id);
        }
    }

    fn buffer_data(&self, target: BufferTarget, size: usize, data: Option<&[u8]>, usage: BufferUsage) {
        let pointer = data.map_or(std::ptr::null(), |data| {
            data.as_ptr() as *const gl::types::GLvoid
        });
        unsafe {
            gl::BufferData(target.to_gl(), gl_sizeiptr(size), pointer, usage.to_gl());
        }
    }

    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]) {
        unsafe {
            gl::BufferSubData(
                target.to_gl(),
                gl_sizeiptr(offset),
                gl_sizeiptr(data.len()),
                data.as_ptr() as *const gl::types::GLvoid,
            );
        }
    }

    fn gen_texture(&self) -> u32 {
        let mut id = 0;
        unsafe {
            gl::GenTextures(1, &mut id);
        }
        id
    }

    fn delete_texture(&self, id: u32) {
        unsafe {
            gl::DeleteTextures(1, &id);
        }
    }

    fn active_texture(&self, unit: u32) {
        unsafe {
            gl::ActiveTexture(gl::TEXTURE0 + unit);
        }
    }

    fn bind_texture(&self, id: u32) {
        unsafe {
            gl::BindTexture(gl::TEXTURE_2D, id);
        }
    }

    fn pixel_store_unpack_alignment(&self, alignment: UnpackAlignment) {
        unsafe {
            gl::PixelStorei(gl::UNPACK_ALIGNMENT, alignment.bytes() as gl::types::GLint);
        }
    }

    fn tex_image_2d(&self, image: &TexImage<'_>) {
        let pointer = image.pixels.map_or(std::ptr::null(), |pixels| {
            pixels.as_ptr() as *const gl::types::GLvoid
        });
        unsafe {
            gl::TexImage2D(
                gl::TEXTURE_2D,
                image.level,
                image.internal_format.to_gl() as gl::types::GLint,
                image.width.try_into().unwrap(),
                image.height.try_into().unwrap(),
                0,
                image.format.to_gl(),
                image.pixel_type.to_gl(),
                pointer,
            );
        }
    }

    fn generate_mipmap(&self) {
        unsafe {
            gl::GenerateMipmap(gl::TEXTURE_2D);
        }
    }

    fn tex_parameter(&self, parameter: TexParameter) {
        let (name, value) = match parameter {
            TexParameter::WrapS(mode) => (gl::TEXTURE_WRAP_S, mode.to_gl()),
            TexParameter::WrapT(mode) => (gl::TEXTURE_WRAP_T, mode.to_gl()),
            TexParameter::MinFilter(filter) => (gl::TEXTURE_MIN_FILTER, filter.to_gl()),
            TexParameter::MinMipmapFilter(filter) => (gl::TEXTURE_MIN_FILTER, filter.to_gl()),
            TexParameter::MagFilter(filter) => (gl::TEXTURE_MAG_FILTER, filter.to_gl()),
            TexParameter::BorderColor(color) => {
                unsafe {
                    gl::TexParameterfv(gl::TEXTURE_2D, gl::TEXTURE_BORDER_COLOR, color.as_ptr());
                }
                return;
            }
        };
        unsafe {
            gl::TexParameteri(gl::TEXTURE_2D, name, value as gl::types::GLint);
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> u32 {
        unsafe { gl::CreateShader(stage.to_gl()) }
    }

    fn delete_shader(&self, id: u32) {
        unsafe {
            gl::DeleteShader(id);
        }
    }

    fn compile_shader(&self, id: u32, source: &str) -> Result<(), String> {
        let source = CString::new(source)
            .map_err(|_| "shader source contains an interior nul byte".to_string())?;
        unsafe {
            gl::ShaderSource(id, 1, &source.as_ptr(), std::ptr::null());
            gl::CompileShader(id);
        }

        let mut success: gl::types::GLint = -10;
        unsafe {
            gl::GetShaderiv(id, gl::COMPILE_STATUS, &mut success);
        }
        if success != gl::types::GLint::from(gl::TRUE) {
            return Err(get_shader_error_log(id));
        }
        Ok(())
    }

    fn create_program(&self) -> u32 {
        unsafe { gl::CreateProgram() }
    }

    fn delete_program(&self, id: u32) {
        unsafe {
            gl::DeleteProgram(id);
        }
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        unsafe {
            gl::AttachShader(program, shader);
        }
    }

    fn link_program(&self, program: u32) -> Result<(), String> {
        unsafe {
            gl::LinkProgram(program);
        }

        let mut success: gl::types::GLint = -10;
        unsafe {
            gl::GetProgramiv(program, gl::LINK_STATUS, &mut success);
        }
        if success != gl::types::GLint::from(gl::TRUE) {
            return Err(get_program_error_log(program));
        }
        Ok(())
    }

    fn use_program(&self, id: u32) {
        unsafe {
            gl::UseProgram(id);
        }
    }

    fn uniform_location(&self, program: u32, name: &str) -> i32 {
        match CString::new(name) {
            Ok(name) => unsafe { gl::GetUniformLocation(program, name.as_ptr()) },
            Err(_) => {
                error!("uniform name {:?} contains an interior nul byte", name);
                -1
            }
        }
    }

    fn set_uniform(&self, location: i32, value: &Uniform) {
        unsafe {
            match value {
                Uniform::Int(value) => gl::Uniform1i(location, *value),
                Uniform::Float(value) => gl::Uniform1f(location, *value),
                Uniform::Vec2(value) => gl::Uniform2f(location, value[0], value[1]),
                Uniform::Vec3(value) => gl::Uniform3f(location, value[0], value[1], value[2]),
                Uniform::Vec4(value) => {
                    gl::Uniform4f(location, value[0], value[1], value[2], value[3])
                }
                Uniform::Mat2(value) => {
                    gl::UniformMatrix2fv(location, 1, gl::FALSE, value.as_ptr())
                }
                Uniform::Mat3(value) => {
                    gl::UniformMatrix3fv(location, 1, gl::FALSE, value.as_ptr())
                }
                Uniform::Mat4(value) => {
                    gl::UniformMatrix4fv(location, 1, gl::FALSE, value.as_ptr())
                }
            }
        }
    }

    fn gen_vertex_array(&self) -> u32 {
        let mut id = 0;
        unsafe {
            gl::GenVertexArrays(1, &mut id);
        }
        id
    }

    fn delete_vertex_array(&self, id: u32) {
        unsafe {
            gl::DeleteVertexArrays(1, &id);
        }
    }

    fn bind_vertex_array(&self, id: u32) {
        unsafe {
            gl::BindVertexArray(id);
        }
    }

    fn vertex_attrib_pointer(&self, attribute: &VertexAttribute) {
        let normalized = if attribute.normalized {
            gl::TRUE
        } else {
            gl::FALSE
        };
        unsafe {
            gl::VertexAttribPointer(
                attribute.location,
                attribute.components.into(),
                attribute.component_type.to_gl(),
                normalized,
                attribute.stride.try_into().unwrap(),
                attribute.offset as *const gl::types::GLvoid,
            );
        }
    }

    fn enable_vertex_attrib_array(&self, location: u32) {
        unsafe {
            gl::EnableVertexAttribArray(location);
        }
    }

    fn draw_arrays(&self, mode: DrawMode, first: usize, count: usize) {
        unsafe {
            gl::DrawArrays(
                mode.to_gl(),
                first.try_into().unwrap(),
                count.try_into().unwrap(),
            );
        }
    }

    fn enable_alpha_blending(&self) {
        unsafe {
            gl::Enable(gl::BLEND);
            gl::BlendFunc(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA);
        }
    }

    fn clear(&self, color: &glm::Vec4) {
        unsafe {
            gl::ClearColor(color[0], color[1], color[2], color[3]);
            gl::Clear(gl::COLOR_BUFFER_BIT);
        }
    }
}
