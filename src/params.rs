//! Enumerated parameters of the native API.
//!
//! None of these carry native values. They are translated to the
//! native enums in one place, [`crate::native::opengl`], right where
//! the native call is issued.

use crate::glm;

/// Binding point of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

/// Usage hint handed to the driver on buffer uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// set once and only used a few times
    StreamDraw,
    /// set once and used many times
    StaticDraw,
    /// set often and used many times
    DynamicDraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// Component type of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttribType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
}

impl AttribType {
    /// Size of a single component in bytes.
    pub fn size(&self) -> usize {
        match self {
            AttribType::I8 | AttribType::U8 => 1,
            AttribType::I16 | AttribType::U16 => 2,
            AttribType::I32 | AttribType::U32 | AttribType::F32 => 4,
        }
    }
}

/// Channel layout of pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Red,
    Rg,
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn components(&self) -> usize {
        match self {
            PixelFormat::Red => 1,
            PixelFormat::Rg => 2,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// Type of a single channel of pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    U8,
    F32,
}

impl PixelType {
    pub fn size(&self) -> usize {
        match self {
            PixelType::U8 => 1,
            PixelType::F32 => 4,
        }
    }
}

/// Storage format of a texture on the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternalFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
    R32F,
    Rgba32F,
}

/// Row alignment of pixel data being uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnpackAlignment {
    One,
    Two,
    Four,
    Eight,
}

impl UnpackAlignment {
    pub fn bytes(&self) -> usize {
        match self {
            UnpackAlignment::One => 1,
            UnpackAlignment::Two => 2,
            UnpackAlignment::Four => 4,
            UnpackAlignment::Eight => 8,
        }
    }
}

impl Default for UnpackAlignment {
    fn default() -> Self {
        UnpackAlignment::Four
    }
}

/// Texture coordinate wrapping. The border color is only meaningful
/// for [`WrapMode::ClampToBorder`] so it only lives there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WrapMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder(glm::Vec4),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapAxis {
    S,
    T,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Which lookup a filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterAction {
    Minifying,
    Magnifying,
    All,
}

/// `<pixel interpolation>Mipmap<mipmap selection>`, same as the native
/// naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MipmapFilter {
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}
