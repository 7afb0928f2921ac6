use std::rc::Rc;

use log::{debug, warn};

use super::{impl_gpu_resource, GlObject, ResourceKind};
use crate::bind_cache::BindSlot;
use crate::errors::{Error, Result};
use crate::gpu::Gpu;
use crate::native::{TexImage, TexParameter, MAX_GL_SIZE};
use crate::params::{
    FilterAction, FilterMode, InternalFormat, MipmapFilter, PixelFormat, PixelType,
    UnpackAlignment, WrapAxis, WrapMode,
};

/// Number of texture units that can be activated.
pub const MAX_TEXTURE_UNITS: u32 = 32;

/// Decoded pixels handed over by whoever loaded the image.
#[derive(Debug, Clone, Copy)]
pub struct ImageData<'a> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixel_type: PixelType,
    pub unpack_alignment: UnpackAlignment,
    pub pixels: &'a [u8],
}

impl<'a> ImageData<'a> {
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixel_type: PixelType,
        pixels: &'a [u8],
    ) -> Self {
        Self {
            width,
            height,
            format,
            pixel_type,
            unpack_alignment: UnpackAlignment::default(),
            pixels,
        }
    }

    /// Tightly packed RGBA floats, one `[f32; 4]` per pixel.
    pub fn from_rgba_f32(width: u32, height: u32, pixels: &'a [[f32; 4]]) -> Self {
        Self::new(
            width,
            height,
            PixelFormat::Rgba,
            PixelType::F32,
            bytemuck::cast_slice(pixels),
        )
    }

    pub fn with_unpack_alignment(mut self, unpack_alignment: UnpackAlignment) -> Self {
        self.unpack_alignment = unpack_alignment;
        self
    }

    /// Bytes the native upload reads from `pixels`: every row but the
    /// last is padded to the unpack alignment. `None` if that does not
    /// fit in a `usize`.
    pub fn required_len(&self) -> Option<usize> {
        let width = self.width as usize;
        let height = self.height as usize;
        if width == 0 || height == 0 {
            return Some(0);
        }

        let row = width
            .checked_mul(self.format.components())?
            .checked_mul(self.pixel_type.size())?;
        let alignment = self.unpack_alignment.bytes();
        let padded_row = row.checked_add(alignment - 1)? / alignment * alignment;

        padded_row.checked_mul(height - 1)?.checked_add(row)
    }
}

/// A native 2D texture.
#[derive(Debug)]
pub struct Texture {
    object: GlObject,
    width: u32,
    height: u32,
}

impl_gpu_resource!(Texture; object);

impl Texture {
    pub fn new(gpu: &Rc<Gpu>) -> Result<Self> {
        let object = GlObject::create(gpu, ResourceKind::Texture, |native| native.gen_texture())?;
        Ok(Self {
            object,
            width: 0,
            height: 0,
        })
    }

    /// Bind to the active texture unit, `false` if the texture's
    /// context is gone.
    pub fn bind(&self) -> bool {
        self.object.bind(BindSlot::Texture2D)
    }

    pub fn is_bound(&self) -> bool {
        self.object.is_bound(BindSlot::Texture2D)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Make `unit` the active texture unit and bind to it.
    pub fn activate(&mut self, unit: u32) -> Result<&mut Self> {
        if unit >= MAX_TEXTURE_UNITS {
            return Err(Error::TextureUnitOutOfRange(unit));
        }
        if self.object.gpu().active_texture(self.object.context(), unit) {
            self.bind();
        }
        Ok(self)
    }

    /// Upload `image` to mipmap `level` and regenerate the mipmaps.
    pub fn image_2d(
        &mut self,
        level: i32,
        internal_format: InternalFormat,
        image: &ImageData<'_>,
    ) -> Result<&mut Self> {
        let expected = image.required_len().unwrap_or(usize::MAX);
        if image.pixels.len() < expected {
            return Err(Error::ImageSize {
                expected,
                actual: image.pixels.len(),
            });
        }
        if !self.check_dimensions(image.width, image.height) || !self.bind() {
            return Ok(self);
        }

        let native = self.object.native();
        native.pixel_store_unpack_alignment(image.unpack_alignment);
        native.tex_image_2d(&TexImage {
            level,
            internal_format,
            width: image.width,
            height: image.height,
            format: image.format,
            pixel_type: image.pixel_type,
            pixels: Some(image.pixels),
        });
        native.generate_mipmap();

        if level == 0 {
            self.width = image.width;
            self.height = image.height;
        }
        debug!("Texture {} successfully loaded", self.object.id());
        Ok(self)
    }

    /// Allocate storage for the base level without uploading pixels.
    pub fn allocate(
        &mut self,
        width: u32,
        height: u32,
        internal_format: InternalFormat,
        format: PixelFormat,
        pixel_type: PixelType,
    ) -> &mut Self {
        if !self.check_dimensions(width, height) || !self.bind() {
            return self;
        }
        self.object.native().tex_image_2d(&TexImage {
            level: 0,
            internal_format,
            width,
            height,
            format,
            pixel_type,
            pixels: None,
        });
        self.width = width;
        self.height = height;
        self
    }

    fn check_dimensions(&self, width: u32, height: u32) -> bool {
        let largest = width.max(height) as usize;
        if largest > MAX_GL_SIZE {
            warn!(
                "Texture {} cannot be {}x{}, dimensions are limited to {}",
                self.object.id(),
                width,
                height,
                MAX_GL_SIZE
            );
            return false;
        }
        true
    }

    pub fn set_wrapping(&mut self, mode: WrapMode, axis: WrapAxis) -> &mut Self {
        if !self.bind() {
            return self;
        }
        let native = self.object.native();
        if let WrapMode::ClampToBorder(color) = mode {
            native.tex_parameter(TexParameter::BorderColor(color));
        }
        match axis {
            WrapAxis::S => native.tex_parameter(TexParameter::WrapS(mode)),
            WrapAxis::T => native.tex_parameter(TexParameter::WrapT(mode)),
            WrapAxis::All => {
                native.tex_parameter(TexParameter::WrapS(mode));
                native.tex_parameter(TexParameter::WrapT(mode));
            }
        }
        self
    }

    pub fn set_filtering(&mut self, filter: FilterMode, action: FilterAction) -> &mut Self {
        if !self.bind() {
            return self;
        }
        let native = self.object.native();
        match action {
            FilterAction::Minifying => native.tex_parameter(TexParameter::MinFilter(filter)),
            FilterAction::Magnifying => native.tex_parameter(TexParameter::MagFilter(filter)),
            FilterAction::All => {
                native.tex_parameter(TexParameter::MinFilter(filter));
                native.tex_parameter(TexParameter::MagFilter(filter));
            }
        }
        self
    }

    /// Mipmaps are only consulted when minifying, so this sets the
    /// minification filter.
    pub fn set_mipmap_filtering(&mut self, filter: MipmapFilter) -> &mut Self {
        if !self.bind() {
            return self;
        }
        self.object
            .native()
            .tex_parameter(TexParameter::MinMipmapFilter(filter));
        self
    }
}
