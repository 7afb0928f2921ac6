use std::rc::Rc;

use bytemuck::Pod;
use log::warn;

use super::buffer::Buffer;
use super::{GlObject, GpuResource, ResourceKind};
use crate::bind_cache::BindSlot;
use crate::context::ContextId;
use crate::errors::Result;
use crate::gpu::Gpu;
use crate::native::MAX_GL_SIZE;
use crate::params::{AttribType, BufferTarget, BufferUsage, DrawMode};

/// Layout of a single vertex attribute inside the vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader attribute location.
    pub location: u32,
    /// Components per vertex, 1 to 4.
    pub components: u8,
    pub component_type: AttribType,
    /// Whether integer components are normalized to [0, 1] or [-1, 1].
    pub normalized: bool,
    /// Bytes between consecutive vertices, 0 for tightly packed.
    pub stride: usize,
    /// Byte offset of the first component in the buffer.
    pub offset: usize,
}

impl VertexAttribute {
    pub fn new(location: u32, components: u8, component_type: AttribType) -> Self {
        Self {
            location,
            components,
            component_type,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    pub fn stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Size in bytes of the attribute for a single vertex.
    pub fn size(&self) -> usize {
        self.components as usize * self.component_type.size()
    }
}

/// A vertex array together with the vertex buffer it reads from.
#[derive(Debug)]
pub struct VertexArray {
    vertex_buffer: Buffer,
    object: GlObject,
    attributes: Vec<VertexAttribute>,
}

impl GpuResource for VertexArray {
    fn id(&self) -> u32 {
        self.object.id()
    }

    fn kind(&self) -> ResourceKind {
        self.object.kind()
    }

    fn context(&self) -> ContextId {
        self.object.context()
    }

    fn is_alive(&self) -> bool {
        self.object.is_alive()
    }

    /// Releases the vertex buffer as well.
    fn release(&mut self) {
        // buffer before the array that references it
        self.vertex_buffer.release();
        self.object.release();
    }
}

impl VertexArray {
    pub fn new(gpu: &Rc<Gpu>) -> Result<Self> {
        let vertex_buffer = Buffer::new(gpu)?;
        let object = GlObject::create(gpu, ResourceKind::VertexArray, |native| {
            native.gen_vertex_array()
        })?;
        Ok(Self {
            vertex_buffer,
            object,
            attributes: Vec::new(),
        })
    }

    /// Bind the vertex array and its vertex buffer, `false` if their
    /// context is gone.
    pub fn bind(&self) -> bool {
        self.object.bind(BindSlot::VertexArray) && self.vertex_buffer.bind(BufferTarget::Array)
    }

    pub fn is_bound(&self) -> bool {
        self.object.is_bound(BindSlot::VertexArray)
    }

    /// Replace the contents of the vertex buffer with `data`.
    pub fn buffer_vertex_data<T: Pod>(&mut self, data: &[T], usage: BufferUsage) -> &mut Self {
        if !self.bind() {
            return self;
        }
        self.vertex_buffer
            .buffer_data(BufferTarget::Array, data, usage);
        self
    }

    /// Describe where `attribute` lives in the vertex buffer and enable
    /// it. Assigning a location again replaces its previous layout.
    pub fn assign_vertex_attribute(&mut self, attribute: VertexAttribute) -> &mut Self {
        if !(1..=4).contains(&attribute.components) {
            warn!(
                "Vertex attribute {} has {} components, only 1 to 4 are supported",
                attribute.location, attribute.components
            );
            return self;
        }
        if attribute.stride > MAX_GL_SIZE {
            warn!(
                "Vertex attribute {} has a stride of {} bytes, at most {} is supported",
                attribute.location, attribute.stride, MAX_GL_SIZE
            );
            return self;
        }
        if !self.bind() {
            return self;
        }

        let native = self.object.native();
        native.vertex_attrib_pointer(&attribute);
        native.enable_vertex_attrib_array(attribute.location);

        match self
            .attributes
            .iter_mut()
            .find(|assigned| assigned.location == attribute.location)
        {
            Some(assigned) => *assigned = attribute,
            None => self.attributes.push(attribute),
        }
        self
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Draw `count` vertices starting at vertex `first`.
    pub fn draw(&self, mode: DrawMode, first: usize, count: usize) {
        if first > MAX_GL_SIZE || count > MAX_GL_SIZE {
            warn!(
                "Cannot draw {} vertices from vertex {}, at most {} are supported",
                count, first, MAX_GL_SIZE
            );
            return;
        }
        if !self.bind() {
            return;
        }
        self.object.native().draw_arrays(mode, first, count);
    }

    pub fn vertex_buffer(&self) -> &Buffer {
        &self.vertex_buffer
    }

    pub fn vertex_buffer_mut(&mut self) -> &mut Buffer {
        &mut self.vertex_buffer
    }
}

impl Drop for VertexArray {
    fn drop(&mut self) {
        GpuResource::release(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextConfig;
    use crate::native::recording::{Headless, NativeCall};

    #[repr(C)]
    #[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
    struct Vertex {
        pos: [f32; 2],
        color: [f32; 3],
    }

    fn setup() -> Headless {
        let headless = Headless::new();
        headless
            .gpu
            .create_context(&ContextConfig::default())
            .unwrap();
        headless.log().clear();
        headless
    }

    #[test]
    fn vertex_array_creates_buffer_first() {
        let headless = setup();

        let vertex_array = VertexArray::new(&headless.gpu).unwrap();

        assert_eq!(
            headless.log().calls(),
            vec![
                NativeCall::GenBuffer(vertex_array.vertex_buffer().id()),
                NativeCall::GenVertexArray(vertex_array.id()),
            ]
        );
    }

    #[test]
    fn vertex_array_drop_releases_buffer_then_array() {
        let headless = setup();
        let vertex_array = VertexArray::new(&headless.gpu).unwrap();
        let buffer_id = vertex_array.vertex_buffer().id();
        let id = vertex_array.id();
        headless.log().clear();

        drop(vertex_array);

        assert_eq!(
            headless.log().calls(),
            vec![
                NativeCall::DeleteBuffer(buffer_id),
                NativeCall::DeleteVertexArray(id),
            ]
        );
    }

    #[test]
    fn vertex_array_upload_and_draw() {
        let headless = setup();
        let mut vertex_array = VertexArray::new(&headless.gpu).unwrap();
        let buffer_id = vertex_array.vertex_buffer().id();
        let id = vertex_array.id();
        headless.log().clear();

        let vertices = [
            Vertex {
                pos: [-0.5, -0.5],
                color: [1.0, 0.0, 0.0],
            },
            Vertex {
                pos: [0.5, -0.5],
                color: [0.0, 1.0, 0.0],
            },
            Vertex {
                pos: [0.0, 0.5],
                color: [0.0, 0.0, 1.0],
            },
        ];
        let stride = std::mem::size_of::<Vertex>();
        let position = VertexAttribute::new(0, 2, AttribType::F32).stride(stride);
        let color = VertexAttribute::new(1, 3, AttribType::F32)
            .stride(stride)
            .offset(8);

        vertex_array
            .buffer_vertex_data(&vertices, BufferUsage::StaticDraw)
            .assign_vertex_attribute(position)
            .assign_vertex_attribute(color);
        vertex_array.draw(DrawMode::Triangles, 0, 3);

        assert_eq!(vertex_array.vertex_buffer().size(), 60);
        assert_eq!(vertex_array.attributes(), &[position, color]);
        assert_eq!(
            headless.log().calls(),
            vec![
                NativeCall::BindVertexArray(id),
                NativeCall::BindBuffer(BufferTarget::Array, buffer_id),
                NativeCall::BufferData {
                    target: BufferTarget::Array,
                    size: 60,
                    with_data: true,
                    usage: BufferUsage::StaticDraw,
                },
                NativeCall::VertexAttribPointer(position),
                NativeCall::EnableVertexAttribArray(0),
                NativeCall::VertexAttribPointer(color),
                NativeCall::EnableVertexAttribArray(1),
                NativeCall::DrawArrays {
                    mode: DrawMode::Triangles,
                    first: 0,
                    count: 3,
                },
            ]
        );
    }

    #[test]
    fn vertex_array_rejects_bad_component_count() {
        let headless = setup();
        let mut vertex_array = VertexArray::new(&headless.gpu).unwrap();
        headless.log().clear();

        vertex_array
            .assign_vertex_attribute(VertexAttribute::new(0, 0, AttribType::F32))
            .assign_vertex_attribute(VertexAttribute::new(0, 5, AttribType::U8));

        assert!(vertex_array.attributes().is_empty());
        assert!(headless.log().calls().is_empty());
    }

    #[test]
    fn vertex_array_rejects_oversized_stride() {
        let headless = setup();
        let mut vertex_array = VertexArray::new(&headless.gpu).unwrap();
        headless.log().clear();

        let attribute = VertexAttribute::new(0, 3, AttribType::F32).stride(usize::MAX);
        vertex_array.assign_vertex_attribute(attribute);

        assert!(vertex_array.attributes().is_empty());
        assert!(headless.log().calls().is_empty());
    }

    #[test]
    fn vertex_array_draw_oversized_range_skipped() {
        let headless = setup();
        let vertex_array = VertexArray::new(&headless.gpu).unwrap();
        headless.log().clear();

        vertex_array.draw(DrawMode::Triangles, 0, usize::MAX);
        vertex_array.draw(DrawMode::Points, MAX_GL_SIZE + 1, 1);

        assert!(headless.log().calls().is_empty());
    }

    #[test]
    fn vertex_array_release_takes_buffer_along() {
        let headless = setup();
        let mut vertex_array = VertexArray::new(&headless.gpu).unwrap();

        vertex_array.release();
        assert_eq!(vertex_array.id(), 0);
        assert_eq!(vertex_array.vertex_buffer().id(), 0);
        drop(vertex_array);

        assert_eq!(headless.log().count(NativeCall::is_release), 2);
    }

    #[test]
    fn vertex_array_reassign_location_replaces() {
        let headless = setup();
        let mut vertex_array = VertexArray::new(&headless.gpu).unwrap();

        let packed = VertexAttribute::new(2, 4, AttribType::U8).normalized();
        vertex_array
            .assign_vertex_attribute(VertexAttribute::new(2, 3, AttribType::F32))
            .assign_vertex_attribute(packed);

        assert_eq!(vertex_array.attributes(), &[packed]);
        assert_eq!(packed.size(), 4);
    }

    #[test]
    fn vertex_array_bind_invalidates_element_buffer() {
        let headless = setup();
        let vertex_array = VertexArray::new(&headless.gpu).unwrap();
        let indices = Buffer::new(&headless.gpu).unwrap();

        indices.bind(BufferTarget::ElementArray);
        assert!(indices.is_bound(BufferTarget::ElementArray));

        vertex_array.bind();
        assert!(vertex_array.is_bound());
        assert!(!indices.is_bound(BufferTarget::ElementArray));
    }
}
