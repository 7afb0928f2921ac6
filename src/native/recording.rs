//! Headless implementations of [`NativeGl`] and [`Platform`] that
//! record every call into a shared, ordered [`CallLog`].
//!
//! Used by the tests and benchmarks, and by anything else that wants to
//! drive the handle layer without a display.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::rc::Rc;

use super::{NativeGl, TexImage, TexParameter, Uniform};
use crate::config::ContextConfig;
use crate::context::{ContextId, Platform};
use crate::errors::{Error, Result};
use crate::glm;
use crate::gpu::Gpu;
use crate::params::{
    BufferTarget, BufferUsage, DrawMode, InternalFormat, PixelFormat, PixelType, ShaderStage,
    UnpackAlignment,
};
use crate::resources::vertex_array::VertexAttribute;

#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    Init,
    Terminate,
    CreateSurface(ContextId),
    DestroySurface(ContextId),
    MakeCurrent(ContextId),
    SwapBuffers(ContextId),

    GenBuffer(u32),
    DeleteBuffer(u32),
    BindBuffer(BufferTarget, u32),
    BufferData {
        target: BufferTarget,
        size: usize,
        with_data: bool,
        usage: BufferUsage,
    },
    BufferSubData {
        target: BufferTarget,
        offset: usize,
        size: usize,
    },

    GenTexture(u32),
    DeleteTexture(u32),
    ActiveTexture(u32),
    BindTexture(u32),
    PixelStoreUnpackAlignment(UnpackAlignment),
    TexImage2D {
        level: i32,
        internal_format: InternalFormat,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixel_type: PixelType,
        with_data: bool,
    },
    GenerateMipmap,
    TexParameter(TexParameter),

    CreateShader(ShaderStage, u32),
    DeleteShader(u32),
    CompileShader(u32),
    CreateProgram(u32),
    DeleteProgram(u32),
    AttachShader { program: u32, shader: u32 },
    LinkProgram(u32),
    UseProgram(u32),
    UniformLocation(u32, String),
    SetUniform(i32, Uniform),

    GenVertexArray(u32),
    DeleteVertexArray(u32),
    BindVertexArray(u32),
    VertexAttribPointer(VertexAttribute),
    EnableVertexAttribArray(u32),
    DrawArrays {
        mode: DrawMode,
        first: usize,
        count: usize,
    },

    EnableAlphaBlending,
    Clear(glm::Vec4),
}

impl NativeCall {
    /// Native id released by this call, if it is a release call.
    pub fn released_id(&self) -> Option<u32> {
        match self {
            NativeCall::DeleteBuffer(id)
            | NativeCall::DeleteTexture(id)
            | NativeCall::DeleteShader(id)
            | NativeCall::DeleteProgram(id)
            | NativeCall::DeleteVertexArray(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_release(&self) -> bool {
        self.released_id().is_some()
    }

    pub fn is_bind(&self) -> bool {
        matches!(
            self,
            NativeCall::BindBuffer(..)
                | NativeCall::BindTexture(_)
                | NativeCall::BindVertexArray(_)
                | NativeCall::UseProgram(_)
        )
    }
}

/// Ordered log of native calls, cheap to clone, clones share the log.
#[derive(Debug, Default, Clone)]
pub struct CallLog {
    calls: Rc<RefCell<Vec<NativeCall>>>,
}

impl CallLog {
    pub fn push(&self, call: NativeCall) {
        self.calls.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<NativeCall> {
        self.calls.borrow().clone()
    }

    pub fn count<F: Fn(&NativeCall) -> bool>(&self, predicate: F) -> usize {
        self.calls.borrow().iter().filter(|call| predicate(call)).count()
    }

    pub fn position<F: Fn(&NativeCall) -> bool>(&self, predicate: F) -> Option<usize> {
        self.calls.borrow().iter().position(|call| predicate(call))
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

#[derive(Debug)]
struct RecordingState {
    next_id: Cell<u32>,
    null_creations: Cell<usize>,
    compile_errors: RefCell<VecDeque<String>>,
    link_errors: RefCell<VecDeque<String>>,
    uniform_locations: RefCell<HashMap<(u32, String), i32>>,
}

/// [`NativeGl`] that hands out ids monotonically and records every
/// call. Clones share their state.
#[derive(Debug, Clone)]
pub struct RecordingGl {
    log: CallLog,
    state: Rc<RecordingState>,
}

impl RecordingGl {
    pub fn new(log: CallLog) -> Self {
        Self::starting_at(log, 1)
    }

    /// Created objects get ids `first_id`, `first_id + 1`, ...
    pub fn starting_at(log: CallLog, first_id: u32) -> Self {
        assert_ne!(first_id, 0);
        Self {
            log,
            state: Rc::new(RecordingState {
                next_id: Cell::new(first_id),
                null_creations: Cell::new(0),
                compile_errors: RefCell::new(VecDeque::new()),
                link_errors: RefCell::new(VecDeque::new()),
                uniform_locations: RefCell::new(HashMap::new()),
            }),
        }
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// The next creation call returns the null identifier.
    pub fn fail_next_creation(&self) {
        self.state
            .null_creations
            .set(self.state.null_creations.get() + 1);
    }

    /// The next compile fails with `log` as its diagnostic.
    pub fn fail_next_compile(&self, log: &str) {
        self.state
            .compile_errors
            .borrow_mut()
            .push_back(log.to_string());
    }

    /// The next link fails with `log` as its diagnostic.
    pub fn fail_next_link(&self, log: &str) {
        self.state.link_errors.borrow_mut().push_back(log.to_string());
    }

    fn next_id(&self) -> u32 {
        let null_creations = self.state.null_creations.get();
        if null_creations > 0 {
            self.state.null_creations.set(null_creations - 1);
            return 0;
        }
        let id = self.state.next_id.get();
        self.state.next_id.set(id + 1);
        id
    }
}

impl NativeGl for RecordingGl {
    fn gen_buffer(&self) -> u32 {
        let id = self.next_id();
        self.log.push(NativeCall::GenBuffer(id));
        id
    }

    fn delete_buffer(&self, id: u32) {
        self.log.push(NativeCall::DeleteBuffer(id));
    }

    fn bind_buffer(&self, target: BufferTarget, id: u32) {
        self.log.push(NativeCall::BindBuffer(target, id));
    }

    fn buffer_data(&self, target: BufferTarget, size: usize, data: Option<&[u8]>, usage: BufferUsage) {
        self.log.push(NativeCall::BufferData {
            target,
            size,
            with_data: data.is_some(),
            usage,
        });
    }

    fn buffer_sub_data(&self, target: BufferTarget, offset: usize, data: &[u8]) {
        self.log.push(NativeCall::BufferSubData {
            target,
            offset,
            size: data.len(),
        });
    }

    fn gen_texture(&self) -> u32 {
        let id = self.next_id();
        self.log.push(NativeCall::GenTexture(id));
        id
    }

    fn delete_texture(&self, id: u32) {
        self.log.push(NativeCall::DeleteTexture(id));
    }

    fn active_texture(&self, unit: u32) {
        self.log.push(NativeCall::ActiveTexture(unit));
    }

    fn bind_texture(&self, id: u32) {
        self.log.push(NativeCall::BindTexture(id));
    }

    fn pixel_store_unpack_alignment(&self, alignment: UnpackAlignment) {
        self.log.push(NativeCall::PixelStoreUnpackAlignment(alignment));
    }

    fn tex_image_2d(&self, image: &TexImage<'_>) {
        self.log.push(NativeCall::TexImage2D {
            level: image.level,
            internal_format: image.internal_format,
            width: image.width,
            height: image.height,
            format: image.format,
            pixel_type: image.pixel_type,
            with_data: image.pixels.is_some(),
        });
    }

    fn generate_mipmap(&self) {
        self.log.push(NativeCall::GenerateMipmap);
    }

    fn tex_parameter(&self, parameter: TexParameter) {
        self.log.push(NativeCall::TexParameter(parameter));
    }

    fn create_shader(&self, stage: ShaderStage) -> u32 {
        let id = self.next_id();
        self.log.push(NativeCall::CreateShader(stage, id));
        id
    }

    fn delete_shader(&self, id: u32) {
        self.log.push(NativeCall::DeleteShader(id));
    }

    fn compile_shader(&self, id: u32, _source: &str) -> std::result::Result<(), String> {
        self.log.push(NativeCall::CompileShader(id));
        match self.state.compile_errors.borrow_mut().pop_front() {
            Some(log) => Err(log),
            None => Ok(()),
        }
    }

    fn create_program(&self) -> u32 {
        let id = self.next_id();
        self.log.push(NativeCall::CreateProgram(id));
        id
    }

    fn delete_program(&self, id: u32) {
        self.log.push(NativeCall::DeleteProgram(id));
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        self.log.push(NativeCall::AttachShader { program, shader });
    }

    fn link_program(&self, program: u32) -> std::result::Result<(), String> {
        self.log.push(NativeCall::LinkProgram(program));
        match self.state.link_errors.borrow_mut().pop_front() {
            Some(log) => Err(log),
            None => Ok(()),
        }
    }

    fn use_program(&self, id: u32) {
        self.log.push(NativeCall::UseProgram(id));
    }

    fn uniform_location(&self, program: u32, name: &str) -> i32 {
        self.log
            .push(NativeCall::UniformLocation(program, name.to_string()));
        if program == 0 {
            return -1;
        }
        let mut locations = self.state.uniform_locations.borrow_mut();
        let next_location = locations
            .keys()
            .filter(|(location_program, _)| *location_program == program)
            .count() as i32;
        *locations
            .entry((program, name.to_string()))
            .or_insert(next_location)
    }

    fn set_uniform(&self, location: i32, value: &Uniform) {
        self.log.push(NativeCall::SetUniform(location, *value));
    }

    fn gen_vertex_array(&self) -> u32 {
        let id = self.next_id();
        self.log.push(NativeCall::GenVertexArray(id));
        id
    }

    fn delete_vertex_array(&self, id: u32) {
        self.log.push(NativeCall::DeleteVertexArray(id));
    }

    fn bind_vertex_array(&self, id: u32) {
        self.log.push(NativeCall::BindVertexArray(id));
    }

    fn vertex_attrib_pointer(&self, attribute: &VertexAttribute) {
        self.log.push(NativeCall::VertexAttribPointer(*attribute));
    }

    fn enable_vertex_attrib_array(&self, location: u32) {
        self.log.push(NativeCall::EnableVertexAttribArray(location));
    }

    fn draw_arrays(&self, mode: DrawMode, first: usize, count: usize) {
        self.log.push(NativeCall::DrawArrays { mode, first, count });
    }

    fn enable_alpha_blending(&self) {
        self.log.push(NativeCall::EnableAlphaBlending);
    }

    fn clear(&self, color: &glm::Vec4) {
        self.log.push(NativeCall::Clear(*color));
    }
}

#[derive(Debug, Default)]
struct HeadlessState {
    fail_init: Cell<bool>,
    fail_next_surface: Cell<bool>,
    close_requests: RefCell<BTreeSet<ContextId>>,
}

/// [`Platform`] without any windows. Clones share their state.
#[derive(Debug, Clone)]
pub struct HeadlessPlatform {
    log: CallLog,
    state: Rc<HeadlessState>,
}

impl HeadlessPlatform {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            state: Rc::new(HeadlessState::default()),
        }
    }

    pub fn fail_init(&self) {
        self.state.fail_init.set(true);
    }

    pub fn fail_next_surface(&self) {
        self.state.fail_next_surface.set(true);
    }

    /// Reported by the next [`Platform::poll_events()`].
    pub fn request_close(&self, id: ContextId) {
        self.state.close_requests.borrow_mut().insert(id);
    }
}

impl Platform for HeadlessPlatform {
    fn init(&mut self, _config: &ContextConfig) -> Result<()> {
        if self.state.fail_init.get() {
            return Err(Error::SubsystemInit(
                "headless platform asked to fail".to_string(),
            ));
        }
        self.log.push(NativeCall::Init);
        Ok(())
    }

    fn create_surface(&mut self, id: ContextId, _config: &ContextConfig) -> Result<()> {
        if self.state.fail_next_surface.replace(false) {
            return Err(Error::ContextCreation(format!(
                "headless surface {} asked to fail",
                id
            )));
        }
        self.log.push(NativeCall::CreateSurface(id));
        Ok(())
    }

    fn destroy_surface(&mut self, id: ContextId) {
        self.state.close_requests.borrow_mut().remove(&id);
        self.log.push(NativeCall::DestroySurface(id));
    }

    fn make_current(&mut self, id: ContextId) {
        self.log.push(NativeCall::MakeCurrent(id));
    }

    fn terminate(&mut self) {
        self.log.push(NativeCall::Terminate);
    }

    fn poll_events(&mut self) -> Vec<ContextId> {
        self.state.close_requests.borrow().iter().copied().collect()
    }

    fn swap_buffers(&mut self, id: ContextId) {
        self.log.push(NativeCall::SwapBuffers(id));
    }
}

/// A [`Gpu`] wired to a [`RecordingGl`] and a [`HeadlessPlatform`]
/// sharing one [`CallLog`].
pub struct Headless {
    pub gpu: Rc<Gpu>,
    pub native: RecordingGl,
    pub platform: HeadlessPlatform,
}

impl Headless {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first_id: u32) -> Self {
        let log = CallLog::default();
        let native = RecordingGl::starting_at(log.clone(), first_id);
        let platform = HeadlessPlatform::new(log);
        let gpu = Gpu::new(Box::new(native.clone()), Box::new(platform.clone()));
        Self {
            gpu,
            native,
            platform,
        }
    }

    pub fn log(&self) -> &CallLog {
        self.native.log()
    }
}

impl Default for Headless {
    fn default() -> Self {
        Self::new()
    }
}
