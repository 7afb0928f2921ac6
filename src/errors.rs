//! Error types.
//!
//! Failures that leave nothing to render with (subsystem init, context
//! creation, native object creation returning the null identifier) are
//! returned from the fallible constructors and are expected to end the
//! program. Shader compilation and program linking failures are
//! returned as well, but the handle that produced them stays alive and
//! reports `is_compiled()`/`is_linked()` as `false`.
//!
//! Misuse (binding an identifier of 0, binding an unlinked program,
//! redundant link requests) is never an error, it is logged.

use std::path::PathBuf;

use thiserror::Error;

use crate::context::ContextId;
use crate::resources::ResourceKind;

#[derive(Error, Debug)]
pub enum Error {
    /// The windowing/graphics subsystem could not be initialized.
    #[error("graphics subsystem failed to initialize: {0}")]
    SubsystemInit(String),

    /// A rendering context (window) could not be created.
    #[error("context creation failed: {0}")]
    ContextCreation(String),

    #[error("context {0} is not registered")]
    UnknownContext(ContextId),

    #[error("no rendering context is current")]
    NoCurrentContext,

    /// The native creation call returned the null identifier.
    #[error("{0} creation returned the null identifier")]
    NullHandle(ResourceKind),

    #[error("texture unit {0} is out of range, supported units are [0, 32)")]
    TextureUnitOutOfRange(u32),

    /// The pixel buffer handed to a texture upload is shorter than the
    /// image it describes.
    #[error("image needs {expected} bytes but only {actual} were given")]
    ImageSize { expected: usize, actual: usize },

    #[error("failed to read shader source {path}: {source}")]
    ShaderIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("shader {id} failed to compile: {log}")]
    ShaderCompile { id: u32, log: String },

    #[error("program {id} failed to link: {log}")]
    ProgramLink { id: u32, log: String },

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
