use std::path::Path;
use std::rc::Rc;

use log::{debug, error};

use super::{impl_gpu_resource, GlObject, ResourceKind};
use crate::errors::{Error, Result};
use crate::gpu::Gpu;
use crate::params::ShaderStage;

/// A single shader stage.
#[derive(Debug)]
pub struct Shader {
    object: GlObject,
    stage: ShaderStage,
    compiled: bool,
}

impl_gpu_resource!(Shader; object);

impl Shader {
    pub fn new(gpu: &Rc<Gpu>, stage: ShaderStage) -> Result<Self> {
        let object = GlObject::create(gpu, ResourceKind::Shader, |native| {
            native.create_shader(stage)
        })?;
        Ok(Self {
            object,
            stage,
            compiled: false,
        })
    }

    /// Create and compile in one go.
    pub fn from_source(gpu: &Rc<Gpu>, stage: ShaderStage, source: &str) -> Result<Self> {
        let mut shader = Self::new(gpu, stage)?;
        shader.compile(source)?;
        Ok(shader)
    }

    /// Compile `source`, replacing whatever was compiled before.
    ///
    /// On failure the diagnostic is logged and returned, the shader
    /// stays alive but must not be attached.
    pub fn compile(&mut self, source: &str) -> Result<&mut Self> {
        self.compiled = false;
        if !self.object.enter() {
            return Err(Error::UnknownContext(self.object.context()));
        }

        let id = self.object.id();
        match self.object.native().compile_shader(id, source) {
            Ok(()) => {
                debug!("{} shader {} successfully compiled", self.stage, id);
                self.compiled = true;
                Ok(self)
            }
            Err(log) => {
                error!("{} shader {} failed to compile: {}", self.stage, id, log);
                Err(Error::ShaderCompile { id, log })
            }
        }
    }

    /// Read the source at `path` and compile it.
    pub fn load_path<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| Error::ShaderIo {
            path: path.to_path_buf(),
            source,
        })?;
        self.compile(&source)
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextConfig;
    use crate::native::recording::{Headless, NativeCall};
    use crate::resources::GpuResource;

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
    fn shader_from_source() {
        let headless = setup();

        let shader = Shader::from_source(
            &headless.gpu,
            ShaderStage::Vertex,
            "void main() { gl_Position = vec4(0.0); }",
        )
        .unwrap();

        assert!(shader.is_compiled());
        assert_eq!(shader.stage(), ShaderStage::Vertex);
        assert_eq!(
            headless.log().calls(),
            vec![
                NativeCall::CreateShader(ShaderStage::Vertex, shader.id()),
                NativeCall::CompileShader(shader.id()),
            ]
        );
    }

    #[test]
    fn shader_compile_failure_keeps_handle() {
        let headless = setup();
        let mut shader = Shader::new(&headless.gpu, ShaderStage::Fragment).unwrap();
        let id = shader.id();

        headless.native.fail_next_compile("0:1(1): error: syntax error");
        let result = shader.compile("void main() {");
        match result {
            Err(Error::ShaderCompile { id: failed, log }) => {
                assert_eq!(failed, id);
                assert_eq!(log, "0:1(1): error: syntax error");
            }
            other => panic!("expected a compile error, got {:?}", other),
        }
        assert!(!shader.is_compiled());
        assert!(shader.is_alive());

        shader.compile("void main() {}").unwrap();
        assert!(shader.is_compiled());
    }

    #[test]
    fn shader_load_path_missing_file() {
        let headless = setup();
        let mut shader = Shader::new(&headless.gpu, ShaderStage::Vertex).unwrap();
        headless.log().clear();

        let result = shader.load_path("shaders/does_not_exist.vert");

        assert!(matches!(result, Err(Error::ShaderIo { .. })));
        assert!(headless.log().calls().is_empty());
    }

    #[test]
    fn shader_load_path_compiles_file() {
        let headless = setup();
        let mut shader = Shader::new(&headless.gpu, ShaderStage::Fragment).unwrap();
        let id = shader.id();
        headless.log().clear();

        let path = std::env::temp_dir().join(format!(
            "gl_handles_load_path_{}.frag",
            std::process::id()
        ));
        std::fs::write(&path, "#version 330 core\nvoid main() {}").unwrap();
        let result = shader.load_path(&path).map(|shader| shader.is_compiled());
        std::fs::remove_file(&path).unwrap();

        assert!(result.unwrap());
        assert_eq!(headless.log().calls(), vec![NativeCall::CompileShader(id)]);
    }

    #[test]
    fn shader_dropped_releases() {
        let headless = setup();
        let shader = Shader::new(&headless.gpu, ShaderStage::Vertex).unwrap();
        let id = shader.id();

        drop(shader);

        assert_eq!(
            headless.log().calls().last(),
            Some(&NativeCall::DeleteShader(id))
        );
    }
}
