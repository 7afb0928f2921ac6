use clap::{App, Arg};
use memoffset::offset_of;

use gl_handles::{
    params::{AttribType, BufferUsage, DrawMode},
    ContextConfig, Gpu, GpuResource, Result, ShaderProgram, VertexArray, VertexAttribute,
};

const VERTEX_SHADER: &str = r#"
#version 330 core

layout (location = 0) in vec2 in_pos;
layout (location = 1) in vec3 in_color;

out vec3 v_color;

void main()
{
    v_color = in_color;
    gl_Position = vec4(in_pos, 0.0, 1.0);
}
"#;

const FRAGMENT_SHADER: &str = r#"
#version 330 core

uniform float alpha;

in vec3 v_color;

out vec4 frag_color;

void main()
{
    frag_color = vec4(v_color, alpha);
}
"#;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    pos: [f32; 2],
    color: [f32; 3],
}

impl Vertex {
    fn new(pos: [f32; 2], color: [f32; 3]) -> Self {
        Self { pos, color }
    }
}

fn get_app() -> App<'static, 'static> {
    App::new("demo")
        .about("Draws a triangle through the GPU resource handles")
        .arg(
            Arg::with_name("config")
                .long("config")
                .short("c")
                .help("Context config JSON file")
                .takes_value(true),
        )
}

fn run() -> Result<()> {
    let matches = get_app().get_matches();
    let config = match matches.value_of("config") {
        Some(path) => ContextConfig::from_path(path)?,
        None => ContextConfig::new("gl_handles demo", 800, 600),
    };

    let gpu = Gpu::glfw();
    let context = gpu.create_context(&config)?;

    let program = ShaderProgram::from_sources(&gpu, VERTEX_SHADER, FRAGMENT_SHADER)?;

    let vertices = [
        Vertex::new([-0.5, -0.5], [1.0, 0.0, 0.0]),
        Vertex::new([0.5, -0.5], [0.0, 1.0, 0.0]),
        Vertex::new([0.0, 0.5], [0.0, 0.0, 1.0]),
    ];
    let stride = std::mem::size_of::<Vertex>();
    let mut triangle = VertexArray::new(&gpu)?;
    triangle
        .buffer_vertex_data(&vertices, BufferUsage::StaticDraw)
        .assign_vertex_attribute(
            VertexAttribute::new(0, 2, AttribType::F32)
                .stride(stride)
                .offset(offset_of!(Vertex, pos)),
        )
        .assign_vertex_attribute(
            VertexAttribute::new(1, 3, AttribType::F32)
                .stride(stride)
                .offset(offset_of!(Vertex, color)),
        );

    while gpu.is_alive(context) {
        gpu.clear(context, &config.clear_color)?;

        program.set_float("alpha", 1.0);
        triangle.draw(DrawMode::Triangles, 0, vertices.len());

        gpu.swap_buffers(context)?;
        gpu.update();
    }

    // the window closing took the native objects with it
    log::debug!(
        "Window closed, triangle alive: {}, program alive: {}",
        triangle.is_alive(),
        program.is_alive()
    );

    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
