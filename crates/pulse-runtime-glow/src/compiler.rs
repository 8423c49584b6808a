use glow::HasContext;
use pulse_core::GraphicsError;
use pulse_runtime::runtime_contract::{
    ATTRIB_POSITION, ATTRIB_TEXCOORD, UNIFORM_CHANNELS, UNIFORM_MIX, UNIFORM_RESOLUTION,
    UNIFORM_TIME, VERTEX_SHADER,
};
use tracing::debug;

use crate::ledger::{GpuLedger, GpuObject};

/// Uniform locations of a linked program. A uniform the driver optimized away is `None`
/// and writes to it are skipped.
#[derive(Debug, Clone, Default)]
pub struct Uniforms {
    pub mix: Option<glow::NativeUniformLocation>,
    pub time: Option<glow::NativeUniformLocation>,
    pub resolution: Option<glow::NativeUniformLocation>,
    pub channels: [Option<glow::NativeUniformLocation>; 4],
}

impl Uniforms {
    unsafe fn locate(gl: &glow::Context, program: glow::NativeProgram) -> Self {
        Self {
            mix: gl.get_uniform_location(program, UNIFORM_MIX),
            time: gl.get_uniform_location(program, UNIFORM_TIME),
            resolution: gl.get_uniform_location(program, UNIFORM_RESOLUTION),
            channels: UNIFORM_CHANNELS.map(|name| gl.get_uniform_location(program, name)),
        }
    }

    /// Write the per-draw uniforms. Channel N samples texture unit N.
    pub unsafe fn write(&self, gl: &glow::Context, mix: f32, time: f32, width: f32, height: f32) {
        if let Some(loc) = &self.mix {
            gl.uniform_1_f32(Some(loc), mix);
        }
        if let Some(loc) = &self.time {
            gl.uniform_1_f32(Some(loc), time);
        }
        if let Some(loc) = &self.resolution {
            gl.uniform_3_f32(Some(loc), width, height, 1.0);
        }
        for (unit, loc) in self.channels.iter().enumerate() {
            if let Some(loc) = loc {
                gl.uniform_1_i32(Some(loc), unit as i32);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub program: glow::NativeProgram,
    pub uniforms: Uniforms,
    pub label: String,
}

/// Compile the vertex stage shared by every program of a show.
pub unsafe fn compile_shared_vertex(
    gl: &glow::Context,
    ledger: &mut GpuLedger,
) -> Result<glow::NativeShader, GraphicsError> {
    let vs = gl
        .create_shader(glow::VERTEX_SHADER)
        .map_err(|e| GraphicsError::Create(format!("create_shader(VS) failed: {e}")))?;
    ledger.record(GpuObject::Shader(vs));
    gl.shader_source(vs, VERTEX_SHADER);
    gl.compile_shader(vs);
    if !gl.get_shader_compile_status(vs) {
        return Err(GraphicsError::VertexCompile(gl.get_shader_info_log(vs)));
    }
    Ok(vs)
}

/// Compile `fragment_src` and link it against the shared vertex stage.
///
/// Attribute slots are bound before linking so the shared quad layout fits every program.
pub unsafe fn link_program(
    gl: &glow::Context,
    ledger: &mut GpuLedger,
    vertex: glow::NativeShader,
    fragment_src: &str,
    label: &str,
) -> Result<CompiledProgram, GraphicsError> {
    let fs = gl
        .create_shader(glow::FRAGMENT_SHADER)
        .map_err(|e| GraphicsError::Create(format!("create_shader(FS) for {label}: {e}")))?;
    gl.shader_source(fs, fragment_src);
    gl.compile_shader(fs);
    if !gl.get_shader_compile_status(fs) {
        let log = gl.get_shader_info_log(fs);
        gl.delete_shader(fs);
        return Err(GraphicsError::FragmentCompile {
            label: label.to_string(),
            log,
        });
    }

    let program = match gl.create_program() {
        Ok(p) => p,
        Err(e) => {
            gl.delete_shader(fs);
            return Err(GraphicsError::Create(format!(
                "create_program for {label}: {e}"
            )));
        }
    };
    ledger.record(GpuObject::Program(program));

    gl.attach_shader(program, vertex);
    gl.attach_shader(program, fs);
    gl.bind_attrib_location(program, ATTRIB_POSITION.0, ATTRIB_POSITION.1);
    gl.bind_attrib_location(program, ATTRIB_TEXCOORD.0, ATTRIB_TEXCOORD.1);
    gl.link_program(program);

    gl.detach_shader(program, vertex);
    gl.detach_shader(program, fs);
    gl.delete_shader(fs);

    if !gl.get_program_link_status(program) {
        return Err(GraphicsError::Link {
            label: label.to_string(),
            log: gl.get_program_info_log(program),
        });
    }

    let uniforms = Uniforms::locate(gl, program);
    debug!(
        label,
        mix = uniforms.mix.is_some(),
        time = uniforms.time.is_some(),
        resolution = uniforms.resolution.is_some(),
        "linked program"
    );
    Ok(CompiledProgram {
        program,
        uniforms,
        label: label.to_string(),
    })
}
