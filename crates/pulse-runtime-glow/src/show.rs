//! Show lifecycle: setup, resize, render, teardown.

use std::cell::Cell;
use std::num::NonZeroU32;

use glow::HasContext;
use pulse_core::{GlErrorPolicy, GraphicsError, Resolution, RuntimeConfig, ShowError};
use pulse_runtime::runtime_contract::assemble_fragment;
use pulse_runtime::FramePlan;
use pulse_show::{
    BitmapHandle, BufferId, ChannelSource, ExpandedScript, ShowDescriptor, ShowIndex, StageId,
    Tempo,
};
use tracing::{debug, info};

use crate::compiler::{compile_shared_vertex, link_program, CompiledProgram};
use crate::gl_check::check_gl;
use crate::ledger::{GpuLedger, GpuObject};
use crate::resources::{upload_bitmap, Quad, Samplers};
use crate::stage::Stage;

#[derive(Debug, Clone, Copy)]
enum ChannelTexture {
    Buffer(BufferId),
    Bitmap(BitmapHandle),
}

#[derive(Debug, Clone, Copy)]
struct ResolvedChannel {
    texture: ChannelTexture,
    sampler: glow::NativeSampler,
}

#[derive(Debug)]
struct CompiledBuffer {
    program: CompiledProgram,
    channels: [Option<ResolvedChannel>; 4],
}

#[derive(Debug)]
struct CompiledScene {
    /// Indexed by render order.
    buffers: [Option<CompiledBuffer>; 5],
}

impl CompiledScene {
    fn buffers_in_order(&self) -> impl Iterator<Item = (BufferId, &CompiledBuffer)> {
        BufferId::ALL
            .into_iter()
            .filter_map(move |id| self.buffers[id.index()].as_ref().map(|b| (id, b)))
    }
}

#[derive(Debug)]
struct CompiledPresenter {
    program: CompiledProgram,
    samplers: [glow::NativeSampler; 2],
}

/// GL objects of a live show. Handles index `scenes`, `presenters` and `bitmaps` directly.
#[derive(Debug)]
struct GpuShow {
    quad: Quad,
    fbo: glow::NativeFramebuffer,
    bitmaps: Vec<glow::NativeTexture>,
    scenes: Vec<CompiledScene>,
    presenters: Vec<CompiledPresenter>,
    stages: [Stage; 2],
}

/// Everything `render` needs, produced by [`setup`].
#[derive(Debug)]
pub struct RenderState {
    policy: GlErrorPolicy,
    resolution: Resolution,
    tempo: Tempo,
    script: ExpandedScript,
    ledger: GpuLedger,
    gpu: Option<GpuShow>,
    last_beat: Cell<Option<u32>>,
}

impl RenderState {
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn tempo(&self) -> &Tempo {
        &self.tempo
    }

    pub fn script(&self) -> &ExpandedScript {
        &self.script
    }

    /// False once torn down.
    pub fn is_live(&self) -> bool {
        self.gpu.is_some()
    }

    /// Number of GL objects currently owned.
    pub fn gpu_object_count(&self) -> usize {
        self.ledger.len()
    }
}

// -------------------------------------------------------------------------------------------------
// Setup
// -------------------------------------------------------------------------------------------------

/// Validate the show, expand its script, and create every GL object it needs.
///
/// Configuration problems are reported before any GL object exists. If GL creation fails
/// part-way, everything created so far is released before the error is returned.
pub unsafe fn setup(
    gl: &glow::Context,
    resolution: Resolution,
    show: &ShowDescriptor,
    config: &RuntimeConfig,
) -> Result<RenderState, ShowError> {
    let (index, script) = show.expand()?;
    let tempo = show.tempo()?;
    let policy = config.gl_errors;

    let mut ledger = GpuLedger::new();
    let gpu = match build(gl, &mut ledger, resolution, show, &index, policy) {
        Ok(gpu) => gpu,
        Err(err) => {
            ledger.release_all(gl);
            return Err(err);
        }
    };

    info!(
        width = resolution.width,
        height = resolution.height,
        scenes = gpu.scenes.len(),
        presenters = gpu.presenters.len(),
        bitmaps = gpu.bitmaps.len(),
        beats = script.len(),
        bpm = tempo.bpm(),
        gl_objects = ledger.len(),
        "show ready"
    );

    Ok(RenderState {
        policy,
        resolution,
        tempo,
        script,
        ledger,
        gpu: Some(gpu),
        last_beat: Cell::new(None),
    })
}

unsafe fn build(
    gl: &glow::Context,
    ledger: &mut GpuLedger,
    resolution: Resolution,
    show: &ShowDescriptor,
    index: &ShowIndex,
    policy: GlErrorPolicy,
) -> Result<GpuShow, ShowError> {
    let quad = Quad::new(gl, ledger)?;
    let samplers = Samplers::new(gl, ledger)?;
    let fbo = gl
        .create_framebuffer()
        .map_err(|e| GraphicsError::Create(format!("create_framebuffer: {e}")))?;
    ledger.record(GpuObject::Framebuffer(fbo));
    check_gl(gl, policy, "create", "shared objects");

    let mut bitmaps = Vec::with_capacity(show.bitmaps.len());
    for (id, bitmap) in &show.bitmaps {
        bitmaps.push(upload_bitmap(gl, ledger, bitmap)?);
        check_gl(gl, policy, "upload bitmap", id.as_str());
    }

    let vertex = compile_shared_vertex(gl, ledger)?;

    let mut scenes = Vec::with_capacity(show.scenes.len());
    for (scene_id, scene) in &show.scenes {
        let mut buffers: [Option<CompiledBuffer>; 5] = [None, None, None, None, None];
        for (buffer_id, buffer) in scene.buffers_in_order() {
            let label = format!("scene '{scene_id}' buffer {}", buffer_id.label());
            let src = assemble_fragment(&scene.common, &scene.defines, &buffer.fragment);
            let program = link_program(gl, ledger, vertex, &src, &label)?;
            check_gl(gl, policy, "link", &label);

            let mut channels = [None; 4];
            for (ch, binding) in buffer.channels.iter().enumerate() {
                let Some(binding) = binding else { continue };
                let texture = match &binding.source {
                    ChannelSource::Buffer(source) => ChannelTexture::Buffer(*source),
                    ChannelSource::NamedBitmap(bitmap) => {
                        let referrer = format!("{label} channel {ch}");
                        ChannelTexture::Bitmap(index.bitmap(bitmap, &referrer)?)
                    }
                };
                channels[ch] = Some(ResolvedChannel {
                    texture,
                    sampler: samplers.get(binding.filter, binding.wrap),
                });
            }
            buffers[buffer_id.index()] = Some(CompiledBuffer { program, channels });
        }
        scenes.push(CompiledScene { buffers });
    }

    let mut presenters = Vec::with_capacity(show.presenters.len());
    for (id, presenter) in &show.presenters {
        let label = format!("presenter '{id}'");
        let src = assemble_fragment("", &presenter.defines, &presenter.fragment);
        let program = link_program(gl, ledger, vertex, &src, &label)?;
        check_gl(gl, policy, "link", &label);
        let [c0, c1] = presenter.channels;
        presenters.push(CompiledPresenter {
            program,
            samplers: [samplers.get(c0.filter, c0.wrap), samplers.get(c1.filter, c1.wrap)],
        });
    }

    let stages = [
        Stage::new(gl, ledger, fbo, resolution, policy)?,
        Stage::new(gl, ledger, fbo, resolution, policy)?,
    ];

    Ok(GpuShow {
        quad,
        fbo,
        bitmaps,
        scenes,
        presenters,
        stages,
    })
}

// -------------------------------------------------------------------------------------------------
// Resize
// -------------------------------------------------------------------------------------------------

/// Recreate both stages at `resolution`. Programs, bitmaps and the script are kept.
///
/// On failure the whole show is released and the state is no longer live.
pub unsafe fn resize(
    gl: &glow::Context,
    resolution: Resolution,
    state: &mut RenderState,
) -> Result<(), ShowError> {
    let Some(gpu) = state.gpu.as_mut() else {
        return Ok(());
    };
    if resolution == state.resolution {
        return Ok(());
    }

    let policy = state.policy;
    let stages = &gpu.stages;
    state.ledger.release_matching(gl, |object| match object {
        GpuObject::Texture(t) => stages.iter().any(|s| s.owns(*t)),
        _ => false,
    });

    let ledger = &mut state.ledger;
    let rebuilt = Stage::new(gl, ledger, gpu.fbo, resolution, policy)
        .and_then(|s0| Stage::new(gl, ledger, gpu.fbo, resolution, policy).map(|s1| [s0, s1]));
    match rebuilt {
        Ok(stages) => {
            gpu.stages = stages;
            info!(
                width = resolution.width,
                height = resolution.height,
                "stages resized"
            );
            state.resolution = resolution;
            Ok(())
        }
        Err(err) => {
            teardown(gl, state);
            Err(err.into())
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Render
// -------------------------------------------------------------------------------------------------

/// Step names for the per-unit bind checks.
const BIND_STEPS: [&str; 4] = [
    "bind iChannel0",
    "bind iChannel1",
    "bind iChannel2",
    "bind iChannel3",
];

/// Render one frame at show time `time` into the currently bound framebuffer.
///
/// GL errors follow the configured policy; nothing here aborts the frame loop.
pub unsafe fn render(gl: &glow::Context, time: f64, frame_parity: u64, state: &RenderState) {
    let Some(gpu) = state.gpu.as_ref() else {
        return;
    };
    let plan = FramePlan::resolve(&state.script, &state.tempo, time);
    if state.last_beat.replace(Some(plan.beat)) != Some(plan.beat) {
        debug!(beat = plan.beat, mix = plan.mix, "beat");
    }

    let previous = gl.get_parameter_i32(glow::DRAW_FRAMEBUFFER_BINDING);
    let previous = NonZeroU32::new(previous as u32).map(glow::NativeFramebuffer);
    let (w, h) = state.resolution.gl_size();
    let t = plan.time as f32;

    gl.disable(glow::DEPTH_TEST);
    gl.disable(glow::BLEND);

    for stage_id in StageId::BOTH {
        if plan.renders(stage_id) {
            let scene = &gpu.scenes[plan.scene(stage_id).0];
            let stage = &gpu.stages[stage_id.index()];
            render_scene(gl, state.policy, gpu, scene, stage, t, frame_parity, w, h);
        }
    }

    // Composite into whatever the host had bound.
    gl.bind_framebuffer(glow::FRAMEBUFFER, previous);
    gl.viewport(0, 0, w, h);
    let presenter = &gpu.presenters[plan.entry.presenter.0];
    let label = presenter.program.label.as_str();
    gl.use_program(Some(presenter.program.program));
    check_gl(gl, state.policy, "use_program", label);
    for stage_id in StageId::BOTH {
        let unit = stage_id.index();
        gl.active_texture(glow::TEXTURE0 + unit as u32);
        gl.bind_texture(
            glow::TEXTURE_2D,
            Some(gpu.stages[unit].pair(BufferId::Image).foreground(frame_parity)),
        );
        gl.bind_sampler(unit as u32, Some(presenter.samplers[unit]));
        check_gl(gl, state.policy, BIND_STEPS[unit], label);
    }
    for unit in 2..4usize {
        gl.active_texture(glow::TEXTURE0 + unit as u32);
        gl.bind_texture(glow::TEXTURE_2D, None);
        gl.bind_sampler(unit as u32, None);
        check_gl(gl, state.policy, BIND_STEPS[unit], label);
    }
    presenter
        .program
        .uniforms
        .write(gl, plan.mix as f32, t, w as f32, h as f32);
    check_gl(gl, state.policy, "uniforms", label);
    gpu.quad.draw(gl);
    check_gl(gl, state.policy, "draw", label);

    unbind_units(gl);
    gl.use_program(None);
}

#[allow(clippy::too_many_arguments)]
unsafe fn render_scene(
    gl: &glow::Context,
    policy: GlErrorPolicy,
    gpu: &GpuShow,
    scene: &CompiledScene,
    stage: &Stage,
    time: f32,
    frame_parity: u64,
    w: i32,
    h: i32,
) {
    gl.bind_framebuffer(glow::FRAMEBUFFER, Some(gpu.fbo));
    gl.viewport(0, 0, w, h);

    for (id, buffer) in scene.buffers_in_order() {
        let label = buffer.program.label.as_str();
        gl.framebuffer_texture_2d(
            glow::FRAMEBUFFER,
            glow::COLOR_ATTACHMENT0,
            glow::TEXTURE_2D,
            Some(stage.pair(id).foreground(frame_parity)),
            0,
        );
        check_gl(gl, policy, "attach", label);
        gl.use_program(Some(buffer.program.program));
        check_gl(gl, policy, "use_program", label);
        for (unit, channel) in buffer.channels.iter().enumerate() {
            gl.active_texture(glow::TEXTURE0 + unit as u32);
            match channel {
                Some(channel) => {
                    let tex = match channel.texture {
                        ChannelTexture::Buffer(source) => {
                            stage.channel_texture(id, source, frame_parity)
                        }
                        ChannelTexture::Bitmap(handle) => gpu.bitmaps[handle.0],
                    };
                    gl.bind_texture(glow::TEXTURE_2D, Some(tex));
                    gl.bind_sampler(unit as u32, Some(channel.sampler));
                }
                None => {
                    gl.bind_texture(glow::TEXTURE_2D, None);
                    gl.bind_sampler(unit as u32, None);
                }
            }
            check_gl(gl, policy, BIND_STEPS[unit], label);
        }

        buffer
            .program
            .uniforms
            .write(gl, 0.0, time, w as f32, h as f32);
        check_gl(gl, policy, "uniforms", label);
        gpu.quad.draw(gl);
        check_gl(gl, policy, "draw", label);
    }
}

unsafe fn unbind_units(gl: &glow::Context) {
    for unit in 0..4u32 {
        gl.active_texture(glow::TEXTURE0 + unit);
        gl.bind_texture(glow::TEXTURE_2D, None);
        gl.bind_sampler(unit, None);
    }
    gl.active_texture(glow::TEXTURE0);
}

// -------------------------------------------------------------------------------------------------
// Teardown
// -------------------------------------------------------------------------------------------------

/// Release every GL object in reverse creation order. Safe to call more than once.
pub unsafe fn teardown(gl: &glow::Context, state: &mut RenderState) {
    let was_live = state.gpu.take().is_some();
    if state.ledger.is_empty() {
        return;
    }
    let released = state.ledger.len();
    state.ledger.release_all(gl);
    info!(gl_objects = released, was_live, "show torn down");
}
