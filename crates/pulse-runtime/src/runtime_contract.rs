use pulse_show::{ExpandedEntry, ExpandedScript, RenderOrder, SceneHandle, StageId, Tempo};

// -------------------------------------------------------------------------------------------------
// Shader interface
// -------------------------------------------------------------------------------------------------

/// Attribute slots bound by name before every link.
pub const ATTRIB_POSITION: (u32, &str) = (0, "a_position");
pub const ATTRIB_TEXCOORD: (u32, &str) = (1, "a_texcoord");

pub const UNIFORM_MIX: &str = "iMix";
pub const UNIFORM_TIME: &str = "iTime";
pub const UNIFORM_RESOLUTION: &str = "iResolution";
pub const UNIFORM_CHANNELS: [&str; 4] = ["iChannel0", "iChannel1", "iChannel2", "iChannel3"];

/// Shared vertex program for every scene buffer and presenter.
pub const VERTEX_SHADER: &str = r#"#version 330 core
in vec2 a_position;
in vec2 a_texcoord;
out vec2 fragCoord01;
void main() {
    fragCoord01 = a_texcoord;
    gl_Position = vec4(a_position, 0.0, 1.0);
}
"#;

/// Uniform declarations every fragment program starts with.
pub const FRAGMENT_PRELUDE: &str = r#"#version 330 core
uniform float iMix;
uniform float iTime;
uniform vec3 iResolution;
uniform sampler2D iChannel0;
uniform sampler2D iChannel1;
uniform sampler2D iChannel2;
uniform sampler2D iChannel3;
in vec2 fragCoord01;
out vec4 fragColor;
"#;

/// Fragment source in fixed order: prelude, common snippet, defines, body.
pub fn assemble_fragment(common: &str, defines: &[String], body: &str) -> String {
    let mut src = String::with_capacity(
        FRAGMENT_PRELUDE.len() + common.len() + body.len() + defines.len() * 24 + 4,
    );
    src.push_str(FRAGMENT_PRELUDE);
    src.push_str(common);
    if !common.is_empty() && !common.ends_with('\n') {
        src.push('\n');
    }
    for name in defines {
        src.push_str("#define ");
        src.push_str(name);
        src.push('\n');
    }
    src.push_str(body);
    src
}

/// Full-screen quad: 4 vertices of (x, y, u, v).
pub const QUAD_VERTICES: [f32; 16] = [
    -1.0, -1.0, 0.0, 0.0, //
    1.0, -1.0, 1.0, 0.0, //
    1.0, 1.0, 1.0, 1.0, //
    -1.0, 1.0, 0.0, 1.0, //
];

/// Two triangles over [`QUAD_VERTICES`].
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

// -------------------------------------------------------------------------------------------------
// Ping-pong read rule
// -------------------------------------------------------------------------------------------------

/// Which texture of a double-buffered pair a read resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    /// Written this frame.
    Foreground,
    /// Written last frame.
    Background,
}

impl TextureSlot {
    /// Physical texture index (0 or 1) for `frame_parity`.
    pub fn index(self, frame_parity: u64) -> usize {
        match self {
            TextureSlot::Foreground => foreground_index(frame_parity),
            TextureSlot::Background => background_index(frame_parity),
        }
    }
}

/// texture0 is the foreground on even frames, texture1 on odd frames.
pub fn foreground_index(frame_parity: u64) -> usize {
    (frame_parity & 1) as usize
}

pub fn background_index(frame_parity: u64) -> usize {
    1 - foreground_index(frame_parity)
}

/// A buffer reading another buffer of the same stage sees last frame's output unless the
/// source renders strictly before it.
pub fn channel_slot(consumer: RenderOrder, source: RenderOrder) -> TextureSlot {
    if consumer <= source {
        TextureSlot::Background
    } else {
        TextureSlot::Foreground
    }
}

/// Physical texture (0 or 1) a `consumer` buffer samples from `source` on frame `frame_parity`.
pub fn channel_texture_index(consumer: RenderOrder, source: RenderOrder, frame_parity: u64) -> usize {
    channel_slot(consumer, source).index(frame_parity)
}

// -------------------------------------------------------------------------------------------------
// Per-frame plan
// -------------------------------------------------------------------------------------------------

/// Everything the scheduler decides before touching the GPU.
#[derive(Debug, Clone, Copy)]
pub struct FramePlan<'a> {
    pub time: f64,
    pub beat: u32,
    pub entry: &'a ExpandedEntry,
    /// 0.0 shows stage 0 only, 1.0 stage 1 only.
    pub mix: f64,
}

impl<'a> FramePlan<'a> {
    pub fn resolve(script: &'a ExpandedScript, tempo: &Tempo, time: f64) -> Self {
        debug_assert!(!time.is_nan(), "FramePlan::resolve: NaN time");
        let time = if time.is_nan() { 0.0 } else { time };
        let beat = tempo.beat_index(time, script.len() as u32);
        let entry = script.entry(beat);
        let mix = entry.fader.eval(time);
        Self {
            time,
            beat,
            entry,
            mix,
        }
    }

    pub fn renders_stage0(&self) -> bool {
        self.mix < 1.0
    }

    pub fn renders_stage1(&self) -> bool {
        self.mix > 0.0
    }

    /// Whether `stage` contributes to this frame.
    pub fn renders(&self, stage: StageId) -> bool {
        match stage {
            StageId::Stage0 => self.renders_stage0(),
            StageId::Stage1 => self.renders_stage1(),
        }
    }

    /// Scene assigned to `stage` during this beat.
    pub fn scene(&self, stage: StageId) -> SceneHandle {
        match stage {
            StageId::Stage0 => self.entry.stage0,
            StageId::Stage1 => self.entry.stage1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_show::{
        BufferId, FaderFactory, Presenter, Scene, SceneBuffer, ScriptEvent, ShowDescriptor,
    };

    #[test]
    fn foreground_alternates_with_parity() {
        assert_eq!(foreground_index(0), 0);
        assert_eq!(foreground_index(1), 1);
        assert_eq!(foreground_index(2), 0);
        assert_eq!(foreground_index(u64::MAX), 1);
        for n in 0..8 {
            assert_ne!(foreground_index(n), background_index(n));
        }
    }

    #[test]
    fn channel_slot_matches_render_order_rule() {
        for consumer in BufferId::ALL {
            for source in BufferId::ALL {
                let slot = channel_slot(consumer.render_order(), source.render_order());
                let expect = if consumer.index() <= source.index() {
                    TextureSlot::Background
                } else {
                    TextureSlot::Foreground
                };
                assert_eq!(slot, expect, "{consumer:?} reading {source:?}");
                for parity in 0..2u64 {
                    let idx = channel_texture_index(
                        consumer.render_order(),
                        source.render_order(),
                        parity,
                    );
                    match expect {
                        TextureSlot::Foreground => assert_eq!(idx, parity as usize),
                        TextureSlot::Background => assert_eq!(idx, 1 - parity as usize),
                    }
                }
            }
        }
    }

    #[test]
    fn self_feedback_reads_last_frame() {
        let o = BufferId::Image.render_order();
        assert_eq!(channel_slot(o, o), TextureSlot::Background);
        assert_eq!(
            channel_slot(BufferId::Image.render_order(), BufferId::A.render_order()),
            TextureSlot::Foreground
        );
        assert_eq!(
            channel_slot(BufferId::A.render_order(), BufferId::B.render_order()),
            TextureSlot::Background
        );
    }

    #[test]
    fn fragment_assembly_order() {
        let src = assemble_fragment(
            "float k = 2.0;",
            &["FAST".to_string(), "GLOW".to_string()],
            "void main() { fragColor = vec4(k); }",
        );
        assert!(src.starts_with("#version 330 core\n"));
        let prelude_end = src.find("out vec4 fragColor;").unwrap();
        let common = src.find("float k = 2.0;").unwrap();
        let fast = src.find("#define FAST\n").unwrap();
        let glow = src.find("#define GLOW\n").unwrap();
        let body = src.find("void main()").unwrap();
        assert!(prelude_end < common && common < fast && fast < glow && glow < body);
    }

    #[test]
    fn quad_is_two_triangles_over_four_vertices() {
        assert_eq!(QUAD_VERTICES.len(), 4 * 4);
        assert_eq!(QUAD_INDICES.len(), 6);
        assert!(QUAD_INDICES.iter().all(|&i| i < 4));
    }

    #[test]
    fn frame_plan_picks_stages_from_mix() {
        let show = ShowDescriptor::builder(60.0, 8)
            .presenter("p", Presenter::new(""))
            .scene("a", Scene::new(SceneBuffer::new("")))
            .initial("p", "a", "a")
            .at(2, ScriptEvent::ApplyFader(FaderFactory::fade_to_stage1(2.0)))
            .build()
            .unwrap();
        let (_, script) = show.expand().unwrap();
        let tempo = show.tempo().unwrap();

        let before = FramePlan::resolve(&script, &tempo, 1.0);
        assert_eq!(before.beat, 1);
        assert_eq!(before.mix, 0.0);
        assert!(before.renders_stage0() && !before.renders_stage1());

        let during = FramePlan::resolve(&script, &tempo, 3.0);
        assert_eq!(during.beat, 3);
        assert!(during.renders_stage0() && during.renders_stage1());

        let after = FramePlan::resolve(&script, &tempo, 4.5);
        assert_eq!(after.mix, 1.0);
        assert!(!after.renders_stage0() && after.renders_stage1());

        let past_end = FramePlan::resolve(&script, &tempo, 1e6);
        assert_eq!(past_end.beat, 7);
    }

    fn crossfade_show() -> (ExpandedScript, Tempo) {
        let show = ShowDescriptor::builder(60.0, 8)
            .presenter("p", Presenter::new(""))
            .scene("a", Scene::new(SceneBuffer::new("")))
            .scene("b", Scene::new(SceneBuffer::new("")))
            .initial("p", "a", "b")
            .at(2, ScriptEvent::ApplyFader(FaderFactory::fade_to_stage1(2.0)))
            .build()
            .unwrap();
        let (_, script) = show.expand().unwrap();
        (script, show.tempo().unwrap())
    }

    #[test]
    fn stage_ids_select_scene_and_gate() {
        let (script, tempo) = crossfade_show();

        let plan = FramePlan::resolve(&script, &tempo, 0.5);
        assert_eq!(plan.scene(StageId::Stage0), SceneHandle(0));
        assert_eq!(plan.scene(StageId::Stage1), SceneHandle(1));
        assert!(plan.renders(StageId::Stage0));
        assert!(!plan.renders(StageId::Stage1));

        let plan = FramePlan::resolve(&script, &tempo, 5.0);
        let live: Vec<StageId> = StageId::BOTH
            .into_iter()
            .filter(|s| plan.renders(*s))
            .collect();
        assert_eq!(live, vec![StageId::Stage1]);
    }

    #[test]
    fn beat_clamps_below_zero_and_past_the_end() {
        let (script, tempo) = crossfade_show();
        for time in [-0.001, -10.0, f64::NEG_INFINITY] {
            let plan = FramePlan::resolve(&script, &tempo, time);
            assert_eq!(plan.beat, 0, "time {time}");
            assert_eq!(plan.mix, 0.0);
        }
        for time in [8.0, 1e9, f64::INFINITY] {
            assert_eq!(FramePlan::resolve(&script, &tempo, time).beat, 7, "time {time}");
        }
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "NaN time")]
    fn nan_time_asserts_in_debug() {
        let (script, tempo) = crossfade_show();
        let _ = FramePlan::resolve(&script, &tempo, f64::NAN);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn nan_time_falls_back_to_beat_zero() {
        let (script, tempo) = crossfade_show();
        let plan = FramePlan::resolve(&script, &tempo, f64::NAN);
        assert_eq!(plan.beat, 0);
        assert_eq!(plan.time, 0.0);
        assert_eq!(plan.mix, 0.0);
    }
}
