use pulse_core::{BitmapImage, PcmAudio, PixelFormat, RuntimeConfig};
use pulse_sdf::{distance_field, DistanceFieldParams};
use pulse_show::{
    BufferChannel, BufferId, FaderFactory, Filter, Presenter, Scene, SceneBuffer, ScriptEvent,
    ShowDescriptor, Wrap,
};

pub const BPM: f64 = 128.0;
pub const LENGTH_IN_BEATS: u32 = 64;

const MASK_SIZE: u32 = 96;

// Feedback trails: BufferA reads its own previous frame, Image reads BufferA's current one.
const TRAILS_FEEDBACK: &str = r#"
void main() {
    vec2 p = fragCoord01 - 0.5;
    float a = 0.35 * iTime;
    mat2 r = mat2(cos(a), -sin(a), sin(a), cos(a));
    vec4 prev = texture(iChannel0, clamp(r * p * 0.995 + 0.5, 0.0, 1.0)) * DECAY;
    vec2 c = vec2(0.5 + 0.25 * sin(iTime * 0.7), 0.5 + 0.25 * cos(iTime * 0.8));
    float dot = smoothstep(0.08, 0.0, length(fragCoord01 - c));
    fragColor = max(prev, vec4(dot, dot * 0.8, dot, 1.0));
}
"#;

const TRAILS_IMAGE: &str = r#"
void main() {
    fragColor = vec4(texture(iChannel0, fragCoord01).rgb, 1.0);
}
"#;

// Pulsing outline from the distance-field mask.
const OUTLINE_IMAGE: &str = r#"
void main() {
    float d = texture(iChannel0, fragCoord01).r;
    float edge = 0.5 + 0.1 * sin(iTime * 6.0);
    float ring = smoothstep(0.06, 0.0, abs(d - edge));
    float fill = step(edge, d);
    vec3 tint = 0.5 + 0.5 * cos(iTime + fragCoord01.xyx + vec3(0.0, 2.0, 4.0));
    fragColor = vec4(tint * (ring + 0.2 * fill), 1.0);
}
"#;

// Plasma with its own slow echo in BufferB.
const PLASMA_ECHO: &str = r#"
void main() {
    vec2 p = fragCoord01 * 6.0;
    float v = sin(p.x + iTime) + sin(p.y + iTime * 1.3) + sin(p.x + p.y + iTime * 0.7);
    vec3 col = 0.5 + 0.5 * cos(v + vec3(0.0, 2.0, 4.0));
    fragColor = mix(vec4(col, 1.0), texture(iChannel0, fragCoord01), 0.85);
}
"#;

const PLASMA_IMAGE: &str = r#"
void main() {
    fragColor = texture(iChannel1, fragCoord01);
}
"#;

const CROSSFADE: &str = r#"
void main() {
    vec4 a = texture(iChannel0, fragCoord01);
    vec4 b = texture(iChannel1, fragCoord01);
    fragColor = mix(a, b, iMix);
}
"#;

// Wipe from left to right as the fader rises.
const WIPE: &str = r#"
void main() {
    vec4 a = texture(iChannel0, fragCoord01);
    vec4 b = texture(iChannel1, fragCoord01);
    float edge = smoothstep(iMix - 0.02, iMix + 0.02, fragCoord01.x);
    fragColor = mix(b, a, edge);
}
"#;

/// Filled disc used as the distance-field source.
fn disc_mask(size: u32) -> BitmapImage {
    let mut mask = BitmapImage::blank(size, size, PixelFormat::Luma8);
    let c = f64::from(size) * 0.5;
    let r = f64::from(size) * 0.3;
    for y in 0..size {
        for x in 0..size {
            let dx = f64::from(x) + 0.5 - c;
            let dy = f64::from(y) + 0.5 - c;
            if dx * dx + dy * dy <= r * r {
                mask.set_luma(x, y, 255);
            }
        }
    }
    mask
}

/// The built-in 64-beat show.
pub fn build(config: &RuntimeConfig) -> anyhow::Result<ShowDescriptor> {
    let outline = distance_field(&disc_mask(MASK_SIZE), DistanceFieldParams::from(&config.sdf))?;

    let trails = Scene::new(
        SceneBuffer::new(TRAILS_IMAGE).with_channel(0, BufferChannel::buffer(BufferId::A)),
    )
    .with_define("DECAY 0.985")
    .with_buffer(
        BufferId::A,
        SceneBuffer::new(TRAILS_FEEDBACK).with_channel(0, BufferChannel::buffer(BufferId::A)),
    );

    let shape = Scene::new(SceneBuffer::new(OUTLINE_IMAGE).with_channel(
        0,
        BufferChannel::bitmap("outline")
            .filter(Filter::Linear)
            .wrap(Wrap::Clamp),
    ));

    let plasma = Scene::new(
        SceneBuffer::new(PLASMA_IMAGE).with_channel(1, BufferChannel::buffer(BufferId::B)),
    )
    .with_buffer(
        BufferId::B,
        SceneBuffer::new(PLASMA_ECHO).with_channel(0, BufferChannel::buffer(BufferId::B)),
    );

    let show = ShowDescriptor::builder(BPM, LENGTH_IN_BEATS)
        .bitmap("outline", outline)
        .presenter("crossfade", Presenter::new(CROSSFADE))
        .presenter("wipe", Presenter::new(WIPE))
        .scene("trails", trails)
        .scene("shape", shape)
        .scene("plasma", plasma)
        .initial("crossfade", "trails", "shape")
        .at(8, ScriptEvent::ApplyFader(FaderFactory::fade_to_stage1(4.0)))
        .at(16, ScriptEvent::SetStage0("plasma".into()))
        .at(24, ScriptEvent::ApplyFader(FaderFactory::fade_to_stage0(2.0)))
        .at(32, ScriptEvent::SetPresenter("wipe".into()))
        .at(32, ScriptEvent::SetStage1("trails".into()))
        .at(32, ScriptEvent::ApplyFader(FaderFactory::fade_to_stage1(8.0)))
        .at(48, ScriptEvent::SetPresenter("crossfade".into()))
        .at(48, ScriptEvent::SetStage0("shape".into()))
        .at(48, ScriptEvent::ApplyFader(FaderFactory::cut_to(0.0)))
        .at(56, ScriptEvent::ApplyFader(FaderFactory::fade_to_stage1(8.0)))
        .build()?;
    Ok(show)
}

/// Mono 16-bit click track, one click per beat, accented every four.
pub fn click_track(bpm: f64, beats: u32) -> anyhow::Result<PcmAudio> {
    const RATE: u32 = 44_100;
    const CLICK_SECS: f64 = 0.03;

    let seconds_per_beat = 60.0 / bpm;
    let frames = (f64::from(beats) * seconds_per_beat * f64::from(RATE)) as usize;
    let mut data = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        let t = i as f64 / f64::from(RATE);
        let beat = (t / seconds_per_beat).floor();
        let since = t - beat * seconds_per_beat;
        let sample = if since < CLICK_SECS {
            let freq = if beat as u64 % 4 == 0 { 1760.0 } else { 880.0 };
            let env = 1.0 - since / CLICK_SECS;
            (std::f64::consts::TAU * freq * since).sin() * env * 0.4
        } else {
            0.0
        };
        data.extend_from_slice(&((sample * f64::from(i16::MAX)) as i16).to_le_bytes());
    }
    Ok(PcmAudio::new(1, RATE, 16, data)?)
}
