//! Compile-only compatibility crate.
//!
//! This crate exists to ensure the public show-authoring surface remains usable by
//! third-party consumers. It is not shipped or run; it must only build.

use pulse_core::{BitmapImage, PixelFormat, RuntimeConfig};
use pulse_runtime::{FramePlan, InstantClock, Playback};
use pulse_sdf::{distance_field, DistanceFieldParams};
use pulse_show::{
    BufferChannel, BufferId, FaderFactory, Filter, Presenter, PresenterChannel, Scene,
    SceneBuffer, ScriptEvent, ShowDescriptor, Wrap,
};

#[allow(dead_code)]
pub fn _compile_witness() {
    // A show is authored with public builders only.
    let mask = BitmapImage::blank(4, 4, PixelFormat::Luma8);
    let sdf = distance_field(&mask, DistanceFieldParams::default());

    let scene = Scene::new(
        SceneBuffer::new("void main(){}")
            .with_channel(0, BufferChannel::buffer(BufferId::A).filter(Filter::Nearest))
            .with_channel(1, BufferChannel::bitmap("mask").wrap(Wrap::Repeat)),
    )
    .with_common("float k;")
    .with_define("FAST")
    .with_buffer(BufferId::A, SceneBuffer::new("void main(){}"));

    let presenter = Presenter::new("void main(){}").with_channel(1, PresenterChannel::default());

    let built = ShowDescriptor::builder(120.0, 8)
        .bitmap("mask", mask)
        .presenter("blend", presenter)
        .scene("s", scene)
        .initial("blend", "s", "s")
        .at(2, ScriptEvent::ApplyFader(FaderFactory::fade_to_stage1(2.0)))
        .build();

    // The per-frame decision is callable without a backend.
    if let Ok(show) = &built {
        if let (Ok((_, table)), Ok(tempo)) = (show.expand(), show.tempo()) {
            let _plan = FramePlan::resolve(&table, &tempo, 0.0);
        }
    }

    // Runtime data models must remain constructible using stable APIs.
    let _cfg = RuntimeConfig::default();
    let _playback = Playback::new(InstantClock::new(), None);
    let _ = (sdf, built);
}
