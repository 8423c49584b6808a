use std::fmt;
use std::sync::Arc;

use crate::tempo::Tempo;

/// Hermite interpolation between `edge0` and `edge1`, zero slope at both ends.
///
/// A degenerate range (`edge1 <= edge0`) is a step at `edge0`.
pub fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Linear blend; exact at `t == 0` and `t == 1`.
pub fn mix(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

/// Time → blend weight between stage 0 (0.0) and stage 1 (1.0).
#[derive(Clone)]
pub struct Fader(Arc<dyn Fn(f64) -> f64 + Send + Sync>);

impl Fader {
    pub fn new(f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn constant(value: f64) -> Self {
        Self::new(move |_| value)
    }

    /// Blend weight at `time`, always inside [0, 1].
    pub fn eval(&self, time: f64) -> f64 {
        let v = (self.0)(time);
        if v.is_nan() {
            0.0
        } else {
            v.clamp(0.0, 1.0)
        }
    }
}

impl PartialEq for Fader {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Fader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Fader")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// Builds a [`Fader`] once the beat it is scheduled on is known.
#[derive(Clone)]
pub struct FaderFactory(Arc<dyn Fn(&Tempo, u32) -> Fader + Send + Sync>);

impl FaderFactory {
    pub fn new(f: impl Fn(&Tempo, u32) -> Fader + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn build(&self, tempo: &Tempo, start_beat: u32) -> Fader {
        (self.0)(tempo, start_beat)
    }

    /// Smooth fade from `from` to `to` over `duration_beats`, starting on the scheduled beat.
    pub fn fade_from_to(from: f64, to: f64, duration_beats: f64) -> Self {
        Self::new(move |tempo, start_beat| {
            let start = tempo.beat_to_time(f64::from(start_beat));
            let end = tempo.beat_to_time(f64::from(start_beat) + duration_beats);
            Fader::new(move |time| mix(from, to, smoothstep(start, end, time)))
        })
    }

    pub fn fade_to_stage0(beats: f64) -> Self {
        Self::fade_from_to(1.0, 0.0, beats)
    }

    pub fn fade_to_stage1(beats: f64) -> Self {
        Self::fade_from_to(0.0, 1.0, beats)
    }

    /// Hard cut to a constant blend on the scheduled beat.
    pub fn cut_to(value: f64) -> Self {
        Self::new(move |_, _| Fader::constant(value))
    }
}

impl fmt::Debug for FaderFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FaderFactory(..)")
    }
}
