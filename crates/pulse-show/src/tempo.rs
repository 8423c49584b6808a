use pulse_core::ConfigError;

/// Beat ↔ seconds conversion at a fixed BPM.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    pub fn new(bpm: f64) -> Result<Self, ConfigError> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(ConfigError::InvalidBpm(bpm));
        }
        Ok(Self { bpm })
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn beat_to_time(&self, beat: f64) -> f64 {
        beat * 60.0 / self.bpm
    }

    pub fn time_to_beat(&self, time: f64) -> f64 {
        time * self.bpm / 60.0
    }

    /// Integer beat active at `time`, clamped into `[0, length_in_beats)`.
    pub fn beat_index(&self, time: f64, length_in_beats: u32) -> u32 {
        debug_assert!(!time.is_nan(), "beat_index: NaN time");
        let last = length_in_beats.saturating_sub(1);
        let beat = self.time_to_beat(time).floor();
        if beat.is_nan() || beat <= 0.0 {
            0
        } else if beat >= f64::from(last) {
            last
        } else {
            beat as u32
        }
    }
}
