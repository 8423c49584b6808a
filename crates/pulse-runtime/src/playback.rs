//! Playback clock.
//!
//! A four-state machine owning every mutable playback field. The frame time it reports is
//! derived from a free-running wall clock while playing, and from a stored position otherwise.
//! An optional [`AudioDevice`] is engaged exactly while the machine is `Playing`.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use tracing::trace;

/// Monotonic seconds since some fixed origin.
pub trait WallClock {
    fn now(&self) -> f64;
}

/// [`WallClock`] backed by [`Instant`], started at construction.
#[derive(Debug, Clone, Copy)]
pub struct InstantClock {
    origin: Instant,
}

impl InstantClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for InstantClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock for InstantClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Hand-driven clock. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, secs: f64) {
        self.now.set(self.now.get() + secs);
    }

    pub fn set(&self, secs: f64) {
        self.now.set(secs);
    }
}

impl WallClock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

/// Audio output the clock keeps in step with.
pub trait AudioDevice {
    fn set_position(&mut self, secs: f64);
    fn set_pitch(&mut self, pitch: f64);
    fn start(&mut self);
    fn stop(&mut self);
    /// Track length in seconds.
    fn duration(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    Paused,
    Playing,
    SeekingWhilePaused,
    SeekingWhilePlaying,
}

pub struct Playback {
    clock: Box<dyn WallClock>,
    device: Option<Box<dyn AudioDevice>>,
    state: PlaybackState,
    pitch: f64,
    /// Position while disengaged; origin of the running segment while engaged.
    stored_time: f64,
    /// Added to the wall clock to get seconds since the running segment started.
    wall_offset: f64,
}

impl fmt::Debug for Playback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Playback")
            .field("state", &self.state)
            .field("pitch", &self.pitch)
            .field("stored_time", &self.stored_time)
            .field("wall_offset", &self.wall_offset)
            .field("has_device", &self.device.is_some())
            .finish()
    }
}

impl Playback {
    pub fn new(clock: impl WallClock + 'static, device: Option<Box<dyn AudioDevice>>) -> Self {
        Self {
            clock: Box::new(clock),
            device,
            state: PlaybackState::Paused,
            pitch: 1.0,
            stored_time: 0.0,
            wall_offset: 0.0,
        }
    }

    /// Playback on the system clock.
    pub fn with_instant_clock(device: Option<Box<dyn AudioDevice>>) -> Self {
        Self::new(InstantClock::new(), device)
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_engaged(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Track length, or +∞ without a device.
    pub fn audio_end_time(&self) -> f64 {
        self.device
            .as_ref()
            .map_or(f64::INFINITY, |device| device.duration())
    }

    /// Current show time, clamped to `[0, audio_end_time]`.
    pub fn time(&self) -> f64 {
        let raw = if self.is_engaged() {
            self.stored_time + (self.clock.now() + self.wall_offset) * self.pitch
        } else {
            self.stored_time
        };
        raw.clamp(0.0, self.audio_end_time())
    }

    pub fn play(&mut self) {
        let next = match self.state {
            PlaybackState::Paused => {
                self.engage();
                PlaybackState::Playing
            }
            PlaybackState::SeekingWhilePaused => PlaybackState::SeekingWhilePlaying,
            same => same,
        };
        self.transition("play", next);
    }

    pub fn pause(&mut self) {
        let next = match self.state {
            PlaybackState::Playing => {
                self.disengage();
                PlaybackState::Paused
            }
            // Seeking already disengaged the device.
            PlaybackState::SeekingWhilePlaying => PlaybackState::SeekingWhilePaused,
            same => same,
        };
        self.transition("pause", next);
    }

    pub fn start_seeking(&mut self) {
        let next = match self.state {
            PlaybackState::Paused => PlaybackState::SeekingWhilePaused,
            PlaybackState::Playing => {
                self.disengage();
                PlaybackState::SeekingWhilePlaying
            }
            same => same,
        };
        self.transition("start_seeking", next);
    }

    pub fn stop_seeking(&mut self) {
        let next = match self.state {
            PlaybackState::SeekingWhilePaused => PlaybackState::Paused,
            PlaybackState::SeekingWhilePlaying => {
                self.engage();
                PlaybackState::Playing
            }
            same => same,
        };
        self.transition("stop_seeking", next);
    }

    /// Move the stored position. Only honoured while seeking.
    pub fn set_time(&mut self, time: f64) -> bool {
        debug_assert!(time.is_finite(), "Playback::set_time: non-finite time {time}");
        if !time.is_finite() {
            return false;
        }
        match self.state {
            PlaybackState::SeekingWhilePaused | PlaybackState::SeekingWhilePlaying => {
                self.stored_time = time;
                trace!(time, "playback set_time");
                true
            }
            PlaybackState::Paused | PlaybackState::Playing => false,
        }
    }

    /// Change the playback rate without a jump in position.
    pub fn set_pitch(&mut self, pitch: f64) {
        debug_assert!(pitch.is_finite(), "Playback::set_pitch: non-finite pitch {pitch}");
        if !pitch.is_finite() {
            return;
        }
        if self.is_engaged() {
            self.stored_time = self.time();
            self.wall_offset = -self.clock.now();
        }
        self.pitch = pitch;
        let position = self.time();
        if let Some(device) = self.device.as_mut() {
            device.set_position(position);
            device.set_pitch(pitch);
        }
        trace!(pitch, position, "playback set_pitch");
    }

    // ---------------------------------------------------------------------------------------------
    // Device engagement
    // ---------------------------------------------------------------------------------------------

    fn engage(&mut self) {
        self.stored_time = self.stored_time.clamp(0.0, self.audio_end_time());
        self.wall_offset = -self.clock.now();
        let (position, pitch) = (self.stored_time, self.pitch);
        if let Some(device) = self.device.as_mut() {
            device.set_position(position);
            device.set_pitch(pitch);
            device.start();
        }
    }

    fn disengage(&mut self) {
        self.stored_time = self.time();
        if let Some(device) = self.device.as_mut() {
            device.stop();
        }
    }

    fn transition(&mut self, call: &'static str, next: PlaybackState) {
        if next != self.state {
            trace!(call, from = ?self.state, to = ?next, "playback transition");
        }
        self.state = next;
    }
}
