use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use pulse_core::{load_typed_json, ShowError};
use pulse_runtime::{Playback, PlaybackState};
use tracing::debug;

/// Configuration for a single keyboard binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBindingConfig {
    /// A single character, e.g. " " or "j" or "K".
    pub key: String,
    pub action: KeyActionKind,
}

/// JSON keymap for the playback transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub keys: Vec<KeyBindingConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        let bind = |key: &str, action| KeyBindingConfig {
            key: key.to_string(),
            action,
        };
        Self {
            keys: vec![
                bind(" ", KeyActionKind::TogglePlay),
                bind("s", KeyActionKind::BeginSeek),
                bind("d", KeyActionKind::EndSeek),
                bind(",", KeyActionKind::Nudge(-1.0)),
                bind(".", KeyActionKind::Nudge(1.0)),
                bind("<", KeyActionKind::Nudge(-10.0)),
                bind(">", KeyActionKind::Nudge(10.0)),
                bind("0", KeyActionKind::JumpTo(0.0)),
                bind("[", KeyActionKind::NudgePitch(0.5)),
                bind("]", KeyActionKind::NudgePitch(2.0)),
                bind("=", KeyActionKind::SetPitch(1.0)),
            ],
        }
    }
}

impl TransportConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ShowError> {
        load_typed_json(path)
    }

    /// Load `path` if it exists, otherwise the built-in keymap.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ShowError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }
}

/// Actions directly exposed in the keymap JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KeyActionKind {
    TogglePlay,
    Play,
    Pause,
    BeginSeek,
    EndSeek,
    /// Move by this many seconds.
    Nudge(f64),
    /// Jump to an absolute show time in seconds.
    JumpTo(f64),
    SetPitch(f64),
    /// Multiply the pitch.
    NudgePitch(f64),
}

impl KeyActionKind {
    /// Drive `playback` through its transitions. Returns false when the action had no effect.
    pub fn apply(self, playback: &mut Playback) -> bool {
        let before = (playback.state(), playback.time(), playback.pitch());
        match self {
            KeyActionKind::TogglePlay => match playback.state() {
                PlaybackState::Playing | PlaybackState::SeekingWhilePlaying => playback.pause(),
                PlaybackState::Paused | PlaybackState::SeekingWhilePaused => playback.play(),
            },
            KeyActionKind::Play => playback.play(),
            KeyActionKind::Pause => playback.pause(),
            KeyActionKind::BeginSeek => playback.start_seeking(),
            KeyActionKind::EndSeek => playback.stop_seeking(),
            KeyActionKind::Nudge(delta) => {
                let target = (playback.time() + delta).max(0.0);
                seek_to(playback, target);
            }
            KeyActionKind::JumpTo(time) => seek_to(playback, time.max(0.0)),
            KeyActionKind::SetPitch(pitch) => playback.set_pitch(pitch),
            KeyActionKind::NudgePitch(factor) => playback.set_pitch(playback.pitch() * factor),
        }
        let after = (playback.state(), playback.time(), playback.pitch());
        let changed = before != after;
        if changed {
            debug!(action = ?self, state = ?after.0, time = after.1, pitch = after.2, "transport");
        }
        changed
    }
}

/// Seek without changing whether playback is running.
fn seek_to(playback: &mut Playback, time: f64) {
    let already_seeking = matches!(
        playback.state(),
        PlaybackState::SeekingWhilePaused | PlaybackState::SeekingWhilePlaying
    );
    if !already_seeking {
        playback.start_seeking();
    }
    playback.set_time(time);
    if !already_seeking {
        playback.stop_seeking();
    }
}

/// Keymap: maps a char to a transport action.
#[derive(Debug, Default)]
pub struct Keymap {
    bindings: HashMap<char, KeyActionKind>,
}

impl Keymap {
    pub fn from_config(cfgs: &[KeyBindingConfig]) -> Self {
        let mut bindings = HashMap::new();
        for cfg in cfgs {
            if let Some(ch) = cfg.key.chars().next() {
                bindings.insert(ch, cfg.action);
            }
        }
        Self { bindings }
    }

    pub fn lookup(&self, ch: char) -> Option<KeyActionKind> {
        self.bindings.get(&ch).copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Keyboard front end for a [`Playback`].
#[derive(Debug, Default)]
pub struct Transport {
    keymap: Keymap,
}

impl Transport {
    pub fn from_config(cfg: &TransportConfig) -> Self {
        Self {
            keymap: Keymap::from_config(&cfg.keys),
        }
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    /// Call this from your winit keyboard handler.
    pub fn on_key(&self, ch: char, playback: &mut Playback) -> bool {
        match self.keymap.lookup(ch) {
            Some(action) => action.apply(playback),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_runtime::ManualClock;

    fn setup() -> (Transport, Playback, ManualClock) {
        let clock = ManualClock::new();
        let playback = Playback::new(clock.clone(), None);
        (Transport::from_config(&TransportConfig::default()), playback, clock)
    }

    #[test]
    fn space_toggles_play() {
        let (transport, mut playback, clock) = setup();
        assert!(transport.on_key(' ', &mut playback));
        assert_eq!(playback.state(), PlaybackState::Playing);
        clock.advance(1.0);
        assert!(transport.on_key(' ', &mut playback));
        assert_eq!(playback.state(), PlaybackState::Paused);
        assert!((playback.time() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn nudge_keeps_play_state() {
        let (transport, mut playback, clock) = setup();
        transport.on_key(' ', &mut playback);
        clock.advance(2.0);
        transport.on_key('.', &mut playback);
        assert_eq!(playback.state(), PlaybackState::Playing);
        assert!((playback.time() - 3.0).abs() < 1e-9);

        transport.on_key('<', &mut playback);
        assert_eq!(playback.time(), 0.0);
    }

    #[test]
    fn seek_keys_bracket_a_scrub() {
        let (transport, mut playback, _clock) = setup();
        transport.on_key('s', &mut playback);
        assert_eq!(playback.state(), PlaybackState::SeekingWhilePaused);
        transport.on_key('>', &mut playback);
        assert_eq!(playback.state(), PlaybackState::SeekingWhilePaused);
        assert_eq!(playback.time(), 10.0);
        transport.on_key('d', &mut playback);
        assert_eq!(playback.state(), PlaybackState::Paused);
    }

    #[test]
    fn pitch_keys() {
        let (transport, mut playback, _clock) = setup();
        transport.on_key(']', &mut playback);
        assert_eq!(playback.pitch(), 2.0);
        transport.on_key('[', &mut playback);
        transport.on_key('[', &mut playback);
        assert_eq!(playback.pitch(), 0.5);
        transport.on_key('=', &mut playback);
        assert_eq!(playback.pitch(), 1.0);
    }

    #[test]
    fn unbound_key_does_nothing() {
        let (transport, mut playback, _clock) = setup();
        assert!(!transport.on_key('q', &mut playback));
        // Pausing while paused is not a change.
        assert!(!KeyActionKind::Pause.apply(&mut playback));
    }

    #[test]
    fn json_keymap_parses() {
        let cfg = TransportConfig::from_json(
            r#"{ "keys": [
                { "key": "p", "action": "TogglePlay" },
                { "key": "j", "action": { "Nudge": -5.0 } },
                { "key": "k", "action": { "SetPitch": 1.5 } }
            ] }"#,
        )
        .unwrap();
        let keymap = Keymap::from_config(&cfg.keys);
        assert_eq!(keymap.len(), 3);
        assert_eq!(keymap.lookup('j'), Some(KeyActionKind::Nudge(-5.0)));
        assert_eq!(keymap.lookup(' '), None);

        let empty = TransportConfig::from_json("{}").unwrap();
        assert!(empty.keys.is_empty());
    }
}
