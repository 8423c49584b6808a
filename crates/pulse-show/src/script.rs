use pulse_core::ConfigError;

use crate::descriptor::ShowDescriptor;
use crate::fader::{Fader, FaderFactory};
use crate::index::{PresenterHandle, SceneHandle, ShowIndex};
use crate::{PresenterId, SceneId};

/// A sparse script event.
#[derive(Debug, Clone)]
pub enum ScriptEvent {
    SetPresenter(PresenterId),
    SetStage0(SceneId),
    SetStage1(SceneId),
    ApplyFader(FaderFactory),
}

/// What is on screen during one beat.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedEntry {
    pub presenter: PresenterHandle,
    pub stage0: SceneHandle,
    pub stage1: SceneHandle,
    pub fader: Fader,
}

/// Dense per-beat table: `entries[b]` is the state active during beat `b`.
#[derive(Debug, Clone)]
pub struct ExpandedScript {
    entries: Vec<ExpandedEntry>,
}

impl ExpandedScript {
    /// Expand `show.script` into one entry per beat.
    ///
    /// Events at the same beat apply in list order; state carries forward until changed.
    pub fn expand(show: &ShowDescriptor, index: &ShowIndex) -> Result<Self, ConfigError> {
        let tempo = show.tempo()?;
        let length = show.length_in_beats;
        if length < 1 {
            return Err(ConfigError::EmptyShow);
        }

        let mut events: Vec<&(u32, ScriptEvent)> = show.script.iter().collect();
        // Stable: list order survives within a beat.
        events.sort_by_key(|(beat, _)| *beat);
        if let Some((beat, _)) = events.last() {
            if *beat >= length {
                return Err(ConfigError::BeatOutOfRange {
                    beat: *beat,
                    length,
                });
            }
        }

        let mut current = ExpandedEntry {
            presenter: index.presenter(&show.initial_presenter, "initial presenter")?,
            stage0: index.scene(&show.initial_stage0, "initial stage0")?,
            stage1: index.scene(&show.initial_stage1, "initial stage1")?,
            fader: Fader::constant(0.0),
        };

        let mut entries = Vec::with_capacity(length as usize);
        let mut pending = events.into_iter().peekable();
        for beat in 0..length {
            while let Some((_, event)) = pending.next_if(|(b, _)| *b == beat) {
                let referrer = format!("script event at beat {beat}");
                match event {
                    ScriptEvent::SetPresenter(id) => {
                        current.presenter = index.presenter(id, &referrer)?;
                    }
                    ScriptEvent::SetStage0(id) => {
                        current.stage0 = index.scene(id, &referrer)?;
                    }
                    ScriptEvent::SetStage1(id) => {
                        current.stage1 = index.scene(id, &referrer)?;
                    }
                    ScriptEvent::ApplyFader(factory) => {
                        current.fader = factory.build(&tempo, beat);
                    }
                }
            }
            entries.push(current.clone());
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ExpandedEntry] {
        &self.entries
    }

    /// Entry for `beat`, clamped to the last beat.
    pub fn entry(&self, beat: u32) -> &ExpandedEntry {
        let i = (beat as usize).min(self.entries.len().saturating_sub(1));
        &self.entries[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Presenter, Scene, SceneBuffer};

    fn show(length: u32, script: Vec<(u32, ScriptEvent)>) -> ShowDescriptor {
        let mut builder = ShowDescriptor::builder(142.0, length)
            .presenter("blend", Presenter::new(""))
            .presenter("wipe", Presenter::new(""))
            .scene("intro", Scene::new(SceneBuffer::new("")))
            .scene("tunnel", Scene::new(SceneBuffer::new("")))
            .scene("outro", Scene::new(SceneBuffer::new("")))
            .initial("blend", "intro", "tunnel");
        for (beat, event) in script {
            builder = builder.at(beat, event);
        }
        builder.build_unchecked()
    }

    fn expand(show: &ShowDescriptor) -> Result<ExpandedScript, ConfigError> {
        ExpandedScript::expand(show, &show.validate()?)
    }

    #[test]
    fn no_events_repeats_initial_state() {
        let s = show(16, vec![]);
        let table = expand(&s).unwrap();
        assert_eq!(table.len(), 16);
        let index = s.validate().unwrap();
        let first = table.entry(0);
        assert_eq!(first.presenter, index.presenter(&"blend".into(), "t").unwrap());
        assert_eq!(first.stage0, index.scene(&"intro".into(), "t").unwrap());
        assert_eq!(first.stage1, index.scene(&"tunnel".into(), "t").unwrap());
        assert_eq!(first.fader.eval(123.0), 0.0);
        for b in 1..16 {
            assert_eq!(table.entry(b), table.entry(b - 1));
        }
    }

    #[test]
    fn state_carries_forward_between_events() {
        let s = show(
            12,
            vec![
                (4, ScriptEvent::SetStage1("outro".into())),
                (8, ScriptEvent::SetPresenter("wipe".into())),
            ],
        );
        let table = expand(&s).unwrap();
        let index = s.validate().unwrap();
        let outro = index.scene(&"outro".into(), "t").unwrap();
        let wipe = index.presenter(&"wipe".into(), "t").unwrap();

        assert_ne!(table.entry(3).stage1, outro);
        for b in 4..12 {
            assert_eq!(table.entry(b).stage1, outro);
        }
        assert_ne!(table.entry(7).presenter, wipe);
        assert_eq!(table.entry(8).presenter, wipe);
        for b in [1, 2, 3, 5, 6, 7, 9, 10, 11] {
            assert_eq!(table.entry(b), table.entry(b - 1), "beat {b}");
        }
    }

    #[test]
    fn same_beat_events_apply_in_list_order() {
        let s = show(
            4,
            vec![
                (2, ScriptEvent::SetStage0("tunnel".into())),
                (1, ScriptEvent::SetStage0("intro".into())),
                (2, ScriptEvent::SetStage0("outro".into())),
            ],
        );
        let table = expand(&s).unwrap();
        let index = s.validate().unwrap();
        assert_eq!(table.entry(2).stage0, index.scene(&"outro".into(), "t").unwrap());
    }

    #[test]
    fn fader_factory_receives_its_beat() {
        let s = show(8, vec![(4, ScriptEvent::ApplyFader(FaderFactory::fade_to_stage1(2.0)))]);
        let table = expand(&s).unwrap();
        let tempo = s.tempo().unwrap();
        let fader = &table.entry(4).fader;
        assert_eq!(fader.eval(tempo.beat_to_time(4.0)), 0.0);
        assert_eq!(fader.eval(tempo.beat_to_time(6.0)), 1.0);
        assert_eq!(table.entry(7).fader, *fader);
        assert_eq!(table.entry(3).fader.eval(tempo.beat_to_time(6.0)), 0.0);
    }

    #[test]
    fn unknown_scene_fails_with_beat() {
        let s = show(8, vec![(5, ScriptEvent::SetStage1("tunel".into()))]);
        let err = expand(&s).unwrap_err();
        assert_eq!(
            err,
            ConfigError::unknown("scene", "tunel", "script event at beat 5")
        );
    }

    #[test]
    fn event_past_the_end_is_rejected() {
        let s = show(8, vec![(8, ScriptEvent::SetStage1("outro".into()))]);
        assert_eq!(
            expand(&s).unwrap_err(),
            ConfigError::BeatOutOfRange { beat: 8, length: 8 }
        );
    }

    #[test]
    fn entry_lookup_clamps() {
        let table = expand(&show(3, vec![])).unwrap();
        assert_eq!(table.entry(99), table.entry(2));
    }
}
