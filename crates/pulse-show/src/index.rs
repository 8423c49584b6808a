use std::collections::HashMap;

use pulse_core::ConfigError;

use crate::descriptor::ShowDescriptor;
use crate::{BitmapId, PresenterId, SceneId};

/// Dense index of a scene. Backends compile scenes in the same order, so the handle
/// addresses the compiled resource directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PresenterHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitmapHandle(pub usize);

/// Immutable id → handle mapping, resolved once per show.
///
/// Handles follow the descriptor's map iteration order (sorted by id).
#[derive(Debug, Clone, Default)]
pub struct ShowIndex {
    bitmaps: HashMap<BitmapId, BitmapHandle>,
    presenters: HashMap<PresenterId, PresenterHandle>,
    scenes: HashMap<SceneId, SceneHandle>,
}

impl ShowIndex {
    pub fn new(show: &ShowDescriptor) -> Self {
        Self {
            bitmaps: show
                .bitmaps
                .keys()
                .enumerate()
                .map(|(i, id)| (id.clone(), BitmapHandle(i)))
                .collect(),
            presenters: show
                .presenters
                .keys()
                .enumerate()
                .map(|(i, id)| (id.clone(), PresenterHandle(i)))
                .collect(),
            scenes: show
                .scenes
                .keys()
                .enumerate()
                .map(|(i, id)| (id.clone(), SceneHandle(i)))
                .collect(),
        }
    }

    pub fn bitmap(&self, id: &BitmapId, referrer: &str) -> Result<BitmapHandle, ConfigError> {
        self.bitmaps
            .get(id)
            .copied()
            .ok_or_else(|| ConfigError::unknown("bitmap", id.as_str(), referrer))
    }

    pub fn presenter(
        &self,
        id: &PresenterId,
        referrer: &str,
    ) -> Result<PresenterHandle, ConfigError> {
        self.presenters
            .get(id)
            .copied()
            .ok_or_else(|| ConfigError::unknown("presenter", id.as_str(), referrer))
    }

    pub fn scene(&self, id: &SceneId, referrer: &str) -> Result<SceneHandle, ConfigError> {
        self.scenes
            .get(id)
            .copied()
            .ok_or_else(|| ConfigError::unknown("scene", id.as_str(), referrer))
    }

    pub fn bitmap_count(&self) -> usize {
        self.bitmaps.len()
    }

    pub fn presenter_count(&self) -> usize {
        self.presenters.len()
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Presenter, Scene, SceneBuffer};

    #[test]
    fn handles_follow_sorted_ids() {
        let show = ShowDescriptor::builder(120.0, 4)
            .presenter("p", Presenter::new(""))
            .scene("zeta", Scene::new(SceneBuffer::new("")))
            .scene("alpha", Scene::new(SceneBuffer::new("")))
            .build_unchecked();
        let index = ShowIndex::new(&show);
        assert_eq!(index.scene(&"alpha".into(), "t").unwrap(), SceneHandle(0));
        assert_eq!(index.scene(&"zeta".into(), "t").unwrap(), SceneHandle(1));
        assert!(index.scene(&"beta".into(), "t").is_err());
    }
}
