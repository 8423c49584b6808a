use std::collections::BTreeMap;

use pulse_core::{BitmapImage, ConfigError};

use crate::index::ShowIndex;
use crate::script::{ExpandedScript, ScriptEvent};
use crate::tempo::Tempo;
use crate::{
    BitmapId, BufferChannel, BufferId, ChannelSource, PresenterChannel, PresenterId, SceneId,
};

/// One shader pass of a scene: fragment body plus up to four sampler bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneBuffer {
    pub fragment: String,
    pub channels: [Option<BufferChannel>; 4],
}

impl SceneBuffer {
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
            channels: [None, None, None, None],
        }
    }

    /// Bind `channel` (0..=3). Out-of-range channels are ignored.
    pub fn with_channel(mut self, channel: usize, binding: BufferChannel) -> Self {
        if let Some(slot) = self.channels.get_mut(channel) {
            *slot = Some(binding);
        }
        self
    }
}

/// A shader pipeline: up to four auxiliary buffers and the mandatory Image buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    /// Code shared by every buffer of the scene, inserted after the uniform prelude.
    pub common: String,
    /// Emitted as `#define NAME` lines.
    pub defines: Vec<String>,
    /// Buffers A..D, indexed by render order.
    pub buffers: [Option<SceneBuffer>; 4],
    pub image: SceneBuffer,
}

impl Scene {
    pub fn new(image: SceneBuffer) -> Self {
        Self {
            common: String::new(),
            defines: Vec::new(),
            buffers: [None, None, None, None],
            image,
        }
    }

    pub fn with_common(mut self, common: impl Into<String>) -> Self {
        self.common = common.into();
        self
    }

    pub fn with_define(mut self, name: impl Into<String>) -> Self {
        self.defines.push(name.into());
        self
    }

    /// Set an auxiliary buffer. `BufferId::Image` replaces the image buffer.
    pub fn with_buffer(mut self, id: BufferId, buffer: SceneBuffer) -> Self {
        match id {
            BufferId::Image => self.image = buffer,
            aux => self.buffers[aux.index()] = Some(buffer),
        }
        self
    }

    pub fn buffer(&self, id: BufferId) -> Option<&SceneBuffer> {
        match id {
            BufferId::Image => Some(&self.image),
            aux => self.buffers[aux.index()].as_ref(),
        }
    }

    /// Present buffers in ascending render order, Image last.
    pub fn buffers_in_order(&self) -> impl Iterator<Item = (BufferId, &SceneBuffer)> {
        BufferId::ALL
            .into_iter()
            .filter_map(move |id| self.buffer(id).map(|b| (id, b)))
    }
}

/// The compositing shader. Channel 0 reads stage 0's Image, channel 1 reads stage 1's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presenter {
    pub fragment: String,
    pub defines: Vec<String>,
    pub channels: [PresenterChannel; 2],
}

impl Presenter {
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
            defines: Vec::new(),
            channels: [PresenterChannel::default(); 2],
        }
    }

    pub fn with_define(mut self, name: impl Into<String>) -> Self {
        self.defines.push(name.into());
        self
    }

    pub fn with_channel(mut self, channel: usize, settings: PresenterChannel) -> Self {
        if let Some(slot) = self.channels.get_mut(channel) {
            *slot = settings;
        }
        self
    }
}

/// An authored show. Immutable once built.
#[derive(Debug, Clone)]
pub struct ShowDescriptor {
    pub bitmaps: BTreeMap<BitmapId, BitmapImage>,
    pub presenters: BTreeMap<PresenterId, Presenter>,
    pub scenes: BTreeMap<SceneId, Scene>,
    pub bpm: f64,
    pub length_in_beats: u32,
    pub initial_presenter: PresenterId,
    pub initial_stage0: SceneId,
    pub initial_stage1: SceneId,
    /// Sparse `(beat, event)` list. Events on the same beat apply in list order.
    pub script: Vec<(u32, ScriptEvent)>,
}

impl ShowDescriptor {
    pub fn builder(bpm: f64, length_in_beats: u32) -> ShowBuilder {
        ShowBuilder::new(bpm, length_in_beats)
    }

    pub fn tempo(&self) -> Result<Tempo, ConfigError> {
        Tempo::new(self.bpm)
    }

    /// Checks everything that can be checked without a GPU and resolves ids to handles.
    pub fn validate(&self) -> Result<ShowIndex, ConfigError> {
        self.tempo()?;
        if self.length_in_beats < 1 {
            return Err(ConfigError::EmptyShow);
        }
        for (id, bitmap) in &self.bitmaps {
            bitmap.check(id.as_str())?;
        }
        if self.presenters.is_empty() {
            return Err(ConfigError::invalid("presenters", "show declares no presenter"));
        }
        if self.scenes.is_empty() {
            return Err(ConfigError::invalid("scenes", "show declares no scene"));
        }

        let index = ShowIndex::new(self);
        for (scene_id, scene) in &self.scenes {
            for (buffer_id, buffer) in scene.buffers_in_order() {
                for (ch, binding) in buffer.channels.iter().enumerate() {
                    let Some(binding) = binding else { continue };
                    let referrer =
                        || format!("scene '{scene_id}' {} channel {ch}", buffer_id.label());
                    match &binding.source {
                        ChannelSource::NamedBitmap(bitmap) => {
                            index.bitmap(bitmap, &referrer())?;
                        }
                        ChannelSource::Buffer(source) => {
                            if scene.buffer(*source).is_none() {
                                return Err(ConfigError::unknown(
                                    "buffer",
                                    source.label(),
                                    referrer(),
                                ));
                            }
                        }
                    }
                }
            }
        }

        index.presenter(&self.initial_presenter, "initial presenter")?;
        index.scene(&self.initial_stage0, "initial stage0")?;
        index.scene(&self.initial_stage1, "initial stage1")?;
        Ok(index)
    }

    /// Validate, then expand the script into its per-beat table.
    pub fn expand(&self) -> Result<(ShowIndex, ExpandedScript), ConfigError> {
        let index = self.validate()?;
        let script = ExpandedScript::expand(self, &index)?;
        Ok((index, script))
    }
}

/// Fluent construction of a [`ShowDescriptor`].
#[derive(Debug)]
pub struct ShowBuilder {
    show: ShowDescriptor,
}

impl ShowBuilder {
    pub fn new(bpm: f64, length_in_beats: u32) -> Self {
        Self {
            show: ShowDescriptor {
                bitmaps: BTreeMap::new(),
                presenters: BTreeMap::new(),
                scenes: BTreeMap::new(),
                bpm,
                length_in_beats,
                initial_presenter: PresenterId::default_id(),
                initial_stage0: SceneId::default_id(),
                initial_stage1: SceneId::default_id(),
                script: Vec::new(),
            },
        }
    }

    pub fn bitmap(mut self, id: impl Into<BitmapId>, bitmap: BitmapImage) -> Self {
        self.show.bitmaps.insert(id.into(), bitmap);
        self
    }

    pub fn presenter(mut self, id: impl Into<PresenterId>, presenter: Presenter) -> Self {
        self.show.presenters.insert(id.into(), presenter);
        self
    }

    pub fn scene(mut self, id: impl Into<SceneId>, scene: Scene) -> Self {
        self.show.scenes.insert(id.into(), scene);
        self
    }

    pub fn initial(
        mut self,
        presenter: impl Into<PresenterId>,
        stage0: impl Into<SceneId>,
        stage1: impl Into<SceneId>,
    ) -> Self {
        self.show.initial_presenter = presenter.into();
        self.show.initial_stage0 = stage0.into();
        self.show.initial_stage1 = stage1.into();
        self
    }

    pub fn at(mut self, beat: u32, event: ScriptEvent) -> Self {
        self.show.script.push((beat, event));
        self
    }

    /// Build without validating (useful for tests of the validator itself).
    pub fn build_unchecked(self) -> ShowDescriptor {
        self.show
    }

    pub fn build(self) -> Result<ShowDescriptor, ConfigError> {
        self.show.expand()?;
        Ok(self.show)
    }
}

impl PresenterId {
    fn default_id() -> Self {
        PresenterId::from("main")
    }
}

impl SceneId {
    fn default_id() -> Self {
        SceneId::from("main")
    }
}
