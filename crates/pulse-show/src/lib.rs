#![forbid(unsafe_code)]

//! pulse show vocabulary and timeline model.
//!
//! This crate is **contract-only**: no windowing, no GL handles, no clocks.
//! It defines what a show is (bitmaps, scenes, presenters, a sparse beat script),
//! how beats map to seconds, how faders blend the two stages, and how the sparse
//! script expands into a dense per-beat table. Backends consume the expanded table.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

use std::fmt;

pub mod descriptor;
pub mod fader;
pub mod index;
pub mod script;
pub mod tempo;

pub use descriptor::{Presenter, Scene, SceneBuffer, ShowBuilder, ShowDescriptor};
pub use fader::{mix, smoothstep, Fader, FaderFactory};
pub use index::{BitmapHandle, PresenterHandle, SceneHandle, ShowIndex};
pub use script::{ExpandedEntry, ExpandedScript, ScriptEvent};
pub use tempo::Tempo;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Name of a bitmap in [`ShowDescriptor::bitmaps`].
    BitmapId
);
string_id!(
    /// Name of a scene in [`ShowDescriptor::scenes`].
    SceneId
);
string_id!(
    /// Name of a presenter in [`ShowDescriptor::presenters`].
    PresenterId
);

/// Position of a buffer in a scene's render sequence. Strict total order 0..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderOrder(u8);

impl RenderOrder {
    pub fn get(self) -> u8 {
        self.0
    }
}

/// The five buffers of a scene. `Image` is mandatory and always rendered last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BufferId {
    A,
    B,
    C,
    D,
    Image,
}

impl BufferId {
    /// Auxiliary buffers in ascending render order.
    pub const AUX: [BufferId; 4] = [BufferId::A, BufferId::B, BufferId::C, BufferId::D];

    /// Every buffer in ascending render order.
    pub const ALL: [BufferId; 5] = [
        BufferId::A,
        BufferId::B,
        BufferId::C,
        BufferId::D,
        BufferId::Image,
    ];

    pub fn render_order(self) -> RenderOrder {
        RenderOrder(self.index() as u8)
    }

    /// Slot index in a stage (equal to the render order).
    pub fn index(self) -> usize {
        match self {
            BufferId::A => 0,
            BufferId::B => 1,
            BufferId::C => 2,
            BufferId::D => 3,
            BufferId::Image => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BufferId::A => "BufferA",
            BufferId::B => "BufferB",
            BufferId::C => "BufferC",
            BufferId::D => "BufferD",
            BufferId::Image => "Image",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Filter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Wrap {
    #[default]
    Clamp,
    Repeat,
    MirrorRepeat,
}

/// Where a scene buffer channel reads its texture from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelSource {
    /// Another buffer of the same scene (or the buffer itself, for feedback).
    Buffer(BufferId),
    NamedBitmap(BitmapId),
}

/// One sampler binding of a scene buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferChannel {
    pub filter: Filter,
    pub wrap: Wrap,
    pub source: ChannelSource,
}

impl BufferChannel {
    pub fn buffer(id: BufferId) -> Self {
        Self {
            filter: Filter::default(),
            wrap: Wrap::default(),
            source: ChannelSource::Buffer(id),
        }
    }

    pub fn bitmap(id: impl Into<BitmapId>) -> Self {
        Self {
            filter: Filter::default(),
            wrap: Wrap::default(),
            source: ChannelSource::NamedBitmap(id.into()),
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn wrap(mut self, wrap: Wrap) -> Self {
        self.wrap = wrap;
        self
    }
}

/// Sampler settings of a presenter channel. Channel N always reads stage N's Image output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PresenterChannel {
    pub filter: Filter,
    pub wrap: Wrap,
}

/// The two concurrently rendered scene pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    Stage0,
    Stage1,
}

impl StageId {
    pub const BOTH: [StageId; 2] = [StageId::Stage0, StageId::Stage1];

    pub fn index(self) -> usize {
        match self {
            StageId::Stage0 => 0,
            StageId::Stage1 => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_order_is_strict_and_image_last() {
        let orders: Vec<u8> = BufferId::ALL.iter().map(|b| b.render_order().get()).collect();
        assert_eq!(orders, vec![0, 1, 2, 3, 4]);
        assert!(BufferId::AUX
            .iter()
            .all(|b| b.render_order() < BufferId::Image.render_order()));
    }

    #[test]
    fn ids_display_their_name() {
        assert_eq!(SceneId::from("tunnel").to_string(), "tunnel");
        assert!(SceneId::from("a") < SceneId::from("b"));
    }
}
