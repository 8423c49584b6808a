#![forbid(unsafe_code)]

//! Backend-agnostic runtime "standard library".
//!
//! This crate holds everything a backend needs to agree on that does not touch a GPU:
//! the shader prelude and attribute/uniform names, the ping-pong read rule, the per-frame
//! plan (beat, entry, mix), and the playback clock that produces the frame time.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

pub mod playback;
pub mod runtime_contract;

pub use playback::{AudioDevice, InstantClock, ManualClock, Playback, PlaybackState, WallClock};
pub use runtime_contract::{FramePlan, TextureSlot};
