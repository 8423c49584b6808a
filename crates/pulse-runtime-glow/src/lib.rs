//! pulse runtime (glow/OpenGL backend)
//
// This crate contains only the GPU side of a show:
// - compile/link scene buffer and presenter programs
// - own the ping-pong stages, samplers, bitmap textures and the shared quad
// - render one frame for a given show time and frame parity
//
// It does NOT contain windowing, the playback clock, file IO or audio. Every GL object it
// creates is owned by a `RenderState` and released by `teardown`.
#![allow(clippy::missing_safety_doc)]
#![deny(missing_debug_implementations)]

mod compiler;
mod gl_check;
pub mod ledger;
pub mod resources;
mod show;
pub mod stage;

pub use compiler::{CompiledProgram, Uniforms};
pub use ledger::{GpuLedger, GpuObject};
pub use show::{render, resize, setup, teardown, RenderState};
pub use stage::{PingPongPair, Stage};

pub use pulse_core::{GraphicsError, ShowError};
