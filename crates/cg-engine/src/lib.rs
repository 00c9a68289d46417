// SPDX-License-Identifier: MIT
//
// cg-engine: core of cellgine.
//
// A fixed-timestep loop around a grid of colored single-byte characters.
// Each tick the caller paints the front grid, and the differential renderer
// writes only the cells that changed since the last frame, with as few cursor
// moves and color switches as it can manage. Keyboard and mouse state is
// snapshotted once per tick.
//
// The engine is host-agnostic: it drives the small traits in `host`, and
// `cg-term` implements them for ANSI terminals.

pub mod cell;
pub mod clock;
mod draw;
pub mod engine;
pub mod error;
pub mod grid;
pub mod host;
pub mod input;
pub mod render;
pub mod scancode;

#[cfg(test)]
pub(crate) mod testing;

pub use cell::{Cell, Color, TextAttr};
pub use clock::{Clock, SystemClock};
pub use engine::{Context, Engine, EngineConfig, LoopState};
pub use error::{EXIT_OK, RunError};
pub use grid::Grid;
pub use host::{Display, Host, InputSource, PointerControl, RawEvent, Rect};
pub use input::{InputState, KeyTable, MouseButtons, Scroll};
pub use render::{RenderStats, Renderer};
