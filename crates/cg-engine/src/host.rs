// SPDX-License-Identifier: MIT
//
// Host boundary: what the engine needs from the outside world.
//
// The engine never talks to a terminal directly. It drives three small traits:
//
//   Display         size query, cursor, color attribute, raw bytes, title
//   InputSource     non-blocking drain of raw key and mouse events
//   PointerControl  pointer position and window bounds, used in grab mode
//
// `Host` is the union of the three, implemented for anything that implements
// all of them. `cg-term` provides the ANSI implementation. Tests use a
// recording mock.

use std::io;
use std::num::NonZeroI32;

use crate::cell::TextAttr;
use crate::input::MouseButtons;
use crate::scancode::Scancode;

// ─── Geometry ────────────────────────────────────────────────────────────────

/// An axis-aligned rectangle in pointer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point, rounded toward the top-left.
    #[inline]
    #[must_use]
    pub const fn center(self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// One raw input record as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEvent {
    /// A physical key changed state.
    Key { code: Scancode, down: bool },
    /// The pointer moved, a button changed, or the wheel turned.
    ///
    /// `buttons` is the full set of buttons held at the time of the record,
    /// not a delta. `wheel` is the signed wheel delta, positive away from the
    /// user, when this record is a wheel event.
    Mouse {
        x: i32,
        y: i32,
        buttons: MouseButtons,
        wheel: Option<NonZeroI32>,
    },
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// The character display the engine renders into.
pub trait Display {
    /// Current size as `(rows, cols)`.
    fn size(&mut self) -> io::Result<(u16, u16)>;

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()>;

    /// Move the hardware cursor to column `x`, row `y` (0-based).
    fn move_cursor(&mut self, x: u16, y: u16) -> io::Result<()>;

    /// Color used by subsequent `write_bytes` calls.
    fn set_text_color(&mut self, attr: TextAttr) -> io::Result<()>;

    /// Write single-byte characters at the cursor, advancing it one cell each.
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn set_title(&mut self, title: &str) -> io::Result<()>;

    /// Push anything buffered to the device. Called once per frame.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Source of raw input records.
pub trait InputSource {
    /// Everything that arrived since the last call, oldest first.
    ///
    /// Must not block. Returns an empty `Vec` when nothing is pending.
    fn poll_events(&mut self) -> Vec<RawEvent>;
}

/// Physical pointer access, used only while grab mode is active.
pub trait PointerControl {
    /// Pointer position, or `None` if it cannot be determined.
    fn pointer_position(&self) -> Option<(i32, i32)>;

    fn set_pointer_position(&mut self, x: i32, y: i32) -> io::Result<()>;

    /// Bounds of the display window in pointer coordinates.
    fn window_bounds(&self) -> Option<Rect>;
}

/// Everything the engine needs from its host.
pub trait Host: Display + InputSource + PointerControl {}

impl<T: Display + InputSource + PointerControl> Host for T {}
