// SPDX-License-Identifier: MIT
//
// Input state: the per-tick snapshot of keyboard and mouse.
//
// The engine folds raw host events into an `InputState` once per tick, before
// the tick callback runs. The callback only reads it.
//
// Per tick, in order:
//
//   1. `begin_tick`: the current key table becomes the previous one and
//      scroll resets to zero. Scroll is a per-tick signal, never accumulated.
//   2. `update_grab`: in grab mode the pointer's offset from the window
//      center becomes the relative delta and the pointer is re-centered.
//      Outside grab mode the delta is zero.
//   3. `apply` for each polled event, oldest first.
//
// "Just pressed" and "just released" are derived from the current/previous
// pair on demand, so there is no third table to keep in sync.

use std::io;
use std::num::NonZeroI32;

use bitflags::bitflags;

use crate::host::{PointerControl, RawEvent};
use crate::scancode::Scancode;

/// Number of entries in the key table. Codes at or above this are ignored.
pub const KEY_COUNT: usize = 256;

// ─── Key Table ───────────────────────────────────────────────────────────────

/// A 256-entry down/up table stored as a bitset.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyTable([u64; KEY_COUNT / 64]);

impl KeyTable {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self([0; KEY_COUNT / 64])
    }

    /// Set or clear the entry for `code`. Out-of-range codes are ignored.
    #[inline]
    pub const fn set(&mut self, code: Scancode, down: bool) {
        let code = code as usize;
        if code >= KEY_COUNT {
            return;
        }
        let bit = 1u64 << (code % 64);
        if down {
            self.0[code / 64] |= bit;
        } else {
            self.0[code / 64] &= !bit;
        }
    }

    /// Whether `code` is down. Out-of-range codes are never down.
    #[inline]
    #[must_use]
    pub const fn is_down(&self, code: Scancode) -> bool {
        let code = code as usize;
        code < KEY_COUNT && self.0[code / 64] & (1u64 << (code % 64)) != 0
    }

    /// Number of keys currently down.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.0.iter().map(|w| w.count_ones()).sum()
    }

    /// Codes of every key that is down, ascending.
    pub fn iter_down(&self) -> impl Iterator<Item = Scancode> + '_ {
        #[allow(clippy::cast_possible_truncation)] // code < KEY_COUNT
        (0..KEY_COUNT as Scancode).filter(|&code| self.is_down(code))
    }

    pub fn clear(&mut self) {
        self.0 = [0; KEY_COUNT / 64];
    }
}

impl std::fmt::Debug for KeyTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter_down()).finish()
    }
}

// ─── Mouse ───────────────────────────────────────────────────────────────────

bitflags! {
    /// Held mouse buttons, one bit per physical button.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct MouseButtons: u8 {
        const LEFT   = 0x1;
        const RIGHT  = 0x2;
        const MIDDLE = 0x4;
    }
}

/// Wheel direction seen this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i8)]
pub enum Scroll {
    /// Away from the user.
    Up = 1,
    #[default]
    None = 0,
    /// Toward the user.
    Down = -1,
}

impl Scroll {
    /// Keep only the sign of a wheel delta.
    #[inline]
    #[must_use]
    pub const fn from_delta(delta: NonZeroI32) -> Self {
        if delta.get() > 0 { Self::Up } else { Self::Down }
    }

    /// `-1`, `0` or `+1`.
    #[inline]
    #[must_use]
    pub const fn value(self) -> i32 {
        self as i32
    }
}

// ─── Input State ─────────────────────────────────────────────────────────────

/// Keyboard and mouse snapshot for one tick.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    keys: KeyTable,
    previous: KeyTable,
    mouse_x: i32,
    mouse_y: i32,
    mouse_dx: i32,
    mouse_dy: i32,
    scroll: Scroll,
    buttons: MouseButtons,
}

impl InputState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Per-tick update ─────────────────────────────────────────────────

    /// Start a new tick: snapshot the key table and reset scroll.
    pub const fn begin_tick(&mut self) {
        self.previous = self.keys;
        self.scroll = Scroll::None;
    }

    /// Compute the grab delta for this tick.
    ///
    /// With `grabbed`, the delta is the pointer's offset from the center of
    /// the window and the pointer is moved back to the center. When the host
    /// cannot report a position or bounds, or when not grabbed, the delta is
    /// zero.
    pub fn update_grab(&mut self, grabbed: bool, pointer: &mut impl PointerControl) -> io::Result<()> {
        self.mouse_dx = 0;
        self.mouse_dy = 0;
        if !grabbed {
            return Ok(());
        }
        let (Some((px, py)), Some(bounds)) = (pointer.pointer_position(), pointer.window_bounds())
        else {
            return Ok(());
        };
        let (cx, cy) = bounds.center();
        self.mouse_dx = px - cx;
        self.mouse_dy = py - cy;
        pointer.set_pointer_position(cx, cy)
    }

    /// Fold one raw event into the snapshot.
    pub fn apply(&mut self, event: RawEvent) {
        match event {
            RawEvent::Key { code, down } => self.keys.set(code, down),
            RawEvent::Mouse {
                x,
                y,
                buttons,
                wheel,
            } => {
                self.mouse_x = x;
                self.mouse_y = y;
                if let Some(delta) = wheel {
                    self.scroll = Scroll::from_delta(delta);
                }
                // Replaced, not merged: the last record in a batch wins.
                self.buttons = buttons;
            }
        }
    }

    /// Forget all held keys and buttons.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn is_key_down(&self, code: Scancode) -> bool {
        self.keys.is_down(code)
    }

    /// Down this tick, up the tick before.
    #[inline]
    #[must_use]
    pub const fn is_key_just_pressed(&self, code: Scancode) -> bool {
        self.keys.is_down(code) && !self.previous.is_down(code)
    }

    /// Up this tick, down the tick before.
    #[inline]
    #[must_use]
    pub const fn is_key_just_released(&self, code: Scancode) -> bool {
        !self.keys.is_down(code) && self.previous.is_down(code)
    }

    /// Whether every button in `buttons` is held.
    #[inline]
    #[must_use]
    pub const fn is_button_down(&self, buttons: MouseButtons) -> bool {
        self.buttons.contains(buttons)
    }

    #[inline]
    #[must_use]
    pub const fn keys(&self) -> &KeyTable {
        &self.keys
    }

    #[inline]
    #[must_use]
    pub const fn buttons(&self) -> MouseButtons {
        self.buttons
    }

    #[inline]
    #[must_use]
    pub const fn mouse_x(&self) -> i32 {
        self.mouse_x
    }

    #[inline]
    #[must_use]
    pub const fn mouse_y(&self) -> i32 {
        self.mouse_y
    }

    /// Relative pointer movement this tick. Zero outside grab mode.
    #[inline]
    #[must_use]
    pub const fn mouse_dx(&self) -> i32 {
        self.mouse_dx
    }

    #[inline]
    #[must_use]
    pub const fn mouse_dy(&self) -> i32 {
        self.mouse_dy
    }

    #[inline]
    #[must_use]
    pub const fn scroll(&self) -> Scroll {
        self.scroll
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
