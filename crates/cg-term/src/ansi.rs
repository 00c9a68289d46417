// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`. No state and
// no decisions about when to emit. The host decides that; this module only
// knows the byte-level encoding of each command.
//
// Cursor positions are 0-indexed in our API and converted to the terminal's
// 1-indexed CUP coordinates.
//
// Colors come from the 16-entry console palette. The console packs a color as
// blue | green << 1 | red << 2 | bright << 3, while ANSI numbers its eight base
// colors red | green << 1 | blue << 2. `ansi_index` swaps the red and blue
// bits, and brightness selects the 90/100 range instead of 30/40.

use std::io::{self, Write};

use bitflags::bitflags;
use cg_engine::cell::{Color, TextAttr};

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` with CUP.
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

/// Stop cursor blinking (att610 reset).
#[inline]
pub fn cursor_blink_off(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?12l")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2).
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Reset all SGR attributes (SGR 0).
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

/// Begin synchronized output (DEC 2026). The terminal holds the frame until
/// [`end_sync`].
#[inline]
pub fn begin_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026h")
}

#[inline]
pub fn end_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026l")
}

// ─── Color ───────────────────────────────────────────────────────────────────

/// The ANSI base-color number (0–7) of a palette entry.
#[inline]
#[must_use]
pub const fn ansi_index(color: Color) -> u8 {
    let c = color.index();
    ((c & 0b001) << 2) | (c & 0b010) | ((c & 0b100) >> 2)
}

/// SGR foreground code: 30–37 or 90–97.
#[inline]
#[must_use]
pub const fn fg_code(color: Color) -> u8 {
    if color.is_bright() { 90 + ansi_index(color) } else { 30 + ansi_index(color) }
}

/// SGR background code: 40–47 or 100–107.
#[inline]
#[must_use]
pub const fn bg_code(color: Color) -> u8 {
    if color.is_bright() { 100 + ansi_index(color) } else { 40 + ansi_index(color) }
}

/// Switch to a console text attribute with one SGR sequence.
#[inline]
pub fn text_attr(w: &mut impl Write, attr: TextAttr) -> io::Result<()> {
    write!(w, "\x1b[{};{}m", fg_code(attr.fg()), bg_code(attr.bg()))
}

// ─── Title ───────────────────────────────────────────────────────────────────

/// Set the window title (OSC 0). Control characters in `title` are dropped so
/// they cannot terminate the sequence early.
pub fn set_title(w: &mut impl Write, title: &str) -> io::Result<()> {
    w.write_all(b"\x1b]0;")?;
    for ch in title.chars().filter(|c| !c.is_control()) {
        let mut enc = [0u8; 4];
        w.write_all(ch.encode_utf8(&mut enc).as_bytes())?;
    }
    w.write_all(b"\x07")
}

// ─── Mouse ───────────────────────────────────────────────────────────────────

/// Which pointer events the terminal reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseMode {
    /// Presses, releases and wheel (1000).
    Click,
    /// Also motion while a button is held (1002).
    Drag,
    /// All motion, buttons or not (1003).
    Motion,
}

/// Enable mouse reporting in SGR encoding (1006).
pub fn enable_mouse(w: &mut impl Write, mode: MouseMode) -> io::Result<()> {
    let tracking: &[u8] = match mode {
        MouseMode::Click => b"\x1b[?1000h",
        MouseMode::Drag => b"\x1b[?1000h\x1b[?1002h",
        MouseMode::Motion => b"\x1b[?1000h\x1b[?1003h",
    };
    w.write_all(tracking)?;
    w.write_all(b"\x1b[?1006h")
}

/// Disable every mouse mode [`enable_mouse`] can set.
pub fn disable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l")
}

// ─── Kitty keyboard ──────────────────────────────────────────────────────────

bitflags! {
    /// Progressive enhancement flags of the Kitty keyboard protocol.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct KittyFlags: u8 {
        const DISAMBIGUATE        = 0b0_0001;
        const REPORT_EVENT_TYPES  = 0b0_0010;
        const ALTERNATE_KEYS      = 0b0_0100;
        const ALL_KEYS_AS_ESCAPES = 0b0_1000;
        const ASSOCIATED_TEXT     = 0b1_0000;
    }
}

impl KittyFlags {
    /// What a game loop wants: every key, including modifiers, as an escape
    /// code with press, repeat and release.
    pub const GAME: Self = Self::DISAMBIGUATE
        .union(Self::REPORT_EVENT_TYPES)
        .union(Self::ALL_KEYS_AS_ESCAPES);
}

/// Push `flags` onto the terminal's keyboard mode stack.
#[inline]
pub fn push_kitty_keyboard(w: &mut impl Write, flags: KittyFlags) -> io::Result<()> {
    write!(w, "\x1b[>{}u", flags.bits())
}

/// Pop the mode pushed by [`push_kitty_keyboard`].
#[inline]
pub fn pop_kitty_keyboard(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[<u")
}

/// Ask for the active flags. Supporting terminals answer `CSI ? flags u`.
#[inline]
pub fn query_kitty_keyboard(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?u")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
