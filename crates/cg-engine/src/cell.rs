// SPDX-License-Identifier: MIT
//
// Cell: the atomic unit of the character grid.
//
// Every grid position is one Cell: a single-byte character plus a foreground
// and a background color, each drawn from a fixed 16-entry palette. The three
// fields are packed into one `u16`:
//
//   ┌───────────────┬───────────┬───────────┐
//   │ bits 0–7      │ bits 8–11 │ bits 12–15│
//   │ character     │ fg index  │ bg index  │
//   └───────────────┴───────────┴───────────┘
//
// Two bytes per cell. A 200×50 terminal is 10,000 cells = 20 KB per grid, and
// equality is a single integer compare, which is what the diff renderer's hot
// loop wants.
//
// Setters are permissive: an out-of-range color index or a control character
// leaves the cell unchanged instead of failing. A frame is redrawn every tick,
// so a bad value from the tick callback should not take the loop down.

use std::fmt;

// ─── Palette ─────────────────────────────────────────────────────────────────

/// Number of entries in the color palette.
pub const PALETTE_SIZE: u8 = 16;

/// Smallest character code accepted by [`Cell::set_character`].
pub const PRINTABLE_MIN: u8 = 0x20;

/// The 16-entry console palette, in console attribute order.
///
/// The discriminant is the 4-bit index stored in a [`Cell`]. Bit 0 is blue,
/// bit 1 green, bit 2 red and bit 3 intensity, the same as the classic text-mode
/// attribute byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Aqua = 3,
    Red = 4,
    Purple = 5,
    Yellow = 6,
    White = 7,
    Gray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightAqua = 11,
    LightRed = 12,
    LightPurple = 13,
    LightYellow = 14,
    BrightWhite = 15,
}

impl Color {
    /// Every palette entry, indexed by its discriminant.
    pub const ALL: [Self; PALETTE_SIZE as usize] = [
        Self::Black,
        Self::Blue,
        Self::Green,
        Self::Aqua,
        Self::Red,
        Self::Purple,
        Self::Yellow,
        Self::White,
        Self::Gray,
        Self::LightBlue,
        Self::LightGreen,
        Self::LightAqua,
        Self::LightRed,
        Self::LightPurple,
        Self::LightYellow,
        Self::BrightWhite,
    ];

    /// The palette entry for `index`, or `None` if `index >= 16`.
    #[inline]
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < PALETTE_SIZE {
            Some(Self::ALL[index as usize])
        } else {
            None
        }
    }

    /// The palette entry for the low nibble of `bits`. Total by construction.
    #[inline]
    const fn from_nibble(bits: u16) -> Self {
        Self::ALL[(bits & 0xF) as usize]
    }

    /// The 4-bit palette index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Whether this is one of the eight high-intensity entries.
    #[inline]
    #[must_use]
    pub const fn is_bright(self) -> bool {
        self.index() & 0b1000 != 0
    }
}

impl From<Color> for u8 {
    #[inline]
    fn from(color: Color) -> Self {
        color.index()
    }
}

// ─── Text Attribute ──────────────────────────────────────────────────────────

/// A console text attribute: `16 * bg + fg`.
///
/// This is what the renderer hands to the display surface when it switches
/// colors. Comparing attributes instead of separate fg/bg pairs lets the
/// renderer skip a switch with one byte compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextAttr(u8);

impl TextAttr {
    /// The attribute the host display is restored to: white on black.
    pub const DEFAULT: Self = Self::new(Color::White, Color::Black);

    /// Build an attribute from a foreground and a background color.
    #[inline]
    #[must_use]
    pub const fn new(fg: Color, bg: Color) -> Self {
        Self(bg.index() << 4 | fg.index())
    }

    /// Reinterpret a raw attribute byte.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// The raw attribute byte.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Foreground color (low nibble).
    #[inline]
    #[must_use]
    pub const fn fg(self) -> Color {
        Color::from_nibble(self.0 as u16)
    }

    /// Background color (high nibble).
    #[inline]
    #[must_use]
    pub const fn bg(self) -> Color {
        Color::from_nibble((self.0 >> 4) as u16)
    }
}

impl Default for TextAttr {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

const CHAR_MASK: u16 = 0x00FF;
const FG_SHIFT: u16 = 8;
const BG_SHIFT: u16 = 12;
const FG_MASK: u16 = 0x0F00;
const BG_MASK: u16 = 0xF000;

/// One character-grid position: character, foreground and background.
///
/// Packed into a `u16`. Two cells are equal iff all three fields match.
///
/// # Examples
///
/// ```
/// use cg_engine::cell::{Cell, Color};
///
/// let mut cell = Cell::new(b'@', Color::LightGreen, Color::Black);
/// assert_eq!(cell.character(), b'@');
///
/// cell.set_fg(Color::Red);
/// assert_eq!(cell.fg(), Color::Red);
///
/// // Out-of-range indices are ignored.
/// cell.set_bg(42_u8);
/// assert_eq!(cell.bg(), Color::Black);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell(u16);

impl Cell {
    /// The empty, "clear" cell: a space, white on black.
    pub const EMPTY: Self = Self::pack(b' ', Color::White as u8, Color::Black as u8);

    /// Pack a character and two palette indices.
    ///
    /// `fg` and `bg` are masked to their low four bits, so the result is
    /// always a valid cell. For indices in `[0, 16)` this round-trips through
    /// [`unpack`](Self::unpack).
    #[inline]
    #[must_use]
    pub const fn pack(character: u8, fg: u8, bg: u8) -> Self {
        let fg = ((fg & 0xF) as u16) << FG_SHIFT;
        let bg = ((bg & 0xF) as u16) << BG_SHIFT;
        Self(character as u16 | fg | bg)
    }

    /// Build a cell from palette colors.
    #[inline]
    #[must_use]
    pub const fn new(character: u8, fg: Color, bg: Color) -> Self {
        Self::pack(character, fg.index(), bg.index())
    }

    /// Split the cell back into `(character, fg, bg)`.
    #[inline]
    #[must_use]
    pub const fn unpack(self) -> (u8, u8, u8) {
        (self.character(), self.fg().index(), self.bg().index())
    }

    /// Reinterpret a raw packed value.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// The raw packed value.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    // ─── Queries ──────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn character(self) -> u8 {
        #[allow(clippy::cast_possible_truncation)] // masked to 8 bits
        let ch = (self.0 & CHAR_MASK) as u8;
        ch
    }

    #[inline]
    #[must_use]
    pub const fn fg(self) -> Color {
        Color::from_nibble(self.0 >> FG_SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn bg(self) -> Color {
        Color::from_nibble(self.0 >> BG_SHIFT)
    }

    /// The console attribute this cell is drawn with.
    #[inline]
    #[must_use]
    pub const fn attr(self) -> TextAttr {
        TextAttr::new(self.fg(), self.bg())
    }

    // ─── Mutations ────────────────────────────────────────────────────────

    /// Replace the character. Control characters (below `0x20`) are ignored.
    #[inline]
    pub const fn set_character(&mut self, character: u8) {
        if character >= PRINTABLE_MIN {
            self.0 = (self.0 & !CHAR_MASK) | character as u16;
        }
    }

    /// Replace the foreground. Indices outside `[0, 16)` are ignored.
    #[inline]
    pub fn set_fg(&mut self, fg: impl Into<u8>) {
        let fg = fg.into();
        if fg < PALETTE_SIZE {
            self.0 = (self.0 & !FG_MASK) | (u16::from(fg) << FG_SHIFT);
        }
    }

    /// Replace the background. Indices outside `[0, 16)` are ignored.
    #[inline]
    pub fn set_bg(&mut self, bg: impl Into<u8>) {
        let bg = bg.into();
        if bg < PALETTE_SIZE {
            self.0 = (self.0 & !BG_MASK) | (u16::from(bg) << BG_SHIFT);
        }
    }

    /// Copy with a different foreground.
    #[inline]
    #[must_use]
    pub const fn with_fg(self, fg: Color) -> Self {
        Self((self.0 & !FG_MASK) | ((fg.index() as u16) << FG_SHIFT))
    }

    /// Copy with a different background.
    #[inline]
    #[must_use]
    pub const fn with_bg(self, bg: Color) -> Self {
        Self((self.0 & !BG_MASK) | ((bg.index() as u16) << BG_SHIFT))
    }
}

impl Default for Cell {
    #[inline]
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cell({:?}, {:?} on {:?})",
            char::from(self.character()),
            self.fg(),
            self.bg()
        )
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
