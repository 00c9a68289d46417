// SPDX-License-Identifier: MIT
//
// Terminal input parser.
//
// Turns raw stdin bytes into physical-key and mouse records. It handles each
// protocol the terminal host enables:
//
// - Plain bytes: printable ASCII, control characters, Alt+key (ESC prefix)
// - Legacy CSI and SS3 sequences (arrows, editing keys, function keys)
// - Kitty keyboard protocol (`CSI code ; mods:event u`) with press, repeat
//   and release, including modifier keys on their own
// - SGR mouse (`CSI < b ; x ; y M/m`): press, release, motion, wheel
// - The reply to the Kitty flags query (`CSI ? flags u`)
//
// Keys come out as US-layout scancodes, not characters: `W` and `w` are the
// same key. Anything without a scancode (UTF-8 text, unknown sequences) is
// consumed and dropped.
//
// Sequences can be split across reads, so the parser keeps a small buffer.
// A lone ESC is ambiguous until more bytes arrive or time passes; the host
// calls `flush` when a poll brings no new bytes, which resolves it to the
// Escape key.

use cg_engine::input::MouseButtons;
use cg_engine::scancode::{self, Scancode};
use tracing::trace;

/// Longest CSI sequence we wait for before discarding it as garbage.
const MAX_SEQUENCE: usize = 64;

// ─── Input Types ─────────────────────────────────────────────────────────────

/// Press, repeat or release. Terminals without event reporting only send
/// presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyKind {
    #[default]
    Press,
    Repeat,
    Release,
}

/// What a mouse record did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    Press(MouseButtons),
    Release(MouseButtons),
    Move,
    /// `+1` away from the user, `-1` toward.
    Wheel(i32),
}

/// One parsed input record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Key { code: Scancode, kind: KeyKind },
    /// Cell coordinates, 0-indexed.
    Mouse { x: i32, y: i32, action: MouseAction },
    /// The terminal's answer to the Kitty flags query.
    KeyboardFlags(u32),
}

/// Result of trying to parse at the front of the buffer.
enum Parsed {
    /// Consumed this many bytes, optionally producing a record.
    Done(Option<Input>, usize),
    /// Need more bytes.
    Incomplete,
}

// ─── Parser ──────────────────────────────────────────────────────────────────

/// Incremental byte parser.
#[derive(Debug, Default)]
pub struct Parser {
    buf: Vec<u8>,
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and return every record they complete.
    pub fn advance(&mut self, data: &[u8]) -> Vec<Input> {
        self.buf.extend_from_slice(data);
        let mut out = Vec::new();
        let mut pos = 0;

        while pos < self.buf.len() {
            match parse_one(&self.buf[pos..]) {
                Parsed::Done(input, consumed) => {
                    if input.is_none() {
                        trace!(bytes = ?&self.buf[pos..pos + consumed], "unparsed input");
                    }
                    out.extend(input);
                    pos += consumed;
                }
                Parsed::Incomplete => break,
            }
        }

        self.buf.drain(..pos);
        out
    }

    /// Whether a partial sequence is waiting for more bytes.
    #[inline]
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Resolve whatever is pending as if no more bytes will come.
    ///
    /// A leading ESC becomes the Escape key. The rest is parsed again, and
    /// whatever is still incomplete after that is dropped.
    pub fn flush(&mut self) -> Vec<Input> {
        let pending = std::mem::take(&mut self.buf);
        let Some((&first, rest)) = pending.split_first() else {
            return Vec::new();
        };

        let mut out = Vec::new();
        let rest = if first == 0x1b {
            out.push(press(scancode::ESC));
            rest
        } else {
            &pending[..]
        };
        out.extend(self.advance(rest));
        self.buf.clear();
        out
    }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

fn parse_one(buf: &[u8]) -> Parsed {
    match buf {
        [0x1b] => Parsed::Incomplete,
        [0x1b, b'[', ..] => parse_csi(buf),
        [0x1b, b'O', ..] => parse_ss3(buf),
        [0x1b, 0x1b, ..] => Parsed::Done(Some(press(scancode::ESC)), 1),
        // Alt+key: the key itself, without the modifier.
        [0x1b, b, ..] if *b < 0x80 => Parsed::Done(parse_byte(*b), 2),
        [0x1b, ..] => Parsed::Done(Some(press(scancode::ESC)), 1),
        [b, ..] if *b >= 0x80 => skip_utf8(buf),
        [b, ..] => Parsed::Done(parse_byte(*b), 1),
        [] => Parsed::Incomplete,
    }
}

/// A single byte in legacy mode.
fn parse_byte(b: u8) -> Option<Input> {
    let code = match b {
        b'\r' | b'\n' => scancode::ENTER,
        b'\t' => scancode::TAB,
        0x7f | 0x08 => scancode::BACKSPACE,
        0x1b => scancode::ESC,
        // Ctrl+Space
        0x00 => scancode::SPACEBAR,
        // Ctrl+letter
        0x01..=0x1a => return key_for_char(char::from(b'a' + b - 1)),
        0x20..=0x7e => return key_for_char(char::from(b)),
        _ => return None,
    };
    Some(press(code))
}

fn key_for_char(ch: char) -> Option<Input> {
    scancode::for_char(ch).map(|(code, _)| press(code))
}

/// Consume one UTF-8 sequence. Non-ASCII text has no scancode.
fn skip_utf8(buf: &[u8]) -> Parsed {
    let len = match buf[0] {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 1,
    };
    if buf.len() < len {
        Parsed::Incomplete
    } else {
        Parsed::Done(None, len)
    }
}

// ─── CSI ─────────────────────────────────────────────────────────────────────

fn parse_csi(buf: &[u8]) -> Parsed {
    // Find the final byte (0x40..=0x7e) after parameter/intermediate bytes.
    let mut end = 2;
    loop {
        let Some(&b) = buf.get(end) else {
            return if buf.len() < MAX_SEQUENCE { Parsed::Incomplete } else { Parsed::Done(None, buf.len()) };
        };
        match b {
            0x20..=0x3f => end += 1,
            0x40..=0x7e => break,
            // Not a CSI byte: drop what we have so far.
            _ => return Parsed::Done(None, end),
        }
    }

    let consumed = end + 1;
    let params = &buf[2..end];
    let fin = buf[end];

    let input = match params.first() {
        Some(b'<') => parse_sgr_mouse(&params[1..], fin),
        Some(b'?') if fin == b'u' => Some(Input::KeyboardFlags(number(&params[1..]))),
        Some(b'?' | b'>' | b'=') => None,
        _ => parse_csi_key(params, fin),
    };
    Parsed::Done(input, consumed)
}

/// `CSI [code[:alt]] [; mods[:event]] final`
fn parse_csi_key(params: &[u8], fin: u8) -> Option<Input> {
    let mut fields = params.split(|&b| b == b';');
    let first = fields.next().unwrap_or_default();
    let key_num = number(first.split(|&b| b == b':').next().unwrap_or_default());
    let kind = fields
        .next()
        .and_then(|mods| mods.split(|&b| b == b':').nth(1))
        .map_or(KeyKind::Press, |event| match number(event) {
            2 => KeyKind::Repeat,
            3 => KeyKind::Release,
            _ => KeyKind::Press,
        });

    let code = match fin {
        b'A' => scancode::UP,
        b'B' => scancode::DOWN,
        b'C' => scancode::RIGHT,
        b'D' => scancode::LEFT,
        b'H' => scancode::HOME,
        b'F' => scancode::END,
        b'P' => scancode::F1,
        b'Q' => scancode::F2,
        b'R' => scancode::F3,
        b'S' => scancode::F4,
        b'~' => tilde_key(key_num)?,
        b'u' => kitty_key(key_num)?,
        _ => return None,
    };
    Some(Input::Key { code, kind })
}

/// `CSI n ~` editing and function keys.
const fn tilde_key(n: u32) -> Option<Scancode> {
    Some(match n {
        1 | 7 => scancode::HOME,
        2 => scancode::INSERT,
        3 => scancode::DELETE,
        4 | 8 => scancode::END,
        5 => scancode::PAGE_UP,
        6 => scancode::PAGE_DOWN,
        11 => scancode::F1,
        12 => scancode::F2,
        13 => scancode::F3,
        14 => scancode::F4,
        15 => scancode::F5,
        17 => scancode::F6,
        18 => scancode::F7,
        19 => scancode::F8,
        20 => scancode::F9,
        21 => scancode::F10,
        23 => scancode::F11,
        24 => scancode::F12,
        _ => return None,
    })
}

/// Kitty `CSI code u` key numbers: Unicode for text keys, private-use
/// codes for functional keys.
fn kitty_key(code: u32) -> Option<Scancode> {
    Some(match code {
        27 => scancode::ESC,
        13 => scancode::ENTER,
        9 => scancode::TAB,
        8 | 127 => scancode::BACKSPACE,
        57358 => scancode::CAPS_LOCK,
        57359 => scancode::SCROLL_LOCK,
        57360 => scancode::NUM_LOCK,
        57361 => scancode::PRT_SCR,
        57441 => scancode::LSHIFT,
        57447 => scancode::RSHIFT,
        // Right-hand Ctrl and Alt share the left-hand scancode on PC set 1.
        57442 | 57448 => scancode::LCTRL,
        57443 | 57449 => scancode::LALT,
        32..=126 => {
            let ch = char::from_u32(code)?;
            return scancode::for_char(ch).map(|(sc, _)| sc);
        }
        _ => return None,
    })
}

// ─── SS3 ─────────────────────────────────────────────────────────────────────

fn parse_ss3(buf: &[u8]) -> Parsed {
    let Some(&fin) = buf.get(2) else {
        return Parsed::Incomplete;
    };
    let code = match fin {
        b'A' => scancode::UP,
        b'B' => scancode::DOWN,
        b'C' => scancode::RIGHT,
        b'D' => scancode::LEFT,
        b'H' => scancode::HOME,
        b'F' => scancode::END,
        b'P' => scancode::F1,
        b'Q' => scancode::F2,
        b'R' => scancode::F3,
        b'S' => scancode::F4,
        _ => return Parsed::Done(None, 3),
    };
    Parsed::Done(Some(press(code)), 3)
}

// ─── SGR Mouse ───────────────────────────────────────────────────────────────

/// `b ; x ; y` with final `M` (press or motion) or `m` (release).
fn parse_sgr_mouse(params: &[u8], fin: u8) -> Option<Input> {
    if fin != b'M' && fin != b'm' {
        return None;
    }
    let mut fields = params.split(|&b| b == b';').map(number);
    let (b, x, y) = (fields.next()?, fields.next()?, fields.next()?);

    let base = b & 0b11;
    let action = if b & 64 != 0 {
        match base {
            0 => MouseAction::Wheel(1),
            1 => MouseAction::Wheel(-1),
            // Horizontal wheel.
            _ => return None,
        }
    } else if b & 32 != 0 || base == 3 {
        MouseAction::Move
    } else if fin == b'M' {
        MouseAction::Press(button(base))
    } else {
        MouseAction::Release(button(base))
    };

    #[allow(clippy::cast_possible_wrap)] // bounded by `number`
    let (x, y) = (x.saturating_sub(1) as i32, y.saturating_sub(1) as i32);
    Some(Input::Mouse { x, y, action })
}

const fn button(base: u32) -> MouseButtons {
    match base {
        0 => MouseButtons::LEFT,
        1 => MouseButtons::MIDDLE,
        _ => MouseButtons::RIGHT,
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

const fn press(code: Scancode) -> Input {
    Input::Key {
        code,
        kind: KeyKind::Press,
    }
}

/// Decimal digits to a number, capped well below `i32::MAX`. Non-digits are
/// skipped.
fn number(digits: &[u8]) -> u32 {
    digits
        .iter()
        .filter(|b| b.is_ascii_digit())
        .fold(0u32, |acc, &d| acc.saturating_mul(10).saturating_add(u32::from(d - b'0')))
        .min(1 << 30)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
