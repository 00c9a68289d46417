// SPDX-License-Identifier: MIT
//
// Physical key codes.
//
// Keys are identified by PC set-1 scancodes, named after the key that sits at
// that position on a US layout. A scancode names a physical key, not a
// character: `W` is "the key where W is on a US keyboard", whatever the active
// layout prints there. That is what movement controls want.

/// A physical key code. Values below 256 index the key table.
pub type Scancode = u16;

pub const EMPTY: Scancode = 0;
pub const ESC: Scancode = 1;
pub const KEY_1: Scancode = 2;
pub const KEY_2: Scancode = 3;
pub const KEY_3: Scancode = 4;
pub const KEY_4: Scancode = 5;
pub const KEY_5: Scancode = 6;
pub const KEY_6: Scancode = 7;
pub const KEY_7: Scancode = 8;
pub const KEY_8: Scancode = 9;
pub const KEY_9: Scancode = 10;
pub const KEY_0: Scancode = 11;
pub const HYPHEN: Scancode = 12;
pub const EQUALS: Scancode = 13;
pub const BACKSPACE: Scancode = 14;
pub const TAB: Scancode = 15;
pub const Q: Scancode = 16;
pub const W: Scancode = 17;
pub const E: Scancode = 18;
pub const R: Scancode = 19;
pub const T: Scancode = 20;
pub const Y: Scancode = 21;
pub const U: Scancode = 22;
pub const I: Scancode = 23;
pub const O: Scancode = 24;
pub const P: Scancode = 25;
pub const LEFT_BRACKET: Scancode = 26;
pub const RIGHT_BRACKET: Scancode = 27;
pub const ENTER: Scancode = 28;
pub const LCTRL: Scancode = 29;
pub const A: Scancode = 30;
pub const S: Scancode = 31;
pub const D: Scancode = 32;
pub const F: Scancode = 33;
pub const G: Scancode = 34;
pub const H: Scancode = 35;
pub const J: Scancode = 36;
pub const K: Scancode = 37;
pub const L: Scancode = 38;
pub const SEMICOLON: Scancode = 39;
pub const QUOTE: Scancode = 40;
pub const GRAVE: Scancode = 41;
pub const LSHIFT: Scancode = 42;
pub const BACKSLASH: Scancode = 43;
pub const Z: Scancode = 44;
pub const X: Scancode = 45;
pub const C: Scancode = 46;
pub const V: Scancode = 47;
pub const B: Scancode = 48;
pub const N: Scancode = 49;
pub const M: Scancode = 50;
pub const COMMA: Scancode = 51;
pub const FULL_STOP: Scancode = 52;
pub const SLASH: Scancode = 53;
pub const RSHIFT: Scancode = 54;
pub const PRT_SCR: Scancode = 55;
pub const LALT: Scancode = 56;
pub const SPACEBAR: Scancode = 57;
pub const CAPS_LOCK: Scancode = 58;
pub const F1: Scancode = 59;
pub const F2: Scancode = 60;
pub const F3: Scancode = 61;
pub const F4: Scancode = 62;
pub const F5: Scancode = 63;
pub const F6: Scancode = 64;
pub const F7: Scancode = 65;
pub const F8: Scancode = 66;
pub const F9: Scancode = 67;
pub const F10: Scancode = 68;
pub const NUM_LOCK: Scancode = 69;
pub const SCROLL_LOCK: Scancode = 70;
pub const HOME: Scancode = 71;
pub const UP: Scancode = 72;
pub const PAGE_UP: Scancode = 73;
pub const LEFT: Scancode = 75;
pub const RIGHT: Scancode = 77;
pub const END: Scancode = 79;
pub const DOWN: Scancode = 80;
pub const PAGE_DOWN: Scancode = 81;
pub const INSERT: Scancode = 82;
pub const DELETE: Scancode = 83;
pub const F11: Scancode = 87;
pub const F12: Scancode = 88;

/// US-layout position of a printable ASCII character.
///
/// Returns the scancode of the key that produces `ch` and whether Shift is
/// needed for it. Letters map case-insensitively to the same key, with
/// uppercase reporting Shift.
///
/// ```
/// use cg_engine::scancode::{self, for_char};
///
/// assert_eq!(for_char('w'), Some((scancode::W, false)));
/// assert_eq!(for_char('W'), Some((scancode::W, true)));
/// assert_eq!(for_char('!'), Some((scancode::KEY_1, true)));
/// assert_eq!(for_char('\u{e9}'), None);
/// ```
#[must_use]
pub const fn for_char(ch: char) -> Option<(Scancode, bool)> {
    let code = match ch.to_ascii_lowercase() {
        '1' | '!' => KEY_1,
        '2' | '@' => KEY_2,
        '3' | '#' => KEY_3,
        '4' | '$' => KEY_4,
        '5' | '%' => KEY_5,
        '6' | '^' => KEY_6,
        '7' | '&' => KEY_7,
        '8' | '*' => KEY_8,
        '9' | '(' => KEY_9,
        '0' | ')' => KEY_0,
        '-' | '_' => HYPHEN,
        '=' | '+' => EQUALS,
        'q' => Q,
        'w' => W,
        'e' => E,
        'r' => R,
        't' => T,
        'y' => Y,
        'u' => U,
        'i' => I,
        'o' => O,
        'p' => P,
        '[' | '{' => LEFT_BRACKET,
        ']' | '}' => RIGHT_BRACKET,
        'a' => A,
        's' => S,
        'd' => D,
        'f' => F,
        'g' => G,
        'h' => H,
        'j' => J,
        'k' => K,
        'l' => L,
        ';' | ':' => SEMICOLON,
        '\'' | '"' => QUOTE,
        '`' | '~' => GRAVE,
        '\\' | '|' => BACKSLASH,
        'z' => Z,
        'x' => X,
        'c' => C,
        'v' => V,
        'b' => B,
        'n' => N,
        'm' => M,
        ',' | '<' => COMMA,
        '.' | '>' => FULL_STOP,
        '/' | '?' => SLASH,
        ' ' => SPACEBAR,
        _ => return None,
    };
    let shifted = ch.is_ascii_uppercase()
        || matches!(
            ch,
            '!' | '@' | '#' | '$' | '%' | '^' | '&' | '*' | '(' | ')' | '_' | '+'
                | '{' | '}' | ':' | '"' | '~' | '|' | '<' | '>' | '?'
        );
    Some((code, shifted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_rows_are_contiguous() {
        assert_eq!(P - Q, 9);
        assert_eq!(L - A, 8);
        assert_eq!(M - Z, 6);
    }

    #[test]
    fn shifted_symbols() {
        for ch in ['!', '@', '#', '$', '%', '^', '&', '*', '(', ')', '_', '+'] {
            assert!(for_char(ch).is_some_and(|(_, shift)| shift), "{ch}");
        }
        for ch in ['{', '}', '|', ':', '"', '<', '>', '?', '~'] {
            assert!(for_char(ch).is_some_and(|(_, shift)| shift), "{ch}");
        }
    }

    #[test]
    fn unshifted_symbols() {
        for ch in ['1', '-', '=', '[', ']', '\\', ';', '\'', '`', ',', '.', '/', ' ', 'a'] {
            assert_eq!(for_char(ch).map(|(_, shift)| shift), Some(false), "{ch}");
        }
    }

    #[test]
    fn controls_have_no_position() {
        assert_eq!(for_char('\n'), None);
        assert_eq!(for_char('\x1b'), None);
    }
}
