// SPDX-License-Identifier: MIT
//
// Key latch: synthesized releases for terminals that only report presses.
//
// Legacy terminal input has no key-up events. A key that was pressed would
// stay down in the engine's key table forever. The latch remembers each
// pressed key and, after `hold` polls with no further press of it, emits a
// release. Autorepeat of a held key keeps refreshing the countdown.
//
// Once the terminal proves it reports releases (a real release arrives, or
// the Kitty flags reply includes event types) the latch is switched off and
// forgets what it holds.

use cg_engine::host::RawEvent;
use cg_engine::scancode::Scancode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Latched {
    code: Scancode,
    remaining: u32,
    /// Pressed during the current poll.
    fresh: bool,
}

/// Countdown of keys waiting for a synthesized release.
#[derive(Debug, Clone)]
pub struct KeyLatch {
    hold: u32,
    active: bool,
    held: Vec<Latched>,
}

impl KeyLatch {
    /// A latch that releases a key `hold` polls after its last press.
    /// `0` is treated as `1`, so every press is seen down for one tick.
    #[must_use]
    pub fn new(hold: u32) -> Self {
        Self {
            hold: hold.max(1),
            active: true,
            held: Vec::new(),
        }
    }

    /// Whether releases are still being synthesized.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Keys currently latched down, in press order.
    pub fn held(&self) -> impl Iterator<Item = Scancode> + '_ {
        self.held.iter().map(|l| l.code)
    }

    /// Record a press (or autorepeat) of `code`.
    pub fn press(&mut self, code: Scancode) {
        if !self.active {
            return;
        }
        let hold = self.hold;
        match self.held.iter_mut().find(|l| l.code == code) {
            Some(latched) => {
                latched.remaining = hold;
                latched.fresh = true;
            }
            None => self.held.push(Latched {
                code,
                remaining: hold,
                fresh: true,
            }),
        }
    }

    /// Stop synthesizing releases and forget every latched key. Each of
    /// them gets a real release from the terminal from now on.
    pub fn disable(&mut self) {
        self.active = false;
        self.held.clear();
    }

    /// Count down at the end of a poll and emit releases that came due.
    /// Keys pressed during this poll are left for the next one.
    pub fn end_poll(&mut self, out: &mut Vec<RawEvent>) {
        self.held.retain_mut(|latched| {
            if latched.fresh {
                latched.fresh = false;
                return true;
            }
            latched.remaining -= 1;
            if latched.remaining == 0 {
                out.push(release_event(latched.code));
                false
            } else {
                true
            }
        });
    }
}

const fn release_event(code: Scancode) -> RawEvent {
    RawEvent::Key { code, down: false }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
