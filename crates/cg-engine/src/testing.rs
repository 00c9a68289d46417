// SPDX-License-Identifier: MIT
//
// Test doubles: a recording host and a manually driven clock.
//
// `MockHost` records every display call and also simulates the screen: bytes
// land at the simulated cursor in the simulated color, the way a console
// would show them. Tests can then assert on the calls (how many moves, how
// many color switches) and on the resulting picture.

use std::cell::{Cell as StdCell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::cell::{Cell, TextAttr};
use crate::clock::Clock;
use crate::grid::Grid;
use crate::host::{Display, InputSource, PointerControl, RawEvent, Rect};

// ─── MockHost ────────────────────────────────────────────────────────────────

/// One recorded host call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    CursorVisible(bool),
    Move(u16, u16),
    Color(TextAttr),
    Write(Vec<u8>),
    Title(String),
    Flush,
    Pointer(i32, i32),
}

pub struct MockHost {
    size: (u16, u16),
    pending_sizes: VecDeque<(u16, u16)>,
    pending_events: VecDeque<Vec<RawEvent>>,
    pub ops: Vec<Op>,
    pub screen: Grid,
    cursor: (u16, u16),
    attr: TextAttr,
    pub pointer: Option<(i32, i32)>,
    pub bounds: Option<Rect>,
    /// Make `write_bytes` fail from now on.
    pub fail_writes: bool,
}

impl MockHost {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            size: (rows, cols),
            pending_sizes: VecDeque::new(),
            pending_events: VecDeque::new(),
            ops: Vec::new(),
            screen: Grid::new(rows, cols),
            cursor: (0, 0),
            attr: TextAttr::DEFAULT,
            pointer: None,
            bounds: None,
            fail_writes: false,
        }
    }

    /// Report `(rows, cols)` starting with the next size query.
    pub fn resize_later(&mut self, rows: u16, cols: u16) {
        self.pending_sizes.push_back((rows, cols));
    }

    /// Deliver `events` on a future poll, one batch per poll.
    pub fn queue_events(&mut self, events: Vec<RawEvent>) {
        self.pending_events.push_back(events);
    }

    pub fn count(&self, pred: impl Fn(&Op) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    pub fn writes(&self) -> usize {
        self.count(|op| matches!(op, Op::Write(_)))
    }

    pub fn titles(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Title(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    pub const fn current_attr(&self) -> TextAttr {
        self.attr
    }
}

impl Display for MockHost {
    fn size(&mut self) -> io::Result<(u16, u16)> {
        match self.pending_sizes.pop_front() {
            Some(next) if next != self.size => {
                self.size = next;
                self.screen = Grid::new(next.0, next.1);
            }
            _ => {}
        }
        Ok(self.size)
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        self.ops.push(Op::CursorVisible(visible));
        Ok(())
    }

    fn move_cursor(&mut self, x: u16, y: u16) -> io::Result<()> {
        self.cursor = (x, y);
        self.ops.push(Op::Move(x, y));
        Ok(())
    }

    fn set_text_color(&mut self, attr: TextAttr) -> io::Result<()> {
        self.attr = attr;
        self.ops.push(Op::Color(attr));
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure"));
        }
        for &b in bytes {
            let (x, y) = self.cursor;
            self.screen.fill(
                i32::from(x),
                i32::from(y),
                Cell::new(b, self.attr.fg(), self.attr.bg()),
            );
            self.cursor.0 = x.saturating_add(1);
        }
        self.ops.push(Op::Write(bytes.to_vec()));
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> io::Result<()> {
        self.ops.push(Op::Title(title.to_owned()));
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.ops.push(Op::Flush);
        Ok(())
    }
}

impl InputSource for MockHost {
    fn poll_events(&mut self) -> Vec<RawEvent> {
        self.pending_events.pop_front().unwrap_or_default()
    }
}

impl PointerControl for MockHost {
    fn pointer_position(&self) -> Option<(i32, i32)> {
        self.pointer
    }

    fn set_pointer_position(&mut self, x: i32, y: i32) -> io::Result<()> {
        self.pointer = Some((x, y));
        self.ops.push(Op::Pointer(x, y));
        Ok(())
    }

    fn window_bounds(&self) -> Option<Rect> {
        self.bounds
    }
}

// ─── ManualClock ─────────────────────────────────────────────────────────────

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and move time
/// forward from inside a tick callback while the engine owns the other.
#[derive(Clone)]
pub struct ManualClock {
    base: Instant,
    elapsed: Rc<StdCell<Duration>>,
    sleeps: Rc<RefCell<Vec<Duration>>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            elapsed: Rc::new(StdCell::new(Duration::ZERO)),
            sleeps: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
    }

    /// Every duration passed to `sleep`, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed.get()
    }

    fn sleep(&mut self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.advance(duration);
    }
}
