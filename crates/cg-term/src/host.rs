// SPDX-License-Identifier: MIT
//
// `AnsiHost`: the engine's display, input source and pointer on a terminal.
//
// Output: every display call appends escape sequences or cell bytes to one
// `OutputBuffer`, and `flush` hands the whole frame to the writer in a single
// write, wrapped in synchronized-output markers when a real terminal is
// attached.
//
// Input: the stdin reader thread delivers bytes, the parser turns them into
// key and mouse records, and the decoder below folds those into the engine's
// raw events. It keeps the held-button set (SGR mouse reports one button per
// record), the key latch, and a virtual pointer.
//
// The terminal cannot warp the real mouse. Grab mode instead reads and
// re-centers a virtual pointer that moves by the deltas of real motion, in
// cell units.

use std::io::{self, Write};
use std::num::NonZeroI32;

use cg_engine::cell::TextAttr;
use cg_engine::host::{Display, InputSource, PointerControl, RawEvent, Rect};
use cg_engine::input::MouseButtons;
use tracing::debug;

use crate::ansi;
use crate::latch::KeyLatch;
use crate::output::OutputBuffer;
use crate::parser::{Input, KeyKind, MouseAction, Parser};
use crate::reader::StdinReader;
use crate::terminal::{self, TermOptions, Terminal};

/// Size used when the terminal cannot be queried.
const FALLBACK_SIZE: (u16, u16) = (24, 80);

// ─── Decoder ─────────────────────────────────────────────────────────────────

/// Parsed records to engine events.
#[derive(Debug)]
struct Decoder {
    parser: Parser,
    latch: KeyLatch,
    buttons: MouseButtons,
    /// Last real pointer cell.
    last_mouse: Option<(i32, i32)>,
    /// Virtual pointer used by grab mode.
    pointer: Option<(i32, i32)>,
}

impl Decoder {
    fn new(release_hold: u32) -> Self {
        Self {
            parser: Parser::new(),
            latch: KeyLatch::new(release_hold),
            buttons: MouseButtons::empty(),
            last_mouse: None,
            pointer: None,
        }
    }

    /// Decode one batch of bytes. An empty batch resolves a pending partial
    /// sequence instead.
    fn decode(&mut self, bytes: &[u8]) -> Vec<RawEvent> {
        let inputs = if bytes.is_empty() {
            if self.parser.has_pending() { self.parser.flush() } else { Vec::new() }
        } else {
            self.parser.advance(bytes)
        };

        let mut events = Vec::with_capacity(inputs.len());
        for input in inputs {
            self.apply(input, &mut events);
        }
        self.latch.end_poll(&mut events);
        events
    }

    fn apply(&mut self, input: Input, out: &mut Vec<RawEvent>) {
        match input {
            Input::Key {
                code,
                kind: KeyKind::Press | KeyKind::Repeat,
            } => {
                self.latch.press(code);
                out.push(RawEvent::Key { code, down: true });
            }
            Input::Key {
                code,
                kind: KeyKind::Release,
            } => {
                self.latch.disable();
                out.push(RawEvent::Key { code, down: false });
            }
            Input::Mouse { x, y, action } => {
                self.track_pointer(x, y);
                let mut wheel = None;
                match action {
                    MouseAction::Press(b) => self.buttons.insert(b),
                    MouseAction::Release(b) => self.buttons.remove(b),
                    MouseAction::Move => {}
                    MouseAction::Wheel(delta) => wheel = NonZeroI32::new(delta),
                }
                out.push(RawEvent::Mouse {
                    x,
                    y,
                    buttons: self.buttons,
                    wheel,
                });
            }
            Input::KeyboardFlags(flags) => {
                debug!(flags, "keyboard protocol flags");
                if flags & u32::from(ansi::KittyFlags::REPORT_EVENT_TYPES.bits()) != 0 {
                    self.latch.disable();
                }
            }
        }
    }

    /// Move the virtual pointer by the real pointer's motion. The first
    /// sighting places it absolutely.
    fn track_pointer(&mut self, x: i32, y: i32) {
        self.pointer = match (self.pointer, self.last_mouse) {
            (Some((px, py)), Some((lx, ly))) => Some((px + x - lx, py + y - ly)),
            _ => Some((x, y)),
        };
        self.last_mouse = Some((x, y));
    }
}

// ─── Host ────────────────────────────────────────────────────────────────────

/// Terminal implementation of the engine's host traits.
///
/// [`open`](Self::open) takes over the real terminal. [`headless`](Self::headless)
/// renders into any writer at a fixed size and takes input only from
/// [`feed`](Self::feed), which is how the tests drive it.
pub struct AnsiHost<W: Write = io::Stdout> {
    reader: Option<StdinReader>,
    terminal: Option<Terminal>,
    writer: W,
    out: OutputBuffer,
    decoder: Decoder,
    /// Bytes queued by `feed`, decoded on the next poll.
    pending: Vec<u8>,
    size: (u16, u16),
}

impl AnsiHost<io::Stdout> {
    /// Enter game mode on the controlling terminal and start reading stdin.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal modes cannot be set or the reader
    /// thread cannot be spawned.
    pub fn open(options: TermOptions) -> io::Result<Self> {
        let mut term = Terminal::new(options);
        term.enter()?;
        let reader = StdinReader::spawn()?;
        let size = terminal::get_size().unwrap_or(FALLBACK_SIZE);
        debug!(rows = size.0, cols = size.1, "terminal host opened");

        Ok(Self {
            reader: Some(reader),
            terminal: Some(term),
            writer: io::stdout(),
            out: OutputBuffer::new(),
            decoder: Decoder::new(options.release_hold),
            pending: Vec::new(),
            size,
        })
    }
}

impl<W: Write> AnsiHost<W> {
    /// A host with no terminal behind it: output goes to `writer`, the size
    /// never changes, and input comes from [`feed`](Self::feed).
    pub fn headless(writer: W, rows: u16, cols: u16) -> Self {
        Self {
            reader: None,
            terminal: None,
            writer,
            out: OutputBuffer::new(),
            decoder: Decoder::new(TermOptions::default().release_hold),
            pending: Vec::new(),
            size: (rows, cols),
        }
    }

    /// Queue raw input bytes for the next poll.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    #[inline]
    #[must_use]
    pub const fn writer(&self) -> &W {
        &self.writer
    }

    #[inline]
    pub const fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Whether synthesized key releases are still in use.
    #[inline]
    #[must_use]
    pub const fn latches_keys(&self) -> bool {
        self.decoder.latch.is_active()
    }

    /// Stop the reader and restore the terminal, reporting failures that
    /// `Drop` would swallow.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing or restoring the terminal fails.
    pub fn close(mut self) -> io::Result<()> {
        if let Some(mut reader) = self.reader.take() {
            reader.stop();
        }
        self.flush()?;
        match self.terminal.take() {
            Some(mut term) => term.leave(),
            None => Ok(()),
        }
    }

    /// Take the writer back. Any terminal is restored first.
    pub fn into_writer(self) -> W {
        let Self { writer, .. } = self;
        writer
    }

    /// Start a synchronized frame on the first byte of output.
    fn frame(&mut self) -> io::Result<&mut OutputBuffer> {
        if self.terminal.is_some() && self.out.is_empty() {
            ansi::begin_sync(&mut self.out)?;
        }
        Ok(&mut self.out)
    }
}

impl<W: Write> Display for AnsiHost<W> {
    fn size(&mut self) -> io::Result<(u16, u16)> {
        if self.terminal.is_none() {
            return Ok(self.size);
        }
        let Some(current) = terminal::get_size() else {
            return Ok(self.size);
        };
        if current != self.size {
            debug!(from = ?self.size, to = ?current, "terminal resized");
            self.size = current;
            // Reflowed text from the old size would survive the engine's
            // repaint in cells it leaves empty.
            ansi::clear_screen(self.frame()?)?;
        }
        Ok(self.size)
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        let out = self.frame()?;
        if visible { ansi::cursor_show(out) } else { ansi::cursor_hide(out) }
    }

    fn move_cursor(&mut self, x: u16, y: u16) -> io::Result<()> {
        ansi::cursor_to(self.frame()?, x, y)
    }

    fn set_text_color(&mut self, attr: TextAttr) -> io::Result<()> {
        ansi::text_attr(self.frame()?, attr)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        let out = self.frame()?;
        for &b in bytes {
            out.push_cell_byte(b);
        }
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> io::Result<()> {
        ansi::set_title(self.frame()?, title)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.out.is_empty() {
            return Ok(());
        }
        if self.terminal.is_some() {
            ansi::end_sync(&mut self.out)?;
        }
        self.out.flush_to(&mut self.writer)
    }
}

impl<W: Write> InputSource for AnsiHost<W> {
    fn poll_events(&mut self) -> Vec<RawEvent> {
        let alive = self
            .reader
            .as_ref()
            .is_none_or(|reader| reader.drain_into(&mut self.pending));
        if !alive {
            debug!("stdin closed");
            self.reader = None;
        }

        let bytes = std::mem::take(&mut self.pending);
        self.decoder.decode(&bytes)
    }
}

impl<W: Write> PointerControl for AnsiHost<W> {
    fn pointer_position(&self) -> Option<(i32, i32)> {
        self.decoder.pointer
    }

    fn set_pointer_position(&mut self, x: i32, y: i32) -> io::Result<()> {
        self.decoder.pointer = Some((x, y));
        Ok(())
    }

    fn window_bounds(&self) -> Option<Rect> {
        let (rows, cols) = self.size;
        Some(Rect::new(0, 0, i32::from(cols), i32::from(rows)))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
