// SPDX-License-Identifier: MIT
//
// Output buffering.
//
// Everything the host emits during a frame (cursor moves, SGR switches, cell
// bytes, the title) goes into an `OutputBuffer`. The engine calls `flush` once
// per frame, and that becomes a single `write_all` on the terminal.
//
// Cell characters are single bytes. Bytes below 0x80 go out as-is. Bytes from
// 0x80 up are read as Latin-1 and encoded to UTF-8, since that is what a
// modern terminal expects. Control bytes would be interpreted by the
// terminal and desynchronize the cursor, so they are written as a space.

use std::io::{self, Write};

const DEFAULT_CAPACITY: usize = 16_384;

/// A byte buffer that accumulates one frame of terminal output.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

impl OutputBuffer {
    /// An empty buffer with 16 KB reserved.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes (for testing and debugging).
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append one cell character, occupying exactly one terminal column.
    pub fn push_cell_byte(&mut self, byte: u8) {
        match byte {
            0x00..=0x1F | 0x7F..=0x9F => self.buf.push(b' '),
            0x20..=0x7E => self.buf.push(byte),
            _ => {
                let mut enc = [0u8; 2];
                let s = char::from(byte).encode_utf8(&mut enc);
                self.buf.extend_from_slice(s.as_bytes());
            }
        }
    }

    /// Drop the contents, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write everything to `w`, flush it, and clear the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails. The buffer is kept in that
    /// case.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if !self.buf.is_empty() {
            w.write_all(&self.buf)?;
            w.flush()?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    /// No-op. The real flush is [`OutputBuffer::flush_to`].
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
