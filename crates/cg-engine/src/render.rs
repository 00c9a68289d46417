// SPDX-License-Identifier: MIT
//
// Differential renderer.
//
// The renderer owns the back grid, a mirror of what the display currently
// shows. Each frame it walks the front grid in storage order (columns outer,
// rows inner), and for every cell that differs from the mirror it emits at
// most three display calls:
//
//   1. a cursor move, unless the cursor already sits there because the
//      previous write was the cell just to the left on the same row
//   2. a color switch, unless the attribute is already current
//   3. a one-byte write
//
// then commits the cell into the mirror. Unchanged cells cost one `u16`
// compare. After the pass the cursor goes back to the origin and the color
// back to the default, so nothing lingers if the program stops between frames.
//
// When the mirror no longer matches the display (first frame, resize, or an
// explicit `invalidate`), the next pass treats every cell as changed. That is
// tracked with a flag, so no cell value has to be reserved as a sentinel.

use std::collections::TryReserveError;
use std::io;

use tracing::trace;

use crate::cell::TextAttr;
use crate::grid::Grid;
use crate::host::Display;

// ─── RenderStats ─────────────────────────────────────────────────────────────

/// What one render pass emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Cells that differed from the back grid, one byte written each.
    pub cells_written: usize,
    /// Cursor moves issued while writing cells. The final return to the
    /// origin is not counted.
    pub cursor_moves: usize,
    /// Color switches issued while writing cells. The final reset is not
    /// counted.
    pub color_switches: usize,
}

// ─── Cursor tracking ─────────────────────────────────────────────────────────

/// What the renderer believes the display's cursor and color are.
#[derive(Debug, Clone, Copy, Default)]
struct Tracker {
    /// Cell most recently written this frame. The display cursor is one
    /// column to its right.
    last_written: Option<(u16, u16)>,
    attr: Option<TextAttr>,
}

impl Tracker {
    /// Whether a write at `(x, y)` needs an explicit cursor move first.
    #[inline]
    fn needs_move(&self, x: u16, y: u16) -> bool {
        match self.last_written {
            Some((lx, ly)) => ly != y || x == 0 || lx != x - 1,
            None => true,
        }
    }
}

// ─── Renderer ────────────────────────────────────────────────────────────────

/// Diffs the front grid against the last displayed frame.
///
/// ```
/// use cg_engine::cell::{Cell, Color, TextAttr};
/// use cg_engine::grid::Grid;
/// use cg_engine::host::Display;
/// use cg_engine::render::Renderer;
/// # use std::io;
/// # #[derive(Default)]
/// # struct Sink(usize);
/// # impl Display for Sink {
/// #     fn size(&mut self) -> io::Result<(u16, u16)> { Ok((2, 4)) }
/// #     fn set_cursor_visible(&mut self, _: bool) -> io::Result<()> { Ok(()) }
/// #     fn move_cursor(&mut self, _: u16, _: u16) -> io::Result<()> { Ok(()) }
/// #     fn set_text_color(&mut self, _: TextAttr) -> io::Result<()> { Ok(()) }
/// #     fn write_bytes(&mut self, b: &[u8]) -> io::Result<()> { self.0 += b.len(); Ok(()) }
/// #     fn set_title(&mut self, _: &str) -> io::Result<()> { Ok(()) }
/// # }
///
/// let mut display = Sink::default();
/// let mut renderer = Renderer::new();
/// let mut front = Grid::new(2, 4);
/// renderer.resize(2, 4)?;
///
/// // The first frame writes every cell.
/// assert_eq!(renderer.render(&front, &mut display)?.cells_written, 8);
///
/// // After that only changes are written.
/// front.fill(1, 1, Cell::new(b'@', Color::Yellow, Color::Black));
/// assert_eq!(renderer.render(&front, &mut display)?.cells_written, 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Default)]
pub struct Renderer {
    back: Grid,
    valid: bool,
    tracker: Tracker,
}

impl Renderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Match the back grid to `rows × cols`.
    ///
    /// A size change clears the back grid and invalidates it. Returns whether
    /// the size changed.
    pub fn resize(&mut self, rows: u16, cols: u16) -> Result<bool, TryReserveError> {
        if self.back.rows() == rows && self.back.cols() == cols {
            return Ok(false);
        }
        self.valid = false;
        self.back.resize_and_clear(rows, cols)?;
        Ok(true)
    }

    /// Forget what the display shows. The next pass rewrites every cell.
    pub fn invalidate(&mut self) {
        self.valid = false;
        self.tracker.attr = None;
    }

    /// Whether the back grid is known to match the display.
    #[inline]
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// What the display showed after the last pass.
    #[inline]
    #[must_use]
    pub const fn back(&self) -> &Grid {
        &self.back
    }

    /// Drop the back grid.
    pub fn release(&mut self) {
        self.back.release();
        self.invalidate();
    }

    /// Bring the display in line with `front`, then flush it.
    ///
    /// After this returns `Ok`, the back grid equals `front`.
    pub fn render(&mut self, front: &Grid, display: &mut impl Display) -> io::Result<RenderStats> {
        if self.back.rows() != front.rows() || self.back.cols() != front.cols() {
            self.back.copy_from(front);
            self.valid = false;
        }

        let rows = front.rows();
        let full = !self.valid;
        let mut stats = RenderStats::default();
        self.tracker.last_written = None;

        // Storage order is column-major, so `i` walks x outer, y inner.
        let back = self.back.cells_mut();
        for (i, (&cell, shown)) in front.cells().iter().zip(back.iter_mut()).enumerate() {
            if !full && cell == *shown {
                continue;
            }

            #[allow(clippy::cast_possible_truncation)] // i < rows * cols, both u16
            let (x, y) = ((i / usize::from(rows)) as u16, (i % usize::from(rows)) as u16);

            if self.tracker.needs_move(x, y) {
                display.move_cursor(x, y)?;
                stats.cursor_moves += 1;
            }
            let attr = cell.attr();
            if self.tracker.attr != Some(attr) {
                display.set_text_color(attr)?;
                self.tracker.attr = Some(attr);
                stats.color_switches += 1;
            }
            display.write_bytes(&[cell.character()])?;
            self.tracker.last_written = Some((x, y));
            *shown = cell;
            stats.cells_written += 1;
        }
        self.valid = true;

        display.move_cursor(0, 0)?;
        if self.tracker.attr != Some(TextAttr::DEFAULT) {
            display.set_text_color(TextAttr::DEFAULT)?;
            self.tracker.attr = Some(TextAttr::DEFAULT);
        }
        display.flush()?;

        trace!(
            written = stats.cells_written,
            moves = stats.cursor_moves,
            colors = stats.color_switches,
            "render pass"
        );
        Ok(stats)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Cell, Color};
    use crate::testing::{MockHost, Op};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn red(ch: u8) -> Cell {
        Cell::new(ch, Color::Red, Color::Black)
    }

    fn setup(rows: u16, cols: u16) -> (Renderer, MockHost, Grid) {
        let mut renderer = Renderer::new();
        renderer.resize(rows, cols).unwrap();
        (renderer, MockHost::new(rows, cols), Grid::new(rows, cols))
    }

    // ── First frame ──────────────────────────────────────────────────────

    #[test]
    fn first_frame_writes_every_cell() {
        let (mut renderer, mut host, front) = setup(3, 4);
        let stats = renderer.render(&front, &mut host).unwrap();
        assert_eq!(stats.cells_written, 12);
        assert_eq!(host.writes(), 12);
        assert_eq!(renderer.back(), &front);
    }

    #[test]
    fn first_frame_moves_once_per_cell_in_column_scan() {
        // Column-major scan never lands one column right of the last write,
        // except across column boundaries on a single-row grid.
        let (mut renderer, mut host, front) = setup(3, 4);
        let stats = renderer.render(&front, &mut host).unwrap();
        assert_eq!(stats.cursor_moves, 12);

        let (mut renderer, mut host, front) = setup(1, 5);
        let stats = renderer.render(&front, &mut host).unwrap();
        assert_eq!(stats.cursor_moves, 1);
    }

    // ── Steady state ─────────────────────────────────────────────────────

    #[test]
    fn unchanged_frame_writes_nothing() {
        let (mut renderer, mut host, front) = setup(3, 4);
        renderer.render(&front, &mut host).unwrap();
        host.ops.clear();

        let stats = renderer.render(&front, &mut host).unwrap();
        assert_eq!(stats, RenderStats::default());
        assert_eq!(host.ops, vec![Op::Move(0, 0), Op::Flush]);
    }

    #[test]
    fn single_change_is_move_color_write() {
        let (mut renderer, mut host, mut front) = setup(3, 4);
        renderer.render(&front, &mut host).unwrap();
        host.ops.clear();

        front.fill(2, 1, red(b'@'));
        renderer.render(&front, &mut host).unwrap();
        assert_eq!(
            host.ops,
            vec![
                Op::Move(2, 1),
                Op::Color(red(b'@').attr()),
                Op::Write(vec![b'@']),
                Op::Move(0, 0),
                Op::Color(TextAttr::DEFAULT),
                Op::Flush,
            ]
        );
    }

    #[test]
    fn adjacent_cells_on_a_row_skip_the_move() {
        let (mut renderer, mut host, mut front) = setup(1, 6);
        renderer.render(&front, &mut host).unwrap();
        host.ops.clear();

        front.write_string("abc", 2, 0, Color::Red, Color::Black);
        let stats = renderer.render(&front, &mut host).unwrap();
        assert_eq!(stats.cells_written, 3);
        assert_eq!(stats.cursor_moves, 1);
        assert_eq!(stats.color_switches, 1);
    }

    #[test]
    fn color_switch_only_on_attribute_change() {
        let (mut renderer, mut host, mut front) = setup(1, 4);
        renderer.render(&front, &mut host).unwrap();

        front.fill(0, 0, red(b'a'));
        front.fill(1, 0, red(b'b'));
        front.fill(2, 0, Cell::new(b'c', Color::Blue, Color::Black));
        front.fill(3, 0, Cell::new(b'd', Color::Red, Color::White));
        let stats = renderer.render(&front, &mut host).unwrap();
        assert_eq!(stats.color_switches, 3);
    }

    #[test]
    fn frame_ends_at_origin_with_default_color() {
        let (mut renderer, mut host, mut front) = setup(4, 4);
        front.fill(3, 3, red(b'z'));
        renderer.render(&front, &mut host).unwrap();
        let tail: Vec<_> = host.ops.iter().rev().take(3).cloned().collect();
        assert_eq!(tail, vec![Op::Flush, Op::Color(TextAttr::DEFAULT), Op::Move(0, 0)]);
        assert_eq!(host.current_attr(), TextAttr::DEFAULT);
    }

    // ── Invalidation ─────────────────────────────────────────────────────

    #[test]
    fn invalidate_forces_full_redraw() {
        let (mut renderer, mut host, front) = setup(2, 3);
        renderer.render(&front, &mut host).unwrap();
        renderer.invalidate();
        assert!(!renderer.is_valid());
        assert_eq!(renderer.render(&front, &mut host).unwrap().cells_written, 6);
        assert!(renderer.is_valid());
    }

    #[test]
    fn resize_invalidates_only_on_change() {
        let (mut renderer, mut host, front) = setup(2, 3);
        renderer.render(&front, &mut host).unwrap();
        assert!(!renderer.resize(2, 3).unwrap());
        assert!(renderer.is_valid());
        assert!(renderer.resize(3, 2).unwrap());
        assert!(!renderer.is_valid());
    }

    #[test]
    fn mismatched_front_is_drawn_in_full() {
        let (mut renderer, mut host, _) = setup(2, 2);
        let front = Grid::new(3, 3);
        assert_eq!(renderer.render(&front, &mut host).unwrap().cells_written, 9);
        assert_eq!(renderer.back(), &front);
    }

    // ── Errors ───────────────────────────────────────────────────────────

    #[test]
    fn write_error_propagates() {
        let (mut renderer, mut host, front) = setup(2, 2);
        host.fail_writes = true;
        let err = renderer.render(&front, &mut host).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    // ── Convergence ──────────────────────────────────────────────────────

    fn arb_grid(rows: u16, cols: u16) -> impl Strategy<Value = Grid> {
        let len = usize::from(rows) * usize::from(cols);
        // Small alphabet so that equal cells are common.
        proptest::collection::vec((b'a'..=b'c', 0u8..3, 0u8..2), len).prop_map(move |cells| {
            let mut grid = Grid::new(rows, cols);
            for (slot, (ch, fg, bg)) in grid.cells_mut().iter_mut().zip(cells) {
                *slot = Cell::pack(ch, fg, bg);
            }
            grid
        })
    }

    proptest! {
        #[test]
        fn render_converges_and_writes_exactly_the_diff(
            (first, second) in (1u16..8, 1u16..8)
                .prop_flat_map(|(r, c)| (arb_grid(r, c), arb_grid(r, c)))
        ) {
            let mut renderer = Renderer::new();
            let mut host = MockHost::new(first.rows(), first.cols());
            renderer.resize(first.rows(), first.cols()).unwrap();
            renderer.render(&first, &mut host).unwrap();

            let differing = first
                .cells()
                .iter()
                .zip(second.cells())
                .filter(|(a, b)| a != b)
                .count();

            let stats = renderer.render(&second, &mut host).unwrap();
            prop_assert_eq!(stats.cells_written, differing);
            prop_assert_eq!(renderer.back(), &second);
            // The simulated screen shows exactly the front grid.
            prop_assert_eq!(&host.screen, &second);
        }
    }
}
