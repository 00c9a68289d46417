// SPDX-License-Identifier: MIT
//
// Grid: a rows × cols matrix of cells.
//
// The engine keeps two of these: the front grid that the tick callback paints
// into and the back grid that mirrors what the display currently shows. The
// renderer diffs one against the other.
//
// Layout:
//
//   Flat `Vec<Cell>` in column-major order: `index = rows * x + y`. A column
//   is contiguous in memory, and the renderer scans columns outer, rows inner,
//   so its walk over the grid is a linear scan.
//
// Allocation:
//
//   The display can change size between any two ticks, so the engine calls
//   `resize_and_clear` every tick. It reuses the existing allocation when the
//   dimensions are unchanged and reserves fallibly when they grow, so an
//   allocation failure surfaces as an error instead of an abort.

use std::collections::TryReserveError;

use crate::cell::Cell;

/// A column-major matrix of [`Cell`]s.
///
/// Coordinates are `(x, y)` = `(column, row)`, signed so that callers can
/// pass off-screen positions freely; every accessor clips.
///
/// # Examples
///
/// ```
/// use cg_engine::cell::{Cell, Color};
/// use cg_engine::grid::Grid;
///
/// let mut grid = Grid::new(5, 10);
/// assert_eq!(grid.rows(), 5);
/// assert_eq!(grid.cols(), 10);
///
/// *grid.get_mut(3, 2).unwrap() = Cell::new(b'#', Color::Red, Color::Black);
/// assert_eq!(grid.get(3, 2).unwrap().character(), b'#');
///
/// assert!(grid.get(10, 0).is_none());
/// assert!(grid.get(-1, 0).is_none());
/// ```
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Grid {
    rows: u16,
    cols: u16,
    cells: Vec<Cell>,
}

impl Grid {
    // ─── Construction ────────────────────────────────────────────────────

    /// A grid filled with [`Cell::EMPTY`].
    #[must_use]
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            rows,
            cols,
            cells: vec![Cell::EMPTY; area(rows, cols)],
        }
    }

    /// Resize to `rows × cols` and reset every cell to [`Cell::EMPTY`].
    ///
    /// The existing allocation is reused when it is large enough. On failure
    /// the grid is left empty (0 × 0), never half-sized.
    pub fn resize_and_clear(&mut self, rows: u16, cols: u16) -> Result<(), TryReserveError> {
        let len = area(rows, cols);
        if len != self.cells.len() {
            self.cells.clear();
            if let Err(err) = self.reserve(len) {
                self.rows = 0;
                self.cols = 0;
                return Err(err);
            }
            self.cells.resize(len, Cell::EMPTY);
        } else {
            self.cells.fill(Cell::EMPTY);
        }
        self.rows = rows;
        self.cols = cols;
        Ok(())
    }

    fn reserve(&mut self, len: usize) -> Result<(), TryReserveError> {
        #[cfg(test)]
        if cell_limit::exceeded(len) {
            // Over `isize::MAX` bytes, so this always fails.
            return Vec::<Cell>::new().try_reserve_exact(usize::MAX);
        }
        self.cells.try_reserve_exact(len)
    }

    /// Drop the allocation and become 0 × 0.
    pub fn release(&mut self) {
        self.cells = Vec::new();
        self.rows = 0;
        self.cols = 0;
    }

    // ─── Dimensions ──────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn rows(&self) -> u16 {
        self.rows
    }

    #[inline]
    #[must_use]
    pub const fn cols(&self) -> u16 {
        self.cols
    }

    /// Total number of cells.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether `(x, y)` lies in `[0, cols) × [0, rows)`.
    #[inline]
    #[must_use]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.cols as i32 && y < self.rows as i32
    }

    // ─── Access ──────────────────────────────────────────────────────────

    /// Flat index of `(x, y)`, or `None` when out of bounds.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_sign_loss)] // both coordinates checked non-negative
    pub const fn index(&self, x: i32, y: i32) -> Option<usize> {
        if self.contains(x, y) {
            Some(self.rows as usize * x as usize + y as usize)
        } else {
            None
        }
    }

    /// The cell at `(x, y)`, or `None` when out of bounds.
    #[inline]
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Option<Cell> {
        self.index(x, y).map(|i| self.cells[i])
    }

    /// Mutable access to the cell at `(x, y)`, or `None` when out of bounds.
    #[inline]
    pub fn get_mut(&mut self, x: i32, y: i32) -> Option<&mut Cell> {
        let i = self.index(x, y)?;
        self.cells.get_mut(i)
    }

    /// Reset every cell to [`Cell::EMPTY`] without changing dimensions.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::EMPTY);
    }

    /// All cells in storage (column-major) order.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[inline]
    pub(crate) fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// One column, top to bottom. Empty slice when `x` is out of bounds.
    #[must_use]
    pub fn column(&self, x: u16) -> &[Cell] {
        if x >= self.cols {
            return &[];
        }
        let start = usize::from(self.rows) * usize::from(x);
        &self.cells[start..start + usize::from(self.rows)]
    }

    /// One row as a `String`, for tests and debugging.
    #[must_use]
    pub fn row_text(&self, y: u16) -> String {
        (0..self.cols)
            .filter_map(|x| self.get(i32::from(x), i32::from(y)))
            .map(|c| char::from(c.character()))
            .collect()
    }

    /// Copy `other` into `self`, matching its dimensions.
    pub(crate) fn copy_from(&mut self, other: &Self) {
        self.rows = other.rows;
        self.cols = other.cols;
        self.cells.clone_from(&other.cells);
    }
}

impl std::fmt::Debug for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Grid {}x{} (rows x cols)", self.rows, self.cols)?;
        for y in 0..self.rows {
            writeln!(f, "  |{}|", self.row_text(y))?;
        }
        Ok(())
    }
}

#[inline]
const fn area(rows: u16, cols: u16) -> usize {
    rows as usize * cols as usize
}


// ─── Tests ───────────────────────────────────────────────────────────────────
