// SPDX-License-Identifier: MIT
//
// Drawing primitives on the front grid.
//
// Everything here goes through `Grid::get_mut`, so every primitive clips
// silently: callers can hand it off-screen coordinates and only the visible
// part lands in the grid.
//
//   fill           one cell
//   draw_line      DDA walk over the on-grid part, both endpoints inclusive
//   fill_triangle  edge-function test over the bounding box
//   write_string   left-to-right blit on one row, stops at the right edge

use crate::cell::{Cell, Color};
use crate::grid::Grid;

/// Below this Chebyshev length a line is a single point.
const LINE_EPSILON: f64 = 0.01;

impl Grid {
    /// Overwrite the cell at `(x, y)`. No-op outside the grid.
    #[inline]
    pub fn fill(&mut self, x: i32, y: i32, cell: Cell) {
        if let Some(target) = self.get_mut(x, y) {
            *target = cell;
        }
    }

    /// Rasterize the segment `(x0, y0)–(x1, y1)` with a digital differential
    /// analyzer.
    ///
    /// Steps `ceil(max(|dx|, |dy|))` times along the segment, rounding each
    /// sample to the nearest cell. The result is 8-connected and contains both
    /// endpoints. It may touch the same cell twice near corners.
    ///
    /// Only the steps whose samples can land on the grid are walked, so the
    /// cost is bounded by the grid size however far the endpoints reach.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)] // rounded samples of i32 endpoints
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, cell: Cell) {
        let (fx0, fy0) = (f64::from(x0), f64::from(y0));
        let dx = f64::from(x1) - fx0;
        let dy = f64::from(y1) - fy0;
        let length = dx.abs().max(dy.abs());

        if length < LINE_EPSILON {
            self.fill(x0, y0, cell);
            return;
        }

        let steps = length.ceil();
        let (step_x, step_y) = (dx / steps, dy / steps);
        let Some((first, last)) = self.visible_steps((fx0, fy0), (dx, dy), steps) else {
            return;
        };

        for i in first..=last {
            let t = i as f64;
            let x = step_x.mul_add(t, fx0).round() as i32;
            let y = step_y.mul_add(t, fy0).round() as i32;
            self.fill(x, y, cell);
        }
    }

    /// Step indices of a line whose samples may round into the grid.
    ///
    /// Clips `origin + t * delta, t ∈ [0, 1]` against the box of points that
    /// round onto a cell, `[-0.5, cols - 0.5] × [-0.5, rows - 0.5]`
    /// (Liang–Barsky), then widens the range by one step on each side. Samples
    /// in the margin are still clipped by `fill`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped to [0, steps]
    fn visible_steps(&self, origin: (f64, f64), delta: (f64, f64), steps: f64) -> Option<(u64, u64)> {
        if self.is_empty() {
            return None;
        }

        let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
        let axes = [
            (origin.0, delta.0, f64::from(self.cols())),
            (origin.1, delta.1, f64::from(self.rows())),
        ];
        for (start, d, extent) in axes {
            let (lo, hi) = (-0.5, extent - 0.5);
            // Deltas are differences of integers: zero or at least one.
            if d.abs() < LINE_EPSILON {
                if start < lo || start > hi {
                    return None;
                }
                continue;
            }
            let (a, b) = ((lo - start) / d, (hi - start) / d);
            t0 = t0.max(a.min(b));
            t1 = t1.min(a.max(b));
        }
        if t0 > t1 {
            return None;
        }

        let first = (t0 * steps).floor() - 1.0;
        let last = (t1 * steps).ceil() + 1.0;
        Some((first.max(0.0) as u64, last.min(steps) as u64))
    }

    /// Fill the triangle with vertices `v0`, `v1`, `v2`.
    ///
    /// The vertices are expected in counter-clockwise order, in the sense that
    /// `(0,0), (10,0), (0,10)` is counter-clockwise. A point is filled when it
    /// lies on the non-negative side of all three directed edges, so edges are
    /// inclusive. Clockwise input fills nothing.
    pub fn fill_triangle(&mut self, v0: (i32, i32), v1: (i32, i32), v2: (i32, i32), cell: Cell) {
        if self.is_empty() {
            return;
        }

        let min_x = v0.0.min(v1.0).min(v2.0).max(0);
        let min_y = v0.1.min(v1.1).min(v2.1).max(0);
        let max_x = v0.0.max(v1.0).max(v2.0).min(i32::from(self.cols()) - 1);
        let max_y = v0.1.max(v1.1).max(v2.1).min(i32::from(self.rows()) - 1);

        for x in min_x..=max_x {
            for y in min_y..=max_y {
                let p = (x, y);
                if edge(v0, v1, p) >= 0 && edge(v1, v2, p) >= 0 && edge(v2, v0, p) >= 0 {
                    self.fill(x, y, cell);
                }
            }
        }
    }

    /// Write `text` left to right starting at `(x, y)`, one cell per `char`.
    ///
    /// Each touched cell takes `fg` and `bg`. Its character is replaced only
    /// when the `char` fits in one byte and is printable; otherwise the old
    /// character stays. Writing stops at the right edge of the grid, with no
    /// wrapping. Cells left of column 0 are skipped.
    ///
    /// Returns the number of cells touched.
    pub fn write_string(&mut self, text: &str, x: i32, y: i32, fg: Color, bg: Color) -> usize {
        let cols = i32::from(self.cols());
        let mut touched = 0;

        for (i, ch) in text.chars().enumerate() {
            let Some(px) = i32::try_from(i).ok().and_then(|i| x.checked_add(i)) else {
                break;
            };
            if px >= cols {
                break;
            }
            let Some(cell) = self.get_mut(px, y) else {
                continue;
            };
            if let Ok(byte) = u8::try_from(u32::from(ch)) {
                cell.set_character(byte);
            }
            cell.set_fg(fg);
            cell.set_bg(bg);
            touched += 1;
        }

        touched
    }
}

/// Edge function of `p` against the directed edge `a → b`.
#[inline]
fn edge(a: (i32, i32), b: (i32, i32), p: (i32, i32)) -> i64 {
    let (ax, ay) = (i64::from(a.0), i64::from(a.1));
    let (bx, by) = (i64::from(b.0), i64::from(b.1));
    let (px, py) = (i64::from(p.0), i64::from(p.1));
    (bx - ax) * (py - ay) - (by - ay) * (px - ax)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
