// SPDX-License-Identifier: MIT
//
// Engine: the fixed-timestep loop.
//
// One tick, in order:
//
//   1. Read the clock and query the display size.
//   2. Resize both grids to the display, clearing the front grid. A size
//      change hides the cursor again and invalidates the back grid.
//   3. Fold pending input into the snapshot (grab delta first, then events).
//   4. Call the tick callback with the context.
//   5. Render the front grid, then apply the title if it changed.
//   6. If the callback asked to exit, stop here.
//   7. Sleep off what is left of the timestep and clamp delta up to it.
//   8. Add delta to the one-second FPS window.
//
// The loop is single-threaded and owns everything it touches. The callback
// gets `&mut Context` for the duration of one call and nothing else, so it
// cannot hold on to grid cells across a reallocation.
//
// Whatever way the loop ends (exit request, allocation failure, host error),
// both grids are released and the display color is reset.

use std::io;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cell::{Cell, Color, TextAttr};
use crate::clock::{Clock, SystemClock};
use crate::error::RunError;
use crate::grid::Grid;
use crate::host::Host;
use crate::input::{InputState, MouseButtons, Scroll};
use crate::render::Renderer;
use crate::scancode::Scancode;

const FPS_WINDOW: Duration = Duration::from_secs(1);

// ─── Configuration ───────────────────────────────────────────────────────────

/// Settings fixed for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Target frame rate. Must be at least 1.
    pub max_fps: u32,
    /// Initial display title.
    pub title: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_fps: 30,
            title: String::from("cellgine"),
        }
    }
}

/// Lifecycle of an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    NotStarted,
    Running,
    /// Terminal. A stopped engine does not run again.
    Stopped,
}

// ─── Context ─────────────────────────────────────────────────────────────────

/// Everything the tick callback can see and change.
///
/// The front grid is only reachable through bounds-checked accessors and the
/// drawing methods. It is cleared to [`Cell::EMPTY`] before every tick.
#[derive(Debug)]
pub struct Context {
    front: Grid,
    input: InputState,
    timestep: Duration,
    delta: Duration,
    fps: u32,
    ticks: u64,
    exit: bool,
    grab: bool,
    title: String,
}

impl Context {
    pub(crate) fn new(timestep: Duration, title: String) -> Self {
        Self {
            front: Grid::default(),
            input: InputState::new(),
            timestep,
            // Nothing has been measured yet; report the nominal budget.
            delta: timestep,
            fps: 0,
            ticks: 0,
            exit: false,
            grab: false,
            title,
        }
    }

    // ─── Dimensions ──────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn rows(&self) -> u16 {
        self.front.rows()
    }

    #[inline]
    #[must_use]
    pub const fn cols(&self) -> u16 {
        self.front.cols()
    }

    /// Read-only view of the front grid.
    #[inline]
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.front
    }

    // ─── Cells ───────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn cell(&self, x: i32, y: i32) -> Option<Cell> {
        self.front.get(x, y)
    }

    /// Mutable access to one cell, `None` outside the grid.
    #[inline]
    pub fn cell_mut(&mut self, x: i32, y: i32) -> Option<&mut Cell> {
        self.front.get_mut(x, y)
    }

    /// Same as [`fill`](Self::fill).
    #[inline]
    pub fn set_cell(&mut self, x: i32, y: i32, cell: Cell) {
        self.front.fill(x, y, cell);
    }

    /// Replace one cell's character. Control characters are ignored.
    pub fn set_character(&mut self, x: i32, y: i32, character: u8) {
        if let Some(cell) = self.front.get_mut(x, y) {
            cell.set_character(character);
        }
    }

    /// Replace one cell's foreground. Indices outside `[0, 16)` are ignored.
    pub fn set_fg(&mut self, x: i32, y: i32, fg: impl Into<u8>) {
        if let Some(cell) = self.front.get_mut(x, y) {
            cell.set_fg(fg);
        }
    }

    /// Replace one cell's background. Indices outside `[0, 16)` are ignored.
    pub fn set_bg(&mut self, x: i32, y: i32, bg: impl Into<u8>) {
        if let Some(cell) = self.front.get_mut(x, y) {
            cell.set_bg(bg);
        }
    }

    // ─── Drawing ─────────────────────────────────────────────────────────

    #[inline]
    pub fn fill(&mut self, x: i32, y: i32, cell: Cell) {
        self.front.fill(x, y, cell);
    }

    #[inline]
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, cell: Cell) {
        self.front.draw_line(x0, y0, x1, y1, cell);
    }

    #[inline]
    pub fn fill_triangle(&mut self, v0: (i32, i32), v1: (i32, i32), v2: (i32, i32), cell: Cell) {
        self.front.fill_triangle(v0, v1, v2, cell);
    }

    #[inline]
    pub fn write_string(&mut self, text: &str, x: i32, y: i32, fg: Color, bg: Color) -> usize {
        self.front.write_string(text, x, y, fg, bg)
    }

    /// Reset the front grid to [`Cell::EMPTY`].
    pub fn clear(&mut self) {
        self.front.clear();
    }

    // ─── Input ───────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn input(&self) -> &InputState {
        &self.input
    }

    #[inline]
    #[must_use]
    pub const fn is_key_down(&self, code: Scancode) -> bool {
        self.input.is_key_down(code)
    }

    #[inline]
    #[must_use]
    pub const fn is_key_just_pressed(&self, code: Scancode) -> bool {
        self.input.is_key_just_pressed(code)
    }

    #[inline]
    #[must_use]
    pub const fn is_key_just_released(&self, code: Scancode) -> bool {
        self.input.is_key_just_released(code)
    }

    #[inline]
    #[must_use]
    pub const fn is_button_down(&self, buttons: MouseButtons) -> bool {
        self.input.is_button_down(buttons)
    }

    #[inline]
    #[must_use]
    pub const fn mouse_x(&self) -> i32 {
        self.input.mouse_x()
    }

    #[inline]
    #[must_use]
    pub const fn mouse_y(&self) -> i32 {
        self.input.mouse_y()
    }

    #[inline]
    #[must_use]
    pub const fn mouse_dx(&self) -> i32 {
        self.input.mouse_dx()
    }

    #[inline]
    #[must_use]
    pub const fn mouse_dy(&self) -> i32 {
        self.input.mouse_dy()
    }

    #[inline]
    #[must_use]
    pub const fn scroll(&self) -> Scroll {
        self.input.scroll()
    }

    // ─── Timing ──────────────────────────────────────────────────────────

    /// Duration of the previous tick in seconds, never below the timestep.
    #[inline]
    #[must_use]
    pub fn delta(&self) -> f64 {
        self.delta.as_secs_f64()
    }

    #[inline]
    #[must_use]
    pub const fn delta_duration(&self) -> Duration {
        self.delta
    }

    /// The fixed per-tick budget, `1 / max_fps`, in seconds.
    #[inline]
    #[must_use]
    pub fn timestep(&self) -> f64 {
        self.timestep.as_secs_f64()
    }

    #[inline]
    #[must_use]
    pub const fn timestep_duration(&self) -> Duration {
        self.timestep
    }

    /// Ticks completed in the last full one-second window. Zero until the
    /// first window closes.
    #[inline]
    #[must_use]
    pub const fn fps(&self) -> u32 {
        self.fps
    }

    /// Ticks completed so far. The first callback sees 0.
    #[inline]
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    // ─── Control ─────────────────────────────────────────────────────────

    /// Stop the loop after this tick's frame is rendered.
    #[inline]
    pub const fn request_exit(&mut self) {
        self.exit = true;
    }

    #[inline]
    pub const fn cancel_exit(&mut self) {
        self.exit = false;
    }

    #[inline]
    #[must_use]
    pub const fn exit_requested(&self) -> bool {
        self.exit
    }

    /// Turn grab mode on or off, effective from the next tick.
    #[inline]
    pub const fn set_grab(&mut self, grab: bool) {
        self.grab = grab;
    }

    #[inline]
    #[must_use]
    pub const fn is_grabbed(&self) -> bool {
        self.grab
    }

    /// Change the display title. Applied after this tick's render.
    pub fn set_title(&mut self, title: &str) {
        if self.title != title {
            title.clone_into(&mut self.title);
        }
    }

    #[inline]
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

type TickFn = Box<dyn FnMut(&mut Context)>;

/// The run loop, generic over its host and clock.
///
/// ```no_run
/// # use cg_engine::{Engine, EngineConfig, Host, Color};
/// # fn demo<H: Host>(host: H) -> Result<(), cg_engine::RunError> {
/// let mut engine = Engine::new(EngineConfig::default())
///     .with_host(host)
///     .with_tick(|ctx| {
///         ctx.write_string("hello", 0, 0, Color::LightGreen, Color::Black);
///         if ctx.ticks() == 100 {
///             ctx.request_exit();
///         }
///     });
/// engine.run()
/// # }
/// ```
pub struct Engine<H, C = SystemClock> {
    config: EngineConfig,
    host: Option<H>,
    tick: Option<TickFn>,
    clock: C,
    renderer: Renderer,
    state: LoopState,
}

impl<H: Host> Engine<H, SystemClock> {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<H: Host, C: Clock> Engine<H, C> {
    #[must_use]
    pub fn with_clock(config: EngineConfig, clock: C) -> Self {
        Self {
            config,
            host: None,
            tick: None,
            clock,
            renderer: Renderer::new(),
            state: LoopState::NotStarted,
        }
    }

    /// Attach the display and input host.
    #[must_use]
    pub fn with_host(mut self, host: H) -> Self {
        self.host = Some(host);
        self
    }

    /// Register the per-tick callback.
    #[must_use]
    pub fn with_tick(mut self, tick: impl FnMut(&mut Context) + 'static) -> Self {
        self.tick = Some(Box::new(tick));
        self
    }

    #[inline]
    #[must_use]
    pub const fn state(&self) -> LoopState {
        self.state
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub const fn host(&self) -> Option<&H> {
        self.host.as_ref()
    }

    #[inline]
    pub const fn host_mut(&mut self) -> Option<&mut H> {
        self.host.as_mut()
    }

    /// Take the host back, e.g. to restore the terminal.
    #[must_use]
    pub fn into_host(self) -> Option<H> {
        self.host
    }

    /// Run until the tick callback requests exit.
    ///
    /// `Ok(())` means the callback asked to stop. Configuration is checked
    /// before the host is touched. On a stopped engine this returns `Ok(())`
    /// immediately.
    ///
    /// # Errors
    ///
    /// [`RunError::NotInitialized`], [`RunError::MissingCallback`] and
    /// [`RunError::InvalidFrameRate`] before the first tick.
    /// [`RunError::Allocation`] if the grids cannot be sized to the display
    /// and [`RunError::Io`] if the host fails, at any tick.
    pub fn run(&mut self) -> Result<(), RunError> {
        if self.state == LoopState::Stopped {
            debug!("run called on a stopped engine");
            return Ok(());
        }
        let Some(host) = self.host.as_mut() else {
            return Err(RunError::NotInitialized);
        };
        let Some(tick) = self.tick.as_mut() else {
            return Err(RunError::MissingCallback);
        };
        if self.config.max_fps == 0 {
            return Err(RunError::InvalidFrameRate(self.config.max_fps));
        }

        let timestep = FPS_WINDOW / self.config.max_fps;
        let mut ctx = Context::new(timestep, self.config.title.clone());
        debug!(max_fps = self.config.max_fps, ?timestep, "loop start");
        self.state = LoopState::Running;

        let mut ticker = Ticker {
            host,
            tick,
            clock: &mut self.clock,
            renderer: &mut self.renderer,
            last_size: None,
            applied_title: None,
            fps_window: Duration::ZERO,
            fps_frames: 0,
        };
        let result = ticker.run(&mut ctx);
        let cleanup = ticker.cleanup(&mut ctx);

        self.state = LoopState::Stopped;
        match &result {
            Ok(()) => debug!(ticks = ctx.ticks, "loop stopped: exit requested"),
            Err(err) => debug!(ticks = ctx.ticks, %err, "loop stopped"),
        }
        drop(ctx);
        result?;
        cleanup.map_err(RunError::from)
    }
}

// ─── Ticker ──────────────────────────────────────────────────────────────────

/// Borrowed loop state for one run.
struct Ticker<'a, H, C> {
    host: &'a mut H,
    tick: &'a mut TickFn,
    clock: &'a mut C,
    renderer: &'a mut Renderer,
    last_size: Option<(u16, u16)>,
    applied_title: Option<String>,
    fps_window: Duration,
    fps_frames: u32,
}

impl<H: Host, C: Clock> Ticker<'_, H, C> {
    fn run(&mut self, ctx: &mut Context) -> Result<(), RunError> {
        loop {
            if self.step(ctx)? {
                return Ok(());
            }
        }
    }

    /// One tick. Returns `true` when the callback requested exit.
    fn step(&mut self, ctx: &mut Context) -> Result<bool, RunError> {
        let start = self.clock.now();

        // ── Buffers ──
        let (rows, cols) = self.host.size()?;
        let resized = self.last_size != Some((rows, cols));
        self.resize(ctx, rows, cols)?;
        if resized {
            debug!(from = ?self.last_size, rows, cols, "display resized");
            // Resizing re-enables the cursor on some consoles.
            self.host.set_cursor_visible(false)?;
            self.renderer.invalidate();
            self.last_size = Some((rows, cols));
        }

        // ── Input ──
        let grab = ctx.grab;
        ctx.input.begin_tick();
        ctx.input.update_grab(grab, &mut *self.host)?;
        for event in self.host.poll_events() {
            ctx.input.apply(event);
        }

        // ── Callback + render ──
        (self.tick)(ctx);
        self.renderer.render(&ctx.front, &mut *self.host)?;
        if self.applied_title.as_deref() != Some(ctx.title.as_str()) {
            self.host.set_title(&ctx.title)?;
            self.applied_title = Some(ctx.title.clone());
        }
        ctx.ticks += 1;

        if ctx.exit {
            return Ok(true);
        }

        // ── Pacing ──
        let mut delta = self.clock.now().saturating_duration_since(start);
        if delta < ctx.timestep {
            self.clock.sleep(ctx.timestep - delta);
            delta = ctx.timestep;
        }
        ctx.delta = delta;

        // ── FPS ──
        self.fps_window += delta;
        self.fps_frames += 1;
        if self.fps_window >= FPS_WINDOW {
            ctx.fps = self.fps_frames;
            self.fps_frames = 0;
            self.fps_window -= FPS_WINDOW;
            debug!(fps = ctx.fps, "fps");
        }

        Ok(false)
    }

    fn resize(&mut self, ctx: &mut Context, rows: u16, cols: u16) -> Result<(), RunError> {
        let alloc_failed = |_| {
            let cells = usize::from(rows) * usize::from(cols);
            warn!(rows, cols, cells, "grid allocation failed");
            RunError::Allocation { cells }
        };
        ctx.front.resize_and_clear(rows, cols).map_err(alloc_failed)?;
        self.renderer.resize(rows, cols).map_err(alloc_failed)?;
        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut Context) -> io::Result<()> {
        ctx.front.release();
        self.renderer.release();
        self.host.set_text_color(TextAttr::DEFAULT)?;
        self.host.flush()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{RawEvent, Rect};
    use crate::scancode;
    use crate::testing::{ManualClock, MockHost, Op};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn config(max_fps: u32) -> EngineConfig {
        EngineConfig {
            max_fps,
            title: String::from("test"),
        }
    }

    fn engine(
        max_fps: u32,
        host: MockHost,
        tick: impl FnMut(&mut Context) + 'static,
    ) -> (Engine<MockHost, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let engine = Engine::with_clock(config(max_fps), clock.clone())
            .with_host(host)
            .with_tick(tick);
        (engine, clock)
    }

    /// A callback that exits on the `n`-th tick.
    fn exit_on(n: u64) -> impl FnMut(&mut Context) + 'static {
        move |ctx: &mut Context| {
            if ctx.ticks() + 1 == n {
                ctx.request_exit();
            }
        }
    }

    /// Record one value per tick.
    fn recorder<T: 'static>() -> (Rc<RefCell<Vec<T>>>, Rc<RefCell<Vec<T>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        (Rc::clone(&log), log)
    }

    // ── Configuration errors ─────────────────────────────────────────────

    #[test]
    fn run_without_host_is_not_initialized() {
        let mut engine: Engine<MockHost, ManualClock> =
            Engine::with_clock(config(10), ManualClock::new()).with_tick(|_| {});
        let err = engine.run().unwrap_err();
        assert!(matches!(err, RunError::NotInitialized));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(engine.state(), LoopState::NotStarted);
    }

    #[test]
    fn run_without_callback_touches_nothing() {
        let mut engine = Engine::with_clock(config(10), ManualClock::new()).with_host(MockHost::new(5, 10));
        let err = engine.run().unwrap_err();
        assert!(matches!(err, RunError::MissingCallback));
        assert_eq!(err.exit_code(), 2);
        assert!(engine.host().unwrap().ops.is_empty());
    }

    #[test]
    fn zero_fps_is_rejected() {
        let (mut engine, _) = engine(0, MockHost::new(5, 10), |_| {});
        let err = engine.run().unwrap_err();
        assert!(matches!(err, RunError::InvalidFrameRate(0)));
        assert_eq!(err.exit_code(), 3);
        assert!(engine.host().unwrap().ops.is_empty());
    }

    // ── End to end ───────────────────────────────────────────────────────

    #[test]
    fn exit_on_third_tick_renders_third_frame() {
        let tick = |ctx: &mut Context| {
            let n = ctx.ticks() + 1;
            let label = format!("tick {n}");
            ctx.write_string(&label, 0, 0, Color::LightGreen, Color::Black);
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            ctx.fill(n as i32, 2, Cell::new(b'*', Color::Yellow, Color::Blue));
            if n == 3 {
                ctx.request_exit();
            }
        };
        let (mut engine, clock) = engine(10, MockHost::new(5, 10), tick);

        engine.run().unwrap();
        assert_eq!(engine.state(), LoopState::Stopped);

        let host = engine.host().unwrap();
        assert_eq!(host.screen.row_text(0), "tick 3    ");
        assert_eq!(host.screen.row_text(2), "   *      ");
        assert_eq!(host.screen.get(3, 2).unwrap().bg(), Color::Blue);
        // Two paced ticks; the exit tick does not sleep.
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(100); 2]);
    }

    #[test]
    fn run_on_stopped_engine_is_a_noop() {
        let (mut engine, _) = engine(10, MockHost::new(2, 2), exit_on(1));
        engine.run().unwrap();
        let ops = engine.host().unwrap().ops.len();
        engine.run().unwrap();
        assert_eq!(engine.host().unwrap().ops.len(), ops);
    }

    #[test]
    fn front_grid_is_cleared_every_tick() {
        let (seen, log) = recorder();
        let tick = move |ctx: &mut Context| {
            log.borrow_mut().push(ctx.cell(1, 1));
            ctx.fill(1, 1, Cell::new(b'x', Color::Red, Color::Black));
            if ctx.ticks() == 2 {
                ctx.request_exit();
            }
        };
        let (mut engine, _) = engine(10, MockHost::new(3, 3), tick);
        engine.run().unwrap();
        assert_eq!(*seen.borrow(), vec![Some(Cell::EMPTY); 3]);
    }

    // ── Pacing ───────────────────────────────────────────────────────────

    #[test]
    fn fast_ticks_sleep_the_remainder_and_report_the_timestep() {
        let (deltas, log) = recorder();
        let clock = ManualClock::new();
        let work = clock.clone();
        let tick = move |ctx: &mut Context| {
            log.borrow_mut().push(ctx.delta_duration());
            work.advance(Duration::from_millis(30));
            if ctx.ticks() == 4 {
                ctx.request_exit();
            }
        };
        let mut engine = Engine::with_clock(config(10), clock.clone())
            .with_host(MockHost::new(2, 2))
            .with_tick(tick);
        engine.run().unwrap();

        assert_eq!(clock.sleeps(), vec![Duration::from_millis(70); 4]);
        assert!(deltas.borrow().iter().all(|&d| d >= Duration::from_millis(100)));
    }

    #[test]
    fn slow_ticks_do_not_sleep() {
        let (deltas, log) = recorder();
        let clock = ManualClock::new();
        let work = clock.clone();
        let tick = move |ctx: &mut Context| {
            log.borrow_mut().push(ctx.delta());
            work.advance(Duration::from_millis(250));
            if ctx.ticks() == 2 {
                ctx.request_exit();
            }
        };
        let mut engine = Engine::with_clock(config(10), clock.clone())
            .with_host(MockHost::new(2, 2))
            .with_tick(tick);
        engine.run().unwrap();

        assert!(clock.sleeps().is_empty());
        assert_eq!(*deltas.borrow(), vec![0.1, 0.25, 0.25]);
    }

    #[test]
    fn timestep_is_inverse_of_max_fps() {
        let (steps, log) = recorder();
        let tick = move |ctx: &mut Context| {
            log.borrow_mut().push(ctx.timestep());
            ctx.request_exit();
        };
        let (mut engine, _) = engine(20, MockHost::new(1, 1), tick);
        engine.run().unwrap();
        assert_eq!(*steps.borrow(), vec![0.05]);
    }

    // ── FPS ──────────────────────────────────────────────────────────────

    #[test]
    fn fps_is_published_once_per_second() {
        let (fps, log) = recorder();
        let tick = move |ctx: &mut Context| {
            log.borrow_mut().push(ctx.fps());
            if ctx.ticks() == 21 {
                ctx.request_exit();
            }
        };
        let (mut engine, _) = engine(10, MockHost::new(1, 1), tick);
        engine.run().unwrap();

        let fps = fps.borrow();
        assert!(fps[..10].iter().all(|&f| f == 0));
        assert!(fps[10..].iter().all(|&f| f == 10));
    }

    #[test]
    fn fps_counts_slow_ticks() {
        let (fps, log) = recorder();
        let clock = ManualClock::new();
        let work = clock.clone();
        let tick = move |ctx: &mut Context| {
            log.borrow_mut().push(ctx.fps());
            work.advance(Duration::from_millis(500));
            if ctx.ticks() == 4 {
                ctx.request_exit();
            }
        };
        let mut engine = Engine::with_clock(config(60), clock)
            .with_host(MockHost::new(1, 1))
            .with_tick(tick);
        engine.run().unwrap();
        assert_eq!(*fps.borrow(), vec![0, 0, 2, 2, 2]);
    }

    // ── Resize ───────────────────────────────────────────────────────────

    #[test]
    fn resize_hides_cursor_and_redraws_everything() {
        let mut host = MockHost::new(2, 3);
        // Tick 1 sees 2x3 (from new), tick 2 still 2x3, tick 3 sees 4x5.
        host.resize_later(2, 3);
        host.resize_later(2, 3);
        host.resize_later(4, 5);
        let (sizes, log) = recorder();
        let tick = move |ctx: &mut Context| {
            log.borrow_mut().push((ctx.rows(), ctx.cols()));
            ctx.write_string("ab", 0, 0, Color::White, Color::Black);
            if ctx.ticks() == 2 {
                ctx.request_exit();
            }
        };
        let (mut engine, _) = engine(10, host, tick);
        engine.run().unwrap();

        assert_eq!(*sizes.borrow(), vec![(2, 3), (2, 3), (4, 5)]);
        let host = engine.host().unwrap();
        assert_eq!(host.count(|op| *op == Op::CursorVisible(false)), 2);
        // 6 cells on the first frame, none on the second, 20 after resize.
        assert_eq!(host.writes(), 26);
        assert_eq!(host.screen.row_text(0), "ab   ");
    }

    // ── Input ────────────────────────────────────────────────────────────

    #[test]
    fn callback_sees_events_polled_this_tick() {
        let mut host = MockHost::new(3, 3);
        host.queue_events(vec![RawEvent::Key {
            code: scancode::W,
            down: true,
        }]);
        host.queue_events(vec![]);
        host.queue_events(vec![RawEvent::Key {
            code: scancode::W,
            down: false,
        }]);
        let (seen, log) = recorder();
        let tick = move |ctx: &mut Context| {
            log.borrow_mut().push((
                ctx.is_key_down(scancode::W),
                ctx.is_key_just_pressed(scancode::W),
                ctx.is_key_just_released(scancode::W),
            ));
            if ctx.ticks() == 2 {
                ctx.request_exit();
            }
        };
        let (mut engine, _) = engine(10, host, tick);
        engine.run().unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![(true, true, false), (true, false, false), (false, false, true)]
        );
    }

    #[test]
    fn grab_delta_is_measured_then_zero_when_pointer_is_still() {
        let mut host = MockHost::new(24, 80);
        host.pointer = Some((45, 10));
        host.bounds = Some(Rect::new(0, 0, 80, 24));
        let (deltas, log) = recorder();
        let tick = move |ctx: &mut Context| {
            log.borrow_mut().push((ctx.mouse_dx(), ctx.mouse_dy()));
            ctx.set_grab(true);
            if ctx.ticks() == 2 {
                ctx.request_exit();
            }
        };
        let (mut engine, _) = engine(10, host, tick);
        engine.run().unwrap();

        // Grab takes effect on the tick after it is set.
        assert_eq!(*deltas.borrow(), vec![(0, 0), (5, -2), (0, 0)]);
        assert_eq!(engine.host().unwrap().pointer, Some((40, 12)));
    }

    #[test]
    fn scroll_does_not_carry_over() {
        let mut host = MockHost::new(3, 3);
        host.queue_events(vec![RawEvent::Mouse {
            x: 1,
            y: 1,
            buttons: MouseButtons::empty(),
            wheel: std::num::NonZeroI32::new(-120),
        }]);
        let (seen, log) = recorder();
        let tick = move |ctx: &mut Context| {
            log.borrow_mut().push(ctx.scroll());
            if ctx.ticks() == 1 {
                ctx.request_exit();
            }
        };
        let (mut engine, _) = engine(10, host, tick);
        engine.run().unwrap();
        assert_eq!(*seen.borrow(), vec![Scroll::Down, Scroll::None]);
    }

    // ── Title ────────────────────────────────────────────────────────────

    #[test]
    fn title_is_applied_first_tick_and_on_change() {
        let tick = |ctx: &mut Context| {
            if ctx.ticks() == 1 {
                ctx.set_title("second");
            }
            if ctx.ticks() == 3 {
                ctx.request_exit();
            }
        };
        let (mut engine, _) = engine(10, MockHost::new(1, 1), tick);
        engine.run().unwrap();
        assert_eq!(engine.host().unwrap().titles(), vec!["test", "second"]);
    }

    // ── Exit control ─────────────────────────────────────────────────────

    #[test]
    fn cancelled_exit_keeps_running() {
        let tick = |ctx: &mut Context| {
            ctx.request_exit();
            if ctx.ticks() < 2 {
                ctx.cancel_exit();
            }
        };
        let (mut engine, clock) = engine(10, MockHost::new(1, 1), tick);
        engine.run().unwrap();
        assert_eq!(clock.sleeps().len(), 2);
    }

    // ── Cleanup ──────────────────────────────────────────────────────────

    #[test]
    fn normal_exit_resets_color_last() {
        let tick = |ctx: &mut Context| {
            ctx.fill(0, 0, Cell::new(b'#', Color::Red, Color::Gray));
            ctx.request_exit();
        };
        let (mut engine, _) = engine(10, MockHost::new(2, 2), tick);
        engine.run().unwrap();
        let ops = &engine.host().unwrap().ops;
        assert_eq!(&ops[ops.len() - 2..], &[Op::Color(TextAttr::DEFAULT), Op::Flush]);
    }

    #[test]
    fn host_error_stops_loop_and_still_cleans_up() {
        let mut host = MockHost::new(2, 2);
        host.fail_writes = true;
        let (mut engine, _) = engine(10, host, |_| {});
        let err = engine.run().unwrap_err();
        assert!(matches!(err, RunError::Io(_)));
        assert_eq!(err.exit_code(), 5);
        assert_eq!(engine.state(), LoopState::Stopped);

        let ops = &engine.host().unwrap().ops;
        assert_eq!(&ops[ops.len() - 2..], &[Op::Color(TextAttr::DEFAULT), Op::Flush]);
    }

    #[test]
    fn allocation_failure_stops_loop_and_still_cleans_up() {
        let mut host = MockHost::new(2, 2);
        host.resize_later(2, 2);
        host.resize_later(8, 8);
        let (mut engine, _) = engine(10, host, |ctx: &mut Context| {
            ctx.fill(0, 0, Cell::new(b'#', Color::Red, Color::Gray));
        });

        crate::grid::cell_limit::set(Some(16));
        let err = engine.run().unwrap_err();
        crate::grid::cell_limit::set(None);

        assert!(matches!(err, RunError::Allocation { cells: 64 }));
        assert_eq!(err.exit_code(), 4);
        assert_eq!(engine.state(), LoopState::Stopped);
        assert!(engine.renderer.back().is_empty());

        let host = engine.host().unwrap();
        // The first frame was drawn before the failure.
        assert!(host.writes() > 0);
        let ops = &host.ops;
        assert_eq!(&ops[ops.len() - 2..], &[Op::Color(TextAttr::DEFAULT), Op::Flush]);
    }

    // ── Context accessors ────────────────────────────────────────────────

    #[test]
    fn context_setters_follow_permissive_policy() {
        let mut ctx = Context::new(Duration::from_millis(10), String::new());
        ctx.front.resize_and_clear(2, 2).unwrap();

        ctx.set_character(0, 0, b'Q');
        ctx.set_fg(0, 0, Color::Yellow);
        ctx.set_bg(0, 0, 99_u8);
        ctx.set_character(0, 0, 0x07);
        ctx.set_fg(5, 5, Color::Red);
        assert_eq!(ctx.cell(0, 0), Some(Cell::new(b'Q', Color::Yellow, Color::Black)));
        assert_eq!(ctx.cell(5, 5), None);
        assert!(ctx.cell_mut(-1, 0).is_none());
    }
}
