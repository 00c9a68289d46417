// SPDX-License-Identifier: MIT
//
// cellgine: demo runner.
//
// Wires the engine to the ANSI terminal host and runs a small scene:
//
//   ESC          quit
//   Ctrl+C       quit, where the terminal reports Ctrl as a key (Kitty
//                keyboard protocol). Raw mode turns off the interrupt
//                signal, and legacy terminals send Ctrl+C as a plain C.
//   W A S D      move the star
//   wheel        move the star up and down
//   left button  put the star under the pointer
//   G            toggle pointer grab (relative motion moves the star)
//
// The scene also draws a filled cell, two lines and a triangle, and an FPS
// counter in the bottom-right corner.
//
// Logging is off unless `--log-file` is given. The terminal is the render
// target, so log lines never go to stdout or stderr while the engine runs.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context as _, Result};
use cg_engine::scancode::{self, Scancode};
use cg_engine::{Cell, Color, Context, Engine, EngineConfig, MouseButtons, RunError};
use cg_term::{AnsiHost, TermOptions};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ─── CLI ─────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "cellgine", version, about = "Character-grid engine demo")]
struct Args {
    /// Target frames per second
    #[arg(long, default_value_t = 24)]
    fps: u32,

    /// Window title
    #[arg(long, default_value = "cellgine demo")]
    title: String,

    /// Write logs to this file (filter with RUST_LOG, default `info`)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Do not enable mouse reporting
    #[arg(long)]
    no_mouse: bool,
}

// ─── Logging ─────────────────────────────────────────────────────────────────

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("installing log subscriber")
}

// ─── Scene ───────────────────────────────────────────────────────────────────

/// ESC, or Ctrl+C when Ctrl is reported as a key of its own.
fn quit_requested(key_down: impl Fn(Scancode) -> bool) -> bool {
    key_down(scancode::ESC) || (key_down(scancode::LCTRL) && key_down(scancode::C))
}

/// State carried between ticks.
#[derive(Debug, Default)]
struct Scene {
    x: i32,
    y: i32,
}

impl Scene {
    fn tick(&mut self, ctx: &mut Context) {
        if quit_requested(|code| ctx.is_key_down(code)) {
            ctx.request_exit();
            return;
        }
        if ctx.is_key_just_pressed(scancode::G) {
            let grab = !ctx.is_grabbed();
            ctx.set_grab(grab);
            info!(grab, "pointer grab toggled");
        }

        self.steer(ctx);
        self.draw(ctx);
    }

    fn steer(&mut self, ctx: &Context) {
        if ctx.is_button_down(MouseButtons::LEFT) {
            self.x = ctx.mouse_x();
            self.y = ctx.mouse_y();
        } else {
            let key = |code| i32::from(ctx.is_key_down(code));
            self.x += key(scancode::D) - key(scancode::A) + ctx.mouse_dx();
            self.y += key(scancode::S) - key(scancode::W) - ctx.scroll().value() + ctx.mouse_dy();
        }

        let max_x = (i32::from(ctx.cols()) - 1).max(0);
        let max_y = (i32::from(ctx.rows()) - 1).max(0);
        self.x = self.x.clamp(0, max_x);
        self.y = self.y.clamp(0, max_y);
    }

    fn draw(&self, ctx: &mut Context) {
        let solid = Cell::new(b' ', Color::Black, Color::White);
        ctx.fill(4, 4, solid);
        ctx.draw_line(9, 9, 47, 14, solid);
        ctx.draw_line(6, 100, 6, 30, solid);
        ctx.fill_triangle((40, 40), (30, 30), (50, 30), solid);

        ctx.set_character(self.x, self.y, b'*');

        if ctx.is_grabbed() {
            let hud = format!("grab  dx {:+} dy {:+}", ctx.mouse_dx(), ctx.mouse_dy());
            ctx.write_string(&hud, 0, 0, Color::LightYellow, Color::Black);
        }

        let fps = format!("FPS: {}", ctx.fps());
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)] // short ASCII
        let fps_x = i32::from(ctx.cols()) - fps.len() as i32;
        let fps_y = i32::from(ctx.rows()) - 1;
        ctx.write_string(&fps, fps_x, fps_y, Color::Black, Color::White);
    }
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn run(args: &Args) -> Result<()> {
    let options = TermOptions {
        mouse: !args.no_mouse,
        ..TermOptions::default()
    };
    let config = EngineConfig {
        max_fps: args.fps,
        title: args.title.clone(),
    };
    info!(fps = config.max_fps, mouse = options.mouse, "starting");

    let host = AnsiHost::open(options).context("opening terminal")?;
    let mut scene = Scene::default();
    let mut engine = Engine::new(config)
        .with_host(host)
        .with_tick(move |ctx| scene.tick(ctx));

    let outcome = engine.run();

    // Restore the terminal before any error is printed.
    if let Some(host) = engine.into_host() {
        host.close().context("restoring terminal")?;
    }
    outcome?;

    info!("stopped");
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(path) = &args.log_file {
        if let Err(err) = init_logging(path) {
            eprintln!("cellgine: {err:#}");
            return ExitCode::FAILURE;
        }
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("cellgine: {err:#}");
            let code = err.downcast_ref::<RunError>().map_or(1, RunError::exit_code);
            ExitCode::from(code)
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let args = Args::parse_from(["cellgine"]);
        assert_eq!(args.fps, 24);
        assert_eq!(args.title, "cellgine demo");
        assert!(args.log_file.is_none());
        assert!(!args.no_mouse);
    }

    #[test]
    fn cli_flags() {
        let args = Args::parse_from(["cellgine", "--fps", "60", "--no-mouse", "--log-file", "x.log"]);
        assert_eq!(args.fps, 60);
        assert!(args.no_mouse);
        assert_eq!(args.log_file.as_deref(), Some(Path::new("x.log")));
    }

    #[test]
    fn escape_and_ctrl_c_quit() {
        let held = |keys: &'static [Scancode]| move |code| keys.contains(&code);
        assert!(quit_requested(held(&[scancode::ESC])));
        assert!(quit_requested(held(&[scancode::LCTRL, scancode::C])));
        assert!(!quit_requested(held(&[scancode::C])));
        assert!(!quit_requested(held(&[scancode::LCTRL])));
        assert!(!quit_requested(held(&[])));
    }

    #[test]
    fn cli_is_well_formed() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
