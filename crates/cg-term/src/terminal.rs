// SPDX-License-Identifier: MIT
//
// Terminal modes: raw input, alternate screen, mouse and keyboard reporting.
//
// Safety: termios (tcgetattr, tcsetattr), ioctl (TIOCGWINSZ), isatty and the
// raw fd write in the panic hook are POSIX calls with no safe wrapper in std.
#![allow(unsafe_code)]
//
// `Terminal::enter` puts the terminal into the state a game loop wants: no
// echo or line editing, a clean alternate screen, a hidden steady cursor, all
// pointer motion reported, and (where supported) Kitty keyboard events with
// key releases. `leave` undoes it in reverse, and so does `Drop`.
//
// A panic in raw mode would leave the shell unusable, so `enter` installs a
// hook that writes one pre-built restore sequence straight to fd 1 and puts
// the saved termios back before the default handler prints the message.

use std::io::{self, Write};
use std::sync::{Mutex, Once};

use tracing::debug;

use crate::ansi::{self, KittyFlags, MouseMode};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Which terminal features the host switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermOptions {
    /// Report every pointer motion, press, release and wheel step.
    pub mouse: bool,
    /// Ask for Kitty keyboard events, which include key releases.
    pub kitty_keyboard: bool,
    /// Draw on the alternate screen and restore the shell on exit.
    pub alt_screen: bool,
    /// Polls a legacy key stays down before a release is synthesized.
    pub release_hold: u32,
}

impl Default for TermOptions {
    fn default() -> Self {
        Self {
            mouse: true,
            kitty_keyboard: true,
            alt_screen: true,
            release_hold: 1,
        }
    }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Terminal size as `(rows, cols)` from `ioctl(TIOCGWINSZ)`.
///
/// `None` when stdout is not a terminal or reports a zero dimension.
#[cfg(unix)]
#[must_use]
pub fn get_size() -> Option<(u16, u16)> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };

    (result == 0 && ws.ws_col > 0 && ws.ws_row > 0).then_some((ws.ws_row, ws.ws_col))
}

#[cfg(not(unix))]
#[must_use]
pub fn get_size() -> Option<(u16, u16)> {
    None
}

#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── Panic Restore ───────────────────────────────────────────────────────────

/// Saved termios for the panic hook, which cannot reach the `Terminal`.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

#[cfg(unix)]
fn restore_termios_from_backup() {
    let Ok(guard) = TERMIOS_BACKUP.lock() else {
        return;
    };
    if let Some(ref original) = *guard {
        unsafe {
            let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, original);
        }
    }
}

/// Everything `leave` would undo, in one write. Alternate screen exit stays
/// last so the shell comes back clean.
#[rustfmt::skip]
const EMERGENCY_RESTORE: &[u8] = b"\
    \x1b[?2026l\
    \x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?1000l\
    \x1b[<u\
    \x1b[0m\
    \x1b[?25h\
    \x1b[?1049l";

static PANIC_HOOK_INSTALLED: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();

            #[cfg(unix)]
            restore_termios_from_backup();

            original(info);
        }));
    });
}

/// Write [`EMERGENCY_RESTORE`] to fd 1 without taking the stdout lock, which
/// the panicking frame may hold.
fn emergency_restore() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

// ─── Terminal ────────────────────────────────────────────────────────────────

/// Owner of the terminal's modes. Restores them on drop.
///
/// Mode sequences go to `W`, stdout by default. Raw mode always applies to
/// the process's stdin.
///
/// ```no_run
/// use cg_term::terminal::{TermOptions, Terminal};
///
/// let mut term = Terminal::new(TermOptions::default());
/// term.enter()?;
/// // ... run the engine ...
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Terminal<W: Write = io::Stdout> {
    options: TermOptions,
    out: W,

    #[cfg(unix)]
    original_termios: Option<libc::termios>,

    active: bool,
}

impl Terminal<io::Stdout> {
    /// A handle that has not touched the terminal yet.
    #[must_use]
    pub fn new(options: TermOptions) -> Self {
        Self::with_writer(options, io::stdout())
    }
}

impl<W: Write> Terminal<W> {
    /// Like [`new`](Terminal::new), with mode sequences sent to `out`.
    pub const fn with_writer(options: TermOptions, out: W) -> Self {
        Self {
            options,
            out,
            #[cfg(unix)]
            original_termios: None,
            active: false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn options(&self) -> TermOptions {
        self.options
    }

    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Switch to game mode. A no-op while already active.
    ///
    /// Raw mode is skipped when stdin is not a TTY, so piped runs still get
    /// the escape sequences but keep the pipe's line discipline.
    ///
    /// # Errors
    ///
    /// Returns an error if termios or the terminal write fails.
    pub fn enter(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }

        install_panic_hook();
        self.enable_raw_mode()?;

        let out = &mut self.out;
        if self.options.alt_screen {
            ansi::enter_alt_screen(out)?;
        }
        ansi::cursor_hide(out)?;
        ansi::cursor_blink_off(out)?;
        ansi::clear_screen(out)?;
        if self.options.mouse {
            ansi::enable_mouse(out, MouseMode::Motion)?;
        }
        if self.options.kitty_keyboard {
            ansi::push_kitty_keyboard(out, KittyFlags::GAME)?;
            ansi::query_kitty_keyboard(out)?;
        }
        out.flush()?;

        self.active = true;
        debug!(options = ?self.options, "terminal entered");
        Ok(())
    }

    /// Restore what [`enter`](Self::enter) changed. A no-op while inactive.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal write or termios restore fails.
    pub fn leave(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }

        let out = &mut self.out;
        ansi::end_sync(out)?;
        if self.options.kitty_keyboard {
            ansi::pop_kitty_keyboard(out)?;
        }
        if self.options.mouse {
            ansi::disable_mouse(out)?;
        }
        ansi::reset(out)?;
        ansi::cursor_show(out)?;
        if self.options.alt_screen {
            ansi::exit_alt_screen(out)?;
        }
        out.flush()?;

        self.disable_raw_mode()?;
        self.active = false;
        debug!("terminal restored");
        Ok(())
    }

    // ── Raw Mode ─────────────────────────────────────────────────────────

    #[cfg(unix)]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        if !is_tty() {
            return Ok(());
        }

        let fd = io::stdin().as_raw_fd();

        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }

            self.original_termios = Some(termios);
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = Some(termios);
            }

            // cfmakeraw, but keep VMIN=1 so the reader thread's read() only
            // returns with data.
            termios.c_iflag &= !(libc::IGNBRK
                | libc::BRKINT
                | libc::PARMRK
                | libc::ISTRIP
                | libc::INLCR
                | libc::IGNCR
                | libc::ICRNL
                | libc::IXON);
            termios.c_oflag &= !libc::OPOST;
            termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
            termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
            termios.c_cflag |= libc::CS8;
            termios.c_cc[libc::VMIN] = 1;
            termios.c_cc[libc::VTIME] = 0;

            if libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const termios) != 0 {
                return Err(io::Error::last_os_error());
            }
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }

    #[cfg(unix)]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        let Some(original) = self.original_termios.take() else {
            return Ok(());
        };
        let fd = io::stdin().as_raw_fd();

        unsafe {
            if libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const original) != 0 {
                return Err(io::Error::last_os_error());
            }
        }

        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = None;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: Write> Drop for Terminal<W> {
    fn drop(&mut self) {
        if self.active {
            let _ = self.leave();
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
