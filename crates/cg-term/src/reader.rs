// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Background stdin reader.
//
// The engine's input poll must never block, but `read()` on stdin does. So a
// dedicated thread reads stdin and sends byte chunks through a channel, and
// the host drains that channel with `try_recv` once per tick.
//
// Shutdown: the thread polls stdin with a short timeout and checks an
// `AtomicBool` stop flag between polls, so it never stays stuck in `read()`.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use tracing::debug;

/// A single keypress is 1–16 bytes. A burst of mouse motion can be a few KB.
const READ_BUF_SIZE: usize = 4096;

/// How often the thread checks the stop flag, in milliseconds.
const POLL_TIMEOUT_MS: i32 = 50;

/// Background stdin reader thread plus the receiving end of its channel.
pub struct StdinReader {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    rx: Receiver<Vec<u8>>,
}

impl StdinReader {
    /// Spawn the reader thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to spawn a thread.
    pub fn spawn() -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("cg-stdin".into())
            .spawn(move || reader_loop(&tx, &stop_flag))?;
        debug!("stdin reader started");

        Ok(Self {
            handle: Some(handle),
            stop,
            rx,
        })
    }

    /// Append every chunk received so far to `out`, without blocking.
    ///
    /// Returns `false` once the thread has exited and the channel is empty.
    pub fn drain_into(&self, out: &mut Vec<u8>) -> bool {
        loop {
            match self.rx.try_recv() {
                Ok(chunk) => out.extend_from_slice(&chunk),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    /// Signal the thread to stop and wait for it. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            debug!("stdin reader stopped");
        }
    }
}

impl Drop for StdinReader {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Poll stdin, read what is there, send it. Exits on stop, EOF, read error,
/// or when the receiver is gone.
#[cfg(unix)]
fn reader_loop(tx: &mpsc::Sender<Vec<u8>>, stop: &AtomicBool) {
    use std::os::unix::io::AsRawFd;

    let stdin_fd = io::stdin().as_raw_fd();
    let mut buf = [0u8; READ_BUF_SIZE];

    while !stop.load(Ordering::Relaxed) {
        let ready = unsafe {
            let mut pfd = libc::pollfd {
                fd: stdin_fd,
                events: libc::POLLIN,
                revents: 0,
            };
            libc::poll(&raw mut pfd, 1, POLL_TIMEOUT_MS)
        };
        if ready <= 0 {
            continue;
        }

        let n = unsafe { libc::read(stdin_fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n <= 0 {
            break;
        }

        #[allow(clippy::cast_sign_loss)] // n > 0
        if tx.send(buf[..n as usize].to_vec()).is_err() {
            break;
        }
    }
}

/// Blocking fallback without `poll`. Shutdown waits for the next byte.
#[cfg(not(unix))]
fn reader_loop(tx: &mpsc::Sender<Vec<u8>>, stop: &AtomicBool) {
    use std::io::Read;

    let stdin = std::io::stdin();
    let mut buf = [0u8; READ_BUF_SIZE];

    while !stop.load(Ordering::Relaxed) {
        match stdin.lock().read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
