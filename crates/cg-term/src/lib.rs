// SPDX-License-Identifier: MIT
//
// cg-term: ANSI terminal host for cellgine.
//
// Implements the engine's `Display`, `InputSource` and `PointerControl` traits
// on a POSIX terminal with plain escape sequences and raw termios:
//
//   terminal   raw mode, alternate screen, mouse and Kitty keyboard modes,
//              panic-safe restore
//   ansi       byte encodings of every command we send
//   output     per-frame output buffer, one write per flush
//   reader     background stdin thread, drained without blocking
//   parser     stdin bytes to key and mouse records
//   latch      synthesized key releases for legacy terminals
//   host       `AnsiHost`, which ties the above to the engine

pub mod ansi;
pub mod host;
pub mod latch;
pub mod output;
pub mod parser;
pub mod reader;
pub mod terminal;

pub use host::AnsiHost;
pub use terminal::TermOptions;
