// SPDX-License-Identifier: MIT
//
// Errors that end a run.
//
// Only configuration problems (checked once, before the first tick) and
// resource failures stop the loop. Drawing out of bounds and bad setter
// input are absorbed where they happen and never reach this type.

use std::io;

use thiserror::Error;

/// Process exit code for a run that ended because the tick callback asked.
pub const EXIT_OK: u8 = 0;

/// Why [`Engine::run`](crate::Engine::run) stopped without an exit request.
#[derive(Debug, Error)]
pub enum RunError {
    /// No host display/input was attached.
    #[error("engine has no host attached")]
    NotInitialized,

    /// No tick callback was registered.
    #[error("no tick callback registered")]
    MissingCallback,

    /// The frame-rate target was not positive.
    #[error("invalid frame rate target: {0} (must be at least 1)")]
    InvalidFrameRate(u32),

    /// The grids could not be allocated for the current display size.
    #[error("failed to allocate {cells} cells for the frame grids")]
    Allocation { cells: usize },

    /// The host display failed.
    #[error("host i/o failed: {0}")]
    Io(#[from] io::Error),
}

impl RunError {
    /// A distinct non-zero process exit code per variant.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::NotInitialized => 1,
            Self::MissingCallback => 2,
            Self::InvalidFrameRate(_) => 3,
            Self::Allocation { .. } => 4,
            Self::Io(_) => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_and_nonzero() {
        let errors = [
            RunError::NotInitialized,
            RunError::MissingCallback,
            RunError::InvalidFrameRate(0),
            RunError::Allocation { cells: 1 },
            RunError::Io(io::Error::other("x")),
        ];
        let mut codes: Vec<u8> = errors.iter().map(RunError::exit_code).collect();
        assert!(codes.iter().all(|&c| c != EXIT_OK));
        codes.dedup();
        assert_eq!(codes, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn messages_name_the_problem() {
        assert_eq!(
            RunError::InvalidFrameRate(0).to_string(),
            "invalid frame rate target: 0 (must be at least 1)"
        );
        assert_eq!(
            RunError::Allocation { cells: 4000 }.to_string(),
            "failed to allocate 4000 cells for the frame grids"
        );
    }
}
