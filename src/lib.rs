//! Core engine for the lofai ambient-music companion.
//!
//! The crate drives continuous playback from a remote music generator,
//! reports listener presence over a duplex connection and runs a
//! drift-corrected focus/break interval timer. Everything visual is left to
//! the embedding surface; this library only owns state and timing.

pub mod common;
pub mod config;
pub mod playback;
pub mod presence;
pub mod prompt;
pub mod storage;
pub mod timer;
