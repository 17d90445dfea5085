pub mod cue;
pub mod engine;
pub mod progress;

pub use cue::{PhaseCue, RodioCue};
pub use engine::{IntervalTimerEngine, Phase};
