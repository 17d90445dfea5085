//! Drift-corrected focus/break interval timer.
//!
//! Two independent loops, never merged: a 50 ms countdown tick that owns
//! the correctness-critical arithmetic (each tick subtracts elapsed real
//! time since the previous tick, so interval jitter and throttling do not
//! drift the countdown), and a frame-paced sampler that only eases the
//! cosmetic progress value. Both are cancellable tasks; pause and teardown
//! abort them.

use std::ops::RangeInclusive;
use std::sync::{Arc, atomic::AtomicU32, atomic::Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::storage::TimerSettings;
use crate::timer::cue::PhaseCue;
use crate::timer::progress;

pub const TICK_INTERVAL: Duration = Duration::from_millis(50);
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);
pub const WORK_MINUTES: RangeInclusive<u32> = 1..=60;
pub const BREAK_MINUTES: RangeInclusive<u32> = 1..=30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Work,
    Break,
}

impl Phase {
    fn flip(self) -> Self {
        match self {
            Self::Work => Self::Break,
            Self::Break => Self::Work,
        }
    }
}

struct TimerState {
    remaining_secs: f64,
    phase: Phase,
    work_minutes: u32,
    break_minutes: u32,
    running: bool,
    last_tick: Option<Instant>,
}

impl TimerState {
    fn duration_secs(&self, phase: Phase) -> f64 {
        let minutes = match phase {
            Phase::Work => self.work_minutes,
            Phase::Break => self.break_minutes,
        };
        f64::from(minutes) * 60.0
    }
}

pub struct IntervalTimerEngine {
    state: Arc<Mutex<TimerState>>,
    /// Displayed progress as f32 bits, shared with the sampler task.
    progress: Arc<AtomicU32>,
    cue: Arc<dyn PhaseCue>,
    tick_task: Mutex<Option<JoinHandle<()>>>,
    sampler_task: Mutex<Option<JoinHandle<()>>>,
}

impl IntervalTimerEngine {
    pub fn new(cue: Arc<dyn PhaseCue>) -> Self {
        Self::with_settings(cue, TimerSettings::default())
    }

    pub fn with_settings(cue: Arc<dyn PhaseCue>, settings: TimerSettings) -> Self {
        let work_minutes = settings.work_minutes.clamp(*WORK_MINUTES.start(), *WORK_MINUTES.end());
        let break_minutes =
            settings.break_minutes.clamp(*BREAK_MINUTES.start(), *BREAK_MINUTES.end());
        Self {
            state: Arc::new(Mutex::new(TimerState {
                remaining_secs: f64::from(work_minutes) * 60.0,
                phase: Phase::Work,
                work_minutes,
                break_minutes,
                running: false,
                last_tick: None,
            })),
            progress: Arc::new(AtomicU32::new(0.0f32.to_bits())),
            cue,
            tick_task: Mutex::new(None),
            sampler_task: Mutex::new(None),
        }
    }

    pub fn remaining_secs(&self) -> f64 {
        self.state.lock().remaining_secs
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn progress(&self) -> f32 {
        f32::from_bits(self.progress.load(Ordering::Acquire))
    }

    pub fn settings(&self) -> TimerSettings {
        let state = self.state.lock();
        TimerSettings {
            work_minutes: state.work_minutes,
            break_minutes: state.break_minutes,
        }
    }

    /// Begin (or resume) the countdown. No-op while already running.
    pub fn start(&self) {
        {
            let mut state = self.state.lock();
            if state.running {
                return;
            }
            state.running = true;
            state.last_tick = Some(Instant::now());
        }
        self.cancel_tasks();
        *self.tick_task.lock() = Some(self.spawn_tick());
        *self.sampler_task.lock() = Some(self.spawn_sampler());
    }

    /// Stop ticking, keeping the remaining time exactly as last computed.
    /// The progress indicator freezes at its last value.
    pub fn pause(&self) {
        self.cancel_tasks();
        let mut state = self.state.lock();
        state.running = false;
        state.last_tick = None;
    }

    /// Back to an idle work phase at its full duration.
    pub fn reset(&self) {
        self.cancel_tasks();
        let mut state = self.state.lock();
        state.running = false;
        state.last_tick = None;
        state.phase = Phase::Work;
        state.remaining_secs = state.duration_secs(Phase::Work);
        self.progress.store(0.0f32.to_bits(), Ordering::Release);
    }

    /// Update a phase duration, clamped to its bounds. Editing the active
    /// phase while idle resets the countdown to the new value; editing the
    /// inactive phase never touches it. Returns the stored minutes.
    pub fn set_duration(&self, phase: Phase, minutes: u32) -> u32 {
        let bounds = match phase {
            Phase::Work => WORK_MINUTES,
            Phase::Break => BREAK_MINUTES,
        };
        let minutes = minutes.clamp(*bounds.start(), *bounds.end());

        let mut state = self.state.lock();
        match phase {
            Phase::Work => state.work_minutes = minutes,
            Phase::Break => state.break_minutes = minutes,
        }
        if phase == state.phase {
            let duration = f64::from(minutes) * 60.0;
            if !state.running {
                state.remaining_secs = duration;
            } else if state.remaining_secs > duration {
                // Keep the invariant remaining <= active duration.
                state.remaining_secs = duration;
            }
        }
        minutes
    }

    fn spawn_tick(&self) -> JoinHandle<()> {
        let state = self.state.clone();
        let progress = self.progress.clone();
        let cue = self.cue.clone();

        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(TICK_INTERVAL);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let completed = {
                    let mut s = state.lock();
                    if !s.running {
                        break;
                    }
                    let now = Instant::now();
                    let delta = s
                        .last_tick
                        .map(|t| now.duration_since(t).as_secs_f64())
                        .unwrap_or(0.0);
                    s.last_tick = Some(now);

                    if s.remaining_secs <= delta {
                        // Zero crossing: absorb the overshoot, flip the
                        // phase and stop until the user starts it again.
                        s.running = false;
                        s.phase = s.phase.flip();
                        s.remaining_secs = s.duration_secs(s.phase);
                        progress.store(progress::baseline(s.phase).to_bits(), Ordering::Release);
                        debug!("phase complete, next: {:?}", s.phase);
                        true
                    } else {
                        s.remaining_secs -= delta;
                        false
                    }
                };
                if completed {
                    cue.play();
                    break;
                }
            }
        })
    }

    fn spawn_sampler(&self) -> JoinHandle<()> {
        let state = self.state.clone();
        let progress = self.progress.clone();

        tokio::spawn(async move {
            let mut frames = tokio::time::interval(FRAME_INTERVAL);
            frames.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                frames.tick().await;
                let target = {
                    let s = state.lock();
                    if !s.running {
                        break;
                    }
                    progress::target_progress(s.phase, s.duration_secs(s.phase), s.remaining_secs)
                };
                let displayed = f32::from_bits(progress.load(Ordering::Acquire));
                progress.store(progress::ease(displayed, target).to_bits(), Ordering::Release);
            }
        })
    }

    fn cancel_tasks(&self) {
        if let Some(task) = self.tick_task.lock().take() {
            task.abort();
        }
        if let Some(task) = self.sampler_task.lock().take() {
            task.abort();
        }
    }
}

impl Drop for IntervalTimerEngine {
    fn drop(&mut self) {
        self.cancel_tasks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingCue {
        played: AtomicUsize,
    }

    impl PhaseCue for CountingCue {
        fn play(&self) {
            self.played.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn engine(work_minutes: u32, break_minutes: u32) -> (IntervalTimerEngine, Arc<CountingCue>) {
        let cue = Arc::new(CountingCue::default());
        let engine = IntervalTimerEngine::with_settings(
            cue.clone(),
            TimerSettings {
                work_minutes,
                break_minutes,
            },
        );
        (engine, cue)
    }

    async fn run_for(seconds: f64) {
        tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn work_phase_flips_once_to_break() {
        let (engine, cue) = engine(25, 5);
        assert_eq!(engine.remaining_secs(), 1500.0);

        engine.start();
        run_for(1500.0 + 0.2).await;

        assert_eq!(engine.phase(), Phase::Break);
        assert!(!engine.is_running());
        assert_eq!(engine.remaining_secs(), 300.0);
        assert_eq!(cue.played.load(Ordering::SeqCst), 1);

        // Stopped after the flip; nothing fires again on its own.
        run_for(120.0).await;
        assert_eq!(cue.played.load(Ordering::SeqCst), 1);
        assert_eq!(engine.phase(), Phase::Break);
    }

    #[tokio::test(start_paused = true)]
    async fn break_phase_flips_back_to_work() {
        let (engine, cue) = engine(1, 1);
        engine.start();
        run_for(61.0).await;
        assert_eq!(engine.phase(), Phase::Break);

        engine.start();
        run_for(61.0).await;
        assert_eq!(engine.phase(), Phase::Work);
        assert_eq!(engine.remaining_secs(), 60.0);
        assert_eq!(cue.played.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_preserves_remaining_across_idle_time() {
        let (engine, _cue) = engine(25, 5);
        engine.start();
        run_for(10.0).await;
        engine.pause();

        let at_pause = engine.remaining_secs();
        assert!((at_pause - 1490.0).abs() < 0.2, "at_pause = {at_pause}");

        // Time spent paused must not count.
        run_for(60.0).await;
        assert_eq!(engine.remaining_secs(), at_pause);

        engine.start();
        run_for(10.0).await;
        engine.pause();
        let after_resume = engine.remaining_secs();
        assert!(
            (at_pause - after_resume - 10.0).abs() < 0.2,
            "after_resume = {after_resume}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reset_returns_to_idle_work_phase() {
        let (engine, _cue) = engine(25, 5);
        engine.start();
        run_for(100.0).await;
        engine.reset();

        assert!(!engine.is_running());
        assert_eq!(engine.phase(), Phase::Work);
        assert_eq!(engine.remaining_secs(), 1500.0);
        assert_eq!(engine.progress(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn active_phase_edit_while_idle_resets_countdown() {
        let (engine, _cue) = engine(25, 5);
        assert_eq!(engine.set_duration(Phase::Work, 10), 10);
        assert_eq!(engine.remaining_secs(), 600.0);

        // Inactive phase: stored but the countdown is untouched.
        assert_eq!(engine.set_duration(Phase::Break, 10), 10);
        assert_eq!(engine.remaining_secs(), 600.0);
        assert_eq!(engine.settings().break_minutes, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn inactive_phase_edit_during_break_leaves_countdown() {
        let (engine, _cue) = engine(1, 5);
        engine.start();
        run_for(61.0).await;
        assert_eq!(engine.phase(), Phase::Break);
        assert_eq!(engine.remaining_secs(), 300.0);

        engine.set_duration(Phase::Work, 30);
        assert_eq!(engine.remaining_secs(), 300.0);

        engine.set_duration(Phase::Break, 2);
        assert_eq!(engine.remaining_secs(), 120.0);
    }

    #[tokio::test(start_paused = true)]
    async fn durations_are_clamped_to_bounds() {
        let (engine, _cue) = engine(25, 5);
        assert_eq!(engine.set_duration(Phase::Work, 200), 60);
        assert_eq!(engine.set_duration(Phase::Work, 0), 1);
        assert_eq!(engine.set_duration(Phase::Break, 90), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn shrinking_active_duration_while_running_clamps_remaining() {
        let (engine, _cue) = engine(25, 5);
        engine.start();
        run_for(5.0).await;

        engine.set_duration(Phase::Work, 1);
        assert!(engine.remaining_secs() <= 60.0);
        engine.pause();
    }

    #[tokio::test(start_paused = true)]
    async fn progress_approaches_target_within_bounds() {
        let (engine, _cue) = engine(1, 1);
        engine.start();

        let mut last = engine.progress();
        assert_eq!(last, 0.0);
        for _ in 0..30 {
            run_for(0.1).await;
            let sampled = engine.progress();
            assert!(sampled >= last, "progress went backwards");
            assert!((0.0..=1.0).contains(&sampled));
            let target = progress::target_progress(Phase::Work, 60.0, engine.remaining_secs());
            assert!(sampled <= target + 0.01);
            last = sampled;
        }
        assert!(last > 0.0);
        engine.pause();

        // Frozen while paused.
        run_for(5.0).await;
        assert_eq!(engine.progress(), last);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_baseline_resets_on_phase_flip() {
        let (engine, _cue) = engine(1, 1);
        engine.start();
        run_for(61.0).await;

        assert_eq!(engine.phase(), Phase::Break);
        assert_eq!(engine.progress(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_is_a_noop() {
        let (engine, cue) = engine(1, 1);
        engine.start();
        engine.start();
        run_for(61.0).await;
        assert_eq!(cue.played.load(Ordering::SeqCst), 1);
    }
}
