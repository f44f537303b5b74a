//! Headless scripted driving: fixed-dt stepping that stands in for the
//! host's frame loop, plus an event recorder for assertions.

use std::time::Duration;

use crate::levels::LevelConfig;
use crate::match_core::{CascadeAdvance, EngineHooks, Gem, Vec2i};
use crate::state::GameState;

pub const DEFAULT_STEP: Duration = Duration::from_millis(50);

const SETTLE_STEP_BUDGET: u32 = 4_000;

/// Records every emitted event for later inspection.
#[derive(Debug, Default)]
pub struct RecordingHooks {
    pub scores: Vec<(u32, u32)>,
    pub match_sizes: Vec<usize>,
    pub no_moves_events: u32,
    pub time_up_events: u32,
    /// (old level, new level, new time limit)
    pub level_changes: Vec<(u32, u32, u32)>,
}

impl EngineHooks for RecordingHooks {
    fn on_score(&mut self, score_delta: u32, combo: u32) {
        self.scores.push((score_delta, combo));
    }

    fn on_match(&mut self, cleared: &[Gem]) {
        self.match_sizes.push(cleared.len());
    }

    fn on_no_moves(&mut self) {
        self.no_moves_events += 1;
    }

    fn on_time_up(&mut self) {
        self.time_up_events += 1;
    }

    fn on_level_change(&mut self, old_level: u32, new_level: u32, config: &LevelConfig) {
        self.level_changes.push((old_level, new_level, config.time_limit_secs));
    }
}

#[derive(Debug)]
pub struct ScriptedRun {
    state: GameState,
    step: Duration,
}

impl ScriptedRun {
    pub fn new(state: GameState) -> Self {
        Self::with_step(state, DEFAULT_STEP)
    }

    pub fn with_step(state: GameState, step: Duration) -> Self {
        Self { state, step }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// Pump fixed steps until the cascade machine reaches idle; returns the
    /// outcome that got it there (or `Idle` if it already was).
    pub fn settle<H: EngineHooks>(&mut self, hooks: &mut H) -> CascadeAdvance {
        for _ in 0..SETTLE_STEP_BUDGET {
            let outcome = self.state.advance(self.step, hooks);
            self.state.update_animations();
            match outcome {
                CascadeAdvance::Animating | CascadeAdvance::MatchStep => {}
                CascadeAdvance::Idle
                | CascadeAdvance::Reverted
                | CascadeAdvance::Settled
                | CascadeAdvance::NoMoves => return outcome,
            }
        }
        debug_assert!(false, "scripted run failed to settle");
        CascadeAdvance::Idle
    }

    /// Request a swap and, if accepted, drive it to quiescence.
    pub fn swap_and_settle<H: EngineHooks>(
        &mut self,
        a: Vec2i,
        b: Vec2i,
        hooks: &mut H,
    ) -> Option<CascadeAdvance> {
        if !self.state.swap_gems(a, b) {
            return None;
        }
        Some(self.settle(hooks))
    }

    /// Let simulated time pass with no input, e.g. to run the countdown dry.
    pub fn idle_for<H: EngineHooks>(&mut self, total: Duration, hooks: &mut H) {
        let mut remaining = total;
        while remaining > Duration::ZERO {
            let dt = self.step.min(remaining);
            self.state.advance(dt, hooks);
            self.state.update_animations();
            remaining = remaining.saturating_sub(dt);
        }
    }
}
