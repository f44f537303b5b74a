use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::countdown::CountdownTimer;
use crate::levels::{Difficulty, LevelConfig, LevelTable};
use crate::match_core::{CascadeAdvance, EngineHooks, EngineStatus, MatchCore, Vec2i};

/// One full play session: the board simulation plus the countdown and level
/// progression wired to it. This is the surface input and presentation
/// layers talk to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    core: MatchCore,
    countdown: CountdownTimer,
    difficulty: Difficulty,
    levels: LevelTable,
    current_level: LevelConfig,
    #[serde(default)]
    total_score: u32,
}

impl GameState {
    pub fn new(difficulty: Difficulty, seed: u64) -> Self {
        Self::with_level_table(difficulty, seed, LevelTable::builtin(difficulty))
    }

    pub fn with_level_table(difficulty: Difficulty, seed: u64, levels: LevelTable) -> Self {
        let current_level = levels.level_for_score(0);
        let mut core = MatchCore::new(seed, difficulty.gem_kind_count());
        core.init_grid();
        Self {
            core,
            countdown: CountdownTimer::new(current_level.time_limit_secs),
            difficulty,
            levels,
            current_level,
            total_score: 0,
        }
    }

    /// Swap request from the input layer. Every accepted swap arms or
    /// refreshes the countdown, whether or not it ends up matching.
    pub fn swap_gems(&mut self, a: Vec2i, b: Vec2i) -> bool {
        if !self.core.request_swap(a, b) {
            return false;
        }
        if self.countdown.is_started() {
            self.countdown.reset(self.current_level.time_limit_secs);
        } else {
            self.countdown.start(self.current_level.time_limit_secs);
        }
        true
    }

    /// Frame driver: advances the cascade machine, re-arms the countdown on
    /// every scored step, then feeds the countdown itself.
    pub fn advance<H: EngineHooks>(&mut self, dt: Duration, hooks: &mut H) -> CascadeAdvance {
        let dt_ms = dt.as_millis().min(u32::MAX as u128) as u32;
        let outcome = self.core.advance(dt_ms, hooks);
        if outcome == CascadeAdvance::MatchStep {
            self.countdown.reset(self.current_level.time_limit_secs);
        }
        if self.countdown.advance(dt) {
            hooks.on_time_up();
        }
        outcome
    }

    pub fn update_animations(&mut self) {
        self.core.update_animations();
    }

    /// The consumer owns cumulative scoring (it may add bonuses of its own);
    /// pushing the total here drives level progression. Crossing a band
    /// refreshes the countdown to the new budget.
    pub fn update_score<H: EngineHooks>(&mut self, total_score: u32, hooks: &mut H) {
        self.total_score = total_score;
        let next = self.levels.level_for_score(total_score);
        if next.level != self.current_level.level {
            let old_level = self.current_level.level;
            self.current_level = next;
            self.countdown.reset(next.time_limit_secs);
            hooks.on_level_change(old_level, next.level, &next);
        }
    }

    pub fn pause_timer(&mut self) {
        self.countdown.pause();
    }

    pub fn resume_timer(&mut self) {
        self.countdown.resume();
    }

    pub fn time_remaining(&self) -> u32 {
        self.countdown.remaining_secs()
    }

    pub fn is_timer_started(&self) -> bool {
        self.countdown.is_started()
    }

    pub fn current_level(&self) -> LevelConfig {
        self.current_level
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    pub fn status(&self) -> EngineStatus {
        self.core.status()
    }

    pub fn core(&self) -> &MatchCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut MatchCore {
        &mut self.core
    }

    /// Wind the session back to a pristine pre-first-move state: countdown
    /// torn down and re-created unarmed, score and level progression
    /// cleared. The board is left as-is for the caller to re-init or drop.
    pub fn destroy(&mut self) {
        self.total_score = 0;
        self.current_level = self.levels.level_for_score(0);
        self.countdown = CountdownTimer::new(self.current_level.time_limit_secs);
    }
}
