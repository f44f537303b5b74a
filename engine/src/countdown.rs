use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-level countdown that races the player.
///
/// The timer is dt-driven: the host feeds frame deltas into [`advance`] and
/// whole seconds are consumed as they accumulate. It stays dormant until the
/// first [`start`], ignores time spent paused, and reports expiry exactly
/// once per session.
///
/// [`advance`]: CountdownTimer::advance
/// [`start`]: CountdownTimer::start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownTimer {
    remaining_secs: u32,
    carry_ms: u32,
    started: bool,
    paused: bool,
    stopped: bool,
    fired: bool,
}

impl CountdownTimer {
    pub fn new(initial_secs: u32) -> Self {
        Self {
            remaining_secs: initial_secs,
            carry_ms: 0,
            started: false,
            paused: false,
            stopped: false,
            fired: false,
        }
    }

    /// Latch the timer on with a full budget. Repeated calls are no-ops.
    pub fn start(&mut self, limit_secs: u32) {
        if self.started {
            return;
        }
        self.started = true;
        self.paused = false;
        self.remaining_secs = limit_secs;
        self.carry_ms = 0;
    }

    /// Refresh the remaining budget without touching the tick cadence.
    /// Has no effect before the first [`start`](CountdownTimer::start).
    pub fn reset(&mut self, limit_secs: u32) {
        if !self.started {
            return;
        }
        self.remaining_secs = limit_secs;
        self.carry_ms = 0;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Halt ticking while keeping `started` latched so displays keep
    /// reading the final value.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Feed elapsed wall time. Returns `true` exactly once, on the tick
    /// that drains the budget to zero. Paused time is discarded, not banked.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if !self.started || self.paused || self.stopped {
            return false;
        }

        let dt_ms = dt.as_millis().min(u32::MAX as u128) as u32;
        self.carry_ms = self.carry_ms.saturating_add(dt_ms);

        while self.carry_ms >= 1_000 {
            self.carry_ms -= 1_000;
            self.remaining_secs = self.remaining_secs.saturating_sub(1);
            if self.remaining_secs == 0 {
                self.stopped = true;
                self.carry_ms = 0;
                if !self.fired {
                    self.fired = true;
                    return true;
                }
                return false;
            }
        }
        false
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_expired(&self) -> bool {
        self.fired
    }
}
