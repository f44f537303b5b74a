use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::levels::{LevelConfig, MAX_GEM_KINDS};
use crate::rng::Rng;

pub const GRID_SIZE: usize = 6;
pub const BASE_SCORE: u32 = 100;
pub const MATCH_MIN_RUN: usize = 3;

pub const SWAP_BEAT_MS: u32 = 250;
pub const MATCH_BEAT_MS: u32 = 450;
pub const FALL_BEAT_MS: u32 = 350;
pub const REFILL_BEAT_MS: u32 = 400;

pub const MAX_CASCADE_STEPS: u32 = 50;
pub const GEM_SPAWN_ATTEMPTS: u32 = 100;

/// Fraction of the remaining distance covered per animation frame.
const ANIM_CONVERGENCE: f32 = 0.25;

pub type GemId = u32;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Vec2i {
    pub x: i32,
    pub y: i32,
}

impl Vec2i {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: Vec2i) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// One grid token. Logical coordinates are owned by the cascade machinery;
/// the visual fields are owned by the animation tick and trail the logical
/// position each frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gem {
    pub id: GemId,
    pub kind: u8,
    pub grid_x: i32,
    pub grid_y: i32,
    pub visual_x: f32,
    pub visual_y: f32,
    pub matched: bool,
    pub alpha: f32,
    pub scale: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineStatus {
    Idle,
    Swapping,
    Matching,
    Falling,
    Refilling,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
enum Phase {
    #[default]
    Idle,
    Swapping {
        a: Vec2i,
        b: Vec2i,
        elapsed_ms: u32,
        duration_ms: u32,
    },
    Reverting {
        elapsed_ms: u32,
        duration_ms: u32,
    },
    Matching {
        elapsed_ms: u32,
        duration_ms: u32,
    },
    Falling {
        elapsed_ms: u32,
        duration_ms: u32,
    },
    Refilling {
        elapsed_ms: u32,
        duration_ms: u32,
    },
}

/// What a single `advance` call did, so callers can re-arm timers and
/// react to terminal conditions without polling grid internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeAdvance {
    /// No transition in flight.
    Idle,
    /// A beat is still playing out.
    Animating,
    /// A match step just scored.
    MatchStep,
    /// A matchless swap snapped back.
    Reverted,
    /// Cascade resolved; further moves exist.
    Settled,
    /// Cascade resolved and no adjacent swap can match.
    NoMoves,
}

/// Hook interface for gameplay events.
///
/// Intentionally free of grid internals so presentation layers can subscribe
/// without depending on cascade state. Everything except scoring defaults to
/// a no-op.
pub trait EngineHooks {
    fn on_score(&mut self, score_delta: u32, combo: u32);
    fn on_match(&mut self, _cleared: &[Gem]) {}
    fn on_no_moves(&mut self) {}
    fn on_time_up(&mut self) {}
    fn on_level_change(&mut self, _old_level: u32, _new_level: u32, _config: &LevelConfig) {}
}

/// Owned snapshot of the board for rendering and golden assertions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreSnapshot {
    pub kinds: Vec<Vec<Option<u8>>>,
    pub status: EngineStatus,
    pub combo: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCore {
    grid: Vec<Vec<Option<Gem>>>,
    #[serde(default)]
    phase: Phase,
    #[serde(default)]
    combo: u32,
    #[serde(default)]
    cascade_steps: u32,
    #[serde(default)]
    next_gem_id: GemId,
    gem_kind_count: u8,
    rng: Rng,
}

impl MatchCore {
    pub fn new(seed: u64, gem_kind_count: u8) -> Self {
        Self {
            grid: vec![vec![None; GRID_SIZE]; GRID_SIZE],
            phase: Phase::Idle,
            combo: 0,
            cascade_steps: 0,
            next_gem_id: 1,
            gem_kind_count: gem_kind_count.clamp(1, MAX_GEM_KINDS),
            rng: Rng::new(seed),
        }
    }

    /// Fill every cell with a random gem, re-rolling (up to
    /// [`GEM_SPAWN_ATTEMPTS`] times per cell) any placement that would
    /// complete a run with its left or upper neighbors. Best effort: after
    /// the attempt budget the last roll stands, so a freshly filled grid is
    /// run-free in practice but not by construction.
    pub fn init_grid(&mut self) {
        self.grid = vec![vec![None; GRID_SIZE]; GRID_SIZE];
        for y in 0..GRID_SIZE {
            for x in 0..GRID_SIZE {
                for _ in 0..GEM_SPAWN_ATTEMPTS {
                    let gem = self.create_gem(x as i32, y as i32, None);
                    self.grid[y][x] = Some(gem);
                    if !self.seeds_immediate_run(x, y) {
                        break;
                    }
                }
            }
        }
        self.phase = Phase::Idle;
        self.combo = 0;
        self.cascade_steps = 0;
    }

    /// Whether the gem at (x, y) completes a leftward or upward run.
    /// Cells to the right and below are not consulted; during initial fill
    /// they are still empty.
    fn seeds_immediate_run(&self, x: usize, y: usize) -> bool {
        let (xi, yi) = (x as i32, y as i32);
        let Some(kind) = self.kind_at(xi, yi) else {
            return false;
        };
        if x >= 2
            && self.kind_at(xi - 1, yi) == Some(kind)
            && self.kind_at(xi - 2, yi) == Some(kind)
        {
            return true;
        }
        if y >= 2
            && self.kind_at(xi, yi - 1) == Some(kind)
            && self.kind_at(xi, yi - 2) == Some(kind)
        {
            return true;
        }
        false
    }

    /// Mint a gem with a fresh id. `kind` of `None` rolls uniformly over the
    /// configured kind count. The visual position starts on the logical cell.
    pub fn create_gem(&mut self, x: i32, y: i32, kind: Option<u8>) -> Gem {
        let id = self.next_gem_id;
        self.next_gem_id = self.next_gem_id.wrapping_add(1);
        let kind = kind.unwrap_or_else(|| self.rng.next_range(self.gem_kind_count as u32) as u8);
        Gem {
            id,
            kind,
            grid_x: x,
            grid_y: y,
            visual_x: x as f32,
            visual_y: y as f32,
            matched: false,
            alpha: 1.0,
            scale: 1.0,
        }
    }

    /// Every cell belonging to a horizontal or vertical run of
    /// [`MATCH_MIN_RUN`]+ equal kinds, deduplicated, in scan order.
    pub fn find_matches(&self) -> Vec<Vec2i> {
        let mut seen: HashSet<Vec2i> = HashSet::new();
        let mut out: Vec<Vec2i> = Vec::new();

        for y in 0..GRID_SIZE as i32 {
            let mut run: Vec<Vec2i> = Vec::new();
            let mut run_kind: Option<u8> = None;
            for x in 0..GRID_SIZE as i32 {
                let kind = self.kind_at(x, y);
                if kind.is_some() && kind == run_kind {
                    run.push(Vec2i::new(x, y));
                } else {
                    collect_run(&run, &mut seen, &mut out);
                    run.clear();
                    run_kind = kind;
                    if kind.is_some() {
                        run.push(Vec2i::new(x, y));
                    }
                }
            }
            collect_run(&run, &mut seen, &mut out);
        }

        for x in 0..GRID_SIZE as i32 {
            let mut run: Vec<Vec2i> = Vec::new();
            let mut run_kind: Option<u8> = None;
            for y in 0..GRID_SIZE as i32 {
                let kind = self.kind_at(x, y);
                if kind.is_some() && kind == run_kind {
                    run.push(Vec2i::new(x, y));
                } else {
                    collect_run(&run, &mut seen, &mut out);
                    run.clear();
                    run_kind = kind;
                    if kind.is_some() {
                        run.push(Vec2i::new(x, y));
                    }
                }
            }
            collect_run(&run, &mut seen, &mut out);
        }

        out
    }

    /// Hypothetically swap two cells and report whether a run would form.
    /// The cells are swapped back before returning; gem coordinate fields
    /// are never touched, so the probe leaves the grid bit-identical.
    pub fn would_create_match(&mut self, a: Vec2i, b: Vec2i) -> bool {
        if !in_bounds(a) || !in_bounds(b) || a == b {
            return false;
        }
        if self.cell(a).is_none() || self.cell(b).is_none() {
            return false;
        }
        self.swap_cells_only(a, b);
        let found = !self.find_matches().is_empty();
        self.swap_cells_only(a, b);
        found
    }

    /// Probe every rightward and downward adjacent swap for a hypothetical
    /// match. Left/up swaps are the mirror of a neighbor's probe and are
    /// skipped.
    pub fn has_possible_moves(&mut self) -> bool {
        for y in 0..GRID_SIZE as i32 {
            for x in 0..GRID_SIZE as i32 {
                let here = Vec2i::new(x, y);
                if self.cell(here).is_none() {
                    continue;
                }
                if x + 1 < GRID_SIZE as i32 && self.would_create_match(here, Vec2i::new(x + 1, y))
                {
                    return true;
                }
                if y + 1 < GRID_SIZE as i32 && self.would_create_match(here, Vec2i::new(x, y + 1))
                {
                    return true;
                }
            }
        }
        false
    }

    /// Begin a swap transition. Rejected (returning `false`, grid untouched)
    /// unless the engine is idle, the cells are 4-adjacent, and both are
    /// occupied.
    pub fn request_swap(&mut self, a: Vec2i, b: Vec2i) -> bool {
        if !matches!(self.phase, Phase::Idle) {
            return false;
        }
        if !in_bounds(a) || !in_bounds(b) || a.manhattan(b) != 1 {
            return false;
        }
        if self.cell(a).is_none() || self.cell(b).is_none() {
            return false;
        }

        self.swap_gems_at(a, b);
        self.phase = Phase::Swapping {
            a,
            b,
            elapsed_ms: 0,
            duration_ms: SWAP_BEAT_MS,
        };
        true
    }

    /// Advance the transition machine by `dt_ms`. At most one phase boundary
    /// is crossed per call; leftover time inside a beat is not carried over
    /// the boundary.
    pub fn advance<H: EngineHooks>(&mut self, dt_ms: u32, hooks: &mut H) -> CascadeAdvance {
        match self.phase {
            Phase::Idle => CascadeAdvance::Idle,
            Phase::Swapping {
                a,
                b,
                elapsed_ms,
                duration_ms,
            } => {
                let elapsed_ms = elapsed_ms.saturating_add(dt_ms);
                if elapsed_ms < duration_ms {
                    self.phase = Phase::Swapping {
                        a,
                        b,
                        elapsed_ms,
                        duration_ms,
                    };
                    return CascadeAdvance::Animating;
                }
                let matches = self.find_matches();
                if matches.is_empty() {
                    self.swap_gems_at(a, b);
                    self.phase = Phase::Reverting {
                        elapsed_ms: 0,
                        duration_ms: SWAP_BEAT_MS,
                    };
                    CascadeAdvance::Animating
                } else {
                    self.combo = 1;
                    self.cascade_steps = 0;
                    self.begin_match_step(&matches, hooks);
                    CascadeAdvance::MatchStep
                }
            }
            Phase::Reverting {
                elapsed_ms,
                duration_ms,
            } => {
                let elapsed_ms = elapsed_ms.saturating_add(dt_ms);
                if elapsed_ms < duration_ms {
                    self.phase = Phase::Reverting {
                        elapsed_ms,
                        duration_ms,
                    };
                    return CascadeAdvance::Animating;
                }
                self.phase = Phase::Idle;
                CascadeAdvance::Reverted
            }
            Phase::Matching {
                elapsed_ms,
                duration_ms,
            } => {
                let elapsed_ms = elapsed_ms.saturating_add(dt_ms);
                if elapsed_ms < duration_ms {
                    self.phase = Phase::Matching {
                        elapsed_ms,
                        duration_ms,
                    };
                    return CascadeAdvance::Animating;
                }
                self.clear_matched();
                self.apply_gravity();
                self.phase = Phase::Falling {
                    elapsed_ms: 0,
                    duration_ms: FALL_BEAT_MS,
                };
                CascadeAdvance::Animating
            }
            Phase::Falling {
                elapsed_ms,
                duration_ms,
            } => {
                let elapsed_ms = elapsed_ms.saturating_add(dt_ms);
                if elapsed_ms < duration_ms {
                    self.phase = Phase::Falling {
                        elapsed_ms,
                        duration_ms,
                    };
                    return CascadeAdvance::Animating;
                }
                self.refill();
                self.phase = Phase::Refilling {
                    elapsed_ms: 0,
                    duration_ms: REFILL_BEAT_MS,
                };
                CascadeAdvance::Animating
            }
            Phase::Refilling {
                elapsed_ms,
                duration_ms,
            } => {
                let elapsed_ms = elapsed_ms.saturating_add(dt_ms);
                if elapsed_ms < duration_ms {
                    self.phase = Phase::Refilling {
                        elapsed_ms,
                        duration_ms,
                    };
                    return CascadeAdvance::Animating;
                }
                let matches = self.find_matches();
                if !matches.is_empty() {
                    if self.cascade_steps >= MAX_CASCADE_STEPS {
                        debug_assert!(
                            self.cascade_steps < MAX_CASCADE_STEPS,
                            "cascade did not settle within {MAX_CASCADE_STEPS} steps"
                        );
                        return self.finish_cascade(hooks);
                    }
                    self.combo = self.combo.saturating_add(1);
                    self.begin_match_step(&matches, hooks);
                    return CascadeAdvance::MatchStep;
                }
                self.settle(hooks)
            }
        }
    }

    fn begin_match_step<H: EngineHooks>(&mut self, positions: &[Vec2i], hooks: &mut H) {
        self.cascade_steps = self.cascade_steps.saturating_add(1);
        let mut cleared: Vec<Gem> = Vec::with_capacity(positions.len());
        for &p in positions {
            if let Some(gem) = self.cell_mut(p) {
                gem.matched = true;
                cleared.push(*gem);
            }
        }
        let delta = (cleared.len() as u32)
            .saturating_mul(BASE_SCORE)
            .saturating_mul(self.combo);
        hooks.on_score(delta, self.combo);
        hooks.on_match(&cleared);
        self.phase = Phase::Matching {
            elapsed_ms: 0,
            duration_ms: MATCH_BEAT_MS,
        };
    }

    fn settle<H: EngineHooks>(&mut self, hooks: &mut H) -> CascadeAdvance {
        // A run that slipped past the refill re-scan must re-enter the
        // cascade rather than sit matched on an idle board.
        let residual = self.find_matches();
        if !residual.is_empty() {
            self.combo = 1;
            self.begin_match_step(&residual, hooks);
            return CascadeAdvance::MatchStep;
        }
        self.finish_cascade(hooks)
    }

    fn finish_cascade<H: EngineHooks>(&mut self, hooks: &mut H) -> CascadeAdvance {
        self.phase = Phase::Idle;
        self.combo = 0;
        self.cascade_steps = 0;
        if self.has_possible_moves() {
            CascadeAdvance::Settled
        } else {
            hooks.on_no_moves();
            CascadeAdvance::NoMoves
        }
    }

    fn clear_matched(&mut self) {
        for row in &mut self.grid {
            for cell in row {
                if cell.is_some_and(|gem| gem.matched) {
                    *cell = None;
                }
            }
        }
    }

    /// Compact each column downward, preserving relative order. Only logical
    /// coordinates move; visuals trail via the animation tick.
    fn apply_gravity(&mut self) {
        for x in 0..GRID_SIZE {
            let mut empty = 0usize;
            for y in (0..GRID_SIZE).rev() {
                if self.grid[y][x].is_none() {
                    empty += 1;
                } else if empty > 0 {
                    if let Some(mut gem) = self.grid[y][x].take() {
                        gem.grid_y = (y + empty) as i32;
                        self.grid[y + empty][x] = Some(gem);
                    }
                }
            }
        }
    }

    /// Fill the holes gravity left at the top of each column. New gems start
    /// above the board, staggered by how many the column is missing, so they
    /// visually drop in.
    fn refill(&mut self) {
        for x in 0..GRID_SIZE {
            let mut missing = 0usize;
            for y in (0..GRID_SIZE).rev() {
                if self.grid[y][x].is_none() {
                    missing += 1;
                    let mut gem = self.create_gem(x as i32, y as i32, None);
                    gem.visual_y = -(missing as f32) - 0.5;
                    self.grid[y][x] = Some(gem);
                }
            }
        }
    }

    /// Ease every gem's visual fields toward their targets. Runs every frame
    /// independent of the transition machine and touches nothing the cascade
    /// owns.
    pub fn update_animations(&mut self) {
        for row in &mut self.grid {
            for cell in row {
                let Some(gem) = cell.as_mut() else { continue };
                gem.visual_x += (gem.grid_x as f32 - gem.visual_x) * ANIM_CONVERGENCE;
                gem.visual_y += (gem.grid_y as f32 - gem.visual_y) * ANIM_CONVERGENCE;
                let target = if gem.matched { 0.0 } else { 1.0 };
                gem.scale += (target - gem.scale) * ANIM_CONVERGENCE;
                gem.alpha += (target - gem.alpha) * ANIM_CONVERGENCE;
            }
        }
    }

    pub fn grid(&self) -> &[Vec<Option<Gem>>] {
        &self.grid
    }

    pub fn gem_at(&self, x: i32, y: i32) -> Option<&Gem> {
        if !in_bounds(Vec2i::new(x, y)) {
            return None;
        }
        self.grid[y as usize][x as usize].as_ref()
    }

    pub fn status(&self) -> EngineStatus {
        match self.phase {
            Phase::Idle => EngineStatus::Idle,
            Phase::Swapping { .. } | Phase::Reverting { .. } => EngineStatus::Swapping,
            Phase::Matching { .. } => EngineStatus::Matching,
            Phase::Falling { .. } => EngineStatus::Falling,
            Phase::Refilling { .. } => EngineStatus::Refilling,
        }
    }

    /// Normalized progress through the current beat, for render easing.
    pub fn phase_progress(&self) -> f32 {
        let (elapsed_ms, duration_ms) = match self.phase {
            Phase::Idle => return 0.0,
            Phase::Swapping {
                elapsed_ms,
                duration_ms,
                ..
            }
            | Phase::Reverting {
                elapsed_ms,
                duration_ms,
            }
            | Phase::Matching {
                elapsed_ms,
                duration_ms,
            }
            | Phase::Falling {
                elapsed_ms,
                duration_ms,
            }
            | Phase::Refilling {
                elapsed_ms,
                duration_ms,
            } => (elapsed_ms, duration_ms),
        };
        if duration_ms == 0 {
            1.0
        } else {
            (elapsed_ms as f32 / duration_ms as f32).clamp(0.0, 1.0)
        }
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn gem_kind_count(&self) -> u8 {
        self.gem_kind_count
    }

    pub fn snapshot(&self) -> CoreSnapshot {
        CoreSnapshot {
            kinds: self
                .grid
                .iter()
                .map(|row| row.iter().map(|cell| cell.map(|gem| gem.kind)).collect())
                .collect(),
            status: self.status(),
            combo: self.combo,
        }
    }

    /// Canonical digest of kinds and logical coordinates, for golden and
    /// idempotence assertions. Visual fields are excluded; the animation
    /// tick mutates them freely.
    pub fn state_digest(&self) -> String {
        let mut hasher = Sha256::new();
        for row in &self.grid {
            for cell in row {
                match cell {
                    Some(gem) => {
                        hasher.update([1u8, gem.kind]);
                        hasher.update(gem.grid_x.to_le_bytes());
                        hasher.update(gem.grid_y.to_le_bytes());
                    }
                    None => hasher.update([0u8; 10]),
                }
            }
        }
        hex::encode(hasher.finalize())
    }

    /// Place a fresh gem of `kind`, replacing whatever occupies the cell.
    /// Scenario seam for hand-built boards.
    pub fn set_gem(&mut self, x: usize, y: usize, kind: u8) {
        if y < GRID_SIZE && x < GRID_SIZE {
            let gem = self.create_gem(x as i32, y as i32, Some(kind));
            self.grid[y][x] = Some(gem);
        }
    }

    fn kind_at(&self, x: i32, y: i32) -> Option<u8> {
        self.gem_at(x, y).map(|gem| gem.kind)
    }

    fn cell(&self, p: Vec2i) -> Option<&Gem> {
        self.grid[p.y as usize][p.x as usize].as_ref()
    }

    fn cell_mut(&mut self, p: Vec2i) -> Option<&mut Gem> {
        self.grid[p.y as usize][p.x as usize].as_mut()
    }

    /// Exchange two cells without touching gem coordinate fields.
    fn swap_cells_only(&mut self, a: Vec2i, b: Vec2i) {
        let tmp = self.grid[a.y as usize][a.x as usize].take();
        self.grid[a.y as usize][a.x as usize] = self.grid[b.y as usize][b.x as usize].take();
        self.grid[b.y as usize][b.x as usize] = tmp;
    }

    /// Exchange two cells and keep each gem's logical coordinates in step.
    fn swap_gems_at(&mut self, a: Vec2i, b: Vec2i) {
        self.swap_cells_only(a, b);
        if let Some(gem) = self.cell_mut(a) {
            gem.grid_x = a.x;
            gem.grid_y = a.y;
        }
        if let Some(gem) = self.cell_mut(b) {
            gem.grid_x = b.x;
            gem.grid_y = b.y;
        }
    }
}

fn in_bounds(p: Vec2i) -> bool {
    p.x >= 0 && p.x < GRID_SIZE as i32 && p.y >= 0 && p.y < GRID_SIZE as i32
}

fn collect_run(run: &[Vec2i], seen: &mut HashSet<Vec2i>, out: &mut Vec<Vec2i>) {
    if run.len() < MATCH_MIN_RUN {
        return;
    }
    for &p in run {
        if seen.insert(p) {
            out.push(p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingHooks {
        scores: Vec<(u32, u32)>,
    }

    impl CountingHooks {
        fn new() -> Self {
            Self { scores: Vec::new() }
        }
    }

    impl EngineHooks for CountingHooks {
        fn on_score(&mut self, score_delta: u32, combo: u32) {
            self.scores.push((score_delta, combo));
        }
    }

    fn core_with_kinds(kinds: [[u8; GRID_SIZE]; GRID_SIZE]) -> MatchCore {
        let mut core = MatchCore::new(1, 8);
        for (y, row) in kinds.iter().enumerate() {
            for (x, &kind) in row.iter().enumerate() {
                core.set_gem(x, y, kind);
            }
        }
        core
    }

    // No row or column holds three equal adjacent kinds.
    const QUIET: [[u8; GRID_SIZE]; GRID_SIZE] = [
        [0, 1, 2, 0, 1, 2],
        [1, 2, 0, 1, 2, 0],
        [2, 0, 1, 2, 0, 1],
        [0, 1, 2, 0, 1, 2],
        [1, 2, 0, 1, 2, 0],
        [2, 0, 1, 2, 0, 1],
    ];

    #[test]
    fn quiet_grid_has_no_matches() {
        let core = core_with_kinds(QUIET);
        assert!(core.find_matches().is_empty());
    }

    #[test]
    fn horizontal_run_is_detected() {
        let mut kinds = QUIET;
        kinds[3] = [5, 5, 5, 0, 1, 2];
        let core = core_with_kinds(kinds);
        let matches = core.find_matches();
        assert_eq!(matches.len(), 3);
        assert!(matches.contains(&Vec2i::new(0, 3)));
        assert!(matches.contains(&Vec2i::new(1, 3)));
        assert!(matches.contains(&Vec2i::new(2, 3)));
    }

    #[test]
    fn vertical_run_is_detected() {
        let mut kinds = QUIET;
        kinds[1][4] = 6;
        kinds[2][4] = 6;
        kinds[3][4] = 6;
        let core = core_with_kinds(kinds);
        let matches = core.find_matches();
        assert_eq!(matches.len(), 3);
        assert!(matches.contains(&Vec2i::new(4, 2)));
    }

    #[test]
    fn crossing_runs_count_shared_cell_once() {
        let mut kinds = QUIET;
        // Horizontal run through (1,2) and vertical run through the same cell.
        kinds[2] = [7, 7, 7, 2, 0, 1];
        kinds[1][1] = 7;
        kinds[3][1] = 7;
        let core = core_with_kinds(kinds);
        let matches = core.find_matches();
        assert_eq!(matches.len(), 5);
    }

    #[test]
    fn run_of_four_reports_every_member() {
        let mut kinds = QUIET;
        kinds[0] = [4, 4, 4, 4, 1, 2];
        let core = core_with_kinds(kinds);
        assert_eq!(core.find_matches().len(), 4);
    }

    #[test]
    fn probe_restores_grid_exactly() {
        let mut kinds = QUIET;
        kinds[5] = [3, 4, 3, 3, 0, 1];
        let mut core = core_with_kinds(kinds);
        let before = core.state_digest();

        // Swapping (0,5) with (1,5) lines up kinds 3-3-3; the far corner
        // swap lines up nothing.
        assert!(core.would_create_match(Vec2i::new(0, 5), Vec2i::new(1, 5)));
        assert!(!core.would_create_match(Vec2i::new(4, 5), Vec2i::new(5, 5)));
        for _ in 0..10 {
            core.would_create_match(Vec2i::new(0, 5), Vec2i::new(1, 5));
        }
        assert_eq!(core.state_digest(), before);
    }

    #[test]
    fn possible_moves_found_on_quiet_grid_with_setup() {
        let mut kinds = QUIET;
        kinds[5] = [3, 4, 3, 3, 0, 1];
        let mut core = core_with_kinds(kinds);
        assert!(core.has_possible_moves());
    }

    #[test]
    fn swap_rejected_unless_adjacent_and_idle() {
        let mut core = core_with_kinds(QUIET);
        assert!(!core.request_swap(Vec2i::new(0, 0), Vec2i::new(2, 0)));
        assert!(!core.request_swap(Vec2i::new(0, 0), Vec2i::new(1, 1)));
        assert!(!core.request_swap(Vec2i::new(0, 0), Vec2i::new(0, 0)));
        assert!(!core.request_swap(Vec2i::new(-1, 0), Vec2i::new(0, 0)));

        assert!(core.request_swap(Vec2i::new(0, 0), Vec2i::new(1, 0)));
        assert_eq!(core.status(), EngineStatus::Swapping);
        // Mid-transition requests are dropped.
        assert!(!core.request_swap(Vec2i::new(3, 3), Vec2i::new(4, 3)));
    }

    #[test]
    fn accepted_swap_moves_logical_coordinates() {
        let mut core = core_with_kinds(QUIET);
        let a_kind = core.gem_at(0, 0).unwrap().kind;
        let b_kind = core.gem_at(1, 0).unwrap().kind;
        assert!(core.request_swap(Vec2i::new(0, 0), Vec2i::new(1, 0)));

        let a = core.gem_at(0, 0).unwrap();
        let b = core.gem_at(1, 0).unwrap();
        assert_eq!(a.kind, b_kind);
        assert_eq!(b.kind, a_kind);
        assert_eq!((a.grid_x, a.grid_y), (0, 0));
        assert_eq!((b.grid_x, b.grid_y), (1, 0));
    }

    #[test]
    fn matchless_swap_reverts_and_reports() {
        let mut core = core_with_kinds(QUIET);
        let before = core.state_digest();
        let mut hooks = CountingHooks::new();

        assert!(core.request_swap(Vec2i::new(0, 0), Vec2i::new(1, 0)));
        assert_eq!(core.advance(SWAP_BEAT_MS, &mut hooks), CascadeAdvance::Animating);
        assert_eq!(core.status(), EngineStatus::Swapping);
        assert_eq!(core.advance(SWAP_BEAT_MS, &mut hooks), CascadeAdvance::Reverted);
        assert_eq!(core.status(), EngineStatus::Idle);
        assert_eq!(core.state_digest(), before);
        assert!(hooks.scores.is_empty());
    }

    #[test]
    fn gravity_compacts_columns_preserving_order() {
        let mut core = core_with_kinds(QUIET);
        let upper = core.gem_at(2, 0).unwrap().id;
        let lower = core.gem_at(2, 2).unwrap().id;
        // Punch two holes in column 2.
        core.grid[1][2] = None;
        core.grid[3][2] = None;

        core.apply_gravity();
        assert!(core.gem_at(2, 0).is_none());
        assert!(core.gem_at(2, 1).is_none());
        assert_eq!(core.gem_at(2, 2).unwrap().id, upper);
        assert_eq!(core.gem_at(2, 3).unwrap().id, lower);
        assert_eq!(core.gem_at(2, 3).unwrap().grid_y, 3);
    }

    #[test]
    fn refill_fills_holes_with_offscreen_visuals() {
        let mut core = core_with_kinds(QUIET);
        for y in 0..3 {
            core.grid[y][4] = None;
        }
        core.refill();

        for y in 0..GRID_SIZE {
            assert!(core.gem_at(4, y as i32).is_some());
        }
        let g0 = core.gem_at(4, 0).unwrap();
        let g2 = core.gem_at(4, 2).unwrap();
        assert!(g0.visual_y < 0.0);
        assert!(g2.visual_y < 0.0);
        // The bottom-most hole is filled first, so it sits closest above
        // the board.
        assert!(g2.visual_y > g0.visual_y);
        assert!(g0.kind < core.gem_kind_count());
    }

    #[test]
    fn init_grid_is_full_and_run_free() {
        for seed in [1u64, 7, 42, 1234, 99999] {
            let mut core = MatchCore::new(seed, 3);
            core.init_grid();
            for y in 0..GRID_SIZE as i32 {
                for x in 0..GRID_SIZE as i32 {
                    assert!(core.gem_at(x, y).is_some());
                }
            }
            assert!(
                core.find_matches().is_empty(),
                "seed {seed} produced a pre-matched grid"
            );
        }
    }

    #[test]
    fn created_gems_have_unique_ids() {
        let mut core = MatchCore::new(5, 4);
        core.init_grid();
        let mut ids = HashSet::new();
        for y in 0..GRID_SIZE as i32 {
            for x in 0..GRID_SIZE as i32 {
                assert!(ids.insert(core.gem_at(x, y).unwrap().id));
            }
        }
    }

    #[test]
    fn animation_tick_eases_visuals_and_leaves_logic_alone() {
        let mut core = core_with_kinds(QUIET);
        if let Some(gem) = core.cell_mut(Vec2i::new(3, 3)) {
            gem.visual_x = 0.0;
            gem.visual_y = 0.0;
        }
        let digest = core.state_digest();
        for _ in 0..60 {
            core.update_animations();
        }
        let gem = core.gem_at(3, 3).unwrap();
        assert!((gem.visual_x - 3.0).abs() < 1e-3);
        assert!((gem.visual_y - 3.0).abs() < 1e-3);
        assert_eq!(core.state_digest(), digest);
    }

    #[test]
    fn matched_gems_fade_toward_zero() {
        let mut core = core_with_kinds(QUIET);
        if let Some(gem) = core.cell_mut(Vec2i::new(1, 1)) {
            gem.matched = true;
        }
        for _ in 0..60 {
            core.update_animations();
        }
        let gem = core.gem_at(1, 1).unwrap();
        assert!(gem.alpha < 1e-3);
        assert!(gem.scale < 1e-3);
    }
}
