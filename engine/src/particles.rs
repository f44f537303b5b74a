use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::match_core::Vec2i;
use crate::rng::Rng;

/// Reference frame length the velocity constants are tuned against.
const FRAME_MS: f32 = 16.0;
const GRAVITY_PER_FRAME: f32 = 20.0;
const UPWARD_DRIFT: f32 = 20.0;
const BURST_COUNT_MIN: u32 = 10;
const BURST_COUNT_SPREAD: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub rotation: f32,
    pub rotation_speed: f32,
    pub scale: f32,
    pub alpha: f32,
    pub life_ms: f32,
    pub max_life_ms: f32,
}

/// Petal bursts spawned where gems clear. Pure simulation: positions,
/// velocities and fade, ready for whatever draws them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    cell_size: f32,
    rng: Rng,
}

impl ParticleSystem {
    pub fn new(cell_size: f32, seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            cell_size,
            rng: Rng::new(seed),
        }
    }

    pub fn set_cell_size(&mut self, cell_size: f32) {
        self.cell_size = cell_size;
    }

    /// Scatter `count` petals from the center of a grid cell.
    pub fn spawn_burst(&mut self, cell: Vec2i, count: u32) {
        let center_x = cell.x as f32 * self.cell_size + self.cell_size / 2.0;
        let center_y = cell.y as f32 * self.cell_size + self.cell_size / 2.0;

        for i in 0..count {
            let angle = TAU * i as f32 / count.max(1) as f32 + self.rng.next_f32() * 0.5;
            let speed = 30.0 + self.rng.next_f32() * 40.0;
            let life_ms = 800.0 + self.rng.next_f32() * 400.0;
            self.particles.push(Particle {
                x: center_x,
                y: center_y,
                vx: angle.cos() * speed,
                vy: angle.sin() * speed - UPWARD_DRIFT,
                rotation: self.rng.next_f32() * TAU,
                rotation_speed: (self.rng.next_f32() - 0.5) * 0.1,
                scale: 0.5 + self.rng.next_f32() * 0.5,
                alpha: 1.0,
                life_ms,
                max_life_ms: life_ms,
            });
        }
    }

    /// One randomized burst per cleared cell.
    pub fn spawn_for_cells(&mut self, cells: &[Vec2i]) {
        for &cell in cells {
            let count = BURST_COUNT_MIN + self.rng.next_range(BURST_COUNT_SPREAD);
            self.spawn_burst(cell, count);
        }
    }

    /// Integrate one update: drift, fall, spin, fade, reap the dead.
    pub fn update(&mut self, dt_ms: f32) {
        let frame_scale = dt_ms / FRAME_MS;
        for p in &mut self.particles {
            p.x += p.vx * frame_scale;
            p.y += p.vy * frame_scale;
            p.vy += GRAVITY_PER_FRAME * frame_scale;
            p.rotation += p.rotation_speed;
            p.life_ms -= dt_ms;
            p.alpha = (p.life_ms / p.max_life_ms).max(0.0);
        }
        self.particles.retain(|p| p.life_ms > 0.0);
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bursts_spawn_from_cell_centers() {
        let mut fx = ParticleSystem::new(64.0, 3);
        fx.spawn_burst(Vec2i::new(2, 1), 12);
        assert_eq!(fx.particles().len(), 12);
        for p in fx.particles() {
            assert_eq!(p.x, 2.0 * 64.0 + 32.0);
            assert_eq!(p.y, 1.0 * 64.0 + 32.0);
            assert_eq!(p.alpha, 1.0);
            assert!(p.life_ms >= 800.0 && p.life_ms <= 1200.0);
        }
    }

    #[test]
    fn cell_batch_spawns_a_burst_per_cell() {
        let mut fx = ParticleSystem::new(32.0, 9);
        fx.spawn_for_cells(&[Vec2i::new(0, 0), Vec2i::new(1, 0), Vec2i::new(2, 0)]);
        assert!(fx.particles().len() >= 30);
        assert!(fx.particles().len() < 48);
    }

    #[test]
    fn update_moves_and_fades_particles() {
        let mut fx = ParticleSystem::new(64.0, 5);
        fx.spawn_burst(Vec2i::new(0, 0), 8);
        let before: Vec<Particle> = fx.particles().to_vec();

        fx.update(16.0);
        for (p, was) in fx.particles().iter().zip(&before) {
            assert!(p.alpha < was.alpha);
            assert!(p.life_ms < was.life_ms);
            assert!(p.vy > was.vy);
        }
    }

    #[test]
    fn particles_die_within_their_lifetime() {
        let mut fx = ParticleSystem::new(64.0, 7);
        fx.spawn_burst(Vec2i::new(3, 3), 16);
        for _ in 0..80 {
            fx.update(16.0);
        }
        assert!(fx.is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let mut fx = ParticleSystem::new(64.0, 11);
        fx.spawn_burst(Vec2i::new(0, 0), 4);
        fx.clear();
        assert!(fx.is_empty());
    }
}
