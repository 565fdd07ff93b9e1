//! Flow particle simulation.
//!
//! Every enabled connection carries a small, fixed pool of particles that
//! loop from source to target. Busier links get more, faster, larger and
//! brighter particles. Pools are rebuilt from scratch whenever the topology
//! is, since particles address their connection by index.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{LinkLoad, Topology};

/// Reference frame length the per-frame speeds are expressed in.
pub const FRAME: Duration = Duration::from_nanos(16_666_667);

/// Random spread of a particle's per-frame speed.
pub const SPEED_JITTER: f64 = 0.002;

/// Maximum perpendicular offset from the path, either side.
pub const LATERAL_SPREAD: f64 = 2.0;

/// `current / max(max, 1)`, clamped to `[0, 1]`. Non-finite input is idle.
pub fn usage_ratio(current: f64, max: f64) -> f64 {
    let ratio = current / max.max(1.0);
    if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 }
}

/// `max(1, round(2 + ratio * 4))`: two particles on an idle link, six on
/// the busiest.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
pub fn particle_count(ratio: f64) -> usize {
    let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
    ((2.0 + ratio * 4.0).round() as usize).max(1)
}

/// Visual and kinetic parameters derived from a link's usage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowProfile {
    pub count: usize,
    /// Slowest per-frame progress step.
    pub base_speed: f64,
    /// Width of the random speed band above `base_speed`.
    pub jitter: f64,
    pub size: f64,
    pub opacity: f64,
}

impl FlowProfile {
    pub fn for_ratio(ratio: f64) -> Self {
        let ratio = usage_ratio(ratio, 1.0);
        Self {
            count: particle_count(ratio),
            base_speed: 0.003 + 0.007 * ratio,
            jitter: SPEED_JITTER,
            size: 2.0 + 1.5 * ratio,
            opacity: 0.5 + 0.5 * ratio,
        }
    }

    pub fn for_load(load: &LinkLoad) -> Self {
        Self::for_ratio(load.usage_ratio)
    }
}

/// One visual token riding a connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Index into the owning topology's connection list.
    pub connection: usize,
    /// Position along the path, always in `[0, 1)`.
    pub progress: f64,
    pub lateral_offset: f64,
    /// Progress per 60 Hz frame.
    pub speed: f64,
    pub size: f64,
    pub opacity: f64,
    base_speed: f64,
    jitter: f64,
}

/// All particles for the current topology.
#[derive(Debug)]
pub struct ParticleField {
    particles: Vec<Particle>,
    rng: StdRng,
}

impl Default for ParticleField {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticleField {
    pub fn new() -> Self {
        Self {
            particles: Vec::new(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible field for tests and screenshots.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Replace every pool with fresh particles for `topology`.
    ///
    /// Disabled connections get none.
    pub fn initialize(&mut self, topology: &Topology) {
        self.particles.clear();
        for (index, connection) in topology.connections().iter().enumerate() {
            if !connection.enabled {
                continue;
            }
            let profile = FlowProfile::for_load(&connection.load);
            for _ in 0..profile.count {
                let particle = Particle {
                    connection: index,
                    progress: self.rng.random_range(0.0..1.0),
                    lateral_offset: self.rng.random_range(-LATERAL_SPREAD..=LATERAL_SPREAD),
                    speed: roll_speed(&mut self.rng, profile.base_speed, profile.jitter),
                    size: profile.size,
                    opacity: profile.opacity,
                    base_speed: profile.base_speed,
                    jitter: profile.jitter,
                };
                self.particles.push(particle);
            }
        }
    }

    /// Move every particle forward by `dt` of wall time.
    ///
    /// A particle reaching the end restarts at the source with a fresh
    /// speed from its original band; pool sizes never change here.
    pub fn advance(&mut self, dt: Duration, speed_multiplier: f64) {
        let frames = dt.as_secs_f64() / FRAME.as_secs_f64();
        let step = frames * speed_multiplier.max(0.0);
        if !step.is_finite() || step <= 0.0 {
            return;
        }
        for particle in &mut self.particles {
            particle.progress += particle.speed * step;
            if particle.progress >= 1.0 || !particle.progress.is_finite() {
                particle.progress = 0.0;
                particle.speed = roll_speed(&mut self.rng, particle.base_speed, particle.jitter);
            }
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Particles on one connection.
    #[cfg(test)]
    pub(crate) fn on_connection(&self, connection: usize) -> impl Iterator<Item = &Particle> {
        self.particles
            .iter()
            .filter(move |p| p.connection == connection)
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }
}

fn roll_speed(rng: &mut StdRng, base: f64, jitter: f64) -> f64 {
    rng.random_range(base..=base + jitter.max(0.0))
}
