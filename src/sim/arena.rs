//! The arena: particle and traction sets for one layout run.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::geometry::Bounds;

use super::{ForceConfig, Particle, Traction, forces};

/// Cross-thread "stability has been forced" flag.
///
/// The watchdog fires this for a specific run generation; the arena only
/// honors an exact match with its current generation, so a stale timer
/// from a superseded run is a no-op. The stored generation only moves
/// forward (`fetch_max`), so an old timer can never clobber a newer fire.
#[derive(Debug, Default)]
pub struct ForcedStable {
    fired_generation: AtomicU64,
}

impl ForcedStable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the given run generation as force-stabilized.
    pub fn fire(&self, generation: u64) {
        self.fired_generation.fetch_max(generation, Ordering::AcqRel);
    }

    /// Check whether the flag has fired for exactly this generation.
    pub fn is_fired_for(&self, generation: u64) -> bool {
        self.fired_generation.load(Ordering::Acquire) == generation
    }
}

/// Owns the particle set, traction set, and bounds for exactly one run.
///
/// The arena is reset (cleared and reseeded) at the start of every layout
/// call and is never shared across concurrent runs: the engine moves it
/// into the scheduler thread and recovers it by joining that thread. The
/// particle buffers themselves are reused from run to run.
///
/// One step is O(n² + e) over particles and tractions. That is a
/// deliberate scaling boundary: layouts of tens to low hundreds of
/// vertices converge in well under a second, which is the scale this
/// engine targets.
#[derive(Debug)]
pub struct Arena {
    particles: Vec<Particle>,
    tractions: Vec<Traction>,
    bounds: Bounds,
    forces: ForceConfig,
    epsilon: f32,
    generation: u64,
    forced: Arc<ForcedStable>,
    stable: bool,
    in_step: bool,
}

impl Arena {
    /// Create an empty arena sharing the given forced-stability flag.
    pub fn new(forced: Arc<ForcedStable>) -> Self {
        Self {
            particles: Vec::new(),
            tractions: Vec::new(),
            bounds: Bounds::default(),
            forces: ForceConfig::default(),
            epsilon: 0.1,
            generation: 0,
            forced,
            stable: false,
            in_step: false,
        }
    }

    /// Clear all particles and tractions and adopt settings for a fresh run.
    pub fn reset(&mut self, bounds: Bounds, forces: ForceConfig, epsilon: f32, generation: u64) {
        self.particles.clear();
        self.tractions.clear();
        self.bounds = bounds;
        self.forces = forces;
        self.epsilon = epsilon;
        self.generation = generation;
        self.stable = false;
    }

    /// Add a particle, returning its index for traction binding.
    pub fn add_particle(&mut self, particle: Particle) -> usize {
        self.particles.push(particle);
        self.particles.len() - 1
    }

    /// Add a traction between two previously added particles.
    pub fn add_traction(&mut self, traction: Traction) {
        debug_assert!(traction.from < self.particles.len());
        debug_assert!(traction.to < self.particles.len());
        debug_assert_ne!(traction.from, traction.to);
        self.tractions.push(traction);
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn traction_count(&self) -> usize {
        self.tractions.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Iterate over the particles in insertion order.
    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    /// Execute one simulation step; returns [`is_stable`](Arena::is_stable).
    ///
    /// Applies repulsion to every unordered particle pair and traction to
    /// every edge binding, then integrates each particle and clamps it
    /// into bounds. The run is naturally stable once the largest per-step
    /// displacement falls below epsilon.
    pub fn step(&mut self) -> bool {
        debug_assert!(!self.in_step, "Arena::step re-entered");
        self.in_step = true;

        // Repulsion over unordered pairs.
        for i in 0..self.particles.len() {
            let (head, tail) = self.particles.split_at_mut(i + 1);
            let p = &mut head[i];
            for q in tail {
                forces::repulsion(p, q, &self.forces);
            }
        }

        // Traction per edge binding.
        for t in &self.tractions {
            let (from, to) = pair_mut(&mut self.particles, t.from, t.to);
            forces::traction(from, to, t.rest_length, t.impact);
        }

        // Integrate and clamp.
        let mut max_displacement = 0.0f32;
        for p in &mut self.particles {
            let displacement = p.integrate();
            p.set_position(self.bounds.clamp(p.position()));
            max_displacement = max_displacement.max(displacement);
        }

        self.stable = max_displacement < self.epsilon;
        self.in_step = false;
        self.is_stable()
    }

    /// Whether the run has converged, naturally or by watchdog.
    pub fn is_stable(&self) -> bool {
        self.stable || self.forced.is_fired_for(self.generation)
    }
}

/// Split-borrow two distinct particles by index.
fn pair_mut(particles: &mut [Particle], a: usize, b: usize) -> (&mut Particle, &mut Particle) {
    debug_assert_ne!(a, b);
    if a < b {
        let (head, tail) = particles.split_at_mut(b);
        (&mut head[a], &mut tail[0])
    } else {
        let (head, tail) = particles.split_at_mut(a);
        (&mut tail[0], &mut head[b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn test_arena() -> Arena {
        let mut arena = Arena::new(Arc::new(ForcedStable::new()));
        arena.reset(Bounds::centered(500.0, 500.0), ForceConfig::default(), 0.1, 1);
        arena
    }

    #[test]
    fn test_step_pushes_pair_apart() {
        let mut arena = test_arena();
        arena.add_particle(Particle::new(Point::new(-5.0, 0.0), 1.0));
        arena.add_particle(Particle::new(Point::new(5.0, 0.0), 1.0));

        arena.step();

        let positions: Vec<Point> = arena.particles().map(|p| p.position()).collect();
        assert!(positions[0].x < -5.0);
        assert!(positions[1].x > 5.0);
    }

    #[test]
    fn test_step_clamps_into_bounds() {
        let mut arena = Arena::new(Arc::new(ForcedStable::new()));
        arena.reset(Bounds::centered(10.0, 10.0), ForceConfig::default(), 0.1, 1);
        arena.add_particle(Particle::new(Point::new(-9.5, 0.0), 1.0));
        arena.add_particle(Particle::new(Point::new(9.5, 0.0), 1.0));

        for _ in 0..50 {
            arena.step();
        }
        for p in arena.particles() {
            let pos = p.position();
            assert!(pos.x >= -10.0 && pos.x <= 10.0, "escaped bounds: {pos:?}");
        }
    }

    #[test]
    fn test_traction_pair_settles_near_rest_length() {
        let mut arena = test_arena();
        let a = arena.add_particle(Particle::new(Point::new(0.0, 0.0), 1.0));
        let b = arena.add_particle(Particle::new(Point::new(200.0, 0.0), 1.0));
        arena.add_traction(Traction::new(a, b, 40.0, 5.0));

        let mut steps = 0;
        while !arena.step() && steps < 1_000 {
            steps += 1;
        }
        assert!(arena.is_stable(), "did not converge in {steps} steps");

        let positions: Vec<Point> = arena.particles().map(|p| p.position()).collect();
        let distance = positions[0].distance_to(positions[1]);
        assert!((distance - 40.0).abs() < 2.0, "settled at {distance}");
    }

    #[test]
    fn test_empty_arena_is_stable_after_step() {
        let mut arena = test_arena();
        assert!(arena.step());
    }

    #[test]
    fn test_forced_stable_matching_generation() {
        let forced = Arc::new(ForcedStable::new());
        let mut arena = Arena::new(forced.clone());
        arena.reset(Bounds::default(), ForceConfig::default(), 0.1, 7);
        arena.add_particle(Particle::new(Point::ZERO, 1.0));

        assert!(!arena.is_stable());
        forced.fire(7);
        assert!(arena.is_stable());
    }

    #[test]
    fn test_forced_stable_stale_generation_is_noop() {
        let forced = Arc::new(ForcedStable::new());
        let mut arena = Arena::new(forced.clone());
        arena.reset(Bounds::default(), ForceConfig::default(), 0.1, 8);

        // A timer left over from run 7 fires late.
        forced.fire(7);
        assert!(!arena.is_stable());

        // The current run's own watchdog still works.
        forced.fire(8);
        assert!(arena.is_stable());
    }

    #[test]
    fn test_stale_fire_cannot_regress_newer_fire() {
        let forced = ForcedStable::new();
        forced.fire(9);
        forced.fire(3);
        assert!(forced.is_fired_for(9));
    }

    #[test]
    fn test_reset_clears_previous_run() {
        let mut arena = test_arena();
        let a = arena.add_particle(Particle::new(Point::ZERO, 1.0));
        let b = arena.add_particle(Particle::new(Point::new(10.0, 0.0), 1.0));
        arena.add_traction(Traction::new(a, b, 40.0, 5.0));

        arena.reset(Bounds::default(), ForceConfig::default(), 0.1, 2);
        assert_eq!(arena.particle_count(), 0);
        assert_eq!(arena.traction_count(), 0);
        assert_eq!(arena.generation(), 2);
        assert!(!arena.is_stable());
    }

    #[test]
    fn test_coincident_particles_do_not_nan() {
        let mut arena = test_arena();
        arena.add_particle(Particle::new(Point::new(1.0, 1.0), 1.0));
        arena.add_particle(Particle::new(Point::new(1.0, 1.0), 1.0));

        arena.step();
        for p in arena.particles() {
            assert!(p.position().x.is_finite());
            assert!(p.position().y.is_finite());
        }
    }
}
