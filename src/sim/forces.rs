//! Pairwise force functions.
//!
//! Both forces operate on exactly the two particles passed in and share no
//! other state, so pairs can be evaluated independently. Coincident
//! particles have no direction between them and are skipped; effective
//! distance is clamped to [`MIN_DISTANCE`] in both forces so neither can
//! blow up as two particles approach each other.

use serde::{Deserialize, Serialize};

use super::Particle;

/// Distance floor applied before any magnitude computation.
///
/// Shared by repulsion and traction so the two forces stay consistent
/// near zero separation.
pub const MIN_DISTANCE: f32 = 1.0;

/// Tuning constants for the force model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ForceConfig {
    /// Repulsion strength between every particle pair (default: 6000.0).
    pub repulsion_impact: f32,
    /// Upper bound on a single repulsion force magnitude (default: 4.0).
    pub max_repulsion: f32,
    /// Exponent of the repulsion falloff, force ~ 1/d^linearity (default: 3).
    pub linearity: i32,
    /// Traction strength per unit of relative deviation (default: 5.0).
    pub traction_impact: f32,
    /// Preferred edge length (default: 40.0).
    pub rest_length: f32,
    /// Weight given to every particle (default: 1.0, minimum 1.0).
    pub particle_weight: f32,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            repulsion_impact: 6000.0,
            max_repulsion: 4.0,
            linearity: 3,
            traction_impact: 5.0,
            rest_length: 40.0,
            particle_weight: 1.0,
        }
    }
}

/// A spring binding two particles to a preferred rest length.
///
/// Created per graph edge whose both endpoints are movable. Holds indices
/// into the arena's particle set.
#[derive(Debug, Clone, Copy)]
pub struct Traction {
    pub from: usize,
    pub to: usize,
    pub rest_length: f32,
    pub impact: f32,
}

impl Traction {
    pub fn new(from: usize, to: usize, rest_length: f32, impact: f32) -> Self {
        Self {
            from,
            to,
            rest_length,
            impact,
        }
    }
}

/// Apply the pairwise repulsion force to both particles.
///
/// Magnitude is `impact · w(p) · w(q) / distance^linearity`, capped at
/// `max_repulsion`. Applied equal and opposite, so the pair contributes
/// zero net force.
pub fn repulsion(p: &mut Particle, q: &mut Particle, config: &ForceConfig) {
    let d = q.position() - p.position();
    if d.magnitude() == 0.0 {
        return;
    }

    let distance = d.magnitude().max(MIN_DISTANCE);
    let magnitude = (config.repulsion_impact * p.weight() * q.weight()
        / distance.powi(config.linearity))
    .min(config.max_repulsion);

    let force = d.scaled_to(magnitude);
    p.accelerate(force.inverted());
    q.accelerate(force);
}

/// Apply a traction (spring) force to both endpoint particles.
///
/// Deviation is the relative stretch `(distance − rest) / rest`; the force
/// magnitude is `deviation · impact`. Overlong edges pull their endpoints
/// together, underlong edges push them apart. Applied equal and opposite.
pub fn traction(from: &mut Particle, to: &mut Particle, rest_length: f32, impact: f32) {
    let d = to.position() - from.position();
    if d.magnitude() == 0.0 {
        return;
    }

    let distance = d.magnitude().max(MIN_DISTANCE);
    let deviation = (distance - rest_length) / rest_length;

    let force = d.scaled_to(deviation * impact);
    from.accelerate(force);
    to.accelerate(force.inverted());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use proptest::prelude::*;

    fn particle_at(x: f32, y: f32) -> Particle {
        Particle::new(Point::new(x, y), 1.0)
    }

    /// Integrating immediately after one force application exposes the
    /// accumulated force as a displacement we can inspect.
    fn pending_force(p: &mut Particle) -> Point {
        let before = p.position();
        p.integrate();
        p.position() - before
    }

    #[test]
    fn test_repulsion_pushes_apart() {
        let mut p = particle_at(0.0, 0.0);
        let mut q = particle_at(10.0, 0.0);
        repulsion(&mut p, &mut q, &ForceConfig::default());

        assert!(pending_force(&mut p).x < 0.0);
        assert!(pending_force(&mut q).x > 0.0);
    }

    #[test]
    fn test_repulsion_skips_coincident_pair() {
        let mut p = particle_at(3.0, 3.0);
        let mut q = particle_at(3.0, 3.0);
        repulsion(&mut p, &mut q, &ForceConfig::default());

        assert_eq!(pending_force(&mut p), Point::ZERO);
        assert_eq!(pending_force(&mut q), Point::ZERO);
    }

    #[test]
    fn test_repulsion_capped() {
        let config = ForceConfig::default();
        // Just over the coincidence check but far inside the floor, where
        // the uncapped magnitude would be enormous.
        let mut p = particle_at(0.0, 0.0);
        let mut q = particle_at(0.001, 0.0);
        repulsion(&mut p, &mut q, &config);

        let f = pending_force(&mut q);
        assert!(f.magnitude() <= config.max_repulsion + 1e-4);
    }

    #[test]
    fn test_traction_zero_at_rest_length() {
        let mut from = particle_at(0.0, 0.0);
        let mut to = particle_at(40.0, 0.0);
        traction(&mut from, &mut to, 40.0, 5.0);

        assert_eq!(pending_force(&mut from), Point::ZERO);
        assert_eq!(pending_force(&mut to), Point::ZERO);
    }

    #[test]
    fn test_traction_overlong_pulls_together() {
        let mut from = particle_at(0.0, 0.0);
        let mut to = particle_at(80.0, 0.0);
        traction(&mut from, &mut to, 40.0, 5.0);

        assert!(pending_force(&mut from).x > 0.0);
        assert!(pending_force(&mut to).x < 0.0);
    }

    #[test]
    fn test_traction_underlong_pushes_apart() {
        let mut from = particle_at(0.0, 0.0);
        let mut to = particle_at(10.0, 0.0);
        traction(&mut from, &mut to, 40.0, 5.0);

        assert!(pending_force(&mut from).x < 0.0);
        assert!(pending_force(&mut to).x > 0.0);
    }

    #[test]
    fn test_traction_skips_coincident_pair() {
        let mut from = particle_at(1.0, 2.0);
        let mut to = particle_at(1.0, 2.0);
        traction(&mut from, &mut to, 40.0, 5.0);

        assert_eq!(pending_force(&mut from), Point::ZERO);
    }

    proptest! {
        /// Action–reaction: for any pair, the two applied forces sum to zero.
        #[test]
        fn prop_repulsion_zero_net_force(
            px in -500.0f32..500.0, py in -500.0f32..500.0,
            qx in -500.0f32..500.0, qy in -500.0f32..500.0,
        ) {
            let mut p = particle_at(px, py);
            let mut q = particle_at(qx, qy);
            repulsion(&mut p, &mut q, &ForceConfig::default());

            let net = pending_force(&mut p) + pending_force(&mut q);
            prop_assert!(net.magnitude() < 1e-3);
        }

        #[test]
        fn prop_repulsion_never_exceeds_cap(
            px in -500.0f32..500.0, py in -500.0f32..500.0,
            qx in -500.0f32..500.0, qy in -500.0f32..500.0,
        ) {
            let config = ForceConfig::default();
            let mut p = particle_at(px, py);
            let mut q = particle_at(qx, qy);
            repulsion(&mut p, &mut q, &config);

            prop_assert!(pending_force(&mut q).magnitude() <= config.max_repulsion + 1e-4);
        }

        #[test]
        fn prop_traction_zero_net_force(
            fx in -500.0f32..500.0, fy in -500.0f32..500.0,
            tx in -500.0f32..500.0, ty in -500.0f32..500.0,
        ) {
            let mut from = particle_at(fx, fy);
            let mut to = particle_at(tx, ty);
            traction(&mut from, &mut to, 40.0, 5.0);

            let net = pending_force(&mut from) + pending_force(&mut to);
            prop_assert!(net.magnitude() < 1e-2);
        }

        /// Neither force may ever produce a NaN position.
        #[test]
        fn prop_forces_never_nan(
            px in -500.0f32..500.0, py in -500.0f32..500.0,
            qx in -500.0f32..500.0, qy in -500.0f32..500.0,
        ) {
            let mut p = particle_at(px, py);
            let mut q = particle_at(qx, qy);
            repulsion(&mut p, &mut q, &ForceConfig::default());
            traction(&mut p, &mut q, 40.0, 5.0);
            p.integrate();
            q.integrate();

            prop_assert!(p.position().x.is_finite() && p.position().y.is_finite());
            prop_assert!(q.position().x.is_finite() && q.position().y.is_finite());
        }
    }
}
