//! The simulated body and its pairwise physics.
//!
//! All bodies share one radius, held by `WorldConfig`; the functions here
//! take it explicitly so the contact threshold always follows it.

use crate::vector::{unit, Components, Vec3};
use collider_env::Rank;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Globally unique body identity.
///
/// The origin rank scopes the serial, so two workers can create bodies
/// independently without ever producing the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId {
    /// Worker that created the body
    pub origin: Rank,

    /// Creation order within the origin worker
    pub serial: u64,
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.origin, self.serial)
    }
}

/// Monotonic id source for one worker.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    origin: Rank,
    next_serial: u64,
}

impl IdAllocator {
    /// Creates an allocator whose ids carry `origin`.
    pub fn new(origin: Rank) -> Self {
        Self {
            origin,
            next_serial: 0,
        }
    }

    /// Returns the next unused id.
    pub fn next_id(&mut self) -> BodyId {
        let id = BodyId {
            origin: self.origin,
            serial: self.next_serial,
        };
        self.next_serial += 1;
        id
    }

    /// Creates a body with a fresh id.
    pub fn spawn(&mut self, position: Vec3, velocity: Vec3, color: Vec3) -> Body {
        Body {
            id: self.next_id(),
            position,
            velocity,
            color,
        }
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.next_serial
    }
}

/// A circular particle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Unique identity
    pub id: BodyId,

    /// Center [x, y, z] in world units
    pub position: Vec3,

    /// Velocity [vx, vy, vz] in world units per time unit
    pub velocity: Vec3,

    /// RGB render hint in [0, 1]
    pub color: Vec3,
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}: {}, {}}}",
            self.id,
            Components(&self.position),
            Components(&self.velocity)
        )
    }
}

/// Squared center distance at or below which two bodies of `radius` touch.
pub fn contact_distance_sq(radius: f64) -> f64 {
    let sum_of_radii = 2.0 * radius;
    sum_of_radii * sum_of_radii
}

/// Returns true if the two bodies touch or overlap.
pub fn overlaps(a: &Body, b: &Body, radius: f64) -> bool {
    (a.position - b.position).norm_squared() <= contact_distance_sq(radius)
}

/// Elastic, equal-mass collision response.
///
/// Each velocity is split along the normal from its body toward the
/// contact point (the midpoint of the centers). The parallel components
/// are exchanged, the perpendicular ones are kept. Positions are not
/// touched.
///
/// # Panics
/// If the two centers coincide.
pub fn resolve_collision(a: &mut Body, b: &mut Body) {
    let contact = (a.position + b.position) * 0.5;

    let a_normal = unit(&(contact - a.position));
    let b_normal = unit(&(contact - b.position));

    let a_parallel = a_normal * a.velocity.dot(&a_normal);
    let a_perpendicular = a.velocity - a_parallel;
    let b_parallel = b_normal * b.velocity.dot(&b_normal);
    let b_perpendicular = b.velocity - b_parallel;

    // Symmetric frame: mean velocity plus/minus half the difference
    let mean = (a_parallel + b_parallel) * 0.5;
    let half_difference = (a_parallel - b_parallel) * 0.5;

    a.velocity = a_perpendicular + mean - half_difference;
    b.velocity = b_perpendicular + mean + half_difference;
}

/// Flips the x (y) velocity when the body is strictly outside `[0, width]`
/// (`[0, height]`).
///
/// The position is left where it is, so a body that tunneled out keeps
/// flipping every step until it comes back inside.
pub fn reflect_off_walls(body: &mut Body, width: f64, height: f64) {
    if body.position.x < 0.0 || body.position.x > width {
        body.velocity.x = -body.velocity.x;
    }
    if body.position.y < 0.0 || body.position.y > height {
        body.velocity.y = -body.velocity.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn body(x: f64, y: f64, vx: f64, vy: f64) -> Body {
        let mut ids = IdAllocator::new(Rank(0));
        ids.spawn(Vec3::new(x, y, 0.0), Vec3::new(vx, vy, 0.0), Vec3::zeros())
    }

    #[test]
    fn test_id_allocator_monotonic() {
        let mut ids = IdAllocator::new(Rank(3));
        let a = ids.next_id();
        let b = ids.next_id();

        assert_eq!(a.origin, Rank(3));
        assert!(b.serial > a.serial);
        assert_eq!(ids.issued(), 2);
    }

    #[test]
    fn test_ids_unique_across_origins() {
        let a = IdAllocator::new(Rank(0)).next_id();
        let b = IdAllocator::new(Rank(1)).next_id();
        assert_eq!(a.serial, b.serial);
        assert_ne!(a, b);
    }

    #[test]
    fn test_overlap_threshold_is_inclusive() {
        let a = body(0.0, 0.0, 0.0, 0.0);
        let touching = body(2.0, 0.0, 0.0, 0.0);
        let apart = body(2.001, 0.0, 0.0, 0.0);

        assert!(overlaps(&a, &touching, 1.0));
        assert!(!overlaps(&a, &apart, 1.0));
    }

    #[test]
    fn test_overlap_follows_radius() {
        let a = body(0.0, 0.0, 0.0, 0.0);
        let b = body(3.0, 0.0, 0.0, 0.0);

        assert!(!overlaps(&a, &b, 1.0));
        assert!(overlaps(&a, &b, 1.5));
        assert_eq!(contact_distance_sq(1.5), 9.0);
    }

    #[test]
    fn test_head_on_swaps_velocities() {
        let mut a = body(49.0, 25.0, 1.0, 0.0);
        let mut b = body(51.0, 25.0, -2.0, 0.0);

        resolve_collision(&mut a, &mut b);

        assert_relative_eq!(a.velocity.x, -2.0);
        assert_relative_eq!(b.velocity.x, 1.0);
        assert_relative_eq!(a.velocity.y, 0.0);
        assert_relative_eq!(b.velocity.y, 0.0);
    }

    #[test]
    fn test_perpendicular_components_kept() {
        // Contact normal along x; y velocities are tangential
        let mut a = body(0.0, 0.0, 1.0, 0.5);
        let mut b = body(1.5, 0.0, -1.0, -0.25);

        resolve_collision(&mut a, &mut b);

        assert_relative_eq!(a.velocity.x, -1.0);
        assert_relative_eq!(b.velocity.x, 1.0);
        assert_relative_eq!(a.velocity.y, 0.5);
        assert_relative_eq!(b.velocity.y, -0.25);
    }

    #[test]
    fn test_diagonal_contact_conserves_momentum_and_energy() {
        let mut a = body(0.0, 0.0, 1.0, 0.0);
        let mut b = body(1.0, 1.0, 0.0, 0.0);

        let momentum = a.velocity + b.velocity;
        let energy = a.velocity.norm_squared() + b.velocity.norm_squared();

        resolve_collision(&mut a, &mut b);

        assert_relative_eq!((a.velocity + b.velocity - momentum).norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(
            a.velocity.norm_squared() + b.velocity.norm_squared(),
            energy,
            epsilon = 1e-12
        );
        // Half of a's motion lies along the 45° normal and moves to b
        assert_relative_eq!(a.velocity.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(a.velocity.y, -0.5, epsilon = 1e-12);
        assert_relative_eq!(b.velocity.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(b.velocity.y, 0.5, epsilon = 1e-12);
    }

    #[test]
    #[should_panic(expected = "zero-length")]
    fn test_coincident_centers_panic() {
        let mut a = body(5.0, 5.0, 1.0, 0.0);
        let mut b = body(5.0, 5.0, -1.0, 0.0);
        resolve_collision(&mut a, &mut b);
    }

    #[test]
    fn test_wall_on_boundary_does_not_flip() {
        let mut b = body(100.0, 25.0, -1.0, 0.0);
        reflect_off_walls(&mut b, 100.0, 50.0);
        assert_eq!(b.velocity.x, -1.0);

        // Strict comparison: exactly on the wall never flips, even heading out
        let mut b = body(100.0, 50.0, 1.0, 1.0);
        reflect_off_walls(&mut b, 100.0, 50.0);
        assert_eq!(b.velocity.x, 1.0);
        assert_eq!(b.velocity.y, 1.0);

        let mut b = body(0.0, 0.0, -1.0, -1.0);
        reflect_off_walls(&mut b, 100.0, 50.0);
        assert_eq!(b.velocity, Vec3::new(-1.0, -1.0, 0.0));
    }

    #[test]
    fn test_wall_outside_flips_without_clamping() {
        let mut b = body(100.5, -0.1, 1.0, -2.0);
        reflect_off_walls(&mut b, 100.0, 50.0);

        assert_eq!(b.velocity.x, -1.0);
        assert_eq!(b.velocity.y, 2.0);
        assert_eq!(b.position.x, 100.5);
        assert_eq!(b.position.y, -0.1);

        // Still outside next step: flips again
        reflect_off_walls(&mut b, 100.0, 50.0);
        assert_eq!(b.velocity.x, 1.0);
    }

    #[test]
    fn test_display() {
        let b = body(1.0, 2.0, 0.5, 0.0);
        assert_eq!(b.to_string(), "{0:0: (1, 2, 0), (0.5, 0, 0)}");
    }

    proptest! {
        #[test]
        fn prop_resolution_keeps_overlap_predicate(
            ax in 0.0..100.0f64, ay in 0.0..50.0f64,
            dx in -2.0..2.0f64, dy in -2.0..2.0f64,
            avx in -2.0..2.0f64, avy in -2.0..2.0f64,
            bvx in -2.0..2.0f64, bvy in -2.0..2.0f64,
        ) {
            prop_assume!(dx * dx + dy * dy > 1e-6);
            let mut a = body(ax, ay, avx, avy);
            let mut b = body(ax + dx, ay + dy, bvx, bvy);

            let before = overlaps(&a, &b, 1.0);
            resolve_collision(&mut a, &mut b);
            prop_assert_eq!(overlaps(&a, &b, 1.0), before);
        }

        #[test]
        fn prop_resolution_conserves_momentum(
            dx in -2.0..2.0f64, dy in -2.0..2.0f64,
            avx in -2.0..2.0f64, avy in -2.0..2.0f64,
            bvx in -2.0..2.0f64, bvy in -2.0..2.0f64,
        ) {
            prop_assume!(dx * dx + dy * dy > 1e-6);
            let mut a = body(50.0, 25.0, avx, avy);
            let mut b = body(50.0 + dx, 25.0 + dy, bvx, bvy);
            let momentum = a.velocity + b.velocity;

            resolve_collision(&mut a, &mut b);
            prop_assert!((a.velocity + b.velocity - momentum).norm() < 1e-9);
        }
    }
}
