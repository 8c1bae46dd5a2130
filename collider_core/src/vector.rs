//! Fixed-arity real vectors.
//!
//! Arithmetic (dot product, scaling in both operand orders, addition and
//! subtraction) comes from `nalgebra`; this module adds the few operations
//! whose contract differs from nalgebra's defaults.

use nalgebra::SVector;
use std::fmt;

/// Real vector with a compile-time dimension.
pub type Vector<const D: usize> = SVector<f64, D>;

/// Position, velocity and color vectors. The z component is unused.
pub type Vec3 = Vector<3>;

/// Returns `v / |v|`.
///
/// # Panics
/// If `|v|² == 0`. A zero-length vector here is a logic error in the
/// caller (e.g. two bodies with coincident centers), not a recoverable
/// condition.
pub fn unit<const D: usize>(v: &Vector<D>) -> Vector<D> {
    let magnitude_sq = squared_magnitude(v);
    assert!(magnitude_sq != 0.0, "cannot normalize a zero-length vector");
    v * (1.0 / magnitude_sq.sqrt())
}

/// Returns `|v|²`.
pub fn squared_magnitude<const D: usize>(v: &Vector<D>) -> f64 {
    v.dot(v)
}

/// Renders a vector as `(x, y, z)`.
pub struct Components<'a, const D: usize>(pub &'a Vector<D>);

impl<const D: usize> fmt::Display for Components<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_arithmetic() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, -5.0, 6.0);

        assert_eq!(a.dot(&b), 12.0);
        assert_eq!(a * 2.0, 2.0 * a);
        assert_eq!(a + b, Vec3::new(5.0, -3.0, 9.0));
        assert_eq!(a - b, Vec3::new(-3.0, 7.0, -3.0));
    }

    #[test]
    fn test_unit() {
        let v = unit(&Vec3::new(3.0, 4.0, 0.0));
        assert_relative_eq!(v.x, 0.6);
        assert_relative_eq!(v.y, 0.8);
        assert_relative_eq!(squared_magnitude(&v), 1.0);
    }

    #[test]
    fn test_unit_other_dimension() {
        let v = unit(&Vector::<2>::new(0.0, -2.0));
        assert_eq!(v, Vector::<2>::new(0.0, -1.0));
    }

    #[test]
    #[should_panic(expected = "zero-length")]
    fn test_unit_of_zero_panics() {
        unit(&Vec3::zeros());
    }

    #[test]
    fn test_squared_magnitude() {
        assert_eq!(squared_magnitude(&Vec3::new(1.0, 2.0, 2.0)), 9.0);
    }

    #[test]
    fn test_components_display() {
        let v = Vec3::new(1.5, -2.0, 0.0);
        assert_eq!(Components(&v).to_string(), "(1.5, -2, 0)");
    }
}
