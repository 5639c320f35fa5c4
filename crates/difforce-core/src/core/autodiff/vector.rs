use super::real::Real;
use nalgebra::{Point3, Vector3};
use std::ops::{Add, Neg, Sub};

/// A 3-vector over any [`Real`] scalar.
///
/// `nalgebra` vectors require `'static` scalars, which taped variables are not, so the
/// differentiable geometry runs on this small type and converts at the boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

impl<T: Real> Vec3<T> {
    #[inline]
    pub fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn from_point(p: &Point3<f64>) -> Self {
        Self::new(T::constant(p.x), T::constant(p.y), T::constant(p.z))
    }

    #[inline]
    pub fn from_vector(v: &Vector3<f64>) -> Self {
        Self::new(T::constant(v.x), T::constant(v.y), T::constant(v.z))
    }

    #[inline]
    pub fn values(&self) -> Vector3<f64> {
        Vector3::new(self.x.value(), self.y.value(), self.z.value())
    }

    #[inline]
    pub fn dot(&self, other: &Self) -> T {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    #[inline]
    pub fn norm_squared(&self) -> T {
        self.dot(self)
    }

    #[inline]
    pub fn norm(&self) -> T {
        self.norm_squared().sqrt()
    }

    #[inline]
    pub fn scale(&self, factor: T) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Subtracts a constant displacement, leaving the gradient untouched.
    #[inline]
    pub fn shifted_by(&self, shift: &Vector3<f64>) -> Self {
        Self::new(self.x - shift.x, self.y - shift.y, self.z - shift.z)
    }
}

impl<T: Real> Add for Vec3<T> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl<T: Real> Sub for Vec3<T> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl<T: Real> Neg for Vec3<T> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_product_of_unit_axes_follows_right_hand_rule() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(&y), Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(y.cross(&x), Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn norm_matches_nalgebra() {
        let v = Vector3::new(1.0, -2.0, 2.0);
        let w: Vec3<f64> = Vec3::from_vector(&v);
        assert_eq!(w.norm(), v.norm());
        assert_eq!(w.values(), v);
    }

    #[test]
    fn shifted_by_subtracts_displacement() {
        let v: Vec3<f64> = Vec3::new(5.0, 1.0, -1.0);
        let shifted = v.shifted_by(&Vector3::new(4.0, 0.0, -2.0));
        assert_eq!(shifted, Vec3::new(1.0, 1.0, 1.0));
    }
}
