use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Scalar abstraction shared by plain `f64` evaluation and taped reverse-mode evaluation.
///
/// Every term evaluator is written once against this trait. Instantiated with `f64` it is
/// a plain energy function; instantiated with [`Var`](super::Var) it records the operations
/// needed to recover exact gradients with a single backward pass.
///
/// Operations that are not smooth everywhere (`sqrt` at zero, `acos` at ±1, `atan2` at the
/// origin, `clamp` at its bounds) propagate a zero gradient at the singular point instead
/// of `inf`/`NaN`.
pub trait Real:
    Copy
    + Debug
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + Add<f64, Output = Self>
    + Sub<f64, Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
{
    /// Lifts a constant into the scalar type. Constants never receive gradient.
    fn constant(value: f64) -> Self;

    /// The primal value.
    fn value(&self) -> f64;

    fn sqrt(self) -> Self;
    fn powi(self, n: i32) -> Self;
    fn recip(self) -> Self;
    fn sin(self) -> Self;
    fn cos(self) -> Self;
    fn acos(self) -> Self;
    fn atan2(self, other: Self) -> Self;

    /// Clamps the value into `[lo, hi]`. Saturated values carry no gradient.
    fn clamp(self, lo: f64, hi: f64) -> Self;

    #[inline]
    fn zero() -> Self {
        Self::constant(0.0)
    }
}

impl Real for f64 {
    #[inline]
    fn constant(value: f64) -> Self {
        value
    }

    #[inline]
    fn value(&self) -> f64 {
        *self
    }

    #[inline]
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        f64::powi(self, n)
    }

    #[inline]
    fn recip(self) -> Self {
        f64::recip(self)
    }

    #[inline]
    fn sin(self) -> Self {
        f64::sin(self)
    }

    #[inline]
    fn cos(self) -> Self {
        f64::cos(self)
    }

    #[inline]
    fn acos(self) -> Self {
        f64::acos(self)
    }

    #[inline]
    fn atan2(self, other: Self) -> Self {
        f64::atan2(self, other)
    }

    #[inline]
    fn clamp(self, lo: f64, hi: f64) -> Self {
        f64::clamp(self, lo, hi)
    }
}

/// Sums a sequence left to right, starting from zero.
///
/// Reduction order is the iteration order, so repeated evaluations are bit-identical.
pub fn ordered_sum<T: Real>(values: impl IntoIterator<Item = T>) -> T {
    values.into_iter().fold(T::zero(), |acc, v| acc + v)
}
