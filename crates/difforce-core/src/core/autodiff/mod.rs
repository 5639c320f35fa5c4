//! # Reverse-Mode Differentiation
//!
//! A small tape-based automatic differentiation facility sized for molecular-mechanics
//! energy functions.
//!
//! Term evaluators are generic over [`Real`]. Running them on `f64` gives the energy alone;
//! running them on [`Var`] records every arithmetic operation on a [`Tape`], after which a
//! single reverse sweep ([`Tape::gradient`]) yields the exact derivative of the energy with
//! respect to every recorded input, positions and parameters alike.
//!
//! Geometry is expressed with the generic [`Vec3`], since `nalgebra` types cannot hold
//! borrowed tape variables.

mod real;
mod tape;
mod vector;

pub use real::{Real, ordered_sum};
pub use tape::{Adjoints, Tape, Var};
pub use vector::Vec3;
