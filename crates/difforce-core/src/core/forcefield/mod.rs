//! # Force Field Module
//!
//! Energy terms of a class-I molecular-mechanics force field, written once over the
//! [`Real`](crate::core::autodiff::Real) scalar so the same code yields energies, forces
//! and parameter gradients.
//!
//! ## Key Components
//!
//! - [`params`] - Parameter bundles that mirror the topology's index lists
//! - [`energy`] - Per-term evaluators: `(positions, box, indices, parameters) → energy`
//! - [`potentials`] - Closed-form functional forms (harmonic, periodic, 12-6, Coulomb)
//! - [`term`] - Term identifiers and per-term energy reporting
//!
//! Units are kJ/mol, nm, radians and elementary charges throughout.

pub mod energy;
pub mod params;
pub mod potentials;
pub mod term;
