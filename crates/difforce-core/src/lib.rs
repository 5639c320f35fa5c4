//! # Difforce Core Library
//!
//! A differentiable molecular-mechanics engine: energies, forces and parameter gradients for
//! classical force fields with harmonic bonds and angles, periodic torsions, Lennard-Jones and
//! Coulomb interactions under open or triclinic periodic boundaries.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Topology`, `SimulationBox`,
//!   `Pair`), the covalent exclusion map, the reverse-mode differentiation tape, and the
//!   term evaluators. Every evaluator is generic over [`core::autodiff::Real`], so the same
//!   code yields plain energies or differentiable ones.
//!
//! - **[`engine`]: The Logic Core.** Configuration, the cell-list `NeighborList` with
//!   fixed-capacity allocation and minimum-image search, and the `Potential` composer that
//!   registers the terms a topology needs and sums them in a fixed order.
//!
//! - **[`workflows`]: The Public API.** Forces `−∇ᵣE` and parameter gradients `∂E/∂θ` via a
//!   single reverse sweep, plus finite-difference counterparts for validation.

pub mod core;
pub mod engine;
pub mod workflows;
