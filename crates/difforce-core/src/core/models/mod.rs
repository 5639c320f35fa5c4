//! # Molecular System Models
//!
//! Immutable descriptions of the system being evaluated.
//!
//! - [`topology`] - Atoms, the bond graph and the index tuples of bonded terms
//! - [`simulation_box`] - Periodic lattice, fractional coordinates and the minimum image
//! - [`pair`] - Candidate nonbonded pairs annotated with their covalent order
//!
//! Positions are not part of these models. They are supplied fresh on every evaluation.

pub mod pair;
pub mod simulation_box;
pub mod topology;
