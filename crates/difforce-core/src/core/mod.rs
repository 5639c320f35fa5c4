//! # Core Module
//!
//! The numerical building blocks of the engine: the differentiation tape, the molecular
//! system description, covalent exclusions, differentiable geometry and the force-field
//! terms themselves.
//!
//! - **Differentiation** ([`autodiff`]) - Reverse-mode tape and the `Real` scalar abstraction
//! - **System Description** ([`models`]) - Topology, periodic box and neighbor pairs
//! - **Exclusions** ([`topology`]) - Bond-graph distances between atoms
//! - **Geometry** ([`utils`]) - Distances, angles and dihedrals under the minimum image
//! - **Energy Terms** ([`forcefield`]) - Parameters, potentials and term evaluators

pub mod autodiff;
pub mod forcefield;
pub mod models;
pub mod topology;
pub mod utils;
