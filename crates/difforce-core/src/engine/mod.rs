//! # Engine Module
//!
//! Assembles the force-field terms into an evaluable potential and provides the
//! infrastructure each evaluation needs.
//!
//! - **Configuration** ([`config`]) - Cutoff, skin, exclusion policy and nonbonded options,
//!   from a builder or a TOML file
//! - **Neighbor Search** ([`neighbor`]) - Cell-list pair list with covalent exclusions and
//!   a fixed-capacity buffer
//! - **Composition** ([`potential`]) - Per-term and combined energy functions in a fixed
//!   summation order
//! - **Error Handling** ([`error`]) - The aggregate error type of the engine
//!
//! A typical evaluation builds a [`potential::Potential`] once, allocates its
//! [`neighbor::NeighborList`], and then passes positions, the pair list and a parameter set
//! to the functions in [`crate::workflows`].

pub mod config;
pub mod error;
pub mod neighbor;
pub mod potential;
