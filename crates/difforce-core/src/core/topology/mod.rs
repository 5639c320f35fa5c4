//! # Topological Exclusions
//!
//! Derives the covalent distance between atom pairs from the bond graph. Nonbonded
//! interactions between atoms that are close in the bond graph (1-2, 1-3, 1-4 neighbors)
//! are removed from the pair list or scaled according to this map.

pub mod covalent;

pub use covalent::{CovalentMap, DEFAULT_MAX_COVALENT_ORDER};
