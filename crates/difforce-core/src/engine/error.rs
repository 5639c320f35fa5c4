use thiserror::Error;

use super::config::ConfigError;
use super::neighbor::NeighborListError;
use crate::core::forcefield::params::ShapeError;
use crate::core::forcefield::term::TermKind;
use crate::core::models::simulation_box::BoxError;
use crate::core::models::topology::TopologyError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Invalid topology: {source}")]
    Topology {
        #[from]
        source: TopologyError,
    },

    #[error("Invalid periodic box: {source}")]
    Box {
        #[from]
        source: BoxError,
    },

    #[error("Input shape mismatch: {source}")]
    Shape {
        #[from]
        source: ShapeError,
    },

    #[error("Neighbor list failed: {source}")]
    NeighborList {
        #[from]
        source: NeighborListError,
    },

    #[error("Energy term '{0}' is not registered for this system")]
    UnregisteredTerm(TermKind),
}
