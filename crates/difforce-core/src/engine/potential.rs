use super::config::EngineConfig;
use super::error::EngineError;
use super::neighbor::{NeighborList, NeighborListError};
use crate::core::autodiff::{Real, Vec3, ordered_sum};
use crate::core::forcefield::energy;
use crate::core::forcefield::params::{ParameterSet, ShapeError};
use crate::core::forcefield::term::{EnergyTerms, TermKind};
use crate::core::models::pair::Pair;
use crate::core::models::simulation_box::SimulationBox;
use crate::core::models::topology::Topology;
use crate::core::topology::CovalentMap;
use nalgebra::Point3;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, trace};

/// A scalar energy of positions and parameters that can be evaluated on any [`Real`].
///
/// Implemented by the combined [`Potential`] and by each single-term [`TermFunction`], so
/// the differentiation and finite-difference workflows accept either.
pub trait EnergyFunction {
    fn n_atoms(&self) -> usize;

    /// Checks position count, pair indices and the parameter bundles this function reads.
    fn check_inputs<T: Copy>(
        &self,
        n_positions: usize,
        pairs: &[Pair],
        params: &ParameterSet<T>,
    ) -> Result<(), ShapeError>;

    /// Energy in kJ/mol. Inputs are validated before any term is evaluated.
    fn evaluate<T: Real>(
        &self,
        positions: &[Vec3<T>],
        sim_box: Option<&SimulationBox>,
        pairs: &[Pair],
        params: &ParameterSet<T>,
    ) -> Result<T, ShapeError>;

    fn energy(
        &self,
        positions: &[Point3<f64>],
        sim_box: Option<&SimulationBox>,
        pairs: &[Pair],
        params: &ParameterSet,
    ) -> Result<f64, ShapeError> {
        let positions: Vec<Vec3<f64>> = positions.iter().map(Vec3::from_point).collect();
        self.evaluate(&positions, sim_box, pairs, params)
    }
}

/// The composed force field of one system.
///
/// Registers one term per kind the topology actually contains, in [`TermKind::ALL`]
/// order; the combined energy sums exactly those terms in that order.
#[derive(Debug, Clone)]
pub struct Potential {
    topology: Topology,
    config: EngineConfig,
    covalent_map: Arc<CovalentMap>,
    terms: Vec<TermKind>,
}

impl Potential {
    #[instrument(skip_all, name = "potential_setup", fields(n_atoms = topology.n_atoms()))]
    pub fn new(topology: Topology, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let covalent_map = Arc::new(CovalentMap::build(&topology, config.max_covalent_order));
        let terms: Vec<TermKind> = TermKind::ALL
            .into_iter()
            .filter(|&kind| match kind {
                TermKind::Bond => !topology.bonds().is_empty(),
                TermKind::Angle => !topology.angles().is_empty(),
                TermKind::ProperTorsion => !topology.proper_torsions().is_empty(),
                TermKind::ImproperTorsion => !topology.improper_torsions().is_empty(),
                TermKind::LennardJones | TermKind::Coulomb => topology.n_atoms() > 1,
            })
            .collect();

        info!(
            terms = ?terms,
            covalent_pairs = covalent_map.len(),
            cutoff = config.cutoff(),
            "Composed potential."
        );

        Ok(Self {
            topology,
            config,
            covalent_map,
            terms,
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Exclusion map shared with every neighbor list created from this potential.
    pub fn covalent_map(&self) -> &Arc<CovalentMap> {
        &self.covalent_map
    }

    /// Registered terms in summation order.
    pub fn terms(&self) -> &[TermKind] {
        &self.terms
    }

    pub fn has_term(&self, kind: TermKind) -> bool {
        self.terms.contains(&kind)
    }

    pub fn term(&self, kind: TermKind) -> Option<TermFunction<'_>> {
        self.has_term(kind).then_some(TermFunction {
            potential: self,
            kind,
        })
    }

    /// Like [`Potential::term`], failing for terms the system does not contain.
    pub fn require_term(&self, kind: TermKind) -> Result<TermFunction<'_>, EngineError> {
        self.term(kind).ok_or(EngineError::UnregisteredTerm(kind))
    }

    /// One independently evaluable function per registered term.
    pub fn term_functions(&self) -> BTreeMap<TermKind, TermFunction<'_>> {
        self.terms
            .iter()
            .map(|&kind| {
                (
                    kind,
                    TermFunction {
                        potential: self,
                        kind,
                    },
                )
            })
            .collect()
    }

    /// A neighbor list using this potential's cutoff, skin and exclusion map.
    pub fn neighbor_list(&self) -> Result<NeighborList, NeighborListError> {
        NeighborList::new(
            self.config.neighbor_list.clone(),
            Arc::clone(&self.covalent_map),
        )
    }

    /// Energy of every registered term; unregistered terms report zero.
    pub fn energy_breakdown(
        &self,
        positions: &[Point3<f64>],
        sim_box: Option<&SimulationBox>,
        pairs: &[Pair],
        params: &ParameterSet,
    ) -> Result<EnergyTerms, ShapeError> {
        self.check_inputs(positions.len(), pairs, params)?;
        let positions: Vec<Vec3<f64>> = positions.iter().map(Vec3::from_point).collect();
        let mut terms = EnergyTerms::default();
        for &kind in &self.terms {
            let energy = self.evaluate_term(kind, &positions, sim_box, pairs, params);
            trace!(term = %kind, energy, "Evaluated term.");
            terms.set(kind, energy);
        }
        Ok(terms)
    }

    fn evaluate_term<T: Real>(
        &self,
        kind: TermKind,
        positions: &[Vec3<T>],
        sim_box: Option<&SimulationBox>,
        pairs: &[Pair],
        params: &ParameterSet<T>,
    ) -> T {
        let topology = &self.topology;
        let nonbonded = &self.config.nonbonded;
        let cutoff = self.config.cutoff();
        match kind {
            TermKind::Bond => {
                energy::bond_energy(positions, sim_box, topology.bonds(), &params.bonds)
            }
            TermKind::Angle => {
                energy::angle_energy(positions, sim_box, topology.angles(), &params.angles)
            }
            TermKind::ProperTorsion => energy::torsion_energy(
                positions,
                sim_box,
                topology.proper_torsions(),
                &params.proper_torsions,
            ),
            TermKind::ImproperTorsion => energy::torsion_energy(
                positions,
                sim_box,
                topology.improper_torsions(),
                &params.improper_torsions,
            ),
            TermKind::LennardJones => energy::lennard_jones_energy(
                positions,
                sim_box,
                pairs,
                &params.atoms,
                nonbonded,
                cutoff,
            ),
            TermKind::Coulomb => energy::coulomb_energy(
                positions,
                sim_box,
                pairs,
                &params.atoms,
                nonbonded,
                cutoff,
            ),
        }
    }

    fn check_positions(&self, n_positions: usize) -> Result<(), ShapeError> {
        let expected = self.topology.n_atoms();
        if n_positions != expected {
            return Err(ShapeError::Positions {
                expected,
                found: n_positions,
            });
        }
        Ok(())
    }

    /// Pair indices must be in range and each pair's order must agree with the exclusion map,
    /// so a caller cannot lift a bonded pair into the full-strength nonbonded sum.
    fn check_pairs(&self, pairs: &[Pair]) -> Result<(), ShapeError> {
        let n_atoms = self.topology.n_atoms();
        for p in pairs {
            if p.i >= p.j || p.j >= n_atoms {
                return Err(ShapeError::InvalidPair {
                    i: p.i,
                    j: p.j,
                    n_atoms,
                });
            }
            let expected = self.covalent_map.order(p.i, p.j);
            if p.order != expected {
                return Err(ShapeError::PairOrder {
                    i: p.i,
                    j: p.j,
                    expected,
                    found: p.order,
                });
            }
        }
        Ok(())
    }
}

impl EnergyFunction for Potential {
    fn n_atoms(&self) -> usize {
        self.topology.n_atoms()
    }

    fn check_inputs<T: Copy>(
        &self,
        n_positions: usize,
        pairs: &[Pair],
        params: &ParameterSet<T>,
    ) -> Result<(), ShapeError> {
        self.check_positions(n_positions)?;
        params.validate(&self.topology)?;
        self.check_pairs(pairs)
    }

    fn evaluate<T: Real>(
        &self,
        positions: &[Vec3<T>],
        sim_box: Option<&SimulationBox>,
        pairs: &[Pair],
        params: &ParameterSet<T>,
    ) -> Result<T, ShapeError> {
        self.check_inputs(positions.len(), pairs, params)?;
        Ok(ordered_sum(self.terms.iter().map(|&kind| {
            self.evaluate_term(kind, positions, sim_box, pairs, params)
        })))
    }
}

/// A single registered term of a [`Potential`], evaluable on its own.
#[derive(Debug, Clone, Copy)]
pub struct TermFunction<'p> {
    potential: &'p Potential,
    kind: TermKind,
}

impl TermFunction<'_> {
    pub fn kind(&self) -> TermKind {
        self.kind
    }
}

impl EnergyFunction for TermFunction<'_> {
    fn n_atoms(&self) -> usize {
        self.potential.n_atoms()
    }

    fn check_inputs<T: Copy>(
        &self,
        n_positions: usize,
        pairs: &[Pair],
        params: &ParameterSet<T>,
    ) -> Result<(), ShapeError> {
        self.potential.check_positions(n_positions)?;
        params.validate_term(self.kind, &self.potential.topology)?;
        if self.kind.is_nonbonded() {
            self.potential.check_pairs(pairs)?;
        }
        Ok(())
    }

    fn evaluate<T: Real>(
        &self,
        positions: &[Vec3<T>],
        sim_box: Option<&SimulationBox>,
        pairs: &[Pair],
        params: &ParameterSet<T>,
    ) -> Result<T, ShapeError> {
        self.check_inputs(positions.len(), pairs, params)?;
        Ok(self
            .potential
            .evaluate_term(self.kind, positions, sim_box, pairs, params))
    }
}
