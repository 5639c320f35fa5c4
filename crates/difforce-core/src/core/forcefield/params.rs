use crate::core::autodiff::Real;
use crate::core::forcefield::term::TermKind;
use crate::core::models::topology::Topology;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Coulomb prefactor 1/(4πε₀) in kJ·nm/(mol·e²).
pub const COULOMB_CONSTANT: f64 = 138.935_456;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("Parameter bundle '{term}' has {found} rows but the topology defines {expected}")]
    ParameterRows {
        term: TermKind,
        expected: usize,
        found: usize,
    },
    #[error("Per-atom parameter bundle has {found} rows but the topology has {expected} atoms")]
    AtomRows { expected: usize, found: usize },
    #[error("Expected {expected} positions but received {found}")]
    Positions { expected: usize, found: usize },
    #[error("Pair ({i}, {j}) is not a valid pair in a system of {n_atoms} atoms")]
    InvalidPair { i: usize, j: usize, n_atoms: usize },
    #[error("Pair ({i}, {j}) is labelled covalent order {found} but the topology gives {expected}")]
    PairOrder {
        i: usize,
        j: usize,
        expected: u8,
        found: u8,
    },
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Harmonic bond stretch: `½·k·(r − length)²`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BondParam<T = f64> {
    pub k: T,
    pub length: T,
}

/// Harmonic angle bend: `½·k·(θ − angle)²`, angle in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AngleParam<T = f64> {
    pub k: T,
    pub angle: T,
}

/// Periodic torsion with periodicities 1 through 4: `Σₙ k[n−1]·(1 + cos(n·φ − phase[n−1]))`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TorsionParam<T = f64> {
    pub k: [T; 4],
    pub phase: [T; 4],
}

/// Per-atom nonbonded parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AtomParam<T = f64> {
    pub charge: T,
    pub sigma: T,
    pub epsilon: T,
}

/// Complete parameter set for one topology, one row per topological entity.
///
/// The scalar type is generic so the same layout carries plain values, taped variables
/// and gradients: the gradient of an energy with respect to a `ParameterSet` is again a
/// `ParameterSet<f64>` with identical shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ParameterSet<T = f64> {
    #[serde(default)]
    pub bonds: Vec<BondParam<T>>,
    #[serde(default)]
    pub angles: Vec<AngleParam<T>>,
    #[serde(default)]
    pub proper_torsions: Vec<TorsionParam<T>>,
    #[serde(default)]
    pub improper_torsions: Vec<TorsionParam<T>>,
    #[serde(default)]
    pub atoms: Vec<AtomParam<T>>,
}

impl<T: Copy> ParameterSet<T> {
    /// Applies `f` to every leaf value, preserving the shape.
    pub fn map<U>(&self, mut f: impl FnMut(T) -> U) -> ParameterSet<U> {
        ParameterSet {
            bonds: self
                .bonds
                .iter()
                .map(|b| BondParam {
                    k: f(b.k),
                    length: f(b.length),
                })
                .collect(),
            angles: self
                .angles
                .iter()
                .map(|a| AngleParam {
                    k: f(a.k),
                    angle: f(a.angle),
                })
                .collect(),
            proper_torsions: self
                .proper_torsions
                .iter()
                .map(|t| map_torsion(t, &mut f))
                .collect(),
            improper_torsions: self
                .improper_torsions
                .iter()
                .map(|t| map_torsion(t, &mut f))
                .collect(),
            atoms: self
                .atoms
                .iter()
                .map(|a| AtomParam {
                    charge: f(a.charge),
                    sigma: f(a.sigma),
                    epsilon: f(a.epsilon),
                })
                .collect(),
        }
    }

    /// Every leaf value in a fixed order (bonds, angles, propers, impropers, atoms).
    pub fn leaves(&self) -> impl Iterator<Item = &T> + '_ {
        let bonds = self.bonds.iter().flat_map(|b| [&b.k, &b.length]);
        let angles = self.angles.iter().flat_map(|a| [&a.k, &a.angle]);
        let propers = self
            .proper_torsions
            .iter()
            .flat_map(|t| t.k.iter().chain(t.phase.iter()));
        let impropers = self
            .improper_torsions
            .iter()
            .flat_map(|t| t.k.iter().chain(t.phase.iter()));
        let atoms = self
            .atoms
            .iter()
            .flat_map(|a| [&a.charge, &a.sigma, &a.epsilon]);
        bonds.chain(angles).chain(propers).chain(impropers).chain(atoms)
    }

    /// Mutable access to every leaf value, in the same order as [`ParameterSet::leaves`].
    pub fn leaves_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        let bonds = self
            .bonds
            .iter_mut()
            .flat_map(|b| [&mut b.k, &mut b.length]);
        let angles = self
            .angles
            .iter_mut()
            .flat_map(|a| [&mut a.k, &mut a.angle]);
        let propers = self
            .proper_torsions
            .iter_mut()
            .flat_map(|t| t.k.iter_mut().chain(t.phase.iter_mut()));
        let impropers = self
            .improper_torsions
            .iter_mut()
            .flat_map(|t| t.k.iter_mut().chain(t.phase.iter_mut()));
        let atoms = self
            .atoms
            .iter_mut()
            .flat_map(|a| [&mut a.charge, &mut a.sigma, &mut a.epsilon]);
        bonds.chain(angles).chain(propers).chain(impropers).chain(atoms)
    }

    pub fn leaf_count(&self) -> usize {
        2 * self.bonds.len()
            + 2 * self.angles.len()
            + 8 * (self.proper_torsions.len() + self.improper_torsions.len())
            + 3 * self.atoms.len()
    }

    /// Number of rows in the bundle consumed by `kind`.
    pub fn rows(&self, kind: TermKind) -> usize {
        match kind {
            TermKind::Bond => self.bonds.len(),
            TermKind::Angle => self.angles.len(),
            TermKind::ProperTorsion => self.proper_torsions.len(),
            TermKind::ImproperTorsion => self.improper_torsions.len(),
            TermKind::LennardJones | TermKind::Coulomb => self.atoms.len(),
        }
    }

    /// Checks the bundle consumed by `kind` against the topology.
    pub fn validate_term(&self, kind: TermKind, topology: &Topology) -> Result<(), ShapeError> {
        let found = self.rows(kind);
        let expected = match kind {
            TermKind::Bond => topology.bonds().len(),
            TermKind::Angle => topology.angles().len(),
            TermKind::ProperTorsion => topology.proper_torsions().len(),
            TermKind::ImproperTorsion => topology.improper_torsions().len(),
            TermKind::LennardJones | TermKind::Coulomb => {
                let expected = topology.n_atoms();
                if found != expected {
                    return Err(ShapeError::AtomRows { expected, found });
                }
                return Ok(());
            }
        };
        if found != expected {
            return Err(ShapeError::ParameterRows {
                term: kind,
                expected,
                found,
            });
        }
        Ok(())
    }

    /// Checks every bundle against the topology.
    pub fn validate(&self, topology: &Topology) -> Result<(), ShapeError> {
        TermKind::ALL
            .iter()
            .try_for_each(|&kind| self.validate_term(kind, topology))
    }
}

fn map_torsion<T: Copy, U>(t: &TorsionParam<T>, f: &mut impl FnMut(T) -> U) -> TorsionParam<U> {
    TorsionParam {
        k: t.k.map(&mut *f),
        phase: t.phase.map(&mut *f),
    }
}

impl ParameterSet<f64> {
    /// Reads a parameter set from a TOML file with one array of tables per bundle.
    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ParamLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    /// A set of the same shape with every value zero.
    pub fn zeros_like(&self) -> Self {
        self.map(|_| 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.leaves().all(|v| v.is_finite())
    }
}

/// How per-atom Lennard-Jones parameters combine into pair parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CombiningRule {
    /// σᵢⱼ = (σᵢ + σⱼ)/2, εᵢⱼ = √(εᵢεⱼ).
    #[default]
    LorentzBerthelot,
    /// σᵢⱼ = √(σᵢσⱼ), εᵢⱼ = √(εᵢεⱼ).
    Geometric,
}

impl CombiningRule {
    #[inline]
    pub fn combine<T: Real>(&self, a: &AtomParam<T>, b: &AtomParam<T>) -> (T, T) {
        let epsilon = (a.epsilon * b.epsilon).sqrt();
        let sigma = match self {
            Self::LorentzBerthelot => (a.sigma + b.sigma) * 0.5,
            Self::Geometric => (a.sigma * b.sigma).sqrt(),
        };
        (sigma, epsilon)
    }
}

/// Treatment of electrostatics beyond the plain pairwise sum.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CoulombMethod {
    /// Bare Coulomb truncated at the cutoff.
    #[default]
    Cutoff,
    /// Reaction field with the given solvent dielectric outside the cutoff sphere.
    ReactionField { dielectric: f64 },
}

/// Force-field-specific constants of the nonbonded terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct NonbondedSettings {
    #[serde(default)]
    pub combining_rule: CombiningRule,
    /// Lennard-Jones scale per covalent order 1, 2, 3, ... Pairs beyond the list scale by 1.
    #[serde(default = "default_lj_scales")]
    pub lj_scales: Vec<f64>,
    /// Coulomb scale per covalent order 1, 2, 3, ...
    #[serde(default = "default_coulomb_scales")]
    pub coulomb_scales: Vec<f64>,
    #[serde(default)]
    pub coulomb_method: CoulombMethod,
    /// Start of the Lennard-Jones switching region; `None` truncates sharply.
    #[serde(default)]
    pub switch_distance: Option<f64>,
    #[serde(default = "default_coulomb_constant")]
    pub coulomb_constant: f64,
}

fn default_lj_scales() -> Vec<f64> {
    vec![0.0, 0.0, 0.5]
}
fn default_coulomb_scales() -> Vec<f64> {
    vec![0.0, 0.0, 1.0 / 1.2]
}
fn default_coulomb_constant() -> f64 {
    COULOMB_CONSTANT
}

impl Default for NonbondedSettings {
    fn default() -> Self {
        Self {
            combining_rule: CombiningRule::default(),
            lj_scales: default_lj_scales(),
            coulomb_scales: default_coulomb_scales(),
            coulomb_method: CoulombMethod::default(),
            switch_distance: None,
            coulomb_constant: default_coulomb_constant(),
        }
    }
}

impl NonbondedSettings {
    #[inline]
    pub fn lj_scale(&self, order: u8) -> f64 {
        scale_for(&self.lj_scales, order)
    }

    #[inline]
    pub fn coulomb_scale(&self, order: u8) -> f64 {
        scale_for(&self.coulomb_scales, order)
    }
}

#[inline]
fn scale_for(scales: &[f64], order: u8) -> f64 {
    match order {
        0 => 1.0,
        n => scales.get(usize::from(n) - 1).copied().unwrap_or(1.0),
    }
}
