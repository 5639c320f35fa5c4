use phf::{Map, phf_map};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Index};
use std::str::FromStr;
use thiserror::Error;

/// One independently evaluable energy term.
///
/// The declaration order is the summation order of the combined energy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum TermKind {
    Bond,
    Angle,
    ProperTorsion,
    ImproperTorsion,
    LennardJones,
    Coulomb,
}

static TERM_ALIASES: Map<&'static str, TermKind> = phf_map! {
    "bond" => TermKind::Bond,
    "harmonicbondforce" => TermKind::Bond,
    "angle" => TermKind::Angle,
    "harmonicangleforce" => TermKind::Angle,
    "proper" => TermKind::ProperTorsion,
    "proper-torsion" => TermKind::ProperTorsion,
    "periodictorsionforce" => TermKind::ProperTorsion,
    "improper" => TermKind::ImproperTorsion,
    "improper-torsion" => TermKind::ImproperTorsion,
    "impropertorsionforce" => TermKind::ImproperTorsion,
    "lj" => TermKind::LennardJones,
    "vdw" => TermKind::LennardJones,
    "lennard-jones" => TermKind::LennardJones,
    "lennardjonesforce" => TermKind::LennardJones,
    "coulomb" => TermKind::Coulomb,
    "elec" => TermKind::Coulomb,
    "coulombforce" => TermKind::Coulomb,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown energy term '{0}'")]
pub struct ParseTermKindError(pub String);

impl TermKind {
    pub const ALL: [TermKind; 6] = [
        TermKind::Bond,
        TermKind::Angle,
        TermKind::ProperTorsion,
        TermKind::ImproperTorsion,
        TermKind::LennardJones,
        TermKind::Coulomb,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bond => "HarmonicBondForce",
            Self::Angle => "HarmonicAngleForce",
            Self::ProperTorsion => "PeriodicTorsionForce",
            Self::ImproperTorsion => "ImproperTorsionForce",
            Self::LennardJones => "LennardJonesForce",
            Self::Coulomb => "CoulombForce",
        }
    }

    pub fn is_nonbonded(&self) -> bool {
        matches!(self, Self::LennardJones | Self::Coulomb)
    }
}

impl FromStr for TermKind {
    type Err = ParseTermKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TERM_ALIASES
            .get(s.trim().to_lowercase().as_str())
            .copied()
            .ok_or_else(|| ParseTermKindError(s.to_string()))
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Energy of each term of one evaluation, in kJ/mol.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergyTerms {
    pub bond: f64,
    pub angle: f64,
    pub proper_torsion: f64,
    pub improper_torsion: f64,
    pub lennard_jones: f64,
    pub coulomb: f64,
}

impl EnergyTerms {
    pub fn get(&self, kind: TermKind) -> f64 {
        self[kind]
    }

    pub fn set(&mut self, kind: TermKind, value: f64) {
        match kind {
            TermKind::Bond => self.bond = value,
            TermKind::Angle => self.angle = value,
            TermKind::ProperTorsion => self.proper_torsion = value,
            TermKind::ImproperTorsion => self.improper_torsion = value,
            TermKind::LennardJones => self.lennard_jones = value,
            TermKind::Coulomb => self.coulomb = value,
        }
    }

    /// Sum in [`TermKind::ALL`] order, matching the combined energy.
    #[inline]
    pub fn total(&self) -> f64 {
        TermKind::ALL.iter().fold(0.0, |acc, &kind| acc + self[kind])
    }

    pub fn bonded(&self) -> f64 {
        self.bond + self.angle + self.proper_torsion + self.improper_torsion
    }

    pub fn nonbonded(&self) -> f64 {
        self.lennard_jones + self.coulomb
    }
}

impl Index<TermKind> for EnergyTerms {
    type Output = f64;

    fn index(&self, kind: TermKind) -> &Self::Output {
        match kind {
            TermKind::Bond => &self.bond,
            TermKind::Angle => &self.angle,
            TermKind::ProperTorsion => &self.proper_torsion,
            TermKind::ImproperTorsion => &self.improper_torsion,
            TermKind::LennardJones => &self.lennard_jones,
            TermKind::Coulomb => &self.coulomb,
        }
    }
}

impl Add for EnergyTerms {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign for EnergyTerms {
    fn add_assign(&mut self, rhs: Self) {
        for kind in TermKind::ALL {
            self.set(kind, self[kind] + rhs[kind]);
        }
    }
}

impl Sum for EnergyTerms {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(values: [f64; 6]) -> EnergyTerms {
        let mut terms = EnergyTerms::default();
        for (kind, value) in TermKind::ALL.into_iter().zip(values) {
            terms.set(kind, value);
        }
        terms
    }

    #[test]
    fn from_str_accepts_canonical_names_and_aliases() {
        assert_eq!("HarmonicBondForce".parse(), Ok(TermKind::Bond));
        assert_eq!("periodictorsionforce".parse(), Ok(TermKind::ProperTorsion));
        assert_eq!(" LJ ".parse(), Ok(TermKind::LennardJones));
        assert_eq!("elec".parse(), Ok(TermKind::Coulomb));
        assert_eq!(
            "UreyBradleyForce".parse::<TermKind>(),
            Err(ParseTermKindError("UreyBradleyForce".to_string()))
        );
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for kind in TermKind::ALL {
            assert_eq!(kind.to_string().parse(), Ok(kind));
        }
    }

    #[test]
    fn all_is_sorted_in_declaration_order() {
        let mut sorted = TermKind::ALL;
        sorted.sort();
        assert_eq!(sorted, TermKind::ALL);
    }

    #[test]
    fn total_returns_sum_of_all_terms() {
        let e = terms([1.0, 2.0, 3.0, 4.0, -5.0, -6.0]);
        assert_eq!(e.total(), -1.0);
        assert_eq!(e.bonded(), 10.0);
        assert_eq!(e.nonbonded(), -11.0);
    }

    #[test]
    fn add_and_sum_accumulate_each_field() {
        let a = terms([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = terms([0.5; 6]);
        assert_eq!(a + b, terms([1.5, 2.5, 3.5, 4.5, 5.5, 6.5]));
        let total: EnergyTerms = [a, b, b].into_iter().sum();
        assert_eq!(total, terms([2.0, 3.0, 4.0, 5.0, 6.0, 7.0]));
    }

    #[test]
    fn index_matches_get_and_set() {
        let mut e = EnergyTerms::default();
        e.set(TermKind::Coulomb, -3.5);
        assert_eq!(e[TermKind::Coulomb], -3.5);
        assert_eq!(e.get(TermKind::Bond), 0.0);
    }
}
