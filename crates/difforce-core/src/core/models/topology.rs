use itertools::Itertools;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Atom index {index} is out of range for a topology with {n_atoms} atoms")]
    AtomOutOfRange { index: usize, n_atoms: usize },
    #[error("Atom {0} cannot be bonded to itself")]
    SelfBond(usize),
    #[error("Bond {0}-{1} is already present")]
    DuplicateBond(usize, usize),
    #[error("{term} {indices:?} references the same atom more than once")]
    RepeatedAtom {
        term: &'static str,
        indices: Vec<usize>,
    },
}

/// Connectivity of a molecular system: the bond graph plus the index tuples of every
/// bonded term.
///
/// Atoms are identified by dense 0-based indices. Row `n` of a parameter bundle belongs to
/// entry `n` of the corresponding index list, so the insertion order of bonds, angles and
/// torsions is significant and preserved.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    n_atoms: usize,
    bonds: Vec<[usize; 2]>,
    angles: Vec<[usize; 3]>,
    proper_torsions: Vec<[usize; 4]>,
    improper_torsions: Vec<[usize; 4]>,
    bond_set: HashSet<(usize, usize)>,
}

impl Topology {
    pub fn new(n_atoms: usize) -> Self {
        Self {
            n_atoms,
            ..Self::default()
        }
    }

    /// Builds a topology from a bond list.
    pub fn from_bonds(
        n_atoms: usize,
        bonds: impl IntoIterator<Item = (usize, usize)>,
    ) -> Result<Self, TopologyError> {
        let mut topology = Self::new(n_atoms);
        for (i, j) in bonds {
            topology.add_bond(i, j)?;
        }
        Ok(topology)
    }

    pub fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    pub fn bonds(&self) -> &[[usize; 2]] {
        &self.bonds
    }

    pub fn angles(&self) -> &[[usize; 3]] {
        &self.angles
    }

    pub fn proper_torsions(&self) -> &[[usize; 4]] {
        &self.proper_torsions
    }

    pub fn improper_torsions(&self) -> &[[usize; 4]] {
        &self.improper_torsions
    }

    pub fn has_bond(&self, i: usize, j: usize) -> bool {
        self.bond_set.contains(&(i.min(j), i.max(j)))
    }

    pub fn add_bond(&mut self, i: usize, j: usize) -> Result<(), TopologyError> {
        self.check_indices(&[i, j])?;
        if i == j {
            return Err(TopologyError::SelfBond(i));
        }
        if !self.bond_set.insert((i.min(j), i.max(j))) {
            return Err(TopologyError::DuplicateBond(i, j));
        }
        self.bonds.push([i, j]);
        Ok(())
    }

    pub fn add_angle(&mut self, atoms: [usize; 3]) -> Result<(), TopologyError> {
        self.check_term("Angle", &atoms)?;
        self.angles.push(atoms);
        Ok(())
    }

    pub fn add_proper_torsion(&mut self, atoms: [usize; 4]) -> Result<(), TopologyError> {
        self.check_term("Proper torsion", &atoms)?;
        self.proper_torsions.push(atoms);
        Ok(())
    }

    pub fn add_improper_torsion(&mut self, atoms: [usize; 4]) -> Result<(), TopologyError> {
        self.check_term("Improper torsion", &atoms)?;
        self.improper_torsions.push(atoms);
        Ok(())
    }

    /// Sorted neighbor lists of the bond graph, one per atom.
    pub fn adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.n_atoms];
        for &[i, j] in &self.bonds {
            adjacency[i].push(j);
            adjacency[j].push(i);
        }
        for neighbors in &mut adjacency {
            neighbors.sort_unstable();
        }
        adjacency
    }

    /// Appends every bonded triple `a-b-c` not already present, ordered by central atom.
    ///
    /// Returns the number of angles added.
    pub fn generate_angles(&mut self) -> usize {
        let mut seen: HashSet<(usize, usize, usize)> = self
            .angles
            .iter()
            .map(|&[a, b, c]| (a.min(c), b, a.max(c)))
            .collect();

        let before = self.angles.len();
        for (center, neighbors) in self.adjacency().iter().enumerate() {
            for (&a, &c) in neighbors.iter().tuple_combinations() {
                if seen.insert((a, center, c)) {
                    self.angles.push([a, center, c]);
                }
            }
        }
        self.angles.len() - before
    }

    /// Appends every bonded quadruple `i-j-k-l` not already present, ordered by central bond.
    ///
    /// Three-membered rings (`i == l`) do not form torsions. Returns the number added.
    pub fn generate_proper_torsions(&mut self) -> usize {
        let canonical = |t: [usize; 4]| {
            let reversed = [t[3], t[2], t[1], t[0]];
            if t <= reversed { t } else { reversed }
        };
        let mut seen: HashSet<[usize; 4]> =
            self.proper_torsions.iter().copied().map(canonical).collect();

        let adjacency = self.adjacency();
        let before = self.proper_torsions.len();
        for &[j, k] in &self.bonds {
            for &i in adjacency[j].iter().filter(|&&i| i != k) {
                for &l in adjacency[k].iter().filter(|&&l| l != j && l != i) {
                    let torsion = [i, j, k, l];
                    if seen.insert(canonical(torsion)) {
                        self.proper_torsions.push(torsion);
                    }
                }
            }
        }
        self.proper_torsions.len() - before
    }

    fn check_indices(&self, indices: &[usize]) -> Result<(), TopologyError> {
        match indices.iter().find(|&&index| index >= self.n_atoms) {
            Some(&index) => Err(TopologyError::AtomOutOfRange {
                index,
                n_atoms: self.n_atoms,
            }),
            None => Ok(()),
        }
    }

    fn check_term(&self, term: &'static str, indices: &[usize]) -> Result<(), TopologyError> {
        self.check_indices(indices)?;
        if !indices.iter().all_unique() {
            return Err(TopologyError::RepeatedAtom {
                term,
                indices: indices.to_vec(),
            });
        }
        Ok(())
    }
}
