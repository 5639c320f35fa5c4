use crate::core::models::topology::Topology;
use std::collections::VecDeque;

/// Default bond-graph radius tracked by the covalent map (1-2, 1-3 and 1-4 neighbors).
pub const DEFAULT_MAX_COVALENT_ORDER: u8 = 3;

/// Topological bond distance between atom pairs, capped at a maximum order.
///
/// `order(i, j)` is the length of the shortest bond path between `i` and `j` when it does
/// not exceed the cap, and `0` otherwise (including `i == j`). The map is symmetric and is
/// immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CovalentMap {
    max_order: u8,
    /// Per-atom `(neighbor, order)` entries sorted by neighbor index.
    rows: Vec<Vec<(usize, u8)>>,
}

impl CovalentMap {
    pub fn build(topology: &Topology, max_order: u8) -> Self {
        Self::from_adjacency(&topology.adjacency(), max_order)
    }

    /// Breadth-first search from every atom, truncated at `max_order` hops.
    ///
    /// The graph need not be connected. Work is proportional to the number of atoms times
    /// the size of each atom's `max_order` neighborhood.
    pub fn from_adjacency(adjacency: &[Vec<usize>], max_order: u8) -> Self {
        let n_atoms = adjacency.len();
        let mut rows = Vec::with_capacity(n_atoms);
        let mut depth: Vec<Option<u8>> = vec![None; n_atoms];
        let mut visited = Vec::new();
        let mut queue = VecDeque::new();

        for source in 0..n_atoms {
            depth[source] = Some(0);
            visited.push(source);
            queue.push_back(source);

            while let Some(atom) = queue.pop_front() {
                let d = depth[atom].unwrap_or(0);
                if d >= max_order {
                    continue;
                }
                for &next in &adjacency[atom] {
                    if depth[next].is_none() {
                        depth[next] = Some(d + 1);
                        visited.push(next);
                        queue.push_back(next);
                    }
                }
            }

            let mut row: Vec<(usize, u8)> = visited
                .iter()
                .filter(|&&atom| atom != source)
                .filter_map(|&atom| depth[atom].map(|d| (atom, d)))
                .collect();
            row.sort_unstable();
            rows.push(row);

            for &atom in &visited {
                depth[atom] = None;
            }
            visited.clear();
        }

        Self { max_order, rows }
    }

    pub fn max_order(&self) -> u8 {
        self.max_order
    }

    pub fn n_atoms(&self) -> usize {
        self.rows.len()
    }

    /// Covalent order of the pair, `0` when unconnected within the cap.
    pub fn order(&self, i: usize, j: usize) -> u8 {
        self.rows
            .get(i)
            .and_then(|row| {
                row.binary_search_by_key(&j, |&(atom, _)| atom)
                    .ok()
                    .map(|pos| row[pos].1)
            })
            .unwrap_or(0)
    }

    pub fn neighbors(&self, i: usize) -> &[(usize, u8)] {
        self.rows.get(i).map_or([].as_slice(), |row| row.as_slice())
    }

    /// Every connected unordered pair `(i, j, order)` with `i < j`, in index order.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize, u8)> + '_ {
        self.rows.iter().enumerate().flat_map(|(i, row)| {
            row.iter()
                .filter(move |&&(j, _)| j > i)
                .map(move |&(j, order)| (i, j, order))
        })
    }

    pub fn len(&self) -> usize {
        self.pairs().count()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.is_empty())
    }
}
