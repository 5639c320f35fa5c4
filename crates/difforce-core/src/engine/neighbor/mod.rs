//! # Neighbor List
//!
//! Cell-list construction of the nonbonded pair list with a Verlet skin, covalent
//! exclusions and a fixed-capacity pair buffer.
//!
//! [`NeighborList::allocate`] sizes the buffer from the pairs found (times the configured
//! padding). [`NeighborList::update`] refreshes the list for new positions within that
//! capacity and reports [`NeighborListError::CapacityOverflow`] rather than silently
//! dropping pairs; the caller then allocates again.

mod grid;

use crate::core::models::pair::Pair;
use crate::core::models::simulation_box::SimulationBox;
use crate::core::topology::CovalentMap;
use crate::engine::config::{ConfigError, NeighborListConfig};
use grid::CellGrid;
use nalgebra::Point3;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NeighborListError {
    #[error(
        "Pair list overflow: {required} pairs found but capacity is {capacity}; allocate the list again"
    )]
    CapacityOverflow { required: usize, capacity: usize },
    #[error("Neighbor list has not been allocated")]
    NotAllocated,
    #[error("Expected {expected} atoms but received {found} positions")]
    AtomCountMismatch { expected: usize, found: usize },
    #[error(
        "List cutoff {list_cutoff} nm exceeds half the smallest box width ({half_width} nm)"
    )]
    CutoffTooLarge { list_cutoff: f64, half_width: f64 },
    #[error("Position of atom {0} is not finite")]
    NonFinitePosition(usize),
    #[error("Invalid neighbor list configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

#[derive(Debug, Clone)]
struct ListState {
    grid: CellGrid,
    sim_box: Option<SimulationBox>,
    pairs: Vec<Pair>,
    capacity: usize,
    reference_positions: Vec<Point3<f64>>,
}

#[derive(Debug, Clone)]
pub struct NeighborList {
    config: NeighborListConfig,
    covalent_map: Arc<CovalentMap>,
    state: Option<ListState>,
}

impl NeighborList {
    pub fn new(
        config: NeighborListConfig,
        covalent_map: Arc<CovalentMap>,
    ) -> Result<Self, NeighborListError> {
        config.validate()?;
        Ok(Self {
            config,
            covalent_map,
            state: None,
        })
    }

    pub fn config(&self) -> &NeighborListConfig {
        &self.config
    }

    pub fn covalent_map(&self) -> &Arc<CovalentMap> {
        &self.covalent_map
    }

    pub fn is_allocated(&self) -> bool {
        self.state.is_some()
    }

    /// Current pair list, sorted by `(i, j)`. Empty before allocation.
    pub fn pairs(&self) -> &[Pair] {
        self.state.as_ref().map_or([].as_slice(), |s| s.pairs.as_slice())
    }

    /// Maximum number of pairs [`NeighborList::update`] can store without reallocation.
    pub fn capacity(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.capacity)
    }

    pub fn sim_box(&self) -> Option<&SimulationBox> {
        self.state.as_ref().and_then(|s| s.sim_box.as_ref())
    }

    /// Builds the pair list from scratch and sizes the buffer for later updates.
    ///
    /// Also the way to change the periodic box: [`NeighborList::update`] always reuses the
    /// box given here.
    #[instrument(skip_all, name = "neighbor_list_allocate", fields(n_atoms = positions.len()))]
    pub fn allocate(
        &mut self,
        positions: &[Point3<f64>],
        sim_box: Option<&SimulationBox>,
    ) -> Result<&[Pair], NeighborListError> {
        self.check_positions(positions, self.covalent_map.n_atoms())?;

        let list_cutoff = self.config.list_cutoff();
        let grid = match sim_box {
            Some(b) => {
                let half_width = 0.5 * b.perpendicular_widths().min();
                if list_cutoff > half_width {
                    return Err(NeighborListError::CutoffTooLarge {
                        list_cutoff,
                        half_width,
                    });
                }
                CellGrid::periodic(b, list_cutoff, positions.len())
            }
            None => CellGrid::open(positions, list_cutoff),
        };

        let found = find_pairs(
            &grid,
            positions,
            sim_box,
            &self.covalent_map,
            &self.config,
        );
        // At least one free slot, even when nothing was found.
        let capacity = ((found.len() as f64 * self.config.capacity_padding).ceil() as usize)
            .max(found.len() + 1);
        let mut pairs = Vec::with_capacity(capacity);
        pairs.extend(found);

        debug!(
            n_pairs = pairs.len(),
            capacity,
            cells = ?grid.dims(),
            periodic = grid.is_periodic(),
            "Allocated neighbor list."
        );

        let state = self.state.insert(ListState {
            grid,
            sim_box: sim_box.cloned(),
            pairs,
            capacity,
            reference_positions: positions.to_vec(),
        });
        Ok(&state.pairs)
    }

    /// Recomputes the pair list for new positions with the allocated box and capacity.
    ///
    /// On overflow the previous list is left untouched and the error carries the number
    /// of pairs that would have been needed.
    #[instrument(skip_all, name = "neighbor_list_update", fields(n_atoms = positions.len()))]
    pub fn update(&mut self, positions: &[Point3<f64>]) -> Result<&[Pair], NeighborListError> {
        let expected = match &self.state {
            Some(state) => state.reference_positions.len(),
            None => return Err(NeighborListError::NotAllocated),
        };
        self.check_positions(positions, expected)?;

        let Some(state) = self.state.as_mut() else {
            return Err(NeighborListError::NotAllocated);
        };
        let found = find_pairs(
            &state.grid,
            positions,
            state.sim_box.as_ref(),
            &self.covalent_map,
            &self.config,
        );

        if found.len() > state.capacity {
            warn!(
                required = found.len(),
                capacity = state.capacity,
                "Neighbor list capacity exceeded; reallocation required."
            );
            return Err(NeighborListError::CapacityOverflow {
                required: found.len(),
                capacity: state.capacity,
            });
        }

        state.pairs.clear();
        state.pairs.extend(found);
        state.reference_positions.clear();
        state.reference_positions.extend_from_slice(positions);
        debug!(n_pairs = state.pairs.len(), "Updated neighbor list.");
        Ok(&state.pairs)
    }

    /// Whether any atom has moved more than half the skin since the list was last built,
    /// after which pairs entering the cutoff may be missing.
    pub fn needs_rebuild(&self, positions: &[Point3<f64>]) -> bool {
        let Some(state) = &self.state else {
            return true;
        };
        if positions.len() != state.reference_positions.len() {
            return true;
        }
        let limit = 0.5 * self.config.skin;
        let limit_sq = limit * limit;
        positions
            .iter()
            .zip(&state.reference_positions)
            .any(|(now, then)| {
                let d = now - then;
                let d = match &state.sim_box {
                    Some(b) => b.minimum_image_f64(&d),
                    None => d,
                };
                d.norm_squared() > limit_sq
            })
    }

    fn check_positions(
        &self,
        positions: &[Point3<f64>],
        expected: usize,
    ) -> Result<(), NeighborListError> {
        if positions.len() != expected {
            return Err(NeighborListError::AtomCountMismatch {
                expected,
                found: positions.len(),
            });
        }
        match positions
            .iter()
            .position(|p| !p.coords.iter().all(|v| v.is_finite()))
        {
            Some(atom) => Err(NeighborListError::NonFinitePosition(atom)),
            None => Ok(()),
        }
    }
}

/// Every pair `i < j` within the list cutoff that is not covalently excluded, sorted.
fn find_pairs(
    grid: &CellGrid,
    positions: &[Point3<f64>],
    sim_box: Option<&SimulationBox>,
    covalent_map: &CovalentMap,
    config: &NeighborListConfig,
) -> Vec<Pair> {
    let bins = grid.bin(positions);
    let list_cutoff_sq = config.list_cutoff().powi(2);
    let min_order = config.min_covalent_order;

    let scan_cell = |cell: usize| -> Vec<Pair> {
        let neighbors = grid.neighbor_cells(cell);
        let mut found = Vec::new();
        for &i in bins.atoms_in(cell) {
            for &other in &neighbors {
                for &j in bins.atoms_in(other).iter().filter(|&&j| j > i) {
                    let d = positions[j] - positions[i];
                    let d = match sim_box {
                        Some(b) => b.minimum_image_f64(&d),
                        None => d,
                    };
                    if d.norm_squared() > list_cutoff_sq {
                        continue;
                    }
                    let order = covalent_map.order(i, j);
                    if order != 0 && order < min_order {
                        continue;
                    }
                    found.push(Pair { i, j, order });
                }
            }
        }
        found
    };

    #[cfg(not(feature = "parallel"))]
    let iterator = 0..grid.n_cells();

    #[cfg(feature = "parallel")]
    let iterator = (0..grid.n_cells()).into_par_iter();

    let mut pairs: Vec<Pair> = iterator.map(scan_cell).flatten().collect();
    pairs.sort_unstable();
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::topology::Topology;
    use nalgebra::{Matrix3, Vector3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn config(cutoff: f64, skin: f64) -> NeighborListConfig {
        NeighborListConfig {
            skin,
            ..NeighborListConfig::new(cutoff)
        }
    }

    fn unbonded(n: usize) -> Arc<CovalentMap> {
        Arc::new(CovalentMap::build(&Topology::new(n), 3))
    }

    fn brute_force(
        positions: &[Point3<f64>],
        sim_box: Option<&SimulationBox>,
        map: &CovalentMap,
        config: &NeighborListConfig,
    ) -> Vec<Pair> {
        let mut pairs = Vec::new();
        for i in 0..positions.len() {
            for j in i + 1..positions.len() {
                let d = positions[j] - positions[i];
                let d = sim_box.map_or(d, |b| b.minimum_image_f64(&d));
                let order = map.order(i, j);
                if d.norm() <= config.list_cutoff()
                    && !(order != 0 && order < config.min_covalent_order)
                {
                    pairs.push(Pair { i, j, order });
                }
            }
        }
        pairs
    }

    fn random_positions(rng: &mut StdRng, n: usize, sim_box: &SimulationBox) -> Vec<Point3<f64>> {
        (0..n)
            .map(|_| {
                let s = Vector3::new(
                    rng.gen_range(-0.5..1.5),
                    rng.gen_range(-0.5..1.5),
                    rng.gen_range(-0.5..1.5),
                );
                Point3::from(sim_box.to_cartesian(&s))
            })
            .collect()
    }

    fn triclinic() -> SimulationBox {
        SimulationBox::new(Matrix3::new(
            3.0, 0.0, 0.0, //
            1.2, 2.8, 0.0, //
            -0.9, 1.1, 3.1,
        ))
        .unwrap()
    }

    #[test]
    fn allocate_matches_brute_force_in_orthorhombic_box() {
        let mut rng = StdRng::seed_from_u64(11);
        let b = SimulationBox::orthorhombic(5.0, 4.0, 6.0).unwrap();
        let positions = random_positions(&mut rng, 300, &b);
        let cfg = config(0.9, 0.1);
        let map = unbonded(300);
        let mut list = NeighborList::new(cfg.clone(), map.clone()).unwrap();
        let pairs = list.allocate(&positions, Some(&b)).unwrap().to_vec();
        assert!(!pairs.is_empty());
        assert_eq!(pairs, brute_force(&positions, Some(&b), &map, &cfg));
    }

    #[test]
    fn allocate_matches_brute_force_in_small_triclinic_box() {
        let mut rng = StdRng::seed_from_u64(5);
        let b = triclinic();
        let positions = random_positions(&mut rng, 120, &b);
        let cfg = config(1.0, 0.2);
        let map = unbonded(120);
        let mut list = NeighborList::new(cfg.clone(), map.clone()).unwrap();
        let pairs = list.allocate(&positions, Some(&b)).unwrap().to_vec();
        assert_eq!(pairs, brute_force(&positions, Some(&b), &map, &cfg));
    }

    #[test]
    fn allocate_matches_brute_force_without_box() {
        let mut rng = StdRng::seed_from_u64(23);
        let positions: Vec<Point3<f64>> = (0..200)
            .map(|_| {
                Point3::new(
                    rng.gen_range(-2.0..2.0),
                    rng.gen_range(0.0..6.0),
                    rng.gen_range(-1.0..1.0),
                )
            })
            .collect();
        let cfg = config(0.8, 0.0);
        let map = unbonded(200);
        let mut list = NeighborList::new(cfg.clone(), map.clone()).unwrap();
        let pairs = list.allocate(&positions, None).unwrap().to_vec();
        assert_eq!(pairs, brute_force(&positions, None, &map, &cfg));
    }

    #[test]
    fn covalent_pairs_below_min_order_are_excluded() {
        let topology = Topology::from_bonds(5, (0..4).map(|i| (i, i + 1))).unwrap();
        let map = Arc::new(CovalentMap::build(&topology, 3));
        let positions: Vec<_> = (0..5)
            .map(|i| Point3::new(0.1 * i as f64, 0.0, 0.0))
            .collect();
        let mut list = NeighborList::new(config(1.0, 0.0), map).unwrap();
        let pairs = list.allocate(&positions, None).unwrap();
        let listed: Vec<_> = pairs.iter().map(|p| (p.i, p.j, p.order)).collect();
        assert_eq!(listed, vec![(0, 3, 3), (0, 4, 0), (1, 4, 3)]);
    }

    #[test]
    fn capacity_is_padded_pair_count() {
        let positions: Vec<_> = (0..4)
            .map(|i| Point3::new(0.3 * i as f64, 0.0, 0.0))
            .collect();
        let mut list = NeighborList::new(config(1.0, 0.0), unbonded(4)).unwrap();
        let n = list.allocate(&positions, None).unwrap().len();
        assert_eq!(n, 6);
        assert_eq!(list.capacity(), 8);
    }

    #[test]
    fn empty_allocation_leaves_room_for_a_new_pair() {
        let far = [Point3::origin(), Point3::new(5.0, 0.0, 0.0)];
        let mut list = NeighborList::new(config(1.0, 0.0), unbonded(2)).unwrap();
        assert!(list.allocate(&far, None).unwrap().is_empty());
        assert!(list.capacity() > 0);

        let near = [Point3::origin(), Point3::new(0.5, 0.0, 0.0)];
        let pairs = list.update(&near).unwrap();
        assert_eq!(pairs, &[Pair::new(0, 1, 0)]);
    }

    #[test]
    fn update_matches_fresh_allocation_after_small_moves() {
        let mut rng = StdRng::seed_from_u64(3);
        let b = SimulationBox::orthorhombic(4.0, 4.0, 4.0).unwrap();
        let positions = random_positions(&mut rng, 150, &b);
        let cfg = NeighborListConfig {
            capacity_padding: 2.0,
            ..config(0.9, 0.2)
        };
        let mut list = NeighborList::new(cfg.clone(), unbonded(150)).unwrap();
        list.allocate(&positions, Some(&b)).unwrap();

        let moved: Vec<_> = positions
            .iter()
            .map(|p| p + Vector3::new(rng.gen_range(-0.05..0.05), 0.02, -0.03))
            .collect();
        let updated = list.update(&moved).unwrap().to_vec();

        let mut fresh = NeighborList::new(cfg, unbonded(150)).unwrap();
        let expected = fresh.allocate(&moved, Some(&b)).unwrap();
        assert_eq!(updated, expected);
    }

    #[test]
    fn update_overflow_reports_required_and_keeps_previous_pairs() {
        let spread: Vec<_> = (0..6)
            .map(|i| Point3::new(2.0 * i as f64, 0.0, 0.0))
            .collect();
        let mut list = NeighborList::new(config(1.0, 0.0), unbonded(6)).unwrap();
        let before = list.allocate(&spread[..], None).unwrap().to_vec();
        assert!(before.is_empty());
        assert_eq!(list.capacity(), 1);

        let packed: Vec<_> = (0..6)
            .map(|i| Point3::new(0.1 * i as f64, 0.0, 0.0))
            .collect();
        let result = list.update(&packed);
        assert_eq!(
            result,
            Err(NeighborListError::CapacityOverflow {
                required: 15,
                capacity: 1
            })
        );
        assert_eq!(list.pairs(), before.as_slice());

        let reallocated = list.allocate(&packed, None).unwrap();
        assert_eq!(reallocated.len(), 15);
    }

    #[test]
    fn update_before_allocate_fails() {
        let mut list = NeighborList::new(config(1.0, 0.0), unbonded(2)).unwrap();
        let positions = [Point3::origin(), Point3::new(0.5, 0.0, 0.0)];
        assert_eq!(list.update(&positions), Err(NeighborListError::NotAllocated));
    }

    #[test]
    fn update_rejects_changed_atom_count() {
        let mut list = NeighborList::new(config(1.0, 0.0), unbonded(2)).unwrap();
        let positions = [Point3::origin(), Point3::new(0.5, 0.0, 0.0)];
        list.allocate(&positions, None).unwrap();
        assert_eq!(
            list.update(&positions[..1]),
            Err(NeighborListError::AtomCountMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn allocate_rejects_cutoff_beyond_half_box() {
        let b = SimulationBox::orthorhombic(2.0, 3.0, 3.0).unwrap();
        let mut list = NeighborList::new(config(0.9, 0.2), unbonded(1)).unwrap();
        let result = list.allocate(&[Point3::origin()], Some(&b));
        assert!(matches!(
            result,
            Err(NeighborListError::CutoffTooLarge { .. })
        ));
        assert!(!list.is_allocated());
    }

    #[test]
    fn allocate_rejects_non_finite_positions() {
        let mut list = NeighborList::new(config(1.0, 0.0), unbonded(2)).unwrap();
        let positions = [Point3::origin(), Point3::new(f64::NAN, 0.0, 0.0)];
        assert_eq!(
            list.allocate(&positions, None),
            Err(NeighborListError::NonFinitePosition(1))
        );
    }

    #[test]
    fn new_rejects_invalid_config() {
        let result = NeighborList::new(config(-1.0, 0.0), unbonded(1));
        assert!(matches!(result, Err(NeighborListError::InvalidConfig(_))));
    }

    #[test]
    fn pair_exactly_at_list_cutoff_is_included() {
        let positions = [Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        let mut list = NeighborList::new(config(0.75, 0.25), unbonded(2)).unwrap();
        assert_eq!(list.allocate(&positions, None).unwrap().len(), 1);
    }

    #[test]
    fn needs_rebuild_after_half_skin_displacement() {
        let positions = [Point3::origin(), Point3::new(0.5, 0.0, 0.0)];
        let mut list = NeighborList::new(config(1.0, 0.2), unbonded(2)).unwrap();
        assert!(list.needs_rebuild(&positions));
        list.allocate(&positions, None).unwrap();
        assert!(!list.needs_rebuild(&positions));
        let nudged = [Point3::new(0.09, 0.0, 0.0), positions[1]];
        assert!(!list.needs_rebuild(&nudged));
        let moved = [Point3::new(0.11, 0.0, 0.0), positions[1]];
        assert!(list.needs_rebuild(&moved));
    }

    #[test]
    fn repeated_allocation_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(99);
        let b = triclinic();
        let positions = random_positions(&mut rng, 80, &b);
        let mut list = NeighborList::new(config(1.0, 0.1), unbonded(80)).unwrap();
        let first = list.allocate(&positions, Some(&b)).unwrap().to_vec();
        let second = list.allocate(&positions, Some(&b)).unwrap().to_vec();
        assert_eq!(first, second);
    }
}
