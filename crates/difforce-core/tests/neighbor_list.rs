use difforce::core::forcefield::params::{AtomParam, ParameterSet};
use difforce::core::models::pair::Pair;
use difforce::core::models::simulation_box::SimulationBox;
use difforce::core::models::topology::Topology;
use difforce::core::topology::CovalentMap;
use difforce::engine::config::EngineConfig;
use difforce::engine::neighbor::{NeighborList, NeighborListError};
use difforce::engine::potential::{EnergyFunction, Potential};
use nalgebra::{Matrix3, Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

fn brute_force(
    positions: &[Point3<f64>],
    sim_box: Option<&SimulationBox>,
    map: &CovalentMap,
    list_cutoff: f64,
    min_order: u8,
) -> BTreeSet<Pair> {
    let mut pairs = BTreeSet::new();
    for i in 0..positions.len() {
        for j in i + 1..positions.len() {
            let d = positions[j] - positions[i];
            let d = sim_box.map_or(d, |b| b.minimum_image_f64(&d));
            let order = map.order(i, j);
            let excluded = order != 0 && order < min_order;
            if !excluded && d.norm() <= list_cutoff {
                pairs.insert(Pair { i, j, order });
            }
        }
    }
    pairs
}

/// Short chains of four atoms scattered through the box.
fn solvated_chains(n_chains: usize) -> Topology {
    let bonds = (0..n_chains).flat_map(|c| {
        let base = 4 * c;
        [(base, base + 1), (base + 1, base + 2), (base + 2, base + 3)]
    });
    Topology::from_bonds(4 * n_chains, bonds).unwrap()
}

fn random_positions(rng: &mut StdRng, sim_box: &SimulationBox, n: usize) -> Vec<Point3<f64>> {
    (0..n)
        .map(|_| {
            let s = Vector3::from_fn(|_, _| rng.gen_range(-0.5..1.5));
            Point3::from(sim_box.to_cartesian(&s))
        })
        .collect()
}

fn skewed_box() -> SimulationBox {
    SimulationBox::new(Matrix3::new(
        3.0, 0.0, 0.0, //
        0.9, 2.8, 0.0, //
        -0.6, 0.7, 3.1,
    ))
    .unwrap()
}

#[test]
fn allocate_and_update_match_brute_force_in_a_triclinic_box() {
    let topology = solvated_chains(60);
    let config = EngineConfig::builder().cutoff(0.9).skin(0.1).build().unwrap();
    let potential = Potential::new(topology, config).unwrap();
    let sim_box = skewed_box();
    let map = potential.covalent_map();
    let list_cutoff = potential.config().neighbor_list.list_cutoff();

    let mut rng = StdRng::seed_from_u64(42);
    let first = random_positions(&mut rng, &sim_box, 240);
    let mut list = potential.neighbor_list().unwrap();
    let allocated: BTreeSet<Pair> = list
        .allocate(&first, Some(&sim_box))
        .unwrap()
        .iter()
        .copied()
        .collect();
    assert_eq!(
        allocated,
        brute_force(&first, Some(&sim_box), map, list_cutoff, 3)
    );

    let second: Vec<_> = first
        .iter()
        .map(|p| p + Vector3::from_fn(|_, _| rng.gen_range(-0.02..0.02)))
        .collect();
    let updated = match list.update(&second) {
        Ok(pairs) => pairs.to_vec(),
        Err(NeighborListError::CapacityOverflow { .. }) => {
            list.allocate(&second, Some(&sim_box)).unwrap().to_vec()
        }
        Err(e) => panic!("unexpected error: {e}"),
    };
    let mut fresh = potential.neighbor_list().unwrap();
    let reallocated = fresh.allocate(&second, Some(&sim_box)).unwrap().to_vec();
    assert_eq!(updated, reallocated);
    assert_eq!(
        updated.iter().copied().collect::<BTreeSet<_>>(),
        brute_force(&second, Some(&sim_box), map, list_cutoff, 3)
    );

    // Returning to the first configuration reproduces the first list exactly.
    let back: BTreeSet<Pair> = list.update(&first).unwrap().iter().copied().collect();
    assert_eq!(back, allocated);
}

#[test]
fn pair_list_is_independent_of_wrapping() {
    let topology = solvated_chains(25);
    let potential = Potential::new(topology, EngineConfig::new(1.0)).unwrap();
    let sim_box = skewed_box();
    let mut rng = StdRng::seed_from_u64(3);
    let positions = random_positions(&mut rng, &sim_box, 100);
    let shifted: Vec<_> = positions
        .iter()
        .enumerate()
        .map(|(i, p)| p + sim_box.lattice_translation([(i % 3) as i32 - 1, 2, -1]))
        .collect();

    let mut list = potential.neighbor_list().unwrap();
    let a = list.allocate(&positions, Some(&sim_box)).unwrap().to_vec();
    let b = list.allocate(&shifted, Some(&sim_box)).unwrap().to_vec();
    assert_eq!(a, b);
}

#[test]
fn no_pair_below_the_exclusion_threshold_is_listed() {
    let topology = solvated_chains(30);
    let config = EngineConfig::builder()
        .cutoff(1.2)
        .min_covalent_order(4)
        .max_covalent_order(4)
        .build()
        .unwrap();
    let potential = Potential::new(topology, config).unwrap();
    let sim_box = SimulationBox::orthorhombic(2.6, 2.6, 2.6).unwrap();
    let mut rng = StdRng::seed_from_u64(9);
    let positions = random_positions(&mut rng, &sim_box, 120);

    let mut list = potential.neighbor_list().unwrap();
    let pairs = list.allocate(&positions, Some(&sim_box)).unwrap();
    assert!(!pairs.is_empty());
    assert!(pairs.iter().all(|p| p.order == 0));
    assert!(pairs.iter().all(|p| p.i < p.j));
}

#[test]
fn pair_at_exactly_the_cutoff_is_always_included() {
    let potential = Potential::new(Topology::new(2), EngineConfig::new(0.5)).unwrap();
    let positions = [Point3::new(0.0, 0.0, 0.0), Point3::new(0.5, 0.0, 0.0)];
    let params = ParameterSet {
        atoms: vec![
            AtomParam {
                charge: 0.0,
                sigma: 0.3,
                epsilon: 0.2,
            };
            2
        ],
        ..ParameterSet::default()
    };

    let mut list = potential.neighbor_list().unwrap();
    let expected = vec![Pair { i: 0, j: 1, order: 0 }];
    assert_eq!(list.allocate(&positions, None).unwrap(), expected.as_slice());
    for _ in 0..3 {
        assert_eq!(list.update(&positions).unwrap(), expected.as_slice());
        assert_eq!(list.allocate(&positions, None).unwrap(), expected.as_slice());
    }

    let energy = potential
        .energy(&positions, None, list.pairs(), &params)
        .unwrap();
    assert!(energy != 0.0);

    let beyond = [positions[0], Point3::new(0.5000001, 0.0, 0.0)];
    assert!(list.update(&beyond).unwrap().is_empty());
    let energy = potential
        .energy(&beyond, None, &expected, &params)
        .unwrap();
    assert_eq!(energy, 0.0);
}

#[test]
fn compression_beyond_capacity_reports_overflow_and_keeps_the_old_list() {
    let potential = Potential::new(Topology::new(10), EngineConfig::new(0.6)).unwrap();
    let sparse: Vec<_> = (0..10)
        .map(|i| Point3::new(0.5 * i as f64, 0.0, 0.0))
        .collect();
    let dense: Vec<_> = (0..10)
        .map(|i| Point3::new(0.25 * i as f64, 0.0, 0.0))
        .collect();

    let mut list = potential.neighbor_list().unwrap();
    let before = list.allocate(&sparse, None).unwrap().to_vec();
    assert_eq!(before.len(), 9);
    assert_eq!(list.capacity(), 12);

    let err = list.update(&dense).unwrap_err();
    assert_eq!(
        err,
        NeighborListError::CapacityOverflow {
            required: 17,
            capacity: 12
        }
    );
    assert_eq!(list.pairs(), before.as_slice());

    assert_eq!(list.allocate(&dense, None).unwrap().len(), 17);
    assert!(list.capacity() >= 17);
}

#[test]
fn oversized_cutoff_is_rejected_for_small_boxes() {
    let potential = Potential::new(Topology::new(4), EngineConfig::new(1.2)).unwrap();
    let sim_box = SimulationBox::orthorhombic(2.0, 2.0, 2.0).unwrap();
    let positions = vec![Point3::origin(); 4];
    let mut list = potential.neighbor_list().unwrap();
    assert!(matches!(
        list.allocate(&positions, Some(&sim_box)),
        Err(NeighborListError::CutoffTooLarge { .. })
    ));
    assert!(!list.is_allocated());
}
