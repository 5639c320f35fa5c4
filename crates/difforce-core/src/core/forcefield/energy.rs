use super::params::{
    AngleParam, AtomParam, BondParam, CoulombMethod, NonbondedSettings, TorsionParam,
};
use super::potentials;
use crate::core::autodiff::{Real, Vec3, ordered_sum};
use crate::core::models::pair::Pair;
use crate::core::models::simulation_box::{SimulationBox, displacement};
use crate::core::utils::geometry::{bond_angle, dihedral_angle, distance};

// Every evaluator walks its index list in order and zips it with the matching parameter
// rows. Callers are responsible for shape validation; the composer checks row counts,
// position counts and pair indices before any evaluator runs.

pub fn bond_energy<T: Real>(
    positions: &[Vec3<T>],
    sim_box: Option<&SimulationBox>,
    bonds: &[[usize; 2]],
    params: &[BondParam<T>],
) -> T {
    ordered_sum(bonds.iter().zip(params).map(|(&[i, j], p)| {
        let r = distance(sim_box, positions[i], positions[j]);
        potentials::harmonic(r, p.length, p.k)
    }))
}

pub fn angle_energy<T: Real>(
    positions: &[Vec3<T>],
    sim_box: Option<&SimulationBox>,
    angles: &[[usize; 3]],
    params: &[AngleParam<T>],
) -> T {
    ordered_sum(angles.iter().zip(params).map(|(&[i, j, k], p)| {
        let theta = bond_angle(sim_box, positions[i], positions[j], positions[k]);
        potentials::harmonic(theta, p.angle, p.k)
    }))
}

/// Shared by proper and improper torsions; they differ only in which index lists and
/// parameter rows are passed.
pub fn torsion_energy<T: Real>(
    positions: &[Vec3<T>],
    sim_box: Option<&SimulationBox>,
    torsions: &[[usize; 4]],
    params: &[TorsionParam<T>],
) -> T {
    ordered_sum(torsions.iter().zip(params).map(|(&[i, j, k, l], p)| {
        let phi = dihedral_angle(
            sim_box,
            positions[i],
            positions[j],
            positions[k],
            positions[l],
        );
        potentials::periodic_torsion(phi, &p.k, &p.phase)
    }))
}

/// Pairs within the cutoff (inclusive) whose scale factor is non-zero, with the
/// displacement length and the scale applied to the pair.
fn scaled_pairs_within_cutoff<'a, T: Real>(
    positions: &'a [Vec3<T>],
    sim_box: Option<&'a SimulationBox>,
    pairs: &'a [Pair],
    cutoff: f64,
    scale_of: impl Fn(u8) -> f64 + 'a,
) -> impl Iterator<Item = (&'a Pair, T, f64)> + 'a {
    let cutoff_sq = cutoff * cutoff;
    pairs.iter().filter_map(move |pair| {
        let scale = scale_of(pair.order);
        if scale == 0.0 {
            return None;
        }
        let d = displacement(sim_box, positions[pair.i], positions[pair.j]);
        let r2 = d.norm_squared();
        if r2.value() > cutoff_sq {
            return None;
        }
        Some((pair, r2.sqrt(), scale))
    })
}

pub fn lennard_jones_energy<T: Real>(
    positions: &[Vec3<T>],
    sim_box: Option<&SimulationBox>,
    pairs: &[Pair],
    atoms: &[AtomParam<T>],
    settings: &NonbondedSettings,
    cutoff: f64,
) -> T {
    let scaled = scaled_pairs_within_cutoff(positions, sim_box, pairs, cutoff, move |order| {
        settings.lj_scale(order)
    });
    ordered_sum(scaled.map(|(pair, r, scale)| {
        let (sigma, epsilon) = settings
            .combining_rule
            .combine(&atoms[pair.i], &atoms[pair.j]);
        let mut energy = potentials::lennard_jones_12_6(r, sigma, epsilon);
        if let Some(r_on) = settings.switch_distance {
            energy = energy * potentials::switching(r, r_on, cutoff);
        }
        if scale == 1.0 { energy } else { energy * scale }
    }))
}

pub fn coulomb_energy<T: Real>(
    positions: &[Vec3<T>],
    sim_box: Option<&SimulationBox>,
    pairs: &[Pair],
    atoms: &[AtomParam<T>],
    settings: &NonbondedSettings,
    cutoff: f64,
) -> T {
    let k = settings.coulomb_constant;
    let scaled = scaled_pairs_within_cutoff(positions, sim_box, pairs, cutoff, move |order| {
        settings.coulomb_scale(order)
    });
    ordered_sum(scaled.map(|(pair, r, scale)| {
        let qq = atoms[pair.i].charge * atoms[pair.j].charge;
        let energy = match settings.coulomb_method {
            CoulombMethod::Cutoff => potentials::coulomb(r, qq, k),
            CoulombMethod::ReactionField { dielectric } => {
                potentials::reaction_field(r, qq, cutoff, dielectric, k)
            }
        };
        if scale == 1.0 { energy } else { energy * scale }
    }))
}
