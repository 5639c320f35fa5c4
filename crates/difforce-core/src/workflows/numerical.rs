use crate::core::forcefield::params::ParameterSet;
use crate::core::models::pair::Pair;
use crate::core::models::simulation_box::SimulationBox;
use crate::engine::error::EngineError;
use crate::engine::potential::EnergyFunction;
use nalgebra::{Point3, Vector3};
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Central-difference step in nm for coordinates and in native units for parameters.
pub const DEFAULT_STEP: f64 = 1e-5;

/// Forces `−∂E/∂rᵢ` from central differences of the plain `f64` energy.
///
/// Costs `6N` energy evaluations; meant for validating the analytic derivatives, not for
/// production use. The pair list is held fixed while coordinates are perturbed.
#[instrument(
    skip_all,
    name = "finite_difference_forces",
    fields(n_atoms = positions.len(), step = step)
)]
pub fn finite_difference_forces<F: EnergyFunction + Sync>(
    function: &F,
    positions: &[Point3<f64>],
    sim_box: Option<&SimulationBox>,
    pairs: &[Pair],
    params: &ParameterSet,
    step: f64,
) -> Result<Vec<Vector3<f64>>, EngineError> {
    function.check_inputs(positions.len(), pairs, params)?;

    let derivative = |coordinate: usize| -> Result<f64, EngineError> {
        let (atom, axis) = (coordinate / 3, coordinate % 3);
        let displaced = |delta: f64| {
            let mut moved = positions.to_vec();
            moved[atom][axis] += delta;
            function.energy(&moved, sim_box, pairs, params)
        };
        Ok((displaced(step)? - displaced(-step)?) / (2.0 * step))
    };

    #[cfg(not(feature = "parallel"))]
    let iterator = 0..3 * positions.len();

    #[cfg(feature = "parallel")]
    let iterator = (0..3 * positions.len()).into_par_iter();

    let gradient: Vec<f64> = iterator.map(derivative).collect::<Result<_, _>>()?;
    debug!(evaluations = 2 * gradient.len(), "Finite-difference forces complete.");

    Ok(gradient
        .chunks_exact(3)
        .map(|g| -Vector3::new(g[0], g[1], g[2]))
        .collect())
}

/// `∂E/∂θ` from central differences, reshaped like `params`.
#[instrument(
    skip_all,
    name = "finite_difference_parameter_gradient",
    fields(n_leaves = params.leaf_count(), step = step)
)]
pub fn finite_difference_parameter_gradient<F: EnergyFunction + Sync>(
    function: &F,
    positions: &[Point3<f64>],
    sim_box: Option<&SimulationBox>,
    pairs: &[Pair],
    params: &ParameterSet,
    step: f64,
) -> Result<ParameterSet, EngineError> {
    function.check_inputs(positions.len(), pairs, params)?;

    let derivative = |leaf: usize| -> Result<f64, EngineError> {
        let displaced = |delta: f64| {
            let mut perturbed = params.clone();
            if let Some(value) = perturbed.leaves_mut().nth(leaf) {
                *value += delta;
            }
            function.energy(positions, sim_box, pairs, &perturbed)
        };
        Ok((displaced(step)? - displaced(-step)?) / (2.0 * step))
    };

    #[cfg(not(feature = "parallel"))]
    let iterator = 0..params.leaf_count();

    #[cfg(feature = "parallel")]
    let iterator = (0..params.leaf_count()).into_par_iter();

    let gradient: Vec<f64> = iterator.map(derivative).collect::<Result<_, _>>()?;

    let mut shaped = params.zeros_like();
    for (slot, g) in shaped.leaves_mut().zip(gradient) {
        *slot = g;
    }
    Ok(shaped)
}
