use crate::core::autodiff::{Real, Tape, Var, Vec3};
use crate::core::forcefield::params::ParameterSet;
use crate::core::models::pair::Pair;
use crate::core::models::simulation_box::SimulationBox;
use crate::engine::error::EngineError;
use crate::engine::potential::EnergyFunction;
use nalgebra::{Point3, Vector3};
use tracing::{debug, instrument};

/// Rough tape nodes recorded per differentiable input; only sizes the first allocation.
const NODES_PER_INPUT: usize = 24;

/// Energy with its derivatives from a single reverse sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// kJ/mol.
    pub energy: f64,
    /// `−∂E/∂rᵢ` per atom, kJ/(mol·nm).
    pub forces: Vec<Vector3<f64>>,
    /// `∂E/∂θ` with the same shape as the parameter set.
    pub parameter_gradient: ParameterSet,
}

/// Energy, forces and parameter gradient in one pass.
#[instrument(skip_all, name = "differentiate_evaluate", fields(n_atoms = positions.len()))]
pub fn evaluate<F: EnergyFunction>(
    function: &F,
    positions: &[Point3<f64>],
    sim_box: Option<&SimulationBox>,
    pairs: &[Pair],
    params: &ParameterSet,
) -> Result<Evaluation, EngineError> {
    run(function, positions, sim_box, pairs, params, true, true)
}

/// Energy and `−∇ᵣE`; parameters are held constant.
pub fn energy_and_forces<F: EnergyFunction>(
    function: &F,
    positions: &[Point3<f64>],
    sim_box: Option<&SimulationBox>,
    pairs: &[Pair],
    params: &ParameterSet,
) -> Result<(f64, Vec<Vector3<f64>>), EngineError> {
    let eval = run(function, positions, sim_box, pairs, params, true, false)?;
    Ok((eval.energy, eval.forces))
}

pub fn forces<F: EnergyFunction>(
    function: &F,
    positions: &[Point3<f64>],
    sim_box: Option<&SimulationBox>,
    pairs: &[Pair],
    params: &ParameterSet,
) -> Result<Vec<Vector3<f64>>, EngineError> {
    energy_and_forces(function, positions, sim_box, pairs, params).map(|(_, f)| f)
}

/// Energy and `∂E/∂θ`; positions are held constant.
pub fn energy_and_parameter_gradient<F: EnergyFunction>(
    function: &F,
    positions: &[Point3<f64>],
    sim_box: Option<&SimulationBox>,
    pairs: &[Pair],
    params: &ParameterSet,
) -> Result<(f64, ParameterSet), EngineError> {
    let eval = run(function, positions, sim_box, pairs, params, false, true)?;
    Ok((eval.energy, eval.parameter_gradient))
}

pub fn parameter_gradient<F: EnergyFunction>(
    function: &F,
    positions: &[Point3<f64>],
    sim_box: Option<&SimulationBox>,
    pairs: &[Pair],
    params: &ParameterSet,
) -> Result<ParameterSet, EngineError> {
    energy_and_parameter_gradient(function, positions, sim_box, pairs, params).map(|(_, g)| g)
}

fn run<F: EnergyFunction>(
    function: &F,
    positions: &[Point3<f64>],
    sim_box: Option<&SimulationBox>,
    pairs: &[Pair],
    params: &ParameterSet,
    wrt_positions: bool,
    wrt_params: bool,
) -> Result<Evaluation, EngineError> {
    function.check_inputs(positions.len(), pairs, params)?;

    let n_inputs = 3 * positions.len() + params.leaf_count();
    let tape = Tape::with_capacity(n_inputs * NODES_PER_INPUT);

    let lift = |value: f64, active: bool| {
        if active {
            tape.var(value)
        } else {
            Var::constant(value)
        }
    };
    let position_vars: Vec<Vec3<Var<'_>>> = positions
        .iter()
        .map(|p| {
            Vec3::new(
                lift(p.x, wrt_positions),
                lift(p.y, wrt_positions),
                lift(p.z, wrt_positions),
            )
        })
        .collect();
    let param_vars = params.map(|v| lift(v, wrt_params));

    let energy = function.evaluate(&position_vars, sim_box, pairs, &param_vars)?;
    let adjoints = tape.gradient(energy);
    debug!(tape_nodes = tape.len(), energy = energy.value(), "Reverse sweep complete.");

    let forces = if wrt_positions {
        position_vars
            .iter()
            .map(|r| -Vector3::new(adjoints.wrt(r.x), adjoints.wrt(r.y), adjoints.wrt(r.z)))
            .collect()
    } else {
        Vec::new()
    };
    let parameter_gradient = param_vars.map(|v| adjoints.wrt(v));

    Ok(Evaluation {
        energy: energy.value(),
        forces,
        parameter_gradient,
    })
}
