use crate::core::autodiff::{Real, Vec3};
use crate::core::models::simulation_box::{SimulationBox, displacement};

/// Products of norms below this are treated as degenerate when forming angle cosines.
const MIN_NORM_PRODUCT: f64 = 1e-12;

#[inline]
pub fn distance<T: Real>(sim_box: Option<&SimulationBox>, a: Vec3<T>, b: Vec3<T>) -> T {
    displacement(sim_box, a, b).norm()
}

/// Angle `a-b-c` at the central atom `b`, in radians within `[0, π]`.
///
/// The cosine is clamped to `[-1, 1]` before `acos`; coincident atoms yield `π/2` with a
/// finite gradient instead of NaN.
pub fn bond_angle<T: Real>(
    sim_box: Option<&SimulationBox>,
    a: Vec3<T>,
    b: Vec3<T>,
    c: Vec3<T>,
) -> T {
    let u = displacement(sim_box, b, a);
    let v = displacement(sim_box, b, c);
    let norms = (u.norm_squared() * v.norm_squared()).sqrt();
    let norms = if norms.value() < MIN_NORM_PRODUCT {
        T::constant(MIN_NORM_PRODUCT)
    } else {
        norms
    };
    (u.dot(&v) / norms).clamp(-1.0, 1.0).acos()
}

/// Dihedral angle of `a-b-c-d` in radians within `(-π, π]`, zero for the cis arrangement.
///
/// Evaluated with `atan2`, which stays well conditioned near 0 and π where an `acos`
/// formulation loses precision.
pub fn dihedral_angle<T: Real>(
    sim_box: Option<&SimulationBox>,
    a: Vec3<T>,
    b: Vec3<T>,
    c: Vec3<T>,
    d: Vec3<T>,
) -> T {
    let b1 = displacement(sim_box, a, b);
    let b2 = displacement(sim_box, b, c);
    let b3 = displacement(sim_box, c, d);
    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    let y = b2.norm() * b1.dot(&n2);
    let x = n1.dot(&n2);
    y.atan2(x)
}
