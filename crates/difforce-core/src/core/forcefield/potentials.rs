use crate::core::autodiff::Real;

#[inline]
pub fn harmonic<T: Real>(x: T, x0: T, k: T) -> T {
    let dx = x - x0;
    k * dx * dx * 0.5
}

/// `Σₙ k[n−1]·(1 + cos(n·φ − phase[n−1]))` for periodicities 1 through 4.
#[inline]
pub fn periodic_torsion<T: Real>(phi: T, k: &[T; 4], phase: &[T; 4]) -> T {
    (1..=4)
        .zip(k.iter().zip(phase))
        .fold(T::zero(), |acc, (n, (&k, &phase))| {
            acc + k * ((phi * f64::from(n) - phase).cos() + 1.0)
        })
}

/// 12-6 Lennard-Jones in σ/ε form: `4ε((σ/r)¹² − (σ/r)⁶)`.
#[inline]
pub fn lennard_jones_12_6<T: Real>(dist: T, sigma: T, epsilon: T) -> T {
    let rho6 = (sigma / dist).powi(6);
    epsilon * (rho6 * rho6 - rho6) * 4.0
}

/// Bare Coulomb energy `k·qᵢqⱼ/r`.
#[inline]
pub fn coulomb<T: Real>(dist: T, charge_product: T, coulomb_constant: f64) -> T {
    charge_product / dist * coulomb_constant
}

/// Reaction-field Coulomb energy `k·qᵢqⱼ·(1/r + k_rf·r² − c_rf)`.
///
/// The constants make the energy vanish at the cutoff for a continuum of relative
/// permittivity `dielectric` beyond it.
#[inline]
pub fn reaction_field<T: Real>(
    dist: T,
    charge_product: T,
    cutoff: f64,
    dielectric: f64,
    coulomb_constant: f64,
) -> T {
    let (k_rf, c_rf) = reaction_field_constants(cutoff, dielectric);
    charge_product * (dist.recip() + dist * dist * k_rf - c_rf) * coulomb_constant
}

#[inline]
pub fn reaction_field_constants(cutoff: f64, dielectric: f64) -> (f64, f64) {
    let k_rf = (dielectric - 1.0) / ((2.0 * dielectric + 1.0) * cutoff.powi(3));
    let c_rf = 1.0 / cutoff + k_rf * cutoff * cutoff;
    (k_rf, c_rf)
}

/// Quintic switch `S(x) = 1 − 10x³ + 15x⁴ − 6x⁵` with `x = (r − r_on)/(r_off − r_on)`.
///
/// Equals 1 below `r_on` and 0 beyond `r_off`, with continuous first and second derivatives.
#[inline]
pub fn switching<T: Real>(dist: T, r_on: f64, r_off: f64) -> T {
    if dist.value() <= r_on {
        return T::constant(1.0);
    }
    if dist.value() >= r_off {
        return T::zero();
    }
    let x = (dist - r_on) / (r_off - r_on);
    let x3 = x.powi(3);
    T::constant(1.0) - x3 * 10.0 + x3 * x * 15.0 - x3 * x * x * 6.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::autodiff::{Tape, Var};
    use std::f64::consts::PI;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn harmonic_at_rest_value_is_zero() {
        assert!(f64_approx_equal(harmonic(1.5, 1.5, 100.0), 0.0));
        assert!(f64_approx_equal(harmonic(2.0, 1.5, 100.0), 12.5));
    }

    #[test]
    fn lennard_jones_at_sigma_is_zero_and_minimum_is_minus_epsilon() {
        assert!(f64_approx_equal(lennard_jones_12_6(0.3, 0.3, 0.5), 0.0));
        let r_min = 2.0_f64.powf(1.0 / 6.0) * 0.3;
        assert!(f64_approx_equal(lennard_jones_12_6(r_min, 0.3, 0.5), -0.5));
    }

    #[test]
    fn coulomb_has_expected_sign_and_magnitude() {
        assert!(f64_approx_equal(coulomb(1.0, 1.0, 138.935456), 138.935456));
        assert!(f64_approx_equal(coulomb(2.0, -1.0, 138.935456), -69.467728));
    }

    #[test]
    fn reaction_field_vanishes_at_cutoff() {
        let e = reaction_field(1.2, -0.64, 1.2, 78.5, 138.935456);
        assert!(f64_approx_equal(e, 0.0));
    }

    #[test]
    fn reaction_field_with_unit_dielectric_is_shifted_coulomb() {
        let shifted = coulomb(0.5, 1.0, 1.0) - coulomb(1.0, 1.0, 1.0);
        assert!(f64_approx_equal(reaction_field(0.5, 1.0, 1.0, 1.0, 1.0), shifted));
    }

    #[test]
    fn periodic_torsion_sums_all_periodicities() {
        let k = [1.0, 2.0, 0.0, 0.5];
        let phase = [0.0, PI, 0.0, 0.0];
        // 1·2 + 2·(1 + cos(−π)) + 0 + 0.5·2
        assert!(f64_approx_equal(periodic_torsion(0.0, &k, &phase), 3.0));
    }

    #[test]
    fn switching_is_one_inside_and_zero_outside() {
        assert_eq!(switching(0.5, 0.8, 1.0), 1.0);
        assert_eq!(switching(0.8, 0.8, 1.0), 1.0);
        assert_eq!(switching(1.0, 0.8, 1.0), 0.0);
        assert!(f64_approx_equal(switching(0.9, 0.8, 1.0), 0.5));
    }

    #[test]
    fn switching_derivative_vanishes_at_both_ends() {
        for r in [0.8 + 1e-7, 1.0 - 1e-7] {
            let tape = Tape::new();
            let d = tape.var(r);
            let s = switching(d, 0.8, 1.0);
            assert!(tape.gradient(s).wrt(d).abs() < 1e-6);
        }
    }

    #[test]
    fn lennard_jones_gradient_matches_analytic_form() {
        let (sigma, epsilon, r) = (0.34, 0.36, 0.41);
        let tape = Tape::new();
        let d = tape.var(r);
        let e = lennard_jones_12_6(d, Var::constant(sigma), Var::constant(epsilon));
        let analytic =
            4.0 * epsilon * (-12.0 * sigma.powi(12) / r.powi(13) + 6.0 * sigma.powi(6) / r.powi(7));
        assert!((tape.gradient(e).wrt(d) - analytic).abs() < 1e-6);
    }
}
