use crate::core::autodiff::{Real, Vec3};
use itertools::iproduct;
use nalgebra::{Matrix3, Vector3};
use thiserror::Error;

const DEGENERACY_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoxError {
    #[error("Periodic box has non-positive volume ({0})")]
    NonPositiveVolume(f64),
    #[error("Periodic box contains non-finite entries")]
    NonFinite,
}

/// A periodic simulation cell described by three lattice vectors.
///
/// The rows of the matrix are the lattice vectors `a`, `b`, `c`, which must form a
/// right-handed set (`det > 0`). Boxes may be triclinic. A left-handed lattice describes the
/// same cell with one vector negated; it is rejected as `NonPositiveVolume` rather than
/// reoriented. Degenerate lattices fail too, so every `SimulationBox` admits a well-defined
/// minimum image.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationBox {
    vectors: Matrix3<f64>,
    /// Lattice vectors as columns: `r = h * s` for fractional `s`.
    h: Matrix3<f64>,
    h_inv: Matrix3<f64>,
    orthorhombic: bool,
}

impl SimulationBox {
    pub fn new(vectors: Matrix3<f64>) -> Result<Self, BoxError> {
        if vectors.iter().any(|v| !v.is_finite()) {
            return Err(BoxError::NonFinite);
        }
        let det = vectors.determinant();
        let scale = vectors.row(0).norm() * vectors.row(1).norm() * vectors.row(2).norm();
        if det <= DEGENERACY_TOLERANCE * scale.max(DEGENERACY_TOLERANCE) {
            return Err(BoxError::NonPositiveVolume(det));
        }

        let h = vectors.transpose();
        let h_inv = h.try_inverse().ok_or(BoxError::NonPositiveVolume(det))?;
        let orthorhombic = (0..3)
            .flat_map(|i| (0..3).map(move |j| (i, j)))
            .all(|(i, j)| i == j || vectors[(i, j)] == 0.0);

        Ok(Self {
            vectors,
            h,
            h_inv,
            orthorhombic,
        })
    }

    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Result<Self, BoxError> {
        Self::new(Matrix3::from_diagonal(&Vector3::new(a, b, c)))
    }

    /// Interprets an all-zero matrix as "no periodicity".
    pub fn from_matrix(vectors: Matrix3<f64>) -> Result<Option<Self>, BoxError> {
        if vectors.iter().all(|&v| v == 0.0) {
            Ok(None)
        } else {
            Self::new(vectors).map(Some)
        }
    }

    pub fn vectors(&self) -> &Matrix3<f64> {
        &self.vectors
    }

    pub fn is_orthorhombic(&self) -> bool {
        self.orthorhombic
    }

    pub fn volume(&self) -> f64 {
        self.vectors.determinant()
    }

    /// Distances between opposite faces of the cell, one per lattice direction.
    pub fn perpendicular_widths(&self) -> Vector3<f64> {
        let a: Vector3<f64> = self.vectors.row(0).transpose();
        let b: Vector3<f64> = self.vectors.row(1).transpose();
        let c: Vector3<f64> = self.vectors.row(2).transpose();
        let volume = self.volume();
        Vector3::new(
            volume / b.cross(&c).norm(),
            volume / c.cross(&a).norm(),
            volume / a.cross(&b).norm(),
        )
    }

    pub fn to_fractional(&self, r: &Vector3<f64>) -> Vector3<f64> {
        self.h_inv * r
    }

    pub fn to_cartesian(&self, s: &Vector3<f64>) -> Vector3<f64> {
        self.h * s
    }

    /// Cartesian translation by an integer combination of lattice vectors.
    pub fn lattice_translation(&self, n: [i32; 3]) -> Vector3<f64> {
        self.to_cartesian(&Vector3::new(
            f64::from(n[0]),
            f64::from(n[1]),
            f64::from(n[2]),
        ))
    }

    /// The lattice translation that maps `d` onto its minimum image (`d - shift`).
    ///
    /// Fractional coordinates are rounded first. For triclinic cells the rounded image is
    /// then compared against its 26 neighbors, since rounding alone is not guaranteed to
    /// give the shortest vector in a skewed lattice.
    pub fn image_shift(&self, d: &Vector3<f64>) -> Vector3<f64> {
        let s = self.to_fractional(d).map(f64::round);
        let shift = self.to_cartesian(&s);
        if self.orthorhombic {
            return shift;
        }

        let mut best = shift;
        let mut best_norm = (d - shift).norm_squared();
        for (i, j, k) in iproduct!(-1..=1, -1..=1, -1..=1) {
            if (i, j, k) == (0, 0, 0) {
                continue;
            }
            let candidate = shift + self.lattice_translation([i, j, k]);
            let norm = (d - candidate).norm_squared();
            if norm < best_norm {
                best = candidate;
                best_norm = norm;
            }
        }
        best
    }

    pub fn minimum_image_f64(&self, d: &Vector3<f64>) -> Vector3<f64> {
        d - self.image_shift(d)
    }

    /// Differentiable minimum image.
    ///
    /// The lattice shift is piecewise constant in the positions, so it is chosen from the
    /// primal values and subtracted as a constant; the gradient of the result with respect
    /// to `d` is the identity.
    pub fn minimum_image<T: Real>(&self, d: Vec3<T>) -> Vec3<T> {
        let shift = self.image_shift(&d.values());
        d.shifted_by(&shift)
    }

    /// Fractional coordinates wrapped into `[0, 1)`.
    pub fn wrapped_fractional(&self, r: &Vector3<f64>) -> Vector3<f64> {
        self.to_fractional(r).map(|s| {
            let w = s - s.floor();
            if w >= 1.0 { 0.0 } else { w }
        })
    }
}

/// Displacement `to - from`, minimum-imaged when a periodic box is present.
#[inline]
pub fn displacement<T: Real>(
    sim_box: Option<&SimulationBox>,
    from: Vec3<T>,
    to: Vec3<T>,
) -> Vec3<T> {
    let d = to - from;
    match sim_box {
        Some(b) => b.minimum_image(d),
        None => d,
    }
}
