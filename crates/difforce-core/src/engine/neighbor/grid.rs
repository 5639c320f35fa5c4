use crate::core::models::simulation_box::SimulationBox;
use itertools::iproduct;
use nalgebra::{Point3, Vector3};

/// Cells per axis are capped at this multiple of the cube root of the atom count, so
/// sparse systems spread over large regions do not allocate huge, mostly empty grids.
const MAX_CELLS_PER_ATOM_AXIS: usize = 2;

#[derive(Debug, Clone)]
enum Frame {
    Periodic(SimulationBox),
    /// Axis-aligned bounding grid for open boundaries; out-of-range atoms clamp to the
    /// outermost cells.
    Open {
        origin: Vector3<f64>,
        edge: Vector3<f64>,
    },
}

/// Spatial binning whose cells are at least as thick as the list cutoff in every
/// lattice direction, so every pair within the cutoff lies in the same or adjacent cells.
#[derive(Debug, Clone)]
pub(crate) struct CellGrid {
    dims: [usize; 3],
    frame: Frame,
}

/// Atoms grouped by cell: `atoms[starts[c]..starts[c + 1]]`, ascending within each cell.
#[derive(Debug)]
pub(crate) struct Bins {
    starts: Vec<usize>,
    atoms: Vec<usize>,
}

impl Bins {
    #[inline]
    pub fn atoms_in(&self, cell: usize) -> &[usize] {
        &self.atoms[self.starts[cell]..self.starts[cell + 1]]
    }
}

fn max_cells_per_axis(n_atoms: usize) -> usize {
    ((n_atoms as f64).cbrt().ceil() as usize * MAX_CELLS_PER_ATOM_AXIS).max(1)
}

fn cells_along(width: f64, min_edge: f64, max_cells: usize) -> usize {
    ((width / min_edge).floor() as usize).clamp(1, max_cells)
}

impl CellGrid {
    pub fn periodic(sim_box: &SimulationBox, min_edge: f64, n_atoms: usize) -> Self {
        let widths = sim_box.perpendicular_widths();
        let max_cells = max_cells_per_axis(n_atoms);
        let dims = [0, 1, 2].map(|k| cells_along(widths[k], min_edge, max_cells));
        Self {
            dims,
            frame: Frame::Periodic(sim_box.clone()),
        }
    }

    pub fn open(positions: &[Point3<f64>], min_edge: f64) -> Self {
        let (lo, hi) = positions.iter().fold(
            (
                Vector3::repeat(f64::INFINITY),
                Vector3::repeat(f64::NEG_INFINITY),
            ),
            |(lo, hi), p| (lo.inf(&p.coords), hi.sup(&p.coords)),
        );
        let (origin, extent) = if positions.is_empty() {
            (Vector3::zeros(), Vector3::zeros())
        } else {
            (lo, hi - lo)
        };

        let max_cells = max_cells_per_axis(positions.len());
        let dims = [0, 1, 2].map(|k| cells_along(extent[k], min_edge, max_cells));
        let edge = Vector3::from_fn(|k, _| (extent[k] / dims[k] as f64).max(min_edge));
        Self {
            dims,
            frame: Frame::Open { origin, edge },
        }
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn n_cells(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn is_periodic(&self) -> bool {
        matches!(self.frame, Frame::Periodic(_))
    }

    pub fn cell_of(&self, p: &Point3<f64>) -> [usize; 3] {
        let dims = self.dims;
        match &self.frame {
            Frame::Periodic(sim_box) => {
                let s = sim_box.wrapped_fractional(&p.coords);
                [0, 1, 2].map(|k| ((s[k] * dims[k] as f64) as usize).min(dims[k] - 1))
            }
            Frame::Open { origin, edge } => [0, 1, 2].map(|k| {
                let x = ((p[k] - origin[k]) / edge[k]).floor().max(0.0);
                (x as usize).min(dims[k] - 1)
            }),
        }
    }

    #[inline]
    pub fn linear(&self, c: [usize; 3]) -> usize {
        c[0] + self.dims[0] * (c[1] + self.dims[1] * c[2])
    }

    #[inline]
    fn coords(&self, linear: usize) -> [usize; 3] {
        let [nx, ny, _] = self.dims;
        [linear % nx, (linear / nx) % ny, linear / (nx * ny)]
    }

    /// Counting sort of atom indices into cells.
    pub fn bin(&self, positions: &[Point3<f64>]) -> Bins {
        let n_cells = self.n_cells();
        let cells: Vec<usize> = positions
            .iter()
            .map(|p| self.linear(self.cell_of(p)))
            .collect();

        let mut starts = vec![0; n_cells + 1];
        for &cell in &cells {
            starts[cell + 1] += 1;
        }
        for c in 0..n_cells {
            starts[c + 1] += starts[c];
        }

        let mut fill = starts.clone();
        let mut atoms = vec![0; positions.len()];
        for (atom, &cell) in cells.iter().enumerate() {
            atoms[fill[cell]] = atom;
            fill[cell] += 1;
        }
        Bins { starts, atoms }
    }

    /// The cell itself plus its adjacent cells, each listed once, in ascending order.
    ///
    /// Periodic axes with fewer than three cells wrap onto themselves; listing every cell
    /// along such an axis once keeps pairs from being visited twice.
    pub fn neighbor_cells(&self, cell: usize) -> Vec<usize> {
        let c = self.coords(cell);
        let periodic = self.is_periodic();
        let along = |k: usize| -> Vec<usize> {
            let d = self.dims[k];
            if periodic {
                if d >= 3 {
                    vec![(c[k] + d - 1) % d, c[k], (c[k] + 1) % d]
                } else {
                    (0..d).collect()
                }
            } else {
                (c[k].saturating_sub(1)..=(c[k] + 1).min(d - 1)).collect()
            }
        };

        let (xs, ys, zs) = (along(0), along(1), along(2));
        let mut cells: Vec<usize> = iproduct!(&xs, &ys, &zs)
            .map(|(&x, &y, &z)| self.linear([x, y, z]))
            .collect();
        cells.sort_unstable();
        cells.dedup();
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periodic_grid_cells_are_at_least_min_edge_thick() {
        let b = SimulationBox::orthorhombic(5.0, 3.5, 2.0).unwrap();
        let grid = CellGrid::periodic(&b, 1.0, 1000);
        assert_eq!(grid.dims(), [5, 3, 2]);
        assert!(grid.is_periodic());
    }

    #[test]
    fn periodic_grid_caps_cells_for_sparse_systems() {
        let b = SimulationBox::orthorhombic(100.0, 100.0, 100.0).unwrap();
        let grid = CellGrid::periodic(&b, 1.0, 8);
        assert_eq!(grid.dims(), [4, 4, 4]);
    }

    #[test]
    fn open_grid_clamps_atoms_outside_bounds() {
        let positions = [Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 3.0, 3.0)];
        let grid = CellGrid::open(&positions, 1.0);
        assert_eq!(grid.cell_of(&Point3::new(-5.0, 0.5, 0.5)), [0, 0, 0]);
        let far = grid.cell_of(&Point3::new(50.0, 2.9, 2.9));
        assert_eq!(far[0], grid.dims()[0] - 1);
    }

    #[test]
    fn open_grid_of_single_atom_has_one_cell() {
        let grid = CellGrid::open(&[Point3::new(1.0, 2.0, 3.0)], 1.0);
        assert_eq!(grid.n_cells(), 1);
        assert_eq!(grid.neighbor_cells(0), vec![0]);
    }

    #[test]
    fn bin_groups_atoms_in_ascending_order() {
        let b = SimulationBox::orthorhombic(3.0, 3.0, 3.0).unwrap();
        let grid = CellGrid::periodic(&b, 1.0, 27);
        let positions = [
            Point3::new(0.5, 0.5, 0.5),
            Point3::new(2.5, 0.5, 0.5),
            Point3::new(0.6, 0.4, 0.5),
            Point3::new(-0.5, 0.5, 0.5),
        ];
        let bins = grid.bin(&positions);
        assert_eq!(bins.atoms_in(grid.linear([0, 0, 0])), &[0, 2]);
        assert_eq!(bins.atoms_in(grid.linear([2, 0, 0])), &[1, 3]);
    }

    #[test]
    fn neighbor_cells_wrap_and_deduplicate() {
        let b = SimulationBox::orthorhombic(4.0, 2.0, 1.0).unwrap();
        let grid = CellGrid::periodic(&b, 1.0, 1000);
        assert_eq!(grid.dims(), [4, 2, 1]);
        let cells = grid.neighbor_cells(grid.linear([0, 0, 0]));
        // x: {3, 0, 1}; y: {0, 1}; z: {0}
        assert_eq!(cells.len(), 6);
        let mut sorted = cells.clone();
        sorted.dedup();
        assert_eq!(sorted, cells);
        assert!(cells.contains(&grid.linear([3, 1, 0])));
    }

    #[test]
    fn open_neighbor_cells_do_not_wrap() {
        let positions = [Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 0.0, 0.0)];
        let grid = CellGrid::open(&positions, 1.0);
        assert_eq!(grid.dims()[0], 4);
        let cells = grid.neighbor_cells(grid.linear([0, 0, 0]));
        assert_eq!(cells, vec![grid.linear([0, 0, 0]), grid.linear([1, 0, 0])]);
    }
}
