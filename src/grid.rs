//! Periodic grid descriptors and density deposition targets
//!
//! A deposition run works with two kinds of grids: the *bounding grid* covers
//! the entire periodic simulation box, while one or more *target grids* are
//! rectangular sub-windows of the bounding grid that accumulate densities.
//! Both are described by [`Grid`], a cubic window of integer cells addressed
//! by index triplets `(i, j, k)` and linearized x-fastest.

use log::trace;
use thiserror::Error as ThisError;

/// Cubic window of grid cells embedded in a periodic bounding grid
///
/// Cells are addressed by index triplets `(i, j, k)` with
/// `i ∈ [origin.x, origin.x + width)` and linearized as `i + j·W + k·W²`
/// after translating by the origin.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Grid {
    origin: [i64; 3],
    width: i64,
    volume: i64,
}

/// Axis-aligned box in cell coordinates, `min` inclusive and `max` exclusive
///
/// The box may extend beyond the periodic range of the bounding grid on any
/// axis. Callers enumerating its cells have to reduce every index triplet
/// through [`Grid::wrap`].
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct CellBounds {
    pub min: [i64; 3],
    pub max: [i64; 3],
}

/// Error type for the construction of a [`Grid`] or a [`DensityGrid`]
#[derive(Copy, Clone, PartialEq, Debug, ThisError)]
pub enum GridConstructionError {
    /// The grid width is invalid, it has to be larger than zero
    #[error("invalid grid width `{0}` supplied, width has to be larger than zero")]
    InvalidWidth(i64),
    /// The number of sub-grids per side is invalid, it has to be larger than zero
    #[error("invalid sub-grid count `{0}` supplied, count has to be larger than zero")]
    InvalidGridsPerSide(i64),
    /// The box width is invalid, it has to be larger than zero
    #[error("invalid box width `{0}` supplied, box width has to be larger than zero")]
    InvalidBoxWidth(f64),
    /// The supplied density buffer does not match the volume of the target grid
    #[error("density buffer of length {actual} does not match the grid volume {expected}")]
    RhoLengthMismatch { expected: i64, actual: usize },
}

impl Grid {
    /// Constructs a cubic grid window with the given origin and cells per side
    pub fn new(origin: [i64; 3], width: i64) -> Result<Self, GridConstructionError> {
        if width <= 0 {
            return Err(GridConstructionError::InvalidWidth(width));
        }

        Ok(Self {
            origin,
            width,
            volume: width * width * width,
        })
    }

    /// Returns the origin of the grid window in bounding-grid cell coordinates
    #[inline(always)]
    pub fn origin(&self) -> &[i64; 3] {
        &self.origin
    }

    /// Returns the number of cells per side of the grid window
    #[inline(always)]
    pub fn width(&self) -> i64 {
        self.width
    }

    /// Returns the total number of cells of the grid window
    #[inline(always)]
    pub fn volume(&self) -> i64 {
        self.volume
    }

    /// Translates the cell triplet by the grid origin and flattens it to a
    /// linear index, returns `None` if the cell is outside of the window
    #[inline(always)]
    pub fn idx_check(&self, i: i64, j: i64, k: i64) -> Option<usize> {
        let x = i - self.origin[0];
        let y = j - self.origin[1];
        let z = k - self.origin[2];

        let w = self.width;
        if x >= 0 && x < w && y >= 0 && y < w && z >= 0 && z < w {
            Some((x + y * w + z * w * w) as usize)
        } else {
            None
        }
    }

    /// Reduces a cell triplet into `[0, width)` on every axis using Euclidean modulo
    #[inline(always)]
    pub fn wrap(&self, ijk: [i64; 3]) -> [i64; 3] {
        [
            ijk[0].rem_euclid(self.width),
            ijk[1].rem_euclid(self.width),
            ijk[2].rem_euclid(self.width),
        ]
    }
}

impl CellBounds {
    /// Returns whether the possibly-wrapped bounds overlap the window of
    /// `grid` when reduced through a periodic bounding grid of width `period`
    ///
    /// A box that wraps around the periodic boundary is tested as the union
    /// of its unwrapped pieces.
    pub fn intersects(&self, grid: &Grid, period: i64) -> bool {
        for d in 0..3 {
            let g_lo = grid.origin[d];
            let g_hi = g_lo + grid.width;
            if !axis_intersects(self.min[d], self.max[d], g_lo, g_hi, period) {
                return false;
            }
        }
        true
    }
}

/// Tests the half-open box interval `[lo, hi)` against the half-open window
/// interval `[g_lo, g_hi)` on a circle of circumference `period`
fn axis_intersects(lo: i64, hi: i64, g_lo: i64, g_hi: i64, period: i64) -> bool {
    if hi - lo >= period {
        return true;
    }

    let overlaps = |a0: i64, a1: i64| a0 < g_hi && g_lo < a1;

    let lo_w = lo.rem_euclid(period);
    let hi_w = lo_w + (hi - lo);
    if hi_w > period {
        // The interval wraps: test both unwrapped pieces.
        overlaps(lo_w, period) || overlaps(0, hi_w - period)
    } else {
        overlaps(lo_w, hi_w)
    }
}

/// Constructs the target grid of a single sub-cell together with the
/// enclosing periodic bounding grid
///
/// `cells` gives the number of cells per side of the target grid and
/// `grids_per_side` the number of target-grid-sized sub-cells along one side
/// of the bounding grid. `(gx, gy, gz)` place the target grid in units of
/// sub-grids.
pub fn bounds(
    cells: i64,
    grids_per_side: i64,
    gx: i64,
    gy: i64,
    gz: i64,
) -> Result<(Grid, Grid), GridConstructionError> {
    if grids_per_side <= 0 {
        return Err(GridConstructionError::InvalidGridsPerSide(grids_per_side));
    }
    let g = Grid::new([gx * cells, gy * cells, gz * cells], cells)?;
    let bg = Grid::new([0, 0, 0], cells * grids_per_side)?;
    Ok((g, bg))
}

/// Position of a target sub-grid within the bounding grid, in units of sub-grids
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Subgrid {
    /// Cells per side of the sub-grid
    pub width: i64,
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

/// A deposition target: a contiguous density buffer covering one target grid
/// window of the periodic bounding grid
///
/// The density buffer is borrowed for the lifetime of the grid, so a single
/// buffer cannot be written through two grids at the same time.
#[derive(Debug)]
pub struct DensityGrid<'a> {
    g: Grid,
    bg: Grid,
    rhos: &'a mut [f64],
    cell_width: f64,
    cell_volume: f64,
    box_width: f64,
}

impl<'a> DensityGrid<'a> {
    /// Constructs a deposition target for the sub-grid `cell` of a periodic
    /// box with `grids_per_side` sub-grids per side
    ///
    /// `box_width` is the physical side length of the simulation box; the
    /// cell width of the grid becomes `box_width` divided by the cell count
    /// per side of the bounding grid. The density buffer has to hold exactly
    /// one value per cell of the target grid.
    pub fn new(
        box_width: f64,
        grids_per_side: i64,
        rhos: &'a mut [f64],
        cell: Subgrid,
    ) -> Result<Self, GridConstructionError> {
        if !(box_width > 0.0) {
            return Err(GridConstructionError::InvalidBoxWidth(box_width));
        }

        let (g, bg) = bounds(cell.width, grids_per_side, cell.x, cell.y, cell.z)?;
        if rhos.len() as i64 != g.volume() {
            return Err(GridConstructionError::RhoLengthMismatch {
                expected: g.volume(),
                actual: rhos.len(),
            });
        }

        let cell_width = box_width / bg.width() as f64;
        let cell_volume = cell_width * cell_width * cell_width;

        trace!(
            "Using a target grid of {0}x{0}x{0} cells at {1:?} in a bounding grid of {2}x{2}x{2} cells of width {3}.",
            g.width(),
            g.origin(),
            bg.width(),
            cell_width
        );

        Ok(Self {
            g,
            bg,
            rhos,
            cell_width,
            cell_volume,
            box_width,
        })
    }

    /// Returns the target grid window of this density grid
    #[inline(always)]
    pub fn grid(&self) -> &Grid {
        &self.g
    }

    /// Returns the periodic bounding grid this density grid is embedded in
    #[inline(always)]
    pub fn bounding_grid(&self) -> &Grid {
        &self.bg
    }

    /// Returns the physical width of one grid cell
    #[inline(always)]
    pub fn cell_width(&self) -> f64 {
        self.cell_width
    }

    /// Returns the physical volume of one grid cell
    #[inline(always)]
    pub fn cell_volume(&self) -> f64 {
        self.cell_volume
    }

    /// Returns the physical side length of the simulation box
    #[inline(always)]
    pub fn box_width(&self) -> f64 {
        self.box_width
    }

    /// Returns the accumulated densities of the target grid
    #[inline(always)]
    pub fn rhos(&self) -> &[f64] {
        self.rhos
    }

    /// Adds `frac` to the cell `(i, j, k)` if it is part of the target
    /// window, cells outside of the window are silently dropped
    #[inline(always)]
    pub fn incr(&mut self, i: i64, j: i64, k: i64, frac: f64) {
        if let Some(idx) = self.g.idx_check(i, j, k) {
            self.rhos[idx] += frac;
        }
    }

    /// Returns whether the possibly-wrapped cell bounds overlap the target window
    #[inline(always)]
    pub fn intersects(&self, cell_bounds: &CellBounds) -> bool {
        cell_bounds.intersects(&self.g, self.bg.width())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_requires_positive_width() {
        assert_eq!(
            Grid::new([0, 0, 0], 0),
            Err(GridConstructionError::InvalidWidth(0))
        );
        assert_eq!(
            Grid::new([0, 0, 0], -4),
            Err(GridConstructionError::InvalidWidth(-4))
        );
        assert!(Grid::new([0, 0, 0], 4).is_ok());
    }

    #[test]
    fn test_idx_check_translates_by_origin() {
        let grid = Grid::new([8, 8, 8], 4).unwrap();

        assert_eq!(grid.idx_check(8, 8, 8), Some(0));
        assert_eq!(grid.idx_check(9, 8, 8), Some(1));
        assert_eq!(grid.idx_check(8, 9, 8), Some(4));
        assert_eq!(grid.idx_check(8, 8, 9), Some(16));
        assert_eq!(grid.idx_check(11, 11, 11), Some(63));

        assert_eq!(grid.idx_check(7, 8, 8), None);
        assert_eq!(grid.idx_check(12, 8, 8), None);
        assert_eq!(grid.idx_check(0, 0, 0), None);
    }

    #[test]
    fn test_wrap_reduces_into_grid_range() {
        let bg = Grid::new([0, 0, 0], 8).unwrap();

        assert_eq!(bg.wrap([3, 4, 5]), [3, 4, 5]);
        assert_eq!(bg.wrap([-1, 8, 17]), [7, 0, 1]);
        assert_eq!(bg.wrap([-9, -8, -17]), [7, 0, 7]);
    }

    #[test]
    fn test_wrap_is_idempotent() {
        let bg = Grid::new([0, 0, 0], 8).unwrap();

        for ijk in [[0, 0, 0], [-3, 11, 100], [-100, 7, -8], [63, -63, 8]] {
            let once = bg.wrap(ijk);
            assert_eq!(bg.wrap(once), once);
        }
    }

    #[test]
    fn test_cell_bounds_intersects_window() {
        let (g, bg) = bounds(4, 2, 1, 0, 0).unwrap();
        assert_eq!(g.origin(), &[4, 0, 0]);
        assert_eq!(bg.width(), 8);

        // Fully inside the window.
        let inside = CellBounds {
            min: [5, 1, 1],
            max: [7, 3, 3],
        };
        assert!(inside.intersects(&g, bg.width()));

        // Outside on the x axis only.
        let outside = CellBounds {
            min: [0, 1, 1],
            max: [3, 3, 3],
        };
        assert!(!outside.intersects(&g, bg.width()));

        // Touching the window boundary from below does not overlap.
        let touching = CellBounds {
            min: [2, 0, 0],
            max: [4, 2, 2],
        };
        assert!(!touching.intersects(&g, bg.width()));
    }

    #[test]
    fn test_cell_bounds_intersects_across_periodic_boundary() {
        let (g, bg) = bounds(4, 2, 0, 0, 0).unwrap();

        // Box straddling the periodic boundary in x: pieces [7, 8) and [0, 1).
        let wrapping = CellBounds {
            min: [7, 0, 0],
            max: [9, 2, 2],
        };
        assert!(wrapping.intersects(&g, bg.width()));

        // Negative coordinates wrap to the upper end of the bounding grid.
        let negative = CellBounds {
            min: [-2, 0, 0],
            max: [-1, 2, 2],
        };
        assert!(!negative.intersects(&g, bg.width()));

        let negative_into_window = CellBounds {
            min: [-2, 0, 0],
            max: [1, 2, 2],
        };
        assert!(negative_into_window.intersects(&g, bg.width()));

        // A box spanning a full period overlaps everything.
        let everything = CellBounds {
            min: [-3, 0, 0],
            max: [5, 1, 1],
        };
        assert!(everything.intersects(&g, bg.width()));
    }

    #[test]
    fn test_density_grid_validates_buffer_length() {
        let mut rhos = vec![0.0; 63];
        let result = DensityGrid::new(
            1.0,
            1,
            &mut rhos,
            Subgrid {
                width: 4,
                x: 0,
                y: 0,
                z: 0,
            },
        );
        assert!(matches!(
            result,
            Err(GridConstructionError::RhoLengthMismatch {
                expected: 64,
                actual: 63
            })
        ));
    }

    #[test]
    fn test_density_grid_incr_drops_out_of_window() {
        let mut rhos = vec![0.0; 64];
        let mut grid = DensityGrid::new(
            1.0,
            2,
            &mut rhos,
            Subgrid {
                width: 4,
                x: 1,
                y: 1,
                z: 1,
            },
        )
        .unwrap();

        assert_eq!(grid.cell_width(), 0.125);

        grid.incr(4, 4, 4, 1.0);
        grid.incr(0, 0, 0, 1.0);
        grid.incr(3, 4, 4, 1.0);

        assert_eq!(grid.rhos()[0], 1.0);
        assert_eq!(grid.rhos().iter().sum::<f64>(), 1.0);
    }
}
