//! Density deposition strategies
//!
//! Every strategy satisfies the same contract: [`Interpolator::interpolate`]
//! adds the density contribution of the supplied particles or points to each
//! target grid in a single pass, silently dropping contributions that fall
//! outside all target windows. The point-based strategies (nearest grid
//! point and cloud in cell) consume raw positions; the tetrahedron-based
//! strategies consume particle ids and resolve them through the particle
//! manager and the Lagrangian lattice indexer.
//!
//! Deposition is deterministic: ids are processed in caller order, the six
//! tetrahedron directions in order `0..6`, sample points in generator order
//! and the eight cloud-in-cell corners in the order
//! `000, 100, 010, 110, 001, 101, 011, 111`.

use std::str::FromStr;

use itertools::iproduct;
use log::debug;
use rand_chacha::ChaCha8Rng;

use crate::config::ConfigError;
use crate::grid::{DensityGrid, Grid};
use crate::lattice::TetraIdxs;
use crate::particles::ParticleManager;
use crate::sobol::Sobol;
use crate::tetra::Tetra;
use crate::Vec3;

/// Minimum edge length, in box units, below which the `PropToCells`
/// selector rejects a tetrahedron as too close to degenerate
const MIN_SELECTOR_LEG: f32 = 0.251;

/// Names the interpolation scheme that should be used to assign densities
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum InterpolatorFlag {
    NearestGridPoint,
    CloudInCell,
    CellCenter,
    MonteCarlo,
    SobolSequence,
}

impl FromStr for InterpolatorFlag {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NearestGridPoint" => Ok(Self::NearestGridPoint),
            "CloudInCell" => Ok(Self::CloudInCell),
            "CellCenter" => Ok(Self::CellCenter),
            "MonteCarlo" => Ok(Self::MonteCarlo),
            "SobolSequence" => Ok(Self::SobolSequence),
            _ => Err(ConfigError::UnknownInterpolator(s.to_string())),
        }
    }
}

/// Policy selecting how many sample points a tetrahedron receives
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PointSelector {
    /// Every tetrahedron receives the configured number of points
    Flat,
    /// Tetrahedra with a minimum edge below the quality cutoff receive none
    PropToCells,
}

impl FromStr for PointSelector {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Flat" => Ok(Self::Flat),
            "PropToCells" => Ok(Self::PropToCells),
            _ => Err(ConfigError::UnknownSelector(s.to_string())),
        }
    }
}

impl PointSelector {
    /// Returns the number of sample points to place inside the tetrahedron
    pub fn points(&self, steps: usize, tetra: &Tetra) -> usize {
        match self {
            PointSelector::Flat => steps,
            PointSelector::PropToCells => {
                let (min_leg, _) = tetra.min_max_leg();
                if min_leg >= MIN_SELECTOR_LEG { steps } else { 0 }
            }
        }
    }
}

/// A density deposition strategy together with its configuration and scratch
/// buffers
///
/// The sampling strategies own their random number generator and their
/// sample buffers, which are allocated once at construction and reused for
/// every tetrahedron.
#[derive(Debug)]
pub enum Interpolator<'a> {
    /// Nearest-grid-point deposition of raw positions
    Ngp,
    /// Cloud-in-cell deposition of raw positions
    Cic,
    /// Deposition of the tetrahedra whose cell centers they cover
    CellCenter {
        manager: &'a ParticleManager,
        count_width: i64,
    },
    /// Pseudo-random uniform sampling of tetrahedra
    MonteCarlo {
        manager: &'a ParticleManager,
        count_width: i64,
        rng: ChaCha8Rng,
        steps: usize,
        selector: PointSelector,
        rand_buf: Vec<f32>,
        vec_buf: Vec<Vec3>,
        intersect_gs: Vec<usize>,
    },
    /// Quasi-random sampling of tetrahedra through a precomputed Sobol sequence
    Sobol {
        manager: &'a ParticleManager,
        count_width: i64,
        xs: Vec<f32>,
        ys: Vec<f32>,
        zs: Vec<f32>,
        vec_buf: Vec<Vec3>,
        intersect_gs: Vec<usize>,
    },
}

impl<'a> Interpolator<'a> {
    /// Constructs a nearest-grid-point interpolator
    pub fn ngp() -> Self {
        Self::Ngp
    }

    /// Constructs a cloud-in-cell interpolator
    pub fn cic() -> Self {
        Self::Cic
    }

    /// Constructs a cell-center interpolator over the given particles
    pub fn cell_center(manager: &'a ParticleManager, count_width: i64) -> Self {
        Self::CellCenter {
            manager,
            count_width,
        }
    }

    /// Constructs a Monte-Carlo interpolator placing up to `steps` sample
    /// points per tetrahedron
    pub fn monte_carlo(
        manager: &'a ParticleManager,
        count_width: i64,
        rng: ChaCha8Rng,
        steps: usize,
        selector: PointSelector,
    ) -> Self {
        Self::MonteCarlo {
            manager,
            count_width,
            rng,
            steps,
            selector,
            rand_buf: vec![0.0; 3 * steps],
            vec_buf: vec![Vec3::zeros(); steps],
            intersect_gs: Vec::new(),
        }
    }

    /// Constructs a Sobol interpolator placing `steps` quasi-random sample
    /// points per tetrahedron
    pub fn sobol(manager: &'a ParticleManager, count_width: i64, steps: usize) -> Self {
        let mut sequence = Sobol::new();
        let mut xs = vec![0.0; steps];
        let mut ys = vec![0.0; steps];
        let mut zs = vec![0.0; steps];
        sequence.fill(&mut xs, &mut ys, &mut zs);

        Self::Sobol {
            manager,
            count_width,
            xs,
            ys,
            zs,
            vec_buf: vec![Vec3::zeros(); steps],
            intersect_gs: Vec::new(),
        }
    }

    /// Adds the density contribution of the supplied particles to every
    /// target grid
    ///
    /// `mass` is the physical mass per particle. The tetrahedron-based
    /// strategies read `ids` and ignore `points`; the point-based strategies
    /// read `points` and ignore `ids`. Contributions outside all target
    /// windows are dropped.
    pub fn interpolate(
        &mut self,
        grids: &mut [DensityGrid],
        mass: f64,
        ids: &[i64],
        points: &[Vec3],
    ) {
        if grids.is_empty() {
            return;
        }

        match self {
            Interpolator::Ngp => ngp_interpolate(grids, mass, points),
            Interpolator::Cic => cic_interpolate(grids, mass, points),
            Interpolator::CellCenter {
                manager,
                count_width,
            } => cell_center_interpolate(*manager, *count_width, grids, mass, ids),
            Interpolator::MonteCarlo {
                manager,
                count_width,
                rng,
                steps,
                selector,
                rand_buf,
                vec_buf,
                intersect_gs,
            } => monte_carlo_interpolate(
                *manager,
                *count_width,
                rng,
                *steps,
                *selector,
                rand_buf,
                vec_buf,
                intersect_gs,
                grids,
                mass,
                ids,
            ),
            Interpolator::Sobol {
                manager,
                count_width,
                xs,
                ys,
                zs,
                vec_buf,
                intersect_gs,
            } => sobol_interpolate(
                *manager,
                *count_width,
                xs,
                ys,
                zs,
                vec_buf,
                intersect_gs,
                grids,
                mass,
                ids,
            ),
        }
    }
}

fn ngp_interpolate(grids: &mut [DensityGrid], mass: f64, points: &[Vec3]) {
    let cell_width = grids[0].cell_width();
    let frac = mass / grids[0].cell_volume();

    for pt in points {
        let i = (f64::from(pt.x) / cell_width).floor() as i64;
        let j = (f64::from(pt.y) / cell_width).floor() as i64;
        let k = (f64::from(pt.z) / cell_width).floor() as i64;

        for grid in grids.iter_mut() {
            grid.incr(i, j, k, frac);
        }
    }
}

fn cic_interpolate(grids: &mut [DensityGrid], mass: f64, points: &[Vec3]) {
    let cw = grids[0].cell_width();
    let cw2 = cw / 2.0;
    let bg_width = grids[0].bounding_grid().width();
    let frac = mass / grids[0].cell_volume();

    for pt in points {
        // Shift to cell-corner-centered coordinates before splitting.
        let xp = f64::from(pt.x) - cw2;
        let yp = f64::from(pt.y) - cw2;
        let zp = f64::from(pt.z) - cw2;

        let xc = (xp / cw).floor();
        let yc = (yp / cw).floor();
        let zc = (zp / cw).floor();

        let dx = xp / cw - xc;
        let dy = yp / cw - yc;
        let dz = zp / cw - zc;
        let tx = 1.0 - dx;
        let ty = 1.0 - dy;
        let tz = 1.0 - dz;

        let (i0, i1) = nbrs(xc as i64, bg_width);
        let (j0, j1) = nbrs(yc as i64, bg_width);
        let (k0, k1) = nbrs(zc as i64, bg_width);

        for grid in grids.iter_mut() {
            grid.incr(i0, j0, k0, tx * ty * tz * frac);
            grid.incr(i1, j0, k0, dx * ty * tz * frac);
            grid.incr(i0, j1, k0, tx * dy * tz * frac);
            grid.incr(i1, j1, k0, dx * dy * tz * frac);
            grid.incr(i0, j0, k1, tx * ty * dz * frac);
            grid.incr(i1, j0, k1, dx * ty * dz * frac);
            grid.incr(i0, j1, k1, tx * dy * dz * frac);
            grid.incr(i1, j1, k1, dx * dy * dz * frac);
        }
    }
}

/// Returns the cell pair straddling a cell boundary, wrapping the pair
/// through the periodic bounding grid at both ends
fn nbrs(i: i64, width: i64) -> (i64, i64) {
    if i == -1 {
        (width - 1, 0)
    } else if i + 1 == width {
        (i, 0)
    } else {
        (i, i + 1)
    }
}

/// Gathers the four vertex particles of a tetrahedron and re-centers it
/// across the periodic boundary, or skips it if any particle is missing
fn gather_tetra(manager: &ParticleManager, idxs: &TetraIdxs, box_width: f32) -> Option<Tetra> {
    let mut positions = [Vec3::zeros(); 4];
    for (slot, &id) in idxs.ids().iter().enumerate() {
        let Some(particle) = manager.get(id) else {
            debug!("Skipping tetrahedron: particle {} is not in the manager.", id);
            return None;
        };
        positions[slot] = particle.position;
    }
    Some(Tetra::periodic(
        positions[0],
        positions[1],
        positions[2],
        positions[3],
        box_width,
    ))
}

fn cell_center_interpolate(
    manager: &ParticleManager,
    count_width: i64,
    grids: &mut [DensityGrid],
    mass: f64,
    ids: &[i64],
) {
    let cell_width = grids[0].cell_width();
    let cell_volume = grids[0].cell_volume();
    let box_width = grids[0].box_width() as f32;
    let bg = *grids[0].bounding_grid();

    for &id in ids {
        for dir in 0..6 {
            let idxs = TetraIdxs::new(id, count_width, 1, dir);
            let Some(tetra) = gather_tetra(manager, &idxs, box_width) else {
                continue;
            };
            let volume = tetra.volume();
            if !(volume > 0.0) {
                continue;
            }

            let frac = mass / 6.0 * cell_volume / volume;
            let bounds = tetra.cell_bounds_at(cell_width);

            for (z, y, x) in iproduct!(
                bounds.min[2]..bounds.max[2],
                bounds.min[1]..bounds.max[1],
                bounds.min[0]..bounds.max[0]
            ) {
                let center = Vec3::new(
                    ((x as f64 + 0.5) * cell_width) as f32,
                    ((y as f64 + 0.5) * cell_width) as f32,
                    ((z as f64 + 0.5) * cell_width) as f32,
                );
                if tetra.contains(&center) {
                    let [i, j, k] = bg.wrap([x, y, z]);
                    for grid in grids.iter_mut() {
                        grid.incr(i, j, k, frac);
                    }
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn monte_carlo_interpolate(
    manager: &ParticleManager,
    count_width: i64,
    rng: &mut ChaCha8Rng,
    steps: usize,
    selector: PointSelector,
    rand_buf: &mut [f32],
    vec_buf: &mut [Vec3],
    intersect_gs: &mut Vec<usize>,
    grids: &mut [DensityGrid],
    mass: f64,
    ids: &[i64],
) {
    let cell_width = grids[0].cell_width();
    let box_width = grids[0].box_width() as f32;
    let bg = *grids[0].bounding_grid();

    for &id in ids {
        for dir in 0..6 {
            let idxs = TetraIdxs::new(id, count_width, 1, dir);
            let Some(tetra) = gather_tetra(manager, &idxs, box_width) else {
                continue;
            };
            if !(tetra.volume() > 0.0) {
                continue;
            }

            let bounds = tetra.cell_bounds_at(cell_width);
            intersect_gs.clear();
            intersect_gs.extend(
                grids
                    .iter()
                    .enumerate()
                    .filter(|(_, grid)| grid.intersects(&bounds))
                    .map(|(gi, _)| gi),
            );
            if intersect_gs.is_empty() {
                continue;
            }

            let pts = selector.points(steps, &tetra);
            if pts == 0 {
                continue;
            }

            tetra.sample(rng, &mut rand_buf[..3 * pts], &mut vec_buf[..pts]);
            let pt_mass = mass / pts as f64 / 6.0;
            deposit_points_ngp(grids, intersect_gs, &bg, cell_width, pt_mass, &vec_buf[..pts]);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn sobol_interpolate(
    manager: &ParticleManager,
    count_width: i64,
    xs: &[f32],
    ys: &[f32],
    zs: &[f32],
    vec_buf: &mut [Vec3],
    intersect_gs: &mut Vec<usize>,
    grids: &mut [DensityGrid],
    mass: f64,
    ids: &[i64],
) {
    let cell_width = grids[0].cell_width();
    let box_width = grids[0].box_width() as f32;
    let bg = *grids[0].bounding_grid();
    let pts = xs.len();
    if pts == 0 {
        return;
    }
    let pt_mass = mass / pts as f64 / 6.0;

    for &id in ids {
        for dir in 0..6 {
            let idxs = TetraIdxs::new(id, count_width, 1, dir);
            let Some(tetra) = gather_tetra(manager, &idxs, box_width) else {
                continue;
            };
            if !(tetra.volume() > 0.0) {
                continue;
            }

            let bounds = tetra.cell_bounds_at(cell_width);
            intersect_gs.clear();
            intersect_gs.extend(
                grids
                    .iter()
                    .enumerate()
                    .filter(|(_, grid)| grid.intersects(&bounds))
                    .map(|(gi, _)| gi),
            );
            if intersect_gs.is_empty() {
                continue;
            }

            tetra.distribute(xs, ys, zs, &mut vec_buf[..pts]);
            deposit_points_ngp(grids, intersect_gs, &bg, cell_width, pt_mass, &vec_buf[..pts]);
        }
    }
}

/// Nearest-grid-point deposit of tetrahedron sample points onto the selected
/// grids, wrapping every cell through the periodic bounding grid
fn deposit_points_ngp(
    grids: &mut [DensityGrid],
    selected: &[usize],
    bg: &Grid,
    cell_width: f64,
    pt_mass: f64,
    points: &[Vec3],
) {
    for &gi in selected {
        let grid = &mut grids[gi];
        let frac = pt_mass / grid.cell_volume();
        for pt in points {
            let cell = [
                (f64::from(pt.x) / cell_width).floor() as i64,
                (f64::from(pt.y) / cell_width).floor() as i64,
                (f64::from(pt.z) / cell_width).floor() as i64,
            ];
            let [i, j, k] = bg.wrap(cell);
            grid.incr(i, j, k, frac);
        }
    }
}
