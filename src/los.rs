//! Line-of-sight deposition drivers
//!
//! These drivers connect sheet segments to radial halo profiles: a segment's
//! positions are unpacked into oriented tetrahedra, each tetrahedron gets a
//! density from the sheet geometry, and every halo accumulates the tetrahedra
//! whose bounding spheres overlap its own through its profile callbacks. The
//! halo-profile implementation itself lives outside this crate.

use rayon::prelude::*;

use crate::lattice::{coords, index, TetraIdxs};
use crate::tetra::{Sphere, Tetra};
use crate::Vec3;

/// Geometry of one sheet segment as recorded by the snapshot layer
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SheetHeader {
    /// Particles per side of the segment
    pub segment_width: i64,
    /// Lattice cells per side of the segment
    pub grid_width: i64,
    /// Physical side length of the simulation box
    pub total_width: f64,
    /// Total number of particles of the simulation
    pub count: i64,
    /// Lowest corner of the segment
    pub origin: Vec3,
}

/// Contract of a radial halo profile accumulating tetrahedron crossings
pub trait HaloProfile {
    /// Returns the halo center
    fn center(&self) -> Vec3;
    /// Moves the halo center, used for periodic re-centering
    fn set_center(&mut self, center: Vec3);
    /// Returns the halo radius
    fn radius(&self) -> f32;
    /// Broad-phase test of the halo against a tetrahedron bounding sphere
    fn sphere_intersect(&self, sphere: &Sphere) -> bool;
    /// Accumulates one tetrahedron crossing into the count profile
    fn count(&mut self, tetra: &Tetra);
    /// Accumulates one tetrahedron crossing into the density profile
    fn density(&mut self, tetra: &Tetra, rho: f64);
}

/// Counts, for every halo, the tetrahedra overlapping its profile shells
pub fn count_all<H: HaloProfile>(halos: &mut [H], tetras: &[Tetra], spheres: &[Sphere]) {
    for halo in halos.iter_mut() {
        for (tetra, sphere) in tetras.iter().zip(spheres.iter()) {
            if halo.sphere_intersect(sphere) {
                halo.count(tetra);
            }
        }
    }
}

/// Accumulates, for every halo, the densities of the tetrahedra overlapping
/// its profile shells
pub fn density_all<H: HaloProfile>(
    halos: &mut [H],
    tetras: &[Tetra],
    spheres: &[Sphere],
    rhos: &[f64],
) {
    for halo in halos.iter_mut() {
        for (ti, (tetra, sphere)) in tetras.iter().zip(spheres.iter()).enumerate() {
            if halo.sphere_intersect(sphere) {
                halo.density(tetra, rhos[ti]);
            }
        }
    }
}

/// Converts the raw position data of a sheet segment into oriented
/// tetrahedra, six per lattice cell
///
/// `xs` holds the positions of the segment points, `(grid_width + 1)` per
/// side, and `ts_buf` has to hold six tetrahedra per lattice cell of the
/// segment.
pub fn unpack_tetrahedra(xs: &[Vec3], hd: &SheetHeader, ts_buf: &mut [Tetra]) {
    let n = hd.segment_width * hd.segment_width * hd.segment_width;
    for write_idx in 0..n {
        let [x, y, z] = coords(write_idx, hd.segment_width);
        let read_idx = index(x, y, z, hd.segment_width);

        for dir in 0..6 {
            let t_idx = (6 * write_idx) as usize + dir;
            let idxs = TetraIdxs::new(read_idx, hd.grid_width + 1, 1, dir);
            let ids = idxs.ids();
            ts_buf[t_idx] = Tetra::new(
                xs[ids[0] as usize],
                xs[ids[1] as usize],
                xs[ids[2] as usize],
                xs[ids[3] as usize],
            );
            ts_buf[t_idx].orient(1);
        }
    }
}

/// Assigns every tetrahedron the density implied by the sheet mass it carries
pub fn tetra_density(hd: &SheetHeader, tetras: &[Tetra], rhos: &mut [f64]) {
    let tw = hd.total_width;
    let unit_tet_rho = tw * tw * tw / (6.0 * hd.count as f64);

    rhos.par_iter_mut()
        .zip(tetras.par_iter())
        .for_each(|(rho, tetra)| *rho = unit_tet_rho / tetra.volume());
}

/// Computes the bounding sphere of every tetrahedron
pub fn bounding_spheres(tetras: &[Tetra], spheres: &mut [Sphere]) {
    spheres
        .par_iter_mut()
        .zip(tetras.par_iter())
        .for_each(|(sphere, tetra)| *sphere = tetra.bounding_sphere());
}

/// Shifts halos below the sheet origin up by one box width
pub fn wrap_halo<H: HaloProfile>(halos: &mut [H], hd: &SheetHeader) {
    let tw = hd.total_width as f32;
    for halo in halos.iter_mut() {
        let mut center = halo.center();
        let radius = halo.radius();
        for d in 0..3 {
            if center[d] + radius < hd.origin[d] {
                center[d] += tw;
            }
        }
        halo.set_center(center);
    }
}

/// Shifts positions below the sheet origin up by one box width
pub fn wrap_xs(xs: &mut [Vec3], hd: &SheetHeader) {
    let tw = hd.total_width as f32;
    for x in xs.iter_mut() {
        for d in 0..3 {
            if x[d] < hd.origin[d] {
                x[d] += tw;
            }
        }
    }
}
