//! Index arithmetic on the Lagrangian particle lattice
//!
//! Particle ids are generated from a cubic lattice of side `count_width`, so
//! `id = ix + iy·count_width + iz·count_width²`. The [`TetraIdxs`] indexer
//! maps a particle id and a direction in `{0..5}` to the four particle ids
//! of one of the six tetrahedra tiling the lattice cube anchored at that
//! particle.

/// Decomposes a lattice id into its `(ix, iy, iz)` coordinate triplet
#[inline(always)]
pub fn coords(idx: i64, width: i64) -> [i64; 3] {
    [
        idx % width,
        (idx % (width * width)) / width,
        idx / (width * width),
    ]
}

/// Composes a lattice id from a coordinate triplet
#[inline(always)]
pub fn index(x: i64, y: i64, z: i64, width: i64) -> i64 {
    x + y * width + z * width * width
}

/// Offsets of the eight corners of the anchor cube, indexed by the bit
/// pattern `x + 2y + 4z`
const CUBE_CORNERS: [[i64; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [0, 1, 0],
    [1, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [0, 1, 1],
    [1, 1, 1],
];

/// The six tetrahedra tiling the anchor cube, given as corner indices into
/// [`CUBE_CORNERS`]
///
/// All six share the main diagonal from corner 0 to corner 7; each one is
/// the closure of one strict coordinate ordering inside the cube, so their
/// interiors are disjoint and their union is the full cube.
const TETRA_CUBE_CORNERS: [[usize; 4]; 6] = [
    [0, 1, 3, 7],
    [0, 1, 5, 7],
    [0, 2, 3, 7],
    [0, 2, 6, 7],
    [0, 4, 5, 7],
    [0, 4, 6, 7],
];

/// The four particle ids of one tetrahedron of an anchor cube
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct TetraIdxs {
    idxs: [i64; 4],
}

impl TetraIdxs {
    /// Computes the particle ids of tetrahedron `dir` of the cube anchored
    /// at `anchor_id`
    ///
    /// The cube corners are the lattice sites `(ix + a·skip, iy + b·skip,
    /// iz + c·skip)` for `a, b, c ∈ {0, 1}`, each coordinate reduced modulo
    /// `count_width`.
    pub fn new(anchor_id: i64, count_width: i64, skip: i64, dir: usize) -> Self {
        let [ix, iy, iz] = coords(anchor_id, count_width);

        let mut idxs = [0i64; 4];
        for (slot, &corner) in TETRA_CUBE_CORNERS[dir].iter().enumerate() {
            let [a, b, c] = CUBE_CORNERS[corner];
            idxs[slot] = index(
                (ix + a * skip).rem_euclid(count_width),
                (iy + b * skip).rem_euclid(count_width),
                (iz + c * skip).rem_euclid(count_width),
                count_width,
            );
        }
        Self { idxs }
    }

    /// Returns the four particle ids of the tetrahedron
    #[inline(always)]
    pub fn ids(&self) -> &[i64; 4] {
        &self.idxs
    }
}
