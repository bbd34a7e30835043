//! Oriented tetrahedra and the geometric queries used during deposition
//!
//! A [`Tetra`] stores its four vertices in a fixed face ordering: face `k` is
//! the face opposite vertex `k`. The vertex triplets of the faces are given
//! by the frozen table
//!
//! ```text
//! F0(V3, V2, V1)
//! F1(V2, V3, V0)
//! F2(V1, V0, V3)
//! F3(V0, V1, V2)
//! ```

use crate::grid::CellBounds;
use crate::Vec3;
use rand::Rng;

/// Maps a face index and a vertex-within-face index to a tetra vertex index
const TETRA_FACES: [[usize; 3]; 4] = [[3, 2, 1], [2, 3, 0], [1, 0, 3], [0, 1, 2]];

/// The six vertex pairs making up the edges of a tetrahedron, in the raw
/// edge ordering {0-1, 0-2, 0-3, 1-2, 1-3, 2-3}
const TETRA_EDGES: [[usize; 2]; 6] = [[0, 1], [0, 2], [0, 3], [1, 2], [1, 3], [2, 3]];

/// A tetrahedron given by four vertex positions
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Tetra {
    verts: [Vec3; 4],
}

impl Default for Tetra {
    fn default() -> Self {
        Self {
            verts: [Vec3::zeros(); 4],
        }
    }
}

/// A sphere used for broad-phase intersection tests
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            center: Vec3::zeros(),
            radius: 0.0,
        }
    }
}

impl Sphere {
    /// Returns whether the two spheres overlap or touch
    #[inline(always)]
    pub fn intersects(&self, other: &Sphere) -> bool {
        let dr = self.radius + other.radius;
        (self.center - other.center).norm_squared() <= dr * dr
    }
}

impl Tetra {
    /// Constructs a tetrahedron from four vertex positions
    pub fn new(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3) -> Self {
        Self {
            verts: [p0, p1, p2, p3],
        }
    }

    /// Constructs a contiguous tetrahedron from vertices of a periodic box
    ///
    /// Every vertex is moved to its periodic image closest to `p0`, so the
    /// tetrahedron stays connected even when its particles straddle the box
    /// boundary. An axis is shifted by `±box_width` whenever its distance to
    /// `p0` exceeds half the box width.
    pub fn periodic(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, box_width: f32) -> Self {
        let mut t = Self::new(p0, p1, p2, p3);
        let half = box_width / 2.0;
        for i in 1..4 {
            for d in 0..3 {
                let dx = t.verts[i][d] - t.verts[0][d];
                if dx > half {
                    t.verts[i][d] -= box_width;
                } else if dx < -half {
                    t.verts[i][d] += box_width;
                }
            }
        }
        t
    }

    /// Returns the four vertices of the tetrahedron
    #[inline(always)]
    pub fn vertices(&self) -> &[Vec3; 4] {
        &self.verts
    }

    /// Returns the tetra vertex index corresponding to the given face and
    /// vertex-within-face index
    #[inline(always)]
    pub const fn face_vertex(face: usize, vertex: usize) -> usize {
        TETRA_FACES[face][vertex]
    }

    /// Arranges the vertices so that the scalar triple product of the edges
    /// from vertex 0 has the sign of `dir`, possibly swapping the first two
    /// vertices
    pub fn orient(&mut self, dir: i32) {
        let triple = self.signed_triple();
        if (triple < 0.0 && dir > 0) || (triple > 0.0 && dir < 0) {
            self.verts.swap(0, 1);
        }
    }

    fn signed_triple(&self) -> f64 {
        let v = to_f64(self.verts[1] - self.verts[0]);
        let w = to_f64(self.verts[2] - self.verts[0]);
        let u = to_f64(self.verts[3] - self.verts[0]);
        v.cross(&w).dot(&u)
    }

    /// Returns the volume of the tetrahedron
    #[inline(always)]
    pub fn volume(&self) -> f64 {
        self.signed_triple().abs() / 6.0
    }

    /// Returns the minimum and maximum of the six edge lengths
    pub fn min_max_leg(&self) -> (f32, f32) {
        let mut min = f32::INFINITY;
        let mut max = 0.0f32;
        for [a, b] in TETRA_EDGES {
            let leg = (self.verts[b] - self.verts[a]).norm();
            min = min.min(leg);
            max = max.max(leg);
        }
        (min, max)
    }

    /// Returns the cell-space bounding box of the tetrahedron for the given
    /// cell width
    ///
    /// The bounds are the floor and ceiling of the vertex extents divided by
    /// the cell width. They are not reduced into the periodic range, so they
    /// may leave the bounding grid; callers have to wrap every enumerated
    /// cell triplet.
    pub fn cell_bounds_at(&self, cell_width: f64) -> CellBounds {
        let mut bounds = CellBounds::default();
        for d in 0..3 {
            let mut lo = f64::from(self.verts[0][d]);
            let mut hi = lo;
            for vert in &self.verts[1..] {
                lo = lo.min(f64::from(vert[d]));
                hi = hi.max(f64::from(vert[d]));
            }
            bounds.min[d] = (lo / cell_width).floor() as i64;
            bounds.max[d] = (hi / cell_width).ceil() as i64;
        }
        bounds
    }

    /// Returns whether the point lies inside the tetrahedron
    ///
    /// The test checks the point against the four face half-spaces and
    /// accepts it if all non-zero signed distances agree, so points exactly
    /// on a face count as inside.
    pub fn contains(&self, pt: &Vec3) -> bool {
        let mut positive = false;
        let mut negative = false;
        for face in TETRA_FACES {
            let a = self.verts[face[0]];
            let b = self.verts[face[1]];
            let c = self.verts[face[2]];
            let d = (b - a).cross(&(c - a)).dot(&(pt - a));
            if d > 0.0 {
                positive = true;
            } else if d < 0.0 {
                negative = true;
            }
        }
        !(positive && negative)
    }

    /// Returns a sphere centered on the vertex centroid that encloses the
    /// tetrahedron
    pub fn bounding_sphere(&self) -> Sphere {
        let center = (self.verts[0] + self.verts[1] + self.verts[2] + self.verts[3]) / 4.0;
        let mut radius = 0.0f32;
        for vert in &self.verts {
            radius = radius.max((vert - center).norm());
        }
        Sphere { center, radius }
    }

    /// Maps a point of the unit cube to a uniformly distributed point of the
    /// tetrahedron using the folded-cube transform
    ///
    /// The two-step fold turns `(s, t, u) ∈ [0, 1]³` into the barycentric
    /// weights `(1 - s - t - u, s, t, u)` of a uniform distribution.
    pub fn barycentric_point(&self, s: f32, t: f32, u: f32) -> Vec3 {
        let (mut s, mut t, mut u) = (s, t, u);
        if s + t > 1.0 {
            s = 1.0 - s;
            t = 1.0 - t;
        }
        if t + u > 1.0 {
            let tmp = u;
            u = 1.0 - s - t;
            t = 1.0 - tmp;
        } else if s + t + u > 1.0 {
            let tmp = u;
            u = s + t + u - 1.0;
            s = 1.0 - t - tmp;
        }
        let w = 1.0 - s - t - u;

        self.verts[0] * w + self.verts[1] * s + self.verts[2] * t + self.verts[3] * u
    }

    /// Fills `out` with uniformly distributed points inside the tetrahedron
    ///
    /// `scratch` has to hold at least three floats per output point and is
    /// overwritten with the raw unit-cube draws.
    pub fn sample<R: Rng>(&self, rng: &mut R, scratch: &mut [f32], out: &mut [Vec3]) {
        let n = out.len();
        assert!(scratch.len() >= 3 * n);

        for x in scratch[..3 * n].iter_mut() {
            *x = rng.gen();
        }
        for (i, pt) in out.iter_mut().enumerate() {
            *pt = self.barycentric_point(scratch[3 * i], scratch[3 * i + 1], scratch[3 * i + 2]);
        }
    }

    /// Applies the barycentric fold to pre-drawn unit-cube coordinates,
    /// writing one tetrahedron point per coordinate triple
    pub fn distribute(&self, xs: &[f32], ys: &[f32], zs: &[f32], out: &mut [Vec3]) {
        for (i, pt) in out.iter_mut().enumerate() {
            *pt = self.barycentric_point(xs[i], ys[i], zs[i]);
        }
    }
}

#[inline(always)]
fn to_f64(v: Vec3) -> nalgebra::Vector3<f64> {
    nalgebra::Vector3::new(f64::from(v.x), f64::from(v.y), f64::from(v.z))
}
