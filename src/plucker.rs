//! Plücker-coordinate ray/tetrahedron intersection
//!
//! Rays and tetrahedron edges are represented by six-component Plücker
//! vectors, and face piercing is decided through the signs of their permuted
//! inner products, following the algorithm of Platis & Theoharis. The sign
//! conventions and the face/edge incidence tables are frozen; changing them
//! silently breaks the barycentric weight recovery.

use crate::tetra::Tetra;
use crate::Vec3;

/// A ray in Plücker coordinates
///
/// For a ray with origin `p` and unit direction `l` the components are
/// `u = l` and `v = -p × l`.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct PluckerVec {
    pub u: Vec3,
    pub v: Vec3,
}

impl Default for PluckerVec {
    fn default() -> Self {
        Self {
            u: Vec3::zeros(),
            v: Vec3::zeros(),
        }
    }
}

/// A Plücker vector that also keeps the position of the ray's origin
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct AnchoredPluckerVec {
    pub plucker: PluckerVec,
    pub origin: Vec3,
}

impl Default for AnchoredPluckerVec {
    fn default() -> Self {
        Self {
            plucker: PluckerVec::default(),
            origin: Vec3::zeros(),
        }
    }
}

/// A tetrahedron represented by the Plücker vectors of its edges, in the raw
/// edge ordering {0-1, 0-2, 0-3, 1-2, 1-3, 2-3}
#[derive(Copy, Clone, PartialEq, Default, Debug)]
pub struct PluckerTetra {
    edges: [PluckerVec; 6],
}

/// Unnormalized barycentric coordinates of a ray intersection point on a
/// specific face of a tetrahedron
#[derive(Copy, Clone, PartialEq, Default, Debug)]
pub struct TetraFaceBary {
    w: [f32; 3],
    face: usize,
}

/// The faces pierced by an infinite line through a tetrahedron
///
/// `enter` is the face whose three edge products are all negative, `exit`
/// the face where they are all positive. A line grazing an edge or vertex
/// produces zero products and pierces no face.
#[derive(Copy, Clone, PartialEq, Default, Debug)]
pub struct RayTetraIntersection {
    pub enter: Option<TetraFaceBary>,
    pub exit: Option<TetraFaceBary>,
}

/// Maps a face and an edge-within-face index to the raw edge index
const FACE_EDGES: [[usize; 3]; 4] = [
    [5, 3, 4], // {3-2, 2-1, 1-3}
    [5, 2, 1], // {2-3, 3-0, 0-2}
    [0, 2, 4], // {1-0, 0-3, 3-1}
    [0, 3, 1], // {0-1, 1-2, 2-0}
];

/// Whether the stored edge vector has to be flipped when used for the face
const FACE_EDGE_FLIPS: [[bool; 3]; 4] = [
    [true, true, false],
    [false, true, false],
    [true, false, true],
    [false, false, true],
];

impl PluckerVec {
    /// Constructs a Plücker vector from a ray origin and a unit direction
    pub fn from_ray(p: &Vec3, l: &Vec3) -> Self {
        Self {
            u: *l,
            v: l.cross(p),
        }
    }

    /// Constructs a Plücker vector for the ray pointing from `p1` to `p2`
    pub fn from_segment(p1: &Vec3, p2: &Vec3) -> Self {
        let u = (p2 - p1).normalize();
        Self { u, v: u.cross(p1) }
    }

    /// Computes the permuted inner product `u₁·v₂ + v₁·u₂`, negated when
    /// `flip` is false
    #[inline(always)]
    pub fn dot(&self, other: &PluckerVec, flip: bool) -> f32 {
        let sum = self.u.dot(&other.v) + self.v.dot(&other.u);
        if flip { sum } else { -sum }
    }

    /// Computes the permuted inner product together with a -1/0/+1 sign
    /// discriminator
    #[inline(always)]
    pub fn sign_dot(&self, other: &PluckerVec, flip: bool) -> (f32, i32) {
        let dot = self.dot(other, flip);
        if dot == 0.0 {
            (dot, 0)
        } else if dot > 0.0 {
            (dot, 1)
        } else {
            (dot, -1)
        }
    }
}

impl AnchoredPluckerVec {
    /// Constructs an anchored Plücker vector from a ray origin and a unit
    /// direction
    pub fn from_ray(p: &Vec3, l: &Vec3) -> Self {
        Self {
            plucker: PluckerVec::from_ray(p, l),
            origin: *p,
        }
    }

    /// Constructs an anchored Plücker vector for the ray pointing from `p1`
    /// to `p2`
    pub fn from_segment(p1: &Vec3, p2: &Vec3) -> Self {
        Self {
            plucker: PluckerVec::from_segment(p1, p2),
            origin: *p1,
        }
    }
}

impl PluckerTetra {
    /// Computes the edge Plücker vectors of a tetrahedron
    pub fn new(t: &Tetra) -> Self {
        let v = t.vertices();
        Self {
            edges: [
                PluckerVec::from_segment(&v[0], &v[1]),
                PluckerVec::from_segment(&v[0], &v[2]),
                PluckerVec::from_segment(&v[0], &v[3]),
                PluckerVec::from_segment(&v[1], &v[2]),
                PluckerVec::from_segment(&v[1], &v[3]),
                PluckerVec::from_segment(&v[2], &v[3]),
            ],
        }
    }

    /// Returns the raw edge index and flip flag for the given face and
    /// edge-within-face index
    #[inline(always)]
    pub const fn edge(face: usize, edge: usize) -> (usize, bool) {
        (FACE_EDGES[face][edge], FACE_EDGE_FLIPS[face][edge])
    }

    /// Tests whether the ray strictly pierces the given face
    ///
    /// Returns the unnormalized barycentric weights of the intersection
    /// point and the shared sign of the three edge products. Any zero
    /// product means the ray grazes an edge and counts as a miss.
    pub fn pierce(&self, ray: &PluckerVec, face: usize) -> Option<(TetraFaceBary, i32)> {
        let mut dots = [0.0f32; 3];
        let mut shared_sign = 0;
        for e in 0..3 {
            let (idx, flip) = Self::edge(face, e);
            let (dot, sign) = ray.sign_dot(&self.edges[idx], flip);
            if sign == 0 || (e > 0 && sign != shared_sign) {
                return None;
            }
            shared_sign = sign;
            dots[e] = dot;
        }

        // The product against an edge weights the face vertex that is not on
        // that edge; for the tables above that pairs the three products with
        // the face vertices in the order (2, 0, 1).
        Some((
            TetraFaceBary {
                w: [dots[1], dots[2], dots[0]],
                face,
            },
            shared_sign,
        ))
    }

    /// Determines the faces pierced by the infinite line of the ray
    pub fn intersect_ray(&self, ray: &PluckerVec) -> RayTetraIntersection {
        let mut result = RayTetraIntersection::default();
        for face in 0..4 {
            if let Some((bary, sign)) = self.pierce(ray, face) {
                if sign < 0 {
                    result.enter = Some(bary);
                } else {
                    result.exit = Some(bary);
                }
            }
        }
        result
    }
}

impl TetraFaceBary {
    /// Returns the unnormalized barycentric weights of the intersection point
    #[inline(always)]
    pub fn weights(&self) -> &[f32; 3] {
        &self.w
    }

    /// Returns the index of the pierced face
    #[inline(always)]
    pub fn face(&self) -> usize {
        self.face
    }
}

impl Tetra {
    /// Recovers the distance along the ray to the intersection point given by
    /// the barycentric coordinates on a pierced face
    ///
    /// The intersection point is reconstructed from the face vertices and
    /// projected onto the first non-zero component of the ray direction to
    /// solve `p_intr = p + t·l` for `t`.
    pub fn distance(&self, ap: &AnchoredPluckerVec, bary: &TetraFaceBary) -> f32 {
        let sum = bary.w[0] + bary.w[1] + bary.w[2];
        let u0 = bary.w[0] / sum;
        let u1 = bary.w[1] / sum;
        let u2 = bary.w[2] / sum;

        let dim = (0..3)
            .find(|&d| ap.plucker.u[d] != 0.0)
            .expect("ray direction must be non-zero");

        let verts = self.vertices();
        let p0 = verts[Tetra::face_vertex(bary.face, 0)][dim];
        let p1 = verts[Tetra::face_vertex(bary.face, 1)][dim];
        let p2 = verts[Tetra::face_vertex(bary.face, 2)][dim];

        ((u0 * p0 + u1 * p1 + u2 * p2) - ap.origin[dim]) / ap.plucker.u[dim]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_tetra() -> Tetra {
        let mut t = Tetra::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        t.orient(1);
        t
    }

    #[test]
    fn test_dot_flip_negates() {
        let p1 = PluckerVec::from_ray(&Vec3::new(0.2, 0.2, 0.2), &Vec3::new(1.0, 0.0, 0.0));
        let p2 = PluckerVec::from_segment(&Vec3::new(1.0, 0.0, 0.0), &Vec3::new(0.0, 1.0, 0.0));

        assert_eq!(p1.dot(&p2, true), -p1.dot(&p2, false));

        let (dot, sign) = p1.sign_dot(&p2, true);
        assert_eq!(sign, if dot > 0.0 { 1 } else { -1 });
    }

    #[test]
    fn test_from_segment_normalizes_direction() {
        let p = PluckerVec::from_segment(&Vec3::new(1.0, 2.0, 3.0), &Vec3::new(4.0, 2.0, 3.0));
        assert!((p.u.norm() - 1.0).abs() < 1e-6);
        assert_eq!(p.u, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_axis_ray_pierces_two_faces() {
        let t = unit_tetra();
        let pt = PluckerTetra::new(&t);

        // A ray along +x from an interior point: the line leaves through the
        // slanted face 0 ahead of the origin and through face 1 (the x = 0
        // plane) behind it.
        let ap = AnchoredPluckerVec::from_ray(&Vec3::new(0.2, 0.2, 0.2), &Vec3::new(1.0, 0.0, 0.0));
        let hit = pt.intersect_ray(&ap.plucker);

        let enter = hit.enter.unwrap();
        let exit = hit.exit.unwrap();
        assert_eq!(enter.face(), 0);
        assert_eq!(exit.face(), 1);

        // Distance to the plane x + y + z = 1 along +x is 0.4, the backward
        // crossing of x = 0 sits at -0.2.
        assert!((t.distance(&ap, &enter) - 0.4).abs() < 1e-5);
        assert!((t.distance(&ap, &exit) + 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_axis_rays_along_each_axis() {
        let t = unit_tetra();
        let pt = PluckerTetra::new(&t);
        let origin = Vec3::new(0.2, 0.2, 0.2);

        for dir in [
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(-1.0, 0.0, 0.0),
        ] {
            let ap = AnchoredPluckerVec::from_ray(&origin, &dir);
            let hit = pt.intersect_ray(&ap.plucker);
            let enter = hit.enter.expect("interior ray pierces a face");
            let exit = hit.exit.expect("interior ray pierces a face");
            assert_ne!(enter.face(), exit.face());

            // One crossing ahead of the origin, one behind it.
            let d_enter = t.distance(&ap, &enter);
            let d_exit = t.distance(&ap, &exit);
            assert!(d_enter * d_exit < 0.0);
        }
    }

    #[test]
    fn test_ray_in_face_plane_is_a_miss() {
        let t = unit_tetra();
        let pt = PluckerTetra::new(&t);

        // This ray lies inside the x = 0 face plane, so every crossing grazes
        // an edge and produces a zero product somewhere.
        let ray = PluckerVec::from_ray(&Vec3::new(0.0, 0.2, 0.2), &Vec3::new(0.0, 0.0, 1.0));
        let hit = pt.intersect_ray(&ray);
        assert!(hit.enter.is_none());
        assert!(hit.exit.is_none());
    }
}
