//!
//! Library for reconstructing continuous mass-density fields from the
//! phase-sheet tetrahedral tessellation of N-body simulation particles.
//!
//! The particles of a cosmological simulation are interpreted as the vertices
//! of a piecewise-linear tessellation of the dark matter phase sheet: every
//! cube of the initial (Lagrangian) particle lattice is split into six
//! tetrahedra, and the mass carried by each tetrahedron is deposited onto one
//! or more Cartesian sub-grids embedded in a periodic bounding grid. This
//! yields density fields with a much higher dynamic range than plain
//! per-particle mass assignment.
//!
//! Entry points:
//!
//! - [`DensityGrid`] describes a deposition target embedded in the periodic
//!   bounding grid of the simulation box.
//! - [`Interpolator`] selects one of the deposition strategies
//!   (nearest-grid-point, cloud-in-cell, cell-center, Monte Carlo or Sobol
//!   sampling of tetrahedra) and drives the deposition through
//!   [`Interpolator::interpolate`].
//! - The [`los`] module converts sheet segments into oriented tetrahedra and
//!   feeds them to radial halo profiles for line-of-sight analysis.
//!

use thiserror::Error as ThisError;

/// Re-export the version of `nalgebra` used by this crate
pub use nalgebra;

pub mod config;
pub mod density;
pub mod grid;
pub mod lattice;
pub mod los;
pub mod particles;
pub mod plucker;
pub mod smooth;
pub mod sobol;
pub mod tetra;

pub use crate::config::ConfigError;
pub use crate::density::{Interpolator, InterpolatorFlag, PointSelector};
pub use crate::grid::{bounds, CellBounds, DensityGrid, Grid, GridConstructionError, Subgrid};
pub use crate::lattice::TetraIdxs;
pub use crate::los::{HaloProfile, SheetHeader};
pub use crate::particles::{Particle, ParticleManager};
pub use crate::plucker::{
    AnchoredPluckerVec, PluckerTetra, PluckerVec, RayTetraIntersection, TetraFaceBary,
};
pub use crate::tetra::{Sphere, Tetra};

/// Three dimensional single precision vector used for particle positions and directions
pub type Vec3 = nalgebra::Vector3<f32>;

pub(crate) type HashState = fxhash::FxBuildHasher;
pub(crate) type MapType<K, V> = std::collections::HashMap<K, V, HashState>;

/// Error type returned when setting up or running a deposition fails
#[non_exhaustive]
#[derive(Debug, ThisError)]
pub enum Error {
    /// Error that occurred during the construction of a grid or density grid
    #[error("grid construction")]
    GridConstruction(
        #[source]
        #[from]
        GridConstructionError,
    ),
    /// Error that occurred while reading or validating a run configuration
    #[error("configuration")]
    Config(
        #[source]
        #[from]
        ConfigError,
    ),
    /// Any error that is not represented by some other explicit variant
    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}
