use phasesheet::density::{Interpolator, PointSelector};
use phasesheet::grid::{DensityGrid, Subgrid};
use phasesheet::lattice::coords;
use phasesheet::particles::{Particle, ParticleManager};
use phasesheet::Vec3;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Particles on the corners of one Lagrangian cube of side `scale`, shifted
/// by `offset` and wrapped into the unit box
fn cube_particles(count_width: i64, scale: f32, offset: Vec3) -> ParticleManager {
    let mut particles = Vec::new();
    for a in 0..2i64 {
        for b in 0..2i64 {
            for c in 0..2i64 {
                let id = a + b * count_width + c * count_width * count_width;
                let mut position = Vec3::new(a as f32, b as f32, c as f32) * scale + offset;
                for d in 0..3 {
                    if position[d] >= 1.0 {
                        position[d] -= 1.0;
                    }
                }
                particles.push(Particle { id, position });
            }
        }
    }

    let mut manager = ParticleManager::new();
    manager.add(&particles);
    manager
}

fn full_box_grid(rhos: &mut [f64], width: i64) -> DensityGrid<'_> {
    DensityGrid::new(
        1.0,
        1,
        rhos,
        Subgrid {
            width,
            x: 0,
            y: 0,
            z: 0,
        },
    )
    .unwrap()
}

fn deposited_mass(grid: &DensityGrid) -> f64 {
    grid.rhos().iter().sum::<f64>() * grid.cell_volume()
}

#[test]
fn cell_center_covers_each_cell_center_once() {
    // A cube of side 0.4 shifted off every symmetry plane: its six
    // tetrahedra cover the eight enclosed cell centers exactly once.
    let manager = cube_particles(2, 0.4, Vec3::new(0.013, 0.027, 0.041));
    let mut rhos = vec![0.0; 64];
    let mut grids = [full_box_grid(&mut rhos, 4)];

    let mut intr = Interpolator::cell_center(&manager, 2);
    intr.interpolate(&mut grids, 6.0, &[0], &[]);

    // Every tetrahedron has volume (0.4)³/6, so the per-cell density is
    // mass/6 · cell_volume/volume = 1.46484375 for all six of them.
    let expected = 0.015625 / (0.4f64.powi(3) / 6.0);
    let rhos = grids[0].rhos();
    let nonzero: Vec<f64> = rhos.iter().copied().filter(|&rho| rho != 0.0).collect();
    assert_eq!(nonzero.len(), 8);
    for rho in nonzero {
        assert!((rho - expected).abs() < 1e-4);
    }

    let total: f64 = rhos.iter().sum();
    assert!((total - 8.0 * expected).abs() < 1e-3);
}

#[test]
fn cell_center_wraps_through_periodic_boundary() {
    // The anchor cube straddles the box corner; its deposits land in the
    // wrapped cells at both ends of each axis.
    let manager = cube_particles(4, 0.25, Vec3::new(0.9, 0.87, 0.93));
    let mut rhos = vec![0.0; 512];
    let mut grids = [full_box_grid(&mut rhos, 8)];

    let mut intr = Interpolator::cell_center(&manager, 4);
    intr.interpolate(&mut grids, 6.0, &[0], &[]);

    let width = 8usize;
    let mut nonzero_cells = Vec::new();
    for (idx, &rho) in grids[0].rhos().iter().enumerate() {
        if rho != 0.0 {
            let coords = [
                idx % width,
                (idx % (width * width)) / width,
                idx / (width * width),
            ];
            nonzero_cells.push(coords);
            assert!((rho - 0.75).abs() < 1e-4);
        }
    }

    assert_eq!(nonzero_cells.len(), 8);
    for cell in nonzero_cells {
        for d in 0..3 {
            assert!(cell[d] == 0 || cell[d] == 7);
        }
    }
}

#[test]
fn missing_particle_skips_the_tetrahedron() {
    let mut manager = cube_particles(2, 0.4, Vec3::new(0.013, 0.027, 0.041));
    let mut partial = Vec::new();
    for id in 0..8 {
        if id == 3 {
            continue;
        }
        if let Some(particle) = manager.get(id) {
            partial.push(*particle);
        }
    }
    manager = ParticleManager::new();
    manager.add(&partial);

    let mut rhos = vec![0.0; 64];
    let mut grids = [full_box_grid(&mut rhos, 4)];

    // Particle 3 sits on two of the six tetrahedra; only those are skipped.
    let expected = 0.015625 / (0.4f64.powi(3) / 6.0);
    let mut intr = Interpolator::cell_center(&manager, 2);
    intr.interpolate(&mut grids, 6.0, &[0], &[]);
    let partial_total: f64 = grids[0].rhos().iter().sum();
    assert!(partial_total > 0.0);
    assert!(partial_total < 8.0 * expected - 1e-3);

    // With every particle of some tetra missing, nothing is deposited at all.
    let empty = ParticleManager::new();
    let mut rhos = vec![0.0; 64];
    let mut grids = [full_box_grid(&mut rhos, 4)];
    let mut intr = Interpolator::cell_center(&empty, 2);
    intr.interpolate(&mut grids, 6.0, &[0], &[]);
    assert!(grids[0].rhos().iter().all(|&rho| rho == 0.0));
}

#[test]
fn monte_carlo_conserves_mass_exactly() {
    let manager = cube_particles(2, 0.4, Vec3::new(0.013, 0.027, 0.041));
    let mut rhos = vec![0.0; 64];
    let mut grids = [full_box_grid(&mut rhos, 4)];

    let rng = ChaCha8Rng::seed_from_u64(42);
    let mut intr = Interpolator::monte_carlo(&manager, 2, rng, 64, PointSelector::Flat);
    intr.interpolate(&mut grids, 3.5, &[0], &[]);

    // Every sample lands inside the bounding grid, so the deposited mass is
    // the particle mass up to rounding.
    assert!((deposited_mass(&grids[0]) - 3.5).abs() < 1e-9);
}

#[test]
fn monte_carlo_is_reproducible_under_a_fixed_seed() {
    let manager = cube_particles(2, 0.4, Vec3::new(0.013, 0.027, 0.041));

    let run = |seed: u64| {
        let mut rhos = vec![0.0; 64];
        let mut grids = [full_box_grid(&mut rhos, 4)];
        let rng = ChaCha8Rng::seed_from_u64(seed);
        let mut intr = Interpolator::monte_carlo(&manager, 2, rng, 32, PointSelector::Flat);
        intr.interpolate(&mut grids, 1.0, &[0], &[]);
        drop(grids);
        rhos
    };

    assert_eq!(run(7), run(7));
    assert_ne!(run(7), run(8));
}

#[test]
fn prop_to_cells_rejects_small_tetrahedra() {
    // Legs of 0.1 box units fall below the quality cutoff.
    let manager = cube_particles(2, 0.1, Vec3::new(0.2, 0.2, 0.2));
    let mut rhos = vec![0.0; 64];
    let mut grids = [full_box_grid(&mut rhos, 4)];

    let rng = ChaCha8Rng::seed_from_u64(42);
    let mut intr = Interpolator::monte_carlo(&manager, 2, rng, 64, PointSelector::PropToCells);
    intr.interpolate(&mut grids, 1.0, &[0], &[]);

    assert!(grids[0].rhos().iter().all(|&rho| rho == 0.0));
}

#[test]
fn sobol_conserves_mass_and_is_deterministic() {
    let manager = cube_particles(2, 0.4, Vec3::new(0.013, 0.027, 0.041));

    let run = || {
        let mut rhos = vec![0.0; 64];
        let mut grids = [full_box_grid(&mut rhos, 4)];
        let mut intr = Interpolator::sobol(&manager, 2, 32);
        intr.interpolate(&mut grids, 2.25, &[0], &[]);
        let total = deposited_mass(&grids[0]);
        drop(grids);
        (rhos, total)
    };

    let (rhos_a, total_a) = run();
    let (rhos_b, _) = run();
    assert!((total_a - 2.25).abs() < 1e-9);
    assert_eq!(rhos_a, rhos_b);
}

#[test]
fn monte_carlo_converges_with_more_samples() {
    let manager = cube_particles(2, 0.4, Vec3::new(0.013, 0.027, 0.041));
    let mass = 6.0;

    let run_mc = |steps: usize| {
        let mut rhos = vec![0.0; 64];
        let mut grids = [full_box_grid(&mut rhos, 4)];
        let rng = ChaCha8Rng::seed_from_u64(7);
        let mut intr = Interpolator::monte_carlo(&manager, 2, rng, steps, PointSelector::Flat);
        intr.interpolate(&mut grids, mass, &[0], &[]);
        drop(grids);
        rhos
    };

    // A long Sobol run serves as the reference field.
    let reference = {
        let mut rhos = vec![0.0; 64];
        let mut grids = [full_box_grid(&mut rhos, 4)];
        let mut intr = Interpolator::sobol(&manager, 2, 4096);
        intr.interpolate(&mut grids, mass, &[0], &[]);
        drop(grids);
        rhos
    };

    let l1 = |rhos: &[f64]| -> f64 {
        rhos.iter()
            .zip(reference.iter())
            .map(|(a, b)| (a - b).abs())
            .sum()
    };

    let coarse = l1(&run_mc(32));
    let fine = l1(&run_mc(2048));
    assert!(fine < coarse);
}

#[test]
fn tetra_deposits_skip_non_intersecting_grids() {
    // The particle cube sits in the lower octant; a target window covering
    // only the opposite octant stays untouched.
    let manager = cube_particles(4, 0.25, Vec3::new(0.013, 0.027, 0.041));

    let mut rhos_far = vec![0.0; 64];
    let mut rhos_near = vec![0.0; 64];
    let mut grids = [
        DensityGrid::new(
            1.0,
            2,
            &mut rhos_far,
            Subgrid {
                width: 4,
                x: 1,
                y: 1,
                z: 1,
            },
        )
        .unwrap(),
        DensityGrid::new(
            1.0,
            2,
            &mut rhos_near,
            Subgrid {
                width: 4,
                x: 0,
                y: 0,
                z: 0,
            },
        )
        .unwrap(),
    ];

    let rng = ChaCha8Rng::seed_from_u64(3);
    let mut intr = Interpolator::monte_carlo(&manager, 4, rng, 32, PointSelector::Flat);
    intr.interpolate(&mut grids, 1.0, &[0], &[]);

    assert!(grids[0].rhos().iter().all(|&rho| rho == 0.0));
    assert!(grids[1].rhos().iter().sum::<f64>() > 0.0);
}

#[test]
fn lattice_ids_follow_row_major_order() {
    // The id arithmetic used by the deposition tests matches the lattice
    // conventions of the indexer.
    for id in [0i64, 1, 2, 3, 4, 5, 6, 7] {
        let [x, y, z] = coords(id, 2);
        assert_eq!(x + y * 2 + z * 4, id);
    }
}
