//! Particle records and the id-keyed particle manager

use crate::{MapType, Vec3};

/// A simulation particle: its Lagrangian lattice id and comoving position
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Particle {
    pub id: i64,
    pub position: Vec3,
}

/// Lookup table from particle id to particle record
///
/// Batches of particles are added as their catalogs are read; during
/// deposition the manager is only read. Lookups of ids that were never added
/// return `None`, which deposition treats as a recoverable condition.
#[derive(Clone, Default, Debug)]
pub struct ParticleManager {
    particles: MapType<i64, Particle>,
}

impl ParticleManager {
    /// Constructs an empty particle manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a batch of particles, replacing records with colliding ids
    pub fn add(&mut self, batch: &[Particle]) {
        self.particles.reserve(batch.len());
        for p in batch {
            self.particles.insert(p.id, *p);
        }
    }

    /// Returns the particle with the given id, or `None` if it was never added
    #[inline(always)]
    pub fn get(&self, id: i64) -> Option<&Particle> {
        self.particles.get(&id)
    }

    /// Returns the number of managed particles
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Returns whether the manager holds no particles
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut man = ParticleManager::new();
        assert!(man.is_empty());

        man.add(&[
            Particle {
                id: 3,
                position: Vec3::new(0.1, 0.2, 0.3),
            },
            Particle {
                id: 17,
                position: Vec3::new(0.4, 0.5, 0.6),
            },
        ]);

        assert_eq!(man.len(), 2);
        assert_eq!(man.get(3).unwrap().position, Vec3::new(0.1, 0.2, 0.3));
        assert_eq!(man.get(17).unwrap().id, 17);
        assert!(man.get(4).is_none());
    }

    #[test]
    fn test_add_replaces_colliding_ids() {
        let mut man = ParticleManager::new();
        man.add(&[Particle {
            id: 1,
            position: Vec3::zeros(),
        }]);
        man.add(&[Particle {
            id: 1,
            position: Vec3::new(1.0, 1.0, 1.0),
        }]);

        assert_eq!(man.len(), 1);
        assert_eq!(man.get(1).unwrap().position, Vec3::new(1.0, 1.0, 1.0));
    }
}
