//! Persisted-state layout: binary
//! (de)serialization of everything needed to resume a simulation, via
//! `serde` + `bincode` the way the wider retrieval corpus does snapshotting.

use crate::boundary::BoundaryDescriptor;
use crate::config::SimConfig;
use crate::error::{Result, SolverError};
use crate::force_field::FieldDescriptor;
use serde::{Deserialize, Serialize};

/// Host-readable mirror of the particle store, used both for snapshotting
/// and (crate-internally) for test readback.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ParticleSnapshot {
    pub positions: Vec<[f32; 3]>,
    pub velocities: Vec<[f32; 3]>,
    pub affine_c: Vec<[[f32; 3]; 3]>,
    pub deformation_f: Vec<[[f32; 3]; 3]>,
    pub density: Vec<f32>,
    pub material_id: Vec<u32>,
    pub age: Vec<f32>,
    pub lifetime: Vec<f32>,
}

impl ParticleSnapshot {
    pub fn particle_count(&self) -> usize {
        self.positions.len()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub config: SimConfig,
    pub boundary: BoundaryDescriptor,
    pub force_fields: Vec<FieldDescriptor>,
    pub particles: ParticleSnapshot,
}

impl Snapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| SolverError::Snapshot(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| SolverError::Snapshot(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::MaterialId;

    #[test]
    fn snapshot_roundtrips_through_bytes() {
        let snapshot = Snapshot {
            config: SimConfig::default(),
            boundary: BoundaryDescriptor::default(),
            force_fields: Vec::new(),
            particles: ParticleSnapshot {
                positions: vec![[1.0, 2.0, 3.0]],
                velocities: vec![[0.0, 0.0, 0.0]],
                affine_c: vec![[[0.0; 3]; 3]],
                deformation_f: vec![[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]],
                density: vec![1.0],
                material_id: vec![MaterialId::Fluid.as_index()],
                age: vec![0.0],
                lifetime: vec![0.0],
            },
        };

        let bytes = snapshot.to_bytes().unwrap();
        let restored = Snapshot::from_bytes(&bytes).unwrap();
        assert_eq!(restored.config, snapshot.config);
        assert_eq!(restored.particles.particle_count(), 1);
        assert_eq!(restored.particles.positions[0], [1.0, 2.0, 3.0]);
    }

    #[test]
    fn corrupt_bytes_report_snapshot_error() {
        let err = Snapshot::from_bytes(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, SolverError::Snapshot(_)));
    }
}
