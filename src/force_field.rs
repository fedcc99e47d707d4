//! Force-field registry: up to 8 active fields evaluated inside the
//! grid-update kernel against each cell's world position.

use crate::error::{Result, SolverError};
use crate::math::Falloff;
use cgmath::Vector3;
use serde::{Deserialize, Serialize};

pub const MAX_FORCE_FIELDS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Attractor,
    Repeller,
    Vortex,
    VortexTube,
    Directional,
    Turbulence,
}

/// One active force field. `axis` is used by `Vortex`,
/// `VortexTube`, and `Directional`; ignored (but still present, for a stable
/// POD layout) by the others.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub kind: FieldKind,
    pub position: Vector3<f32>,
    pub axis: Vector3<f32>,
    pub strength: f32,
    pub radius: f32,
    pub falloff: Falloff,
    /// Height of the `VortexTube`'s extent along `axis`; ignored otherwise.
    pub height: f32,
    /// Time-to-live in seconds; `None` means the field is permanent. Bounds
    /// fields spawned by transient (e.g. beat-driven) events so they don't
    /// accumulate unboundedly.
    pub ttl: Option<f32>,
    /// Seconds elapsed since this field was registered; driven by the
    /// driver's `step`, not user-set.
    pub(crate) age: f32,
}

impl FieldDescriptor {
    pub fn new(kind: FieldKind, position: Vector3<f32>, strength: f32, radius: f32) -> Self {
        FieldDescriptor {
            kind,
            position,
            axis: Vector3::new(0.0, 1.0, 0.0),
            strength,
            radius,
            falloff: Falloff::Linear,
            height: radius * 2.0,
            ttl: None,
            age: 0.0,
        }
    }

    pub fn with_axis(mut self, axis: Vector3<f32>) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_falloff(mut self, falloff: Falloff) -> Self {
        self.falloff = falloff;
        self
    }

    pub fn with_ttl(mut self, ttl: f32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    fn is_expired(&self) -> bool {
        matches!(self.ttl, Some(ttl) if self.age >= ttl)
    }
}

/// Host-side registry mirrored 1:1 into the `SimulationProperties` uniform
/// consumed by the grid-update kernel: a fixed-size block of up to
/// `MAX_FORCE_FIELDS` slots plus an `activeCount`.
#[derive(Clone, Debug, Default)]
pub struct ForceFieldRegistry {
    fields: Vec<FieldDescriptor>,
}

impl ForceFieldRegistry {
    pub fn set(&mut self, fields: &[FieldDescriptor]) -> Result<()> {
        if fields.len() > MAX_FORCE_FIELDS {
            return Err(SolverError::ConfigInvalid(format!(
                "at most {} force fields may be active, got {}",
                MAX_FORCE_FIELDS,
                fields.len()
            )));
        }
        self.fields = fields.to_vec();
        Ok(())
    }

    pub fn active(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Advances TTLs and drops expired fields. Called once per `step` by the
    /// driver, before the field set is uploaded to the GPU.
    pub(crate) fn advance(&mut self, dt: f32) {
        for field in &mut self.fields {
            field.age += dt;
        }
        self.fields.retain(|f| !f.is_expired());
    }
}

/// GPU-side layout for one force-field slot, matching `shaders/common.glsl`'s
/// `ForceField` struct. `kind` is the `FieldKind` discriminant as `u32`.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ForceFieldGpu {
    pub position: [f32; 3],
    pub kind: u32,
    pub axis: [f32; 3],
    pub strength: f32,
    pub radius: f32,
    pub falloff: u32,
    pub height: f32,
    pub _padding: f32,
}

impl From<FieldDescriptor> for ForceFieldGpu {
    fn from(f: FieldDescriptor) -> Self {
        ForceFieldGpu {
            position: f.position.into(),
            kind: match f.kind {
                FieldKind::Attractor => 0,
                FieldKind::Repeller => 1,
                FieldKind::Vortex => 2,
                FieldKind::VortexTube => 3,
                FieldKind::Directional => 4,
                FieldKind::Turbulence => 5,
            },
            axis: f.axis.into(),
            strength: f.strength,
            radius: f.radius,
            falloff: match f.falloff {
                Falloff::Constant => 0,
                Falloff::Linear => 1,
                Falloff::Quadratic => 2,
                Falloff::SmoothStep => 3,
            },
            height: f.height,
            _padding: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_more_than_eight_fields() {
        let mut registry = ForceFieldRegistry::default();
        let fields = vec![FieldDescriptor::new(FieldKind::Attractor, Vector3::new(0.0, 0.0, 0.0), 1.0, 1.0); MAX_FORCE_FIELDS + 1];
        assert!(registry.set(&fields).is_err());
    }

    #[test]
    fn accepts_exactly_eight_fields() {
        let mut registry = ForceFieldRegistry::default();
        let fields = vec![FieldDescriptor::new(FieldKind::Repeller, Vector3::new(0.0, 0.0, 0.0), 1.0, 1.0); MAX_FORCE_FIELDS];
        assert!(registry.set(&fields).is_ok());
        assert_eq!(registry.active().len(), MAX_FORCE_FIELDS);
    }

    #[test]
    fn expired_fields_are_dropped_after_advance() {
        let mut registry = ForceFieldRegistry::default();
        registry
            .set(&[FieldDescriptor::new(FieldKind::Vortex, Vector3::new(0.0, 0.0, 0.0), 1.0, 1.0).with_ttl(1.0)])
            .unwrap();
        registry.advance(0.5);
        assert_eq!(registry.active().len(), 1);
        registry.advance(0.6);
        assert_eq!(registry.active().len(), 0);
    }

    #[test]
    fn fields_without_ttl_never_expire() {
        let mut registry = ForceFieldRegistry::default();
        registry
            .set(&[FieldDescriptor::new(FieldKind::Directional, Vector3::new(0.0, 0.0, 0.0), 1.0, 1.0)])
            .unwrap();
        for _ in 0..1000 {
            registry.advance(1.0);
        }
        assert_eq!(registry.active().len(), 1);
    }
}
