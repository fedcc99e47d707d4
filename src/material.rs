//! Material tags and the per-material constitutive parameters used by the
//! stress-scatter pass. The actual stress tensor computation
//! lives in `src/math.rs`/`shaders/material.glsl`; this module is the
//! authoritative list of material ids and the knobs each one exposes.

use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, EnumString};

/// `materialId`. Order matters: it is the numeric id written
/// into the particle buffer and must match `shaders/common.glsl`'s
/// `MATERIAL_*` constants.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumString)]
pub enum MaterialId {
    Fluid = 0,
    Elastic = 1,
    Sand = 2,
    Snow = 3,
    Foam = 4,
    Viscous = 5,
    Rigid = 6,
    Plasma = 7,
}

impl Default for MaterialId {
    fn default() -> Self {
        MaterialId::Fluid
    }
}

impl MaterialId {
    pub const COUNT: usize = 8;

    pub fn as_index(self) -> u32 {
        self as u32
    }
}

/// Per-material constitutive constants, derived once from `SimConfig` and
/// uploaded as part of the simulation-properties uniform. Fields unused by
/// a given material's branch are
/// simply ignored by that branch in `shaders/material.glsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialParams {
    pub stiffness: f32,
    pub dynamic_viscosity: f32,
    pub rest_density: f32,
    pub youngs_modulus: f32,
    pub poisson_ratio: f32,
    pub plasticity_lower: f32, // snow/sand plastic clamp, lower singular value bound
    pub plasticity_upper: f32,
    pub friction_angle: f32, // Drucker-Prager
}

impl MaterialParams {
    /// Derives the per-material-slot constant block from user-tunable
    /// `SimConfig` fields: Foam/Viscous/Rigid/Plasma as adjusted-fluid
    /// variants, Elastic/Sand/Snow as stiffer or plasticity-bounded variants.
    pub fn table_from_config(stiffness: f32, dynamic_viscosity: f32, rest_density: f32) -> [MaterialParams; MaterialId::COUNT] {
        let base = MaterialParams {
            stiffness,
            dynamic_viscosity,
            rest_density,
            youngs_modulus: 1.4e4,
            poisson_ratio: 0.2,
            plasticity_lower: 1.0 - 2.5e-2,
            plasticity_upper: 1.0 + 4.5e-3,
            friction_angle: 30.0,
        };
        let mut table = [base; MaterialId::COUNT];
        table[MaterialId::Fluid as usize] = base;
        table[MaterialId::Elastic as usize] = MaterialParams {
            youngs_modulus: 5.0e4,
            poisson_ratio: 0.3,
            ..base
        };
        table[MaterialId::Sand as usize] = MaterialParams {
            stiffness: stiffness * 1.5,
            dynamic_viscosity: 0.0,
            friction_angle: 35.0,
            plasticity_lower: 1.0 - 0.1,
            plasticity_upper: 1.0 + 0.02,
            ..base
        };
        table[MaterialId::Snow as usize] = MaterialParams {
            youngs_modulus: 1.4e4,
            poisson_ratio: 0.2,
            plasticity_lower: 1.0 - 2.5e-2,
            plasticity_upper: 1.0 + 4.5e-3,
            dynamic_viscosity: 0.0,
            ..base
        };
        table[MaterialId::Foam as usize] = MaterialParams {
            stiffness: stiffness * 0.5,
            dynamic_viscosity: dynamic_viscosity * 0.25,
            ..base
        };
        table[MaterialId::Viscous as usize] = MaterialParams {
            stiffness,
            dynamic_viscosity: dynamic_viscosity * 8.0,
            ..base
        };
        table[MaterialId::Rigid as usize] = MaterialParams {
            stiffness: stiffness * 4.0,
            dynamic_viscosity: 0.0,
            ..base
        };
        table[MaterialId::Plasma as usize] = MaterialParams {
            stiffness: stiffness * 0.2,
            dynamic_viscosity: dynamic_viscosity * 0.1,
            ..base
        };
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn material_ids_iterate_in_declared_order() {
        let ids: Vec<_> = MaterialId::iter().map(|m| m.as_index()).collect();
        assert_eq!(ids, (0..MaterialId::COUNT as u32).collect::<Vec<_>>());
    }

    #[test]
    fn material_table_has_entry_per_id() {
        let table = MaterialParams::table_from_config(10.0, 0.1, 1.0);
        assert_eq!(table.len(), MaterialId::COUNT);
        // Rigid should be stiffer than base fluid.
        assert!(table[MaterialId::Rigid as usize].stiffness > table[MaterialId::Fluid as usize].stiffness);
    }
}
