//! Configuration surface and its validation (`ConfigInvalid`).
//!
//! Generalizes a single fluid-properties uniform buffer into the full
//! config table this solver needs, split into a user-facing `SimConfig`
//! plus a small `ConfigPatch` for partial, atomic-between-steps updates:
//! patches apply between steps and never mid-step.

use crate::error::{Result, SolverError};
use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, EnumString};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumIter, EnumString)]
pub enum GravityMode {
    DownZ,
    BackZ,
    CenterRadial,
    DeviceSensor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumIter, EnumString)]
pub enum TransferMode {
    Pic,
    Flip,
    Hybrid,
}

/// Opaque pass-through for renderers: an embedder-defined color mode tag
/// the solver never interprets.
pub type ColorModeTag = u32;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub particle_count: u32,
    pub grid_size: u32,
    pub gravity_mode: GravityMode,
    pub gravity_strength: f32,
    pub speed: f32,
    pub stiffness: f32,
    pub dynamic_viscosity: f32,
    pub rest_density: f32,
    pub turbulence: f32,
    pub transfer_mode: TransferMode,
    pub flip_ratio: f32,
    pub adaptive_timestep: bool,
    pub cfl_target: f32,
    pub vorticity_enabled: bool,
    pub vorticity_epsilon: f32,
    pub surface_tension_enabled: bool,
    pub surface_tension_coeff: f32,
    pub material_type: crate::material::MaterialId,
    pub color_mode: ColorModeTag,
    pub max_substeps: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            particle_count: 20_000,
            grid_size: 64,
            gravity_mode: GravityMode::DownZ,
            gravity_strength: 9.8,
            speed: 1.0,
            stiffness: 10.0,
            dynamic_viscosity: 0.1,
            rest_density: 1.0,
            turbulence: 0.0,
            transfer_mode: TransferMode::Hybrid,
            flip_ratio: 0.95,
            adaptive_timestep: true,
            cfl_target: 0.7,
            vorticity_enabled: false,
            vorticity_epsilon: 0.2,
            surface_tension_enabled: false,
            surface_tension_coeff: 0.0,
            material_type: crate::material::MaterialId::Fluid,
            color_mode: 0,
            max_substeps: 4,
        }
    }
}

impl SimConfig {
    /// Validates every field that can make `ConfigInvalid`.
    /// Called at construction and at every `set_config`; no step is attempted
    /// on a config that fails this.
    pub fn validate(&self) -> Result<()> {
        if self.particle_count == 0 {
            return Err(SolverError::ConfigInvalid("particleCount must be non-zero".into()));
        }
        if !self.grid_size.is_power_of_two() || !(8..=256).contains(&self.grid_size) {
            return Err(SolverError::ConfigInvalid(format!(
                "gridSize must be a power of two in [8, 256], got {}",
                self.grid_size
            )));
        }
        if !(0.0..=1.0).contains(&self.flip_ratio) {
            return Err(SolverError::ConfigInvalid(format!(
                "flipRatio must be in [0, 1], got {}",
                self.flip_ratio
            )));
        }
        if !(0.3..=1.0).contains(&self.cfl_target) {
            return Err(SolverError::ConfigInvalid(format!(
                "cflTarget must be in [0.3, 1.0], got {}",
                self.cfl_target
            )));
        }
        if self.max_substeps == 0 {
            return Err(SolverError::ConfigInvalid("maxSubsteps must be non-zero".into()));
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(SolverError::ConfigInvalid(format!("speed must be finite and positive, got {}", self.speed)));
        }
        if !self.stiffness.is_finite() || self.stiffness < 0.0 {
            return Err(SolverError::ConfigInvalid("stiffness must be finite and non-negative".into()));
        }
        if !self.dynamic_viscosity.is_finite() || self.dynamic_viscosity < 0.0 {
            return Err(SolverError::ConfigInvalid("dynamicViscosity must be finite and non-negative".into()));
        }
        Ok(())
    }
}

/// Partial update to `SimConfig`, applied atomically between steps
/// (`Simulator::set_config`). Every field mirrors `SimConfig`; absent fields
/// keep their current value.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigPatch {
    pub particle_count: Option<u32>,
    pub grid_size: Option<u32>,
    pub gravity_mode: Option<GravityMode>,
    pub gravity_strength: Option<f32>,
    pub speed: Option<f32>,
    pub stiffness: Option<f32>,
    pub dynamic_viscosity: Option<f32>,
    pub rest_density: Option<f32>,
    pub turbulence: Option<f32>,
    pub transfer_mode: Option<TransferMode>,
    pub flip_ratio: Option<f32>,
    pub adaptive_timestep: Option<bool>,
    pub cfl_target: Option<f32>,
    pub vorticity_enabled: Option<bool>,
    pub vorticity_epsilon: Option<f32>,
    pub surface_tension_enabled: Option<bool>,
    pub surface_tension_coeff: Option<f32>,
    pub material_type: Option<crate::material::MaterialId>,
    pub color_mode: Option<ColorModeTag>,
    pub max_substeps: Option<u32>,
}

impl ConfigPatch {
    /// Applies this patch onto `base`, returning a new validated config.
    /// `base` is left untouched if validation fails, so a rejected patch
    /// never leaves the simulator in a half-applied state.
    pub fn apply(&self, base: &SimConfig) -> Result<SimConfig> {
        let mut next = base.clone();
        macro_rules! patch {
            ($field:ident) => {
                if let Some(v) = self.$field.clone() {
                    next.$field = v;
                }
            };
        }
        patch!(particle_count);
        patch!(grid_size);
        patch!(gravity_mode);
        patch!(gravity_strength);
        patch!(speed);
        patch!(stiffness);
        patch!(dynamic_viscosity);
        patch!(rest_density);
        patch!(turbulence);
        patch!(transfer_mode);
        patch!(flip_ratio);
        patch!(adaptive_timestep);
        patch!(cfl_target);
        patch!(vorticity_enabled);
        patch!(vorticity_epsilon);
        patch!(surface_tension_enabled);
        patch!(surface_tension_coeff);
        patch!(material_type);
        patch!(color_mode);
        patch!(max_substeps);
        next.validate()?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_particle_count_is_rejected() {
        let cfg = SimConfig {
            particle_count: 0,
            ..SimConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(SolverError::ConfigInvalid(_))));
    }

    #[test]
    fn non_power_of_two_grid_size_is_rejected() {
        let cfg = SimConfig {
            grid_size: 63,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn flip_ratio_out_of_range_is_rejected() {
        let cfg = SimConfig {
            flip_ratio: 1.5,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = SimConfig {
            flip_ratio: -0.1,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn patch_leaves_base_untouched_on_failure() {
        let base = SimConfig::default();
        let patch = ConfigPatch {
            flip_ratio: Some(2.0),
            ..ConfigPatch::default()
        };
        assert!(patch.apply(&base).is_err());
        assert_eq!(base, SimConfig::default());
    }

    #[test]
    fn patch_only_touches_specified_fields() {
        let base = SimConfig::default();
        let patch = ConfigPatch {
            stiffness: Some(42.0),
            ..ConfigPatch::default()
        };
        let next = patch.apply(&base).unwrap();
        assert_eq!(next.stiffness, 42.0);
        assert_eq!(next.grid_size, base.grid_size);
    }
}
