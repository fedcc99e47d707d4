//! Adaptive sub-step scheduler. A thin host-side wrapper
//! around `math::cfl_dt`/`math::substep_count` plus the periodic `v_max`
//! sampling policy: re-deriving the CFL bound from a fresh GPU readback every
//! step would serialize the pipeline, so the scheduler reuses the previous
//! step's measured `v_max` and only resamples at a fixed cadence.

use crate::math::{cfl_dt, substep_count, CflParams};

/// How many steps elapse between `v_max` resamples when `adaptive_timestep`
/// is enabled. A fresh measurement is always taken on the very first step.
const RESAMPLE_INTERVAL: u32 = 8;

pub struct Scheduler {
    cfl_params: CflParams,
    max_substeps: u32,
    adaptive: bool,
    v_max_estimate: f32,
    steps_since_resample: u32,
}

pub struct SubstepPlan {
    pub dt_per_substep: f32,
    pub substep_count: u32,
    /// `true` when the plan hit `max_substeps` without reaching `dt_safe`
    /// (`StepOverrun`).
    pub overran: bool,
}

impl Scheduler {
    pub fn new(cfl_target: f32, max_substeps: u32, adaptive: bool) -> Self {
        Scheduler {
            cfl_params: CflParams {
                cfl_target,
                ..CflParams::default()
            },
            max_substeps,
            adaptive,
            v_max_estimate: 0.0,
            steps_since_resample: RESAMPLE_INTERVAL,
        }
    }

    pub fn set_cfl_target(&mut self, cfl_target: f32) {
        self.cfl_params.cfl_target = cfl_target;
    }

    pub fn set_max_substeps(&mut self, max_substeps: u32) {
        self.max_substeps = max_substeps;
    }

    pub fn set_adaptive(&mut self, adaptive: bool) {
        self.adaptive = adaptive;
    }

    /// Records a freshly measured `v_max` (from a GPU readback or reduction
    /// kernel) and resets the resample countdown.
    pub fn record_v_max(&mut self, v_max: f32) {
        self.v_max_estimate = v_max;
        self.steps_since_resample = 0;
    }

    /// Whether the driver should schedule a `v_max` reduction this step.
    pub fn needs_v_max_resample(&self) -> bool {
        self.adaptive && self.steps_since_resample >= RESAMPLE_INTERVAL
    }

    /// Plans how `dt_hint` (the host-requested frame advance, `speed * real_dt`)
    /// should be split into equal sub-steps honoring the CFL bound.
    pub fn plan(&mut self, dt_hint: f32) -> SubstepPlan {
        self.steps_since_resample = self.steps_since_resample.saturating_add(1);
        if !self.adaptive {
            return SubstepPlan {
                dt_per_substep: dt_hint,
                substep_count: 1,
                overran: false,
            };
        }
        let dt_safe = cfl_dt(self.v_max_estimate, &self.cfl_params);
        let n = substep_count(dt_hint, dt_safe, self.max_substeps);
        let overran = n == self.max_substeps && dt_hint / n as f32 > dt_safe;
        SubstepPlan {
            dt_per_substep: dt_hint / n as f32,
            substep_count: n,
            overran,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_adaptive_scheduler_always_takes_one_substep() {
        let mut s = Scheduler::new(0.7, 4, false);
        s.record_v_max(1000.0);
        let plan = s.plan(1.0 / 60.0);
        assert_eq!(plan.substep_count, 1);
        assert_eq!(plan.dt_per_substep, 1.0 / 60.0);
    }

    #[test]
    fn adaptive_scheduler_increases_substeps_with_speed() {
        let mut s = Scheduler::new(0.7, 8, true);
        s.record_v_max(200.0);
        let plan = s.plan(1.0 / 60.0);
        assert!(plan.substep_count > 1);
        assert!(plan.substep_count <= 8);
    }

    #[test]
    fn resample_cadence_triggers_after_interval() {
        let mut s = Scheduler::new(0.7, 4, true);
        s.record_v_max(1.0);
        assert!(!s.needs_v_max_resample());
        for _ in 0..RESAMPLE_INTERVAL {
            s.plan(1.0 / 60.0);
        }
        assert!(s.needs_v_max_resample());
    }

    #[test]
    fn plan_respects_max_substeps_cap() {
        let mut s = Scheduler::new(0.7, 2, true);
        s.record_v_max(10_000.0);
        let plan = s.plan(1.0);
        assert_eq!(plan.substep_count, 2);
    }
}
