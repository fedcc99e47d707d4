//! Read-only metrics view: counters for recoverable events plus the
//! scheduler's last-frame decisions, exposed via `Simulator::metrics()`.

/// Snapshot of solver health counters. Cheap to clone; read between steps,
/// never mutated concurrently with a running step (same host-immutability
/// rule as force fields and boundary descriptors).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Metrics {
    /// Count of `NumericalDegeneracy` events (det(F) <= 0 or NaN) since the
    /// last `reset`.
    pub numerical_degeneracy_events: u64,
    /// Count of frames where the adaptive scheduler hit its sub-step cap
    /// without reaching `dt_safe` (`StepOverrun`).
    pub step_overrun_events: u64,
    /// Number of sub-steps the driver ran on the most recent `step` call.
    pub substeps_last_frame: u32,
    /// The `dt` actually used for the most recent sub-step.
    pub dt_used_last_frame: f32,
    /// The max particle speed sampled by the scheduler on the most recent
    /// `step` call.
    pub v_max_last_frame: f32,
}

impl Metrics {
    pub(crate) fn record_degeneracy(&mut self) {
        self.numerical_degeneracy_events += 1;
    }

    pub(crate) fn record_overrun(&mut self) {
        self.step_overrun_events += 1;
    }
}
