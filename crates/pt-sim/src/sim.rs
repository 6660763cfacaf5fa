//! Simulation runner and result recording.

use crate::car::{Car, StepOutput};
use crate::error::{SimError, SimResult};
use crate::events::ShiftEvent;
use pt_core::numeric::{Tolerances, nearly_equal};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Options for simulation runs.
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Fixed time step (seconds), must match the car's
    pub dt: f64,
    /// Final simulation time (seconds)
    pub t_end: f64,
    /// Maximum number of steps (safety limit)
    pub max_steps: usize,
    /// Record every N-th step (decimation)
    pub record_every: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            dt: 1.5e-4,
            t_end: 20.0,
            max_steps: 10_000_000,
            record_every: 100,
        }
    }
}

/// One breakpoint of a piecewise-constant throttle schedule.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThrottlePoint {
    /// Time from which this throttle applies (s)
    pub t_s: f64,
    pub throttle: f64,
}

/// Driver input over time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ThrottleProfile {
    Constant { throttle: f64 },
    /// Holds each point's throttle from its time until the next point.
    /// Before the first point the throttle is closed.
    Steps { points: Vec<ThrottlePoint> },
}

impl Default for ThrottleProfile {
    fn default() -> Self {
        ThrottleProfile::Constant { throttle: 1.0 }
    }
}

impl ThrottleProfile {
    /// Throttle at time `t`.
    pub fn at(&self, t: f64) -> f64 {
        match self {
            ThrottleProfile::Constant { throttle } => *throttle,
            ThrottleProfile::Steps { points } => points
                .iter()
                .take_while(|p| p.t_s <= t)
                .last()
                .map_or(0.0, |p| p.throttle),
        }
    }
}

/// Record of simulation results.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimRecord {
    /// Time points (seconds)
    pub t: Vec<f64>,
    /// Step outputs at each time point
    pub x: Vec<StepOutput>,
    /// Every gear change during the run
    pub shifts: Vec<ShiftEvent>,
}

/// Run a car forward under a throttle profile.
///
/// The initial state is always recorded, then every `record_every`-th step,
/// then the final state if it was not already recorded.
///
/// # Errors
/// Returns `InvalidArg` for a non-positive time step, a time step that
/// differs from the car's, a negative end time, or zero step/decimation
/// limits.
pub fn run_sim(
    car: &mut Car,
    throttle: &ThrottleProfile,
    opts: &SimOptions,
) -> SimResult<SimRecord> {
    if opts.dt <= 0.0 {
        return Err(SimError::InvalidArg {
            what: "dt must be positive",
        });
    }
    if !nearly_equal(opts.dt, car.dt(), Tolerances::default()) {
        return Err(SimError::InvalidArg {
            what: "dt must match the car time step",
        });
    }
    if opts.t_end < 0.0 {
        return Err(SimError::InvalidArg {
            what: "t_end must be non-negative",
        });
    }
    if opts.max_steps == 0 {
        return Err(SimError::InvalidArg {
            what: "max_steps must be positive",
        });
    }
    if opts.record_every == 0 {
        return Err(SimError::InvalidArg {
            what: "record_every must be positive",
        });
    }

    let shifts_before = car.shift_log().len();
    let t_start = car.time();
    let n_steps = ((opts.t_end / opts.dt).round() as usize).min(opts.max_steps);
    info!(t_end = opts.t_end, dt = opts.dt, n_steps, "starting run");

    let first = car.snapshot();
    let mut t_record = vec![first.time_s];
    let mut x_record = vec![first];

    let mut step = 0;
    while step < n_steps {
        let t = car.time() - t_start;
        let out = car.step(throttle.at(t));
        step += 1;

        if step % opts.record_every == 0 {
            t_record.push(out.time_s);
            x_record.push(out);
        } else if step == n_steps {
            // Always record final state
            t_record.push(out.time_s);
            x_record.push(out);
        }
    }

    let shifts = car.shift_log()[shifts_before..].to_vec();
    info!(
        steps = step,
        gear = car.gear(),
        rpm = car.rpm(),
        mph = car.road_speed_mph(),
        shifts = shifts.len(),
        "run finished"
    );

    Ok(SimRecord {
        t: t_record,
        x: x_record,
        shifts,
    })
}
