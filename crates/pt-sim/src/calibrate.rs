//! Wall-clock time-step calibration.
//!
//! Picks the time step at which simulated time keeps pace with real time on
//! this machine: run a scratch car for a number of steps and take the mean
//! wall-clock cost of one step.

use crate::car::{Car, CarConfig};
use crate::error::{SimError, SimResult};
use std::time::Instant;
use tracing::{info, warn};

/// Smallest time step calibration will return (s).
pub const MIN_TIME_STEP: f64 = 1e-6;

/// Largest time step calibration will return (s); coarser steps let the
/// combustion pulses alias.
pub const MAX_TIME_STEP: f64 = 1e-3;

/// Provisional step used while measuring.
const PROBE_TIME_STEP: f64 = 1.5e-4;

/// Measure the mean wall-clock cost of one car step.
///
/// # Arguments
/// * `config` - Car to measure; a scratch instance is built and discarded
/// * `samples` - Number of steps to time
///
/// # Errors
/// Returns `InvalidArg` if `samples` is zero, or the configuration error if
/// the car cannot be built.
pub fn calibrate_time_step(config: &CarConfig, samples: usize) -> SimResult<f64> {
    if samples == 0 {
        return Err(SimError::InvalidArg {
            what: "calibration needs at least one sample",
        });
    }

    let mut car = Car::new(config, PROBE_TIME_STEP)?;
    let start = Instant::now();
    for _ in 0..samples {
        car.step(1.0);
    }
    let per_step = start.elapsed().as_secs_f64() / samples as f64;

    let dt = per_step.clamp(MIN_TIME_STEP, MAX_TIME_STEP);
    if dt != per_step {
        warn!(measured = per_step, dt, "calibrated time step clamped");
    }
    info!(samples, dt, "time step calibrated");
    Ok(dt)
}
