//! Drivetrain simulation for the powertrain components.
//!
//! Provides:
//! - The `Car` integrator: one fixed-step update across engine, converter,
//!   transmission and wheels, with shift reconciliation
//! - Shift event log
//! - Fixed-step run driver with throttle profiles and decimated recording
//! - Wall-clock time-step calibration

pub mod calibrate;
pub mod car;
pub mod error;
pub mod events;
pub mod sim;

// Re-exports for public API
pub use calibrate::{MAX_TIME_STEP, MIN_TIME_STEP, calibrate_time_step};
pub use car::{Car, CarConfig, CylinderTelemetry, StepOutput};
pub use error::{SimError, SimResult};
pub use events::ShiftEvent;
pub use sim::{SimOptions, SimRecord, ThrottlePoint, ThrottleProfile, run_sim};
