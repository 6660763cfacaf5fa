//! Gear change events recorded by the integrator.

use pt_components::ShiftDirection;
use serde::{Deserialize, Serialize};

/// A completed gear change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftEvent {
    /// Simulated time at which the new gear took effect (s)
    pub time_s: f64,
    pub from_gear: usize,
    pub to_gear: usize,
    pub direction: ShiftDirection,
    /// Engine speed after reconciliation (rpm)
    pub rpm: f64,
    /// Road speed (mph)
    pub mph: f64,
}

impl ShiftEvent {
    pub fn is_upshift(&self) -> bool {
        self.direction == ShiftDirection::Up
    }
}
