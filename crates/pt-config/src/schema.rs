//! Car file schema.

use pt_sim::{CarConfig, SimOptions, ThrottleProfile};
use serde::{Deserialize, Serialize};

pub const CURRENT_VERSION: u32 = 1;

/// A complete simulation input: the car and how to drive it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarFile {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub car: CarConfig,
    #[serde(default)]
    pub run: RunDef,
}

impl Default for CarFile {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            name: "Default car".to_string(),
            car: CarConfig::default(),
            run: RunDef::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunDef {
    /// Fixed integrator step (s)
    pub dt_s: f64,
    pub duration_s: f64,
    /// Keep every N-th step in the output
    pub record_every: usize,
    pub throttle: ThrottleProfile,
}

impl Default for RunDef {
    fn default() -> Self {
        let opts = SimOptions::default();
        Self {
            dt_s: opts.dt,
            duration_s: opts.t_end,
            record_every: opts.record_every,
            throttle: ThrottleProfile::default(),
        }
    }
}

impl RunDef {
    pub fn sim_options(&self) -> SimOptions {
        SimOptions {
            dt: self.dt_s,
            t_end: self.duration_s,
            record_every: self.record_every,
            ..SimOptions::default()
        }
    }
}
