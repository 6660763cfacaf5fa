//! Hydrodynamic torque converter between the engine and the transmission.

use crate::common::or_default;
use crate::traits::RotatingBody;
use serde::{Deserialize, Serialize};

/// Flat torque converter configuration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TorqueConverterConfig {
    /// Multiplication gain K at full coupling, at least 1
    pub k_factor: f64,
    /// Slip decay constant C (s/rad)
    pub c_factor: f64,
    /// Viscosity sensitivity a of the multiplication
    pub a_factor: f64,
    /// Fluid viscosity term
    pub viscosity: f64,
    /// Vehicle speed at and above which the converter locks up (m/s)
    pub lockup_speed_mps: f64,
    /// Driveshaft inertia upstream of the transmission (kg·m²)
    pub base_driveshaft_moment: f64,
}

impl Default for TorqueConverterConfig {
    fn default() -> Self {
        Self {
            k_factor: 2.0,
            c_factor: 0.03,
            a_factor: 0.005,
            viscosity: 0.05,
            lockup_speed_mps: 30.0,
            base_driveshaft_moment: 0.3,
        }
    }
}

impl TorqueConverterConfig {
    /// Copy with every invalid field replaced by its default.
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        Self {
            k_factor: or_default(self.k_factor, self.k_factor >= 1.0, d.k_factor, "k_factor"),
            c_factor: or_default(self.c_factor, self.c_factor > 0.0, d.c_factor, "c_factor"),
            a_factor: or_default(self.a_factor, self.a_factor >= 0.0, d.a_factor, "a_factor"),
            viscosity: or_default(self.viscosity, self.viscosity >= 0.0, d.viscosity, "viscosity"),
            lockup_speed_mps: or_default(
                self.lockup_speed_mps,
                self.lockup_speed_mps > 0.0,
                d.lockup_speed_mps,
                "lockup_speed_mps",
            ),
            base_driveshaft_moment: or_default(
                self.base_driveshaft_moment,
                self.base_driveshaft_moment > 0.0,
                d.base_driveshaft_moment,
                "base_driveshaft_moment",
            ),
        }
    }
}

/// Slip-coupled torque converter.
///
/// ```text
/// slip = max(0, ω_imp - ω_turb)
/// f    = 1 - exp(-C·slip)
/// mf   = K·f·(1 + a·ν)           (1 when locked up and slipping)
/// τ_out = mf·max(0, τ_in) - τ_load
/// ω_turb += τ_out / I_driveshaft · Δt
/// ```
///
/// The fluid transmits driving torque only. While the transmission is
/// mid-shift the converter is disengaged and the turbine sees only the load.
/// The reaction `f·τ_in` is what the impeller hands back to the crankshaft.
#[derive(Clone, Debug)]
pub struct TorqueConverter {
    k_factor: f64,
    c_factor: f64,
    a_factor: f64,
    viscosity: f64,
    lockup_speed_mps: f64,
    base_driveshaft_moment: f64,
    driveshaft_moment: f64,
    impeller_omega: f64,
    turbine_omega: f64,
    input_torque: f64,
    output_torque: f64,
    reaction_torque: f64,
    coupling: f64,
    multiplication: f64,
    locked: bool,
}

impl TorqueConverter {
    pub fn new(config: &TorqueConverterConfig) -> Self {
        let config = config.sanitized();
        Self {
            k_factor: config.k_factor,
            c_factor: config.c_factor,
            a_factor: config.a_factor,
            viscosity: config.viscosity,
            lockup_speed_mps: config.lockup_speed_mps,
            base_driveshaft_moment: config.base_driveshaft_moment,
            driveshaft_moment: config.base_driveshaft_moment,
            impeller_omega: 0.0,
            turbine_omega: 0.0,
            input_torque: 0.0,
            output_torque: 0.0,
            reaction_torque: 0.0,
            coupling: 0.0,
            multiplication: 0.0,
            locked: false,
        }
    }

    /// Copy the engine side into the impeller.
    pub fn set_impeller(&mut self, omega: f64, torque: f64) {
        self.impeller_omega = omega;
        self.input_torque = torque;
    }

    /// Advance the turbine by one time step.
    ///
    /// # Arguments
    /// * `load` - Downstream torque reflected to the turbine (N·m)
    /// * `shifting` - True while the transmission is between gears
    /// * `vehicle_speed` - Road speed used for the lockup decision (m/s)
    /// * `dt` - Time step (s)
    pub fn step(&mut self, load: f64, shifting: bool, vehicle_speed: f64, dt: f64) {
        let slip = (self.impeller_omega - self.turbine_omega).max(0.0);
        self.coupling = 1.0 - (-self.c_factor * slip).exp();
        self.locked = vehicle_speed >= self.lockup_speed_mps && slip > 0.0;
        self.multiplication = if self.locked {
            1.0
        } else {
            self.k_factor * self.coupling * (1.0 + self.a_factor * self.viscosity)
        };

        let drive = self.input_torque.max(0.0);
        if shifting {
            self.output_torque = -load;
            self.reaction_torque = 0.0;
        } else {
            self.output_torque = self.multiplication * drive - load;
            self.reaction_torque = self.coupling * drive;
        }

        self.turbine_omega += self.output_torque / self.driveshaft_moment * dt;
    }

    /// Theoretical multiplication ceiling `K·(1 + a·ν)`.
    pub fn multiplication_limit(&self) -> f64 {
        self.k_factor * (1.0 + self.a_factor * self.viscosity)
    }

    /// Impeller and fluid inertia carried by the crankshaft (kg·m²).
    pub fn impeller_moment(&self) -> f64 {
        0.2 + self.k_factor * self.viscosity * 4.0 * 0.05 * 0.05
    }

    pub fn base_driveshaft_moment(&self) -> f64 {
        self.base_driveshaft_moment
    }

    pub fn driveshaft_moment(&self) -> f64 {
        self.driveshaft_moment
    }

    /// Set the lumped inertia downstream of the turbine.
    pub fn set_driveshaft_moment(&mut self, moment: f64) {
        if moment.is_finite() && moment > 0.0 {
            self.driveshaft_moment = moment;
        }
    }

    pub fn impeller_omega(&self) -> f64 {
        self.impeller_omega
    }

    pub fn turbine_omega(&self) -> f64 {
        self.turbine_omega
    }

    pub fn set_turbine_omega(&mut self, omega: f64) {
        self.turbine_omega = omega;
    }

    pub fn input_torque(&self) -> f64 {
        self.input_torque
    }

    pub fn output_torque(&self) -> f64 {
        self.output_torque
    }

    /// Torque transmitted through the fluid before the load, `mf·max(0, τ_in)`.
    pub fn driven_torque(&self) -> f64 {
        self.multiplication * self.input_torque.max(0.0)
    }

    /// Torque the impeller takes back from the crankshaft (N·m).
    pub fn reaction_torque(&self) -> f64 {
        self.reaction_torque
    }

    pub fn multiplication(&self) -> f64 {
        self.multiplication
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

/// Only the turbine-side shaft itself. The transmission and wheel inertia
/// folded into `driveshaft_moment` belong to their own bodies.
impl RotatingBody for TorqueConverter {
    fn name(&self) -> &str {
        "torque_converter"
    }

    fn omega(&self) -> f64 {
        self.turbine_omega
    }

    fn moment(&self) -> f64 {
        self.base_driveshaft_moment
    }
}
