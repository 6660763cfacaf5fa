//! Drivetrain integrator: engine → torque converter → transmission → wheels.

use crate::error::{SimError, SimResult};
use crate::events::ShiftEvent;
use pt_components::common::clamp;
use pt_components::{
    Crankshaft, EngineConfig, RotatingBody, ShiftDirection, Stroke, TorqueConverter,
    TorqueConverterConfig, Transmission, TransmissionConfig, WheelAxle, WheelAxleConfig,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Configuration of every drivetrain stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarConfig {
    pub engine: EngineConfig,
    pub torque_converter: TorqueConverterConfig,
    pub transmission: TransmissionConfig,
    pub wheels: WheelAxleConfig,
}

/// Read-only snapshot of one cylinder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CylinderTelemetry {
    pub stroke: Stroke,
    pub piston_position_m: f64,
    pub volume_m3: f64,
    pub pressure_pa: f64,
    pub temperature_k: f64,
}

/// Published state after one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutput {
    pub time_s: f64,
    pub rpm: f64,
    pub road_speed_mph: f64,
    pub gear: usize,
    /// Engine brake torque (N·m)
    pub torque_nm: f64,
    pub horsepower: f64,
    /// True on the step a gear change completed
    pub just_shifted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cylinders: Option<Vec<CylinderTelemetry>>,
}

/// A complete vehicle advanced at a fixed time step.
///
/// The car exclusively owns one of each component. Each step copies values
/// forward through the chain, advances every stage once, and, when the
/// transmission has just changed gear, propagates the wheel speed back up
/// through the new ratio.
#[derive(Clone, Debug)]
pub struct Car {
    engine: Crankshaft,
    converter: TorqueConverter,
    transmission: Transmission,
    wheels: WheelAxle,
    dt: f64,
    time: f64,
    rpm: f64,
    mph: f64,
    record_cylinders: bool,
    shift_log: Vec<ShiftEvent>,
}

impl Car {
    /// Build a car at rest with the engine turning at its starter speed.
    ///
    /// # Errors
    /// Returns an error if `dt` is not positive or any component rejects its
    /// configuration.
    pub fn new(config: &CarConfig, dt: f64) -> SimResult<Self> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimError::InvalidArg {
                what: "time step must be positive",
            });
        }

        let mut engine = Crankshaft::new(&config.engine)?;
        let converter = TorqueConverter::new(&config.torque_converter);
        engine.add_moment(converter.impeller_moment());
        let transmission = Transmission::new(&config.transmission, dt)?;
        let wheels = WheelAxle::new(&config.wheels);

        let mut car = Self {
            rpm: engine.rpm(),
            engine,
            converter,
            transmission,
            wheels,
            dt,
            time: 0.0,
            mph: 0.0,
            record_cylinders: false,
            shift_log: Vec::new(),
        };
        let moment = car.driveshaft_moment();
        car.converter.set_driveshaft_moment(moment);
        Ok(car)
    }

    /// Include per-cylinder telemetry in every [`StepOutput`].
    pub fn set_cylinder_telemetry(&mut self, enabled: bool) {
        self.record_cylinders = enabled;
    }

    /// Advance the whole drivetrain by one time step.
    ///
    /// `throttle` is clamped to [0, 1]; a non-finite value counts as closed.
    pub fn step(&mut self, throttle: f64) -> StepOutput {
        let throttle = if throttle.is_finite() {
            clamp(throttle, 0.0, 1.0)
        } else {
            0.0
        };
        let old_ratio = self.transmission.ratio();
        let old_gear = self.transmission.gear();
        let final_drive = self.wheels.final_drive();

        // Forward pass
        self.converter
            .set_impeller(self.engine.omega(), self.engine.brake_torque());
        self.transmission
            .set_input_omega(self.converter.turbine_omega());
        self.wheels
            .set_omega(self.transmission.input_omega() / old_ratio / final_drive);

        let road_load = self.wheels.road_torque() / (old_ratio * final_drive);
        let shifting = self.transmission.is_shifting();

        self.engine.step(
            throttle,
            road_load + self.converter.reaction_torque(),
            self.dt,
        );
        self.converter
            .step(road_load, shifting, self.wheels.linear_speed(), self.dt);
        self.transmission.step(throttle, self.engine.rpm(), self.mph);
        self.wheels.update();

        self.time += self.dt;
        self.mph = self.wheels.speed_mph();
        self.rpm = self.engine.rpm();

        let just_shifted = self.transmission.take_just_shifted();
        if just_shifted {
            self.reconcile(old_ratio, old_gear);
        }

        self.output(just_shifted)
    }

    /// Backward pass after a gear change.
    ///
    /// The wheels keep their speed. Transmission output, turbine and engine
    /// speeds are rederived from it through the new ratio, and the engine's
    /// reflected inertia is rescaled by the inverse ratio change.
    fn reconcile(&mut self, old_ratio: f64, old_gear: usize) {
        let new_ratio = self.transmission.ratio();
        let output = self.wheels.omega() * self.wheels.final_drive();

        self.transmission.set_output_omega(output);
        self.converter.set_turbine_omega(output * new_ratio);
        self.engine
            .set_omega(self.engine.omega() * new_ratio / old_ratio);
        self.engine.scale_moment(old_ratio / new_ratio);
        let moment = self.driveshaft_moment();
        self.converter.set_driveshaft_moment(moment);
        self.rpm = self.engine.rpm();

        debug!(
            old_ratio,
            new_ratio,
            engine_moment = self.engine.moment(),
            driveshaft_moment = moment,
            "shift reconciled"
        );

        let to_gear = self.transmission.gear();
        let direction = if to_gear > old_gear {
            ShiftDirection::Up
        } else {
            ShiftDirection::Down
        };
        info!(
            t = self.time,
            from = old_gear,
            to = to_gear,
            rpm = self.rpm,
            mph = self.mph,
            "gear changed"
        );
        self.shift_log.push(ShiftEvent {
            time_s: self.time,
            from_gear: old_gear,
            to_gear,
            direction,
            rpm: self.rpm,
            mph: self.mph,
        });
    }

    /// Inertia downstream of the turbine, reflected through the current gear.
    ///
    /// ```text
    /// I_ds = I_base + I_trans + I_wheel/(ratio·final_drive)²
    /// ```
    fn driveshaft_moment(&self) -> f64 {
        let reduction = self.transmission.ratio() * self.wheels.final_drive();
        self.converter.base_driveshaft_moment()
            + self.transmission.moment()
            + self.wheels.moment() / (reduction * reduction)
    }

    /// Current state without advancing time.
    pub fn snapshot(&self) -> StepOutput {
        self.output(false)
    }

    fn output(&self, just_shifted: bool) -> StepOutput {
        StepOutput {
            time_s: self.time,
            rpm: self.rpm,
            road_speed_mph: self.mph,
            gear: self.transmission.gear(),
            torque_nm: self.engine.brake_torque(),
            horsepower: self.engine.horsepower(),
            just_shifted,
            cylinders: self.record_cylinders.then(|| self.cylinder_telemetry()),
        }
    }

    pub fn cylinder_telemetry(&self) -> Vec<CylinderTelemetry> {
        self.engine
            .cylinders()
            .iter()
            .map(|c| CylinderTelemetry {
                stroke: c.stroke(),
                piston_position_m: c.piston_position_m(),
                volume_m3: c.volume_m3(),
                pressure_pa: c.pressure().value,
                temperature_k: c.temperature().value,
            })
            .collect()
    }

    fn bodies(&self) -> [&dyn RotatingBody; 4] {
        [
            &self.engine,
            &self.converter,
            &self.transmission,
            &self.wheels,
        ]
    }

    /// Kinetic energy of each rotating body (J), keyed by body name.
    ///
    /// Each inertia is counted once, at its own speed. The wheel axle carries
    /// the vehicle's translational energy.
    pub fn energy_breakdown(&self) -> Vec<(&str, f64)> {
        self.bodies()
            .into_iter()
            .map(|b| (b.name(), b.kinetic_energy()))
            .collect()
    }

    /// Total kinetic energy held by the drivetrain and vehicle (J).
    pub fn kinetic_energy(&self) -> f64 {
        self.bodies().iter().map(|b| b.kinetic_energy()).sum()
    }

    pub fn engine(&self) -> &Crankshaft {
        &self.engine
    }

    pub fn converter(&self) -> &TorqueConverter {
        &self.converter
    }

    pub fn transmission(&self) -> &Transmission {
        &self.transmission
    }

    pub fn wheels(&self) -> &WheelAxle {
        &self.wheels
    }

    /// Completed gear changes, oldest first.
    pub fn shift_log(&self) -> &[ShiftEvent] {
        &self.shift_log
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn rpm(&self) -> f64 {
        self.rpm
    }

    pub fn road_speed_mph(&self) -> f64 {
        self.mph
    }

    pub fn gear(&self) -> usize {
        self.transmission.gear()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn arbitrary_throttle_keeps_state_valid(
            throttles in prop::collection::vec(-0.5f64..1.5, 1..40),
        ) {
            let mut car = Car::new(&CarConfig::default(), 1e-3).unwrap();
            let mut previous_flag = false;

            for &throttle in &throttles {
                for _ in 0..250 {
                    let out = car.step(throttle);
                    prop_assert!((1..=6).contains(&out.gear));
                    prop_assert!(out.rpm.is_finite() && out.rpm >= 0.0);
                    prop_assert!(out.road_speed_mph.is_finite());
                    prop_assert!(!(previous_flag && out.just_shifted));
                    previous_flag = out.just_shifted;
                }
            }
            for event in car.shift_log() {
                prop_assert_eq!(event.from_gear.abs_diff(event.to_gear), 1);
                prop_assert_eq!(event.is_upshift(), event.to_gear > event.from_gear);
            }
        }
    }
}
