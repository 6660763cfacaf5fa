//! Stepped automatic transmission with a timed shift state machine.

use crate::common::{clamp, or_default};
use crate::error::{ComponentError, ComponentResult};
use crate::traits::RotatingBody;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One (engine speed, road speed) shift threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShiftPoint {
    pub rpm: f64,
    pub mph: f64,
}

impl ShiftPoint {
    pub const fn new(rpm: f64, mph: f64) -> Self {
        Self { rpm, mph }
    }
}

/// Shift threshold tables.
///
/// `up[i]` is the threshold for leaving gear `i + 1` upwards; `down[i]` the
/// threshold for dropping into gear `i + 1` from above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftSchedule {
    pub up: Vec<ShiftPoint>,
    pub down: Vec<ShiftPoint>,
    /// Lowest throttle used to scale upshift thresholds; light throttle
    /// still upshifts, just earlier.
    pub throttle_floor: f64,
}

impl Default for ShiftSchedule {
    fn default() -> Self {
        Self {
            up: vec![
                ShiftPoint::new(2800.0, 10.0),
                ShiftPoint::new(2800.0, 18.0),
                ShiftPoint::new(2700.0, 26.0),
                ShiftPoint::new(2600.0, 34.0),
                ShiftPoint::new(2500.0, 42.0),
            ],
            down: vec![
                ShiftPoint::new(900.0, 3.0),
                ShiftPoint::new(1000.0, 5.0),
                ShiftPoint::new(1000.0, 8.0),
                ShiftPoint::new(1000.0, 10.0),
                ShiftPoint::new(1000.0, 12.0),
            ],
            throttle_floor: 0.4,
        }
    }
}

/// Flat transmission configuration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmissionConfig {
    /// Gear ratios, first gear first
    pub ratios: Vec<f64>,
    /// Time the converter stays disengaged during a shift (s)
    pub shift_time_s: f64,
    /// Lumped gearbox moment of inertia (kg·m²)
    pub moment: f64,
    pub schedule: ShiftSchedule,
}

impl Default for TransmissionConfig {
    fn default() -> Self {
        Self {
            ratios: vec![3.6, 2.3, 1.6, 1.2, 1.0, 0.8],
            shift_time_s: 0.3,
            moment: 1.0,
            schedule: ShiftSchedule::default(),
        }
    }
}

impl TransmissionConfig {
    /// Whether each gear is taller than the one before it.
    pub fn ratios_descending(&self) -> bool {
        self.ratios.windows(2).all(|pair| pair[1] < pair[0])
    }

    /// Copy with every invalid tunable field replaced by its default.
    /// Ratios are structural and are left untouched.
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        let floor = self.schedule.throttle_floor;
        Self {
            ratios: self.ratios.clone(),
            shift_time_s: or_default(
                self.shift_time_s,
                self.shift_time_s > 0.0,
                d.shift_time_s,
                "shift_time_s",
            ),
            moment: or_default(self.moment, self.moment > 0.0, d.moment, "transmission moment"),
            schedule: ShiftSchedule {
                up: self.schedule.up.clone(),
                down: self.schedule.down.clone(),
                throttle_floor: or_default(
                    floor,
                    (0.0..=1.0).contains(&floor),
                    d.schedule.throttle_floor,
                    "throttle_floor",
                ),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftDirection {
    Up,
    Down,
}

/// Shift state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftState {
    Idle,
    Shifting {
        direction: ShiftDirection,
        remaining_steps: usize,
    },
}

/// Stepped transmission.
///
/// A detected shift holds the converter disengaged for a fixed number of
/// steps, then changes gear atomically and raises `just_shifted` until the
/// integrator consumes it.
#[derive(Clone, Debug)]
pub struct Transmission {
    ratios: Vec<f64>,
    schedule: ShiftSchedule,
    moment: f64,
    shift_steps: usize,
    gear: usize,
    state: ShiftState,
    just_shifted: bool,
    input_omega: f64,
    output_omega: f64,
}

impl Transmission {
    /// Create a transmission in first gear.
    ///
    /// # Arguments
    /// * `config` - Ratios, shift time and shift tables
    /// * `dt` - Integrator time step (s), used to size the shift timer
    ///
    /// # Errors
    /// Returns `InvalidArg` if the ratio list is empty or holds a
    /// non-positive ratio, or if `dt` is not positive.
    pub fn new(config: &TransmissionConfig, dt: f64) -> ComponentResult<Self> {
        if config.ratios.is_empty() {
            return Err(ComponentError::InvalidArg {
                what: "gear ratio list must not be empty",
            });
        }
        if config.ratios.iter().any(|r| !(r.is_finite() && *r > 0.0)) {
            return Err(ComponentError::InvalidArg {
                what: "gear ratios must be positive",
            });
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(ComponentError::InvalidArg {
                what: "time step must be positive",
            });
        }

        if !config.ratios_descending() {
            warn!(
                ratios = ?config.ratios,
                "gear ratios are not strictly decreasing; shift tables will misbehave"
            );
        }

        let config = config.sanitized();
        let shift_steps = ((config.shift_time_s / dt).ceil() as usize).max(1);

        Ok(Self {
            ratios: config.ratios,
            schedule: config.schedule,
            moment: config.moment,
            shift_steps,
            gear: 1,
            state: ShiftState::Idle,
            just_shifted: false,
            input_omega: 0.0,
            output_omega: 0.0,
        })
    }

    /// Decide whether the current operating point calls for a shift.
    ///
    /// Upshift thresholds from the current gear onward are scaled by
    /// `max(throttle, throttle_floor)`; the first pair both exceeded wins.
    /// Downshift thresholds for the gears below are compared unscaled.
    pub fn evaluate_shift_point(&self, throttle: f64, rpm: f64, mph: f64) -> Option<ShiftDirection> {
        let scale = clamp(throttle, 0.0, 1.0).max(self.schedule.throttle_floor);

        if self.gear < self.gear_count() {
            let upshift = self
                .schedule
                .up
                .iter()
                .skip(self.gear - 1)
                .any(|p| rpm > p.rpm * scale && mph > p.mph * scale);
            if upshift {
                return Some(ShiftDirection::Up);
            }
        }

        if self.gear > 1 {
            let downshift = self
                .schedule
                .down
                .iter()
                .take(self.gear - 1)
                .any(|p| rpm < p.rpm && mph < p.mph);
            if downshift {
                return Some(ShiftDirection::Down);
            }
        }

        None
    }

    /// Advance the shift state machine by one step.
    pub fn step(&mut self, throttle: f64, rpm: f64, mph: f64) {
        self.output_omega = self.input_omega / self.ratio();

        if self.state == ShiftState::Idle {
            if let Some(direction) = self.evaluate_shift_point(throttle, rpm, mph) {
                debug!(gear = self.gear, ?direction, rpm, mph, "shift started");
                self.state = ShiftState::Shifting {
                    direction,
                    remaining_steps: self.shift_steps,
                };
            }
        }

        if let ShiftState::Shifting {
            direction,
            remaining_steps,
        } = self.state
        {
            let remaining_steps = remaining_steps.saturating_sub(1);
            if remaining_steps == 0 {
                self.gear = match direction {
                    ShiftDirection::Up => (self.gear + 1).min(self.gear_count()),
                    ShiftDirection::Down => (self.gear - 1).max(1),
                };
                self.state = ShiftState::Idle;
                self.just_shifted = true;
            } else {
                self.state = ShiftState::Shifting {
                    direction,
                    remaining_steps,
                };
            }
        }
    }

    /// Read and clear the one-step `just_shifted` flag.
    pub fn take_just_shifted(&mut self) -> bool {
        std::mem::take(&mut self.just_shifted)
    }

    pub fn just_shifted(&self) -> bool {
        self.just_shifted
    }

    pub fn is_shifting(&self) -> bool {
        matches!(self.state, ShiftState::Shifting { .. })
    }

    pub fn state(&self) -> ShiftState {
        self.state
    }

    /// Current gear, 1-based.
    pub fn gear(&self) -> usize {
        self.gear
    }

    pub fn gear_count(&self) -> usize {
        self.ratios.len()
    }

    /// Ratio of the current gear.
    pub fn ratio(&self) -> f64 {
        self.ratios[self.gear - 1]
    }

    pub fn ratios(&self) -> &[f64] {
        &self.ratios
    }

    pub fn shift_steps(&self) -> usize {
        self.shift_steps
    }

    pub fn input_omega(&self) -> f64 {
        self.input_omega
    }

    pub fn set_input_omega(&mut self, omega: f64) {
        self.input_omega = omega;
    }

    pub fn output_omega(&self) -> f64 {
        self.output_omega
    }

    pub fn set_output_omega(&mut self, omega: f64) {
        self.output_omega = omega;
    }
}

impl RotatingBody for Transmission {
    fn name(&self) -> &str {
        "transmission"
    }

    fn omega(&self) -> f64 {
        self.output_omega
    }

    fn moment(&self) -> f64 {
        self.moment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transmission(dt: f64) -> Transmission {
        Transmission::new(&TransmissionConfig::default(), dt).unwrap()
    }

    #[test]
    fn empty_ratios_are_fatal() {
        let config = TransmissionConfig {
            ratios: vec![],
            ..TransmissionConfig::default()
        };
        assert!(matches!(
            Transmission::new(&config, 1e-3),
            Err(ComponentError::InvalidArg { .. })
        ));

        let config = TransmissionConfig {
            ratios: vec![3.0, 0.0],
            ..TransmissionConfig::default()
        };
        assert!(Transmission::new(&config, 1e-3).is_err());
    }

    #[test]
    fn ratio_order_is_checked() {
        assert!(TransmissionConfig::default().ratios_descending());

        let single = TransmissionConfig {
            ratios: vec![1.0],
            ..TransmissionConfig::default()
        };
        assert!(single.ratios_descending());

        let swapped = TransmissionConfig {
            ratios: vec![3.6, 1.6, 2.3],
            ..TransmissionConfig::default()
        };
        assert!(!swapped.ratios_descending());
        // Out-of-order ratios still build; they only log a warning
        assert!(Transmission::new(&swapped, 1e-3).is_ok());

        let repeated = TransmissionConfig {
            ratios: vec![2.0, 2.0],
            ..TransmissionConfig::default()
        };
        assert!(!repeated.ratios_descending());
    }

    #[test]
    fn shift_steps_from_time() {
        assert_eq!(transmission(1e-3).shift_steps(), 300);
        assert_eq!(transmission(1.0).shift_steps(), 1);
    }

    #[test]
    fn upshift_scales_with_throttle() {
        let tr = transmission(1e-3);
        // Full throttle: 2800 rpm / 10 mph
        assert_eq!(tr.evaluate_shift_point(1.0, 2700.0, 20.0), None);
        assert_eq!(
            tr.evaluate_shift_point(1.0, 2900.0, 11.0),
            Some(ShiftDirection::Up)
        );
        // Light throttle uses the floor: 1120 rpm / 4 mph
        assert_eq!(
            tr.evaluate_shift_point(0.1, 1200.0, 5.0),
            Some(ShiftDirection::Up)
        );
    }

    #[test]
    fn first_gear_never_downshifts_and_top_never_upshifts() {
        let mut tr = transmission(1.0);
        assert_eq!(tr.evaluate_shift_point(0.0, 0.0, 0.0), None);
        for _ in 0..10 {
            tr.step(1.0, 9000.0, 200.0);
            tr.take_just_shifted();
        }
        assert_eq!(tr.gear(), 6);
        assert_eq!(tr.evaluate_shift_point(1.0, 9000.0, 200.0), None);
    }

    #[test]
    fn shift_completes_after_timer() {
        let mut tr = transmission(0.1);
        assert_eq!(tr.shift_steps(), 3);
        tr.step(1.0, 3000.0, 15.0);
        assert!(tr.is_shifting());
        assert_eq!(tr.gear(), 1);
        tr.step(1.0, 3000.0, 15.0);
        assert_eq!(tr.gear(), 1);
        assert!(!tr.just_shifted());
        tr.step(1.0, 3000.0, 15.0);
        assert_eq!(tr.gear(), 2);
        assert!((tr.ratio() - 2.3).abs() < 1e-12);
        assert!(!tr.is_shifting());
        assert!(tr.take_just_shifted());
        assert!(!tr.take_just_shifted());
    }

    #[test]
    fn shift_is_not_interrupted() {
        let mut tr = transmission(0.1);
        tr.step(1.0, 3000.0, 15.0);
        // Conditions now call for nothing, yet the upshift runs on
        tr.step(0.0, 0.0, 0.0);
        assert!(matches!(
            tr.state(),
            ShiftState::Shifting {
                direction: ShiftDirection::Up,
                ..
            }
        ));
        tr.step(0.0, 0.0, 0.0);
        assert_eq!(tr.gear(), 2);
    }

    #[test]
    fn downshift_when_slow() {
        let mut tr = transmission(1.0);
        tr.step(1.0, 3000.0, 15.0);
        assert_eq!(tr.gear(), 2);
        assert_eq!(
            tr.evaluate_shift_point(0.0, 800.0, 2.0),
            Some(ShiftDirection::Down)
        );
        tr.step(0.0, 800.0, 2.0);
        assert_eq!(tr.gear(), 1);
    }

    #[test]
    fn output_speed_follows_ratio() {
        let mut tr = transmission(1e-3);
        tr.set_input_omega(360.0);
        tr.step(0.0, 500.0, 0.0);
        assert!((tr.output_omega() - 100.0).abs() < 1e-12);
    }
}
