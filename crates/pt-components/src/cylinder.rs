//! Single cylinder: slider-crank geometry, lumped gas state and the
//! four-stroke combustion cycle.
//!
//! The cycle is an explicit state machine. [`CombustionModel::transition`] is
//! a pure function from (stroke, charge, input) to the next stroke and the
//! charge it leaves behind; [`Cylinder`] holds the current state and applies
//! the continuous pressure/volume update between transitions.

use crate::common::{
    AIR_FUEL_RATIO, FUEL_LHV, GAMMA, M_AIR, M_FUEL, intake_air_density, require_positive,
    specific_heat,
};
use crate::error::{ComponentError, ComponentResult};
use crate::intake::IntakeCurve;
use pt_core::constants::{R_UNIVERSAL, T_AMBIENT_K};
use pt_core::units::{Length, Pressure, Temperature, Volume, k, m3, pa};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::trace;

/// Phase of the four-stroke cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stroke {
    Intake,
    Compression,
    Power,
    Exhaust,
}

impl Stroke {
    /// Stroke that follows this one, half a crank revolution later.
    pub const fn next(self) -> Self {
        match self {
            Stroke::Intake => Stroke::Compression,
            Stroke::Compression => Stroke::Power,
            Stroke::Power => Stroke::Exhaust,
            Stroke::Exhaust => Stroke::Intake,
        }
    }

    /// Position in the cycle, 1 (intake) through 4 (exhaust).
    pub const fn index(self) -> u8 {
        match self {
            Stroke::Intake => 1,
            Stroke::Compression => 2,
            Stroke::Power => 3,
            Stroke::Exhaust => 4,
        }
    }

    /// Stroke occupied at cycle angle `phi` (rad), with the power stroke
    /// starting at 0. Any angle is wrapped into one 4π cycle first.
    pub fn from_cycle_angle(phi: f64) -> Self {
        let half_turns = (phi.rem_euclid(4.0 * PI) / PI).floor() as i64;
        match half_turns {
            0 => Stroke::Power,
            1 => Stroke::Exhaust,
            2 => Stroke::Intake,
            _ => Stroke::Compression,
        }
    }
}

/// Lumped contents of the combustion chamber.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GasCharge {
    /// Trapped gas (mol)
    pub moles: f64,
    /// Trapped air mass (kg)
    pub air_mass_kg: f64,
    /// Trapped fuel mass (kg)
    pub fuel_mass_kg: f64,
    /// Gas temperature (K), never below ambient
    pub temperature_k: f64,
    /// Gas pressure (Pa), never negative
    pub pressure_pa: f64,
}

impl GasCharge {
    /// An empty chamber at ambient temperature.
    pub fn empty() -> Self {
        Self {
            moles: 0.0,
            air_mass_kg: 0.0,
            fuel_mass_kg: 0.0,
            temperature_k: T_AMBIENT_K,
            pressure_pa: 0.0,
        }
    }

    pub fn total_mass_kg(&self) -> f64 {
        self.air_mass_kg + self.fuel_mass_kg
    }
}

impl Default for GasCharge {
    fn default() -> Self {
        Self::empty()
    }
}

/// Fixed slider-crank geometry of one cylinder.
///
/// ```text
/// A   = π·b²/4
/// V_d = A·stroke
/// V_c = V_d/(CR - 1)
/// r   = stroke/2,  l = r/rod_ratio
/// x(θ) = r + l - (r·cos θ + sqrt(l² - r²·sin²θ))
/// V(θ) = V_c + A·x(θ)
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct CylinderGeometry {
    bore_m: f64,
    stroke_m: f64,
    compression_ratio: f64,
    area_m2: f64,
    displacement_m3: f64,
    clearance_m3: f64,
    crank_radius_m: f64,
    rod_length_m: f64,
}

impl CylinderGeometry {
    /// Create cylinder geometry.
    ///
    /// # Arguments
    /// * `bore` - Cylinder bore, must be positive
    /// * `stroke` - Piston stroke, must be positive
    /// * `compression_ratio` - Full volume over clearance volume, must exceed 1
    /// * `rod_ratio` - Crank radius over connecting-rod length, in (0, 1)
    ///
    /// # Errors
    /// Returns `InvalidArg` for any non-physical dimension.
    pub fn new(
        bore: Length,
        stroke: Length,
        compression_ratio: f64,
        rod_ratio: f64,
    ) -> ComponentResult<Self> {
        let bore_m = require_positive(bore.value, "bore must be positive")?;
        let stroke_m = require_positive(stroke.value, "stroke must be positive")?;
        require_positive(compression_ratio, "compression ratio must be positive")?;
        if compression_ratio <= 1.0 {
            return Err(ComponentError::InvalidArg {
                what: "compression ratio must exceed 1",
            });
        }
        if !(rod_ratio > 0.0 && rod_ratio < 1.0) {
            return Err(ComponentError::InvalidArg {
                what: "rod ratio must be in (0, 1)",
            });
        }

        let area_m2 = PI * bore_m * bore_m / 4.0;
        let displacement_m3 = area_m2 * stroke_m;
        let crank_radius_m = stroke_m / 2.0;

        Ok(Self {
            bore_m,
            stroke_m,
            compression_ratio,
            area_m2,
            displacement_m3,
            clearance_m3: displacement_m3 / (compression_ratio - 1.0),
            crank_radius_m,
            rod_length_m: crank_radius_m / rod_ratio,
        })
    }

    /// Piston distance from top dead centre (m) at cylinder angle `theta`.
    pub fn piston_position(&self, theta: f64) -> f64 {
        let r = self.crank_radius_m;
        let l = self.rod_length_m;
        let (sin, cos) = theta.sin_cos();
        r + l - (r * cos + (l * l - r * r * sin * sin).sqrt())
    }

    /// Chamber volume (m³) at cylinder angle `theta`.
    pub fn volume_at(&self, theta: f64) -> f64 {
        self.clearance_m3 + self.area_m2 * self.piston_position(theta)
    }

    /// Swept plus clearance volume (m³).
    pub fn full_volume_m3(&self) -> f64 {
        self.displacement_m3 + self.clearance_m3
    }

    pub fn displacement(&self) -> Volume {
        m3(self.displacement_m3)
    }

    pub fn clearance_volume(&self) -> Volume {
        m3(self.clearance_m3)
    }

    pub fn bore_m(&self) -> f64 {
        self.bore_m
    }

    pub fn stroke_m(&self) -> f64 {
        self.stroke_m
    }

    pub fn compression_ratio(&self) -> f64 {
        self.compression_ratio
    }

    pub fn area_m2(&self) -> f64 {
        self.area_m2
    }

    pub fn crank_radius_m(&self) -> f64 {
        self.crank_radius_m
    }

    pub fn rod_length_m(&self) -> f64 {
        self.rod_length_m
    }
}

/// Values pushed into a cylinder when it changes stroke.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeInput {
    /// Throttle position in [0, 1]
    pub throttle: f64,
    /// Engine speed at the start of the step (rpm)
    pub rpm: f64,
}

/// Result of a stroke transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    pub stroke: Stroke,
    pub charge: GasCharge,
    /// True when the charge was ignited on entering the power stroke.
    pub sparked: bool,
}

/// Lumped combustion parameters shared by every cylinder of an engine.
#[derive(Clone, Debug, PartialEq)]
pub struct CombustionModel {
    /// Fraction of the full cylinder volume filled at wide-open throttle
    pub volumetric_efficiency: f64,
    /// Fraction of fuel heat released into the charge
    pub combustion_efficiency: f64,
    /// Scale on the ideal-gas pressure at ignition
    pub ignition_damping: f64,
    /// Throttle opening that still admits air with the pedal released
    pub idle_throttle: f64,
    /// Engine speed at and above which intake fuel is cut (rpm)
    pub rev_limit_rpm: f64,
    /// Filling factor as a function of engine speed
    pub intake: IntakeCurve,
}

impl Default for CombustionModel {
    fn default() -> Self {
        Self {
            volumetric_efficiency: 0.85,
            combustion_efficiency: 0.8,
            ignition_damping: 0.9,
            idle_throttle: 0.0,
            rev_limit_rpm: 6800.0,
            intake: IntakeCurve::default(),
        }
    }
}

impl CombustionModel {
    /// Advance `from` to the next stroke and apply that stroke's entry action.
    ///
    /// Entering intake traps a fresh charge, entering power ignites it,
    /// entering exhaust empties the chamber. Compression carries the charge
    /// over unchanged.
    pub fn transition(
        &self,
        from: Stroke,
        charge: GasCharge,
        geometry: &CylinderGeometry,
        input: StrokeInput,
    ) -> Transition {
        let stroke = from.next();
        match stroke {
            Stroke::Intake => Transition {
                stroke,
                charge: self.intake_charge(geometry, input),
                sparked: false,
            },
            Stroke::Compression => Transition {
                stroke,
                charge,
                sparked: false,
            },
            Stroke::Power => {
                let (charge, sparked) = self.ignite(charge);
                Transition {
                    stroke,
                    charge,
                    sparked,
                }
            }
            Stroke::Exhaust => Transition {
                stroke,
                charge: GasCharge::empty(),
                sparked: false,
            },
        }
    }

    /// Fresh charge drawn in at the start of the intake stroke.
    ///
    /// ```text
    /// m_air  = throttle_eff·VE·ρ_intake·V_full·curve(rpm)
    /// m_fuel = m_air/AFR
    /// n      = m_air/M_air + m_fuel/M_fuel
    /// ```
    pub fn intake_charge(&self, geometry: &CylinderGeometry, input: StrokeInput) -> GasCharge {
        if input.rpm.abs() >= self.rev_limit_rpm {
            return GasCharge::empty();
        }

        let throttle = self.idle_throttle + (1.0 - self.idle_throttle) * input.throttle;
        let full_volume = geometry.full_volume_m3();
        let air_mass_kg = throttle
            * self.volumetric_efficiency
            * intake_air_density()
            * full_volume
            * self.intake.factor(input.rpm);
        let fuel_mass_kg = air_mass_kg / AIR_FUEL_RATIO;
        let moles = air_mass_kg / M_AIR + fuel_mass_kg / M_FUEL;

        GasCharge {
            moles,
            air_mass_kg,
            fuel_mass_kg,
            temperature_k: T_AMBIENT_K,
            pressure_pa: moles * R_UNIVERSAL * T_AMBIENT_K / full_volume,
        }
    }

    /// Spark: release the fuel heat into the trapped charge.
    ///
    /// Temperature is set by a step, not a process law:
    /// `T = m_fuel·LHV·η / (m·c_v(P))`. An empty chamber does not fire.
    fn ignite(&self, charge: GasCharge) -> (GasCharge, bool) {
        if charge.moles <= 0.0 {
            return (charge, false);
        }
        let heat_j = charge.fuel_mass_kg * FUEL_LHV * self.combustion_efficiency;
        let cv = specific_heat(charge.pressure_pa);
        let temperature_k = (heat_j / (charge.total_mass_kg() * cv)).max(T_AMBIENT_K);
        (
            GasCharge {
                temperature_k,
                ..charge
            },
            true,
        )
    }
}

/// One cylinder of a reciprocating engine.
#[derive(Clone, Debug)]
pub struct Cylinder {
    geometry: CylinderGeometry,
    model: CombustionModel,
    stroke: Stroke,
    charge: GasCharge,
    piston_position_m: f64,
    volume_m3: f64,
    force_n: f64,
}

impl Cylinder {
    /// Create an empty cylinder in `stroke`.
    pub fn new(geometry: CylinderGeometry, model: CombustionModel, stroke: Stroke) -> Self {
        let volume_m3 = geometry.full_volume_m3();
        Self {
            geometry,
            model,
            stroke,
            charge: GasCharge::empty(),
            piston_position_m: 0.0,
            volume_m3,
            force_n: 0.0,
        }
    }

    /// Move to the next stroke. Returns true if the charge was ignited.
    pub fn transition(&mut self, input: StrokeInput) -> bool {
        let next = self
            .model
            .transition(self.stroke, self.charge, &self.geometry, input);
        trace!(
            from = ?self.stroke,
            to = ?next.stroke,
            sparked = next.sparked,
            moles = next.charge.moles,
            "stroke transition"
        );
        self.stroke = next.stroke;
        self.charge = next.charge;
        next.sparked
    }

    /// Update volume, pressure and piston force for cylinder angle `theta`.
    ///
    /// Called every step. During intake the chamber is held at full volume.
    /// Otherwise pressure follows `P·V^γ = const` from the previous step,
    /// except at the spark instant or from an empty/zero-pressure state,
    /// where the damped ideal-gas law is used directly.
    pub fn advance(&mut self, theta: f64, sparked: bool) {
        self.piston_position_m = self.geometry.piston_position(theta);
        let prev_pressure = self.charge.pressure_pa;
        let prev_volume = self.volume_m3;
        let gas = &mut self.charge;

        if self.stroke == Stroke::Intake {
            self.volume_m3 = self.geometry.full_volume_m3();
            gas.pressure_pa = gas.moles * R_UNIVERSAL * gas.temperature_k / self.volume_m3;
        } else {
            self.volume_m3 = self.geometry.volume_at(theta);
            let volume = self.volume_m3;
            if !sparked && gas.moles > 0.0 && prev_pressure > 0.0 && prev_volume > 0.0 {
                gas.pressure_pa = prev_pressure * (prev_volume / volume).powf(GAMMA);
                gas.temperature_k = gas.pressure_pa * volume / (gas.moles * R_UNIVERSAL);
                if gas.temperature_k < T_AMBIENT_K {
                    gas.temperature_k = T_AMBIENT_K;
                    gas.pressure_pa = gas.moles * R_UNIVERSAL * T_AMBIENT_K / volume;
                }
            } else if gas.moles > 0.0 {
                gas.pressure_pa = self.model.ignition_damping * gas.moles * R_UNIVERSAL
                    * gas.temperature_k
                    / volume;
            } else {
                gas.pressure_pa = 0.0;
            }
        }

        self.force_n = self.charge.pressure_pa * self.geometry.area_m2();
    }

    pub fn stroke(&self) -> Stroke {
        self.stroke
    }

    pub fn charge(&self) -> &GasCharge {
        &self.charge
    }

    pub fn geometry(&self) -> &CylinderGeometry {
        &self.geometry
    }

    pub fn model(&self) -> &CombustionModel {
        &self.model
    }

    pub fn pressure(&self) -> Pressure {
        pa(self.charge.pressure_pa)
    }

    pub fn temperature(&self) -> Temperature {
        k(self.charge.temperature_k)
    }

    pub fn volume(&self) -> Volume {
        m3(self.volume_m3)
    }

    pub fn volume_m3(&self) -> f64 {
        self.volume_m3
    }

    /// Axial gas force on the piston (N).
    pub fn force_n(&self) -> f64 {
        self.force_n
    }

    /// Piston distance from top dead centre (m).
    pub fn piston_position_m(&self) -> f64 {
        self.piston_position_m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pt_core::constants::P_ATM_PA;
    use pt_core::units::m;

    fn geometry() -> CylinderGeometry {
        CylinderGeometry::new(m(0.0875), m(0.0995), 9.3, 0.3).unwrap()
    }

    fn full_throttle() -> StrokeInput {
        StrokeInput {
            throttle: 1.0,
            rpm: 5500.0,
        }
    }

    #[test]
    fn stroke_cycle_has_period_four() {
        let mut s = Stroke::Intake;
        let mut seen = vec![s];
        for _ in 0..4 {
            s = s.next();
            seen.push(s);
        }
        assert_eq!(
            seen,
            vec![
                Stroke::Intake,
                Stroke::Compression,
                Stroke::Power,
                Stroke::Exhaust,
                Stroke::Intake
            ]
        );
        assert_eq!(Stroke::Power.index(), 3);
    }

    #[test]
    fn stroke_from_cycle_angle() {
        assert_eq!(Stroke::from_cycle_angle(0.0), Stroke::Power);
        assert_eq!(Stroke::from_cycle_angle(-3.0 * PI), Stroke::Exhaust);
        assert_eq!(Stroke::from_cycle_angle(-PI), Stroke::Compression);
        assert_eq!(Stroke::from_cycle_angle(-2.0 * PI), Stroke::Intake);
        assert_eq!(Stroke::from_cycle_angle(4.5 * PI), Stroke::Power);
    }

    #[test]
    fn geometry_volumes() {
        let g = geometry();
        let vd = PI * 0.0875_f64.powi(2) / 4.0 * 0.0995;
        assert!((g.displacement().value - vd).abs() < 1e-12);
        assert!((g.clearance_volume().value - vd / 8.3).abs() < 1e-12);
        assert!((g.volume_at(0.0) - vd / 8.3).abs() < 1e-12);
        assert!((g.volume_at(PI) - g.full_volume_m3()).abs() < 1e-12);
        assert!((g.piston_position(PI) - 0.0995).abs() < 1e-12);
    }

    #[test]
    fn geometry_rejects_non_physical() {
        assert!(CylinderGeometry::new(m(0.0), m(0.1), 9.0, 0.3).is_err());
        assert!(CylinderGeometry::new(m(0.08), m(-0.1), 9.0, 0.3).is_err());
        assert!(CylinderGeometry::new(m(0.08), m(0.1), 1.0, 0.3).is_err());
        assert!(CylinderGeometry::new(m(0.08), m(0.1), 9.0, 1.2).is_err());
    }

    #[test]
    fn intake_charge_scales_with_throttle() {
        let model = CombustionModel::default();
        let g = geometry();
        let full = model.intake_charge(&g, full_throttle());
        let half = model.intake_charge(
            &g,
            StrokeInput {
                throttle: 0.5,
                rpm: 5500.0,
            },
        );
        let expected_air = 0.85 * intake_air_density() * g.full_volume_m3();
        assert!((full.air_mass_kg - expected_air).abs() < 1e-12);
        assert!((full.fuel_mass_kg * AIR_FUEL_RATIO - full.air_mass_kg).abs() < 1e-15);
        assert!((half.moles * 2.0 - full.moles).abs() < 1e-12);
        // Near-atmospheric filling
        assert!(full.pressure_pa > 0.8 * P_ATM_PA && full.pressure_pa < P_ATM_PA);
    }

    #[test]
    fn rev_limiter_cuts_charge() {
        let model = CombustionModel::default();
        let charge = model.intake_charge(
            &geometry(),
            StrokeInput {
                throttle: 1.0,
                rpm: 7000.0,
            },
        );
        assert_eq!(charge.moles, 0.0);
        assert_eq!(charge.temperature_k, T_AMBIENT_K);
    }

    #[test]
    fn power_entry_ignites_only_a_charge() {
        let model = CombustionModel::default();
        let g = geometry();
        let charge = model.intake_charge(&g, full_throttle());

        let fired = model.transition(Stroke::Compression, charge, &g, full_throttle());
        assert_eq!(fired.stroke, Stroke::Power);
        assert!(fired.sparked);
        assert!(fired.charge.temperature_k > 1500.0);

        let empty = model.transition(Stroke::Compression, GasCharge::empty(), &g, full_throttle());
        assert!(!empty.sparked);
        assert_eq!(empty.charge.temperature_k, T_AMBIENT_K);
    }

    #[test]
    fn exhaust_entry_empties_chamber() {
        let model = CombustionModel::default();
        let g = geometry();
        let charge = model.intake_charge(&g, full_throttle());
        let out = model.transition(Stroke::Power, charge, &g, full_throttle());
        assert_eq!(out.stroke, Stroke::Exhaust);
        assert_eq!(out.charge, GasCharge::empty());
    }

    #[test]
    fn compression_follows_polytropic_law() {
        let mut cyl = Cylinder::new(geometry(), CombustionModel::default(), Stroke::Exhaust);
        assert!(!cyl.transition(full_throttle()));
        assert_eq!(cyl.stroke(), Stroke::Intake);
        cyl.advance(2.5 * PI, false);
        assert!((cyl.volume_m3() - cyl.geometry().full_volume_m3()).abs() < 1e-15);

        cyl.transition(full_throttle());
        assert_eq!(cyl.stroke(), Stroke::Compression);
        cyl.advance(3.0 * PI, false);
        let p1 = cyl.pressure().value;
        let v1 = cyl.volume_m3();

        cyl.advance(3.5 * PI, false);
        let p2 = cyl.pressure().value;
        let v2 = cyl.volume_m3();
        let expected = p1 * (v1 / v2).powf(GAMMA);
        assert!((p2 - expected).abs() / expected < 1e-9);

        cyl.advance(4.0 * PI, false);
        assert!(cyl.temperature().value > T_AMBIENT_K);
        assert!(cyl.force_n() > 0.0);
    }

    #[test]
    fn ignition_uses_damped_ideal_gas() {
        let mut cyl = Cylinder::new(geometry(), CombustionModel::default(), Stroke::Exhaust);
        cyl.transition(full_throttle());
        cyl.advance(2.5 * PI, false);
        cyl.transition(full_throttle());
        cyl.advance(3.9 * PI, false);

        let sparked = cyl.transition(full_throttle());
        assert!(sparked);
        cyl.advance(4.0 * PI, true);
        let gas = cyl.charge();
        let expected =
            0.9 * gas.moles * R_UNIVERSAL * gas.temperature_k / cyl.geometry().volume_at(0.0);
        assert!((gas.pressure_pa - expected).abs() / expected < 1e-9);
    }

    #[test]
    fn empty_cylinder_has_no_force() {
        let mut cyl = Cylinder::new(geometry(), CombustionModel::default(), Stroke::Power);
        cyl.advance(0.3, false);
        assert_eq!(cyl.pressure().value, 0.0);
        assert_eq!(cyl.force_n(), 0.0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use pt_core::units::m;

    proptest! {
        #[test]
        fn volume_positive_pressure_non_negative(
            steps in prop::collection::vec((0.0f64..0.6, 0.0f64..1.0, 0.0f64..8000.0), 1..400),
            start in -4.0f64 * PI..0.0,
        ) {
            let g = CylinderGeometry::new(m(0.0875), m(0.0995), 9.3, 0.3).unwrap();
            let mut cyl = Cylinder::new(
                g,
                CombustionModel::default(),
                Stroke::from_cycle_angle(start),
            );
            let mut theta = start;
            let mut threshold = ((start / PI).floor() + 1.0) * PI;

            for (dtheta, throttle, rpm) in steps {
                let mut sparked = false;
                while theta >= threshold {
                    sparked |= cyl.transition(StrokeInput { throttle, rpm });
                    threshold += PI;
                }
                cyl.advance(theta, sparked);

                prop_assert!(cyl.volume_m3() > 0.0);
                prop_assert!(cyl.pressure().value >= 0.0);
                prop_assert!(cyl.charge().moles >= 0.0);
                prop_assert!(cyl.temperature().value >= T_AMBIENT_K);
                theta += dtheta;
            }
        }
    }
}
