//! Common constants and utilities for component calculations.

use crate::error::ComponentResult;
use pt_core::constants::{P_ATM_PA, R_UNIVERSAL, T_AMBIENT_K};
use pt_core::numeric::ensure_positive;
use tracing::warn;

/// Molar mass of air (kg/mol)
pub const M_AIR: f64 = 0.028_96;

/// Molar mass of gasoline, lumped as octane (kg/mol)
pub const M_FUEL: f64 = 0.114;

/// Stoichiometric air:fuel mass ratio
pub const AIR_FUEL_RATIO: f64 = 14.7;

/// Lower heating value of the fuel (J/kg)
pub const FUEL_LHV: f64 = 46.0e6;

/// Ratio of specific heats used by the polytropic compression/expansion law
pub const GAMMA: f64 = 1.4;

/// Constant-volume specific heat of the charge at atmospheric pressure (J/(kg·K))
pub const CV_BASE: f64 = 718.0;

/// Fractional growth of c_v per atmosphere of cylinder pressure
pub const CV_PRESSURE_COEFF: f64 = 0.002;

/// Density of the intake charge at ambient conditions (kg/m³).
pub fn intake_air_density() -> f64 {
    P_ATM_PA * M_AIR / (R_UNIVERSAL * T_AMBIENT_K)
}

/// Charge specific heat, a mild function of the current cylinder pressure.
pub fn specific_heat(pressure_pa: f64) -> f64 {
    CV_BASE * (1.0 + CV_PRESSURE_COEFF * pressure_pa / P_ATM_PA)
}

/// Ensure a required structural parameter is finite and strictly positive.
pub fn require_positive(value: f64, what: &'static str) -> ComponentResult<f64> {
    Ok(ensure_positive(value, what)?)
}

/// Keep a tunable parameter when it is finite and valid, otherwise fall back
/// to its named default.
pub fn or_default(value: f64, valid: bool, default: f64, what: &'static str) -> f64 {
    if valid && value.is_finite() {
        value
    } else {
        warn!(field = what, value, default, "invalid parameter, using default");
        default
    }
}

/// Clamp a value between min and max.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComponentError;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5.0, 0.0, 10.0), 5.0);
        assert_eq!(clamp(-1.0, 0.0, 10.0), 0.0);
        assert_eq!(clamp(11.0, 0.0, 10.0), 10.0);
    }

    #[test]
    fn test_require_positive() {
        assert!(require_positive(0.1, "bore").is_ok());
        assert!(matches!(
            require_positive(0.0, "bore"),
            Err(ComponentError::InvalidArg { what: "bore" })
        ));
        assert!(matches!(
            require_positive(f64::NAN, "bore"),
            Err(ComponentError::NonPhysical { what: "bore" })
        ));
    }

    #[test]
    fn test_or_default() {
        assert_eq!(or_default(0.5, true, 0.8, "eff"), 0.5);
        assert_eq!(or_default(-0.5, false, 0.8, "eff"), 0.8);
        assert_eq!(or_default(f64::NAN, true, 0.8, "eff"), 0.8);
    }

    #[test]
    fn intake_density_near_standard_air() {
        let rho = intake_air_density();
        assert!((rho - 1.204).abs() < 0.01);
    }

    #[test]
    fn specific_heat_grows_with_pressure() {
        assert!((specific_heat(0.0) - CV_BASE).abs() < 1e-12);
        assert!(specific_heat(10.0 * P_ATM_PA) > specific_heat(P_ATM_PA));
    }
}
