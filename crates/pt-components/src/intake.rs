//! Empirical intake charge curve.
//!
//! Volumetric filling depends on engine speed: poor at very low rpm, best
//! near a tuned peak, and falling off again as valve time shrinks. The exact
//! shape is calibration data, so it is configuration rather than code.

use serde::{Deserialize, Serialize};

/// Relative intake filling as a function of engine speed, in (0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IntakeCurve {
    /// Gaussian bump centred on `peak_rpm`, never falling below `floor`.
    ///
    /// ```text
    /// f(rpm) = floor + (1 - floor)·exp(-((rpm - peak)/width)²)
    /// ```
    Bell {
        peak_rpm: f64,
        width_rpm: f64,
        floor: f64,
    },
    /// Full filling up to `peak_rpm`, then inversely proportional to speed.
    Saturating { peak_rpm: f64 },
    /// Speed-independent filling.
    Flat,
}

impl Default for IntakeCurve {
    fn default() -> Self {
        IntakeCurve::Bell {
            peak_rpm: 5500.0,
            width_rpm: 3500.0,
            floor: 0.6,
        }
    }
}

impl IntakeCurve {
    /// Filling factor at `rpm`. The sign of `rpm` is ignored.
    pub fn factor(&self, rpm: f64) -> f64 {
        let rpm = rpm.abs();
        match *self {
            IntakeCurve::Bell {
                peak_rpm,
                width_rpm,
                floor,
            } => {
                let z = (rpm - peak_rpm) / width_rpm;
                floor + (1.0 - floor) * (-z * z).exp()
            }
            IntakeCurve::Saturating { peak_rpm } => 1.0 / (rpm / peak_rpm).max(1.0),
            IntakeCurve::Flat => 1.0,
        }
    }

    /// True when every parameter is finite and in range.
    pub fn is_valid(&self) -> bool {
        match *self {
            IntakeCurve::Bell {
                peak_rpm,
                width_rpm,
                floor,
            } => {
                peak_rpm.is_finite()
                    && peak_rpm > 0.0
                    && width_rpm.is_finite()
                    && width_rpm > 0.0
                    && (0.0..=1.0).contains(&floor)
            }
            IntakeCurve::Saturating { peak_rpm } => peak_rpm.is_finite() && peak_rpm > 0.0,
            IntakeCurve::Flat => true,
        }
    }
}
