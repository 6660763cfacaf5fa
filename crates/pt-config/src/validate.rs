//! Car file validation.
//!
//! Only the fields that make a car impossible to build are rejected here.
//! Out-of-range tunables are left to the components, which fall back to
//! their defaults with a warning.

use crate::schema::{CURRENT_VERSION, CarFile, RunDef};
use pt_components::{EngineConfig, TransmissionConfig};
use pt_sim::{MAX_TIME_STEP, ThrottleProfile};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_car_file(file: &CarFile) -> Result<(), ValidationError> {
    if file.version == 0 || file.version > CURRENT_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: file.version,
        });
    }

    validate_engine(&file.car.engine)?;
    validate_transmission(&file.car.transmission)?;
    validate_run(&file.run)?;
    Ok(())
}

fn validate_engine(engine: &EngineConfig) -> Result<(), ValidationError> {
    if !(engine.bore_m.is_finite() && engine.bore_m > 0.0) {
        return Err(invalid("engine.bore_m", engine.bore_m, "must be positive"));
    }
    if !(engine.stroke_m.is_finite() && engine.stroke_m > 0.0) {
        return Err(invalid("engine.stroke_m", engine.stroke_m, "must be positive"));
    }
    if !(engine.compression_ratio.is_finite() && engine.compression_ratio > 1.0) {
        return Err(invalid(
            "engine.compression_ratio",
            engine.compression_ratio,
            "must be greater than 1",
        ));
    }
    if let Some(moment) = engine.moment_override {
        if !(moment.is_finite() && moment > 0.0) {
            return Err(invalid("engine.moment_override", moment, "must be positive"));
        }
    }
    Ok(())
}

fn validate_transmission(transmission: &TransmissionConfig) -> Result<(), ValidationError> {
    if transmission.ratios.is_empty() {
        return Err(invalid("transmission.ratios", "[]", "at least one gear required"));
    }
    for (i, ratio) in transmission.ratios.iter().enumerate() {
        if !(ratio.is_finite() && *ratio > 0.0) {
            return Err(invalid(
                &format!("transmission.ratios[{i}]"),
                ratio,
                "must be positive",
            ));
        }
    }
    if !transmission.ratios_descending() {
        return Err(invalid(
            "transmission.ratios",
            format!("{:?}", transmission.ratios),
            "must be strictly decreasing",
        ));
    }
    Ok(())
}

fn validate_run(run: &RunDef) -> Result<(), ValidationError> {
    if !(run.dt_s.is_finite() && run.dt_s > 0.0 && run.dt_s <= MAX_TIME_STEP) {
        return Err(invalid(
            "run.dt_s",
            run.dt_s,
            "must be positive and no coarser than 1 ms",
        ));
    }
    if !(run.duration_s.is_finite() && run.duration_s >= 0.0) {
        return Err(invalid("run.duration_s", run.duration_s, "must be non-negative"));
    }
    if run.record_every == 0 {
        return Err(invalid("run.record_every", 0, "must be at least 1"));
    }

    match &run.throttle {
        ThrottleProfile::Constant { throttle } => check_throttle("run.throttle", *throttle)?,
        ThrottleProfile::Steps { points } => {
            if points.is_empty() {
                return Err(invalid("run.throttle.points", "[]", "at least one point required"));
            }
            for (i, p) in points.iter().enumerate() {
                check_throttle(&format!("run.throttle.points[{i}].throttle"), p.throttle)?;
                if !(p.t_s.is_finite() && p.t_s >= 0.0) {
                    return Err(invalid(
                        &format!("run.throttle.points[{i}].t_s"),
                        p.t_s,
                        "must be non-negative",
                    ));
                }
            }
            if points.windows(2).any(|w| w[1].t_s < w[0].t_s) {
                return Err(invalid(
                    "run.throttle.points",
                    points.len(),
                    "times must be non-decreasing",
                ));
            }
        }
    }
    Ok(())
}

fn check_throttle(field: &str, throttle: f64) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&throttle) {
        Ok(())
    } else {
        Err(invalid(field, throttle, "must be within [0, 1]"))
    }
}
