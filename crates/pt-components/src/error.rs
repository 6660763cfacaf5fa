//! Error types for component construction.

use pt_core::error::PtError;
use thiserror::Error;

/// Errors that can occur while building or checking components.
///
/// Stepping a constructed component never fails; these only surface from
/// constructors and explicit checks.
#[derive(Error, Debug, Clone)]
pub enum ComponentError {
    #[error("Non-physical value: {what}")]
    NonPhysical { what: &'static str },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

pub type ComponentResult<T> = Result<T, ComponentError>;

impl From<PtError> for ComponentError {
    fn from(e: PtError) -> Self {
        match e {
            PtError::NonFinite { what, .. } => ComponentError::NonPhysical { what },
            PtError::InvalidArg { what } => ComponentError::InvalidArg { what },
        }
    }
}

impl From<ComponentError> for PtError {
    fn from(e: ComponentError) -> Self {
        match e {
            ComponentError::NonPhysical { what } => PtError::InvalidArg { what },
            ComponentError::InvalidArg { what } => PtError::InvalidArg { what },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ComponentError::NonPhysical { what: "pressure" };
        assert!(err.to_string().contains("pressure"));
    }

    #[test]
    fn error_conversion() {
        let comp_err = ComponentError::InvalidArg { what: "test" };
        let pt_err: PtError = comp_err.into();
        assert!(matches!(pt_err, PtError::InvalidArg { .. }));

        let back: ComponentError = PtError::NonFinite {
            what: "bore",
            value: f64::NAN,
        }
        .into();
        assert!(matches!(back, ComponentError::NonPhysical { what: "bore" }));
    }
}
