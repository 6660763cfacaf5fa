//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered while building or running a simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Component error: {0}")]
    Component(#[from] pt_components::ComponentError),

    #[error("Core error: {0}")]
    Core(#[from] pt_core::PtError),
}

pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_error_converts() {
        let err: SimError = pt_components::ComponentError::InvalidArg { what: "bore" }.into();
        assert!(matches!(err, SimError::Component(_)));
        assert!(err.to_string().contains("bore"));
    }
}
