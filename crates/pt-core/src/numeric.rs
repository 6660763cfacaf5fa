//! Float checks shared by the component constructors and the run driver.

use crate::PtError;

/// Bounds for [`nearly_equal`]: a difference passes if it is within `abs`,
/// or within `rel` times the larger magnitude.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: f64,
    pub rel: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: f64, b: f64, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    diff <= tol.abs || diff <= tol.rel * a.abs().max(b.abs())
}

/// Accept a finite, strictly positive value.
pub fn ensure_positive(v: f64, what: &'static str) -> Result<f64, PtError> {
    if !v.is_finite() {
        return Err(PtError::NonFinite { what, value: v });
    }
    if v > 0.0 {
        Ok(v)
    } else {
        Err(PtError::InvalidArg { what })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn nearly_equal_is_symmetric(a in -1e6f64..1e6, b in -1e6f64..1e6) {
            let tol = Tolerances::default();
            prop_assert_eq!(nearly_equal(a, b, tol), nearly_equal(b, a, tol));
        }
    }
}
