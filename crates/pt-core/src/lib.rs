//! pt-core: stable foundation for the powertrain simulation.
//!
//! Contains:
//! - units (uom SI types + constructors + rpm/mph conversions)
//! - numeric (tolerant comparison + finite/positive checks)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{PtError, PtResult};
pub use numeric::*;
pub use units::*;
