//! pt-components: component library for the powertrain simulation.
//!
//! Provides models for the drivetrain stages, leaf first:
//! - Cylinders with a four-stroke combustion cycle
//! - A crankshaft that owns the cylinders and integrates their torque
//! - A slip-coupled torque converter with lockup
//! - A stepped transmission with a timed shift state machine
//! - A wheel axle with rolling resistance and aerodynamic drag
//!
//! Components are advanced by the caller once per fixed time step and expose
//! plain numeric state for the integrator to copy between stages.
//!
//! # Example
//!
//! ```no_run
//! use pt_components::{Crankshaft, EngineConfig};
//!
//! let mut engine = Crankshaft::new(&EngineConfig::default()).unwrap();
//! engine.set_omega(50.0);
//! for _ in 0..1000 {
//!     engine.step(0.5, 0.0, 1.5e-4);
//! }
//! println!("Engine speed: {:.0} rpm", engine.rpm());
//! ```

pub mod common;
pub mod crankshaft;
pub mod cylinder;
pub mod error;
pub mod intake;
pub mod torque_converter;
pub mod traits;
pub mod transmission;
pub mod wheel_axle;

// Re-exports
pub use crankshaft::{Crankshaft, EngineConfig, EngineLayout};
pub use cylinder::{
    CombustionModel, Cylinder, CylinderGeometry, GasCharge, Stroke, StrokeInput, Transition,
};
pub use error::{ComponentError, ComponentResult};
pub use intake::IntakeCurve;
pub use torque_converter::{TorqueConverter, TorqueConverterConfig};
pub use traits::RotatingBody;
pub use transmission::{
    ShiftDirection, ShiftPoint, ShiftSchedule, ShiftState, Transmission, TransmissionConfig,
};
pub use wheel_axle::{WheelAxle, WheelAxleConfig};
