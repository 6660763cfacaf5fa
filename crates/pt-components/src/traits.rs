//! Core traits for drivetrain components.

/// A lumped rotating inertia in the drivetrain.
///
/// Every stage between the crankshaft and the wheels carries angular velocity
/// and a moment of inertia. The integrator uses this to total the stored
/// kinetic energy without knowing each component's internals.
pub trait RotatingBody {
    /// Component name for debugging and identification.
    fn name(&self) -> &str;

    /// Angular velocity (rad/s)
    fn omega(&self) -> f64;

    /// Moment of inertia about the rotation axis (kg·m²)
    fn moment(&self) -> f64;

    /// Rotational kinetic energy (J).
    ///
    /// ```text
    /// E = ½·I·ω²
    /// ```
    fn kinetic_energy(&self) -> f64 {
        0.5 * self.moment() * self.omega() * self.omega()
    }
}
