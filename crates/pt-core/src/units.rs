//! uom unit aliases, constructors and the speed conversions used for
//! telemetry (rpm, mph, horsepower).

use uom::si::f64::{
    AngularVelocity as UomAngularVelocity, Length as UomLength, Power as UomPower,
    Pressure as UomPressure, ThermodynamicTemperature as UomThermodynamicTemperature,
    Velocity as UomVelocity, Volume as UomVolume,
};

// Unit types at the component boundary (SI, f64)
pub type AngularVelocity = UomAngularVelocity;
pub type Length = UomLength;
pub type Power = UomPower;
pub type Pressure = UomPressure;
pub type Temperature = UomThermodynamicTemperature;
pub type Velocity = UomVelocity;
pub type Volume = UomVolume;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn m3(v: f64) -> Volume {
    use uom::si::volume::cubic_meter;
    Volume::new::<cubic_meter>(v)
}

#[inline]
pub fn mps(v: f64) -> Velocity {
    use uom::si::velocity::meter_per_second;
    Velocity::new::<meter_per_second>(v)
}

#[inline]
pub fn rad_per_s(v: f64) -> AngularVelocity {
    use uom::si::angular_velocity::radian_per_second;
    AngularVelocity::new::<radian_per_second>(v)
}

#[inline]
pub fn watts(v: f64) -> Power {
    use uom::si::power::watt;
    Power::new::<watt>(v)
}

/// Angular velocity (rad/s) to revolutions per minute.
#[inline]
pub fn omega_to_rpm(omega_rad_s: f64) -> f64 {
    use uom::si::angular_velocity::revolution_per_minute;
    rad_per_s(omega_rad_s).get::<revolution_per_minute>()
}

/// Linear speed (m/s) to miles per hour.
#[inline]
pub fn mps_to_mph(v_mps: f64) -> f64 {
    use uom::si::velocity::mile_per_hour;
    mps(v_mps).get::<mile_per_hour>()
}

/// Shaft power (W) to mechanical horsepower.
#[inline]
pub fn watts_to_hp(p_w: f64) -> f64 {
    use uom::si::power::horsepower;
    watts(p_w).get::<horsepower>()
}

pub mod constants {
    /// Standard gravity (m/s²)
    pub const G0_MPS2: f64 = 9.806_65;

    /// Universal gas constant (J/(mol·K))
    pub const R_UNIVERSAL: f64 = 8.3145;

    /// Ambient intake temperature (K)
    pub const T_AMBIENT_K: f64 = 293.15;

    /// Atmospheric pressure (Pa)
    pub const P_ATM_PA: f64 = 101_325.0;

    /// Sea-level air density for aerodynamic drag (kg/m³)
    pub const RHO_AIR_SEA_LEVEL: f64 = 1.225;
}
