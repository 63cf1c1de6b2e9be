// ceq-core/src/units.rs

use uom::si::f64::{
    Area as UomArea, MassDensity as UomMassDensity, MassRate as UomMassRate,
    Pressure as UomPressure, ThermodynamicTemperature as UomThermodynamicTemperature,
    Velocity as UomVelocity,
};

// Public canonical unit types (SI, f64)
pub type Area = UomArea;
pub type Density = UomMassDensity;
pub type MassRate = UomMassRate;
pub type Pressure = UomPressure;
pub type Temperature = UomThermodynamicTemperature;
pub type Velocity = UomVelocity;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn bar(v: f64) -> Pressure {
    use uom::si::pressure::bar;
    Pressure::new::<bar>(v)
}

#[inline]
pub fn atm(v: f64) -> Pressure {
    use uom::si::pressure::atmosphere;
    Pressure::new::<atmosphere>(v)
}

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn kgps(v: f64) -> MassRate {
    use uom::si::mass_rate::kilogram_per_second;
    MassRate::new::<kilogram_per_second>(v)
}

#[inline]
pub fn m2(v: f64) -> Area {
    use uom::si::area::square_meter;
    Area::new::<square_meter>(v)
}

/// Pressure in bar, the unit the solvers work in.
#[inline]
pub fn to_bar(p: Pressure) -> f64 {
    use uom::si::pressure::bar;
    p.get::<bar>()
}

#[inline]
pub fn to_kelvin(t: Temperature) -> f64 {
    use uom::si::thermodynamic_temperature::kelvin;
    t.get::<kelvin>()
}

pub mod constants {
    /// Reference pressure of the standard-state properties [bar] (1 atm).
    pub const P_REF_BAR: f64 = 1.013_25;

    /// Universal gas constant [cal/(mol·K)]; pairs with compositions in mol/g.
    pub const R_UNIVERSAL_ENG: f64 = 1.987_203_5;

    /// Universal gas constant [J/(kmol·K)]; pairs with compositions in kmol/kg.
    pub const R_UNIVERSAL_SI: f64 = 8_314.459_8;

    /// Smallest species amount the equilibrium solver carries [mol/g].
    pub const MIN_VALID_CONCENTRATION: f64 = 1e-10;

    /// cal/g -> J/kg
    pub const CAL_PER_G_TO_J_PER_KG: f64 = 4_184.0;

    /// bar -> Pa
    pub const BAR_TO_PA: f64 = 1e5;
}
