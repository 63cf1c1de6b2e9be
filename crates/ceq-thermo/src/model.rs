//! The `ThermoData` capability consumed by the solvers, and mixture properties.

use crate::element::Element;
use crate::error::{ThermoError, ThermoResult};
use crate::species::Species;
use ceq_core::constants::{BAR_TO_PA, R_UNIVERSAL_ENG, R_UNIVERSAL_SI};
use ceq_core::units::{Density, Pressure};
use nalgebra::{DMatrix, DVector};

/// Standard-state property source for a fixed, ordered product-species set.
///
/// `h0` returns the dimensionless `H°/(R T)` and `s0` returns `S°/R` for
/// every species; evaluation outside `temperature_range` must fail with
/// `ThermoError::OutOfRange`, never clamp.
///
/// Implementations must be thread-safe (Send + Sync) so that one table can be
/// shared by solver instances running on different threads.
pub trait ThermoData: Send + Sync {
    /// Get the model name (for debugging/logging).
    fn name(&self) -> &str;

    fn species(&self) -> &[Species];

    fn elements(&self) -> &[Element];

    fn num_species(&self) -> usize {
        self.species().len()
    }

    fn num_elements(&self) -> usize {
        self.elements().len()
    }

    /// Stoichiometry matrix `aij[element, species]`.
    fn aij(&self) -> &DMatrix<f64>;

    /// Reference elemental totals [mol/g] used when a caller does not supply `b0`.
    fn b0_reference(&self) -> &DVector<f64>;

    /// Valid temperature range [K] common to every species.
    fn temperature_range(&self) -> (f64, f64);

    fn h0(&self, t: f64) -> ThermoResult<DVector<f64>>;

    fn s0(&self, t: f64) -> ThermoResult<DVector<f64>>;

    fn dh0_dt(&self, t: f64) -> ThermoResult<DVector<f64>>;

    fn ds0_dt(&self, t: f64) -> ThermoResult<DVector<f64>>;

    /// Dimensionless `cp°/R`, derived from `d(T H0)/dT` unless overridden.
    fn cp0(&self, t: f64) -> ThermoResult<DVector<f64>> {
        let h0 = self.h0(t)?;
        let dh0 = self.dh0_dt(t)?;
        Ok(h0 + dh0 * t)
    }

    /// Molar masses [g/mol] in species order.
    fn molar_masses(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.num_species(),
            self.species().iter().map(Species::molar_mass),
        )
    }
}

/// Frozen-composition properties of a mixture `n` [mol/g] at `(T, P)`.
///
/// Enthalpy and entropy are on the same basis as the equilibrium closures
/// (cal/g and cal/(g K)).
#[derive(Clone, Debug, PartialEq)]
pub struct MixtureProperties {
    /// Temperature [K]
    pub t: f64,

    /// Pressure [bar]
    pub p_bar: f64,

    /// Total moles per gram [mol/g]
    pub n_moles: f64,

    /// Specific enthalpy [cal/g]
    pub h: f64,

    /// Specific entropy [cal/(g K)]
    pub s: f64,

    /// Frozen specific heat [cal/(g K)]
    pub cp: f64,

    /// Frozen heat capacity ratio
    pub gamma: f64,

    /// Ideal-gas density [kg/m³]
    pub rho: f64,
}

impl MixtureProperties {
    /// Evaluate the frozen mixture properties of composition `n` at `(t, p_bar)`.
    pub fn evaluate(
        thermo: &dyn ThermoData,
        n: &DVector<f64>,
        t: f64,
        p_bar: f64,
    ) -> ThermoResult<Self> {
        if n.len() != thermo.num_species() {
            return Err(ThermoError::DimensionMismatch {
                what: "species amounts",
                expected: thermo.num_species(),
                actual: n.len(),
            });
        }
        validation::validate_temperature(t)?;
        validation::validate_pressure(p_bar)?;
        if n.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(ThermoError::NonPhysical {
                what: "species amounts must be positive and finite",
            });
        }

        let n_moles = n.sum();
        let h0 = thermo.h0(t)?;
        let s0 = thermo.s0(t)?;
        let cp0 = thermo.cp0(t)?;
        let ln_p = (p_bar / ceq_core::constants::P_REF_BAR).ln();

        let h = R_UNIVERSAL_ENG * t * n.dot(&h0);
        let s = R_UNIVERSAL_ENG
            * n.iter()
                .zip(s0.iter())
                .map(|(nj, s0j)| nj * (s0j - nj.ln() + n_moles.ln() - ln_p))
                .sum::<f64>();
        let cp = R_UNIVERSAL_ENG * n.dot(&cp0);
        let cv = cp - R_UNIVERSAL_ENG * n_moles;
        validation::validate_cp(cv)?;
        let gamma = cp / cv;
        validation::validate_gamma(gamma)?;
        let rho = p_bar * BAR_TO_PA / (R_UNIVERSAL_SI * n_moles * t);

        Ok(Self {
            t,
            p_bar,
            n_moles,
            h,
            s,
            cp,
            gamma,
            rho,
        })
    }

    /// Mixture molar mass [g/mol].
    pub fn molar_mass(&self) -> f64 {
        1.0 / self.n_moles
    }

    pub fn density(&self) -> Density {
        use uom::si::mass_density::kilogram_per_cubic_meter;
        Density::new::<kilogram_per_cubic_meter>(self.rho)
    }

    pub fn pressure(&self) -> Pressure {
        ceq_core::units::bar(self.p_bar)
    }

    /// Frozen speed of sound [m/s].
    pub fn speed_of_sound(&self) -> f64 {
        (self.gamma * R_UNIVERSAL_SI * self.n_moles * self.t).sqrt()
    }

    /// Return a summary string of all contained properties (for debugging).
    pub fn summary(&self) -> String {
        format!(
            "Mix(P={:.4}bar,T={:.2}K,h={:.4}cal/g,S={:.5}cal/g·K,cp={:.5},γ={:.4},ρ={:.4}kg/m³)",
            self.p_bar, self.t, self.h, self.s, self.cp, self.gamma, self.rho
        )
    }
}

/// Validation helpers for thermodynamic properties.
pub(crate) mod validation {
    use super::*;

    /// Ensure pressure [bar] is positive and finite.
    pub fn validate_pressure(p_bar: f64) -> ThermoResult<()> {
        if !p_bar.is_finite() || p_bar <= 0.0 {
            return Err(ThermoError::NonPhysical {
                what: "pressure must be positive and finite",
            });
        }
        Ok(())
    }

    /// Ensure temperature is positive and finite.
    pub fn validate_temperature(t: f64) -> ThermoResult<()> {
        if !t.is_finite() || t <= 0.0 {
            return Err(ThermoError::NonPhysical {
                what: "temperature must be positive and finite",
            });
        }
        Ok(())
    }

    /// Ensure specific heat capacity is positive and finite.
    pub fn validate_cp(cp: f64) -> ThermoResult<()> {
        if !cp.is_finite() || cp <= 0.0 {
            return Err(ThermoError::NonPhysical {
                what: "cp must be positive and finite",
            });
        }
        Ok(())
    }

    /// Ensure gamma (heat capacity ratio) is physically plausible.
    pub fn validate_gamma(gamma: f64) -> ThermoResult<()> {
        if !gamma.is_finite() || gamma < 1.0 {
            return Err(ThermoError::NonPhysical {
                what: "gamma must be >= 1 and finite",
            });
        }
        Ok(())
    }
}
