//! NASA 7-coefficient polynomial fits for ideal-gas standard-state properties.
//!
//! Each fit has two temperature pieces joined at `t_mid`:
//!
//! ```text
//! cp/R   = a1 + a2 T + a3 T^2 + a4 T^3 + a5 T^4
//! H/(RT) = a1 + a2 T/2 + a3 T^2/3 + a4 T^3/4 + a5 T^4/5 + a6/T
//! S/R    = a1 ln T + a2 T + a3 T^2/2 + a4 T^3/3 + a5 T^4/4 + a7
//! ```
//!
//! Evaluation outside `[t_low, t_high]` is an error, never a clamp.

use crate::error::{ThermoError, ThermoResult};

/// Two-range NASA-7 polynomial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nasa7 {
    pub t_low: f64,
    pub t_mid: f64,
    pub t_high: f64,
    /// Coefficients for `t_low <= T < t_mid`.
    pub low: [f64; 7],
    /// Coefficients for `t_mid <= T <= t_high`.
    pub high: [f64; 7],
}

/// Every standard-state quantity of one species at one temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nasa7Point {
    pub cp_r: f64,
    pub h_rt: f64,
    pub s_r: f64,
    pub dh_rt_dt: f64,
    pub ds_r_dt: f64,
}

impl Nasa7 {
    pub const fn new(t_low: f64, t_mid: f64, t_high: f64, low: [f64; 7], high: [f64; 7]) -> Self {
        Self {
            t_low,
            t_mid,
            t_high,
            low,
            high,
        }
    }

    /// Fit with a single coefficient set over the whole range (monatomic gases).
    pub const fn uniform(t_low: f64, t_high: f64, coeffs: [f64; 7]) -> Self {
        Self::new(t_low, t_high, t_high, coeffs, coeffs)
    }

    pub fn range(&self) -> (f64, f64) {
        (self.t_low, self.t_high)
    }

    fn coeffs(&self, t: f64) -> ThermoResult<&[f64; 7]> {
        if !t.is_finite() || t < self.t_low || t > self.t_high {
            return Err(ThermoError::OutOfRange {
                what: "temperature",
                value: t,
                min: self.t_low,
                max: self.t_high,
            });
        }
        Ok(if t < self.t_mid { &self.low } else { &self.high })
    }

    /// Dimensionless heat capacity `cp/R`.
    pub fn cp_r(&self, t: f64) -> ThermoResult<f64> {
        let a = self.coeffs(t)?;
        Ok(a[0] + t * (a[1] + t * (a[2] + t * (a[3] + t * a[4]))))
    }

    /// Dimensionless enthalpy `H/(RT)`.
    pub fn h_rt(&self, t: f64) -> ThermoResult<f64> {
        let a = self.coeffs(t)?;
        Ok(a[0]
            + t * (a[1] / 2.0 + t * (a[2] / 3.0 + t * (a[3] / 4.0 + t * a[4] / 5.0)))
            + a[5] / t)
    }

    /// Dimensionless entropy `S/R`.
    pub fn s_r(&self, t: f64) -> ThermoResult<f64> {
        let a = self.coeffs(t)?;
        Ok(a[0] * t.ln()
            + t * (a[1] + t * (a[2] / 2.0 + t * (a[3] / 3.0 + t * a[4] / 4.0)))
            + a[6])
    }

    /// `d(H/RT)/dT`.
    pub fn dh_rt_dt(&self, t: f64) -> ThermoResult<f64> {
        let a = self.coeffs(t)?;
        Ok(a[1] / 2.0
            + t * (2.0 * a[2] / 3.0 + t * (3.0 * a[3] / 4.0 + t * 4.0 * a[4] / 5.0))
            - a[5] / (t * t))
    }

    /// `d(S/R)/dT`, which equals `cp/(R T)`.
    pub fn ds_r_dt(&self, t: f64) -> ThermoResult<f64> {
        Ok(self.cp_r(t)? / t)
    }

    pub fn eval(&self, t: f64) -> ThermoResult<Nasa7Point> {
        Ok(Nasa7Point {
            cp_r: self.cp_r(t)?,
            h_rt: self.h_rt(t)?,
            s_r: self.s_r(t)?,
            dh_rt_dt: self.dh_rt_dt(t)?,
            ds_r_dt: self.ds_r_dt(t)?,
        })
    }
}
