//! Flow outputs when the static pressure is already known.
//!
//! Velocity comes from the enthalpy drop `V = sqrt(2 |ht - hs|)`. When the
//! static enthalpy exceeds the total (a transient state of an outer solve)
//! the difference is inverted so the relation stays real.

use super::FlowArea;
use super::residual::speed_of_sound;
use crate::error::{SolverError, SolverResult};
use tracing::debug;

/// Inputs of the explicit calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnownStaticInputs {
    pub gamma: f64,
    /// Mixture moles [mol/g]
    pub n_moles: f64,
    /// Static temperature [K]
    pub ts: f64,
    /// Total enthalpy [J/kg]
    pub ht: f64,
    /// Static enthalpy [J/kg]
    pub hs: f64,
    /// Mass flow [kg/s]
    pub w: f64,
    /// Static density [kg/m³]
    pub rho: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplicitOutputs {
    pub mach: f64,
    pub v: f64,
    pub vsonic: f64,
    pub area: FlowArea,
    /// Whether `hs > ht` forced the inverted enthalpy difference.
    pub inverted: bool,
}

/// Partials of the explicit outputs; unlisted pairs are zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExplicitPartials {
    pub dv_dht: f64,
    pub dv_dhs: f64,
    pub dvsonic_dgamma: f64,
    pub dvsonic_dn_moles: f64,
    pub dvsonic_dts: f64,
    pub dmach_dht: f64,
    pub dmach_dhs: f64,
    pub dmach_dgamma: f64,
    pub dmach_dn_moles: f64,
    pub dmach_dts: f64,
    pub darea_dw: f64,
    pub darea_drho: f64,
    pub darea_dht: f64,
    pub darea_dhs: f64,
}

fn velocity(inputs: &KnownStaticInputs) -> (f64, bool) {
    let dh = inputs.ht - inputs.hs;
    if dh >= 0.0 {
        ((2.0 * dh).sqrt(), false)
    } else {
        ((-2.0 * dh).sqrt(), true)
    }
}

/// Mach number, velocity, speed of sound and area at a known static state.
pub fn explicit_outputs(inputs: &KnownStaticInputs) -> SolverResult<ExplicitOutputs> {
    let vsonic = speed_of_sound(inputs.gamma, inputs.n_moles, inputs.ts)?;
    let (v, inverted) = velocity(inputs);
    if inverted {
        debug!(ht = inputs.ht, hs = inputs.hs, "static enthalpy above total, inverting difference");
    }
    if vsonic == 0.0 {
        return Err(SolverError::Domain {
            what: "Mach number",
            context: format!("Vsonic=0 (gamma={}, n_moles={}, Ts={})", inputs.gamma, inputs.n_moles, inputs.ts),
        });
    }
    let area = if v == 0.0 {
        FlowArea::Unbounded
    } else {
        let a = inputs.w / (inputs.rho * v);
        if !a.is_finite() {
            return Err(SolverError::Domain {
                what: "area",
                context: format!("W={}, rho={}, V={v}", inputs.w, inputs.rho),
            });
        }
        FlowArea::Finite(a)
    };
    Ok(ExplicitOutputs {
        mach: v / vsonic,
        v,
        vsonic,
        area,
        inverted,
    })
}

/// Analytic partials of `explicit_outputs`. Undefined at zero velocity.
pub fn explicit_partials(inputs: &KnownStaticInputs) -> SolverResult<ExplicitPartials> {
    let out = explicit_outputs(inputs)?;
    let v = out.v;
    if v == 0.0 {
        return Err(SolverError::Domain {
            what: "explicit static partials",
            context: format!("V=0 (ht={}, hs={})", inputs.ht, inputs.hs),
        });
    }
    let vs = out.vsonic;
    let sign = if out.inverted { -1.0 } else { 1.0 };
    let dv_dht = sign / v;
    let dv_dhs = -sign / v;
    let dvsonic_dgamma = vs / (2.0 * inputs.gamma);
    let dvsonic_dn_moles = vs / (2.0 * inputs.n_moles);
    let dvsonic_dts = vs / (2.0 * inputs.ts);
    let dmach_dvs = -v / (vs * vs);
    let darea_dv = -inputs.w / (inputs.rho * v * v);

    Ok(ExplicitPartials {
        dv_dht,
        dv_dhs,
        dvsonic_dgamma,
        dvsonic_dn_moles,
        dvsonic_dts,
        dmach_dht: dv_dht / vs,
        dmach_dhs: dv_dhs / vs,
        dmach_dgamma: dmach_dvs * dvsonic_dgamma,
        dmach_dn_moles: dmach_dvs * dvsonic_dn_moles,
        dmach_dts: dmach_dvs * dvsonic_dts,
        darea_dw: 1.0 / (inputs.rho * v),
        darea_drho: -inputs.w / (inputs.rho * inputs.rho * v),
        darea_dht: darea_dv * dv_dht,
        darea_dhs: darea_dv * dv_dhs,
    })
}
