//! Analytic derivatives of the equilibrium residuals.
//!
//! The damping weights are treated as constants: their derivative multiplies
//! the undamped residual, which vanishes at the solution.

use super::residual::{StateView, damping_weight, entropy_sum};
use super::{Closure, EquilibriumInputs, InputVar, Unknown};
use crate::block::{BlockLayout, BlockMatrix};
use crate::error::SolverResult;
use crate::guarded::checked_ln;
use ceq_core::constants::{P_REF_BAR, R_UNIVERSAL_ENG};
use ceq_thermo::ThermoData;
use nalgebra::{DMatrix, DVector};

/// Column layout of the input partials.
pub fn input_layout(num_elements: usize) -> BlockLayout<InputVar> {
    BlockLayout::new(&[
        (InputVar::B0, num_elements),
        (InputVar::Pressure, 1),
        (InputVar::Closure, 1),
    ])
}

fn weights(state: &StateView) -> DVector<f64> {
    let total = state.total();
    state.n.map(|nj| damping_weight(nj, total))
}

/// Jacobian of the residuals w.r.t. the unknowns.
///
/// `mask` lists the species retired at the most recent residual evaluation;
/// their rows and columns become identity.
pub fn state_jacobian(
    thermo: &dyn ThermoData,
    layout: &BlockLayout<Unknown>,
    inputs: &EquilibriumInputs,
    x: &DVector<f64>,
    mask: &[usize],
) -> SolverResult<BlockMatrix<Unknown, Unknown>> {
    let state = StateView::decode(layout, x, inputs)?;
    let num_species = state.n.len();
    let total = state.total();
    let w = weights(&state);
    let aij = thermo.aij();

    let mut jac = BlockMatrix::zeros(layout.clone(), layout.clone());

    if let Some(mut b) = jac.block_mut(Unknown::N, Unknown::N) {
        for j in 0..num_species {
            for k in 0..num_species {
                let diag = if j == k { 1.0 / state.n[j] } else { 0.0 };
                b[(j, k)] = (diag - 1.0 / total) * w[j];
            }
        }
    }
    if let Some(mut b) = jac.block_mut(Unknown::N, Unknown::Pi) {
        b.copy_from(&(-aij.transpose()));
        for (j, mut row) in b.row_iter_mut().enumerate() {
            row *= w[j];
        }
    }
    if let Some(mut b) = jac.block_mut(Unknown::Pi, Unknown::N) {
        b.copy_from(aij);
    }
    if let Some(mut b) = jac.block_mut(Unknown::NMoles, Unknown::N) {
        b.fill(1.0);
    }
    if let Some(mut b) = jac.block_mut(Unknown::NMoles, Unknown::NMoles) {
        b.fill(-1.0);
    }

    if layout.contains(Unknown::T) {
        let t = state.t;
        let dh0 = thermo.dh0_dt(t)?;
        let ds0 = thermo.ds0_dt(t)?;
        if let Some(mut b) = jac.block_mut(Unknown::N, Unknown::T) {
            b.set_column(0, &(&dh0 - &ds0).component_mul(&w));
        }

        let (row, diag) = closure_row(thermo, inputs, &state, &dh0, &ds0)?;
        if let Some(mut b) = jac.block_mut(Unknown::T, Unknown::N) {
            b.set_row(0, &row.transpose());
        }
        if let Some(mut b) = jac.block_mut(Unknown::T, Unknown::T) {
            b[(0, 0)] = diag;
        }
    }

    for &j in mask {
        jac.freeze(Unknown::N, j);
    }

    Ok(jac)
}

/// Closure-row derivatives w.r.t. `n` and `T`.
fn closure_row(
    thermo: &dyn ThermoData,
    inputs: &EquilibriumInputs,
    state: &StateView,
    dh0: &DVector<f64>,
    ds0: &DVector<f64>,
) -> SolverResult<(DVector<f64>, f64)> {
    let t = state.t;
    let n = &state.n;
    match inputs.closure {
        Closure::Enthalpy(h) => {
            let h0 = thermo.h0(t)?;
            let row = &h0 * (-R_UNIVERSAL_ENG * t / h);
            let diag = -R_UNIVERSAL_ENG * (t * n.dot(dh0) + n.dot(&h0)) / h;
            Ok((row, diag))
        }
        Closure::Entropy(s) => {
            let s0 = thermo.s0(t)?;
            let ln_total = checked_ln("total moles", state.total())?;
            let ln_pr = checked_ln("pressure ratio", inputs.p_bar / P_REF_BAR)?;
            let mut row = DVector::zeros(n.len());
            for j in 0..n.len() {
                let ln_n = checked_ln("species amount", n[j])?;
                row[j] = -R_UNIVERSAL_ENG * (s0[j] - ln_n + ln_total - ln_pr) / s;
            }
            let diag = -R_UNIVERSAL_ENG * n.dot(ds0) / s;
            Ok((row, diag))
        }
        // No closure row when temperature is an input.
        Closure::Temperature(_) => Ok((DVector::zeros(n.len()), 0.0)),
    }
}

/// Partials of the residuals w.r.t. the inputs `(b0, P, closure)`.
///
/// The closure column is `∂R/∂T` when temperature is an input, otherwise
/// `∂R/∂h` or `∂R/∂S`.
pub fn input_partials(
    thermo: &dyn ThermoData,
    layout: &BlockLayout<Unknown>,
    inputs: &EquilibriumInputs,
    x: &DVector<f64>,
    mask: &[usize],
) -> SolverResult<BlockMatrix<Unknown, InputVar>> {
    let state = StateView::decode(layout, x, inputs)?;
    let w = weights(&state);
    let p = inputs.p_bar;
    let mut partials = BlockMatrix::zeros(layout.clone(), input_layout(thermo.num_elements()));

    let mut dn_dp = &w / p;
    let mut dn_dclosure = match inputs.closure {
        Closure::Temperature(t) => (thermo.dh0_dt(t)? - thermo.ds0_dt(t)?).component_mul(&w),
        _ => DVector::zeros(w.len()),
    };
    for &j in mask {
        dn_dp[j] = 0.0;
        dn_dclosure[j] = 0.0;
    }
    if let Some(mut b) = partials.block_mut(Unknown::N, InputVar::Pressure) {
        b.set_column(0, &dn_dp);
    }
    if let Some(mut b) = partials.block_mut(Unknown::N, InputVar::Closure) {
        b.set_column(0, &dn_dclosure);
    }
    if let Some(mut b) = partials.block_mut(Unknown::Pi, InputVar::B0) {
        b.copy_from(&(-DMatrix::identity(thermo.num_elements(), thermo.num_elements())));
    }

    match inputs.closure {
        Closure::Temperature(_) => {}
        Closure::Enthalpy(h) => {
            let h_calc = R_UNIVERSAL_ENG * state.t * state.n.dot(&thermo.h0(state.t)?);
            if let Some(mut b) = partials.block_mut(Unknown::T, InputVar::Closure) {
                b[(0, 0)] = h_calc / (h * h);
            }
        }
        Closure::Entropy(s) => {
            let s_calc = R_UNIVERSAL_ENG * entropy_sum(&state.n, &thermo.s0(state.t)?, p)?;
            if let Some(mut b) = partials.block_mut(Unknown::T, InputVar::Closure) {
                b[(0, 0)] = s_calc / (s * s);
            }
            if let Some(mut b) = partials.block_mut(Unknown::T, InputVar::Pressure) {
                b[(0, 0)] = R_UNIVERSAL_ENG * state.total() / (p * s);
            }
        }
    }

    Ok(partials)
}
