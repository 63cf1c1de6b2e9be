//! Equilibrium residual model.
//!
//! Row blocks: `n` (chemical-potential stationarity, damped), `pi` (element
//! mass balance), `n_moles` (mole sum) and, when temperature is solved for,
//! `T` (enthalpy or entropy closure normalized by its target).

use super::{Closure, EquilibriumInputs, Unknown};
use crate::block::BlockLayout;
use crate::error::{SolverError, SolverResult};
use crate::guarded::{Guarded, checked_ln, ln_or_floor};
use ceq_core::constants::{MIN_VALID_CONCENTRATION, P_REF_BAR, R_UNIVERSAL_ENG};
use ceq_core::smooth_step;
use ceq_thermo::ThermoData;
use nalgebra::DVector;
use tracing::{debug, warn};

/// Sharpness of the residual damping step.
pub const DAMPING_SHARPNESS: f64 = 1e5;

/// Unscaled norm of the `n` residuals below which trace removal switches on.
pub const TRACE_TRIGGER_NORM: f64 = 1e-4;

/// Per-species residual weight for amount `n_j` in a mixture of `n_moles`.
pub fn damping_weight(n_j: f64, n_moles: f64) -> f64 {
    smooth_step(n_j * n_moles, DAMPING_SHARPNESS)
}

/// Species at the concentration floor.
pub fn trace_species(n: &DVector<f64>) -> Vec<usize> {
    n.iter()
        .enumerate()
        .filter(|(_, v)| **v <= MIN_VALID_CONCENTRATION + 1e-20)
        .map(|(j, _)| j)
        .collect()
}

/// Trace-removal switch and the species it retired at the last evaluation.
///
/// The switch is set at the end of one evaluation and applied at the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceState {
    pub enabled: bool,
    pub mask: Vec<usize>,
}

/// A candidate state split into its blocks.
#[derive(Debug, Clone)]
pub struct StateView {
    pub n: DVector<f64>,
    pub pi: DVector<f64>,
    pub n_moles: f64,
    pub t: f64,
}

impl StateView {
    pub fn decode(layout: &BlockLayout<Unknown>, x: &DVector<f64>, inputs: &EquilibriumInputs) -> SolverResult<Self> {
        let missing = || SolverError::invalid("state vector does not match the equilibrium layout");
        if x.len() != layout.len() {
            return Err(missing());
        }
        let n = layout.segment(x, Unknown::N).ok_or_else(missing)?;
        let pi = layout.segment(x, Unknown::Pi).ok_or_else(missing)?;
        let n_moles = x[layout.scalar(Unknown::NMoles).ok_or_else(missing)?];
        let t = match inputs.closure {
            Closure::Temperature(t) => t,
            _ => x[layout.scalar(Unknown::T).ok_or_else(missing)?],
        };
        Ok(Self { n, pi, n_moles, t })
    }

    /// Σ n_j, the mixture moles used inside the chemical potentials.
    pub fn total(&self) -> f64 {
        self.n.sum()
    }
}

/// Entropy sum `Σ n_j (S0_j − ln n_j + ln N − ln(P/P_ref))`, in units of R.
pub fn entropy_sum(n: &DVector<f64>, s0: &DVector<f64>, p_bar: f64) -> SolverResult<f64> {
    let ln_total = checked_ln("total moles", n.sum())?;
    let ln_pr = checked_ln("pressure ratio", p_bar / P_REF_BAR)?;
    n.iter()
        .zip(s0.iter())
        .map(|(nj, s0j)| -> SolverResult<f64> {
            Ok(nj * (s0j - checked_ln("species amount", *nj)? + ln_total - ln_pr))
        })
        .sum()
}

/// Chemical potentials `H0 − S0 + ln n + ln(P/P_ref) − ln N`.
///
/// A degenerate logarithm is replaced by `ln(1e-5)` and reported as a fallback.
pub fn chemical_potentials(
    h0: &DVector<f64>,
    s0: &DVector<f64>,
    n: &DVector<f64>,
    p_bar: f64,
) -> Guarded<DVector<f64>> {
    let mut fallback = false;
    let mut guarded = |x: f64| match ln_or_floor(x) {
        Guarded::Exact(v) => v,
        Guarded::Fallback(v) => {
            fallback = true;
            v
        }
    };
    let ln_pr = guarded(p_bar / P_REF_BAR);
    let ln_total = guarded(n.sum());
    let mu = DVector::from_iterator(
        n.len(),
        (0..n.len()).map(|j| h0[j] - s0[j] + guarded(n[j]) + ln_pr - ln_total),
    );
    if fallback {
        Guarded::Fallback(mu)
    } else {
        Guarded::Exact(mu)
    }
}

/// Evaluate every residual block at `x`, updating `trace` for the next call.
pub fn evaluate(
    thermo: &dyn ThermoData,
    layout: &BlockLayout<Unknown>,
    inputs: &EquilibriumInputs,
    x: &DVector<f64>,
    trace: &mut TraceState,
) -> SolverResult<DVector<f64>> {
    let state = StateView::decode(layout, x, inputs)?;
    let h0 = thermo.h0(state.t)?;
    let s0 = thermo.s0(state.t)?;
    let total = state.total();

    let mu = match chemical_potentials(&h0, &s0, &state.n, inputs.p_bar) {
        Guarded::Exact(mu) => mu,
        Guarded::Fallback(mu) => {
            warn!(
                n = ?state.n.as_slice(),
                p_bar = inputs.p_bar,
                n_moles = total,
                "degenerate chemical potential, substituted ln(1e-5)"
            );
            mu
        }
    };

    let aij = thermo.aij();
    let mut resid_n = (mu - aij.tr_mul(&state.pi))
        .zip_map(&state.n, |r, nj| r * damping_weight(nj, total));

    trace.mask = if trace.enabled {
        trace_species(&state.n)
    } else {
        Vec::new()
    };
    for &j in &trace.mask {
        resid_n[j] = 0.0;
    }

    let mut r = DVector::zeros(layout.len());
    let mut put = |key: Unknown, values: &DVector<f64>| {
        if let Some(range) = layout.range(key) {
            r.rows_mut(range.start, range.len()).copy_from(values);
        }
    };
    put(Unknown::N, &resid_n);
    put(Unknown::Pi, &(aij * &state.n - &inputs.b0));
    put(Unknown::NMoles, &DVector::from_element(1, total - state.n_moles));

    match inputs.closure {
        Closure::Temperature(_) => {}
        Closure::Enthalpy(h) => {
            let h_calc = R_UNIVERSAL_ENG * state.t * state.n.dot(&h0);
            put(Unknown::T, &DVector::from_element(1, (h - h_calc) / h));
        }
        Closure::Entropy(s) => {
            let s_calc = R_UNIVERSAL_ENG * entropy_sum(&state.n, &s0, inputs.p_bar)?;
            put(Unknown::T, &DVector::from_element(1, (s - s_calc) / s));
        }
    }

    let enable = resid_n.norm() < TRACE_TRIGGER_NORM;
    if enable != trace.enabled {
        debug!(enabled = enable, "trace species removal switched");
    }
    trace.enabled = enable;

    Ok(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn weight_limits() {
        assert!(damping_weight(0.0, 0.03).abs() < 1e-15);
        assert!((damping_weight(1e-2, 0.03) - 1.0).abs() < 1e-12);
        assert!(damping_weight(-1.0, 0.03) < -0.999);
        // near the floor the residual is damped hard
        assert!(damping_weight(1e-10, 0.034) < 1e-6);
    }

    #[test]
    fn trace_species_at_floor() {
        let n = DVector::from_vec(vec![1e-10, 2e-10, 0.5, 1e-10 + 5e-21]);
        assert_eq!(trace_species(&n), vec![0, 3]);
    }

    #[test]
    fn chemical_potential_guard() {
        let h0 = DVector::from_vec(vec![1.0, 2.0]);
        let s0 = DVector::from_vec(vec![0.5, 0.5]);
        let n = DVector::from_vec(vec![0.25, 0.75]);
        let mu = chemical_potentials(&h0, &s0, &n, P_REF_BAR);
        assert!(!mu.used_fallback());
        let mu = mu.into_value();
        assert!((mu[0] - (0.5 + 0.25f64.ln())).abs() < 1e-14);

        let degenerate = DVector::from_vec(vec![0.0, 0.75]);
        let mu = chemical_potentials(&h0, &s0, &degenerate, P_REF_BAR);
        assert!(mu.used_fallback());
        assert!(mu.into_value().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn entropy_sum_rejects_non_positive_amounts() {
        let s0 = DVector::from_vec(vec![20.0, 20.0]);
        let n = DVector::from_vec(vec![0.01, 0.0]);
        assert!(matches!(
            entropy_sum(&n, &s0, 1.0),
            Err(SolverError::Domain { .. })
        ));
    }

    proptest! {
        #[test]
        fn weight_is_monotone_and_bounded(a in -1.0f64..1.0, b in -1.0f64..1.0) {
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            let (wl, wh) = (smooth_step(lo, DAMPING_SHARPNESS), smooth_step(hi, DAMPING_SHARPNESS));
            prop_assert!(wl <= wh);
            prop_assert!((-1.0..=1.0).contains(&wl));
            prop_assert!((-1.0..=1.0).contains(&wh));
        }
    }
}
