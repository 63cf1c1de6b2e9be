//! Analytic equilibrium Jacobians against central differences.

use ceq_solver::equilibrium::EquilibriumSystem;
use ceq_solver::equilibrium::residual::TraceState;
use ceq_solver::jacobian::central_difference_jacobian;
use ceq_solver::{ChemEquilibrium, Closure, EquilibriumInputs, EquilibriumMode, ImplicitSystem};
use ceq_thermo::{SpeciesTable, ThermoData};
use nalgebra::{DMatrix, DVector};
use proptest::prelude::*;
use std::sync::Arc;

fn air() -> Arc<dyn ThermoData> {
    Arc::new(SpeciesTable::air().unwrap())
}

fn closure_for(mode: EquilibriumMode, t: f64) -> Closure {
    match mode {
        EquilibriumMode::Temperature => Closure::Temperature(t),
        EquilibriumMode::Enthalpy => Closure::Enthalpy(120.0),
        EquilibriumMode::Entropy => Closure::Entropy(2.1),
    }
}

/// Amounts large enough that the damping weights are saturated.
fn state(eq: &ChemEquilibrium, n: &[f64], pi: &[f64], n_moles: f64, t: f64) -> DVector<f64> {
    let mut x = Vec::with_capacity(eq.layout().len());
    x.extend_from_slice(n);
    x.extend_from_slice(pi);
    x.push(n_moles);
    if eq.mode().solves_temperature() {
        x.push(t);
    }
    DVector::from_vec(x)
}

fn assert_close(analytic: &DMatrix<f64>, fd: &DMatrix<f64>) {
    assert_eq!(analytic.shape(), fd.shape());
    for i in 0..analytic.nrows() {
        for j in 0..analytic.ncols() {
            let (a, f) = (analytic[(i, j)], fd[(i, j)]);
            assert!(
                (a - f).abs() <= 1e-5 * a.abs().max(f.abs()) + 1e-6,
                "entry ({i}, {j}): analytic {a}, fd {f}"
            );
        }
    }
}

fn check(mode: EquilibriumMode, n: &[f64], pi: &[f64], n_moles: f64, t: f64, p_bar: f64) {
    let thermo = air();
    let eq = ChemEquilibrium::new(Arc::clone(&thermo), mode);
    let inputs = EquilibriumInputs::new(thermo.b0_reference().clone(), p_bar, closure_for(mode, t));
    let x = state(&eq, n, pi, n_moles, t);

    let mut system = EquilibriumSystem::new(thermo.as_ref(), eq.layout(), &inputs, TraceState::default());
    let analytic = system.jacobian(&x).unwrap();
    let fd = central_difference_jacobian(&x, |x| system.residuals(x), 1e-6).unwrap();
    assert!(system.trace().mask.is_empty());
    assert_close(&analytic, &fd);
}

#[test]
fn temperature_mode_jacobian() {
    let n = [0.02, 0.011, 0.013, 0.05, 0.03, 0.012, 0.04, 0.017, 0.06];
    let pi = [-12.0, -20.0, -8.5, -15.0];
    check(EquilibriumMode::Temperature, &n, &pi, 0.2, 1800.0, 2.0);
}

#[test]
fn enthalpy_mode_jacobian() {
    let n = [0.02, 0.011, 0.013, 0.05, 0.03, 0.012, 0.04, 0.017, 0.06];
    let pi = [-12.0, -20.0, -8.5, -15.0];
    check(EquilibriumMode::Enthalpy, &n, &pi, 0.25, 2200.0, 0.7);
}

#[test]
fn entropy_mode_jacobian() {
    let n = [0.02, 0.011, 0.013, 0.05, 0.03, 0.012, 0.04, 0.017, 0.06];
    let pi = [-12.0, -20.0, -8.5, -15.0];
    check(EquilibriumMode::Entropy, &n, &pi, 0.25, 2600.0, 5.0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn jacobian_matches_finite_differences(
        n in prop::collection::vec(0.01f64..0.1, 9),
        pi in prop::collection::vec(-30.0f64..5.0, 4),
        n_moles in 0.05f64..1.0,
        t in 1100.0f64..3000.0,
        p_bar in 0.1f64..20.0,
        mode in prop_oneof![
            Just(EquilibriumMode::Temperature),
            Just(EquilibriumMode::Enthalpy),
            Just(EquilibriumMode::Entropy),
        ],
    ) {
        check(mode, &n, &pi, n_moles, t, p_bar);
    }
}
