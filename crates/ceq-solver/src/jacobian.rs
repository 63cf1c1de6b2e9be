//! Finite difference Jacobians, used to cross-check the analytic ones.

use crate::error::SolverResult;
use nalgebra::{DMatrix, DVector};

/// Compute Jacobian using forward finite differences.
///
/// For each column j, perturbs x[j] by epsilon and computes (f(x+e) - f(x))/epsilon.
pub fn finite_difference_jacobian<F>(
    x: &DVector<f64>,
    mut f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: FnMut(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let f_x = f(x)?;
    let mut jac = DMatrix::zeros(f_x.len(), x.len());

    for j in 0..x.len() {
        let dx = step_size(x[j], epsilon);
        let mut x_plus = x.clone();
        x_plus[j] += dx;
        let df = (f(&x_plus)? - &f_x) / dx;
        jac.set_column(j, &df);
    }

    Ok(jac)
}

/// Compute Jacobian using central finite differences (more accurate but 2x cost).
pub fn central_difference_jacobian<F>(
    x: &DVector<f64>,
    mut f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: FnMut(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let mut jac: Option<DMatrix<f64>> = None;

    for j in 0..x.len() {
        let dx = step_size(x[j], epsilon);

        let mut x_plus = x.clone();
        x_plus[j] += dx;
        let f_plus = f(&x_plus)?;

        let mut x_minus = x.clone();
        x_minus[j] -= dx;
        let f_minus = f(&x_minus)?;

        let df = (f_plus - f_minus) / (2.0 * dx);
        jac.get_or_insert_with(|| DMatrix::zeros(df.len(), x.len()))
            .set_column(j, &df);
    }

    Ok(jac.unwrap_or_else(|| DMatrix::zeros(0, 0)))
}

/// Central derivative of a scalar-input vector function.
pub fn central_difference<F>(x: f64, mut f: F, epsilon: f64) -> SolverResult<DVector<f64>>
where
    F: FnMut(f64) -> SolverResult<DVector<f64>>,
{
    let dx = step_size(x, epsilon);
    let f_plus = f(x + dx)?;
    let f_minus = f(x - dx)?;
    Ok((f_plus - f_minus) / (2.0 * dx))
}

/// Relative step with an absolute floor of `epsilon` for small magnitudes.
///
/// Amounts near the concentration floor need a step proportional to the value,
/// so the floor is taken relative to `|x|` only when `|x| >= 1`.
fn step_size(x: f64, epsilon: f64) -> f64 {
    if x.abs() >= 1.0 || x == 0.0 {
        epsilon * x.abs().max(1.0)
    } else {
        epsilon * x.abs()
    }
}
