//! Static-pressure starting estimates.

use super::FlowArea;
use crate::error::{SolverError, SolverResult};
use crate::newton::{Bounds, FnSystem, NewtonConfig, solve};
use ceq_core::constants::{BAR_TO_PA, R_UNIVERSAL_SI};
use nalgebra::{DMatrix, DVector};
use tracing::warn;

/// Isentropic total-to-static pressure [bar] at Mach `mach`.
pub fn isentropic_ps(pt_bar: f64, gamt: f64, mach: f64) -> f64 {
    pt_bar * (1.0 + 0.5 * (gamt - 1.0) * mach * mach).powf(-gamt / (gamt - 1.0))
}

/// Inputs of the area-mode estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaGuessInputs {
    pub pt_bar: f64,
    pub gamt: f64,
    pub mach_guess: f64,
    pub w: f64,
    pub ts: f64,
    pub n_moles: f64,
    pub area: FlowArea,
}

/// Result of the area-mode estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaGuess {
    pub ps_bar: f64,
    pub mach: f64,
    /// False when the coupled solve failed and the closed form was used.
    pub coupled: bool,
}

pub(crate) fn validate_guess(pt_bar: f64, gamt: f64) -> SolverResult<()> {
    if !pt_bar.is_finite() || pt_bar <= 0.0 {
        return Err(SolverError::invalid(format!(
            "guess total pressure must be positive, got {pt_bar}"
        )));
    }
    if !gamt.is_finite() || gamt <= 1.0 {
        return Err(SolverError::invalid(format!(
            "guess total gamma must exceed 1, got {gamt}"
        )));
    }
    Ok(())
}

/// Solve the isentropic pressure relation together with the continuity
/// relation `MN = W sqrt(R Ts) / (Ps A sqrt(gamma))` for `(Ps, MN)`.
///
/// Falls back to the closed-form pressure at the guessed Mach number when the
/// coupled solve fails or the area is unbounded.
pub fn area_mode_guess(inputs: &AreaGuessInputs) -> SolverResult<AreaGuess> {
    validate_guess(inputs.pt_bar, inputs.gamt)?;
    let closed_form = AreaGuess {
        ps_bar: isentropic_ps(inputs.pt_bar, inputs.gamt, inputs.mach_guess),
        mach: inputs.mach_guess,
        coupled: false,
    };
    let FlowArea::Finite(area) = inputs.area else {
        return Ok(closed_form);
    };

    let g = inputs.gamt;
    let pt = inputs.pt_bar;
    let k = 0.5 * (g - 1.0);
    let c = inputs.w * (R_UNIVERSAL_SI * inputs.n_moles * inputs.ts).sqrt() / (BAR_TO_PA * area * g.sqrt());

    let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
        let (ps, mach) = (x[0], x[1]);
        Ok(DVector::from_vec(vec![
            ps - isentropic_ps(pt, g, mach),
            mach - c / ps,
        ]))
    };
    let jacobian = |x: &DVector<f64>| -> SolverResult<DMatrix<f64>> {
        let (ps, mach) = (x[0], x[1]);
        let dps_dm = pt * g * mach * (1.0 + k * mach * mach).powf(-(2.0 * g - 1.0) / (g - 1.0));
        Ok(DMatrix::from_row_slice(2, 2, &[1.0, dps_dm, c / (ps * ps), 1.0]))
    };
    let bounds = Bounds {
        lower: DVector::from_vec(vec![1e-4, 0.0]),
        upper: DVector::from_vec(vec![5e4, f64::INFINITY]),
    };
    let mut system = FnSystem::new(2, residual, jacobian).with_bounds(bounds);
    let config = NewtonConfig {
        max_iterations: 50,
        abs_tol: 1e-12,
        ..NewtonConfig::default()
    };

    match solve(
        &mut system,
        DVector::from_vec(vec![closed_form.ps_bar, closed_form.mach]),
        &config,
    ) {
        Ok(result) if result.x.iter().all(|v| v.is_finite()) => Ok(AreaGuess {
            ps_bar: result.x[0],
            mach: result.x[1],
            coupled: true,
        }),
        outcome => {
            warn!(
                error = ?outcome.err(),
                ps_bar = closed_form.ps_bar,
                "area-mode guess did not converge, using closed-form estimate"
            );
            Ok(closed_form)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isentropic_relation() {
        assert_eq!(isentropic_ps(2.0, 1.4, 0.0), 2.0);
        // Classic p/pt at M = 1, gamma = 1.4
        assert!((isentropic_ps(1.0, 1.4, 1.0) - 0.528_281_8).abs() < 1e-6);
    }

    #[test]
    fn coupled_guess_satisfies_both_relations() {
        let inputs = AreaGuessInputs {
            pt_bar: 2.0,
            gamt: 1.376,
            mach_guess: 0.5,
            w: 10.0,
            ts: 600.0,
            n_moles: 0.034524,
            area: FlowArea::Finite(0.036222),
        };
        let guess = area_mode_guess(&inputs).unwrap();
        assert!(guess.coupled);
        assert!((guess.mach - 0.6414).abs() < 1e-3, "MN = {}", guess.mach);
        assert!((guess.ps_bar - 1.5227).abs() < 1e-3, "Ps = {}", guess.ps_bar);
        assert!((guess.ps_bar - isentropic_ps(2.0, 1.376, guess.mach)).abs() < 1e-10);
    }

    #[test]
    fn unbounded_area_uses_closed_form() {
        let inputs = AreaGuessInputs {
            pt_bar: 1.0,
            gamt: 1.4,
            mach_guess: 0.3,
            w: 1.0,
            ts: 300.0,
            n_moles: 0.0345,
            area: FlowArea::Unbounded,
        };
        let guess = area_mode_guess(&inputs).unwrap();
        assert!(!guess.coupled);
        assert_eq!(guess.mach, 0.3);
    }

    #[test]
    fn invalid_guess_inputs() {
        assert!(validate_guess(0.0, 1.4).is_err());
        assert!(validate_guess(1.0, 1.0).is_err());
        assert!(validate_guess(1.0, 1.3).is_ok());
    }
}
