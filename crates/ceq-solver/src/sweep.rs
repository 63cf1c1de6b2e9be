//! Parallel equilibrium sweeps.
//!
//! Points are split into contiguous chunks, one per worker. Each chunk owns a
//! `ChemEquilibrium` and walks its points in order, so every point after the
//! first warm-starts from its neighbour. A failed point is recorded and the
//! chunk carries on; the context resets itself after a failure.

use crate::equilibrium::{ChemEquilibrium, Closure, EquilibriumInputs, EquilibriumMode, EquilibriumSolution};
use crate::error::{SolverError, SolverResult};
use ceq_thermo::ThermoData;
use nalgebra::DVector;
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Spacing of the sweep points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepSpacing {
    Linear,
    Logarithmic,
}

impl fmt::Display for SweepSpacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Logarithmic => write!(f, "log"),
        }
    }
}

/// Start, end, point count and spacing of one swept variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepDefinition {
    pub start: f64,
    pub end: f64,
    pub points: usize,
    pub spacing: SweepSpacing,
}

impl SweepDefinition {
    pub fn new(start: f64, end: f64, points: usize, spacing: SweepSpacing) -> SolverResult<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(SolverError::invalid("sweep bounds must be finite"));
        }
        if points < 2 {
            return Err(SolverError::invalid("sweep must have at least 2 points"));
        }
        if (start - end).abs() < 1e-12 {
            return Err(SolverError::invalid("sweep start and end must differ"));
        }
        if spacing == SweepSpacing::Logarithmic && (start <= 0.0 || end <= 0.0) {
            return Err(SolverError::invalid(format!(
                "log sweep needs positive bounds, got {start}..{end}"
            )));
        }
        Ok(Self {
            start,
            end,
            points,
            spacing,
        })
    }

    /// All points, endpoints exact.
    pub fn generate_points(&self) -> Vec<f64> {
        let last = self.points.saturating_sub(1).max(1) as f64;
        let mut points: Vec<f64> = match self.spacing {
            SweepSpacing::Linear => {
                let delta = (self.end - self.start) / last;
                (0..self.points).map(|i| self.start + i as f64 * delta).collect()
            }
            SweepSpacing::Logarithmic => {
                let (a, b) = (self.start.ln(), self.end.ln());
                let delta = (b - a) / last;
                (0..self.points).map(|i| (a + i as f64 * delta).exp()).collect()
            }
        };
        if let Some(p) = points.last_mut() {
            *p = self.end;
        }
        points
    }
}

impl fmt::Display for SweepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {} ({} points, {})",
            self.start, self.end, self.points, self.spacing
        )
    }
}

/// Which variable a sweep moved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SweptVariable {
    /// Temperature [K] at the fixed pressure [bar]
    Temperature { p_bar: f64 },
    /// Pressure [bar] at the fixed temperature [K]
    Pressure { t: f64 },
}

/// Outcome of every point of a sweep, in point order.
#[derive(Debug, Clone)]
pub struct SweepResult {
    pub variable: SweptVariable,
    pub values: Vec<f64>,
    pub outcomes: Vec<SolverResult<EquilibriumSolution>>,
    pub num_successful: usize,
    pub num_failed: usize,
}

impl SweepResult {
    fn new(variable: SweptVariable, values: Vec<f64>, outcomes: Vec<SolverResult<EquilibriumSolution>>) -> Self {
        let num_successful = outcomes.iter().filter(|o| o.is_ok()).count();
        let num_failed = outcomes.len() - num_successful;
        Self {
            variable,
            values,
            outcomes,
            num_successful,
            num_failed,
        }
    }

    /// `(swept value, solution)` for the converged points.
    pub fn successful(&self) -> impl Iterator<Item = (f64, &EquilibriumSolution)> + '_ {
        self.values
            .iter()
            .zip(&self.outcomes)
            .filter_map(|(v, o)| o.as_ref().ok().map(|s| (*v, s)))
    }

    /// `(swept value, error)` for the failed points.
    pub fn failures(&self) -> impl Iterator<Item = (f64, &SolverError)> + '_ {
        self.values
            .iter()
            .zip(&self.outcomes)
            .filter_map(|(v, o)| o.as_ref().err().map(|e| (*v, e)))
    }

    /// Mixture enthalpy [cal/g] of the converged points.
    pub fn enthalpy(&self) -> Vec<f64> {
        self.successful().map(|(_, s)| s.properties.h).collect()
    }

    /// Mixture entropy [cal/(g K)] of the converged points.
    pub fn entropy(&self) -> Vec<f64> {
        self.successful().map(|(_, s)| s.properties.s).collect()
    }
}

/// Temperature-mode equilibria over `definition` [K] at `p_bar`.
pub fn equilibrium_temperature_sweep(
    thermo: Arc<dyn ThermoData>,
    b0: &DVector<f64>,
    p_bar: f64,
    definition: &SweepDefinition,
) -> SolverResult<SweepResult> {
    check_b0(thermo.as_ref(), b0)?;
    let values = definition.generate_points();
    let outcomes = run_chunks(&thermo, &values, |t| {
        EquilibriumInputs::new(b0.clone(), p_bar, Closure::Temperature(t))
    });
    Ok(SweepResult::new(SweptVariable::Temperature { p_bar }, values, outcomes))
}

/// Temperature-mode equilibria over `definition` [bar] at temperature `t`.
pub fn equilibrium_pressure_sweep(
    thermo: Arc<dyn ThermoData>,
    b0: &DVector<f64>,
    t: f64,
    definition: &SweepDefinition,
) -> SolverResult<SweepResult> {
    check_b0(thermo.as_ref(), b0)?;
    let values = definition.generate_points();
    let outcomes = run_chunks(&thermo, &values, |p_bar| {
        EquilibriumInputs::new(b0.clone(), p_bar, Closure::Temperature(t))
    });
    Ok(SweepResult::new(SweptVariable::Pressure { t }, values, outcomes))
}

fn check_b0(thermo: &dyn ThermoData, b0: &DVector<f64>) -> SolverResult<()> {
    if b0.len() != thermo.num_elements() {
        return Err(SolverError::invalid(format!(
            "b0 has {} entries, thermo '{}' has {} elements",
            b0.len(),
            thermo.name(),
            thermo.num_elements()
        )));
    }
    Ok(())
}

fn run_chunks<F>(thermo: &Arc<dyn ThermoData>, values: &[f64], inputs_for: F) -> Vec<SolverResult<EquilibriumSolution>>
where
    F: Fn(f64) -> EquilibriumInputs + Sync,
{
    let chunk_len = values.len().div_ceil(rayon::current_num_threads()).max(1);
    debug!(points = values.len(), chunk_len, "running equilibrium sweep");
    values
        .par_chunks(chunk_len)
        .flat_map_iter(|chunk| {
            let mut solver = ChemEquilibrium::new(Arc::clone(thermo), EquilibriumMode::Temperature);
            chunk
                .iter()
                .map(|v| solver.solve(&inputs_for(*v)))
                .collect::<Vec<_>>()
        })
        .collect()
}
