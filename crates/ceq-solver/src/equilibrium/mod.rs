//! Chemical equilibrium by Gibbs-energy minimization.
//!
//! Unknowns are the species amounts `n` [mol/g], one Lagrange multiplier per
//! element `pi`, the mixture moles `n_moles` and, in enthalpy or entropy
//! mode, the temperature. A `ChemEquilibrium` context owns this state and
//! warm-starts every solve from the previous converged point unless the
//! `WarmStartPolicy` guard discards it.

pub mod jacobian;
pub mod residual;

use crate::block::{BlockLayout, BlockMatrix};
use crate::error::{SolverError, SolverResult};
use crate::initialization::WarmStartPolicy;
use crate::newton::{self, Bounds, ImplicitSystem, NewtonConfig};
use ceq_core::constants::MIN_VALID_CONCENTRATION;
use ceq_core::units::{Pressure, Temperature, to_bar, to_kelvin};
use ceq_thermo::{MixtureProperties, Species, ThermoData};
use nalgebra::{DMatrix, DMatrixView, DVector};
use residual::TraceState;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Residual reference values for the `n`, `pi`, `n_moles` and `T` rows.
const RESIDUAL_REFS: [f64; 4] = [1e4, 1.0, 1.0, 100.0];

/// Named blocks of the equilibrium state (and of the matching residual rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unknown {
    N,
    Pi,
    NMoles,
    T,
}

/// Named blocks of the equilibrium inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputVar {
    B0,
    Pressure,
    /// Temperature, enthalpy or entropy, depending on the mode.
    Closure,
}

/// Which scalar completes the equilibrium system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EquilibriumMode {
    /// Temperature is an input.
    Temperature,
    /// Enthalpy is held; temperature is solved for.
    Enthalpy,
    /// Entropy is held; temperature is solved for.
    Entropy,
}

impl EquilibriumMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquilibriumMode::Temperature => "T",
            EquilibriumMode::Enthalpy => "h",
            EquilibriumMode::Entropy => "S",
        }
    }

    pub fn solves_temperature(&self) -> bool {
        !matches!(self, EquilibriumMode::Temperature)
    }
}

impl fmt::Display for EquilibriumMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EquilibriumMode {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "T" => Ok(EquilibriumMode::Temperature),
            "h" => Ok(EquilibriumMode::Enthalpy),
            "S" => Ok(EquilibriumMode::Entropy),
            other => Err(SolverError::invalid(format!(
                "unknown equilibrium mode '{other}' (expected T, h or S)"
            ))),
        }
    }
}

/// The held closure value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Closure {
    /// Temperature [K]
    Temperature(f64),
    /// Specific enthalpy [cal/g]
    Enthalpy(f64),
    /// Specific entropy [cal/(g K)]
    Entropy(f64),
}

impl Closure {
    pub fn mode(&self) -> EquilibriumMode {
        match self {
            Closure::Temperature(_) => EquilibriumMode::Temperature,
            Closure::Enthalpy(_) => EquilibriumMode::Enthalpy,
            Closure::Entropy(_) => EquilibriumMode::Entropy,
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            Closure::Temperature(v) | Closure::Enthalpy(v) | Closure::Entropy(v) => *v,
        }
    }
}

/// Inputs of one equilibrium solve.
#[derive(Debug, Clone, PartialEq)]
pub struct EquilibriumInputs {
    /// Elemental totals [mol/g], in the thermo table's element order
    pub b0: DVector<f64>,
    /// Pressure [bar]
    pub p_bar: f64,
    pub closure: Closure,
}

impl EquilibriumInputs {
    pub fn new(b0: DVector<f64>, p_bar: f64, closure: Closure) -> Self {
        Self { b0, p_bar, closure }
    }

    /// Temperature-mode inputs from unit-carrying pressure and temperature.
    pub fn from_pt(b0: DVector<f64>, p: Pressure, t: Temperature) -> Self {
        Self::new(b0, to_bar(p), Closure::Temperature(to_kelvin(t)))
    }

    fn validate(&self, thermo: &dyn ThermoData, mode: EquilibriumMode) -> SolverResult<()> {
        if self.b0.len() != thermo.num_elements() {
            return Err(SolverError::invalid(format!(
                "b0 has {} entries, thermo '{}' has {} elements",
                self.b0.len(),
                thermo.name(),
                thermo.num_elements()
            )));
        }
        if self.b0.iter().any(|b| !b.is_finite() || *b < 0.0) {
            return Err(SolverError::invalid("b0 must be finite and non-negative"));
        }
        if !self.p_bar.is_finite() || self.p_bar <= 0.0 {
            return Err(SolverError::invalid(format!(
                "pressure must be positive, got {} bar",
                self.p_bar
            )));
        }
        if self.closure.mode() != mode {
            return Err(SolverError::invalid(format!(
                "{:?} closure given to a solver configured for mode {mode}",
                self.closure
            )));
        }
        let v = self.closure.value();
        if !v.is_finite() || (mode.solves_temperature() && v == 0.0) {
            return Err(SolverError::invalid(format!(
                "closure value {v} is not usable in mode {mode}"
            )));
        }
        Ok(())
    }
}

/// Converged equilibrium state and its frozen mixture properties.
#[derive(Debug, Clone)]
pub struct EquilibriumSolution {
    species: Vec<Species>,
    /// Species amounts [mol/g]
    pub n: DVector<f64>,
    /// Lagrange multipliers per element
    pub pi: DVector<f64>,
    /// Mixture moles [mol/g]
    pub n_moles: f64,
    /// Temperature [K], echoed in temperature mode
    pub t: f64,
    pub p_bar: f64,
    pub iterations: usize,
    pub residual_norm: f64,
    pub properties: MixtureProperties,
}

impl EquilibriumSolution {
    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn amount(&self, species: Species) -> Option<f64> {
        let j = self.species.iter().position(|s| *s == species)?;
        Some(self.n[j])
    }

    pub fn mole_fraction(&self, species: Species) -> Option<f64> {
        self.amount(species).map(|n| n / self.n_moles)
    }

    pub fn mole_fractions(&self) -> DVector<f64> {
        &self.n / self.n_moles
    }
}

/// Derivatives of the converged unknowns w.r.t. the inputs.
#[derive(Debug, Clone)]
pub struct EquilibriumSensitivities {
    matrix: BlockMatrix<Unknown, InputVar>,
}

impl EquilibriumSensitivities {
    /// `d output / d input`, or `None` if the block does not exist in this mode.
    pub fn get(&self, output: Unknown, input: InputVar) -> Option<DMatrixView<'_, f64>> {
        self.matrix.block(output, input)
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        self.matrix.matrix()
    }
}

/// Equilibrium residuals and Jacobian at fixed inputs, as a Newton system.
pub struct EquilibriumSystem<'a> {
    thermo: &'a dyn ThermoData,
    layout: &'a BlockLayout<Unknown>,
    inputs: &'a EquilibriumInputs,
    trace: TraceState,
}

impl<'a> EquilibriumSystem<'a> {
    pub fn new(
        thermo: &'a dyn ThermoData,
        layout: &'a BlockLayout<Unknown>,
        inputs: &'a EquilibriumInputs,
        trace: TraceState,
    ) -> Self {
        Self {
            thermo,
            layout,
            inputs,
            trace,
        }
    }

    pub fn trace(&self) -> &TraceState {
        &self.trace
    }

    pub fn into_trace(self) -> TraceState {
        self.trace
    }
}

impl ImplicitSystem for EquilibriumSystem<'_> {
    fn len(&self) -> usize {
        self.layout.len()
    }

    fn residuals(&mut self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        residual::evaluate(self.thermo, self.layout, self.inputs, x, &mut self.trace)
    }

    fn jacobian(&mut self, x: &DVector<f64>) -> SolverResult<DMatrix<f64>> {
        jacobian::state_jacobian(self.thermo, self.layout, self.inputs, x, &self.trace.mask)
            .map(BlockMatrix::into_matrix)
    }

    fn bounds(&self) -> Option<Bounds> {
        let mut bounds = Bounds::unbounded(self.layout.len());
        let mut set = |key: Unknown, lo: f64, hi: f64| {
            if let Some(range) = self.layout.range(key) {
                for i in range {
                    bounds.lower[i] = lo;
                    bounds.upper[i] = hi;
                }
            }
        };
        set(Unknown::N, MIN_VALID_CONCENTRATION, f64::INFINITY);
        set(Unknown::NMoles, MIN_VALID_CONCENTRATION, f64::INFINITY);
        let (t_lo, t_hi) = self.thermo.temperature_range();
        set(Unknown::T, t_lo, t_hi);
        Some(bounds)
    }

    fn residual_refs(&self) -> Option<DVector<f64>> {
        let mut refs = DVector::from_element(self.layout.len(), 1.0);
        for (key, value) in [Unknown::N, Unknown::Pi, Unknown::NMoles, Unknown::T]
            .into_iter()
            .zip(RESIDUAL_REFS)
        {
            if let Some(range) = self.layout.range(key) {
                refs.rows_mut(range.start, range.len()).fill(value);
            }
        }
        Some(refs)
    }

    fn floored_unknowns(&self) -> Vec<usize> {
        self.layout.range(Unknown::N).map(|r| r.collect()).unwrap_or_default()
    }
}

/// Long-lived equilibrium solver context for one product set and mode.
pub struct ChemEquilibrium {
    thermo: Arc<dyn ThermoData>,
    mode: EquilibriumMode,
    layout: BlockLayout<Unknown>,
    config: NewtonConfig,
    warm_start: WarmStartPolicy,
    n: DVector<f64>,
    pi: DVector<f64>,
    n_moles: f64,
    t: f64,
    trace: TraceState,
    last_norm: Option<f64>,
    converged: Option<EquilibriumInputs>,
}

impl ChemEquilibrium {
    pub fn new(thermo: Arc<dyn ThermoData>, mode: EquilibriumMode) -> Self {
        let num_species = thermo.num_species();
        let num_elements = thermo.num_elements();
        let layout = BlockLayout::new(&[
            (Unknown::N, num_species),
            (Unknown::Pi, num_elements),
            (Unknown::NMoles, 1),
            (Unknown::T, usize::from(mode.solves_temperature())),
        ]);
        Self {
            n: DVector::from_element(num_species, initial_amount(num_species)),
            pi: DVector::from_element(num_elements, 1.0),
            n_moles: 0.034,
            t: 400.0,
            thermo,
            mode,
            layout,
            config: NewtonConfig::default(),
            warm_start: WarmStartPolicy::default(),
            trace: TraceState::default(),
            last_norm: None,
            converged: None,
        }
    }

    /// Configure from a mode name (`"T"`, `"h"` or `"S"`).
    pub fn with_mode_name(thermo: Arc<dyn ThermoData>, mode: &str) -> SolverResult<Self> {
        Ok(Self::new(thermo, mode.parse()?))
    }

    pub fn with_config(mut self, config: NewtonConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_warm_start(mut self, policy: WarmStartPolicy) -> Self {
        self.warm_start = policy;
        self
    }

    pub fn mode(&self) -> EquilibriumMode {
        self.mode
    }

    pub fn thermo(&self) -> &Arc<dyn ThermoData> {
        &self.thermo
    }

    pub fn layout(&self) -> &BlockLayout<Unknown> {
        &self.layout
    }

    pub fn amounts(&self) -> &DVector<f64> {
        &self.n
    }

    pub fn multipliers(&self) -> &DVector<f64> {
        &self.pi
    }

    pub fn n_moles(&self) -> f64 {
        self.n_moles
    }

    pub fn temperature(&self) -> f64 {
        self.t
    }

    /// Scaled residual norm of the last solve, `None` before the first or after a failure.
    pub fn last_residual_norm(&self) -> Option<f64> {
        self.last_norm
    }

    /// Restore the uniform composition guess (and the restart temperature).
    pub fn reset(&mut self) {
        self.n.fill(initial_amount(self.n.len()));
        if self.mode.solves_temperature() {
            self.t = self.warm_start.reset_temperature;
        }
    }

    /// Current state packed in layout order.
    pub fn state_vector(&self) -> DVector<f64> {
        let mut x = DVector::zeros(self.layout.len());
        let parts: [(Unknown, &[f64]); 4] = [
            (Unknown::N, self.n.as_slice()),
            (Unknown::Pi, self.pi.as_slice()),
            (Unknown::NMoles, std::slice::from_ref(&self.n_moles)),
            (Unknown::T, std::slice::from_ref(&self.t)),
        ];
        for (key, values) in parts {
            if let Some(range) = self.layout.range(key) {
                x.rows_mut(range.start, range.len())
                    .copy_from_slice(&values[..range.len()]);
            }
        }
        x
    }

    fn store(&mut self, x: &DVector<f64>) {
        let layout = &self.layout;
        if let Some(n) = layout.segment(x, Unknown::N) {
            self.n = n;
        }
        if let Some(pi) = layout.segment(x, Unknown::Pi) {
            self.pi = pi;
        }
        if let Some(i) = layout.scalar(Unknown::NMoles) {
            self.n_moles = x[i];
        }
        if let Some(i) = layout.scalar(Unknown::T) {
            self.t = x[i];
        }
    }

    /// Solve for the equilibrium state at `inputs`, warm-starting when allowed.
    pub fn solve(&mut self, inputs: &EquilibriumInputs) -> SolverResult<EquilibriumSolution> {
        inputs.validate(self.thermo.as_ref(), self.mode)?;

        if let Some(reason) = self.warm_start.check(self.last_norm, self.n.as_slice()) {
            debug!(reason = reason.as_str(), mode = %self.mode, "resetting equilibrium guess");
            self.reset();
        }

        let x0 = self.state_vector();
        let mut system = EquilibriumSystem::new(
            self.thermo.as_ref(),
            &self.layout,
            inputs,
            std::mem::take(&mut self.trace),
        );
        let outcome = newton::solve(&mut system, x0, &self.config);
        self.trace = system.into_trace();

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                self.last_norm = None;
                self.converged = None;
                return Err(e);
            }
        };

        self.store(&result.x);
        self.last_norm = Some(result.residual_norm);
        if let Closure::Temperature(t) = inputs.closure {
            self.t = t;
        }
        debug!(
            iterations = result.iterations,
            residual_norm = result.residual_norm,
            t = self.t,
            "equilibrium converged"
        );

        let properties = MixtureProperties::evaluate(self.thermo.as_ref(), &self.n, self.t, inputs.p_bar)?;
        self.converged = Some(inputs.clone());

        Ok(EquilibriumSolution {
            species: self.thermo.species().to_vec(),
            n: self.n.clone(),
            pi: self.pi.clone(),
            n_moles: self.n_moles,
            t: self.t,
            p_bar: inputs.p_bar,
            iterations: result.iterations,
            residual_norm: result.residual_norm,
            properties,
        })
    }

    fn converged_inputs(&self) -> SolverResult<&EquilibriumInputs> {
        self.converged
            .as_ref()
            .ok_or_else(|| SolverError::invalid("no converged equilibrium state"))
    }

    /// Residual Jacobian and input partials at the last converged state.
    pub fn partials(&self) -> SolverResult<(BlockMatrix<Unknown, Unknown>, BlockMatrix<Unknown, InputVar>)> {
        let inputs = self.converged_inputs()?;
        let x = self.state_vector();
        let thermo = self.thermo.as_ref();
        let jac = jacobian::state_jacobian(thermo, &self.layout, inputs, &x, &self.trace.mask)?;
        let partials = jacobian::input_partials(thermo, &self.layout, inputs, &x, &self.trace.mask)?;
        Ok((jac, partials))
    }

    /// Total derivatives of the unknowns w.r.t. the inputs: `-J⁻¹ ∂R/∂inputs`.
    pub fn sensitivities(&self) -> SolverResult<EquilibriumSensitivities> {
        let (jac, partials) = self.partials()?;
        let cols = partials.cols().clone();
        let rhs = -partials.into_matrix();
        let solved = jac
            .into_matrix()
            .lu()
            .solve(&rhs)
            .ok_or_else(|| SolverError::Numeric {
                what: "singular equilibrium Jacobian".to_string(),
            })?;
        let matrix = BlockMatrix::from_dense(self.layout.clone(), cols, solved).ok_or_else(|| {
            SolverError::Numeric {
                what: "sensitivity matrix shape mismatch".to_string(),
            }
        })?;
        Ok(EquilibriumSensitivities { matrix })
    }
}

/// Uniform starting amount for `num_species` species.
pub fn initial_amount(num_species: usize) -> f64 {
    1.0 / (10.0 * num_species as f64)
}
