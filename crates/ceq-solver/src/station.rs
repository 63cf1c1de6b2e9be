//! Coupled static station: static pressure closed against a gas model.
//!
//! The static-flow residuals see the static pressure only through the static
//! thermodynamic state. A `StaticGasModel` supplies that state at a trial
//! pressure, and `StaticStation` solves the four static unknowns together.

use crate::equilibrium::{ChemEquilibrium, Closure, EquilibriumInputs, EquilibriumMode, EquilibriumSolution};
use crate::error::{SolverError, SolverResult};
use crate::jacobian::central_difference;
use crate::newton::{self, Bounds, ImplicitSystem, NewtonConfig};
use crate::static_flow::residual::STAGNANT_MACH;
use crate::static_flow::{
    AREA_LOWER_BOUND, ExplicitOutputs, FlowArea, FlowTarget, KnownStaticInputs, MACH_LOWER_BOUND, PS_BOUNDS, RESIDUAL_REFS, StaticFlowResolver, StaticGuess, StaticInputs, StaticOutputs,
    StaticRow, StaticState, StaticVar, explicit_outputs,
};
use ceq_core::constants::{BAR_TO_PA, CAL_PER_G_TO_J_PER_KG, R_UNIVERSAL_SI};
use ceq_thermo::ThermoData;
use nalgebra::{DMatrix, DVector};
use std::sync::Arc;
use tracing::debug;

/// Relative step of the static-pressure derivative of the gas model.
const PS_DERIVATIVE_STEP: f64 = 1e-5;

/// Inner equilibrium tolerance, tight enough to difference across `PS_DERIVATIVE_STEP`.
const STATICS_ABS_TOL: f64 = 1e-12;

/// Static thermodynamic state at a given static pressure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticThermo {
    /// Static temperature [K]
    pub ts: f64,
    /// Static enthalpy [J/kg]
    pub hs: f64,
    /// Mixture moles [mol/g]
    pub n_moles: f64,
    pub gamma: f64,
    /// Density [kg/m³]
    pub rho: f64,
}

impl StaticThermo {
    fn to_vector(self) -> DVector<f64> {
        DVector::from_vec(vec![self.ts, self.hs, self.n_moles, self.gamma, self.rho])
    }
}

/// Source of the static state along the expansion from the total state.
pub trait StaticGasModel {
    fn statics(&mut self, ps_bar: f64) -> SolverResult<StaticThermo>;
}

/// Total (stagnation) conditions of a station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationTotals {
    pub pt_bar: f64,
    /// Total temperature [K]
    pub tt: f64,
    /// Total enthalpy [J/kg]
    pub ht: f64,
    /// Total entropy [cal/(g K)]
    pub st: f64,
    pub n_moles: f64,
    pub gamma: f64,
    pub rho: f64,
}

impl StationTotals {
    /// Totals from a converged equilibrium state.
    pub fn from_equilibrium(solution: &EquilibriumSolution) -> Self {
        let p = &solution.properties;
        Self {
            pt_bar: solution.p_bar,
            tt: solution.t,
            ht: p.h * CAL_PER_G_TO_J_PER_KG,
            st: p.s,
            n_moles: p.n_moles,
            gamma: p.gamma,
            rho: p.rho,
        }
    }
}

/// Static states from an equilibrium expansion at constant entropy.
pub struct EquilibriumStatics {
    solver: ChemEquilibrium,
    b0: DVector<f64>,
    entropy: f64,
}

impl EquilibriumStatics {
    /// Expand at entropy `entropy` [cal/(g K)] with elemental totals `b0`.
    pub fn new(thermo: Arc<dyn ThermoData>, b0: DVector<f64>, entropy: f64) -> Self {
        let config = NewtonConfig {
            abs_tol: STATICS_ABS_TOL,
            rel_tol: 0.0,
            ..NewtonConfig::default()
        };
        Self {
            solver: ChemEquilibrium::new(thermo, EquilibriumMode::Entropy).with_config(config),
            b0,
            entropy,
        }
    }

    pub fn with_config(mut self, config: NewtonConfig) -> Self {
        self.solver = self.solver.with_config(config);
        self
    }

    /// Isentropic expansion from `totals`.
    pub fn isentropic(thermo: Arc<dyn ThermoData>, b0: DVector<f64>, totals: &StationTotals) -> Self {
        Self::new(thermo, b0, totals.st)
    }

    pub fn solver(&self) -> &ChemEquilibrium {
        &self.solver
    }
}

impl StaticGasModel for EquilibriumStatics {
    fn statics(&mut self, ps_bar: f64) -> SolverResult<StaticThermo> {
        let inputs = EquilibriumInputs::new(self.b0.clone(), ps_bar, Closure::Entropy(self.entropy));
        let solution = self.solver.solve(&inputs)?;
        let p = solution.properties;
        Ok(StaticThermo {
            ts: solution.t,
            hs: p.h * CAL_PER_G_TO_J_PER_KG,
            n_moles: p.n_moles,
            gamma: p.gamma,
            rho: p.rho,
        })
    }
}

/// Calorically perfect gas expanding isentropically from fixed totals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerfectGasStatics {
    pub pt_bar: f64,
    pub tt: f64,
    /// Total enthalpy [J/kg]
    pub ht: f64,
    pub gamma: f64,
    pub n_moles: f64,
}

impl PerfectGasStatics {
    pub fn from_totals(totals: &StationTotals) -> Self {
        Self {
            pt_bar: totals.pt_bar,
            tt: totals.tt,
            ht: totals.ht,
            gamma: totals.gamma,
            n_moles: totals.n_moles,
        }
    }
}

impl StaticGasModel for PerfectGasStatics {
    fn statics(&mut self, ps_bar: f64) -> SolverResult<StaticThermo> {
        if ps_bar.is_nan() || ps_bar <= 0.0 {
            return Err(SolverError::Domain {
                what: "perfect-gas statics",
                context: format!("Ps={ps_bar}"),
            });
        }
        let g = self.gamma;
        let ts = self.tt * (ps_bar / self.pt_bar).powf((g - 1.0) / g);
        let r = R_UNIVERSAL_SI * self.n_moles;
        let cp = g * r / (g - 1.0);
        Ok(StaticThermo {
            ts,
            hs: self.ht - cp * (self.tt - ts),
            n_moles: self.n_moles,
            gamma: g,
            rho: ps_bar * BAR_TO_PA / (r * ts),
        })
    }
}

/// Converged station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationSolution {
    pub outputs: StaticOutputs,
    pub statics: StaticThermo,
    /// Outputs recomputed from the enthalpy drop at the converged static state.
    pub from_enthalpy: ExplicitOutputs,
    pub iterations: usize,
    pub residual_norm: f64,
}

/// Static-flow resolver coupled to a gas model.
pub struct StaticStation<G> {
    gas: G,
    resolver: StaticFlowResolver,
    config: NewtonConfig,
    mach_guess: f64,
}

impl<G: StaticGasModel> StaticStation<G> {
    pub fn new(gas: G, resolver: StaticFlowResolver) -> Self {
        Self {
            gas,
            resolver,
            config: NewtonConfig {
                max_iterations: 50,
                abs_tol: 1e-8,
                ..NewtonConfig::default()
            },
            mach_guess: StaticGuess::default().mach,
        }
    }

    pub fn with_config(mut self, config: NewtonConfig) -> Self {
        self.config = config;
        self
    }

    /// Mach number estimate used by the area-mode pressure guess.
    pub fn with_mach_guess(mut self, mach: f64) -> Self {
        self.mach_guess = mach;
        self
    }

    pub fn resolver(&self) -> &StaticFlowResolver {
        &self.resolver
    }

    pub fn gas(&self) -> &G {
        &self.gas
    }

    /// Solve the station for mass flow `w` [kg/s] and the held Mach number or area.
    pub fn solve(&mut self, totals: &StationTotals, w: f64, target: FlowTarget) -> SolverResult<StationSolution> {
        if !w.is_finite() || w < 0.0 {
            return Err(SolverError::invalid(format!("mass flow must be non-negative, got {w}")));
        }
        let guess = StaticGuess {
            gamt: totals.gamma,
            pt_bar: totals.pt_bar,
            mach: self.mach_guess,
        };

        // The pressure guess only needs totals.
        let seed = StaticInputs {
            ts: totals.tt,
            ht: totals.ht,
            hs: totals.ht,
            n_moles: totals.n_moles,
            gamma: totals.gamma,
            w,
            rho: totals.rho,
            target,
            guess,
        };
        self.resolver.guess(&seed)?;

        let ps0 = self.resolver.state().ps_bar;
        let statics = self.gas.statics(ps0)?;
        let start = station_inputs(totals, &statics, w, target, guess);
        self.resolver.update_explicit(&start)?;
        let state = *self.resolver.state();

        let mut system = StationSystem {
            gas: &mut self.gas,
            resolver: &self.resolver,
            totals,
            w,
            target,
            guess,
        };
        let x0 = DVector::from_vec(vec![state.ps_bar, state.v, state.vsonic, state.free]);
        let result = newton::solve(&mut system, x0, &self.config)?;

        let ps_bar = result.x[0];
        let statics = self.gas.statics(ps_bar)?;
        let inputs = station_inputs(totals, &statics, w, target, guess);
        self.resolver.set_state(StaticState {
            ps_bar,
            v: result.x[1],
            vsonic: result.x[2],
            free: result.x[3],
        });
        let outputs = self.resolver.update_explicit(&inputs)?;
        let from_enthalpy = explicit_outputs(&KnownStaticInputs {
            gamma: statics.gamma,
            n_moles: statics.n_moles,
            ts: statics.ts,
            ht: totals.ht,
            hs: statics.hs,
            w,
            rho: statics.rho,
        })?;
        debug!(
            mode = %self.resolver.mode(),
            iterations = result.iterations,
            ps_bar,
            mach = outputs.mach,
            enthalpy_mach = from_enthalpy.mach,
            "static station converged"
        );

        Ok(StationSolution {
            outputs,
            statics,
            from_enthalpy,
            iterations: result.iterations,
            residual_norm: result.residual_norm,
        })
    }
}

fn station_inputs(
    totals: &StationTotals,
    statics: &StaticThermo,
    w: f64,
    target: FlowTarget,
    guess: StaticGuess,
) -> StaticInputs {
    StaticInputs {
        ts: statics.ts,
        ht: totals.ht,
        hs: statics.hs,
        n_moles: statics.n_moles,
        gamma: statics.gamma,
        w,
        rho: statics.rho,
        target,
        guess,
    }
}

struct StationSystem<'a, G> {
    gas: &'a mut G,
    resolver: &'a StaticFlowResolver,
    totals: &'a StationTotals,
    w: f64,
    target: FlowTarget,
    guess: StaticGuess,
}

impl<G: StaticGasModel> StationSystem<'_, G> {
    fn inputs_at(&mut self, ps_bar: f64) -> SolverResult<StaticInputs> {
        let statics = self.gas.statics(ps_bar)?;
        Ok(station_inputs(self.totals, &statics, self.w, self.target, self.guess))
    }
}

fn unpack(x: &DVector<f64>) -> StaticState {
    StaticState {
        ps_bar: x[0],
        v: x[1],
        vsonic: x[2],
        free: x[3],
    }
}

impl<G: StaticGasModel> ImplicitSystem for StationSystem<'_, G> {
    fn len(&self) -> usize {
        4
    }

    fn residuals(&mut self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        let inputs = self.inputs_at(x[0])?;
        let r = self.resolver.residuals(&inputs, Some(&unpack(x)))?;
        Ok(DVector::from_row_slice(&r.to_array()))
    }

    fn jacobian(&mut self, x: &DVector<f64>) -> SolverResult<DMatrix<f64>> {
        let inputs = self.inputs_at(x[0])?;
        let partials = self.resolver.partials(&inputs)?;

        let gas = &mut *self.gas;
        let dstatics = central_difference(
            x[0],
            |ps| gas.statics(ps).map(StaticThermo::to_vector),
            PS_DERIVATIVE_STEP,
        )?;

        let rows = [StaticRow::Ps, StaticRow::V, StaticRow::Vsonic, StaticRow::Free];
        let states = [StaticVar::PsState, StaticVar::VState, StaticVar::VsonicState, StaticVar::FreeState];
        let chained = [StaticVar::Ts, StaticVar::Hs, StaticVar::NMoles, StaticVar::Gamma, StaticVar::Rho];
        let mut jac = DMatrix::zeros(4, 4);
        for (i, row) in rows.into_iter().enumerate() {
            for (j, var) in states.into_iter().enumerate() {
                jac[(i, j)] = partials.get(row, var);
            }
            jac[(i, 0)] += chained
                .into_iter()
                .zip(dstatics.iter())
                .map(|(var, d)| partials.get(row, var) * d)
                .sum::<f64>();
        }
        Ok(jac)
    }

    fn bounds(&self) -> Option<Bounds> {
        let mut bounds = Bounds::unbounded(4);
        bounds.lower[0] = PS_BOUNDS.0;
        bounds.upper[0] = PS_BOUNDS.1;
        // Stagnant flow pins the free unknown at zero (area mode) or leaves it unused.
        if self.w > 0.0 {
            match self.target {
                FlowTarget::Mach(mach) if mach >= STAGNANT_MACH => bounds.lower[3] = AREA_LOWER_BOUND,
                FlowTarget::Area(FlowArea::Finite(_)) => bounds.lower[3] = MACH_LOWER_BOUND,
                _ => {}
            }
        }
        Some(bounds)
    }

    fn residual_refs(&self) -> Option<DVector<f64>> {
        Some(DVector::from_row_slice(&RESIDUAL_REFS))
    }
}
