//! Execution of case runs.

use crate::schema::{Case, RunDef, RunKind, SpacingDef};
use crate::setup::CaseSetup;
use crate::{CaseError, CaseResult};
use ceq_core::units::{bar, k};
use ceq_solver::{
    ChemEquilibrium, Closure, EquilibriumInputs, EquilibriumMode, EquilibriumSolution, EquilibriumStatics,
    FlowArea, FlowTarget, SolverError, StaticFlowResolver, StaticMode, StaticStation, StationTotals,
    SweepDefinition, SweepSpacing, equilibrium_temperature_sweep,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SpeciesAmount {
    pub species: String,
    /// [mol/g]
    pub amount: f64,
    pub mole_fraction: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EquilibriumReport {
    pub id: String,
    pub mode: String,
    pub pressure_bar: f64,
    pub temperature_k: f64,
    pub h_cal_g: f64,
    pub s_cal_g_k: f64,
    pub cp_cal_g_k: f64,
    pub gamma: f64,
    pub rho_kg_m3: f64,
    pub sound_speed_m_s: f64,
    pub molar_mass: f64,
    pub iterations: usize,
    pub residual_norm: f64,
    pub composition: Vec<SpeciesAmount>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StaticFlowReport {
    pub id: String,
    pub mode: String,
    pub pt_bar: f64,
    pub tt_k: f64,
    pub ht_j_kg: f64,
    pub ps_bar: f64,
    pub ts_k: f64,
    pub hs_j_kg: f64,
    pub rho_kg_m3: f64,
    pub mach: f64,
    /// Mach number implied by `ht - hs` at the converged static state.
    pub mach_from_enthalpy: f64,
    pub v_m_s: f64,
    pub vsonic_m_s: f64,
    /// `None` for stagnant flow.
    pub area_m2: Option<f64>,
    pub mass_flow_kg_s: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SweepPoint {
    pub temperature_k: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h_cal_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s_cal_g_k: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SweepReport {
    pub id: String,
    pub pressure_bar: f64,
    pub points: Vec<SweepPoint>,
    pub num_successful: usize,
    pub num_failed: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunReport {
    Equilibrium(EquilibriumReport),
    StaticFlow(StaticFlowReport),
    Sweep(SweepReport),
}

impl RunReport {
    pub fn id(&self) -> &str {
        match self {
            RunReport::Equilibrium(r) => &r.id,
            RunReport::StaticFlow(r) => &r.id,
            RunReport::Sweep(r) => &r.id,
        }
    }
}

/// Run every entry of `case` in order.
///
/// A failed equilibrium or station run aborts the case; failed sweep points
/// are reported in the sweep.
pub fn run_case(case: &Case) -> CaseResult<Vec<RunReport>> {
    let setup = CaseSetup::build(case)?;
    info!(case = %case.name, runs = case.runs.len(), products = setup.thermo.name(), "running case");
    case.runs.iter().map(|run| execute_run(&setup, run)).collect()
}

pub fn execute_run(setup: &CaseSetup, run: &RunDef) -> CaseResult<RunReport> {
    let wrap = |source: SolverError| CaseError::Run {
        id: run.id.clone(),
        source,
    };
    match &run.kind {
        RunKind::Equilibrium {
            mode,
            pressure_bar,
            value,
        } => {
            let mode: EquilibriumMode = mode.parse().map_err(wrap)?;
            let inputs = match mode {
                EquilibriumMode::Temperature => EquilibriumInputs::from_pt(setup.b0.clone(), bar(*pressure_bar), k(*value)),
                EquilibriumMode::Enthalpy => EquilibriumInputs::new(setup.b0.clone(), *pressure_bar, Closure::Enthalpy(*value)),
                EquilibriumMode::Entropy => EquilibriumInputs::new(setup.b0.clone(), *pressure_bar, Closure::Entropy(*value)),
            };
            let mut solver = ChemEquilibrium::new(Arc::clone(&setup.thermo), mode);
            let solution = solver.solve(&inputs).map_err(wrap)?;
            info!(
                run = %run.id,
                %mode,
                iterations = solution.iterations,
                properties = %solution.properties.summary(),
                "equilibrium converged"
            );
            Ok(RunReport::Equilibrium(equilibrium_report(&run.id, mode, &solution)))
        }
        RunKind::StaticFlow {
            mode,
            total,
            mach,
            area_m2,
            mass_flow_kg_s,
        } => {
            let mode: StaticMode = mode.parse().map_err(wrap)?;
            let target = match (mode, mach, area_m2) {
                (StaticMode::Mach, Some(mn), _) => FlowTarget::Mach(*mn),
                (StaticMode::Area, _, Some(area)) => FlowTarget::Area(FlowArea::Finite(*area)),
                _ => {
                    return Err(wrap(SolverError::InvalidInput {
                        what: format!("static_flow in {mode} mode has no matching target"),
                    }));
                }
            };

            let mut totals_solver = ChemEquilibrium::new(Arc::clone(&setup.thermo), EquilibriumMode::Temperature);
            let total_state = totals_solver
                .solve(&EquilibriumInputs::from_pt(
                    setup.b0.clone(),
                    bar(total.pressure_bar),
                    k(total.temperature_k),
                ))
                .map_err(wrap)?;
            let totals = StationTotals::from_equilibrium(&total_state);

            let gas = EquilibriumStatics::isentropic(Arc::clone(&setup.thermo), setup.b0.clone(), &totals);
            let mut station = StaticStation::new(gas, StaticFlowResolver::new(mode));
            let solution = station.solve(&totals, *mass_flow_kg_s, target).map_err(wrap)?;
            info!(run = %run.id, %mode, ps = solution.outputs.ps_bar, mach = solution.outputs.mach, "station converged");

            let out = solution.outputs;
            Ok(RunReport::StaticFlow(StaticFlowReport {
                id: run.id.clone(),
                mode: mode.to_string(),
                pt_bar: totals.pt_bar,
                tt_k: totals.tt,
                ht_j_kg: totals.ht,
                ps_bar: out.ps_bar,
                ts_k: solution.statics.ts,
                hs_j_kg: solution.statics.hs,
                rho_kg_m3: solution.statics.rho,
                mach: out.mach,
                mach_from_enthalpy: solution.from_enthalpy.mach,
                v_m_s: out.v,
                vsonic_m_s: out.vsonic,
                area_m2: match out.area {
                    FlowArea::Finite(a) => Some(a),
                    FlowArea::Unbounded => None,
                },
                mass_flow_kg_s: *mass_flow_kg_s,
                iterations: solution.iterations,
            }))
        }
        RunKind::Sweep {
            pressure_bar,
            temperature,
        } => {
            let spacing = match temperature.spacing {
                SpacingDef::Linear => SweepSpacing::Linear,
                SpacingDef::Log => SweepSpacing::Logarithmic,
            };
            let def = SweepDefinition::new(temperature.start, temperature.end, temperature.points, spacing)
                .map_err(wrap)?;
            let result = equilibrium_temperature_sweep(Arc::clone(&setup.thermo), &setup.b0, *pressure_bar, &def)
                .map_err(wrap)?;
            info!(
                run = %run.id,
                sweep = %def,
                ok = result.num_successful,
                failed = result.num_failed,
                "sweep finished"
            );

            let points = result
                .values
                .iter()
                .zip(&result.outcomes)
                .map(|(t, outcome)| match outcome {
                    Ok(sol) => SweepPoint {
                        temperature_k: *t,
                        h_cal_g: Some(sol.properties.h),
                        s_cal_g_k: Some(sol.properties.s),
                        gamma: Some(sol.properties.gamma),
                        error: None,
                    },
                    Err(err) => SweepPoint {
                        temperature_k: *t,
                        h_cal_g: None,
                        s_cal_g_k: None,
                        gamma: None,
                        error: Some(err.to_string()),
                    },
                })
                .collect();
            Ok(RunReport::Sweep(SweepReport {
                id: run.id.clone(),
                pressure_bar: *pressure_bar,
                points,
                num_successful: result.num_successful,
                num_failed: result.num_failed,
            }))
        }
    }
}

fn equilibrium_report(id: &str, mode: EquilibriumMode, solution: &EquilibriumSolution) -> EquilibriumReport {
    let fractions = solution.mole_fractions();
    let composition = solution
        .species()
        .iter()
        .zip(solution.n.iter().zip(fractions.iter()))
        .map(|(species, (n, x))| SpeciesAmount {
            species: species.key().to_string(),
            amount: *n,
            mole_fraction: *x,
        })
        .collect();
    let p = &solution.properties;
    EquilibriumReport {
        id: id.to_string(),
        mode: mode.to_string(),
        pressure_bar: solution.p_bar,
        temperature_k: solution.t,
        h_cal_g: p.h,
        s_cal_g_k: p.s,
        cp_cal_g_k: p.cp,
        gamma: p.gamma,
        rho_kg_m3: p.rho,
        sound_speed_m_s: p.speed_of_sound(),
        molar_mass: p.molar_mass(),
        iterations: solution.iterations,
        residual_norm: solution.residual_norm,
        composition,
    }
}
