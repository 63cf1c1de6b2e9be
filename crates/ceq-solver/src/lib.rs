//! Chemical-equilibrium and static-flow solvers.
//!
//! This crate provides a bounded, damped Newton driver and two systems built
//! on it: Gibbs-minimization chemical equilibrium at fixed temperature,
//! enthalpy or entropy (`equilibrium`), and the static-flow relations between
//! total and static states (`static_flow`). `station` couples the two to close
//! the static pressure, and `sweep` evaluates many equilibria in parallel.

pub mod block;
pub mod equilibrium;
pub mod error;
pub mod guarded;
pub mod initialization;
pub mod jacobian;
pub mod newton;
pub mod static_flow;
pub mod station;
pub mod sweep;

pub use block::{BlockLayout, BlockMatrix};
pub use equilibrium::{
    ChemEquilibrium, Closure, EquilibriumInputs, EquilibriumMode, EquilibriumSensitivities, EquilibriumSolution,
    InputVar, Unknown,
};
pub use error::{SolverError, SolverResult};
pub use guarded::Guarded;
pub use initialization::{ResetReason, WarmStartPolicy};
pub use newton::{BoundEnforcement, ImplicitSystem, LineSearchConfig, NewtonConfig, NewtonResult};
pub use static_flow::{
    FlowArea, FlowTarget, StaticFlowResolver, StaticGuess, StaticInputs, StaticMode, StaticOutputs, StaticState,
};
pub use station::{EquilibriumStatics, PerfectGasStatics, StaticGasModel, StaticStation, StationSolution, StationTotals};
pub use sweep::{SweepDefinition, SweepResult, SweepSpacing, equilibrium_pressure_sweep, equilibrium_temperature_sweep};
