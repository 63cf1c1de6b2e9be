//! ceq-case: case file format, validation and execution.
//!
//! A case names a product set, the reactants and a list of runs
//! (equilibrium points, static stations, temperature sweeps). Files are
//! YAML or JSON; both are migrated and validated on load.

pub mod migrate;
pub mod run;
pub mod schema;
pub mod setup;
pub mod validate;

pub use migrate::{LATEST_VERSION, migrate_to_latest};
pub use run::{EquilibriumReport, RunReport, StaticFlowReport, SweepReport, execute_run, run_case};
pub use schema::*;
pub use setup::CaseSetup;
pub use validate::{ValidationError, validate_case};

use ceq_solver::SolverError;
use ceq_thermo::ThermoError;
use std::path::Path;

pub type CaseResult<T> = Result<T, CaseError>;

#[derive(thiserror::Error, Debug)]
pub enum CaseError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("Setup error: {what}")]
    Setup { what: String },

    #[error("Thermo error: {0}")]
    Thermo(#[from] ThermoError),

    #[error("Run '{id}' failed: {source}")]
    Run {
        id: String,
        #[source]
        source: SolverError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn finish_load(case: Case) -> CaseResult<Case> {
    let case = migrate_to_latest(case)?;
    validate_case(&case)?;
    Ok(case)
}

pub fn parse_yaml(content: &str) -> CaseResult<Case> {
    finish_load(serde_yaml::from_str(content)?)
}

pub fn parse_json(content: &str) -> CaseResult<Case> {
    finish_load(serde_json::from_str(content)?)
}

pub fn load_yaml(path: &Path) -> CaseResult<Case> {
    parse_yaml(&std::fs::read_to_string(path)?)
}

pub fn save_yaml(path: &Path, case: &Case) -> CaseResult<()> {
    validate_case(case)?;
    let content = serde_yaml::to_string(case)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> CaseResult<Case> {
    parse_json(&std::fs::read_to_string(path)?)
}

pub fn save_json(path: &Path, case: &Case) -> CaseResult<()> {
    validate_case(case)?;
    let content = serde_json::to_string_pretty(case)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load by extension: `.json` is JSON, anything else YAML.
pub fn load(path: &Path) -> CaseResult<Case> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => load_json(path),
        _ => load_yaml(path),
    }
}
