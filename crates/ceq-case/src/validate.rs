//! Case validation logic.

use crate::schema::{Case, RangeDef, ReactantsDef, RunDef, RunKind, SpacingDef, TotalStateDef};
use ceq_solver::{EquilibriumMode, StaticMode};
use ceq_thermo::{Element, ProductSet, Species, lookup_species};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Unknown name: {name} in {context}")]
    UnknownName { name: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn require_positive(field: String, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(field, value, "must be finite and positive"));
    }
    Ok(())
}

pub fn validate_case(case: &Case) -> Result<(), ValidationError> {
    if case.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: case.version,
        });
    }

    let products = ProductSet::by_name(&case.products).map_err(|_| ValidationError::UnknownName {
        name: case.products.clone(),
        context: "products".to_string(),
    })?;
    validate_reactants(&case.reactants, &products)?;

    let mut run_ids = HashSet::new();
    for run in &case.runs {
        if !run_ids.insert(&run.id) {
            return Err(ValidationError::DuplicateId {
                id: run.id.clone(),
                context: "runs".to_string(),
            });
        }
        validate_run(run)?;
    }
    Ok(())
}

fn carried_by(products: &ProductSet, element: Element) -> bool {
    products.species().iter().any(|s| s.atom_count(element) > 0)
}

fn validate_reactants(reactants: &ReactantsDef, products: &ProductSet) -> Result<(), ValidationError> {
    match reactants {
        ReactantsDef::DryAir => Ok(()),
        ReactantsDef::Mixture { fractions } => {
            if fractions.is_empty() {
                return Err(invalid("reactants.fractions", "[]", "mixture needs at least one species"));
            }
            let mut seen: HashSet<Species> = HashSet::new();
            let mut total = 0.0;
            for (name, x) in fractions {
                let species = lookup_species(name).map_err(|_| ValidationError::UnknownName {
                    name: name.clone(),
                    context: "reactants.fractions".to_string(),
                })?;
                if !seen.insert(species) {
                    return Err(ValidationError::DuplicateId {
                        id: name.clone(),
                        context: "reactants.fractions".to_string(),
                    });
                }
                if !x.is_finite() || *x < 0.0 {
                    return Err(invalid(format!("reactants.fractions.{name}"), x, "must be finite and non-negative"));
                }
                if let Some((element, _)) = species
                    .atoms()
                    .iter()
                    .find(|(e, _)| !carried_by(products, *e))
                {
                    return Err(invalid(
                        format!("reactants.fractions.{name}"),
                        element,
                        "element not carried by any product species",
                    ));
                }
                total += x;
            }
            if total <= 0.0 {
                return Err(invalid("reactants.fractions", total, "fractions must not all be zero"));
            }
            Ok(())
        }
        ReactantsDef::ElementalTotals { totals } => {
            let mut seen: HashSet<Element> = HashSet::new();
            let mut total = 0.0;
            for (symbol, b) in totals {
                let element: Element = symbol.parse().map_err(|_| ValidationError::UnknownName {
                    name: symbol.clone(),
                    context: "reactants.totals".to_string(),
                })?;
                if !seen.insert(element) {
                    return Err(ValidationError::DuplicateId {
                        id: symbol.clone(),
                        context: "reactants.totals".to_string(),
                    });
                }
                if !carried_by(products, element) {
                    return Err(invalid(
                        format!("reactants.totals.{symbol}"),
                        b,
                        "element not carried by any product species",
                    ));
                }
                if !b.is_finite() || *b < 0.0 {
                    return Err(invalid(format!("reactants.totals.{symbol}"), b, "must be finite and non-negative"));
                }
                total += b;
            }
            if total <= 0.0 {
                return Err(invalid("reactants.totals", total, "totals must not all be zero"));
            }
            Ok(())
        }
    }
}

fn validate_run(run: &RunDef) -> Result<(), ValidationError> {
    let field = |name: &str| format!("runs.{}.{name}", run.id);
    match &run.kind {
        RunKind::Equilibrium {
            mode,
            pressure_bar,
            value,
        } => {
            let mode: EquilibriumMode = mode.parse().map_err(|_| ValidationError::UnknownName {
                name: mode.clone(),
                context: field("mode"),
            })?;
            require_positive(field("pressure_bar"), *pressure_bar)?;
            match mode {
                EquilibriumMode::Temperature => require_positive(field("value"), *value),
                // Zero is the "not set" sentinel of the h and S closures.
                EquilibriumMode::Enthalpy | EquilibriumMode::Entropy => {
                    if !value.is_finite() || *value == 0.0 {
                        return Err(invalid(field("value"), value, "must be finite and non-zero"));
                    }
                    Ok(())
                }
            }
        }
        RunKind::StaticFlow {
            mode,
            total,
            mach,
            area_m2,
            mass_flow_kg_s,
        } => {
            let mode: StaticMode = mode.parse().map_err(|_| ValidationError::UnknownName {
                name: mode.clone(),
                context: field("mode"),
            })?;
            validate_total(total, &field)?;
            if !mass_flow_kg_s.is_finite() || *mass_flow_kg_s < 0.0 {
                return Err(invalid(field("mass_flow_kg_s"), mass_flow_kg_s, "must be finite and non-negative"));
            }
            match (mode, mach, area_m2) {
                (StaticMode::Mach, Some(mn), None) => {
                    if !mn.is_finite() || *mn < 0.0 {
                        return Err(invalid(field("mach"), mn, "must be finite and non-negative"));
                    }
                    Ok(())
                }
                (StaticMode::Area, None, Some(area)) => require_positive(field("area_m2"), *area),
                (StaticMode::Mach, _, _) => Err(invalid(field("mach"), "missing", "MN mode needs `mach` and no `area_m2`")),
                (StaticMode::Area, _, _) => {
                    Err(invalid(field("area_m2"), "missing", "area mode needs `area_m2` and no `mach`"))
                }
            }
        }
        RunKind::Sweep {
            pressure_bar,
            temperature,
        } => {
            require_positive(field("pressure_bar"), *pressure_bar)?;
            validate_range(temperature, &field)
        }
    }
}

fn validate_total(total: &TotalStateDef, field: &dyn Fn(&str) -> String) -> Result<(), ValidationError> {
    require_positive(field("total.pressure_bar"), total.pressure_bar)?;
    require_positive(field("total.temperature_k"), total.temperature_k)
}

fn validate_range(range: &RangeDef, field: &dyn Fn(&str) -> String) -> Result<(), ValidationError> {
    require_positive(field("temperature.start"), range.start)?;
    require_positive(field("temperature.end"), range.end)?;
    if range.points < 2 {
        return Err(invalid(field("temperature.points"), range.points, "need at least two points"));
    }
    if range.start == range.end {
        return Err(invalid(field("temperature.end"), range.end, "must differ from start"));
    }
    if range.spacing == SpacingDef::Log && range.start.min(range.end) <= 0.0 {
        return Err(invalid(field("temperature.start"), range.start, "log spacing needs positive bounds"));
    }
    Ok(())
}
