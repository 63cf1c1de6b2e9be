//! Case schema definitions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Case {
    #[serde(default)]
    pub version: u32,
    pub name: String,
    /// Built-in product set (`air`, `air_hydrocarbon`).
    #[serde(default = "default_products")]
    pub products: String,
    pub reactants: ReactantsDef,
    #[serde(default)]
    pub runs: Vec<RunDef>,
}

fn default_products() -> String {
    "air".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReactantsDef {
    /// Standard dry air.
    DryAir,
    /// Species mole fractions; normalised on load.
    Mixture { fractions: Vec<(String, f64)> },
    /// Elemental totals [mol/g] by element symbol. Unlisted elements are zero.
    ElementalTotals { totals: Vec<(String, f64)> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunDef {
    pub id: String,
    #[serde(flatten)]
    pub kind: RunKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunKind {
    /// Single equilibrium point. `value` is T [K], h [cal/g] or S [cal/(g K)].
    Equilibrium {
        mode: String,
        pressure_bar: f64,
        value: f64,
    },
    /// Static station expanded isentropically from equilibrium totals.
    StaticFlow {
        mode: String,
        total: TotalStateDef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mach: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        area_m2: Option<f64>,
        mass_flow_kg_s: f64,
    },
    /// Temperature sweep at fixed pressure.
    Sweep {
        pressure_bar: f64,
        temperature: RangeDef,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TotalStateDef {
    pub pressure_bar: f64,
    pub temperature_k: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RangeDef {
    pub start: f64,
    pub end: f64,
    pub points: usize,
    #[serde(default)]
    pub spacing: SpacingDef,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpacingDef {
    #[default]
    Linear,
    #[serde(alias = "logarithmic")]
    Log,
}
