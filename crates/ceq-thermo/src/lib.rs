//! ceq-thermo: thermodynamic data for the equilibrium solvers.
//!
//! Provides:
//! - Element and species definitions (air and hydrocarbon combustion products)
//! - NASA 7-coefficient standard-state fits and a built-in catalog
//! - Reactant compositions and their elemental totals `b0`
//! - The `ThermoData` capability consumed by the solvers, with one
//!   implementation (`SpeciesTable`)
//! - Frozen mixture properties of a solved composition
//!
//! # Conventions
//!
//! Species amounts are in mol per gram of mixture, so `R_UNIVERSAL_ENG`
//! turns `Σ n H°/(RT) · R T` into cal/g. `h0` is dimensionless `H°/(RT)` and
//! `s0` is `S°/R`.
//!
//! # Example
//!
//! ```
//! use ceq_thermo::{SpeciesTable, ThermoData};
//!
//! let air = SpeciesTable::air().unwrap();
//! let h0 = air.h0(1500.0).unwrap();
//! assert_eq!(h0.len(), air.num_species());
//! assert!(air.h0(50.0).is_err());
//! ```

pub mod catalog;
pub mod composition;
pub mod element;
pub mod error;
pub mod model;
pub mod nasa7;
pub mod species;
pub mod table;

// Re-exports for ergonomics
pub use catalog::{ProductSet, SpeciesCatalogEntry, filter_species_catalog, lookup_species, nasa7};
pub use composition::Composition;
pub use element::Element;
pub use error::{ThermoError, ThermoResult};
pub use model::{MixtureProperties, ThermoData};
pub use nasa7::{Nasa7, Nasa7Point};
pub use species::Species;
pub use table::{AIR_ELEMENTAL_TOTALS, SpeciesTable};
