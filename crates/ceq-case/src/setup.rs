//! Thermodynamic data and elemental totals for a case.

use crate::schema::{Case, ReactantsDef};
use crate::{CaseError, CaseResult};
use ceq_thermo::{
    AIR_ELEMENTAL_TOTALS, Composition, Element, ProductSet, SpeciesTable, ThermoData, ThermoResult, lookup_species,
};
use nalgebra::DVector;
use std::sync::Arc;

/// Product table and reactant totals shared by every run of a case.
#[derive(Clone)]
pub struct CaseSetup {
    pub thermo: Arc<dyn ThermoData>,
    /// Elemental totals [mol/g] in the table's element order.
    pub b0: DVector<f64>,
}

impl CaseSetup {
    pub fn build(case: &Case) -> CaseResult<Self> {
        let products = ProductSet::by_name(&case.products)?;
        let table = match &case.reactants {
            ReactantsDef::DryAir => SpeciesTable::for_elemental_totals(&products, &AIR_ELEMENTAL_TOTALS)?,
            ReactantsDef::Mixture { fractions } => {
                let fractions = fractions
                    .iter()
                    .map(|(name, x)| lookup_species(name).map(|s| (s, *x)))
                    .collect::<ThermoResult<Vec<_>>>()?;
                SpeciesTable::for_reactants(&products, &Composition::new_mole_fractions(fractions)?)?
            }
            ReactantsDef::ElementalTotals { totals } => {
                let totals = totals
                    .iter()
                    .map(|(symbol, b)| {
                        let element: Element = symbol.parse().map_err(|_| CaseError::Setup {
                            what: format!("unknown element '{symbol}'"),
                        })?;
                        if !products.species().iter().any(|s| s.atom_count(element) > 0) {
                            return Err(CaseError::Setup {
                                what: format!("element '{symbol}' is not carried by the '{}' products", products.name()),
                            });
                        }
                        Ok((element, *b))
                    })
                    .collect::<CaseResult<Vec<_>>>()?;
                SpeciesTable::for_elemental_totals(&products, &totals)?
            }
        };
        let b0 = table.b0_reference().clone();
        Ok(Self {
            thermo: Arc::new(table),
            b0,
        })
    }
}

impl std::fmt::Debug for CaseSetup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaseSetup")
            .field("products", &self.thermo.name())
            .field("b0", &self.b0.as_slice())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(products: &str, reactants: ReactantsDef) -> Case {
        Case {
            version: 1,
            name: "setup".to_string(),
            products: products.to_string(),
            reactants,
            runs: vec![],
        }
    }

    #[test]
    fn dry_air_matches_the_builtin_table() {
        let setup = CaseSetup::build(&case("air", ReactantsDef::DryAir)).unwrap();
        let air = SpeciesTable::air().unwrap();
        assert_eq!(setup.b0, *air.b0_reference());
        assert_eq!(setup.b0.as_slice(), &[3.23319235e-4, 1.10132233e-5, 5.39157698e-2, 1.44860137e-2]);
        assert_eq!(setup.thermo.num_species(), 9);

        // Same totals under the hydrocarbon products, with no hydrogen.
        let setup = CaseSetup::build(&case("air_hydrocarbon", ReactantsDef::DryAir)).unwrap();
        assert_eq!(setup.b0.as_slice(), &[3.23319235e-4, 1.10132233e-5, 0.0, 5.39157698e-2, 1.44860137e-2]);
    }

    #[test]
    fn explicit_totals_follow_table_order() {
        let reactants = ReactantsDef::ElementalTotals {
            totals: vec![("O".to_string(), 0.02), ("N".to_string(), 0.05)],
        };
        let setup = CaseSetup::build(&case("air", reactants)).unwrap();
        // Ar, C, N, O
        assert_eq!(setup.b0.as_slice(), &[0.0, 0.0, 0.05, 0.02]);
    }

    #[test]
    fn mixture_with_fuel_uses_hydrocarbon_elements() {
        let reactants = ReactantsDef::Mixture {
            fractions: vec![
                ("N2".to_string(), 0.7),
                ("O2".to_string(), 0.2),
                ("H2O".to_string(), 0.1),
            ],
        };
        let setup = CaseSetup::build(&case("air_hydrocarbon", reactants.clone())).unwrap();
        assert_eq!(setup.thermo.elements(), &Element::ALL);
        assert!(setup.b0[2] > 0.0);
        assert!(CaseSetup::build(&case("air", reactants)).is_err());
    }
}
