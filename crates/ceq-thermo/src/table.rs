//! `ThermoData` backed by the built-in NASA-7 catalog.

use crate::catalog::{ProductSet, nasa7};
use crate::composition::Composition;
use crate::element::Element;
use crate::error::{ThermoError, ThermoResult};
use crate::model::ThermoData;
use crate::nasa7::Nasa7;
use crate::species::Species;
use nalgebra::{DMatrix, DVector};

/// Reference dry-air elemental totals [mol/g].
pub const AIR_ELEMENTAL_TOTALS: [(Element, f64); 4] = [
    (Element::Ar, 3.23319235e-4),
    (Element::C, 1.10132233e-5),
    (Element::N, 5.39157698e-2),
    (Element::O, 1.44860137e-2),
];

/// Product-species table: polynomial fits, stoichiometry and reference totals.
#[derive(Debug, Clone)]
pub struct SpeciesTable {
    name: String,
    species: Vec<Species>,
    elements: Vec<Element>,
    fits: Vec<Nasa7>,
    aij: DMatrix<f64>,
    b0_reference: DVector<f64>,
    t_range: (f64, f64),
}

impl SpeciesTable {
    /// Build a table for `products`.
    ///
    /// Elements are the ones present in the products, in canonical order;
    /// `b0_reference` must have one entry per element [mol/g].
    pub fn new(products: &ProductSet, b0_reference: Vec<f64>) -> ThermoResult<Self> {
        let species = products.species().to_vec();
        let elements: Vec<Element> = Element::ALL
            .into_iter()
            .filter(|e| species.iter().any(|s| s.atom_count(*e) > 0))
            .collect();

        if b0_reference.len() != elements.len() {
            return Err(ThermoError::DimensionMismatch {
                what: "b0_reference",
                expected: elements.len(),
                actual: b0_reference.len(),
            });
        }
        if b0_reference.iter().any(|b| !b.is_finite() || *b < 0.0) {
            return Err(ThermoError::NonPhysical {
                what: "elemental totals must be finite and non-negative",
            });
        }

        let aij = DMatrix::from_fn(elements.len(), species.len(), |e, j| {
            f64::from(species[j].atom_count(elements[e]))
        });

        let fits: Vec<Nasa7> = species.iter().map(|s| nasa7(*s)).collect();
        let t_range = fits.iter().fold((f64::MIN, f64::MAX), |(lo, hi), fit| {
            let (a, b) = fit.range();
            (lo.max(a), hi.min(b))
        });
        if t_range.0 >= t_range.1 {
            return Err(ThermoError::InvalidArg {
                what: "product fits share no common temperature range",
            });
        }

        Ok(Self {
            name: products.name().to_string(),
            species,
            elements,
            fits,
            aij,
            b0_reference: DVector::from_vec(b0_reference),
            t_range,
        })
    }

    /// Build a table whose reference totals come from a reactant mixture.
    ///
    /// Reactant elements missing from the products are rejected.
    pub fn for_reactants(products: &ProductSet, reactants: &Composition) -> ThermoResult<Self> {
        let product_elements = product_elements(products);
        if reactants
            .elements()
            .iter()
            .any(|e| !product_elements.contains(e))
        {
            return Err(ThermoError::InvalidArg {
                what: "reactants contain an element no product species carries",
            });
        }
        let b0 = reactants.elemental_totals(&product_elements);
        Self::new(products, b0)
    }

    /// Build a table from explicit `(element, total)` pairs [mol/g].
    ///
    /// Elements the products carry but `totals` omits get zero; repeated
    /// elements are summed.
    pub fn for_elemental_totals(products: &ProductSet, totals: &[(Element, f64)]) -> ThermoResult<Self> {
        let elements = product_elements(products);
        let mut b0 = vec![0.0; elements.len()];
        for (element, b) in totals {
            let idx = elements
                .iter()
                .position(|e| e == element)
                .ok_or(ThermoError::InvalidArg {
                    what: "elemental total for an element no product species carries",
                })?;
            b0[idx] += b;
        }
        Self::new(products, b0)
    }

    /// Dry-air products with the reference dry-air totals.
    pub fn air() -> ThermoResult<Self> {
        Self::for_elemental_totals(&ProductSet::air(), &AIR_ELEMENTAL_TOTALS)
    }

    pub fn species_index(&self, species: Species) -> Option<usize> {
        self.species.iter().position(|s| *s == species)
    }

    pub fn element_index(&self, element: Element) -> Option<usize> {
        self.elements.iter().position(|e| *e == element)
    }

    /// Elemental totals of `reactants` in this table's element order.
    pub fn elemental_totals(&self, reactants: &Composition) -> DVector<f64> {
        DVector::from_vec(reactants.elemental_totals(&self.elements))
    }

    fn map_fits(
        &self,
        t: f64,
        f: impl Fn(&Nasa7, f64) -> ThermoResult<f64>,
    ) -> ThermoResult<DVector<f64>> {
        let values = self
            .fits
            .iter()
            .map(|fit| f(fit, t))
            .collect::<ThermoResult<Vec<f64>>>()?;
        Ok(DVector::from_vec(values))
    }
}

/// Elements carried by `products`, in canonical order.
fn product_elements(products: &ProductSet) -> Vec<Element> {
    Element::ALL
        .into_iter()
        .filter(|e| products.species().iter().any(|s| s.atom_count(*e) > 0))
        .collect()
}

impl ThermoData for SpeciesTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn species(&self) -> &[Species] {
        &self.species
    }

    fn elements(&self) -> &[Element] {
        &self.elements
    }

    fn aij(&self) -> &DMatrix<f64> {
        &self.aij
    }

    fn b0_reference(&self) -> &DVector<f64> {
        &self.b0_reference
    }

    fn temperature_range(&self) -> (f64, f64) {
        self.t_range
    }

    fn h0(&self, t: f64) -> ThermoResult<DVector<f64>> {
        self.map_fits(t, Nasa7::h_rt)
    }

    fn s0(&self, t: f64) -> ThermoResult<DVector<f64>> {
        self.map_fits(t, Nasa7::s_r)
    }

    fn dh0_dt(&self, t: f64) -> ThermoResult<DVector<f64>> {
        self.map_fits(t, Nasa7::dh_rt_dt)
    }

    fn ds0_dt(&self, t: f64) -> ThermoResult<DVector<f64>> {
        self.map_fits(t, Nasa7::ds_r_dt)
    }

    fn cp0(&self, t: f64) -> ThermoResult<DVector<f64>> {
        self.map_fits(t, Nasa7::cp_r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn air_table_layout() {
        let table = SpeciesTable::air().unwrap();
        assert_eq!(table.num_species(), 9);
        assert_eq!(
            table.elements(),
            &[Element::Ar, Element::C, Element::N, Element::O]
        );
        assert_eq!(table.aij().shape(), (4, 9));

        let no2 = table.species_index(Species::NO2).unwrap();
        let o = table.element_index(Element::O).unwrap();
        let n = table.element_index(Element::N).unwrap();
        assert_eq!(table.aij()[(o, no2)], 2.0);
        assert_eq!(table.aij()[(n, no2)], 1.0);
        assert_eq!(table.temperature_range(), (200.0, 3500.0));
    }

    #[test]
    fn air_uses_reference_totals() {
        let table = SpeciesTable::air().unwrap();
        let expected = [3.23319235e-4, 1.10132233e-5, 5.39157698e-2, 1.44860137e-2];
        assert_eq!(table.b0_reference().as_slice(), &expected);

        // The dry-air mixture reproduces the reference totals.
        let from_mixture = table.elemental_totals(&Composition::dry_air());
        for (got, want) in from_mixture.iter().zip(expected) {
            assert!((got - want).abs() < 1e-4 * want, "{got} vs {want}");
        }
    }

    #[test]
    fn explicit_totals_fill_missing_elements_with_zero() {
        let table =
            SpeciesTable::for_elemental_totals(&ProductSet::air_hydrocarbon(), &AIR_ELEMENTAL_TOTALS).unwrap();
        let h = table.element_index(Element::H).unwrap();
        assert_eq!(table.b0_reference()[h], 0.0);
        assert_eq!(table.b0_reference().len(), 5);
        assert!(SpeciesTable::for_elemental_totals(&ProductSet::air(), &[(Element::H, 0.1)]).is_err());
    }

    #[test]
    fn b0_length_is_checked() {
        let err = SpeciesTable::new(&ProductSet::air(), vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            ThermoError::DimensionMismatch {
                expected: 4,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn reactant_elements_must_be_carried_by_products() {
        let fuel_air = Composition::dry_air()
            .blend(&Composition::pure(Species::CH4), 0.05)
            .unwrap();
        assert!(SpeciesTable::for_reactants(&ProductSet::air(), &fuel_air).is_err());
        let table = SpeciesTable::for_reactants(&ProductSet::air_hydrocarbon(), &fuel_air).unwrap();
        let h = table.element_index(Element::H).unwrap();
        assert!(table.b0_reference()[h] > 0.0);
    }

    #[test]
    fn vector_evaluation_matches_fits_and_fails_out_of_range() {
        let table = SpeciesTable::air().unwrap();
        let h0 = table.h0(1200.0).unwrap();
        let n2 = table.species_index(Species::N2).unwrap();
        assert_eq!(h0[n2], nasa7(Species::N2).h_rt(1200.0).unwrap());
        assert!(table.s0(100.0).is_err());
        assert!(table.dh0_dt(4000.0).is_err());

        let cp_default = table.h0(800.0).unwrap() + table.dh0_dt(800.0).unwrap() * 800.0;
        let cp = table.cp0(800.0).unwrap();
        assert!((cp - cp_default).amax() < 1e-10);
    }
}
