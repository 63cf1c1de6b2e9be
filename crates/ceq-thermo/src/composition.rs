//! Reactant composition and elemental totals.

use crate::element::Element;
use crate::error::{ThermoError, ThermoResult};
use crate::species::Species;
use ceq_core::numeric::{Tolerances, nearly_equal};

/// Reactant mixture defined by normalized mole fractions.
///
/// The composition is always normalized (mole fractions sum to 1.0).
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    /// Species and their mole fractions (always normalized to sum=1).
    items: Vec<(Species, f64)>,
}

impl Composition {
    /// Create a pure-species composition.
    pub fn pure(species: Species) -> Self {
        Self {
            items: vec![(species, 1.0)],
        }
    }

    /// Dry air by volume: N2 78.084 %, O2 20.9476 %, Ar 0.9365 %, CO2 0.0319 %.
    pub fn dry_air() -> Self {
        Self::normalized(vec![
            (Species::N2, 0.78084),
            (Species::O2, 0.209476),
            (Species::Ar, 0.009365),
            (Species::CO2, 0.000319),
        ])
    }

    fn normalized(items: Vec<(Species, f64)>) -> Self {
        let sum: f64 = items.iter().map(|(_, f)| f).sum();
        Self {
            items: items.into_iter().map(|(s, f)| (s, f / sum)).collect(),
        }
    }

    /// Create a composition from mole fractions.
    ///
    /// Validates that all fractions are finite, non-negative, and have a positive sum,
    /// then normalizes to sum=1. Repeated species are merged.
    pub fn new_mole_fractions(fractions: Vec<(Species, f64)>) -> ThermoResult<Self> {
        if fractions.is_empty() {
            return Err(ThermoError::InvalidArg {
                what: "empty composition",
            });
        }

        let mut merged: Vec<(Species, f64)> = Vec::with_capacity(fractions.len());
        let mut sum = 0.0;
        for (species, frac) in fractions {
            if !frac.is_finite() {
                return Err(ThermoError::NonPhysical {
                    what: "non-finite mole fraction",
                });
            }
            if frac < 0.0 {
                return Err(ThermoError::NonPhysical {
                    what: "negative mole fraction",
                });
            }
            sum += frac;
            match merged.iter_mut().find(|(s, _)| *s == species) {
                Some((_, f)) => *f += frac,
                None => merged.push((species, frac)),
            }
        }

        if sum <= 0.0 || !sum.is_finite() {
            return Err(ThermoError::NonPhysical {
                what: "mole fractions sum to zero or non-finite",
            });
        }

        let normalized: Vec<(Species, f64)> = merged
            .into_iter()
            .map(|(s, f)| (s, f / sum))
            .filter(|(_, f)| *f > 1e-15) // Drop negligible species
            .collect();

        if normalized.is_empty() {
            return Err(ThermoError::NonPhysical {
                what: "all mole fractions negligible",
            });
        }

        Ok(Self { items: normalized })
    }

    /// Blend two compositions by mole: `(1 - x) * self + x * other`.
    pub fn blend(&self, other: &Composition, x: f64) -> ThermoResult<Self> {
        if !(0.0..=1.0).contains(&x) {
            return Err(ThermoError::OutOfRange {
                what: "blend fraction",
                value: x,
                min: 0.0,
                max: 1.0,
            });
        }
        let items = self
            .iter()
            .map(|(s, f)| (s, f * (1.0 - x)))
            .chain(other.iter().map(|(s, f)| (s, f * x)))
            .collect();
        Self::new_mole_fractions(items)
    }

    /// Get mole fraction of a species (0.0 if not present).
    pub fn mole_fraction(&self, species: Species) -> f64 {
        self.items
            .iter()
            .find(|(s, _)| *s == species)
            .map(|(_, f)| *f)
            .unwrap_or(0.0)
    }

    /// Check if this is a pure-species composition.
    ///
    /// Returns `Some(species)` if exactly one species has fraction ≈1.0.
    pub fn is_pure(&self) -> Option<Species> {
        if self.items.len() == 1 {
            let (species, frac) = self.items[0];
            let tol = Tolerances {
                abs: 1e-10,
                rel: 1e-10,
            };
            if nearly_equal(frac, 1.0, tol) {
                return Some(species);
            }
        }
        None
    }

    /// Iterate over all species with non-zero mole fractions.
    pub fn iter(&self) -> impl Iterator<Item = (Species, f64)> + '_ {
        self.items.iter().copied()
    }

    /// Mixture molar mass [g/mol]: M_mix = Σ (x_i * M_i).
    pub fn molar_mass(&self) -> f64 {
        self.items
            .iter()
            .map(|(species, mole_frac)| species.molar_mass() * mole_frac)
            .sum()
    }

    /// Elements present in the mixture, in canonical order.
    pub fn elements(&self) -> Vec<Element> {
        Element::ALL
            .into_iter()
            .filter(|e| self.items.iter().any(|(s, _)| s.atom_count(*e) > 0))
            .collect()
    }

    /// Moles of each element per gram of mixture [mol/g], in the order of `elements`.
    ///
    /// Elements absent from the mixture get 0.
    pub fn elemental_totals(&self, elements: &[Element]) -> Vec<f64> {
        let mw = self.molar_mass();
        elements
            .iter()
            .map(|e| {
                self.items
                    .iter()
                    .map(|(s, x)| x * f64::from(s.atom_count(*e)))
                    .sum::<f64>()
                    / mw
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tol() -> Tolerances {
        Tolerances {
            abs: 1e-10,
            rel: 1e-10,
        }
    }

    #[test]
    fn pure_composition() {
        let comp = Composition::pure(Species::O2);
        assert_eq!(comp.is_pure(), Some(Species::O2));
        assert_eq!(comp.mole_fraction(Species::O2), 1.0);
        assert_eq!(comp.mole_fraction(Species::N2), 0.0);
    }

    #[test]
    fn mixture_normalization_non_unit_sum() {
        let comp =
            Composition::new_mole_fractions(vec![(Species::O2, 2.0), (Species::N2, 8.0)]).unwrap();

        assert_eq!(comp.is_pure(), None);
        assert!(nearly_equal(comp.mole_fraction(Species::O2), 0.2, tol()));
        assert!(nearly_equal(comp.mole_fraction(Species::N2), 0.8, tol()));
    }

    #[test]
    fn repeated_species_are_merged() {
        let comp = Composition::new_mole_fractions(vec![
            (Species::N2, 1.0),
            (Species::O2, 1.0),
            (Species::N2, 2.0),
        ])
        .unwrap();
        assert_eq!(comp.iter().count(), 2);
        assert!(nearly_equal(comp.mole_fraction(Species::N2), 0.75, tol()));
    }

    #[test]
    fn invalid_fractions_are_rejected() {
        assert!(Composition::new_mole_fractions(vec![]).is_err());
        assert!(
            Composition::new_mole_fractions(vec![(Species::O2, -0.5), (Species::N2, 1.5)]).is_err()
        );
        assert!(
            Composition::new_mole_fractions(vec![(Species::O2, 0.0), (Species::N2, 0.0)]).is_err()
        );
        assert!(Composition::new_mole_fractions(vec![(Species::O2, f64::NAN)]).is_err());
    }

    #[test]
    fn dry_air_elemental_totals() {
        let air = Composition::dry_air();
        assert!((air.molar_mass() - 28.9654).abs() < 1e-3);

        let elements = air.elements();
        assert_eq!(elements, vec![Element::Ar, Element::C, Element::N, Element::O]);

        let b0 = air.elemental_totals(&elements);
        let expected = [3.2332e-4, 1.1013e-5, 5.3916e-2, 1.4486e-2];
        for (got, want) in b0.iter().zip(expected) {
            assert!((got - want).abs() / want < 1e-3, "{got} vs {want}");
        }
    }

    #[test]
    fn absent_elements_have_zero_total() {
        let b0 = Composition::dry_air().elemental_totals(&[Element::H, Element::N]);
        assert_eq!(b0[0], 0.0);
        assert!(b0[1] > 0.0);
    }

    #[test]
    fn blend_with_fuel() {
        let fuel = Composition::pure(Species::CH4);
        let mix = Composition::dry_air().blend(&fuel, 0.05).unwrap();
        assert!(nearly_equal(mix.mole_fraction(Species::CH4), 0.05, tol()));
        assert!(mix.elements().contains(&Element::H));
        assert!(Composition::dry_air().blend(&fuel, 1.5).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn normalized_sum_is_one(fracs in prop::collection::vec(0.0_f64..1.0_f64, 1..5)) {
            let species = [Species::O2, Species::N2, Species::H2, Species::CH4, Species::Ar];
            let composition_input: Vec<(Species, f64)> = fracs
                .iter()
                .enumerate()
                .map(|(i, &f)| (species[i % species.len()], f))
                .collect();

            if let Ok(comp) = Composition::new_mole_fractions(composition_input) {
                let sum: f64 = comp.iter().map(|(_, f)| f).sum();
                let tol = Tolerances { abs: 1e-9, rel: 1e-9 };
                prop_assert!(nearly_equal(sum, 1.0, tol));
            }
        }

        #[test]
        fn element_mass_fractions_sum_to_one(
            x_fuel in 0.0_f64..0.2,
        ) {
            let mix = Composition::dry_air()
                .blend(&Composition::pure(Species::CH4), x_fuel)
                .unwrap();
            let elements = mix.elements();
            let b0 = mix.elemental_totals(&elements);
            // Σ b0_e * M_e = 1 g of mixture
            let mass: f64 = elements.iter().zip(&b0).map(|(e, b)| e.atomic_mass() * b).sum();
            prop_assert!((mass - 1.0).abs() < 1e-12);
        }
    }
}
