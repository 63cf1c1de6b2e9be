//! Methane/air combustion products on the hydrocarbon product set.

use ceq_solver::{ChemEquilibrium, Closure, EquilibriumInputs, EquilibriumMode};
use ceq_thermo::{Composition, Element, ProductSet, Species, SpeciesTable, ThermoData};
use nalgebra::DVector;
use std::sync::Arc;

/// Elemental totals [mol/g] of 5 % methane in dry air, by mole.
fn methane_air_b0(elements: &[Element]) -> DVector<f64> {
    let air = Composition::dry_air();
    let mw_air = air.molar_mass();
    let air_atoms: Vec<f64> = air
        .elemental_totals(elements)
        .into_iter()
        .map(|b| b * mw_air)
        .collect();
    let mw_ch4 = Element::C.atomic_mass() + 4.0 * Element::H.atomic_mass();
    let mw = 0.95 * mw_air + 0.05 * mw_ch4;
    DVector::from_iterator(
        elements.len(),
        elements.iter().zip(air_atoms).map(|(e, a)| {
            let ch4 = match e {
                Element::C => 1.0,
                Element::H => 4.0,
                _ => 0.0,
            };
            (0.95 * a + 0.05 * ch4) / mw
        }),
    )
}

fn setup() -> (Arc<dyn ThermoData>, DVector<f64>) {
    let products = ProductSet::air_hydrocarbon();
    let table = SpeciesTable::new(&products, vec![0.0; 5]).unwrap();
    let b0 = methane_air_b0(table.elements());
    (Arc::new(table), b0)
}

#[test]
fn products_balance_at_several_temperatures() {
    let (thermo, b0) = setup();
    assert_eq!(thermo.elements(), &Element::ALL);

    let h2o = thermo.species().iter().position(|s| *s == Species::H2O).unwrap();
    let co2 = thermo.species().iter().position(|s| *s == Species::CO2).unwrap();
    for t in [300.0, 1500.0, 2200.0] {
        let mut eq = ChemEquilibrium::new(Arc::clone(&thermo), EquilibriumMode::Temperature);
        let sol = eq
            .solve(&EquilibriumInputs::new(b0.clone(), 5.0, Closure::Temperature(t)))
            .unwrap();

        let b = thermo.aij() * &sol.n;
        for (bi, b0i) in b.iter().zip(b0.iter()) {
            assert!((bi - b0i).abs() < 1e-9, "T = {t}: b = {bi}, b0 = {b0i}");
        }
        assert!(sol.n.iter().all(|n| *n > 0.0));

        // Fuel burns completely: hydrogen ends in water, carbon in CO2.
        let b_h = b0[2];
        assert!(sol.n[h2o] > 0.45 * b_h, "T = {t}: H2O = {}", sol.n[h2o]);
        assert!(sol.n[co2] > 0.9 * b0[1], "T = {t}: CO2 = {}", sol.n[co2]);
    }
}

#[test]
fn adiabatic_flame_temperature() {
    let (thermo, b0) = setup();
    let mut eq = ChemEquilibrium::new(thermo, EquilibriumMode::Enthalpy);
    let sol = eq
        .solve(&EquilibriumInputs::new(b0, 5.0, Closure::Enthalpy(-50.0)))
        .unwrap();
    assert!((sol.t - 1428.0).abs() < 2.0, "T = {}", sol.t);
    assert!((sol.properties.h + 50.0).abs() < 1e-4);
}
