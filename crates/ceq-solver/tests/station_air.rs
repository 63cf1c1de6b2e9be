//! Static station of equilibrium air expanding from 2 bar, 600 K.

use ceq_solver::{
    ChemEquilibrium, Closure, EquilibriumInputs, EquilibriumMode, EquilibriumStatics, FlowArea, FlowTarget,
    StaticFlowResolver, StaticMode, StaticStation, StationTotals,
};
use ceq_thermo::{SpeciesTable, ThermoData};
use std::sync::Arc;

fn totals(thermo: &Arc<dyn ThermoData>) -> StationTotals {
    let mut eq = ChemEquilibrium::new(Arc::clone(thermo), EquilibriumMode::Temperature);
    let sol = eq
        .solve(&EquilibriumInputs::new(
            thermo.b0_reference().clone(),
            2.0,
            Closure::Temperature(600.0),
        ))
        .unwrap();
    StationTotals::from_equilibrium(&sol)
}

fn station(thermo: &Arc<dyn ThermoData>, totals: &StationTotals, mode: StaticMode) -> StaticStation<EquilibriumStatics> {
    let gas = EquilibriumStatics::isentropic(Arc::clone(thermo), thermo.b0_reference().clone(), totals);
    StaticStation::new(gas, StaticFlowResolver::new(mode))
}

#[test]
fn total_state() {
    let thermo: Arc<dyn ThermoData> = Arc::new(SpeciesTable::air().unwrap());
    let t = totals(&thermo);
    assert!((t.ht - 304_794.85).abs() < 1.0, "ht = {}", t.ht);
    assert!((t.n_moles - 0.034_524_2).abs() < 1e-6);
    assert!((t.gamma - 1.376_073).abs() < 1e-4, "gamma = {}", t.gamma);
    assert!((t.rho - 1.161_24).abs() < 1e-4, "rho = {}", t.rho);
    assert!((t.st - 1.763_997).abs() < 1e-4, "S = {}", t.st);
}

#[test]
fn mach_mode_station() {
    let thermo: Arc<dyn ThermoData> = Arc::new(SpeciesTable::air().unwrap());
    let t = totals(&thermo);
    let mut st = station(&thermo, &t, StaticMode::Mach);
    let sol = st.solve(&t, 10.0, FlowTarget::Mach(0.6)).unwrap();
    let out = sol.outputs;

    assert!((out.ps_bar - 1.572_78).abs() < 1e-3, "Ps = {}", out.ps_bar);
    assert!((out.v - 283.033).abs() < 0.1, "V = {}", out.v);
    assert!((out.vsonic - 471.712).abs() < 0.1, "Vsonic = {}", out.vsonic);
    let FlowArea::Finite(area) = out.area else {
        panic!("finite area expected");
    };
    assert!((area - 0.036_222).abs() < 1e-4, "A = {area}");
    assert!((area * sol.statics.rho * out.vsonic * out.mach - 10.0).abs() < 1e-6);

    // Energy: static enthalpy plus kinetic energy equals the total.
    assert!((sol.statics.hs + 0.5 * out.v * out.v - t.ht).abs() < 1e-3 * t.ht);
}

#[test]
fn area_mode_station_inverts_mach_mode() {
    let thermo: Arc<dyn ThermoData> = Arc::new(SpeciesTable::air().unwrap());
    let t = totals(&thermo);
    let mut st = station(&thermo, &t, StaticMode::Area);
    let sol = st
        .solve(&t, 10.0, FlowTarget::Area(FlowArea::Finite(0.036_222)))
        .unwrap();
    let out = sol.outputs;
    assert!((out.mach - 0.6).abs() < 1e-3, "MN = {}", out.mach);
    assert!((out.ps_bar - 1.572_78).abs() < 1e-3, "Ps = {}", out.ps_bar);
    assert!((0.036_222 * sol.statics.rho * out.vsonic * out.mach - 10.0).abs() < 1e-6);
}
