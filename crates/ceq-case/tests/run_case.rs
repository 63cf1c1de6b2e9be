use ceq_case::{RunReport, load, parse_yaml, run_case};
use std::path::Path;

fn case_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../cases").join(name)
}

#[test]
fn air_equilibrium_case() {
    let case = load(&case_path("01_air_equilibrium.yaml")).unwrap();
    let reports = run_case(&case).unwrap();
    let ids: Vec<&str> = reports.iter().map(RunReport::id).collect();
    assert_eq!(ids, ["room", "hot", "compressed", "heating"]);

    let RunReport::Equilibrium(room) = &reports[0] else {
        panic!("equilibrium report expected");
    };
    assert_eq!(room.id, "room");
    let n2 = room.composition.iter().find(|s| s.species == "N2").unwrap();
    assert!((n2.amount - 2.6958e-2).abs() < 1e-5);
    let x_sum: f64 = room.composition.iter().map(|s| s.mole_fraction).sum();
    assert!((x_sum - 1.0).abs() < 1e-8);

    let RunReport::Equilibrium(compressed) = &reports[2] else {
        panic!("equilibrium report expected");
    };
    assert_eq!(compressed.mode, "h");
    assert!((compressed.temperature_k - 504.057).abs() < 1e-2);

    let RunReport::Sweep(sweep) = &reports[3] else {
        panic!("sweep report expected");
    };
    assert_eq!(sweep.num_successful, 14);
    assert!(sweep.points.iter().all(|p| p.error.is_none()));
}

#[test]
fn air_station_case() {
    let case = load(&case_path("02_air_station.yaml")).unwrap();
    let reports = run_case(&case).unwrap();

    let RunReport::StaticFlow(mach) = &reports[0] else {
        panic!("static flow report expected");
    };
    assert!((mach.ps_bar - 1.572_78).abs() < 1e-3, "Ps = {}", mach.ps_bar);
    assert!((mach.area_m2.unwrap() - 0.036_222).abs() < 1e-4);
    assert!((mach.mach_from_enthalpy - mach.mach).abs() < 1e-5, "MN from ht - hs = {}", mach.mach_from_enthalpy);

    let RunReport::StaticFlow(area) = &reports[1] else {
        panic!("static flow report expected");
    };
    assert!((area.mach - 0.6).abs() < 1e-3, "MN = {}", area.mach);
    assert!((area.mach_from_enthalpy - area.mach).abs() < 1e-5);

    let RunReport::StaticFlow(stagnant) = &reports[2] else {
        panic!("static flow report expected");
    };
    assert!(stagnant.area_m2.is_none());
    assert!((stagnant.ps_bar - 2.0).abs() < 1e-4, "Ps = {}", stagnant.ps_bar);
    assert!(stagnant.mach_from_enthalpy < 1e-3);
}

#[test]
fn methane_flame_case() {
    let case = load(&case_path("03_methane_flame.yaml")).unwrap();
    let reports = run_case(&case).unwrap();
    let RunReport::Equilibrium(flame) = &reports[1] else {
        panic!("equilibrium report expected");
    };
    assert!((flame.temperature_k - 1428.0).abs() < 5.0, "T = {}", flame.temperature_k);
    let h2o = flame.composition.iter().find(|s| s.species == "H2O").unwrap();
    assert!(h2o.mole_fraction > 0.05);
}

#[test]
fn failing_runs_name_the_run() {
    let yaml = r#"
version: 1
name: too hot
reactants:
  type: dry_air
runs:
  - id: melt
    type: equilibrium
    mode: T
    pressure_bar: 1.0
    value: 9000.0
"#;
    let case = parse_yaml(yaml).unwrap();
    let err = run_case(&case).unwrap_err();
    assert!(err.to_string().contains("melt"), "{err}");
}

#[test]
fn reports_serialize_with_type_tags() {
    let yaml = r#"
version: 1
name: json
reactants:
  type: dry_air
runs:
  - id: p
    type: equilibrium
    mode: T
    pressure_bar: 1.0
    value: 800.0
"#;
    let reports = run_case(&parse_yaml(yaml).unwrap()).unwrap();
    let json = serde_json::to_value(&reports).unwrap();
    assert_eq!(json[0]["type"], "equilibrium");
    assert_eq!(json[0]["id"], "p");
    assert!(json[0]["composition"].as_array().unwrap().len() == 9);
}

#[test]
fn methane_mixture_matches_shipped_totals() {
    let yaml = r#"
version: 1
name: methane mixture
products: air_hydrocarbon
reactants:
  type: mixture
  fractions:
    - [N2, 0.741798]
    - [O2, 0.1990022]
    - [Ar, 0.00889675]
    - [CO2, 0.00030305]
    - [Methane, 0.05]
"#;
    let mixture = ceq_case::CaseSetup::build(&parse_yaml(yaml).unwrap()).unwrap();
    let shipped = ceq_case::CaseSetup::build(&load(&case_path("03_methane_flame.yaml")).unwrap()).unwrap();
    for (a, b) in mixture.b0.iter().zip(shipped.b0.iter()) {
        assert!((a - b).abs() < 1e-4 * b, "{a} vs {b}");
    }
}
