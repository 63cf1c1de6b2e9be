use std::path::Path;

#[test]
fn shipped_cases_load_and_validate() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../cases");
    let cases = [
        "01_air_equilibrium.yaml",
        "02_air_station.yaml",
        "03_methane_flame.yaml",
    ];

    for name in cases {
        let path = root.join(name);
        let case = ceq_case::load(&path).unwrap_or_else(|e| panic!("Failed to load {}: {}", name, e));
        assert!(!case.runs.is_empty(), "{name} has no runs");
    }
}
