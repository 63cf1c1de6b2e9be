use ceq_case::{CaseError, CaseResult, CaseSetup, RunReport, execute_run, run_case};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ceq-cli")]
#[command(about = "Chemical equilibrium and static-flow station solver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate case file syntax and values
    Validate {
        /// Path to the case file (YAML or JSON)
        case_path: PathBuf,
    },
    /// Run the entries of a case file
    Run {
        /// Path to the case file (YAML or JSON)
        case_path: PathBuf,
        /// Only run the entry with this id
        #[arg(long)]
        only: Option<String>,
        /// Print machine-readable JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// List catalog species, optionally filtered
    Species {
        /// Substring of the id, name or an alias
        filter: Option<String>,
    },
}

fn main() -> CaseResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { case_path } => cmd_validate(&case_path),
        Commands::Run {
            case_path,
            only,
            json,
        } => cmd_run(&case_path, only.as_deref(), json),
        Commands::Species { filter } => {
            cmd_species(filter.as_deref().unwrap_or(""));
            Ok(())
        }
    }
}

fn cmd_validate(case_path: &Path) -> CaseResult<()> {
    println!("Validating case: {}", case_path.display());
    let case = ceq_case::load(case_path)?;
    CaseSetup::build(&case)?;
    println!("✓ Case is valid ({} runs)", case.runs.len());
    Ok(())
}

fn cmd_run(case_path: &Path, only: Option<&str>, json: bool) -> CaseResult<()> {
    let case = ceq_case::load(case_path)?;
    let start = Instant::now();
    let reports = match only {
        Some(id) => {
            let run = case
                .runs
                .iter()
                .find(|r| r.id == id)
                .ok_or_else(|| CaseError::Setup {
                    what: format!("no run with id '{id}'"),
                })?;
            vec![execute_run(&CaseSetup::build(&case)?, run)?]
        }
        None => run_case(&case)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    println!("Case: {}", case.name);
    for report in &reports {
        println!();
        print_report(report);
    }
    println!();
    println!("✓ {} runs in {:.2} s", reports.len(), start.elapsed().as_secs_f64());
    Ok(())
}

fn print_report(report: &RunReport) {
    match report {
        RunReport::Equilibrium(r) => {
            println!("[{}] equilibrium ({} mode)", r.id, r.mode);
            println!("  P = {:.5} bar, T = {:.3} K", r.pressure_bar, r.temperature_k);
            println!(
                "  h = {:.5} cal/g, S = {:.6} cal/(g K), cp = {:.6} cal/(g K)",
                r.h_cal_g, r.s_cal_g_k, r.cp_cal_g_k
            );
            println!(
                "  gamma = {:.5}, rho = {:.5} kg/m³, MW = {:.4} g/mol",
                r.gamma, r.rho_kg_m3, r.molar_mass
            );
            println!("  converged in {} iterations (|r| = {:.2e})", r.iterations, r.residual_norm);
            println!("  {:<6} {:>14} {:>14}", "species", "mol/g", "mole fraction");
            for s in &r.composition {
                println!("  {:<6} {:>14.6e} {:>14.6e}", s.species, s.amount, s.mole_fraction);
            }
        }
        RunReport::StaticFlow(r) => {
            println!("[{}] static flow ({} mode)", r.id, r.mode);
            println!(
                "  totals: Pt = {:.5} bar, Tt = {:.3} K, ht = {:.1} J/kg",
                r.pt_bar, r.tt_k, r.ht_j_kg
            );
            println!(
                "  statics: Ps = {:.5} bar, Ts = {:.3} K, hs = {:.1} J/kg, rho = {:.5} kg/m³",
                r.ps_bar, r.ts_k, r.hs_j_kg, r.rho_kg_m3
            );
            println!(
                "  MN = {:.5} (from ht - hs: {:.5}), V = {:.3} m/s, Vsonic = {:.3} m/s",
                r.mach, r.mach_from_enthalpy, r.v_m_s, r.vsonic_m_s
            );
            match r.area_m2 {
                Some(area) => println!("  A = {:.6} m² at W = {} kg/s", area, r.mass_flow_kg_s),
                None => println!("  A = unbounded (stagnant flow)"),
            }
            println!("  converged in {} iterations", r.iterations);
        }
        RunReport::Sweep(r) => {
            println!(
                "[{}] temperature sweep at {} bar ({} ok, {} failed)",
                r.id, r.pressure_bar, r.num_successful, r.num_failed
            );
            println!("  {:>10} {:>14} {:>14} {:>10}", "T [K]", "h [cal/g]", "S [cal/gK]", "gamma");
            for p in &r.points {
                match (&p.error, p.h_cal_g, p.s_cal_g_k, p.gamma) {
                    (None, Some(h), Some(s), Some(g)) => {
                        println!("  {:>10.2} {:>14.5} {:>14.6} {:>10.5}", p.temperature_k, h, s, g)
                    }
                    (Some(err), ..) => println!("  {:>10.2} failed: {}", p.temperature_k, err),
                    _ => println!("  {:>10.2} -", p.temperature_k),
                }
            }
        }
    }
}

fn cmd_species(filter: &str) {
    let entries = ceq_thermo::filter_species_catalog(filter);
    if entries.is_empty() {
        println!("No species match '{filter}'");
        return;
    }
    for entry in entries {
        let (t_min, t_max) = entry.fit.range();
        println!(
            "  {:<6} {:<20} {:>7.1} - {:>7.1} K",
            entry.canonical_id, entry.display_name, t_min, t_max
        );
    }
}
