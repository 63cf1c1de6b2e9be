//! Static-flow resolution: Mach number, area, velocity and speed of sound.
//!
//! Unknowns are `(Ps, V, Vsonic, free)` where `free` is the area in Mach
//! mode and the Mach number in area mode. `Ps` enters the residuals only
//! through the static thermodynamic state supplied by the caller, so the
//! resolver evaluates residuals and partials for a given state while the
//! caller (or `station::StaticStation`) closes the pressure loop.

pub mod explicit;
pub mod guess;
pub mod residual;

use crate::block::BlockMatrix;
use crate::error::{SolverError, SolverResult};
use guess::{AreaGuessInputs, area_mode_guess, isentropic_ps, validate_guess};
use residual::{FlowKinematics, StaticResiduals, target_mismatch};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub use explicit::{ExplicitOutputs, ExplicitPartials, KnownStaticInputs, explicit_outputs, explicit_partials};

/// Bounds on the static pressure [bar].
pub const PS_BOUNDS: (f64, f64) = (1e-4, 5e4);

/// Lower bound of the free unknown when it is the area [m²] (Mach mode).
pub const AREA_LOWER_BOUND: f64 = 1e-5;

/// Lower bound of the free unknown when it is the Mach number (area mode).
pub const MACH_LOWER_BOUND: f64 = 1e-3;

/// Residual reference values for the `Ps`, `V`, `Vsonic` and free rows.
pub const RESIDUAL_REFS: [f64; 4] = [1.0, 1e3, 1e3, 1.0];

/// Which of Mach number and area is the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaticMode {
    /// Mach number is an input, area is solved for.
    Mach,
    /// Area is an input, Mach number is solved for.
    Area,
}

impl StaticMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaticMode::Mach => "MN",
            StaticMode::Area => "area",
        }
    }
}

impl fmt::Display for StaticMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StaticMode {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MN" => Ok(StaticMode::Mach),
            "area" => Ok(StaticMode::Area),
            other => Err(SolverError::invalid(format!(
                "mode must be either \"MN\" or \"area\", but \"{other}\" was given"
            ))),
        }
    }
}

/// Flow area [m²]; stagnant flow has no finite choke area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlowArea {
    Finite(f64),
    Unbounded,
}

impl FlowArea {
    /// Numeric value, `+inf` when unbounded.
    pub fn value(&self) -> f64 {
        match self {
            FlowArea::Finite(a) => *a,
            FlowArea::Unbounded => f64::INFINITY,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, FlowArea::Unbounded)
    }
}

/// The held Mach number or area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlowTarget {
    Mach(f64),
    Area(FlowArea),
}

impl FlowTarget {
    pub fn mode(&self) -> StaticMode {
        match self {
            FlowTarget::Mach(_) => StaticMode::Mach,
            FlowTarget::Area(_) => StaticMode::Area,
        }
    }
}

/// Values used only to seed the static pressure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticGuess {
    /// Total-state gamma
    pub gamt: f64,
    /// Total pressure [bar]
    pub pt_bar: f64,
    /// Mach number estimate, area mode only
    pub mach: f64,
}

impl Default for StaticGuess {
    fn default() -> Self {
        Self {
            gamt: 1.4,
            pt_bar: 1.0,
            mach: 0.5,
        }
    }
}

/// Inputs of the static-flow residuals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticInputs {
    /// Static temperature [K]
    pub ts: f64,
    /// Total enthalpy [J/kg]
    pub ht: f64,
    /// Static enthalpy [J/kg]
    pub hs: f64,
    /// Mixture moles [mol/g]
    pub n_moles: f64,
    pub gamma: f64,
    /// Mass flow [kg/s]
    pub w: f64,
    /// Static density [kg/m³]
    pub rho: f64,
    pub target: FlowTarget,
    pub guess: StaticGuess,
}

/// The four static-flow unknowns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticState {
    /// Static pressure [bar]
    pub ps_bar: f64,
    /// Velocity [m/s]
    pub v: f64,
    /// Speed of sound [m/s]
    pub vsonic: f64,
    /// Area [m²] in Mach mode, Mach number in area mode
    pub free: f64,
}

impl Default for StaticState {
    fn default() -> Self {
        Self {
            ps_bar: 1.0,
            v: 1.0,
            vsonic: 1.0,
            free: 0.5,
        }
    }
}

/// Rows of the static partials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaticRow {
    Ps,
    V,
    Vsonic,
    Free,
}

/// Columns of the static partials: states first, then inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaticVar {
    PsState,
    VState,
    VsonicState,
    FreeState,
    Ts,
    Ht,
    Hs,
    NMoles,
    Gamma,
    W,
    Rho,
    /// Mach number (Mach mode) or area (area mode)
    Target,
}

impl StaticVar {
    pub const ALL: [StaticVar; 12] = [
        StaticVar::PsState,
        StaticVar::VState,
        StaticVar::VsonicState,
        StaticVar::FreeState,
        StaticVar::Ts,
        StaticVar::Ht,
        StaticVar::Hs,
        StaticVar::NMoles,
        StaticVar::Gamma,
        StaticVar::W,
        StaticVar::Rho,
        StaticVar::Target,
    ];
}

/// Analytic partials of the four residuals.
#[derive(Debug, Clone)]
pub struct StaticPartials {
    matrix: BlockMatrix<StaticRow, StaticVar>,
}

impl StaticPartials {
    pub fn get(&self, row: StaticRow, var: StaticVar) -> f64 {
        self.matrix.block(row, var).map_or(0.0, |b| b[(0, 0)])
    }

    /// Dense 4 x 12 matrix in `StaticRow` x `StaticVar::ALL` order.
    pub fn matrix(&self) -> &nalgebra::DMatrix<f64> {
        self.matrix.matrix()
    }
}

/// Resolved static outputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticOutputs {
    pub ps_bar: f64,
    pub v: f64,
    pub vsonic: f64,
    pub mach: f64,
    pub area: FlowArea,
}

/// Static-flow resolver context for one mode.
///
/// Keeps the last state and the last applied pressure guess between calls.
#[derive(Debug, Clone)]
pub struct StaticFlowResolver {
    mode: StaticMode,
    state: StaticState,
    ps_guess_cache: Option<f64>,
}

impl StaticFlowResolver {
    pub fn new(mode: StaticMode) -> Self {
        Self {
            mode,
            state: StaticState::default(),
            ps_guess_cache: None,
        }
    }

    /// Configure from a mode name (`"MN"` or `"area"`).
    pub fn with_mode_name(mode: &str) -> SolverResult<Self> {
        Ok(Self::new(mode.parse()?))
    }

    pub fn mode(&self) -> StaticMode {
        self.mode
    }

    pub fn state(&self) -> &StaticState {
        &self.state
    }

    pub fn set_state(&mut self, state: StaticState) {
        self.state = state;
    }

    fn check_target(&self, inputs: &StaticInputs) -> SolverResult<()> {
        if inputs.target.mode() == self.mode {
            Ok(())
        } else {
            Err(target_mismatch(self.mode, inputs.target))
        }
    }

    /// Seed the static pressure from the isentropic relation.
    ///
    /// Mach mode seeds only once and afterwards keeps the warm-started value;
    /// area mode reseeds whenever the estimate moves by more than `1e-10`.
    /// Returns the applied guess, if any.
    pub fn guess(&mut self, inputs: &StaticInputs) -> SolverResult<Option<f64>> {
        self.check_target(inputs)?;
        let g = inputs.guess;
        validate_guess(g.pt_bar, g.gamt)?;

        let (ps_guess, reseed) = match inputs.target {
            FlowTarget::Mach(mach) => (isentropic_ps(g.pt_bar, g.gamt, mach), self.ps_guess_cache.is_none()),
            FlowTarget::Area(area) => {
                let estimate = area_mode_guess(&AreaGuessInputs {
                    pt_bar: g.pt_bar,
                    gamt: g.gamt,
                    mach_guess: g.mach,
                    w: inputs.w,
                    ts: inputs.ts,
                    n_moles: inputs.n_moles,
                    area,
                })?;
                (estimate.ps_bar, true)
            }
        };

        let moved = self.ps_guess_cache.is_none_or(|c| (ps_guess - c).abs() > 1e-10);
        if moved && reseed {
            debug!(mode = %self.mode, ps_bar = ps_guess, "seeding static pressure");
            self.state.ps_bar = ps_guess.clamp(PS_BOUNDS.0, PS_BOUNDS.1);
            self.ps_guess_cache = Some(ps_guess);
            return Ok(Some(ps_guess));
        }
        Ok(None)
    }

    /// Explicit quantities implied by `inputs`.
    pub fn kinematics(&self, inputs: &StaticInputs) -> SolverResult<FlowKinematics> {
        residual::kinematics(self.mode, inputs)
    }

    /// Set `V`, `Vsonic` and the free output from the inputs, keeping `Ps`.
    pub fn update_explicit(&mut self, inputs: &StaticInputs) -> SolverResult<StaticOutputs> {
        let k = self.kinematics(inputs)?;
        self.state.v = k.v;
        self.state.vsonic = k.vsonic;
        self.state.free = match self.mode {
            // The state keeps its last finite area when the flow stagnates.
            StaticMode::Mach => match k.area {
                FlowArea::Finite(a) => a,
                FlowArea::Unbounded => self.state.free,
            },
            StaticMode::Area => k.mach,
        };
        Ok(StaticOutputs {
            ps_bar: self.state.ps_bar,
            v: k.v,
            vsonic: k.vsonic,
            mach: k.mach,
            area: k.area,
        })
    }

    /// Residuals of `state` (default: the resolver's own state).
    pub fn residuals(&self, inputs: &StaticInputs, state: Option<&StaticState>) -> SolverResult<StaticResiduals> {
        residual::evaluate(self.mode, inputs, state.unwrap_or(&self.state))
    }

    /// Partials of the residuals w.r.t. states and inputs.
    pub fn partials(&self, inputs: &StaticInputs) -> SolverResult<StaticPartials> {
        Ok(StaticPartials {
            matrix: residual::partials(self.mode, inputs)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jacobian::central_difference_jacobian;
    use nalgebra::DVector;

    fn inputs(target: FlowTarget) -> StaticInputs {
        StaticInputs {
            ts: 559.7,
            ht: 304_795.0,
            hs: 264_740.0,
            n_moles: 0.034524,
            gamma: 1.383,
            w: 10.0,
            rho: 0.9788,
            target,
            guess: StaticGuess {
                gamt: 1.376,
                pt_bar: 2.0,
                mach: 0.5,
            },
        }
    }

    #[test]
    fn mode_names() {
        assert_eq!("MN".parse::<StaticMode>().unwrap(), StaticMode::Mach);
        assert_eq!("area".parse::<StaticMode>().unwrap(), StaticMode::Area);
        let err = StaticFlowResolver::with_mode_name("Mach").unwrap_err();
        assert!(err.to_string().contains("\"Mach\""));
    }

    #[test]
    fn mach_mode_consistency() {
        let mut resolver = StaticFlowResolver::new(StaticMode::Mach);
        let inp = inputs(FlowTarget::Mach(0.6));
        let out = resolver.update_explicit(&inp).unwrap();
        let FlowArea::Finite(a) = out.area else {
            panic!("finite area expected");
        };
        assert!((a * inp.rho * out.vsonic * 0.6 - inp.w).abs() < 1e-12);
        assert!((out.v - 0.6 * out.vsonic).abs() < 1e-12);

        let r = resolver.residuals(&inp, None).unwrap();
        assert_eq!((r.v, r.vsonic, r.free), (0.0, 0.0, 0.0));
    }

    #[test]
    fn area_mode_consistency() {
        let mut resolver = StaticFlowResolver::new(StaticMode::Area);
        let inp = inputs(FlowTarget::Area(FlowArea::Finite(0.036)));
        let out = resolver.update_explicit(&inp).unwrap();
        assert!((out.mach - inp.w / (inp.rho * out.vsonic * 0.036)).abs() < 1e-14);
        assert_eq!(resolver.state().free, out.mach);
    }

    #[test]
    fn zero_flow_gives_unbounded_area() {
        let resolver = StaticFlowResolver::new(StaticMode::Mach);
        let mut inp = inputs(FlowTarget::Mach(0.6));
        inp.w = 0.0;
        let k = resolver.kinematics(&inp).unwrap();
        assert!(k.area.is_unbounded());
        let r = resolver.residuals(&inp, None).unwrap();
        assert_eq!(r.free, 0.0);

        inp.w = 10.0;
        inp.target = FlowTarget::Mach(0.0);
        assert!(resolver.kinematics(&inp).unwrap().area.is_unbounded());
        assert!(resolver.partials(&inp).is_ok());
    }

    #[test]
    fn unbounded_area_input_means_stagnant_flow() {
        let resolver = StaticFlowResolver::new(StaticMode::Area);
        let inp = inputs(FlowTarget::Area(FlowArea::Unbounded));
        let k = resolver.kinematics(&inp).unwrap();
        assert_eq!(k.mach, 0.0);
        assert_eq!(k.v, 0.0);
    }

    #[test]
    fn degenerate_inputs_are_domain_errors() {
        let resolver = StaticFlowResolver::new(StaticMode::Area);
        let mut inp = inputs(FlowTarget::Area(FlowArea::Finite(0.036)));
        inp.rho = 0.0;
        assert!(matches!(
            resolver.kinematics(&inp),
            Err(SolverError::Domain { what: "Mach number", .. })
        ));

        let mut inp = inputs(FlowTarget::Area(FlowArea::Finite(0.036)));
        inp.ts = -10.0;
        let err = resolver.residuals(&inp, None).unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("Ts=-10"));
    }

    #[test]
    fn target_must_match_mode() {
        let mut resolver = StaticFlowResolver::new(StaticMode::Mach);
        let inp = inputs(FlowTarget::Area(FlowArea::Finite(0.036)));
        assert!(matches!(resolver.guess(&inp), Err(SolverError::InvalidInput { .. })));
        assert!(resolver.residuals(&inp, None).is_err());
    }

    #[test]
    fn mach_guess_seeds_once() {
        let mut resolver = StaticFlowResolver::new(StaticMode::Mach);
        let mut inp = inputs(FlowTarget::Mach(0.6));
        let first = resolver.guess(&inp).unwrap().unwrap();
        assert!((first - isentropic_ps(2.0, 1.376, 0.6)).abs() < 1e-15);
        assert_eq!(resolver.state().ps_bar, first);

        resolver.set_state(StaticState {
            ps_bar: 1.5728,
            ..*resolver.state()
        });
        inp.target = FlowTarget::Mach(0.65);
        assert_eq!(resolver.guess(&inp).unwrap(), None);
        assert_eq!(resolver.state().ps_bar, 1.5728);
    }

    #[test]
    fn area_guess_reseeds_when_estimate_moves() {
        let mut resolver = StaticFlowResolver::new(StaticMode::Area);
        let mut inp = inputs(FlowTarget::Area(FlowArea::Finite(0.036222)));
        assert!(resolver.guess(&inp).unwrap().is_some());
        // Same inputs: same estimate, nothing applied.
        assert_eq!(resolver.guess(&inp).unwrap(), None);
        inp.guess.pt_bar = 2.1;
        assert!(resolver.guess(&inp).unwrap().is_some());
    }

    fn check_partials(mode: StaticMode, target: FlowTarget, state: StaticState) {
        let resolver = StaticFlowResolver::new(mode);
        let base = inputs(target);
        let partials = resolver.partials(&base).unwrap();

        // x = [Ps, V, Vsonic, free, Ts, ht, hs, n_moles, gamma, W, rho, target]
        let target_value = match target {
            FlowTarget::Mach(m) => m,
            FlowTarget::Area(a) => a.value(),
        };
        let x = DVector::from_vec(vec![
            state.ps_bar,
            state.v,
            state.vsonic,
            state.free,
            base.ts,
            base.ht,
            base.hs,
            base.n_moles,
            base.gamma,
            base.w,
            base.rho,
            target_value,
        ]);
        let f = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            let inp = StaticInputs {
                ts: x[4],
                ht: x[5],
                hs: x[6],
                n_moles: x[7],
                gamma: x[8],
                w: x[9],
                rho: x[10],
                target: match mode {
                    StaticMode::Mach => FlowTarget::Mach(x[11]),
                    StaticMode::Area => FlowTarget::Area(FlowArea::Finite(x[11])),
                },
                guess: base.guess,
            };
            let st = StaticState {
                ps_bar: x[0],
                v: x[1],
                vsonic: x[2],
                free: x[3],
            };
            Ok(DVector::from_row_slice(&resolver.residuals(&inp, Some(&st))?.to_array()))
        };
        let fd = central_difference_jacobian(&x, f, 1e-6).unwrap();
        let analytic = partials.matrix();
        for i in 0..4 {
            // Rounding in a residual of size |x_i| divided by a step of 1e-6 |x_j|.
            let row_magnitude = x[i].abs().max(1.0);
            for j in 0..12 {
                let scale = analytic[(i, j)].abs().max(fd[(i, j)].abs());
                let noise = 1e-8 * row_magnitude / x[j].abs().max(1e-12);
                assert!(
                    (fd[(i, j)] - analytic[(i, j)]).abs() < 1e-5 * scale + noise,
                    "d{:?}/d{:?}: fd {} analytic {}",
                    [StaticRow::Ps, StaticRow::V, StaticRow::Vsonic, StaticRow::Free][i],
                    StaticVar::ALL[j],
                    fd[(i, j)],
                    analytic[(i, j)]
                );
            }
        }
    }

    #[test]
    fn mach_mode_partials_match_finite_differences() {
        let state = StaticState {
            ps_bar: 1.57,
            v: 280.0,
            vsonic: 470.0,
            free: 0.035,
        };
        check_partials(StaticMode::Mach, FlowTarget::Mach(0.6), state);
    }

    #[test]
    fn area_mode_partials_match_finite_differences() {
        let state = StaticState {
            ps_bar: 1.57,
            v: 280.0,
            vsonic: 470.0,
            free: 0.61,
        };
        check_partials(StaticMode::Area, FlowTarget::Area(FlowArea::Finite(0.036)), state);
    }
}
