//! Newton solver with a bounded Armijo line search.

use crate::error::{SolverError, SolverResult};
use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace};

/// A square nonlinear system `R(x) = 0` with an analytic Jacobian.
///
/// `residuals` takes `&mut self` because systems may carry per-evaluation
/// state (trace masks, cached property vectors) that the next Jacobian reads.
pub trait ImplicitSystem {
    fn len(&self) -> usize;

    fn residuals(&mut self, x: &DVector<f64>) -> SolverResult<DVector<f64>>;

    /// Jacobian at `x`; called after `residuals` was evaluated at the same `x`.
    fn jacobian(&mut self, x: &DVector<f64>) -> SolverResult<DMatrix<f64>>;

    fn bounds(&self) -> Option<Bounds> {
        None
    }

    /// Per-row residual reference values; the convergence norm uses `R_i / ref_i`.
    fn residual_refs(&self) -> Option<DVector<f64>> {
        None
    }

    /// Unknowns projected onto their bounds one by one under every
    /// `BoundEnforcement`; they never shorten a scaled step.
    fn floored_unknowns(&self) -> Vec<usize> {
        Vec::new()
    }
}

/// Box bounds on the unknowns.
#[derive(Clone, Debug, PartialEq)]
pub struct Bounds {
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
}

impl Bounds {
    pub fn unbounded(len: usize) -> Self {
        Self {
            lower: DVector::from_element(len, f64::NEG_INFINITY),
            upper: DVector::from_element(len, f64::INFINITY),
        }
    }

    /// Project every component onto its bound.
    pub fn clamp(&self, x: &mut DVector<f64>) {
        for i in 0..x.len() {
            x[i] = x[i].max(self.lower[i]).min(self.upper[i]);
        }
    }

    /// Scale `dx` as a whole so that `x + dx` stays in bounds.
    ///
    /// Components already on a bound and pushing outward are dropped from the
    /// step first, so they cannot shrink it to zero. Components listed in
    /// `floored` keep their full step, projected onto the bounds.
    pub fn scale_step(&self, x: &DVector<f64>, dx: &DVector<f64>, floored: &[usize]) -> DVector<f64> {
        let mut d = dx.clone();
        let mut alpha: f64 = 1.0;
        for i in 0..d.len() {
            if floored.contains(&i) {
                continue;
            }
            if d[i] < 0.0 {
                if x[i] <= self.lower[i] {
                    d[i] = 0.0;
                } else {
                    alpha = alpha.min((self.lower[i] - x[i]) / d[i]);
                }
            } else if d[i] > 0.0 {
                if x[i] >= self.upper[i] {
                    d[i] = 0.0;
                } else {
                    alpha = alpha.min((self.upper[i] - x[i]) / d[i]);
                }
            }
        }
        d *= alpha;
        for &i in floored {
            d[i] = (x[i] + dx[i]).max(self.lower[i]).min(self.upper[i]) - x[i];
        }
        d
    }
}

/// How the line search keeps trial points inside the bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoundEnforcement {
    /// Project each violating component onto its bound.
    #[default]
    Clamp,
    /// Shorten the whole step until every component is feasible. Floored
    /// unknowns (species amounts) are still projected one by one.
    ScaleStep,
}

/// Armijo-Goldstein backtracking configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct LineSearchConfig {
    /// Backtracks allowed for insufficient decrease; the last trial is then accepted.
    pub max_backtracks: usize,
    /// Armijo sufficient-decrease constant.
    pub c: f64,
    /// Step reduction factor per backtrack.
    pub factor: f64,
    /// Backtracks allowed when a trial point cannot be evaluated.
    pub max_error_backtracks: usize,
    pub bounds: BoundEnforcement,
}

impl Default for LineSearchConfig {
    fn default() -> Self {
        Self {
            max_backtracks: 2,
            c: 0.1,
            factor: 0.5,
            max_error_backtracks: 8,
            bounds: BoundEnforcement::Clamp,
        }
    }
}

/// Newton solver configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct NewtonConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Absolute tolerance for the scaled residual norm
    pub abs_tol: f64,
    /// Tolerance relative to the initial scaled residual norm
    pub rel_tol: f64,
    pub line_search: LineSearchConfig,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            abs_tol: 1e-10,
            rel_tol: 1e-10,
            line_search: LineSearchConfig::default(),
        }
    }
}

/// Newton iteration result.
#[derive(Clone, Debug)]
pub struct NewtonResult {
    /// Solution vector
    pub x: DVector<f64>,
    /// Unscaled residuals at `x`
    pub residuals: DVector<f64>,
    /// Final scaled residual norm
    pub residual_norm: f64,
    /// Scaled residual norm at the starting point
    pub initial_norm: f64,
    /// Number of Newton steps taken
    pub iterations: usize,
}

fn scaled_norm(r: &DVector<f64>, refs: &DVector<f64>) -> f64 {
    r.iter()
        .zip(refs.iter())
        .map(|(ri, si)| (ri / si).powi(2))
        .sum::<f64>()
        .sqrt()
}

struct Trial {
    x: DVector<f64>,
    r: DVector<f64>,
    norm: f64,
    alpha: f64,
}

/// Solve `system` from `x0`.
///
/// Fails with `ConvergenceFailed` (carrying the last residual norm) when the
/// iteration cap is reached; never returns an unconverged point as success.
pub fn solve<S>(system: &mut S, x0: DVector<f64>, config: &NewtonConfig) -> SolverResult<NewtonResult>
where
    S: ImplicitSystem + ?Sized,
{
    let n = system.len();
    if x0.len() != n {
        return Err(SolverError::invalid(format!(
            "initial guess has {} entries, system has {n}",
            x0.len()
        )));
    }
    let refs = system
        .residual_refs()
        .unwrap_or_else(|| DVector::from_element(n, 1.0));
    let bounds = system.bounds();
    let floored = system.floored_unknowns();

    let mut x = x0;
    if let Some(b) = &bounds {
        b.clamp(&mut x);
    }
    let mut r = system.residuals(&x)?;
    let mut r_norm = scaled_norm(&r, &refs);
    if !r_norm.is_finite() {
        return Err(SolverError::Numeric {
            what: "non-finite residual at initial guess".to_string(),
        });
    }
    let r0_norm = r_norm;

    for iter in 0..=config.max_iterations {
        debug!(iteration = iter, residual_norm = r_norm, "newton");

        // Check convergence
        if r_norm < config.abs_tol || r_norm < config.rel_tol * r0_norm {
            return Ok(NewtonResult {
                x,
                residuals: r,
                residual_norm: r_norm,
                initial_norm: r0_norm,
                iterations: iter,
            });
        }
        if iter == config.max_iterations {
            break;
        }

        let jac = system.jacobian(&x)?;

        // Solve J * dx = -r
        let dx = jac
            .lu()
            .solve(&(-&r))
            .filter(|dx| dx.iter().all(|v| v.is_finite()))
            .ok_or_else(|| SolverError::Numeric {
                what: format!("singular Jacobian at iteration {iter}"),
            })?;

        let limits = bounds.as_ref().map(|b| (b, floored.as_slice()));
        let step = line_search(system, &x, &dx, r_norm, &refs, limits, &config.line_search)?;
        trace!(alpha = step.alpha, norm = step.norm, "line search accepted");

        x = step.x;
        r = step.r;
        r_norm = step.norm;
    }

    Err(SolverError::ConvergenceFailed {
        iterations: config.max_iterations,
        residual_norm: r_norm,
    })
}

fn line_search<S>(
    system: &mut S,
    x: &DVector<f64>,
    dx: &DVector<f64>,
    norm0: f64,
    refs: &DVector<f64>,
    limits: Option<(&Bounds, &[usize])>,
    cfg: &LineSearchConfig,
) -> SolverResult<Trial>
where
    S: ImplicitSystem + ?Sized,
{
    // Bound enforcement fixes the search direction before any backtracking.
    let direction = match (limits, cfg.bounds) {
        (Some((b, _)), BoundEnforcement::Clamp) => {
            let mut full = x + dx;
            b.clamp(&mut full);
            full - x
        }
        (Some((b, floored)), BoundEnforcement::ScaleStep) => b.scale_step(x, dx, floored),
        (None, _) => dx.clone(),
    };
    let bounds = limits.map(|(b, _)| b);

    let mut alpha = 1.0;
    let mut backtracks = 0;
    let mut error_backtracks = 0;
    loop {
        let mut trial = x + &direction * alpha;
        if let Some(b) = bounds {
            b.clamp(&mut trial);
        }

        let failure = match system.residuals(&trial) {
            Ok(r) => {
                let norm = scaled_norm(&r, refs);
                if norm.is_finite() {
                    if norm <= (1.0 - cfg.c * alpha) * norm0 || backtracks >= cfg.max_backtracks {
                        return Ok(Trial {
                            x: trial,
                            r,
                            norm,
                            alpha,
                        });
                    }
                    backtracks += 1;
                    alpha *= cfg.factor;
                    continue;
                }
                SolverError::Numeric {
                    what: "non-finite residual in line search".to_string(),
                }
            }
            Err(e) if e.is_retryable() => e,
            Err(e) => return Err(e),
        };

        if error_backtracks >= cfg.max_error_backtracks {
            return Err(failure);
        }
        debug!(alpha, error = %failure, "trial point rejected, backtracking");
        error_backtracks += 1;
        alpha *= cfg.factor;
    }
}

/// Adapter turning a residual/Jacobian closure pair into an `ImplicitSystem`.
pub struct FnSystem<F, J> {
    len: usize,
    residual_fn: F,
    jacobian_fn: J,
    bounds: Option<Bounds>,
}

impl<F, J> FnSystem<F, J>
where
    F: FnMut(&DVector<f64>) -> SolverResult<DVector<f64>>,
    J: FnMut(&DVector<f64>) -> SolverResult<DMatrix<f64>>,
{
    pub fn new(len: usize, residual_fn: F, jacobian_fn: J) -> Self {
        Self {
            len,
            residual_fn,
            jacobian_fn,
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

impl<F, J> ImplicitSystem for FnSystem<F, J>
where
    F: FnMut(&DVector<f64>) -> SolverResult<DVector<f64>>,
    J: FnMut(&DVector<f64>) -> SolverResult<DMatrix<f64>>,
{
    fn len(&self) -> usize {
        self.len
    }

    fn residuals(&mut self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        (self.residual_fn)(x)
    }

    fn jacobian(&mut self, x: &DVector<f64>) -> SolverResult<DMatrix<f64>> {
        (self.jacobian_fn)(x)
    }

    fn bounds(&self) -> Option<Bounds> {
        self.bounds.clone()
    }
}

/// Newton solve of a closure-defined system.
pub fn newton_solve<F, J>(
    x0: DVector<f64>,
    residual_fn: F,
    jacobian_fn: J,
    config: &NewtonConfig,
) -> SolverResult<NewtonResult>
where
    F: FnMut(&DVector<f64>) -> SolverResult<DVector<f64>>,
    J: FnMut(&DVector<f64>) -> SolverResult<DMatrix<f64>>,
{
    let mut system = FnSystem::new(x0.len(), residual_fn, jacobian_fn);
    solve(&mut system, x0, config)
}
