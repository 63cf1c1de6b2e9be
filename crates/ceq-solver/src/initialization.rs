//! Warm-start policy for repeated solves of one configuration.
//!
//! A solver context keeps its converged state between calls. Before each
//! solve the policy decides whether that state is trustworthy or whether the
//! context must be reset to its uniform starting guess.

/// Why a warm-started state was discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResetReason {
    /// No previous residual norm is known (fresh context or failed last solve).
    NoHistory,
    /// The last residual norm exceeded the threshold.
    LargeResidual(f64),
    /// The last residual norm was exactly zero.
    ZeroResidual,
    /// A species amount went negative.
    NegativeAmount,
}

impl ResetReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResetReason::NoHistory => "no history",
            ResetReason::LargeResidual(_) => "large residual",
            ResetReason::ZeroResidual => "zero residual",
            ResetReason::NegativeAmount => "negative amount",
        }
    }
}

/// Guard conditions for discarding a warm-start state.
#[derive(Debug, Clone, PartialEq)]
pub struct WarmStartPolicy {
    /// Residual norm above which the previous state is discarded
    pub reset_threshold: f64,
    /// Temperature [K] restored on reset when temperature is solved for
    pub reset_temperature: f64,
}

impl Default for WarmStartPolicy {
    fn default() -> Self {
        Self {
            reset_threshold: 1e-2,
            reset_temperature: 1000.0,
        }
    }
}

impl WarmStartPolicy {
    /// Decide whether to reset, given the last residual norm and current amounts.
    pub fn check(&self, last_norm: Option<f64>, amounts: &[f64]) -> Option<ResetReason> {
        match last_norm {
            None => Some(ResetReason::NoHistory),
            Some(norm) if norm.is_nan() || norm > self.reset_threshold => Some(ResetReason::LargeResidual(norm)),
            Some(norm) if norm == 0.0 => Some(ResetReason::ZeroResidual),
            Some(_) if amounts.iter().any(|n| *n < 0.0) => Some(ResetReason::NegativeAmount),
            Some(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds() {
        let policy = WarmStartPolicy::default();
        assert_eq!(policy.reset_threshold, 1e-2);
        assert_eq!(policy.reset_temperature, 1000.0);
    }

    #[test]
    fn guard_conditions() {
        let policy = WarmStartPolicy::default();
        let ok = [0.1, 0.2];
        assert_eq!(policy.check(None, &ok), Some(ResetReason::NoHistory));
        assert_eq!(
            policy.check(Some(0.5), &ok),
            Some(ResetReason::LargeResidual(0.5))
        );
        assert_eq!(policy.check(Some(0.0), &ok), Some(ResetReason::ZeroResidual));
        assert_eq!(
            policy.check(Some(1e-6), &[0.1, -1e-12]),
            Some(ResetReason::NegativeAmount)
        );
        assert_eq!(policy.check(Some(1e-6), &ok), None);
        assert!(policy.check(Some(f64::NAN), &ok).is_some());
    }

    #[test]
    fn reason_names_are_stable() {
        assert_eq!(ResetReason::NoHistory.as_str(), "no history");
        assert_eq!(ResetReason::NegativeAmount.as_str(), "negative amount");
    }
}
