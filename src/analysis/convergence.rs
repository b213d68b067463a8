use serde::{Deserialize, Serialize};

use crate::error::{ConstructionError, Result};
use crate::math::regression::linear_fit;
use crate::math::NEGLIGIBLE;

/// Stopping criteria for an iterative permeability estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConvergenceCriteria {
    /// Number of trailing samples used for the regression.
    pub window: usize,
    /// Upper bound on the magnitude of the normalized slope.
    pub slope: f64,
    /// Upper bound on the magnitude of the relative prediction error.
    pub error_bound: f64,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            window: 10,
            slope: 0.01,
            error_bound: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConvergenceState {
    /// No more than `window` samples seen.
    Collecting,
    /// Enough samples to evaluate the criteria.
    Active,
}

/// Derived values of one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvergenceEstimate {
    pub slope: f64,
    pub predicted: f64,
    pub relative_error: f64,
    pub converged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub iteration: f64,
    pub value: f64,
}

/// Snapshot for results writers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvergenceReport {
    pub state: ConvergenceState,
    #[serde(flatten)]
    pub estimate: ConvergenceEstimate,
    pub history: Vec<Sample>,
}

/// Decides when a sequence of permeability samples has stabilized.
///
/// Every query re-evaluates the last `window` samples. Iterations are
/// normalized by their maximum within the window and values by their maximum
/// over the whole history, a line is fitted through the normalized window and
/// extrapolated one iteration ahead.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    criteria: ConvergenceCriteria,
    history: Vec<Sample>,
}

impl ConvergenceMonitor {
    /// # Errors
    ///
    /// Returns `ConstructionError::InvalidParameter` for a window shorter
    /// than two samples.
    pub fn new(criteria: ConvergenceCriteria) -> Result<Self> {
        if criteria.window < 2 {
            return Err(ConstructionError::InvalidParameter(format!(
                "convergence window must hold at least 2 samples, got {}",
                criteria.window
            ))
            .into());
        }
        Ok(Self {
            criteria,
            history: Vec::new(),
        })
    }

    #[must_use]
    pub fn criteria(&self) -> &ConvergenceCriteria {
        &self.criteria
    }

    pub fn add_value(&mut self, iteration: f64, value: f64) {
        self.history.push(Sample { iteration, value });
    }

    #[must_use]
    pub fn history(&self) -> &[Sample] {
        &self.history
    }

    #[must_use]
    pub fn state(&self) -> ConvergenceState {
        if self.history.len() > self.criteria.window {
            ConvergenceState::Active
        } else {
            ConvergenceState::Collecting
        }
    }

    /// Evaluates the criteria on the current history.
    ///
    /// All fields are zero and `converged` is false while collecting, or
    /// when the window maximum iteration or the history maximum value is zero.
    #[must_use]
    pub fn estimate(&self) -> ConvergenceEstimate {
        let mut estimate = ConvergenceEstimate::default();
        if self.state() == ConvergenceState::Collecting {
            return estimate;
        }

        let window = &self.history[self.history.len() - self.criteria.window..];
        let max_iter = window
            .iter()
            .map(|s| s.iteration)
            .fold(f64::NEG_INFINITY, f64::max);
        let max_value = self
            .history
            .iter()
            .map(|s| s.value)
            .fold(f64::NEG_INFINITY, f64::max);
        if max_iter == 0.0 || max_value == 0.0 {
            return estimate;
        }

        let x: Vec<f64> = window.iter().map(|s| s.iteration / max_iter).collect();
        let y: Vec<f64> = window.iter().map(|s| s.value / max_value).collect();
        let Some(fit) = linear_fit(&x, &y) else {
            tracing::debug!("degenerate convergence window, iterations do not vary");
            return estimate;
        };

        estimate.slope = fit.slope;
        estimate.predicted = fit.at((max_iter + 1.0) / max_iter) * max_value;

        let current = window[window.len() - 1].value;
        if current.abs() > NEGLIGIBLE {
            estimate.relative_error = 1.0 - estimate.predicted / current;
        }

        estimate.converged = estimate.slope.abs() < self.criteria.slope
            && estimate.relative_error.abs() < self.criteria.error_bound;
        estimate
    }

    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.estimate().converged
    }

    #[must_use]
    pub fn slope(&self) -> f64 {
        self.estimate().slope
    }

    #[must_use]
    pub fn predicted_value(&self) -> f64 {
        self.estimate().predicted
    }

    #[must_use]
    pub fn relative_error(&self) -> f64 {
        self.estimate().relative_error
    }

    #[must_use]
    pub fn report(&self) -> ConvergenceReport {
        ConvergenceReport {
            state: self.state(),
            estimate: self.estimate(),
            history: self.history.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn monitor(window: usize) -> ConvergenceMonitor {
        ConvergenceMonitor::new(ConvergenceCriteria {
            window,
            ..ConvergenceCriteria::default()
        })
        .unwrap()
    }

    #[test]
    fn constant_samples_converge() {
        let mut m = monitor(5);
        for i in 1..=20 {
            m.add_value(f64::from(i), 3.5e-12);
        }
        assert!(m.is_converged());
        assert_abs_diff_eq!(m.slope(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.relative_error(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(m.predicted_value(), 3.5e-12, max_relative = 1e-9);
    }

    #[test]
    fn linear_growth_does_not_converge() {
        let mut m = monitor(5);
        for i in 1..=20 {
            m.add_value(f64::from(i), f64::from(i));
        }
        let estimate = m.estimate();
        assert!(!estimate.converged);
        assert!(estimate.slope > 0.01);
        // Exact line: prediction is the next value.
        assert_relative_eq!(estimate.predicted, 21.0, max_relative = 1e-9);
    }

    #[test]
    fn collecting_until_window_is_exceeded() {
        let mut m = monitor(5);
        for i in 1..=5 {
            m.add_value(f64::from(i), 1.0);
        }
        assert_eq!(m.state(), ConvergenceState::Collecting);
        assert!(!m.is_converged());
        assert_eq!(m.estimate(), ConvergenceEstimate::default());

        m.add_value(6.0, 1.0);
        assert_eq!(m.state(), ConvergenceState::Active);
        assert!(m.is_converged());
    }

    #[test]
    fn transient_then_plateau() {
        let mut m = monitor(5);
        for i in 1..=10 {
            m.add_value(f64::from(i), f64::from(i) * 10.0);
        }
        assert!(!m.is_converged());
        for i in 11..=20 {
            m.add_value(f64::from(i), 100.0);
        }
        assert!(m.is_converged());
    }

    #[test]
    fn values_scale_by_history_maximum() {
        let mut m = monitor(3);
        m.add_value(1.0, 1000.0);
        m.add_value(2.0, 10.0);
        m.add_value(3.0, 10.1);
        m.add_value(4.0, 10.2);
        // Window x = [2, 3, 4] / 4, y = [10, 10.1, 10.2] / 1000.
        let estimate = m.estimate();
        assert_relative_eq!(estimate.slope, 0.4 / 1000.0, max_relative = 1e-9);
        assert_relative_eq!(estimate.predicted, 10.3, max_relative = 1e-9);
        assert_relative_eq!(
            estimate.relative_error,
            1.0 - 10.3 / 10.2,
            max_relative = 1e-6
        );
        assert!(estimate.converged);
        assert_eq!(m.criteria().window, 3);
    }

    #[test]
    fn zero_values_never_converge() {
        let mut m = monitor(3);
        for i in 0..10 {
            m.add_value(f64::from(i), 0.0);
        }
        assert_eq!(m.estimate(), ConvergenceEstimate::default());
    }

    #[test]
    fn window_below_two_is_rejected() {
        let criteria = ConvergenceCriteria {
            window: 1,
            ..ConvergenceCriteria::default()
        };
        assert!(ConvergenceMonitor::new(criteria).is_err());
    }

    #[test]
    fn report_flattens_estimate() {
        let mut m = monitor(2);
        for i in 1..=4 {
            m.add_value(f64::from(i), 2.0);
        }
        let report = m.report();
        assert_eq!(report.history.len(), 4);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["state"], "active");
        assert_eq!(json["converged"], true);
        assert_eq!(json["history"][0]["iteration"], 1.0);
    }
}
