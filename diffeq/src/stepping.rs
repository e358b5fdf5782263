use serde::{Deserialize, Serialize};
use tolerance::Tolerances;

/// Safety factor applied to every proposed step size change.
const SAFETY: f64 = 0.9;
/// Smallest factor a step may shrink by in one adjustment.
const MIN_FACTOR: f64 = 0.2;
/// Largest factor a step may grow by in one adjustment.
const MAX_FACTOR: f64 = 10.0;

/// Specifies the type of step size control strategy used by the ODE solver.
///
/// - `Fixed`: Uses a constant step size throughout integration.
/// - `Adaptive`: Dynamically adjusts step size based on local error estimates.
#[derive(Copy, Clone, Debug)]
pub enum StepMethods {
    Fixed(FixedStepControl),
    Adaptive(AdaptiveStepControl),
}

impl From<FixedStepControl> for StepMethods {
    fn from(value: FixedStepControl) -> Self {
        Self::Fixed(value)
    }
}

impl From<AdaptiveStepControl> for StepMethods {
    fn from(value: AdaptiveStepControl) -> Self {
        Self::Adaptive(value)
    }
}

/// Fixed-step control configuration.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixedStepControl {
    /// Constant step size.
    pub dt: f64,
}

impl FixedStepControl {
    /// Constructs a new fixed-step controller with a given step size.
    pub fn new(dt: f64) -> Self {
        Self { dt }
    }
}

/// Adaptive step size controller.
///
/// Uses an internal method (basic or PID) to adjust step size based on
/// normalized error. Provides absolute and relative tolerance configuration.
#[derive(Clone, Copy, Debug)]
pub struct AdaptiveStepControl {
    method: AdaptiveStepMethods,
    /// Tolerances used for error estimation.
    pub tolerances: Tolerances,
    /// Optional minimum allowed step size.
    pub min_dt: Option<f64>,
    /// Optional maximum allowed step size.
    pub max_dt: Option<f64>,
    /// Optional size of the first step. Selected automatically when `None`.
    pub first_dt: Option<f64>,
    /// Upper bound on accepted plus rejected steps.
    pub max_steps: usize,
}

impl Default for AdaptiveStepControl {
    fn default() -> Self {
        Self {
            method: AdaptiveStepMethods::Basic,
            tolerances: Tolerances::default(),
            min_dt: None,
            max_dt: None,
            first_dt: None,
            max_steps: 100_000,
        }
    }
}

impl AdaptiveStepControl {
    pub fn with_abs_tol(mut self, abs_tol: f64) -> Self {
        self.tolerances.abs_tol = abs_tol;
        self
    }

    pub fn with_rel_tol(mut self, rel_tol: f64) -> Self {
        self.tolerances.rel_tol = rel_tol;
        self
    }

    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    pub fn with_min_dt(mut self, min_dt: f64) -> Self {
        self.min_dt = Some(min_dt);
        self
    }

    pub fn with_max_dt(mut self, max_dt: f64) -> Self {
        self.max_dt = Some(max_dt);
        self
    }

    pub fn with_first_dt(mut self, first_dt: f64) -> Self {
        self.first_dt = Some(first_dt);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_pid(mut self, pid: StepPIDControl) -> Self {
        self.method = AdaptiveStepMethods::PID(pid);
        self
    }

    /// Computes the next step size after an accepted step.
    ///
    /// - `dt`: size of the step just accepted
    /// - `error`: normalized RMS error of that step
    /// - `error_order`: order of the embedded error estimate
    /// - `after_rejection`: the step was accepted only after shrinking, so it may not grow
    pub fn accepted(&mut self, dt: f64, error: f64, error_order: usize, after_rejection: bool) -> f64 {
        let mut factor = match &mut self.method {
            AdaptiveStepMethods::Basic => {
                if error == 0.0 {
                    MAX_FACTOR
                } else {
                    (SAFETY * error.powf(exponent(error_order))).clamp(MIN_FACTOR, MAX_FACTOR)
                }
            }
            AdaptiveStepMethods::PID(pid) => pid.factor(error, error_order),
        };
        if after_rejection {
            factor = factor.min(1.0);
        }
        self.clamp(dt * factor)
    }

    /// Computes a smaller retry step size after a rejected step.
    pub fn rejected(&mut self, dt: f64, error: f64, error_order: usize) -> f64 {
        let factor = if error.is_finite() {
            (SAFETY * error.powf(exponent(error_order))).clamp(MIN_FACTOR, 1.0)
        } else {
            MIN_FACTOR
        };
        self.clamp(dt * factor)
    }

    /// Limits a step size to the configured bounds.
    pub fn clamp(&self, mut dt: f64) -> f64 {
        if let Some(max_dt) = self.max_dt {
            dt = dt.min(max_dt);
        }
        if let Some(min_dt) = self.min_dt {
            dt = dt.max(min_dt);
        }
        dt
    }
}

fn exponent(error_order: usize) -> f64 {
    -1.0 / (error_order as f64 + 1.0)
}

/// Enum for selecting the adaptive step control algorithm.
///
/// - `Basic`: Simple step control using embedded error estimates.
/// - `PID`: PID-controlled step size adaptation.
#[derive(Clone, Copy, Debug)]
pub enum AdaptiveStepMethods {
    Basic,
    PID(StepPIDControl),
}

/// PID controller for adaptive step size control.
///
/// The step factor is `safety * e0^(-beta1/k) * e1^(-beta2/k) * e2^(-beta3/k)` where `e0`
/// is the error of the current step, `e1` and `e2` the errors of the two previously accepted
/// steps and `k` is the error order plus one.
#[derive(Clone, Copy, Debug)]
pub struct StepPIDControl {
    beta1: f64,
    beta2: f64,
    beta3: f64,
    min_growth: f64,
    max_growth: f64,
    err_prev: f64,
    err_prevprev: f64,
}

impl Default for StepPIDControl {
    /// A PI controller with the gains recommended by Hairer and Wanner.
    fn default() -> Self {
        Self::new(0.7, -0.4, 0.0)
    }
}

impl StepPIDControl {
    /// Creates a new PID step controller with custom gains.
    pub fn new(beta1: f64, beta2: f64, beta3: f64) -> Self {
        Self {
            beta1,
            beta2,
            beta3,
            min_growth: MIN_FACTOR,
            max_growth: MAX_FACTOR,
            err_prev: 1.0,
            err_prevprev: 1.0,
        }
    }

    /// Overrides the limits on how much a single accepted step may change the step size.
    pub fn with_growth_limits(mut self, min_growth: f64, max_growth: f64) -> Self {
        self.min_growth = min_growth;
        self.max_growth = max_growth;
        self
    }

    /// Computes the growth factor for an accepted step and advances the error history.
    fn factor(&mut self, err_now: f64, error_order: usize) -> f64 {
        const EPS: f64 = 1e-14;
        let k = error_order as f64 + 1.0;

        let e0 = err_now.max(EPS);
        let e1 = self.err_prev.max(EPS);
        let e2 = self.err_prevprev.max(EPS);

        let factor = SAFETY
            * e0.powf(-self.beta1 / k)
            * e1.powf(-self.beta2 / k)
            * e2.powf(-self.beta3 / k);

        self.err_prevprev = self.err_prev;
        self.err_prev = e0;

        factor.clamp(self.min_growth, self.max_growth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use utilities::assert_equal;

    #[test]
    fn test_basic_growth_is_limited() {
        let mut control = AdaptiveStepControl::default();
        assert_equal(control.accepted(0.1, 0.0, 4, false), 1.0);
        assert_equal(control.accepted(0.1, 1e-12, 4, false), 1.0);
    }

    #[test]
    fn test_basic_step_at_tolerance_shrinks_by_safety() {
        let mut control = AdaptiveStepControl::default();
        assert_equal(control.accepted(0.1, 1.0, 4, false), 0.09);
    }

    #[test]
    fn test_no_growth_after_rejection() {
        let mut control = AdaptiveStepControl::default();
        assert_equal(control.accepted(0.1, 1e-6, 4, true), 0.1);
    }

    #[test]
    fn test_rejected_shrinks() {
        let mut control = AdaptiveStepControl::default();
        let dt = control.rejected(0.1, 32.0, 4);
        assert_equal(dt, 0.1 * 0.9 * 32f64.powf(-0.2));
        assert_equal(control.rejected(0.1, f64::NAN, 4), 0.1 * MIN_FACTOR);
        assert_equal(control.rejected(0.1, 1e9, 4), 0.1 * MIN_FACTOR);
    }

    #[test]
    fn test_bounds_are_applied() {
        let mut control = AdaptiveStepControl::default()
            .with_max_dt(0.05)
            .with_min_dt(0.01);
        assert_equal(control.accepted(0.04, 1e-6, 4, false), 0.05);
        assert_equal(control.rejected(0.02, 1e9, 4), 0.01);
    }

    #[test]
    fn test_pid_tracks_error_history() {
        let mut pid = StepPIDControl::default();
        // with no history the controller behaves like the basic one scaled by beta1
        let first = pid.factor(0.5, 4);
        assert_equal(first, 0.9 * 0.5f64.powf(-0.7 / 5.0));
        // a repeated error now also includes the previous step's contribution
        let second = pid.factor(0.5, 4);
        assert_equal(second, 0.9 * 0.5f64.powf(-0.7 / 5.0) * 0.5f64.powf(0.4 / 5.0));
    }

    #[test]
    fn test_pid_growth_limits() {
        let mut control = AdaptiveStepControl::default()
            .with_pid(StepPIDControl::default().with_growth_limits(0.5, 2.0));
        assert_equal(control.accepted(0.1, 1e-12, 4, false), 0.2);
        assert_equal(control.accepted(0.1, 1e6, 4, false), 0.05);
    }
}
