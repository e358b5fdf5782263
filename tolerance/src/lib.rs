use serde::{Deserialize, Serialize};

/// Relative and absolute tolerance pair used to scale local error estimates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub rel_tol: f64,
    pub abs_tol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            rel_tol: 1e-3,
            abs_tol: 1e-6,
        }
    }
}

impl Tolerances {
    pub fn new(rel_tol: f64, abs_tol: f64) -> Self {
        Self { rel_tol, abs_tol }
    }

    pub fn error_scale(&self, x: f64, x_prev: f64) -> f64 {
        error_scale(x, x_prev, self.rel_tol, self.abs_tol)
    }

    pub fn compute_error(&self, x: f64, x_prev: f64, x_tilde: f64) -> f64 {
        compute_error(x, x_prev, x_tilde, self.rel_tol, self.abs_tol)
    }

    /// Both tolerances must be finite and non-negative, and at least one must be positive.
    pub fn is_valid(&self) -> bool {
        self.rel_tol.is_finite()
            && self.abs_tol.is_finite()
            && self.rel_tol >= 0.0
            && self.abs_tol >= 0.0
            && (self.rel_tol > 0.0 || self.abs_tol > 0.0)
    }
}

/// Acceptable error magnitude for a single component.
pub fn error_scale(x: f64, x_prev: f64, rel_tol: f64, abs_tol: f64) -> f64 {
    abs_tol + rel_tol * x.abs().max(x_prev.abs())
}

/// Difference between a solution `x` and its embedded estimate `x_tilde`, normalized so that
/// values <= 1.0 are within tolerance.
pub fn compute_error(x: f64, x_prev: f64, x_tilde: f64, rel_tol: f64, abs_tol: f64) -> f64 {
    (x - x_tilde).abs() / error_scale(x, x_prev, rel_tol, abs_tol)
}
