use std::{
    fmt::Debug,
    ops::{AddAssign, MulAssign},
};

pub mod state_array;

pub use state_array::StateArray;

/// Trait representing an integrable state for use in ODE solvers.
///
/// Runge-Kutta stages are built entirely from in-place scaling and accumulation, so those are
/// the only arithmetic operations a state needs to provide. The derivative of a state is
/// represented by the same type.
pub trait OdeState: Clone + Default + Debug + MulAssign<f64> + for<'a> AddAssign<&'a Self> {}

/// States that can be integrated with adaptive step size control.
pub trait Adaptive: OdeState {
    /// Normalized RMS error between the propagated state `self` and the embedded estimate
    /// `x_tilde`, scaled against `self` and the state at the start of the step `x_prev`.
    /// A value <= 1.0 means the step is within tolerance.
    fn compute_error(&self, x_prev: &Self, x_tilde: &Self, rel_tol: f64, abs_tol: f64) -> f64;

    /// RMS norm of `self` with each component weighted by `abs_tol + rel_tol * |reference|`.
    fn scaled_norm(&self, reference: &Self, rel_tol: f64, abs_tol: f64) -> f64;

    /// True if every component is finite.
    fn is_finite(&self) -> bool;
}
