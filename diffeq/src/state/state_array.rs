use std::ops::{AddAssign, Deref, DerefMut, MulAssign};

use tolerance::{compute_error, error_scale};

use super::{Adaptive, OdeState};

/// A fixed-size array wrapper representing a generic state vector with `N` f64 components.
///
/// This type is commonly used as a concrete state for ODE solvers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StateArray<const N: usize>([f64; N]);

impl<const N: usize> StateArray<N> {
    /// Constructs a new `StateArray` from an array of `f64`.
    pub fn new(array: [f64; N]) -> Self {
        Self(array)
    }

    /// Returns the underlying array.
    pub fn into_inner(self) -> [f64; N] {
        self.0
    }
}

impl<const N: usize> Default for StateArray<N> {
    /// Creates a `StateArray` with all elements initialized to zero.
    fn default() -> Self {
        Self([0.0; N])
    }
}

impl<const N: usize> From<[f64; N]> for StateArray<N> {
    fn from(array: [f64; N]) -> Self {
        Self(array)
    }
}

impl<const N: usize> AddAssign<&Self> for StateArray<N> {
    /// Adds each element from the right-hand side into `self` in-place.
    fn add_assign(&mut self, rhs: &Self) {
        for i in 0..N {
            self.0[i] += rhs.0[i];
        }
    }
}

impl<const N: usize> MulAssign<f64> for StateArray<N> {
    /// Multiplies each element of the array in-place by the given scalar.
    fn mul_assign(&mut self, rhs: f64) {
        for i in 0..N {
            self.0[i] *= rhs;
        }
    }
}

impl<const N: usize> Deref for StateArray<N> {
    type Target = [f64; N];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const N: usize> DerefMut for StateArray<N> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<const N: usize> OdeState for StateArray<N> {}

impl<const N: usize> Adaptive for StateArray<N> {
    fn compute_error(&self, x_prev: &Self, x_tilde: &Self, rel_tol: f64, abs_tol: f64) -> f64 {
        if N == 0 {
            return 0.0;
        }

        let mut sum_squared_errors = 0.0;
        for i in 0..N {
            let error = compute_error(self.0[i], x_prev.0[i], x_tilde.0[i], rel_tol, abs_tol);
            sum_squared_errors += error * error;
        }

        (sum_squared_errors / N as f64).sqrt()
    }

    fn scaled_norm(&self, reference: &Self, rel_tol: f64, abs_tol: f64) -> f64 {
        if N == 0 {
            return 0.0;
        }

        let mut sum_squares = 0.0;
        for i in 0..N {
            let scaled = self.0[i] / error_scale(reference.0[i], 0.0, rel_tol, abs_tol);
            sum_squares += scaled * scaled;
        }

        (sum_squares / N as f64).sqrt()
    }

    fn is_finite(&self) -> bool {
        self.0.iter().all(|x| x.is_finite())
    }
}
