//! Dense output between accepted steps.

use crate::state::OdeState;

/// The endpoints of one accepted step, from which intermediate values are reconstructed
/// with a cubic Hermite polynomial.
pub struct HermiteStep<'a, State: OdeState> {
    pub t0: f64,
    pub x0: &'a State,
    pub f0: &'a State,
    pub t1: f64,
    pub x1: &'a State,
    pub f1: &'a State,
}

impl<State: OdeState> HermiteStep<'_, State> {
    /// Writes the interpolated state at time `t` into `out`, using `scratch` as a work buffer.
    ///
    /// `t` is expected to lie within `[t0, t1]`.
    pub fn interpolate(&self, t: f64, out: &mut State, scratch: &mut State) {
        let h = self.t1 - self.t0;
        if h == 0.0 {
            out.clone_from(self.x1);
            return;
        }
        let s = (t - self.t0) / h;
        let s2 = s * s;
        let s3 = s2 * s;

        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;

        out.clone_from(self.x0);
        *out *= h00;

        scratch.clone_from(self.f0);
        *scratch *= h10 * h;
        *out += &*scratch;

        scratch.clone_from(self.x1);
        *scratch *= h01;
        *out += &*scratch;

        scratch.clone_from(self.f1);
        *scratch *= h11 * h;
        *out += &*scratch;
    }
}
