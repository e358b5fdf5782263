use diffeq::{OdeModel, StateArray};
use serde::{Deserialize, Serialize};
use utilities::format_number;

/// The three physical parameters of the Lorenz system.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LorenzParameters {
    pub sigma: f64,
    pub rho: f64,
    pub beta: f64,
}

impl Default for LorenzParameters {
    /// The chaotic parameter set from Lorenz (1963).
    fn default() -> Self {
        Self {
            sigma: 10.0,
            rho: 28.0,
            beta: 8.0 / 3.0,
        }
    }
}

impl LorenzParameters {
    pub fn new(sigma: f64, rho: f64, beta: f64) -> Self {
        Self { sigma, rho, beta }
    }

    pub fn is_finite(&self) -> bool {
        self.sigma.is_finite() && self.rho.is_finite() && self.beta.is_finite()
    }

    /// Plot title showing the current parameter values.
    pub fn title(&self) -> String {
        format!(
            "Lorenz Attractor (σ={}, ρ={}, β={})",
            format_number(self.sigma),
            format_number(self.rho),
            format_number(self.beta)
        )
    }

    /// Fixed points of the vector field.
    ///
    /// The origin is always a fixed point. For ρ > 1 (and β > 0) the pair
    /// C± = (±√(β(ρ−1)), ±√(β(ρ−1)), ρ−1) appears as well.
    pub fn equilibria(&self) -> Vec<[f64; 3]> {
        let mut points = vec![[0.0, 0.0, 0.0]];
        let r = self.beta * (self.rho - 1.0);
        if r > 0.0 {
            let c = r.sqrt();
            let z = self.rho - 1.0;
            points.push([c, c, z]);
            points.push([-c, -c, z]);
        }
        points
    }
}

/// The Lorenz vector field.
#[derive(Debug, Clone, Copy)]
pub struct Lorenz {
    pub parameters: LorenzParameters,
}

impl Lorenz {
    pub fn new(parameters: LorenzParameters) -> Self {
        Self { parameters }
    }

    /// Time derivative of `state`.
    pub fn derivative(&self, state: &[f64; 3]) -> [f64; 3] {
        let LorenzParameters { sigma, rho, beta } = self.parameters;
        let [x, y, z] = *state;
        [sigma * (y - x), x * (rho - z) - y, x * y - beta * z]
    }
}

impl OdeModel for Lorenz {
    type State = StateArray<3>;

    fn f(
        &mut self,
        _t: f64,
        x: &StateArray<3>,
        dx: &mut StateArray<3>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        **dx = self.derivative(x);
        Ok(())
    }
}
