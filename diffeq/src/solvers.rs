use serde::{Deserialize, Serialize};

use crate::{
    DiffEqErrors, OdeModel,
    rk::RungeKutta,
    saving::{MemoryResult, SaveMethod},
    state::Adaptive,
    stepping::{AdaptiveStepControl, FixedStepControl},
    tableau::ButcherTableau,
};

/// Enum representing the available solvers supported by the framework.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RungeKuttaMethods {
    /// Bogacki-Shampine 3(2) method.
    BogackiShampine32,
    /// Dormand-Prince 5(4) method.
    #[default]
    DoPri45,
    /// Classical Runge-Kutta 4th-order method. Fixed step only.
    Rk4,
}

impl RungeKuttaMethods {
    /// True if the method carries an embedded error estimate.
    pub fn is_adaptive(&self) -> bool {
        !matches!(self, RungeKuttaMethods::Rk4)
    }

    pub fn solve_adaptive<Model>(
        &self,
        model: &mut Model,
        x0: &Model::State,
        tspan: (f64, f64),
        controller: &mut AdaptiveStepControl,
        save_method: &SaveMethod,
    ) -> Result<MemoryResult<Model::State>, DiffEqErrors>
    where
        Model: OdeModel,
        Model::State: Adaptive,
    {
        match self {
            RungeKuttaMethods::BogackiShampine32 => {
                let mut solver = RungeKutta::new(ButcherTableau::<4>::BOGACKISHAMPINE32);
                solver.solve_adaptive(model, x0, tspan, controller, save_method)
            }
            RungeKuttaMethods::DoPri45 => {
                let mut solver = RungeKutta::new(ButcherTableau::<7>::DORMANDPRINCE45);
                solver.solve_adaptive(model, x0, tspan, controller, save_method)
            }
            RungeKuttaMethods::Rk4 => {
                Err(DiffEqErrors::AdaptiveNotSupported(ButcherTableau::<4>::RK4.name))
            }
        }
    }

    pub fn solve_fixed<Model: OdeModel>(
        &self,
        model: &mut Model,
        x0: &Model::State,
        tspan: (f64, f64),
        controller: FixedStepControl,
        save_method: &SaveMethod,
    ) -> Result<MemoryResult<Model::State>, DiffEqErrors> {
        match self {
            RungeKuttaMethods::BogackiShampine32 => {
                let mut solver = RungeKutta::new(ButcherTableau::<4>::BOGACKISHAMPINE32);
                solver.solve_fixed(model, x0, tspan, controller, save_method)
            }
            RungeKuttaMethods::DoPri45 => {
                let mut solver = RungeKutta::new(ButcherTableau::<7>::DORMANDPRINCE45);
                solver.solve_fixed(model, x0, tspan, controller, save_method)
            }
            RungeKuttaMethods::Rk4 => {
                let mut solver = RungeKutta::new(ButcherTableau::<4>::RK4);
                solver.solve_fixed(model, x0, tspan, controller, save_method)
            }
        }
    }
}
