use std::fmt::Debug;

use thiserror::Error;

/// Submodules for core ODE system components.
pub mod interpolation;
pub mod rk;
pub mod saving;
pub mod solvers;
pub mod state;
pub mod stepping;
pub mod tableau;

pub use saving::{MemoryResult, SaveMethod, SolverStats};
pub use solvers::RungeKuttaMethods;
pub use state::{Adaptive, OdeState, StateArray};
pub use stepping::{AdaptiveStepControl, FixedStepControl, StepMethods, StepPIDControl};

#[derive(Debug, Error)]
pub enum DiffEqErrors {
    #[error("invalid time span ({start}, {end}): must be finite with end > start")]
    InvalidTimeSpan { start: f64, end: f64 },
    #[error("invalid step size {0}: must be finite and positive")]
    InvalidStepSize(f64),
    #[error("invalid tolerances rel_tol = {rel_tol}, abs_tol = {abs_tol}")]
    InvalidTolerances { rel_tol: f64, abs_tol: f64 },
    #[error("invalid sample times: {0}")]
    InvalidSampleTimes(String),
    #[error("{0} has no embedded error estimate and cannot be used with adaptive stepping")]
    AdaptiveNotSupported(&'static str),
    #[error("required step size {dt:e} at t = {t} is below the minimum allowed")]
    StepSizeTooSmall { t: f64, dt: f64 },
    #[error("exceeded the maximum of {steps} steps at t = {t}")]
    MaxStepsExceeded { t: f64, steps: usize },
    #[error("state became non-finite at t = {t}")]
    NonFiniteState { t: f64 },
    #[error("model evaluation failed at t = {t}: {message}")]
    Model { t: f64, message: String },
}

/// Trait for defining a dynamical system model that can be numerically integrated.
///
/// Types implementing this trait must define how to compute the derivative (or RHS function)
/// of the ODE at a given time and state.
pub trait OdeModel: Debug {
    type State: OdeState;
    /// Compute the derivative at time `t` and state `state`, storing the result in `derivative`.
    fn f(
        &mut self,
        t: f64,
        state: &Self::State,
        derivative: &mut Self::State,
    ) -> Result<(), Box<dyn std::error::Error>>;
}

/// Container for an ODE simulation problem.
pub struct OdeProblem<Model>
where
    Model: OdeModel,
{
    model: Model,
}

impl<Model> OdeProblem<Model>
where
    Model: OdeModel,
{
    pub fn new(model: Model) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    pub fn into_model(self) -> Model {
        self.model
    }

    /// Solves the problem over `tspan` with adaptive step size control.
    ///
    /// # Errors
    ///
    /// Fails if the span, tolerances or sample times are invalid, if `solver` has no embedded
    /// error estimate, or if integration cannot proceed (step size underflow, step limit,
    /// model failure).
    pub fn solve_adaptive(
        &mut self,
        x0: &Model::State,
        tspan: (f64, f64),
        mut step_control: AdaptiveStepControl,
        solver: RungeKuttaMethods,
        save_method: SaveMethod,
    ) -> Result<MemoryResult<Model::State>, DiffEqErrors>
    where
        Model::State: Adaptive,
    {
        solver.solve_adaptive(
            &mut self.model,
            x0,
            tspan,
            &mut step_control,
            &save_method,
        )
    }

    /// Solves the problem over `tspan` with a constant step size `dt`.
    pub fn solve_fixed(
        &mut self,
        x0: &Model::State,
        tspan: (f64, f64),
        dt: f64,
        solver: RungeKuttaMethods,
        save_method: SaveMethod,
    ) -> Result<MemoryResult<Model::State>, DiffEqErrors> {
        solver.solve_fixed(
            &mut self.model,
            x0,
            tspan,
            FixedStepControl::new(dt),
            &save_method,
        )
    }

    /// Solves the problem with whichever step method is given.
    pub fn solve(
        &mut self,
        x0: &Model::State,
        tspan: (f64, f64),
        step_method: StepMethods,
        solver: RungeKuttaMethods,
        save_method: SaveMethod,
    ) -> Result<MemoryResult<Model::State>, DiffEqErrors>
    where
        Model::State: Adaptive,
    {
        match step_method {
            StepMethods::Fixed(control) => {
                self.solve_fixed(x0, tspan, control.dt, solver, save_method)
            }
            StepMethods::Adaptive(control) => {
                self.solve_adaptive(x0, tspan, control, solver, save_method)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use utilities::{assert_equal, assert_equal_abstol, assert_equal_reltol};

    #[derive(Debug)]
    struct ExponentialDecay {
        rate: f64,
    }

    impl OdeModel for ExponentialDecay {
        type State = StateArray<1>;

        fn f(
            &mut self,
            _t: f64,
            x: &StateArray<1>,
            dx: &mut StateArray<1>,
        ) -> Result<(), Box<dyn std::error::Error>> {
            dx[0] = -self.rate * x[0];
            Ok(())
        }
    }

    #[derive(Debug)]
    struct HarmonicOscillator;

    impl OdeModel for HarmonicOscillator {
        type State = StateArray<2>;

        fn f(
            &mut self,
            _t: f64,
            x: &StateArray<2>,
            dx: &mut StateArray<2>,
        ) -> Result<(), Box<dyn std::error::Error>> {
            dx[0] = x[1];
            dx[1] = -x[0];
            Ok(())
        }
    }

    #[derive(Debug)]
    struct FailsAfter {
        t_fail: f64,
    }

    impl OdeModel for FailsAfter {
        type State = StateArray<1>;

        fn f(
            &mut self,
            t: f64,
            _x: &StateArray<1>,
            dx: &mut StateArray<1>,
        ) -> Result<(), Box<dyn std::error::Error>> {
            if t > self.t_fail {
                return Err("sensor saturated".into());
            }
            dx[0] = 1.0;
            Ok(())
        }
    }

    #[derive(Debug)]
    struct NanAfter {
        t_nan: f64,
    }

    impl OdeModel for NanAfter {
        type State = StateArray<1>;

        fn f(
            &mut self,
            t: f64,
            _x: &StateArray<1>,
            dx: &mut StateArray<1>,
        ) -> Result<(), Box<dyn std::error::Error>> {
            dx[0] = if t > self.t_nan { f64::NAN } else { 1.0 };
            Ok(())
        }
    }

    /// x' = x^2, which blows up at t = 1 from x(0) = 1.
    #[derive(Debug)]
    struct Quadratic;

    impl OdeModel for Quadratic {
        type State = StateArray<1>;

        fn f(
            &mut self,
            _t: f64,
            x: &StateArray<1>,
            dx: &mut StateArray<1>,
        ) -> Result<(), Box<dyn std::error::Error>> {
            dx[0] = x[0] * x[0];
            Ok(())
        }
    }

    #[derive(Debug)]
    struct CountingDecay {
        rate: f64,
        calls: usize,
    }

    impl OdeModel for CountingDecay {
        type State = StateArray<1>;

        fn f(
            &mut self,
            _t: f64,
            x: &StateArray<1>,
            dx: &mut StateArray<1>,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.calls += 1;
            dx[0] = -self.rate * x[0];
            Ok(())
        }
    }

    fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
        let step = (end - start) / (n - 1) as f64;
        let mut times: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
        times[n - 1] = end;
        times
    }

    #[test]
    fn test_dopri45_exponential_decay() {
        let mut problem = OdeProblem::new(ExponentialDecay { rate: 1.0 });
        let result = problem
            .solve_adaptive(
                &StateArray::new([1.0]),
                (0.0, 5.0),
                AdaptiveStepControl::default()
                    .with_rel_tol(1e-8)
                    .with_abs_tol(1e-10),
                RungeKuttaMethods::DoPri45,
                SaveMethod::Memory,
            )
            .unwrap();

        let (t, x) = result.last().unwrap();
        assert_equal(t, 5.0);
        assert_equal_reltol(x[0], (-5.0f64).exp(), 1e-6);
        assert_equal(result.t[0], 0.0);
        assert!(result.t.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(result.len(), result.stats.accepted_steps + 1);
    }

    #[test]
    fn test_bogacki_shampine_exponential_decay() {
        let mut problem = OdeProblem::new(ExponentialDecay { rate: 2.0 });
        let result = problem
            .solve_adaptive(
                &StateArray::new([3.0]),
                (0.0, 1.0),
                AdaptiveStepControl::default()
                    .with_rel_tol(1e-6)
                    .with_abs_tol(1e-9),
                RungeKuttaMethods::BogackiShampine32,
                SaveMethod::Final,
            )
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_equal_reltol(result.y[0][0], 3.0 * (-2.0f64).exp(), 1e-4);
    }

    #[test]
    fn test_interpolated_output_matches_requested_times() {
        let times = linspace(0.0, 10.0, 101);
        let mut problem = OdeProblem::new(HarmonicOscillator);
        let result = problem
            .solve_adaptive(
                &StateArray::new([1.0, 0.0]),
                (0.0, 10.0),
                AdaptiveStepControl::default()
                    .with_rel_tol(1e-7)
                    .with_abs_tol(1e-9),
                RungeKuttaMethods::DoPri45,
                SaveMethod::Interpolated(times.clone()),
            )
            .unwrap();

        assert_eq!(result.t, times);
        for (t, x) in result.t.iter().zip(&result.y) {
            assert_equal_abstol(x[0], t.cos(), 1e-5);
            assert_equal_abstol(x[1], -t.sin(), 1e-5);
        }
    }

    #[test]
    fn test_rk4_fixed_step() {
        let mut problem = OdeProblem::new(ExponentialDecay { rate: 1.0 });
        let result = problem
            .solve_fixed(
                &StateArray::new([1.0]),
                (0.0, 1.0),
                0.1,
                RungeKuttaMethods::Rk4,
                SaveMethod::Memory,
            )
            .unwrap();

        assert_eq!(result.len(), 11);
        assert_equal(result.t[10], 1.0);
        assert_equal_reltol(result.y[10][0], (-1.0f64).exp(), 1e-6);
        // k[0] is carried over, so each step costs three stages plus the end derivative
        assert_eq!(result.stats.function_evaluations, 1 + 10 * 4);
    }

    #[test]
    fn test_fixed_step_shortens_last_step() {
        let mut problem = OdeProblem::new(ExponentialDecay { rate: 1.0 });
        let result = problem
            .solve_fixed(
                &StateArray::new([1.0]),
                (0.0, 1.05),
                0.1,
                RungeKuttaMethods::Rk4,
                SaveMethod::Memory,
            )
            .unwrap();

        assert_eq!(result.len(), 12);
        assert_equal(result.t[11], 1.05);
    }

    #[test]
    fn test_pid_control_converges() {
        let mut problem = OdeProblem::new(HarmonicOscillator);
        let result = problem
            .solve(
                &StateArray::new([1.0, 0.0]),
                (0.0, 6.0),
                AdaptiveStepControl::default()
                    .with_rel_tol(1e-8)
                    .with_abs_tol(1e-10)
                    .with_pid(StepPIDControl::default())
                    .into(),
                RungeKuttaMethods::DoPri45,
                SaveMethod::Final,
            )
            .unwrap();

        assert_equal_abstol(result.y[0][0], 6.0f64.cos(), 1e-6);
    }

    #[test]
    fn test_rk4_rejects_adaptive() {
        let mut problem = OdeProblem::new(ExponentialDecay { rate: 1.0 });
        let error = problem
            .solve_adaptive(
                &StateArray::new([1.0]),
                (0.0, 1.0),
                AdaptiveStepControl::default(),
                RungeKuttaMethods::Rk4,
                SaveMethod::Memory,
            )
            .unwrap_err();
        assert!(matches!(error, DiffEqErrors::AdaptiveNotSupported(_)));
    }

    #[test]
    fn test_invalid_inputs() {
        let mut problem = OdeProblem::new(ExponentialDecay { rate: 1.0 });
        let x0 = StateArray::new([1.0]);

        let error = problem
            .solve_adaptive(
                &x0,
                (1.0, 0.0),
                AdaptiveStepControl::default(),
                RungeKuttaMethods::DoPri45,
                SaveMethod::Memory,
            )
            .unwrap_err();
        assert!(matches!(error, DiffEqErrors::InvalidTimeSpan { .. }));

        let error = problem
            .solve_adaptive(
                &x0,
                (0.0, 1.0),
                AdaptiveStepControl::default(),
                RungeKuttaMethods::DoPri45,
                SaveMethod::Interpolated(vec![0.0, 0.5, 1.5]),
            )
            .unwrap_err();
        assert!(matches!(error, DiffEqErrors::InvalidSampleTimes(_)));

        let error = problem
            .solve_adaptive(
                &x0,
                (0.0, 1.0),
                AdaptiveStepControl::default(),
                RungeKuttaMethods::DoPri45,
                SaveMethod::Interpolated(vec![0.5, 0.25]),
            )
            .unwrap_err();
        assert!(matches!(error, DiffEqErrors::InvalidSampleTimes(_)));

        let error = problem
            .solve_fixed(&x0, (0.0, 1.0), 0.0, RungeKuttaMethods::Rk4, SaveMethod::Memory)
            .unwrap_err();
        assert!(matches!(error, DiffEqErrors::InvalidStepSize(_)));

        let error = problem
            .solve_adaptive(
                &x0,
                (0.0, 1.0),
                AdaptiveStepControl::default()
                    .with_rel_tol(0.0)
                    .with_abs_tol(0.0),
                RungeKuttaMethods::DoPri45,
                SaveMethod::Memory,
            )
            .unwrap_err();
        assert!(matches!(error, DiffEqErrors::InvalidTolerances { .. }));
    }

    #[test]
    fn test_step_limit() {
        let mut problem = OdeProblem::new(HarmonicOscillator);
        let error = problem
            .solve_adaptive(
                &StateArray::new([1.0, 0.0]),
                (0.0, 100.0),
                AdaptiveStepControl::default()
                    .with_max_dt(0.1)
                    .with_max_steps(10),
                RungeKuttaMethods::DoPri45,
                SaveMethod::Final,
            )
            .unwrap_err();
        assert!(matches!(error, DiffEqErrors::MaxStepsExceeded { steps: 10, .. }));
    }

    #[test]
    fn test_model_errors_propagate() {
        let mut problem = OdeProblem::new(FailsAfter { t_fail: 0.5 });
        let error = problem
            .solve_fixed(
                &StateArray::new([0.0]),
                (0.0, 1.0),
                0.1,
                RungeKuttaMethods::DoPri45,
                SaveMethod::Memory,
            )
            .unwrap_err();
        match error {
            DiffEqErrors::Model { t, message } => {
                assert!(t > 0.5);
                assert_eq!(message, "sensor saturated");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_nan_derivative_is_reported() {
        let mut problem = OdeProblem::new(NanAfter { t_nan: 0.5 });
        let error = problem
            .solve_adaptive(
                &StateArray::new([0.0]),
                (0.0, 1.0),
                AdaptiveStepControl::default(),
                RungeKuttaMethods::DoPri45,
                SaveMethod::Final,
            )
            .unwrap_err();
        match error {
            DiffEqErrors::NonFiniteState { t } => assert_equal_abstol(t, 0.5, 1e-6),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_finite_time_blow_up_underflows_step() {
        let mut problem = OdeProblem::new(Quadratic);
        let error = problem
            .solve_adaptive(
                &StateArray::new([1.0]),
                (0.0, 2.0),
                AdaptiveStepControl::default(),
                RungeKuttaMethods::DoPri45,
                SaveMethod::Final,
            )
            .unwrap_err();
        match error {
            DiffEqErrors::StepSizeTooSmall { t, dt } => {
                assert!(t > 0.99 && t < 1.0, "stopped at t = {t}");
                assert!(dt < 1e-10);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_problem_owns_model() {
        let mut problem = OdeProblem::new(CountingDecay {
            rate: 1.0,
            calls: 0,
        });
        assert_eq!(problem.model().calls, 0);
        problem.model_mut().rate = 2.0;

        let result = problem
            .solve_adaptive(
                &StateArray::new([1.0]),
                (0.0, 1.0),
                AdaptiveStepControl::default()
                    .with_rel_tol(1e-8)
                    .with_abs_tol(1e-10)
                    .with_first_dt(1e-3),
                RungeKuttaMethods::DoPri45,
                SaveMethod::Memory,
            )
            .unwrap();

        // a first step this small is always accepted
        assert_eq!(result.t[1], 1e-3);
        let (_, x) = result.last().unwrap();
        assert_equal_reltol(x[0], (-2.0f64).exp(), 1e-6);

        let model = problem.into_model();
        assert_eq!(model.calls, result.stats.function_evaluations);
    }

    #[test]
    fn test_rk4_converges_at_its_order() {
        let order = tableau::ButcherTableau::<4>::RK4.order as i32;
        let mut problem = OdeProblem::new(ExponentialDecay { rate: 1.0 });
        let mut errors = Vec::new();
        for dt in [0.1, 0.05] {
            let result = problem
                .solve_fixed(
                    &StateArray::new([1.0]),
                    (0.0, 1.0),
                    dt,
                    RungeKuttaMethods::Rk4,
                    SaveMethod::Final,
                )
                .unwrap();
            errors.push((result.y[0][0] - (-1.0f64).exp()).abs());
        }
        let ratio = errors[0] / errors[1];
        let expected = 2f64.powi(order);
        assert!(
            ratio > 0.8 * expected && ratio < 1.2 * expected,
            "error ratio {ratio}, expected about {expected}"
        );
    }
}
