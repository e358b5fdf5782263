use std::array;

use crate::{
    DiffEqErrors, OdeModel,
    interpolation::HermiteStep,
    saving::{MemoryResult, SaveMethod, SolverStats},
    state::{Adaptive, OdeState},
    stepping::{AdaptiveStepControl, FixedStepControl},
    tableau::ButcherTableau,
};

/// Explicit Runge-Kutta integrator with preallocated buffers for intermediate calculations.
pub struct RungeKutta<State: OdeState, const STAGES: usize> {
    tableau: ButcherTableau<STAGES>,
    /// Stage derivatives. `k[0]` always holds the derivative at `x`.
    k: [State; STAGES],
    /// State at the start of the step.
    x: State,
    /// Propagated state at the end of the step.
    y: State,
    /// Embedded estimate at the end of the step.
    y_tilde: State,
    /// Derivative at the end of the step.
    f_end: State,
    stage: State,
    scratch: State,
    sample: State,
}

impl<State: OdeState, const STAGES: usize> RungeKutta<State, STAGES> {
    pub fn new(tableau: ButcherTableau<STAGES>) -> Self {
        Self {
            tableau,
            k: array::from_fn(|_| State::default()),
            x: State::default(),
            y: State::default(),
            y_tilde: State::default(),
            f_end: State::default(),
            stage: State::default(),
            scratch: State::default(),
            sample: State::default(),
        }
    }

    /// Integrates with a constant step size. The final step is shortened to land on `tspan.1`.
    pub fn solve_fixed<Model: OdeModel<State = State>>(
        &mut self,
        model: &mut Model,
        x0: &State,
        tspan: (f64, f64),
        control: FixedStepControl,
        save_method: &SaveMethod,
    ) -> Result<MemoryResult<State>, DiffEqErrors> {
        validate_tspan(tspan)?;
        validate_samples(save_method, tspan)?;
        let dt = control.dt;
        if !dt.is_finite() || dt <= 0.0 {
            return Err(DiffEqErrors::InvalidStepSize(dt));
        }

        let (t0, t1) = tspan;
        let mut result = MemoryResult::with_capacity(save_method.capacity(tspan, Some(dt)));
        let mut recorder = Recorder::new(save_method);

        self.x.clone_from(x0);
        evaluate(model, &mut result.stats, t0, &self.x, &mut self.k[0])?;
        recorder.start(t0, &self.x, &mut result);

        // a tiny margin keeps round-off in span / dt from adding a near-zero final step
        let n_steps = ((t1 - t0) / dt * (1.0 - 1e-12)).ceil().max(1.0) as usize;
        let mut t = t0;
        for i in 1..=n_steps {
            // computed from t0 rather than accumulated to avoid drift
            let t_new = if i == n_steps { t1 } else { t0 + i as f64 * dt };
            let h = t_new - t;

            self.step(model, &mut result.stats, t, h)?;
            self.finish_step(model, &mut result.stats, t_new)?;
            let step = HermiteStep {
                t0: t,
                x0: &self.x,
                f0: &self.k[0],
                t1: t_new,
                x1: &self.y,
                f1: &self.f_end,
            };
            recorder.record_step(&step, &mut result, &mut self.sample, &mut self.scratch);
            self.advance();
            result.stats.accepted_steps += 1;
            t = t_new;
        }

        recorder.finish(t, &self.x, &mut result);
        Ok(result)
    }

    /// Integrates with step size control driven by the embedded error estimate.
    pub fn solve_adaptive<Model: OdeModel<State = State>>(
        &mut self,
        model: &mut Model,
        x0: &State,
        tspan: (f64, f64),
        control: &mut AdaptiveStepControl,
        save_method: &SaveMethod,
    ) -> Result<MemoryResult<State>, DiffEqErrors>
    where
        State: Adaptive,
    {
        let error_order = match (self.tableau.error_order, self.tableau.b2) {
            (Some(error_order), Some(_)) => error_order,
            _ => return Err(DiffEqErrors::AdaptiveNotSupported(self.tableau.name)),
        };
        validate_tspan(tspan)?;
        validate_samples(save_method, tspan)?;
        if !control.tolerances.is_valid() {
            return Err(DiffEqErrors::InvalidTolerances {
                rel_tol: control.tolerances.rel_tol,
                abs_tol: control.tolerances.abs_tol,
            });
        }
        let rel_tol = control.tolerances.rel_tol;
        let abs_tol = control.tolerances.abs_tol;

        let (t0, t1) = tspan;
        let mut result = MemoryResult::with_capacity(save_method.capacity(tspan, control.max_dt));
        let mut recorder = Recorder::new(save_method);

        self.x.clone_from(x0);
        evaluate(model, &mut result.stats, t0, &self.x, &mut self.k[0])?;
        recorder.start(t0, &self.x, &mut result);

        let mut dt = match control.first_dt {
            Some(first_dt) => first_dt,
            None => self.initial_step(
                model,
                &mut result.stats,
                t0,
                t1 - t0,
                rel_tol,
                abs_tol,
                error_order,
            )?,
        };
        dt = control.clamp(dt);
        if !dt.is_finite() || dt <= 0.0 {
            return Err(DiffEqErrors::InvalidStepSize(dt));
        }

        let mut t = t0;
        let mut steps = 0;
        let mut after_rejection = false;
        while t < t1 {
            if steps >= control.max_steps {
                return Err(DiffEqErrors::MaxStepsExceeded { t, steps });
            }
            steps += 1;

            let (h, t_new) = if dt >= t1 - t { (t1 - t, t1) } else { (dt, t + dt) };
            self.step(model, &mut result.stats, t, h)?;

            let error = if self.y.is_finite() && self.y_tilde.is_finite() {
                self.y.compute_error(&self.x, &self.y_tilde, rel_tol, abs_tol)
            } else {
                f64::INFINITY
            };

            if error <= 1.0 {
                self.finish_step(model, &mut result.stats, t_new)?;
                let step = HermiteStep {
                    t0: t,
                    x0: &self.x,
                    f0: &self.k[0],
                    t1: t_new,
                    x1: &self.y,
                    f1: &self.f_end,
                };
                recorder.record_step(&step, &mut result, &mut self.sample, &mut self.scratch);
                self.advance();
                result.stats.accepted_steps += 1;
                t = t_new;

                dt = control.accepted(h, error, error_order, after_rejection);
                after_rejection = false;
            } else {
                result.stats.rejected_steps += 1;

                let min_step = 10.0 * f64::EPSILON * t.abs().max(1.0);
                let at_min_dt = control.min_dt.is_some_and(|min_dt| h <= min_dt);
                if at_min_dt || h <= min_step {
                    if !self.y.is_finite() {
                        return Err(DiffEqErrors::NonFiniteState { t });
                    }
                    return Err(DiffEqErrors::StepSizeTooSmall { t, dt: h });
                }

                dt = control.rejected(h, error, error_order);
                after_rejection = true;
            }
        }

        recorder.finish(t, &self.x, &mut result);
        Ok(result)
    }

    /// Computes the stages of one step of size `h` from `(t, x)`, leaving the propagated
    /// solution in `y` and, if the tableau has one, the embedded solution in `y_tilde`.
    ///
    /// `k[0]` must already hold the derivative at `(t, x)`.
    fn step<Model: OdeModel<State = State>>(
        &mut self,
        model: &mut Model,
        stats: &mut SolverStats,
        t: f64,
        h: f64,
    ) -> Result<(), DiffEqErrors> {
        for s in 1..STAGES {
            // in place calculation of intermediate points
            self.stage.clone_from(&self.x);
            for i in 0..s {
                let a = self.tableau.a[s][i];
                if a != 0.0 {
                    self.scratch.clone_from(&self.k[i]);
                    self.scratch *= a * h;
                    self.stage += &self.scratch;
                }
            }
            let t_stage = t + self.tableau.c[s] * h;
            evaluate(model, stats, t_stage, &self.stage, &mut self.k[s])?;
        }

        self.y.clone_from(&self.x);
        for s in 0..STAGES {
            let b = self.tableau.b[s];
            if b != 0.0 {
                self.scratch.clone_from(&self.k[s]);
                self.scratch *= b * h;
                self.y += &self.scratch;
            }
        }

        if let Some(b2) = self.tableau.b2 {
            self.y_tilde.clone_from(&self.x);
            for (s, b) in b2.iter().enumerate() {
                if *b != 0.0 {
                    self.scratch.clone_from(&self.k[s]);
                    self.scratch *= *b * h;
                    self.y_tilde += &self.scratch;
                }
            }
        }
        Ok(())
    }

    /// Fills `f_end` with the derivative at the end of an accepted step.
    fn finish_step<Model: OdeModel<State = State>>(
        &mut self,
        model: &mut Model,
        stats: &mut SolverStats,
        t_new: f64,
    ) -> Result<(), DiffEqErrors> {
        if self.tableau.fsal {
            self.f_end.clone_from(&self.k[STAGES - 1]);
            Ok(())
        } else {
            evaluate(model, stats, t_new, &self.y, &mut self.f_end)
        }
    }

    /// Moves the end of the accepted step to the start of the next one.
    fn advance(&mut self) {
        self.x.clone_from(&self.y);
        self.k[0].clone_from(&self.f_end);
    }

    /// Picks a first step size from the scale of the initial state and its derivatives.
    ///
    /// Hairer, Norsett and Wanner, "Solving Ordinary Differential Equations I", sec. II.4.
    #[allow(clippy::too_many_arguments)]
    fn initial_step<Model: OdeModel<State = State>>(
        &mut self,
        model: &mut Model,
        stats: &mut SolverStats,
        t0: f64,
        span: f64,
        rel_tol: f64,
        abs_tol: f64,
        error_order: usize,
    ) -> Result<f64, DiffEqErrors>
    where
        State: Adaptive,
    {
        let d0 = self.x.scaled_norm(&self.x, rel_tol, abs_tol);
        let d1 = self.k[0].scaled_norm(&self.x, rel_tol, abs_tol);
        let h0 = if d0 < 1e-5 || d1 < 1e-5 { 1e-6 } else { 0.01 * d0 / d1 };
        let h0 = h0.min(span);

        // explicit Euler step to estimate the second derivative
        self.stage.clone_from(&self.k[0]);
        self.stage *= h0;
        self.stage += &self.x;
        evaluate(model, stats, t0 + h0, &self.stage, &mut self.scratch)?;

        self.sample.clone_from(&self.k[0]);
        self.sample *= -1.0;
        self.scratch += &self.sample;
        let d2 = self.scratch.scaled_norm(&self.x, rel_tol, abs_tol) / h0;

        let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(1.0 / (error_order as f64 + 1.0))
        };

        Ok((100.0 * h0).min(h1).min(span))
    }
}

fn evaluate<Model: OdeModel>(
    model: &mut Model,
    stats: &mut SolverStats,
    t: f64,
    x: &Model::State,
    dx: &mut Model::State,
) -> Result<(), DiffEqErrors> {
    stats.function_evaluations += 1;
    model.f(t, x, dx).map_err(|e| DiffEqErrors::Model {
        t,
        message: e.to_string(),
    })
}

fn validate_tspan(tspan: (f64, f64)) -> Result<(), DiffEqErrors> {
    let (start, end) = tspan;
    if !start.is_finite() || !end.is_finite() || end <= start {
        return Err(DiffEqErrors::InvalidTimeSpan { start, end });
    }
    Ok(())
}

fn validate_samples(save_method: &SaveMethod, tspan: (f64, f64)) -> Result<(), DiffEqErrors> {
    let SaveMethod::Interpolated(times) = save_method else {
        return Ok(());
    };
    if let Some(t) = times.iter().find(|t| !t.is_finite()) {
        return Err(DiffEqErrors::InvalidSampleTimes(format!("{t} is not finite")));
    }
    if let Some(t) = times.iter().find(|t| **t < tspan.0 || **t > tspan.1) {
        return Err(DiffEqErrors::InvalidSampleTimes(format!(
            "{t} is outside of the time span ({}, {})",
            tspan.0, tspan.1
        )));
    }
    if times.windows(2).any(|w| w[1] < w[0]) {
        return Err(DiffEqErrors::InvalidSampleTimes("times must be non-decreasing".into()));
    }
    Ok(())
}

/// Writes solver output according to the selected `SaveMethod`.
struct Recorder<'a> {
    save_method: &'a SaveMethod,
    /// Index of the next requested sample time.
    next_sample: usize,
}

impl<'a> Recorder<'a> {
    fn new(save_method: &'a SaveMethod) -> Self {
        Self {
            save_method,
            next_sample: 0,
        }
    }

    fn start<State: OdeState>(&mut self, t0: f64, x0: &State, result: &mut MemoryResult<State>) {
        match self.save_method {
            SaveMethod::Memory => result.insert(t0, x0),
            SaveMethod::Interpolated(times) => {
                while self.next_sample < times.len() && times[self.next_sample] <= t0 {
                    result.insert(times[self.next_sample], x0);
                    self.next_sample += 1;
                }
            }
            SaveMethod::Final => {}
        }
    }

    fn record_step<State: OdeState>(
        &mut self,
        step: &HermiteStep<'_, State>,
        result: &mut MemoryResult<State>,
        sample: &mut State,
        scratch: &mut State,
    ) {
        match self.save_method {
            SaveMethod::Memory => result.insert(step.t1, step.x1),
            SaveMethod::Interpolated(times) => {
                while self.next_sample < times.len() && times[self.next_sample] <= step.t1 {
                    let t = times[self.next_sample];
                    if t == step.t1 {
                        result.insert(t, step.x1);
                    } else {
                        step.interpolate(t, sample, scratch);
                        result.insert(t, sample);
                    }
                    self.next_sample += 1;
                }
            }
            SaveMethod::Final => {}
        }
    }

    fn finish<State: OdeState>(&mut self, t: f64, x: &State, result: &mut MemoryResult<State>) {
        match self.save_method {
            SaveMethod::Final => result.insert(t, x),
            SaveMethod::Interpolated(times) => {
                // only reachable through round-off at the end of the span
                while self.next_sample < times.len() {
                    result.insert(times[self.next_sample], x);
                    self.next_sample += 1;
                }
            }
            SaveMethod::Memory => {}
        }
    }
}
