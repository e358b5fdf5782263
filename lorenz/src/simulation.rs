use std::{ops::Range, time::Instant};

use diffeq::{
    AdaptiveStepControl, FixedStepControl, MemoryResult, OdeProblem, RungeKuttaMethods,
    SaveMethod, SolverStats, StateArray, StepMethods,
};
use serde::{Deserialize, Serialize};
use tolerance::Tolerances;
use tracing::debug;

use crate::{
    LorenzErrors,
    model::{Lorenz, LorenzParameters},
};

/// Everything about a run except the physical parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub initial_state: [f64; 3],
    pub t_span: (f64, f64),
    /// Number of evenly spaced output samples over `t_span`, both ends included.
    pub samples: usize,
    pub method: RungeKuttaMethods,
    pub tolerances: Tolerances,
    /// Upper bound on the step size. Required as the step size of non-adaptive methods.
    pub max_dt: Option<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_state: [1.0, 1.0, 1.0],
            t_span: (0.0, 40.0),
            samples: 10_000,
            method: RungeKuttaMethods::DoPri45,
            tolerances: Tolerances::default(),
            max_dt: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), LorenzErrors> {
        if self.initial_state.iter().any(|x| !x.is_finite()) {
            return Err(LorenzErrors::InvalidConfig(format!(
                "initial_state {:?} must be finite",
                self.initial_state
            )));
        }
        let (start, end) = self.t_span;
        if !start.is_finite() || !end.is_finite() || end <= start {
            return Err(LorenzErrors::InvalidConfig(format!(
                "t_span ({start}, {end}) must be finite and increasing"
            )));
        }
        if self.samples < 2 {
            return Err(LorenzErrors::InvalidConfig(format!(
                "samples must be at least 2, got {}",
                self.samples
            )));
        }
        if !self.tolerances.is_valid() {
            return Err(LorenzErrors::InvalidConfig(format!(
                "invalid tolerances {:?}",
                self.tolerances
            )));
        }
        match self.max_dt {
            Some(max_dt) if !max_dt.is_finite() || max_dt <= 0.0 => {
                return Err(LorenzErrors::InvalidConfig(format!(
                    "max_dt {max_dt} must be finite and positive"
                )));
            }
            None if !self.method.is_adaptive() => {
                return Err(LorenzErrors::InvalidConfig(format!(
                    "{:?} is fixed step only and needs max_dt as its step size",
                    self.method
                )));
            }
            _ => {}
        }
        Ok(())
    }

    /// Step control for the configured method.
    fn step_method(&self) -> StepMethods {
        match (self.method.is_adaptive(), self.max_dt) {
            (false, Some(dt)) => FixedStepControl::new(dt).into(),
            (_, max_dt) => {
                let mut control = AdaptiveStepControl::default().with_tolerances(self.tolerances);
                if let Some(max_dt) = max_dt {
                    control = control.with_max_dt(max_dt);
                }
                control.into()
            }
        }
    }
}

/// `n` evenly spaced values from `start` to `end`. The last value is exactly `end`.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            values[n - 1] = end;
            values
        }
    }
}

/// Sampled solution of the Lorenz system.
#[derive(Clone, Debug, Default)]
pub struct Trajectory {
    pub t: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub stats: SolverStats,
}

impl From<MemoryResult<StateArray<3>>> for Trajectory {
    fn from(result: MemoryResult<StateArray<3>>) -> Self {
        let n = result.len();
        let mut trajectory = Trajectory {
            t: result.t,
            x: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            z: Vec::with_capacity(n),
            stats: result.stats,
        };
        for state in &result.y {
            trajectory.x.push(state[0]);
            trajectory.y.push(state[1]);
            trajectory.z.push(state[2]);
        }
        trajectory
    }
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((x, y), z)| (*x, *y, *z))
    }

    pub fn final_state(&self) -> Option<[f64; 3]> {
        self.points().last().map(|(x, y, z)| [x, y, z])
    }

    /// Axis ranges enclosing the trajectory with a 5% margin.
    pub fn bounds(&self) -> Bounds {
        Bounds {
            x: padded_range(&self.x),
            y: padded_range(&self.y),
            z: padded_range(&self.z),
        }
    }
}

/// Plot ranges for each state component.
#[derive(Clone, Debug, PartialEq)]
pub struct Bounds {
    pub x: Range<f64>,
    pub y: Range<f64>,
    pub z: Range<f64>,
}

impl Bounds {
    /// Grows the ranges to include `point`.
    pub fn include(&mut self, point: &[f64; 3]) {
        for (range, value) in [&mut self.x, &mut self.y, &mut self.z].into_iter().zip(point) {
            range.start = range.start.min(*value);
            range.end = range.end.max(*value);
        }
    }
}

fn padded_range(values: &[f64]) -> Range<f64> {
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
            (min.min(*v), max.max(*v))
        });
    if min > max {
        return -1.0..1.0;
    }
    let margin = (max - min) * 0.05;
    if margin <= f64::EPSILON * max.abs().max(1.0) {
        // a flat component still needs a non-empty axis
        return (min - 1.0)..(max + 1.0);
    }
    (min - margin)..(max + margin)
}

/// Integrates the Lorenz system for `parameters` and samples the solution.
pub fn simulate(
    parameters: &LorenzParameters,
    config: &SimulationConfig,
) -> Result<Trajectory, LorenzErrors> {
    config.validate()?;
    if !parameters.is_finite() {
        return Err(LorenzErrors::InvalidParameters(*parameters));
    }

    let start = Instant::now();
    let mut problem = OdeProblem::new(Lorenz::new(*parameters));
    let times = linspace(config.t_span.0, config.t_span.1, config.samples);
    let result = problem.solve(
        &StateArray::new(config.initial_state),
        config.t_span,
        config.step_method(),
        config.method,
        SaveMethod::Interpolated(times),
    )?;
    let trajectory = Trajectory::from(result);

    debug!(
        sigma = parameters.sigma,
        rho = parameters.rho,
        beta = parameters.beta,
        accepted = trajectory.stats.accepted_steps,
        rejected = trajectory.stats.rejected_steps,
        evaluations = trajectory.stats.function_evaluations,
        elapsed = ?start.elapsed(),
        "integrated lorenz system"
    );
    Ok(trajectory)
}
