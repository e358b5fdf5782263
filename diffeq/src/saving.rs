use crate::state::OdeState;

/// Specifies which points of the solution are kept.
///
/// - `Memory`: every accepted step, including the initial point.
/// - `Interpolated`: only the requested times, evaluated from the dense output.
/// - `Final`: only the end point.
#[derive(Clone, Debug, Default)]
pub enum SaveMethod {
    #[default]
    Memory,
    /// Sample times in non-decreasing order, all within the integration span.
    Interpolated(Vec<f64>),
    Final,
}

impl SaveMethod {
    /// Capacity to preallocate for a given span and nominal step size.
    pub(crate) fn capacity(&self, tspan: (f64, f64), dt: Option<f64>) -> usize {
        match self {
            SaveMethod::Memory => match dt {
                Some(dt) if dt > 0.0 => ((tspan.1 - tspan.0) / dt).ceil() as usize + 1,
                // Default conservative allocation: 1 save per second
                _ => (tspan.1 - tspan.0).ceil() as usize + 1,
            },
            SaveMethod::Interpolated(times) => times.len(),
            SaveMethod::Final => 1,
        }
    }
}

/// Counters collected while integrating.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub function_evaluations: usize,
}

/// In-memory storage of solver output. Each entry stores the time and state value at that time.
#[derive(Clone, Debug)]
pub struct MemoryResult<State>
where
    State: OdeState,
{
    /// Recorded times.
    pub t: Vec<f64>,
    /// Recorded states.
    pub y: Vec<State>,
    pub stats: SolverStats,
}

impl<State: OdeState> MemoryResult<State> {
    /// Constructs an empty result with room for `n` entries.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            t: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            stats: SolverStats::default(),
        }
    }

    pub(crate) fn insert(&mut self, t: f64, x: &State) {
        self.t.push(t);
        self.y.push(x.clone());
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// The last recorded `(time, state)` pair.
    pub fn last(&self) -> Option<(f64, &State)> {
        self.t.last().copied().zip(self.y.last())
    }
}
