pub mod config;
pub mod gui;
pub mod model;
pub mod render;
pub mod simulation;

use diffeq::DiffEqErrors;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub use config::{AppConfig, SliderConfig, SliderRange, ViewConfig};
pub use model::{Lorenz, LorenzParameters};
pub use simulation::{Bounds, SimulationConfig, Trajectory, simulate};

#[derive(Debug, Error)]
pub enum LorenzErrors {
    #[error("could not parse config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),
    #[error("could not serialize config: {0}")]
    ConfigSerialize(#[from] ron::Error),
    #[error(transparent)]
    DiffEq(#[from] DiffEqErrors),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("parameters must be finite, got {0:?}")]
    InvalidParameters(LorenzParameters),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("render failed: {0}")]
    Render(String),
    #[error("unsupported image format '{0}', expected png or svg")]
    UnsupportedFormat(String),
}

/// Installs the global log subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,lorenz=info"));
    // a subscriber may already be installed by a test harness
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
