use std::{
    fs,
    path::{Path, PathBuf},
};

use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{LorenzErrors, model::LorenzParameters, simulation::SimulationConfig};

/// Complete application configuration, stored as RON.
///
/// Every field has a default, so a config file only needs to list what it changes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub simulation: SimulationConfig,
    pub sliders: SliderConfig,
    pub view: ViewConfig,
}

impl AppConfig {
    /// Location of the per-user config file, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lorenz").join("config.ron"))
    }

    pub fn from_ron_str(s: &str) -> Result<Self, LorenzErrors> {
        let config: Self = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String, LorenzErrors> {
        Ok(ron::ser::to_string_pretty(self, PrettyConfig::default())?)
    }

    pub fn load(path: &Path) -> Result<Self, LorenzErrors> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_ron_str(&contents)?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), LorenzErrors> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_ron_string()?)?;
        info!("wrote config to {}", path.display());
        Ok(())
    }

    /// Loads `explicit` if given, otherwise the per-user config file if it exists, otherwise
    /// the built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, LorenzErrors> {
        Self::resolve_with(explicit, Self::default_path())
    }

    fn resolve_with(
        explicit: Option<&Path>,
        fallback: Option<PathBuf>,
    ) -> Result<Self, LorenzErrors> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match fallback {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), LorenzErrors> {
        self.simulation.validate()?;
        self.sliders.validate()?;
        self.view.validate()
    }
}

/// Range, increment and starting value of one parameter slider.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SliderRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
}

impl SliderRange {
    pub fn new(min: f64, max: f64, step: f64, default: f64) -> Self {
        Self {
            min,
            max,
            step,
            default,
        }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    fn validate(&self, name: &str) -> Result<(), LorenzErrors> {
        let finite = [self.min, self.max, self.step, self.default]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.min >= self.max {
            return Err(LorenzErrors::InvalidConfig(format!(
                "{name} slider needs finite min < max, got {}..{}",
                self.min, self.max
            )));
        }
        if self.step <= 0.0 || self.step > self.max - self.min {
            return Err(LorenzErrors::InvalidConfig(format!(
                "{name} slider step {} must be positive and no larger than its range",
                self.step
            )));
        }
        if !(self.min..=self.max).contains(&self.default) {
            return Err(LorenzErrors::InvalidConfig(format!(
                "{name} slider default {} is outside {}..{}",
                self.default, self.min, self.max
            )));
        }
        Ok(())
    }
}

/// One slider per Lorenz parameter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliderConfig {
    pub sigma: SliderRange,
    pub rho: SliderRange,
    pub beta: SliderRange,
}

impl Default for SliderConfig {
    fn default() -> Self {
        let parameters = LorenzParameters::default();
        Self {
            sigma: SliderRange::new(0.0, 20.0, 0.5, parameters.sigma),
            rho: SliderRange::new(0.0, 50.0, 1.0, parameters.rho),
            beta: SliderRange::new(0.5, 5.0, 0.1, parameters.beta),
        }
    }
}

impl SliderConfig {
    /// Parameters at the slider defaults.
    pub fn initial_parameters(&self) -> LorenzParameters {
        LorenzParameters::new(self.sigma.default, self.rho.default, self.beta.default)
    }

    /// Replaces the given values, clamped into their slider ranges.
    pub fn with_overrides(
        &self,
        mut parameters: LorenzParameters,
        sigma: Option<f64>,
        rho: Option<f64>,
        beta: Option<f64>,
    ) -> LorenzParameters {
        if let Some(sigma) = sigma {
            parameters.sigma = self.sigma.clamp(sigma);
        }
        if let Some(rho) = rho {
            parameters.rho = self.rho.clamp(rho);
        }
        if let Some(beta) = beta {
            parameters.beta = self.beta.clamp(beta);
        }
        parameters
    }

    fn validate(&self) -> Result<(), LorenzErrors> {
        self.sigma.validate("sigma")?;
        self.rho.validate("rho")?;
        self.beta.validate("beta")
    }
}

/// Figure size and camera settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Image width in pixels for rendered files, and the initial window width.
    pub width: u32,
    /// Image height in pixels for rendered files. The window adds room for the sliders.
    pub height: u32,
    pub line_width: u32,
    pub line_color: [u8; 3],
    /// Camera rotation about the vertical axis, degrees.
    pub yaw: f64,
    /// Camera elevation, degrees.
    pub pitch: f64,
    pub scale: f64,
    /// Mark the fixed points of the system.
    pub show_equilibria: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            line_width: 1,
            line_color: [31, 119, 180],
            yaw: 30.0,
            pitch: 20.0,
            scale: 0.8,
            show_equilibria: false,
        }
    }
}

impl ViewConfig {
    fn validate(&self) -> Result<(), LorenzErrors> {
        if self.width == 0 || self.height == 0 {
            return Err(LorenzErrors::InvalidConfig(format!(
                "view size {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        if !self.yaw.is_finite() || !self.pitch.is_finite() {
            return Err(LorenzErrors::InvalidConfig("view angles must be finite".into()));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(LorenzErrors::InvalidConfig(format!(
                "view scale {} must be positive",
                self.scale
            )));
        }
        Ok(())
    }
}
