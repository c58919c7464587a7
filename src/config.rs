//! # DMP Configuration
//!
//! Training-time parameters for a reversible DMP plus the per-call generation
//! overrides that are merged into each run.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! end_time = 1.0
//! damping = 200.0        # stiffness defaults to damping² / 4
//! rbf_num = 1000
//! tau = 1.0
//! ax = -3.0
//! dt = 0.001
//! scaling = "original"
//! dof = 2
//!
//! [generation]
//! ac = 1.0
//! type = 1
//! ext_force = [0.0, 0.0]
//! ```
//!
//! Generation fields left out of both the file and the call fall back to the
//! trained instance: start/goal come from the demonstration, `tau` and `dt`
//! from the training parameters.

// src/config.rs - DMP configuration file
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Largest nominal horizon, in integration steps, a run may ask for.
pub const MAX_HORIZON_STEPS: usize = 10_000_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// How the learned forcing term is scaled at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ForcingScaling {
    /// Forcing is multiplied by `goal - start`, so the shape stretches with the
    /// new boundary span.
    #[default]
    Original,
    /// Forcing is reproduced in absolute units regardless of the span.
    Unscaled,
}

/// External force coupling, selected by the numeric `type` code.
///
/// `1` adds the external force inside the transformation step; every other
/// code suppresses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "i64", into = "i64")]
pub enum ForceCoupling {
    Additive,
    Suppressed,
}

impl From<i64> for ForceCoupling {
    fn from(code: i64) -> Self {
        match code {
            1 => ForceCoupling::Additive,
            _ => ForceCoupling::Suppressed,
        }
    }
}

impl From<ForceCoupling> for i64 {
    fn from(coupling: ForceCoupling) -> Self {
        match coupling {
            ForceCoupling::Additive => 1,
            ForceCoupling::Suppressed => 0,
        }
    }
}

/// Training-time configuration of one DMP instance.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DmpConfig {
    #[serde(default = "default_end_time")]
    pub end_time: f64,
    /// Damping `D`.
    #[serde(default = "default_damping", alias = "D")]
    pub damping: f64,
    /// Stiffness `K`; critical damping `D² / 4` when unset.
    #[serde(default, alias = "K", skip_serializing_if = "Option::is_none")]
    pub stiffness: Option<f64>,
    #[serde(default = "default_rbf_num")]
    pub rbf_num: usize,
    #[serde(default = "default_tau")]
    pub tau: f64,
    /// Canonical decay rate, must be negative.
    #[serde(default = "default_ax")]
    pub ax: f64,
    #[serde(default = "default_dt")]
    pub dt: f64,
    #[serde(default)]
    pub scaling: ForcingScaling,
    #[serde(default = "default_dof")]
    pub dof: usize,
    /// Optional goal-arrival distance that ends a run early.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_thresh: Option<f64>,
    /// Defaults applied to every generation call before the call's own overrides.
    #[serde(default)]
    pub generation: GenerationOverrides,
}

impl Default for DmpConfig {
    fn default() -> Self {
        Self {
            end_time: default_end_time(),
            damping: default_damping(),
            stiffness: None,
            rbf_num: default_rbf_num(),
            tau: default_tau(),
            ax: default_ax(),
            dt: default_dt(),
            scaling: ForcingScaling::default(),
            dof: default_dof(),
            goal_thresh: None,
            generation: GenerationOverrides::default(),
        }
    }
}

impl DmpConfig {
    /// Config for `dof` degrees of freedom with every other field at its default.
    pub fn with_dof(dof: usize) -> Self {
        Self {
            dof,
            ..Default::default()
        }
    }

    pub fn stiffness(&self) -> f64 {
        self.stiffness
            .unwrap_or(self.damping * self.damping / 4.0)
    }

    /// Number of integration steps needed to traverse the phase domain.
    /// Saturates at [`MAX_HORIZON_STEPS`]; use [`Self::checked_horizon_steps`]
    /// to reject oversized horizons instead.
    pub fn horizon_steps(&self, tau: f64, dt: f64) -> usize {
        let steps = (self.end_time * tau / dt).round();
        if steps.is_nan() {
            return 1;
        }
        (steps.min(MAX_HORIZON_STEPS as f64) as usize).max(1)
    }

    pub fn checked_horizon_steps(&self, tau: f64, dt: f64) -> Result<usize, String> {
        let steps = (self.end_time * tau / dt).round();
        if !steps.is_finite() || steps > MAX_HORIZON_STEPS as f64 {
            return Err(format!(
                "horizon of end_time * tau / dt = {} steps exceeds the limit of {} (tau {}, dt {})",
                steps, MAX_HORIZON_STEPS, tau, dt
            ));
        }
        Ok((steps as usize).max(1))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.dof == 0 {
            return Err("dof must be > 0".to_string());
        }
        if self.rbf_num == 0 {
            return Err("rbf_num must be > 0".to_string());
        }
        positive("end_time", self.end_time)?;
        positive("damping", self.damping)?;
        positive("tau", self.tau)?;
        positive("dt", self.dt)?;
        if let Some(k) = self.stiffness {
            positive("stiffness", k)?;
        }
        if !self.ax.is_finite() || self.ax >= 0.0 {
            return Err(format!("ax must be finite and < 0, got {}", self.ax));
        }
        if let Some(thresh) = self.goal_thresh {
            positive("goal_thresh", thresh)?;
        }
        self.checked_horizon_steps(self.tau, self.dt)?;
        self.generation.validate(self.dof)
    }
}

/// Per-call generation parameters. Every field is optional; unset fields are
/// filled from the configuration's `[generation]` table and then from the
/// trained instance.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GenerationOverrides {
    #[serde(default, alias = "reversed_start", skip_serializing_if = "Option::is_none")]
    pub start: Option<Vec<f64>>,
    #[serde(default, alias = "reversed_goal", skip_serializing_if = "Option::is_none")]
    pub goal: Option<Vec<f64>>,
    /// Initial velocity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dy: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tau: Option<f64>,
    /// Phase-stopping gain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ac: Option<f64>,
    #[serde(default, alias = "extForce", skip_serializing_if = "Option::is_none")]
    pub ext_force: Option<Vec<f64>>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub coupling: Option<ForceCoupling>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dt: Option<f64>,
}

impl GenerationOverrides {
    /// Field-wise merge: values set on `self` win over `base`.
    pub fn merged_over(&self, base: &GenerationOverrides) -> GenerationOverrides {
        GenerationOverrides {
            start: self.start.clone().or_else(|| base.start.clone()),
            goal: self.goal.clone().or_else(|| base.goal.clone()),
            dy: self.dy.clone().or_else(|| base.dy.clone()),
            tau: self.tau.or(base.tau),
            ac: self.ac.or(base.ac),
            ext_force: self.ext_force.clone().or_else(|| base.ext_force.clone()),
            coupling: self.coupling.or(base.coupling),
            dt: self.dt.or(base.dt),
        }
    }

    pub fn with_start(mut self, start: Vec<f64>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_goal(mut self, goal: Vec<f64>) -> Self {
        self.goal = Some(goal);
        self
    }

    pub fn with_dy(mut self, dy: Vec<f64>) -> Self {
        self.dy = Some(dy);
        self
    }

    pub fn with_tau(mut self, tau: f64) -> Self {
        self.tau = Some(tau);
        self
    }

    /// Playback speed multiplier; `tau = 1 / speed`.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.tau = Some(1.0 / speed);
        self
    }

    pub fn with_ac(mut self, ac: f64) -> Self {
        self.ac = Some(ac);
        self
    }

    pub fn with_ext_force(mut self, force: Vec<f64>) -> Self {
        self.ext_force = Some(force);
        self
    }

    pub fn with_coupling(mut self, coupling: ForceCoupling) -> Self {
        self.coupling = Some(coupling);
        self
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = Some(dt);
        self
    }

    pub fn validate(&self, dof: usize) -> Result<(), String> {
        let vectors = [
            ("start", &self.start),
            ("goal", &self.goal),
            ("dy", &self.dy),
            ("ext_force", &self.ext_force),
        ];
        for (name, value) in vectors {
            if let Some(v) = value {
                if v.len() != dof {
                    return Err(format!("{} has {} entries, expected dof = {}", name, v.len(), dof));
                }
                if v.iter().any(|x| !x.is_finite()) {
                    return Err(format!("{} contains non-finite values", name));
                }
            }
        }
        if let Some(tau) = self.tau {
            positive("tau", tau)?;
        }
        if let Some(dt) = self.dt {
            positive("dt", dt)?;
        }
        if let Some(ac) = self.ac {
            if !ac.is_finite() || ac < 0.0 {
                return Err(format!("ac must be finite and >= 0, got {}", ac));
            }
        }
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> Result<(), String> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(format!("{} must be finite and > 0, got {}", name, value))
    }
}

fn default_end_time() -> f64 { 1.0 }
fn default_damping() -> f64 { 200.0 }
fn default_rbf_num() -> usize { 1000 }
fn default_tau() -> f64 { 1.0 }
fn default_ax() -> f64 { -3.0 }
fn default_dt() -> f64 { 0.001 }
fn default_dof() -> usize { 2 }

pub fn load_config(path: impl AsRef<Path>) -> Result<DmpConfig, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        tracing::error!("Failed to read config file '{}': {}", path.display(), e);
        ConfigError::Io(e)
    })?;
    let config: DmpConfig = toml::from_str(&contents).map_err(|e| {
        tracing::error!("Failed to parse config TOML: {}", e);
        ConfigError::Toml(e)
    })?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

pub fn save_config(config: &DmpConfig, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let toml_string = toml::to_string(config)?;
    std::fs::write(path, toml_string)?;
    Ok(())
}
