//! Environment configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::action::ActionPolicy;
use crate::error::{Result, SimError};
use crate::scenario::ScenarioParameters;
use crate::simulation::SimulationConfig;

/// Options recognized by the environment adapter
///
/// Every field has a default, so `{}` is a valid JSON configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Episode step cap; must be > 0
    pub max_steps: u64,
    /// Attach a renderer
    pub render: bool,
    /// Simulated seconds per tick
    pub timestep: f64,
    /// Pace ticks to wall-clock time
    pub real_time: bool,
    /// Handling of out-of-space actions
    pub action_policy: ActionPolicy,
    /// Agent slots in the observation
    pub max_agents: usize,
    /// Forwarded to the scenario source on every reset
    pub scenario_parameters: ScenarioParameters,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            max_steps: 1000,
            render: false,
            timestep: 0.1,
            real_time: false,
            action_policy: ActionPolicy::Strict,
            max_agents: 8,
            scenario_parameters: ScenarioParameters::new(),
        }
    }
}

impl EnvConfig {
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_timestep(mut self, timestep: f64) -> Self {
        self.timestep = timestep;
        self
    }

    pub fn with_action_policy(mut self, policy: ActionPolicy) -> Self {
        self.action_policy = policy;
        self
    }

    pub fn with_render(mut self, render: bool) -> Self {
        self.render = render;
        self
    }

    pub fn with_max_agents(mut self, max_agents: usize) -> Self {
        self.max_agents = max_agents;
        self
    }

    /// Reject values the adapter cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(SimError::Configuration("max_steps must be > 0".into()));
        }
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(SimError::Configuration(format!(
                "timestep must be a positive number of seconds, got {}",
                self.timestep
            )));
        }
        if self.max_agents == 0 {
            return Err(SimError::Configuration("max_agents must be > 0".into()));
        }
        Ok(())
    }

    /// Settings passed to the simulation factory
    pub fn simulation_config(&self, seed: Option<u64>) -> SimulationConfig {
        SimulationConfig {
            timestep: self.timestep,
            render: self.render,
            seed,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| SimError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }
}
