//! Backend and environment manifest types

use serde::{Deserialize, Serialize};

use crate::action::{ActionPolicy, ActionSpace};
use crate::observation::ObservationSpace;

/// Identity and capabilities of a simulation backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendManifest {
    /// Backend name
    pub name: String,
    /// Backend version
    pub version: String,
    /// Identical actions on identical scenarios produce identical states
    #[serde(default)]
    pub deterministic: bool,
    /// Supports attaching a visualization
    #[serde(default)]
    pub supports_render: bool,
}

impl Default for BackendManifest {
    fn default() -> Self {
        Self {
            name: "Unknown".into(),
            version: "0.0.0".into(),
            deterministic: false,
            supports_render: false,
        }
    }
}

/// Static description of a constructed environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvManifest {
    /// sim-rl version
    pub sim_rl_version: String,
    pub backend: BackendManifest,
    pub action_space: ActionSpace,
    pub observation_space: ObservationSpace,
    pub action_policy: ActionPolicy,
    /// Step cap per episode
    pub max_steps: u64,
    /// Simulated seconds per tick
    pub timestep: f64,
    /// Names of the reward terms reported in `reward_components`
    #[serde(default)]
    pub reward_components: Vec<String>,
}
