//! Observation types

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::info::Info;
use crate::reward::RewardComponents;

/// Snapshot of one agent as seen by the policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: String,
    pub position: [f64; 2],
    pub velocity: [f64; 2],
    pub heading: f64,
}

impl AgentSnapshot {
    /// Scalars per agent in the flattened observation
    pub const FEATURES: usize = 5;

    /// `[x, y, vx, vy, heading]`
    pub fn features(&self) -> [f64; Self::FEATURES] {
        [
            self.position[0],
            self.position[1],
            self.velocity[0],
            self.velocity[1],
            self.heading,
        ]
    }
}

/// Agent-facing observation: ordered per-agent snapshots, ego first
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Observation {
    pub agents: Vec<AgentSnapshot>,
}

impl Observation {
    pub fn ego(&self) -> Option<&AgentSnapshot> {
        self.agents.first()
    }
}

/// Declared observation domain
///
/// Observations hold between one and `max_agents` snapshots whose features
/// lie within `low`/`high` (one bound per feature).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSpace {
    pub max_agents: usize,
    pub low: Vec<f64>,
    pub high: Vec<f64>,
}

impl ObservationSpace {
    /// Unbounded features for up to `max_agents` agents
    pub fn unbounded(max_agents: usize) -> Self {
        Self {
            max_agents,
            low: vec![f64::NEG_INFINITY; AgentSnapshot::FEATURES],
            high: vec![f64::INFINITY; AgentSnapshot::FEATURES],
        }
    }

    /// Shape of the flattened observation: `[max_agents, FEATURES]`
    pub fn shape(&self) -> [usize; 2] {
        [self.max_agents, AgentSnapshot::FEATURES]
    }

    pub fn check(&self) -> Result<()> {
        if self.max_agents == 0 {
            return Err(SimError::Configuration(
                "observation space needs max_agents > 0".into(),
            ));
        }
        if self.low.len() != AgentSnapshot::FEATURES || self.high.len() != AgentSnapshot::FEATURES {
            return Err(SimError::Configuration(format!(
                "observation space bounds must have {} entries",
                AgentSnapshot::FEATURES
            )));
        }
        Ok(())
    }

    /// Whether `observation` conforms to this space
    pub fn contains(&self, observation: &Observation) -> bool {
        let count = observation.agents.len();
        if count == 0 || count > self.max_agents {
            return false;
        }
        observation.agents.iter().all(|agent| {
            agent
                .features()
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(v, (lo, hi))| !v.is_nan() && v >= lo && v <= hi)
        })
    }

    /// Flatten to `max_agents * FEATURES` values, zero-padding absent agents
    pub fn flatten(&self, observation: &Observation) -> Vec<f64> {
        let mut out = vec![0.0; self.max_agents * AgentSnapshot::FEATURES];
        for (slot, agent) in observation.agents.iter().take(self.max_agents).enumerate() {
            let start = slot * AgentSnapshot::FEATURES;
            out[start..start + AgentSnapshot::FEATURES].copy_from_slice(&agent.features());
        }
        out
    }
}

/// Result of a single environment step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Observation of the post-tick state
    pub observation: Observation,

    /// Scalar reward signal
    pub reward: f64,

    /// Decomposed reward for analysis
    #[serde(default)]
    pub reward_components: RewardComponents,

    /// Episode ended by a world condition (goal, collision)
    pub terminated: bool,

    /// Episode ended by an external limit (step cap, time)
    pub truncated: bool,

    pub info: Info,
}

impl StepResult {
    /// `(observation, reward, terminated, truncated, info)`
    pub fn into_tuple(self) -> (Observation, f64, bool, bool, Info) {
        (
            self.observation,
            self.reward,
            self.terminated,
            self.truncated,
            self.info,
        )
    }

    /// Whether the episode is over
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: &str, x: f64) -> AgentSnapshot {
        AgentSnapshot {
            id: id.into(),
            position: [x, 1.75],
            velocity: [10.0, 0.0],
            heading: 0.0,
        }
    }

    #[test]
    fn test_flatten_pads_missing_agents() {
        let space = ObservationSpace::unbounded(3);
        let obs = Observation {
            agents: vec![snapshot("ego", 2.0)],
        };
        let flat = space.flatten(&obs);
        assert_eq!(flat.len(), 15);
        assert_eq!(&flat[..5], &[2.0, 1.75, 10.0, 0.0, 0.0]);
        assert!(flat[5..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_contains() {
        let mut space = ObservationSpace::unbounded(2);
        let obs = Observation {
            agents: vec![snapshot("ego", 2.0), snapshot("car-1", 30.0)],
        };
        assert!(space.contains(&obs));
        assert!(!space.contains(&Observation::default()));

        space.high[0] = 10.0;
        assert!(!space.contains(&obs));

        space.max_agents = 1;
        assert!(!space.contains(&Observation {
            agents: vec![snapshot("ego", 2.0), snapshot("car-1", 3.0)],
        }));
    }

    #[test]
    fn test_space_check() {
        assert!(ObservationSpace::unbounded(4).check().is_ok());
        assert!(ObservationSpace::unbounded(0).check().is_err());
        let short = ObservationSpace {
            max_agents: 1,
            low: vec![0.0],
            high: vec![1.0],
        };
        assert!(short.check().is_err());
    }
}
