//! Simulation backend contract
//!
//! A backend is a [`SimulationFactory`] that turns a [`Scenario`] into an
//! independent [`SimulationInstance`]. Instances own their world state
//! exclusively; nothing is shared between two instances, even when they come
//! from the same factory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionSpace};
use crate::error::Result;
use crate::manifest::BackendManifest;
use crate::scenario::{ObjectKind, Scenario};

/// Settings handed to the factory for each new simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Simulated seconds advanced by one tick
    pub timestep: f64,
    /// Whether a visualization is attached
    #[serde(default)]
    pub render: bool,
    /// Seed for any stochastic elements of the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            timestep: 0.1,
            render: false,
            seed: None,
        }
    }
}

/// Raw world state reported by a backend after a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    /// Ticks advanced since creation
    pub tick: u64,
    /// Simulated time in seconds
    pub time: f64,
    /// Agents in the world, ego first
    pub agents: Vec<AgentState>,
    /// Events raised by the last tick
    #[serde(default)]
    pub events: Vec<SimEvent>,
}

impl SimulationState {
    /// The ego agent
    pub fn ego(&self) -> Option<&AgentState> {
        self.agents.first()
    }

    /// Events concerning the agent with `id`
    pub fn events_for<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a SimEvent> + 'a {
        self.events.iter().filter(move |e| e.agent() == id)
    }
}

/// Per-agent dynamic state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub id: String,
    pub kind: ObjectKind,
    pub position: [f64; 2],
    pub velocity: [f64; 2],
    pub heading: f64,
    pub speed: f64,
    /// Movement during the last tick
    #[serde(default)]
    pub displacement: [f64; 2],
    /// Lane the agent is on, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lane: Option<LaneInfo>,
    /// Collision the agent is involved in, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collision: Option<CollisionKind>,
}

/// Agent position relative to its lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneInfo {
    pub index: usize,
    /// Signed distance from the lane centre line
    pub lateral_offset: f64,
    pub width: f64,
    /// Whether the lane runs in the +x direction
    pub forward: bool,
}

/// What an agent collided with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionKind {
    Vehicle,
    Object,
    Sidewalk,
}

/// Notable occurrence during a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    Collision {
        agent: String,
        kind: CollisionKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        other: Option<String>,
    },
    GoalReached {
        agent: String,
    },
    LeftRoad {
        agent: String,
    },
}

impl SimEvent {
    /// Agent the event concerns
    pub fn agent(&self) -> &str {
        match self {
            SimEvent::Collision { agent, .. }
            | SimEvent::GoalReached { agent }
            | SimEvent::LeftRoad { agent } => agent,
        }
    }
}

/// Creates simulation instances; one variant per backend
#[async_trait]
pub trait SimulationFactory: Send + Sync + 'static {
    /// Backend identity and capabilities
    fn manifest(&self) -> BackendManifest;

    /// Actions accepted by instances of this backend
    fn action_space(&self) -> ActionSpace;

    /// Build a fresh instance for `scenario`
    ///
    /// Scenes the backend cannot represent fail with `SimError::Scenario`.
    async fn create_simulation(
        &mut self,
        scenario: &Scenario,
        config: &SimulationConfig,
    ) -> Result<Box<dyn SimulationInstance>>;
}

/// A live simulation owning its world state
#[async_trait]
pub trait SimulationInstance: Send {
    /// State as of the last tick (or creation)
    fn current_state(&self) -> Result<SimulationState>;

    /// Apply `action` to the ego agent and advance one tick
    async fn tick(&mut self, action: &Action) -> Result<SimulationState>;

    /// Free the world state; calling it again is a no-op
    async fn release(&mut self) -> Result<()>;
}
