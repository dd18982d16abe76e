//! # sim-rl-core
//!
//! Core types and collaborator contracts for the sim-rl environment adapter.
//!
//! This crate provides the foundational types shared by the adapter and by
//! simulation backends:
//! - Action and observation spaces
//! - Scenario descriptions and scenario sources
//! - The simulation backend contract (factory + instance)
//! - Reward functions, step info and the error taxonomy

pub mod action;
pub mod config;
pub mod error;
pub mod info;
pub mod manifest;
pub mod observation;
pub mod reward;
pub mod scenario;
pub mod simulation;

pub use action::{Action, ActionPolicy, ActionSpace};
pub use config::EnvConfig;
pub use error::{Result, SimError};
pub use info::{Info, InfoMap, InfoValue, TerminationReason};
pub use manifest::{BackendManifest, EnvManifest};
pub use observation::{AgentSnapshot, Observation, ObservationSpace, StepResult};
pub use reward::{ConstantReward, Reward, RewardComponents, RewardFn, RewardFunction};
pub use scenario::{
    FixedScenario, Goal, ObjectKind, RoadMap, SceneObject, Scenario, ScenarioCatalog,
    ScenarioParameters, ScenarioQueue, ScenarioSource,
};
pub use simulation::{
    AgentState, CollisionKind, LaneInfo, SimEvent, SimulationConfig, SimulationFactory,
    SimulationInstance, SimulationState,
};
