//! # sim-rl-env
//!
//! Reinforcement-learning environment adapter for time-stepped simulations.
//!
//! This crate provides:
//! - `SimEnv`, the reset / step / close adapter over any `SimulationFactory`
//! - Episode tracking and truncation policies
//! - The `Extractor` contract with a default snapshot extractor
//! - Driving reward functions and a log-based renderer

pub mod environment;
pub mod episode;
pub mod extractor;
pub mod render;
pub mod rewards;

pub use environment::{ResetOptions, SimEnv};
pub use episode::{
    EpisodeState, EpisodeTracker, SimTimeLimit, StepLimit, TruncationPolicy, WallClockLimit,
};
pub use extractor::{Extractor, SnapshotExtractor};
pub use render::{LogRenderer, Renderer};
pub use rewards::LaneProgressReward;
