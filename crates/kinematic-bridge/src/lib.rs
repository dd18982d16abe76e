//! In-process kinematic traffic backend for sim-rl
//!
//! This crate provides:
//! - A bicycle-model ego vehicle with constant-velocity traffic
//! - Lane, collision, off-road and goal detection
//! - `SimulationFactory` / `SimulationInstance` implementations for `SimEnv`

pub mod bridge;
pub mod world;

pub use bridge::{KinematicConfig, KinematicFactory, KinematicSimulation};
pub use world::{PhysicsConfig, World};
