//! Reward types and reward functions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::action::Action;
use crate::error::Result;
use crate::simulation::SimulationState;

/// Scalar reward with optional decomposition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Reward {
    /// Total scalar reward
    pub value: f64,
    /// Decomposed components for analysis
    #[serde(default)]
    pub components: RewardComponents,
}

impl Reward {
    /// Reward without decomposition
    pub fn scalar(value: f64) -> Self {
        Self {
            value,
            components: RewardComponents::new(),
        }
    }

    /// Build from named components; the value is their sum
    pub fn from_components(components: RewardComponents) -> Self {
        Self {
            value: components.values().sum(),
            components,
        }
    }
}

/// Decomposed reward components
pub type RewardComponents = BTreeMap<String, f64>;

/// Computes the step reward from the post-tick state
///
/// Implementations read the state only and must be deterministic.
pub trait RewardFunction: Send + Sync {
    /// Reward for arriving in `state` after applying `action`
    fn compute(&self, state: &SimulationState, action: &Action) -> Result<Reward>;

    /// Names of the components this function reports
    fn components(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Adapts a closure into a [`RewardFunction`]
pub struct RewardFn<F>(pub F);

impl<F> RewardFunction for RewardFn<F>
where
    F: Fn(&SimulationState, &Action) -> Result<f64> + Send + Sync,
{
    fn compute(&self, state: &SimulationState, action: &Action) -> Result<Reward> {
        (self.0)(state, action).map(Reward::scalar)
    }
}

/// Constant reward; useful when only termination matters
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantReward(pub f64);

impl RewardFunction for ConstantReward {
    fn compute(&self, _state: &SimulationState, _action: &Action) -> Result<Reward> {
        Ok(Reward::scalar(self.0))
    }
}
