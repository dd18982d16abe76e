//! Action types and action spaces

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// An action supplied by the agent for a single step
///
/// Integer arrays deserialize as [`Action::MultiDiscrete`]; continuous
/// spaces accept them as well, so `[1, 0]` is a valid steering/throttle
/// command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    /// Discrete action index
    Discrete(i64),
    /// One index per dimension
    MultiDiscrete(Vec<i64>),
    /// Continuous action vector (flattened)
    Continuous(Vec<f64>),
}

impl Action {
    /// View the action as a flat float vector, if it has vector form
    pub fn as_continuous(&self) -> Option<Vec<f64>> {
        match self {
            Action::Continuous(values) => Some(values.clone()),
            Action::MultiDiscrete(values) => Some(values.iter().map(|v| *v as f64).collect()),
            Action::Discrete(_) => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Action::Discrete(_) => "discrete",
            Action::MultiDiscrete(_) => "multi-discrete",
            Action::Continuous(_) => "continuous",
        }
    }
}

/// How the environment treats actions outside the action space
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPolicy {
    /// Reject with `InvalidAction`; no tick is consumed
    #[default]
    Strict,
    /// Clamp continuous components into bounds; structural mismatches are
    /// still rejected
    Clamp,
}

/// Description of an action space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type", rename_all = "PascalCase")]
pub enum ActionSpace {
    /// Discrete action space
    Discrete {
        /// Number of discrete actions
        n: usize,
        /// Optional action names
        #[serde(skip_serializing_if = "Option::is_none")]
        names: Option<Vec<String>>,
    },
    /// Continuous action space (Box)
    Continuous {
        /// Action vector shape
        shape: Vec<usize>,
        /// Lower bounds, flattened
        low: Vec<f64>,
        /// Upper bounds, flattened
        high: Vec<f64>,
    },
    /// Multi-discrete action space
    MultiDiscrete {
        /// Number of options for each dimension
        nvec: Vec<usize>,
    },
}

impl ActionSpace {
    /// One-dimensional box with per-component bounds
    pub fn continuous(low: Vec<f64>, high: Vec<f64>) -> Self {
        ActionSpace::Continuous {
            shape: vec![low.len()],
            low,
            high,
        }
    }

    /// Number of scalar components in an action of this space
    pub fn dim(&self) -> usize {
        match self {
            ActionSpace::Discrete { .. } => 1,
            ActionSpace::Continuous { shape, .. } => shape.iter().product(),
            ActionSpace::MultiDiscrete { nvec } => nvec.len(),
        }
    }

    /// Check that the space itself is well formed
    pub fn check(&self) -> Result<()> {
        match self {
            ActionSpace::Discrete { n, names } => {
                if *n == 0 {
                    return Err(SimError::Configuration(
                        "discrete action space must have n > 0".into(),
                    ));
                }
                if let Some(names) = names {
                    if names.len() != *n {
                        return Err(SimError::Configuration(format!(
                            "discrete action space has {} names for {} actions",
                            names.len(),
                            n
                        )));
                    }
                }
            }
            ActionSpace::Continuous { low, high, .. } => {
                let dim = self.dim();
                if low.len() != dim || high.len() != dim {
                    return Err(SimError::Configuration(format!(
                        "continuous action space bounds must have {} entries (low: {}, high: {})",
                        dim,
                        low.len(),
                        high.len()
                    )));
                }
                if let Some(i) = (0..dim).find(|&i| !(low[i] <= high[i])) {
                    return Err(SimError::Configuration(format!(
                        "continuous action space bound {} has low {} > high {}",
                        i, low[i], high[i]
                    )));
                }
            }
            ActionSpace::MultiDiscrete { nvec } => {
                if nvec.is_empty() || nvec.contains(&0) {
                    return Err(SimError::Configuration(
                        "multi-discrete action space needs non-zero dimensions".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Check that `action` lies inside this space
    pub fn validate(&self, action: &Action) -> Result<()> {
        match (self, action) {
            (ActionSpace::Discrete { n, .. }, Action::Discrete(index)) => {
                if *index < 0 || *index as usize >= *n {
                    return Err(SimError::InvalidAction(format!(
                        "discrete action {} outside 0..{}",
                        index, n
                    )));
                }
                Ok(())
            }
            (ActionSpace::MultiDiscrete { nvec }, Action::MultiDiscrete(indices)) => {
                if indices.len() != nvec.len() {
                    return Err(SimError::InvalidAction(format!(
                        "expected {} indices, got {}",
                        nvec.len(),
                        indices.len()
                    )));
                }
                for (dim, (index, n)) in indices.iter().zip(nvec).enumerate() {
                    if *index < 0 || *index as usize >= *n {
                        return Err(SimError::InvalidAction(format!(
                            "index {} in dimension {} outside 0..{}",
                            index, dim, n
                        )));
                    }
                }
                Ok(())
            }
            (ActionSpace::Continuous { low, high, .. }, _) => {
                let values = self.continuous_values(action)?;
                for (i, value) in values.iter().enumerate() {
                    if *value < low[i] || *value > high[i] {
                        return Err(SimError::InvalidAction(format!(
                            "component {} = {} outside [{}, {}]",
                            i, value, low[i], high[i]
                        )));
                    }
                }
                Ok(())
            }
            (space, action) => Err(SimError::InvalidAction(format!(
                "{} action does not fit {} space",
                action.kind(),
                space.kind()
            ))),
        }
    }

    /// Clamp `action` into this space
    ///
    /// Only continuous components are clamped. Wrong kinds, wrong lengths,
    /// non-finite values and out-of-range discrete indices are errors.
    pub fn clamp(&self, action: Action) -> Result<Action> {
        match self {
            ActionSpace::Continuous { low, high, .. } => {
                let values = self.continuous_values(&action)?;
                let clamped = values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| v.clamp(low[i], high[i]))
                    .collect();
                Ok(Action::Continuous(clamped))
            }
            _ => {
                self.validate(&action)?;
                Ok(action)
            }
        }
    }

    /// Flatten a vector-form action and check its length and finiteness
    fn continuous_values(&self, action: &Action) -> Result<Vec<f64>> {
        let values = action.as_continuous().ok_or_else(|| {
            SimError::InvalidAction(format!(
                "{} action does not fit {} space",
                action.kind(),
                self.kind()
            ))
        })?;
        if values.len() != self.dim() {
            return Err(SimError::InvalidAction(format!(
                "expected {} components, got {}",
                self.dim(),
                values.len()
            )));
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(SimError::InvalidAction(format!(
                "component {} is not finite",
                i
            )));
        }
        Ok(values)
    }

    fn kind(&self) -> &'static str {
        match self {
            ActionSpace::Discrete { .. } => "discrete",
            ActionSpace::Continuous { .. } => "continuous",
            ActionSpace::MultiDiscrete { .. } => "multi-discrete",
        }
    }
}
