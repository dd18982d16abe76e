//! Step info payload

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::simulation::CollisionKind;

/// Extra info entries produced by an extractor
pub type InfoMap = BTreeMap<String, InfoValue>;

/// Value stored in an [`InfoMap`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InfoValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for InfoValue {
    fn from(v: bool) -> Self {
        InfoValue::Bool(v)
    }
}

impl From<i64> for InfoValue {
    fn from(v: i64) -> Self {
        InfoValue::Int(v)
    }
}

impl From<u64> for InfoValue {
    fn from(v: u64) -> Self {
        InfoValue::Int(v as i64)
    }
}

impl From<usize> for InfoValue {
    fn from(v: usize) -> Self {
        InfoValue::Int(v as i64)
    }
}

impl From<f64> for InfoValue {
    fn from(v: f64) -> Self {
        InfoValue::Float(v)
    }
}

impl From<&str> for InfoValue {
    fn from(v: &str) -> Self {
        InfoValue::Text(v.to_string())
    }
}

impl From<String> for InfoValue {
    fn from(v: String) -> Self {
        InfoValue::Text(v)
    }
}

/// Why an episode ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TerminationReason {
    GoalReached,
    Collision { kind: CollisionKind },
    LeftRoad,
    StepLimit,
    TimeLimit,
}

/// Auxiliary information returned with every step
///
/// `episode`, `step_count` and `sim_time` are always present.
/// `termination_reason` is set on the step that ends the episode and
/// `episode_return` (sum of rewards) only on that step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Info {
    /// Episode counter, starting at 1 with the first reset
    pub episode: u64,
    pub step_count: u64,
    /// Simulated seconds since reset
    pub sim_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<TerminationReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_return: Option<f64>,
    /// Extractor-provided entries
    #[serde(default)]
    pub extra: InfoMap,
}

impl Info {
    pub fn get(&self, key: &str) -> Option<&InfoValue> {
        self.extra.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_json_shape() {
        let mut info = Info {
            episode: 2,
            step_count: 7,
            sim_time: 0.7,
            termination_reason: Some(TerminationReason::Collision {
                kind: CollisionKind::Vehicle,
            }),
            episode_return: Some(-3.5),
            extra: InfoMap::new(),
        };
        info.extra.insert("ego_speed".into(), 12.5.into());
        info.extra.insert("events".into(), 1usize.into());

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["termination_reason"]["reason"], "collision");
        assert_eq!(json["termination_reason"]["kind"], "vehicle");
        assert_eq!(json["extra"]["ego_speed"], 12.5);

        let back: Info = serde_json::from_value(json).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn test_optional_keys_omitted() {
        let json = serde_json::to_string(&Info::default()).unwrap();
        assert!(!json.contains("termination_reason"));
        assert!(!json.contains("episode_return"));
    }
}
