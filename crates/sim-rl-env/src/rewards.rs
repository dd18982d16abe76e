//! Reward functions for driving scenarios

use sim_rl_core::{
    Action, Reward, RewardComponents, RewardFunction, Result, SimError, SimEvent,
    SimulationState,
};

/// Lane-keeping progress reward for the ego vehicle
///
/// Rewards forward progress scaled by how centred the ego is in its lane,
/// adds a small speed bonus and applies a terminal bonus or penalty.
/// The sign of the progress and speed terms follows the lane direction.
#[derive(Debug, Clone)]
pub struct LaneProgressReward {
    pub progress_weight: f64,
    pub speed_weight: f64,
    /// Speed that earns the full speed bonus, in m/s
    pub reference_speed: f64,
    pub off_lane_penalty: f64,
    pub crash_penalty: f64,
    pub success_reward: f64,
}

impl Default for LaneProgressReward {
    fn default() -> Self {
        Self {
            progress_weight: 2.0,
            speed_weight: 0.1,
            reference_speed: 10.0,
            off_lane_penalty: -5.0,
            crash_penalty: -5.0,
            success_reward: 10.0,
        }
    }
}

impl RewardFunction for LaneProgressReward {
    fn compute(&self, state: &SimulationState, _action: &Action) -> Result<Reward> {
        let ego = state
            .ego()
            .ok_or_else(|| SimError::extraction("agents", "state has no ego agent"))?;

        let mut components = RewardComponents::new();
        let Some(lane) = &ego.lane else {
            components.insert("terminal".into(), self.off_lane_penalty);
            return Ok(Reward::from_components(components));
        };

        let direction = if lane.forward { 1.0 } else { -1.0 };
        let lateral_factor = (1.0 - 2.0 * lane.lateral_offset.abs() / lane.width).clamp(0.0, 1.0);

        components.insert(
            "progress".into(),
            self.progress_weight * ego.displacement[0] * lateral_factor * direction,
        );
        components.insert(
            "speed".into(),
            self.speed_weight * (ego.speed / self.reference_speed) * direction,
        );

        let crashed = ego.collision.is_some()
            || state
                .events_for(&ego.id)
                .any(|e| matches!(e, SimEvent::Collision { .. }));
        let reached_goal = state
            .events_for(&ego.id)
            .any(|e| matches!(e, SimEvent::GoalReached { .. }));
        let terminal = if crashed {
            self.crash_penalty
        } else if reached_goal {
            self.success_reward
        } else {
            0.0
        };
        components.insert("terminal".into(), terminal);

        Ok(Reward::from_components(components))
    }

    fn components(&self) -> Vec<String> {
        vec!["progress".into(), "speed".into(), "terminal".into()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_rl_core::{AgentState, CollisionKind, LaneInfo, ObjectKind};

    fn ego(offset: f64, forward: bool) -> AgentState {
        AgentState {
            id: "ego".into(),
            kind: ObjectKind::Car,
            position: [10.0, 1.75 + offset],
            velocity: [10.0, 0.0],
            heading: 0.0,
            speed: 10.0,
            displacement: [1.0, 0.0],
            lane: Some(LaneInfo {
                index: 0,
                lateral_offset: offset,
                width: 3.5,
                forward,
            }),
            collision: None,
        }
    }

    fn state(ego: AgentState, events: Vec<SimEvent>) -> SimulationState {
        SimulationState {
            tick: 1,
            time: 0.1,
            agents: vec![ego],
            events,
        }
    }

    fn compute(state: &SimulationState) -> Reward {
        LaneProgressReward::default()
            .compute(state, &Action::Continuous(vec![0.0, 0.5]))
            .unwrap()
    }

    #[test]
    fn test_centred_progress() {
        let r = compute(&state(ego(0.0, true), vec![]));
        assert_eq!(r.components["progress"], 2.0);
        assert!((r.components["speed"] - 0.1).abs() < 1e-12);
        assert_eq!(r.components["terminal"], 0.0);
        assert!((r.value - 2.1).abs() < 1e-12);
    }

    #[test]
    fn test_lateral_offset_scales_progress() {
        let half = compute(&state(ego(0.875, true), vec![]));
        assert!((half.components["progress"] - 1.0).abs() < 1e-12);

        let edge = compute(&state(ego(1.75, true), vec![]));
        assert_eq!(edge.components["progress"], 0.0);
    }

    #[test]
    fn test_wrong_direction_is_negative() {
        let r = compute(&state(ego(0.0, false), vec![]));
        assert!(r.value < 0.0);
    }

    #[test]
    fn test_no_lane_penalty() {
        let mut off = ego(0.0, true);
        off.lane = None;
        let r = compute(&state(off, vec![]));
        assert_eq!(r.value, -5.0);
    }

    #[test]
    fn test_crash_outranks_goal() {
        let mut crashed = ego(0.0, true);
        crashed.collision = Some(CollisionKind::Vehicle);
        let r = compute(&state(
            crashed,
            vec![SimEvent::GoalReached { agent: "ego".into() }],
        ));
        assert_eq!(r.components["terminal"], -5.0);

        let r = compute(&state(
            ego(0.0, true),
            vec![SimEvent::GoalReached { agent: "ego".into() }],
        ));
        assert_eq!(r.components["terminal"], 10.0);
    }

    #[test]
    fn test_missing_ego() {
        let empty = SimulationState {
            tick: 0,
            time: 0.0,
            agents: vec![],
            events: vec![],
        };
        let err = LaneProgressReward::default()
            .compute(&empty, &Action::Continuous(vec![0.0, 0.0]))
            .unwrap_err();
        assert!(matches!(err, SimError::Extraction { .. }));
    }
}
