//! Observation / termination / info extraction from simulation state

use sim_rl_core::{
    AgentSnapshot, CollisionKind, InfoMap, Observation, ObservationSpace, Result, SimError,
    SimEvent, SimulationState, TerminationReason,
};

/// Read-only mapping from raw simulation state to agent-facing values
///
/// Implementations must not mutate anything reachable from the state and
/// must return equal results for equal states. Errors are surfaced to the
/// caller unchanged and end the episode.
pub trait Extractor: Send + Sync {
    /// Domain of the observations this extractor produces
    fn observation_space(&self) -> ObservationSpace;

    fn extract_observation(&self, state: &SimulationState) -> Result<Observation>;

    /// Whether a world condition ended the episode
    fn extract_termination(&self, state: &SimulationState) -> Result<bool>;

    /// Why the world ended the episode, when it did
    fn termination_reason(&self, _state: &SimulationState) -> Option<TerminationReason> {
        None
    }

    /// Auxiliary entries for the step info
    fn extract_info(&self, _state: &SimulationState) -> Result<InfoMap> {
        Ok(InfoMap::new())
    }
}

/// Snapshots of the first `max_agents` agents, ego-centric termination
///
/// The episode terminates when the ego collides, leaves the road or
/// reaches its goal.
#[derive(Debug, Clone)]
pub struct SnapshotExtractor {
    max_agents: usize,
}

impl SnapshotExtractor {
    pub fn new(max_agents: usize) -> Self {
        Self { max_agents }
    }
}

impl Extractor for SnapshotExtractor {
    fn observation_space(&self) -> ObservationSpace {
        ObservationSpace::unbounded(self.max_agents)
    }

    fn extract_observation(&self, state: &SimulationState) -> Result<Observation> {
        if state.agents.is_empty() {
            return Err(SimError::extraction("agents", "state has no ego agent"));
        }
        let agents = state
            .agents
            .iter()
            .take(self.max_agents)
            .enumerate()
            .map(|(i, agent)| {
                let snapshot = AgentSnapshot {
                    id: agent.id.clone(),
                    position: agent.position,
                    velocity: agent.velocity,
                    heading: agent.heading,
                };
                if snapshot.features().iter().any(|v| !v.is_finite()) {
                    return Err(SimError::extraction(
                        format!("agents[{}]", i),
                        format!("non-finite kinematics for `{}`", agent.id),
                    ));
                }
                Ok(snapshot)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Observation { agents })
    }

    fn extract_termination(&self, state: &SimulationState) -> Result<bool> {
        let ego = state
            .ego()
            .ok_or_else(|| SimError::extraction("agents", "state has no ego agent"))?;
        Ok(ego.collision.is_some() || state.events_for(&ego.id).next().is_some())
    }

    fn termination_reason(&self, state: &SimulationState) -> Option<TerminationReason> {
        let ego = state.ego()?;
        if let Some(kind) = ego.collision {
            return Some(collision_reason(kind));
        }
        // Collisions outrank leaving the road, which outranks the goal
        let mut reason = None;
        for event in state.events_for(&ego.id) {
            let candidate = match event {
                SimEvent::Collision { kind, .. } => collision_reason(*kind),
                SimEvent::LeftRoad { .. } => TerminationReason::LeftRoad,
                SimEvent::GoalReached { .. } => TerminationReason::GoalReached,
            };
            reason = match (reason, candidate) {
                (Some(r @ TerminationReason::Collision { .. }), _) => Some(r),
                (Some(TerminationReason::LeftRoad), TerminationReason::GoalReached) => {
                    Some(TerminationReason::LeftRoad)
                }
                (_, c) => Some(c),
            };
        }
        reason
    }

    fn extract_info(&self, state: &SimulationState) -> Result<InfoMap> {
        let mut info = InfoMap::new();
        info.insert("tick".into(), state.tick.into());
        info.insert("events".into(), state.events.len().into());
        if let Some(ego) = state.ego() {
            info.insert("ego_speed".into(), ego.speed.into());
            info.insert("on_road".into(), ego.lane.is_some().into());
            if let Some(lane) = &ego.lane {
                info.insert("lane".into(), lane.index.into());
                info.insert("ego_lateral_offset".into(), lane.lateral_offset.into());
            }
        }
        Ok(info)
    }
}

fn collision_reason(kind: CollisionKind) -> TerminationReason {
    match kind {
        CollisionKind::Sidewalk => TerminationReason::LeftRoad,
        kind => TerminationReason::Collision { kind },
    }
}
