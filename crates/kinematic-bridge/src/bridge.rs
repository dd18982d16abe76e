//! Simulation backend over the kinematic world

use crate::world::{PhysicsConfig, World};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sim_rl_core::{
    Action, ActionSpace, BackendManifest, Result, Scenario, SimError, SimulationConfig,
    SimulationFactory, SimulationInstance, SimulationState,
};
use tracing::{debug, info};

/// Configuration for the kinematic backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicConfig {
    pub physics: PhysicsConfig,
}

/// Factory creating one independent [`World`] per scenario
#[derive(Debug)]
pub struct KinematicFactory {
    config: KinematicConfig,
    /// Simulations created so far
    scenario_number: u64,
}

impl KinematicFactory {
    /// Create a factory with default vehicle physics
    pub fn new() -> Self {
        Self::with_config(KinematicConfig::default())
    }

    /// Create a factory with custom configuration
    pub fn with_config(config: KinematicConfig) -> Self {
        Self {
            config,
            scenario_number: 0,
        }
    }

    /// Number of simulations created by this factory
    pub fn scenarios_created(&self) -> u64 {
        self.scenario_number
    }
}

impl Default for KinematicFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SimulationFactory for KinematicFactory {
    fn manifest(&self) -> BackendManifest {
        BackendManifest {
            name: "kinematic".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            deterministic: true,
            supports_render: false,
        }
    }

    /// `[steering, throttle]`, both normalized to `[-1, 1]`
    fn action_space(&self) -> ActionSpace {
        ActionSpace::continuous(vec![-1.0, -1.0], vec![1.0, 1.0])
    }

    async fn create_simulation(
        &mut self,
        scenario: &Scenario,
        config: &SimulationConfig,
    ) -> Result<Box<dyn SimulationInstance>> {
        let world = World::spawn(scenario, &self.config.physics, config.timestep)?;
        self.scenario_number += 1;
        info!(
            "Created simulation #{} for scenario `{}` ({} objects, {} substeps per tick)",
            self.scenario_number,
            scenario.name,
            scenario.objects.len(),
            world.decision_repeat()
        );
        Ok(Box::new(KinematicSimulation {
            number: self.scenario_number,
            world: Some(world),
        }))
    }
}

/// A live kinematic simulation
///
/// After [`release`](SimulationInstance::release) the world is gone and
/// every further call fails.
#[derive(Debug)]
pub struct KinematicSimulation {
    number: u64,
    world: Option<World>,
}

impl KinematicSimulation {
    fn world(&self) -> Result<&World> {
        self.world
            .as_ref()
            .ok_or_else(|| SimError::Simulation(format!("simulation #{} was released", self.number)))
    }
}

#[async_trait]
impl SimulationInstance for KinematicSimulation {
    fn current_state(&self) -> Result<SimulationState> {
        Ok(self.world()?.snapshot())
    }

    async fn tick(&mut self, action: &Action) -> Result<SimulationState> {
        let controls = action.as_continuous().unwrap_or_default();
        let [steering, throttle] = controls[..] else {
            return Err(SimError::InvalidAction(format!(
                "expected [steering, throttle], got {:?}",
                action
            )));
        };
        let number = self.number;
        let world = self
            .world
            .as_mut()
            .ok_or_else(|| SimError::Simulation(format!("simulation #{} was released", number)))?;
        world.step(steering, throttle);
        Ok(world.snapshot())
    }

    async fn release(&mut self) -> Result<()> {
        if self.world.take().is_some() {
            debug!("Released simulation #{}", self.number);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_rl_core::{
        EnvConfig, FixedScenario, Goal, InfoValue, ObjectKind, RoadMap, SceneObject,
        ScenarioParameters, ScenarioQueue, TerminationReason,
    };
    use sim_rl_env::{LaneProgressReward, SimEnv};
    use tokio_test::{assert_err, assert_ok, block_on};

    fn highway(objects: Vec<SceneObject>) -> Scenario {
        Scenario {
            name: "highway".into(),
            description: None,
            objects,
            road: RoadMap::default(),
            goal: Some(Goal { x: 30.0 }),
            parameters: ScenarioParameters::new(),
        }
    }

    fn ego() -> SceneObject {
        SceneObject::new(ObjectKind::Car, [0.0, 5.25]).with_velocity([10.0, 0.0])
    }

    fn env(scenario: Scenario, config: EnvConfig) -> SimEnv {
        SimEnv::new(
            Box::new(FixedScenario(scenario)),
            Box::new(KinematicFactory::new()),
            Box::new(LaneProgressReward::default()),
            config,
        )
        .unwrap()
    }

    #[test]
    fn test_factory_manifest() {
        let factory = KinematicFactory::new();
        let manifest = factory.manifest();
        assert_eq!(manifest.name, "kinematic");
        assert!(manifest.deterministic);
        assert_eq!(factory.action_space().dim(), 2);
    }

    #[tokio::test]
    async fn test_create_counts_and_validates() {
        let mut factory = KinematicFactory::new();
        let config = SimulationConfig::default();

        assert_ok!(factory.create_simulation(&highway(vec![ego()]), &config).await);
        assert_eq!(factory.scenarios_created(), 1);

        let err = factory
            .create_simulation(&highway(vec![]), &config)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SimError::Scenario(_)));
        assert_eq!(factory.scenarios_created(), 1);
    }

    #[tokio::test]
    async fn test_tick_after_release_fails() {
        let mut factory = KinematicFactory::new();
        let mut sim = factory
            .create_simulation(&highway(vec![ego()]), &SimulationConfig::default())
            .await
            .unwrap();

        let state = sim.tick(&Action::Continuous(vec![0.0, 0.0])).await.unwrap();
        assert_eq!(state.tick, 1);
        assert_err!(sim.tick(&Action::Discrete(1)).await);

        assert_ok!(sim.release().await);
        assert_ok!(sim.release().await);
        assert_err!(sim.current_state());
        let err = sim.tick(&Action::Continuous(vec![0.0, 0.0])).await.unwrap_err();
        assert!(matches!(err, SimError::Simulation(_)));
    }

    #[tokio::test]
    async fn test_instances_are_independent() {
        let mut factory = KinematicFactory::new();
        let config = SimulationConfig::default();
        let scenario = highway(vec![ego()]);
        let mut a = factory.create_simulation(&scenario, &config).await.unwrap();
        let b = factory.create_simulation(&scenario, &config).await.unwrap();

        a.tick(&Action::Continuous(vec![0.0, 1.0])).await.unwrap();
        assert_eq!(a.current_state().unwrap().tick, 1);
        assert_eq!(b.current_state().unwrap().tick, 0);
    }

    #[test]
    fn test_episode_reaches_goal() {
        block_on(async {
            let mut env = env(highway(vec![ego()]), EnvConfig::default());
            assert_eq!(
                env.manifest().reward_components,
                vec!["progress", "speed", "terminal"]
            );
            let obs = env.reset().await.unwrap();
            assert_eq!(obs.ego().unwrap().position, [0.0, 5.25]);

            let mut total = 0.0;
            let result = loop {
                let result = env
                    .step(&Action::Continuous(vec![0.0, 0.5]))
                    .await
                    .unwrap();
                total += result.reward;
                if result.done() {
                    break result;
                }
            };
            assert!(result.terminated);
            assert!(!result.truncated);
            assert_eq!(
                result.info.termination_reason,
                Some(TerminationReason::GoalReached)
            );
            assert!(total > 10.0);
            assert_eq!(result.info.get("on_road"), Some(&InfoValue::Bool(true)));
            assert_eq!(result.info.get("lane"), Some(&InfoValue::Int(1)));
            env.close().await.unwrap();
        });
    }

    #[tokio::test]
    async fn test_episode_ends_in_crash() {
        let parked = SceneObject::new(ObjectKind::Car, [15.0, 5.25]);
        let mut env = env(highway(vec![ego(), parked]), EnvConfig::default());
        env.reset().await.unwrap();

        let result = loop {
            let result = env
                .step(&Action::Continuous(vec![0.0, 0.0]))
                .await
                .unwrap();
            if result.done() {
                break result;
            }
        };
        assert!(matches!(
            result.info.termination_reason,
            Some(TerminationReason::Collision { .. })
        ));
        assert!(result.reward_components["terminal"] < 0.0);
        assert_err!(env.step(&Action::Continuous(vec![0.0, 0.0])).await);
    }

    #[tokio::test]
    async fn test_step_limit_truncates() {
        let mut scenario = highway(vec![ego()]);
        scenario.goal = None;
        let mut env = env(scenario, EnvConfig::default().with_max_steps(5));
        env.reset().await.unwrap();

        for i in 1..=5 {
            let result = env
                .step(&Action::Continuous(vec![0.0, 0.0]))
                .await
                .unwrap();
            assert!(!result.terminated);
            assert_eq!(result.truncated, i == 5);
        }
    }

    #[tokio::test]
    async fn test_same_actions_same_hash() {
        let mut a = env(highway(vec![ego()]), EnvConfig::default());
        let mut b = env(highway(vec![ego()]), EnvConfig::default());
        a.reset().await.unwrap();
        b.reset().await.unwrap();
        for steer in [0.1, -0.2, 0.05] {
            a.step(&Action::Continuous(vec![steer, 0.3])).await.unwrap();
            b.step(&Action::Continuous(vec![steer, 0.3])).await.unwrap();
        }
        assert_eq!(a.state_hash().unwrap(), b.state_hash().unwrap());
    }

    #[tokio::test]
    async fn test_queue_feeds_episodes() {
        let mut first = highway(vec![ego()]);
        first.name = "first".into();
        let mut second = highway(vec![ego()]);
        second.name = "second".into();
        let mut env = SimEnv::new(
            Box::new(ScenarioQueue::new([first, second])),
            Box::new(KinematicFactory::new()),
            Box::new(LaneProgressReward::default()),
            EnvConfig::default(),
        )
        .unwrap();

        env.reset().await.unwrap();
        assert_eq!(env.scenario().unwrap().name, "first");
        env.reset().await.unwrap();
        assert_eq!(env.scenario().unwrap().name, "second");
        assert_err!(env.reset().await);
        assert!(!env.is_running());
    }
}
