//! sim-rl rollout runner
//!
//! Runs episodes of the kinematic traffic backend through `SimEnv` with a
//! lane-keeping controller:
//!
//! ```text
//! sim-rl [config.json] [scenarios.json]
//! ```
//!
//! Without a scenario file a built-in highway scene is used.

use anyhow::{Context, Result};
use kinematic_bridge::{KinematicConfig, KinematicFactory};
use serde::Deserialize;
use sim_rl_core::{
    Action, EnvConfig, Goal, ObjectKind, RoadMap, SceneObject, Scenario, ScenarioCatalog,
    ScenarioParameters, SimulationState,
};
use sim_rl_env::{LaneProgressReward, SimEnv};
use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Rollout settings on top of the environment configuration
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RunConfig {
    #[serde(flatten)]
    env: EnvConfig,
    episodes: u32,
    /// Cruise speed for the controller, m/s
    target_speed: f64,
    kinematic: KinematicConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            env: EnvConfig::default(),
            episodes: 3,
            target_speed: 12.0,
            kinematic: KinematicConfig::default(),
        }
    }
}

impl RunConfig {
    fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: RunConfig = serde_json::from_str(&json)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.env.validate()?;
        Ok(config)
    }
}

/// Three-lane highway with slower traffic ahead
fn highway() -> Scenario {
    Scenario {
        name: "highway".into(),
        description: Some("Ego in the middle lane behind mixed traffic".into()),
        objects: vec![
            SceneObject::new(ObjectKind::Car, [5.0, 5.25])
                .with_name("ego")
                .with_velocity([8.0, 0.0]),
            SceneObject::new(ObjectKind::Car, [40.0, 1.75]).with_velocity([9.0, 0.0]),
            SceneObject::new(ObjectKind::Car, [25.0, 8.75]).with_velocity([11.0, 0.0]),
            SceneObject::new(ObjectKind::Car, [90.0, 5.25]).with_velocity([14.0, 0.0]),
        ],
        road: RoadMap::default(),
        goal: Some(Goal { x: 200.0 }),
        parameters: ScenarioParameters::new(),
    }
}

/// Proportional lane keeping and cruise control
fn lane_keeping(state: &SimulationState, target_speed: f64) -> Action {
    let Some(ego) = state.ego() else {
        return Action::Continuous(vec![0.0, 0.0]);
    };
    let offset = ego.lane.as_ref().map_or(0.0, |lane| lane.lateral_offset);
    let steering = (-0.3 * offset - 1.5 * ego.heading).clamp(-1.0, 1.0);
    let throttle = (0.25 * (target_speed - ego.speed)).clamp(-1.0, 1.0);
    Action::Continuous(vec![steering, throttle])
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => RunConfig::load(Path::new(&path))?,
        None => RunConfig::default(),
    };
    let catalog = match args.next() {
        Some(path) => ScenarioCatalog::from_json_file(&path)
            .with_context(|| format!("loading scenarios from {}", path))?,
        None => ScenarioCatalog::new(vec![highway()])?,
    };
    info!(
        "sim-rl starting: {} episodes over scenarios [{}]",
        config.episodes,
        catalog.names().collect::<Vec<_>>().join(", ")
    );

    let mut env = SimEnv::new(
        Box::new(catalog),
        Box::new(KinematicFactory::with_config(config.kinematic.clone())),
        Box::new(LaneProgressReward::default()),
        config.env.clone(),
    )?;
    let manifest = env.manifest();
    info!(
        "Backend {} v{} (deterministic: {}), action space {:?}, reward terms [{}]",
        manifest.backend.name,
        manifest.backend.version,
        manifest.backend.deterministic,
        manifest.action_space,
        manifest.reward_components.join(", ")
    );

    for episode in 1..=config.episodes {
        env.reset().await?;
        let scenario = env.scenario().map(|s| s.name.clone()).unwrap_or_default();

        loop {
            let action = match env.last_state() {
                Some(state) => lane_keeping(state, config.target_speed),
                None => Action::Continuous(vec![0.0, 0.0]),
            };
            let result = env.step(&action).await?;
            debug!(
                "episode {} step {}: reward {:.3}",
                episode, result.info.step_count, result.reward
            );
            if result.done() {
                info!(
                    "Episode {} ({}) finished after {} steps: return {:.2}, reason {:?}, truncated {}",
                    episode,
                    scenario,
                    result.info.step_count,
                    result.info.episode_return.unwrap_or_default(),
                    result.info.termination_reason,
                    result.truncated
                );
                break;
            }
        }
    }

    env.close().await?;
    info!("sim-rl finished");
    Ok(())
}
