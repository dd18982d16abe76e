//! The reset / step / close environment adapter

use sha2::{Digest, Sha256};
use sim_rl_core::scenario::{SCENARIO_KEY, SEED_KEY};
use sim_rl_core::{
    Action, ActionPolicy, ActionSpace, EnvConfig, EnvManifest, Info, InfoMap, Observation,
    ObservationSpace, Result, Reward, RewardFunction, Scenario, ScenarioParameters,
    ScenarioSource, SimError, SimulationFactory, SimulationInstance, SimulationState, StepResult,
};
use std::borrow::Cow;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::episode::{EpisodeState, EpisodeTracker, TruncationPolicy};
use crate::extractor::{Extractor, SnapshotExtractor};
use crate::render::{LogRenderer, Renderer};

/// Per-reset overrides
#[derive(Debug, Clone, Default)]
pub struct ResetOptions {
    /// Forwarded to the scenario source (`seed`) and the backend
    pub seed: Option<u64>,
    /// Scenario name, forwarded as the `scenario` parameter
    pub scenario: Option<String>,
    /// Merged over the configured `scenario_parameters`
    pub parameters: ScenarioParameters,
}

impl ResetOptions {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_scenario(mut self, name: impl Into<String>) -> Self {
        self.scenario = Some(name.into());
        self
    }
}

/// Everything that lives exactly as long as one episode
struct LiveEpisode {
    scenario: Scenario,
    simulation: Box<dyn SimulationInstance>,
    state: SimulationState,
}

/// Reinforcement-learning environment over a pluggable simulation backend
///
/// One action in, one tick out. The adapter owns at most one simulation
/// instance at a time; `reset` replaces it and `close` releases it. Call
/// `close` before dropping a live environment so the backend can free its
/// world state.
pub struct SimEnv {
    scenario_source: Box<dyn ScenarioSource>,
    factory: Box<dyn SimulationFactory>,
    reward_fn: Box<dyn RewardFunction>,
    extractor: Box<dyn Extractor>,
    renderer: Option<Box<dyn Renderer>>,
    config: EnvConfig,
    action_space: ActionSpace,
    observation_space: ObservationSpace,
    tracker: EpisodeTracker,
    live: Option<LiveEpisode>,
}

impl SimEnv {
    /// Store the collaborators; no simulation is created until `reset`
    ///
    /// The step cap is `config.max_steps`. Invalid configuration or
    /// malformed spaces fail with `SimError::Configuration`.
    pub fn new(
        scenario_source: Box<dyn ScenarioSource>,
        factory: Box<dyn SimulationFactory>,
        reward_fn: Box<dyn RewardFunction>,
        config: EnvConfig,
    ) -> Result<Self> {
        config.validate()?;

        let action_space = factory.action_space();
        action_space.check()?;

        let extractor = SnapshotExtractor::new(config.max_agents);
        let observation_space = extractor.observation_space();
        observation_space.check()?;

        let renderer: Option<Box<dyn Renderer>> = if config.render {
            Some(Box::new(LogRenderer::default()))
        } else {
            None
        };

        let backend = factory.manifest();
        info!(
            "Environment created for {} v{} (max_steps={}, timestep={}s)",
            backend.name, backend.version, config.max_steps, config.timestep
        );

        Ok(Self {
            scenario_source,
            factory,
            reward_fn,
            extractor: Box::new(extractor),
            renderer,
            tracker: EpisodeTracker::new(config.max_steps),
            config,
            action_space,
            observation_space,
            live: None,
        })
    }

    /// Replace the default [`SnapshotExtractor`]
    pub fn with_extractor(mut self, extractor: Box<dyn Extractor>) -> Result<Self> {
        let observation_space = extractor.observation_space();
        observation_space.check()?;
        self.extractor = extractor;
        self.observation_space = observation_space;
        Ok(self)
    }

    /// Attach a renderer (installed regardless of `config.render`)
    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Truncate on an additional limit next to `max_steps`
    pub fn with_truncation_policy(mut self, policy: Box<dyn TruncationPolicy>) -> Self {
        self.tracker.add_policy(policy);
        self
    }

    pub fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }

    pub fn observation_space(&self) -> &ObservationSpace {
        &self.observation_space
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Current episode counters and flags
    pub fn episode_state(&self) -> EpisodeState {
        self.tracker.state()
    }

    /// Whether `step` would currently be accepted
    pub fn is_running(&self) -> bool {
        self.live.is_some() && !self.tracker.is_over()
    }

    /// Scenario of the live episode
    pub fn scenario(&self) -> Option<&Scenario> {
        self.live.as_ref().map(|live| &live.scenario)
    }

    /// Last state reported by the backend
    pub fn last_state(&self) -> Option<&SimulationState> {
        self.live.as_ref().map(|live| &live.state)
    }

    pub fn manifest(&self) -> EnvManifest {
        EnvManifest {
            sim_rl_version: env!("CARGO_PKG_VERSION").into(),
            backend: self.factory.manifest(),
            action_space: self.action_space.clone(),
            observation_space: self.observation_space.clone(),
            action_policy: self.config.action_policy,
            max_steps: self.config.max_steps,
            timestep: self.config.timestep,
            reward_components: self.reward_fn.components(),
        }
    }

    /// Start a new episode with the configured scenario parameters
    pub async fn reset(&mut self) -> Result<Observation> {
        self.reset_with(ResetOptions::default()).await
    }

    /// Start a new episode and return its first observation
    ///
    /// Any previous simulation is released first, even if producing the
    /// new scenario fails afterwards.
    pub async fn reset_with(&mut self, options: ResetOptions) -> Result<Observation> {
        self.release_live().await?;

        let mut parameters = self.config.scenario_parameters.clone();
        parameters.extend(options.parameters);
        if let Some(seed) = options.seed {
            parameters.insert(SEED_KEY.into(), seed.into());
        }
        if let Some(name) = options.scenario {
            parameters.insert(SCENARIO_KEY.into(), name.into());
        }

        let scenario = self.scenario_source.produce_scenario(&parameters)?;
        scenario.check()?;

        let sim_config = self.config.simulation_config(options.seed);
        let mut simulation = self.factory.create_simulation(&scenario, &sim_config).await?;
        let state = match simulation.current_state() {
            Ok(state) => state,
            Err(e) => {
                if let Err(release_err) = simulation.release().await {
                    warn!("Failed to release simulation after bad start: {}", release_err);
                }
                return Err(e);
            }
        };

        self.tracker.begin();
        info!(
            "Episode {} started with scenario `{}` ({} objects)",
            self.tracker.episode(),
            scenario.name,
            scenario.objects.len()
        );
        let live = self.live.insert(LiveEpisode {
            scenario,
            simulation,
            state,
        });

        let observation = match self.extractor.extract_observation(&live.state) {
            Ok(observation) => observation,
            Err(e) => {
                self.tracker.fail();
                return Err(e);
            }
        };
        if let Some(renderer) = self.renderer.as_mut() {
            if let Err(e) = renderer.render(&live.state) {
                self.tracker.fail();
                return Err(e);
            }
        }
        Ok(observation)
    }

    /// Apply `action`, advance one tick and report the outcome
    pub async fn step(&mut self, action: &Action) -> Result<StepResult> {
        let Some(live) = self.live.as_mut() else {
            return Err(SimError::invalid_state(
                "step",
                "no live episode, call reset first",
            ));
        };
        if self.tracker.failed() {
            return Err(SimError::invalid_state(
                "step",
                "episode failed, call reset before stepping again",
            ));
        }
        if self.tracker.is_over() {
            return Err(SimError::invalid_state(
                "step",
                "episode is over, call reset before stepping again",
            ));
        }

        let action = match self.config.action_policy {
            ActionPolicy::Strict => {
                self.action_space.validate(action)?;
                Cow::Borrowed(action)
            }
            ActionPolicy::Clamp => {
                let clamped = self.action_space.clamp(action.clone())?;
                if clamped != *action {
                    warn!("Clamped action {:?} to {:?}", action, clamped);
                }
                Cow::Owned(clamped)
            }
        };

        let started = Instant::now();
        let state = match live.simulation.tick(&action).await {
            Ok(state) => state,
            Err(e) => {
                self.tracker.fail();
                return Err(e);
            }
        };
        let step_count = self.tracker.advance();
        live.state = state;

        if let Some(renderer) = self.renderer.as_mut() {
            if let Err(e) = renderer.render(&live.state) {
                self.tracker.fail();
                return Err(e);
            }
        }
        if self.config.real_time {
            tokio::time::sleep_until(started + Duration::from_secs_f64(self.config.timestep))
                .await;
        }

        let evaluated = evaluate(
            self.extractor.as_ref(),
            self.reward_fn.as_ref(),
            &live.state,
            &action,
        );
        let (observation, terminated, reward, extra) = match evaluated {
            Ok(values) => values,
            Err(e) => {
                self.tracker.fail();
                return Err(e);
            }
        };

        let truncation = self.tracker.truncation(live.state.time);
        let truncated = truncation.is_some();
        self.tracker.finish(reward.value, terminated, truncated);

        let done = terminated || truncated;
        let termination_reason = if terminated {
            self.extractor.termination_reason(&live.state).or(truncation)
        } else {
            truncation
        };
        let info = Info {
            episode: self.tracker.episode(),
            step_count,
            sim_time: live.state.time,
            termination_reason,
            episode_return: done.then(|| self.tracker.episode_return()),
            extra,
        };

        debug!(
            "step {} reward={:.3} terminated={} truncated={}",
            step_count, reward.value, terminated, truncated
        );
        if done {
            info!(
                "Episode {} ended after {} steps (return {:.3}, reason {:?})",
                info.episode,
                step_count,
                self.tracker.episode_return(),
                info.termination_reason
            );
        }

        Ok(StepResult {
            observation,
            reward: reward.value,
            reward_components: reward.components,
            terminated,
            truncated,
            info,
        })
    }

    /// Release the simulation and any renderer
    ///
    /// Safe to call repeatedly and without a prior reset. The renderer is
    /// closed even when releasing the simulation fails; the first error wins.
    pub async fn close(&mut self) -> Result<()> {
        let released = self.release_live().await;
        let closed = match self.renderer.as_mut() {
            Some(renderer) => renderer.close(),
            None => Ok(()),
        };
        released.and(closed)
    }

    /// SHA-256 of the last simulation state, hex encoded
    ///
    /// Equal hashes across runs mean the backend reproduced the trajectory.
    pub fn state_hash(&self) -> Result<String> {
        let live = self
            .live
            .as_ref()
            .ok_or_else(|| SimError::invalid_state("state_hash", "no live episode"))?;
        let bytes = serde_json::to_vec(&live.state)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    async fn release_live(&mut self) -> Result<()> {
        if let Some(mut live) = self.live.take() {
            debug!("Releasing simulation for scenario `{}`", live.scenario.name);
            live.simulation.release().await?;
        }
        Ok(())
    }
}

/// Observation, termination, reward and info for a post-tick state
fn evaluate(
    extractor: &dyn Extractor,
    reward_fn: &dyn RewardFunction,
    state: &SimulationState,
    action: &Action,
) -> Result<(Observation, bool, Reward, InfoMap)> {
    let observation = extractor.extract_observation(state)?;
    let terminated = extractor.extract_termination(state)?;
    let reward = reward_fn.compute(state, action)?;
    let extra = extractor.extract_info(state)?;
    Ok((observation, terminated, reward, extra))
}
