//! Episode state tracking and truncation policies

use serde::{Deserialize, Serialize};
use sim_rl_core::TerminationReason;
use std::time::Duration;
use tokio::time::Instant;

/// Step counter and end-of-episode flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EpisodeState {
    pub step_count: u64,
    pub terminated: bool,
    pub truncated: bool,
}

impl EpisodeState {
    pub fn is_done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// What truncation policies get to look at after each tick
#[derive(Debug, Clone, Copy)]
pub struct EpisodeProgress {
    pub step_count: u64,
    /// Wall-clock time since reset
    pub elapsed: Duration,
    /// Simulated seconds since reset
    pub sim_time: f64,
}

/// Decides whether an external limit ends the episode
pub trait TruncationPolicy: Send + Sync {
    fn is_truncated(&self, progress: &EpisodeProgress) -> bool;

    /// Reported in the step info when this policy fires
    fn reason(&self) -> TerminationReason {
        TerminationReason::TimeLimit
    }
}

/// Truncate once `step_count >= max_steps`
#[derive(Debug, Clone, Copy)]
pub struct StepLimit(pub u64);

impl TruncationPolicy for StepLimit {
    fn is_truncated(&self, progress: &EpisodeProgress) -> bool {
        progress.step_count >= self.0
    }

    fn reason(&self) -> TerminationReason {
        TerminationReason::StepLimit
    }
}

/// Truncate once the episode has run for a wall-clock duration
#[derive(Debug, Clone, Copy)]
pub struct WallClockLimit(pub Duration);

impl TruncationPolicy for WallClockLimit {
    fn is_truncated(&self, progress: &EpisodeProgress) -> bool {
        progress.elapsed >= self.0
    }
}

/// Truncate once simulated time reaches a number of seconds
#[derive(Debug, Clone, Copy)]
pub struct SimTimeLimit(pub f64);

impl TruncationPolicy for SimTimeLimit {
    fn is_truncated(&self, progress: &EpisodeProgress) -> bool {
        progress.sim_time >= self.0
    }
}

/// Per-episode bookkeeping owned by the environment
///
/// Only the environment mutates it: `begin` on reset, `advance` and
/// `finish` inside step. Once a flag is set (or the episode failed) nothing
/// changes until the next `begin`.
pub struct EpisodeTracker {
    state: EpisodeState,
    failed: bool,
    episode: u64,
    episode_return: f64,
    started_at: Instant,
    policies: Vec<Box<dyn TruncationPolicy>>,
}

impl EpisodeTracker {
    /// Tracker with the mandatory step cap installed
    pub fn new(max_steps: u64) -> Self {
        Self {
            state: EpisodeState::default(),
            failed: false,
            episode: 0,
            episode_return: 0.0,
            started_at: Instant::now(),
            policies: vec![Box::new(StepLimit(max_steps))],
        }
    }

    /// Add a truncation policy next to the step cap
    pub fn add_policy(&mut self, policy: Box<dyn TruncationPolicy>) {
        self.policies.push(policy);
    }

    /// Start a new episode: `{0, false, false}`
    pub fn begin(&mut self) {
        self.state = EpisodeState::default();
        self.failed = false;
        self.episode += 1;
        self.episode_return = 0.0;
        self.started_at = Instant::now();
    }

    /// Count one tick and return the new step count
    pub fn advance(&mut self) -> u64 {
        debug_assert!(!self.is_over(), "advance on a finished episode");
        self.state.step_count += 1;
        self.state.step_count
    }

    /// First truncation policy that fires, if any
    pub fn truncation(&self, sim_time: f64) -> Option<TerminationReason> {
        let progress = EpisodeProgress {
            step_count: self.state.step_count,
            elapsed: self.started_at.elapsed(),
            sim_time,
        };
        self.policies
            .iter()
            .find(|p| p.is_truncated(&progress))
            .map(|p| p.reason())
    }

    /// Record the outcome of the current step
    pub fn finish(&mut self, reward: f64, terminated: bool, truncated: bool) {
        self.episode_return += reward;
        self.state.terminated = terminated;
        self.state.truncated = truncated;
    }

    /// Mark the episode unusable after an extraction or backend failure
    pub fn fail(&mut self) {
        self.failed = true;
    }

    /// Whether `step` must be refused until the next reset
    pub fn is_over(&self) -> bool {
        self.failed || self.state.is_done()
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn state(&self) -> EpisodeState {
        self.state
    }

    /// Episodes started so far
    pub fn episode(&self) -> u64 {
        self.episode
    }

    /// Sum of rewards in the current episode
    pub fn episode_return(&self) -> f64 {
        self.episode_return
    }
}
