//! # Grid-world environments
//!
//! Every environment in this module is a square grid MDP with four moves. The
//! agent starts in the top-left cell and tries to reach a goal cell; walls
//! clamp movement, obstacle cells reject it.
//!
//! Two traits split the contract:
//!
//! - [`Environment`]: the sampled, stateful side used by the trainer
//!   (`reset` / `step` and the editing operations).
//! - [`MdpModel`]: the deterministic model side used by planning agents
//!   (state enumeration and one-step lookahead).
//!
//! [`GridWorld`] implements both. Scenario variants (windy columns, a moving
//! goal, bonus cells) are carried by [`Scenario`] and built from their
//! persisted form by [`Scenario::from_config`].

mod grid;
mod scenario;
mod snapshot;

pub use grid::{normalize_size, GridWorld, DEFAULT_SIZE, MAX_SIZE, MIN_SIZE};
pub use scenario::{
    GoalShift, MovingGoalConfig, RewardCell, RewardGridConfig, Scenario, WindColumn, WindOffset,
    WindyConfig,
};
pub use snapshot::EnvironmentSnapshot;

use serde::{Deserialize, Serialize};

use crate::types::{Action, State, StepOutcome};

/// Reward shaping constants shared by all grid scenarios.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RewardConfig {
    pub step_penalty: f64,
    pub obstacle_penalty: f64,
    pub goal_reward: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        RewardConfig {
            step_penalty: -0.01,
            obstacle_penalty: -0.5,
            goal_reward: 1.0,
        }
    }
}

impl RewardConfig {
    /// Replace non-finite fields with their defaults.
    pub fn normalized(self) -> Self {
        let defaults = RewardConfig::default();
        let pick = |value: f64, fallback: f64, name: &str| {
            if value.is_finite() {
                value
            } else {
                log::warn!("reward '{}' is not finite, using {}", name, fallback);
                fallback
            }
        };
        RewardConfig {
            step_penalty: pick(self.step_penalty, defaults.step_penalty, "stepPenalty"),
            obstacle_penalty: pick(self.obstacle_penalty, defaults.obstacle_penalty, "obstaclePenalty"),
            goal_reward: pick(self.goal_reward, defaults.goal_reward, "goalReward"),
        }
    }
}

/// Stateful environment driven by the trainer.
pub trait Environment: Send {
    /// Put the agent back on the start cell and return it.
    fn reset(&mut self) -> State;

    /// Apply an action to the current state.
    fn step(&mut self, action: Action) -> StepOutcome;

    /// Current agent position.
    fn state(&self) -> State;

    /// Side length of the grid.
    fn size(&self) -> usize;

    fn is_obstacle(&self, x: usize, y: usize) -> bool;

    /// Flip a cell between free and obstacle. Returns whether the grid changed.
    fn toggle_obstacle(&mut self, x: usize, y: usize) -> bool;

    fn reward_config(&self) -> RewardConfig;

    fn set_reward_config(&mut self, config: RewardConfig);

    /// Persisted form of the current configuration.
    fn snapshot(&self) -> EnvironmentSnapshot;

    /// Model view for planning agents, if this environment can provide one.
    fn model(&self) -> Option<&dyn MdpModel> {
        None
    }
}

/// Deterministic model of an environment, required by planning agents.
pub trait MdpModel {
    /// Every state an agent can occupy.
    fn enumerate_states(&self) -> Vec<State>;

    fn available_actions(&self) -> Vec<Action> {
        Action::ALL.to_vec()
    }

    /// One-step lookahead from `state`. Never samples and never mutates.
    fn transition(&self, state: State, action: Action) -> StepOutcome;

    fn is_terminal(&self, state: State) -> bool;
}
