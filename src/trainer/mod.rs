//! Drives one agent against one environment.
//!
//! [`Trainer`] owns the agent, the environment, an optional replay buffer
//! and the metrics, and exposes a step-at-a-time API with an
//! `Idle -> Running -> Paused -> Running -> Idle` lifecycle. The trainer
//! never schedules itself: a caller either drives it synchronously with
//! [`Trainer::run_steps`] / [`Trainer::run_episodes`] or hands it to a
//! [`worker::TrainerWorker`], which steps it on a background thread every
//! [`Trainer::interval`].

pub mod worker;

pub use worker::{TrainerCommand, TrainerEvent, TrainerWorker};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::agent::{Agent, AgentSnapshot, Hyperparameters};
use crate::config::{ExperimentConfig, TrainerConfig};
use crate::environment::{Environment, EnvironmentSnapshot, RewardConfig};
use crate::error::Result;
use crate::metrics::{Metrics, MetricsTracker};
use crate::replay_buffer::{ExperienceReplay, SampleStrategy, PRIORITY_EPSILON};
use crate::types::{State, Transition};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrainerStatus {
    Idle,
    Running,
    Paused,
}

/// Emitted after every step, and again with the fresh start state when an
/// episode rolls over or the trainer is reset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub state: State,
    pub reward: f64,
    pub done: bool,
    pub metrics: Metrics,
}

pub type ProgressCallback = Box<dyn FnMut(&Progress) + Send>;

pub struct Trainer {
    agent: Box<dyn Agent>,
    env: Box<dyn Environment>,
    replay: Option<ExperienceReplay>,
    replay_samples: usize,
    replay_strategy: SampleStrategy,
    metrics: MetricsTracker,
    state: Option<State>,
    status: TrainerStatus,
    interval: Duration,
    max_episode_steps: Option<usize>,
    on_progress: Option<ProgressCallback>,
}

impl Trainer {
    /// Planning agents are handed the environment's model immediately.
    pub fn new(agent: Box<dyn Agent>, env: Box<dyn Environment>, config: &TrainerConfig) -> Self {
        let replay = config
            .replay
            .as_ref()
            .map(|replay| ExperienceReplay::from_config(replay, config.rng(1)));
        let mut trainer = Trainer {
            metrics: MetricsTracker::new(config.history_size),
            replay_samples: config.replay.map_or(0, |r| r.samples),
            replay_strategy: config.replay.map_or(SampleStrategy::Uniform, |r| r.strategy),
            agent,
            env,
            replay,
            state: None,
            status: TrainerStatus::Idle,
            interval: Duration::from_millis(config.interval_ms),
            max_episode_steps: config.max_episode_steps.filter(|&n| n > 0),
            on_progress: None,
        };
        trainer.metrics.reset(trainer.agent.exploration_rate());
        trainer.replan();
        trainer
    }

    /// Build agent, environment and trainer from an experiment description.
    pub fn from_experiment(config: &ExperimentConfig) -> Self {
        let agent = config.agent.build();
        let env = config.build_environment();
        Trainer::new(Box::new(agent), Box::new(env), &config.trainer)
    }

    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.on_progress = Some(callback);
    }

    fn emit(&mut self, progress: Progress) {
        if let Some(callback) = self.on_progress.as_mut() {
            callback(&progress);
        }
    }

    fn replan(&mut self) {
        if let Some(model) = self.env.model() {
            self.agent.attach_model(model);
        }
    }

    pub fn start(&mut self) {
        if self.state.is_none() {
            self.state = Some(self.env.reset());
        }
        if self.status != TrainerStatus::Running {
            log::info!("trainer started ({} agent)", self.agent.agent_type());
        }
        self.status = TrainerStatus::Running;
    }

    pub fn pause(&mut self) {
        if self.status == TrainerStatus::Running {
            log::info!("trainer paused at episode {}", self.metrics.current().episode);
            self.status = TrainerStatus::Paused;
        }
    }

    /// Pause, forget everything learned, and put the agent back on the
    /// start cell.
    pub fn reset(&mut self) -> Progress {
        self.status = TrainerStatus::Idle;
        self.agent.reset();
        if let Some(replay) = self.replay.as_mut() {
            replay.clear();
        }
        self.metrics.reset(self.agent.exploration_rate());
        let state = self.env.reset();
        self.state = Some(state);
        self.replan();
        log::info!("trainer reset");

        let progress = Progress {
            state,
            reward: 0.0,
            done: false,
            metrics: self.metrics.current(),
        };
        self.emit(progress);
        progress
    }

    /// One act / step / learn cycle. Returns the progress of the step itself;
    /// the rollover event (if any) only goes to the callback.
    pub fn step(&mut self) -> Progress {
        let state = match self.state {
            Some(state) => state,
            None => self.env.reset(),
        };
        let action = self.agent.act(state, true);
        let outcome = self.env.step(action);
        let transition = Transition::new(state, action, outcome.reward, outcome.state, outcome.done);
        self.agent.learn(&transition, 1.0);

        if let Some(replay) = self.replay.as_mut() {
            replay.add(transition, transition.reward.abs() + PRIORITY_EPSILON);
            if self.agent.supports_replay() {
                for sample in replay.sample(self.replay_samples, self.replay_strategy) {
                    self.agent.learn(&sample.transition, sample.weight);
                }
            }
        }

        self.metrics.record_step(outcome.reward, self.agent.exploration_rate());
        let progress = Progress {
            state: outcome.state,
            reward: outcome.reward,
            done: outcome.done,
            metrics: self.metrics.current(),
        };
        self.emit(progress);

        let truncated = !outcome.done
            && self
                .max_episode_steps
                .map_or(false, |max| self.metrics.current().steps >= max);
        if outcome.done || truncated {
            if truncated {
                self.agent.end_episode();
            }
            self.metrics.next_episode();
            let fresh = self.env.reset();
            self.state = Some(fresh);
            // moving goals change the model between episodes
            self.replan();
            let rollover = Progress {
                state: fresh,
                reward: 0.0,
                done: false,
                metrics: self.metrics.current(),
            };
            self.emit(rollover);
        } else {
            self.state = Some(outcome.state);
        }
        progress
    }

    /// Run `steps` steps synchronously. Returns how many episodes finished.
    pub fn run_steps(&mut self, steps: usize) -> usize {
        let before = self.metrics.current().episode;
        for _ in 0..steps {
            self.step();
        }
        self.metrics.current().episode - before
    }

    /// Run until `episodes` more episodes have finished or `step_cap` steps
    /// were taken. Returns the number of finished episodes.
    pub fn run_episodes(&mut self, episodes: usize, step_cap: usize) -> usize {
        let target = self.metrics.current().episode + episodes;
        let mut steps = 0;
        while self.metrics.current().episode < target && steps < step_cap {
            self.step();
            steps += 1;
        }
        episodes - (target - self.metrics.current().episode)
    }

    /// Toggle an obstacle and re-plan. Returns whether the grid changed.
    pub fn toggle_obstacle(&mut self, x: usize, y: usize) -> bool {
        let changed = self.env.toggle_obstacle(x, y);
        if changed {
            self.replan();
        }
        changed
    }

    pub fn set_reward_config(&mut self, rewards: RewardConfig) {
        self.env.set_reward_config(rewards);
        self.replan();
    }

    pub fn set_interval_ms(&mut self, ms: u64) {
        self.interval = Duration::from_millis(ms);
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_max_episode_steps(&mut self, max: Option<usize>) {
        self.max_episode_steps = max.filter(|&n| n > 0);
    }

    pub fn update_agent_field(&mut self, key: &str, value: &Value) -> Result<()> {
        self.agent.update_field(key, value)
    }

    /// Patch every hyperparameter of the live agent in place.
    pub fn patch_hyperparameters(&mut self, params: &Hyperparameters) -> Result<()> {
        if let Value::Object(fields) = serde_json::to_value(params)? {
            // the floor goes first so a lower epsilon is not clamped to the old one
            let floor = fields.iter().filter(|(key, _)| key.as_str() == "minEpsilon");
            let rest = fields.iter().filter(|(key, _)| key.as_str() != "minEpsilon");
            for (key, value) in floor.chain(rest) {
                self.agent.update_field(key, value)?;
            }
        }
        Ok(())
    }

    /// Swap in a new agent and environment, keeping the run/pause status.
    /// Metrics restart and the new environment starts from its start cell.
    pub fn replace(&mut self, agent: Box<dyn Agent>, env: Box<dyn Environment>) {
        self.agent = agent;
        self.env = env;
        if let Some(replay) = self.replay.as_mut() {
            replay.clear();
        }
        self.metrics.reset(self.agent.exploration_rate());
        self.state = Some(self.env.reset());
        self.replan();
        log::info!(
            "trainer reconfigured: {} agent on a {}x{} grid",
            self.agent.agent_type(),
            self.env.size(),
            self.env.size()
        );
    }

    pub fn status(&self) -> TrainerStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == TrainerStatus::Running
    }

    pub fn state(&self) -> Option<State> {
        self.state
    }

    pub fn metrics(&self) -> &MetricsTracker {
        &self.metrics
    }

    pub fn agent(&self) -> &dyn Agent {
        self.agent.as_ref()
    }

    pub fn agent_mut(&mut self) -> &mut dyn Agent {
        self.agent.as_mut()
    }

    pub fn environment(&self) -> &dyn Environment {
        self.env.as_ref()
    }

    pub fn replay(&self) -> Option<&ExperienceReplay> {
        self.replay.as_ref()
    }

    pub fn agent_snapshot(&self) -> AgentSnapshot {
        self.agent.snapshot()
    }

    pub fn environment_snapshot(&self) -> EnvironmentSnapshot {
        self.env.snapshot()
    }
}
