//! Serde-backed configuration for agents, trainers and whole experiments.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::agent::{AgentKind, AgentSnapshot, AgentType, Hyperparameters};
use crate::environment::{EnvironmentSnapshot, GridWorld};
use crate::error::Result;
use crate::policy::PolicyKind;
use crate::replay_buffer::ReplayConfig;

/// Everything needed to build a fresh agent.
///
/// Variant fields that do not apply to `agent_type` are ignored; missing ones
/// take the variant's default.
///
/// ```
/// use gridmind::agent::{Agent, AgentType};
/// use gridmind::config::AgentConfig;
///
/// let agent = AgentConfig::new(AgentType::QLambda)
///     .with_gamma(0.95)
///     .with_lambda(0.8)
///     .with_seed(7)
///     .build();
/// assert_eq!(agent.agent_type(), AgentType::QLambda);
/// assert_eq!(agent.snapshot().lambda, Some(0.8));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    #[serde(flatten)]
    pub hyperparameters: Hyperparameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lambda: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planning_steps: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_learning_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_evaluation_iterations: Option<usize>,
    /// Seed for the agent's random source; entropy when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig::new(AgentType::QLearning)
    }
}

impl AgentConfig {
    pub fn new(agent_type: AgentType) -> Self {
        AgentConfig {
            agent_type,
            hyperparameters: Hyperparameters::default(),
            lambda: None,
            initial_value: None,
            planning_steps: None,
            actor_learning_rate: None,
            theta: None,
            max_iterations: None,
            max_evaluation_iterations: None,
            seed: None,
        }
    }

    pub fn with_hyperparameters(mut self, hyperparameters: Hyperparameters) -> Self {
        self.hyperparameters = hyperparameters;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.hyperparameters.epsilon = epsilon;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.hyperparameters.gamma = gamma;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.hyperparameters.learning_rate = learning_rate;
        self
    }

    pub fn with_epsilon_decay(mut self, decay: f64, min_epsilon: f64) -> Self {
        self.hyperparameters.epsilon_decay = decay;
        self.hyperparameters.min_epsilon = min_epsilon;
        self
    }

    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.hyperparameters.policy = policy;
        self
    }

    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = Some(lambda);
        self
    }

    pub fn with_initial_value(mut self, initial_value: f64) -> Self {
        self.initial_value = Some(initial_value);
        self
    }

    pub fn with_planning_steps(mut self, planning_steps: usize) -> Self {
        self.planning_steps = Some(planning_steps);
        self
    }

    pub fn with_actor_learning_rate(mut self, rate: f64) -> Self {
        self.actor_learning_rate = Some(rate);
        self
    }

    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = Some(theta);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Variant fields that are set and apply to `agent_type`, keyed the way
    /// [`Agent::update_field`](crate::agent::Agent::update_field) expects.
    /// `initialValue` only shapes fresh table rows and is left out.
    pub fn live_fields(&self) -> Vec<(&'static str, Value)> {
        let mut fields = Vec::new();
        let mut push = |key: &'static str, value: Option<Value>| {
            if let Some(value) = value {
                fields.push((key, value));
            }
        };
        match self.agent_type {
            AgentType::QLambda => push("lambda", self.lambda.map(Value::from)),
            AgentType::DynaQ => push("planningSteps", self.planning_steps.map(Value::from)),
            AgentType::ActorCritic => push("actorLearningRate", self.actor_learning_rate.map(Value::from)),
            AgentType::ValueIteration | AgentType::PolicyIteration => {
                push("theta", self.theta.map(Value::from));
                push("maxIterations", self.max_iterations.map(Value::from));
                if self.agent_type == AgentType::PolicyIteration {
                    push(
                        "maxEvaluationIterations",
                        self.max_evaluation_iterations.map(Value::from),
                    );
                }
            }
            _ => {}
        }
        fields
    }

    /// An empty snapshot of the configured agent.
    pub fn to_snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            agent_type: self.agent_type.name().to_string(),
            params: self.hyperparameters,
            lambda: self.lambda,
            initial_value: self.initial_value,
            planning_steps: self.planning_steps,
            actor_learning_rate: self.actor_learning_rate,
            theta: self.theta,
            max_iterations: self.max_iterations,
            max_evaluation_iterations: self.max_evaluation_iterations,
            ..Default::default()
        }
    }

    /// Build a fresh agent with empty tables.
    pub fn build(&self) -> AgentKind {
        AgentKind::from_snapshot(&self.to_snapshot(), self.rng())
    }
}

/// Trainer settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainerConfig {
    /// Delay between scheduled steps when hosted by a worker.
    pub interval_ms: u64,
    /// Experience replay; disabled when absent.
    pub replay: Option<ReplayConfig>,
    /// Roll over to a new episode after this many steps without reaching
    /// the goal.
    pub max_episode_steps: Option<usize>,
    /// Finished episodes kept in the metrics history.
    pub history_size: usize,
    /// Seed for the environment (and replay) random source.
    pub seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            interval_ms: 50,
            replay: None,
            max_episode_steps: Some(500),
            history_size: 1000,
            seed: None,
        }
    }
}

impl TrainerConfig {
    pub(crate) fn rng(&self, stream: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
            None => StdRng::from_entropy(),
        }
    }
}

/// A complete headless experiment: agent, environment and trainer settings,
/// plus how many episodes to run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperimentConfig {
    pub agent: AgentConfig,
    pub environment: EnvironmentSnapshot,
    pub trainer: TrainerConfig,
    pub episodes: usize,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            agent: AgentConfig::default(),
            environment: EnvironmentSnapshot::default(),
            trainer: TrainerConfig::default(),
            episodes: 200,
        }
    }
}

impl ExperimentConfig {
    /// Load configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load configuration from a JSON file, falling back to defaults if the
    /// file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            log::warn!("config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn build_environment(&self) -> GridWorld {
        GridWorld::from_snapshot(&self.environment, self.trainer.rng(0))
    }
}
