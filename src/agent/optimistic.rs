use rand::rngs::StdRng;
use serde_json::Value;

use super::{Agent, AgentSnapshot, AgentType, Hyperparameters, QLearningAgent};
use crate::error::Result;
use crate::types::{Action, State, Transition, ACTION_COUNT};

pub const DEFAULT_INITIAL_VALUE: f64 = 1.0;

/// Q-learning whose unseen Q-values start at an optimistic `initial_value`,
/// so untried actions look attractive until experience says otherwise.
#[derive(Clone, Debug)]
pub struct OptimisticAgent {
    inner: QLearningAgent,
    initial_value: f64,
}

impl OptimisticAgent {
    pub fn new(params: Hyperparameters, initial_value: f64, rng: StdRng) -> Self {
        OptimisticAgent {
            inner: QLearningAgent::with_initial_value(params, initial_value, rng),
            initial_value,
        }
    }

    pub fn restore(snapshot: &AgentSnapshot, rng: StdRng) -> Self {
        let initial_value = snapshot.initial_value.unwrap_or(DEFAULT_INITIAL_VALUE);
        OptimisticAgent {
            inner: QLearningAgent::restore_with_initial_value(snapshot, initial_value, rng),
            initial_value,
        }
    }

    pub fn initial_value(&self) -> f64 {
        self.initial_value
    }

    pub fn inner(&self) -> &QLearningAgent {
        &self.inner
    }
}

impl Agent for OptimisticAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::Optimistic
    }

    fn act(&mut self, state: State, update: bool) -> Action {
        self.inner.act(state, update)
    }

    fn learn(&mut self, transition: &Transition, weight: f64) {
        self.inner.learn(transition, weight);
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn action_values(&mut self, state: State) -> [f64; ACTION_COUNT] {
        self.inner.action_values(state)
    }

    fn exploration_rate(&self) -> f64 {
        self.inner.exploration_rate()
    }

    // initialValue is fixed at construction
    fn update_field(&mut self, key: &str, value: &Value) -> Result<()> {
        self.inner.update_field(key, value)
    }

    fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            initial_value: Some(self.initial_value),
            ..self.inner.base().snapshot(AgentType::Optimistic)
        }
    }
}
