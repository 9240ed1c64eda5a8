use rand::rngs::StdRng;
use serde_json::Value;

use super::{Agent, AgentSnapshot, AgentType, Hyperparameters, TabularBase};
use crate::error::Result;
use crate::policy::epsilon_greedy_probabilities;
use crate::types::{Action, State, Transition, ACTION_COUNT};

/// Expected SARSA: bootstraps from the expectation of `Q(next_state, .)` under
/// the epsilon-greedy distribution instead of a sampled next action.
#[derive(Clone, Debug)]
pub struct ExpectedSarsaAgent {
    base: TabularBase,
}

impl ExpectedSarsaAgent {
    pub fn new(params: Hyperparameters, rng: StdRng) -> Self {
        ExpectedSarsaAgent {
            base: TabularBase::new(params, 0.0, rng),
        }
    }

    pub fn restore(snapshot: &AgentSnapshot, rng: StdRng) -> Self {
        ExpectedSarsaAgent {
            base: TabularBase::restore(snapshot, 0.0, rng),
        }
    }

    pub fn base(&self) -> &TabularBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut TabularBase {
        &mut self.base
    }
}

impl Agent for ExpectedSarsaAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::ExpectedSarsa
    }

    fn act(&mut self, state: State, update: bool) -> Action {
        self.base.act(state, update)
    }

    fn learn(&mut self, t: &Transition, weight: f64) {
        let target = if t.done {
            t.reward
        } else {
            let next = self.base.q.get(t.next_state);
            let probs = epsilon_greedy_probabilities(&next, self.base.params.epsilon);
            let expected: f64 = probs.iter().zip(next.iter()).map(|(p, q)| p * q).sum();
            t.reward + self.base.params.gamma * expected
        };
        self.base.update_toward(t.state, t.action, target, weight);
        self.base.decay_epsilon();
    }

    fn reset(&mut self) {
        self.base.reset();
    }

    fn action_values(&mut self, state: State) -> [f64; ACTION_COUNT] {
        self.base.q.get(state)
    }

    fn exploration_rate(&self) -> f64 {
        self.base.params.epsilon
    }

    fn update_field(&mut self, key: &str, value: &Value) -> Result<()> {
        self.base.params.apply(key, value)
    }

    fn snapshot(&self) -> AgentSnapshot {
        self.base.snapshot(AgentType::ExpectedSarsa)
    }
}
