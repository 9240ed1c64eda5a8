use rand::rngs::StdRng;
use serde_json::Value;

use super::{Agent, AgentSnapshot, AgentType, Hyperparameters, TabularBase};
use crate::error::Result;
use crate::types::{max_value, Action, State, Transition, ACTION_COUNT};

/// One-step off-policy Q-learning.
///
/// Target: `reward + gamma * max_a Q(next_state, a)`, or just `reward` when the
/// transition is terminal.
///
/// # Example
///
/// ```
/// use gridmind::agent::{Agent, Hyperparameters, QLearningAgent};
/// use gridmind::types::{Action, State, Transition};
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let params = Hyperparameters { epsilon: 0.0, learning_rate: 0.5, ..Default::default() };
/// let mut agent = QLearningAgent::new(params, StdRng::seed_from_u64(0));
/// let s = State::new(0, 0);
/// agent.learn(&Transition::new(s, Action::Right, 1.0, State::new(1, 0), true), 1.0);
/// assert_eq!(agent.act(s, false), Action::Right);
/// ```
#[derive(Clone, Debug)]
pub struct QLearningAgent {
    base: TabularBase,
}

impl QLearningAgent {
    pub fn new(params: Hyperparameters, rng: StdRng) -> Self {
        Self::with_initial_value(params, 0.0, rng)
    }

    /// Q-learning whose fresh Q-vectors start at `initial_value`.
    pub(crate) fn with_initial_value(params: Hyperparameters, initial_value: f64, rng: StdRng) -> Self {
        QLearningAgent {
            base: TabularBase::new(params, initial_value, rng),
        }
    }

    pub(crate) fn restore_with_initial_value(snapshot: &AgentSnapshot, initial_value: f64, rng: StdRng) -> Self {
        QLearningAgent {
            base: TabularBase::restore(snapshot, initial_value, rng),
        }
    }

    pub fn restore(snapshot: &AgentSnapshot, rng: StdRng) -> Self {
        Self::restore_with_initial_value(snapshot, 0.0, rng)
    }

    pub fn base(&self) -> &TabularBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut TabularBase {
        &mut self.base
    }
}

/// The Q-learning update shared with Dyna-Q's planning sweeps.
pub(crate) fn q_learning_update(base: &mut TabularBase, transition: &Transition, weight: f64) {
    let target = if transition.done {
        transition.reward
    } else {
        let next = base.q.get(transition.next_state);
        transition.reward + base.params.gamma * max_value(&next)
    };
    base.update_toward(transition.state, transition.action, target, weight);
}

impl Agent for QLearningAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::QLearning
    }

    fn act(&mut self, state: State, update: bool) -> Action {
        self.base.act(state, update)
    }

    fn learn(&mut self, transition: &Transition, weight: f64) {
        q_learning_update(&mut self.base, transition, weight);
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
        self.base.snapshot(AgentType::QLearning)
    }
}
