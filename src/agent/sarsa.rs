use rand::rngs::StdRng;
use serde_json::Value;

use super::{Agent, AgentSnapshot, AgentType, Hyperparameters, TabularBase};
use crate::error::Result;
use crate::types::{Action, State, Transition, ACTION_COUNT};

/// On-policy SARSA.
///
/// The bootstrap action `a'` is chosen at `next_state` by the agent's own
/// policy (as an evaluation-only query), so exploration shows up in the
/// target.
#[derive(Clone, Debug)]
pub struct SarsaAgent {
    base: TabularBase,
}

impl SarsaAgent {
    pub fn new(params: Hyperparameters, rng: StdRng) -> Self {
        SarsaAgent {
            base: TabularBase::new(params, 0.0, rng),
        }
    }

    pub fn restore(snapshot: &AgentSnapshot, rng: StdRng) -> Self {
        SarsaAgent {
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

impl Agent for SarsaAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::Sarsa
    }

    fn act(&mut self, state: State, update: bool) -> Action {
        self.base.act(state, update)
    }

    fn learn(&mut self, t: &Transition, weight: f64) {
        let target = if t.done {
            t.reward
        } else {
            let next_action = self.base.act(t.next_state, false);
            let next = self.base.q.get(t.next_state);
            t.reward + self.base.params.gamma * next[next_action.index()]
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
        self.base.snapshot(AgentType::Sarsa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_closed_form_update() {
        let params = Hyperparameters {
            epsilon: 0.0,
            min_epsilon: 0.0,
            learning_rate: 0.5,
            gamma: 0.9,
            ..Default::default()
        };
        let mut agent = SarsaAgent::new(params, StdRng::seed_from_u64(0));
        let s = State::new(0, 0);
        let next = State::new(0, 1);
        *agent.base_mut().q.get_mut(next) = [0.0, 10.0, 5.0, 0.0];
        agent.learn(&Transition::new(s, Action::Up, 1.0, next, false), 1.0);
        assert!((agent.action_values(s)[0] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_bootstrap_query_does_not_count_visits() {
        let params = Hyperparameters {
            policy: crate::policy::PolicyKind::Ucb,
            ..Default::default()
        };
        let mut agent = SarsaAgent::new(params, StdRng::seed_from_u64(0));
        let next = State::new(1, 1);
        agent.learn(&Transition::new(State::new(0, 0), Action::Up, 1.0, next, false), 1.0);
        assert_eq!(agent.base().visits.peek(next), [0; 4]);
    }
}
