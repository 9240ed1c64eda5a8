use serde_json::Value;

use super::{PlanningCore, DEFAULT_MAX_ITERATIONS, DEFAULT_THETA};
use crate::agent::{Agent, AgentSnapshot, AgentType, Hyperparameters};
use crate::environment::MdpModel;
use crate::error::{GridmindError, Result};
use crate::types::{argmax, Action, State, Transition, ACTION_COUNT};

pub const DEFAULT_MAX_EVALUATION_ITERATIONS: usize = 1000;

// an action only replaces the incumbent if it is better by more than this
const IMPROVEMENT_EPSILON: f64 = 1e-12;

/// Policy iteration: alternate iterative policy evaluation with greedy
/// improvement until the policy is stable or `max_iterations` rounds ran.
#[derive(Clone, Debug)]
pub struct PolicyIterationAgent {
    core: PlanningCore,
    max_evaluation_iterations: usize,
}

impl PolicyIterationAgent {
    pub fn new(params: Hyperparameters, theta: f64, max_iterations: usize) -> Self {
        PolicyIterationAgent {
            core: PlanningCore::new(params, theta, max_iterations),
            max_evaluation_iterations: DEFAULT_MAX_EVALUATION_ITERATIONS,
        }
    }

    pub fn with_max_evaluation_iterations(mut self, max_evaluation_iterations: usize) -> Self {
        self.max_evaluation_iterations = max_evaluation_iterations.max(1);
        self
    }

    pub fn restore(snapshot: &AgentSnapshot) -> Self {
        PolicyIterationAgent {
            core: PlanningCore::restore(snapshot),
            max_evaluation_iterations: snapshot
                .max_evaluation_iterations
                .unwrap_or(DEFAULT_MAX_EVALUATION_ITERATIONS)
                .max(1),
        }
    }

    pub fn state_value(&self, state: State) -> f64 {
        self.core.value(state)
    }

    fn evaluate(&mut self, model: &dyn MdpModel, states: &[State]) {
        for _ in 0..self.max_evaluation_iterations {
            let mut delta: f64 = 0.0;
            for &state in states {
                let updated = if model.is_terminal(state) {
                    0.0
                } else {
                    let action = self.core.act(state);
                    self.core.backup(model, state, action)
                };
                let old = self.core.values.insert(state, updated).unwrap_or(0.0);
                delta = delta.max((updated - old).abs());
            }
            if delta < self.core.theta {
                break;
            }
        }
    }

    /// Returns whether the policy stayed the same.
    fn improve(&mut self, model: &dyn MdpModel, states: &[State]) -> bool {
        let mut stable = true;
        for &state in states {
            let q = self.core.q_values(model, state);
            let old = self.core.act(state);
            let best = argmax(&q);
            let chosen = if q[best] > q[old.index()] + IMPROVEMENT_EPSILON {
                stable = false;
                Action::from_index(best)
            } else {
                old
            };
            self.core.policy.insert(state, chosen);
        }
        stable
    }

    /// Run policy iteration against `model`. Returns the number of
    /// evaluation/improvement rounds.
    pub fn plan(&mut self, model: &dyn MdpModel) -> usize {
        let states = model.enumerate_states();
        let mut rounds = 0;
        let mut stable = false;
        while !stable && rounds < self.core.max_iterations {
            rounds += 1;
            self.evaluate(model, &states);
            stable = self.improve(model, &states);
        }
        self.core.record_lookahead(model, &states);
        log::debug!(
            "policy iteration finished after {} rounds over {} states (stable: {})",
            rounds,
            states.len(),
            stable
        );
        rounds
    }
}

impl Default for PolicyIterationAgent {
    fn default() -> Self {
        Self::new(Hyperparameters::default(), DEFAULT_THETA, DEFAULT_MAX_ITERATIONS)
    }
}

impl Agent for PolicyIterationAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::PolicyIteration
    }

    fn act(&mut self, state: State, _update: bool) -> Action {
        self.core.act(state)
    }

    fn learn(&mut self, _transition: &Transition, _weight: f64) {}

    fn reset(&mut self) {
        self.core.reset();
    }

    fn attach_model(&mut self, model: &dyn MdpModel) {
        self.plan(model);
    }

    fn supports_replay(&self) -> bool {
        false
    }

    fn action_values(&mut self, state: State) -> [f64; ACTION_COUNT] {
        self.core.action_values(state)
    }

    fn exploration_rate(&self) -> f64 {
        0.0
    }

    fn update_field(&mut self, key: &str, value: &Value) -> Result<()> {
        if key == "maxEvaluationIterations" {
            self.max_evaluation_iterations = match value.as_u64() {
                Some(n) if n > 0 => n as usize,
                _ => return Err(GridmindError::invalid_parameter(key, "expected a positive integer")),
            };
            return Ok(());
        }
        if let Some(result) = self.core.apply(key, value) {
            return result;
        }
        self.core.params.apply(key, value)?;
        self.core.params = self.core.params.without_exploration();
        Ok(())
    }

    fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            max_evaluation_iterations: Some(self.max_evaluation_iterations),
            ..self.core.snapshot(AgentType::PolicyIteration)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ValueIterationAgent;
    use crate::environment::GridWorld;
    use serde_json::json;

    #[test]
    fn test_agrees_with_value_iteration() {
        let env = GridWorld::new(5);
        let mut pi = PolicyIterationAgent::default();
        let mut vi = ValueIterationAgent::default();
        pi.plan(&env);
        vi.plan(&env);
        for state in env.enumerate_states() {
            assert!((pi.state_value(state) - vi.state_value(state)).abs() < 1e-4, "{}", state);
        }
    }

    #[test]
    fn test_converges_in_few_rounds() {
        let env = GridWorld::new(5);
        let mut agent = PolicyIterationAgent::default();
        let rounds = agent.plan(&env);
        assert!(rounds >= 1 && rounds < 20);
        assert_eq!(agent.act(State::new(4, 3), false), Action::Down);
    }

    #[test]
    fn test_evaluation_cap_field() {
        let mut agent = PolicyIterationAgent::default().with_max_evaluation_iterations(5);
        let snapshot = agent.snapshot();
        assert_eq!(snapshot.max_evaluation_iterations, Some(5));
        agent.update_field("maxEvaluationIterations", &json!(50)).unwrap();
        assert!(agent.update_field("maxEvaluationIterations", &json!(0)).is_err());
        agent.update_field("epsilon", &json!(0.7)).unwrap();
        assert_eq!(agent.exploration_rate(), 0.0);
        assert_eq!(agent.snapshot().params.epsilon, 0.0);
    }
}
