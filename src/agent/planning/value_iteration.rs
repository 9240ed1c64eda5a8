use serde_json::Value;

use super::{PlanningCore, DEFAULT_MAX_ITERATIONS, DEFAULT_THETA};
use crate::agent::{Agent, AgentSnapshot, AgentType, Hyperparameters};
use crate::environment::MdpModel;
use crate::error::Result;
use crate::types::{argmax, max_value, Action, State, Transition, ACTION_COUNT};

/// Value iteration: in-place Bellman-optimality sweeps until the largest
/// change drops below `theta`, then a greedy policy is read off the values.
#[derive(Clone, Debug)]
pub struct ValueIterationAgent {
    core: PlanningCore,
}

impl ValueIterationAgent {
    pub fn new(params: Hyperparameters, theta: f64, max_iterations: usize) -> Self {
        ValueIterationAgent {
            core: PlanningCore::new(params, theta, max_iterations),
        }
    }

    pub fn restore(snapshot: &AgentSnapshot) -> Self {
        ValueIterationAgent {
            core: PlanningCore::restore(snapshot),
        }
    }

    pub fn state_value(&self, state: State) -> f64 {
        self.core.value(state)
    }

    /// Run value iteration against `model`. Returns the number of sweeps.
    pub fn plan(&mut self, model: &dyn MdpModel) -> usize {
        let states = model.enumerate_states();
        let mut sweeps = 0;
        let mut delta = f64::INFINITY;

        while sweeps < self.core.max_iterations {
            sweeps += 1;
            delta = 0.0;
            for &state in &states {
                let updated = if model.is_terminal(state) {
                    0.0
                } else {
                    max_value(&self.core.q_values(model, state))
                };
                let old = self.core.values.insert(state, updated).unwrap_or(0.0);
                delta = f64::max(delta, (updated - old).abs());
            }
            if delta < self.core.theta {
                break;
            }
        }

        self.core.policy.clear();
        self.core.record_lookahead(model, &states);
        for &state in &states {
            if let Some(q) = self.core.lookahead.get(&state) {
                self.core.policy.insert(state, Action::from_index(argmax(q)));
            }
        }

        if delta < self.core.theta {
            log::debug!("value iteration converged after {} sweeps over {} states", sweeps, states.len());
        } else {
            log::debug!("value iteration stopped at the {} sweep cap (delta {:.2e})", sweeps, delta);
        }
        sweeps
    }
}

impl Default for ValueIterationAgent {
    fn default() -> Self {
        Self::new(Hyperparameters::default(), DEFAULT_THETA, DEFAULT_MAX_ITERATIONS)
    }
}

impl Agent for ValueIterationAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::ValueIteration
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
        if let Some(result) = self.core.apply(key, value) {
            return result;
        }
        self.core.params.apply(key, value)?;
        self.core.params = self.core.params.without_exploration();
        Ok(())
    }

    fn snapshot(&self) -> AgentSnapshot {
        self.core.snapshot(AgentType::ValueIteration)
    }
}
