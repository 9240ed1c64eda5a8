//! Dynamic-programming agents that plan against an [`MdpModel`] instead of
//! learning from experience.
//!
//! Both agents compute their policy when a model is attached, keep state
//! values between re-plans as a warm start, and act by table lookup.

mod policy_iteration;
mod value_iteration;

pub use policy_iteration::PolicyIterationAgent;
pub use value_iteration::ValueIterationAgent;

use std::collections::HashMap;

use serde_json::Value;

use super::{ActionTable, AgentSnapshot, AgentType, Hyperparameters};
use crate::environment::MdpModel;
use crate::error::{GridmindError, Result};
use crate::types::{argmax, max_value, Action, State, ACTION_COUNT};

pub const DEFAULT_THETA: f64 = 1e-6;
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Values, policy and lookahead shared by both planners.
#[derive(Clone, Debug)]
pub(crate) struct PlanningCore {
    pub params: Hyperparameters,
    pub theta: f64,
    pub max_iterations: usize,
    pub values: HashMap<State, f64>,
    pub policy: HashMap<State, Action>,
    pub lookahead: HashMap<State, [f64; ACTION_COUNT]>,
}

impl PlanningCore {
    pub fn new(params: Hyperparameters, theta: f64, max_iterations: usize) -> Self {
        let theta = if theta.is_finite() && theta > 0.0 {
            theta
        } else {
            log::warn!("theta {} must be positive, using {}", theta, DEFAULT_THETA);
            DEFAULT_THETA
        };
        PlanningCore {
            params: params.normalized().without_exploration(),
            theta,
            max_iterations: max_iterations.max(1),
            values: HashMap::new(),
            policy: HashMap::new(),
            lookahead: HashMap::new(),
        }
    }

    /// Rebuild from a snapshot. The persisted `qTable` holds the lookahead
    /// values; the policy and state values are derived from it.
    pub fn restore(snapshot: &AgentSnapshot) -> Self {
        let mut core = PlanningCore::new(
            snapshot.params,
            snapshot.theta.unwrap_or(DEFAULT_THETA),
            snapshot.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
        );
        if let Some(dump) = &snapshot.q_table {
            let table = ActionTable::from_dump(dump, 0.0);
            for state in table.states() {
                let q = table.peek(state);
                core.lookahead.insert(state, q);
                core.policy.insert(state, Action::from_index(argmax(&q)));
                core.values.insert(state, max_value(&q));
            }
        }
        core
    }

    pub fn snapshot(&self, agent_type: AgentType) -> AgentSnapshot {
        let mut table = ActionTable::new(0.0);
        for (state, q) in &self.lookahead {
            *table.get_mut(*state) = *q;
        }
        AgentSnapshot {
            agent_type: agent_type.name().to_string(),
            params: self.params,
            q_table: Some(table.to_dump()),
            theta: Some(self.theta),
            max_iterations: Some(self.max_iterations),
            ..Default::default()
        }
    }

    pub fn value(&self, state: State) -> f64 {
        self.values.get(&state).copied().unwrap_or(0.0)
    }

    /// One-step lookahead of every action from `state` under the current
    /// value estimates.
    pub fn q_values(&self, model: &dyn MdpModel, state: State) -> [f64; ACTION_COUNT] {
        let mut q = [f64::MIN; ACTION_COUNT];
        for action in model.available_actions() {
            q[action.index()] = self.backup(model, state, action);
        }
        q
    }

    pub fn backup(&self, model: &dyn MdpModel, state: State, action: Action) -> f64 {
        let outcome = model.transition(state, action);
        let future = if outcome.done { 0.0 } else { self.value(outcome.state) };
        outcome.reward + self.params.gamma * future
    }

    /// Record the lookahead for every state, for inspection and persistence.
    pub fn record_lookahead(&mut self, model: &dyn MdpModel, states: &[State]) {
        self.lookahead.clear();
        for &state in states {
            let q = self.q_values(model, state);
            self.lookahead.insert(state, q);
        }
    }

    pub fn act(&self, state: State) -> Action {
        self.policy.get(&state).copied().unwrap_or(Action::Up)
    }

    pub fn action_values(&self, state: State) -> [f64; ACTION_COUNT] {
        self.lookahead.get(&state).copied().unwrap_or([0.0; ACTION_COUNT])
    }

    pub fn reset(&mut self) {
        self.values.clear();
        self.policy.clear();
        self.lookahead.clear();
    }

    /// Patch one field by name. Returns `None` when the key is not a
    /// planning field.
    pub fn apply(&mut self, key: &str, value: &Value) -> Option<Result<()>> {
        match key {
            "theta" => Some(match value.as_f64() {
                Some(theta) if theta.is_finite() && theta > 0.0 => {
                    self.theta = theta;
                    Ok(())
                }
                _ => Err(GridmindError::invalid_parameter(key, "expected a positive number")),
            }),
            "maxIterations" => Some(match value.as_u64() {
                Some(n) if n > 0 => {
                    self.max_iterations = n as usize;
                    Ok(())
                }
                _ => Err(GridmindError::invalid_parameter(key, "expected a positive integer")),
            }),
            _ => None,
        }
    }
}
