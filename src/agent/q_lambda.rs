use rand::rngs::StdRng;
use serde_json::Value;

use super::{ActionTable, Agent, AgentSnapshot, AgentType, Hyperparameters, TabularBase};
use crate::error::{GridmindError, Result};
use crate::types::{max_value, Action, State, Transition, ACTION_COUNT};

pub const DEFAULT_LAMBDA: f64 = 0.9;

/// Q(lambda) with accumulating eligibility traces.
///
/// Each step bumps the trace of the visited pair, moves every traced entry by
/// `alpha * weight * delta * e`, then decays all traces by `lambda * gamma`.
/// Traces are cleared when an episode ends.
#[derive(Clone, Debug)]
pub struct QLambdaAgent {
    base: TabularBase,
    lambda: f64,
    traces: ActionTable<f64>,
}

impl QLambdaAgent {
    pub fn new(params: Hyperparameters, lambda: f64, rng: StdRng) -> Self {
        QLambdaAgent {
            base: TabularBase::new(params, 0.0, rng),
            lambda: normalize_lambda(lambda),
            traces: ActionTable::new(0.0),
        }
    }

    pub fn restore(snapshot: &AgentSnapshot, rng: StdRng) -> Self {
        let traces = snapshot
            .traces
            .as_ref()
            .map(|dump| ActionTable::from_dump(dump, 0.0))
            .unwrap_or_else(|| ActionTable::new(0.0));
        QLambdaAgent {
            base: TabularBase::restore(snapshot, 0.0, rng),
            lambda: normalize_lambda(snapshot.lambda.unwrap_or(DEFAULT_LAMBDA)),
            traces,
        }
    }

    pub fn base(&self) -> &TabularBase {
        &self.base
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn traces(&self) -> &ActionTable<f64> {
        &self.traces
    }
}

fn normalize_lambda(lambda: f64) -> f64 {
    if (0.0..=1.0).contains(&lambda) {
        lambda
    } else {
        log::warn!("lambda {} out of range, using {}", lambda, DEFAULT_LAMBDA);
        DEFAULT_LAMBDA
    }
}

impl Agent for QLambdaAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::QLambda
    }

    fn act(&mut self, state: State, update: bool) -> Action {
        self.base.act(state, update)
    }

    fn learn(&mut self, t: &Transition, weight: f64) {
        let gamma = self.base.params.gamma;
        let alpha = self.base.params.learning_rate * weight;
        let target = if t.done {
            t.reward
        } else {
            t.reward + gamma * max_value(&self.base.q.get(t.next_state))
        };
        let delta = target - self.base.q.get(t.state)[t.action.index()];
        self.traces.get_mut(t.state)[t.action.index()] += 1.0;

        let decay = self.lambda * gamma;
        for (state, trace) in self.traces.iter_mut() {
            let q = self.base.q.get_mut(*state);
            for i in 0..ACTION_COUNT {
                q[i] += alpha * delta * trace[i];
                trace[i] *= decay;
            }
        }

        if t.done {
            self.traces.clear();
        }
        self.base.decay_epsilon();
    }

    fn end_episode(&mut self) {
        self.traces.clear();
    }

    fn reset(&mut self) {
        self.base.reset();
        self.traces.clear();
    }

    fn action_values(&mut self, state: State) -> [f64; ACTION_COUNT] {
        self.base.q.get(state)
    }

    fn exploration_rate(&self) -> f64 {
        self.base.params.epsilon
    }

    fn update_field(&mut self, key: &str, value: &Value) -> Result<()> {
        if key == "lambda" {
            let lambda = value
                .as_f64()
                .ok_or_else(|| GridmindError::invalid_parameter(key, "expected a number"))?;
            self.lambda = normalize_lambda(lambda);
            return Ok(());
        }
        self.base.params.apply(key, value)
    }

    fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            traces: Some(self.traces.to_dump()),
            lambda: Some(self.lambda),
            ..self.base.snapshot(AgentType::QLambda)
        }
    }
}
