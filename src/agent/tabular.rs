use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::table::ActionTable;
use super::AgentSnapshot;
use crate::error::{GridmindError, Result};
use crate::policy::{select_action, PolicyKind, PolicyParams};
use crate::types::{Action, State, ACTION_COUNT};

/// Hyperparameters common to every agent. Field names match the persisted
/// schema.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hyperparameters {
    pub epsilon: f64,
    pub gamma: f64,
    pub learning_rate: f64,
    pub epsilon_decay: f64,
    pub min_epsilon: f64,
    pub policy: PolicyKind,
    pub temperature: f64,
    pub ucb_c: f64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Hyperparameters {
            epsilon: 1.0,
            gamma: 0.9,
            learning_rate: 0.1,
            epsilon_decay: 0.995,
            min_epsilon: 0.05,
            policy: PolicyKind::EpsilonGreedy,
            temperature: 1.0,
            ucb_c: 2.0,
        }
    }
}

impl Hyperparameters {
    /// Replace out-of-range values with defaults so the invariants
    /// `gamma in [0, 1)`, `learning_rate in (0, 1]` and
    /// `epsilon >= min_epsilon` always hold.
    pub fn normalized(self) -> Self {
        let d = Hyperparameters::default();
        let mut p = self;
        if !(0.0..1.0).contains(&p.gamma) {
            log::warn!("gamma {} out of range, using {}", p.gamma, d.gamma);
            p.gamma = d.gamma;
        }
        if !(p.learning_rate > 0.0 && p.learning_rate <= 1.0) {
            log::warn!("learningRate {} out of range, using {}", p.learning_rate, d.learning_rate);
            p.learning_rate = d.learning_rate;
        }
        if !(p.epsilon_decay > 0.0 && p.epsilon_decay <= 1.0) {
            log::warn!("epsilonDecay {} out of range, using {}", p.epsilon_decay, d.epsilon_decay);
            p.epsilon_decay = d.epsilon_decay;
        }
        if !(0.0..=1.0).contains(&p.min_epsilon) {
            p.min_epsilon = d.min_epsilon;
        }
        if !(0.0..=1.0).contains(&p.epsilon) {
            p.epsilon = if p.epsilon.is_nan() { d.epsilon } else { p.epsilon.clamp(0.0, 1.0) };
        }
        p.epsilon = p.epsilon.max(p.min_epsilon);
        if !(p.temperature.is_finite() && p.temperature >= 0.0) {
            p.temperature = d.temperature;
        }
        if !(p.ucb_c.is_finite() && p.ucb_c >= 0.0) {
            p.ucb_c = d.ucb_c;
        }
        p
    }

    /// Settings for agents that never explore by epsilon.
    pub fn without_exploration(self) -> Self {
        Hyperparameters {
            epsilon: 0.0,
            epsilon_decay: 1.0,
            min_epsilon: 0.0,
            policy: PolicyKind::Greedy,
            ..self
        }
    }

    pub fn policy_params(&self) -> PolicyParams {
        PolicyParams {
            epsilon: self.epsilon,
            temperature: self.temperature,
            ucb_c: self.ucb_c,
        }
    }

    /// Set one field by its persisted name.
    pub fn apply(&mut self, key: &str, value: &Value) -> Result<()> {
        if key == "policy" {
            self.policy = serde_json::from_value(value.clone())
                .map_err(|e| GridmindError::invalid_parameter(key, e.to_string()))?;
            return Ok(());
        }
        let number = value
            .as_f64()
            .ok_or_else(|| GridmindError::invalid_parameter(key, "expected a number"))?;
        match key {
            "epsilon" => self.epsilon = number,
            "gamma" => self.gamma = number,
            "learningRate" => self.learning_rate = number,
            "epsilonDecay" => self.epsilon_decay = number,
            "minEpsilon" => self.min_epsilon = number,
            "temperature" => self.temperature = number,
            "ucbC" => self.ucb_c = number,
            _ => return Err(GridmindError::invalid_parameter(key, "unknown field")),
        }
        *self = self.normalized();
        Ok(())
    }
}

/// Shared state of every value-based agent: a lazily initialized Q-table,
/// visitation counts for count-based policies, hyperparameters and the
/// agent's random source.
#[derive(Clone, Debug)]
pub struct TabularBase {
    pub params: Hyperparameters,
    pub q: ActionTable<f64>,
    pub visits: ActionTable<u32>,
    rng: StdRng,
}

impl TabularBase {
    pub fn new(params: Hyperparameters, initial_value: f64, rng: StdRng) -> Self {
        TabularBase {
            params: params.normalized(),
            q: ActionTable::new(initial_value),
            visits: ActionTable::new(0),
            rng,
        }
    }

    /// Rebuild the shared part of an agent from its snapshot.
    pub fn restore(snapshot: &AgentSnapshot, initial_value: f64, rng: StdRng) -> Self {
        let mut base = TabularBase::new(snapshot.params, initial_value, rng);
        if let Some(dump) = &snapshot.q_table {
            base.q = ActionTable::from_dump(dump, initial_value);
        }
        if let Some(dump) = &snapshot.visit_counts {
            base.visits = ActionTable::from_dump(dump, 0);
        }
        base
    }

    /// Fill the shared fields of a snapshot.
    pub fn snapshot(&self, agent_type: super::AgentType) -> AgentSnapshot {
        AgentSnapshot {
            agent_type: agent_type.name().to_string(),
            params: self.params,
            q_table: Some(self.q.to_dump()),
            visit_counts: Some(self.visits.to_dump()),
            ..Default::default()
        }
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Run the configured policy over `q` for `state`.
    pub fn select(&mut self, state: State, q: &[f64; ACTION_COUNT], update: bool) -> Action {
        let kind = self.params.policy;
        let params = self.params.policy_params();
        if kind.uses_visits() {
            let visits = self.visits.get_mut(state);
            select_action(kind, q, visits, params, update, &mut self.rng)
        } else {
            let mut unused = [0; ACTION_COUNT];
            select_action(kind, q, &mut unused, params, update, &mut self.rng)
        }
    }

    pub fn act(&mut self, state: State, update: bool) -> Action {
        let q = self.q.get(state);
        self.select(state, &q, update)
    }

    /// `Q(s, a) += alpha * weight * (target - Q(s, a))`
    pub fn update_toward(&mut self, state: State, action: Action, target: f64, weight: f64) {
        let alpha = self.params.learning_rate * weight;
        let q = self.q.get_mut(state);
        q[action.index()] += alpha * (target - q[action.index()]);
    }

    /// `epsilon <- max(min_epsilon, epsilon * decay)`
    pub fn decay_epsilon(&mut self) {
        self.params.epsilon = (self.params.epsilon * self.params.epsilon_decay).max(self.params.min_epsilon);
    }

    pub fn reset(&mut self) {
        self.q.clear();
        self.visits.clear();
    }
}
