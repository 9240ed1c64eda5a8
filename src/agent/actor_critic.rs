use rand::rngs::StdRng;
use serde_json::Value;

use super::{ActionTable, Agent, AgentSnapshot, AgentType, Hyperparameters};
use crate::error::{GridmindError, Result};
use crate::policy::{sample_index, softmax};
use crate::types::{argmax, max_value, Action, State, Transition, ACTION_COUNT};

pub const DEFAULT_ACTOR_LEARNING_RATE: f64 = 0.1;

/// Tabular one-step actor-critic.
///
/// The critic keeps per-(state, action) values updated with
/// `learning_rate`; the actor keeps softmax preferences updated with
/// `actor_learning_rate` along the policy-gradient direction
/// `1[i = a] - pi(i | s)`.
#[derive(Clone, Debug)]
pub struct ActorCriticAgent {
    params: Hyperparameters,
    actor_learning_rate: f64,
    values: ActionTable<f64>,
    preferences: ActionTable<f64>,
    rng: StdRng,
}

impl ActorCriticAgent {
    pub fn new(params: Hyperparameters, actor_learning_rate: f64, rng: StdRng) -> Self {
        ActorCriticAgent {
            params: params.normalized(),
            actor_learning_rate: normalize_rate(actor_learning_rate),
            values: ActionTable::new(0.0),
            preferences: ActionTable::new(0.0),
            rng,
        }
    }

    pub fn restore(snapshot: &AgentSnapshot, rng: StdRng) -> Self {
        let mut agent = ActorCriticAgent::new(
            snapshot.params,
            snapshot.actor_learning_rate.unwrap_or(DEFAULT_ACTOR_LEARNING_RATE),
            rng,
        );
        if let Some(dump) = &snapshot.values {
            agent.values = ActionTable::from_dump(dump, 0.0);
        }
        if let Some(dump) = &snapshot.preferences {
            agent.preferences = ActionTable::from_dump(dump, 0.0);
        }
        agent
    }

    pub fn params(&self) -> &Hyperparameters {
        &self.params
    }

    pub fn actor_learning_rate(&self) -> f64 {
        self.actor_learning_rate
    }

    /// Softmax of the preferences at temperature 1; uniform if degenerate.
    pub fn action_probabilities(&mut self, state: State) -> [f64; ACTION_COUNT] {
        softmax(&self.preferences.get(state), 1.0).unwrap_or([1.0 / ACTION_COUNT as f64; ACTION_COUNT])
    }

    pub fn critic_values(&mut self, state: State) -> [f64; ACTION_COUNT] {
        self.values.get(state)
    }
}

fn normalize_rate(rate: f64) -> f64 {
    if rate > 0.0 && rate <= 1.0 {
        rate
    } else {
        log::warn!("actorLearningRate {} out of range, using {}", rate, DEFAULT_ACTOR_LEARNING_RATE);
        DEFAULT_ACTOR_LEARNING_RATE
    }
}

impl Agent for ActorCriticAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::ActorCritic
    }

    fn act(&mut self, state: State, _update: bool) -> Action {
        let prefs = self.preferences.get(state);
        let index = match softmax(&prefs, 1.0) {
            Some(probs) => sample_index(&probs, &mut self.rng),
            None => argmax(&prefs),
        };
        Action::from_index(index)
    }

    fn learn(&mut self, t: &Transition, weight: f64) {
        let bootstrap = if t.done {
            0.0
        } else {
            max_value(&self.values.get(t.next_state))
        };
        let a = t.action.index();
        let delta = t.reward + self.params.gamma * bootstrap - self.values.get(t.state)[a];
        let probs = self.action_probabilities(t.state);

        self.values.get_mut(t.state)[a] += self.params.learning_rate * weight * delta;

        let step = self.actor_learning_rate * weight * delta;
        let prefs = self.preferences.get_mut(t.state);
        for (i, pref) in prefs.iter_mut().enumerate() {
            let indicator = if i == a { 1.0 } else { 0.0 };
            *pref += step * (indicator - probs[i]);
        }
    }

    fn reset(&mut self) {
        self.values.clear();
        self.preferences.clear();
    }

    fn action_values(&mut self, state: State) -> [f64; ACTION_COUNT] {
        self.preferences.get(state)
    }

    fn exploration_rate(&self) -> f64 {
        0.0
    }

    fn update_field(&mut self, key: &str, value: &Value) -> Result<()> {
        if key == "actorLearningRate" {
            let rate = value
                .as_f64()
                .ok_or_else(|| GridmindError::invalid_parameter(key, "expected a number"))?;
            self.actor_learning_rate = normalize_rate(rate);
            return Ok(());
        }
        self.params.apply(key, value)
    }

    fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            agent_type: AgentType::ActorCritic.name().to_string(),
            params: self.params,
            values: Some(self.values.to_dump()),
            preferences: Some(self.preferences.to_dump()),
            actor_learning_rate: Some(self.actor_learning_rate),
            ..Default::default()
        }
    }
}
