use rand::rngs::StdRng;
use rand::Rng;
use serde_json::Value;

use super::{ActionTable, Agent, AgentSnapshot, AgentType, Hyperparameters, TabularBase};
use crate::error::Result;
use crate::types::{argmax, Action, State, Transition, ACTION_COUNT};

/// Double Q-learning.
///
/// Each update flips a fair coin and updates one table, using it to pick the
/// best next action and the other table to evaluate it. Acting uses the
/// average of the two tables.
#[derive(Clone, Debug)]
pub struct DoubleQAgent {
    base: TabularBase,
    table_b: ActionTable<f64>,
}

impl DoubleQAgent {
    pub fn new(params: Hyperparameters, rng: StdRng) -> Self {
        DoubleQAgent {
            base: TabularBase::new(params, 0.0, rng),
            table_b: ActionTable::new(0.0),
        }
    }

    pub fn restore(snapshot: &AgentSnapshot, rng: StdRng) -> Self {
        let table_b = snapshot
            .q_table_b
            .as_ref()
            .map(|dump| ActionTable::from_dump(dump, 0.0))
            .unwrap_or_else(|| ActionTable::new(0.0));
        DoubleQAgent {
            base: TabularBase::restore(snapshot, 0.0, rng),
            table_b,
        }
    }

    pub fn base(&self) -> &TabularBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut TabularBase {
        &mut self.base
    }

    pub fn table_b(&self) -> &ActionTable<f64> {
        &self.table_b
    }

    pub fn table_b_mut(&mut self) -> &mut ActionTable<f64> {
        &mut self.table_b
    }

    fn combined(&mut self, state: State) -> [f64; ACTION_COUNT] {
        let a = self.base.q.get(state);
        let b = self.table_b.get(state);
        let mut avg = [0.0; ACTION_COUNT];
        for i in 0..ACTION_COUNT {
            avg[i] = (a[i] + b[i]) / 2.0;
        }
        avg
    }
}

impl Agent for DoubleQAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::DoubleQ
    }

    fn act(&mut self, state: State, update: bool) -> Action {
        let q = self.combined(state);
        self.base.select(state, &q, update)
    }

    fn learn(&mut self, t: &Transition, weight: f64) {
        let gamma = self.base.params.gamma;
        let alpha = self.base.params.learning_rate * weight;
        let update_a = self.base.rng().gen_bool(0.5);

        let (select, evaluate) = if update_a {
            (self.base.q.get(t.next_state), self.table_b.get(t.next_state))
        } else {
            (self.table_b.get(t.next_state), self.base.q.get(t.next_state))
        };
        let target = if t.done {
            t.reward
        } else {
            t.reward + gamma * evaluate[argmax(&select)]
        };

        let table = if update_a { &mut self.base.q } else { &mut self.table_b };
        let q = table.get_mut(t.state);
        q[t.action.index()] += alpha * (target - q[t.action.index()]);
        self.base.decay_epsilon();
    }

    fn reset(&mut self) {
        self.base.reset();
        self.table_b.clear();
    }

    fn action_values(&mut self, state: State) -> [f64; ACTION_COUNT] {
        self.combined(state)
    }

    fn exploration_rate(&self) -> f64 {
        self.base.params.epsilon
    }

    fn update_field(&mut self, key: &str, value: &Value) -> Result<()> {
        self.base.params.apply(key, value)
    }

    fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            q_table_b: Some(self.table_b.to_dump()),
            ..self.base.snapshot(AgentType::DoubleQ)
        }
    }
}
