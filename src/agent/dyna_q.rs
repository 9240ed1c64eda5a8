use rand::rngs::StdRng;
use rand::Rng;
use serde_json::Value;
use std::collections::HashMap;

use super::q_learning::q_learning_update;
use super::{Agent, AgentSnapshot, AgentType, Hyperparameters, ModelEntry, TabularBase};
use crate::error::{GridmindError, Result};
use crate::types::{Action, State, Transition, ACTION_COUNT};

pub const DEFAULT_PLANNING_STEPS: usize = 10;

/// Dyna-Q: Q-learning from real experience, plus `planning_steps` synthetic
/// Q-learning updates per real step drawn from a deterministic model of every
/// (state, action) seen so far.
#[derive(Clone, Debug)]
pub struct DynaQAgent {
    base: TabularBase,
    planning_steps: usize,
    model: HashMap<(State, Action), ModelEntry>,
    // insertion order, so sampling is reproducible under a seeded rng
    seen: Vec<(State, Action)>,
}

impl DynaQAgent {
    pub fn new(params: Hyperparameters, planning_steps: usize, rng: StdRng) -> Self {
        DynaQAgent {
            base: TabularBase::new(params, 0.0, rng),
            planning_steps,
            model: HashMap::new(),
            seen: Vec::new(),
        }
    }

    pub fn restore(snapshot: &AgentSnapshot, rng: StdRng) -> Self {
        let mut agent = DynaQAgent {
            base: TabularBase::restore(snapshot, 0.0, rng),
            planning_steps: snapshot.planning_steps.unwrap_or(DEFAULT_PLANNING_STEPS),
            model: HashMap::new(),
            seen: Vec::new(),
        };
        for entry in snapshot.model.iter().flatten() {
            agent.remember(*entry);
        }
        agent
    }

    pub fn base(&self) -> &TabularBase {
        &self.base
    }

    pub fn planning_steps(&self) -> usize {
        self.planning_steps
    }

    pub fn model_len(&self) -> usize {
        self.model.len()
    }

    fn remember(&mut self, entry: ModelEntry) {
        let key = (entry.state, entry.action);
        if self.model.insert(key, entry).is_none() {
            self.seen.push(key);
        }
    }

    fn plan(&mut self) {
        if self.seen.is_empty() {
            return;
        }
        for _ in 0..self.planning_steps {
            let pick = self.base.rng().gen_range(0..self.seen.len());
            let entry = match self.model.get(&self.seen[pick]) {
                Some(entry) => *entry,
                None => continue,
            };
            let synthetic = Transition::new(entry.state, entry.action, entry.reward, entry.next_state, entry.done);
            q_learning_update(&mut self.base, &synthetic, 1.0);
        }
    }
}

impl Agent for DynaQAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::DynaQ
    }

    fn act(&mut self, state: State, update: bool) -> Action {
        self.base.act(state, update)
    }

    fn learn(&mut self, t: &Transition, weight: f64) {
        q_learning_update(&mut self.base, t, weight);
        self.remember(ModelEntry {
            state: t.state,
            action: t.action,
            next_state: t.next_state,
            reward: t.reward,
            done: t.done,
        });
        self.plan();
        self.base.decay_epsilon();
    }

    fn reset(&mut self) {
        self.base.reset();
        self.model.clear();
        self.seen.clear();
    }

    fn action_values(&mut self, state: State) -> [f64; ACTION_COUNT] {
        self.base.q.get(state)
    }

    fn exploration_rate(&self) -> f64 {
        self.base.params.epsilon
    }

    fn update_field(&mut self, key: &str, value: &Value) -> Result<()> {
        if key == "planningSteps" {
            self.planning_steps = value
                .as_u64()
                .ok_or_else(|| GridmindError::invalid_parameter(key, "expected a non-negative integer"))?
                as usize;
            return Ok(());
        }
        self.base.params.apply(key, value)
    }

    fn snapshot(&self) -> AgentSnapshot {
        let model = self.seen.iter().filter_map(|key| self.model.get(key).copied()).collect();
        AgentSnapshot {
            model: Some(model),
            planning_steps: Some(self.planning_steps),
            ..self.base.snapshot(AgentType::DynaQ)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use serde_json::json;

    fn params() -> Hyperparameters {
        Hyperparameters {
            learning_rate: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn test_planning_amplifies_updates() {
        let t = Transition::new(State::new(0, 0), Action::Right, 1.0, State::new(1, 0), true);
        let mut plain = DynaQAgent::new(params(), 0, StdRng::seed_from_u64(0));
        let mut dyna = DynaQAgent::new(params(), 5, StdRng::seed_from_u64(0));
        plain.learn(&t, 1.0);
        dyna.learn(&t, 1.0);
        let s = State::new(0, 0);
        assert_eq!(plain.action_values(s)[3], 0.5);
        // six halvings of the gap toward 1.0
        assert!((dyna.action_values(s)[3] - (1.0 - 0.5f64.powi(6))).abs() < 1e-12);
    }

    #[test]
    fn test_model_keeps_latest_outcome() {
        let mut agent = DynaQAgent::new(params(), 1, StdRng::seed_from_u64(0));
        let s = State::new(0, 0);
        agent.learn(&Transition::new(s, Action::Up, 0.0, s, false), 1.0);
        agent.learn(&Transition::new(s, Action::Up, -0.5, s, false), 1.0);
        assert_eq!(agent.model_len(), 1);
        let snapshot = agent.snapshot();
        assert_eq!(snapshot.model.unwrap()[0].reward, -0.5);
    }

    #[test]
    fn test_planning_steps_field() {
        let mut agent = DynaQAgent::new(params(), 1, StdRng::seed_from_u64(0));
        agent.update_field("planningSteps", &json!(25)).unwrap();
        assert_eq!(agent.planning_steps(), 25);
        assert!(agent.update_field("planningSteps", &json!(-1)).is_err());
    }

    #[test]
    fn test_restore_rebuilds_model() {
        let mut agent = DynaQAgent::new(params(), 3, StdRng::seed_from_u64(0));
        agent.learn(&Transition::new(State::new(1, 1), Action::Left, 0.2, State::new(0, 1), false), 1.0);
        let restored = DynaQAgent::restore(&agent.snapshot(), StdRng::seed_from_u64(1));
        assert_eq!(restored.model_len(), 1);
        assert_eq!(restored.planning_steps(), 3);
    }
}
