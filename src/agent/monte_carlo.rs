use rand::rngs::StdRng;
use serde_json::Value;
use std::collections::HashSet;

use super::{ActionTable, Agent, AgentSnapshot, AgentType, Hyperparameters, TabularBase};
use crate::error::Result;
use crate::types::{Action, State, Transition, ACTION_COUNT};

/// First-visit Monte Carlo control.
///
/// Transitions are buffered until the episode terminates (or is cut short via
/// [`Agent::end_episode`]); then returns are computed backward and each
/// (state, action) pair's first occurrence moves its Q-value to the running
/// mean of observed returns.
#[derive(Clone, Debug)]
pub struct MonteCarloAgent {
    base: TabularBase,
    episode: Vec<Transition>,
    return_counts: ActionTable<u32>,
}

impl MonteCarloAgent {
    pub fn new(params: Hyperparameters, rng: StdRng) -> Self {
        MonteCarloAgent {
            base: TabularBase::new(params, 0.0, rng),
            episode: Vec::new(),
            return_counts: ActionTable::new(0),
        }
    }

    pub fn restore(snapshot: &AgentSnapshot, rng: StdRng) -> Self {
        let return_counts = snapshot
            .return_counts
            .as_ref()
            .map(|dump| ActionTable::from_dump(dump, 0))
            .unwrap_or_else(|| ActionTable::new(0));
        MonteCarloAgent {
            base: TabularBase::restore(snapshot, 0.0, rng),
            episode: Vec::new(),
            return_counts,
        }
    }

    pub fn base(&self) -> &TabularBase {
        &self.base
    }

    pub fn pending(&self) -> usize {
        self.episode.len()
    }

    pub fn return_counts(&self) -> &ActionTable<u32> {
        &self.return_counts
    }

    fn flush(&mut self) {
        if self.episode.is_empty() {
            return;
        }
        let episode = std::mem::take(&mut self.episode);

        let mut seen = HashSet::new();
        let first_visit: Vec<bool> = episode.iter().map(|t| seen.insert((t.state, t.action))).collect();

        let gamma = self.base.params.gamma;
        let mut g = 0.0;
        for (t, first) in episode.iter().zip(first_visit).rev() {
            g = t.reward + gamma * g;
            if !first {
                continue;
            }
            let count = &mut self.return_counts.get_mut(t.state)[t.action.index()];
            *count += 1;
            let n = f64::from(*count);
            let q = &mut self.base.q.get_mut(t.state)[t.action.index()];
            *q += (g - *q) / n;
        }
        log::debug!("monte carlo episode of {} steps, return {:.3}", episode.len(), g);
    }
}

impl Agent for MonteCarloAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::MonteCarlo
    }

    fn act(&mut self, state: State, update: bool) -> Action {
        self.base.act(state, update)
    }

    fn learn(&mut self, transition: &Transition, _weight: f64) {
        self.episode.push(*transition);
        if transition.done {
            self.flush();
        }
        self.base.decay_epsilon();
    }

    fn end_episode(&mut self) {
        self.flush();
    }

    fn reset(&mut self) {
        self.base.reset();
        self.episode.clear();
        self.return_counts.clear();
    }

    fn supports_replay(&self) -> bool {
        false
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
        AgentSnapshot {
            return_counts: Some(self.return_counts.to_dump()),
            ..self.base.snapshot(AgentType::MonteCarlo)
        }
    }
}
