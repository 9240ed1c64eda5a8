//! Action selection policies shared by every tabular agent.
//!
//! [`select_action`] is a pure dispatch over [`PolicyKind`]: given the
//! current action-value vector of a state (and, for UCB and Thompson
//! sampling, that state's visit counts) it picks an action. The only side
//! effects are drawing from the supplied random source and, when `update`
//! is set, incrementing the chosen action's visit count.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::types::{argmax, Action, ACTION_COUNT};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    #[default]
    EpsilonGreedy,
    Greedy,
    Softmax,
    Ucb,
    Thompson,
    Random,
}

impl PolicyKind {
    /// Whether this policy reads or writes visitation counts.
    pub fn uses_visits(self) -> bool {
        matches!(self, PolicyKind::Ucb | PolicyKind::Thompson)
    }
}

/// Exploration knobs consumed by [`select_action`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolicyParams {
    pub epsilon: f64,
    pub temperature: f64,
    pub ucb_c: f64,
}

/// Pick an action for one state.
///
/// `visits` is only read by UCB and Thompson sampling, and only written by
/// them when `update` is true.
pub fn select_action<R: Rng + ?Sized>(
    kind: PolicyKind,
    q: &[f64; ACTION_COUNT],
    visits: &mut [u32; ACTION_COUNT],
    params: PolicyParams,
    update: bool,
    rng: &mut R,
) -> Action {
    let index = match kind {
        PolicyKind::EpsilonGreedy => {
            if rng.gen::<f64>() < params.epsilon {
                rng.gen_range(0..ACTION_COUNT)
            } else {
                argmax(q)
            }
        }
        PolicyKind::Greedy => argmax(q),
        PolicyKind::Softmax => match softmax(q, params.temperature) {
            Some(probs) => sample_index(&probs, rng),
            None => argmax(q),
        },
        PolicyKind::Ucb => {
            let index = ucb_index(q, visits, params.ucb_c);
            if update {
                visits[index] += 1;
            }
            index
        }
        PolicyKind::Thompson => {
            let mut draws = [0.0; ACTION_COUNT];
            for (a, draw) in draws.iter_mut().enumerate() {
                let std_dev = (1.0 / (visits[a] as f64 + 1.0)).sqrt();
                *draw = match Normal::new(q[a], std_dev) {
                    Ok(normal) => normal.sample(rng),
                    Err(_) => q[a],
                };
            }
            let index = argmax(&draws);
            if update {
                visits[index] += 1;
            }
            index
        }
        PolicyKind::Random => rng.gen_range(0..ACTION_COUNT),
    };
    Action::from_index(index)
}

fn ucb_index(q: &[f64; ACTION_COUNT], visits: &[u32; ACTION_COUNT], c: f64) -> usize {
    if let Some(unvisited) = visits.iter().position(|&n| n == 0) {
        return unvisited;
    }
    let total: u32 = visits.iter().sum();
    let log_total = (total as f64).ln();
    let mut scores = [0.0; ACTION_COUNT];
    for a in 0..ACTION_COUNT {
        scores[a] = q[a] + c * (log_total / visits[a] as f64).sqrt();
    }
    argmax(&scores)
}

/// Temperature-scaled softmax. `None` when the partition sum is zero or not
/// finite (e.g. a zero temperature or NaN estimates).
pub fn softmax(values: &[f64; ACTION_COUNT], temperature: f64) -> Option<[f64; ACTION_COUNT]> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut probs = [0.0; ACTION_COUNT];
    for (p, &v) in probs.iter_mut().zip(values.iter()) {
        *p = ((v - max) / temperature).exp();
    }
    let sum: f64 = probs.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return None;
    }
    for p in probs.iter_mut() {
        *p /= sum;
    }
    Some(probs)
}

/// Action distribution of an epsilon-greedy policy over `q`.
pub fn epsilon_greedy_probabilities(q: &[f64; ACTION_COUNT], epsilon: f64) -> [f64; ACTION_COUNT] {
    let mut probs = [epsilon / ACTION_COUNT as f64; ACTION_COUNT];
    probs[argmax(q)] += 1.0 - epsilon;
    probs
}

/// Inverse-CDF draw from a normalized distribution.
pub fn sample_index<R: Rng + ?Sized>(probs: &[f64], rng: &mut R) -> usize {
    let r: f64 = rng.gen();
    let mut cumsum = 0.0;
    for (i, &p) in probs.iter().enumerate() {
        cumsum += p;
        if r < cumsum {
            return i;
        }
    }
    probs.len().saturating_sub(1)
}
