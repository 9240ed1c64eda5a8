//! Bounded experience replay with optional prioritized sampling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::policy::sample_index;
use crate::types::Transition;

/// Priority added to `|reward|` on push so zero-reward transitions stay
/// sampleable.
pub const PRIORITY_EPSILON: f64 = 0.01;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleStrategy {
    #[default]
    Uniform,
    Priority,
}

/// Replay settings as carried by the trainer configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplayConfig {
    pub capacity: usize,
    /// Replayed transitions per real step.
    pub samples: usize,
    pub strategy: SampleStrategy,
    pub alpha: f64,
    pub beta: f64,
    pub beta_increment: f64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        ReplayConfig {
            capacity: 1000,
            samples: 4,
            strategy: SampleStrategy::Uniform,
            alpha: 0.6,
            beta: 0.4,
            beta_increment: 0.001,
        }
    }
}

/// One replayed transition and its importance-sampling weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReplaySample {
    pub index: usize,
    pub transition: Transition,
    pub weight: f64,
}

/// Fixed-capacity ring buffer of transitions with a parallel priority array.
///
/// Once full, each [`ExperienceReplay::add`] overwrites the oldest slot.
#[derive(Clone, Debug)]
pub struct ExperienceReplay {
    buffer: Vec<Transition>,
    priorities: Vec<f64>,
    capacity: usize,
    write: usize,
    alpha: f64,
    beta: f64,
    beta_increment: f64,
    rng: StdRng,
}

impl ExperienceReplay {
    pub fn new(capacity: usize) -> Self {
        Self::from_config(
            &ReplayConfig {
                capacity,
                ..Default::default()
            },
            StdRng::from_entropy(),
        )
    }

    pub fn from_config(config: &ReplayConfig, rng: StdRng) -> Self {
        let capacity = config.capacity.max(1);
        ExperienceReplay {
            buffer: Vec::with_capacity(capacity),
            priorities: Vec::with_capacity(capacity),
            capacity,
            write: 0,
            alpha: config.alpha.max(0.0),
            beta: config.beta.clamp(0.0, 1.0),
            beta_increment: config.beta_increment.max(0.0),
            rng,
        }
    }

    pub fn add(&mut self, transition: Transition, priority: f64) {
        let priority = if priority.is_finite() { priority.max(0.0) } else { 0.0 };
        if self.buffer.len() < self.capacity {
            self.buffer.push(transition);
            self.priorities.push(priority);
        } else {
            self.buffer[self.write] = transition;
            self.priorities[self.write] = priority;
        }
        self.write = (self.write + 1) % self.capacity;
    }

    pub fn sample(&mut self, count: usize, strategy: SampleStrategy) -> Vec<ReplaySample> {
        if count == 0 || self.buffer.is_empty() {
            return Vec::new();
        }
        match strategy {
            SampleStrategy::Uniform => self.sample_uniform(count),
            SampleStrategy::Priority => {
                let samples = self.sample_prioritized(count);
                self.beta = (self.beta + self.beta_increment).min(1.0);
                samples
            }
        }
    }

    fn sample_uniform(&mut self, count: usize) -> Vec<ReplaySample> {
        (0..count)
            .map(|_| {
                let index = self.rng.gen_range(0..self.buffer.len());
                ReplaySample {
                    index,
                    transition: self.buffer[index],
                    weight: 1.0,
                }
            })
            .collect()
    }

    fn sample_prioritized(&mut self, count: usize) -> Vec<ReplaySample> {
        let scaled: Vec<f64> = self.priorities.iter().map(|p| p.powf(self.alpha)).collect();
        let total: f64 = scaled.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return self.sample_uniform(count);
        }
        let probs: Vec<f64> = scaled.iter().map(|s| s / total).collect();
        let max_weight = probs.iter().map(|p| p.powf(self.beta)).fold(0.0, f64::max);

        (0..count)
            .map(|_| {
                let index = sample_index(&probs, &mut self.rng);
                let weight = if max_weight > 0.0 {
                    probs[index].powf(self.beta) / max_weight
                } else {
                    1.0
                };
                ReplaySample {
                    index,
                    transition: self.buffer[index],
                    weight,
                }
            })
            .collect()
    }

    /// Patch a stored priority. Out-of-range indices are ignored.
    pub fn update_priority(&mut self, index: usize, priority: f64) {
        if let Some(slot) = self.priorities.get_mut(index) {
            if priority.is_finite() {
                *slot = priority.max(0.0);
            }
        }
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn priority(&self, index: usize) -> Option<f64> {
        self.priorities.get(index).copied()
    }

    /// Stored transitions in slot order.
    pub fn transitions(&self) -> &[Transition] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.priorities.clear();
        self.write = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, State};

    fn transition(reward: f64) -> Transition {
        Transition::new(State::new(0, 0), Action::Right, reward, State::new(1, 0), false)
    }

    fn buffer(capacity: usize) -> ExperienceReplay {
        ExperienceReplay::from_config(
            &ReplayConfig {
                capacity,
                ..Default::default()
            },
            StdRng::seed_from_u64(5),
        )
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut replay = buffer(2);
        for r in [1.0, 2.0, 3.0] {
            replay.add(transition(r), 1.0);
        }
        assert_eq!(replay.len(), 2);
        let mut rewards: Vec<f64> = replay.transitions().iter().map(|t| t.reward).collect();
        rewards.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(rewards, vec![2.0, 3.0]);
    }

    #[test]
    fn test_empty_and_zero_count() {
        let mut replay = buffer(4);
        assert!(replay.sample(3, SampleStrategy::Priority).is_empty());
        replay.add(transition(1.0), 1.0);
        let beta = replay.beta();
        assert!(replay.sample(0, SampleStrategy::Priority).is_empty());
        assert_eq!(replay.beta(), beta);
    }

    #[test]
    fn test_uniform_samples_with_replacement() {
        let mut replay = buffer(4);
        replay.add(transition(1.0), 1.0);
        let samples = replay.sample(5, SampleStrategy::Uniform);
        assert_eq!(samples.len(), 5);
        assert!(samples.iter().all(|s| s.index == 0 && s.weight == 1.0));
    }

    #[test]
    fn test_priority_weights_and_beta_annealing() {
        let mut replay = buffer(4);
        replay.add(transition(0.0), 1.0);
        replay.add(transition(1.0), 9.0);
        let beta = replay.beta();
        let samples = replay.sample(200, SampleStrategy::Priority);
        assert!((replay.beta() - (beta + 0.001)).abs() < 1e-12);
        let high = samples.iter().filter(|s| s.index == 1).count();
        assert!(high > 100);
        for sample in &samples {
            assert!(sample.weight > 0.0 && sample.weight <= 1.0);
        }
        assert!(samples.iter().any(|s| s.index == 1 && (s.weight - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_zero_priorities_fall_back_to_uniform() {
        let mut replay = buffer(4);
        replay.add(transition(0.0), 0.0);
        replay.add(transition(0.0), 0.0);
        let samples = replay.sample(10, SampleStrategy::Priority);
        assert_eq!(samples.len(), 10);
        assert!(samples.iter().all(|s| s.weight == 1.0));
    }

    #[test]
    fn test_update_priority() {
        let mut replay = buffer(4);
        replay.add(transition(0.0), 1.0);
        replay.update_priority(0, 5.0);
        replay.update_priority(9, 5.0);
        assert_eq!(replay.priority(0), Some(5.0));
        assert_eq!(replay.priority(9), None);
    }

    #[test]
    fn test_beta_never_exceeds_one() {
        let mut replay = ExperienceReplay::from_config(
            &ReplayConfig {
                beta: 0.999,
                beta_increment: 0.01,
                ..Default::default()
            },
            StdRng::seed_from_u64(0),
        );
        replay.add(transition(1.0), 1.0);
        replay.sample(1, SampleStrategy::Priority);
        assert_eq!(replay.beta(), 1.0);
    }
}
