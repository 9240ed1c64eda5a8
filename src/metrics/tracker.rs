use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;

/// Live counters of the episode in progress, as reported with every
/// progress event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// 1-based episode counter
    pub episode: usize,
    /// Steps taken in the current episode
    pub steps: usize,
    pub cumulative_reward: f64,
    /// Exploration rate of the agent after the latest step
    pub epsilon: f64,
}

impl Default for Metrics {
    fn default() -> Self {
        Metrics {
            episode: 1,
            steps: 0,
            cumulative_reward: 0.0,
            epsilon: 0.0,
        }
    }
}

/// Finished-episode history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeHistory {
    pub episode_rewards: VecDeque<f64>,
    pub episode_lengths: VecDeque<usize>,
}

/// Tracks metrics during training
#[derive(Debug, Clone)]
pub struct MetricsTracker {
    current: Metrics,
    history: EpisodeHistory,
    history_size: usize,
    total_steps: usize,
}

impl MetricsTracker {
    pub fn new(history_size: usize) -> Self {
        MetricsTracker {
            current: Metrics::default(),
            history: EpisodeHistory::default(),
            history_size: history_size.max(1),
            total_steps: 0,
        }
    }

    /// Record a step within the current episode
    pub fn record_step(&mut self, reward: f64, epsilon: f64) {
        self.current.steps += 1;
        self.current.cumulative_reward += reward;
        self.current.epsilon = epsilon;
        self.total_steps += 1;
    }

    /// Close the current episode and start the next one. The exploration
    /// rate carries over.
    pub fn next_episode(&mut self) {
        if self.history.episode_rewards.len() >= self.history_size {
            self.history.episode_rewards.pop_front();
        }
        self.history.episode_rewards.push_back(self.current.cumulative_reward);

        if self.history.episode_lengths.len() >= self.history_size {
            self.history.episode_lengths.pop_front();
        }
        self.history.episode_lengths.push_back(self.current.steps);

        log::debug!(
            "episode {} finished: {} steps, reward {:.3}",
            self.current.episode,
            self.current.steps,
            self.current.cumulative_reward
        );

        self.current = Metrics {
            episode: self.current.episode + 1,
            steps: 0,
            cumulative_reward: 0.0,
            epsilon: self.current.epsilon,
        };
    }

    /// Back to episode 1 with an empty history.
    pub fn reset(&mut self, epsilon: f64) {
        self.current = Metrics {
            epsilon,
            ..Metrics::default()
        };
        self.history = EpisodeHistory::default();
        self.total_steps = 0;
    }

    pub fn current(&self) -> Metrics {
        self.current
    }

    pub fn history(&self) -> &EpisodeHistory {
        &self.history
    }

    /// Number of finished episodes still in the history
    pub fn episodes_recorded(&self) -> usize {
        self.history.episode_rewards.len()
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Get recent average episode reward
    pub fn avg_episode_reward(&self, window: usize) -> Option<f64> {
        let rewards = &self.history.episode_rewards;
        if rewards.is_empty() || window == 0 {
            return None;
        }
        let n = window.min(rewards.len());
        let sum: f64 = rewards.iter().rev().take(n).sum();
        Some(sum / n as f64)
    }

    pub fn avg_episode_length(&self, window: usize) -> Option<f64> {
        let lengths = &self.history.episode_lengths;
        if lengths.is_empty() || window == 0 {
            return None;
        }
        let n = window.min(lengths.len());
        let sum: usize = lengths.iter().rev().take(n).sum();
        Some(sum as f64 / n as f64)
    }

    /// Save the episode history to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::error::Result<()> {
        let serialized = serde_json::to_string_pretty(&self.history)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// Load an episode history from file
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> crate::error::Result<()> {
        let data = std::fs::read_to_string(path)?;
        self.history = serde_json::from_str(&data)?;
        Ok(())
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new(1000)
    }
}
