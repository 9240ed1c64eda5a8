//! # Gridmind - Tabular Reinforcement Learning Experiments
//!
//! Gridmind is a small engine for running tabular reinforcement-learning
//! experiments on grid worlds. It bundles a family of interchangeable
//! agents, configurable grid environments, and a trainer that steps the two
//! together either synchronously or on a background worker thread.
//!
//! ## Key Features
//!
//! - **Agents**: Q-learning, SARSA, Expected SARSA, Double Q, Dyna-Q, Q(λ),
//!   Monte Carlo, optimistic Q-learning, actor-critic, and value / policy
//!   iteration planners
//! - **Policies**: epsilon-greedy, greedy, softmax, UCB, Thompson sampling
//! - **Environments**: grid worlds with obstacles, windy columns, moving goals
//!   and per-cell reward bonuses
//! - **Replay**: bounded uniform or prioritized experience replay
//! - **Persistence**: JSON snapshots of agents and environments
//!
//! ## Quick Start
//!
//! ```rust
//! use gridmind::agent::AgentType;
//! use gridmind::config::{AgentConfig, TrainerConfig};
//! use gridmind::environment::GridWorld;
//! use gridmind::trainer::Trainer;
//!
//! let agent = AgentConfig::new(AgentType::QLearning).with_seed(1).build();
//! let env = GridWorld::new(5);
//! let mut trainer = Trainer::new(Box::new(agent), Box::new(env), &TrainerConfig::default());
//!
//! trainer.run_episodes(10, 10_000);
//! println!("average reward: {:?}", trainer.metrics().avg_episode_reward(10));
//! ```
//!
//! ## Module Organization
//!
//! - [`agent`] - Agents, the [`agent::Agent`] trait and agent snapshots
//! - [`config`] - Serializable agent, trainer and experiment configuration
//! - [`environment`] - Grid worlds, scenarios and the MDP model contract
//! - [`error`] - Error types and result handling
//! - [`metrics`] - Episode metrics and history
//! - [`policy`] - Action selection policies
//! - [`replay_buffer`] - Experience replay
//! - [`trainer`] - Step loop, lifecycle and the background worker
//! - [`types`] - States, actions and transitions

#[macro_use]
pub mod macros;

pub mod agent;
pub mod config;
pub mod environment;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod replay_buffer;
pub mod trainer;
pub mod types;

#[cfg(test)]
mod tests;
