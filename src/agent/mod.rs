//! # Agents
//!
//! Every agent in this module learns (or plans) over the tabular grid MDPs in
//! [`crate::environment`] and implements the [`Agent`] trait the trainer
//! drives.
//!
//! ## Available Agents
//!
//! Value-based, all sharing [`TabularBase`]:
//!
//! - **QLearningAgent**: off-policy one-step Q-learning
//! - **SarsaAgent**: on-policy, bootstraps from the action its policy would take
//! - **ExpectedSarsaAgent**: bootstraps from the epsilon-greedy expectation
//! - **DoubleQAgent**: two tables updated alternately to curb maximization bias
//! - **DynaQAgent**: Q-learning plus synthetic updates from a learned model
//! - **QLambdaAgent**: Q-learning with accumulating eligibility traces
//! - **MonteCarloAgent**: first-visit Monte Carlo control
//! - **OptimisticAgent**: Q-learning with optimistic initial values
//!
//! Policy-gradient:
//!
//! - **ActorCriticAgent**: tabular critic plus softmax actor
//!
//! Planning (need an [`crate::environment::MdpModel`]):
//!
//! - **ValueIterationAgent**
//! - **PolicyIterationAgent**
//!
//! [`AgentKind`] is the closed union of all of them; it is what
//! [`crate::config::AgentConfig::build`] and [`AgentKind::from_snapshot`]
//! return.

mod traits;
mod table;
mod tabular;
mod snapshot;

mod q_learning;
mod sarsa;
mod expected_sarsa;
mod double_q;
mod dyna_q;
mod q_lambda;
mod monte_carlo;
mod optimistic;
mod actor_critic;
mod planning;

pub use traits::Agent;
pub use table::{ActionTable, TableDump, TableValue};
pub use tabular::{Hyperparameters, TabularBase};
pub use snapshot::{AgentSnapshot, ModelEntry};

pub use q_learning::QLearningAgent;
pub use sarsa::SarsaAgent;
pub use expected_sarsa::ExpectedSarsaAgent;
pub use double_q::DoubleQAgent;
pub use dyna_q::DynaQAgent;
pub use q_lambda::QLambdaAgent;
pub use monte_carlo::MonteCarloAgent;
pub use optimistic::OptimisticAgent;
pub use actor_critic::ActorCriticAgent;
pub use planning::{PolicyIterationAgent, ValueIterationAgent};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::environment::MdpModel;
use crate::error::{GridmindError, Result};
use crate::types::{Action, State, Transition, ACTION_COUNT};

/// Discriminator of every agent variant, as persisted in `type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentType {
    QLearning,
    Sarsa,
    ExpectedSarsa,
    DoubleQ,
    DynaQ,
    QLambda,
    MonteCarlo,
    Optimistic,
    ActorCritic,
    ValueIteration,
    PolicyIteration,
}

impl AgentType {
    pub const ALL: [AgentType; 11] = [
        AgentType::QLearning,
        AgentType::Sarsa,
        AgentType::ExpectedSarsa,
        AgentType::DoubleQ,
        AgentType::DynaQ,
        AgentType::QLambda,
        AgentType::MonteCarlo,
        AgentType::Optimistic,
        AgentType::ActorCritic,
        AgentType::ValueIteration,
        AgentType::PolicyIteration,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AgentType::QLearning => "q-learning",
            AgentType::Sarsa => "sarsa",
            AgentType::ExpectedSarsa => "expected-sarsa",
            AgentType::DoubleQ => "double-q",
            AgentType::DynaQ => "dyna-q",
            AgentType::QLambda => "q-lambda",
            AgentType::MonteCarlo => "monte-carlo",
            AgentType::Optimistic => "optimistic",
            AgentType::ActorCritic => "actor-critic",
            AgentType::ValueIteration => "value-iteration",
            AgentType::PolicyIteration => "policy-iteration",
        }
    }

    pub fn is_planner(self) -> bool {
        matches!(self, AgentType::ValueIteration | AgentType::PolicyIteration)
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AgentType {
    type Err = GridmindError;

    fn from_str(s: &str) -> Result<Self> {
        AgentType::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| GridmindError::invalid_parameter("type", format!("unknown agent type '{}'", s)))
    }
}

/// Closed union of every built-in agent.
#[derive(Clone, Debug)]
pub enum AgentKind {
    QLearning(QLearningAgent),
    Sarsa(SarsaAgent),
    ExpectedSarsa(ExpectedSarsaAgent),
    DoubleQ(DoubleQAgent),
    DynaQ(DynaQAgent),
    QLambda(QLambdaAgent),
    MonteCarlo(MonteCarloAgent),
    Optimistic(OptimisticAgent),
    ActorCritic(ActorCriticAgent),
    ValueIteration(ValueIterationAgent),
    PolicyIteration(PolicyIterationAgent),
}

impl Agent for AgentKind {
    fn agent_type(&self) -> AgentType {
        dispatch_agent!(self, agent => agent.agent_type())
    }

    fn act(&mut self, state: State, update: bool) -> Action {
        dispatch_agent!(self, agent => agent.act(state, update))
    }

    fn learn(&mut self, transition: &Transition, weight: f64) {
        dispatch_agent!(self, agent => agent.learn(transition, weight))
    }

    fn end_episode(&mut self) {
        dispatch_agent!(self, agent => agent.end_episode())
    }

    fn reset(&mut self) {
        dispatch_agent!(self, agent => agent.reset())
    }

    fn attach_model(&mut self, model: &dyn MdpModel) {
        dispatch_agent!(self, agent => agent.attach_model(model))
    }

    fn supports_replay(&self) -> bool {
        dispatch_agent!(self, agent => agent.supports_replay())
    }

    fn action_values(&mut self, state: State) -> [f64; ACTION_COUNT] {
        dispatch_agent!(self, agent => agent.action_values(state))
    }

    fn exploration_rate(&self) -> f64 {
        dispatch_agent!(self, agent => agent.exploration_rate())
    }

    fn update_field(&mut self, key: &str, value: &Value) -> Result<()> {
        dispatch_agent!(self, agent => agent.update_field(key, value))
    }

    fn snapshot(&self) -> AgentSnapshot {
        dispatch_agent!(self, agent => agent.snapshot())
    }
}
