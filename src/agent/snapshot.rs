use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::table::TableDump;
use super::tabular::Hyperparameters;
use super::{
    ActorCriticAgent, AgentKind, AgentType, DoubleQAgent, DynaQAgent, ExpectedSarsaAgent,
    MonteCarloAgent, OptimisticAgent, PolicyIterationAgent, QLambdaAgent, QLearningAgent,
    SarsaAgent, ValueIterationAgent,
};
use crate::error::Result;
use crate::types::{Action, State};

/// One remembered transition of a Dyna-Q model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    pub state: State,
    pub action: Action,
    pub next_state: State,
    pub reward: f64,
    pub done: bool,
}

/// Persisted form of any agent, discriminated by `type`.
///
/// Tables are plain `{"x,y": [..4 values..]}` maps. Every table and
/// variant-specific field is optional: a missing table restores as empty and
/// a missing field takes its default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSnapshot {
    #[serde(rename = "type")]
    pub agent_type: String,
    #[serde(flatten)]
    pub params: Hyperparameters,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub q_table: Option<TableDump>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit_counts: Option<TableDump>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q_table_b: Option<TableDump>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traces: Option<TableDump>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_counts: Option<TableDump>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<TableDump>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<TableDump>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<Vec<ModelEntry>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lambda: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planning_steps: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_learning_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_evaluation_iterations: Option<usize>,
}

impl AgentSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl AgentKind {
    /// Rebuild an agent from its snapshot, dispatching on `type`. Unknown
    /// types restore as a Q-learning agent.
    pub fn from_snapshot(snapshot: &AgentSnapshot, rng: StdRng) -> Self {
        let agent_type = snapshot.agent_type.parse().unwrap_or_else(|_| {
            log::warn!("unknown agent type '{}', restoring as q-learning", snapshot.agent_type);
            AgentType::QLearning
        });
        match agent_type {
            AgentType::QLearning => AgentKind::QLearning(QLearningAgent::restore(snapshot, rng)),
            AgentType::Sarsa => AgentKind::Sarsa(SarsaAgent::restore(snapshot, rng)),
            AgentType::ExpectedSarsa => AgentKind::ExpectedSarsa(ExpectedSarsaAgent::restore(snapshot, rng)),
            AgentType::DoubleQ => AgentKind::DoubleQ(DoubleQAgent::restore(snapshot, rng)),
            AgentType::DynaQ => AgentKind::DynaQ(DynaQAgent::restore(snapshot, rng)),
            AgentType::QLambda => AgentKind::QLambda(QLambdaAgent::restore(snapshot, rng)),
            AgentType::MonteCarlo => AgentKind::MonteCarlo(MonteCarloAgent::restore(snapshot, rng)),
            AgentType::Optimistic => AgentKind::Optimistic(OptimisticAgent::restore(snapshot, rng)),
            AgentType::ActorCritic => AgentKind::ActorCritic(ActorCriticAgent::restore(snapshot, rng)),
            AgentType::ValueIteration => AgentKind::ValueIteration(ValueIterationAgent::restore(snapshot)),
            AgentType::PolicyIteration => AgentKind::PolicyIteration(PolicyIterationAgent::restore(snapshot)),
        }
    }

    /// Serialize the agent to its JSON snapshot.
    pub fn to_json(&self) -> Result<String> {
        use super::Agent;
        self.snapshot().to_json()
    }

    /// Restore an agent from JSON text with a fresh random source.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot = AgentSnapshot::from_json(json)?;
        Ok(Self::from_snapshot(&snapshot, StdRng::from_entropy()))
    }

    /// Save the agent to disk
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load agent from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;

    #[test]
    fn test_unknown_type_falls_back_to_q_learning() {
        let agent = AgentKind::from_json(r#"{"type": "deep-transformer", "gamma": 0.5}"#).unwrap();
        assert_eq!(agent.agent_type(), AgentType::QLearning);
    }

    #[test]
    fn test_missing_tables_are_empty() {
        let agent = AgentKind::from_json(r#"{"type": "double-q"}"#).unwrap();
        match agent {
            AgentKind::DoubleQ(agent) => {
                assert!(agent.base().q.is_empty());
                assert!(agent.table_b().is_empty());
            }
            other => panic!("expected double-q, got {:?}", other.agent_type()),
        }
    }

    #[test]
    fn test_schema_field_names() {
        let json = r#"{"type":"q-lambda","epsilon":0.3,"learningRate":0.2,"lambda":0.7,
                       "qTable":{"1,2":[1,2,3,4]}}"#;
        let snapshot = AgentSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.params.epsilon, 0.3);
        assert_eq!(snapshot.params.learning_rate, 0.2);
        assert_eq!(snapshot.lambda, Some(0.7));
        assert_eq!(snapshot.q_table.unwrap().get("1,2"), Some(&vec![1.0, 2.0, 3.0, 4.0]));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(AgentKind::from_json("{not json").is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.json");
        let agent = AgentKind::from_json(r#"{"type":"sarsa","qTable":{"0,0":[0,1,0,0]}}"#).unwrap();
        agent.save(&path).unwrap();
        let loaded = AgentKind::load(&path).unwrap();
        assert_eq!(loaded.agent_type(), AgentType::Sarsa);
    }
}
