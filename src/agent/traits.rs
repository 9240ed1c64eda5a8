use serde_json::Value;

use super::{AgentSnapshot, AgentType};
use crate::environment::MdpModel;
use crate::error::Result;
use crate::types::{Action, State, Transition, ACTION_COUNT};

/// Capability interface shared by every agent the trainer can drive.
///
/// Tabular agents implement it directly; anything else (for example an
/// agent backed by an external function approximator) only has to satisfy
/// this contract to be stepped by [`crate::trainer::Trainer`].
pub trait Agent: Send {
    fn agent_type(&self) -> AgentType;

    /// Select an action. With `update == false` the query is evaluation-only
    /// and must not touch visitation statistics.
    fn act(&mut self, state: State, update: bool) -> Action;

    /// Learn from one transition. `weight` is an importance-sampling weight
    /// (1.0 for on-line experience) scaling the step size.
    fn learn(&mut self, transition: &Transition, weight: f64);

    /// Called when an episode is cut short without a terminal transition.
    fn end_episode(&mut self) {}

    /// Forget everything learned so far.
    fn reset(&mut self);

    /// Give the agent a model of its environment. Planning agents compute
    /// their policy here; learning agents ignore it.
    fn attach_model(&mut self, _model: &dyn MdpModel) {}

    /// Whether replayed transitions may be fed through [`Agent::learn`].
    fn supports_replay(&self) -> bool {
        true
    }

    /// The per-action estimates the agent acts on for `state`.
    fn action_values(&mut self, state: State) -> [f64; ACTION_COUNT];

    /// Current exploration rate (0 for agents that do not explore by epsilon).
    fn exploration_rate(&self) -> f64;

    /// Patch one live hyperparameter by its persisted (camelCase) name.
    fn update_field(&mut self, key: &str, value: &Value) -> Result<()>;

    fn snapshot(&self) -> AgentSnapshot;
}
