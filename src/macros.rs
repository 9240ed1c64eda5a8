/// Forward a method call to whichever agent an [`crate::agent::AgentKind`]
/// holds.
///
/// ```ignore
/// dispatch_agent!(self, agent => agent.act(state, update))
/// ```
///
/// expands to a `match` over every variant binding the inner agent to
/// `agent` and evaluating the expression against it.
#[macro_export]
macro_rules! dispatch_agent {
    ($value:expr, $agent:ident => $body:expr) => {
        match $value {
            $crate::agent::AgentKind::QLearning($agent) => $body,
            $crate::agent::AgentKind::Sarsa($agent) => $body,
            $crate::agent::AgentKind::ExpectedSarsa($agent) => $body,
            $crate::agent::AgentKind::DoubleQ($agent) => $body,
            $crate::agent::AgentKind::DynaQ($agent) => $body,
            $crate::agent::AgentKind::QLambda($agent) => $body,
            $crate::agent::AgentKind::MonteCarlo($agent) => $body,
            $crate::agent::AgentKind::Optimistic($agent) => $body,
            $crate::agent::AgentKind::ActorCritic($agent) => $body,
            $crate::agent::AgentKind::ValueIteration($agent) => $body,
            $crate::agent::AgentKind::PolicyIteration($agent) => $body,
        }
    };
}
