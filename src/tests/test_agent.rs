use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

use crate::agent::{Agent, AgentKind, AgentType};
use crate::config::{AgentConfig, TrainerConfig};
use crate::environment::{Environment, GridWorld};
use crate::policy::PolicyKind;
use crate::trainer::Trainer;
use crate::types::{Action, State, Transition};

fn greedy(agent_type: AgentType) -> AgentKind {
    AgentConfig::new(agent_type)
        .with_policy(PolicyKind::Greedy)
        .with_seed(5)
        .build()
}

/// Follow the agent's evaluation policy from the start cell and return the
/// number of steps it needed to reach the goal.
fn greedy_path_length(agent: &mut dyn Agent, env: &mut GridWorld, cap: usize) -> Option<usize> {
    let mut state = env.reset();
    for step in 1..=cap {
        let outcome = env.step(agent.act(state, false));
        if outcome.done {
            return Some(step);
        }
        state = outcome.state;
    }
    None
}

#[test]
fn test_fresh_agents_break_ties_toward_up() {
    for agent_type in AgentType::ALL {
        if agent_type.is_planner() || agent_type == AgentType::ActorCritic {
            continue;
        }
        let mut agent = greedy(agent_type);
        assert_eq!(agent.act(State::new(2, 2), false), Action::Up, "{}", agent_type);
    }
}

#[test]
fn test_unknown_field_is_rejected_everywhere() {
    for agent_type in AgentType::ALL {
        let mut agent = AgentConfig::new(agent_type).with_seed(1).build();
        assert!(agent.update_field("noSuchField", &json!(1.0)).is_err(), "{}", agent_type);
        assert!(agent.update_field("gamma", &json!("high")).is_err(), "{}", agent_type);
    }
}

#[test]
fn test_gamma_update_is_normalized() {
    let mut agent = AgentConfig::new(AgentType::Sarsa).with_seed(1).build();
    agent.update_field("gamma", &json!(0.5)).unwrap();
    assert_eq!(agent.snapshot().params.gamma, 0.5);

    agent.update_field("gamma", &json!(1.5)).unwrap();
    assert_eq!(agent.snapshot().params.gamma, 0.9);
}

#[test]
fn test_reset_forgets_learned_values() {
    let transition = Transition::new(State::new(0, 0), Action::Right, 1.0, State::new(1, 0), true);
    for agent_type in AgentType::ALL {
        if agent_type.is_planner() {
            continue;
        }
        let mut agent = AgentConfig::new(agent_type).with_seed(3).build();
        let fresh = agent.action_values(State::new(0, 0));
        agent.learn(&transition, 1.0);
        agent.end_episode();
        agent.reset();
        assert_eq!(agent.action_values(State::new(0, 0)), fresh, "{}", agent_type);
    }
}

#[test]
fn test_learning_agents_find_the_goal() {
    let learners = [
        AgentType::QLearning,
        AgentType::Sarsa,
        AgentType::ExpectedSarsa,
        AgentType::DoubleQ,
        AgentType::DynaQ,
        AgentType::QLambda,
        AgentType::Optimistic,
    ];
    for agent_type in learners {
        let agent = AgentConfig::new(agent_type).with_seed(21).build();
        let config = TrainerConfig {
            max_episode_steps: Some(100),
            seed: Some(21),
            ..Default::default()
        };
        let mut trainer = Trainer::new(Box::new(agent), Box::new(GridWorld::new(3)), &config);
        trainer.run_episodes(500, 100_000);

        let mut agent = AgentKind::from_snapshot(&trainer.agent_snapshot(), StdRng::seed_from_u64(0));
        agent.update_field("policy", &json!("greedy")).unwrap();
        let mut env = GridWorld::new(3);
        let length = greedy_path_length(&mut agent, &mut env, 20);
        assert_eq!(length, Some(4), "{} did not learn the shortest path", agent_type);
    }
}

#[test]
fn test_planners_act_optimally_without_training() {
    for agent_type in [AgentType::ValueIteration, AgentType::PolicyIteration] {
        let mut env = GridWorld::new(5);
        env.toggle_obstacle(1, 0);
        env.toggle_obstacle(1, 1);
        let mut agent = AgentConfig::new(agent_type).build();
        agent.attach_model(&env);
        assert_eq!(greedy_path_length(&mut agent, &mut env, 50), Some(8), "{}", agent_type);
    }
}

#[test]
fn test_snapshot_restores_identical_values() {
    let transition = Transition::new(State::new(1, 1), Action::Down, 0.5, State::new(1, 2), false);
    for agent_type in AgentType::ALL {
        let mut agent = AgentConfig::new(agent_type).with_seed(8).build();
        for _ in 0..5 {
            agent.learn(&transition, 1.0);
        }
        let restored = AgentKind::from_json(&agent.to_json().unwrap()).unwrap();
        assert_eq!(restored.agent_type(), agent_type);
        assert_eq!(restored.snapshot(), agent.snapshot(), "{}", agent_type);
    }
}
