use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

use crate::agent::{Agent, AgentKind, AgentType, Hyperparameters};
use crate::config::{AgentConfig, TrainerConfig};
use crate::environment::{Environment, EnvironmentSnapshot, GridWorld, RewardConfig, DEFAULT_SIZE};
use crate::policy::{softmax, PolicyKind};
use crate::trainer::Trainer;
use crate::types::{Action, State, Transition};

#[test]
fn test_hyperparameter_extremes() {
    let params = Hyperparameters {
        epsilon: f64::NAN,
        gamma: 1.0,
        learning_rate: 0.0,
        epsilon_decay: -1.0,
        min_epsilon: 2.0,
        temperature: f64::INFINITY,
        ucb_c: -3.0,
        ..Default::default()
    }
    .normalized();
    let defaults = Hyperparameters::default();

    assert_eq!(params.gamma, defaults.gamma);
    assert_eq!(params.learning_rate, defaults.learning_rate);
    assert_eq!(params.epsilon_decay, defaults.epsilon_decay);
    assert_eq!(params.min_epsilon, defaults.min_epsilon);
    assert_eq!(params.epsilon, defaults.epsilon);
    assert_eq!(params.temperature, defaults.temperature);
    assert_eq!(params.ucb_c, defaults.ucb_c);
}

#[test]
fn test_epsilon_never_below_minimum() {
    let params = Hyperparameters {
        epsilon: 0.01,
        min_epsilon: 0.2,
        ..Default::default()
    }
    .normalized();
    assert_eq!(params.epsilon, 0.2);
}

#[test]
fn test_out_of_range_grid_sizes() {
    for size in [0, 1, 1000] {
        assert_eq!(GridWorld::new(size).size(), DEFAULT_SIZE);
    }
    assert_eq!(GridWorld::new(2).size(), 2);
}

#[test]
fn test_non_finite_rewards_fall_back() {
    let mut env = GridWorld::new(3);
    env.set_reward_config(RewardConfig {
        step_penalty: f64::NAN,
        obstacle_penalty: -2.0,
        goal_reward: f64::NEG_INFINITY,
    });
    let rewards = env.reward_config();
    assert_eq!(rewards.step_penalty, RewardConfig::default().step_penalty);
    assert_eq!(rewards.obstacle_penalty, -2.0);
    assert_eq!(rewards.goal_reward, RewardConfig::default().goal_reward);
}

#[test]
fn test_unknown_scenario_loads_as_basic() {
    let snapshot: EnvironmentSnapshot =
        serde_json::from_str(r#"{"size": 4, "scenarioId": "lava", "scenarioConfig": {"x": 1}}"#).unwrap();
    let env = GridWorld::from_snapshot(&snapshot, StdRng::seed_from_u64(0));
    assert_eq!(env.scenario().id(), "basic");
    assert_eq!(env.goal(), State::new(3, 3));
}

#[test]
fn test_malformed_table_keys_are_skipped() {
    let agent = AgentKind::from_json(
        r#"{"type": "q-learning", "qTable": {"1,1": [0, 2, 0, 0], "oops": [1, 1, 1, 1], "2,2": [1]}}"#,
    )
    .unwrap();
    let table = agent.snapshot().q_table.unwrap_or_default();
    assert!(table.contains_key("1,1"));
    assert!(!table.contains_key("oops"));
}

#[test]
fn test_unknown_agent_type_is_an_error_when_parsed() {
    assert!("deep-q".parse::<AgentType>().is_err());
    assert_eq!("q-lambda".parse::<AgentType>().unwrap(), AgentType::QLambda);
}

#[test]
fn test_softmax_with_extreme_values() {
    let probs = softmax(&[1e300, -1e300, 0.0, 0.0], 1.0).unwrap();
    assert!(probs.iter().all(|p| p.is_finite()));
    assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    assert!(softmax(&[1.0, 2.0, 3.0, 4.0], 0.0).is_none());
}

#[test]
fn test_zero_weight_learning_is_a_no_op() {
    let transition = Transition::new(State::new(0, 0), Action::Right, 1.0, State::new(1, 0), true);
    let mut agent = AgentConfig::new(AgentType::QLearning).with_seed(0).build();
    agent.learn(&transition, 0.0);
    assert_eq!(agent.action_values(State::new(0, 0)), [0.0; 4]);
}

#[test]
fn test_toggle_start_or_goal_is_refused() {
    let agent = AgentConfig::new(AgentType::ValueIteration).build();
    let mut trainer = Trainer::new(Box::new(agent), Box::new(GridWorld::new(4)), &TrainerConfig::default());
    assert!(!trainer.toggle_obstacle(0, 0));
    assert!(!trainer.toggle_obstacle(3, 3));
    assert!(!trainer.toggle_obstacle(9, 9));
    assert!(trainer.toggle_obstacle(2, 1));
    assert!(trainer.environment().is_obstacle(2, 1));
}

#[test]
fn test_policy_field_rejects_unknown_names() {
    let mut agent = AgentConfig::new(AgentType::Sarsa).with_seed(0).build();
    assert!(agent.update_field("policy", &json!("boltzmann-ish")).is_err());
    agent.update_field("policy", &json!("ucb")).unwrap();
    assert_eq!(agent.snapshot().params.policy, PolicyKind::Ucb);
}
