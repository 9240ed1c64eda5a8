use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::agent::AgentType;
use crate::config::{AgentConfig, TrainerConfig};
use crate::environment::GridWorld;
use crate::replay_buffer::{ExperienceReplay, ReplayConfig, SampleStrategy};
use crate::trainer::Trainer;
use crate::types::{Action, State, Transition};

fn transition(i: usize) -> Transition {
    Transition::new(State::new(i, 0), Action::Right, i as f64, State::new(i + 1, 0), false)
}

fn seeded(capacity: usize) -> ExperienceReplay {
    let config = ReplayConfig {
        capacity,
        ..Default::default()
    };
    ExperienceReplay::from_config(&config, StdRng::seed_from_u64(11))
}

#[test]
fn test_replay_buffer_add_and_sample() {
    let mut buffer = seeded(10);
    buffer.add(transition(0), 1.0);
    assert_eq!(buffer.len(), 1);

    let samples = buffer.sample(3, SampleStrategy::Uniform);
    assert_eq!(samples.len(), 3);
    assert!(samples.iter().all(|s| s.transition == transition(0)));
}

#[test]
fn test_replay_buffer_capacity() {
    let mut buffer = seeded(3);
    for i in 0..5 {
        buffer.add(transition(i), 1.0);
    }
    assert_eq!(buffer.len(), 3);

    let mut kept: Vec<usize> = buffer.transitions().iter().map(|t| t.state.x).collect();
    kept.sort_unstable();
    assert_eq!(kept, vec![2, 3, 4]);
}

#[test]
fn test_sampling_only_returns_stored_transitions() {
    let mut buffer = seeded(8);
    for i in 0..4 {
        buffer.add(transition(i), (i + 1) as f64);
    }
    for strategy in [SampleStrategy::Uniform, SampleStrategy::Priority] {
        for sample in buffer.sample(50, strategy) {
            assert!(sample.index < buffer.len());
            assert_eq!(buffer.transitions()[sample.index], sample.transition);
            assert!(sample.weight > 0.0 && sample.weight <= 1.0);
        }
    }
}

#[test]
fn test_prioritized_weights_favor_rare_samples() {
    let mut buffer = seeded(4);
    buffer.add(transition(0), 10.0);
    buffer.add(transition(1), 0.1);

    let samples = buffer.sample(200, SampleStrategy::Priority);
    let frequent: Vec<_> = samples.iter().filter(|s| s.index == 0).collect();
    let rare: Vec<_> = samples.iter().filter(|s| s.index == 1).collect();
    assert!(frequent.len() > rare.len());

    // the most likely transition carries the largest weight
    for sample in &frequent {
        assert!((sample.weight - 1.0).abs() < 1e-12);
    }
    for sample in &rare {
        assert!(sample.weight < 1.0);
    }
}

#[test]
fn test_trainer_replay_respects_capacity() {
    let agent = AgentConfig::new(AgentType::QLearning).with_seed(2).build();
    let config = TrainerConfig {
        replay: Some(ReplayConfig {
            capacity: 16,
            samples: 2,
            strategy: SampleStrategy::Priority,
            ..Default::default()
        }),
        seed: Some(2),
        ..Default::default()
    };
    let mut trainer = Trainer::new(Box::new(agent), Box::new(GridWorld::new(4)), &config);
    trainer.run_steps(100);

    let replay = trainer.replay().expect("replay configured");
    assert_eq!(replay.len(), 16);
    assert!(replay.beta() > ReplayConfig::default().beta);
}

#[test]
fn test_monte_carlo_skips_replay() {
    let agent = AgentConfig::new(AgentType::MonteCarlo).with_seed(4).build();
    let config = TrainerConfig {
        replay: Some(ReplayConfig {
            capacity: 32,
            samples: 4,
            strategy: SampleStrategy::Priority,
            ..Default::default()
        }),
        seed: Some(4),
        ..Default::default()
    };
    let mut trainer = Trainer::new(Box::new(agent), Box::new(GridWorld::new(3)), &config);
    trainer.run_steps(10);

    // transitions are still stored, but never sampled
    let replay = trainer.replay().expect("replay configured");
    assert_eq!(replay.len(), 10);
    assert_eq!(replay.beta(), ReplayConfig::default().beta);
}
