use gridmind::{
    agent::{Agent, AgentType},
    config::{AgentConfig, TrainerConfig},
    environment::GridWorld,
    replay_buffer::{ExperienceReplay, SampleStrategy},
    trainer::Trainer,
    types::{Action, State, Transition},
};
use std::time::Instant;

fn benchmark_operation<F>(name: &str, iterations: usize, mut operation: F)
where
    F: FnMut(),
{
    let start = Instant::now();
    for _ in 0..iterations {
        operation();
    }
    let duration = start.elapsed();
    let avg_time = duration.as_micros() as f64 / iterations as f64;
    println!("{}: {:.2} μs per iteration ({} iterations)", name, avg_time, iterations);
}

#[test]
#[ignore] // Run with: cargo test --ignored benchmark
fn benchmark_agent_updates() {
    let transition = Transition::new(State::new(3, 3), Action::Right, -0.01, State::new(4, 3), false);
    for agent_type in AgentType::ALL {
        if agent_type.is_planner() {
            continue;
        }
        let mut agent = AgentConfig::new(agent_type).with_seed(0).build();
        benchmark_operation(&format!("{} act + learn", agent_type), 10_000, || {
            agent.act(transition.state, true);
            agent.learn(&transition, 1.0);
        });
    }
}

#[test]
#[ignore]
fn benchmark_value_iteration() {
    for size in [8, 16, 32] {
        let env = GridWorld::new(size);
        let mut agent = AgentConfig::new(AgentType::ValueIteration).build();
        benchmark_operation(&format!("Value iteration {}x{}", size, size), 10, || {
            agent.attach_model(&env);
        });
    }
}

#[test]
#[ignore]
fn benchmark_replay_sampling() {
    let mut buffer = ExperienceReplay::new(10_000);
    for i in 0..10_000 {
        let t = Transition::new(State::new(i % 32, i / 32 % 32), Action::Down, (i % 7) as f64, State::new(0, 0), false);
        buffer.add(t, (i % 13) as f64 + 0.01);
    }

    benchmark_operation("Uniform sample (batch=32)", 1000, || {
        let _ = buffer.sample(32, SampleStrategy::Uniform);
    });
    benchmark_operation("Prioritized sample (batch=32)", 100, || {
        let _ = buffer.sample(32, SampleStrategy::Priority);
    });
}

#[test]
#[ignore]
fn benchmark_trainer_steps() {
    let agent = AgentConfig::new(AgentType::DynaQ).with_seed(1).build();
    let config = TrainerConfig {
        seed: Some(1),
        ..Default::default()
    };
    let mut trainer = Trainer::new(Box::new(agent), Box::new(GridWorld::new(10)), &config);

    benchmark_operation("Dyna-Q trainer step (10x10)", 10_000, || {
        trainer.step();
    });
}
