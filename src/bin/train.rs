use std::path::PathBuf;

use clap::Parser;

use gridmind::agent::AgentType;
use gridmind::config::ExperimentConfig;
use gridmind::error::Result;
use gridmind::metrics::Statistics;
use gridmind::trainer::Trainer;

/// Run a headless tabular RL experiment on a grid world.
#[derive(Parser)]
#[command(name = "train", about = "Train a tabular agent on a grid world")]
struct Cli {
    /// Path to JSON experiment file
    #[arg(long, default_value = "experiment.json")]
    config: PathBuf,

    /// Override the agent type (e.g. q-learning, dyna-q, value-iteration)
    #[arg(long)]
    agent: Option<AgentType>,

    /// Override number of training episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Override grid size
    #[arg(long)]
    size: Option<usize>,

    /// Seed both the agent and the environment
    #[arg(long)]
    seed: Option<u64>,

    /// Give up after this many steps in total
    #[arg(long, default_value_t = 1_000_000)]
    max_steps: usize,

    /// Log a summary every N episodes
    #[arg(long, default_value_t = 50)]
    report_every: usize,

    /// Write the trained agent's snapshot here
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the effective experiment configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = ExperimentConfig::load_or_default(&cli.config)?;
    if let Some(agent_type) = cli.agent {
        config.agent.agent_type = agent_type;
    }
    if let Some(episodes) = cli.episodes {
        config.episodes = episodes;
    }
    if let Some(size) = cli.size {
        config.environment.size = size;
    }
    if let Some(seed) = cli.seed {
        config.agent.seed = Some(seed);
        config.trainer.seed = Some(seed);
    }

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    log::info!(
        "training {} for {} episodes on a {}x{} '{}' grid",
        config.agent.agent_type,
        config.episodes,
        config.environment.size,
        config.environment.size,
        config.environment.scenario_id
    );

    let mut trainer = Trainer::from_experiment(&config);
    let report_every = cli.report_every.max(1);
    let mut finished = 0;
    let mut steps_left = cli.max_steps;
    while finished < config.episodes && steps_left > 0 {
        let before = trainer.metrics().total_steps();
        let batch = report_every.min(config.episodes - finished);
        finished += trainer.run_episodes(batch, steps_left);
        steps_left = steps_left.saturating_sub(trainer.metrics().total_steps() - before);

        let metrics = trainer.metrics();
        log::info!(
            "episode {:>6} | avg reward {:>8.3} | avg length {:>7.1} | epsilon {:.3}",
            finished,
            metrics.avg_episode_reward(report_every).unwrap_or(0.0),
            metrics.avg_episode_length(report_every).unwrap_or(0.0),
            trainer.agent().exploration_rate()
        );
    }
    if finished < config.episodes {
        log::warn!("stopped after {} of {} episodes: step budget exhausted", finished, config.episodes);
    }

    let history = trainer.metrics().history();
    let rewards = Statistics::from_values(history.episode_rewards.iter().copied());
    let lengths = Statistics::from_values(history.episode_lengths.iter().map(|&l| l as f64));
    println!("episodes: {}", rewards.count);
    println!(
        "reward:   mean {:.3}  std {:.3}  min {:.3}  max {:.3}",
        rewards.mean, rewards.std, rewards.min, rewards.max
    );
    println!(
        "length:   mean {:.1}  std {:.1}  min {:.0}  max {:.0}",
        lengths.mean, lengths.std, lengths.min, lengths.max
    );

    if let Some(path) = cli.output {
        let snapshot = trainer.agent_snapshot();
        std::fs::write(&path, serde_json::to_string_pretty(&snapshot)?)?;
        log::info!("agent snapshot written to {}", path.display());
    }
    Ok(())
}
