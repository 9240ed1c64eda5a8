//! Hosts a [`Trainer`] on its own thread behind a command/event channel
//! pair.
//!
//! While the trainer is running the worker waits on the command channel
//! with the next step's deadline; a step is only scheduled once the previous
//! one has returned, so commands and steps are applied strictly in order and
//! events come back in the order they were produced.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::{Progress, Trainer};
use crate::agent::{AgentSnapshot, AgentType};
use crate::config::AgentConfig;
use crate::environment::{normalize_size, Environment, EnvironmentSnapshot, GridWorld};
use crate::error::{GridmindError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TrainerCommand {
    /// Apply an agent/environment description. Idempotent when the agent
    /// type and grid size are unchanged: only hyperparameters are patched.
    Configure {
        agent: AgentConfig,
        environment: EnvironmentSnapshot,
        #[serde(rename = "intervalMs", default)]
        interval_ms: Option<u64>,
    },
    Start,
    Pause,
    Reset,
    SetInterval {
        ms: u64,
    },
    UpdateAgentField {
        key: String,
        value: Value,
    },
    ToggleObstacle {
        x: usize,
        y: usize,
    },
    RequestAgentSnapshot {
        #[serde(rename = "requestId")]
        request_id: u64,
    },
    Shutdown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TrainerEvent {
    Progress(Progress),
    AgentSnapshot {
        #[serde(rename = "requestId")]
        request_id: u64,
        data: AgentSnapshot,
    },
    /// A command could not be applied.
    Error {
        message: String,
    },
}

/// Handle to a trainer running on a background thread.
pub struct TrainerWorker {
    commands: Sender<TrainerCommand>,
    events: Receiver<TrainerEvent>,
    handle: Option<JoinHandle<()>>,
}

impl TrainerWorker {
    /// Move `trainer` onto a new thread. Its current agent type and grid
    /// size decide whether a later `Configure` patches or rebuilds.
    pub fn spawn(trainer: Trainer) -> Self {
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let handle = std::thread::spawn(move || {
            WorkerLoop::new(trainer, event_tx).run(command_rx);
        });
        log::info!("trainer worker started");
        TrainerWorker {
            commands: command_tx,
            events: event_rx,
            handle: Some(handle),
        }
    }

    pub fn send(&self, command: TrainerCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|e| GridmindError::Disconnected(e.to_string()))
    }

    /// Receiver of every event the worker emits, in emission order.
    pub fn events(&self) -> &Receiver<TrainerEvent> {
        &self.events
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<TrainerEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    /// Ask for an agent snapshot and wait for the matching reply, skipping
    /// any progress events in between.
    pub fn request_snapshot(&self, request_id: u64, timeout: Duration) -> Result<AgentSnapshot> {
        self.send(TrainerCommand::RequestAgentSnapshot { request_id })?;
        let deadline = Instant::now() + timeout;
        loop {
            match self.events.recv_deadline(deadline) {
                Ok(TrainerEvent::AgentSnapshot { request_id: id, data }) if id == request_id => return Ok(data),
                Ok(_) => continue,
                Err(e) => return Err(GridmindError::Disconnected(e.to_string())),
            }
        }
    }

    /// Stop the worker thread and wait for it to exit.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            // the thread may already be gone; joining is what matters
            let _ = self.commands.send(TrainerCommand::Shutdown);
            handle
                .join()
                .map_err(|_| GridmindError::Disconnected("trainer worker panicked".to_string()))?;
            log::info!("trainer worker stopped");
        }
        Ok(())
    }
}

impl Drop for TrainerWorker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("{}", e);
        }
    }
}

struct WorkerLoop {
    trainer: Trainer,
    events: Sender<TrainerEvent>,
    configured: (AgentType, usize),
    deadline: Option<Instant>,
}

impl WorkerLoop {
    fn new(mut trainer: Trainer, events: Sender<TrainerEvent>) -> Self {
        let sink = events.clone();
        trainer.set_progress_callback(Box::new(move |progress| {
            let _ = sink.send(TrainerEvent::Progress(*progress));
        }));
        let configured = (trainer.agent().agent_type(), trainer.environment().size());
        WorkerLoop {
            trainer,
            events,
            configured,
            deadline: None,
        }
    }

    fn run(mut self, commands: Receiver<TrainerCommand>) {
        loop {
            let received = match self.deadline {
                Some(deadline) => commands.recv_deadline(deadline),
                None => commands.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(TrainerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(command) => self.handle(command),
                Err(RecvTimeoutError::Timeout) => {
                    self.trainer.step();
                    self.deadline = self.next_deadline();
                }
            }
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        if self.trainer.is_running() {
            Some(Instant::now() + self.trainer.interval())
        } else {
            None
        }
    }

    fn handle(&mut self, command: TrainerCommand) {
        match command {
            TrainerCommand::Configure {
                agent,
                environment,
                interval_ms,
            } => {
                if let Some(ms) = interval_ms {
                    self.trainer.set_interval_ms(ms);
                }
                self.configure(agent, environment);
            }
            TrainerCommand::Start => {
                self.trainer.start();
            }
            TrainerCommand::Pause => self.trainer.pause(),
            TrainerCommand::Reset => {
                self.trainer.reset();
            }
            TrainerCommand::SetInterval { ms } => {
                self.trainer.set_interval_ms(ms);
                // re-arm with the new delay
                if self.deadline.is_some() {
                    self.deadline = self.next_deadline();
                }
            }
            TrainerCommand::UpdateAgentField { key, value } => {
                if let Err(e) = self.trainer.update_agent_field(&key, &value) {
                    self.report(e);
                }
            }
            TrainerCommand::ToggleObstacle { x, y } => {
                self.trainer.toggle_obstacle(x, y);
            }
            TrainerCommand::RequestAgentSnapshot { request_id } => {
                let data = self.trainer.agent_snapshot();
                let _ = self.events.send(TrainerEvent::AgentSnapshot { request_id, data });
            }
            TrainerCommand::Shutdown => {}
        }

        if !self.trainer.is_running() {
            self.deadline = None;
        } else if self.deadline.is_none() {
            self.deadline = Some(Instant::now());
        }
    }

    fn configure(&mut self, agent: AgentConfig, environment: EnvironmentSnapshot) {
        let requested = (agent.agent_type, normalize_size(environment.size));
        if requested == self.configured {
            if let Err(e) = self.trainer.patch_hyperparameters(&agent.hyperparameters) {
                self.report(e);
            }
            for (key, value) in agent.live_fields() {
                if let Err(e) = self.trainer.update_agent_field(key, &value) {
                    self.report(e);
                }
            }
            return;
        }

        let rng = match agent.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };
        let env = GridWorld::from_snapshot(&environment, rng);
        self.configured = (agent.agent_type, env.size());
        // replace keeps the running/paused status
        self.trainer.replace(Box::new(agent.build()), Box::new(env));
    }

    fn report(&self, error: GridmindError) {
        log::warn!("trainer command failed: {}", error);
        let _ = self.events.send(TrainerEvent::Error {
            message: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::config::TrainerConfig;
    use crate::environment::DEFAULT_SIZE;
    use crate::types::State;
    use serde_json::json;

    const WAIT: Duration = Duration::from_secs(5);

    fn worker(agent_type: AgentType, size: usize) -> TrainerWorker {
        let agent = AgentConfig::new(agent_type).with_seed(4).build();
        let env = GridWorld::new(size);
        let config = TrainerConfig {
            interval_ms: 1,
            ..Default::default()
        };
        TrainerWorker::spawn(Trainer::new(Box::new(agent), Box::new(env), &config))
    }

    fn next_progress(worker: &TrainerWorker) -> Progress {
        loop {
            match worker.recv_timeout(WAIT) {
                Some(TrainerEvent::Progress(progress)) => return progress,
                Some(_) => continue,
                None => panic!("no progress event within {:?}", WAIT),
            }
        }
    }

    #[test]
    fn test_start_steps_in_order() {
        let worker = worker(AgentType::QLearning, 4);
        worker.send(TrainerCommand::Start).unwrap();
        let mut last = 0;
        for _ in 0..10 {
            let progress = next_progress(&worker);
            let total = progress.metrics.episode * 10_000 + progress.metrics.steps;
            assert!(total > last);
            last = total;
        }
        worker.shutdown().unwrap();
    }

    #[test]
    fn test_pause_stops_stepping() {
        let worker = worker(AgentType::QLearning, 4);
        worker.send(TrainerCommand::Start).unwrap();
        next_progress(&worker);
        worker.send(TrainerCommand::Pause).unwrap();
        // the snapshot reply is ordered after the pause took effect
        worker.request_snapshot(1, WAIT).unwrap();
        while worker.events().try_recv().is_ok() {}
        assert!(worker.recv_timeout(Duration::from_millis(50)).is_none());
    }

    #[test]
    fn test_reset_emits_start_state() {
        let worker = worker(AgentType::Sarsa, 3);
        worker.send(TrainerCommand::Reset).unwrap();
        let progress = next_progress(&worker);
        assert_eq!(progress.state, State::new(0, 0));
        assert_eq!(progress.metrics.episode, 1);
    }

    #[test]
    fn test_configure_same_type_patches_in_place() {
        let worker = worker(AgentType::QLearning, 4);
        let agent = AgentConfig::new(AgentType::QLearning).with_learning_rate(0.9);
        worker
            .send(TrainerCommand::Configure {
                agent,
                environment: EnvironmentSnapshot {
                    size: 4,
                    ..Default::default()
                },
                interval_ms: Some(5),
            })
            .unwrap();
        let snapshot = worker.request_snapshot(7, WAIT).unwrap();
        assert_eq!(snapshot.params.learning_rate, 0.9);
        assert_eq!(snapshot.agent_type, "q-learning");
    }

    #[test]
    fn test_configure_same_type_patches_variant_fields() {
        let agent = AgentConfig::new(AgentType::QLambda).with_lambda(0.9).with_seed(4).build();
        let trainer = Trainer::new(Box::new(agent), Box::new(GridWorld::new(4)), &TrainerConfig::default());
        let worker = TrainerWorker::spawn(trainer);
        worker
            .send(TrainerCommand::Configure {
                agent: AgentConfig::new(AgentType::QLambda)
                    .with_lambda(0.3)
                    .with_learning_rate(0.7),
                environment: EnvironmentSnapshot {
                    size: 4,
                    ..Default::default()
                },
                interval_ms: None,
            })
            .unwrap();
        let snapshot = worker.request_snapshot(5, WAIT).unwrap();
        assert_eq!(snapshot.params.learning_rate, 0.7);
        assert_eq!(snapshot.lambda, Some(0.3));
    }

    #[test]
    fn test_configure_out_of_range_size_is_idempotent() {
        let worker = worker(AgentType::QLearning, DEFAULT_SIZE);
        worker.send(TrainerCommand::Start).unwrap();
        next_progress(&worker);
        worker.send(TrainerCommand::Pause).unwrap();
        let before = worker.request_snapshot(8, WAIT).unwrap();
        assert!(!before.q_table.clone().unwrap_or_default().is_empty());
        worker
            .send(TrainerCommand::Configure {
                agent: AgentConfig::new(AgentType::QLearning),
                environment: EnvironmentSnapshot {
                    size: 1000,
                    ..Default::default()
                },
                interval_ms: None,
            })
            .unwrap();
        let after = worker.request_snapshot(9, WAIT).unwrap();
        assert_eq!(after.q_table, before.q_table);
    }

    #[test]
    fn test_configure_new_type_rebuilds_and_keeps_running() {
        let worker = worker(AgentType::QLearning, 4);
        worker.send(TrainerCommand::Start).unwrap();
        next_progress(&worker);
        worker
            .send(TrainerCommand::Configure {
                agent: AgentConfig::new(AgentType::ValueIteration),
                environment: EnvironmentSnapshot {
                    size: 3,
                    ..Default::default()
                },
                interval_ms: None,
            })
            .unwrap();
        let snapshot = worker.request_snapshot(2, WAIT).unwrap();
        assert_eq!(snapshot.agent_type, "value-iteration");
        // still running: progress keeps arriving on the 3x3 grid
        let progress = next_progress(&worker);
        assert!(progress.state.x < 3 && progress.state.y < 3);
    }

    #[test]
    fn test_bad_field_reports_error() {
        let worker = worker(AgentType::QLearning, 4);
        worker
            .send(TrainerCommand::UpdateAgentField {
                key: "warpFactor".to_string(),
                value: json!(9),
            })
            .unwrap();
        match worker.recv_timeout(WAIT) {
            Some(TrainerEvent::Error { message }) => assert!(message.contains("warpFactor")),
            other => panic!("expected an error event, got {:?}", other),
        }
    }

    #[test]
    fn test_command_json() {
        let command: TrainerCommand = serde_json::from_str(r#"{"type": "set-interval", "ms": 20}"#).unwrap();
        assert_eq!(command, TrainerCommand::SetInterval { ms: 20 });
        let command: TrainerCommand =
            serde_json::from_str(r#"{"type": "request-agent-snapshot", "requestId": 3}"#).unwrap();
        assert_eq!(command, TrainerCommand::RequestAgentSnapshot { request_id: 3 });

        let agent = AgentConfig::new(AgentType::Sarsa).with_seed(0).build();
        let event = TrainerEvent::AgentSnapshot {
            request_id: 3,
            data: agent.snapshot(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "agent-snapshot");
        assert_eq!(json["data"]["type"], "sarsa");
    }
}
