use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;

use super::{Environment, EnvironmentSnapshot, MdpModel, RewardConfig, Scenario};
use crate::types::{Action, State, StepOutcome};

pub const DEFAULT_SIZE: usize = 5;
pub const MIN_SIZE: usize = 2;
pub const MAX_SIZE: usize = 64;

/// Square grid MDP with obstacles and a pluggable [`Scenario`].
///
/// The agent starts at `(0, 0)`. Walls clamp movement (the agent stays put and
/// pays the step penalty); obstacle cells reject it (the agent stays put and
/// pays the obstacle penalty). Landing on the goal ends the episode.
///
/// # Example
///
/// ```
/// use gridmind::environment::{Environment, GridWorld};
/// use gridmind::types::{Action, State};
///
/// let mut env = GridWorld::new(3);
/// env.toggle_obstacle(1, 0);
/// env.reset();
/// let outcome = env.step(Action::Right);
/// assert_eq!(outcome.state, State::new(0, 0));
/// assert!(!outcome.done);
/// ```
#[derive(Clone, Debug)]
pub struct GridWorld {
    size: usize,
    obstacles: BTreeSet<State>,
    rewards: RewardConfig,
    start: State,
    position: State,
    scenario: Scenario,
    rng: StdRng,
}

impl GridWorld {
    /// Basic grid of the given size. Out-of-range sizes fall back to
    /// [`DEFAULT_SIZE`].
    pub fn new(size: usize) -> Self {
        Self::with_rng(size, Scenario::Basic, StdRng::from_entropy())
    }

    pub fn with_scenario(size: usize, scenario: Scenario) -> Self {
        Self::with_rng(size, scenario, StdRng::from_entropy())
    }

    pub fn with_rng(size: usize, scenario: Scenario, rng: StdRng) -> Self {
        let size = normalize_size(size);
        let start = State::new(0, 0);
        GridWorld {
            size,
            obstacles: BTreeSet::new(),
            rewards: RewardConfig::default(),
            start,
            position: start,
            scenario,
            rng,
        }
    }

    /// Rebuild an environment from its persisted form.
    pub fn from_snapshot(snapshot: &EnvironmentSnapshot, rng: StdRng) -> Self {
        let size = normalize_size(snapshot.size);
        let scenario = Scenario::from_config(&snapshot.scenario_id, &snapshot.scenario_config, size);
        let mut env = Self::with_rng(size, scenario, rng);
        env.rewards = snapshot.rewards.normalized();
        for cell in &snapshot.obstacles {
            if !env.obstacles.contains(cell) {
                env.toggle_obstacle(cell.x, cell.y);
            }
        }
        env
    }

    pub fn goal(&self) -> State {
        self.scenario.goal(self.size)
    }

    pub fn start(&self) -> State {
        self.start
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    fn in_bounds(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.size && (y as usize) < self.size
    }

    fn clamp(&self, value: isize) -> usize {
        value.clamp(0, self.size as isize - 1) as usize
    }

    /// Where a move from `from` lands, or `None` when an obstacle rejects it.
    fn attempt(&self, from: State, action: Action) -> Option<State> {
        let (dx, dy) = action.delta();
        let target = State::new(
            self.clamp(from.x as isize + dx),
            self.clamp(from.y as isize + dy),
        );
        if self.obstacles.contains(&target) {
            None
        } else {
            Some(target)
        }
    }

    fn drift(&mut self, landed: State) -> State {
        let offset = match self.scenario.wind_offset(landed.x, &mut self.rng) {
            Some(offset) => offset,
            None => return landed,
        };
        let pushed = State::new(landed.x, self.clamp(landed.y as isize + offset));
        if self.obstacles.contains(&pushed) {
            landed
        } else {
            pushed
        }
    }

    fn score(&self, landed: State) -> StepOutcome {
        let done = landed == self.goal();
        let base = if done {
            self.rewards.goal_reward
        } else {
            self.rewards.step_penalty
        };
        StepOutcome {
            state: landed,
            reward: base + self.scenario.bonus(landed),
            done,
        }
    }
}

/// `size` if it is within the supported range, otherwise [`DEFAULT_SIZE`].
pub fn normalize_size(size: usize) -> usize {
    if (MIN_SIZE..=MAX_SIZE).contains(&size) {
        size
    } else {
        log::warn!("grid size {} out of range, using {}", size, DEFAULT_SIZE);
        DEFAULT_SIZE
    }
}

impl Default for GridWorld {
    fn default() -> Self {
        Self::new(DEFAULT_SIZE)
    }
}

impl Environment for GridWorld {
    fn reset(&mut self) -> State {
        self.position = self.start;
        self.scenario.on_reset();
        self.position
    }

    fn step(&mut self, action: Action) -> StepOutcome {
        let outcome = match self.attempt(self.position, action) {
            None => StepOutcome {
                state: self.position,
                reward: self.rewards.obstacle_penalty,
                done: false,
            },
            Some(landed) => {
                let landed = self.drift(landed);
                self.score(landed)
            }
        };
        self.position = outcome.state;
        self.scenario.on_step(outcome.done);
        outcome
    }

    fn state(&self) -> State {
        self.position
    }

    fn size(&self) -> usize {
        self.size
    }

    fn is_obstacle(&self, x: usize, y: usize) -> bool {
        self.obstacles.contains(&State::new(x, y))
    }

    fn toggle_obstacle(&mut self, x: usize, y: usize) -> bool {
        let cell = State::new(x, y);
        if !self.in_bounds(x as isize, y as isize)
            || cell == self.start
            || cell == self.position
            || self.scenario.goal_cells(self.size).contains(&cell)
        {
            return false;
        }
        if !self.obstacles.remove(&cell) {
            self.obstacles.insert(cell);
        }
        true
    }

    fn reward_config(&self) -> RewardConfig {
        self.rewards
    }

    fn set_reward_config(&mut self, config: RewardConfig) {
        self.rewards = config.normalized();
    }

    fn snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            size: self.size,
            obstacles: self.obstacles.iter().copied().collect(),
            rewards: self.rewards,
            scenario_id: self.scenario.id().to_string(),
            scenario_config: self.scenario.config_value(),
        }
    }

    fn model(&self) -> Option<&dyn MdpModel> {
        Some(self)
    }
}

impl MdpModel for GridWorld {
    fn enumerate_states(&self) -> Vec<State> {
        let mut states = Vec::with_capacity(self.size * self.size);
        for y in 0..self.size {
            for x in 0..self.size {
                let state = State::new(x, y);
                if !self.obstacles.contains(&state) {
                    states.push(state);
                }
            }
        }
        states
    }

    fn transition(&self, state: State, action: Action) -> StepOutcome {
        match self.attempt(state, action) {
            None => StepOutcome {
                state,
                reward: self.rewards.obstacle_penalty,
                done: false,
            },
            Some(landed) => self.score(landed),
        }
    }

    fn is_terminal(&self, state: State) -> bool {
        state == self.goal()
    }
}
