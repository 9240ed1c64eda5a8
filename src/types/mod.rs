use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GridmindError, Result};

/// Number of actions available in every grid MDP.
pub const ACTION_COUNT: usize = 4;

/// A cell on the grid.
///
/// States are plain `Copy` values and are used directly as hash keys in every
/// per-state table. The string form `"x,y"` only appears at the persistence
/// boundary (see [`State::key`] and [`State::from_key`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct State {
    pub x: usize,
    pub y: usize,
}

impl State {
    pub const fn new(x: usize, y: usize) -> Self {
        State { x, y }
    }

    /// Persisted key for this state.
    pub fn key(&self) -> String {
        format!("{},{}", self.x, self.y)
    }

    /// Parse a key produced by [`State::key`].
    pub fn from_key(key: &str) -> Option<Self> {
        let (x, y) = key.split_once(',')?;
        Some(State {
            x: x.trim().parse().ok()?,
            y: y.trim().parse().ok()?,
        })
    }

    /// Row-major index of this state on a grid of the given size.
    pub fn index(&self, size: usize) -> usize {
        self.y * size + self.x
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Grid moves. The discriminant is the action index used by every table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Action {
    pub const ALL: [Action; ACTION_COUNT] = [Action::Up, Action::Down, Action::Left, Action::Right];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Action for an index; panics on an index outside `0..4`.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index]
    }

    /// Displacement `(dx, dy)` of this move.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Action::Up => (0, -1),
            Action::Down => (0, 1),
            Action::Left => (-1, 0),
            Action::Right => (1, 0),
        }
    }
}

impl TryFrom<usize> for Action {
    type Error = GridmindError;

    fn try_from(index: usize) -> Result<Self> {
        Self::ALL.get(index).copied().ok_or(GridmindError::InvalidAction {
            action: index,
            max_actions: ACTION_COUNT,
        })
    }
}

/// Result of applying one action to an environment (or of a model lookahead).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub state: State,
    pub reward: f64,
    pub done: bool,
}

/// A single `(state, action, reward, next_state, done)` experience.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub state: State,
    pub action: Action,
    pub reward: f64,
    pub next_state: State,
    pub done: bool,
}

impl Transition {
    pub fn new(state: State, action: Action, reward: f64, next_state: State, done: bool) -> Self {
        Transition {
            state,
            action,
            reward,
            next_state,
            done,
        }
    }
}

/// Index of the largest value, preferring the lowest index on ties.
pub fn argmax(values: &[f64; ACTION_COUNT]) -> usize {
    let mut best = 0;
    for i in 1..ACTION_COUNT {
        if values[i] > values[best] {
            best = i;
        }
    }
    best
}

/// Largest value of an action vector.
pub fn max_value(values: &[f64; ACTION_COUNT]) -> f64 {
    values[argmax(values)]
}
