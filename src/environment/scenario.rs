use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::types::State;

/// One weighted vertical displacement inside a windy column.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindOffset {
    pub offset: isize,
    pub weight: f64,
}

/// Displacement distribution for a single column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindColumn {
    pub column: usize,
    pub offsets: Vec<WindOffset>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindyConfig {
    pub columns: Vec<WindColumn>,
}

/// When a moving goal advances along its cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GoalShift {
    /// Advance after every N steps within an episode.
    EverySteps(usize),
    /// Advance as soon as an episode ends.
    OnEpisodeEnd,
}

impl Default for GoalShift {
    fn default() -> Self {
        GoalShift::OnEpisodeEnd
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MovingGoalConfig {
    pub pattern: Vec<State>,
    pub shift: GoalShift,
    pub cursor: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RewardCell {
    pub x: usize,
    pub y: usize,
    pub reward: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardGridConfig {
    pub cells: Vec<RewardCell>,
}

#[derive(Clone, Debug)]
pub struct CompiledWind {
    offsets: Vec<isize>,
    distribution: WeightedIndex<f64>,
}

/// Scenario-specific rules layered over the basic grid.
#[derive(Clone, Debug)]
pub enum Scenario {
    Basic,
    Windy {
        config: WindyConfig,
        columns: HashMap<usize, CompiledWind>,
    },
    MovingGoal {
        config: MovingGoalConfig,
        episode_steps: usize,
    },
    RewardGrid {
        config: RewardGridConfig,
        cells: HashMap<State, f64>,
    },
}

impl Default for Scenario {
    fn default() -> Self {
        Scenario::Basic
    }
}

fn parse_config<T: DeserializeOwned + Default>(id: &str, value: &Value) -> T {
    if value.is_null() {
        return T::default();
    }
    serde_json::from_value(value.clone()).unwrap_or_else(|err| {
        log::warn!("malformed '{}' scenario config ({}), using defaults", id, err);
        T::default()
    })
}

fn default_goal(size: usize) -> State {
    State::new(size - 1, size - 1)
}

impl Scenario {
    /// Scenario factory: rebuild a scenario from its persisted id and config.
    /// Unknown ids fall back to the basic grid.
    pub fn from_config(id: &str, config: &Value, size: usize) -> Self {
        match id {
            "basic" | "" => Scenario::Basic,
            "windy" => Scenario::windy(parse_config(id, config), size),
            "moving-goal" => Scenario::moving_goal(parse_config(id, config), size),
            "reward-grid" => Scenario::reward_grid(parse_config(id, config), size),
            other => {
                log::warn!("unknown scenario '{}', using basic grid", other);
                Scenario::Basic
            }
        }
    }

    pub fn windy(config: WindyConfig, size: usize) -> Self {
        let mut kept = Vec::new();
        let mut columns = HashMap::new();
        for column in config.columns {
            if column.column >= size {
                log::warn!("wind column {} is outside a {}x{} grid", column.column, size, size);
                continue;
            }
            let offsets: Vec<WindOffset> = column
                .offsets
                .into_iter()
                .filter(|o| o.weight.is_finite() && o.weight >= 0.0)
                .collect();
            match WeightedIndex::new(offsets.iter().map(|o| o.weight)) {
                Ok(distribution) => {
                    columns.insert(
                        column.column,
                        CompiledWind {
                            offsets: offsets.iter().map(|o| o.offset).collect(),
                            distribution,
                        },
                    );
                    kept.push(WindColumn {
                        column: column.column,
                        offsets,
                    });
                }
                Err(err) => log::warn!("dropping wind column {}: {}", column.column, err),
            }
        }
        Scenario::Windy {
            config: WindyConfig { columns: kept },
            columns,
        }
    }

    pub fn moving_goal(config: MovingGoalConfig, size: usize) -> Self {
        let start = State::new(0, 0);
        let mut pattern: Vec<State> = config
            .pattern
            .into_iter()
            .filter(|s| s.x < size && s.y < size && *s != start)
            .collect();
        if pattern.is_empty() {
            pattern.push(default_goal(size));
        }
        let shift = match config.shift {
            GoalShift::EverySteps(0) => GoalShift::OnEpisodeEnd,
            shift => shift,
        };
        let cursor = config.cursor % pattern.len();
        Scenario::MovingGoal {
            config: MovingGoalConfig {
                pattern,
                shift,
                cursor,
            },
            episode_steps: 0,
        }
    }

    pub fn reward_grid(config: RewardGridConfig, size: usize) -> Self {
        let cells: Vec<RewardCell> = config
            .cells
            .into_iter()
            .filter(|c| c.x < size && c.y < size && c.reward.is_finite())
            .collect();
        Scenario::RewardGrid {
            cells: cells
                .iter()
                .map(|c| (State::new(c.x, c.y), c.reward))
                .collect(),
            config: RewardGridConfig { cells },
        }
    }

    /// Persisted scenario identifier.
    pub fn id(&self) -> &'static str {
        match self {
            Scenario::Basic => "basic",
            Scenario::Windy { .. } => "windy",
            Scenario::MovingGoal { .. } => "moving-goal",
            Scenario::RewardGrid { .. } => "reward-grid",
        }
    }

    /// Persisted scenario config, the inverse of [`Scenario::from_config`].
    pub fn config_value(&self) -> Value {
        let value = match self {
            Scenario::Basic => return Value::Null,
            Scenario::Windy { config, .. } => serde_json::to_value(config),
            Scenario::MovingGoal { config, .. } => serde_json::to_value(config),
            Scenario::RewardGrid { config, .. } => serde_json::to_value(config),
        };
        value.unwrap_or(Value::Null)
    }

    pub fn goal(&self, size: usize) -> State {
        match self {
            Scenario::MovingGoal { config, .. } => config.pattern[config.cursor],
            _ => default_goal(size),
        }
    }

    /// Every cell that is, or will become, a goal.
    pub fn goal_cells(&self, size: usize) -> Vec<State> {
        match self {
            Scenario::MovingGoal { config, .. } => config.pattern.clone(),
            _ => vec![default_goal(size)],
        }
    }

    /// Sampled vertical displacement for a landing column, if it is windy.
    pub fn wind_offset<R: Rng + ?Sized>(&self, column: usize, rng: &mut R) -> Option<isize> {
        match self {
            Scenario::Windy { columns, .. } => columns
                .get(&column)
                .map(|wind| wind.offsets[wind.distribution.sample(rng)]),
            _ => None,
        }
    }

    /// Extra reward for landing on a cell.
    pub fn bonus(&self, state: State) -> f64 {
        match self {
            Scenario::RewardGrid { cells, .. } => cells.get(&state).copied().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub(crate) fn on_step(&mut self, done: bool) {
        if let Scenario::MovingGoal {
            config,
            episode_steps,
        } = self
        {
            *episode_steps += 1;
            let advance = match config.shift {
                GoalShift::OnEpisodeEnd => done,
                GoalShift::EverySteps(n) => !done && *episode_steps % n == 0,
            };
            if advance {
                config.cursor = (config.cursor + 1) % config.pattern.len();
                log::debug!("goal moved to {}", config.pattern[config.cursor]);
            }
        }
    }

    pub(crate) fn on_reset(&mut self) {
        if let Scenario::MovingGoal { episode_steps, .. } = self {
            *episode_steps = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_scenario_is_basic() {
        let scenario = Scenario::from_config("volcano", &Value::Null, 5);
        assert_eq!(scenario.id(), "basic");
    }

    #[test]
    fn test_windy_drops_invalid_columns() {
        let config = json!({
            "columns": [
                {"column": 1, "offsets": [{"offset": -1, "weight": 1.0}, {"offset": 0, "weight": 3.0}]},
                {"column": 9, "offsets": [{"offset": -1, "weight": 1.0}]},
                {"column": 2, "offsets": [{"offset": -1, "weight": 0.0}]}
            ]
        });
        let scenario = Scenario::from_config("windy", &config, 5);
        match &scenario {
            Scenario::Windy { config, columns } => {
                assert_eq!(config.columns.len(), 1);
                assert!(columns.contains_key(&1));
            }
            other => panic!("expected windy scenario, got {:?}", other),
        }
    }

    #[test]
    fn test_moving_goal_every_steps() {
        let config = MovingGoalConfig {
            pattern: vec![State::new(4, 4), State::new(4, 0)],
            shift: GoalShift::EverySteps(2),
            cursor: 0,
        };
        let mut scenario = Scenario::moving_goal(config, 5);
        assert_eq!(scenario.goal(5), State::new(4, 4));
        scenario.on_step(false);
        assert_eq!(scenario.goal(5), State::new(4, 4));
        scenario.on_step(false);
        assert_eq!(scenario.goal(5), State::new(4, 0));
    }

    #[test]
    fn test_moving_goal_on_episode_end() {
        let config = MovingGoalConfig {
            pattern: vec![State::new(2, 2), State::new(0, 2)],
            shift: GoalShift::OnEpisodeEnd,
            cursor: 1,
        };
        let mut scenario = Scenario::moving_goal(config, 3);
        scenario.on_step(false);
        assert_eq!(scenario.goal(3), State::new(0, 2));
        scenario.on_step(true);
        assert_eq!(scenario.goal(3), State::new(2, 2));
    }

    #[test]
    fn test_malformed_config_falls_back() {
        let scenario = Scenario::from_config("reward-grid", &json!({"cells": 7}), 4);
        assert_eq!(scenario.id(), "reward-grid");
        assert_eq!(scenario.bonus(State::new(1, 1)), 0.0);
    }

    #[test]
    fn test_config_round_trip() {
        let config = json!({"cells": [{"x": 1, "y": 2, "reward": 0.5}]});
        let scenario = Scenario::from_config("reward-grid", &config, 4);
        let rebuilt = Scenario::from_config(scenario.id(), &scenario.config_value(), 4);
        assert_eq!(rebuilt.bonus(State::new(1, 2)), 0.5);
    }
}
