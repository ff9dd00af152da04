use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Position, config::LearnerConfig};

/// The four moves available to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
}

impl Action {
    /// All actions in value-table index order.
    pub const ALL: [Action; 4] = [Action::Up, Action::Down, Action::Left, Action::Right];

    /// Position of this action in a value row.
    pub fn index(self) -> usize {
        match self {
            Action::Up => 0,
            Action::Down => 1,
            Action::Left => 2,
            Action::Right => 3,
        }
    }

    /// `(d_row, d_col)` applied by this move.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Action::Up => (-1, 0),
            Action::Down => (1, 0),
            Action::Left => (0, -1),
            Action::Right => (0, 1),
        }
    }

    /// The cell this move targets, or `None` if it would go below row or column zero.
    pub fn apply(self, pos: Position) -> Option<Position> {
        let (d_row, d_col) = self.delta();
        pos.offset(d_row, d_col)
    }
}

/// Action values per position.
///
/// Keyed on position only: whether the agent holds the key is not part of
/// the lookup, so both phases of an episode share one row per cell. Reads of
/// an unseen position observe zeros without inserting anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QTable {
    values: HashMap<Position, [f64; 4]>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values for `state`, zeros if never updated.
    pub fn values(&self, state: Position) -> [f64; 4] {
        self.values.get(&state).copied().unwrap_or_default()
    }

    pub fn value(&self, state: Position, action: Action) -> f64 {
        self.values(state)[action.index()]
    }

    pub fn set(&mut self, state: Position, action: Action, value: f64) {
        self.values.entry(state).or_default()[action.index()] = value;
    }

    /// Highest value for `state`; the first action wins ties.
    pub fn best_action(&self, state: Position) -> Action {
        let values = self.values(state);
        let mut best = Action::Up;
        for action in Action::ALL {
            if values[action.index()] > values[best.index()] {
                best = action;
            }
        }
        best
    }

    pub fn max_value(&self, state: Position) -> f64 {
        self.values(state)
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Number of positions that have been written at least once.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Epsilon-greedy Q-learning over a [`QTable`].
#[derive(Debug, Clone)]
pub struct Learner {
    config: LearnerConfig,
    table: QTable,
}

impl Learner {
    pub fn new(config: LearnerConfig) -> Self {
        Self::with_table(config, QTable::new())
    }

    /// Resumes learning from an existing table.
    pub fn with_table(config: LearnerConfig, table: QTable) -> Self {
        Self { config, table }
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    /// With probability epsilon a uniformly random action, otherwise the greedy one.
    pub fn select_action<R: Rng + ?Sized>(&self, rng: &mut R, state: Position) -> Action {
        if rng.random::<f64>() < self.config.exploration {
            Action::ALL[rng.random_range(0..Action::ALL.len())]
        } else {
            self.table.best_action(state)
        }
    }

    /// One-step Q-learning update; returns the new value.
    ///
    /// `next` may equal `state` for moves that left the agent in place, in
    /// which case the bootstrap reads the same row that is being updated.
    pub fn update_value(
        &mut self,
        state: Position,
        action: Action,
        reward: f64,
        next: Position,
    ) -> f64 {
        let LearnerConfig {
            learning_rate,
            discount,
            ..
        } = self.config;
        let old = self.table.value(state, action);
        let target = reward + discount * self.table.max_value(next);
        let new = old + learning_rate * (target - old);
        self.table.set(state, action, new);
        new
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn config(learning_rate: f64, discount: f64, exploration: f64) -> LearnerConfig {
        LearnerConfig {
            learning_rate,
            discount,
            exploration,
        }
    }

    #[test]
    fn unseen_states_read_as_zero() {
        let table = QTable::new();
        assert_eq!(table.values(Position::new(3, 4)), [0.0; 4]);
        assert_eq!(table.max_value(Position::new(3, 4)), 0.0);
        assert!(table.is_empty());
    }

    #[test]
    fn ties_break_toward_first_action() {
        let mut table = QTable::new();
        let state = Position::new(1, 1);
        assert_eq!(table.best_action(state), Action::Up);

        table.set(state, Action::Left, 2.0);
        table.set(state, Action::Right, 2.0);
        assert_eq!(table.best_action(state), Action::Left);
    }

    #[test]
    fn greedy_selection_follows_the_table() {
        let mut learner = Learner::new(config(0.5, 0.9, 0.0));
        let state = Position::new(2, 2);
        learner.update_value(state, Action::Right, 10.0, Position::new(2, 3));

        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            assert_eq!(learner.select_action(&mut rng, state), Action::Right);
        }
    }

    #[test]
    fn full_exploration_visits_every_action() {
        let learner = Learner::new(config(0.5, 0.9, 1.0));
        let mut rng = StdRng::seed_from_u64(9);
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[learner.select_action(&mut rng, Position::new(0, 0)).index()] = true;
        }
        assert_eq!(seen, [true; 4]);
    }

    #[test]
    fn update_applies_td_error() {
        let mut learner = Learner::new(config(0.5, 0.9, 0.1));
        let state = Position::new(0, 0);
        let next = Position::new(0, 1);
        learner.update_value(next, Action::Down, 4.0, Position::new(1, 1));
        // next row max is 0.5 * 4.0 = 2.0
        let new = learner.update_value(state, Action::Right, 3.0, next);
        assert!((new - 0.5 * (3.0 + 0.9 * 2.0)).abs() < 1e-12);
        assert_eq!(learner.table().value(state, Action::Right), new);
    }

    #[test]
    fn zero_learning_rate_leaves_table_unchanged() {
        let mut learner = Learner::new(config(0.0, 0.9, 0.1));
        let state = Position::new(1, 1);
        learner.update_value(state, Action::Up, 10.0, Position::new(0, 1));
        learner.update_value(state, Action::Up, -10.0, state);
        assert_eq!(learner.table().values(state), [0.0; 4]);
    }

    #[test]
    fn update_moves_toward_target() {
        let mut learner = Learner::new(config(0.3, 0.9, 0.1));
        let state = Position::new(1, 1);
        let up = learner.update_value(state, Action::Up, 5.0, Position::new(0, 1));
        assert!(up > 0.0);
        let again = learner.update_value(state, Action::Up, 5.0, Position::new(0, 1));
        assert!(again > up);

        let down = learner.update_value(state, Action::Down, -10.0, Position::new(2, 1));
        assert!(down < 0.0);
    }

    #[test]
    fn self_transition_bootstraps_from_own_row() {
        let mut learner = Learner::new(config(1.0, 0.5, 0.0));
        let state = Position::new(0, 0);
        learner.update_value(state, Action::Down, 8.0, Position::new(1, 0));
        let new = learner.update_value(state, Action::Up, -10.0, state);
        assert_eq!(new, -10.0 + 0.5 * 8.0);
    }
}
