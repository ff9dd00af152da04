use serde::{Deserialize, Serialize};

pub mod config;
pub mod episode;
pub mod generator;
pub mod learner;
pub mod map;
pub mod reward;
pub mod trainer;
pub mod world;

/// Represents a cell coordinate as `(row, col)`, with row 0 at the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Applies a signed `(d_row, d_col)` delta.
    ///
    /// Returns `None` if either coordinate would become negative. The upper
    /// bound is not checked here; that is the grid's job.
    pub fn offset(self, d_row: isize, d_col: isize) -> Option<Position> {
        Some(Position {
            row: self.row.checked_add_signed(d_row)?,
            col: self.col.checked_add_signed(d_col)?,
        })
    }

    /// Returns the manhattan distance between two positions.
    pub fn manhattan_distance(self, other: Position) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl From<(usize, usize)> for Position {
    fn from((row, col): (usize, usize)) -> Self {
        Position { row, col }
    }
}
