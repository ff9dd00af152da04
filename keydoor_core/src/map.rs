use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::Position;

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Position ({row}, {col}) is out of bounds for a {rows}x{cols} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
}

/// Row/column deltas for the four cardinal moves, in Up, Down, Left, Right order.
pub const NEIGHBOR_DELTAS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// A generic 2D grid structure.
///
/// Stores elements of type `T` in a flat vector using row-major order.
/// Cells are addressed by [`Position`] (row, col).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid with the specified dimensions, filled with default values.
    ///
    /// # Panics
    ///
    /// Panics if `rows * cols` overflows `usize`.
    pub fn new(rows: usize, cols: usize) -> Self
    where
        T: Default + Clone,
    {
        let size = rows.checked_mul(cols).expect("Grid size overflow");
        Grid {
            rows,
            cols,
            cells: vec![T::default(); size],
        }
    }

    /// Returns the number of rows (the grid height).
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns (the grid width).
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn index_of(&self, pos: Position) -> Option<usize> {
        if self.contains(pos) {
            Some(pos.row * self.cols + pos.col)
        } else {
            None
        }
    }

    #[inline]
    fn position_of(&self, index: usize) -> Position {
        Position {
            row: index / self.cols,
            col: index % self.cols,
        }
    }

    /// Checks if the position lies within the grid boundaries.
    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Applies a signed delta to `pos`, returning the result only if it stays on the grid.
    pub fn step(&self, pos: Position, d_row: isize, d_col: isize) -> Option<Position> {
        pos.offset(d_row, d_col).filter(|next| self.contains(*next))
    }

    /// Gets an immutable reference to the cell, or `None` if out of bounds.
    pub fn get(&self, pos: Position) -> Option<&T> {
        self.index_of(pos).and_then(|index| self.cells.get(index))
    }

    /// Sets the value of the cell at `pos`.
    ///
    /// Returns `Err(GridError::OutOfBounds)` if the position is invalid.
    pub fn set(&mut self, pos: Position, value: T) -> Result<(), GridError> {
        let index = self.index_of(pos).ok_or(GridError::OutOfBounds {
            row: pos.row,
            col: pos.col,
            rows: self.rows,
            cols: self.cols,
        })?;
        self.cells[index] = value;
        Ok(())
    }

    /// Returns an iterator over the cells of the grid in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    /// Returns an iterator that yields `(Position, &T)` for each cell.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, cell)| (self.position_of(index), cell))
    }

    /// Returns the in-bounds 4-neighbours of `pos` in Up, Down, Left, Right order.
    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + '_ {
        NEIGHBOR_DELTAS
            .iter()
            .filter_map(move |&(d_row, d_col)| self.step(pos, d_row, d_col))
    }

}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, pos: Position) -> &Self::Output {
        match self.index_of(pos) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for a {}x{} grid",
                pos.row, pos.col, self.rows, self.cols
            ),
        }
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, pos: Position) -> &mut Self::Output {
        let (rows, cols) = (self.rows, self.cols);
        match self.index_of(pos) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for a {}x{} grid",
                pos.row, pos.col, rows, cols
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_out_of_bounds_reports_dimensions() {
        let mut grid: Grid<u8> = Grid::new(2, 3);
        let err = grid.set(Position::new(2, 0), 1).unwrap_err();
        assert_eq!(
            err,
            GridError::OutOfBounds {
                row: 2,
                col: 0,
                rows: 2,
                cols: 3
            }
        );
        assert!(grid.set(Position::new(1, 2), 7).is_ok());
        assert_eq!(grid[Position::new(1, 2)], 7);
    }

    #[test]
    fn enumerate_is_row_major() {
        let mut grid: Grid<usize> = Grid::new(2, 3);
        for row in 0..2 {
            for col in 0..3 {
                grid.set(Position::new(row, col), row * 10 + col).unwrap();
            }
        }
        let collected: Vec<_> = grid.enumerate().map(|(pos, v)| (pos, *v)).collect();
        assert_eq!(collected[0], (Position::new(0, 0), 0));
        assert_eq!(collected[2], (Position::new(0, 2), 2));
        assert_eq!(collected[3], (Position::new(1, 0), 10));
        assert_eq!(grid.iter().copied().collect::<Vec<_>>(), [0, 1, 2, 10, 11, 12]);
        assert_eq!(grid.get(Position::new(2, 0)), None);
    }

    #[test]
    fn neighbors_clip_to_bounds() {
        let grid: Grid<u8> = Grid::new(3, 3);
        let corner: Vec<_> = grid.neighbors(Position::new(0, 0)).collect();
        assert_eq!(corner, vec![Position::new(1, 0), Position::new(0, 1)]);

        let center: Vec<_> = grid.neighbors(Position::new(1, 1)).collect();
        assert_eq!(
            center,
            vec![
                Position::new(0, 1),
                Position::new(2, 1),
                Position::new(1, 0),
                Position::new(1, 2),
            ]
        );
    }
}
