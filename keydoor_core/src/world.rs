use std::{collections::VecDeque, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    Position,
    map::{Grid, GridError},
};

/// Static terrain underneath every cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Terrain {
    #[default]
    Empty,
    Obstacle,
}

/// What a cell shows once the key, door, and agent markers are layered over the terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Obstacle,
    Key,
    Door,
    Agent,
}

impl Cell {
    /// Single character used by the text renderings.
    pub fn symbol(self) -> char {
        match self {
            Cell::Empty => ' ',
            Cell::Obstacle => 'O',
            Cell::Key => 'K',
            Cell::Door => 'D',
            Cell::Agent => 'R',
        }
    }
}

/// Errors raised when a layout violates the world invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error(transparent)]
    OutOfBounds(#[from] GridError),
    #[error("{first} and {second} share position ({}, {})", .at.row, .at.col)]
    Overlap {
        first: &'static str,
        second: &'static str,
        at: Position,
    },
    #[error("{what} at ({}, {}) sits on an obstacle", .at.row, .at.col)]
    OnObstacle { what: &'static str, at: Position },
    #[error("Map is missing a {0} marker")]
    Missing(&'static str),
    #[error("Map has more than one {0} marker")]
    Duplicate(&'static str),
    #[error("Map has zero width or height")]
    Empty,
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown map symbol '{symbol}' at ({row}, {col})")]
    UnknownSymbol { symbol: char, row: usize, col: usize },
}

/// A single key-and-door world: terrain plus the three special markers.
///
/// Markers never sit on obstacles and never share a cell with each other at
/// construction. The agent marker moves; key and door are fixed for the
/// lifetime of the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridWorld {
    terrain: Grid<Terrain>,
    start: Position,
    key: Position,
    door: Position,
    agent: Position,
}

impl GridWorld {
    /// Assembles a world from terrain and marker positions, checking the layout invariants.
    pub fn new(
        terrain: Grid<Terrain>,
        start: Position,
        key: Position,
        door: Position,
    ) -> Result<Self, LayoutError> {
        let markers = [("start", start), ("key", key), ("door", door)];
        for (what, at) in markers {
            match terrain.get(at) {
                None => {
                    return Err(GridError::OutOfBounds {
                        row: at.row,
                        col: at.col,
                        rows: terrain.rows(),
                        cols: terrain.cols(),
                    }
                    .into());
                }
                Some(Terrain::Obstacle) => return Err(LayoutError::OnObstacle { what, at }),
                Some(Terrain::Empty) => {}
            }
        }
        for (i, &(first, a)) in markers.iter().enumerate() {
            for &(second, b) in &markers[i + 1..] {
                if a == b {
                    return Err(LayoutError::Overlap {
                        first,
                        second,
                        at: a,
                    });
                }
            }
        }

        Ok(GridWorld {
            terrain,
            start,
            key,
            door,
            agent: start,
        })
    }

    pub fn rows(&self) -> usize {
        self.terrain.rows()
    }

    pub fn cols(&self) -> usize {
        self.terrain.cols()
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn key(&self) -> Position {
        self.key
    }

    pub fn door(&self) -> Position {
        self.door
    }

    pub fn agent(&self) -> Position {
        self.agent
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.terrain.contains(pos)
    }

    /// True if `pos` is inside the grid and not an obstacle.
    pub fn is_free(&self, pos: Position) -> bool {
        matches!(self.terrain.get(pos), Some(Terrain::Empty))
    }

    pub fn is_obstacle(&self, pos: Position) -> bool {
        matches!(self.terrain.get(pos), Some(Terrain::Obstacle))
    }

    /// The composed view of a cell, or `None` if out of bounds.
    ///
    /// The agent hides whatever it stands on; the door hides nothing because
    /// key and door never coincide.
    pub fn cell(&self, pos: Position) -> Option<Cell> {
        let terrain = *self.terrain.get(pos)?;
        Some(if pos == self.agent {
            Cell::Agent
        } else if pos == self.door {
            Cell::Door
        } else if pos == self.key {
            Cell::Key
        } else {
            match terrain {
                Terrain::Empty => Cell::Empty,
                Terrain::Obstacle => Cell::Obstacle,
            }
        })
    }

    /// Iterates the composed view in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (Position, Cell)> + '_ {
        self.terrain
            .enumerate()
            .filter_map(move |(pos, _)| self.cell(pos).map(|cell| (pos, cell)))
    }

    /// Free (in-bounds, non-obstacle) 4-neighbours of `pos` in Up, Down, Left, Right order.
    pub fn free_neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + '_ {
        self.terrain
            .neighbors(pos)
            .filter(move |next| self.terrain[*next] == Terrain::Empty)
    }

    /// Moves the agent marker to `pos`.
    ///
    /// The vacated cell reverts to whatever lies underneath it.
    pub fn move_agent(&mut self, pos: Position) -> Result<(), LayoutError> {
        match self.terrain.get(pos) {
            None => Err(GridError::OutOfBounds {
                row: pos.row,
                col: pos.col,
                rows: self.rows(),
                cols: self.cols(),
            }
            .into()),
            Some(Terrain::Obstacle) => Err(LayoutError::OnObstacle {
                what: "agent",
                at: pos,
            }),
            Some(Terrain::Empty) => {
                self.agent = pos;
                Ok(())
            }
        }
    }

    /// Breadth-first search over 4-connected free cells.
    ///
    /// Markers are traversable; only obstacles block. An obstacle or
    /// out-of-bounds endpoint is never reachable.
    pub fn is_reachable(&self, start: Position, goal: Position) -> bool {
        self.shortest_path_len(start, goal).is_some()
    }

    /// Number of moves on a shortest free path from `start` to `goal`, if one exists.
    pub fn shortest_path_len(&self, start: Position, goal: Position) -> Option<usize> {
        if !self.is_free(start) || !self.is_free(goal) {
            return None;
        }

        let mut distance: Grid<Option<usize>> = Grid::new(self.rows(), self.cols());
        let mut queue = VecDeque::from([start]);
        distance[start] = Some(0);

        while let Some(current) = queue.pop_front() {
            let dist = distance[current]?;
            if current == goal {
                return Some(dist);
            }
            for next in self.free_neighbors(current) {
                if distance[next].is_none() {
                    distance[next] = Some(dist + 1);
                    queue.push_back(next);
                }
            }
        }

        None
    }

    /// Number of obstacle cells.
    pub fn obstacle_count(&self) -> usize {
        self.terrain
            .iter()
            .filter(|t| **t == Terrain::Obstacle)
            .count()
    }
}

/// Parses a world from a text map, one row per line.
///
/// Symbols: `.` empty, `O` or `#` obstacle, `K` key, `D` door, `R` agent start.
/// Whitespace between symbols is ignored.
pub fn parse_world(map: &str) -> Result<GridWorld, LayoutError> {
    let rows: Vec<Vec<char>> = map
        .trim()
        .lines()
        .map(|line| line.chars().filter(|c| !c.is_whitespace()).collect())
        .collect();

    let width = rows.first().map_or(0, Vec::len);
    if width == 0 {
        return Err(LayoutError::Empty);
    }

    let mut start = None;
    let mut key = None;
    let mut door = None;
    let mut terrain = Grid::new(rows.len(), width);

    for (row, symbols) in rows.iter().enumerate() {
        if symbols.len() != width {
            return Err(LayoutError::Ragged {
                row,
                expected: width,
                found: symbols.len(),
            });
        }
        for (col, symbol) in symbols.iter().enumerate() {
            let pos = Position { row, col };
            let slot = match symbol {
                '.' => None,
                'O' | '#' => {
                    terrain[pos] = Terrain::Obstacle;
                    None
                }
                'K' => Some((&mut key, "key")),
                'D' => Some((&mut door, "door")),
                'R' => Some((&mut start, "start")),
                other => {
                    return Err(LayoutError::UnknownSymbol {
                        symbol: *other,
                        row,
                        col,
                    });
                }
            };
            if let Some((marker, name)) = slot {
                if marker.replace(pos).is_some() {
                    return Err(LayoutError::Duplicate(name));
                }
            }
        }
    }

    GridWorld::new(
        terrain,
        start.ok_or(LayoutError::Missing("start"))?,
        key.ok_or(LayoutError::Missing("key"))?,
        door.ok_or(LayoutError::Missing("door"))?,
    )
}

impl fmt::Display for GridWorld {
    /// Renders rows as ` | `-separated symbols with a dashed rule under each row.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat((4 * self.cols()).saturating_sub(1));
        for row in 0..self.rows() {
            let line: Vec<String> = (0..self.cols())
                .filter_map(|col| self.cell(Position { row, col }))
                .map(|cell| cell.symbol().to_string())
                .collect();
            writeln!(f, "{}", line.join(" | "))?;
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}
