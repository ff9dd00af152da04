//! Random world generation with a reachability guarantee.
//!
//! Every world handed out by [`build_valid_world`] has a free path from the
//! agent start to the key and from the key to the door.

use rand::Rng;
use tracing::{debug, warn};

use crate::{
    Position,
    config::{ConfigError, WorldConfig},
    map::Grid,
    world::{GridWorld, LayoutError, Terrain},
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("No reachable layout found after {attempts} attempts")]
    RetriesExhausted { attempts: usize },
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Uniform random position anywhere on a `rows` x `cols` grid.
pub fn generate_position<R: Rng + ?Sized>(rng: &mut R, rows: usize, cols: usize) -> Position {
    Position {
        row: rng.random_range(0..rows),
        col: rng.random_range(0..cols),
    }
}

/// Random position on the door boundary.
///
/// A fair coin picks the top edge (row 0, random column) or the right edge
/// (column `cols - 1`, random row).
pub fn generate_door_position<R: Rng + ?Sized>(rng: &mut R, rows: usize, cols: usize) -> Position {
    if rng.random_bool(0.5) {
        Position {
            row: 0,
            col: rng.random_range(0..cols),
        }
    } else {
        Position {
            row: rng.random_range(0..rows),
            col: cols - 1,
        }
    }
}

/// True if `pos` lies on the edge [`generate_door_position`] draws from.
///
/// Every door produced by [`build_valid_world`] satisfies this, so callers
/// loading or checking worlds can hold other layouts to the same rule.
pub fn is_door_boundary(pos: Position, cols: usize) -> bool {
    pos.row == 0 || pos.col + 1 == cols
}

/// Turns `count` distinct empty cells outside `forbidden` into obstacles.
///
/// Cells are drawn uniformly and redrawn on collision. Fails up front if
/// there are not enough candidate cells, so the sampling always terminates.
pub fn place_obstacles<R: Rng + ?Sized>(
    rng: &mut R,
    terrain: &mut Grid<Terrain>,
    count: usize,
    forbidden: &[Position],
) -> Result<(), GenerationError> {
    let available = terrain
        .enumerate()
        .filter(|(pos, t)| **t == Terrain::Empty && !forbidden.contains(pos))
        .count();
    if count > available {
        return Err(ConfigError::TooCrowded {
            rows: terrain.rows(),
            cols: terrain.cols(),
            obstacles: count,
            free: available,
        }
        .into());
    }

    let mut placed = 0;
    while placed < count {
        let pos = generate_position(rng, terrain.rows(), terrain.cols());
        if forbidden.contains(&pos) || terrain[pos] == Terrain::Obstacle {
            continue;
        }
        terrain[pos] = Terrain::Obstacle;
        placed += 1;
    }
    Ok(())
}

/// Draws one complete layout without checking reachability.
///
/// Dimensions come from the configured ranges, the agent starts in the
/// bottom-left corner, and key and door are redrawn until all three markers
/// are distinct. `config` must already be validated.
fn generate_world<R: Rng + ?Sized>(
    rng: &mut R,
    config: &WorldConfig,
) -> Result<GridWorld, GenerationError> {
    let rows = rng.random_range(config.min_height..=config.max_height);
    let cols = rng.random_range(config.min_width..=config.max_width);
    let start = Position { row: rows - 1, col: 0 };

    let key = loop {
        let pos = generate_position(rng, rows, cols);
        if pos != start {
            break pos;
        }
    };
    let door = loop {
        let pos = generate_door_position(rng, rows, cols);
        if pos != start && pos != key {
            break pos;
        }
    };

    let mut terrain = Grid::new(rows, cols);
    place_obstacles(
        rng,
        &mut terrain,
        config.obstacle_count(rows, cols),
        &[start, key, door],
    )?;

    Ok(GridWorld::new(terrain, start, key, door)?)
}

/// Generates layouts until one connects start to key and key to door.
///
/// Gives up with [`GenerationError::RetriesExhausted`] after
/// `max_generation_attempts` rejected layouts.
pub fn build_valid_world<R: Rng + ?Sized>(
    rng: &mut R,
    config: &WorldConfig,
) -> Result<GridWorld, GenerationError> {
    config.validate()?;
    for attempt in 1..=config.max_generation_attempts {
        let world = generate_world(rng, config)?;
        let to_key = world.is_reachable(world.start(), world.key());
        let to_door = world.is_reachable(world.key(), world.door());
        if to_key && to_door {
            debug!(
                attempt,
                rows = world.rows(),
                cols = world.cols(),
                "generated reachable world"
            );
            return Ok(world);
        }
        debug!(attempt, to_key, to_door, "rejected unreachable layout");
    }

    warn!(
        attempts = config.max_generation_attempts,
        "world generation gave up"
    );
    Err(GenerationError::RetriesExhausted {
        attempts: config.max_generation_attempts,
    })
}
