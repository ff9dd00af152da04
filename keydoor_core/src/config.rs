use serde::{Deserialize, Serialize};

/// Cells that can never hold an obstacle: agent start, key, and door.
pub const RESERVED_CELLS: usize = 3;

/// Errors for configurations that can never produce a valid run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} range is empty: min {min} > max {max}")]
    InvertedRange {
        name: &'static str,
        min: usize,
        max: usize,
    },
    #[error("{name} must be at least 2, got {value}")]
    TooSmall { name: &'static str, value: usize },
    #[error("{name} must lie in [0, 1], got {value}")]
    OutOfUnitRange { name: &'static str, value: f64 },
    #[error("Obstacle density must lie in [0, 1), got {0}")]
    Density(f64),
    #[error(
        "A {rows}x{cols} grid needs {obstacles} obstacles but has only {free} cells left after the start, key, and door"
    )]
    TooCrowded {
        rows: usize,
        cols: usize,
        obstacles: usize,
        free: usize,
    },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("A {rows}x{cols} grid has more cells than can be addressed")]
    TooLarge { rows: usize, cols: usize },
}

/// Bounds and density for world generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub min_height: usize,
    pub max_height: usize,
    pub min_width: usize,
    pub max_width: usize,
    /// Fraction of all cells turned into obstacles.
    pub obstacle_density: f64,
    /// Layouts tried before generation gives up.
    pub max_generation_attempts: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            min_height: 5,
            max_height: 8,
            min_width: 10,
            max_width: 15,
            obstacle_density: 0.20,
            max_generation_attempts: 1_000,
        }
    }
}

impl WorldConfig {
    /// Obstacles placed on an `rows` x `cols` grid: `floor(density * rows * cols)`.
    pub fn obstacle_count(&self, rows: usize, cols: usize) -> usize {
        (self.obstacle_density * (rows as f64 * cols as f64)).floor() as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, min, max) in [
            ("height", self.min_height, self.max_height),
            ("width", self.min_width, self.max_width),
        ] {
            if min > max {
                return Err(ConfigError::InvertedRange { name, min, max });
            }
            if min < 2 {
                return Err(ConfigError::TooSmall { name, value: min });
            }
        }
        if !(0.0..1.0).contains(&self.obstacle_density) {
            return Err(ConfigError::Density(self.obstacle_density));
        }
        if self.max_generation_attempts == 0 {
            return Err(ConfigError::Zero("max_generation_attempts"));
        }

        // Free cells minus obstacles never shrinks as the grid grows while
        // density stays below one, so the smallest grid is the tightest.
        let (rows, cols) = (self.min_height, self.min_width);
        let cells = rows
            .checked_mul(cols)
            .ok_or(ConfigError::TooLarge { rows, cols })?;
        if self.max_height.checked_mul(self.max_width).is_none() {
            return Err(ConfigError::TooLarge {
                rows: self.max_height,
                cols: self.max_width,
            });
        }
        let free = cells - RESERVED_CELLS;
        let obstacles = self.obstacle_count(rows, cols);
        if obstacles >= free {
            return Err(ConfigError::TooCrowded {
                rows,
                cols,
                obstacles,
                free,
            });
        }
        Ok(())
    }
}

/// Hyper-parameters of the tabular learner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Learning rate (alpha).
    pub learning_rate: f64,
    /// Discount factor (gamma).
    pub discount: f64,
    /// Exploration rate (epsilon).
    pub exploration: f64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount: 0.9,
            exploration: 0.1,
        }
    }
}

impl LearnerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("learning_rate", self.learning_rate),
            ("discount", self.discount),
            ("exploration", self.exploration),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { name, value });
            }
        }
        Ok(())
    }
}

/// Limits on a single episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeConfig {
    /// Counted (successful) moves before the episode ends.
    pub step_cap: usize,
    /// Total ticks, including off-grid attempts, collisions, and their recovery moves.
    pub max_ticks: usize,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            step_cap: 20,
            max_ticks: 1_000,
        }
    }
}

impl EpisodeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step_cap == 0 {
            return Err(ConfigError::Zero("step_cap"));
        }
        if self.max_ticks == 0 {
            return Err(ConfigError::Zero("max_ticks"));
        }
        Ok(())
    }
}

/// Complete configuration for a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub world: WorldConfig,
    pub learner: LearnerConfig,
    pub episode: EpisodeConfig,
    pub episodes: usize,
    /// Seed for the random generator; `None` seeds from the operating system.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            learner: LearnerConfig::default(),
            episode: EpisodeConfig::default(),
            episodes: 1,
            seed: None,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.world.validate()?;
        self.learner.validate()?;
        self.episode.validate()?;
        if self.episodes == 0 {
            return Err(ConfigError::Zero("episodes"));
        }
        Ok(())
    }
}
