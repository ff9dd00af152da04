use rand::{SeedableRng, rngs::StdRng};
use tracing::info;

use crate::{
    config::{ConfigError, TrainingConfig},
    episode::{Episode, EpisodeStats, StepOutcome, Termination},
    generator::{GenerationError, build_valid_world},
    learner::Learner,
};

/// Summary of a finished episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeReport {
    /// Zero-based episode number.
    pub index: usize,
    pub rows: usize,
    pub cols: usize,
    pub termination: Termination,
    pub stats: EpisodeStats,
    /// Shortest start-to-key plus key-to-door path length in the episode's world.
    pub optimal_steps: Option<usize>,
}

/// Drives episodes one after another with a single random generator and value table.
#[derive(Debug)]
pub struct Trainer {
    config: TrainingConfig,
    rng: StdRng,
    learner: Learner,
    episodes_run: usize,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            learner: Learner::new(config.learner),
            config,
            rng,
            episodes_run: 0,
        })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn learner(&self) -> &Learner {
        &self.learner
    }

    pub fn episodes_run(&self) -> usize {
        self.episodes_run
    }

    /// True once the configured number of episodes has been reported.
    pub fn is_finished(&self) -> bool {
        self.episodes_run >= self.config.episodes
    }

    /// Generates a fresh reachable world and places the agent at its start.
    pub fn new_episode(&mut self) -> Result<Episode, GenerationError> {
        let world = build_valid_world(&mut self.rng, &self.config.world)?;
        Ok(Episode::new(world, self.config.episode))
    }

    /// Advances `episode` by one tick using this trainer's learner and generator.
    pub fn step(&mut self, episode: &mut Episode) -> Option<StepOutcome> {
        episode.step(&mut self.learner, &mut self.rng)
    }

    /// Records a terminated episode and returns its report.
    ///
    /// Returns `None` if the episode is still running.
    pub fn finish_episode(&mut self, episode: &Episode) -> Option<EpisodeReport> {
        let termination = episode.termination()?;
        Some(self.record(episode, termination))
    }

    /// Generates a world and runs one episode on it to termination.
    pub fn run_episode(&mut self) -> Result<EpisodeReport, GenerationError> {
        let mut episode = self.new_episode()?;
        let termination = episode.run(&mut self.learner, &mut self.rng);
        Ok(self.record(&episode, termination))
    }

    fn record(&mut self, episode: &Episode, termination: Termination) -> EpisodeReport {
        let world = episode.world();
        let optimal_steps = world
            .shortest_path_len(world.start(), world.key())
            .zip(world.shortest_path_len(world.key(), world.door()))
            .map(|(to_key, to_door)| to_key + to_door);

        let report = EpisodeReport {
            index: self.episodes_run,
            rows: world.rows(),
            cols: world.cols(),
            termination,
            stats: *episode.stats(),
            optimal_steps,
        };
        self.episodes_run += 1;

        info!(
            episode = report.index,
            ?termination,
            steps = report.stats.steps,
            ticks = report.stats.ticks,
            total_reward = report.stats.total_reward,
            key_found = report.stats.key_found_at.is_some(),
            table_size = self.learner.table().len(),
            "episode finished"
        );
        report
    }

    /// Runs the remaining configured episodes in order.
    pub fn train(&mut self) -> Result<Vec<EpisodeReport>, GenerationError> {
        let mut reports = Vec::with_capacity(self.config.episodes.saturating_sub(self.episodes_run));
        while !self.is_finished() {
            reports.push(self.run_episode()?);
        }
        Ok(reports)
    }
}
