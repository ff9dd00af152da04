use rand::{Rng, seq::IndexedRandom};
use tracing::{debug, warn};

use crate::{
    Position,
    config::EpisodeConfig,
    learner::{Action, Learner},
    reward::{OFF_GRID_PENALTY, compute_reward},
    world::GridWorld,
};

/// Why an episode stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The agent stands on the door holding the key.
    Success,
    /// The counted-step cap was reached.
    StepLimit,
    /// The total tick budget ran out, counting moves that did not advance the step counter.
    TickLimit,
}

/// What happened to the agent on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// The agent moved onto a free cell; this is the only kind that counts as a step.
    Moved,
    /// The move would have left the grid; the agent stayed put.
    OffGrid,
    /// The move hit an obstacle; the agent was pushed to a random free
    /// neighbour, or stayed put if it had none.
    Collision { recovered_to: Option<Position> },
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub from: Position,
    pub action: Action,
    pub kind: MoveKind,
    pub reward: f64,
    pub termination: Option<Termination>,
}

/// Running counters for one episode.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpisodeStats {
    /// Counted moves.
    pub steps: usize,
    /// Every tick, counted or not.
    pub ticks: usize,
    /// Sum of rewards over counted moves.
    pub total_reward: f64,
    pub off_grid: usize,
    pub collisions: usize,
    pub recoveries: usize,
    /// Step counter value when the key was picked up.
    pub key_found_at: Option<usize>,
}

/// One run of the agent through a single world.
///
/// The world belongs to the episode; the learner is borrowed per tick so the
/// same value table carries over from one episode to the next.
#[derive(Debug, Clone)]
pub struct Episode {
    world: GridWorld,
    limits: EpisodeConfig,
    has_key: bool,
    stats: EpisodeStats,
    termination: Option<Termination>,
}

impl Episode {
    pub fn new(world: GridWorld, limits: EpisodeConfig) -> Self {
        Self {
            world,
            limits,
            has_key: false,
            stats: EpisodeStats::default(),
            termination: None,
        }
    }

    pub fn world(&self) -> &GridWorld {
        &self.world
    }

    pub fn position(&self) -> Position {
        self.world.agent()
    }

    pub fn has_key(&self) -> bool {
        self.has_key
    }

    pub fn stats(&self) -> &EpisodeStats {
        &self.stats
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    pub fn is_done(&self) -> bool {
        self.termination.is_some()
    }

    /// Advances the episode by one tick.
    ///
    /// Returns `None` once the episode has terminated.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        learner: &mut Learner,
        rng: &mut R,
    ) -> Option<StepOutcome> {
        if self.is_done() {
            return None;
        }

        let state = self.world.agent();
        let action = learner.select_action(rng, state);
        self.stats.ticks += 1;

        let candidate = action.apply(state).filter(|pos| self.world.contains(*pos));
        let (kind, reward) = match candidate {
            None => {
                learner.update_value(state, action, OFF_GRID_PENALTY, state);
                self.stats.off_grid += 1;
                (MoveKind::OffGrid, OFF_GRID_PENALTY)
            }
            Some(next) if self.world.is_obstacle(next) => {
                let reward = compute_reward(&self.world, state, next, self.has_key);
                learner.update_value(state, action, reward, state);
                self.stats.collisions += 1;

                let escapes: Vec<Position> = self.world.free_neighbors(state).collect();
                let recovered_to = escapes.choose(rng).copied();
                if let Some(pos) = recovered_to {
                    self.stats.recoveries += 1;
                    self.relocate(pos);
                }
                (MoveKind::Collision { recovered_to }, reward)
            }
            Some(next) => {
                let reward = compute_reward(&self.world, state, next, self.has_key);
                learner.update_value(state, action, reward, next);
                self.stats.steps += 1;
                self.stats.total_reward += reward;
                self.relocate(next);
                (MoveKind::Moved, reward)
            }
        };

        self.termination = self.check_termination();
        debug!(
            tick = self.stats.ticks,
            step = self.stats.steps,
            ?action,
            ?kind,
            reward,
            has_key = self.has_key,
            "tick"
        );

        Some(StepOutcome {
            from: state,
            action,
            kind,
            reward,
            termination: self.termination,
        })
    }

    /// Steps until termination and returns the reason.
    pub fn run<R: Rng + ?Sized>(&mut self, learner: &mut Learner, rng: &mut R) -> Termination {
        loop {
            if let Some(termination) = self.termination {
                return termination;
            }
            self.step(learner, rng);
        }
    }

    /// Moves the agent onto a free cell, picking up the key if it lands on it.
    fn relocate(&mut self, pos: Position) {
        if let Err(err) = self.world.move_agent(pos) {
            warn!(%err, "agent relocation refused");
            return;
        }
        if pos == self.world.key() && !self.has_key {
            self.has_key = true;
            self.stats.key_found_at = Some(self.stats.steps);
            debug!(step = self.stats.steps, "picked up key");
        }
    }

    fn check_termination(&self) -> Option<Termination> {
        if self.has_key && self.world.agent() == self.world.door() {
            Some(Termination::Success)
        } else if self.stats.steps >= self.limits.step_cap {
            Some(Termination::StepLimit)
        } else if self.stats.ticks >= self.limits.max_ticks {
            Some(Termination::TickLimit)
        } else {
            None
        }
    }
}
