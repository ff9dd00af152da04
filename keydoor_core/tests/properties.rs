use keydoor_core::{
    Position,
    config::{EpisodeConfig, LearnerConfig, TrainingConfig, WorldConfig},
    episode::{Episode, MoveKind, Termination},
    generator::{build_valid_world, is_door_boundary},
    learner::{Action, Learner},
    map::Grid,
    reward::compute_reward,
    trainer::Trainer,
    world::{GridWorld, Terrain},
};
use rand::{SeedableRng, rngs::StdRng};

#[test]
fn open_five_by_ten_grid_is_connected() {
    let world = GridWorld::new(
        Grid::<Terrain>::new(5, 10),
        Position::new(4, 0),
        Position::new(0, 5),
        Position::new(0, 9),
    )
    .unwrap();

    assert!(is_door_boundary(world.door(), world.cols()));
    assert!(world.is_reachable(Position::new(4, 0), Position::new(0, 5)));
    assert!(world.is_reachable(Position::new(0, 5), Position::new(0, 9)));
}

#[test]
fn generation_postconditions_hold_for_custom_ranges() {
    let config = WorldConfig {
        min_height: 3,
        max_height: 4,
        min_width: 3,
        max_width: 6,
        obstacle_density: 0.3,
        max_generation_attempts: 10_000,
    };
    for seed in 0..100 {
        let world = build_valid_world(&mut StdRng::seed_from_u64(seed), &config).unwrap();
        assert!(world.is_reachable(world.start(), world.key()));
        assert!(world.is_reachable(world.key(), world.door()));
        assert!(is_door_boundary(world.door(), world.cols()));

        let markers = [world.start(), world.key(), world.door()];
        assert_ne!(markers[0], markers[1]);
        assert_ne!(markers[0], markers[2]);
        assert_ne!(markers[1], markers[2]);
        assert!(markers.iter().all(|pos| world.is_free(*pos)));
    }
}

#[test]
fn reward_ignores_has_key_and_shaping_on_the_key_cell() {
    let mut terrain = Grid::<Terrain>::new(5, 6);
    terrain.set(Position::new(1, 3), Terrain::Obstacle).unwrap();
    let world = GridWorld::new(
        terrain,
        Position::new(4, 0),
        Position::new(2, 3),
        Position::new(0, 5),
    )
    .unwrap();

    let state = Position::new(2, 2);
    let next = Action::Right.apply(state).unwrap();
    assert_eq!(next, Position::new(2, 3));
    assert_eq!(compute_reward(&world, state, next, false), 10.0);
    assert_eq!(compute_reward(&world, state, next, true), 10.0);
}

#[test]
fn every_episode_terminates_within_its_limits() {
    for seed in 0..30 {
        let config = TrainingConfig {
            episodes: 5,
            seed: Some(seed),
            learner: LearnerConfig {
                learning_rate: 0.2,
                discount: 0.9,
                exploration: 0.3,
            },
            episode: EpisodeConfig {
                step_cap: 20,
                max_ticks: 400,
            },
            ..TrainingConfig::default()
        };
        let reports = Trainer::new(config).unwrap().train().unwrap();
        assert_eq!(reports.len(), 5);
        for report in reports {
            assert!(report.stats.steps <= 20);
            assert!(report.stats.ticks <= 400);
            if report.termination == Termination::Success {
                assert!(report.stats.key_found_at.is_some());
            }
        }
    }
}

#[test]
fn stepwise_driving_matches_trainer_bookkeeping() {
    let config = TrainingConfig {
        seed: Some(2024),
        ..TrainingConfig::default()
    };
    let mut trainer = Trainer::new(config).unwrap();
    let mut episode = trainer.new_episode().unwrap();

    let mut counted = 0;
    while let Some(outcome) = trainer.step(&mut episode) {
        if outcome.kind == MoveKind::Moved {
            counted += 1;
        }
        assert_eq!(outcome.termination, episode.termination());
    }

    let report = trainer.finish_episode(&episode).unwrap();
    assert_eq!(report.stats.steps, counted);
    assert!(trainer.is_finished());
}

#[test]
fn collision_penalty_is_learned_at_the_pre_move_state() {
    let mut terrain = Grid::<Terrain>::new(3, 4);
    terrain.set(Position::new(2, 1), Terrain::Obstacle).unwrap();
    let world = GridWorld::new(
        terrain,
        Position::new(2, 0),
        Position::new(0, 2),
        Position::new(0, 3),
    )
    .unwrap();

    let mut learner = Learner::new(LearnerConfig {
        learning_rate: 1.0,
        discount: 0.0,
        exploration: 0.0,
    });
    // Make Right (into the obstacle) the greedy choice at the start.
    learner.update_value(Position::new(2, 0), Action::Right, 1.0, Position::new(2, 1));

    let mut episode = Episode::new(world, EpisodeConfig::default());
    let outcome = episode
        .step(&mut learner, &mut StdRng::seed_from_u64(8))
        .unwrap();

    assert_eq!(outcome.from, Position::new(2, 0));
    assert_eq!(outcome.reward, -10.0);
    assert_eq!(
        learner.table().value(Position::new(2, 0), Action::Right),
        -10.0
    );
    // The only free neighbour of the start is directly above it.
    assert_eq!(episode.position(), Position::new(1, 0));
}
