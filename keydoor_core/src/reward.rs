use crate::{Position, world::GridWorld};

pub const KEY_REWARD: f64 = 10.0;
pub const DOOR_WITH_KEY_REWARD: f64 = 20.0;
pub const DOOR_WITHOUT_KEY_PENALTY: f64 = -5.0;
pub const OBSTACLE_PENALTY: f64 = -10.0;
pub const DEAD_END_PENALTY: f64 = -5.0;
pub const PROGRESS_REWARD: f64 = 3.0;
pub const NO_PROGRESS_PENALTY: f64 = -1.0;
/// Flat penalty for a move that would leave the grid; applied by the episode loop.
pub const OFF_GRID_PENALTY: f64 = -10.0;

/// Reward for moving from `state` to the in-bounds cell `next`.
///
/// Rules apply in priority order: key, door, obstacle, dead end, then
/// distance shaping toward the key (before pickup) or the door (after).
/// Pure: depends only on its arguments and the world's terrain.
pub fn compute_reward(world: &GridWorld, state: Position, next: Position, has_key: bool) -> f64 {
    if next == world.key() {
        return KEY_REWARD;
    }
    if next == world.door() {
        return if has_key {
            DOOR_WITH_KEY_REWARD
        } else {
            DOOR_WITHOUT_KEY_PENALTY
        };
    }
    if world.is_obstacle(next) {
        return OBSTACLE_PENALTY;
    }
    if world.free_neighbors(next).next().is_none() {
        return DEAD_END_PENALTY;
    }

    let target = if has_key { world.door() } else { world.key() };
    if next.manhattan_distance(target) < state.manhattan_distance(target) {
        PROGRESS_REWARD
    } else {
        NO_PROGRESS_PENALTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::parse_world;

    fn world() -> GridWorld {
        parse_world(
            "
            .....D
            ...KO.
            ....OO
            R.....
            ",
        )
        .unwrap()
    }

    #[test]
    fn key_cell_pays_ten_regardless_of_state() {
        let world = world();
        let key = world.key();
        let left_of_key = Position::new(1, 2);
        assert_eq!(compute_reward(&world, left_of_key, key, false), KEY_REWARD);
        assert_eq!(compute_reward(&world, left_of_key, key, true), KEY_REWARD);
    }

    #[test]
    fn door_pays_only_with_key() {
        let world = world();
        let beside = Position::new(0, 4);
        assert_eq!(compute_reward(&world, beside, world.door(), true), 20.0);
        assert_eq!(compute_reward(&world, beside, world.door(), false), -5.0);
    }

    #[test]
    fn obstacle_costs_ten() {
        let world = world();
        assert_eq!(
            compute_reward(&world, Position::new(1, 3), Position::new(1, 4), true),
            OBSTACLE_PENALTY
        );
    }

    #[test]
    fn enclosed_cell_is_a_dead_end() {
        let world = parse_world(
            "
            R.O.
            ..OK
            OO.O
            D.O.
            ",
        )
        .unwrap();
        // (3, 3) is boxed in by obstacles and the grid edge.
        assert_eq!(
            compute_reward(&world, Position::new(3, 3), Position::new(3, 3), false),
            DEAD_END_PENALTY
        );
    }

    #[test]
    fn shaping_follows_the_active_subgoal() {
        let world = world();
        let from = Position::new(3, 1);
        let toward_key = Position::new(2, 1);
        let away_from_key = Position::new(3, 0);
        assert_eq!(compute_reward(&world, from, toward_key, false), PROGRESS_REWARD);
        assert_eq!(compute_reward(&world, from, away_from_key, false), NO_PROGRESS_PENALTY);

        // With the key in hand the door at (0, 5) becomes the target.
        let right = Position::new(3, 2);
        assert_eq!(compute_reward(&world, from, right, true), PROGRESS_REWARD);
        assert_eq!(compute_reward(&world, from, away_from_key, true), NO_PROGRESS_PENALTY);
    }

    #[test]
    fn same_inputs_same_reward() {
        let world = world();
        let (from, to) = (Position::new(3, 1), Position::new(3, 2));
        let first = compute_reward(&world, from, to, false);
        for _ in 0..10 {
            assert_eq!(compute_reward(&world, from, to, false), first);
        }
    }
}
