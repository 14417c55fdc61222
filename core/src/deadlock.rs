//! Deadlock detection and recovery.
//!
//! A board is deadlocked when it has no empty cell and no adjacent pair that
//! could merge under the current freeze state.

use rand::Rng;
use tracing::info;

use crate::grid::{Cell, Grid};
use crate::powerup::{BoardEffects, FrozenTiles};
use crate::tile::TileId;

/// Whether two tiles at adjacent cells could merge right now.
fn mergeable_pair(grid: &Grid, a: Cell, b: Cell, frozen: &FrozenTiles) -> bool {
    match (grid.get(a), grid.get(b)) {
        (Some(first), Some(second)) => {
            !frozen.contains(first.id)
                && !frozen.contains(second.id)
                && first.level.merge_with(second.level).is_some()
        }
        _ => false,
    }
}

/// True if any cell is empty or any 4-neighbour pair is merge-compatible.
pub fn can_make_any_move(grid: &Grid, frozen: &FrozenTiles) -> bool {
    if !grid.is_full() {
        return true;
    }
    Cell::all().any(|cell| {
        cell.forward_neighbors()
            .any(|neighbor| mergeable_pair(grid, cell, neighbor, frozen))
    })
}

/// Whether freezing `tile` would leave a board that cannot recover.
///
/// Simulates the freeze and re-checks [`can_make_any_move`]. When no move
/// remains the freeze is unsafe if slow motion is active (no spawn will
/// come) or the board is full (no room to spawn). A deadlocked board with
/// room is accepted on the expectation that a later spawn breaks it; this is
/// a cheap heuristic, not a lookahead.
pub fn would_freezing_cause_deadlock(
    grid: &Grid,
    tile: TileId,
    frozen: &FrozenTiles,
    slow_motion_turns: u32,
    freeze_turns: u32,
) -> bool {
    let mut simulated = frozen.clone();
    simulated.freeze(tile, freeze_turns);
    if can_make_any_move(grid, &simulated) {
        return false;
    }
    slow_motion_turns > 0 || grid.is_full()
}

/// A remedy applied to a stuck board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// A frozen tile was released early.
    Released { tile: TileId, cell: Option<Cell> },
    /// Slow motion was switched off so spawns resume.
    SlowMotionCancelled,
    /// Nothing left to try: the game is over.
    Exhausted,
}

/// Apply one remedy to a stuck board.
///
/// Releases a uniformly random frozen tile if there is one, otherwise
/// cancels slow motion if it is running. Only when neither applies does
/// this report [`Recovery::Exhausted`].
pub fn recover<R: Rng + ?Sized>(grid: &Grid, effects: &mut BoardEffects, rng: &mut R) -> Recovery {
    let frozen: Vec<TileId> = effects.frozen.ids().collect();
    if !frozen.is_empty() {
        let tile = frozen[rng.gen_range(0..frozen.len())];
        effects.frozen.release(tile);
        let cell = grid.position_of(tile);
        info!(%tile, "deadlock: released frozen tile");
        return Recovery::Released { tile, cell };
    }
    if effects.slow_motion_active() {
        effects.slow_motion_turns = 0;
        info!("deadlock: cancelled slow motion");
        return Recovery::SlowMotionCancelled;
    }
    Recovery::Exhausted
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    const LOCKED: &str = "1 2 1 2 / 2 1 2 1 / 1 2 1 2 / 2 1 2 1";
    // Only (3,2)-(3,3) and (2,3)-(3,3) can merge; all three pairs involve tile 16.
    const ONE_PAIR: &str = "1 2 1 2 / 2 1 2 1 / 1 2 1 2 / 2 1 2 2";

    fn grid(pattern: &str) -> Grid {
        Grid::parse(pattern).unwrap()
    }

    #[test]
    fn test_empty_cell_means_movable() {
        let board = grid("1 2 1 2 / 2 1 2 1 / 1 2 1 2 / 2 1 2 .");
        assert!(can_make_any_move(&board, &FrozenTiles::new()));
    }

    #[test]
    fn test_full_board_without_pairs_is_stuck() {
        assert!(!can_make_any_move(&grid(LOCKED), &FrozenTiles::new()));
    }

    #[test]
    fn test_full_board_with_pair_is_movable() {
        assert!(can_make_any_move(&grid(ONE_PAIR), &FrozenTiles::new()));
    }

    #[test]
    fn test_joker_pair_counts_as_movable() {
        let board = grid("1 2 1 2 / 2 1 2 1 / 1 2 1 2 / 2 1 2 J");
        assert!(can_make_any_move(&board, &FrozenTiles::new()));
    }

    #[test]
    fn test_frozen_pair_does_not_count() {
        let board = grid(ONE_PAIR);
        let mut frozen = FrozenTiles::new();
        frozen.freeze(TileId(16), 3);
        assert!(!can_make_any_move(&board, &frozen));
    }

    #[test]
    fn test_freezing_only_movable_tile_on_full_board_is_unsafe() {
        let board = grid(ONE_PAIR);
        assert!(would_freezing_cause_deadlock(&board, TileId(16), &FrozenTiles::new(), 0, 3));
    }

    #[test]
    fn test_freezing_uninvolved_tile_is_safe() {
        let board = grid(ONE_PAIR);
        assert!(!would_freezing_cause_deadlock(&board, TileId(1), &FrozenTiles::new(), 0, 3));
    }

    #[test]
    fn test_freeze_on_board_with_room_is_safe() {
        let board = grid("1 . . . / . . . . / . . . . / . . . .");
        assert!(!would_freezing_cause_deadlock(&board, TileId(1), &FrozenTiles::new(), 0, 3));
        // Room on the board still counts as movable even with slow motion.
        assert!(!would_freezing_cause_deadlock(&board, TileId(1), &FrozenTiles::new(), 5, 3));
    }

    #[test]
    fn test_recover_releases_frozen_tile_first() {
        let board = grid(LOCKED);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut effects = BoardEffects::default();
        effects.frozen.freeze(TileId(6), 2);
        effects.slow_motion_turns = 4;

        assert_eq!(
            recover(&board, &mut effects, &mut rng),
            Recovery::Released {
                tile: TileId(6),
                cell: Some(Cell::new(1, 1))
            }
        );
        assert!(effects.frozen.is_empty());
        assert_eq!(effects.slow_motion_turns, 4);

        assert_eq!(recover(&board, &mut effects, &mut rng), Recovery::SlowMotionCancelled);
        assert_eq!(effects.slow_motion_turns, 0);

        assert_eq!(recover(&board, &mut effects, &mut rng), Recovery::Exhausted);
    }
}
