//! Move resolution and tile spawning.
//!
//! [`resolve`] is pure: it reads a grid and the frozen-tile map and returns
//! the resulting grid plus what happened. Frozen tiles split a line into
//! independent segments; tiles on either side slide up to them but never
//! past them, and a frozen tile never merges.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SpawnWeights;
use crate::grid::{Cell, Grid, SIZE};
use crate::powerup::FrozenTiles;
use crate::tile::{Level, Tile, TileId};
use crate::Direction;

/// One merge produced by a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeEvent {
    /// Rank of the resulting tile.
    pub level: u8,
    /// Whether a Joker was one of the two participants.
    pub is_joker: bool,
    /// Where the resulting tile ended up.
    pub cell: Cell,
    /// Points earned: `2^level`.
    pub score_delta: u64,
}

/// Outcome of resolving one directional move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub grid: Grid,
    /// Whether any tile changed cell or merged.
    pub moved: bool,
    pub merged: bool,
    pub merges: Vec<MergeEvent>,
}

impl Resolution {
    pub fn score_delta(&self) -> u64 {
        self.merges.iter().map(|merge| merge.score_delta).sum()
    }
}

/// Points awarded for creating a tile of `rank` by merging.
pub fn merge_score(rank: u8) -> u64 {
    1u64 << rank
}

/// Cells of line `index` for `direction`, ordered from the leading edge.
fn line_cells(direction: Direction, index: usize) -> [Cell; SIZE] {
    let mut cells = [Cell::new(0, 0); SIZE];
    for (step, cell) in cells.iter_mut().enumerate() {
        let back = SIZE - 1 - step;
        *cell = match direction {
            Direction::Left => Cell::new(index, step),
            Direction::Right => Cell::new(index, back),
            Direction::Up => Cell::new(step, index),
            Direction::Down => Cell::new(back, index),
        };
    }
    cells
}

/// Slide `direction` and merge, leaving the input untouched.
pub fn resolve(grid: &Grid, direction: Direction, frozen: &FrozenTiles) -> Resolution {
    let mut next = grid.clone();
    let mut merges = Vec::new();
    let mut moved = false;

    for index in 0..SIZE {
        let cells = line_cells(direction, index);
        let mut line: [Option<Tile>; SIZE] = [None; SIZE];
        for (slot, &cell) in line.iter_mut().zip(cells.iter()) {
            *slot = grid.get(cell).copied();
        }

        let (resolved, line_merges) = resolve_line(line, frozen);

        for (position, (&cell, tile)) in cells.iter().zip(resolved.iter()).enumerate() {
            if line[position].map(|t| t.id) != tile.map(|t| t.id) {
                moved = true;
            }
            next.set(cell, *tile);
        }
        for (position, level, is_joker) in line_merges {
            merges.push(MergeEvent {
                level,
                is_joker,
                cell: cells[position],
                score_delta: merge_score(level),
            });
        }
    }

    let merged = !merges.is_empty();
    Resolution {
        grid: next,
        moved: moved || merged,
        merged,
        merges,
    }
}

/// Resolve a single line toward index 0.
///
/// Returns the new line and, per merge, `(position, resulting rank, joker involved)`.
fn resolve_line(
    line: [Option<Tile>; SIZE],
    frozen: &FrozenTiles,
) -> ([Option<Tile>; SIZE], Vec<(usize, u8, bool)>) {
    let mut out: [Option<Tile>; SIZE] = [None; SIZE];
    let mut merged_here = [false; SIZE];
    let mut merges = Vec::new();
    let mut write = 0;

    for (read, slot) in line.iter().enumerate() {
        let Some(tile) = *slot else {
            continue;
        };

        if frozen.contains(tile.id) {
            out[read] = Some(tile);
            write = read + 1;
            continue;
        }

        if write > 0 && !merged_here[write - 1] {
            if let Some(previous) = out[write - 1] {
                if !frozen.contains(previous.id) {
                    if let Some(rank) = previous.level.merge_with(tile.level) {
                        let is_joker = previous.is_joker() || tile.is_joker();
                        out[write - 1] = Some(Tile {
                            id: previous.id,
                            level: Level::Rank(rank),
                            spawned: false,
                            merged: true,
                        });
                        merged_here[write - 1] = true;
                        merges.push((write - 1, rank, is_joker));
                        continue;
                    }
                }
            }
        }

        out[write] = Some(tile);
        write += 1;
    }

    (out, merges)
}

/// Whether `direction` would change the board.
pub fn can_move(grid: &Grid, direction: Direction, frozen: &FrozenTiles) -> bool {
    resolve(grid, direction, frozen).moved
}

/// Legality of each direction as `[Up, Down, Left, Right]`.
pub fn legal_moves(grid: &Grid, frozen: &FrozenTiles) -> [bool; 4] {
    Direction::all().map(|direction| can_move(grid, direction, frozen))
}

/// Draw the level of a new tile.
pub fn spawn_level<R: Rng + ?Sized>(rng: &mut R, weights: &SpawnWeights) -> Level {
    let total = weights.total().max(1);
    let roll = rng.gen_range(0..total);
    if roll < weights.joker {
        Level::Joker
    } else if roll < weights.joker + weights.rank1 {
        Level::Rank(1)
    } else {
        Level::Rank(2)
    }
}

/// Place a new tile with `id` in a uniformly random empty cell.
///
/// Returns `None` when the board is full.
pub fn spawn_tile<R: Rng + ?Sized>(
    grid: &mut Grid,
    rng: &mut R,
    weights: &SpawnWeights,
    id: TileId,
) -> Option<(Cell, Tile)> {
    let empty = grid.empty_cells();
    if empty.is_empty() {
        return None;
    }
    let cell = empty[rng.gen_range(0..empty.len())];
    let mut tile = Tile::new(id, spawn_level(rng, weights));
    tile.spawned = true;
    grid.set(cell, Some(tile));
    debug!(%cell, level = %tile.level, "tile spawned");
    Some((cell, tile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn grid(pattern: &str) -> Grid {
        Grid::parse(pattern).unwrap()
    }

    fn levels(grid: &Grid) -> Vec<Option<Level>> {
        Cell::all().map(|cell| grid.get(cell).map(|t| t.level)).collect()
    }

    // -------------------------------------------------------------------------
    // Basic sliding and merging
    // -------------------------------------------------------------------------

    #[test]
    fn test_two_rank3_tiles_merge_into_rank4() {
        let start = grid("3 . . 3 / . . . . / . . . . / . . . .");
        let result = resolve(&start, Direction::Left, &FrozenTiles::new());

        assert!(result.moved);
        assert!(result.merged);
        assert_eq!(result.merges.len(), 1);
        assert_eq!(result.merges[0].level, 4);
        assert_eq!(result.merges[0].score_delta, 16);
        assert_eq!(result.merges[0].cell, Cell::new(0, 0));
        assert_eq!(result.grid.get(Cell::new(0, 0)).unwrap().level, Level::Rank(4));
        assert_eq!(result.grid.tile_count(), 1);
    }

    #[test]
    fn test_slide_without_merge() {
        let start = grid(". 1 . 2 / . . . . / . . . . / . . . .");
        let result = resolve(&start, Direction::Left, &FrozenTiles::new());
        assert!(result.moved);
        assert!(!result.merged);
        let expected = grid("1 2 . . / . . . . / . . . . / . . . .");
        assert_eq!(levels(&result.grid), levels(&expected));
    }

    #[test]
    fn test_no_double_merge_chain() {
        let start = grid("1 1 1 1 / . . . . / . . . . / . . . .");
        let result = resolve(&start, Direction::Left, &FrozenTiles::new());
        let expected = grid("2 2 . . / . . . . / . . . . / . . . .");
        assert_eq!(levels(&result.grid), levels(&expected));
        assert_eq!(result.score_delta(), 8);
    }

    #[test]
    fn test_merged_tile_does_not_merge_again() {
        // 2 1 1 -> 2 2, not 3
        let start = grid("2 1 1 . / . . . . / . . . . / . . . .");
        let result = resolve(&start, Direction::Left, &FrozenTiles::new());
        let expected = grid("2 2 . . / . . . . / . . . . / . . . .");
        assert_eq!(levels(&result.grid), levels(&expected));
        assert_eq!(result.merges.len(), 1);
    }

    #[test]
    fn test_all_directions() {
        let start = grid("1 1 . . / . . . . / . . . . / . . . 2");
        let frozen = FrozenTiles::new();

        let right = resolve(&start, Direction::Right, &frozen);
        assert_eq!(right.grid.get(Cell::new(0, 3)).unwrap().level, Level::Rank(2));

        let up = resolve(&start, Direction::Up, &frozen);
        assert_eq!(up.grid.get(Cell::new(0, 3)).unwrap().level, Level::Rank(2));
        assert!(!up.merged);

        let down = resolve(&start, Direction::Down, &frozen);
        assert_eq!(down.grid.get(Cell::new(3, 0)).unwrap().level, Level::Rank(1));
        assert_eq!(down.grid.get(Cell::new(3, 1)).unwrap().level, Level::Rank(1));
    }

    #[test]
    fn test_unmoved_resolution_is_stable() {
        let start = grid("1 2 . . / 3 . . . / . . . . / . . . .");
        let result = resolve(&start, Direction::Left, &FrozenTiles::new());
        assert!(!result.moved);
        assert_eq!(result.grid, start);
        let again = resolve(&result.grid, Direction::Left, &FrozenTiles::new());
        assert!(!again.moved);
    }

    #[test]
    fn test_tile_count_drops_by_merge_count() {
        let start = grid("1 1 2 2 / 3 3 . . / J 4 . . / . . . .");
        let result = resolve(&start, Direction::Left, &FrozenTiles::new());
        assert_eq!(result.merges.len(), 4);
        assert_eq!(result.grid.tile_count(), start.tile_count() - 4);
        for merge in &result.merges {
            assert_eq!(merge.score_delta, 1u64 << merge.level);
        }
    }

    // -------------------------------------------------------------------------
    // Jokers
    // -------------------------------------------------------------------------

    #[test]
    fn test_joker_merges_with_rank2() {
        let start = grid("J 2 . . / . . . . / . . . . / . . . .");
        let result = resolve(&start, Direction::Left, &FrozenTiles::new());
        let tile = result.grid.get(Cell::new(0, 0)).unwrap();
        assert_eq!(tile.level, Level::Rank(3));
        assert!(!tile.is_joker());
        assert!(result.merges[0].is_joker);
        assert_eq!(result.merges[0].score_delta, 8);
    }

    #[test]
    fn test_two_jokers_do_not_merge() {
        let start = grid("J J . . / . . . . / . . . . / . . . .");
        let result = resolve(&start, Direction::Left, &FrozenTiles::new());
        assert!(!result.moved);
        assert!(!result.merged);
    }

    #[test]
    fn test_joker_between_jokers_merges_once() {
        let start = grid("J J 3 . / . . . . / . . . . / . . . .");
        let result = resolve(&start, Direction::Left, &FrozenTiles::new());
        assert_eq!(result.merges.len(), 1);
        assert_eq!(result.grid.get(Cell::new(0, 0)).unwrap().level, Level::Joker);
        assert_eq!(result.grid.get(Cell::new(0, 1)).unwrap().level, Level::Rank(4));
    }

    // -------------------------------------------------------------------------
    // Frozen tiles
    // -------------------------------------------------------------------------

    #[test]
    fn test_frozen_tile_stays_put_and_blocks() {
        // ids: 1 at (0,1), 2 at (0,3)
        let start = grid(". 1 . 1 / . . . . / . . . . / . . . .");
        let mut frozen = FrozenTiles::new();
        frozen.freeze(TileId(1), 3);

        let result = resolve(&start, Direction::Left, &frozen);
        assert_eq!(result.grid.position_of(TileId(1)), Some(Cell::new(0, 1)));
        assert_eq!(result.grid.position_of(TileId(2)), Some(Cell::new(0, 2)));
        assert!(!result.merged);
        assert!(result.moved);
    }

    #[test]
    fn test_tiles_behind_frozen_tile_slide_independently() {
        // ids: 1 at (0,0), frozen 2 at (0,2), 3 at (0,3)
        let start = grid("1 . 5 1 / . . . . / . . . . / . . . .");
        let mut frozen = FrozenTiles::new();
        frozen.freeze(TileId(2), 1);

        let result = resolve(&start, Direction::Right, &frozen);
        assert_eq!(result.grid.position_of(TileId(3)), Some(Cell::new(0, 3)));
        assert_eq!(result.grid.position_of(TileId(2)), Some(Cell::new(0, 2)));
        assert_eq!(result.grid.position_of(TileId(1)), Some(Cell::new(0, 1)));
        assert!(!result.merged);
    }

    #[test]
    fn test_frozen_tile_never_merges() {
        let start = grid("2 2 . . / . . . . / . . . . / . . . .");
        let mut frozen = FrozenTiles::new();
        frozen.freeze(TileId(1), 2);

        let result = resolve(&start, Direction::Left, &frozen);
        assert!(!result.moved);

        let result = resolve(&start, Direction::Right, &frozen);
        assert!(result.moved);
        assert!(!result.merged);
        assert_eq!(result.grid.position_of(TileId(1)), Some(Cell::new(0, 0)));
    }

    #[test]
    fn test_frozen_joker_is_inert() {
        let start = grid("J 3 . . / . . . . / . . . . / . . . .");
        let mut frozen = FrozenTiles::new();
        frozen.freeze(TileId(1), 1);
        let result = resolve(&start, Direction::Left, &frozen);
        assert!(!result.moved);
    }

    // -------------------------------------------------------------------------
    // Legal moves
    // -------------------------------------------------------------------------

    #[test]
    fn test_legal_moves_on_locked_board() {
        let start = grid("1 2 1 2 / 2 1 2 1 / 1 2 1 2 / 2 1 2 1");
        assert_eq!(legal_moves(&start, &FrozenTiles::new()), [false; 4]);
    }

    #[test]
    fn test_legal_moves_single_corner_tile() {
        let start = grid("1 . . . / . . . . / . . . . / . . . .");
        // [Up, Down, Left, Right]
        assert_eq!(legal_moves(&start, &FrozenTiles::new()), [false, true, false, true]);
    }

    // -------------------------------------------------------------------------
    // Spawning
    // -------------------------------------------------------------------------

    #[test]
    fn test_spawn_fills_an_empty_cell() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut board = grid("1 1 1 1 / 1 1 1 1 / 1 1 1 1 / 1 1 1 .");
        let weights = SpawnWeights {
            joker: 0,
            rank1: 0,
            rank2: 1,
        };
        let (cell, tile) = spawn_tile(&mut board, &mut rng, &weights, TileId(99)).unwrap();
        assert_eq!(cell, Cell::new(3, 3));
        assert_eq!(tile.level, Level::Rank(2));
        assert!(tile.spawned);
        assert!(board.is_full());
        assert!(spawn_tile(&mut board, &mut rng, &weights, TileId(100)).is_none());
    }

    #[test]
    fn test_spawn_weights_are_respected() {
        let mut rng = SmallRng::seed_from_u64(1);
        let jokers_only = SpawnWeights {
            joker: 1,
            rank1: 0,
            rank2: 0,
        };
        for _ in 0..20 {
            assert_eq!(spawn_level(&mut rng, &jokers_only), Level::Joker);
        }
    }

    #[test]
    fn test_spawn_determinism() {
        let weights = SpawnWeights::default();
        let mut a = Grid::empty();
        let mut b = Grid::empty();
        let mut rng_a = SmallRng::seed_from_u64(12345);
        let mut rng_b = SmallRng::seed_from_u64(12345);
        for id in 1..6 {
            spawn_tile(&mut a, &mut rng_a, &weights, TileId(id));
            spawn_tile(&mut b, &mut rng_b, &weights, TileId(id));
        }
        assert_eq!(a, b);
    }
}
