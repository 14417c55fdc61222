//! The 4x4 board.
//!
//! Tiles live directly in the matrix; a tile's position is the index of the
//! cell holding it, so there is no stored row/col that could drift.

use serde::{Deserialize, Serialize};

use crate::tile::{Level, Tile, TileId};

/// Side length of the board.
pub const SIZE: usize = 4;

/// A board coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Cell { row, col }
    }

    /// Whether the cell lies on the board.
    pub fn in_bounds(self) -> bool {
        self.row < SIZE && self.col < SIZE
    }

    /// All 16 cells in row-major order.
    pub fn all() -> impl Iterator<Item = Cell> {
        (0..SIZE).flat_map(|row| (0..SIZE).map(move |col| Cell { row, col }))
    }

    /// Right and down neighbours, so every adjacent pair is visited once.
    pub fn forward_neighbors(self) -> impl Iterator<Item = Cell> {
        let right = (self.col + 1 < SIZE).then(|| Cell::new(self.row, self.col + 1));
        let down = (self.row + 1 < SIZE).then(|| Cell::new(self.row + 1, self.col));
        right.into_iter().chain(down)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Fixed 4x4 matrix of optional tiles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    cells: [[Option<Tile>; SIZE]; SIZE],
}

impl Grid {
    pub fn empty() -> Self {
        Grid::default()
    }

    /// Build a grid from a compact pattern.
    ///
    /// Rows are separated by `/` or newlines; cells by whitespace. `.` is an
    /// empty cell, `J` a Joker and a number a rank. Ids are assigned from 1
    /// in row-major order.
    ///
    /// ```
    /// use tilefuse_core::grid::{Cell, Grid};
    /// use tilefuse_core::tile::Level;
    ///
    /// let grid = Grid::parse("3 3 . . / . J . . / . . . . / . . . 1").unwrap();
    /// assert_eq!(grid.get(Cell::new(1, 1)).unwrap().level, Level::Joker);
    /// assert_eq!(grid.tile_count(), 4);
    /// ```
    pub fn parse(pattern: &str) -> Option<Grid> {
        let rows: Vec<&str> = pattern
            .split(|c: char| c == '/' || c == '\n')
            .map(str::trim)
            .filter(|row| !row.is_empty())
            .collect();
        if rows.len() != SIZE {
            return None;
        }

        let mut grid = Grid::empty();
        let mut next_id = TileId(1);
        for (row, line) in rows.iter().enumerate() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != SIZE {
                return None;
            }
            for (col, token) in tokens.iter().enumerate() {
                let level = match *token {
                    "." => continue,
                    "J" | "j" => Level::Joker,
                    rank => Level::Rank(rank.parse::<u8>().ok().filter(|&r| r > 0)?),
                };
                grid.cells[row][col] = Some(Tile::new(next_id, level));
                next_id = next_id.next();
            }
        }
        Some(grid)
    }

    pub fn get(&self, cell: Cell) -> Option<&Tile> {
        self.cells.get(cell.row)?.get(cell.col)?.as_ref()
    }

    pub fn is_empty_at(&self, cell: Cell) -> bool {
        self.get(cell).is_none()
    }

    /// Place a tile, returning whatever occupied the cell.
    pub fn set(&mut self, cell: Cell, tile: Option<Tile>) -> Option<Tile> {
        std::mem::replace(&mut self.cells[cell.row][cell.col], tile)
    }

    pub fn take(&mut self, cell: Cell) -> Option<Tile> {
        self.cells[cell.row][cell.col].take()
    }

    /// Exchange the contents of two cells.
    pub fn swap(&mut self, a: Cell, b: Cell) {
        let first = self.take(a);
        let second = self.set(b, first);
        self.set(a, second);
    }

    /// Occupied cells with their tiles, in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = (Cell, &Tile)> {
        Cell::all().filter_map(move |cell| self.get(cell).map(|tile| (cell, tile)))
    }

    pub fn empty_cells(&self) -> Vec<Cell> {
        Cell::all().filter(|&cell| self.is_empty_at(cell)).collect()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles().count()
    }

    pub fn is_full(&self) -> bool {
        self.tiles().count() == SIZE * SIZE
    }

    /// Where the tile with `id` currently sits.
    pub fn position_of(&self, id: TileId) -> Option<Cell> {
        self.tiles().find(|(_, tile)| tile.id == id).map(|(cell, _)| cell)
    }

    /// Highest rank on the board; Jokers do not count.
    pub fn highest_rank(&self) -> Option<u8> {
        self.tiles().filter_map(|(_, tile)| tile.level.rank()).max()
    }

    /// Largest tile id on the board.
    pub fn max_id(&self) -> Option<TileId> {
        self.tiles().map(|(_, tile)| tile.id).max()
    }

    pub(crate) fn clear_turn_flags(&mut self) {
        for tile in self.cells.iter_mut().flatten().flatten() {
            tile.clear_turn_flags();
        }
    }
}

impl std::fmt::Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "+------+------+------+------+")?;
        for row in 0..SIZE {
            write!(f, "|")?;
            for col in 0..SIZE {
                match self.get(Cell::new(row, col)) {
                    Some(tile) => write!(f, "{:^6}|", tile.level.to_string())?,
                    None => write!(f, "      |")?,
                }
            }
            writeln!(f)?;
            writeln!(f, "+------+------+------+------+")?;
        }
        Ok(())
    }
}
