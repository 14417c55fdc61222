//! # Tilefuse Core Engine
//!
//! Game logic for a 4x4 tile-merging puzzle with Joker tiles and a small
//! power-up economy (Freeze, Swap, Delete, Undo, Slow-Mo). The engine is
//! synchronous and deterministic for a given seed; the only asynchronous
//! surface is the leaderboard in [`persistence`].
//!
//! ## Example
//!
//! ```rust
//! use tilefuse_core::{Direction, GameConfig, GameSession};
//!
//! let mut game = GameSession::new(GameConfig::default(), 42);
//! let report = game.make_move(Direction::Left).unwrap();
//! println!("Score: {}, Moved: {}", game.score(), report.moved);
//! ```

pub mod config;
pub mod deadlock;
pub mod error;
pub mod grid;
pub mod history;
pub mod persistence;
pub mod powerup;
pub mod resolver;
pub mod selection;
pub mod session;
pub mod tile;

pub use config::{GameConfig, SpawnWeights};
pub use error::{ConfigError, GameError, InputLock, PersistenceError, SelectionRejection};
pub use grid::{Cell, Grid, SIZE};
pub use history::UndoSource;
pub use persistence::{
    checkpoint, load_checkpoint, qualifies, submit_final_score, FileStore, Leaderboard, LeaderboardEntry,
    MemoryLeaderboard, MemoryStore, SavedSession, SessionStore,
};
pub use powerup::{PowerUp, PowerUpId, PowerUpKind};
pub use session::{GameSession, MoveReport, Notice, PickOutcome, PowerUpUse};
pub use tile::{Level, Tile, TileId};

/// The four move directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Direction {
    /// Convert a u8 to a Direction (0=Up, 1=Down, 2=Left, 3=Right).
    /// Returns None for invalid values.
    pub fn from_u8(value: u8) -> Option<Direction> {
        match value {
            0 => Some(Direction::Up),
            1 => Some(Direction::Down),
            2 => Some(Direction::Left),
            3 => Some(Direction::Right),
            _ => None,
        }
    }

    /// All four directions, in the order used by `legal_moves`.
    pub fn all() -> [Direction; 4] {
        [Direction::Up, Direction::Down, Direction::Left, Direction::Right]
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}
