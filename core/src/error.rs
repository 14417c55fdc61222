//! Error types.
//!
//! A directional move that changes nothing is not an error: it is reported
//! as [`MoveReport::moved`](crate::session::MoveReport) being `false`.

use std::io;

use thiserror::Error;

use crate::grid::Cell;
use crate::powerup::PowerUpId;

/// Why player input is currently refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLock {
    /// An interactive power-up is waiting for tile picks.
    Selection,
    /// A rare tile just spawned and the driver has not released the guard.
    SpawnGuard,
    /// The game is over; only undo can continue it.
    GameOver,
}

impl std::fmt::Display for InputLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputLock::Selection => write!(f, "a power-up is waiting for a tile pick"),
            InputLock::SpawnGuard => write!(f, "a rare tile just appeared"),
            InputLock::GameOver => write!(f, "the game is over"),
        }
    }
}

/// Why a tile pick was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRejection {
    OutOfBounds,
    EmptyCell,
    /// Frozen tiles cannot be swapped.
    FrozenTile,
}

impl std::fmt::Display for SelectionRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionRejection::OutOfBounds => write!(f, "cell is off the board"),
            SelectionRejection::EmptyCell => write!(f, "cell holds no tile"),
            SelectionRejection::FrozenTile => write!(f, "frozen tiles cannot be swapped"),
        }
    }
}

/// Rejection of a player action. State is left unchanged unless noted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("input locked: {0}")]
    InputLocked(InputLock),

    #[error("illegal selection: {0}")]
    IllegalSelection(SelectionRejection),

    /// Freezing the tile would leave a board that cannot recover. The
    /// selection is closed and the power-up stays in the inventory.
    #[error("freezing the tile at {cell} would leave no possible move")]
    UnsafeFreeze { cell: Cell },

    #[error("no undo available")]
    NoUndoAvailable,

    #[error("no power-up with id {0:?} in the inventory")]
    UnknownPowerUp(PowerUpId),

    #[error("no power-up is waiting for a pick")]
    NotArmed,
}

/// Failure inside a persistence backend.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Invalid [`GameConfig`](crate::config::GameConfig).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("spawn weights must not all be zero")]
    ZeroSpawnWeights,

    #[error("initial_tiles must be between 1 and 16, got {0}")]
    InitialTiles(usize),

    #[error("inventory_cap must be at least 1")]
    ZeroInventory,

    #[error("{0} must be at least 1")]
    ZeroTurns(&'static str),
}
