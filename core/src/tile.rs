//! Tiles and their levels.

use serde::{Deserialize, Serialize};

/// Stable identifier of a tile, unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub u64);

impl TileId {
    /// The id following this one.
    pub fn next(self) -> TileId {
        TileId(self.0 + 1)
    }
}

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Progression tier of a tile.
///
/// A rank `k` tile is worth `2^k` points when created by a merge. The Joker
/// is wild: it merges with any ranked tile and produces that tile's rank + 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Rank(u8),
    Joker,
}

impl Level {
    pub fn is_joker(self) -> bool {
        matches!(self, Level::Joker)
    }

    /// The rank, or `None` for a Joker.
    pub fn rank(self) -> Option<u8> {
        match self {
            Level::Rank(rank) => Some(rank),
            Level::Joker => None,
        }
    }

    /// Rank produced by merging `self` with `other`, if the two are compatible.
    ///
    /// - equal ranks `k` and `k` give `k + 1`
    /// - a Joker and rank `k` give `k + 1`
    /// - two Jokers never merge
    pub fn merge_with(self, other: Level) -> Option<u8> {
        match (self, other) {
            (Level::Rank(a), Level::Rank(b)) if a == b => Some(a + 1),
            (Level::Joker, Level::Rank(k)) | (Level::Rank(k), Level::Joker) => Some(k + 1),
            _ => None,
        }
    }

    /// Face value shown to the player (`2^rank`), or `None` for a Joker.
    pub fn face_value(self) -> Option<u64> {
        self.rank().map(|rank| 1u64 << rank)
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.face_value() {
            Some(value) => write!(f, "{}", value),
            None => write!(f, "J"),
        }
    }
}

/// A tile on the board.
///
/// A tile carries no coordinates: its position is the grid cell that holds it.
/// `spawned` and `merged` only describe the last turn for presentation and
/// never influence gameplay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub level: Level,
    #[serde(default)]
    pub spawned: bool,
    #[serde(default)]
    pub merged: bool,
}

impl Tile {
    pub fn new(id: TileId, level: Level) -> Self {
        Tile {
            id,
            level,
            spawned: false,
            merged: false,
        }
    }

    pub fn is_joker(&self) -> bool {
        self.level.is_joker()
    }

    pub(crate) fn clear_turn_flags(&mut self) {
        self.spawned = false;
        self.merged = false;
    }
}
