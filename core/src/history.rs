//! Undo history.
//!
//! The stack holds [`BoardState`] values only. Inventory and the other
//! forward-only economy fields are not part of a snapshot, so undo cannot
//! restore a spent power-up.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use crate::powerup::BoardEffects;
use crate::tile::TileId;

/// Everything undo puts back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardState {
    pub grid: Grid,
    pub score: u64,
    pub next_tile_id: TileId,
    pub effects: BoardEffects,
}

/// Bounded snapshot stack. When full, the oldest entry is evicted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    entries: VecDeque<BoardState>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        History::with_capacity(1)
    }
}

impl History {
    pub fn with_capacity(capacity: usize) -> Self {
        History {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Retention cap for a session that has been granted
    /// `undo_power_ups_generated` Undo power-ups over its lifetime.
    pub fn capacity_for(undo_power_ups_generated: u32) -> usize {
        1 + undo_power_ups_generated as usize
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Raise the cap. The cap never shrinks.
    pub fn grow_to(&mut self, capacity: usize) {
        self.capacity = self.capacity.max(capacity);
    }

    pub fn push(&mut self, snapshot: BoardState) {
        self.entries.push_back(snapshot);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn pop(&mut self) -> Option<BoardState> {
        self.entries.pop_back()
    }

    pub fn peek(&self) -> Option<&BoardState> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Which right an undo consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UndoSource {
    /// A banked credit from an Undo power-up.
    ExtraCredit,
    /// The one-shot undo granted when the game ended.
    GameOverGrant,
    /// The single per-move undo.
    Baseline,
}

/// Per-session undo rights other than banked credits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoRights {
    /// Re-armed by every successful move, spent by a baseline undo.
    pub baseline_armed: bool,
    /// Granted once when the game ends.
    pub game_over_grant: bool,
}

impl UndoRights {
    /// Pick the right an undo would spend.
    ///
    /// Banked credits go first so the baseline stays armed for later. The
    /// baseline is unavailable once the score is finalized.
    pub fn choose(&self, extra_credits: u32, finalized: bool) -> Option<UndoSource> {
        if extra_credits > 0 {
            Some(UndoSource::ExtraCredit)
        } else if self.game_over_grant {
            Some(UndoSource::GameOverGrant)
        } else if self.baseline_armed && !finalized {
            Some(UndoSource::Baseline)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(score: u64) -> BoardState {
        BoardState {
            grid: Grid::empty(),
            score,
            next_tile_id: TileId(1),
            effects: BoardEffects::default(),
        }
    }

    #[test]
    fn test_default_capacity_is_one() {
        let mut history = History::default();
        history.push(state(1));
        history.push(state(2));
        assert_eq!(history.len(), 1);
        assert_eq!(history.peek().unwrap().score, 2);
    }

    #[test]
    fn test_oldest_entries_evict_first() {
        let mut history = History::with_capacity(History::capacity_for(2));
        for score in 1..=5 {
            history.push(state(score));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.pop().unwrap().score, 5);
        assert_eq!(history.pop().unwrap().score, 4);
        assert_eq!(history.pop().unwrap().score, 3);
        assert!(history.pop().is_none());
    }

    #[test]
    fn test_capacity_never_shrinks() {
        let mut history = History::with_capacity(3);
        history.grow_to(2);
        assert_eq!(history.capacity(), 3);
        history.grow_to(4);
        assert_eq!(history.capacity(), 4);
    }

    #[test]
    fn test_credit_preferred_over_baseline() {
        let rights = UndoRights {
            baseline_armed: true,
            game_over_grant: false,
        };
        assert_eq!(rights.choose(1, false), Some(UndoSource::ExtraCredit));
        assert_eq!(rights.choose(0, false), Some(UndoSource::Baseline));
    }

    #[test]
    fn test_finalized_blocks_baseline_only() {
        let rights = UndoRights {
            baseline_armed: true,
            game_over_grant: false,
        };
        assert_eq!(rights.choose(0, true), None);
        assert_eq!(rights.choose(2, true), Some(UndoSource::ExtraCredit));

        let after_game_over = UndoRights {
            baseline_armed: false,
            game_over_grant: true,
        };
        assert_eq!(after_game_over.choose(0, true), Some(UndoSource::GameOverGrant));
    }
}
