//! Tile selection for interactive power-ups.
//!
//! `Idle -> Armed -> (picks) -> Idle`. Freeze and Delete need one pick,
//! Swap needs two. While armed, moves and undo are locked by the session.

use tracing::debug;

use crate::error::SelectionRejection;
use crate::grid::{Cell, Grid};
use crate::powerup::{FrozenTiles, PowerUpId, PowerUpKind};

/// An armed power-up collecting picks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSession {
    pub kind: PowerUpKind,
    pub power_up: PowerUpId,
    pub required: usize,
    pub picked: Vec<Cell>,
}

impl SelectionSession {
    pub fn remaining(&self) -> usize {
        self.required.saturating_sub(self.picked.len())
    }
}

/// Result of a valid pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickProgress {
    /// The cell was already picked; nothing changed.
    AlreadyPicked,
    /// More picks are needed.
    Pending { remaining: usize },
    /// All picks are in; the selection is back to idle.
    Complete(SelectionSession),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    Idle,
    Armed(SelectionSession),
}

impl Selection {
    pub fn is_armed(&self) -> bool {
        matches!(self, Selection::Armed(_))
    }

    pub fn session(&self) -> Option<&SelectionSession> {
        match self {
            Selection::Armed(session) => Some(session),
            Selection::Idle => None,
        }
    }

    /// Open a selection for `power_up`.
    pub fn arm(&mut self, kind: PowerUpKind, power_up: PowerUpId, required: usize) {
        debug!(%kind, required, "selection armed");
        *self = Selection::Armed(SelectionSession {
            kind,
            power_up,
            required,
            picked: Vec::with_capacity(required),
        });
    }

    /// Drop any armed selection without side effects.
    pub fn cancel(&mut self) -> Option<SelectionSession> {
        match std::mem::take(self) {
            Selection::Armed(session) => {
                debug!(kind = %session.kind, "selection cancelled");
                Some(session)
            }
            Selection::Idle => None,
        }
    }

    /// Record a pick.
    ///
    /// Returns `Ok(None)` when nothing is armed. An invalid pick leaves the
    /// selection untouched.
    pub fn pick(
        &mut self,
        cell: Cell,
        grid: &Grid,
        frozen: &FrozenTiles,
    ) -> Result<Option<PickProgress>, SelectionRejection> {
        let Selection::Armed(session) = self else {
            return Ok(None);
        };
        if !cell.in_bounds() {
            return Err(SelectionRejection::OutOfBounds);
        }
        let tile = grid.get(cell).ok_or(SelectionRejection::EmptyCell)?;
        if session.kind == PowerUpKind::Swap && frozen.contains(tile.id) {
            return Err(SelectionRejection::FrozenTile);
        }
        if session.picked.contains(&cell) {
            return Ok(Some(PickProgress::AlreadyPicked));
        }

        session.picked.push(cell);
        debug!(%cell, kind = %session.kind, "tile picked");
        if session.remaining() > 0 {
            return Ok(Some(PickProgress::Pending {
                remaining: session.remaining(),
            }));
        }
        Ok(self.cancel().map(PickProgress::Complete))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileId;

    fn board() -> Grid {
        Grid::parse("1 2 . . / . . . . / . . . . / . . . 3").unwrap()
    }

    #[test]
    fn test_pick_when_idle_is_ignored() {
        let mut selection = Selection::Idle;
        assert_eq!(selection.pick(Cell::new(0, 0), &board(), &FrozenTiles::new()), Ok(None));
    }

    #[test]
    fn test_delete_completes_after_one_pick() {
        let mut selection = Selection::Idle;
        selection.arm(PowerUpKind::Delete, PowerUpId(1), 1);
        let progress = selection
            .pick(Cell::new(3, 3), &board(), &FrozenTiles::new())
            .unwrap()
            .unwrap();
        match progress {
            PickProgress::Complete(session) => {
                assert_eq!(session.picked, vec![Cell::new(3, 3)]);
                assert_eq!(session.power_up, PowerUpId(1));
            }
            other => panic!("expected completion, got {other:?}"),
        }
        assert!(!selection.is_armed());
    }

    #[test]
    fn test_swap_needs_two_distinct_picks() {
        let mut selection = Selection::Idle;
        let frozen = FrozenTiles::new();
        selection.arm(PowerUpKind::Swap, PowerUpId(2), 2);

        assert_eq!(
            selection.pick(Cell::new(0, 0), &board(), &frozen),
            Ok(Some(PickProgress::Pending { remaining: 1 }))
        );
        assert_eq!(
            selection.pick(Cell::new(0, 0), &board(), &frozen),
            Ok(Some(PickProgress::AlreadyPicked))
        );
        assert!(selection.is_armed());
        assert!(matches!(
            selection.pick(Cell::new(0, 1), &board(), &frozen),
            Ok(Some(PickProgress::Complete(_)))
        ));
    }

    #[test]
    fn test_empty_cell_is_rejected_and_state_kept() {
        let mut selection = Selection::Idle;
        selection.arm(PowerUpKind::Freeze, PowerUpId(3), 1);
        let before = selection.clone();
        assert_eq!(
            selection.pick(Cell::new(2, 2), &board(), &FrozenTiles::new()),
            Err(SelectionRejection::EmptyCell)
        );
        assert_eq!(selection, before);
    }

    #[test]
    fn test_out_of_bounds_is_rejected() {
        let mut selection = Selection::Idle;
        selection.arm(PowerUpKind::Delete, PowerUpId(3), 1);
        assert_eq!(
            selection.pick(Cell::new(4, 0), &board(), &FrozenTiles::new()),
            Err(SelectionRejection::OutOfBounds)
        );
    }

    #[test]
    fn test_frozen_tile_cannot_be_swapped_but_can_be_frozen_again() {
        let mut frozen = FrozenTiles::new();
        frozen.freeze(TileId(1), 3);

        let mut swap = Selection::Idle;
        swap.arm(PowerUpKind::Swap, PowerUpId(4), 2);
        assert_eq!(
            swap.pick(Cell::new(0, 0), &board(), &frozen),
            Err(SelectionRejection::FrozenTile)
        );

        let mut freeze = Selection::Idle;
        freeze.arm(PowerUpKind::Freeze, PowerUpId(5), 1);
        assert!(matches!(
            freeze.pick(Cell::new(0, 0), &board(), &frozen),
            Ok(Some(PickProgress::Complete(_)))
        ));
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let mut selection = Selection::Idle;
        selection.arm(PowerUpKind::Swap, PowerUpId(6), 2);
        let cancelled = selection.cancel().unwrap();
        assert_eq!(cancelled.kind, PowerUpKind::Swap);
        assert!(!selection.is_armed());
        assert_eq!(selection.cancel(), None);
    }
}
