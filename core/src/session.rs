//! The game session: the only mutable object in the engine.
//!
//! Every player action goes through a [`GameSession`] method and completes
//! before the method returns. Reports carry one-shot [`Notice`]s for the UI.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, info, instrument};

use crate::config::GameConfig;
use crate::deadlock::{self, Recovery};
use crate::error::{GameError, InputLock, SelectionRejection};
use crate::grid::{Cell, Grid};
use crate::history::{BoardState, History, UndoRights, UndoSource};
use crate::persistence::{SavedSession, SAVED_SESSION_VERSION};
use crate::powerup::{
    Activation, BoardEffects, Economy, FrozenTiles, Inventory, PowerUpId, PowerUpKind, RankReward,
};
use crate::resolver::{self, MergeEvent};
use crate::selection::{PickProgress, Selection, SelectionSession};
use crate::tile::{Tile, TileId};
use crate::Direction;

/// One-shot event for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    PowerUpGranted { id: PowerUpId, kind: PowerUpKind },
    /// A new highest rank was reached but there was no room for a power-up.
    InventoryFull { rank: u8 },
    /// A Joker appeared.
    RareSpawn { cell: Cell },
    ExtraUndoBanked { credits: u32 },
    SlowMotionStarted { turns: u32 },
    TileFrozen { tile: TileId, cell: Cell, turns: u32 },
    TilesSwapped { first: Cell, second: Cell },
    TileDeleted { tile: TileId, cell: Cell },
    /// Deadlock recovery thawed a tile early.
    FrozenTileReleased { tile: TileId, cell: Option<Cell> },
    /// Deadlock recovery switched slow motion off.
    SlowMotionCancelled,
    GameOver,
}

/// Result of a directional move.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveReport {
    /// False when the direction changed nothing; no other state changed then.
    pub moved: bool,
    pub merged: bool,
    pub merges: Vec<MergeEvent>,
    pub score_gained: u64,
    pub spawned: Option<(Cell, Tile)>,
    pub notices: Vec<Notice>,
    pub game_over: bool,
}

/// Result of activating a power-up from the inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerUpUse {
    /// Took effect immediately and left the inventory.
    Applied { kind: PowerUpKind, notices: Vec<Notice> },
    /// Waiting for `required` tile picks.
    Armed { kind: PowerUpKind, required: usize },
}

/// Result of a valid tile pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    AlreadyPicked,
    Pending { remaining: usize },
    /// The power-up took effect and left the inventory.
    Applied {
        kind: PowerUpKind,
        cells: Vec<Cell>,
        notices: Vec<Notice>,
    },
}

type EffectHandler = fn(&mut GameSession, &[Cell]) -> Result<Vec<Notice>, GameError>;

/// Effect of each power-up type. Immediate types receive no cells.
fn effect_handler(kind: PowerUpKind) -> EffectHandler {
    match kind {
        PowerUpKind::Freeze => GameSession::apply_freeze,
        PowerUpKind::Swap => GameSession::apply_swap,
        PowerUpKind::Delete => GameSession::apply_delete,
        PowerUpKind::Undo => GameSession::apply_undo_credit,
        PowerUpKind::SlowMo => GameSession::apply_slow_motion,
    }
}

/// A single game.
///
/// The session owns its RNG, so a seed plus a sequence of actions always
/// produces the same game.
#[derive(Debug, Clone)]
pub struct GameSession {
    config: GameConfig,
    seed: u64,
    rng: SmallRng,
    board: BoardState,
    economy: Economy,
    history: History,
    selection: Selection,
    undo_rights: UndoRights,
    spawn_guard: bool,
    game_over: bool,
    finalized: bool,
    turn: u64,
}

impl GameSession {
    /// Start a new game: an empty board plus `initial_tiles` spawns.
    ///
    /// The config is expected to have passed [`GameConfig::validate`].
    pub fn new(config: GameConfig, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut grid = Grid::empty();
        let mut next_tile_id = TileId(1);
        for _ in 0..config.initial_tiles {
            if resolver::spawn_tile(&mut grid, &mut rng, &config.spawn_weights, next_tile_id).is_some() {
                next_tile_id = next_tile_id.next();
            }
        }
        grid.clear_turn_flags();
        Self::assemble(config, seed, rng, grid, next_tile_id)
    }

    /// Start from a prepared board.
    pub fn from_board(config: GameConfig, seed: u64, grid: Grid) -> Self {
        let next_tile_id = grid.max_id().map_or(TileId(1), TileId::next);
        let rng = SmallRng::seed_from_u64(seed);
        Self::assemble(config, seed, rng, grid, next_tile_id)
    }

    fn assemble(config: GameConfig, seed: u64, rng: SmallRng, grid: Grid, next_tile_id: TileId) -> Self {
        let highest = grid.highest_rank().unwrap_or(0);
        let economy = Economy::new(config.inventory_cap, highest);
        GameSession {
            config,
            seed,
            rng,
            board: BoardState {
                grid,
                score: 0,
                next_tile_id,
                effects: BoardEffects::default(),
            },
            economy,
            history: History::default(),
            selection: Selection::Idle,
            undo_rights: UndoRights::default(),
            spawn_guard: false,
            game_over: false,
            finalized: false,
            turn: 0,
        }
    }

    /// Throw the game away and start over with `seed`.
    pub fn reset(&mut self, seed: u64) {
        *self = GameSession::new(self.config.clone(), seed);
    }

    // -------------------------------------------------------------------------
    // Moves
    // -------------------------------------------------------------------------

    /// Slide every tile toward `direction`.
    ///
    /// A move that changes nothing returns `moved == false` and leaves score,
    /// spawns and history alone. If nothing could move at all, one recovery
    /// remedy is applied (or the game ends).
    #[instrument(level = "debug", skip(self))]
    pub fn make_move(&mut self, direction: Direction) -> Result<MoveReport, GameError> {
        if let Some(lock) = self.input_lock() {
            return Err(GameError::InputLocked(lock));
        }

        let mut start = self.board.grid.clone();
        start.clear_turn_flags();
        let resolution = resolver::resolve(&start, direction, &self.board.effects.frozen);

        let mut report = MoveReport::default();
        if !resolution.moved {
            if self.is_stuck() {
                self.recover(&mut report.notices);
                report.game_over = self.game_over;
            }
            return Ok(report);
        }

        self.history.push(self.board.clone());
        self.undo_rights.baseline_armed = true;
        self.turn += 1;

        report.moved = true;
        report.merged = resolution.merged;
        report.score_gained = resolution.score_delta();
        for merge in &resolution.merges {
            debug!(level = merge.level, joker = merge.is_joker, cell = %merge.cell, "merge");
        }
        report.merges = resolution.merges;
        self.board.grid = resolution.grid;
        self.board.score += report.score_gained;

        for tile in self.board.effects.frozen.tick() {
            debug!(%tile, "tile thawed");
        }

        if self.board.effects.slow_motion_active() {
            self.board.effects.slow_motion_turns -= 1;
        } else {
            report.spawned = self.spawn();
            if let Some((cell, tile)) = report.spawned {
                if tile.is_joker() {
                    report.notices.push(Notice::RareSpawn { cell });
                    self.spawn_guard = self.config.rare_spawn_guard;
                }
            }
        }

        if let Some(rank) = self.board.grid.highest_rank() {
            self.reward_rank(rank, &mut report.notices);
        }

        if self.is_stuck() {
            self.recover(&mut report.notices);
        }
        report.game_over = self.game_over;
        Ok(report)
    }

    fn spawn(&mut self) -> Option<(Cell, Tile)> {
        let spawned = resolver::spawn_tile(
            &mut self.board.grid,
            &mut self.rng,
            &self.config.spawn_weights,
            self.board.next_tile_id,
        );
        if spawned.is_some() {
            self.board.next_tile_id = self.board.next_tile_id.next();
        }
        spawned
    }

    fn reward_rank(&mut self, rank: u8, notices: &mut Vec<Notice>) {
        let reward = self
            .economy
            .on_rank_reached(&mut self.board.effects, rank, self.turn, &mut self.rng);
        match reward {
            Some(RankReward::Granted(power_up)) => {
                if power_up.kind == PowerUpKind::Undo {
                    self.history
                        .grow_to(History::capacity_for(self.economy.undo_power_ups_generated));
                }
                notices.push(Notice::PowerUpGranted {
                    id: power_up.id,
                    kind: power_up.kind,
                });
            }
            Some(RankReward::InventoryFull) => notices.push(Notice::InventoryFull { rank }),
            None => {}
        }
    }

    /// No empty cell and no mergeable pair, or no direction that changes anything.
    fn is_stuck(&self) -> bool {
        let frozen = &self.board.effects.frozen;
        !deadlock::can_make_any_move(&self.board.grid, frozen)
            || !resolver::legal_moves(&self.board.grid, frozen).contains(&true)
    }

    /// Apply one deadlock remedy, or end the game if none is left.
    fn recover(&mut self, notices: &mut Vec<Notice>) {
        match deadlock::recover(&self.board.grid, &mut self.board.effects, &mut self.rng) {
            Recovery::Released { tile, cell } => notices.push(Notice::FrozenTileReleased { tile, cell }),
            Recovery::SlowMotionCancelled => notices.push(Notice::SlowMotionCancelled),
            Recovery::Exhausted => {
                self.game_over = true;
                self.undo_rights.game_over_grant = true;
                info!(score = self.board.score, turn = self.turn, "game over");
                notices.push(Notice::GameOver);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Power-ups
    // -------------------------------------------------------------------------

    /// Use the power-up `id` from the inventory.
    ///
    /// Undo and SlowMo apply at once. Freeze, Swap and Delete open a
    /// selection and stay in the inventory until it completes. After the game
    /// ends only Undo can be activated.
    #[instrument(level = "debug", skip(self))]
    pub fn activate_power_up(&mut self, id: PowerUpId) -> Result<PowerUpUse, GameError> {
        let power_up = *self
            .economy
            .inventory
            .get(id)
            .ok_or(GameError::UnknownPowerUp(id))?;
        match self.input_lock() {
            Some(InputLock::GameOver) if power_up.kind == PowerUpKind::Undo => {}
            Some(lock) => return Err(GameError::InputLocked(lock)),
            None => {}
        }

        match power_up.kind.activation() {
            Activation::Select { required } => {
                self.selection.arm(power_up.kind, id, required);
                Ok(PowerUpUse::Armed {
                    kind: power_up.kind,
                    required,
                })
            }
            Activation::Immediate => {
                let notices = effect_handler(power_up.kind)(self, &[])?;
                self.economy.inventory.remove(id);
                Ok(PowerUpUse::Applied {
                    kind: power_up.kind,
                    notices,
                })
            }
        }
    }

    /// Pick a cell for the armed power-up.
    ///
    /// Invalid picks are rejected and leave the selection as it was. When
    /// the last pick arrives the effect is applied; an unsafe Freeze closes
    /// the selection but keeps the power-up.
    #[instrument(level = "debug", skip(self))]
    pub fn pick(&mut self, cell: Cell) -> Result<PickOutcome, GameError> {
        let progress = self
            .selection
            .pick(cell, &self.board.grid, &self.board.effects.frozen)
            .map_err(GameError::IllegalSelection)?;

        match progress {
            None => Err(GameError::NotArmed),
            Some(PickProgress::AlreadyPicked) => Ok(PickOutcome::AlreadyPicked),
            Some(PickProgress::Pending { remaining }) => Ok(PickOutcome::Pending { remaining }),
            Some(PickProgress::Complete(session)) => self.complete_selection(session),
        }
    }

    fn complete_selection(&mut self, session: SelectionSession) -> Result<PickOutcome, GameError> {
        let mut notices = effect_handler(session.kind)(self, &session.picked)?;
        self.economy.inventory.remove(session.power_up);
        if matches!(session.kind, PowerUpKind::Swap | PowerUpKind::Delete) && self.is_stuck() {
            self.recover(&mut notices);
        }
        Ok(PickOutcome::Applied {
            kind: session.kind,
            cells: session.picked,
            notices,
        })
    }

    /// Drop the armed selection. The power-up stays in the inventory.
    pub fn cancel_selection(&mut self) -> bool {
        self.selection.cancel().is_some()
    }

    fn apply_freeze(&mut self, cells: &[Cell]) -> Result<Vec<Notice>, GameError> {
        let &[cell] = cells else {
            return Err(GameError::NotArmed);
        };
        let tile = self
            .board
            .grid
            .get(cell)
            .map(|tile| tile.id)
            .ok_or(GameError::IllegalSelection(SelectionRejection::EmptyCell))?;
        let effects = &mut self.board.effects;
        if deadlock::would_freezing_cause_deadlock(
            &self.board.grid,
            tile,
            &effects.frozen,
            effects.slow_motion_turns,
            self.config.freeze_turns,
        ) {
            info!(%cell, "freeze rejected: it would deadlock the board");
            return Err(GameError::UnsafeFreeze { cell });
        }
        let turns = effects.frozen.freeze(tile, self.config.freeze_turns);
        debug!(%tile, turns, "tile frozen");
        Ok(vec![Notice::TileFrozen { tile, cell, turns }])
    }

    fn apply_swap(&mut self, cells: &[Cell]) -> Result<Vec<Notice>, GameError> {
        let &[first, second] = cells else {
            return Err(GameError::NotArmed);
        };
        self.board.grid.swap(first, second);
        debug!(%first, %second, "tiles swapped");
        Ok(vec![Notice::TilesSwapped { first, second }])
    }

    fn apply_delete(&mut self, cells: &[Cell]) -> Result<Vec<Notice>, GameError> {
        let &[cell] = cells else {
            return Err(GameError::NotArmed);
        };
        let tile = self
            .board
            .grid
            .take(cell)
            .ok_or(GameError::IllegalSelection(SelectionRejection::EmptyCell))?;
        self.board.effects.frozen.release(tile.id);
        debug!(tile = %tile.id, %cell, "tile deleted");
        Ok(vec![Notice::TileDeleted { tile: tile.id, cell }])
    }

    fn apply_undo_credit(&mut self, _cells: &[Cell]) -> Result<Vec<Notice>, GameError> {
        self.economy.extra_undo_credits += 1;
        Ok(vec![Notice::ExtraUndoBanked {
            credits: self.economy.extra_undo_credits,
        }])
    }

    fn apply_slow_motion(&mut self, _cells: &[Cell]) -> Result<Vec<Notice>, GameError> {
        let turns = self.config.slow_motion_turns;
        self.board.effects.slow_motion_turns = turns;
        Ok(vec![Notice::SlowMotionStarted { turns }])
    }

    // -------------------------------------------------------------------------
    // Undo
    // -------------------------------------------------------------------------

    /// Whether [`undo`](Self::undo) would succeed right now.
    pub fn can_undo(&self) -> bool {
        !self.selection.is_armed()
            && !self.spawn_guard
            && !self.history.is_empty()
            && self.undo_source().is_some()
    }

    fn undo_source(&self) -> Option<UndoSource> {
        self.undo_rights
            .choose(self.economy.extra_undo_credits, self.finalized)
    }

    /// Return to the board before the last successful move.
    ///
    /// Restores grid, score, tile counter and the replayable power-up state.
    /// The inventory, banked credits and the highest rank reached are left
    /// as they are.
    #[instrument(level = "debug", skip(self))]
    pub fn undo(&mut self) -> Result<UndoSource, GameError> {
        match self.input_lock() {
            Some(InputLock::GameOver) | None => {}
            Some(lock) => return Err(GameError::InputLocked(lock)),
        }
        let source = self.undo_source().ok_or(GameError::NoUndoAvailable)?;
        let snapshot = self.history.pop().ok_or(GameError::NoUndoAvailable)?;

        match source {
            UndoSource::ExtraCredit => self.economy.extra_undo_credits -= 1,
            UndoSource::GameOverGrant => self.undo_rights.game_over_grant = false,
            UndoSource::Baseline => self.undo_rights.baseline_armed = false,
        }
        self.board = snapshot;
        if self.game_over {
            info!(?source, "undo out of game over");
        }
        self.game_over = false;
        self.undo_rights.game_over_grant = false;
        Ok(source)
    }

    // -------------------------------------------------------------------------
    // Locks and lifecycle
    // -------------------------------------------------------------------------

    /// Why input is currently refused, if it is.
    pub fn input_lock(&self) -> Option<InputLock> {
        if self.selection.is_armed() {
            Some(InputLock::Selection)
        } else if self.game_over {
            Some(InputLock::GameOver)
        } else if self.spawn_guard {
            Some(InputLock::SpawnGuard)
        } else {
            None
        }
    }

    /// End the lock that follows a rare spawn.
    pub fn release_spawn_guard(&mut self) {
        self.spawn_guard = false;
    }

    /// Mark the score as submitted or discarded. Idempotent.
    pub fn finalize(&mut self) {
        if !self.finalized {
            info!(score = self.board.score, "score finalized");
        }
        self.finalized = true;
    }

    /// Capture everything needed to resume this game later.
    pub fn to_saved(&self) -> SavedSession {
        SavedSession {
            version: SAVED_SESSION_VERSION,
            board: self.board.clone(),
            economy: self.economy.clone(),
            history: self.history.clone(),
            undo_rights: self.undo_rights,
            turn: self.turn,
            game_over: self.game_over,
            finalized: self.finalized,
        }
    }

    /// Resume a saved game. Selections and the spawn guard are not saved.
    pub fn restore(config: GameConfig, seed: u64, saved: SavedSession) -> Self {
        let rng = SmallRng::seed_from_u64(seed ^ saved.turn.rotate_left(32));
        GameSession {
            config,
            seed,
            rng,
            board: saved.board,
            economy: saved.economy,
            history: saved.history,
            selection: Selection::Idle,
            undo_rights: saved.undo_rights,
            spawn_guard: false,
            game_over: saved.game_over,
            finalized: saved.finalized,
            turn: saved.turn,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn grid(&self) -> &Grid {
        &self.board.grid
    }

    pub fn score(&self) -> u64 {
        self.board.score
    }

    /// Highest rank ever reached this session.
    pub fn highest_rank(&self) -> u8 {
        self.economy.highest_rank
    }

    pub fn frozen(&self) -> &FrozenTiles {
        &self.board.effects.frozen
    }

    pub fn slow_motion_turns(&self) -> u32 {
        self.board.effects.slow_motion_turns
    }

    pub fn inventory(&self) -> &Inventory {
        &self.economy.inventory
    }

    pub fn extra_undo_credits(&self) -> u32 {
        self.economy.extra_undo_credits
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history_capacity(&self) -> usize {
        self.history.capacity()
    }

    pub fn selection(&self) -> Option<&SelectionSession> {
        self.selection.session()
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Successful moves made so far.
    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Legality of each direction as `[Up, Down, Left, Right]`.
    pub fn legal_moves(&self) -> [bool; 4] {
        resolver::legal_moves(&self.board.grid, &self.board.effects.frozen)
    }
}

impl std::fmt::Display for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Score: {}", self.board.score)?;
        writeln!(f, "+------+------+------+------+")?;
        for row in 0..crate::grid::SIZE {
            write!(f, "|")?;
            for col in 0..crate::grid::SIZE {
                match self.board.grid.get(Cell::new(row, col)) {
                    Some(tile) => {
                        let mut label = tile.level.to_string();
                        if self.board.effects.frozen.contains(tile.id) {
                            label.push('*');
                        }
                        write!(f, "{:^6}|", label)?;
                    }
                    None => write!(f, "      |")?,
                }
            }
            writeln!(f)?;
            writeln!(f, "+------+------+------+------+")?;
        }
        if self.board.effects.slow_motion_active() {
            writeln!(f, "Slow-Mo: {} turns", self.board.effects.slow_motion_turns)?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
