//! Persistence gateway: local session checkpoints, the high score and the
//! leaderboard.
//!
//! Backends return [`PersistenceError`]. The free functions at the bottom
//! are the boundary the game loop calls; they log failures and degrade
//! instead of propagating them, so a broken disk or leaderboard never
//! blocks play.

use std::fs;
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::PersistenceError;
use crate::history::{BoardState, History, UndoRights};
use crate::powerup::Economy;
use crate::session::GameSession;

pub const SAVED_SESSION_VERSION: u32 = 1;

/// Number of entries a leaderboard keeps.
pub const LEADERBOARD_SIZE: usize = 10;

/// Resumable checkpoint of a [`GameSession`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSession {
    pub version: u32,
    pub board: BoardState,
    pub economy: Economy,
    pub history: History,
    pub undo_rights: UndoRights,
    pub turn: u64,
    pub game_over: bool,
    pub finalized: bool,
}

impl SavedSession {
    /// A game that can still be resumed.
    pub fn has_saved_game(&self) -> bool {
        !self.finalized
    }

    pub fn has_finalized_game(&self) -> bool {
        self.finalized
    }

    /// The saved game ended but an undo could bring it back.
    pub fn can_undo_after_game_over(&self) -> bool {
        self.game_over
            && !self.history.is_empty()
            && self
                .undo_rights
                .choose(self.economy.extra_undo_credits, self.finalized)
                .is_some()
    }
}

// =============================================================================
// Session store
// =============================================================================

/// Local checkpoint storage.
pub trait SessionStore {
    fn save_session(&mut self, saved: &SavedSession) -> Result<(), PersistenceError>;
    fn load_session(&self) -> Result<Option<SavedSession>, PersistenceError>;
    fn clear_session(&mut self) -> Result<(), PersistenceError>;
    fn high_score(&self) -> Result<u64, PersistenceError>;
    fn set_high_score(&mut self, score: u64) -> Result<(), PersistenceError>;
}

/// JSON files in a directory.
///
/// Every write lands in a temporary file first and is then renamed over
/// the target, so an interrupted save leaves the previous file intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

const SESSION_FILE: &str = "session.json";
const HIGH_SCORE_FILE: &str = "high_score.json";

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FileStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), PersistenceError> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, value)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.dir.join(name)).map_err(|err| err.error)?;
        debug!(file = name, "saved");
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, PersistenceError> {
        match fs::read(self.dir.join(name)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl SessionStore for FileStore {
    fn save_session(&mut self, saved: &SavedSession) -> Result<(), PersistenceError> {
        self.write_json(SESSION_FILE, saved)
    }

    fn load_session(&self) -> Result<Option<SavedSession>, PersistenceError> {
        let saved: Option<SavedSession> = self.read_json(SESSION_FILE)?;
        match saved {
            Some(saved) if saved.version != SAVED_SESSION_VERSION => Err(PersistenceError::Backend(
                format!("unsupported session version {}", saved.version),
            )),
            other => Ok(other),
        }
    }

    fn clear_session(&mut self) -> Result<(), PersistenceError> {
        match fs::remove_file(self.dir.join(SESSION_FILE)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn high_score(&self) -> Result<u64, PersistenceError> {
        Ok(self.read_json(HIGH_SCORE_FILE)?.unwrap_or(0))
    }

    fn set_high_score(&mut self, score: u64) -> Result<(), PersistenceError> {
        self.write_json(HIGH_SCORE_FILE, &score)
    }
}

/// Store that keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    session: Option<SavedSession>,
    high_score: u64,
}

impl SessionStore for MemoryStore {
    fn save_session(&mut self, saved: &SavedSession) -> Result<(), PersistenceError> {
        self.session = Some(saved.clone());
        Ok(())
    }

    fn load_session(&self) -> Result<Option<SavedSession>, PersistenceError> {
        Ok(self.session.clone())
    }

    fn clear_session(&mut self) -> Result<(), PersistenceError> {
        self.session = None;
        Ok(())
    }

    fn high_score(&self) -> Result<u64, PersistenceError> {
        Ok(self.high_score)
    }

    fn set_high_score(&mut self, score: u64) -> Result<(), PersistenceError> {
        self.high_score = score;
        Ok(())
    }
}

// =============================================================================
// Leaderboard
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u64,
    pub highest_rank: u8,
}

/// Remote or local high-score table.
///
/// Retries and backoff are the backend's business; callers only see the
/// final answer.
pub trait Leaderboard {
    fn is_top_score(&self, score: u64) -> impl Future<Output = Result<bool, PersistenceError>> + Send;

    /// Returns whether the entry was accepted.
    fn submit_score(
        &self,
        score: u64,
        name: &str,
        highest_rank: u8,
    ) -> impl Future<Output = Result<bool, PersistenceError>> + Send;
}

/// Whether `score` would enter a table of `size` entries sorted best first.
pub fn ranks_in(entries: &[LeaderboardEntry], score: u64, size: usize) -> bool {
    score > 0 && (entries.len() < size || entries.iter().any(|entry| score > entry.score))
}

/// Insert `entry` keeping the table sorted and at most `size` long.
///
/// Returns whether the entry made it in. Ties keep the older entry first.
pub fn insert_ranked(entries: &mut Vec<LeaderboardEntry>, entry: LeaderboardEntry, size: usize) -> bool {
    if !ranks_in(entries, entry.score, size) {
        return false;
    }
    let at = entries
        .iter()
        .position(|existing| entry.score > existing.score)
        .unwrap_or(entries.len());
    entries.insert(at, entry);
    entries.truncate(size);
    true
}

/// Leaderboard held in memory.
#[derive(Debug)]
pub struct MemoryLeaderboard {
    entries: Mutex<Vec<LeaderboardEntry>>,
    size: usize,
}

impl Default for MemoryLeaderboard {
    fn default() -> Self {
        MemoryLeaderboard::new(LEADERBOARD_SIZE)
    }
}

impl MemoryLeaderboard {
    pub fn new(size: usize) -> Self {
        MemoryLeaderboard {
            entries: Mutex::new(Vec::with_capacity(size)),
            size,
        }
    }

    pub fn entries(&self) -> Result<Vec<LeaderboardEntry>, PersistenceError> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .map_err(|_| PersistenceError::Backend("leaderboard lock poisoned".to_string()))
    }
}

impl Leaderboard for MemoryLeaderboard {
    fn is_top_score(&self, score: u64) -> impl Future<Output = Result<bool, PersistenceError>> + Send {
        let result = self.entries().map(|entries| ranks_in(&entries, score, self.size));
        async move { result }
    }

    fn submit_score(
        &self,
        score: u64,
        name: &str,
        highest_rank: u8,
    ) -> impl Future<Output = Result<bool, PersistenceError>> + Send {
        let entry = LeaderboardEntry {
            name: name.to_string(),
            score,
            highest_rank,
        };
        let result = self
            .entries
            .lock()
            .map(|mut entries| insert_ranked(&mut entries, entry, self.size))
            .map_err(|_| PersistenceError::Backend("leaderboard lock poisoned".to_string()));
        async move { result }
    }
}

// =============================================================================
// Boundary helpers
// =============================================================================

/// Save `session` and raise the stored high score if it was beaten.
///
/// Finalized games are not saved. Returns whether the session was written;
/// on failure the previous checkpoint stays in place.
pub fn checkpoint<S: SessionStore + ?Sized>(store: &mut S, session: &GameSession) -> bool {
    if session.is_finalized() {
        return false;
    }
    match store.high_score() {
        Ok(best) if session.score() > best => {
            if let Err(err) = store.set_high_score(session.score()) {
                warn!(error = %err, "failed to save high score");
            }
        }
        Ok(_) => {}
        Err(err) => warn!(error = %err, "failed to read high score"),
    }
    match store.save_session(&session.to_saved()) {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "failed to save session, keeping the previous checkpoint");
            false
        }
    }
}

/// Load the stored session, treating unreadable data as no session.
pub fn load_checkpoint<S: SessionStore + ?Sized>(store: &S) -> Option<SavedSession> {
    match store.load_session() {
        Ok(saved) => saved,
        Err(err) => {
            warn!(error = %err, "failed to load saved session");
            None
        }
    }
}

/// Whether `score` would enter the leaderboard. Failures count as no.
pub async fn qualifies<L: Leaderboard + ?Sized>(leaderboard: &L, score: u64) -> bool {
    match leaderboard.is_top_score(score).await {
        Ok(qualifies) => qualifies,
        Err(err) => {
            warn!(error = %err, score, "leaderboard qualification check failed");
            false
        }
    }
}

/// Submit the session's score under `name`.
///
/// The session is finalized only when the leaderboard accepted the entry,
/// so a failed submission can be retried. A finalized session is never
/// submitted twice.
pub async fn submit_final_score<L: Leaderboard + ?Sized>(
    session: &mut GameSession,
    leaderboard: &L,
    name: &str,
) -> bool {
    if session.is_finalized() {
        return false;
    }
    let accepted = match leaderboard
        .submit_score(session.score(), name, session.highest_rank())
        .await
    {
        Ok(accepted) => accepted,
        Err(err) => {
            warn!(error = %err, score = session.score(), "score submission failed");
            false
        }
    };
    if accepted {
        session.finalize();
    }
    accepted
}
