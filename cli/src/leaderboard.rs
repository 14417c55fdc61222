//! Leaderboard kept in a JSON file next to the saved session.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use tilefuse_core::persistence::{insert_ranked, ranks_in, LEADERBOARD_SIZE};
use tilefuse_core::{Leaderboard, LeaderboardEntry, PersistenceError};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug)]
pub struct FileLeaderboard {
    path: PathBuf,
    size: usize,
    // Serializes read-modify-write cycles of the file.
    write_lock: Mutex<()>,
}

impl FileLeaderboard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileLeaderboard {
            path: path.into(),
            size: LEADERBOARD_SIZE,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current entries, best first. A missing file is an empty table.
    pub async fn entries(&self) -> Result<Vec<LeaderboardEntry>, PersistenceError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn store(&self, entries: &[LeaderboardEntry]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(entries)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

impl Leaderboard for FileLeaderboard {
    fn is_top_score(&self, score: u64) -> impl Future<Output = Result<bool, PersistenceError>> + Send {
        async move {
            let entries = self.entries().await?;
            Ok(ranks_in(&entries, score, self.size))
        }
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
        async move {
            let _guard = self.write_lock.lock().await;
            let mut entries = self.entries().await?;
            if !insert_ranked(&mut entries, entry, self.size) {
                return Ok(false);
            }
            self.store(&entries).await?;
            debug!(score, path = %self.path.display(), "leaderboard updated");
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty_and_qualifies() {
        let dir = tempfile::tempdir().unwrap();
        let board = FileLeaderboard::new(dir.path().join("scores.json"));
        assert!(board.entries().await.unwrap().is_empty());
        assert!(board.is_top_score(4).await.unwrap());
        assert!(!board.is_top_score(0).await.unwrap());
    }

    #[tokio::test]
    async fn test_submissions_persist_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("scores.json");
        let board = FileLeaderboard::new(&path);
        assert!(board.submit_score(120, "bo", 6).await.unwrap());
        assert!(board.submit_score(300, "ada", 8).await.unwrap());

        let reopened = FileLeaderboard::new(&path);
        let entries = reopened.entries().await.unwrap();
        let scores: Vec<u64> = entries.iter().map(|entry| entry.score).collect();
        assert_eq!(scores, vec![300, 120]);
        assert_eq!(entries[0].name, "ada");
    }

    #[tokio::test]
    async fn test_table_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let board = FileLeaderboard::new(dir.path().join("scores.json"));
        for score in 1..=(LEADERBOARD_SIZE as u64 + 2) {
            board.submit_score(score * 10, "p", 3).await.unwrap();
        }
        assert_eq!(board.entries().await.unwrap().len(), LEADERBOARD_SIZE);
        assert!(!board.is_top_score(20).await.unwrap());
        assert!(!board.submit_score(5, "late", 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        tokio::fs::write(&path, b"[oops").await.unwrap();
        let board = FileLeaderboard::new(&path);
        assert!(matches!(board.is_top_score(10).await, Err(PersistenceError::Json(_))));
    }
}
