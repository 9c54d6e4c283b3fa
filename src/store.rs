//! Durable game records: JSON persistence with collision-safe naming.

use crate::game::Side;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// One move as persisted in a game record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedMove {
    /// 1-based ply number.
    pub move_number: u32,
    /// Which side played it.
    pub color: Side,
    /// The move in standard algebraic notation.
    #[serde(rename = "move")]
    pub san: String,
    /// The proposer's evaluation.
    pub evaluation: f64,
    /// The proposer's rationale.
    pub explanation: String,
    /// FEN of the position after the move.
    pub fen: String,
}

/// A completed (or stopped) match as persisted on disk.
///
/// Write-once; read back for replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Match date, ISO-8601.
    pub date: String,
    /// "1-0", "0-1", "1/2-1/2", or "Game incomplete".
    pub result: String,
    /// Total applied plies.
    pub total_moves: u32,
    /// FEN of the final position.
    pub final_fen: String,
    /// Whether a terminal position was reached.
    pub game_over: bool,
    /// The moves in play order.
    pub moves: Vec<RecordedMove>,
}

/// Storage error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Store error: {} at {}:{}", message, file, line)]
pub struct StoreError {
    /// Error message.
    pub message: String,
    /// Line number where the error was created.
    pub line: u32,
    /// Source file where the error was created.
    pub file: &'static str,
}

impl StoreError {
    /// Creates a new storage error with caller location tracking.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<std::io::Error> for StoreError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::new(format!("I/O error: {}", err))
    }
}

impl From<serde_json::Error> for StoreError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("JSON error: {}", err))
    }
}

/// File store for game records, rooted at a games directory.
#[derive(Debug, Clone)]
pub struct GameStore {
    dir: PathBuf,
}

impl GameStore {
    /// Creates a store rooted at `dir`. The directory is created on the
    /// first save, not here.
    #[instrument(skip(dir))]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!(dir = %dir.display(), "Creating game store");
        Self { dir }
    }

    /// The games directory.
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Saves `record` under a timestamped name derived from its date,
    /// appending `_01`, `_02`, … on collision. The document is written to
    /// a temporary file and renamed into place, so a failed write never
    /// leaves a partial record behind.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the record date is not ISO-8601 or on
    /// any I/O failure.
    #[instrument(skip(self, record), fields(result = %record.result, total_moves = record.total_moves))]
    pub fn save(&self, record: &GameRecord) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.dir)?;

        let stamp = chrono::DateTime::parse_from_rfc3339(&record.date)
            .map_err(|e| StoreError::new(format!("Bad record date '{}': {}", record.date, e)))?
            .format("%Y-%m-%d_%H%M%S")
            .to_string();

        let mut filename = format!("game_{}.json", stamp);
        let mut counter = 0u32;
        while self.dir.join(&filename).exists() {
            counter += 1;
            filename = format!("game_{}_{:02}.json", stamp, counter);
        }
        let path = self.dir.join(&filename);

        let json = serde_json::to_string_pretty(record)?;
        let tmp = self.dir.join(format!("{}.tmp", filename));
        if let Err(e) = fs::write(&tmp, json.as_bytes()) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        fs::rename(&tmp, &path)?;

        info!(path = %path.display(), "Game saved");
        Ok(path)
    }

    /// Lists saved record filenames, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the directory cannot be read (a
    /// missing directory lists as empty).
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with("game_") && name.ends_with(".json"))
            .collect();

        // Timestamped names sort chronologically; newest first.
        names.sort_by(|a, b| b.cmp(a));
        debug!(count = names.len(), "Listed saved games");
        Ok(names)
    }

    /// Resolves `key` to a saved record filename. The key is either a
    /// 1-based ordinal as printed by [`GameStore::list`] or a literal
    /// filename.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the ordinal is out of range or the
    /// file does not exist.
    #[instrument(skip(self))]
    pub fn resolve(&self, key: &str) -> Result<String, StoreError> {
        if let Ok(index) = key.parse::<usize>() {
            let names = self.list()?;
            return names
                .get(index.wrapping_sub(1))
                .cloned()
                .ok_or_else(|| {
                    StoreError::new(format!("No saved game #{} ({} available)", index, names.len()))
                });
        }

        if self.dir.join(key).exists() {
            Ok(key.to_string())
        } else {
            warn!(key, "Saved game not found");
            Err(StoreError::new(format!("No such saved game '{}'", key)))
        }
    }

    /// Loads a record by filename.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] for a missing file or malformed JSON.
    #[instrument(skip(self))]
    pub fn load(&self, name: &str) -> Result<GameRecord, StoreError> {
        let path = self.dir.join(name);
        let content = fs::read_to_string(&path)
            .map_err(|e| StoreError::new(format!("Failed to read '{}': {}", path.display(), e)))?;
        let record: GameRecord = serde_json::from_str(&content)
            .map_err(|e| StoreError::new(format!("Malformed record '{}': {}", name, e)))?;
        debug!(name, total_moves = record.total_moves, "Record loaded");
        Ok(record)
    }
}
