//! Step-by-step replay of saved game records.
//!
//! A replay session reconstructs the starting position and re-validates
//! every recorded move against the rules oracle — stored FENs are never
//! trusted for legality, only cross-checked for display. A recorded move
//! that no longer validates aborts the session: every later position
//! would descend from a state that never occurred.

use crate::game::Side;
use crate::oracle;
use crate::store::{GameRecord, RecordedMove};
use shakmaty::Chess;
use tracing::{debug, instrument, warn};

/// One reconstructed replay position.
#[derive(Debug, Clone)]
pub struct ReplayStep {
    /// 1-based ply number.
    pub move_number: u32,
    /// The side that moved.
    pub color: Side,
    /// The move in standard algebraic notation.
    pub san: String,
    /// The recorded evaluation.
    pub evaluation: f64,
    /// The recorded rationale.
    pub explanation: String,
    /// Rendering of the reconstructed position.
    pub board: String,
    /// FEN of the reconstructed position.
    pub fen: String,
    /// True when the reconstructed FEN disagrees with the stored one.
    pub fen_mismatch: bool,
}

/// A recorded move failed re-validation during replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayError {
    /// 1-based ply number of the offending move.
    pub move_number: u32,
    /// The notation that failed to validate.
    pub san: String,
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Recorded move {} ('{}') is not legal in the reconstructed position",
            self.move_number, self.san
        )
    }
}

impl std::error::Error for ReplayError {}

/// Deterministic reconstruction of a saved match.
///
/// Owns its own transient board; the original game state is long gone.
pub struct ReplaySession {
    record: GameRecord,
    position: Chess,
    cursor: usize,
    poisoned: bool,
}

impl ReplaySession {
    /// Starts a session at the standard starting position.
    #[instrument(skip(record), fields(result = %record.result, total_moves = record.total_moves))]
    pub fn new(record: GameRecord) -> Self {
        debug!("Opening replay session");
        Self {
            record,
            position: oracle::starting_position(),
            cursor: 0,
            poisoned: false,
        }
    }

    /// The record being replayed.
    pub fn record(&self) -> &GameRecord {
        &self.record
    }

    /// Rendering of the current reconstructed position.
    pub fn board(&self) -> String {
        oracle::render_board(&self.position)
    }

    /// Remaining moves, `0` once exhausted or aborted.
    pub fn remaining(&self) -> usize {
        if self.poisoned {
            0
        } else {
            self.record.moves.len() - self.cursor
        }
    }

    /// Re-validates and applies the next recorded move.
    ///
    /// Returns `None` when the record is exhausted (or the session was
    /// aborted by an earlier error). An `Err` step poisons the session:
    /// subsequent calls return `None`.
    pub fn next_step(&mut self) -> Option<Result<ReplayStep, ReplayError>> {
        if self.poisoned || self.cursor >= self.record.moves.len() {
            return None;
        }

        let recorded: &RecordedMove = &self.record.moves[self.cursor];
        self.cursor += 1;

        let next = match oracle::apply_san(&self.position, &recorded.san) {
            Ok(next) => next,
            Err(e) => {
                warn!(error = %e, move_number = recorded.move_number, "Replay aborted");
                self.poisoned = true;
                return Some(Err(ReplayError {
                    move_number: recorded.move_number,
                    san: recorded.san.clone(),
                }));
            }
        };

        self.position = next;
        let fen = oracle::fen(&self.position);
        let fen_mismatch = fen != recorded.fen;
        if fen_mismatch {
            warn!(
                move_number = recorded.move_number,
                stored = %recorded.fen,
                reconstructed = %fen,
                "Stored FEN disagrees with reconstruction"
            );
        }

        Some(Ok(ReplayStep {
            move_number: recorded.move_number,
            color: recorded.color,
            san: recorded.san.clone(),
            evaluation: recorded.evaluation,
            explanation: recorded.explanation.clone(),
            board: oracle::render_board(&self.position),
            fen,
            fen_mismatch,
        }))
    }
}
