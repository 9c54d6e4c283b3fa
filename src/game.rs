//! Authoritative game state machine.
//!
//! `GameState` is the single source of truth for a running match: current
//! position, side to move, ordered move history, and terminal status. The
//! only transition is [`GameState::apply`], which validates a proposed
//! move against the rules oracle and either advances the state or rejects
//! without touching it. Terminal states are absorbing.

use crate::oracle::{self, GameStatus};
use derive_new::new;
use serde::{Deserialize, Serialize};
use shakmaty::{Chess, Color};
use tracing::{debug, instrument};

/// A side in the match.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    /// White, moves first.
    White,
    /// Black.
    Black,
}

impl Side {
    /// Returns the opposing side.
    pub fn opponent(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

/// Final outcome of a match.
///
/// The display form is the conventional result string, with
/// "Game incomplete" for matches that stopped before a terminal position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Outcome {
    /// White won by checkmate.
    #[strum(serialize = "1-0")]
    WhiteWins,
    /// Black won by checkmate.
    #[strum(serialize = "0-1")]
    BlackWins,
    /// Stalemate, insufficient material, or the 75-move rule.
    #[strum(serialize = "1/2-1/2")]
    Draw,
    /// The match stopped without reaching a terminal position.
    #[strum(serialize = "Game incomplete")]
    Undetermined,
}

/// One applied move: notation plus the proposer's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
pub struct MoveRecord {
    /// The move in standard algebraic notation.
    pub san: String,
    /// The proposer's numeric evaluation of the move.
    pub evaluation: f64,
    /// The proposer's free-text rationale.
    pub explanation: String,
}

/// Rejection signal from [`GameState::apply`].
///
/// Together with the `Ok` arm this forms the tri-state result: applied,
/// rejected-illegal, rejected-terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// The move text is not a legal move in the current position.
    IllegalMove(String),
    /// The game is already over; no further moves are accepted.
    GameOver,
}

impl std::fmt::Display for ApplyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplyError::IllegalMove(san) => write!(f, "Illegal move '{}'", san),
            ApplyError::GameOver => write!(f, "Game is already over"),
        }
    }
}

impl std::error::Error for ApplyError {}

/// Authoritative match state.
///
/// Owned by the match driver for the duration of a game; frozen into a
/// [`crate::store::GameRecord`] once the match ends. Holds no collaborator
/// handles — proposers are injected into the turn controller instead.
#[derive(Debug, Clone)]
pub struct GameState {
    position: Chess,
    turn: Side,
    history: Vec<MoveRecord>,
    move_count: u32,
    game_over: bool,
    outcome: Outcome,
}

impl GameState {
    /// Creates a fresh in-progress game at the standard starting position.
    #[instrument]
    pub fn new() -> Self {
        Self {
            position: oracle::starting_position(),
            turn: Side::White,
            history: Vec::new(),
            move_count: 0,
            game_over: false,
            outcome: Outcome::Undetermined,
        }
    }

    /// Validates `record.san` against the current position and, on
    /// success, advances the state: new position, record appended, move
    /// count incremented, side flipped, terminal status re-queried.
    ///
    /// # Errors
    ///
    /// [`ApplyError::GameOver`] once terminal (absorbing — the state never
    /// changes again), [`ApplyError::IllegalMove`] when the oracle rejects
    /// the notation. On either error the state is unchanged.
    #[instrument(skip(self, record), fields(san = %record.san, side = %self.turn))]
    pub fn apply(&mut self, record: MoveRecord) -> Result<(), ApplyError> {
        if self.game_over {
            return Err(ApplyError::GameOver);
        }

        let next = oracle::apply_san(&self.position, &record.san)
            .map_err(|_| ApplyError::IllegalMove(record.san.clone()))?;

        self.position = next;
        self.history.push(record);
        self.move_count += 1;
        self.turn = self.turn.opponent();

        match oracle::status(&self.position) {
            GameStatus::Ongoing => {}
            GameStatus::Decisive { winner } => {
                self.game_over = true;
                self.outcome = match Side::from(winner) {
                    Side::White => Outcome::WhiteWins,
                    Side::Black => Outcome::BlackWins,
                };
                debug!(outcome = %self.outcome, "Game reached terminal state");
            }
            GameStatus::Drawn => {
                self.game_over = true;
                self.outcome = Outcome::Draw;
                debug!("Game drawn");
            }
        }

        Ok(())
    }

    /// The current position.
    pub fn position(&self) -> &Chess {
        &self.position
    }

    /// The current position as FEN.
    pub fn fen(&self) -> String {
        oracle::fen(&self.position)
    }

    /// The side to move.
    pub fn turn(&self) -> Side {
        self.turn
    }

    /// The applied moves in play order.
    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    /// Number of applied moves (plies). Always equals `history().len()`.
    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    /// Whether the game has reached a terminal position.
    pub fn is_over(&self) -> bool {
        self.game_over
    }

    /// The outcome; `Undetermined` while the game is in progress.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
