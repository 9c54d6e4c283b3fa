//! Match driver: runs turns to completion and builds the match log.
//!
//! The driver owns the [`GameState`] and two injected proposers, runs the
//! turn controller until the game is terminal or the configured move cap
//! is reached, and publishes [`MatchEvent`]s over a channel. It never
//! prints; console narration is an observer. A hard stop (a validated
//! move failing to apply, or a position with no legal moves slipping past
//! the terminal check) ends the loop early and the match is recorded as
//! incomplete rather than erroring the process.

use crate::controller::TurnController;
use crate::game::{GameState, Side};
use crate::oracle;
use crate::proposer::MoveProposer;
use crate::store::{GameRecord, RecordedMove};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, instrument};

/// Structured events published while a match runs.
#[derive(Debug, Clone)]
pub enum MatchEvent {
    /// A match began from the standard starting position.
    MatchStarted {
        /// White proposer's name.
        white: String,
        /// Black proposer's name.
        black: String,
        /// Rendering of the starting position.
        board: String,
    },
    /// A turn is being resolved.
    TurnStarted {
        /// 1-based ply number about to be played.
        move_number: u32,
        /// The side to move.
        side: Side,
    },
    /// A proposed move was rejected as illegal.
    MoveRejected {
        /// The side whose proposal was rejected.
        side: Side,
        /// The rejected notation.
        san: String,
        /// Which proposer call produced it (1 or 2).
        attempt: u8,
    },
    /// The deterministic fallback move was used.
    FallbackUsed {
        /// The side the fallback was chosen for.
        side: Side,
        /// The fallback move.
        san: String,
        /// Why the fallback was needed.
        reason: String,
    },
    /// A move was validated and applied.
    MoveApplied {
        /// 1-based ply number.
        move_number: u32,
        /// The side that moved.
        side: Side,
        /// The applied notation.
        san: String,
        /// The proposer's evaluation.
        evaluation: f64,
        /// The proposer's rationale.
        explanation: String,
        /// Rendering of the resulting position.
        board: String,
        /// True when this was the controller's fallback move.
        fallback: bool,
    },
    /// The match ended (terminal position, move cap, or hard stop).
    GameOver {
        /// Result string, "Game incomplete" when no terminal was reached.
        result: String,
        /// Total applied plies.
        total_moves: u32,
        /// Whether a terminal position was reached.
        game_over: bool,
    },
}

/// Drives one match between two proposers.
pub struct MatchDriver {
    state: GameState,
    white: Box<dyn MoveProposer + Send>,
    black: Box<dyn MoveProposer + Send>,
    controller: TurnController,
    max_moves: u32,
    events: UnboundedSender<MatchEvent>,
}

impl MatchDriver {
    /// Creates a driver for a fresh game.
    #[instrument(skip_all, fields(white = %white.name(), black = %black.name(), max_moves = max_moves))]
    pub fn new(
        white: Box<dyn MoveProposer + Send>,
        black: Box<dyn MoveProposer + Send>,
        max_moves: u32,
        events: UnboundedSender<MatchEvent>,
    ) -> Self {
        info!("Creating match driver");
        Self {
            state: GameState::new(),
            white,
            black,
            controller: TurnController::new(),
            max_moves,
            events,
        }
    }

    /// Runs the match to completion and returns the finished record.
    ///
    /// Always returns a record: hard stops are logged, the loop exits,
    /// and what was played so far is recorded as an incomplete game.
    #[instrument(skip(self))]
    pub async fn run(mut self) -> GameRecord {
        info!("Starting match");
        self.events
            .send(MatchEvent::MatchStarted {
                white: self.white.name().to_string(),
                black: self.black.name().to_string(),
                board: oracle::render_board(self.state.position()),
            })
            .ok();

        let mut log: Vec<RecordedMove> = Vec::new();

        while !self.state.is_over() && self.state.move_count() < self.max_moves {
            let side = self.state.turn();
            let move_number = self.state.move_count() + 1;
            self.events
                .send(MatchEvent::TurnStarted { move_number, side })
                .ok();

            let proposer = match side {
                Side::White => self.white.as_mut(),
                Side::Black => self.black.as_mut(),
            };

            let decision = match self
                .controller
                .next_move(&self.state, proposer, &self.events)
                .await
            {
                Ok(decision) => decision,
                Err(e) => {
                    error!(error = %e, "No legal move available; stopping match");
                    break;
                }
            };

            let record = decision.record.clone();
            if let Err(e) = self.state.apply(record.clone()) {
                // Unreachable if the oracle is consistent; hard stop.
                error!(error = %e, san = %record.san, "Validated move failed to apply; stopping match");
                break;
            }

            log.push(RecordedMove {
                move_number: self.state.move_count(),
                color: side,
                san: record.san.clone(),
                evaluation: record.evaluation,
                explanation: record.explanation.clone(),
                fen: self.state.fen(),
            });

            debug!(move_number, san = %record.san, "Turn resolved");
            self.events
                .send(MatchEvent::MoveApplied {
                    move_number,
                    side,
                    san: record.san,
                    evaluation: record.evaluation,
                    explanation: record.explanation,
                    board: oracle::render_board(self.state.position()),
                    fallback: decision.fallback,
                })
                .ok();
        }

        let result = self.state.outcome().to_string();
        info!(result = %result, total_moves = self.state.move_count(), "Match finished");
        self.events
            .send(MatchEvent::GameOver {
                result: result.clone(),
                total_moves: self.state.move_count(),
                game_over: self.state.is_over(),
            })
            .ok();

        GameRecord {
            date: chrono::Local::now().to_rfc3339(),
            result,
            total_moves: self.state.move_count(),
            final_fen: self.state.fen(),
            game_over: self.state.is_over(),
            moves: log,
        }
    }
}
