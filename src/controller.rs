//! Turn controller: one legal move per turn, despite an unreliable
//! proposer.
//!
//! Policy, in order: ask the proposer; if the reply is illegal, ask once
//! more with a legal-move hint; if that also fails (illegal, malformed,
//! errored, or empty), fall back to the first legal move in the oracle's
//! enumeration order with evaluation 0.0. Never more than two proposer
//! calls per turn.

use crate::driver::MatchEvent;
use crate::game::{GameState, MoveRecord};
use crate::oracle;
use crate::proposer::{HINT_LIMIT, MoveProposer, ProposeError, TurnRequest};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

/// The controller's resolution of one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnDecision {
    /// The move to apply, guaranteed legal at selection time.
    pub record: MoveRecord,
    /// True when the deterministic fallback was used.
    pub fallback: bool,
    /// Proposer calls spent on this turn (1 or 2).
    pub attempts: u8,
}

/// Raised only when the position has no legal moves at all, which callers
/// rule out by checking terminal status first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoLegalMoves;

impl std::fmt::Display for NoLegalMoves {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "No legal moves in this position")
    }
}

impl std::error::Error for NoLegalMoves {}

/// Resolves turns against untrusted proposers.
#[derive(Debug, Clone)]
pub struct TurnController {
    hint_limit: usize,
}

impl TurnController {
    /// Creates a controller with the standard hint budget.
    pub fn new() -> Self {
        Self {
            hint_limit: HINT_LIMIT,
        }
    }

    /// Obtains one legal move for the side to move in `state`.
    ///
    /// Emits [`MatchEvent::MoveRejected`] for each illegal proposal and
    /// [`MatchEvent::FallbackUsed`] when the deterministic fallback is
    /// taken. Observer loss is not an error; events are fire-and-forget.
    ///
    /// # Errors
    ///
    /// [`NoLegalMoves`] when the position has no legal continuation.
    #[instrument(skip_all, fields(proposer = %proposer.name(), side = %state.turn(), move_count = state.move_count()))]
    pub async fn next_move(
        &self,
        state: &GameState,
        proposer: &mut (dyn MoveProposer + Send),
        events: &UnboundedSender<MatchEvent>,
    ) -> Result<TurnDecision, NoLegalMoves> {
        let legal = oracle::legal_moves_san(state.position());
        let first_legal = legal.first().ok_or(NoLegalMoves)?.clone();
        let side = state.turn();

        let request = TurnRequest::new(
            side,
            oracle::render_board(state.position()),
            state.fen(),
            format_history(state.history()),
            None,
        );

        let (reason, attempts) = match proposer.propose(&request).await {
            Ok(proposal) if oracle::is_legal_san(state.position(), &proposal.san) => {
                debug!(san = %proposal.san, "First proposal accepted");
                return Ok(TurnDecision {
                    record: MoveRecord::new(proposal.san, proposal.evaluation, proposal.explanation),
                    fallback: false,
                    attempts: 1,
                });
            }
            Ok(proposal) => {
                warn!(san = %proposal.san, "Proposal rejected, retrying with hint");
                events
                    .send(MatchEvent::MoveRejected {
                        side,
                        san: proposal.san.clone(),
                        attempt: 1,
                    })
                    .ok();

                let hinted = TurnRequest {
                    hint: Some(legal.iter().take(self.hint_limit).cloned().collect()),
                    ..request
                };

                match proposer.propose(&hinted).await {
                    Ok(retry) if oracle::is_legal_san(state.position(), &retry.san) => {
                        debug!(san = %retry.san, "Hinted proposal accepted");
                        return Ok(TurnDecision {
                            record: MoveRecord::new(retry.san, retry.evaluation, retry.explanation),
                            fallback: false,
                            attempts: 2,
                        });
                    }
                    Ok(retry) => {
                        events
                            .send(MatchEvent::MoveRejected {
                                side,
                                san: retry.san.clone(),
                                attempt: 2,
                            })
                            .ok();
                        (format!("'{}' rejected after legal-move hint", retry.san), 2)
                    }
                    Err(e) => (propose_failure_reason(&e), 2),
                }
            }
            Err(e) => (propose_failure_reason(&e), 1),
        };

        info!(san = %first_legal, reason = %reason, "Using fallback move");
        events
            .send(MatchEvent::FallbackUsed {
                side,
                san: first_legal.clone(),
                reason: reason.clone(),
            })
            .ok();

        Ok(TurnDecision {
            record: MoveRecord::new(first_legal, 0.0, format!("Fallback move: {}", reason)),
            fallback: true,
            attempts,
        })
    }
}

impl Default for TurnController {
    fn default() -> Self {
        Self::new()
    }
}

fn propose_failure_reason(error: &ProposeError) -> String {
    match error {
        ProposeError::CallFailed(reason) => format!("proposer call failed ({})", reason),
        ProposeError::EmptyReply => "proposer returned empty output".to_string(),
        ProposeError::MalformedReply(reason) => format!("proposer reply malformed ({})", reason),
    }
}

/// Formats the move history the way proposer prompts expect it.
fn format_history(history: &[MoveRecord]) -> String {
    if history.is_empty() {
        return "No moves have been made yet.".to_string();
    }

    let mut text = "Move history:\n".to_string();
    for (i, record) in history.iter().enumerate() {
        let color = if i % 2 == 0 { "White" } else { "Black" };
        text.push_str(&format!(
            "{}. {}: {} - {}\n",
            i + 1,
            color,
            record.san,
            record.explanation
        ));
    }
    text
}
