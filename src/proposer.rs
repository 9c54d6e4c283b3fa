//! Move proposer contract.
//!
//! A proposer is anything that, given a description of the current
//! position, returns a candidate move with metadata. Proposers are
//! untrusted: they may return illegal notation, malformed output, or fail
//! outright. The turn controller owns recovery; this module only defines
//! the contract and the explicit failure taxonomy.

use crate::game::Side;
use derive_new::new;
use serde::{Deserialize, Serialize};

/// Number of legal moves included in a retry hint.
pub const HINT_LIMIT: usize = 10;

/// A candidate move returned by a proposer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
pub struct MoveProposal {
    /// The proposed move in standard algebraic notation.
    #[serde(rename = "move")]
    pub san: String,
    /// Evaluation of the position from the proposer's perspective.
    pub evaluation: f64,
    /// Why this move was chosen.
    pub explanation: String,
}

/// Position description handed to a proposer.
#[derive(Debug, Clone, new)]
pub struct TurnRequest {
    /// The side being asked to move.
    pub side: Side,
    /// ASCII board diagram from white's perspective.
    pub board: String,
    /// The position in FEN.
    pub fen: String,
    /// Formatted move history, one line per applied move.
    pub history: String,
    /// Legal-move hint, present only on the second attempt after an
    /// invalid proposal. At most [`HINT_LIMIT`] entries.
    pub hint: Option<Vec<String>>,
}

/// Why a proposal could not be obtained.
///
/// Distinguishes "the call failed" from "the reply was empty" from "the
/// reply did not parse" so the controller's fallback policy is explicit
/// branching, not exception interception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposeError {
    /// Transport or API failure reaching the proposer.
    CallFailed(String),
    /// The proposer returned no content.
    EmptyReply,
    /// The proposer returned content that is not a structured move reply.
    MalformedReply(String),
}

impl std::fmt::Display for ProposeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProposeError::CallFailed(reason) => write!(f, "Proposer call failed: {}", reason),
            ProposeError::EmptyReply => write!(f, "Proposer returned empty output"),
            ProposeError::MalformedReply(reason) => {
                write!(f, "Proposer reply malformed: {}", reason)
            }
        }
    }
}

impl std::error::Error for ProposeError {}

/// Trait for move-generating agents.
#[async_trait::async_trait]
pub trait MoveProposer: Send {
    /// Proposes a move for the position described by `request`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProposeError`] naming the failure mode; never panics
    /// on bad upstream output.
    async fn propose(&mut self, request: &TurnRequest) -> Result<MoveProposal, ProposeError>;

    /// The proposer's display name.
    fn name(&self) -> &str;
}
