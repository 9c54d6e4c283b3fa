//! Chess Arbiter - automated chess matches between LLM agents.
//!
//! Orchestrates a match between two move proposers, persists the finished
//! game as a JSON record, and replays saved records step by step.
//!
//! # Architecture
//!
//! - **Game state machine**: a single authoritative [`GameState`] that
//!   validates proposed moves against the rules oracle and records a
//!   replayable history
//! - **Turn controller**: retry-with-hint then deterministic fallback
//!   around untrusted proposers
//! - **Match driver**: runs turns to terminal or a move cap, publishing
//!   structured [`MatchEvent`]s to observers
//! - **Store / replay**: collision-safe JSON records and deterministic
//!   step-by-step reconstruction
//!
//! Chess rules (legal moves, SAN, FEN, terminal detection) come from the
//! [`oracle`] module, a thin wrapper over `shakmaty`; move generation
//! comes from [`MoveProposer`] implementations, LLM-backed in production
//! and scripted stubs in tests.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod controller;
mod driver;
mod game;
mod llm_client;
mod llm_proposer;
pub mod oracle;
mod proposer;
mod replay;
mod store;

// Crate-level exports - Configuration
pub use config::{ConfigError, MatchConfig, ProposerConfig};

// Crate-level exports - Turn controller
pub use controller::{NoLegalMoves, TurnController, TurnDecision};

// Crate-level exports - Match driver
pub use driver::{MatchDriver, MatchEvent};

// Crate-level exports - Game state machine
pub use game::{ApplyError, GameState, MoveRecord, Outcome, Side};

// Crate-level exports - LLM client
pub use llm_client::{LlmClient, LlmConfig, LlmError, LlmProvider};

// Crate-level exports - LLM proposer
pub use llm_proposer::LlmProposer;

// Crate-level exports - Proposer contract
pub use proposer::{HINT_LIMIT, MoveProposal, MoveProposer, ProposeError, TurnRequest};

// Crate-level exports - Persistence and replay
pub use replay::{ReplayError, ReplaySession, ReplayStep};
pub use store::{GameRecord, GameStore, RecordedMove, StoreError};
