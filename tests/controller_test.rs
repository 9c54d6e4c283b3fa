//! Tests for the turn controller's retry and fallback policy.

use chess_arbiter::{
    GameState, MoveProposal, MoveProposer, MoveRecord, ProposeError, TurnController, TurnRequest,
    oracle,
};
use std::collections::VecDeque;
use tokio::sync::mpsc;

/// Proposer that replays a scripted sequence of replies and records what
/// it was asked.
struct ScriptedProposer {
    name: String,
    replies: VecDeque<Result<MoveProposal, ProposeError>>,
    calls: usize,
    hints_seen: Vec<Option<Vec<String>>>,
}

impl ScriptedProposer {
    fn new(replies: Vec<Result<MoveProposal, ProposeError>>) -> Self {
        Self {
            name: "Scripted".to_string(),
            replies: replies.into(),
            calls: 0,
            hints_seen: Vec::new(),
        }
    }
}

#[async_trait::async_trait]
impl MoveProposer for ScriptedProposer {
    async fn propose(&mut self, request: &TurnRequest) -> Result<MoveProposal, ProposeError> {
        self.calls += 1;
        self.hints_seen.push(request.hint.clone());
        self.replies
            .pop_front()
            .unwrap_or(Err(ProposeError::EmptyReply))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn proposal(san: &str) -> Result<MoveProposal, ProposeError> {
    Ok(MoveProposal::new(san.to_string(), 0.5, "scripted".to_string()))
}

#[tokio::test]
async fn test_always_illegal_proposer_falls_back_to_first_legal() {
    let state = GameState::new();
    let first_legal = oracle::legal_moves_san(state.position())[0].clone();

    // Illegal on both attempts; the controller must not loop further.
    let mut proposer = ScriptedProposer::new(vec![proposal("Qh5"), proposal("Ke4")]);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let controller = TurnController::new();
    let decision = controller
        .next_move(&state, &mut proposer, &tx)
        .await
        .expect("starting position has legal moves");

    assert!(decision.fallback);
    assert_eq!(decision.attempts, 2);
    assert_eq!(proposer.calls, 2, "two-attempt budget, never more");
    assert_eq!(decision.record.san, first_legal);
    assert_eq!(decision.record.evaluation, 0.0);
    assert!(decision.record.explanation.starts_with("Fallback move:"));

    // Two rejections and one fallback were published.
    drop(tx);
    let mut rejected = 0;
    let mut fallbacks = 0;
    while let Ok(event) = rx.try_recv() {
        match event {
            chess_arbiter::MatchEvent::MoveRejected { .. } => rejected += 1,
            chess_arbiter::MatchEvent::FallbackUsed { .. } => fallbacks += 1,
            _ => {}
        }
    }
    assert_eq!(rejected, 2);
    assert_eq!(fallbacks, 1);
}

#[tokio::test]
async fn test_proposer_error_falls_back_without_retry() {
    let state = GameState::new();
    let mut proposer = ScriptedProposer::new(vec![Err(ProposeError::CallFailed(
        "connection refused".to_string(),
    ))]);
    let (tx, _rx) = mpsc::unbounded_channel();

    let decision = TurnController::new()
        .next_move(&state, &mut proposer, &tx)
        .await
        .expect("starting position has legal moves");

    assert!(decision.fallback);
    assert_eq!(decision.attempts, 1);
    assert_eq!(proposer.calls, 1, "call failure gets no hint retry");
    assert!(decision.record.explanation.contains("connection refused"));
}

#[tokio::test]
async fn test_hint_retry_recovers_an_invalid_first_proposal() {
    let state = GameState::new();
    let mut proposer = ScriptedProposer::new(vec![proposal("Qh5"), proposal("e4")]);
    let (tx, _rx) = mpsc::unbounded_channel();

    let decision = TurnController::new()
        .next_move(&state, &mut proposer, &tx)
        .await
        .expect("starting position has legal moves");

    assert!(!decision.fallback);
    assert_eq!(decision.attempts, 2);
    assert_eq!(decision.record.san, "e4");
    assert_eq!(decision.record.evaluation, 0.5);

    // First ask carries no hint; the retry lists at most ten legal moves.
    assert_eq!(proposer.hints_seen[0], None);
    let hint = proposer.hints_seen[1]
        .as_ref()
        .expect("retry request carries a hint");
    assert_eq!(hint.len(), 10);
    let legal = oracle::legal_moves_san(state.position());
    for san in hint {
        assert!(legal.contains(san), "hint entry '{}' must be legal", san);
    }
}

#[tokio::test]
async fn test_empty_and_malformed_replies_fall_back() {
    let state = GameState::new();
    let (tx, _rx) = mpsc::unbounded_channel();

    let mut empty = ScriptedProposer::new(vec![Err(ProposeError::EmptyReply)]);
    let decision = TurnController::new()
        .next_move(&state, &mut empty, &tx)
        .await
        .unwrap();
    assert!(decision.fallback);
    assert!(decision.record.explanation.contains("empty output"));

    let mut malformed = ScriptedProposer::new(vec![
        proposal("Qh5"),
        Err(ProposeError::MalformedReply("not JSON".to_string())),
    ]);
    let decision = TurnController::new()
        .next_move(&state, &mut malformed, &tx)
        .await
        .unwrap();
    assert!(decision.fallback);
    assert_eq!(malformed.calls, 2);
    assert!(decision.record.explanation.contains("malformed"));
}

/// Two legal proposals, then a rejected one that ends in a fallback,
/// leaving the state at move three.
#[tokio::test]
async fn test_two_legal_moves_then_fallback_scenario() {
    let mut state = GameState::new();
    let (tx, _rx) = mpsc::unbounded_channel();
    let controller = TurnController::new();

    let mut white = ScriptedProposer::new(vec![proposal("e4"), proposal("Nf6"), proposal("Nf6")]);
    let mut black = ScriptedProposer::new(vec![proposal("e5")]);

    let decision = controller.next_move(&state, &mut white, &tx).await.unwrap();
    state.apply(decision.record).expect("e4 applies");
    assert_eq!(state.move_count(), 1);
    assert_eq!(state.turn(), chess_arbiter::Side::Black);

    let decision = controller.next_move(&state, &mut black, &tx).await.unwrap();
    state.apply(decision.record).expect("e5 applies");
    assert_eq!(state.move_count(), 2);
    assert_eq!(state.turn(), chess_arbiter::Side::White);

    // White now proposes Nf6 twice: no white knight reaches f6, so the
    // controller retries with a hint and then falls back.
    let first_legal = oracle::legal_moves_san(state.position())[0].clone();
    let decision = controller.next_move(&state, &mut white, &tx).await.unwrap();
    assert!(decision.fallback);
    assert_eq!(decision.record.san, first_legal);

    let record: MoveRecord = decision.record;
    state.apply(record).expect("fallback move applies");
    assert_eq!(state.move_count(), 3);
}
