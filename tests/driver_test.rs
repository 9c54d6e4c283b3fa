//! Tests for the match driver loop.

use chess_arbiter::{
    MatchDriver, MatchEvent, MoveProposal, MoveProposer, ProposeError, Side, TurnRequest,
};
use std::collections::VecDeque;
use tokio::sync::mpsc;

/// Proposer that replays a fixed move script.
struct ScriptedProposer {
    name: String,
    moves: VecDeque<String>,
}

impl ScriptedProposer {
    fn boxed(name: &str, moves: &[&str]) -> Box<dyn MoveProposer + Send> {
        Box::new(Self {
            name: name.to_string(),
            moves: moves.iter().map(|m| m.to_string()).collect(),
        })
    }
}

#[async_trait::async_trait]
impl MoveProposer for ScriptedProposer {
    async fn propose(&mut self, _request: &TurnRequest) -> Result<MoveProposal, ProposeError> {
        match self.moves.pop_front() {
            Some(san) => Ok(MoveProposal::new(san, 0.3, "scripted".to_string())),
            None => Err(ProposeError::EmptyReply),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[tokio::test]
async fn test_checkmate_stops_before_max_moves() {
    let white = ScriptedProposer::boxed("White", &["f3", "g4"]);
    let black = ScriptedProposer::boxed("Black", &["e5", "Qh4#"]);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let record = MatchDriver::new(white, black, 100, tx).run().await;

    assert!(record.game_over);
    assert_eq!(record.result, "0-1");
    assert_eq!(record.total_moves, 4);
    assert_eq!(record.moves.len(), 4);
    assert_eq!(record.moves[3].san, "Qh4#");
    assert_eq!(record.moves[3].color, Side::Black);
    assert_eq!(record.moves[3].move_number, 4);

    let mut game_over_events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let MatchEvent::GameOver { result, .. } = event {
            game_over_events.push(result);
        }
    }
    assert_eq!(game_over_events, vec!["0-1".to_string()]);
}

#[tokio::test]
async fn test_max_moves_records_incomplete_game() {
    // Knights shuffle back and forth; nothing terminal happens.
    let white = ScriptedProposer::boxed("White", &["Nf3", "Ng1", "Nf3", "Ng1"]);
    let black = ScriptedProposer::boxed("Black", &["Nf6", "Ng8", "Nf6", "Ng8"]);
    let (tx, _rx) = mpsc::unbounded_channel();

    let record = MatchDriver::new(white, black, 4, tx).run().await;

    assert!(!record.game_over);
    assert_eq!(record.result, "Game incomplete");
    assert_eq!(record.total_moves, 4);
    assert_eq!(record.moves.len(), 4);
}

#[tokio::test]
async fn test_move_log_alternates_and_numbers_plies() {
    let white = ScriptedProposer::boxed("White", &["e4", "Nf3"]);
    let black = ScriptedProposer::boxed("Black", &["e5", "Nc6"]);
    let (tx, _rx) = mpsc::unbounded_channel();

    let record = MatchDriver::new(white, black, 4, tx).run().await;

    assert_eq!(record.total_moves, 4);
    for (i, entry) in record.moves.iter().enumerate() {
        assert_eq!(entry.move_number, i as u32 + 1);
        let expected = if i % 2 == 0 { Side::White } else { Side::Black };
        assert_eq!(entry.color, expected);
        assert!(!entry.fen.is_empty());
    }
    assert_eq!(record.final_fen, record.moves[3].fen);
}

#[tokio::test]
async fn test_exhausted_proposers_still_finish_the_match() {
    // Scripts run dry immediately: every turn is a fallback, and the
    // match still reaches the move cap with a complete log.
    let white = ScriptedProposer::boxed("White", &[]);
    let black = ScriptedProposer::boxed("Black", &[]);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let record = MatchDriver::new(white, black, 6, tx).run().await;

    assert_eq!(record.total_moves, 6);
    assert_eq!(record.result, "Game incomplete");
    for entry in &record.moves {
        assert!(entry.explanation.starts_with("Fallback move:"));
        assert_eq!(entry.evaluation, 0.0);
    }

    let mut fallbacks = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, MatchEvent::FallbackUsed { .. }) {
            fallbacks += 1;
        }
    }
    assert_eq!(fallbacks, 6);
}
