//! LLM-backed move proposer.
//!
//! Wraps an [`LlmClient`] behind the [`MoveProposer`] trait: builds a
//! position-describing prompt, asks the model for a single JSON object
//! `{move, evaluation, explanation}`, and parses the reply. Every failure
//! mode maps to an explicit [`ProposeError`] variant; recovery is the
//! turn controller's job.

use crate::llm_client::LlmClient;
use crate::proposer::{MoveProposal, MoveProposer, ProposeError, TurnRequest};
use tracing::{debug, info, instrument, warn};

const SYSTEM_PROMPT: &str = "You are a strong chess player participating in an automated match. \
     When asked for a move, respond with ONLY a JSON object of the form \
     {\"move\": \"<SAN>\", \"evaluation\": <number>, \"explanation\": \"<text>\"} \
     and nothing else.";

/// A move proposer that asks an LLM for its moves.
pub struct LlmProposer {
    name: String,
    client: LlmClient,
}

impl LlmProposer {
    /// Creates a proposer named `name` over the given client.
    #[instrument(skip_all)]
    pub fn new(name: impl Into<String>, client: LlmClient) -> Self {
        let name = name.into();
        info!(proposer = %name, "Creating LLM proposer");
        Self { name, client }
    }
}

#[async_trait::async_trait]
impl MoveProposer for LlmProposer {
    #[instrument(skip(self, request), fields(proposer = %self.name, side = %request.side, hinted = request.hint.is_some()))]
    async fn propose(&mut self, request: &TurnRequest) -> Result<MoveProposal, ProposeError> {
        let prompt = build_prompt(request);
        debug!(prompt_length = prompt.len(), "Requesting move");

        let reply = self
            .client
            .generate(SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| ProposeError::CallFailed(e.message))?;

        let proposal = parse_reply(&reply)?;
        info!(san = %proposal.san, evaluation = proposal.evaluation, "Move proposed");
        Ok(proposal)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Builds the position-describing prompt for one turn.
pub fn build_prompt(request: &TurnRequest) -> String {
    let side = request.side;
    let mut prompt = format!(
        "You are playing chess as {side}. It's your turn to move.\n\n\
         Current board position (from white's perspective):\n{board}\n\n\
         Current board state in FEN notation: {fen}\n\n\
         {history}\n\n\
         Please analyze the position and make your next move. Consider:\n\
         1. Tactical opportunities (checks, captures, threats)\n\
         2. Strategic elements (piece development, king safety, pawn structure)\n\
         3. Your opponent's potential responses\n\
         4. Overall game plan\n\n\
         Provide your move in standard algebraic notation (e.g., \"e4\", \"Nf3\", \"O-O\", \"Qxd7+\").\n\
         Give an evaluation of the position from your perspective (positive means good for you).\n\
         Explain your reasoning clearly.\n\n\
         You are playing as {side}. Make your move now.",
        side = side,
        board = request.board,
        fen = request.fen,
        history = request.history,
    );

    if let Some(hint) = &request.hint {
        prompt.push_str(&format!(
            "\n\nYour previous move was invalid. Here are legal moves in this position: {}. \
             Please choose one of these moves.",
            hint.join(", ")
        ));
    }

    prompt
}

/// Parses a model reply into a [`MoveProposal`].
///
/// Tolerates markdown code fences and prose around the JSON object by
/// extracting the outermost `{...}` span.
///
/// # Errors
///
/// [`ProposeError::EmptyReply`] for whitespace-only content,
/// [`ProposeError::MalformedReply`] when no JSON object deserializes.
pub fn parse_reply(reply: &str) -> Result<MoveProposal, ProposeError> {
    let trimmed = reply.trim();
    if trimmed.is_empty() {
        warn!("Empty proposer reply");
        return Err(ProposeError::EmptyReply);
    }

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => {
            warn!(reply = %trimmed, "No JSON object in proposer reply");
            return Err(ProposeError::MalformedReply(
                "no JSON object in reply".to_string(),
            ));
        }
    };

    let proposal: MoveProposal = serde_json::from_str(json).map_err(|e| {
        warn!(error = %e, "Proposer reply failed to deserialize");
        ProposeError::MalformedReply(e.to_string())
    })?;

    if proposal.san.trim().is_empty() {
        return Err(ProposeError::MalformedReply("empty move field".to_string()));
    }

    Ok(proposal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Side;

    fn request(hint: Option<Vec<String>>) -> TurnRequest {
        TurnRequest::new(
            Side::White,
            ". . .".to_string(),
            "fen here".to_string(),
            "No moves have been made yet.".to_string(),
            hint,
        )
    }

    #[test]
    fn parses_bare_json() {
        let proposal =
            parse_reply(r#"{"move": "e4", "evaluation": 0.3, "explanation": "center"}"#).unwrap();
        assert_eq!(proposal.san, "e4");
        assert_eq!(proposal.evaluation, 0.3);
    }

    #[test]
    fn parses_fenced_json() {
        let reply = "```json\n{\"move\": \"Nf3\", \"evaluation\": 0.1, \"explanation\": \"develop\"}\n```";
        let proposal = parse_reply(reply).unwrap();
        assert_eq!(proposal.san, "Nf3");
    }

    #[test]
    fn empty_reply_is_distinguished() {
        assert_eq!(parse_reply("  \n "), Err(ProposeError::EmptyReply));
    }

    #[test]
    fn prose_without_json_is_malformed() {
        assert!(matches!(
            parse_reply("I think e4 is best."),
            Err(ProposeError::MalformedReply(_))
        ));
    }

    #[test]
    fn missing_field_is_malformed() {
        assert!(matches!(
            parse_reply(r#"{"move": "e4"}"#),
            Err(ProposeError::MalformedReply(_))
        ));
    }

    #[test]
    fn hint_lands_in_prompt() {
        let prompt = build_prompt(&request(Some(vec!["e4".to_string(), "d4".to_string()])));
        assert!(prompt.contains("previous move was invalid"));
        assert!(prompt.contains("e4, d4"));

        let plain = build_prompt(&request(None));
        assert!(!plain.contains("previous move was invalid"));
    }
}
