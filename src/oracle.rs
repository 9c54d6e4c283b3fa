//! Rules oracle: the only module that talks to `shakmaty`.
//!
//! The rest of the crate treats chess rules as a black box with six
//! operations: legal-move enumeration, SAN parse-and-validate, apply,
//! terminal status, FEN encode/decode, and board rendering. Keeping the
//! `shakmaty` surface behind this module means the state machine, driver,
//! and replay code never depend on rule-engine types beyond `Chess`,
//! `Color`, and `Move`.

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, File, Move, Position, Rank, Square};
use tracing::{debug, instrument};

/// Terminal status of a position as reported by the rules oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// The side to move has at least one legal continuation.
    Ongoing,
    /// Checkmate: the given color delivered mate.
    Decisive {
        /// The winning color.
        winner: Color,
    },
    /// Stalemate, insufficient material, or the 75-move rule.
    Drawn,
}

/// Errors from SAN validation and FEN decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// The text is not well-formed standard algebraic notation.
    UnparsableSan(String),
    /// Well-formed SAN, but not a legal move in the position (or ambiguous).
    IllegalMove(String),
    /// The FEN string could not be decoded into a position.
    InvalidFen(String),
}

impl std::fmt::Display for OracleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleError::UnparsableSan(text) => write!(f, "Unparsable SAN '{}'", text),
            OracleError::IllegalMove(text) => write!(f, "Illegal move '{}'", text),
            OracleError::InvalidFen(text) => write!(f, "Invalid FEN '{}'", text),
        }
    }
}

impl std::error::Error for OracleError {}

/// Returns the standard chess starting position.
pub fn starting_position() -> Chess {
    Chess::default()
}

/// Enumerates the legal moves of `pos` in SAN, in the oracle's stable
/// generation order. The turn controller's fallback policy picks the
/// first entry of this list.
#[instrument(skip(pos), fields(fen = %fen(pos)))]
pub fn legal_moves_san(pos: &Chess) -> Vec<String> {
    pos.legal_moves()
        .iter()
        .map(|mv| SanPlus::from_move(pos.clone(), mv.clone()).to_string())
        .collect()
}

/// Parses `text` as SAN and validates it against the legal moves of `pos`.
///
/// Exact notation is required: ambiguous or partially-specified text is
/// rejected, never guessed at.
///
/// # Errors
///
/// [`OracleError::UnparsableSan`] when the text is not SAN at all,
/// [`OracleError::IllegalMove`] when it does not resolve to a unique legal
/// move in this position.
pub fn parse_san(pos: &Chess, text: &str) -> Result<Move, OracleError> {
    let san: SanPlus = text
        .parse()
        .map_err(|_| OracleError::UnparsableSan(text.to_string()))?;
    san.san
        .to_move(pos)
        .map_err(|_| OracleError::IllegalMove(text.to_string()))
}

/// Checks whether `text` is a legal move in `pos`.
pub fn is_legal_san(pos: &Chess, text: &str) -> bool {
    parse_san(pos, text).is_ok()
}

/// Validates `text` against `pos` and derives the next position.
///
/// The input position is untouched; a new position is returned.
///
/// # Errors
///
/// Returns the [`OracleError`] from [`parse_san`] when the move is
/// rejected.
#[instrument(skip(pos), fields(side = ?pos.turn()))]
pub fn apply_san(pos: &Chess, text: &str) -> Result<Chess, OracleError> {
    let mv = parse_san(pos, text)?;
    let mut next = pos.clone();
    next.play_unchecked(mv);
    debug!(san = %text, fen = %fen(&next), "Move applied");
    Ok(next)
}

/// Reports the terminal status of `pos`.
///
/// Draws cover stalemate, insufficient material, and the automatic
/// 75-move rule. Repetition is not tracked: the oracle sees positions,
/// not histories.
pub fn status(pos: &Chess) -> GameStatus {
    if pos.is_checkmate() {
        return GameStatus::Decisive {
            winner: pos.turn().other(),
        };
    }
    if pos.is_stalemate() || pos.is_insufficient_material() || pos.halfmoves() >= 150 {
        return GameStatus::Drawn;
    }
    GameStatus::Ongoing
}

/// Encodes `pos` as a FEN string.
pub fn fen(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// Decodes a FEN string into a position.
///
/// # Errors
///
/// Returns [`OracleError::InvalidFen`] when the string does not describe
/// a legal standard-chess position.
pub fn position_from_fen(text: &str) -> Result<Chess, OracleError> {
    let fen: Fen = text
        .parse()
        .map_err(|_| OracleError::InvalidFen(text.to_string()))?;
    fen.into_position::<Chess>(CastlingMode::Standard)
        .map_err(|_| OracleError::InvalidFen(text.to_string()))
}

/// Renders `pos` as an 8-rank ASCII diagram from white's perspective,
/// `.` for empty squares. This is the board picture that goes into
/// proposer prompts and console output.
pub fn render_board(pos: &Chess) -> String {
    let board = pos.board();
    let mut out = String::with_capacity(64 * 2 + 8);
    for rank in (0..8).rev() {
        for file in 0..8 {
            let square = Square::from_coords(File::new(file), Rank::new(rank));
            match board.piece_at(square) {
                Some(piece) => out.push(piece.char()),
                None => out.push('.'),
            }
            if file < 7 {
                out.push(' ');
            }
        }
        if rank > 0 {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_has_twenty_moves() {
        let pos = starting_position();
        assert_eq!(legal_moves_san(&pos).len(), 20);
        assert_eq!(status(&pos), GameStatus::Ongoing);
    }

    #[test]
    fn legal_san_round_trips() {
        let pos = starting_position();
        for san in legal_moves_san(&pos) {
            assert!(is_legal_san(&pos, &san), "'{}' should parse back", san);
        }
    }

    #[test]
    fn rejects_illegal_and_garbage() {
        let pos = starting_position();
        assert!(matches!(
            parse_san(&pos, "Qh5"),
            Err(OracleError::IllegalMove(_))
        ));
        assert!(matches!(
            parse_san(&pos, "not a move"),
            Err(OracleError::UnparsableSan(_))
        ));
    }

    #[test]
    fn apply_leaves_input_untouched() {
        let pos = starting_position();
        let before = fen(&pos);
        let next = apply_san(&pos, "e4").expect("e4 is legal");
        assert_eq!(fen(&pos), before);
        assert_ne!(fen(&next), before);
        assert_eq!(next.turn(), Color::Black);
    }

    #[test]
    fn fools_mate_is_decisive_for_black() {
        let mut pos = starting_position();
        for san in ["f3", "e5", "g4", "Qh4#"] {
            pos = apply_san(&pos, san).expect("scripted move is legal");
        }
        assert_eq!(
            status(&pos),
            GameStatus::Decisive {
                winner: Color::Black
            }
        );
        assert!(legal_moves_san(&pos).is_empty());
    }

    #[test]
    fn fen_round_trip() {
        let pos = apply_san(&starting_position(), "e4").unwrap();
        let restored = position_from_fen(&fen(&pos)).expect("own FEN decodes");
        assert_eq!(fen(&restored), fen(&pos));
    }

    #[test]
    fn board_rendering_shows_starting_ranks() {
        let text = render_board(&starting_position());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "r n b q k b n r");
        assert_eq!(lines[7], "R N B Q K B N R");
        assert_eq!(lines[3], ". . . . . . . .");
    }
}
