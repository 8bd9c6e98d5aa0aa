//! Rules adapter over shakmaty.
//!
//! Every position is produced here and every move goes through `apply`, which
//! works on a copy so a rejected attempt leaves the input untouched.

use std::fmt;

use shakmaty::fen::Fen;
use shakmaty::san::{San, SanPlus};
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, File, Move, Position, Role, Square};

use crate::error::{DecodeError, RulesError};

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// A legal, internally consistent position together with its canonical FEN.
#[derive(Clone, Debug)]
pub struct GamePosition {
    chess: Chess,
    fen: String,
}

/// A move as proposed by a player: a drag-and-drop or a textual token (SAN or UCI).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveInput {
    Drop {
        from: Square,
        to: Square,
        promotion: Option<Role>,
    },
    Token(String),
}

/// Result of a successful `apply`.
#[derive(Clone, Debug)]
pub struct AppliedMove {
    pub position: GamePosition,
    /// SAN with check/mate suffix, e.g. "Qxf7#"
    pub san: String,
    pub uci: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawReason {
    Stalemate,
    InsufficientMaterial,
    FiftyMoveRule,
    ThreefoldRepetition,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    Checkmate { winner: Color },
    Draw(DrawReason),
    Check,
    Ongoing,
}

impl GameStatus {
    /// Checkmate and draws end the game.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameStatus::Checkmate { .. } | GameStatus::Draw(_))
    }
}

impl fmt::Display for DrawReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DrawReason::Stalemate => "stalemate",
            DrawReason::InsufficientMaterial => "insufficient material",
            DrawReason::FiftyMoveRule => "fifty-move rule",
            DrawReason::ThreefoldRepetition => "threefold repetition",
        };
        f.write_str(reason)
    }
}

impl MoveInput {
    /// Build a drop from two square names such as "e2" and "e4".
    pub fn drop(from: &str, to: &str) -> Result<Self, RulesError> {
        Ok(MoveInput::Drop {
            from: parse_square(from)?,
            to: parse_square(to)?,
            promotion: None,
        })
    }

    pub fn token(token: impl Into<String>) -> Self {
        MoveInput::Token(token.into())
    }

    pub fn with_promotion(self, role: Role) -> Self {
        match self {
            MoveInput::Drop { from, to, .. } => MoveInput::Drop {
                from,
                to,
                promotion: Some(role),
            },
            token => token,
        }
    }
}

fn parse_square(name: &str) -> Result<Square, RulesError> {
    name.trim()
        .parse::<Square>()
        .map_err(|_| RulesError::InvalidSquare(name.to_string()))
}

impl GamePosition {
    /// The standard starting position.
    pub fn start() -> Self {
        Self::from_chess(Chess::default())
    }

    /// Parse and validate a FEN. Structurally illegal positions are rejected.
    pub fn from_fen(fen: &str) -> Result<Self, DecodeError> {
        let parsed: Fen = fen
            .trim()
            .parse()
            .map_err(|e| DecodeError::Fen(format!("{e}")))?;
        let chess: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| DecodeError::Position(e.to_string()))?;
        Ok(Self::from_chess(chess))
    }

    fn from_chess(chess: Chess) -> Self {
        let fen = Fen::from_position(&chess, EnPassantMode::Legal).to_string();
        Self { chess, fen }
    }

    pub fn fen(&self) -> &str {
        &self.fen
    }

    /// Side to move.
    pub fn turn(&self) -> Color {
        self.chess.turn()
    }

    pub fn fullmoves(&self) -> u32 {
        self.chess.fullmoves().get()
    }

    /// Placement, side to move, castling and en passant, without the move counters.
    pub fn repetition_key(&self) -> String {
        self.fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
    }

    pub fn board(&self) -> &shakmaty::Board {
        self.chess.board()
    }

    /// SAN tokens (with check suffix) of every legal move for the side to move.
    pub fn legal_moves(&self) -> Vec<String> {
        self.chess
            .legal_moves()
            .iter()
            .map(|m| self.san_plus(m))
            .collect()
    }

    /// The same legal moves in UCI notation.
    pub fn legal_uci(&self) -> Vec<String> {
        self.chess
            .legal_moves()
            .iter()
            .map(|m| m.to_uci(CastlingMode::Standard).to_string())
            .collect()
    }

    pub fn has_legal_moves(&self) -> bool {
        !self.chess.legal_moves().is_empty()
    }

    /// Status of this position alone. Repetition needs the game record,
    /// see `GameRecord::status`.
    pub fn status(&self) -> GameStatus {
        if self.chess.is_checkmate() {
            GameStatus::Checkmate {
                winner: self.chess.turn().other(),
            }
        } else if self.chess.is_stalemate() {
            GameStatus::Draw(DrawReason::Stalemate)
        } else if self.chess.is_insufficient_material() {
            GameStatus::Draw(DrawReason::InsufficientMaterial)
        } else if self.chess.halfmoves() >= 100 {
            GameStatus::Draw(DrawReason::FiftyMoveRule)
        } else if self.chess.is_check() {
            GameStatus::Check
        } else {
            GameStatus::Ongoing
        }
    }

    /// Apply a move to a copy of this position.
    pub fn apply(&self, input: &MoveInput) -> Result<AppliedMove, RulesError> {
        let mv = match input {
            MoveInput::Drop {
                from,
                to,
                promotion,
            } => self.resolve_drop(*from, *to, *promotion)?,
            MoveInput::Token(token) => self.resolve_token(token)?,
        };

        let san = self.san_plus(&mv);
        let uci = mv.to_uci(CastlingMode::Standard).to_string();

        let mut next = self.chess.clone();
        next.play_unchecked(mv);

        Ok(AppliedMove {
            position: Self::from_chess(next),
            san,
            uci,
        })
    }

    fn san_plus(&self, mv: &Move) -> String {
        let san = San::from_move(&self.chess, mv.clone()).to_string();
        let mut after = self.chess.clone();
        after.play_unchecked(mv.clone());
        if after.is_checkmate() {
            format!("{san}#")
        } else if after.is_check() {
            format!("{san}+")
        } else {
            san
        }
    }

    /// Match a drag-and-drop against the legal moves. Castling is dropped on the
    /// king's destination square. A pawn reaching the last rank without an
    /// explicit piece promotes to a queen; a piece given for a non-promoting
    /// drop is ignored.
    fn resolve_drop(
        &self,
        from: Square,
        to: Square,
        promotion: Option<Role>,
    ) -> Result<Move, RulesError> {
        let candidates: Vec<Move> = self
            .chess
            .legal_moves()
            .iter()
            .filter(|m| drop_squares(m) == Some((from, to)))
            .cloned()
            .collect();

        let wanted = promotion.unwrap_or(Role::Queen);
        candidates
            .iter()
            .find(|m| match m {
                Move::Normal {
                    promotion: Some(role),
                    ..
                } => *role == wanted,
                _ => true,
            })
            .cloned()
            .ok_or_else(|| RulesError::Illegal(format!("{from}{to}")))
    }

    /// SAN first (with or without suffix), then UCI.
    fn resolve_token(&self, token: &str) -> Result<Move, RulesError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(RulesError::Unparsable(String::new()));
        }

        let mut parsed = false;

        if let Ok(san) = token.parse::<SanPlus>() {
            parsed = true;
            if let Ok(mv) = san.san.to_move(&self.chess) {
                return Ok(mv);
            }
        }

        if let Ok(uci) = token.parse::<UciMove>() {
            parsed = true;
            if let Ok(mv) = uci.to_move(&self.chess) {
                return Ok(mv);
            }
        }

        if parsed {
            Err(RulesError::Illegal(token.to_string()))
        } else {
            Err(RulesError::Unparsable(token.to_string()))
        }
    }
}

/// Origin and destination squares as a player would drag them.
fn drop_squares(mv: &Move) -> Option<(Square, Square)> {
    match mv {
        Move::Normal { from, to, .. } => Some((*from, *to)),
        Move::EnPassant { from, to } => Some((*from, *to)),
        Move::Castle { king, rook } => {
            let file = if rook.file() > king.file() { File::G } else { File::C };
            Some((*king, Square::from_coords(file, king.rank())))
        }
        Move::Put { .. } => None,
    }
}

impl PartialEq for GamePosition {
    fn eq(&self, other: &Self) -> bool {
        self.fen == other.fen
    }
}

impl Eq for GamePosition {}

impl Default for GamePosition {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for GamePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fen)
    }
}
