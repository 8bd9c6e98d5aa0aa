//! Error types for move application and position decoding.

use thiserror::Error;

/// A move the rules refused. Nothing is mutated when this is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    #[error("Unparsable move token: {0}")]
    Unparsable(String),

    #[error("Illegal move: {0}")]
    Illegal(String),

    #[error("Invalid square: {0}")]
    InvalidSquare(String),
}

/// Why a position token could not be trusted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Empty position token")]
    Empty,

    #[error("Position token is not valid UTF-8")]
    Encoding,

    #[error("Invalid FEN: {0}")]
    Fen(String),

    #[error("Illegal position: {0}")]
    Position(String),
}
