//! Chess rules adapter, game record and shareable position codec.

pub mod codec;
pub mod error;
pub mod history;
pub mod rules;

pub use error::{DecodeError, RulesError};
pub use history::{GameRecord, Ply};
pub use rules::{AppliedMove, DrawReason, GamePosition, GameStatus, MoveInput, STANDARD_START_FEN};
pub use shakmaty::{Color, Role, Square};
