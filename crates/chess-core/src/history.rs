//! Game record: the position a game started from plus every ply played since.

use std::collections::HashMap;

use shakmaty::Color;

use crate::error::RulesError;
use crate::rules::{AppliedMove, DrawReason, GamePosition, GameStatus, MoveInput};

/// One applied half-move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ply {
    pub san: String,
    pub uci: String,
    /// Position after the move
    pub position: GamePosition,
}

/// Append-only move history. Undo pops from the end; nothing else removes plies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameRecord {
    initial: GamePosition,
    plies: Vec<Ply>,
}

impl GameRecord {
    pub fn new(initial: GamePosition) -> Self {
        Self {
            initial,
            plies: Vec::new(),
        }
    }

    pub fn initial(&self) -> &GamePosition {
        &self.initial
    }

    pub fn current(&self) -> &GamePosition {
        self.plies
            .last()
            .map(|ply| &ply.position)
            .unwrap_or(&self.initial)
    }

    pub fn plies(&self) -> &[Ply] {
        &self.plies
    }

    pub fn len(&self) -> usize {
        self.plies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plies.is_empty()
    }

    /// Apply a move to the current position and append it.
    pub fn play(&mut self, input: &MoveInput) -> Result<&Ply, RulesError> {
        let applied = self.current().apply(input)?;
        Ok(self.push(applied))
    }

    pub fn push(&mut self, applied: AppliedMove) -> &Ply {
        self.plies.push(Ply {
            san: applied.san,
            uci: applied.uci,
            position: applied.position,
        });
        &self.plies[self.plies.len() - 1]
    }

    /// Step back one ply. Returns `None` at the initial position.
    pub fn undo(&mut self) -> Option<Ply> {
        self.plies.pop()
    }

    /// Position status including threefold repetition over this record.
    pub fn status(&self) -> GameStatus {
        match self.current().status() {
            GameStatus::Ongoing | GameStatus::Check if self.is_threefold_repetition() => {
                GameStatus::Draw(DrawReason::ThreefoldRepetition)
            }
            status => status,
        }
    }

    pub fn is_threefold_repetition(&self) -> bool {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let positions =
            std::iter::once(&self.initial).chain(self.plies.iter().map(|ply| &ply.position));
        for pos in positions {
            *seen.entry(pos.repetition_key()).or_default() += 1;
        }
        seen.get(&self.current().repetition_key())
            .is_some_and(|&count| count >= 3)
    }

    /// Numbered movetext, e.g. "1. e4 e5 2. Nf3". A record starting with black
    /// to move opens with "N...".
    pub fn movetext(&self) -> String {
        let mut formatted = String::new();
        let mut move_num = self.initial.fullmoves();
        let mut side = self.initial.turn();

        for (i, ply) in self.plies.iter().enumerate() {
            match side {
                Color::White => {
                    if !formatted.is_empty() {
                        formatted.push(' ');
                    }
                    formatted.push_str(&format!("{}. {}", move_num, ply.san));
                }
                Color::Black => {
                    if i == 0 {
                        formatted.push_str(&format!("{}... {}", move_num, ply.san));
                    } else {
                        formatted.push_str(&format!(" {}", ply.san));
                    }
                    move_num += 1;
                }
            }
            side = side.other();
        }

        formatted
    }
}

impl Default for GameRecord {
    fn default() -> Self {
        Self::new(GamePosition::start())
    }
}
