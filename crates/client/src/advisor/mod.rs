//! AI move advisor: the external capability that picks the AI's move.
//!
//! The dispatcher never trusts a reply. Whatever comes back is checked against
//! the rules, and failures fall back to a random legal move.

pub mod gemini;

use std::sync::Arc;

use async_trait::async_trait;
use chess_core::GamePosition;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AdvisorError;

pub use gemini::GeminiAdvisor;

/// Commentary attached to a move chosen at random after an advisor failure.
pub const FALLBACK_COMMENTARY: &str = "I'm a little distracted... let's try this.";

/// Everything the advisor is told about the position. `generation` ties the
/// reply back to the session state it was computed for.
#[derive(Clone, Debug)]
pub struct AdviceRequest {
    pub generation: u64,
    pub position: GamePosition,
    /// SAN tokens, in the order given to the model
    pub legal_moves: Vec<String>,
}

/// The advisor's reply, in the JSON shape the model is asked for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advice {
    pub best_move: String,
    pub commentary: String,
}

#[async_trait]
pub trait MoveAdvisor: Send + Sync {
    async fn advise(&self, request: &AdviceRequest) -> Result<Advice, AdvisorError>;
}

impl AdviceRequest {
    pub fn fen(&self) -> &str {
        self.position.fen()
    }

    /// Natural-language instruction sent to the model.
    pub fn prompt(&self) -> String {
        format!(
            "You are a chess grandmaster. The current board state in FEN (Forsyth-Edwards Notation) is: \"{}\".\n\n\
             The valid legal moves in SAN (Standard Algebraic Notation) are: {}.\n\n\
             Analyze the position and choose the absolute best move to win, or to draw if losing.\n\
             Provide a brief, witty or strategic commentary on why you chose this move (max 1 sentence).",
            self.fen(),
            self.legal_moves.join(", ")
        )
    }
}

/// Advisor used when no API key is configured. Every call fails, so the
/// dispatcher always plays its random fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineAdvisor;

#[async_trait]
impl MoveAdvisor for OfflineAdvisor {
    async fn advise(&self, _request: &AdviceRequest) -> Result<Advice, AdvisorError> {
        Err(AdvisorError::NotConfigured)
    }
}

/// Gemini when a key is configured, otherwise the offline advisor.
pub fn from_config(config: &Config) -> Arc<dyn MoveAdvisor> {
    let Some(api_key) = config.api_key.clone() else {
        info!("No API key configured - AI opponent plays random moves");
        return Arc::new(OfflineAdvisor);
    };

    match GeminiAdvisor::new(
        api_key,
        &config.model,
        &config.api_base,
        config.advisor_timeout,
    ) {
        Ok(advisor) => {
            info!(model = %config.model, "Gemini advisor configured");
            Arc::new(advisor)
        }
        Err(e) => {
            warn!("Failed to build Gemini client, using offline advisor: {e}");
            Arc::new(OfflineAdvisor)
        }
    }
}
