use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::{Advice, AdviceRequest, MoveAdvisor};
use crate::error::AdvisorError;

/// Models sometimes wrap the JSON body in a Markdown code fence.
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("valid code fence regex")
});

pub struct GeminiAdvisor {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiAdvisor {
    pub fn new(
        api_key: String,
        model: &str,
        api_base: &str,
        timeout: Duration,
    ) -> Result<Self, AdvisorError> {
        let client = Client::builder()
            .user_agent("LinkChess/1.0")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!(
                "{}/models/{}:generateContent",
                api_base.trim_end_matches('/'),
                model
            ),
        })
    }

    fn request_body(request: &AdviceRequest) -> Value {
        json!({
            "contents": [
                { "parts": [ { "text": request.prompt() } ] }
            ],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "bestMove": {
                            "type": "STRING",
                            "description": "The chosen move in Standard Algebraic Notation (SAN), e.g. 'Nf3', 'e5', 'O-O'. Must be one of the valid moves provided."
                        },
                        "commentary": {
                            "type": "STRING",
                            "description": "A short comment explaining the move strategy."
                        }
                    },
                    "required": ["bestMove", "commentary"]
                }
            }
        })
    }
}

#[async_trait]
impl MoveAdvisor for GeminiAdvisor {
    async fn advise(&self, request: &AdviceRequest) -> Result<Advice, AdvisorError> {
        debug!(fen = request.fen(), moves = request.legal_moves.len(), "Asking Gemini");

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(request))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AdvisorError::Status(resp.status()));
        }

        let data: Value = resp.json().await?;
        let text = response_text(&data).ok_or(AdvisorError::EmptyResponse)?;
        parse_advice(text)
    }
}

/// First candidate's text part.
fn response_text(data: &Value) -> Option<&str> {
    data["candidates"][0]["content"]["parts"]
        .as_array()?
        .iter()
        .find_map(|part| part.get("text").and_then(|v| v.as_str()))
        .filter(|text| !text.trim().is_empty())
}

/// Parse the model's JSON reply, tolerating a surrounding code fence.
pub fn parse_advice(text: &str) -> Result<Advice, AdvisorError> {
    let body = match CODE_FENCE.captures(text) {
        Some(cap) => cap.get(1).map_or(text, |m| m.as_str()),
        None => text,
    };

    let advice: Advice = serde_json::from_str(body.trim())?;
    if advice.best_move.trim().is_empty() {
        return Err(AdvisorError::Parse("bestMove is empty".to_string()));
    }
    Ok(advice)
}
