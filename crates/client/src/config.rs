//! Client configuration from environment variables

use std::env;
use std::time::Duration;

use chess_core::Color;
use tracing::warn;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_SHARE_BASE_URL: &str = "http://localhost:8080/";

#[derive(Clone, Debug)]
pub struct Config {
    /// Gemini API key. `None` puts the advisor in offline fallback mode.
    pub api_key: Option<String>,

    pub model: String,

    /// Root of the generative-language REST API
    pub api_base: String,

    pub advisor_timeout: Duration,

    /// Origin and path prepended to `#fen=...` when sharing a link
    pub share_base_url: String,

    /// Side the AI plays in AI mode
    pub ai_side: Color,

    /// Link or fragment opened at start-up
    pub initial_link: Option<String>,

    pub notifications: NotificationDurations,
}

/// How long each transient notification stays visible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotificationDurations {
    pub game_loaded: Duration,
    pub link_copied: Duration,
    pub new_game: Duration,
}

impl Default for NotificationDurations {
    fn default() -> Self {
        Self {
            game_loaded: Duration::from_secs(4),
            link_copied: Duration::from_secs(4),
            new_game: Duration::from_secs(2),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            advisor_timeout: Duration::from_secs(30),
            share_base_url: DEFAULT_SHARE_BASE_URL.to_string(),
            ai_side: Color::Black,
            initial_link: None,
            notifications: NotificationDurations::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            api_key: non_empty_var("GEMINI_API_KEY").or_else(|| non_empty_var("API_KEY")),
            model: non_empty_var("GEMINI_MODEL").unwrap_or(defaults.model),
            api_base: non_empty_var("GEMINI_API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            advisor_timeout: env::var("ADVISOR_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.advisor_timeout),
            share_base_url: non_empty_var("CHESS_SHARE_BASE_URL").unwrap_or(defaults.share_base_url),
            ai_side: non_empty_var("CHESS_AI_SIDE")
                .map(|v| parse_side(&v))
                .unwrap_or(defaults.ai_side),
            initial_link: non_empty_var("CHESS_LINK"),
            notifications: defaults.notifications,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_side(value: &str) -> Color {
    match value.trim().to_ascii_lowercase().as_str() {
        "white" | "w" => Color::White,
        "black" | "b" => Color::Black,
        other => {
            warn!(value = other, "Unknown CHESS_AI_SIDE, AI plays black");
            Color::Black
        }
    }
}
