//! Position codec for shareable links: `<base>#fen=<percent-encoded FEN>`.
//!
//! Tokens come from the address bar and are never trusted: every decode builds
//! a trial position through the rules adapter first.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::warn;

use crate::error::DecodeError;
use crate::rules::GamePosition;

/// Same reserved set as the browser's `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub const FRAGMENT_KEY: &str = "fen=";

/// Outcome of reading the position from an address-bar fragment on load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadedPosition {
    /// No token present
    Start,
    /// A valid token
    Linked(GamePosition),
    /// A token was present but could not be trusted; play starts from the
    /// standard position
    Malformed(DecodeError),
}

impl LoadedPosition {
    pub fn position(&self) -> GamePosition {
        match self {
            LoadedPosition::Linked(pos) => pos.clone(),
            LoadedPosition::Start | LoadedPosition::Malformed(_) => GamePosition::start(),
        }
    }

    pub fn is_linked(&self) -> bool {
        matches!(self, LoadedPosition::Linked(_))
    }
}

/// Encode a position as a URL-safe token.
pub fn encode(position: &GamePosition) -> String {
    utf8_percent_encode(position.fen(), COMPONENT).to_string()
}

/// Decode and validate a token.
pub fn decode(token: &str) -> Result<GamePosition, DecodeError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(DecodeError::Empty);
    }

    let fen = percent_decode_str(token)
        .decode_utf8()
        .map_err(|_| DecodeError::Encoding)?;

    if fen.trim().is_empty() {
        return Err(DecodeError::Empty);
    }

    GamePosition::from_fen(&fen)
}

/// Decode a token, falling back to the standard start position.
pub fn decode_or_start(token: &str) -> GamePosition {
    decode(token).unwrap_or_else(|e| {
        warn!(error = %e, "Invalid position token, using start position");
        GamePosition::start()
    })
}

/// `fen=<token>`, without the leading `#`.
pub fn fragment(position: &GamePosition) -> String {
    format!("{}{}", FRAGMENT_KEY, encode(position))
}

/// Full shareable URL: `<base>#fen=<token>`. Any fragment already on `base`
/// is replaced.
pub fn share_url(base: &str, position: &GamePosition) -> String {
    let base = base.split('#').next().unwrap_or(base);
    format!("{}#{}", base, fragment(position))
}

/// Extract the raw token from a fragment or full URL. Accepts "#fen=...",
/// "fen=..." and "https://host/path#fen=...". Returns `None` when no
/// non-empty token is present.
pub fn token_from_fragment(input: &str) -> Option<&str> {
    let input = input.trim();
    let hash = match input.find('#') {
        Some(idx) => &input[idx + 1..],
        None => input,
    };
    let token = hash.strip_prefix(FRAGMENT_KEY)?;
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Read the position to start from out of an address-bar fragment.
pub fn load(hash: &str) -> LoadedPosition {
    let Some(token) = token_from_fragment(hash) else {
        return LoadedPosition::Start;
    };

    match decode(token) {
        Ok(pos) => LoadedPosition::Linked(pos),
        Err(e) => {
            warn!(error = %e, token, "Ignoring malformed position link");
            LoadedPosition::Malformed(e)
        }
    }
}
