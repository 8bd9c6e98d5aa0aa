//! Session state: everything the board shows, mutated only by the dispatcher.

use std::fmt;
use std::time::Duration;

use chess_core::codec::{self, LoadedPosition};
use chess_core::{Color, GamePosition, GameRecord, GameStatus};
use tokio::time::Instant;

/// How the side to move is decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Two people on one board
    Local,
    /// Human against the AI advisor
    Ai,
    /// Correspondence by shared link
    RemoteLink,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Local => "local",
            Mode::Ai => "ai",
            Mode::RemoteLink => "link",
        };
        f.write_str(name)
    }
}

/// A message shown until `expires_at`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub expires_at: Instant,
}

#[derive(Clone, Debug)]
pub struct Session {
    pub(crate) record: GameRecord,
    pub(crate) mode: Mode,
    pub(crate) orientation: Color,
    pub(crate) ai_side: Color,
    pub(crate) ai_pending: bool,
    pub(crate) ai_commentary: Option<String>,
    pub(crate) notification: Option<Notification>,
    /// Address-bar fragment without the leading '#'
    pub(crate) url_fragment: Option<String>,
    /// Bumped by every transition that invalidates in-flight advice
    pub(crate) generation: u64,
}

const GAME_LOADED: &str = "Game loaded! Your move.";

pub fn side_name(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

impl Session {
    /// A fresh local game from the standard start position.
    pub fn new(ai_side: Color) -> Self {
        Self::from_record(GameRecord::default(), Mode::Local, ai_side)
    }

    fn from_record(record: GameRecord, mode: Mode, ai_side: Color) -> Self {
        Self {
            record,
            mode,
            orientation: Color::White,
            ai_side,
            ai_pending: false,
            ai_commentary: None,
            notification: None,
            url_fragment: None,
            generation: 0,
        }
    }

    /// Build the session a page load would. Any `#fen=` token opens link mode
    /// with a one-time notification; a token that does not decode opens it on
    /// the start position. No token starts a local game.
    pub fn from_fragment(hash: &str, ai_side: Color, now: Instant, shown_for: Duration) -> Self {
        Self::from_loaded(codec::load(hash), ai_side, now, shown_for)
    }

    pub fn from_loaded(
        loaded: LoadedPosition,
        ai_side: Color,
        now: Instant,
        shown_for: Duration,
    ) -> Self {
        let mut session = match loaded {
            LoadedPosition::Start => return Self::new(ai_side),
            LoadedPosition::Linked(position) => {
                let mut session =
                    Self::from_record(GameRecord::new(position.clone()), Mode::RemoteLink, ai_side);
                session.url_fragment = Some(codec::fragment(&position));
                session
            }
            LoadedPosition::Malformed(_) => {
                Self::from_record(GameRecord::default(), Mode::RemoteLink, ai_side)
            }
        };
        session.notify(GAME_LOADED, now, shown_for);
        session
    }

    pub fn record(&self) -> &GameRecord {
        &self.record
    }

    pub fn position(&self) -> &GamePosition {
        self.record.current()
    }

    pub fn status(&self) -> GameStatus {
        self.record.status()
    }

    /// Human-readable status line.
    pub fn status_text(&self) -> String {
        let turn = self.position().turn();
        match self.status() {
            GameStatus::Checkmate { winner } => format!("Checkmate! {} wins.", side_name(winner)),
            GameStatus::Draw(reason) => format!("Draw! ({reason})"),
            GameStatus::Check => format!("Check! {} to move", side_name(turn)),
            GameStatus::Ongoing => format!("{} to move", side_name(turn)),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn orientation(&self) -> Color {
        self.orientation
    }

    pub fn ai_side(&self) -> Color {
        self.ai_side
    }

    pub fn is_ai_pending(&self) -> bool {
        self.ai_pending
    }

    pub fn ai_commentary(&self) -> Option<&str> {
        self.ai_commentary.as_deref()
    }

    /// Commentary is only shown while playing the AI.
    pub fn visible_commentary(&self) -> Option<&str> {
        match self.mode {
            Mode::Ai => self.ai_commentary(),
            _ => None,
        }
    }

    pub fn url_fragment(&self) -> Option<&str> {
        self.url_fragment.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The notification text, if it has not expired at `now`.
    pub fn notification(&self, now: Instant) -> Option<&str> {
        self.notification
            .as_ref()
            .filter(|n| n.expires_at > now)
            .map(|n| n.text.as_str())
    }

    pub fn notification_deadline(&self) -> Option<Instant> {
        self.notification.as_ref().map(|n| n.expires_at)
    }

    pub(crate) fn notify(&mut self, text: impl Into<String>, now: Instant, shown_for: Duration) {
        self.notification = Some(Notification {
            text: text.into(),
            expires_at: now + shown_for,
        });
    }

    /// Drop the notification once expired. Returns true if one was removed.
    pub(crate) fn expire_notification(&mut self, now: Instant) -> bool {
        match &self.notification {
            Some(n) if n.expires_at <= now => {
                self.notification = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn bump_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}
