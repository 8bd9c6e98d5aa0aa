//! Turn coordination.
//!
//! Every transition is an explicit method whose outcome decides the next
//! `TurnState`. The advisor call is split in two halves (`begin_ai_turn` and
//! `complete_ai_turn`) so the caller can await it without holding the
//! dispatcher, and so a late reply can be recognised and dropped.

use chess_core::codec::{self, LoadedPosition};
use chess_core::{AppliedMove, GameRecord, MoveInput};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::advisor::{Advice, AdviceRequest, FALLBACK_COMMENTARY};
use crate::config::NotificationDurations;
use crate::error::AdvisorError;
use crate::session::{Mode, Session};

const INVALID_LINK: &str = "That link does not contain a valid game.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnState {
    AwaitingHumanMove,
    AwaitingAiMove,
    GameOver,
}

/// Result of a human move attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    Applied { san: String, state: TurnState },
    /// Illegal or unparsable; nothing changed
    Rejected,
    /// Not the human's turn (AI thinking, AI to move, or game over); nothing changed
    Blocked,
}

/// Result of feeding an advisor reply back in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AiOutcome {
    Played {
        san: String,
        /// True when the advisor's move was unusable and a random one was played
        fallback: bool,
        state: TurnState,
    },
    /// The session moved on since the request was issued
    Discarded,
}

pub struct Dispatcher {
    session: Session,
    state: TurnState,
    rng: StdRng,
    durations: NotificationDurations,
}

impl Dispatcher {
    pub fn new(session: Session, durations: NotificationDurations) -> Self {
        Self::with_rng(session, durations, StdRng::from_entropy())
    }

    /// Deterministic fallback moves, for tests.
    pub fn with_rng(session: Session, durations: NotificationDurations, rng: StdRng) -> Self {
        let mut dispatcher = Self {
            session,
            state: TurnState::AwaitingHumanMove,
            rng,
            durations,
        };
        dispatcher.state = dispatcher.next_state();
        dispatcher
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    /// State that follows from the current position and mode.
    fn next_state(&self) -> TurnState {
        if self.session.status().is_terminal() {
            TurnState::GameOver
        } else if self.session.mode == Mode::Ai
            && self.session.position().turn() == self.session.ai_side
        {
            TurnState::AwaitingAiMove
        } else {
            TurnState::AwaitingHumanMove
        }
    }

    fn push(&mut self, applied: AppliedMove) -> String {
        let san = applied.san.clone();
        self.session.record.push(applied);
        self.state = self.next_state();
        san
    }

    /// A drag-and-drop (or typed move) from the human.
    pub fn human_move(&mut self, input: &MoveInput) -> MoveOutcome {
        if self.session.ai_pending || self.state != TurnState::AwaitingHumanMove {
            debug!(state = ?self.state, pending = self.session.ai_pending, "Human move blocked");
            return MoveOutcome::Blocked;
        }

        match self.session.position().apply(input) {
            Ok(applied) => {
                let san = self.push(applied);
                debug!(san = %san, state = ?self.state, "Human move applied");
                MoveOutcome::Applied {
                    san,
                    state: self.state,
                }
            }
            Err(e) => {
                debug!(error = %e, "Human move rejected");
                MoveOutcome::Rejected
            }
        }
    }

    /// Start the AI's turn. Returns the request to hand to the advisor, or
    /// `None` when it is not the AI's turn, a request is already out, or there
    /// is nothing to ask about.
    pub fn begin_ai_turn(&mut self) -> Option<AdviceRequest> {
        if self.state != TurnState::AwaitingAiMove || self.session.ai_pending {
            return None;
        }

        let position = self.session.position().clone();
        let legal_moves = position.legal_moves();
        if legal_moves.is_empty() {
            self.state = self.next_state();
            return None;
        }

        self.session.ai_pending = true;
        Some(AdviceRequest {
            generation: self.session.generation,
            position,
            legal_moves,
        })
    }

    /// Apply the advisor's reply to `request`. A reply for a superseded
    /// request is discarded. An unusable reply is replaced by a random legal
    /// move with the fallback commentary.
    pub fn complete_ai_turn(
        &mut self,
        request: &AdviceRequest,
        reply: Result<Advice, AdvisorError>,
    ) -> AiOutcome {
        if request.generation != self.session.generation
            || &request.position != self.session.position()
            || !self.session.ai_pending
            || self.state != TurnState::AwaitingAiMove
        {
            debug!(
                request_generation = request.generation,
                generation = self.session.generation,
                "Discarding stale advisor reply"
            );
            return AiOutcome::Discarded;
        }

        self.session.ai_pending = false;

        let suggested = match reply {
            Ok(advice) => match self.session.position().apply(&MoveInput::token(advice.best_move.trim())) {
                Ok(applied) => Some((applied, advice.commentary)),
                Err(e) => {
                    warn!(suggested = %advice.best_move, error = %e, "Advisor suggested an unusable move");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "Advisor failed");
                None
            }
        };

        let (applied, commentary, fallback) = match suggested {
            Some((applied, commentary)) => (applied, commentary, false),
            None => match self.random_legal_move() {
                Some(applied) => (applied, FALLBACK_COMMENTARY.to_string(), true),
                None => {
                    self.state = self.next_state();
                    return AiOutcome::Discarded;
                }
            },
        };

        self.session.ai_commentary = Some(commentary);
        let san = self.push(applied);
        info!(san = %san, fallback, "AI move applied");
        AiOutcome::Played {
            san,
            fallback,
            state: self.state,
        }
    }

    fn random_legal_move(&mut self) -> Option<AppliedMove> {
        let position = self.session.position();
        let legal = position.legal_moves();
        let choice = legal.choose(&mut self.rng)?;
        position.apply(&MoveInput::token(choice.as_str())).ok()
    }

    /// New game from the start position. Mode and orientation are kept; the
    /// address-bar fragment is cleared and any in-flight advice is dropped.
    pub fn reset(&mut self, now: Instant) {
        self.session.record = GameRecord::default();
        self.session.ai_commentary = None;
        self.session.ai_pending = false;
        self.session.url_fragment = None;
        self.session.bump_generation();
        self.session
            .notify("New game started", now, self.durations.new_game);
        self.state = self.next_state();
        info!(mode = %self.session.mode, "Game reset");
    }

    /// Take back the last ply. Against the AI, keeps going back until the
    /// human is to move. Returns false when there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        if self.session.record.undo().is_none() {
            return false;
        }

        if self.session.mode == Mode::Ai
            && self.session.position().turn() == self.session.ai_side
        {
            self.session.record.undo();
        }

        self.session.ai_pending = false;
        self.session.bump_generation();
        self.state = self.next_state();
        debug!(plies = self.session.record.len(), state = ?self.state, "Undo");
        true
    }

    /// Switch mode. Position and history are untouched.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == self.session.mode {
            return;
        }
        self.session.mode = mode;
        self.session.ai_pending = false;
        self.session.bump_generation();
        self.state = self.next_state();
        info!(mode = %mode, state = ?self.state, "Mode changed");
    }

    pub fn flip_orientation(&mut self) {
        self.session.orientation = self.session.orientation.other();
    }

    /// Encode the current position into the address-bar fragment and return
    /// the full shareable URL.
    pub fn share_link(&mut self, base_url: &str) -> String {
        let position = self.session.position();
        let url = codec::share_url(base_url, position);
        self.session.url_fragment = Some(codec::fragment(position));
        url
    }

    /// Tell the user where the shared link ended up.
    pub fn link_delivered(&mut self, copied_to_clipboard: bool, now: Instant) {
        let text = if copied_to_clipboard {
            "Link generated and copied! Send it to your friend."
        } else {
            "Link generated in the address bar!"
        };
        self.session
            .notify(text, now, self.durations.link_copied);
    }

    /// Replace the session as a page load of `hash` would. In-flight advice
    /// for the old session is dropped. A link whose token does not decode
    /// leaves the current game untouched.
    pub fn load(&mut self, hash: &str, now: Instant) {
        let loaded = codec::load(hash);
        if let LoadedPosition::Malformed(e) = &loaded {
            warn!(error = %e, plies = self.session.record.len(), "Keeping current game");
            self.session
                .notify(INVALID_LINK, now, self.durations.game_loaded);
            return;
        }

        let generation = self.session.generation;
        let mut session =
            Session::from_loaded(loaded, self.session.ai_side, now, self.durations.game_loaded);
        session.generation = generation;
        session.bump_generation();
        self.session = session;
        self.state = self.next_state();
        info!(mode = %self.session.mode, fen = self.session.position().fen(), "Session loaded");
    }

    /// Reload from the current address-bar fragment.
    pub fn reload(&mut self, now: Instant) {
        let hash = self.session.url_fragment.clone().unwrap_or_default();
        self.load(&hash, now);
    }

    pub fn expire_notification(&mut self, now: Instant) -> bool {
        self.session.expire_notification(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::{Color, GamePosition};

    fn dispatcher() -> Dispatcher {
        Dispatcher::with_rng(
            Session::new(Color::Black),
            NotificationDurations::default(),
            StdRng::seed_from_u64(7),
        )
    }

    fn drop(from: &str, to: &str) -> MoveInput {
        MoveInput::drop(from, to).unwrap()
    }

    fn advice(mv: &str) -> Result<Advice, AdvisorError> {
        Ok(Advice {
            best_move: mv.to_string(),
            commentary: format!("Playing {mv}"),
        })
    }

    #[test]
    fn test_local_moves_alternate() {
        let mut d = dispatcher();
        assert_eq!(d.state(), TurnState::AwaitingHumanMove);
        assert_eq!(
            d.human_move(&drop("e2", "e4")),
            MoveOutcome::Applied {
                san: "e4".into(),
                state: TurnState::AwaitingHumanMove
            }
        );
        assert_eq!(d.session().position().turn(), Color::Black);
        assert!(matches!(d.human_move(&drop("e7", "e5")), MoveOutcome::Applied { .. }));
        assert_eq!(d.session().record().len(), 2);
    }

    #[test]
    fn test_invalid_move_is_silent() {
        let mut d = dispatcher();
        let before = d.session().position().clone();
        assert_eq!(d.human_move(&drop("e2", "e5")), MoveOutcome::Rejected);
        assert_eq!(d.session().position(), &before);
        assert!(d.session().record().is_empty());
        assert_eq!(d.session().notification(Instant::now()), None);
    }

    #[test]
    fn test_ai_turn_after_human_move() {
        let mut d = dispatcher();
        d.set_mode(Mode::Ai);
        let outcome = d.human_move(&drop("e2", "e4"));
        assert_eq!(
            outcome,
            MoveOutcome::Applied {
                san: "e4".into(),
                state: TurnState::AwaitingAiMove
            }
        );

        let request = d.begin_ai_turn().unwrap();
        assert!(d.session().is_ai_pending());
        assert_eq!(request.legal_moves.len(), 20);
        assert!(d.begin_ai_turn().is_none(), "only one request in flight");

        let outcome = d.complete_ai_turn(&request, advice("Nf6"));
        assert_eq!(
            outcome,
            AiOutcome::Played {
                san: "Nf6".into(),
                fallback: false,
                state: TurnState::AwaitingHumanMove
            }
        );
        assert!(!d.session().is_ai_pending());
        assert_eq!(d.session().ai_commentary(), Some("Playing Nf6"));
    }

    #[test]
    fn test_human_blocked_while_ai_pending() {
        let mut d = dispatcher();
        d.set_mode(Mode::Ai);
        d.human_move(&drop("e2", "e4"));
        let _request = d.begin_ai_turn().unwrap();

        let before = d.session().position().clone();
        assert_eq!(d.human_move(&drop("e7", "e5")), MoveOutcome::Blocked);
        assert_eq!(d.human_move(&drop("d2", "d4")), MoveOutcome::Blocked);
        assert_eq!(d.session().position(), &before);
        assert_eq!(d.session().record().len(), 1);
    }

    #[test]
    fn test_illegal_advice_falls_back() {
        let mut d = dispatcher();
        d.set_mode(Mode::Ai);
        d.human_move(&drop("e2", "e4"));
        let request = d.begin_ai_turn().unwrap();

        let outcome = d.complete_ai_turn(&request, advice("Qh5"));
        let AiOutcome::Played { san, fallback, state } = outcome else {
            panic!("expected a move");
        };
        assert!(fallback);
        assert!(request.legal_moves.contains(&san));
        assert_eq!(state, TurnState::AwaitingHumanMove);
        assert_eq!(d.session().ai_commentary(), Some(FALLBACK_COMMENTARY));
        assert_eq!(d.session().position().turn(), Color::White);
    }

    #[test]
    fn test_advisor_failure_falls_back() {
        let mut d = dispatcher();
        d.set_mode(Mode::Ai);
        d.human_move(&drop("d2", "d4"));
        let request = d.begin_ai_turn().unwrap();

        let outcome = d.complete_ai_turn(&request, Err(AdvisorError::NotConfigured));
        assert!(matches!(outcome, AiOutcome::Played { fallback: true, .. }));
        assert_eq!(d.session().record().len(), 2);
    }

    #[test]
    fn test_stale_reply_after_reset_is_discarded() {
        let mut d = dispatcher();
        d.set_mode(Mode::Ai);
        d.human_move(&drop("e2", "e4"));
        let request = d.begin_ai_turn().unwrap();

        d.reset(Instant::now());
        assert!(d.session().record().is_empty());
        assert!(d.session().url_fragment().is_none());
        assert!(!d.session().is_ai_pending());

        assert_eq!(d.complete_ai_turn(&request, advice("e5")), AiOutcome::Discarded);
        assert!(d.session().record().is_empty());
        assert_eq!(d.session().position(), &GamePosition::start());
    }

    #[test]
    fn test_stale_reply_after_mode_switch_is_discarded() {
        let mut d = dispatcher();
        d.set_mode(Mode::Ai);
        d.human_move(&drop("e2", "e4"));
        let request = d.begin_ai_turn().unwrap();

        d.set_mode(Mode::Local);
        assert_eq!(d.state(), TurnState::AwaitingHumanMove);
        assert_eq!(d.complete_ai_turn(&request, advice("e5")), AiOutcome::Discarded);

        // Human now plays black themselves
        assert!(matches!(d.human_move(&drop("e7", "e5")), MoveOutcome::Applied { .. }));
    }

    #[test]
    fn test_undo_in_ai_mode_returns_to_human() {
        let mut d = dispatcher();
        d.set_mode(Mode::Ai);
        d.human_move(&drop("e2", "e4"));
        let request = d.begin_ai_turn().unwrap();
        d.complete_ai_turn(&request, advice("e5"));
        let before_human = d.session().position().clone();

        d.human_move(&drop("g1", "f3"));
        let request = d.begin_ai_turn().unwrap();
        d.complete_ai_turn(&request, advice("Nc6"));

        assert!(d.undo());
        assert_eq!(d.session().position().fen(), before_human.fen());
        assert_eq!(d.state(), TurnState::AwaitingHumanMove);
        assert_eq!(d.session().record().len(), 2);
    }

    #[test]
    fn test_undo_while_pending_discards_reply() {
        let mut d = dispatcher();
        d.set_mode(Mode::Ai);
        d.human_move(&drop("e2", "e4"));
        let request = d.begin_ai_turn().unwrap();

        assert!(d.undo());
        assert_eq!(d.session().position(), &GamePosition::start());
        assert_eq!(d.state(), TurnState::AwaitingHumanMove);
        assert_eq!(d.complete_ai_turn(&request, advice("e5")), AiOutcome::Discarded);
    }

    #[test]
    fn test_undo_local_single_ply() {
        let mut d = dispatcher();
        assert!(!d.undo());
        d.human_move(&drop("e2", "e4"));
        d.human_move(&drop("e7", "e5"));
        assert!(d.undo());
        assert_eq!(d.session().record().len(), 1);
        assert_eq!(d.session().position().turn(), Color::Black);
    }

    #[test]
    fn test_game_over_and_undo_out_of_it() {
        let mut d = dispatcher();
        for (from, to) in [("f2", "f3"), ("e7", "e5"), ("g2", "g4"), ("d8", "h4")] {
            d.human_move(&drop(from, to));
        }
        assert_eq!(d.state(), TurnState::GameOver);
        assert_eq!(d.human_move(&drop("e1", "f2")), MoveOutcome::Blocked);

        assert!(d.undo());
        assert_eq!(d.state(), TurnState::AwaitingHumanMove);
    }

    #[test]
    fn test_switch_to_ai_when_ai_to_move() {
        let mut d = dispatcher();
        d.human_move(&drop("e2", "e4"));
        d.set_mode(Mode::Ai);
        assert_eq!(d.state(), TurnState::AwaitingAiMove);
        assert_eq!(d.human_move(&drop("e7", "e5")), MoveOutcome::Blocked);
        assert_eq!(d.session().record().len(), 1);
    }

    #[test]
    fn test_no_advisor_call_without_legal_moves() {
        // White to move and checkmated
        let session = Session::from_fragment(
            &format!(
                "#{}",
                codec::fragment(
                    &GamePosition::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
                        .unwrap()
                )
            ),
            Color::White,
            Instant::now(),
            NotificationDurations::default().game_loaded,
        );
        let mut d = Dispatcher::with_rng(session, NotificationDurations::default(), StdRng::seed_from_u64(1));
        d.set_mode(Mode::Ai);
        assert_eq!(d.state(), TurnState::GameOver);
        assert!(d.begin_ai_turn().is_none());
        assert!(!d.session().is_ai_pending());
    }

    #[test]
    fn test_share_link_sets_fragment() {
        let mut d = dispatcher();
        d.set_mode(Mode::RemoteLink);
        d.human_move(&drop("e2", "e4"));
        let url = d.share_link("http://localhost:8080/");
        let fragment = d.session().url_fragment().unwrap().to_string();
        assert!(url.ends_with(&fragment));

        let now = Instant::now();
        d.link_delivered(false, now);
        assert_eq!(
            d.session().notification(now),
            Some("Link generated in the address bar!")
        );
    }

    #[test]
    fn test_reload_restores_shared_position() {
        let mut d = dispatcher();
        d.set_mode(Mode::RemoteLink);
        d.human_move(&drop("e2", "e4"));
        d.share_link("http://localhost:8080/");
        d.human_move(&drop("e7", "e5"));
        let generation = d.session().generation();

        d.reload(Instant::now());
        assert_eq!(d.session().mode(), Mode::RemoteLink);
        assert_eq!(d.session().position().turn(), Color::Black);
        assert!(d.session().record().is_empty());
        assert!(d.session().generation() > generation);
    }

    #[test]
    fn test_malformed_link_keeps_game_in_progress() {
        let mut d = dispatcher();
        d.human_move(&drop("e2", "e4"));
        d.human_move(&drop("e7", "e5"));
        let before = d.session().position().clone();
        let generation = d.session().generation();

        let now = Instant::now();
        d.load("#fen=garbage", now);
        assert_eq!(d.session().record().len(), 2);
        assert_eq!(d.session().position(), &before);
        assert_eq!(d.session().mode(), Mode::Local);
        assert_eq!(d.session().generation(), generation);
        assert_eq!(d.session().notification(now), Some(INVALID_LINK));
    }

    #[test]
    fn test_flip_orientation() {
        let mut d = dispatcher();
        d.flip_orientation();
        assert_eq!(d.session().orientation(), Color::Black);
        d.flip_orientation();
        assert_eq!(d.session().orientation(), Color::White);
    }
}
