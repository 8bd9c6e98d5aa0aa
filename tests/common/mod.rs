#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chess_core::Color;
use client::advisor::{Advice, AdviceRequest, MoveAdvisor};
use client::clipboard::Clipboard;
use client::config::NotificationDurations;
use client::error::{AdvisorError, ClipboardError};
use client::{Command, ControlPanel, Dispatcher, Frame, Game, Mode, Session, TurnState, View};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, Notify};

pub const SHARE_BASE: &str = "https://chess.example/play";

/// Replies with the scripted SAN moves in order. `None` entries and an
/// exhausted script fail like a dead endpoint.
pub struct ScriptedAdvisor {
    replies: Mutex<VecDeque<Option<String>>>,
    pub calls: Mutex<Vec<String>>,
    delay: Duration,
}

impl ScriptedAdvisor {
    pub fn new(replies: &[Option<&str>]) -> Arc<Self> {
        Self::with_delay(replies, Duration::ZERO)
    }

    /// Each reply arrives only after `delay`.
    pub fn with_delay(replies: &[Option<&str>], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.map(String::from)).collect()),
            calls: Mutex::new(Vec::new()),
            delay,
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl MoveAdvisor for ScriptedAdvisor {
    async fn advise(&self, request: &AdviceRequest) -> Result<Advice, AdvisorError> {
        self.calls.lock().unwrap().push(request.fen().to_string());
        let reply = self.replies.lock().unwrap().pop_front().flatten();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match reply {
            Some(best_move) => Ok(Advice {
                commentary: format!("I'll play {best_move}."),
                best_move,
            }),
            None => Err(AdvisorError::EmptyResponse),
        }
    }
}

/// Holds every reply until `release` is called.
pub struct GatedAdvisor {
    gate: Notify,
    best_move: String,
}

impl GatedAdvisor {
    pub fn new(best_move: &str) -> Arc<Self> {
        Arc::new(Self {
            gate: Notify::new(),
            best_move: best_move.to_string(),
        })
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl MoveAdvisor for GatedAdvisor {
    async fn advise(&self, _request: &AdviceRequest) -> Result<Advice, AdvisorError> {
        self.gate.notified().await;
        Ok(Advice {
            best_move: self.best_move.clone(),
            commentary: "Worth the wait.".to_string(),
        })
    }
}

/// Records what was copied.
#[derive(Clone, Default)]
pub struct RecordingClipboard {
    pub copied: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Clipboard for RecordingClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.copied.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

pub struct FailingClipboard;

#[async_trait]
impl Clipboard for FailingClipboard {
    async fn write_text(&self, _text: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError::Command("permission denied".to_string()))
    }
}

/// What one rendered frame showed.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub fen: String,
    pub plies: usize,
    pub last_san: Option<String>,
    pub mode: Mode,
    pub state: TurnState,
    pub pending: bool,
    pub commentary: Option<String>,
    pub notification: Option<String>,
    pub status: String,
}

impl Snapshot {
    fn of(frame: &Frame<'_>) -> Self {
        let session = frame.session;
        Self {
            fen: session.position().fen().to_string(),
            plies: session.record().len(),
            last_san: session.record().plies().last().map(|p| p.san.clone()),
            mode: session.mode(),
            state: frame.state,
            pending: session.is_ai_pending(),
            commentary: session.visible_commentary().map(String::from),
            notification: session.notification(frame.now).map(String::from),
            status: session.status_text(),
        }
    }
}

type StopWhen = Box<dyn Fn(&Snapshot) -> bool>;

/// Records every frame and sends `Quit` once `stop_when` matches one.
pub struct RecordingView {
    pub frames: Vec<Snapshot>,
    pub faults: Vec<String>,
    /// Number of renders that panic before rendering normally
    pub panics_left: usize,
    stop_when: StopWhen,
    tx: mpsc::Sender<Command>,
    stopped: bool,
}

impl RecordingView {
    pub fn new(tx: mpsc::Sender<Command>, stop_when: impl Fn(&Snapshot) -> bool + 'static) -> Self {
        Self {
            frames: Vec::new(),
            faults: Vec::new(),
            panics_left: 0,
            stop_when: Box::new(stop_when),
            tx,
            stopped: false,
        }
    }

    pub fn last(&self) -> &Snapshot {
        self.frames.last().expect("at least one frame")
    }
}

impl View for RecordingView {
    fn render(&mut self, frame: &Frame<'_>) {
        if self.panics_left > 0 {
            self.panics_left -= 1;
            panic!("board exploded");
        }

        let snapshot = Snapshot::of(frame);
        if !self.stopped && (self.stop_when)(&snapshot) {
            self.stopped = true;
            let _ = self.tx.try_send(Command::Quit);
        }
        self.frames.push(snapshot);
    }

    fn render_fault(&mut self, message: &str) {
        self.faults.push(message.to_string());
        // The recovery screen's only button
        let _ = self.tx.try_send(Command::Reload);
    }
}

pub fn dispatcher(session: Session) -> Dispatcher {
    Dispatcher::with_rng(session, NotificationDurations::default(), StdRng::seed_from_u64(42))
}

pub fn game(advisor: Arc<dyn MoveAdvisor>, clipboard: Box<dyn Clipboard>) -> Game {
    game_with_session(Session::new(Color::Black), advisor, clipboard)
}

pub fn game_with_session(
    session: Session,
    advisor: Arc<dyn MoveAdvisor>,
    clipboard: Box<dyn Clipboard>,
) -> Game {
    Game::new(dispatcher(session), advisor, clipboard, ControlPanel::default(), SHARE_BASE)
}
