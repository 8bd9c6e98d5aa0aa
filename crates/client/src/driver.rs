//! The game loop: one task owns the dispatcher and handles, one at a time,
//! presentation commands, advisor replies and notification expiry.
//!
//! The advisor call runs on a spawned task and reports back through a
//! channel, so the dispatcher is only ever touched from this loop.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chess_core::MoveInput;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::advisor::{Advice, AdviceRequest, MoveAdvisor};
use crate::clipboard::Clipboard;
use crate::config::Config;
use crate::controls::{Action, ControlPanel};
use crate::dispatcher::{Dispatcher, TurnState};
use crate::error::AdvisorError;
use crate::session::Session;

/// Input from the presentation shell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Move(MoveInput),
    Action(Action),
    /// Navigate to a shared link (full URL or `#fen=` fragment)
    Open(String),
    /// Reload from the current address-bar fragment
    Reload,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// What the view gets to draw.
pub struct Frame<'a> {
    pub session: &'a Session,
    pub state: TurnState,
    pub controls: &'a ControlPanel,
    pub now: Instant,
}

/// Presentation shell.
pub trait View {
    fn render(&mut self, frame: &Frame<'_>);

    /// Replace the whole view with a recovery screen offering a reload.
    fn render_fault(&mut self, message: &str);
}

type AdvisorReply = (AdviceRequest, Result<Advice, AdvisorError>);

pub struct Game {
    dispatcher: Dispatcher,
    advisor: Arc<dyn MoveAdvisor>,
    clipboard: Box<dyn Clipboard>,
    controls: ControlPanel,
    share_base_url: String,
    /// Set after a render fault until the user reloads
    faulted: bool,
}

impl Game {
    pub fn new(
        dispatcher: Dispatcher,
        advisor: Arc<dyn MoveAdvisor>,
        clipboard: Box<dyn Clipboard>,
        controls: ControlPanel,
        share_base_url: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            advisor,
            clipboard,
            controls,
            share_base_url: share_base_url.into(),
            faulted: false,
        }
    }

    /// Start-up as a page load: opens `config.initial_link` if one is set.
    pub fn from_config(
        config: &Config,
        advisor: Arc<dyn MoveAdvisor>,
        clipboard: Box<dyn Clipboard>,
    ) -> Self {
        let session = Session::from_fragment(
            config.initial_link.as_deref().unwrap_or_default(),
            config.ai_side,
            Instant::now(),
            config.notifications.game_loaded,
        );
        Self::new(
            Dispatcher::new(session, config.notifications),
            advisor,
            clipboard,
            ControlPanel::default(),
            config.share_base_url.clone(),
        )
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Apply one command.
    pub async fn handle(&mut self, command: Command, now: Instant) -> Flow {
        if self.faulted {
            match command {
                Command::Reload => {
                    self.faulted = false;
                    self.dispatcher.reload(now);
                }
                Command::Quit => return Flow::Quit,
                other => debug!(command = ?other, "Ignoring command on recovery screen"),
            }
            return Flow::Continue;
        }

        match command {
            Command::Move(input) => {
                self.dispatcher.human_move(&input);
            }
            Command::Action(action) => self.perform(action, now).await,
            Command::Open(link) => self.dispatcher.load(&link, now),
            Command::Reload => self.dispatcher.reload(now),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    async fn perform(&mut self, action: Action, now: Instant) {
        let mode = self.dispatcher.session().mode();
        if !self.controls.is_visible(action, mode) {
            debug!(?action, %mode, "Action not available in this mode");
            return;
        }

        match action {
            Action::SelectMode(mode) => self.dispatcher.set_mode(mode),
            Action::Reset => self.dispatcher.reset(now),
            Action::Undo => {
                self.dispatcher.undo();
            }
            Action::Flip => self.dispatcher.flip_orientation(),
            Action::CopyLink => self.copy_link(now).await,
        }
    }

    async fn copy_link(&mut self, now: Instant) {
        let url = self.dispatcher.share_link(&self.share_base_url);
        let copied = match self.clipboard.write_text(&url).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to copy link");
                false
            }
        };
        self.dispatcher.link_delivered(copied, now);
    }

    /// Hand the advisor a request if it is the AI's turn.
    fn start_ai_turn(&mut self, replies: &mpsc::Sender<AdvisorReply>) {
        let Some(request) = self.dispatcher.begin_ai_turn() else {
            return;
        };

        let advisor = Arc::clone(&self.advisor);
        let replies = replies.clone();
        tokio::spawn(async move {
            let reply = advisor.advise(&request).await;
            if replies.send((request, reply)).await.is_err() {
                debug!("Game loop gone, dropping advisor reply");
            }
        });
    }

    fn complete_ai_turn(&mut self, request: &AdviceRequest, reply: Result<Advice, AdvisorError>) {
        let outcome = self.dispatcher.complete_ai_turn(request, reply);
        debug!(?outcome, "Advisor reply handled");
    }

    fn render<V: View>(&mut self, view: &mut V, now: Instant) {
        if self.faulted {
            return;
        }

        let frame = Frame {
            session: self.dispatcher.session(),
            state: self.dispatcher.state(),
            controls: &self.controls,
            now,
        };

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| view.render(&frame))) {
            let message = panic_message(payload.as_ref());
            error!(%message, "Render fault");
            self.faulted = true;
            view.render_fault(&message);
        }
    }

    /// Run until `Quit` or until the command channel closes. Returns the
    /// final session.
    pub async fn run<V: View>(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        view: &mut V,
    ) -> Session {
        let (reply_tx, mut reply_rx) = mpsc::channel::<AdvisorReply>(4);

        loop {
            if !self.faulted {
                self.start_ai_turn(&reply_tx);
            }
            self.render(view, Instant::now());

            let deadline = self.dispatcher.session().notification_deadline();

            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if self.handle(command, Instant::now()).await == Flow::Quit {
                        break;
                    }
                }
                Some((request, reply)) = reply_rx.recv() => {
                    self.complete_ai_turn(&request, reply);
                }
                _ = sleep_until(deadline) => {
                    self.dispatcher.expire_notification(Instant::now());
                }
            }
        }

        self.dispatcher.into_session()
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown render error".to_string()
    }
}
