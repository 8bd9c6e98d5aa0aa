//! Link chess: local, AI and share-by-link play on one board.

pub mod advisor;
pub mod clipboard;
pub mod config;
pub mod controls;
pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod session;
pub mod shell;

pub use config::Config;
pub use controls::{Action, ControlPanel};
pub use dispatcher::{AiOutcome, Dispatcher, MoveOutcome, TurnState};
pub use driver::{Command, Flow, Frame, Game, View};
pub use session::{Mode, Session};
