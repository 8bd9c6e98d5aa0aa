//! Terminal presentation: draws frames as text and turns typed lines into
//! commands.

use std::io::{self, BufRead, Write};
use std::sync::LazyLock;
use std::thread;

use chess_core::{Color, MoveInput, Role};
use regex::Regex;
use shakmaty::{File, Rank, Square};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::controls::Action;
use crate::dispatcher::TurnState;
use crate::driver::{Command, Frame, View};
use crate::session::Mode;

/// "e2e4", "e2 e4", "e2-e4", "e7e8q", in either case
static DROP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-h][1-8])[\s-]*([a-h][1-8])([qrbn])?$").expect("valid drop regex")
});

pub const HELP: &str = "\
Moves:    e2e4 | e2 e4 | e7e8q | Nf3 | O-O
Modes:    mode local | mode online | mode ai
Actions:  reset | undo | flip | link | reload
Links:    open <url or #fen=...>
Other:    help | quit";

/// One typed line, interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Help,
    Blank,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Blank;
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match (word.to_ascii_lowercase().as_str(), rest) {
        ("help" | "?", "") => return Input::Help,
        ("quit" | "exit", "") => Command::Quit,
        ("reset" | "new", "") => Command::Action(Action::Reset),
        ("undo", "") => Command::Action(Action::Undo),
        ("flip", "") => Command::Action(Action::Flip),
        ("link" | "share", "") => Command::Action(Action::CopyLink),
        ("reload", "") => Command::Reload,
        ("open", link) if !link.is_empty() => Command::Open(link.to_string()),
        ("mode", name) => match parse_mode(name) {
            Some(mode) => Command::Action(Action::SelectMode(mode)),
            None => return Input::Unknown(line.to_string()),
        },
        _ => parse_move(line),
    };
    Input::Command(command)
}

fn parse_mode(name: &str) -> Option<Mode> {
    match name.to_ascii_lowercase().as_str() {
        "local" => Some(Mode::Local),
        "online" | "link" | "remote" => Some(Mode::RemoteLink),
        "ai" | "gemini" => Some(Mode::Ai),
        _ => None,
    }
}

/// Square pairs become drops, anything else goes to the rules as a token.
fn parse_move(line: &str) -> Command {
    if let Some(cap) = DROP.captures(line) {
        let promotion = cap
            .get(3)
            .and_then(|m| m.as_str().chars().next())
            .and_then(|c| Role::from_char(c.to_ascii_lowercase()));
        let from = cap[1].to_ascii_lowercase();
        let to = cap[2].to_ascii_lowercase();
        if let Ok(input) = MoveInput::drop(&from, &to) {
            let input = match promotion {
                Some(role) => input.with_promotion(role),
                None => input,
            };
            return Command::Move(input);
        }
    }
    Command::Move(MoveInput::token(line))
}

/// Read commands from stdin on a dedicated thread. Blocking reads there never
/// hold up runtime shutdown once the game loop quits.
pub fn spawn_stdin_reader(tx: mpsc::Sender<Command>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || read_commands(io::stdin().lock(), &tx))
}

/// Feed input lines to the game loop until `quit` or end of input; the
/// latter also sends `Quit`. Blocks the calling thread.
pub fn read_commands<R: BufRead>(input: R, tx: &mpsc::Sender<Command>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to read input");
                break;
            }
        };

        match parse_command(&line) {
            Input::Command(command) => {
                let quit = command == Command::Quit;
                if tx.blocking_send(command).is_err() || quit {
                    return;
                }
            }
            Input::Help => println!("{HELP}"),
            Input::Blank => {}
            Input::Unknown(text) => println!("Unknown command: {text} (type 'help')"),
        }
    }

    debug!("Input closed");
    let _ = tx.blocking_send(Command::Quit);
}

/// Draws the board, status and controls as plain text.
pub struct TerminalView<W: Write> {
    out: W,
}

impl TerminalView<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, frame: &Frame<'_>) -> io::Result<()> {
        let session = frame.session;
        let board = session.position().board();

        let (ranks, files): (Vec<u32>, Vec<u32>) = match session.orientation() {
            Color::White => ((0..8).rev().collect(), (0..8).collect()),
            Color::Black => ((0..8).collect(), (0..8).rev().collect()),
        };

        writeln!(self.out)?;
        for &rank in &ranks {
            write!(self.out, " {} ", rank + 1)?;
            for &file in &files {
                let square = Square::from_coords(File::new(file), Rank::new(rank));
                let c = board.piece_at(square).map_or('.', |piece| piece.char());
                write!(self.out, " {c}")?;
            }
            writeln!(self.out)?;
        }
        let labels: String = files
            .iter()
            .map(|&f| format!(" {}", char::from(b'a' + f as u8)))
            .collect();
        writeln!(self.out, "   {labels}")?;
        writeln!(self.out)?;

        writeln!(self.out, "[{}] {}", session.mode(), session.status_text())?;
        if session.is_ai_pending() {
            writeln!(self.out, "Gemini is thinking...")?;
        } else if frame.state == TurnState::GameOver {
            writeln!(self.out, "Game over. Reset to play again.")?;
        }
        if let Some(commentary) = session.visible_commentary() {
            writeln!(self.out, "Gemini: \"{commentary}\"")?;
        }
        if let Some(text) = session.notification(frame.now) {
            writeln!(self.out, ">> {text}")?;
        }

        let movetext = session.record().movetext();
        if !movetext.is_empty() {
            writeln!(self.out, "Moves: {movetext}")?;
        }

        let controls: Vec<String> = frame
            .controls
            .visible_actions(session.mode())
            .into_iter()
            .map(|action| {
                let label = frame.controls.label(action);
                match action {
                    Action::SelectMode(mode) if mode == session.mode() => format!("*{label}*"),
                    _ => label.to_string(),
                }
            })
            .collect();
        writeln!(self.out, "{}", controls.join(" | "))?;
        if let Some(hint) = frame.controls.hint(session.mode()) {
            writeln!(self.out, "{hint}")?;
        }
        self.out.flush()
    }
}

impl<W: Write> View for TerminalView<W> {
    fn render(&mut self, frame: &Frame<'_>) {
        if let Err(e) = self.draw(frame) {
            warn!(error = %e, "Failed to draw board");
        }
    }

    fn render_fault(&mut self, message: &str) {
        let result = writeln!(
            self.out,
            "\nSomething went wrong while drawing the board: {message}\nType 'reload' to reload the game or 'quit' to exit."
        )
        .and_then(|()| self.out.flush());
        if let Err(e) = result {
            warn!(error = %e, "Failed to draw recovery screen");
        }
    }
}
