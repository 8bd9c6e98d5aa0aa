//! Terminal chess client
//!
//! Play on one board, against Gemini, or by passing a `#fen=` link back and
//! forth with a friend.

use tokio::sync::mpsc;
use tracing::info;

use client::advisor;
use client::clipboard::SystemClipboard;
use client::shell::{self, TerminalView};
use client::{Config, Game};

/// Parse --link <url> from CLI args
fn parse_link_arg() -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--link" {
            if let Some(link) = args.get(i + 1) {
                return Some(link.clone());
            }
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    // Logs go to stderr so they don't interleave with the board
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::from_env();
    if let Some(link) = parse_link_arg() {
        config.initial_link = Some(link);
    }
    info!(
        model = %config.model,
        ai_side = ?config.ai_side,
        linked = config.initial_link.is_some(),
        "Starting link chess"
    );

    let advisor = advisor::from_config(&config);
    let game = Game::from_config(&config, advisor, Box::new(SystemClipboard::default()));

    let (tx, rx) = mpsc::channel(16);
    // Not joined: a read blocked on the terminal must not keep us alive after quit
    shell::spawn_stdin_reader(tx)?;

    println!("{}", shell::HELP);
    let mut view = TerminalView::stdout();
    let session = game.run(rx, &mut view).await;

    info!(
        plies = session.record().len(),
        fen = session.position().fen(),
        "Goodbye"
    );
    Ok(())
}
