//! System clipboard access for the copy-link action. Failure is never fatal:
//! the link is always in the address-bar fragment as well.

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::ClipboardError;

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Pipes the text into the first clipboard tool found on the system.
#[derive(Debug, Clone)]
pub struct SystemClipboard {
    tools: Vec<(String, Vec<String>)>,
}

impl Default for SystemClipboard {
    fn default() -> Self {
        let tools: [(&str, &[&str]); 4] = [
            ("wl-copy", &[]),
            ("xclip", &["-selection", "clipboard"]),
            ("xsel", &["--clipboard", "--input"]),
            ("pbcopy", &[]),
        ];
        Self {
            tools: tools
                .iter()
                .map(|(cmd, args)| (cmd.to_string(), args.iter().map(|a| a.to_string()).collect()))
                .collect(),
        }
    }
}

impl SystemClipboard {
    pub fn with_tools(tools: Vec<(String, Vec<String>)>) -> Self {
        Self { tools }
    }

    async fn pipe_to(cmd: &str, args: &[String], text: &str) -> Result<(), ClipboardError> {
        let mut child = Command::new(cmd)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClipboardError::Command(format!("{cmd}: stdin unavailable")))?;
        stdin.write_all(text.as_bytes()).await?;
        stdin.shutdown().await?;
        drop(stdin);

        let status = child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            Err(ClipboardError::Command(format!("{cmd} exited with {status}")))
        }
    }
}

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut last_error = ClipboardError::Unavailable;

        for (cmd, args) in &self.tools {
            match Self::pipe_to(cmd, args, text).await {
                Ok(()) => {
                    debug!(tool = %cmd, "Copied to clipboard");
                    return Ok(());
                }
                Err(ClipboardError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    debug!(tool = %cmd, error = %e, "Clipboard tool failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

/// A clipboard that is never available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClipboard;

#[async_trait]
impl Clipboard for NoClipboard {
    async fn write_text(&self, _text: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError::Unavailable)
    }
}
