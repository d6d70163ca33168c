use std::io::Write;
use std::sync::Mutex;

use base64::Engine;

use crate::error::{Result, WalletError};

pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<()>;
}

/// Copies through the terminal with an OSC 52 escape sequence, which most
/// terminal emulators (and tmux with `set-clipboard on`) forward to the
/// system clipboard.
#[derive(Debug, Default)]
pub struct TerminalClipboard;

impl TerminalClipboard {
    fn sequence(text: &str) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
        format!("\x1b]52;c;{encoded}\x07")
    }
}

impl Clipboard for TerminalClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        let mut out = std::io::stdout().lock();
        out.write_all(Self::sequence(text).as_bytes())?;
        out.flush().map_err(WalletError::from)
    }
}

/// Keeps the last copied text; for tests and headless runs.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        let mut slot = self
            .contents
            .lock()
            .map_err(|_| WalletError::Storage("clipboard lock poisoned".to_string()))?;
        *slot = Some(text.to_string());
        Ok(())
    }
}
