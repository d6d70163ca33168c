//! Cancellable receipt polling.
//!
//! A poll sleeps for `interval`, runs a blocking fetch off the executor, and
//! repeats until the fetch yields a value, the deadline passes, or the
//! [`CancelToken`] fires.

use std::sync::Arc;
use std::time::{Duration, Instant};

use smol::channel::{Receiver, Sender};
use smol::Timer;

use crate::error::{Result, WalletError};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
        }
    }
}

/// Clonable cancellation signal. Cancelling is permanent.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = smol::channel::bounded(1);
        Self { tx, rx }
    }

    pub fn cancel(&self) {
        self.tx.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        // Nothing is ever sent, so recv only returns when the channel closes.
        let _ = self.rx.recv().await;
    }
}

pub struct PollHandle<T> {
    token: CancelToken,
    task: smol::Task<Result<T>>,
}

impl<T> PollHandle<T> {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    pub async fn wait(self) -> Result<T> {
        self.task.await
    }
}

enum Tick {
    Elapsed,
    Cancelled,
}

/// Start polling `fetch` until it returns `Some`. `label` names the awaited
/// item (usually its hash) in logs and in [`WalletError::ReceiptTimeout`].
pub fn spawn_poll<T, F>(
    label: impl Into<String>,
    config: PollConfig,
    token: CancelToken,
    fetch: F,
) -> PollHandle<T>
where
    T: Send + 'static,
    F: Fn() -> Result<Option<T>> + Send + Sync + 'static,
{
    let label = label.into();
    let fetch = Arc::new(fetch);
    let loop_token = token.clone();
    let task = smol::spawn(async move { run_poll(label, config, loop_token, fetch).await });
    PollHandle { token, task }
}

async fn run_poll<T, F>(
    label: String,
    config: PollConfig,
    token: CancelToken,
    fetch: Arc<F>,
) -> Result<T>
where
    T: Send + 'static,
    F: Fn() -> Result<Option<T>> + Send + Sync + 'static,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        let tick = smol::future::or(
            async {
                Timer::after(config.interval).await;
                Tick::Elapsed
            },
            async {
                token.cancelled().await;
                Tick::Cancelled
            },
        )
        .await;
        if matches!(tick, Tick::Cancelled) {
            log::info!("[Poll] {} cancelled after {} attempts", label, attempt);
            return Err(WalletError::Cancelled);
        }

        attempt += 1;
        let f = Arc::clone(&fetch);
        match smol::unblock(move || f()).await {
            Ok(Some(value)) => {
                log::debug!("[Poll] {} ready after {} attempts", label, attempt);
                return Ok(value);
            }
            Ok(None) => {
                log::trace!("[Poll] {} not ready (attempt {})", label, attempt);
            }
            Err(err) => {
                log::warn!("[Poll] {} attempt {} failed: {}", label, attempt, err);
            }
        }

        if token.is_cancelled() {
            return Err(WalletError::Cancelled);
        }
        let waited = started.elapsed();
        if waited >= config.timeout {
            log::warn!("[Poll] {} timed out after {:?}", label, waited);
            return Err(WalletError::ReceiptTimeout {
                hash: label,
                waited,
            });
        }
    }
}
