use std::{future::Future, ops::ControlFlow};

use anyhow::{Context, Result};
use log::info;
use tokio::{
    task::JoinHandle,
    time::{self, Duration},
};
use tokio_util::sync::CancellationToken;

/// Repeating tick source. The first tick fires immediately.
///
/// The loop ends when `on_tick` breaks or when [`Ticker::stop`] is called. A tick
/// already in progress when `stop` is called runs to completion.
pub struct Ticker {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

impl Ticker {
    pub fn spawn<F, Fut>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            loop {
                tokio::select! {
                    biased;
                    _ = token_clone.cancelled() => {
                        info!("exam ticker cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        if on_tick().await.is_break() {
                            break;
                        }
                    }
                }
            }
        });

        Self {
            handle,
            cancel_token,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn stop(self) -> Result<()> {
        self.cancel_token.cancel();
        self.handle.await.context("exam ticker task failed to join")
    }
}
