//! Background tasks feeding the UI loop.
//!
//! Refresh outcomes and icon loads arrive on other tasks; both are turned
//! into [`Action`]s so the engine is only ever touched by the UI loop.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use flowscope_core::RefreshOutcome;
use flowscope_core::render::icons::load_all;

use crate::action::Action;

/// Forward every refresh outcome until cancelled or either side closes.
pub async fn forward_outcomes(
    mut outcomes: mpsc::Receiver<RefreshOutcome>,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            outcome = outcomes.recv() => {
                let Some(outcome) = outcome else { break };
                if action_tx.send(Action::Refreshed(outcome)).is_err() {
                    break;
                }
            }
        }
    }
    debug!("outcome bridge shut down");
}

/// Load every device icon once and report each result.
pub async fn load_icons(dir: PathBuf, action_tx: mpsc::UnboundedSender<Action>) {
    for (kind, result) in load_all(&dir).await {
        if action_tx.send(Action::IconLoaded(kind, result)).is_err() {
            return;
        }
    }
}
