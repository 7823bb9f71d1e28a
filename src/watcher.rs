//! Synchronization watcher for the persisted store.
//!
//! The autonomous worker process writes the store directly, in bursts (the
//! record, then an output blob, in either order). This watcher observes the
//! store root for filesystem notifications and collapses each burst into a
//! single reconciliation: one debounce timer, restarted on every
//! notification, and a `reload()` on the controller when it finally fires.
//! Reloading re-announces state to observers, so downstream refresh (status
//! re-render) rides the controller's normal event path.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::pipeline::PipelineController;

/// Watch the store root and reconcile the controller after each write
/// burst. Runs until the watch backend drops the channel.
pub async fn watch_store(
    store_root: PathBuf,
    debounce: Duration,
    controller: Arc<Mutex<PipelineController>>,
) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel::<()>(64);

    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            )
        {
            // Full channel means a reconciliation is already pending;
            // dropping the signal loses nothing.
            let _ = tx.try_send(());
        }
    })?;
    watcher.watch(&store_root, RecursiveMode::Recursive)?;
    info!(path = %store_root.display(), "watching store for external writes");

    debounce_reloads(rx, debounce, controller).await;
    Ok(())
}

/// The debounce loop: a single pending timer, cancel-and-replace on every
/// new signal, reload on quiet. Never two timers at once, never a queued
/// second reload.
async fn debounce_reloads(
    mut signals: mpsc::Receiver<()>,
    debounce: Duration,
    controller: Arc<Mutex<PipelineController>>,
) {
    while signals.recv().await.is_some() {
        loop {
            match tokio::time::timeout(debounce, signals.recv()).await {
                // another write landed inside the window: restart the timer
                Ok(Some(())) => continue,
                // sender gone; fall through to a final reconciliation
                Ok(None) => break,
                // store stayed quiet for the full window
                Err(_) => break,
            }
        }

        match controller.lock() {
            Ok(mut controller) => {
                debug!("store changed externally; reconciling");
                controller.reload();
            }
            Err(_) => {
                error!("controller lock poisoned; stopping store watcher");
                return;
            }
        }
    }
}
