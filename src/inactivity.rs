//! Inactivity-completion heuristic.
//!
//! While an agent is active, workspace file saves are taken as signs the
//! stage is still being worked. When the workspace goes quiet for the
//! configured period, the stage is presumed finished: the monitor
//! synthesizes placeholder output (embedding the observed save count) and
//! drives the same `save_output` transition the interactive complete action
//! uses. This is a heuristic, not a guarantee — the human gate that follows
//! is where the presumption gets checked.
//!
//! The monitor re-checks `is_agent_active` when the timer fires: the worker
//! process may have already submitted through the store during the quiet
//! window, in which case the synthesized completion is dropped.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::agent::AgentId;
use crate::config::AutocompleteConfig;
use crate::pipeline::PipelineController;
use crate::store::STORE_DIR;

/// Watches workspace saves and auto-completes quiet stages.
pub struct InactivityMonitor {
    quiet: Duration,
    ignore: Vec<String>,
}

impl InactivityMonitor {
    pub fn new(config: &AutocompleteConfig) -> Self {
        Self {
            quiet: config.quiet_period(),
            ignore: config.ignore.clone(),
        }
    }

    /// Whether a saved path counts as workspace activity. Saves under the
    /// store root are the pipeline's own writes, never activity; the
    /// configured ignore list filters build/VCS noise.
    fn is_ignored(&self, path: &Path) -> bool {
        path.components().any(|component| {
            component.as_os_str().to_str().is_some_and(|name| {
                name == STORE_DIR || self.ignore.iter().any(|ignored| ignored == name)
            })
        })
    }

    /// Consume save signals until the channel closes. Arms only while a
    /// work phase is active; one debounce timer, restarted per signal.
    pub async fn run(
        self,
        mut saves: mpsc::Receiver<PathBuf>,
        controller: Arc<Mutex<PipelineController>>,
    ) {
        loop {
            let Some(path) = saves.recv().await else {
                return;
            };
            if self.is_ignored(&path) {
                continue;
            }

            // Signals arriving while no agent is active are dropped: the
            // heuristic only arms during a work phase.
            {
                let Ok(controller) = controller.lock() else {
                    warn!("controller lock poisoned; stopping inactivity monitor");
                    return;
                };
                if !controller.is_agent_active() {
                    continue;
                }
            }

            let mut signals: u32 = 1;
            let mut deadline = Instant::now() + self.quiet;
            loop {
                match tokio::time::timeout_at(deadline, saves.recv()).await {
                    Ok(Some(path)) => {
                        // only a qualifying save restarts the timer;
                        // ignored noise does not extend the quiet window
                        if !self.is_ignored(&path) {
                            signals += 1;
                            deadline = Instant::now() + self.quiet;
                        }
                    }
                    Ok(None) => return,
                    // quiet period elapsed with no further saves
                    Err(_) => break,
                }
            }

            let Ok(mut controller) = controller.lock() else {
                warn!("controller lock poisoned; stopping inactivity monitor");
                return;
            };
            // Re-check at fire time: the worker may have completed the
            // stage through the store while the timer was pending.
            let Some(agent) = controller.active_agent() else {
                debug!("workspace went quiet but no agent is active; nothing to complete");
                continue;
            };

            let content = synthesized_output(agent, signals);
            info!(%agent, signals, "workspace quiet; auto-completing stage");
            if let Err(err) = controller.save_output(&content) {
                warn!(error = %err, "auto-completion failed");
            }
        }
    }
}

/// The placeholder output recorded when a stage completes by inactivity.
fn synthesized_output(agent: AgentId, signals: u32) -> String {
    format!(
        "{} stage marked complete after workspace inactivity.\n\n\
         {} file save(s) were observed while the stage was active. Review the\n\
         working tree for the actual changes before approving.\n",
        agent.definition().title,
        signals
    )
}

/// Watch the workspace for file saves, feeding the monitor's signal
/// channel. Returns the watcher (which must be kept alive) and the
/// receiving end.
pub fn workspace_save_feed(
    workspace: &Path,
) -> notify::Result<(notify::RecommendedWatcher, mpsc::Receiver<PathBuf>)> {
    let (tx, rx) = mpsc::channel::<PathBuf>(256);

    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        {
            for path in event.paths {
                let _ = tx.try_send(path);
            }
        }
    })?;
    watcher.watch(workspace, RecursiveMode::Recursive)?;
    info!(path = %workspace.display(), "watching workspace for save activity");

    Ok((watcher, rx))
}
