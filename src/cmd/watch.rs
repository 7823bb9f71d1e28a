//! Watch mode: the long-running controller session.
//!
//! Runs the synchronization watcher (store → reload) and, unless disabled,
//! the inactivity-completion monitor (workspace saves → auto-complete).
//! Every state change — local or reconciled from the worker process — is
//! re-rendered to the terminal through the controller's observer list.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::{Arc, Mutex};

use handoff::config::HandoffConfig;
use handoff::events::PipelineEvent;
use handoff::inactivity::{InactivityMonitor, workspace_save_feed};
use handoff::pipeline::PipelineController;
use handoff::watcher::watch_store;

pub async fn cmd_watch(
    workspace: &Path,
    no_autocomplete: bool,
    quiet_secs: Option<u64>,
) -> Result<()> {
    let mut config = HandoffConfig::load(workspace)?;
    if let Some(secs) = quiet_secs {
        config.autocomplete.quiet_secs = secs;
    }
    if no_autocomplete {
        config.autocomplete.enabled = false;
    }

    let mut controller = PipelineController::open(workspace);
    // the watch backend needs the directory to exist before it can watch
    controller.store().ensure_layout()?;
    controller.subscribe(render_event);

    println!();
    println!(
        "Watching pipeline in {} (phase: {})",
        workspace.display(),
        console::style(controller.state().current_phase).bold()
    );
    if config.autocomplete.enabled {
        println!(
            "Auto-complete: on ({}s of workspace quiet completes the active stage)",
            config.autocomplete.quiet_period().as_secs()
        );
    } else {
        println!("Auto-complete: off");
    }
    println!("Press Ctrl-C to stop.");
    println!();

    let store_root = controller.store().root().to_path_buf();
    let controller = Arc::new(Mutex::new(controller));

    let watcher_task = tokio::spawn(watch_store(
        store_root,
        config.watcher.debounce(),
        Arc::clone(&controller),
    ));

    // When enabled, the heuristic subscribes to workspace saves; when not,
    // no subscription is made at all.
    let _feed;
    let monitor_task = if config.autocomplete.enabled {
        let (feed, saves) = workspace_save_feed(workspace)?;
        _feed = feed;
        let monitor = InactivityMonitor::new(&config.autocomplete);
        Some(tokio::spawn(monitor.run(saves, Arc::clone(&controller))))
    } else {
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    watcher_task.abort();
    if let Some(task) = monitor_task {
        task.abort();
    }
    println!();
    println!("Stopped watching.");
    Ok(())
}

fn render_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::PhaseChanged { phase, agent } => match agent {
            Some(agent) => println!(
                "{} phase: {} ({} working)",
                console::style("›").dim(),
                console::style(phase).bold(),
                agent.definition().title.to_lowercase()
            ),
            None => println!(
                "{} phase: {}",
                console::style("›").dim(),
                console::style(phase).bold()
            ),
        },
        PipelineEvent::OutputSaved { agent } => println!(
            "{} {} output recorded",
            console::style("›").dim(),
            agent
        ),
        PipelineEvent::PipelineReset => {
            println!("{} pipeline reset", console::style("›").dim());
        }
    }
}
