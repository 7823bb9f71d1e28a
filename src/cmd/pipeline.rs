//! Pipeline lifecycle, gate decisions, status, and audit commands.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

use handoff::agent::AgentId;
use handoff::phase::Phase;
use handoff::pipeline::PipelineController;
use handoff::prompts::build_agent_prompt;

pub fn cmd_start(workspace: &Path, task: &str) -> Result<()> {
    let mut controller = PipelineController::open(workspace);
    controller.start(task)?;

    println!();
    println!("Pipeline started: {}", task);
    println!(
        "Phase: {} - the {} is up",
        controller.state().current_phase,
        console::style("planner").cyan()
    );
    println!();
    println!("Run 'handoff prompt' for the planner's instructions,");
    println!("then 'handoff submit' (or 'handoff agent submit planner') to record its output.");
    println!();
    Ok(())
}

pub fn cmd_status(workspace: &Path) -> Result<()> {
    let controller = PipelineController::open(workspace);
    let state = controller.state();

    println!();
    println!("Handoff Pipeline Status");
    println!("=======================");
    println!();

    if state.current_phase == Phase::Idle {
        println!("Phase: idle - no pipeline is running.");
        println!();
        println!("Run 'handoff start <task>' to begin.");
        println!();
        return Ok(());
    }

    println!("Run:   {}", state.run_id);
    if let Some(task) = &state.task_description {
        println!("Task:  {}", task);
    }
    println!(
        "Phase: {}",
        console::style(state.current_phase).bold()
    );

    if let Some(agent) = controller.active_agent() {
        println!(
            "Agent: {} ({}) is working",
            agent.definition().title,
            agent
        );
    } else if controller.can_approve() {
        println!(
            "Gate:  awaiting decision: 'handoff approve' or 'handoff reject'"
        );
    } else if state.current_phase == Phase::Completed {
        println!("The pipeline is complete. 'handoff start <task>' begins a new run.");
    }

    if !state.outputs.is_empty() {
        let recorded: Vec<String> = state.outputs.keys().map(|a| a.to_string()).collect();
        println!("Outputs recorded: {}", recorded.join(", "));
    }

    if !state.history.is_empty() {
        println!();
        println!("Recent activity:");
        for entry in state.history.iter().rev().take(5) {
            let detail = entry
                .detail
                .as_deref()
                .map(|d| format!(" ({})", d))
                .unwrap_or_default();
            println!(
                "  {} {} in {}{}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.action,
                entry.phase,
                detail
            );
        }
    }
    println!();
    Ok(())
}

pub fn cmd_submit(workspace: &Path, file: Option<&Path>) -> Result<()> {
    let content = read_content(file)?;
    let mut controller = PipelineController::open(workspace);

    let Some(agent) = controller.active_agent() else {
        anyhow::bail!(
            "No agent is active in the {} phase; nothing to submit",
            controller.state().current_phase
        );
    };

    controller.save_output(&content)?;
    println!(
        "Recorded {} output; pipeline is now in the {} phase",
        agent,
        controller.state().current_phase
    );
    Ok(())
}

pub fn cmd_approve(workspace: &Path) -> Result<()> {
    let mut controller = PipelineController::open(workspace);
    let from = controller.state().current_phase;
    controller.approve()?;

    let now = controller.state().current_phase;
    println!("Approved {}; pipeline is now in the {} phase", from, now);
    if let Some(agent) = controller.active_agent() {
        println!("The {} is up.", agent.definition().title.to_lowercase());
    } else if now == Phase::Completed {
        println!("{}", console::style("Pipeline complete.").green());
    }
    Ok(())
}

pub fn cmd_reject(workspace: &Path, feedback: Option<&str>) -> Result<()> {
    let mut controller = PipelineController::open(workspace);
    let from = controller.state().current_phase;
    controller.reject(feedback)?;

    println!(
        "Rejected {}; pipeline returned to the {} phase",
        from,
        controller.state().current_phase
    );
    Ok(())
}

pub fn cmd_history(workspace: &Path, limit: usize) -> Result<()> {
    let controller = PipelineController::open(workspace);
    let history = &controller.state().history;

    if history.is_empty() {
        println!("No history recorded.");
        return Ok(());
    }

    println!();
    println!("{:<20} {:<13} {:<13} Detail", "Timestamp", "Action", "Phase");
    for entry in history.iter().rev().take(limit).rev() {
        println!(
            "{:<20} {:<13} {:<13} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.action.to_string(),
            entry.phase.to_string(),
            entry.detail.as_deref().unwrap_or("-")
        );
    }
    println!();
    Ok(())
}

pub fn cmd_reset(workspace: &Path, force: bool) -> Result<()> {
    use dialoguer::Confirm;

    if !force {
        let confirm = Confirm::new()
            .with_prompt("This will delete all pipeline state and outputs. Are you sure?")
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirm {
            println!("Reset cancelled");
            return Ok(());
        }
    }

    let mut controller = PipelineController::open(workspace);
    controller.reset()?;
    println!("Reset complete; pipeline is idle");
    Ok(())
}

pub fn cmd_prompt(workspace: &Path, agent: Option<&str>) -> Result<()> {
    let controller = PipelineController::open(workspace);

    let agent: AgentId = match agent {
        Some(name) => name.parse()?,
        None => controller.active_agent().ok_or_else(|| {
            anyhow::anyhow!(
                "No agent is active in the {} phase; name one explicitly",
                controller.state().current_phase
            )
        })?,
    };

    let prompt = build_agent_prompt(controller.state(), agent.definition());
    eprintln!("# model: {}", prompt.model);
    println!("{}", prompt.text);
    Ok(())
}

pub(crate) fn read_content(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read output file: {}", path.display())),
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read output from stdin")?;
            Ok(content)
        }
    }
}
