//! The worker tool surface: store-direct operations for the autonomous
//! worker process. Output here is machine-oriented (JSON where structured)
//! since the consumer is an agent tool, not a human.

use anyhow::Result;
use std::path::Path;

use handoff::agent::AgentId;
use handoff::context;
use handoff::worker::WorkerSurface;

use super::super::AgentCommands;

pub fn cmd_agent(workspace: &Path, command: &AgentCommands) -> Result<()> {
    let surface = WorkerSurface::new(workspace);

    match command {
        AgentCommands::Task => {
            println!("{}", serde_json::to_string_pretty(&surface.status())?);
        }
        AgentCommands::Read { agent, all } => {
            if *all {
                let outputs = surface.read_all_outputs();
                println!("{}", serde_json::to_string_pretty(&outputs)?);
            } else {
                let Some(name) = agent else {
                    anyhow::bail!("Name an agent to read, or pass --all");
                };
                let agent: AgentId = name.parse()?;
                match surface.read_output(agent) {
                    Some(content) => print!("{}", content),
                    None => anyhow::bail!("No output recorded for the {} yet", agent),
                }
            }
        }
        AgentCommands::Submit { agent, file } => {
            let agent: AgentId = agent.parse()?;
            let content = super::pipeline::read_content(file.as_deref())?;
            let state = surface.submit(agent, &content)?;
            println!(
                "Recorded {} output; pipeline is now in the {} phase",
                agent, state.current_phase
            );
        }
        AgentCommands::Context => {
            println!("{}", context::scan(workspace).render());
        }
    }
    Ok(())
}
