//! Configuration view and scaffolding commands — `handoff config`.

use anyhow::{Context, Result};
use std::path::Path;

use handoff::config::{CONFIG_FILE, HandoffConfig};

use super::super::ConfigCommands;

pub fn cmd_config(workspace: &Path, command: Option<&ConfigCommands>) -> Result<()> {
    match command.unwrap_or(&ConfigCommands::Show) {
        ConfigCommands::Show => {
            let config = HandoffConfig::load(workspace)?;
            let path = workspace.join(CONFIG_FILE);
            if path.exists() {
                println!("# {}", path.display());
            } else {
                println!("# {} not found; showing defaults", CONFIG_FILE);
            }
            println!();
            print!(
                "{}",
                toml::to_string_pretty(&config).context("Failed to render config")?
            );
        }
        ConfigCommands::Init => {
            let path = HandoffConfig::write_default(workspace)?;
            println!("Wrote default config to {}", path.display());
        }
    }
    Ok(())
}
