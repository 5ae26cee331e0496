//! Configuration view and validation commands: `sprintboard config`.

use std::path::Path;

use anyhow::Result;
use sprintboard::config::{BoardConfig, BoardToml};

use super::super::ConfigCommands;

fn print_effective(config: &BoardConfig) {
    let toml = &config.toml;
    println!("[api]");
    println!("  base_url = \"{}\"", toml.api.base_url);
    println!(
        "  token = {}",
        if toml.api.token.is_some() { "(set)" } else { "(none)" }
    );
    println!("  timeout_secs = {}", toml.api.timeout_secs);
    println!();
    println!("[division]");
    println!("  default_subtasks = {}", toml.division.default_subtasks);
    println!("  atomize_path = \"{}\"", toml.division.atomize_path);
    println!("  analyze_path = \"{}\"", toml.division.analyze_path);
    println!();
    println!("[logging]");
    println!("  level = \"{}\"", toml.logging.level);
    println!("  json = {}", toml.logging.json);
    if let Some(dir) = &toml.logging.directory {
        println!("  directory = \"{}\"", dir.display());
    }
    println!();
}

pub fn cmd_config(
    project_dir: &Path,
    config: &BoardConfig,
    command: Option<ConfigCommands>,
) -> Result<()> {
    let project_path = BoardConfig::project_path(project_dir);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Sprintboard Configuration");
            println!("=========================");
            println!();
            if config.sources.is_empty() {
                println!("No config files found; using defaults.");
            } else {
                for source in &config.sources {
                    println!("Config file: {}", source.display());
                }
            }
            println!();
            println!("Effective values (with env/CLI overrides):");
            print_effective(config);
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();
            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if project_path.exists() {
                println!("Config already exists at {}", project_path.display());
                return Ok(());
            }
            BoardToml::default().save(&project_path)?;
            println!("Created {}", project_path.display());
        }
    }
    Ok(())
}
