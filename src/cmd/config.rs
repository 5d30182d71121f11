//! Configuration view and validation commands: `claimcheck config`.

use anyhow::{Context, Result};

use claimcheck::config::{CONFIG_DIR, CONFIG_FILE, ClaimcheckToml, ClientConfig, DEFAULT_BASE_URL};

use super::super::{Cli, ConfigCommands};
use super::cli_overrides;

fn print_toml(toml: &ClaimcheckToml) {
    println!("[service]");
    println!(
        "  base_url = \"{}\"",
        toml.service.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    );
    println!("  timeout_secs = {}", toml.service.timeout_secs);
    println!();
    println!("[progress]");
    println!(
        "  transport = \"{}\"",
        toml.progress.transport.as_deref().unwrap_or("poll")
    );
    println!("  poll_interval_ms = {}", toml.progress.poll_interval_ms);
    println!("  completed_settle_ms = {}", toml.progress.completed_settle_ms);
    println!("  error_settle_ms = {}", toml.progress.error_settle_ms);
    println!();
}

pub fn cmd_config(
    project_dir: &std::path::Path,
    cli: &Cli,
    command: Option<ConfigCommands>,
) -> Result<()> {
    let config_dir = project_dir.join(CONFIG_DIR);
    let config_path = config_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("claimcheck Configuration");
            println!("========================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                print_toml(&ClaimcheckToml::load(&config_path)?);
            } else {
                println!("No claimcheck.toml found at {}", config_path.display());
                println!();
                println!("Using default configuration:");
                print_toml(&ClaimcheckToml::default());
                println!("Run 'claimcheck config init' to create a claimcheck.toml file.");
                println!();
            }

            // Effective values include env and CLI overrides
            println!("Effective values (with env/CLI overrides):");
            let config = ClientConfig::load(project_dir.to_path_buf(), &cli_overrides(cli))?;
            println!("  base_url = \"{}\"", config.base_url);
            println!("  transport = \"{}\"", config.transport);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No claimcheck.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = ClaimcheckToml::load(&config_path)?;
            let warnings = toml.validate();

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
            if config_path.exists() {
                println!("claimcheck.toml already exists at {}", config_path.display());
                println!("Remove it first if you want to regenerate.");
                return Ok(());
            }

            std::fs::create_dir_all(&config_dir).with_context(|| {
                format!("Failed to create config directory: {}", config_dir.display())
            })?;

            let mut toml = ClaimcheckToml::default();
            toml.service.base_url = Some(DEFAULT_BASE_URL.to_string());
            toml.progress.transport = Some("poll".to_string());
            toml.save(&config_path)?;

            println!("Created {}", config_path.display());
            println!();
            println!("Edit this file to point at your verification service.");
        }
    }

    Ok(())
}
