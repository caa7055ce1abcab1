//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use std::path::Path;

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, workspace: &Path) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => handle_config(action, workspace).await,
        Commands::Check => handle_check(workspace).await,
    }
}

async fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".delver");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let default_config = delver_core::DelverConfig::default();
            let toml_str = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = delver_core::load_config(Some(workspace), None)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

/// Probe both providers and report reachability without running research.
async fn handle_check(workspace: &Path) -> anyhow::Result<()> {
    let config = delver_core::load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    println!("LLM: {} ({})", config.llm.backend, config.llm.model);
    match delver_core::create_llm_provider(&config.llm) {
        Ok(provider) => match provider.probe().await {
            Ok(()) => println!("  \x1b[32mok\x1b[0m - {} reachable", provider.name()),
            Err(e) => println!("  \x1b[31munreachable\x1b[0m - {}", e),
        },
        Err(e) => println!("  \x1b[31mnot configured\x1b[0m - {}", e),
    }

    println!("Search: {}", config.search.backend);
    match delver_core::create_search_provider(&config.search) {
        Ok(provider) => match provider.probe().await {
            Ok(()) => println!("  \x1b[32mok\x1b[0m - {} reachable", provider.name()),
            Err(e) => println!("  \x1b[31munreachable\x1b[0m - {}", e),
        },
        Err(e) => println!("  \x1b[31mnot configured\x1b[0m - {}", e),
    }

    Ok(())
}
