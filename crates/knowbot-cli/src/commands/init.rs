//! Initialize knowbot.

use super::get_paths;
use anyhow::{Context, Result};
use colored::Colorize;
use knowbot_config::Config;

pub fn run() -> Result<()> {
    let paths = get_paths()?;

    if paths.is_initialized() {
        println!("{} knowbot is already initialized.", "Note:".yellow().bold());
        println!("  Config: {}", paths.config_file.display());
        return Ok(());
    }

    println!("{}", "Initializing knowbot...".cyan().bold());

    paths.ensure_dirs().context("Failed to create directories")?;
    println!("  {} Created directories", "✓".green());

    Config::create_default_file(&paths.config_file).context("Failed to create config file")?;
    println!(
        "  {} Created config: {}",
        "✓".green(),
        paths.config_file.display()
    );

    println!();
    println!("{}", "knowbot initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Pick a backend: {}", "knowbot config set llm.provider ollama".cyan());
    println!("  2. Name your bot: {}", "knowbot config set bot.name HELPDESK_01".cyan());
    println!("  3. Start chatting: {}", "knowbot shell".cyan());

    Ok(())
}
