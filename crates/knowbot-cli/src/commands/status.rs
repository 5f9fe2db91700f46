//! Status command - check configuration and the generation backend.

use super::{get_paths, load_config, runtime};
use anyhow::Result;
use colored::Colorize;
use knowbot_config::{Config, LlmProvider};
use knowbot_llm::pipeline::GROUNDING_TEMPERATURE;
use knowbot_llm::OllamaClient;

pub fn run() -> Result<()> {
    let paths = get_paths()?;
    let config = load_config()?;

    println!("{}", "knowbot Status".cyan().bold());
    println!("{}", "─".repeat(50));

    println!();
    println!("{}", "Configuration".white().bold());
    if paths.is_initialized() {
        println!("  {} {}", "●".green(), paths.config_file.display());
    } else {
        println!(
            "  {} Not initialized, using defaults. Run {}.",
            "○".yellow(),
            "knowbot init".cyan()
        );
    }
    println!(
        "  Bot: {} ({}, {})",
        config.bot.name, config.bot.organization_name, config.bot.industry
    );
    println!(
        "  Scan delay: {}-{} ms",
        config.scan.min_delay_ms, config.scan.max_delay_ms
    );

    println!();
    println!("{}", "Generation Backend".white().bold());
    println!(
        "  Provider: {} · model {} · temperature {}",
        config.llm.provider,
        config.llm.active_model(),
        GROUNDING_TEMPERATURE
    );

    match config.llm.provider {
        LlmProvider::Ollama => check_ollama(&config)?,
        LlmProvider::Gemini => check_gemini(&config),
    }

    Ok(())
}

fn check_ollama(config: &Config) -> Result<()> {
    let client = OllamaClient::from_config(&config.llm)?;
    let rt = runtime()?;

    if !rt.block_on(client.is_available()) {
        println!(
            "  {} Ollama is not running at {}. Start it with 'ollama serve'.",
            "✗".red(),
            config.llm.host
        );
        return Ok(());
    }
    println!("  {} Ollama reachable at {}", "●".green(), config.llm.host);

    match rt.block_on(client.has_model(&config.llm.model)) {
        Ok(true) => println!("  {} Model {} is installed", "●".green(), config.llm.model),
        Ok(false) => println!(
            "  {} Model {} not found. Run 'ollama pull {}'.",
            "✗".red(),
            config.llm.model,
            config.llm.model
        ),
        Err(e) => println!("  {} Could not list models: {}", "✗".red(), e),
    }

    Ok(())
}

fn check_gemini(config: &Config) {
    match std::env::var(&config.llm.api_key_env) {
        Ok(key) if !key.is_empty() => println!(
            "  {} API key found in ${}",
            "●".green(),
            config.llm.api_key_env
        ),
        _ => println!(
            "  {} ${} is not set; queries will fail.",
            "✗".red(),
            config.llm.api_key_env
        ),
    }
    println!("  Endpoint: {}", config.llm.gemini_base_url);
}
