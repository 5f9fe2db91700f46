//! CLI command implementations.

pub mod ask;
pub mod config;
pub mod init;
pub mod shell;
pub mod status;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use knowbot_config::{AppPaths, Config, DEFAULT_DATE_FORMAT};
use knowbot_core::{Document, DocumentStatus, Message, Role};
use knowbot_llm::QueryOutcome;
use std::fmt::Write;
use std::time::Duration;
use tokio::runtime::Runtime;

/// Extra time allowed past the longest configured scan delay.
const SCAN_WAIT_GRACE: Duration = Duration::from_secs(5);

/// Get the application paths.
pub fn get_paths() -> Result<AppPaths> {
    AppPaths::new().context("Failed to determine application directories")
}

/// Load configuration, falling back to defaults when knowbot is not initialized.
pub fn load_config() -> Result<Config> {
    let config = Config::load().context("Failed to load configuration")?;
    if !config.ui.color {
        colored::control::set_override(false);
    }
    Ok(config)
}

/// Create the async runtime used by a command.
pub fn runtime() -> Result<Runtime> {
    Runtime::new().context("Failed to create async runtime")
}

/// How long to wait for uploads to finish scanning.
pub fn scan_wait_timeout(config: &Config) -> Duration {
    Duration::from_millis(config.scan.max_delay_ms) + SCAN_WAIT_GRACE
}

/// A steadily ticking spinner with a message.
pub fn spinner(message: impl Into<String>) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Format a timestamp, falling back to the default pattern if `format` is invalid.
pub fn format_timestamp(at: &DateTime<Utc>, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", at.format(format)).is_err() {
        return at.format(DEFAULT_DATE_FORMAT).to_string();
    }
    out
}

/// Format a file size in human-readable form.
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Print the document list.
pub fn print_documents(documents: &[Document], date_format: &str) {
    let active = documents.iter().filter(|d| d.is_active()).count();
    println!(
        "{} {}",
        "Ingested Nodes".cyan().bold(),
        format!("({} / {} active)", active, documents.len()).dimmed()
    );
    println!("{}", "─".repeat(70));

    if documents.is_empty() {
        println!(
            "{}",
            "System idle. Use /upload <path> to add documents.".dimmed()
        );
        return;
    }

    for doc in documents {
        let (marker, detail) = match doc.status {
            DocumentStatus::Scanning => ("◐".yellow(), "SECURITY SCAN IN PROGRESS...".to_string()),
            DocumentStatus::Active => (
                "●".green(),
                format!("STATIONARY: {}", format_timestamp(&doc.uploaded_at, date_format)),
            ),
            DocumentStatus::Error => ("✗".red(), "SCAN FAILED".to_string()),
        };

        println!(
            "  {} {} {} {}",
            marker,
            format!("[{}]", doc.short_id()).dimmed(),
            doc.name.white().bold(),
            format!("{} · {}", doc.mime_type, format_size(doc.content.len())).dimmed()
        );
        println!("      {}", detail.dimmed());
    }
}

/// Print a model reply; sentinel failures are highlighted.
pub fn print_reply(bot_name: &str, outcome: &QueryOutcome) {
    let label = format!("{}:", bot_name);
    match outcome {
        QueryOutcome::Reply(text) => {
            println!("{}", label.green().bold());
            println!("{}", text);
        }
        QueryOutcome::EmptyResponse => {
            println!("{}", label.yellow().bold());
            println!("{}", outcome.to_string().yellow());
        }
        QueryOutcome::ServiceFailure(detail) => {
            println!("{}", label.red().bold());
            println!("{}", outcome.to_string().red());
            println!("{}", format!("  ({})", detail).dimmed());
        }
    }
}

/// Print the conversation transcript.
pub fn print_history(bot_name: &str, messages: &[Message]) {
    if messages.is_empty() {
        println!("{}", "Query interface ready. No messages yet.".dimmed());
        return;
    }

    for message in messages {
        match message.role {
            Role::User => println!("{} {}", "you>".cyan().bold(), message.text),
            Role::Model => println!("{} {}", format!("{}>", bot_name).green().bold(), message.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_wait_timeout() {
        let mut config = Config::default();
        config.scan.max_delay_ms = 1000;
        assert_eq!(scan_wait_timeout(&config), Duration::from_secs(6));
    }

    #[test]
    fn test_format_timestamp_falls_back_on_bad_pattern() {
        let at = DateTime::parse_from_rfc3339("2024-03-05T14:07:09Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(format_timestamp(&at, "%d/%m/%Y"), "05/03/2024");
        assert_eq!(format_timestamp(&at, "%Q"), "2024-03-05 14:07:09");
    }

    #[test]
    fn test_print_documents_survives_bad_date_format() {
        let mut store = knowbot_core::DocumentStore::new();
        let id = store.add("policy.txt", "text/plain", "Refunds within 30 days.").id;
        store.mark_active(&id);

        print_documents(store.documents(), "%Q");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(12), "12 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
