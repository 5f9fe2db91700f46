//! Shell command - interactive console for uploading documents and chatting.

use super::{
    get_paths, load_config, print_documents, print_history, print_reply, runtime, spinner,
};
use crate::session::{Session, SessionError};
use anyhow::{Context, Result};
use colored::Colorize;
use knowbot_config::Config;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::runtime::Runtime;

/// One parsed line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellCommand {
    Chat(String),
    Upload(String),
    Docs,
    Remove(String),
    Bot,
    ReloadBot,
    Set { field: String, value: String },
    Status,
    History,
    HistoryJson,
    Reset,
    Help,
    Exit,
    Usage(&'static str),
    Unknown(String),
}

impl ShellCommand {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(command) = line.strip_prefix('/') else {
            return ShellCommand::Chat(line.to_string());
        };

        let (name, rest) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };

        match name {
            "upload" | "u" if rest.is_empty() => ShellCommand::Usage("/upload <path>"),
            "upload" | "u" => ShellCommand::Upload(rest.to_string()),
            "docs" | "d" => ShellCommand::Docs,
            "rm" if rest.is_empty() => ShellCommand::Usage("/rm <id-prefix>"),
            "rm" => ShellCommand::Remove(rest.to_string()),
            "bot" if rest == "reload" => ShellCommand::ReloadBot,
            "bot" => ShellCommand::Bot,
            "set" if rest.is_empty() => ShellCommand::Usage("/set <field> [value]"),
            "set" => {
                let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                ShellCommand::Set {
                    field: field.to_string(),
                    value: value.trim().to_string(),
                }
            }
            "status" => ShellCommand::Status,
            "history" | "h" if rest == "json" => ShellCommand::HistoryJson,
            "history" | "h" => ShellCommand::History,
            "reset" => ShellCommand::Reset,
            "help" | "?" => ShellCommand::Help,
            "exit" | "quit" | "q" => ShellCommand::Exit,
            other => ShellCommand::Unknown(other.to_string()),
        }
    }
}

/// Run the interactive shell.
pub fn run() -> Result<()> {
    let config = load_config()?;
    let paths = get_paths()?;
    let mut session = Session::from_config(&config).context("Failed to start session")?;
    let rt = runtime()?;

    let mut rl = DefaultEditor::new()?;
    let _ = rl.load_history(&paths.history_file);

    println!("{}", "knowbot Interactive Shell".cyan().bold());
    println!("{}", "─".repeat(50));
    println!(
        "Bot {} on {}",
        session.bot().name.white().bold(),
        session.backend().dimmed()
    );
    println!(
        "Type a question to chat, {} for commands, {} to exit.",
        "/help".cyan(),
        "/exit".cyan()
    );
    println!();

    loop {
        let prompt = format!("{} ", format!("{}>", session.bot().name).green().bold());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match ShellCommand::parse(line) {
                    ShellCommand::Exit => {
                        println!("Goodbye!");
                        break;
                    }
                    command => {
                        if let Err(e) = execute(command, &mut session, &config, &rt) {
                            eprintln!("{} {:#}", "Error:".red(), e);
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("{} {:?}", "Error:".red(), err);
                break;
            }
        }
    }

    if let Some(parent) = paths.history_file.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = rl.save_history(&paths.history_file);

    Ok(())
}

/// Execute one shell command against the session.
fn execute(
    command: ShellCommand,
    session: &mut Session,
    config: &Config,
    rt: &Runtime,
) -> Result<()> {
    match command {
        ShellCommand::Chat(utterance) => {
            let pb = spinner("ANALYZING_NODE_DATA...")?;
            let outcome = rt.block_on(session.submit(&utterance));
            pb.finish_and_clear();

            match outcome {
                Ok(outcome) => print_reply(&session.bot().name, &outcome),
                Err(SessionError::EmptyUtterance) => {}
                Err(e) => return Err(e.into()),
            }
        }

        ShellCommand::Upload(path) => {
            let uploaded = rt.block_on(session.upload_path(&path))?;
            if uploaded.is_empty() {
                println!("{}", "No readable text files found.".dimmed());
            }
            for doc in &uploaded {
                println!(
                    "{} {} {} {}",
                    "↑".cyan(),
                    doc.name.white().bold(),
                    format!("[{}]", doc.short_id()).dimmed(),
                    "scanning...".yellow()
                );
            }
        }

        ShellCommand::Docs => {
            let documents = rt.block_on(session.documents());
            print_documents(&documents, &config.ui.date_format);
        }

        ShellCommand::Remove(id) => {
            let removed = rt.block_on(session.remove_document(&id))?;
            println!(
                "{} Removed {} {}",
                "✓".green(),
                removed.name,
                format!("[{}]", removed.short_id()).dimmed()
            );
        }

        ShellCommand::Bot => {
            let bot = session.bot();
            println!("{}", "Bot Persona".cyan().bold());
            println!("{}", "─".repeat(50));
            println!("  {:<20} {}", "name:".dimmed(), bot.name);
            println!("  {:<20} {}", "organization_name:".dimmed(), bot.organization_name);
            println!("  {:<20} {}", "industry:".dimmed(), bot.industry);
            println!("  {:<20} {}", "custom_instructions:".dimmed(), bot.custom_instructions);
        }

        ShellCommand::ReloadBot => {
            session.update_bot(load_config()?.bot);
            println!("{} Persona reloaded from config.", "✓".green());
        }

        ShellCommand::Set { field, value } => {
            session.set_bot_field(&field, &value)?;
            println!("{} Set {} = {}", "✓".green(), field.cyan(), value);
        }

        ShellCommand::Status => {
            let status = rt.block_on(session.status());
            let readiness = match status.readiness() {
                "READY" => "READY".green().bold(),
                other => other.yellow().bold(),
            };
            println!("{} {}", "Node Status:".cyan().bold(), readiness);
            println!("{}", "─".repeat(50));
            println!("  Bot: {}", status.bot_name);
            println!("  Backend: {}", status.backend);
            println!(
                "  Documents: {} total, {} active, {} scanning",
                status.documents.total, status.documents.active, status.documents.scanning
            );
            if status.documents.error > 0 {
                println!("  {} {} failed scan", "✗".red(), status.documents.error);
            }
            println!("  Messages: {}", status.turns);
        }

        ShellCommand::History => {
            print_history(&session.bot().name, session.conversation().messages());
        }

        ShellCommand::HistoryJson => {
            println!("{}", session.conversation().to_json()?);
        }

        ShellCommand::Reset => {
            rt.block_on(session.reset());
            println!("{} Conversation and documents cleared.", "✓".green());
        }

        ShellCommand::Help => print_help(),

        ShellCommand::Usage(usage) => println!("Usage: {}", usage),

        ShellCommand::Unknown(name) => {
            println!(
                "{} Unknown command: '/{}'. Type {} for help.",
                "?".yellow(),
                name,
                "/help".cyan()
            );
        }

        ShellCommand::Exit => {}
    }

    Ok(())
}

fn print_help() {
    println!("{}", "Available Commands:".cyan().bold());
    println!();
    println!("  {}        Upload a file or directory", "/upload <path>".white());
    println!("  {}                 List documents and scan status", "/docs".white());
    println!("  {}        Remove a document", "/rm <id-prefix>".white());
    println!("  {}                  Show the bot persona", "/bot".white());
    println!("  {}           Restore the persona from the config file", "/bot reload".white());
    println!("  {}  Change a persona field; no value clears it", "/set <field> [value]".white());
    println!("  {}               Show knowledge base status", "/status".white());
    println!("  {}              Show the conversation", "/history".white());
    println!("  {}         Export the conversation as JSON", "/history json".white());
    println!("  {}                Clear conversation and documents", "/reset".white());
    println!("  {}                 Exit the shell", "/exit".white());
    println!();
    println!("Anything else is sent to the bot as a question.");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_chat() {
        assert_eq!(
            ShellCommand::parse("  What is the refund policy? "),
            ShellCommand::Chat("What is the refund policy?".to_string())
        );
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            ShellCommand::parse("/upload ~/docs/policy.txt"),
            ShellCommand::Upload("~/docs/policy.txt".to_string())
        );
        assert_eq!(ShellCommand::parse("/docs"), ShellCommand::Docs);
        assert_eq!(ShellCommand::parse("/bot"), ShellCommand::Bot);
        assert_eq!(ShellCommand::parse("/bot reload"), ShellCommand::ReloadBot);
        assert_eq!(
            ShellCommand::parse("/rm 1a2b"),
            ShellCommand::Remove("1a2b".to_string())
        );
        assert_eq!(ShellCommand::parse("/q"), ShellCommand::Exit);
        assert_eq!(
            ShellCommand::parse("/dance"),
            ShellCommand::Unknown("dance".to_string())
        );
    }

    #[test]
    fn test_set_keeps_spaces_in_value() {
        assert_eq!(
            ShellCommand::parse("/set tone Friendly and brief."),
            ShellCommand::Set {
                field: "tone".to_string(),
                value: "Friendly and brief.".to_string(),
            }
        );
        assert_eq!(
            ShellCommand::parse("/set"),
            ShellCommand::Usage("/set <field> [value]")
        );
    }

    #[test]
    fn test_set_without_value_clears_field() {
        assert_eq!(
            ShellCommand::parse("/set industry"),
            ShellCommand::Set {
                field: "industry".to_string(),
                value: String::new(),
            }
        );
    }

    #[test]
    fn test_history_json() {
        assert_eq!(ShellCommand::parse("/history json"), ShellCommand::HistoryJson);
        assert_eq!(ShellCommand::parse("/h"), ShellCommand::History);
    }

    #[test]
    fn test_missing_arguments_show_usage() {
        assert_eq!(ShellCommand::parse("/upload"), ShellCommand::Usage("/upload <path>"));
        assert_eq!(ShellCommand::parse("/rm  "), ShellCommand::Usage("/rm <id-prefix>"));
    }
}
