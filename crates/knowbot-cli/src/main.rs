//! knowbot CLI - a document-grounded knowledge bot for the terminal.

mod commands;
mod session;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// knowbot - answer questions strictly from the documents you upload
#[derive(Parser)]
#[command(name = "knowbot")]
#[command(version)]
#[command(about = "Answer questions strictly from the documents you upload", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize knowbot (create the config file)
    Init,

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Show configuration and backend status
    Status,

    /// Ask one question grounded in the given documents
    Ask {
        /// Your question
        question: String,

        /// File or directory to upload first (can be specified multiple times)
        #[arg(short, long = "doc")]
        docs: Vec<String>,
    },

    /// Start an interactive shell (default)
    Shell,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Open config file in editor
    Edit,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., llm.model, bot.name)
        key: String,

        /// Value to set
        value: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("knowbot=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("knowbot=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command.unwrap_or(Commands::Shell) {
        Commands::Init => commands::init::run(),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(),
            ConfigCommands::Edit => commands::config::edit(),
            ConfigCommands::Set { key, value } => commands::config::set(&key, &value),
        },
        Commands::Status => commands::status::run(),
        Commands::Ask { question, docs } => commands::ask::run(&question, &docs),
        Commands::Shell => commands::shell::run(),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
