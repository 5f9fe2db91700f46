//! Ask command - one grounded question against a set of documents.

use super::{load_config, print_reply, runtime, scan_wait_timeout, spinner};
use crate::session::Session;
use anyhow::{Context, Result};
use colored::Colorize;

/// Run the ask command.
pub fn run(question: &str, docs: &[String]) -> Result<()> {
    let config = load_config()?;
    let mut session = Session::from_config(&config).context("Failed to start session")?;
    let rt = runtime()?;

    rt.block_on(async {
        for path in docs {
            let uploaded = session
                .upload_path(path)
                .await
                .with_context(|| format!("Failed to upload {}", path))?;
            for doc in &uploaded {
                println!(
                    "  {} {} {}",
                    "↑".cyan(),
                    doc.name,
                    format!("[{}]", doc.short_id()).dimmed()
                );
            }
        }

        if session.documents().await.is_empty() {
            println!(
                "{} No documents given; the bot will have nothing to cite.",
                "Note:".yellow()
            );
        } else {
            let pb = spinner("Running security scans...")?;
            let settled = session.wait_for_scans(scan_wait_timeout(&config)).await;
            pb.finish_and_clear();
            if !settled {
                println!(
                    "{} Some documents are still scanning and will be ignored.",
                    "Note:".yellow()
                );
            }
        }

        println!("{} {}", "Question:".cyan().bold(), question);
        println!("{}", "─".repeat(70));

        let pb = spinner(format!("Asking {}...", session.backend()))?;
        let outcome = session.submit(question).await;
        pb.finish_and_clear();

        print_reply(&session.bot().name, &outcome?);
        Ok::<_, anyhow::Error>(())
    })
}
