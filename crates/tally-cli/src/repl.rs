//! Interactive demo loop.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use tally_rag::memory::MessageRole;
use tally_rag::{QueryOptions, RagService};

const BANNER: &str = "RAG SYSTEM DEMO";

/// Runs the interactive loop, optionally ingesting a directory first.
pub async fn run(
    service: RagService,
    data_dir: Option<PathBuf>,
    skip_ingestion: bool,
) -> anyhow::Result<()> {
    println!("\n{}", "=".repeat(80));
    println!("{:^80}", BANNER);
    println!("{}\n", "=".repeat(80));

    if !skip_ingestion {
        let Some(dir) = data_dir else {
            println!("No data directory provided for ingestion.");
            return Ok(());
        };

        println!("Ingesting documents from directory: {}\n", dir.display());
        match service.ingest(&dir, true).await {
            Ok(report) => {
                println!("Document ingestion successful ({} chunks stored)!\n", report.stored);
            }
            Err(error) => {
                println!("Document ingestion failed: {error}");
                return Ok(());
            }
        }
    }

    println!("RAG system is ready! Enter 'exit' at any time to quit.\n");
    print_help();

    let stdin = io::stdin();

    loop {
        print!("\n> ");
        io::stdout().flush()?;

        let Some(line) = stdin.lock().lines().next() else {
            break;
        };
        let input = line?.trim().to_string();

        if input.is_empty() {
            continue;
        }

        let lowered = input.to_lowercase();

        if lowered == "exit" || lowered == "quit" {
            println!("\nExiting. Goodbye!");
            break;
        } else if lowered == "help" {
            print_help();
        } else if lowered == "clear" {
            service.clear_conversation().await;
            println!("\nConversation history cleared.");
        } else if lowered == "history" {
            print_history(&service).await;
        } else if let Some(text) = input.strip_prefix("query ") {
            let text = text.trim();
            if text.is_empty() {
                println!("\nPlease provide a query text.");
                continue;
            }

            println!("\nProcessing query...");
            let response = service.query(text, QueryOptions::new()).await;
            println!("\nResponse:\n{response}");
        } else if let Some(text) = input.strip_prefix("chat ") {
            let text = text.trim();
            if text.is_empty() {
                println!("\nPlease provide a message.");
                continue;
            }

            let response = service.chat(text, QueryOptions::new()).await;
            println!("\nResponse:\n{response}");
        } else if let Some(year) = input.strip_prefix("financial ") {
            let Ok(year) = year.trim().parse::<i32>() else {
                println!("\nPlease provide a valid year (e.g., financial 2022).");
                continue;
            };

            println!("\nGenerating financial summary for {year}...");
            let summary = service.financial_summary(Some(year), 10).await;
            println!("\nFinancial Summary:\n{summary}");
        } else {
            println!("\nUnknown command. Type 'help' to see available commands.");
        }
    }

    Ok(())
}

/// Prints the available commands.
fn print_help() {
    println!("Available commands:");
    println!("  query <text>       - Query the system");
    println!("  chat <text>        - Ask within the running conversation");
    println!("  financial <year>   - Generate financial summary for a specific year");
    println!("  history            - Show the conversation transcript");
    println!("  clear              - Clear the conversation history");
    println!("  help               - Show available commands");
    println!("  exit/quit          - Exit the demo");
}

/// Prints the conversation transcript.
async fn print_history(service: &RagService) {
    let history = service.conversation_history().await;

    if history.is_empty() {
        println!("\nNo conversation yet.");
        return;
    }

    println!();
    for message in history {
        let role = match message.role() {
            MessageRole::User => "User",
            MessageRole::Assistant => "Assistant",
        };
        println!("{role}: {}", message.content());
    }
}
