#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod repl;

use std::process;

use anyhow::Context;
use clap::Parser;
use tally_rag::{QueryOptions, RagService};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{Cli, Command};

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "tally_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "tally_cli::shutdown";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    #[cfg(feature = "dotenv")]
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_tracing();
    log_startup_info();

    let config = cli.service.to_rag_config()?;
    let service = RagService::connect(config)
        .await
        .context("failed to initialize the RAG service")?;

    match cli.command {
        Command::Ingest { dir, no_metadata } => {
            match service.ingest(&dir, !no_metadata).await {
                Ok(report) => {
                    println!("Ingestion successful ({} chunks stored)", report.stored);
                }
                Err(error) => {
                    println!("Ingestion failed");
                    return Err(error).context("document ingestion");
                }
            }
        }

        Command::Query {
            text,
            k,
            year,
            financial,
        } => {
            let mut options = QueryOptions::new().with_k(k);
            if let Some(year) = year {
                options = options.with_year(year);
            }
            if financial {
                options = options.financial_only();
            }

            let response = service.query(&text, options).await;
            println!("\nResponse:\n{response}");
        }

        Command::Summary { year, k } => {
            let summary = service.financial_summary(year, k).await;
            println!("\nFinancial Summary:\n{summary}");
        }

        Command::Repl {
            data_dir,
            skip_ingestion,
        } => {
            repl::run(service, data_dir, skip_ingestion).await?;
        }
    }

    Ok(())
}

/// Initializes tracing with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Logs startup information.
fn log_startup_info() {
    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        "starting tally"
    );

    tracing::debug!(
        target: TRACING_TARGET_STARTUP,
        pid = process::id(),
        arch = std::env::consts::ARCH,
        os = std::env::consts::OS,
        features = ?enabled_features(),
        "build information"
    );
}

/// Returns a list of enabled compile-time features.
fn enabled_features() -> Vec<&'static str> {
    [cfg!(feature = "dotenv").then_some("dotenv")]
        .into_iter()
        .flatten()
        .collect()
}
