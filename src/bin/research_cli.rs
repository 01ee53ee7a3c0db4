//! Product Research - interactive command-line entry point.

use clap::Parser;
use product_research::cli::{self, Args};
use product_research::config::Config;
use product_research::research::ResearchService;
use tokio::io::{AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = Args::parse().mode();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let service = ResearchService::new(config);
    let stdin = BufReader::new(tokio::io::stdin());

    tokio::select! {
        result = cli::run_repl(&service, mode, stdin, tokio::io::stdout()) => result?,
        _ = tokio::signal::ctrl_c() => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(b"\n\nGoodbye!\n").await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}
