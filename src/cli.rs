//! Interactive command-line front end.

use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::research::{ResearchRequest, Researcher};

/// Inputs that end the session, compared case-insensitively.
pub const EXIT_KEYWORDS: [&str; 3] = ["quit", "exit", "q"];

const RULE_WIDE: &str = "==================================================";
const RULE: &str = "----------------------------------------";

/// What a line of input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Exit,
    Empty,
    Product(String),
}

pub fn classify_input(line: &str) -> ReplInput {
    let trimmed = line.trim();
    if EXIT_KEYWORDS
        .iter()
        .any(|k| trimmed.eq_ignore_ascii_case(k))
    {
        ReplInput::Exit
    } else if trimmed.is_empty() {
        ReplInput::Empty
    } else {
        ReplInput::Product(trimmed.to_string())
    }
}

/// Which task the session runs for each product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplMode {
    #[default]
    Profit,
    Describe,
}

/// Interactive product research. Enter one product name per line;
/// type 'quit', 'exit' or 'q' to stop.
#[derive(Debug, Parser)]
#[command(name = "product-research-cli", version)]
pub struct Args {
    /// Generate product descriptions instead of profit analyses
    #[arg(short, long)]
    pub describe: bool,
}

impl Args {
    pub fn mode(&self) -> ReplMode {
        if self.describe {
            ReplMode::Describe
        } else {
            ReplMode::Profit
        }
    }
}

/// Run the read-eval-print loop until an exit keyword or end of input.
///
/// Failures of a single product are printed and the loop carries on.
pub async fn run_repl<R, W>(
    researcher: &dyn Researcher,
    mode: ReplMode,
    mut input: R,
    mut output: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let title = match mode {
        ReplMode::Profit => "PRODUCT PROFIT CALCULATOR",
        ReplMode::Describe => "PRODUCT DESCRIPTION GENERATOR",
    };
    write_out(&mut output, "Connecting to MCP servers...\n").await?;
    match researcher.tool_names().await {
        Ok(names) => {
            write_out(&mut output, &format!("Ready! Tools: {}\n", names.join(", "))).await?;
        }
        Err(e) => {
            tracing::warn!("Tool servers unavailable: {:#}", e);
            write_out(&mut output, &format!("Warning: {:#}\n", e)).await?;
        }
    }

    write_out(
        &mut output,
        &format!(
            "\n{RULE_WIDE}\n{title}\n{RULE_WIDE}\nEnter product names to research.\nType 'quit' or 'exit' to stop.\n\n"
        ),
    )
    .await?;

    loop {
        write_out(&mut output, "Enter product name: ").await?;
        let Some(line) = read_line(&mut input).await? else {
            write_out(&mut output, "\nGoodbye!\n").await?;
            return Ok(());
        };

        let product = match classify_input(&line) {
            ReplInput::Exit => {
                write_out(&mut output, "\nGoodbye!\n").await?;
                return Ok(());
            }
            ReplInput::Empty => {
                write_out(&mut output, "Please enter a product name\n\n").await?;
                continue;
            }
            ReplInput::Product(product) => product,
        };

        let request = match mode {
            ReplMode::Profit => ResearchRequest::quick_profit(&product),
            ReplMode::Describe => {
                write_out(&mut output, "Product URL (optional): ").await?;
                let url = read_line(&mut input).await?.unwrap_or_default();
                ResearchRequest::descriptions(&product, Some(url.as_str()))
            }
        };

        write_out(&mut output, &format!("\nResearching: {}\n{}\n", product, RULE)).await?;

        match researcher.research(&request).await {
            Ok(outcome) => {
                write_out(
                    &mut output,
                    &format!("\nRESULT:\n{}\n{}\n\n", &RULE_WIDE[..40], outcome.text),
                )
                .await?;
            }
            Err(e) => {
                tracing::error!("Research for '{}' failed: {:#}", product, e);
                write_out(&mut output, &format!("Error: {:#}\n\n", e)).await?;
            }
        }
    }
}

async fn read_line<R: AsyncBufRead + Unpin>(input: &mut R) -> std::io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

async fn write_out<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.flush().await
}
