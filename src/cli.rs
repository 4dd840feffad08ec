use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::agent::Agent;

const SEPARATOR_WIDTH: usize = 50;

/// Ask questions about the ONS daily operation bulletins (IPDO).
#[derive(Debug, Parser)]
#[command(name = "ipdo-agent", version, about)]
pub struct Cli {
    /// Config file to use instead of ~/.ipdo-agent/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive question loop (default)
    Chat,
    /// Answer a single question and exit
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// List the report dates in the database
    Dates,
    /// Load structured report JSON files into the database
    Import {
        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,
    },
}

fn is_exit(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "sair" | "exit" | "quit")
}

pub async fn run_chat_loop(agent: &Agent) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("Pergunte sobre a operação do SIN. Digite 'sair' para encerrar.");
    loop {
        stdout.write_all(b"\nPergunta: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_exit(input) {
            break;
        }

        let answer = agent.answer(input).await;
        println!("\nResposta:\n{answer}");
        println!("{}", "-".repeat(SEPARATOR_WIDTH));
    }
    println!("Até logo!");
    Ok(())
}
