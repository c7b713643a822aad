mod cmd_diff;
mod cmd_init;
mod cmd_put;
mod report;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hark", version, about = "Speech decoder mismatch cache and novelty diff")]
struct Cli {
    /// Path to the grouped cache XML file
    #[arg(long, global = true, default_value = "decRecogCache.xml")]
    cache: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an empty cache file
    Init,
    /// Merge decoder results into the cache
    Put {
        /// Decoder results: line-based dump, or flat XML if the path ends in .xml
        file: PathBuf,
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report decoder mismatches not yet present in the cache
    Diff {
        /// Decoder results: line-based dump, or flat XML if the path ends in .xml
        file: PathBuf,
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Init => cmd_init::execute(&cli.cache),
        Command::Put { file, json } => cmd_put::execute(&cli.cache, &file, json),
        Command::Diff { file, json } => cmd_diff::execute(&cli.cache, &file, json),
    }
}
