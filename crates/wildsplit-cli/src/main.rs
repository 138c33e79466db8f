use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod input;
mod retry;
mod settings;
mod shutdown;
mod timer;

use commands::tracking::TrackOptions;

#[derive(Parser)]
#[command(name = "wildsplit")]
#[command(about = "Autosplitter for The Wild at Heart", version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Attach to the game and split automatically
    Track {
        /// Split settings (TOML)
        #[arg(short, long, default_value = "splits.toml", env = "WILDSPLIT_SPLITS")]
        splits: PathBuf,

        /// Class metadata snapshot of the game build (JSON)
        #[arg(short, long, default_value = "metadata.json", env = "WILDSPLIT_METADATA")]
        metadata: PathBuf,

        /// Layout table overriding the built-in one (JSON)
        #[arg(short, long, env = "WILDSPLIT_LAYOUT")]
        layout: Option<PathBuf>,

        /// Game process name
        #[arg(long, default_value = "The Wild At Heart")]
        process: String,
    },
    /// Write the built-in layout table to a file
    Layout {
        #[arg(short, long, default_value = "layout.json")]
        output: PathBuf,
    },
    /// Validate split settings and print the split list
    Check {
        #[arg(short, long, default_value = "splits.toml")]
        splits: PathBuf,

        #[arg(short, long)]
        layout: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("wildsplit_core=info".parse()?)
                .add_directive("wildsplit=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Track {
            splits,
            metadata,
            layout,
            process,
        } => commands::tracking::run(&TrackOptions {
            splits,
            metadata,
            layout,
            process,
        }),
        Command::Layout { output } => commands::layout::run(&output),
        Command::Check { splits, layout } => commands::check::run(&splits, layout.as_deref()),
    }
}
