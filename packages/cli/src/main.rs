mod builtins;
mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{apply, init, plugins, ApplyArgs, InitArgs, PluginsArgs};

/// Quire - plugin-hosted XML document editor
#[derive(Parser, Debug)]
#[command(name = "quire")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a quire.config.json with the built-in plugins
    Init(InitArgs),

    /// Load the configured plugins and report their status
    Plugins(PluginsArgs),

    /// Replay an edit script against a document
    Apply(ApplyArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match std::env::current_dir() {
        Ok(cwd) => match cli.command {
            Command::Init(args) => init(args, &cwd),
            Command::Plugins(args) => plugins(args, &cwd).await,
            Command::Apply(args) => apply(args, &cwd).await,
        },
        Err(err) => Err(anyhow::anyhow!("Cannot get current directory: {}", err)),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
