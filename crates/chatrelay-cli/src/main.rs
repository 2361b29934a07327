//! `chatrelay` -- CLI binary for the chatrelay completion gateway.
//!
//! Provides the following subcommands:
//!
//! - `chatrelay ask` -- Send one prompt and print the full answer.
//! - `chatrelay stream` -- Send one prompt and print the answer as it streams.
//! - `chatrelay providers` -- Show the provider table and model features.

use clap::{Parser, Subcommand};

mod commands;
mod config;

/// chatrelay completion gateway CLI.
#[derive(Parser)]
#[command(name = "chatrelay", about = "chatrelay completion gateway CLI", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Send one prompt and print the full answer.
    Ask(commands::ask::AskArgs),

    /// Send one prompt and print the answer as it streams.
    Stream(commands::stream::StreamArgs),

    /// Show the provider table and model features.
    Providers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Ask(args) => commands::ask::run(args, config).await?,
        Commands::Stream(args) => commands::stream::run(args, config).await?,
        Commands::Providers => commands::providers::run(config).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_stream_flags() {
        let cli = Cli::parse_from([
            "chatrelay",
            "-v",
            "--config",
            "/tmp/c.json",
            "stream",
            "--provider",
            "aliyun",
            "--model",
            "qwen-plus",
            "--think",
            "--conversation",
            "c-1",
            "hello there",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config.as_deref(), Some("/tmp/c.json"));
        match cli.command {
            Commands::Stream(args) => {
                assert_eq!(args.chat.provider, "aliyun");
                assert_eq!(args.chat.model.as_deref(), Some("qwen-plus"));
                assert!(args.chat.think);
                assert_eq!(args.chat.prompt, "hello there");
            }
            _ => panic!("expected stream"),
        }
    }

    #[test]
    fn parses_ask_with_show_reasoning() {
        let cli = Cli::parse_from(["chatrelay", "ask", "--show-reasoning", "q"]);
        match cli.command {
            Commands::Ask(args) => {
                assert!(args.show_reasoning);
                assert_eq!(args.chat.provider, "");
            }
            _ => panic!("expected ask"),
        }
    }
}
