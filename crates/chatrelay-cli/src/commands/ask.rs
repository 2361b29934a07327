//! `chatrelay ask` -- blocking completion.
//!
//! # Example
//!
//! ```text
//! chatrelay ask --provider deepseek --model deepseek-reasoner --think "Why is the sky blue?"
//! ```

use clap::Args;

use super::{ChatArgs, build_service};
use crate::config::load_config;

/// Arguments for the `chatrelay ask` subcommand.
#[derive(Args, Debug)]
pub struct AskArgs {
    #[command(flatten)]
    pub chat: ChatArgs,

    /// Also print the reasoning text, if any.
    #[arg(long)]
    pub show_reasoning: bool,
}

/// Run the ask command.
pub async fn run(args: AskArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path).await?;
    let service = build_service(&config)?;
    let request = args.chat.to_request().await?;

    let outcome = service.complete(&request).await;
    service.shutdown().await;
    let result = outcome?;

    if args.show_reasoning
        && let Some(reasoning) = &result.reasoning
    {
        println!("[thinking]");
        println!("{reasoning}");
        println!();
        println!("[answer]");
    }
    println!("{}", result.answer);
    Ok(())
}
