//! `chatrelay stream` -- streaming completion.
//!
//! Reasoning fragments go to stderr, answer fragments to stdout, each as
//! soon as it arrives. Ctrl-C closes the downstream side, which stops the
//! relay from reading any further upstream data.

use std::io::Write;

use clap::Args;
use tokio::sync::mpsc;

use chatrelay_llm::RelayOutcome;
use chatrelay_types::{Channel, RelayEvent};

use super::{ChatArgs, build_service};
use crate::config::load_config;

/// Events buffered between the relay and the terminal.
const EVENT_BUFFER: usize = 64;

/// Arguments for the `chatrelay stream` subcommand.
#[derive(Args, Debug)]
pub struct StreamArgs {
    #[command(flatten)]
    pub chat: ChatArgs,
}

/// Run the stream command.
pub async fn run(args: StreamArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path).await?;
    let service = build_service(&config)?;
    let request = args.chat.to_request().await?;

    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
    let handle = match service.stream(&request, tx).await {
        Ok(handle) => handle,
        Err(e) => {
            service.shutdown().await;
            return Err(e.into());
        }
    };

    let mut failure = None;
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(RelayEvent::Delta(delta)) => print_fragment(delta.channel, &delta.text)?,
                Some(RelayEvent::Completed) | None => break,
                Some(RelayEvent::Failed { message }) => {
                    failure = Some(message);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }
    drop(rx);
    println!();

    let outcome = handle.await?;
    service.shutdown().await;

    if let Some(message) = failure {
        anyhow::bail!(message);
    }
    if let RelayOutcome::Disconnected { partial } = &outcome {
        tracing::debug!(answer_len = partial.answer.len(), "stream abandoned");
    }
    Ok(())
}

fn print_fragment(channel: Channel, text: &str) -> anyhow::Result<()> {
    match channel {
        Channel::Reasoning => {
            let mut err = std::io::stderr().lock();
            err.write_all(text.as_bytes())?;
            err.flush()?;
        }
        Channel::Answer => {
            let mut out = std::io::stdout().lock();
            out.write_all(text.as_bytes())?;
            out.flush()?;
        }
    }
    Ok(())
}
