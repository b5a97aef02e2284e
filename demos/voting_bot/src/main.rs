//! Voting Bot Example
//!
//! A console connector for Ballot. Each stdin line is a slash command; replies
//! are "posted" to the channel by printing them to stdout.
//!
//! A line may start with `@name` to act as another user:
//!
//! ```text
//! /poll-create "Favorite color?" Red Green Blue
//! @bob /poll-vote 3f2c... Red
//! /poll-results 3f2c...
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package voting-bot -- --config demos/voting_bot/ballot.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ballot::prelude::*;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(version, about = "Run polls from the terminal")]
struct Args {
    /// Configuration file (defaults to ./ballot.toml if present).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile.
    #[arg(short, long)]
    profile: Option<String>,

    /// User id for lines without an `@user` prefix.
    #[arg(short, long, default_value = "local")]
    user: String,

    /// Channel the replies are posted to.
    #[arg(long, default_value = "console")]
    channel: String,
}

// ============================================================================
// Console Notifier
// ============================================================================

struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn post(&self, channel_id: &str, text: &str) -> NotifyResult<()> {
        println!("[#{channel_id}]\n{text}\n");
        Ok(())
    }
}

fn print_help() {
    println!("Commands:");
    for spec in COMMANDS.iter() {
        println!("  /{:<13} {}", spec.trigger, spec.hint);
    }
    println!("Prefix a line with @name to act as another user.\n");
}

/// Splits an optional `@user` prefix off a line.
fn split_user<'a>(line: &'a str, default_user: &'a str) -> (&'a str, &'a str) {
    match line.strip_prefix('@').and_then(|rest| rest.split_once(char::is_whitespace)) {
        Some((user, rest)) if !user.is_empty() => (user, rest.trim_start()),
        _ => (default_user, line),
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = BallotRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }
    let runtime = builder.build().context("failed to load configuration")?;

    runtime.start().await.context("failed to start runtime")?;
    runtime.attach_notifier(Arc::new(StdoutNotifier))?;

    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        error!(error = %e, "Failed to read stdin");
                        break;
                    }
                };

                let (user, text) = split_user(line.trim(), &args.user);
                if text == "/help" {
                    print_help();
                    continue;
                }
                if !text.starts_with('/') {
                    if !text.is_empty() {
                        warn!(line = %text, "Not a slash command, ignoring");
                    }
                    continue;
                }

                if let Some(cmd) = Command::parse_line(text, user, args.channel.as_str()) {
                    runtime.handle_and_post(&cmd).await?;
                }
            }
        }
    }

    runtime.shutdown().await?;
    Ok(())
}
