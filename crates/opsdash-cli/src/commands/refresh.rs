//! Refresh command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::output;
use crate::session::{self, storage};

#[derive(Args, Debug)]
pub struct RefreshArgs {}

pub async fn run(_args: RefreshArgs, config: &storage::SessionConfig) -> Result<()> {
    let client = storage::open_client(config)?;
    let mut events = client.subscribe();

    eprintln!("{}", "Refreshing session...".dimmed());

    let result = client.refresh().await;
    session::report_expiry(&mut events);
    result.context("Failed to refresh session")?;

    output::success("Session refreshed successfully");
    Ok(())
}
