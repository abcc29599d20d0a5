//! Logout command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::output;
use crate::session::storage::{self, SessionConfig};

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub fn run(_args: LogoutArgs, session: &SessionConfig) -> Result<()> {
    let client = storage::open_client(session)?;
    client.logout().context("Failed to clear session")?;

    output::success("Logged out");
    Ok(())
}
