//! Whoami command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::output;
use crate::session::storage::{self, SessionConfig};

#[derive(Args, Debug)]
pub struct WhoamiArgs {}

pub fn run(_args: WhoamiArgs, session: &SessionConfig) -> Result<()> {
    let client = storage::open_client(session)?;
    let store = storage::open_store(session)?;

    let state = client
        .session_state()
        .context("Failed to read session")?;

    output::field("API", client.config().base_url.as_str());
    output::field("Session", &store.path().display().to_string());
    output::field("State", &state.to_string());

    if let Some(updated_at) = store.updated_at().context("Failed to read session")? {
        output::field("Updated", &updated_at.to_rfc3339());
    }

    Ok(())
}
