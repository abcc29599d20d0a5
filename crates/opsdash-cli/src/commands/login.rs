//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use opsdash_core::Credentials;

use crate::output;
use crate::session::storage::{self, SessionConfig};

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Dashboard username
    #[arg(long)]
    pub username: String,

    /// Dashboard password
    #[arg(long, env = "OPSDASH_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn run(args: LoginArgs, session: &SessionConfig) -> Result<()> {
    let client = storage::open_client(session)?;
    let credentials = Credentials::new(&args.username, &args.password);

    eprintln!("{}", "Logging in...".dimmed());

    client
        .login(&credentials)
        .await
        .context("Failed to login")?;

    output::success("Logged in successfully");
    println!();
    output::field("User", credentials.username());
    output::field("API", client.config().base_url.as_str());

    Ok(())
}
