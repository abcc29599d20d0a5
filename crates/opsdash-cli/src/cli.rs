//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::{api, login, logout, refresh, whoami};

/// Command-line client for the opsdash dashboard API.
#[derive(Parser, Debug)]
#[command(name = "opsdash")]
#[command(author, version = env!("OPSDASH_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Dashboard API base URL
    #[arg(
        long,
        env = "OPSDASH_URL",
        default_value = "http://localhost:8080",
        global = true
    )]
    pub url: String,

    /// Where the session tokens are kept (defaults to the user data directory)
    #[arg(long, env = "OPSDASH_SESSION_FILE", global = true)]
    pub session_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the session tokens
    Login(login::LoginArgs),

    /// Forget the stored session tokens
    Logout(logout::LogoutArgs),

    /// Display the API URL and session state
    ///
    /// The state is read from the session file. A command that saw the
    /// session expire has already removed that file, so after an expiry this
    /// reports "anonymous" rather than "expired".
    Whoami(whoami::WhoamiArgs),

    /// Exchange the refresh token for a new access token
    Refresh(refresh::RefreshArgs),

    /// Call an API endpoint and print the JSON result
    Api(api::ApiArgs),
}
