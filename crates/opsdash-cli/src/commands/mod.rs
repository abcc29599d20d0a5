//! Subcommand implementations.

pub mod api;
pub mod login;
pub mod logout;
pub mod refresh;
pub mod whoami;

use anyhow::Result;

use crate::cli::Commands;
use crate::session::storage::SessionConfig;

pub async fn handle(command: Commands, session: &SessionConfig) -> Result<()> {
    match command {
        Commands::Login(args) => login::run(args, session).await,
        Commands::Logout(args) => logout::run(args, session),
        Commands::Whoami(args) => whoami::run(args, session),
        Commands::Refresh(args) => refresh::run(args, session).await,
        Commands::Api(args) => api::run(args, session).await,
    }
}
