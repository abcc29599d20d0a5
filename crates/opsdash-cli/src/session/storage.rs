//! Session storage for persisting login state between commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use opsdash_core::ApiUrl;
use opsdash_file::FileTokenStore;
use opsdash_http::{ApiClient, ClientConfig};

/// Where and against what the CLI keeps its session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub url: String,
    pub session_file: Option<PathBuf>,
}

/// Default session file path in the user data directory.
fn default_session_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "opsdash").context("Could not determine data directory")?;
    Ok(dirs.data_dir().join("session.json"))
}

/// Resolve the session file, preferring an explicit path.
pub fn session_path(config: &SessionConfig) -> Result<PathBuf> {
    match &config.session_file {
        Some(path) => Ok(path.clone()),
        None => default_session_path(),
    }
}

/// Open the token store backing the session.
pub fn open_store(config: &SessionConfig) -> Result<FileTokenStore> {
    Ok(FileTokenStore::new(session_path(config)?))
}

/// Build a client whose tokens live in the session file.
pub fn open_client(config: &SessionConfig) -> Result<ApiClient> {
    let api = ApiUrl::new(&config.url).context("Invalid API URL")?;
    let store = open_store(config)?;

    let client_config = ClientConfig::new(api)
        .with_user_agent(concat!("opsdash-cli/", env!("OPSDASH_VERSION")));

    ApiClient::new(client_config, Arc::new(store)).context("Failed to build API client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_session_file_wins() {
        let config = SessionConfig {
            url: "http://localhost:8080".into(),
            session_file: Some(PathBuf::from("/tmp/opsdash-test/session.json")),
        };
        assert_eq!(
            session_path(&config).unwrap(),
            PathBuf::from("/tmp/opsdash-test/session.json")
        );
    }

    #[test]
    fn invalid_url_is_rejected() {
        let config = SessionConfig {
            url: "ftp://ops.example.com".into(),
            session_file: Some(PathBuf::from("/tmp/opsdash-test/session.json")),
        };
        assert!(open_client(&config).is_err());
    }
}
