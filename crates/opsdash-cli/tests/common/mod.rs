use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{Value, json};
use tempfile::TempDir;

/// An isolated session file for one test.
pub struct Sandbox {
    _dir: TempDir,
    pub session_file: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let session_file = dir.path().join("opsdash").join("session.json");
        Self {
            _dir: dir,
            session_file,
        }
    }

    /// Start from a logged-in session holding the given tokens.
    pub fn with_tokens(access: &str, refresh: &str) -> Self {
        let sandbox = Self::new();
        fs::create_dir_all(sandbox.session_file.parent().unwrap()).unwrap();
        fs::write(
            &sandbox.session_file,
            json!({ "accessToken": access, "refreshToken": refresh }).to_string(),
        )
        .unwrap();
        sandbox
    }

    pub fn session(&self) -> Option<Value> {
        read_session(&self.session_file)
    }
}

pub fn read_session(path: &Path) -> Option<Value> {
    let content = fs::read_to_string(path).ok()?;
    Some(serde_json::from_str(&content).unwrap())
}

/// Run the CLI against `url`, keeping the session in the sandbox.
///
/// The binary blocks, so it runs off the runtime that drives the mock server.
pub async fn run_cli(args: &[&str], sandbox: &Sandbox, url: &str) -> Output {
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    let session_file = sandbox.session_file.clone();
    let url = url.to_string();

    tokio::task::spawn_blocking(move || {
        Command::new(env!("CARGO_BIN_EXE_opsdash"))
            .args(&args)
            .env("OPSDASH_URL", url)
            .env("OPSDASH_SESSION_FILE", session_file)
            .env("NO_COLOR", "1")
            .env_remove("OPSDASH_PASSWORD")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute CLI")
    })
    .await
    .unwrap()
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
