//! Filesystem storage for session tokens.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use opsdash_core::error::{Error, StoreError};
use opsdash_core::{AccessToken, RefreshToken, Result, TokenStore};

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

fn map_io(err: std::io::Error) -> Error {
    Error::Store(StoreError::from(err))
}

/// Write `data` to a fresh file that only the owner can read (Unix).
///
/// The mode is set at creation, so the tokens are never briefly readable
/// under the process umask.
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path)?;
    // A leftover temp file keeps its old mode; narrow it as well.
    #[cfg(unix)]
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(data)?;
    file.sync_all()
}

/// The token document as written to disk.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    /// RFC 3339 time of the last write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

/// Token store persisted as one JSON document.
///
/// Writers serialize on an exclusive lock over a sibling `.lock` file, and
/// replace the document by renaming a fully written temporary file, so
/// readers never observe a partial write. On Unix the document is readable
/// by its owner only.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store backed by the document at `path`.
    ///
    /// Nothing is touched on disk until the first write.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the tokens were last written, if ever.
    pub fn updated_at(&self) -> Result<Option<DateTime<Utc>>> {
        let stored = self.read()?;
        let Some(updated_at) = stored.updated_at else {
            return Ok(None);
        };

        let parsed = DateTime::parse_from_rfc3339(&updated_at).map_err(|e| StoreError::Corrupt {
            message: format!("invalid updatedAt '{}': {}", updated_at, e),
        })?;
        Ok(Some(parsed.with_timezone(&Utc)))
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("tokens"));
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn lock(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(map_io)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.sibling(".lock"))
            .map_err(map_io)?;

        lock_file.lock_exclusive().map_err(map_io)?;
        Ok(lock_file)
    }

    fn read(&self) -> Result<StoredTokens> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoredTokens::default()),
            Err(e) => return Err(map_io(e)),
        };

        serde_json::from_str(&content).map_err(|e| {
            Error::Store(StoreError::Corrupt {
                message: e.to_string(),
            })
        })
    }

    fn write(&self, stored: &StoredTokens) -> Result<()> {
        let json = serde_json::to_string_pretty(stored).map_err(|e| {
            Error::Store(StoreError::Corrupt {
                message: e.to_string(),
            })
        })?;

        let tmp = self.sibling(".tmp");
        if let Err(e) = write_private(&tmp, json.as_bytes()) {
            let _ = fs::remove_file(&tmp);
            return Err(map_io(e));
        }

        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            map_io(e)
        })
    }

    fn update(&self, apply: impl FnOnce(&mut StoredTokens)) -> Result<()> {
        let lock_file = self.lock()?;

        let mut stored = self.read()?;
        apply(&mut stored);
        stored.updated_at = Some(Utc::now().to_rfc3339());
        self.write(&stored)?;

        lock_file.unlock().map_err(map_io)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> Result<Option<AccessToken>> {
        Ok(self.read()?.access_token.map(AccessToken::new))
    }

    fn refresh_token(&self) -> Result<Option<RefreshToken>> {
        Ok(self.read()?.refresh_token.map(RefreshToken::new))
    }

    #[instrument(skip(self, token), fields(path = %self.path.display()))]
    fn set_access_token(&self, token: AccessToken) -> Result<()> {
        self.update(|stored| stored.access_token = Some(token.as_str().to_string()))?;
        debug!("Stored access token");
        Ok(())
    }

    #[instrument(skip(self, token), fields(path = %self.path.display()))]
    fn set_refresh_token(&self, token: RefreshToken) -> Result<()> {
        self.update(|stored| stored.refresh_token = Some(token.as_str().to_string()))?;
        debug!("Stored refresh token");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn clear(&self) -> Result<()> {
        let lock_file = self.lock()?;

        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed token document"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(map_io(e)),
        }

        lock_file.unlock().map_err(map_io)?;
        Ok(())
    }
}
