//! Local persistence for the active passphrase.
//!
//! The passphrase is not secret from the local device, only from the remote
//! record store and its operator. Persisting it lets a restarted agent resume
//! the session without asking the user again.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;

/// Fixed key under which the active passphrase is persisted.
pub const PASSPHRASE_KEY: &str = "encryption-passphrase";

/// Pluggable key/value persistence for session secrets.
#[async_trait]
pub trait PassphraseStore: Send + Sync {
    /// Load the value stored under `key`, if any.
    async fn load(&self, key: &str) -> io::Result<Option<String>>;

    /// Store (or replace) the value under `key`.
    async fn save(&self, key: &str, value: &str) -> io::Result<()>;

    /// Remove the value under `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> io::Result<()>;
}

/// One file per key inside a state directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

#[async_trait]
impl PassphraseStore for FileStore {
    async fn load(&self, key: &str) -> io::Result<Option<String>> {
        match tokio::fs::read_to_string(self.path(key)).await {
            Ok(s) if s.is_empty() => Ok(None),
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn save(&self, key: &str, value: &str) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path(key);
        tokio::fs::write(&path, value.as_bytes()).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).await?;
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        match tokio::fs::remove_file(self.path(key)).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
