//! Basic-auth credential storage.
//!
//! Credentials are a single username/password pair kept in a small TOML file,
//! written by `streambox basic-auth` and read at server start when auth is
//! enabled.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const DEFAULT_CREDENTIALS_PATH: &str = "~/.config/streambox/credentials.toml";

/// A username/password pair. Both fields are non-empty once loaded.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Build a credential pair, rejecting empty fields.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let creds = Self {
            username: username.into(),
            password: password.into(),
        };
        creds.check()?;
        Ok(creds)
    }

    fn check(&self) -> Result<()> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(Error::InvalidInput(
                "username and password must both be non-empty".into(),
            ));
        }
        Ok(())
    }

    /// Check a presented username and password.
    pub fn matches(&self, username: &str, password: &str) -> bool {
        let user_ok = self.username.as_bytes() == username.as_bytes();
        let pass_ok = self.password.as_bytes() == password.as_bytes();
        user_ok & pass_ok
    }
}

/// Resolve the credentials file location, expanding `~`.
pub fn default_path() -> PathBuf {
    PathBuf::from(shellexpand::tilde(DEFAULT_CREDENTIALS_PATH).as_ref())
}

/// Read credentials from `path`.
///
/// A missing file is [`Error::NotFound`]; unparsable content or empty fields
/// are [`Error::Config`].
pub fn load(path: &Path) -> Result<Credentials> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::from_io("credentials", path.display(), e))?;

    let creds: Credentials = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("invalid credentials file {}: {e}", path.display())))?;

    creds
        .check()
        .map_err(|_| Error::Config(format!("empty username or password in {}", path.display())))?;

    Ok(creds)
}

/// Write credentials to `path`, creating parent directories. On Unix the file
/// is restricted to its owner.
pub fn save(path: &Path, creds: &Credentials) -> Result<()> {
    creds.check()?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string(creds)
        .map_err(|e| Error::Internal(format!("failed to serialize credentials: {e}")))?;
    std::fs::write(path, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::debug!("Wrote credentials to {}", path.display());
    Ok(())
}
