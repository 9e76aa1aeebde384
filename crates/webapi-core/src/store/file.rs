use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{Target, Token};
use crate::error::{Error, Result};

/// On-disk form of a session, one file per host key.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub host: String,
    pub port: u16,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn new(target: &Target, token: &Token) -> Self {
        Self {
            host: target.host.clone(),
            port: target.port,
            access_token: token.value().to_string(),
            expires_at: token.expires_at(),
            created_at: Utc::now(),
        }
    }

    pub fn token(&self) -> Token {
        let token = Token::new(self.access_token.clone());
        match self.expires_at {
            Some(exp) => token.with_expiry(exp),
            None => token,
        }
    }
}

impl fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredSession")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("access_token", &"****")
            .field("expires_at", &self.expires_at)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Keeps each session in `<dir>/<host key>.json`, readable by the owner only.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `target`. Bytes outside `[A-Za-z0-9.-]` are
    /// written as `%XX`, so distinct host keys never share a file.
    pub fn session_path(&self, target: &Target) -> PathBuf {
        let mut name = String::new();
        for byte in target.key().bytes() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'-') {
                name.push(byte as char);
            } else {
                name.push_str(&format!("%{:02X}", byte));
            }
        }
        self.dir.join(format!("{}.json", name))
    }

    pub fn save(&self, target: &Target, token: &Token) -> Result<()> {
        create_private_dir(&self.dir)?;

        let record = StoredSession::new(target, token);
        let contents = serde_json::to_string_pretty(&record)?;

        // Write next to the destination, then rename over it so a concurrent
        // reader never sees a half-written record.
        let path = self.session_path(target);
        let tmp = path.with_extension(format!("json.{}.tmp", std::process::id()));
        {
            let mut file = open_private(&tmp)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!(host = %target, path = %path.display(), "Saved session");
        Ok(())
    }

    pub fn load(&self, target: &Target) -> Result<Token> {
        let path = self.session_path(target);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound { host: target.key() });
            }
            Err(e) => return Err(e.into()),
        };

        let record: StoredSession = serde_json::from_str(&contents)?;
        if record.host != target.host || record.port != target.port {
            debug!(host = %target, "Stored session belongs to another host");
            return Err(Error::NotFound { host: target.key() });
        }
        let token = record.token();
        if token.is_expired() {
            debug!(host = %target, "Stored session has expired");
            return Err(Error::NotFound { host: target.key() });
        }
        if let Some(remaining) = token.time_until_expiry() {
            debug!(host = %target, expires_in_secs = remaining.num_seconds(), "Loaded session");
        }
        Ok(token)
    }

    pub fn clear(&self, target: &Target) -> Result<()> {
        let path = self.session_path(target);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(host = %target, "Cleared session");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    if !dir.exists() {
        fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}

#[cfg(unix)]
fn open_private(path: &Path) -> Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    Ok(fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?)
}

// Owner-only permissions are not enforced on Windows
#[cfg(not(unix))]
fn open_private(path: &Path) -> Result<fs::File> {
    Ok(fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?)
}
