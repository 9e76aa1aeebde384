//! Token persistence between invocations.
//!
//! A `TokenStore` is either file-backed (one owner-only JSON file per host)
//! or env-backed (variables exported by the shell, read-only). The backend is
//! picked once at startup by `TokenStore::from_config`.

pub mod env;
pub mod file;

pub use env::{export_lines, EnvStore, DEFAULT_ENV_PREFIX};
pub use file::{FileStore, StoredSession};

use tracing::debug;

use crate::auth::{Target, Token};
use crate::config::{Config, StoreBackend};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub enum TokenStore {
    File(FileStore),
    Env(EnvStore),
}

impl TokenStore {
    /// Choose the backend named by the config. `Auto` prefers an exported
    /// token when one is present in the environment.
    pub fn from_config(config: &Config) -> Result<Self> {
        let prefix = config.env_prefix();
        match config.store_backend {
            StoreBackend::File => Ok(TokenStore::File(FileStore::new(config.session_dir()))),
            StoreBackend::Env => Ok(TokenStore::Env(EnvStore::from_process(&prefix)?)),
            StoreBackend::Auto => {
                let env = EnvStore::from_process(&prefix)?;
                if env.has_token() {
                    debug!(prefix = %prefix, "Using token from environment");
                    Ok(TokenStore::Env(env))
                } else {
                    Ok(TokenStore::File(FileStore::new(config.session_dir())))
                }
            }
        }
    }

    pub fn save(&self, target: &Target, token: &Token) -> Result<()> {
        match self {
            TokenStore::File(store) => store.save(target, token),
            TokenStore::Env(_) => Err(Error::ReadOnlyStore),
        }
    }

    /// `Error::NotFound` when nothing live is stored for `target`.
    pub fn load(&self, target: &Target) -> Result<Token> {
        match self {
            TokenStore::File(store) => store.load(target),
            TokenStore::Env(store) => store.load(target),
        }
    }

    pub fn clear(&self, target: &Target) -> Result<()> {
        match self {
            TokenStore::File(store) => store.clear(target),
            TokenStore::Env(_) => {
                debug!(host = %target, "Token comes from the environment; nothing to clear");
                Ok(())
            }
        }
    }

    /// Target described by the store itself (env-backed only)
    pub fn default_target(&self) -> Result<Option<Target>> {
        match self {
            TokenStore::File(_) => Ok(None),
            TokenStore::Env(store) => store.target(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            TokenStore::File(_) => "file",
            TokenStore::Env(_) => "env",
        }
    }
}
