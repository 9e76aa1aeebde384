use keyring::Entry;

use super::Target;
use crate::error::{Error, Result};

const SERVICE_NAME: &str = "webapi";

/// Passwords remembered in the OS keychain so an expired session can be
/// renewed without prompting. Entries are scoped per user and host.
pub struct SecretStore;

impl SecretStore {
    fn entry(target: &Target, username: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &account(target, username))
            .map_err(|e| Error::Keychain(format!("Failed to create keyring entry: {}", e)))
    }

    /// Store a password in the OS keychain
    pub fn store(target: &Target, username: &str, password: &str) -> Result<()> {
        Self::entry(target, username)?
            .set_password(password)
            .map_err(|e| Error::Keychain(format!("Failed to store password in keychain: {}", e)))
    }

    /// Retrieve the password for a user and host from the OS keychain
    pub fn get_password(target: &Target, username: &str) -> Result<String> {
        Self::entry(target, username)?
            .get_password()
            .map_err(|e| Error::Keychain(format!("Failed to retrieve password from keychain: {}", e)))
    }

    pub fn delete(target: &Target, username: &str) -> Result<()> {
        match Self::entry(target, username)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::Keychain(format!(
                "Failed to delete credential from keychain: {}",
                e
            ))),
        }
    }

    pub fn has_credentials(target: &Target, username: &str) -> bool {
        Self::entry(target, username)
            .map(|entry| entry.get_password().is_ok())
            .unwrap_or(false)
    }
}

fn account(target: &Target, username: &str) -> String {
    format!("{}@{}", username, target.key())
}
