use tracing::{debug, info, warn};

use super::{Authenticator, Credentials, Target, Token};
use crate::error::Result;
use crate::store::{export_lines, TokenStore};

/// Where a freshly acquired token goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutput {
    /// Persist in the token store, replacing any previous token for the host
    Store,
    /// Render `export` lines for the invoking shell; nothing is persisted
    ShellExport { prefix: String },
}

/// Result of a successful acquisition
#[derive(Debug, Clone)]
pub struct Acquired {
    pub token: Token,
    /// Set for `SessionOutput::ShellExport`
    pub exports: Option<String>,
}

/// Obtains tokens from the configured backend and keeps them in the store.
pub struct SessionManager {
    authenticator: Box<dyn Authenticator>,
    store: TokenStore,
}

impl SessionManager {
    pub fn new(authenticator: Box<dyn Authenticator>, store: TokenStore) -> Self {
        Self {
            authenticator,
            store,
        }
    }

    /// Exchange credentials for a token and save it under the target's key.
    pub async fn acquire(&self, target: &Target, credentials: &Credentials) -> Result<Token> {
        let acquired = self
            .acquire_with(target, credentials, &SessionOutput::Store)
            .await?;
        Ok(acquired.token)
    }

    /// Exchange credentials for a token, then store or render it.
    ///
    /// A rejected exchange returns before anything is written, so the
    /// previous token for the host survives a failed login.
    pub async fn acquire_with(
        &self,
        target: &Target,
        credentials: &Credentials,
        output: &SessionOutput,
    ) -> Result<Acquired> {
        info!(host = %target, user = credentials.identifier(), "Acquiring session");

        let token = match self.authenticator.authenticate(target, credentials).await {
            Ok(token) => token,
            Err(e) => {
                warn!(host = %target, error = %e, "Session acquisition failed");
                return Err(e);
            }
        };
        debug!(host = %target, expires_at = ?token.expires_at(), "Token issued");

        let exports = match output {
            SessionOutput::Store => {
                self.store.save(target, &token)?;
                None
            }
            SessionOutput::ShellExport { prefix } => Some(export_lines(prefix, target, &token)?),
        };

        Ok(Acquired { token, exports })
    }

    /// Stored token for `target`, or `Error::NotFound`
    pub fn load(&self, target: &Target) -> Result<Token> {
        self.store.load(target)
    }

    pub fn clear(&self, target: &Target) -> Result<()> {
        info!(host = %target, "Clearing session");
        self.store.clear(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::FileStore;
    use async_trait::async_trait;

    struct StubAuthenticator;

    #[async_trait]
    impl Authenticator for StubAuthenticator {
        async fn authenticate(&self, _target: &Target, credentials: &Credentials) -> Result<Token> {
            match (credentials.identifier(), credentials.secret()) {
                ("u", "p") => Ok(Token::new("T1")),
                ("u", "p2") => Ok(Token::new("T2")),
                _ => Err(Error::Authentication),
            }
        }
    }

    fn manager(dir: &tempfile::TempDir) -> SessionManager {
        SessionManager::new(
            Box::new(StubAuthenticator),
            TokenStore::File(FileStore::new(dir.path())),
        )
    }

    #[tokio::test]
    async fn test_acquire_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(&dir);
        let target = Target::new("h", 443);

        let token = manager
            .acquire(&target, &Credentials::new("u", "p"))
            .await
            .expect("acquire");
        assert_eq!(token.value(), "T1");
        assert_eq!(manager.load(&target).expect("load"), token);
    }

    #[tokio::test]
    async fn test_new_acquisition_replaces_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(&dir);
        let target = Target::new("h", 443);

        manager.acquire(&target, &Credentials::new("u", "p")).await.expect("acquire");
        manager.acquire(&target, &Credentials::new("u", "p2")).await.expect("acquire");
        assert_eq!(manager.load(&target).expect("load").value(), "T2");
    }

    #[tokio::test]
    async fn test_rejected_credentials_keep_prior_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(&dir);
        let target = Target::new("h", 443);

        manager.acquire(&target, &Credentials::new("u", "p")).await.expect("acquire");
        let err = manager
            .acquire(&target, &Credentials::new("u", "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authentication));
        assert_eq!(manager.load(&target).expect("load").value(), "T1");
    }

    #[tokio::test]
    async fn test_shell_export_does_not_persist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(&dir);
        let target = Target::new("h", 443);

        let acquired = manager
            .acquire_with(
                &target,
                &Credentials::new("u", "p"),
                &SessionOutput::ShellExport {
                    prefix: "WEBAPI_".to_string(),
                },
            )
            .await
            .expect("acquire");

        assert_eq!(
            acquired.exports.as_deref(),
            Some("export WEBAPI_HOST=h\nexport WEBAPI_PORT=443\nexport WEBAPI_ACCESS_TOKEN=T1\n")
        );
        assert!(matches!(manager.load(&target), Err(Error::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_clear() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager(&dir);
        let target = Target::new("h", 443);

        manager.acquire(&target, &Credentials::new("u", "p")).await.expect("acquire");
        manager.clear(&target).expect("clear");
        assert!(matches!(manager.load(&target), Err(Error::NotFound { .. })));
    }
}
