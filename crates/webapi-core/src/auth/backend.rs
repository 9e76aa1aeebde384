//! Extension points for a concrete auth backend.
//!
//! How credentials turn into a token, and how a token is put on a request,
//! differ per target service. Both are traits here; the rest of the crate
//! only ever sees `dyn Authenticator` and `dyn CredentialApplier`.

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Url;
use tracing::warn;

use super::{Credentials, Target, Token};
use crate::error::{Error, Result};

/// Exchanges credentials for a token.
///
/// Implementations return `Error::Authentication` when the backend rejects
/// the credentials and `Error::Network` when it cannot be reached.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, target: &Target, credentials: &Credentials) -> Result<Token>;
}

/// Puts a token on an outgoing request.
pub trait CredentialApplier: Send + Sync {
    fn apply(&self, token: &Token, url: &mut Url, headers: &mut HeaderMap) -> Result<()>;
}

/// Stand-in backend until a real exchange is wired up for the target service.
/// Accepts any credentials and hands back a fixed token.
#[derive(Debug, Default, Clone)]
pub struct PlaceholderAuthenticator;

/// Value issued by `PlaceholderAuthenticator`
pub const PLACEHOLDER_TOKEN: &str = "DUMMY_AUTHORIZATION_TOKEN";

#[async_trait]
impl Authenticator for PlaceholderAuthenticator {
    async fn authenticate(&self, target: &Target, credentials: &Credentials) -> Result<Token> {
        warn!(
            host = %target,
            user = credentials.identifier(),
            "Using placeholder authenticator - replace it with the backend for this service"
        );
        Ok(Token::new(PLACEHOLDER_TOKEN))
    }
}

/// `Authorization: Bearer <token>`
#[derive(Debug, Default, Clone)]
pub struct BearerApplier;

impl CredentialApplier for BearerApplier {
    fn apply(&self, token: &Token, _url: &mut Url, headers: &mut HeaderMap) -> Result<()> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.value()))
            .map_err(|_| Error::InvalidRequest("token is not a valid header value".to_string()))?;
        value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, value);
        Ok(())
    }
}

/// Appends the token as a query parameter, e.g. `?access_token=<token>`
#[derive(Debug, Clone)]
pub struct QueryParamApplier {
    name: String,
}

impl QueryParamApplier {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl CredentialApplier for QueryParamApplier {
    fn apply(&self, token: &Token, url: &mut Url, _headers: &mut HeaderMap) -> Result<()> {
        url.query_pairs_mut().append_pair(&self.name, token.value());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_placeholder_accepts_anything() {
        let token = PlaceholderAuthenticator
            .authenticate(&Target::new("h", 443), &Credentials::new("u", "p"))
            .await
            .expect("placeholder never fails");
        assert_eq!(token.value(), PLACEHOLDER_TOKEN);
        assert!(token.expires_at().is_none());
    }

    #[test]
    fn test_bearer_applier() {
        let mut url = Url::parse("https://h:443/a").expect("valid url");
        let mut headers = HeaderMap::new();
        headers.insert("x-trace", HeaderValue::from_static("1"));

        BearerApplier
            .apply(&Token::new("T1"), &mut url, &mut headers)
            .expect("apply bearer");

        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer T1");
        assert!(headers.get(header::AUTHORIZATION).unwrap().is_sensitive());
        assert_eq!(headers.get("X-Trace").unwrap(), "1");
        assert_eq!(url.as_str(), "https://h/a");
    }

    #[test]
    fn test_bearer_applier_replaces_user_authorization() {
        let mut url = Url::parse("https://h:443/a").expect("valid url");
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));

        BearerApplier
            .apply(&Token::new("T1"), &mut url, &mut headers)
            .expect("apply bearer");

        assert_eq!(headers.get_all(header::AUTHORIZATION).iter().count(), 1);
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer T1");
    }

    #[test]
    fn test_bearer_applier_rejects_newlines() {
        let mut url = Url::parse("https://h/a").expect("valid url");
        let mut headers = HeaderMap::new();
        let result = BearerApplier.apply(&Token::new("bad\nvalue"), &mut url, &mut headers);
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_query_param_applier() {
        let mut url = Url::parse("https://h:443//resource?page=2").expect("valid url");
        let mut headers = HeaderMap::new();

        QueryParamApplier::new("access_token")
            .apply(&Token::new("T 1"), &mut url, &mut headers)
            .expect("apply query");

        assert_eq!(url.path(), "//resource");
        assert_eq!(url.query(), Some("page=2&access_token=T+1"));
        assert!(headers.is_empty());
    }
}
