use std::fmt;

use chrono::{DateTime, Duration, Utc};

/// Opaque access token issued by an auth backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// A token with no known expiry never expires on our side.
    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|exp| Utc::now() >= exp).unwrap_or(false)
    }

    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expires_at.map(|exp| exp - Utc::now())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"****")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_without_expiry_is_live() {
        let token = Token::new("T1");
        assert!(!token.is_expired());
        assert!(token.time_until_expiry().is_none());
    }

    #[test]
    fn test_token_expiry() {
        let live = Token::new("T1").with_expiry(Utc::now() + Duration::minutes(30));
        assert!(!live.is_expired());
        let remaining = live.time_until_expiry().map(|d| d.num_minutes());
        assert!(matches!(remaining, Some(m) if m >= 29));

        let stale = Token::new("T1").with_expiry(Utc::now() - Duration::seconds(1));
        assert!(stale.is_expired());
    }

    #[test]
    fn test_token_debug_hides_value() {
        let shown = format!("{:?}", Token::new("SECRET_STRING"));
        assert!(!shown.contains("SECRET_STRING"));
        assert!(shown.contains("****"));
    }
}
