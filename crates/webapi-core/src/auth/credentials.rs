use std::fmt;

use serde::{Deserialize, Serialize};

/// Port used when none is given
pub const DEFAULT_PORT: u16 = 443;

/// The service a session belongs to. Tokens are scoped per host and port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Key under which the token store files this target's session.
    /// The default port is left out so `h` and `h:443` share one record.
    pub fn key(&self) -> String {
        if self.port == DEFAULT_PORT {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// `scheme://host:port` with no trailing slash
    pub fn base_url(&self, scheme: &str) -> String {
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Username and password for a single acquisition.
/// The secret is never printed; `Debug` shows `****`.
#[derive(Clone)]
pub struct Credentials {
    identifier: String,
    secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"****")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_key() {
        assert_eq!(Target::new("h", 443).key(), "h");
        assert_eq!(Target::new("1.2.3.4", 1234).key(), "1.2.3.4:1234");
        assert_eq!(Target::new("h", 8443).to_string(), "h:8443");
    }

    #[test]
    fn test_target_base_url() {
        let target = Target::new("www.example.com", 9999);
        assert_eq!(target.base_url("https"), "https://www.example.com:9999");
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let creds = Credentials::new("foo", "bar-secret");
        let shown = format!("{:?}", creds);
        assert_eq!(shown, r#"Credentials { identifier: "foo", secret: "****" }"#);
        assert!(!shown.contains("bar-secret"));
        assert_eq!(creds.secret(), "bar-secret");
    }
}
