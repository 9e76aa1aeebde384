use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::auth::{Target, Token, DEFAULT_PORT};
use crate::error::{Error, Result};

/// Default prefix for the exported variables
pub const DEFAULT_ENV_PREFIX: &str = "WEBAPI_";

const HOST_VAR: &str = "HOST";
const PORT_VAR: &str = "PORT";
const TOKEN_VAR: &str = "ACCESS_TOKEN";
const EXPIRES_VAR: &str = "EXPIRES_AT";

/// Reads a session exported into the environment by `session --env`.
///
/// The shell owns these variables, so this store never writes them.
#[derive(Clone)]
pub struct EnvStore {
    prefix: String,
    vars: HashMap<String, String>,
}

impl fmt::Debug for EnvStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vars: BTreeMap<&str, &str> = self
            .vars
            .iter()
            .map(|(k, v)| {
                if k.ends_with(TOKEN_VAR) {
                    (k.as_str(), "****")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("EnvStore")
            .field("prefix", &self.prefix)
            .field("vars", &vars)
            .finish()
    }
}

impl EnvStore {
    /// Snapshot of the current process environment
    pub fn from_process(prefix: &str) -> Result<Self> {
        // Non-UTF-8 variables cannot be ours; skip them rather than panic
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
        Self::from_vars(prefix, vars)
    }

    pub fn from_vars<I, K, V>(prefix: &str, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        validate_prefix(prefix)?;
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| k.starts_with(prefix))
            .collect();
        Ok(Self {
            prefix: prefix.to_string(),
            vars,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .get(&format!("{}{}", self.prefix, name))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// True when a token variable is present at all
    pub fn has_token(&self) -> bool {
        self.var(TOKEN_VAR).is_some()
    }

    /// Target named by the exported variables, if any
    pub fn target(&self) -> Result<Option<Target>> {
        let Some(host) = self.var(HOST_VAR) else {
            return Ok(None);
        };
        let port = match self.var(PORT_VAR) {
            Some(port) => port.parse::<u16>().map_err(|_| {
                Error::Config(format!("{}{} is not a port number", self.prefix, PORT_VAR))
            })?,
            None => DEFAULT_PORT,
        };
        Ok(Some(Target::new(host, port)))
    }

    pub fn load(&self, target: &Target) -> Result<Token> {
        let not_found = || Error::NotFound { host: target.key() };

        let Some(value) = self.var(TOKEN_VAR) else {
            return Err(not_found());
        };
        // A token exported for another host must not leak to this one
        if self.target()?.as_ref() != Some(target) {
            debug!(host = %target, "Exported session belongs to a different host");
            return Err(not_found());
        }

        let mut token = Token::new(value);
        if let Some(raw) = self.var(EXPIRES_VAR) {
            let exp = DateTime::parse_from_rfc3339(raw)
                .map_err(|_| {
                    Error::Config(format!("{}{} is not an RFC 3339 time", self.prefix, EXPIRES_VAR))
                })?
                .with_timezone(&Utc);
            token = token.with_expiry(exp);
        }

        if token.is_expired() {
            debug!(host = %target, "Exported session has expired");
            return Err(not_found());
        }
        Ok(token)
    }
}

/// `export` lines that recreate this session in a POSIX shell.
pub fn export_lines(prefix: &str, target: &Target, token: &Token) -> Result<String> {
    validate_prefix(prefix)?;

    let mut out = String::new();
    let mut push = |name: &str, value: &str| {
        out.push_str(&format!("export {}{}={}\n", prefix, name, shell_quote(value)));
    };
    push(HOST_VAR, &target.host);
    push(PORT_VAR, &target.port.to_string());
    push(TOKEN_VAR, token.value());
    if let Some(exp) = token.expires_at() {
        push(EXPIRES_VAR, &exp.to_rfc3339());
    }
    Ok(out)
}

/// Prefixes end up on the left of a shell assignment, so only
/// `[A-Z_][A-Z0-9_]*` (or the empty prefix) is accepted.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    let valid = prefix
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        && !prefix.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidEnvPrefix(prefix.to_string()))
    }
}

/// Single-quote `value` unless every character is shell-safe.
pub fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.,:/@%+=".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r#"'\''"#))
    }
}
