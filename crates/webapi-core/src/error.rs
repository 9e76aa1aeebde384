use thiserror::Error;

/// Errors surfaced by the session, store and caller components.
///
/// Messages never carry a password or a token value.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Authentication failed - the backend rejected the credentials")]
    Authentication,

    #[error("Not yet authenticated for {host} - run the 'session' subcommand first")]
    Unauthenticated { host: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("No stored token for {host}")]
    NotFound { host: String },

    #[error("Token store is read-only - tokens from the environment are set by the shell")]
    ReadOnlyStore,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid environment prefix: {0:?}")]
    InvalidEnvPrefix(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Keychain error: {0}")]
    Keychain(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid stored data: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Maximum length for body excerpts placed in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl Error {
    /// True when the caller should re-authenticate rather than give up.
    pub fn needs_session(&self) -> bool {
        matches!(self, Error::Unauthenticated { .. } | Error::NotFound { .. })
    }

    /// Truncate a response body to avoid logging excessive data
    pub fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }
}
