//! Authentication module for acquiring and keeping session tokens.
//!
//! This module provides:
//! - `SessionManager`: exchanges credentials for a token and stores it
//! - `Authenticator` / `CredentialApplier`: the backend-specific extension points
//! - `SecretStore`: optional OS keychain storage for renewing expired sessions

pub mod backend;
pub mod credentials;
pub mod keychain;
pub mod session;
pub mod token;

pub use backend::{
    Authenticator, BearerApplier, CredentialApplier, PlaceholderAuthenticator, QueryParamApplier,
    PLACEHOLDER_TOKEN,
};
pub use credentials::{Credentials, Target, DEFAULT_PORT};
pub use keychain::SecretStore;
pub use session::{Acquired, SessionManager, SessionOutput};
pub use token::Token;
