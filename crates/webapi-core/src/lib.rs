//! Core library for webapi.
//!
//! A session is acquired once with `SessionManager::acquire`, which stores
//! the token per host. Later invocations use `ApiCaller::call`, which reads
//! the token back through the `TokenStore` and attaches it to the request.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod store;

pub use api::{ApiCaller, ApiRequest, ApiResponse, RequestBody};
pub use auth::{Credentials, SessionManager, Target, Token};
pub use config::{ClientOptions, Config, StoreBackend};
pub use error::{Error, Result};
pub use store::TokenStore;
