//! Authenticated HTTP calls against the target web API.
//!
//! This module provides the `ApiCaller`, which attaches the stored session
//! token to each request and returns the response as received.

pub mod client;
pub mod request;
pub mod response;

pub use client::{ApiCaller, PreparedRequest};
pub use request::{parse_method, ApiRequest, RequestBody, SUPPORTED_METHODS};
pub use response::ApiResponse;
