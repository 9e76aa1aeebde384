//! Authenticated call dispatch.
//!
//! `ApiCaller` loads the stored token for a target, lets the configured
//! `CredentialApplier` attach it, sends the request and hands the response
//! back untouched. Non-2xx statuses are not errors at this layer.

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Url};
use tracing::{debug, info};

use super::{ApiRequest, ApiResponse, RequestBody};
use crate::auth::{CredentialApplier, Target};
use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::store::{env::shell_quote, TokenStore};

/// A request with the token applied, ready to send or to print.
#[derive(Debug)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

pub struct ApiCaller {
    client: Client,
    store: TokenStore,
    applier: Box<dyn CredentialApplier>,
    options: ClientOptions,
}

impl ApiCaller {
    pub fn new(
        store: TokenStore,
        applier: Box<dyn CredentialApplier>,
        options: ClientOptions,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.request_timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            store,
            applier,
            options,
        })
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// `scheme://host:port` followed by `path` exactly as given.
    ///
    /// URL parsing would resolve `.` and `..` segments, sending the request
    /// somewhere other than the path the user typed, so those are rejected.
    pub fn url_for(&self, target: &Target, path: &str) -> Result<Url> {
        let path_only = path.split(['?', '#']).next().unwrap_or_default();
        if has_dot_segment(path_only) {
            return Err(Error::InvalidRequest(format!(
                "{}: '.' and '..' path segments are not supported",
                path
            )));
        }
        let raw = format!("{}{}", target.base_url(&self.options.scheme), path);
        Url::parse(&raw).map_err(|e| Error::InvalidRequest(format!("{}: {}", raw, e)))
    }

    /// Load the token and build the outgoing request. Fails with
    /// `Error::Unauthenticated` without touching the network when no token
    /// is stored for `target`.
    pub fn prepare(&self, target: &Target, request: &ApiRequest) -> Result<PreparedRequest> {
        let token = self.store.load(target).map_err(|e| match e {
            Error::NotFound { host } => Error::Unauthenticated { host },
            other => other,
        })?;

        let mut url = self.url_for(target, &request.path)?;
        let mut headers = request.headers.clone();

        let body = request.body.to_bytes()?;
        if matches!(request.body, RequestBody::Json(_)) && !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        self.applier.apply(&token, &mut url, &mut headers)?;

        Ok(PreparedRequest {
            method: request.method.clone(),
            url,
            headers,
            body,
        })
    }

    /// Send `request` to `target` with the stored token attached.
    pub async fn call(&self, target: &Target, request: &ApiRequest) -> Result<ApiResponse> {
        let prepared = self.prepare(target, request)?;

        // The applier may have put the token in the query string
        info!(method = %request.method, host = %target, path = %request.path, "Sending request");

        let mut builder = self
            .client
            .request(prepared.method, prepared.url)
            .headers(prepared.headers);
        if let Some(body) = prepared.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        debug!(status = %status, bytes = body.len(), "Response received");
        if !status.is_success() {
            debug!(
                body = %Error::truncate_body(&String::from_utf8_lossy(&body)),
                "Non-success response body"
            );
        }

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    /// An equivalent `curl` command line, token included.
    pub fn curl_command(&self, target: &Target, request: &ApiRequest) -> Result<String> {
        let prepared = self.prepare(target, request)?;

        let mut parts: Vec<String> = vec!["curl".to_string()];
        if self.options.accept_invalid_certs {
            parts.push("--insecure".to_string());
        }
        parts.push("-X".to_string());
        parts.push(prepared.method.to_string());
        parts.push(shell_quote(prepared.url.as_str()));

        for (name, value) in prepared.headers.iter() {
            let line = format!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
            parts.push("-H".to_string());
            parts.push(shell_quote(&line));
        }

        if let Some(body) = prepared.body {
            parts.push("--data-binary".to_string());
            parts.push(shell_quote(&String::from_utf8_lossy(&body)));
        }

        Ok(parts.join(" "))
    }
}

/// True when a segment is `.` or `..`, including the `%2e` spellings.
fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}
