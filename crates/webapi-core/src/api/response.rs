use reqwest::header::{self, HeaderMap};
use reqwest::StatusCode;

use crate::error::Result;

/// Response exactly as received. Nothing here looks at the status beyond
/// reporting it.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn reason(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// `application/json`, or any `+json` subtype
    pub fn is_json(&self) -> bool {
        let Some(content_type) = self
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        else {
            return false;
        };
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match mime.split_once('/') {
            Some((_, subtype)) => subtype == "json" || subtype.ends_with("+json"),
            None => false,
        }
    }

    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn response(content_type: Option<&'static str>, body: &str) -> ApiResponse {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        ApiResponse {
            status: StatusCode::OK,
            headers,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_is_json() {
        assert!(response(Some("application/json"), "{}").is_json());
        assert!(response(Some("application/json; charset=utf-8"), "{}").is_json());
        assert!(response(Some("application/problem+json"), "{}").is_json());
        assert!(response(Some("Application/JSON"), "{}").is_json());
        assert!(!response(Some("text/html"), "").is_json());
        assert!(!response(None, "{}").is_json());
    }

    #[test]
    fn test_text_and_json() {
        let resp = response(Some("application/json"), r#"{"ok":true}"#);
        assert_eq!(resp.text(), r#"{"ok":true}"#);
        assert_eq!(resp.json().unwrap(), serde_json::json!({"ok": true}));
        assert!(resp.is_success());
        assert_eq!(resp.reason(), "OK");
    }

    #[test]
    fn test_non_success_status() {
        let mut resp = response(None, "nope");
        resp.status = StatusCode::UNAUTHORIZED;
        assert!(!resp.is_success());
        assert_eq!(resp.reason(), "Unauthorized");
    }
}
