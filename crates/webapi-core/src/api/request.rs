use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;

use crate::error::{Error, Result};

/// Methods the caller will send
pub const SUPPORTED_METHODS: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

/// Parse a method name, ignoring case.
pub fn parse_method(name: &str) -> Result<Method> {
    let upper = name.to_ascii_uppercase();
    if !SUPPORTED_METHODS.contains(&upper.as_str()) {
        return Err(Error::InvalidRequest(format!(
            "Unsupported method {:?} (expected one of {})",
            name,
            SUPPORTED_METHODS.join(", ")
        )));
    }
    Method::from_bytes(upper.as_bytes())
        .map_err(|_| Error::InvalidRequest(format!("Unsupported method {:?}", name)))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Raw(Vec<u8>),
}

impl RequestBody {
    /// Bytes as they go on the wire
    pub fn to_bytes(&self) -> Result<Option<Vec<u8>>> {
        match self {
            RequestBody::Empty => Ok(None),
            RequestBody::Json(value) => Ok(Some(serde_json::to_vec(value)?)),
            RequestBody::Raw(bytes) => Ok(Some(bytes.clone())),
        }
    }
}

/// A request as handed over by the CLI layer. Header names are
/// case-insensitive; the path is kept exactly as given.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl ApiRequest {
    /// The path must start with `/`. Anything after that, including a run
    /// of leading slashes, is sent verbatim.
    pub fn new(method: Method, path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(Error::InvalidRequest(format!("{}: must start with '/'", path)));
        }
        Ok(Self {
            method,
            path,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        })
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::InvalidRequest(format!("Invalid header name {:?}", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| Error::InvalidRequest(format!("Invalid value for header {}", name)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }
}
