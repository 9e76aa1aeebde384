//! Parsers for the `call` subcommand's header and body arguments.

use std::path::Path;

use anyhow::{Context, Result};
use webapi_core::config::expand_home;
use webapi_core::RequestBody;

/// Split `"Key: Value"` at the first `:`, trimming both sides.
pub fn parse_header_arg(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("{:?}: expected \"Key: Value\"", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("{:?}: header name is empty", raw));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// `@path` means "the contents of this file"; anything else is taken as is.
pub fn read_file_if_starts_with_at(text: &str) -> Result<String> {
    match text.strip_prefix('@') {
        Some(filename) => {
            let path = expand_home(Path::new(filename));
            std::fs::read_to_string(&path)
                .with_context(|| format!("{}: could not read body file", path.display()))
        }
        None => Ok(text.to_string()),
    }
}

/// Body argument as JSON, or verbatim bytes when `raw` is set.
pub fn parse_body(text: &str, raw: bool) -> Result<RequestBody> {
    let text = read_file_if_starts_with_at(text)?;
    if raw {
        return Ok(RequestBody::Raw(text.into_bytes()));
    }
    let value = serde_json::from_str(&text).with_context(|| {
        format!(
            "Body is not valid JSON (use --raw to send it verbatim): {}",
            webapi_core::Error::truncate_body(&text)
        )
    })?;
    Ok(RequestBody::Json(value))
}
