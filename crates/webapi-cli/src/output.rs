use webapi_core::ApiResponse;

/// Response body as printed on stdout. JSON is re-encoded (indented with
/// `pretty`); anything that fails to parse is shown as received.
pub fn render_body(response: &ApiResponse, pretty: bool) -> String {
    if response.is_json() {
        if let Ok(value) = response.json() {
            let rendered = if pretty {
                serde_json::to_string_pretty(&value)
            } else {
                serde_json::to_string(&value)
            };
            if let Ok(text) = rendered {
                return text;
            }
        }
    }
    response.text()
}

/// `"200 OK"`
pub fn status_line(response: &ApiResponse) -> String {
    format!("{} {}", response.status.as_u16(), response.reason())
}

/// One `name: value` line per response header
pub fn header_lines(response: &ApiResponse) -> Vec<String> {
    response
        .headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, String::from_utf8_lossy(value.as_bytes())))
        .collect()
}
