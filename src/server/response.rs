use crate::dispatcher::Reply;
use crate::error::RouteError;
use http::StatusCode;
use may_minihttp::Response;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Text,
}

impl ContentType {
    #[must_use]
    pub fn header_line(self) -> &'static str {
        match self {
            ContentType::Json => "Content-Type: application/json",
            ContentType::Text => "Content-Type: text/plain; charset=utf-8",
        }
    }
}

/// Status, headers and body ready to be written to the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub content_type: Option<ContentType>,
    /// Complete `Name: value` header lines
    pub extra_headers: Vec<&'static str>,
    pub body: Vec<u8>,
}

impl HttpReply {
    #[must_use]
    pub fn json(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: Some(ContentType::Json),
            extra_headers: Vec::new(),
            body,
        }
    }

    #[must_use]
    pub fn text(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            content_type: Some(ContentType::Text),
            extra_headers: Vec::new(),
            body: message.into().into_bytes(),
        }
    }

    /// Empty reply, e.g. for a CORS preflight.
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            extra_headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Plain-text reply carrying the error's status and message.
    #[must_use]
    pub fn from_error(err: &RouteError) -> Self {
        Self::text(err.status(), err.to_string())
    }

    #[must_use]
    pub fn body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Render a dispatch outcome: JSON on success, plain text on failure.
#[must_use]
pub fn serialize_reply(result: Result<Reply, RouteError>) -> HttpReply {
    match result {
        Ok(reply) => match reply.to_json_bytes() {
            Ok(body) => HttpReply::json(body),
            Err(e) => {
                error!(error = %e, "Reply serialization failed");
                HttpReply::from_error(&RouteError::Serialization(e.to_string()))
            }
        },
        Err(err) => HttpReply::from_error(&err),
    }
}

/// Status code and reason phrase to write for `status`.
///
/// Codes outside 100..=999 cannot be written and become 500.
#[must_use]
pub fn status_line(status: u16) -> (u16, &'static str) {
    match StatusCode::from_u16(status) {
        Ok(code) => (status, code.canonical_reason().unwrap_or("Unknown")),
        Err(_) => (500, "Internal Server Error"),
    }
}

pub fn write_reply(res: &mut Response, reply: HttpReply) {
    let (status, reason) = status_line(reply.status);
    res.status_code(status as usize, reason);
    if let Some(content_type) = reply.content_type {
        res.header(content_type.header_line());
    }
    for header in reply.extra_headers {
        res.header(header);
    }
    res.body_vec(reply.body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_status_line() {
        assert_eq!(status_line(200), (200, "OK"));
        assert_eq!(status_line(404), (404, "Not Found"));
        assert_eq!(status_line(599), (599, "Unknown"));
        assert_eq!(status_line(42), (500, "Internal Server Error"));
        assert_eq!(status_line(1000), (500, "Internal Server Error"));
    }

    #[test]
    fn test_serialize_success() {
        let reply = serialize_reply(Ok(Reply::json(serde_json::json!({ "ok": true }))));
        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type, Some(ContentType::Json));
        assert_eq!(reply.body, br#"{"ok":true}"#);
    }

    #[test]
    fn test_serialize_failure_is_500_with_serde_message() {
        let mut map = HashMap::new();
        map.insert(vec![1], 1);
        let reply = serialize_reply(Ok(Reply::json(map)));
        assert_eq!(reply.status, 500);
        assert_eq!(reply.content_type, Some(ContentType::Text));
        assert_eq!(reply.body_str(), "key must be a string");
    }

    #[test]
    fn test_error_is_plain_text() {
        let reply = serialize_reply(Err(RouteError::Forbidden));
        assert_eq!(reply.status, 403);
        assert_eq!(reply.body_str(), "Forbidden by request interceptor");
    }
}
