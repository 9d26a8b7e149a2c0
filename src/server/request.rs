use super::multipart;
use crate::dispatcher::HeaderVec;
use crate::error::RouteError;
use crate::router::ParamVec;
use may_minihttp::Request;
use std::io::{self, Read};
use std::sync::Arc;
use tracing::debug;

/// Default bound on the non-file part of a multipart body (256 KiB).
pub const DEFAULT_MAX_FORM_MEMORY: usize = 262_144;

/// Raw request as read off the wire, before normalization.
///
/// Decoupled from `may_minihttp::Request` so the dispatcher can be driven
/// directly in tests and benches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingRequest {
    pub method: String,
    /// Request target: path plus optional `?query`
    pub target: String,
    /// Headers in wire order, names as sent
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl IncomingRequest {
    pub fn new(method: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            target: target.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Target without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map_or(self.target.as_str(), |(path, _)| path)
    }

    /// Query string without the leading `?`, empty if absent.
    #[must_use]
    pub fn query(&self) -> &str {
        self.target.split_once('?').map_or("", |(_, query)| query)
    }

    /// Last value of a header, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rfind(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Copy a `may_minihttp::Request` into an [`IncomingRequest`].
///
/// # Errors
///
/// Propagates failures reading the request body.
pub fn read_request(req: Request) -> io::Result<IncomingRequest> {
    let method = req.method().to_string();
    let target = req.path().to_string();
    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
        .collect();

    let mut body = Vec::new();
    req.body().read_to_end(&mut body)?;

    debug!(
        method = %method,
        target = %target,
        header_count = headers.len(),
        body_size_bytes = body.len(),
        "HTTP request read"
    );

    Ok(IncomingRequest {
        method,
        target,
        headers,
        body,
    })
}

/// Limits applied while normalizing request data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeConfig {
    /// Bound on non-file multipart fields, in bytes
    pub max_form_memory: usize,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            max_form_memory: DEFAULT_MAX_FORM_MEMORY,
        }
    }
}

/// Request data in the shape handlers receive it.
#[derive(Debug, Default)]
pub struct NormalizedRequest {
    pub query_params: ParamVec,
    pub form_params: ParamVec,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

/// Append `(name, value)` unless `name` is already present.
fn push_first(params: &mut ParamVec, name: &str, value: String) {
    if !params.iter().any(|(k, _)| k.as_ref() == name) {
        params.push((Arc::from(name), value));
    }
}

/// Parse a query string; the first value of a repeated name wins.
#[must_use]
pub fn parse_query_params(query: &str) -> ParamVec {
    let mut params = ParamVec::new();
    for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
        push_first(&mut params, &k, v.into_owned());
    }
    params
}

/// Lowercase header names; the last value of a repeated name wins.
#[must_use]
pub fn parse_header_params(headers: &[(String, String)]) -> HeaderVec {
    let mut params = HeaderVec::new();
    for (name, value) in headers {
        let name = name.to_ascii_lowercase();
        match params.iter_mut().find(|(k, _)| k.as_ref() == name) {
            Some(entry) => entry.1.clone_from(value),
            None => params.push((Arc::from(name), value.clone())),
        }
    }
    params
}

fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// `true` for urlencoded and multipart form submissions.
#[must_use]
pub fn is_form_content_type(content_type: &str) -> bool {
    matches!(
        media_type(content_type).as_str(),
        "application/x-www-form-urlencoded" | "multipart/form-data"
    )
}

/// Parse form fields out of the body; the first value of a repeated name
/// wins. Bodies of any other content type yield no fields.
///
/// # Errors
///
/// [`RouteError::BadRequest`] for malformed multipart framing, a missing
/// boundary, or non-file fields beyond `config.max_form_memory`.
pub fn parse_form_params(
    content_type: &str,
    body: &[u8],
    config: &NormalizeConfig,
) -> Result<ParamVec, RouteError> {
    let mut params = ParamVec::new();
    match media_type(content_type).as_str() {
        "application/x-www-form-urlencoded" => {
            for (k, v) in url::form_urlencoded::parse(body) {
                push_first(&mut params, &k, v.into_owned());
            }
        }
        "multipart/form-data" => {
            let boundary = multipart::extract_boundary(content_type).ok_or_else(|| {
                RouteError::BadRequest(multipart::MultipartError::MissingBoundary.to_string())
            })?;
            let fields = multipart::form_fields(body, boundary, config.max_form_memory)
                .map_err(|e| RouteError::BadRequest(e.to_string()))?;
            for (name, value) in fields {
                push_first(&mut params, &name, value);
            }
        }
        _ => {}
    }
    Ok(params)
}

/// Parse `body` as JSON and serialize it again.
///
/// # Errors
///
/// [`RouteError::BadRequest`] carrying the parser message.
pub fn canonicalize_json(body: &[u8]) -> Result<Vec<u8>, RouteError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| RouteError::BadRequest(e.to_string()))?;
    serde_json::to_vec(&value).map_err(|e| RouteError::BadRequest(e.to_string()))
}

/// Build the handler-facing view of a request.
///
/// When the request is not a form submission, carried no form fields and
/// has a non-empty body, the body must be JSON and is replaced by its
/// canonical serialization. Every other body passes through unchanged.
///
/// # Errors
///
/// [`RouteError::BadRequest`] for malformed JSON or form bodies.
pub fn normalize(
    req: &IncomingRequest,
    config: &NormalizeConfig,
) -> Result<NormalizedRequest, RouteError> {
    let query_params = parse_query_params(req.query());
    let headers = parse_header_params(&req.headers);
    let content_type = req.header("content-type").unwrap_or_default();
    let form_params = parse_form_params(content_type, &req.body, config)?;

    let expects_json =
        form_params.is_empty() && !is_form_content_type(content_type) && !req.body.is_empty();
    let body = if expects_json {
        canonicalize_json(&req.body)?
    } else {
        req.body.clone()
    };

    debug!(
        query_count = query_params.len(),
        form_count = form_params.len(),
        header_count = headers.len(),
        body_size_bytes = body.len(),
        json_body = expects_json,
        "Request normalized"
    );

    Ok(NormalizedRequest {
        query_params,
        form_params,
        headers,
        body,
    })
}
