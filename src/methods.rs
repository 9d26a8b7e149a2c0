//! HTTP method names accepted at registration.
//!
//! The router treats method names as opaque tokens: the standard verbs and
//! WebDAV-style extensions are all plain strings parsed into
//! [`http::Method`].

use crate::error::RegisterError;
use http::Method;

pub const GET: &str = "GET";
pub const POST: &str = "POST";
pub const PUT: &str = "PUT";
pub const PATCH: &str = "PATCH";
pub const DELETE: &str = "DELETE";
pub const COPY: &str = "COPY";
pub const HEAD: &str = "HEAD";
pub const OPTIONS: &str = "OPTIONS";
pub const LINK: &str = "LINK";
pub const UNLINK: &str = "UNLINK";
pub const PURGE: &str = "PURGE";
pub const LOCK: &str = "LOCK";
pub const UNLOCK: &str = "UNLOCK";
pub const PROPFIND: &str = "PROPFIND";
pub const VIEW: &str = "VIEW";

/// Parse a method name into an [`http::Method`].
///
/// # Errors
///
/// Returns [`RegisterError::InvalidMethod`] if the name is not a valid HTTP
/// token.
pub fn parse(name: &str) -> Result<Method, RegisterError> {
    Method::from_bytes(name.as_bytes()).map_err(|_| RegisterError::InvalidMethod {
        method: name.to_string(),
    })
}
