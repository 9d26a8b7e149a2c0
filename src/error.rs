//! Error types surfaced at the dispatch boundary.
//!
//! Every failure a request can hit is a [`RouteError`]. The HTTP layer turns
//! it into a status code plus a plain-text body via [`RouteError::status`]
//! and its `Display` output. [`RegisterError`] covers the startup-only
//! failures of building a route table.

use http::Method;
use std::fmt;

/// Error returned by a handler to reject a request.
///
/// The status and message are written to the client verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub status: u16,
    pub message: String,
}

impl ServiceError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ServiceError {}

/// Failure of a single request, resolved into an HTTP status at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// No template matches the path, or variable extraction disagreed with
    /// the template's declared variables.
    NotFound { method: Method, path: String },
    /// A template matches the path but has no handler for the method.
    MethodNotAllowed {
        method: Method,
        path: String,
        allowed: Vec<Method>,
    },
    /// Malformed JSON body or form payload.
    BadRequest(String),
    /// Explicit interceptor rejection, passed through as-is.
    Rejected { status: u16, message: String },
    /// Interceptor admitted no session and raised no error.
    Forbidden,
    /// Error returned by the handler itself.
    Service(ServiceError),
    /// The handler's reply could not be serialized to JSON.
    Serialization(String),
    /// The handler panicked; the panic payload is logged, not sent.
    HandlerPanicked(String),
}

impl RouteError {
    /// HTTP status code this error is written with.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            RouteError::NotFound { .. } => 404,
            RouteError::MethodNotAllowed { .. } => 405,
            RouteError::BadRequest(_) => 400,
            RouteError::Rejected { status, .. } => *status,
            RouteError::Forbidden => 403,
            RouteError::Service(err) => err.status,
            RouteError::Serialization(_) | RouteError::HandlerPanicked(_) => 500,
        }
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::NotFound { .. } => f.write_str("could not be found"),
            RouteError::MethodNotAllowed { allowed, .. } => {
                f.write_str("method not allowed; allowed: ")?;
                for (idx, method) in allowed.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(method.as_str())?;
                }
                Ok(())
            }
            RouteError::BadRequest(msg) | RouteError::Serialization(msg) => f.write_str(msg),
            RouteError::Rejected { message, .. } => f.write_str(message),
            RouteError::Forbidden => f.write_str("Forbidden by request interceptor"),
            RouteError::Service(err) => fmt::Display::fmt(err, f),
            RouteError::HandlerPanicked(_) => f.write_str("handler panicked"),
        }
    }
}

impl std::error::Error for RouteError {}

impl From<ServiceError> for RouteError {
    fn from(err: ServiceError) -> Self {
        RouteError::Service(err)
    }
}

/// Startup failure while building a route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// The method name is not a valid HTTP token.
    InvalidMethod { method: String },
    /// The compiled template did not produce a valid regex.
    InvalidPattern { path: String, reason: String },
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::InvalidMethod { method } => {
                write!(f, "invalid HTTP method name '{method}'")
            }
            RegisterError::InvalidPattern { path, reason } => {
                write!(f, "path '{path}' does not compile to a route matcher: {reason}")
            }
        }
    }
}

impl std::error::Error for RegisterError {}
