use std::any::Any;
use std::fmt;

use crate::dispatcher::HandlerRequest;

/// Opaque value an interceptor hands to the handler it guards.
///
/// The router never looks inside; handlers ask for the concrete type they
/// expect with [`Session::get`].
pub struct Session(Box<dyn Any + Send + Sync>);

impl Session {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// Borrow the session as `T`, or `None` if it holds another type.
    #[must_use]
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Session(..)")
    }
}

/// Explicit rejection raised by an interceptor.
///
/// Written to the client with its own status and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptorError {
    pub status: u16,
    pub message: String,
}

impl InterceptorError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl fmt::Display for InterceptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}

impl std::error::Error for InterceptorError {}

/// Gate run after routing and normalization, before the handler.
///
/// - `Err(_)` rejects the request with the error's status and message.
/// - `Ok(None)` rejects it with 403.
/// - `Ok(Some(session))` admits it and hands `session` to the handler.
pub trait Interceptor: Send + Sync + 'static {
    fn intercept(&self, req: &HandlerRequest) -> Result<Option<Session>, InterceptorError>;
}

impl<F> Interceptor for F
where
    F: Fn(&HandlerRequest) -> Result<Option<Session>, InterceptorError> + Send + Sync + 'static,
{
    fn intercept(&self, req: &HandlerRequest) -> Result<Option<Session>, InterceptorError> {
        self(req)
    }
}
