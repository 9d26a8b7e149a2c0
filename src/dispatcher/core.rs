//! Dispatcher core module - hot path for request dispatch.
//!
//! Handlers run inline on the connection coroutine that received the
//! request. The route table is shared read-only behind an [`Arc`], so
//! dispatch takes no locks.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use crate::error::{RouteError, ServiceError};
use crate::ids::RequestId;
use crate::middleware::Session;
use crate::router::{ParamVec, RouteTable};
use crate::server::request::{normalize, IncomingRequest, NormalizeConfig};
use crate::server::response::{serialize_reply, HttpReply};
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use smallvec::SmallVec;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Maximum inline headers before heap allocation.
/// Most requests have ≤16 headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for the hot path.
///
/// Names are lowercase; each name appears once, holding the last value the
/// request carried for it.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Everything a handler receives about one request.
///
/// All four parameter collections are always present, possibly empty.
#[derive(Debug)]
pub struct HandlerRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    /// Declared path of the matched route
    pub route: String,
    /// Path variables bound by name (stack-allocated for ≤8 params)
    pub path_params: ParamVec,
    /// Query string parameters, first value wins
    pub query_params: ParamVec,
    /// Urlencoded or multipart form fields, first value wins
    pub form_params: ParamVec,
    /// Lowercase header names, last value wins
    pub headers: HeaderVec,
    /// Canonical JSON when the request carried a JSON body, raw bytes otherwise
    pub body: Vec<u8>,
    /// Value handed over by the route's interceptor, if any
    pub session: Option<Session>,
}

fn find_param<'a>(params: &'a [(Arc<str>, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k.as_ref() == name)
        .map(|(_, v)| v.as_str())
}

fn params_map(params: &[(Arc<str>, String)]) -> HashMap<String, String> {
    params
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

impl HandlerRequest {
    /// Get a path parameter by name.
    ///
    /// A name declared twice in the route path resolves to its last
    /// segment, the same value [`HandlerRequest::path_params_map`] keeps.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        find_param(&self.query_params, name)
    }

    #[inline]
    #[must_use]
    pub fn get_form_param(&self, name: &str) -> Option<&str> {
        find_param(&self.form_params, name)
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Convert path_params to HashMap
    /// Note: This allocates - use get_path_param() in hot paths
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        params_map(&self.path_params)
    }

    #[must_use]
    pub fn query_params_map(&self) -> HashMap<String, String> {
        params_map(&self.query_params)
    }

    #[must_use]
    pub fn form_params_map(&self) -> HashMap<String, String> {
        params_map(&self.form_params)
    }

    #[must_use]
    pub fn headers_map(&self) -> HashMap<String, String> {
        params_map(&self.headers)
    }

    /// Deserialize the body as JSON into `T`.
    ///
    /// # Errors
    ///
    /// A 400 [`ServiceError`] carrying the parser message.
    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, ServiceError> {
        serde_json::from_slice(&self.body).map_err(|e| ServiceError::bad_request(e.to_string()))
    }
}

trait ErasedJson: Send {
    fn to_json(&self) -> serde_json::Result<Vec<u8>>;
}

impl<T: Serialize + Send> ErasedJson for T {
    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Successful handler result, serialized to JSON at the HTTP boundary.
pub struct Reply(Box<dyn ErasedJson>);

impl Reply {
    pub fn json<T: Serialize + Send + 'static>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// Serialize the wrapped value.
    ///
    /// # Errors
    ///
    /// Whatever `serde_json` reports for the value, e.g. a map with
    /// non-string keys.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        self.0.to_json()
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Reply(..)")
    }
}

pub type HandlerResult = Result<Reply, ServiceError>;

/// Request handler bound to a (template, method) pair.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, req: HandlerRequest) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(HandlerRequest) -> HandlerResult + Send + Sync + 'static,
{
    fn handle(&self, req: HandlerRequest) -> HandlerResult {
        self(req)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("non-string panic payload")
    }
}

/// Run user code, turning a panic into [`RouteError::HandlerPanicked`].
fn guarded<T>(
    request_id: RequestId,
    stage: &'static str,
    f: impl FnOnce() -> T,
) -> Result<T, RouteError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|panic| {
        let panic_message = panic_message(&*panic);
        error!(
            request_id = %request_id,
            stage = stage,
            panic_message = %panic_message,
            "Handler panicked - CRITICAL"
        );
        RouteError::HandlerPanicked(panic_message)
    })
}

/// Owns the route table once serving begins and runs requests through it.
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    config: NormalizeConfig,
}

impl Dispatcher {
    #[must_use]
    pub fn new(routes: RouteTable) -> Self {
        Self::with_config(routes, NormalizeConfig::default())
    }

    #[must_use]
    pub fn with_config(routes: RouteTable, config: NormalizeConfig) -> Self {
        info!(
            templates = routes.len(),
            max_form_memory = config.max_form_memory,
            "Dispatcher ready"
        );
        Self {
            routes: Arc::new(routes),
            config,
        }
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    #[must_use]
    pub fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    /// Dispatch a request and render the outcome as an HTTP reply.
    ///
    /// Honours a valid ULID in `x-request-id`, otherwise generates one.
    #[must_use]
    pub fn dispatch(&self, req: &IncomingRequest) -> HttpReply {
        let request_id = RequestId::from_header_or_new(req.header("x-request-id"));
        let start = Instant::now();
        let reply = serialize_reply(self.try_dispatch(request_id, req));
        info!(
            request_id = %request_id,
            method = %req.method,
            path = %req.path(),
            status = reply.status,
            latency_ms = start.elapsed().as_millis() as u64,
            "Request complete"
        );
        reply
    }

    /// Resolve, normalize, intercept and invoke the handler.
    ///
    /// # Errors
    ///
    /// Any [`RouteError`] raised along the way; the handler is not invoked
    /// once an earlier stage has failed.
    pub fn try_dispatch(
        &self,
        request_id: RequestId,
        req: &IncomingRequest,
    ) -> Result<Reply, RouteError> {
        let method = Method::from_bytes(req.method.as_bytes())
            .map_err(|_| RouteError::BadRequest(format!("invalid HTTP method '{}'", req.method)))?;
        let path = req.path();

        debug!(request_id = %request_id, method = %method, path = %path, "Resolving route");
        let matched = self.routes.resolve(&method, path)?;
        let normalized = normalize(req, &self.config).inspect_err(|err| {
            warn!(request_id = %request_id, path = %path, error = %err, "Request rejected");
        })?;

        let mut handler_req = HandlerRequest {
            request_id,
            method,
            path: path.to_string(),
            route: matched.route.raw_pattern().to_string(),
            path_params: matched.path_params,
            query_params: normalized.query_params,
            form_params: normalized.form_params,
            headers: normalized.headers,
            body: normalized.body,
            session: None,
        };

        if let Some(interceptor) = &matched.endpoint.interceptor {
            match guarded(request_id, "interceptor", || {
                interceptor.intercept(&handler_req)
            })? {
                Err(err) => {
                    warn!(
                        request_id = %request_id,
                        route = %handler_req.route,
                        status = err.status,
                        message = %err.message,
                        "Interceptor rejected request"
                    );
                    return Err(RouteError::Rejected {
                        status: err.status,
                        message: err.message,
                    });
                }
                Ok(None) => {
                    warn!(
                        request_id = %request_id,
                        route = %handler_req.route,
                        "Interceptor admitted no session"
                    );
                    return Err(RouteError::Forbidden);
                }
                Ok(Some(session)) => handler_req.session = Some(session),
            }
        }

        info!(
            request_id = %request_id,
            method = %handler_req.method,
            route = %handler_req.route,
            path_params = ?handler_req.path_params,
            query_params = ?handler_req.query_params,
            "Handler execution start"
        );
        let handler = Arc::clone(&matched.endpoint.handler);
        let execution_start = Instant::now();
        let result = guarded(request_id, "handler", move || handler.handle(handler_req))?;
        let execution_time_ms = execution_start.elapsed().as_millis() as u64;

        match result {
            Ok(reply) => {
                info!(
                    request_id = %request_id,
                    execution_time_ms = execution_time_ms,
                    "Handler execution complete"
                );
                Ok(reply)
            }
            Err(err) => {
                warn!(
                    request_id = %request_id,
                    execution_time_ms = execution_time_ms,
                    status = err.status,
                    message = %err.message,
                    "Handler returned error"
                );
                Err(RouteError::Service(err))
            }
        }
    }
}
