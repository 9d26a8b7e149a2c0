use http::Method;
use tracing::debug;

use crate::server::request::IncomingRequest;
use crate::server::response::HttpReply;

const VARY_ORIGIN: &str = "Vary: Origin";
const VARY_PREFLIGHT: &str =
    "Vary: Origin, Access-Control-Request-Method, Access-Control-Request-Headers";
const ALLOW_ANY_ORIGIN: &str = "Access-Control-Allow-Origin: *";
const ALLOW_METHODS: &str = "Access-Control-Allow-Methods: HEAD, GET, POST, PUT, PATCH, DELETE";
const ALLOW_ANY_HEADERS: &str = "Access-Control-Allow-Headers: *";

/// Permissive CORS wrapper applied in front of the dispatcher.
///
/// # CORS Flow
///
/// 1. **Preflight** (`OPTIONS` carrying `Access-Control-Request-Method`):
///    answered with 204 here, the router never sees it.
/// 2. **Actual request**: dispatched normally; the allow-origin header is
///    added to the reply when the request carried `Origin`.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_methods: Vec<Method>,
}

impl CorsPolicy {
    /// Any origin, any request header, methods HEAD/GET/POST/PUT/PATCH/DELETE,
    /// no credentials.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            allowed_methods: vec![
                Method::HEAD,
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ],
        }
    }

    fn allows(&self, method: &str) -> bool {
        self.allowed_methods
            .iter()
            .any(|m| m.as_str().eq_ignore_ascii_case(method.trim()))
    }

    #[must_use]
    pub fn is_preflight(req: &IncomingRequest) -> bool {
        req.method.eq_ignore_ascii_case("OPTIONS")
            && req.header("access-control-request-method").is_some()
    }

    /// Answer a preflight request, or `None` if `req` is not one.
    #[must_use]
    pub fn preflight(&self, req: &IncomingRequest) -> Option<HttpReply> {
        if !Self::is_preflight(req) {
            return None;
        }
        let mut reply = HttpReply::empty(204);
        reply.extra_headers.push(VARY_PREFLIGHT);

        let requested = req.header("access-control-request-method").unwrap_or_default();
        match req.header("origin") {
            Some(origin) if self.allows(requested) => {
                debug!(origin = %origin, requested_method = %requested, "CORS preflight allowed");
                reply
                    .extra_headers
                    .extend([ALLOW_ANY_ORIGIN, ALLOW_METHODS, ALLOW_ANY_HEADERS]);
            }
            origin => {
                debug!(
                    origin = ?origin,
                    requested_method = %requested,
                    "CORS preflight not allowed"
                );
            }
        }
        Some(reply)
    }

    /// Add CORS headers to the reply of an actual request.
    pub fn apply(&self, req: &IncomingRequest, reply: &mut HttpReply) {
        reply.extra_headers.push(VARY_ORIGIN);
        if req.header("origin").is_some() && self.allows(&req.method) {
            reply.extra_headers.push(ALLOW_ANY_ORIGIN);
        }
    }
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self::allow_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preflight_allowed() {
        let req = IncomingRequest::new("OPTIONS", "/api/createinfo")
            .with_header("Origin", "https://example.com")
            .with_header("Access-Control-Request-Method", "PUT");
        let reply = CorsPolicy::allow_all().preflight(&req).unwrap();
        assert_eq!(reply.status, 204);
        assert!(reply.body.is_empty());
        assert!(reply.extra_headers.contains(&ALLOW_ANY_ORIGIN));
        assert!(reply.extra_headers.contains(&ALLOW_METHODS));
        assert!(reply.extra_headers.contains(&ALLOW_ANY_HEADERS));
    }

    #[test]
    fn test_preflight_for_disallowed_method_has_no_allow_headers() {
        let req = IncomingRequest::new("OPTIONS", "/x")
            .with_header("Origin", "https://example.com")
            .with_header("Access-Control-Request-Method", "PROPFIND");
        let reply = CorsPolicy::allow_all().preflight(&req).unwrap();
        assert_eq!(reply.status, 204);
        assert_eq!(reply.extra_headers, vec![VARY_PREFLIGHT]);
    }

    #[test]
    fn test_plain_options_is_not_preflight() {
        let req = IncomingRequest::new("OPTIONS", "/x").with_header("Origin", "https://a.b");
        assert!(CorsPolicy::allow_all().preflight(&req).is_none());
    }

    #[test]
    fn test_simple_request_with_origin() {
        let req = IncomingRequest::new("GET", "/x").with_header("Origin", "https://a.b");
        let mut reply = HttpReply::json(b"{}".to_vec());
        CorsPolicy::allow_all().apply(&req, &mut reply);
        assert_eq!(reply.extra_headers, vec![VARY_ORIGIN, ALLOW_ANY_ORIGIN]);
    }

    #[test]
    fn test_simple_request_without_origin() {
        let req = IncomingRequest::new("GET", "/x");
        let mut reply = HttpReply::json(b"{}".to_vec());
        CorsPolicy::allow_all().apply(&req, &mut reply);
        assert_eq!(reply.extra_headers, vec![VARY_ORIGIN]);
    }
}
