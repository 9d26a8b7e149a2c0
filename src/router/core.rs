//! Route table and matcher - hot path for request routing.
//!
//! The table is filled once at startup and then moved into the
//! [`Dispatcher`](crate::dispatcher::Dispatcher), which only ever reads it.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use crate::dispatcher::Handler;
use crate::error::{RegisterError, RouteError};
use crate::middleware::Interceptor;
use http::Method;
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::template::{compile_template, ensure_trailing_slash, CompiledTemplate, VARIABLE_TOKEN};

/// Maximum number of path parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated path parameter storage for the hot path.
///
/// Names are shared with the route table; values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Handler bound to one (template, method) pair.
#[derive(Clone)]
pub struct Endpoint {
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) interceptor: Option<Arc<dyn Interceptor>>,
    variables: Arc<[Arc<str>]>,
}

impl Endpoint {
    /// Variable names recorded for this endpoint's declared path.
    #[must_use]
    pub fn variables(&self) -> &[Arc<str>] {
        &self.variables
    }

    #[must_use]
    pub fn is_intercepted(&self) -> bool {
        self.interceptor.is_some()
    }
}

/// One compiled template and its per-method endpoints.
pub struct Route {
    raw_pattern: String,
    template: CompiledTemplate,
    endpoints: HashMap<Method, Endpoint>,
}

impl Route {
    /// Path as first declared for this template.
    #[must_use]
    pub fn raw_pattern(&self) -> &str {
        &self.raw_pattern
    }

    #[must_use]
    pub fn template(&self) -> &CompiledTemplate {
        &self.template
    }

    #[must_use]
    pub fn endpoint(&self, method: &Method) -> Option<&Endpoint> {
        self.endpoints.get(method)
    }

    /// Methods bound on this template, sorted by name.
    #[must_use]
    pub fn methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self.endpoints.keys().cloned().collect();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods
    }
}

/// Result of successfully matching a request to an endpoint.
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub endpoint: &'a Endpoint,
    /// Path parameters extracted from the URL (e.g., `{id}` → `("id", "123")`)
    pub path_params: ParamVec,
}

impl RouteMatch<'_> {
    /// Get a path parameter by name.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Convert path_params to HashMap for the handler.
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Scan position of a variable-bearing template.
///
/// Longer literal prefix first, then more literal text overall, then
/// registration order.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Ranked {
    rank: (Reverse<usize>, Reverse<usize>, usize),
    template: String,
}

/// Registry of compiled templates keyed by their template string.
#[derive(Default)]
pub struct RouteTable {
    routes: HashMap<String, Route>,
    scan_order: Vec<Ranked>,
    registered: usize,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `method` on `path`.
    ///
    /// Re-registering the same (template, method) replaces the previous
    /// endpoint.
    ///
    /// # Errors
    ///
    /// Fails if `method` is not a valid HTTP token or the path does not
    /// compile.
    pub fn register<H>(&mut self, method: &str, path: &str, handler: H) -> Result<(), RegisterError>
    where
        H: Handler,
    {
        self.insert(method, path, Arc::new(handler), None)
    }

    /// Bind `handler` to `method` on `path`, gated by `interceptor`.
    ///
    /// # Errors
    ///
    /// Same as [`RouteTable::register`].
    pub fn register_with_interceptor<H, I>(
        &mut self,
        method: &str,
        path: &str,
        handler: H,
        interceptor: I,
    ) -> Result<(), RegisterError>
    where
        H: Handler,
        I: Interceptor,
    {
        self.insert(method, path, Arc::new(handler), Some(Arc::new(interceptor)))
    }

    fn insert(
        &mut self,
        method: &str,
        path: &str,
        handler: Arc<dyn Handler>,
        interceptor: Option<Arc<dyn Interceptor>>,
    ) -> Result<(), RegisterError> {
        let method = crate::methods::parse(method)?;
        let compiled = compile_template(path)?;
        let variables: Arc<[Arc<str>]> = compiled.variables().into();
        let key = compiled.template().to_string();

        let route = match self.routes.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                info!(
                    path = %path,
                    template = %compiled.template(),
                    variables = ?compiled.variables(),
                    literal = compiled.is_literal(),
                    "Route template bound"
                );
                if !compiled.is_literal() {
                    self.scan_order.push(Ranked {
                        rank: (
                            Reverse(compiled.literal_prefix_len()),
                            Reverse(compiled.literal_len()),
                            self.registered,
                        ),
                        template: entry.key().clone(),
                    });
                    self.scan_order.sort();
                }
                entry.insert(Route {
                    raw_pattern: path.to_string(),
                    template: compiled,
                    endpoints: HashMap::new(),
                })
            }
        };
        self.registered += 1;

        let endpoint = Endpoint {
            handler,
            interceptor,
            variables,
        };
        if route.endpoints.insert(method.clone(), endpoint).is_some() {
            warn!(
                method = %method,
                path = %path,
                template = %route.template.template(),
                "Replaced existing handler"
            );
        } else {
            debug!(method = %method, path = %path, "Handler registered");
        }
        Ok(())
    }

    /// Endpoint stored under an exact template string and method.
    #[must_use]
    pub fn lookup(&self, template: &str, method: &Method) -> Option<&Endpoint> {
        self.routes.get(template)?.endpoint(method)
    }

    /// Number of distinct templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes in resolution order: literal routes (by template), then
    /// variable-bearing routes in scan order.
    #[must_use]
    pub fn routes(&self) -> Vec<&Route> {
        let mut literal: Vec<&Route> = self
            .routes
            .values()
            .filter(|r| r.template.is_literal())
            .collect();
        literal.sort_by(|a, b| a.template.template().cmp(b.template.template()));
        literal.extend(
            self.scan_order
                .iter()
                .filter_map(|ranked| self.routes.get(&ranked.template)),
        );
        literal
    }

    /// Log every (method, path) binding at info level.
    pub fn dump_routes(&self) {
        for route in self.routes() {
            for method in route.methods() {
                info!(
                    method = %method,
                    path = %route.raw_pattern,
                    template = %route.template.template(),
                    "Route"
                );
            }
        }
    }

    /// Resolve a request to an endpoint and extract its path variables.
    ///
    /// Literal routes are tried first on the raw path and on the path with a
    /// trailing `/`. Variable-bearing templates are then scanned in priority
    /// order; the first one matching the path with a handler for `method`
    /// wins.
    ///
    /// # Errors
    ///
    /// [`RouteError::MethodNotAllowed`] if some template matches the path but
    /// none has a handler for `method`; [`RouteError::NotFound`] otherwise,
    /// including when extraction disagrees with the declared variables.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<RouteMatch<'_>, RouteError> {
        let normalized = ensure_trailing_slash(path);
        let mut allowed: Vec<Method> = Vec::new();

        let candidates = [path, normalized.as_ref()];
        let literal_keys = if normalized.as_ref() == path {
            &candidates[..1]
        } else {
            &candidates[..]
        };
        for key in literal_keys {
            let Some(route) = self.routes.get(*key) else {
                continue;
            };
            if !route.template.is_literal() {
                continue;
            }
            if let Some(endpoint) = route.endpoints.get(method) {
                debug!(method = %method, path = %path, template = %key, "Literal route matched");
                return Ok(RouteMatch {
                    route,
                    endpoint,
                    path_params: ParamVec::new(),
                });
            }
            allowed.extend(route.endpoints.keys().cloned());
        }

        for ranked in &self.scan_order {
            let Some(route) = self.routes.get(&ranked.template) else {
                continue;
            };
            if !route.template.matches(&normalized) {
                continue;
            }
            let Some(endpoint) = route.endpoints.get(method) else {
                allowed.extend(route.endpoints.keys().cloned());
                continue;
            };
            let Some(path_params) =
                extract_path_params(route.template.template(), endpoint.variables(), &normalized)
            else {
                warn!(
                    method = %method,
                    path = %path,
                    template = %ranked.template,
                    variables = ?endpoint.variables(),
                    "Path variable count does not match template"
                );
                return Err(RouteError::NotFound {
                    method: method.clone(),
                    path: path.to_string(),
                });
            };
            debug!(
                method = %method,
                path = %path,
                template = %ranked.template,
                path_params = ?path_params,
                "Route matched"
            );
            return Ok(RouteMatch {
                route,
                endpoint,
                path_params,
            });
        }

        if allowed.is_empty() {
            warn!(method = %method, path = %path, "No route matched");
            Err(RouteError::NotFound {
                method: method.clone(),
                path: path.to_string(),
            })
        } else {
            allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            allowed.dedup();
            warn!(method = %method, path = %path, allowed = ?allowed, "Method not allowed");
            Err(RouteError::MethodNotAllowed {
                method: method.clone(),
                path: path.to_string(),
                allowed,
            })
        }
    }
}

/// Read variable values positionally from `path`.
///
/// Both strings are split on `/`; wherever the template segment is the
/// variable token the request segment at the same index is taken, skipping
/// empty ones. Returns `None` when the number of values differs from
/// `variables`.
pub(crate) fn extract_path_params(
    template: &str,
    variables: &[Arc<str>],
    path: &str,
) -> Option<ParamVec> {
    let request_segments: SmallVec<[&str; 16]> = path.split('/').collect();
    let values: SmallVec<[&str; MAX_INLINE_PARAMS]> = template
        .split('/')
        .enumerate()
        .filter(|(_, segment)| *segment == VARIABLE_TOKEN)
        .filter_map(|(idx, _)| request_segments.get(idx).copied())
        .filter(|value| !value.is_empty())
        .collect();

    if values.len() != variables.len() {
        return None;
    }

    Some(
        variables
            .iter()
            .zip(values)
            .map(|(name, value)| (Arc::clone(name), value.to_string()))
            .collect(),
    )
}
