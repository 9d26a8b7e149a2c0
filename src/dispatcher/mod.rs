//! # Dispatcher Module
//!
//! The dispatcher turns a resolved route into a handler invocation.
//!
//! ## Overview
//!
//! For every request the dispatcher:
//! - Resolves the path and method against the [`RouteTable`](crate::router::RouteTable)
//! - Normalizes query, form, header and body data
//! - Runs the route's interceptor, if one is bound
//! - Invokes the handler and serializes its [`Reply`]
//!
//! ## Handlers
//!
//! A handler is anything implementing [`Handler`]; plain functions and
//! closures of type `Fn(HandlerRequest) -> HandlerResult` qualify.
//!
//! ```rust
//! use restroute::dispatcher::{Dispatcher, HandlerRequest, HandlerResult, Reply};
//! use restroute::error::ServiceError;
//! use restroute::router::RouteTable;
//! use restroute::server::IncomingRequest;
//!
//! fn get_user(req: HandlerRequest) -> HandlerResult {
//!     let id = req
//!         .get_path_param("id")
//!         .ok_or_else(|| ServiceError::bad_request("missing id"))?;
//!     Ok(Reply::json(serde_json::json!({ "id": id })))
//! }
//!
//! let mut routes = RouteTable::new();
//! routes.register("GET", "/users/{id}", get_user).unwrap();
//! let dispatcher = Dispatcher::new(routes);
//!
//! let reply = dispatcher.dispatch(&IncomingRequest::new("GET", "/users/42"));
//! assert_eq!(reply.status, 200);
//! assert_eq!(reply.body, br#"{"id":"42"}"#);
//! ```
//!
//! ## Error Handling
//!
//! - Unknown paths return 404, known paths with the wrong method 405
//! - Malformed JSON or form bodies return 400
//! - Handler panics are caught and return 500

mod core;

pub use core::{
    Dispatcher, Handler, HandlerRequest, HandlerResult, HeaderVec, Reply, MAX_INLINE_HEADERS,
};
