//! # Router Module
//!
//! Path template compilation, the route table and the request matcher.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling declared paths with `{name}` placeholders into templates
//! - Holding the (template, method) → endpoint table
//! - Matching incoming request paths to endpoints
//! - Extracting path variables from matched paths
//!
//! ## Architecture
//!
//! The router uses a two-phase approach:
//!
//! 1. **Compilation**: At registration, paths like `/api/{id}/items/{name}` become
//!    templates where each variable segment is a fixed token, with a trailing `/`
//!    enforced. The anchored regex for the template is compiled once and kept on
//!    the route.
//!
//! 2. **Matching**: For each request, literal routes are looked up directly.
//!    Variable-bearing templates are then tested in a fixed priority order
//!    (longest literal prefix first, then most literal text, then registration
//!    order), and variables are read positionally from the request path.
//!
//! ## Example
//!
//! ```rust
//! use restroute::dispatcher::{HandlerRequest, HandlerResult, Reply};
//! use restroute::router::RouteTable;
//! use http::Method;
//!
//! let mut table = RouteTable::new();
//! table
//!     .register("GET", "/api/{id}/items/{name}", |req: HandlerRequest| -> HandlerResult {
//!         Ok(Reply::json(req.path_params_map()))
//!     })
//!     .unwrap();
//!
//! let matched = table.resolve(&Method::GET, "/api/42/items/widget").unwrap();
//! assert_eq!(matched.get_path_param("id"), Some("42"));
//! assert_eq!(matched.get_path_param("name"), Some("widget"));
//! ```

mod core;
mod template;

pub use core::{Endpoint, ParamVec, Route, RouteMatch, RouteTable, MAX_INLINE_PARAMS};
pub use template::{compile_template, ensure_trailing_slash, CompiledTemplate, VARIABLE_TOKEN};
