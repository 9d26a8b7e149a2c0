//! # restroute
//!
//! **restroute** is a small HTTP request router for the `may` coroutine
//! runtime. Handlers are registered against path templates such as
//! `/users/{id}/posts/{post}`; incoming requests are matched, their query,
//! header, form and JSON inputs normalized, and the handler's value
//! serialized back as JSON.
//!
//! ## Architecture
//!
//! - **[`router`]** - Template compilation, the [`RouteTable`] and
//!   resolution with explicit priority
//! - **[`dispatcher`]** - Runs the interceptor and handler for a resolved
//!   route and turns the outcome into a reply
//! - **[`server`]** - `may_minihttp` glue: request capture, normalization,
//!   multipart parsing, response writing
//! - **[`middleware`]** - Per-route interceptors with typed sessions, and a
//!   CORS wrapper
//! - **[`methods`]** - Standard and WebDAV-style method names
//! - **[`error`]** - Registration and request-time error types
//! - **[`logging`]** / **[`runtime_config`]** - Environment-driven setup
//! - **[`demo`]** - A sample service exercising every routing feature
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as HttpServer<br/>(may_minihttp)
//!     participant Cors as CorsPolicy
//!     participant Dispatcher
//!     participant Table as RouteTable
//!     participant Interceptor
//!     participant Handler
//!
//!     Client->>Server: GET /users/42?x=1
//!     Server->>Cors: preflight?
//!     alt OPTIONS + Access-Control-Request-Method
//!         Cors-->>Client: 204 + allow headers
//!     end
//!     Server->>Dispatcher: dispatch(IncomingRequest)
//!     Dispatcher->>Table: resolve(GET, "/users/42")
//!     alt No template matches
//!         Table-->>Client: 404 / 405
//!     end
//!     Dispatcher->>Dispatcher: normalize query, headers,<br/>form, JSON body
//!     opt Route has an interceptor
//!         Dispatcher->>Interceptor: intercept(&HandlerRequest)
//!         alt Err / Ok(None)
//!             Interceptor-->>Client: status from error / 403
//!         end
//!     end
//!     Dispatcher->>Handler: handler(HandlerRequest)
//!     Handler-->>Dispatcher: Reply / ServiceError
//!     Dispatcher-->>Client: 200 JSON or text error
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use restroute::dispatcher::{Dispatcher, HandlerRequest, HandlerResult, Reply};
//! use restroute::methods::GET;
//! use restroute::router::RouteTable;
//! use restroute::server::{AppService, HttpServer};
//!
//! fn hello(req: HandlerRequest) -> HandlerResult {
//!     Ok(Reply::json(req.path_params_map()))
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut routes = RouteTable::new();
//!     routes.register(GET, "/hello/{name}", hello)?;
//!     let service = AppService::new(Dispatcher::new(routes));
//!     let handle = HttpServer(service).start("127.0.0.1:8080")?;
//!     handle.join().map_err(|e| anyhow::anyhow!("{e:?}"))
//! }
//! ```
//!
//! ## Runtime Considerations
//!
//! restroute runs on `may`, not tokio. Each connection is served on its own
//! coroutine and handlers run inline on it, so blocking calls block that
//! connection only. Coroutine stack size is set from `RESTROUTE_STACK_SIZE`
//! by the `serve` command; embedders call `may::config().set_stack_size`
//! themselves.

pub mod cli;
pub mod demo;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod methods;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod server;

pub use dispatcher::{Dispatcher, HandlerRequest, HandlerResult, Reply};
pub use error::{RegisterError, RouteError, ServiceError};
pub use ids::RequestId;
pub use middleware::{CorsPolicy, Interceptor, InterceptorError, Session};
pub use router::RouteTable;
pub use server::{AppService, HttpServer, ServerHandle};
