//! # CLI Module
//!
//! Command-line entry points for the `restroute` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Serve the demo routes:
//!
//! ```bash
//! restroute serve                       # 0.0.0.0:$FUNCTIONS_CUSTOMHANDLER_PORT (9081)
//! restroute serve --addr 127.0.0.1:8080 --no-cors
//! ```
//!
//! ### `routes`
//!
//! Print every (method, path) binding in resolution order:
//!
//! ```bash
//! restroute routes
//! ```

mod commands;


pub use commands::{run_cli, write_routes, Cli, Commands};
