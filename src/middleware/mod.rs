mod core;
mod cors;

pub use core::{Interceptor, InterceptorError, Session};
pub use cors::CorsPolicy;
