//! HTTP boundary: reading requests off `may_minihttp`, normalizing them for
//! handlers and writing replies back.

pub mod http_server;
pub mod multipart;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{
    normalize, parse_header_params, parse_query_params, IncomingRequest, NormalizeConfig,
    NormalizedRequest, DEFAULT_MAX_FORM_MEMORY,
};
pub use response::{serialize_reply, status_line, ContentType, HttpReply};
pub use service::AppService;
