use super::request::{read_request, IncomingRequest};
use super::response::{write_reply, HttpReply};
use crate::dispatcher::Dispatcher;
use crate::middleware::CorsPolicy;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;
use tracing::warn;

/// `may_minihttp` service: optional CORS wrapping around the dispatcher.
///
/// Cloned once per connection; the dispatcher is shared.
#[derive(Clone)]
pub struct AppService {
    pub dispatcher: Arc<Dispatcher>,
    pub cors: Option<CorsPolicy>,
}

impl AppService {
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            cors: None,
        }
    }

    #[must_use]
    pub fn with_cors(mut self, cors: CorsPolicy) -> Self {
        self.cors = Some(cors);
        self
    }

    /// Produce the reply for one request.
    #[must_use]
    pub fn handle(&self, req: &IncomingRequest) -> HttpReply {
        if let Some(cors) = &self.cors {
            if let Some(reply) = cors.preflight(req) {
                return reply;
            }
        }
        let mut reply = self.dispatcher.dispatch(req);
        if let Some(cors) = &self.cors {
            cors.apply(req, &mut reply);
        }
        reply
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let reply = match read_request(req) {
            Ok(incoming) => self.handle(&incoming),
            Err(e) => {
                warn!(error = %e, "Failed to read request body");
                HttpReply::text(400, e.to_string())
            }
        };
        write_reply(res, reply);
        Ok(())
    }
}
