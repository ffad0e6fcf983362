use crate::server::response::Response;
use crate::time::current_timestamp;
use crate::types::response::HealthResponse;

pub struct HealthzHandler;

impl HealthzHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self) -> Response {
        Response::json(HealthResponse {
            version: String::from(env!("CARGO_PKG_VERSION")),
            timestamp: current_timestamp(),
        })
    }
}
