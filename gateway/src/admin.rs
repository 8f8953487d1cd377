//! Probe endpoints served on the optional admin listener.

use crate::api::utils::{GatewayBody, text_response};
use crate::errors::GatewayError;
use http::StatusCode;
use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{Request, Response};
use mappings::MappingStore;
use std::pin::Pin;

/// `/health` answers as long as the process serves requests. `/ready` waits
/// for the mapping store to hold authoritative data: immediately for static
/// mappings, after the first applied snapshot when synchronized.
#[derive(Clone)]
pub struct AdminService {
    store: MappingStore,
}

impl AdminService {
    pub fn new(store: MappingStore) -> Self {
        AdminService { store }
    }

    pub fn respond(&self, path: &str) -> Result<Response<GatewayBody>, GatewayError> {
        match path {
            "/health" => text_response(StatusCode::OK, "ok\n"),
            "/ready" if self.store.is_ready() => text_response(StatusCode::OK, "ok\n"),
            "/ready" => text_response(StatusCode::SERVICE_UNAVAILABLE, "Mappings not loaded\n"),
            _ => text_response(StatusCode::NOT_FOUND, "Not Found\n"),
        }
    }
}

impl Service<Request<Incoming>> for AdminService {
    type Response = Response<GatewayBody>;
    type Error = GatewayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let response = self.respond(req.uri().path());
        Box::pin(async move { response })
    }
}
