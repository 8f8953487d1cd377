use crate::api;
use crate::api::utils::{GatewayBody, text_response};
use crate::config::{Config, MAPPINGS_PATH};
use crate::errors::GatewayError;
use crate::fanout::FanOut;
use crate::metrics_defs::{FANOUT_REQUESTS, FANOUT_SINKS, FANOUT_UNMAPPED};
use http::StatusCode;
use hyper::body::{Body, Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response};
use mappings::{MappingStore, Registrar};
use shared::{counter, histogram};
use std::fmt::Display;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

struct Inner {
    register_path: String,
    store: MappingStore,
    registrar: Registrar,
    fanout: FanOut,
    next_request_id: AtomicU64,
}

/// Front door of the gateway. Requests to the registration path and to
/// `/mappings` are answered locally; every other path is fanned out to its
/// sinks.
#[derive(Clone)]
pub struct GatewayService {
    inner: Arc<Inner>,
}

impl GatewayService {
    pub fn new(
        config: &Config,
        store: MappingStore,
        registrar: Registrar,
    ) -> Result<Self, GatewayError> {
        Ok(GatewayService {
            inner: Arc::new(Inner {
                register_path: config.register_path.clone(),
                store,
                registrar,
                fanout: FanOut::new(config)?,
                next_request_id: AtomicU64::new(1),
            }),
        })
    }

    pub fn fanout(&self) -> &FanOut {
        &self.inner.fanout
    }

    pub async fn handle<B>(&self, req: Request<B>) -> Result<Response<GatewayBody>, GatewayError>
    where
        B: Body<Data = Bytes>,
        B::Error: Display + Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let path = req.uri().path();

        if path == self.inner.register_path {
            return api::registration::handle(&self.inner.registrar, req).await;
        }
        if path == MAPPINGS_PATH {
            return api::table::handle(&self.inner.store);
        }

        // Sinks and their targets are captured here; a refresh that lands
        // while the body is streaming does not change this request.
        let Some(sinks) = self.inner.store.lookup(path) else {
            counter!(FANOUT_UNMAPPED).increment(1);
            tracing::debug!(method = %req.method(), path, "no mapping");
            return text_response(StatusCode::NOT_FOUND, "No mapping\n");
        };

        let request_id = self.inner.next_request_id.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            request_id,
            method = %req.method(),
            path,
            sinks = sinks.len(),
            "gifting"
        );
        counter!(FANOUT_REQUESTS).increment(1);

        let (parts, body) = req.into_parts();
        match self
            .inner
            .fanout
            .dispatch(request_id, &parts, body, &sinks)
            .await
        {
            Ok(opened) => {
                histogram!(FANOUT_SINKS).record(opened as f64);
                text_response(StatusCode::OK, "ok\n")
            }
            Err(e) => {
                tracing::warn!(request_id, error = %e, "inbound body failed, sinks aborted");
                text_response(StatusCode::BAD_REQUEST, "Bad Request\n")
            }
        }
    }
}

impl Service<Request<Incoming>> for GatewayService {
    type Response = Response<GatewayBody>;
    type Error = GatewayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { service.handle(req).await })
    }
}
