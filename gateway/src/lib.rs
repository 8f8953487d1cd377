pub mod admin;
pub mod api;
pub mod config;
pub mod error_cache;
pub mod errors;
pub mod fanout;
pub mod metrics_defs;
pub mod service;

use crate::admin::AdminService;
use crate::config::{Config, Listener};
use crate::errors::GatewayError;
use crate::service::GatewayService;
use mappings::{MappingBackend, MappingStore, RedisBackend, Registrar, Synchronizer};
use shared::http::run_http_service;
use shared::tls::load_acceptor;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

fn tls_acceptor(listener: &Listener) -> Result<Option<TlsAcceptor>, GatewayError> {
    match &listener.tls {
        Some(tls) => Ok(Some(load_acceptor(&tls.cert_path, &tls.key_path)?)),
        None => Ok(None),
    }
}

/// Runs the gateway until one of its tasks fails. Losing the connection to
/// the distributed mapping store is one such failure.
pub async fn run(config: Config) -> Result<(), GatewayError> {
    config.validate()?;
    let gateway_tls = tls_acceptor(&config.listener)?;
    let admin_tls = match &config.admin_listener {
        Some(listener) => tls_acceptor(listener)?,
        None => None,
    };

    shared::metrics_defs::describe(metrics_defs::ALL_METRICS);
    shared::metrics_defs::describe(mappings::metrics_defs::ALL_METRICS);

    let (store, registrar, synchronizer) = match &config.redis_url {
        Some(url) => {
            if !config.mappings.is_empty() {
                tracing::warn!(
                    paths = config.mappings.len(),
                    "static mappings are ignored when a redis store is configured"
                );
            }
            let backend: Arc<dyn MappingBackend> = Arc::new(RedisBackend::connect(url).await?);
            let store = MappingStore::new_synchronized();
            let synchronizer = Synchronizer::new(backend.clone(), store.clone());
            (store, Registrar::Distributed(backend), Some(synchronizer))
        }
        None => {
            tracing::info!(paths = config.mappings.len(), "using static mappings");
            let store = MappingStore::new_static(config.mappings.clone());
            (store.clone(), Registrar::Local(store), None)
        }
    };

    let gateway_service = GatewayService::new(&config, store.clone(), registrar)?;
    let gateway_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        gateway_tls,
        gateway_service,
    );

    let admin_task = async {
        match &config.admin_listener {
            Some(listener) => {
                let admin_service = AdminService::new(store);
                run_http_service(&listener.host, listener.port, admin_tls, admin_service).await
            }
            None => std::future::pending().await,
        }
    };

    let sync_task = async {
        match &synchronizer {
            Some(synchronizer) => synchronizer.run().await.map_err(GatewayError::from),
            None => std::future::pending().await,
        }
    };

    tokio::try_join!(gateway_task, admin_task, sync_task)?;
    Ok(())
}
