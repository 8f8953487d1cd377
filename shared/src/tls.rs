//! Server-side TLS for listeners configured with a certificate chain and key.

use std::path::Path;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls;
use tokio_rustls::rustls::pki_types::pem::{self, PemObject};
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};

#[derive(thiserror::Error, Debug)]
pub enum TlsError {
    #[error("could not read {kind} from {path}: {source}")]
    Pem {
        kind: &'static str,
        path: String,
        source: pem::Error,
    },
    #[error("no certificates found in {0}")]
    NoCertificates(String),
    #[error("invalid TLS configuration: {0}")]
    Rustls(#[from] rustls::Error),
}

/// Builds an acceptor from PEM files: a certificate chain, leaf first, and
/// its private key.
pub fn load_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor, TlsError> {
    let certs = CertificateDer::pem_file_iter(cert_path)
        .map_err(pem_error("certificates", cert_path))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(pem_error("certificates", cert_path))?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates(cert_path.display().to_string()));
    }
    let key = PrivateKeyDer::from_pem_file(key_path).map_err(pem_error("private key", key_path))?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;

    tracing::info!(cert = %cert_path.display(), "loaded TLS certificate");
    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn pem_error(kind: &'static str, path: &Path) -> impl FnOnce(pem::Error) -> TlsError + use<> {
    let path = path.display().to_string();
    move |source| TlsError::Pem { kind, path, source }
}
