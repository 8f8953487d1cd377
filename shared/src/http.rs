use http::Version;
use http::header::{
    CONNECTION, HeaderMap, HeaderName, HeaderValue, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE,
    TRAILER, TRANSFER_ENCODING, UPGRADE, VIA,
};
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response};
use hyper_util::rt::TokioExecutor;
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

const PROXY_NAME: &str = "giver";

const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");

static HOP_BY_HOP_NAMES: &[HeaderName] = &[
    CONNECTION,
    TRANSFER_ENCODING,
    TE,
    TRAILER,
    UPGRADE,
    PROXY_AUTHORIZATION,
    PROXY_AUTHENTICATE,
];

pub async fn run_http_service<S, E>(
    host: &str,
    port: u16,
    tls: Option<TlsAcceptor>,
    service: S,
) -> Result<(), E>
where
    S: Service<Request<Incoming>, Response = Response<BoxBody<Bytes, E>>, Error = E>
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
    E: From<std::io::Error> + std::error::Error + Send + Sync + 'static,
{
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    tracing::info!(host, port, tls = tls.is_some(), "listening");
    serve(listener, tls, service).await
}

/// Serves connections accepted on an already bound listener. Split out from
/// [`run_http_service`] so callers can bind port 0 and learn the address first.
/// With an acceptor, every connection completes a TLS handshake first; a
/// failed handshake only drops that connection.
pub async fn serve<S, E>(
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    service: S,
) -> Result<(), E>
where
    S: Service<Request<Incoming>, Response = Response<BoxBody<Bytes, E>>, Error = E>
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
    E: From<std::io::Error> + std::error::Error + Send + Sync + 'static,
{
    let service_arc = Arc::new(service);

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let _ = stream.set_nodelay(true);
        let svc = service_arc.clone();
        let tls = tls.clone();

        tokio::spawn(async move {
            match tls {
                Some(acceptor) => match acceptor.accept(stream).await {
                    Ok(stream) => serve_connection(TokioIo::new(stream), svc).await,
                    Err(e) => tracing::debug!(%peer_addr, error = %e, "TLS handshake failed"),
                },
                None => serve_connection(TokioIo::new(stream), svc).await,
            }
        });
    }
}

async fn serve_connection<I, S, E>(io: I, svc: Arc<S>)
where
    I: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
    S: Service<Request<Incoming>, Response = Response<BoxBody<Bytes, E>>, Error = E>
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    // auto-detect h1/h2 on this connection
    if let Err(e) = Builder::new(TokioExecutor::new())
        .serve_connection(io, svc)
        .await
    {
        tracing::debug!(error = %e, "connection closed with error");
    }
}

pub fn is_http1(v: Version) -> bool {
    matches!(v, Version::HTTP_09 | Version::HTTP_10 | Version::HTTP_11)
}

/// Adds a Via header to indicate the request passed through this gateway.
/// Appends to existing if Via is already present.
pub fn add_via_header(headers: &mut HeaderMap, version: Version) {
    let version_str = match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_11 => "1.1",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => {
            tracing::warn!(?version, "unknown HTTP version, skipping Via header");
            return;
        }
    };

    let via_value = format!("{version_str} {PROXY_NAME}");

    let combined = match headers.get(VIA).map(|v| v.to_str()) {
        Some(Ok(existing)) => format!("{existing}, {via_value}"),
        Some(Err(_)) => return,
        None => via_value,
    };
    if let Ok(new_value) = HeaderValue::from_str(&combined) {
        headers.insert(VIA, new_value);
    }
}

/// Strips hop-by-hop headers from an HTTP/1.x message before it is forwarded:
/// the fixed set, every header named in any `Connection` value, and
/// `Keep-Alive`. HTTP/2 and later carry no hop-by-hop headers.
pub fn filter_hop_by_hop(headers: &mut HeaderMap, version: Version) -> &mut HeaderMap {
    if !is_http1(version) {
        return headers;
    }

    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in HOP_BY_HOP_NAMES.iter().chain(&listed) {
        headers.remove(name);
    }
    headers.remove(KEEP_ALIVE);

    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use http::header::CONTENT_TYPE;
    use http_body_util::{BodyExt, Full};

    #[test]
    fn test_filter_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive, custom"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert("cusTOM", HeaderValue::from_static("some-value"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));

        let filtered = filter_hop_by_hop(&mut headers, Version::HTTP_11);

        assert_eq!(filtered.len(), 1);
        assert_eq!(
            filtered.get(CONTENT_TYPE),
            Some(&HeaderValue::from_static("application/json"))
        );
        assert!(filtered.get(CONNECTION).is_none());
        assert!(filtered.get(TRANSFER_ENCODING).is_none());
        // listed in the Connection header value, matched case-insensitively
        assert!(filtered.get("keep-alive").is_none());
        assert!(filtered.get("custom").is_none());
    }

    #[test]
    fn test_filter_every_connection_value() {
        let mut headers = HeaderMap::new();
        headers.append(CONNECTION, HeaderValue::from_static("x-first"));
        headers.append(CONNECTION, HeaderValue::from_static(" x-second ,"));
        headers.insert("x-first", HeaderValue::from_static("1"));
        headers.insert("x-second", HeaderValue::from_static("2"));
        headers.insert("x-kept", HeaderValue::from_static("3"));
        headers.insert(UPGRADE, HeaderValue::from_static("websocket"));

        let filtered = filter_hop_by_hop(&mut headers, Version::HTTP_10);
        assert_eq!(filtered.len(), 1);
        assert!(filtered.get("x-kept").is_some());
    }

    #[test]
    fn test_http2_headers_untouched() {
        let mut headers = HeaderMap::new();
        headers.insert(TE, HeaderValue::from_static("trailers"));

        let filtered = filter_hop_by_hop(&mut headers, Version::HTTP_2);
        assert!(filtered.get(TE).is_some());
    }

    #[test]
    fn test_via_header() {
        let mut headers = HeaderMap::new();
        add_via_header(&mut headers, Version::HTTP_11);
        assert_eq!(headers.get(VIA).unwrap(), "1.1 giver");

        add_via_header(&mut headers, Version::HTTP_2);
        assert_eq!(headers.get(VIA).unwrap(), "1.1 giver, 2 giver");
    }

    #[tokio::test]
    async fn test_serve_over_tls() {
        let files = crate::tls::tests::self_signed();
        let acceptor = crate::tls::load_acceptor(files.cert.path(), files.key.path()).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let service = hyper::service::service_fn(|_req: Request<Incoming>| async {
            Ok::<_, std::io::Error>(Response::new(
                Full::new(Bytes::from("ok\n")).map_err(|e| match e {}).boxed(),
            ))
        });
        tokio::spawn(serve(listener, Some(acceptor), service));

        // A client that never completes the handshake does not stop the listener.
        let mut plain = tokio::net::TcpStream::connect(addr).await.unwrap();
        tokio::io::AsyncWriteExt::write_all(&mut plain, b"GET / HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        drop(plain);

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .unwrap();
        let response = client
            .get(format!("https://{addr}/"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "ok\n");
    }
}
