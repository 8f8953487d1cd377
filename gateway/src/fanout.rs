//! Streams one inbound request body to every sink of its path.
//!
//! Each sink gets its own detached outbound request whose body is fed from a
//! bounded channel. The inbound body is read frame by frame and every data
//! chunk is handed to all sinks that are still open before the next frame is
//! read, so each sink sees the chunks in the order the caller sent them and
//! memory stays at one in-flight copy per chunk. Sink outcomes are only
//! logged and counted; nothing is relayed back to the caller.

use crate::config::Config;
use crate::error_cache::ErrorCache;
use crate::errors::GatewayError;
use crate::metrics_defs::SINK_DURATION;
use bytes::Bytes;
use futures::future::join_all;
use http::header::{HOST, HeaderValue};
use http::request::Parts;
use http_body_util::BodyExt;
use hyper::body::Body;
use mappings::{ResolvedSink, Target};
use shared::histogram;
use shared::http::{add_via_header, filter_hop_by_hop};
use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::task::AbortHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

#[derive(thiserror::Error, Debug)]
enum SinkError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("no response within {0:?} after end of body")]
    ResponseTimeout(Duration),
}

/// Write side of one outbound sink request.
struct SinkWriter {
    sink: String,
    tx: mpsc::Sender<Bytes>,
    // Dropped together with `tx`; tells the request task the body is complete.
    _body_done: oneshot::Sender<()>,
    request: Option<AbortHandle>,
}

impl SinkWriter {
    fn new(
        sink: String,
        tx: mpsc::Sender<Bytes>,
        body_done: oneshot::Sender<()>,
        request: Option<AbortHandle>,
    ) -> Self {
        SinkWriter {
            sink,
            tx,
            _body_done: body_done,
            request,
        }
    }

    /// Drops the outbound connection without completing its body.
    fn abort(&self) {
        if let Some(request) = &self.request {
            request.abort();
        }
    }
}

pub struct FanOut {
    client: reqwest::Client,
    errors: Arc<ErrorCache>,
    sink_timeout: Duration,
    buffer_chunks: usize,
}

impl FanOut {
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        let sink_timeout = Duration::from_secs(config.sink_timeout_secs);
        let client = reqwest::Client::builder()
            .connect_timeout(sink_timeout)
            .build()?;

        Ok(FanOut {
            client,
            errors: Arc::new(ErrorCache::new(config.error_cache_capacity)),
            sink_timeout,
            buffer_chunks: config.sink_buffer_chunks,
        })
    }

    pub fn errors(&self) -> &ErrorCache {
        &self.errors
    }

    /// Opens one outbound request per resolvable sink and streams `body` to
    /// all of them. Returns the number of sinks opened once the whole body has
    /// been handed over and every sink's body has been closed. Unresolvable
    /// sinks are skipped silently.
    pub async fn dispatch<B>(
        &self,
        request_id: u64,
        parts: &Parts,
        body: B,
        sinks: &[ResolvedSink],
    ) -> Result<usize, GatewayError>
    where
        B: Body<Data = Bytes>,
        B::Error: Display,
    {
        let writers: Vec<SinkWriter> = sinks
            .iter()
            .filter_map(|sink| {
                let target = sink.target.as_ref()?;
                Some(self.open(request_id, parts, &sink.uri, target))
            })
            .collect();
        let opened = writers.len();

        pump(body, writers, self.sink_timeout, &self.errors).await?;
        Ok(opened)
    }

    fn open(&self, request_id: u64, parts: &Parts, sink: &str, target: &Target) -> SinkWriter {
        let (tx, rx) = mpsc::channel::<Bytes>(self.buffer_chunks);
        let (body_done, body_done_rx) = oneshot::channel();

        let mut headers = parts.headers.clone();
        filter_hop_by_hop(&mut headers, parts.version);
        add_via_header(&mut headers, parts.version);
        match HeaderValue::from_str(&target.host) {
            Ok(host) => {
                headers.insert(HOST, host);
            }
            Err(_) => {
                headers.remove(HOST);
            }
        }

        tracing::debug!(
            request_id,
            sink,
            method = %parts.method,
            host = %target.host,
            port = ?target.port,
            path = %target.path,
            "giving"
        );

        let body = reqwest::Body::wrap_stream(ReceiverStream::new(rx).map(Ok::<Bytes, Infallible>));
        let request = self
            .client
            .request(parts.method.clone(), target.url().clone())
            .headers(headers)
            .body(body);

        let errors = self.errors.clone();
        let response_timeout = self.sink_timeout;
        let task_sink = sink.to_string();
        let task = tokio::spawn(async move {
            let sink = task_sink;
            let started = Instant::now();
            match await_response(request.send(), body_done_rx, response_timeout).await {
                Ok(response) => {
                    tracing::info!(request_id, %sink, status = %response.status(), "sink responded");
                }
                Err(e) => {
                    let count = errors.record(&sink);
                    tracing::warn!(request_id, %sink, error = %e, errors = count, "outgoing error");
                }
            }
            histogram!(SINK_DURATION).record(started.elapsed().as_secs_f64());
            tracing::debug!(request_id, %sink, "gift given");
        });

        SinkWriter::new(sink.to_string(), tx, body_done, Some(task.abort_handle()))
    }
}

/// Waits for a sink's response. The upload itself has no overall deadline,
/// since the inbound body may be arbitrarily long; stalls while it streams are
/// bounded per chunk in [`pump`]. Once the body is complete the sink gets
/// `timeout` to answer.
async fn await_response<F, T>(
    send: F,
    body_done: oneshot::Receiver<()>,
    timeout: Duration,
) -> Result<T, SinkError>
where
    F: Future<Output = Result<T, reqwest::Error>>,
{
    let mut send = pin!(send);
    tokio::select! {
        result = &mut send => return Ok(result?),
        _ = body_done => {}
    }

    match tokio::time::timeout(timeout, send).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(SinkError::ResponseTimeout(timeout)),
    }
}

/// Copies every data frame of `body` to each open writer, in order, then
/// closes all writers. A writer whose request already finished is dropped
/// quietly; one that cannot take a chunk within `write_timeout` is aborted and
/// counted as a sink error. If the inbound body fails, every writer is aborted
/// so no sink sees a truncated body as complete.
async fn pump<B>(
    body: B,
    mut writers: Vec<SinkWriter>,
    write_timeout: Duration,
    errors: &ErrorCache,
) -> Result<(), GatewayError>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    let mut body = pin!(body);

    while let Some(frame) = body.frame().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                for writer in &writers {
                    writer.abort();
                }
                return Err(GatewayError::RequestBodyError(e.to_string()));
            }
        };
        // Trailers are not forwarded.
        let Ok(chunk) = frame.into_data() else {
            continue;
        };
        if chunk.is_empty() || writers.is_empty() {
            continue;
        }

        let results = join_all(
            writers
                .iter()
                .map(|writer| writer.tx.send_timeout(chunk.clone(), write_timeout)),
        )
        .await;

        let mut open = Vec::with_capacity(writers.len());
        for (writer, result) in writers.into_iter().zip(results) {
            match result {
                Ok(()) => open.push(writer),
                // The request already ended and reported its own outcome.
                Err(SendTimeoutError::Closed(_)) => {}
                Err(SendTimeoutError::Timeout(_)) => {
                    writer.abort();
                    let count = errors.record(&writer.sink);
                    tracing::warn!(sink = %writer.sink, errors = count, "sink write timed out");
                }
            }
        }
        writers = open;
    }

    // Dropping the senders ends each sink's body.
    drop(writers);
    Ok(())
}
