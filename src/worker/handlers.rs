use super::protocol::*;
use super::service::{Worker, parse_payload};
use crate::error::WorkerError;

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::{HeaderMap, Method, StatusCode, Uri, Version};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use futures::StreamExt;
use std::io;
use std::sync::Arc;

/// Upper bound on a request body handed to the unit of work.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

fn okay() -> Response {
    (StatusCode::OK, BODY_OKAY).into_response()
}

/// Offers every request to the configured unit of work before the built-in routes.
///
/// The body is buffered so it can be handed back to the router when the strategy
/// does not handle the path.
pub async fn offer_to_unit_of_work(
    Extension(worker): Extension<Arc<Worker>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(uow) = worker.uow().await else {
        return next.run(request).await;
    };

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to read request body: {}", e);
            return WorkerError::MalformedPayload(e.to_string()).into_response();
        }
    };

    if let Some(response) = uow.handle_endpoint(&worker, parts.uri.path(), &bytes).await {
        tracing::trace!("{} handled by {}", parts.uri.path(), uow.name());
        return response;
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

pub async fn handle_shard_config(
    Extension(worker): Extension<Arc<Worker>>,
    body: Bytes,
) -> Response {
    let req: ShardConfigRequest = match parse_payload(&body) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };

    match worker.configure(req.credential, &req.strategy_id).await {
        Ok(()) => okay(),
        Err(e) => e.into_response(),
    }
}

/// Acknowledges first, then checks the credential and stops the serving loop after
/// the configured delay so the `Goodbye` is delivered before the server goes away.
pub async fn handle_shard_stop(
    Extension(worker): Extension<Arc<Worker>>,
    body: Bytes,
) -> Response {
    // A malformed body falls through to the credential mismatch path
    let req: CredentialRequest = serde_json::from_slice(&body).unwrap_or_default();
    let delay = worker.settings().stop_delay;

    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        worker.request_stop(&req.credential).await;
    });

    (StatusCode::OK, BODY_GOODBYE).into_response()
}

pub async fn handle_ring_init(
    Extension(worker): Extension<Arc<Worker>>,
    body: Bytes,
) -> Response {
    let req: RingInitRequest = match parse_payload(&body) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };

    match worker.ring_init(&req.credential, req.ring).await {
        Ok(()) => okay(),
        Err(e) => e.into_response(),
    }
}

/// `ring/add` and `ring/del`: authorized acknowledgements, membership is not mutated.
pub async fn handle_ring_change(
    Extension(worker): Extension<Arc<Worker>>,
    uri: Uri,
    body: Bytes,
) -> Response {
    if let Err(e) = worker.authorize_payload(&body).await {
        return e.into_response();
    }

    tracing::info!(
        "Ignoring ring membership change at {}: {}",
        uri.path(),
        String::from_utf8_lossy(&body)
    );
    okay()
}

/// Acknowledges with `Bokay` once the current phase has ended.
///
/// The status line goes out at once; the body is held back until the phase ends, so a
/// caller reading the body is parked exactly as long as the barrier requires.
pub async fn handle_queue_wait(
    Extension(worker): Extension<Arc<Worker>>,
    body: Bytes,
) -> Response {
    if let Err(e) = worker.authorize_payload(&body).await {
        return e.into_response();
    }

    let released = futures::stream::once(async move {
        tokio::select! {
            _ = worker.queue_wait() => Ok(Bytes::from_static(BODY_OKAY.as_bytes())),
            _ = worker.force_closed() => Err(cut_off(ENDPOINT_QUEUE_WAIT)),
        }
    });

    (StatusCode::OK, Body::from_stream(released)).into_response()
}

/// Streams `join queue...` right away and `done` once the task queue has drained.
pub async fn handle_queue_join(
    Extension(worker): Extension<Arc<Worker>>,
    body: Bytes,
) -> Response {
    if let Err(e) = worker.authorize_payload(&body).await {
        return e.into_response();
    }

    let started = futures::stream::once(async {
        Ok::<Bytes, io::Error>(Bytes::from_static(BODY_JOIN_STARTED.as_bytes()))
    });
    let drained = futures::stream::once(async move {
        tokio::select! {
            _ = worker.queue_join() => {
                tracing::debug!("Task queue drained");
                Ok(Bytes::from_static(BODY_JOIN_DONE.as_bytes()))
            }
            _ = worker.force_closed() => Err(cut_off(ENDPOINT_QUEUE_JOIN)),
        }
    });

    (StatusCode::OK, Body::from_stream(started.chain(drained))).into_response()
}

/// Body error that makes hyper abort the connection of a caller still parked on a
/// barrier when the shard is torn down.
fn cut_off(path: &str) -> io::Error {
    tracing::warn!("Shard stopped while a caller was parked on {}", path);
    io::Error::new(io::ErrorKind::ConnectionAborted, "shard stopped")
}

/// `check/persist` and `check/recover`: checkpoint hooks, acknowledged without effect.
pub async fn handle_checkpoint(uri: Uri, body: Bytes) -> Response {
    tracing::info!(
        "Checkpoint hook {} not implemented, payload: {}",
        uri.path(),
        String::from_utf8_lossy(&body)
    );
    okay()
}

/// Dumps the request environment and the shard's status as plain text.
pub async fn handle_info(
    Extension(worker): Extension<Arc<Worker>>,
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
) -> Response {
    let mut dump = format!("method: {}\r\nuri: {}\r\nversion: {:?}\r\n", method, uri, version);

    for (name, value) in headers.iter() {
        dump.push_str(&format!(
            "header {}: {}\r\n",
            name,
            value.to_str().unwrap_or("<binary>")
        ));
    }

    match serde_json::to_string(&worker.status().await) {
        Ok(status) => dump.push_str(&format!("status: {}\r\n", status)),
        Err(e) => tracing::error!("Failed to serialize shard status: {}", e),
    }

    (StatusCode::OK, dump).into_response()
}

pub async fn handle_not_found(uri: Uri) -> Response {
    tracing::debug!("No route for {}", uri.path());
    WorkerError::UnroutedRequest(uri.path().to_string()).into_response()
}
