//! HTTP serving loop of a worker.

use super::handlers::*;
use super::protocol::*;
use super::service::Worker;

use anyhow::Result;
use axum::routing::any;
use axum::{Extension, Router, middleware};
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builds the worker's router. Unit-of-work routes are offered first by the middleware;
/// anything neither it nor the table below handles is a 404.
///
/// Built-in routes dispatch on the path alone, whatever the method.
pub fn router(worker: Arc<Worker>) -> Router {
    Router::new()
        .route(ENDPOINT_SHARD_CONFIG, any(handle_shard_config))
        .route(ENDPOINT_SHARD_STOP, any(handle_shard_stop))
        .route(ENDPOINT_RING_INIT, any(handle_ring_init))
        .route(ENDPOINT_RING_ADD, any(handle_ring_change))
        .route(ENDPOINT_RING_DEL, any(handle_ring_change))
        .route(ENDPOINT_QUEUE_WAIT, any(handle_queue_wait))
        .route(ENDPOINT_QUEUE_JOIN, any(handle_queue_join))
        .route(ENDPOINT_CHECK_PERSIST, any(handle_checkpoint))
        .route(ENDPOINT_CHECK_RECOVER, any(handle_checkpoint))
        .route(ENDPOINT_INFO, any(handle_info))
        .fallback(handle_not_found)
        .layer(middleware::from_fn(offer_to_unit_of_work))
        .layer(Extension(worker))
}

/// Serves `worker` on `listener` until a matching `shard/stop` arrives.
///
/// New connections stop being accepted as soon as the stop is accepted. Callers still
/// parked on a barrier after `force_close_after` have their connection aborted by the
/// barrier handlers, and the serving loop returns without waiting on them.
pub async fn serve(worker: Arc<Worker>, listener: TcpListener) -> Result<()> {
    let addr = listener.local_addr()?;

    tracing::info!("Worker service listening on {}", addr);

    let server = axum::serve(listener, router(worker.clone()))
        .with_graceful_shutdown(worker.stopped())
        .into_future();

    tokio::select! {
        result = server => result?,
        _ = worker.force_closed() => {
            tracing::warn!("Dropping connections still open on {}", addr);
        }
    }

    tracing::info!("Worker service on {} stopped", addr);
    Ok(())
}

/// Binds the configured address and serves until stopped.
pub async fn run(worker: Arc<Worker>) -> Result<()> {
    let listener = TcpListener::bind(worker.settings().bind_addr).await?;
    serve(worker, listener).await
}
