//! Liveness endpoint. Answers "process up", deliberately not "pipeline
//! healthy": the pipeline spends hours asleep by design and a monitor
//! must not restart it for that.

use std::io;
use std::net::SocketAddr;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

async fn alive() -> &'static str {
    "reelay alive"
}

fn router() -> Router {
    Router::new()
        .route("/", get(alive))
        .route("/health", get(alive))
}

/// Binds before spawning so that an unusable address (port taken,
/// privileged port) is a startup error instead of a silently dead task.
pub async fn spawn(addr: SocketAddr) -> io::Result<JoinHandle<io::Result<()>>> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "health endpoint listening");
    Ok(spawn_on(listener))
}

fn spawn_on(listener: TcpListener) -> JoinHandle<io::Result<()>> {
    tokio::spawn(async move { axum::serve(listener, router()).await })
}
