//! HTTP surface
//!
//! Minimal health endpoint for liveness probes; everything else the daemon
//! does goes out through webhooks, not in through HTTP.

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;

async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}

pub fn router() -> Router {
    Router::new().route("/ping", get(ping))
}

/// Serve the health router until the process exits.
pub async fn serve(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "http server listening");
    axum::Server::bind(&addr)
        .serve(router().into_make_service())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ping_answers_pong() {
        let Json(body) = ping().await;
        assert_eq!(body["message"], "pong");
    }

    #[test]
    fn router_builds() {
        let _ = router();
    }
}
