//! HTTP surface: platform webhooks plus a small health/listing API.
//!
//! Webhooks always acknowledge with a generic 200 — replies are sent
//! out of band through the channel so a slow AI call can't make the
//! platform retry the delivery.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use serde_json::json;
use tally_core::traits::Channel;
use tally_store::Store;
use tracing::{error, warn};

use crate::router::Router;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router>,
    pub channels: HashMap<String, Arc<dyn Channel>>,
    pub store: Store,
}

pub fn build(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/health", get(health))
        .route("/users", get(list_users))
        .route("/webhook/:platform", post(webhook))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_users(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_users().await {
        Ok(users) => Json(users).into_response(),
        Err(e) => {
            error!("api: failed to list users: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// One endpoint per platform; the payload shape is the channel's concern.
async fn webhook(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let Some(channel) = state.channels.get(&platform).cloned() else {
        warn!("api: webhook for unknown platform {platform}");
        return (StatusCode::OK, "ok");
    };

    match channel.parse_webhook(&body) {
        Ok(Some(inbound)) => {
            // Acknowledge now, reply out of band.
            let router = state.router.clone();
            tokio::spawn(async move {
                let chat_id = inbound.chat_id.clone();
                let response = router.handle(&inbound).await;
                if let Err(e) = channel.send(&chat_id, &response).await {
                    error!("api: failed to send {platform} reply to {chat_id}: {e}");
                }
            });
        }
        Ok(None) => {}
        Err(e) => warn!("api: unparseable {platform} webhook: {e}"),
    }

    (StatusCode::OK, "ok")
}
