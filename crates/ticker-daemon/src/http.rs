//! HTTP API for the renderer and the operator panel.
//!
//! Reads are served straight from the published snapshot; every write is
//! forwarded to the core as a [`Command`] and answered with 202 once queued.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use ticker_proto::protocol::Command;
use ticker_proto::state::StateManager;

use crate::core::CoreEvent;

#[derive(Clone)]
pub struct ApiState {
    pub state_manager: Arc<StateManager>,
    pub event_tx: mpsc::Sender<CoreEvent>,
}

#[derive(Debug, Serialize)]
struct NewsView {
    text: String,
    is_breaking_mode: bool,
    breaking_title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TopicBody {
    topic: String,
    #[serde(default = "default_count")]
    count: u32,
}

fn default_count() -> u32 {
    5
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/news", get(get_news))
        .route("/api/breaking/toggle", post(toggle_breaking))
        .route("/api/breaking/topic", post(request_topic))
        .route("/api/panel/open", post(open_panel))
        .route("/api/panel/close", post(close_panel))
        .route("/api/refresh", post(refresh))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub fn start_server(
    bind_address: String,
    port: u16,
    state_manager: Arc<StateManager>,
    event_tx: mpsc::Sender<CoreEvent>,
) -> tokio::task::JoinHandle<()> {
    let app = router(ApiState {
        state_manager,
        event_tx,
    });

    tokio::spawn(async move {
        let addr = format!("{}:{}", bind_address, port);
        let listener = match tokio::net::TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                warn!("Failed to bind HTTP API on {}: {}", addr, e);
                return;
            }
        };
        info!("HTTP API listening on http://{}", addr);
        if let Err(e) = axum::serve(listener, app).await {
            warn!("HTTP API error: {}", e);
        }
    })
}

async fn get_state(State(api): State<ApiState>) -> impl IntoResponse {
    Json(api.state_manager.get_state().await)
}

async fn get_news(State(api): State<ApiState>) -> impl IntoResponse {
    let snapshot = api.state_manager.get_state().await;
    Json(NewsView {
        text: snapshot.news_text,
        is_breaking_mode: snapshot.is_breaking_mode,
        breaking_title: snapshot.breaking_title,
    })
}

async fn send(api: &ApiState, cmd: Command) -> Response {
    match api.event_tx.send(CoreEvent::Command(cmd)).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "core is not running").into_response(),
    }
}

async fn toggle_breaking(State(api): State<ApiState>) -> Response {
    send(&api, Command::ToggleBreaking).await
}

async fn request_topic(State(api): State<ApiState>, Json(body): Json<TopicBody>) -> Response {
    if body.topic.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "topic must not be empty").into_response();
    }
    send(
        &api,
        Command::RequestTopic {
            topic: body.topic,
            count: body.count,
        },
    )
    .await
}

async fn open_panel(State(api): State<ApiState>) -> Response {
    send(&api, Command::OpenManualPanel).await
}

async fn close_panel(State(api): State<ApiState>) -> Response {
    send(&api, Command::CloseManualPanel).await
}

async fn refresh(State(api): State<ApiState>) -> Response {
    send(&api, Command::Refresh).await
}
