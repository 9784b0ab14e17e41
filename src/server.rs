use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Json},
    routing::{get, post},
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::{
    error::AppError,
    event::{self, EventKind, EventRecord, Normalized},
    signature::verify_signature,
    store::EventStore,
};

const INDEX_HTML: &str = include_str!("../static/index.html");
const SCRIPT_JS: &str = include_str!("../static/script.js");

pub struct AppState {
    pub store: EventStore,
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub message: &'static str,
}

impl WebhookResponse {
    const fn new(message: &'static str) -> Json<Self> {
        Json(Self { message })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/static/script.js", get(script))
        .route("/events", get(list_events))
        .route("/webhook", post(handle_webhook))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn check_signature(secret: &str, headers: &HeaderMap, body: &[u8]) -> Result<(), AppError> {
    let Some(signature) = headers.get("x-hub-signature-256") else {
        warn!("Missing webhook signature");
        return Err(AppError::MissingSignature);
    };
    let signature = signature.to_str().map_err(|_| AppError::InvalidSignature)?;
    if !verify_signature(secret, body, signature) {
        warn!("Invalid webhook signature");
        return Err(AppError::InvalidSignature);
    }
    Ok(())
}

async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    // Runs before the event type is read, so with a secret set an unsigned
    // `ping` gets 401. GitHub signs pings like any other delivery.
    if let Some(secret) = &state.webhook_secret {
        check_signature(secret, &headers, &body)?;
    }

    let event_type = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    info!("Received {} event", event_type);

    let kind: EventKind = event_type.parse().map_err(|e| {
        error!("{}", e);
        AppError::from(e)
    })?;

    if kind == EventKind::Ping {
        info!("Received ping event - webhook is configured correctly!");
        return Ok(WebhookResponse::new("Ping received"));
    }

    let payload: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        error!("Failed to parse webhook payload: {}", e);
        AppError::MalformedPayload(e.to_string())
    })?;

    let normalized = event::normalize(kind, payload).map_err(|e| {
        error!("Webhook error: {}", e);
        AppError::from(e)
    })?;

    match normalized {
        Normalized::Record(record) => {
            state.store.append(&record).await?;
            info!("{}", record.describe());
            Ok(WebhookResponse::new("Event processed"))
        }
        Normalized::Ignored => {
            debug!("Ignored {} event", kind);
            Ok(WebhookResponse::new("Event ignored"))
        }
    }
}

async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<EventRecord>>, AppError> {
    let events = state.store.list_all().await?;
    debug!("Fetched events: {}", events.len());
    Ok(Json(events))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn script() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/javascript")], SCRIPT_JS)
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.count().await {
        Ok(events) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "service": "gh-event-log",
                "version": env!("CARGO_PKG_VERSION"),
                "events": events
            })),
        ),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unhealthy",
                    "service": "gh-event-log",
                    "version": env!("CARGO_PKG_VERSION"),
                    "error": e.to_string()
                })),
            )
        }
    }
}
