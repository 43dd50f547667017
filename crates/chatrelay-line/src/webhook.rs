// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server built on axum.
//!
//! `POST /callback` verifies the LINE signature, enqueues text messages for the
//! worker, and acknowledges stickers and images straight away through the
//! reply token. `GET /` and `GET /health` are unauthenticated liveness probes.

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chatrelay_core::{RelayError, ReplyTransport, Task, TaskQueue};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventMessage, WebhookBody};
use crate::signature::{self, SIGNATURE_HEADER};

/// Body returned by `GET /`.
pub const LIVENESS_TEXT: &str = "LINE Bot is running!";

const STICKER_ACK: &str = "Nice sticker! Send me a text message and I'll reply.";
const IMAGE_ACK: &str = "Thanks for the picture! I can only read text messages for now.";

/// Shared state for the webhook handlers.
#[derive(Clone)]
pub struct WebhookState {
    pub channel_secret: Arc<str>,
    pub queue: Arc<dyn TaskQueue>,
    pub transport: Arc<dyn ReplyTransport>,
}

impl WebhookState {
    pub fn new(
        channel_secret: impl Into<Arc<str>>,
        queue: Arc<dyn TaskQueue>,
        transport: Arc<dyn ReplyTransport>,
    ) -> Self {
        Self {
            channel_secret: channel_secret.into(),
            queue,
            transport,
        }
    }
}

/// Builds the webhook router with access logging.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/callback", post(callback))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serves `app` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<(), RelayError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("webhook server listening on {addr}");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| RelayError::Delivery {
            message: format!("webhook server error: {e}"),
            source: Some(Box::new(e)),
        })
}

async fn home() -> &'static str {
    LIVENESS_TEXT
}

async fn health() -> &'static str {
    "OK"
}

async fn callback(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(sig) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        warn!("webhook request without signature header");
        return (StatusCode::BAD_REQUEST, "missing signature").into_response();
    };

    if !signature::verify(&state.channel_secret, &body, sig) {
        warn!("invalid webhook signature");
        return (StatusCode::BAD_REQUEST, "invalid signature").into_response();
    }

    let payload: WebhookBody = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "malformed webhook body");
            return (StatusCode::BAD_REQUEST, "malformed body").into_response();
        }
    };

    for event in &payload.events {
        if let Err(e) = handle_event(&state, event).await {
            error!(error = %e, "failed to enqueue inbound message");
            return (StatusCode::INTERNAL_SERVER_ERROR, "queue unavailable").into_response();
        }
    }

    (StatusCode::OK, "OK").into_response()
}

async fn handle_event(state: &WebhookState, event: &Event) -> Result<(), RelayError> {
    if event.kind != "message" {
        debug!(kind = %event.kind, "ignoring non-message event");
        return Ok(());
    }
    let Some(message) = &event.message else {
        return Ok(());
    };

    match message {
        EventMessage::Text { text, .. } => {
            let (Some(user_id), Some(reply_token)) = (event.user_id(), event.reply_token.as_deref())
            else {
                debug!("text message without user or reply token, skipping");
                return Ok(());
            };
            let task = Task::new(user_id, text.as_str(), reply_token);
            let id = state.queue.enqueue(&task).await?;
            info!(user_id, queue_entry = id, "message queued");
        }
        EventMessage::Sticker { .. } => acknowledge(state, event, STICKER_ACK),
        EventMessage::Image { .. } => acknowledge(state, event, IMAGE_ACK),
        EventMessage::Unsupported => {
            debug!("ignoring unsupported message type");
        }
    }
    Ok(())
}

fn acknowledge(state: &WebhookState, event: &Event, text: &'static str) {
    let Some(token) = event.reply_token.clone() else {
        return;
    };
    let transport = Arc::clone(&state.transport);
    tokio::spawn(async move {
        if let Err(e) = transport.reply(&token, text).await {
            warn!(error = %e, "failed to acknowledge non-text message");
        }
    });
}
