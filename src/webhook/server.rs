use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde_json::json;

use crate::core::links::{ChatClient, DispatchOutcome, InboundEvent, LinkService, SheetStore};
use crate::infra::telegram::Update;

pub struct WebhookState<C: ChatClient, S: SheetStore> {
    /// `None` when no bot token is configured.
    pub service: Option<LinkService<C, S>>,
}

/// Status plus the `{"message": ...}` body every webhook response carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebhookReply {
    pub status: StatusCode,
    pub message: &'static str,
}

impl WebhookReply {
    const fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }
}

impl From<DispatchOutcome> for WebhookReply {
    fn from(outcome: DispatchOutcome) -> Self {
        match outcome {
            DispatchOutcome::Processed => Self::new(StatusCode::OK, "Tele Message processed"),
            DispatchOutcome::CallbacksUnsupported => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Callbacks are unsupported")
            }
            DispatchOutcome::FellThrough => {
                Self::new(StatusCode::BAD_REQUEST, "Request fell through.")
            }
            DispatchOutcome::InternalError => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}

impl IntoResponse for WebhookReply {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

pub fn router<C, S>(state: WebhookState<C, S>, path: &str) -> Router
where
    C: ChatClient + 'static,
    S: SheetStore + 'static,
{
    Router::new()
        .route(path, any(handle_webhook::<C, S>))
        .with_state(Arc::new(state))
}

async fn handle_webhook<C, S>(
    State(state): State<Arc<WebhookState<C, S>>>,
    method: Method,
    body: Bytes,
) -> Response
where
    C: ChatClient + 'static,
    S: SheetStore + 'static,
{
    respond(&state, &method, &body).await.into_response()
}

/// Turns one webhook request into a reply.
pub async fn respond<C: ChatClient, S: SheetStore>(
    state: &WebhookState<C, S>,
    method: &Method,
    body: &[u8],
) -> WebhookReply {
    if *method != Method::POST {
        return WebhookReply::new(StatusCode::BAD_REQUEST, "Request fell through");
    }

    let Some(service) = state.service.as_ref() else {
        tracing::error!("Received an update but BOT_TOKEN is not configured");
        return WebhookReply::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server doesn't have the required credentials.",
        );
    };

    let update: Update = match serde_json::from_slice(body) {
        Ok(update) => update,
        Err(e) => {
            tracing::warn!("Rejecting malformed update: {}", e);
            return WebhookReply::new(StatusCode::BAD_REQUEST, "Malformed update payload");
        }
    };

    let update_id = update.update_id;
    let raw_payload = String::from_utf8_lossy(body);
    let outcome = service
        .dispatch(&InboundEvent::from(update), &raw_payload)
        .await;

    tracing::info!(update_id, outcome = ?outcome, "Handled update");
    WebhookReply::from(outcome)
}
