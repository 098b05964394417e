//! Webhook transport — verification handshake, event delivery, dispatch.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::channels::MessageSink;
use crate::conversation::{ConversationEngine, EngineOutput, normalize_payload};
use crate::store::RecordStore;

/// Fixed acknowledgment for every POST delivery, regardless of outcome.
const ACK: &str = "EVENT_RECEIVED";

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConversationEngine>,
    pub sink: Arc<dyn MessageSink>,
    pub records: Arc<dyn RecordStore>,
    pub verify_token: String,
}

/// Meta webhook verification query parameters.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// GET /webhook — the verification handshake. The only path that may reject.
async fn verify(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> impl IntoResponse {
    if params.verify_token.as_deref() == Some(state.verify_token.as_str()) {
        (StatusCode::OK, params.challenge.unwrap_or_default())
    } else {
        warn!(mode = ?params.mode, "Webhook verification failed");
        (StatusCode::FORBIDDEN, "Verification failed".to_string())
    }
}

/// POST /webhook — event delivery.
///
/// Always acknowledges 200 so platform retries never amplify internal
/// failures. Session state is mutated inline; delivery and the record
/// append run off the request path.
async fn receive(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let Ok(payload) = serde_json::from_slice::<serde_json::Value>(&body) else {
        warn!("Discarding non-JSON webhook body");
        return (StatusCode::OK, ACK);
    };

    let Some(event) = normalize_payload(&payload) else {
        return (StatusCode::OK, ACK);
    };

    match state.engine.handle(event).await {
        Ok(output) => {
            let state = state.clone();
            tokio::spawn(async move { dispatch(&state, output).await });
        }
        Err(e) => error!(error = %e, "Engine error"),
    }

    (StatusCode::OK, ACK)
}

/// Execute one engine output: record append first, then deliveries, all
/// best-effort. A failed append after the session was already cleared is
/// accepted data loss.
pub async fn dispatch(state: &AppState, output: EngineOutput) {
    if let Some(record) = output.append {
        if let Err(e) = state.records.append(&record).await {
            error!(order_id = %record.order_id, error = %e, "Record append failed");
        }
    }
    for message in &output.outbound {
        if let Err(e) = state.sink.send(message).await {
            warn!(to = %message.to, error = %e, "Message delivery failed");
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Build the webhook router.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/webhook", get(verify).post(receive))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    use super::*;
    use crate::channels::OutboundMessage;
    use crate::conversation::SessionStore;
    use crate::error::ChannelError;
    use crate::orders::{OrderIdGenerator, OrderIdMode};
    use crate::store::MemoryRecordStore;

    /// Sink that records every message instead of delivering it.
    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<OutboundMessage>>,
    }

    #[async_trait]
    impl MessageSink for RecordingSink {
        async fn send(&self, message: &OutboundMessage) -> Result<(), ChannelError> {
            self.sent.lock().await.push(message.clone());
            Ok(())
        }
    }

    fn state() -> (AppState, Arc<RecordingSink>, Arc<MemoryRecordStore>) {
        let sink = Arc::new(RecordingSink::default());
        let records = Arc::new(MemoryRecordStore::new());
        let engine = Arc::new(ConversationEngine::new(
            Arc::new(SessionStore::new()),
            Arc::clone(&records) as Arc<dyn RecordStore>,
            OrderIdGenerator::new(OrderIdMode::Sequential),
            "operator-1".to_string(),
        ));
        let state = AppState {
            engine,
            sink: Arc::clone(&sink) as Arc<dyn MessageSink>,
            records: Arc::clone(&records) as Arc<dyn RecordStore>,
            verify_token: "secret".to_string(),
        };
        (state, sink, records)
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn text_payload(from: &str, id: &str, body: &str) -> String {
        serde_json::json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{
                            "from": from,
                            "id": id,
                            "text": { "body": body }
                        }]
                    }
                }]
            }]
        })
        .to_string()
    }

    async fn post(app: &Router, body: String) -> axum::response::Response {
        app.clone()
            .oneshot(
                Request::post("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn verification_echoes_challenge_on_token_match() {
        let (state, _, _) = state();
        let app = routes(state);

        let response = app
            .oneshot(
                Request::get(
                    "/webhook?hub.mode=subscribe&hub.verify_token=secret&hub.challenge=12345",
                )
                .body(Body::empty())
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "12345");
    }

    #[tokio::test]
    async fn verification_rejects_bad_token() {
        let (state, _, _) = state();
        let app = routes(state);

        let response = app
            .oneshot(
                Request::get(
                    "/webhook?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=12345",
                )
                .body(Body::empty())
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn delivery_is_acknowledged_even_for_garbage() {
        let (state, _, _) = state();
        let app = routes(state);

        for body in ["not json at all", "{}", r#"{"entry": []}"#] {
            let response = post(&app, body.to_string()).await;
            assert_eq!(response.status(), StatusCode::OK, "body: {body}");
            assert_eq!(body_string(response).await, ACK);
        }
    }

    #[tokio::test]
    async fn greeting_is_answered_with_menu() {
        let (state, sink, _) = state();
        let app = routes(state);

        let response = post(&app, text_payload("111", "m1", "hi")).await;
        assert_eq!(response.status(), StatusCode::OK);

        // Delivery runs off the request path.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        let sent = sink.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "111");
        assert_eq!(sent[0].choices.len(), 2);
    }

    #[tokio::test]
    async fn dispatch_delivers_engine_output() {
        let (state, sink, records) = state();
        let output = state
            .engine
            .handle(crate::conversation::InboundEvent {
                message_id: "m1".into(),
                from: "111".into(),
                kind: crate::conversation::EventKind::Button { id: "book".into() },
            })
            .await
            .unwrap();
        dispatch(&state, output).await;

        assert_eq!(sink.sent.lock().await.len(), 1);
        assert!(records.records().await.is_empty());
    }
}
