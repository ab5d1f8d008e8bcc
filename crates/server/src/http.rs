//! HTTP Endpoints
//!
//! Inbound-message webhook and conversation log for the reply agent.

use std::time::Duration;

use axum::{
    extract::{Json, Path, State},
    http::{HeaderValue, Method, StatusCode},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use support_agent_core::{Channel, ConversationMessage};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::ServerError;

const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.config.server.cors_origins, state.config.server.cors_enabled);
    let timeout = Duration::from_secs(state.config.server.timeout_seconds);

    Router::new()
        .route(
            "/api/conversations/:id/messages",
            get(list_messages).post(receive_message),
        )
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// Disabled CORS is permissive; an empty or fully invalid origin list falls
/// back to localhost.
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if parsed_origins.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to {}", DEFAULT_ORIGIN);
        return layer.allow_origin(HeaderValue::from_static(DEFAULT_ORIGIN));
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    layer.allow_origin(parsed_origins)
}

/// Inbound message from the messaging platform
#[derive(Debug, Deserialize)]
struct InboundRequest {
    /// Platform message id, generated when absent
    #[serde(default)]
    id: Option<String>,
    content: String,
    /// Internal notes are stored but never answered
    #[serde(default)]
    private: bool,
    #[serde(default)]
    channel: Option<Channel>,
}

#[derive(Debug, Serialize)]
struct InboundResponse {
    message_id: String,
    scheduled: bool,
}

/// `POST /api/conversations/:id/messages`
///
/// Stores the message and hands it to the scheduler. The reply, if any, is
/// delivered asynchronously into the conversation log.
async fn receive_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(request): Json<InboundRequest>,
) -> Result<(StatusCode, Json<InboundResponse>), ServerError> {
    if request.content.trim().is_empty() {
        return Err(ServerError::InvalidRequest("content must not be empty".into()));
    }

    let message_id = request
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let mut message = ConversationMessage::inbound(
        message_id.clone(),
        conversation_id.clone(),
        request.content,
        chrono::Utc::now(),
    );
    message.private = request.private;

    if let Some(channel) = request.channel {
        state.conversations.set_channel(&conversation_id, channel);
    }
    state.conversations.append(message.clone());

    let scheduled = state.scheduler.on_inbound(&message).await?.is_some();
    tracing::info!(
        conversation_id = %conversation_id,
        message_id = %message_id,
        private = message.private,
        scheduled,
        "Received inbound message"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(InboundResponse {
            message_id,
            scheduled,
        }),
    ))
}

/// `GET /api/conversations/:id/messages`
async fn list_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let messages = state.conversations.messages(&conversation_id);
    if messages.is_empty() {
        return Err(ServerError::NotFound(format!("conversation {}", conversation_id)));
    }

    Ok(Json(serde_json::json!({
        "conversation_id": conversation_id,
        "count": messages.len(),
        "messages": messages,
    })))
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "checks": {
            "conversations": { "status": "ok", "count": state.conversations.conversation_count() },
            "tools": { "status": "ok", "offered": state.tools.as_slice() },
            "metrics": { "status": if state.metrics.is_some() { "ok" } else { "disabled" } },
        }
    }))
}

/// Ready once the chat backend answers within two seconds
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let llm_status = match tokio::time::timeout(Duration::from_secs(2), state.llm.is_available()).await {
        Ok(true) => "ok",
        Ok(false) => "unreachable",
        Err(_) => "timeout",
    };
    let ready = llm_status == "ok";

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": if ready { "ready" } else { "not_ready" },
            "checks": {
                "llm_backend": { "status": llm_status, "model": state.llm.model_name() },
            }
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use support_agent_agent::{InMemoryConversationStore, ReplyComposer, ResponseScheduler};
    use support_agent_config::{AgentConfig, IntentConfig, RetrievalConfig, SchedulerConfig, Settings};
    use support_agent_core::{
        Embedder, GenerateRequest, GenerateResponse, LanguageModel, Result, SystemClock,
        ToolDefinition,
    };
    use support_agent_rag::{HybridRetriever, InMemoryCorpusStore, RetrieverConfig};
    use support_agent_text_processing::{IntentClassifier, ResponseValidator};
    use support_agent_tools::ToolRegistry;
    use tower::ServiceExt;

    struct StaticLlm {
        available: bool,
    }

    #[async_trait]
    impl LanguageModel for StaticLlm {
        async fn generate(&self, _request: GenerateRequest) -> Result<GenerateResponse> {
            Ok(GenerateResponse::text("Tamam. [GÜVEN: YÜKSEK]"))
        }

        async fn generate_with_tools(
            &self,
            request: GenerateRequest,
            _tools: &[ToolDefinition],
        ) -> Result<GenerateResponse> {
            self.generate(request).await
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        fn model_name(&self) -> &str {
            "static"
        }
    }

    struct FlatEmbedder;

    #[async_trait]
    impl Embedder for FlatEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0])
        }

        fn model_id(&self) -> &str {
            "flat"
        }

        fn dimensions(&self) -> usize {
            1
        }
    }

    fn test_state(llm_available: bool) -> AppState {
        let llm: Arc<dyn LanguageModel> = Arc::new(StaticLlm {
            available: llm_available,
        });
        let retriever = Arc::new(HybridRetriever::new(
            RetrieverConfig::default(),
            Arc::new(FlatEmbedder),
            Arc::new(InMemoryCorpusStore::new()),
        ));
        let composer = ReplyComposer::new(
            AgentConfig::default(),
            RetrievalConfig::default(),
            llm.clone(),
            Arc::new(IntentClassifier::lexicon_only(IntentConfig::default())),
            retriever,
            Arc::new(ToolRegistry::new()),
            ResponseValidator::default(),
        );
        let conversations = Arc::new(InMemoryConversationStore::new());
        let scheduler = ResponseScheduler::new(
            SchedulerConfig::default(),
            conversations.clone(),
            conversations.clone(),
            Arc::new(composer),
            Arc::new(SystemClock),
        );
        AppState::new(Settings::default(), conversations, scheduler, llm)
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(match body {
                Some(json) => Body::from(json.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_inbound_message_is_stored_and_scheduled() {
        let state = test_state(true);
        let router = create_router(state.clone());

        let (status, body) = send(
            &router,
            "POST",
            "/api/conversations/c1/messages",
            Some(serde_json::json!({"id": "m1", "content": "iade süresi nedir?", "channel": "instagram"})),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["message_id"], "m1");
        assert_eq!(body["scheduled"], true);
        assert_eq!(state.conversations.messages("c1").len(), 1);

        let (status, body) = send(&router, "GET", "/api/conversations/c1/messages", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["messages"][0]["content"], "iade süresi nedir?");
    }

    #[tokio::test]
    async fn test_private_note_is_not_scheduled() {
        let router = create_router(test_state(true));
        let (status, body) = send(
            &router,
            "POST",
            "/api/conversations/c1/messages",
            Some(serde_json::json!({"content": "VIP müşteri", "private": true})),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["scheduled"], false);
        assert!(!body["message_id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_content_rejected() {
        let router = create_router(test_state(true));
        let (status, body) = send(
            &router,
            "POST",
            "/api/conversations/c1/messages",
            Some(serde_json::json!({"content": "   "})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request: content must not be empty");
    }

    #[tokio::test]
    async fn test_unknown_conversation() {
        let router = create_router(test_state(true));
        let (status, _) = send(&router, "GET", "/api/conversations/missing/messages", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_and_readiness() {
        let router = create_router(test_state(true));
        let (status, body) = send(&router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["checks"]["metrics"]["status"], "disabled");

        let (status, body) = send(&router, "GET", "/ready", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"]["llm_backend"]["model"], "static");

        let router = create_router(test_state(false));
        let (status, body) = send(&router, "GET", "/ready", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "not_ready");
    }

    #[tokio::test]
    async fn test_metrics_disabled() {
        let router = create_router(test_state(true));
        let (status, _) = send(&router, "GET", "/metrics", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
