//! REST API for the finance assistant
//!
//! Thin presentation layer over `Assistant`; every answer is wrapped in
//! `ApiResponse`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::assistant::{Assistant, AssistantInput};
use crate::document::DocumentPayload;
use crate::error::AssistantError;
use crate::models::Humor;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatRequest {
    pub user_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DocumentRequest {
    pub user_id: Option<String>,
    pub document: DocumentPayload,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HumorRequest {
    pub user_id: String,
    pub humor: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

#[derive(Clone)]
pub struct ApiState {
    pub assistant: Arc<Assistant>,
}

/// =============================
/// Helpers
/// =============================

fn stable_uuid_from_string(input: &str) -> uuid::Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // version 4, RFC4122 variant
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    uuid::Uuid::from_bytes(bytes)
}

/// Real UUIDs pass through; any other handle maps to the same UUID every time
fn resolve_user_id(value: Option<&str>) -> uuid::Uuid {
    match value {
        Some(v) if !v.trim().is_empty() => {
            uuid::Uuid::parse_str(v.trim()).unwrap_or_else(|_| stable_uuid_from_string(v.trim()))
        }
        _ => stable_uuid_from_string("anonymous-user"),
    }
}

fn error_response(error: AssistantError) -> ApiResult {
    let status = match &error {
        AssistantError::Validation(_) => StatusCode::BAD_REQUEST,
        AssistantError::Computation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        warn!("Request failed: {}", error);
    }
    (status, Json(ApiResponse::error(error.to_string())))
}

async fn answer(state: &ApiState, user_id: uuid::Uuid, input: AssistantInput) -> ApiResult {
    match state.assistant.handle_detailed(user_id, input).await {
        Ok(reply) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "answer": reply.text,
                "origin": reply.origin.to_string(),
                "intent": reply.intent.kind.to_string(),
                "sentiment": reply.intent.sentiment,
                "stages": reply.stages,
                "turn_id": reply.turn.turn_id,
                "user_id": user_id,
            }))),
        ),
        Err(e) => error_response(e),
    }
}

/// =============================
/// Endpoints
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn chat_handler(State(state): State<ApiState>, Json(req): Json<ChatRequest>) -> ApiResult {
    if req.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Message must not be empty".into())),
        );
    }

    let user_id = resolve_user_id(req.user_id.as_deref());
    info!(user_id = %user_id, "Received chat message");

    answer(&state, user_id, AssistantInput::Text(req.message)).await
}

async fn document_handler(
    State(state): State<ApiState>,
    Json(req): Json<DocumentRequest>,
) -> ApiResult {
    let user_id = resolve_user_id(req.user_id.as_deref());
    info!(user_id = %user_id, rows = req.document.rows.len(), "Received document");

    answer(&state, user_id, AssistantInput::Document(req.document)).await
}

async fn humor_handler(State(state): State<ApiState>, Json(req): Json<HumorRequest>) -> ApiResult {
    let humor: Humor = match req.humor.parse() {
        Ok(humor) => humor,
        Err(e) => return error_response(e),
    };

    let user_id = resolve_user_id(Some(&req.user_id));
    state.assistant.set_humor(user_id, humor).await;

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "user_id": user_id,
            "humor": humor.to_string(),
        }))),
    )
}

async fn financials_handler(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> ApiResult {
    let user_id = resolve_user_id(Some(&user_id));

    match state.assistant.latest_financials(user_id).await {
        Ok(Some(snapshot)) => (StatusCode::OK, Json(ApiResponse::success(snapshot))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("No financial data uploaded yet".into())),
        ),
        Err(e) => error_response(e),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(assistant: Arc<Assistant>) -> Router {
    let state = ApiState { assistant };

    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat_handler))
        .route("/api/document", post(document_handler))
        .route("/api/humor", put(humor_handler))
        .route("/api/financials/:user_id", get(financials_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    assistant: Arc<Assistant>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(assistant);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::{FixedRandom, PersonaComposer};
    use crate::store::InMemoryTurnStore;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    fn router() -> Router {
        let assistant = Assistant::new(Arc::new(InMemoryTurnStore::new()))
            .with_composer(PersonaComposer::new(Arc::new(FixedRandom(0))));
        create_router(Arc::new(assistant))
    }

    async fn send(
        router: Router,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_stable_uuid_is_deterministic() {
        assert_eq!(stable_uuid_from_string("alice"), stable_uuid_from_string("alice"));
        assert_ne!(stable_uuid_from_string("alice"), stable_uuid_from_string("bob"));
        assert_eq!(stable_uuid_from_string("alice").get_version_num(), 4);

        let real = uuid::Uuid::new_v4();
        assert_eq!(resolve_user_id(Some(&real.to_string())), real);
        assert_eq!(resolve_user_id(None), resolve_user_id(Some("  ")));
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(router(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_chat_greeting() {
        let (status, body) = send(
            router(),
            Method::POST,
            "/api/chat",
            Some(serde_json::json!({"user_id": "alice", "message": "oi"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["intent"], "greeting");
        assert_eq!(body["data"]["origin"], "local");
    }

    #[tokio::test]
    async fn test_empty_chat_message_is_bad_request() {
        let (status, body) = send(
            router(),
            Method::POST,
            "/api/chat",
            Some(serde_json::json!({"message": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_document_then_financials() {
        let router = router();
        let document = serde_json::json!({
            "user_id": "alice",
            "document": {
                "rows": [
                    {"category": "fixed", "amount": 10000},
                    {"category": "variable", "amount": 40000}
                ],
                "revenue_projected": 75000,
                "investments": 20000
            }
        });

        let (status, body) = send(router.clone(), Method::POST, "/api/document", Some(document)).await;
        assert_eq!(status, StatusCode::OK);
        let answer = body["data"]["answer"].as_str().unwrap();
        assert!(answer.contains("Real margin: 28.33%"));

        let (status, body) = send(router, Method::GET, "/api/financials/alice", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_costs"], 50000.0);
    }

    #[tokio::test]
    async fn test_financials_missing_is_not_found() {
        let (status, _) = send(router(), Method::GET, "/api/financials/nobody", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_error_status_codes() {
        let invalid = serde_json::json!({
            "document": {"rows": [{"category": "rent"}]}
        });
        let (status, _) = send(router(), Method::POST, "/api/document", Some(invalid)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let zero_hours = serde_json::json!({
            "document": {"rows": [{"category": "rent", "amount": 100}], "hours_worked": 0}
        });
        let (status, body) = send(router(), Method::POST, "/api/document", Some(zero_hours)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("DivisionError"));
    }

    #[tokio::test]
    async fn test_humor_update() {
        let router = router();
        let (status, body) = send(
            router.clone(),
            Method::PUT,
            "/api/humor",
            Some(serde_json::json!({"user_id": "bob", "humor": "sarcástico"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["humor"], "sarcastic");

        let (status, _) = send(
            router,
            Method::PUT,
            "/api/humor",
            Some(serde_json::json!({"user_id": "bob", "humor": "grumpy"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
