//! REST API Server for the tax figure extractor
//!
//! Exposes extraction via HTTP endpoints

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::backend::{extract_batch, ExtractionBackend};
use crate::error::ExtractionError;
use crate::models::TaxIncomeRecord;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExtractRequest {
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchExtractRequest {
    pub texts: Vec<String>,
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

#[derive(Debug, Serialize)]
struct BatchItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<TaxIncomeRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub backend: Arc<dyn ExtractionBackend>,
}

fn status_for(error: &ExtractionError) -> StatusCode {
    if error.is_invalid_input() {
        StatusCode::BAD_REQUEST
    } else if error.is_backend_failure() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "backend": state.backend.name(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Extraction Endpoints
/// =============================

async fn extract_handler(
    State(state): State<ApiState>,
    Json(req): Json<ExtractRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let Some(text) = req.text else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Invalid input: missing text".into())),
        );
    };

    info!(chars = text.len(), "Received extraction request");

    match state.backend.extract(&text).await {
        Ok(record) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "record": record,
                "backend": state.backend.name(),
            }))),
        ),
        Err(e) => (status_for(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

async fn batch_handler(
    State(state): State<ApiState>,
    Json(req): Json<BatchExtractRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    if req.texts.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Invalid input: no texts".into())),
        );
    }

    info!(count = req.texts.len(), "Received batch extraction request");

    let items: Vec<BatchItem> = extract_batch(Arc::clone(&state.backend), req.texts)
        .await
        .into_iter()
        .map(|result| match result {
            Ok(record) => BatchItem {
                record: Some(record),
                error: None,
            },
            Err(e) => BatchItem {
                record: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "results": items,
            "backend": state.backend.name(),
        }))),
    )
}

/// =============================
/// Router
/// =============================

pub fn create_router(backend: Arc<dyn ExtractionBackend>) -> Router {
    let state = ApiState { backend };

    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/api/extract", post(extract_handler))
        .route("/api/extract/batch", post(batch_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    backend: Arc<dyn ExtractionBackend>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(backend);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RuleBackend;

    fn state() -> ApiState {
        ApiState {
            backend: Arc::new(RuleBackend::new()),
        }
    }

    #[tokio::test]
    async fn test_extract_ok() {
        let (status, Json(response)) = extract_handler(
            State(state()),
            Json(ExtractRequest {
                text: Some("Paid 50k for solar loan payments.".to_string()),
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(response.success);
        let data = response.data.unwrap();
        assert_eq!(data["record"]["solar_loan_payments"], serde_json::json!(50000.0));
        assert_eq!(data["record"]["employment_income"], serde_json::json!(0.0));
        assert_eq!(data["backend"], "rules");
    }

    #[tokio::test]
    async fn test_extract_invalid_input() {
        let (status, Json(response)) =
            extract_handler(State(state()), Json(ExtractRequest { text: Some("  ".into()) })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!response.success);

        let (status, _) =
            extract_handler(State(state()), Json(ExtractRequest { text: None })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_batch() {
        let (status, Json(response)) = batch_handler(
            State(state()),
            Json(BatchExtractRequest {
                texts: vec!["Salary 100,000 per month".into(), "".into()],
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let results = response.data.unwrap()["results"].clone();
        assert_eq!(results[0]["record"]["employment_income"], serde_json::json!(1200000.0));
        assert!(results[1]["error"].as_str().unwrap().starts_with("Invalid input"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&ExtractionError::InvalidInput("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ExtractionError::LlmError("x".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&ExtractionError::TaskError("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
