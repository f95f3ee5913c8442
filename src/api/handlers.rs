use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::core::resolver::lookup;
use crate::error::FormError;
use crate::storage::Storage;

/// 共享状态类型
pub type AppState = Arc<RwLock<Storage>>;

// ---- 响应结构体 ----

#[derive(Serialize)]
pub struct ConfigValueResponse {
    pub path: String,
    pub value: Value,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---- FormError -> HTTP Response ----

impl IntoResponse for FormError {
    fn into_response(self) -> Response {
        let status = match &self {
            FormError::PathNotFound(_) => StatusCode::NOT_FOUND,
            FormError::ParameterValidation(_)
            | FormError::InvalidUrl(_)
            | FormError::InvalidHeader(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ---- 处理器 ----

/// GET /.well-known/public_data.json
pub async fn get_public_data(State(storage): State<AppState>) -> Json<Value> {
    let storage = storage.read().await;
    Json(Value::Object(storage.document().clone()))
}

/// GET /api/v1/config/{path}，path 为点分路径
pub async fn get_config_value(
    State(storage): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<ConfigValueResponse>, FormError> {
    let storage = storage.read().await;
    let value = lookup(storage.document(), &path)
        .cloned()
        .ok_or_else(|| FormError::PathNotFound(path.clone()))?;
    Ok(Json(ConfigValueResponse { path, value }))
}
