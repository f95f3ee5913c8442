use serde_json::{json, Value};

use crate::error::{FormError, Result};
use crate::models::{FormConfig, LegacyResponse, RenderState, SubmissionResult, VersionedResponse};

pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error occurred.";
pub const NO_RESPONSE_MESSAGE: &str = "No response from server";

pub fn request_id_line(request_id: &str) -> String {
    format!("Request Id: {}", request_id)
}

/// 非空字符串或数字视为关联 id
fn request_id_of(body: &Value) -> Option<String> {
    match body.get("requestId") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// `errors[].detail` 列表；不是数组时返回 None
fn error_details(errors: Option<&Value>) -> Option<Vec<String>> {
    let Some(Value::Array(items)) = errors else {
        return None;
    };
    Some(
        items
            .iter()
            .map(|item| match item.get("detail") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => UNKNOWN_ERROR_MESSAGE.to_string(),
            })
            .collect(),
    )
}

fn message_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---- schema 请求 ----

/// schema 请求的结果
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaOutcome {
    Loaded(FormConfig),
    Failed(Vec<String>),
}

/// `data` 存在即成功；否则收集 requestId 与 errors 详情
pub fn classify_schema(body: Value) -> SchemaOutcome {
    match body.get("data") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => {}
        Some(data) => {
            return match serde_json::from_value::<FormConfig>(data.clone()) {
                Ok(config) => SchemaOutcome::Loaded(config),
                Err(e) => SchemaOutcome::Failed(vec![format!("Malformed form configuration: {}", e)]),
            };
        }
    }

    let mut errors = Vec::new();
    if let Some(id) = request_id_of(&body) {
        errors.push(request_id_line(&id));
    }
    match error_details(body.get("errors")) {
        Some(details) => errors.extend(details),
        None => errors.push(UNKNOWN_ERROR_MESSAGE.to_string()),
    }
    SchemaOutcome::Failed(errors)
}

// ---- 提交响应 ----

/// 两种互不兼容的提交响应。
///
/// 目前只能靠 `requestId` 是否存在来区分；新版响应若恰好缺了这个字段会被
/// 当作旧版处理。
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionResponse {
    Legacy(LegacyResponse),
    Versioned(VersionedResponse),
}

impl SubmissionResponse {
    pub fn parse(body: Value) -> Result<Self> {
        if !body.is_object() {
            return Err(FormError::Submission(NO_RESPONSE_MESSAGE.to_string()));
        }
        match request_id_of(&body) {
            Some(request_id) => {
                let mut body = body;
                body["requestId"] = Value::String(request_id);
                Ok(Self::Versioned(serde_json::from_value(body)?))
            }
            None => Ok(Self::Legacy(serde_json::from_value(body)?)),
        }
    }

    /// 归类为 success / error / other 三个列表
    pub fn into_lists(self) -> (Vec<String>, Vec<String>, Vec<String>) {
        let mut success = Vec::new();
        let mut error = Vec::new();
        let mut other = Vec::new();

        match self {
            Self::Legacy(response) => {
                if response.success {
                    match &response.data {
                        Value::Array(items) => success.extend(items.iter().map(message_text)),
                        Value::Null => {}
                        single => success.push(message_text(single)),
                    }
                } else {
                    error.push(
                        response
                            .message
                            .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string()),
                    );
                }
            }
            Self::Versioned(response) => {
                if response.success == Some(false) {
                    error.extend(response.errors.into_iter().map(|e| e.detail));
                } else {
                    for item in response.data {
                        match item.success {
                            Some(true) => success.push(item.message),
                            Some(false) => error.push(item.message),
                            None => other.push(item.message),
                        }
                    }
                }
                if !error.is_empty() {
                    error.insert(0, request_id_line(&response.request_id));
                }
            }
        }

        (success, error, other)
    }
}

/// 解析提交响应体，得到 formSubmitted 的载荷
pub fn classify_submission(body: Value) -> Result<SubmissionResult> {
    let data = match body.get("data") {
        Some(Value::Null) | None => json!([]),
        Some(data) => data.clone(),
    };
    let (success, error, other) = SubmissionResponse::parse(body)?.into_lists();
    Ok(SubmissionResult {
        data,
        error,
        success,
        other,
    })
}

/// 提交完成后的渲染状态
pub fn settled_state(result: &SubmissionResult) -> RenderState {
    match (result.success.is_empty(), result.error.is_empty()) {
        (false, false) => RenderState::SuccessAndError,
        (true, false) => RenderState::Error,
        _ => RenderState::PostSuccess,
    }
}
