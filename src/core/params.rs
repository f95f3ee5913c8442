use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Map, Value};
use url::Url;

use super::resolver::ConfigResolver;
use crate::error::{FormError, Result};
use crate::models::{ConfigPacket, WrapperProps};

pub const INVALID_TOKEN_MESSAGE: &str = "Please provide valid value for config token.";
pub const INVALID_ENDPOINT_MESSAGE: &str = "Please provide valid value for endpoint URL.";
pub const INVALID_SUBMISSION_MESSAGE: &str =
    "Please provide valid value for submission endpoint URL.";

/// 根相对路径，或（可省略 scheme 的）带点号主机名的绝对地址
static ENDPOINT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:/[\w+\-.]+(?:/[\w+\-.]*)*(?:[?#][\w\-._~:/?#\[\]@!$&'()*+,;=%]*)?|(?:https?://)?[\w.\-]+(?:\.[\w.\-]+)+[\w\-._~:/?#\[\]@!$&'()*+,;=%]*)$",
    )
    .unwrap_or_else(|e| panic!("endpoint pattern must compile: {}", e))
});

pub fn is_valid_endpoint(endpoint: &str) -> bool {
    !endpoint.is_empty() && ENDPOINT_PATTERN.is_match(endpoint)
}

/// 校验通过后的参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedParams {
    pub config_token: String,
    pub api_endpoint_url: String,
    pub submission_endpoint_url: String,
}

/// 读取 `forms._defaults`，再用 `forms.<token>` 覆盖
pub async fn load_packet(resolver: &ConfigResolver, token: Option<&str>) -> ConfigPacket {
    let mut merged = Map::new();
    if let Value::Object(defaults) = resolver.get("forms._defaults", json!({})).await {
        merged.extend(defaults);
    }
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        let path = format!("forms.{}", token);
        if let Value::Object(specific) = resolver.get(&path, json!({})).await {
            merged.extend(specific);
        }
    }

    ConfigPacket {
        config_token: string_entry(&merged, "configToken"),
        api_endpoint_url: string_entry(&merged, "apiEndpointUrl"),
        submission_endpoint_url: string_entry(&merged, "submissionEndpointUrl"),
    }
}

fn string_entry(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::String(_)) | None => None,
        Some(other) => {
            tracing::warn!("ignoring non-string form config entry {}: {}", key, other);
            None
        }
    }
}

fn explicit(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// 显式参数优先，其次配置包；收集全部错误而不是只报第一个
pub fn validate(props: &WrapperProps, packet: &ConfigPacket) -> Result<ResolvedParams> {
    let mut errors = Vec::new();

    let config_token = explicit(&props.config_token)
        .or(packet.config_token.as_deref())
        .unwrap_or_default()
        .to_string();
    if config_token.is_empty() {
        errors.push(INVALID_TOKEN_MESSAGE.to_string());
    }

    let api_endpoint_url = explicit(&props.api_endpoint_url)
        .or(packet.api_endpoint_url.as_deref())
        .unwrap_or_default()
        .to_string();
    if !is_valid_endpoint(&api_endpoint_url) {
        errors.push(INVALID_ENDPOINT_MESSAGE.to_string());
    }

    // 未设置时回落到 schema 地址
    let submission_endpoint_url = explicit(&props.submission_endpoint_url)
        .or(packet.submission_endpoint_url.as_deref())
        .unwrap_or(api_endpoint_url.as_str())
        .to_string();
    if !is_valid_endpoint(&submission_endpoint_url) {
        errors.push(INVALID_SUBMISSION_MESSAGE.to_string());
    }

    if errors.is_empty() {
        Ok(ResolvedParams {
            config_token,
            api_endpoint_url,
            submission_endpoint_url,
        })
    } else {
        Err(FormError::ParameterValidation(errors))
    }
}

/// 把端点字符串解析成可请求的 URL；根相对路径基于页面 origin
pub fn resolve_endpoint(origin: &Url, endpoint: &str) -> Result<Url> {
    if endpoint.starts_with('/') {
        return origin
            .join(endpoint)
            .map_err(|e| FormError::InvalidUrl(format!("{}: {}", endpoint, e)));
    }
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return Url::parse(endpoint).map_err(|e| FormError::InvalidUrl(format!("{}: {}", endpoint, e)));
    }
    // 省略 scheme 的主机名，沿用 origin 的 scheme
    Url::parse(&format!("{}://{}", origin.scheme(), endpoint))
        .map_err(|e| FormError::InvalidUrl(format!("{}: {}", endpoint, e)))
}
