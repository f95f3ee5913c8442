use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// 表单包装器的渲染状态，任何时刻只有一个
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderState {
    #[default]
    None,
    Loading,
    InvalidParameter,
    Error,
    GetSuccess,
    PostSuccess,
    SuccessAndError,
}

impl RenderState {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderState::None => "NONE",
            RenderState::Loading => "LOADING",
            RenderState::InvalidParameter => "INVALID_PARAMETER",
            RenderState::Error => "ERROR",
            RenderState::GetSuccess => "GET_SUCCESS",
            RenderState::PostSuccess => "POST_SUCCESS",
            RenderState::SuccessAndError => "SUCCESS_AND_ERROR",
        }
    }
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 出错时错误块和表单的显示方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerVisibility {
    #[default]
    ShowBoth,
    ShowOnlyError,
    ShowOnlyForm,
}

impl FromStr for ContainerVisibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SHOW_BOTH" => Ok(ContainerVisibility::ShowBoth),
            "SHOW_ONLY_ERROR" => Ok(ContainerVisibility::ShowOnlyError),
            "SHOW_ONLY_FORM" => Ok(ContainerVisibility::ShowOnlyForm),
            other => Err(format!("unknown container visibility: {}", other)),
        }
    }
}

/// schema 请求使用的 HTTP 方法
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FormMethod {
    #[default]
    Get,
    Post,
}

impl FromStr for FormMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(FormMethod::Get),
            "POST" => Ok(FormMethod::Post),
            other => Err(format!("unsupported method: {}", other)),
        }
    }
}

/// 触发滚动的时机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollMoment {
    Submission,
    Response,
    Error,
}

/// scrollAfter 配置：`false` | "submission" | "response" | "error"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScrollAfter {
    #[default]
    Never,
    Submission,
    Response,
    Error,
}

impl ScrollAfter {
    /// error 是 response 的一种，所以 Response 配置在 error 时也滚动
    pub fn should_scroll(self, moment: ScrollMoment) -> bool {
        matches!(
            (self, moment),
            (ScrollAfter::Submission, ScrollMoment::Submission)
                | (ScrollAfter::Response, ScrollMoment::Response)
                | (ScrollAfter::Response, ScrollMoment::Error)
                | (ScrollAfter::Error, ScrollMoment::Error)
        )
    }
}

impl FromStr for ScrollAfter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "false" | "" => Ok(ScrollAfter::Never),
            "submission" => Ok(ScrollAfter::Submission),
            "response" => Ok(ScrollAfter::Response),
            "error" => Ok(ScrollAfter::Error),
            other => Err(format!("unknown scrollAfter value: {}", other)),
        }
    }
}

impl Serialize for ScrollAfter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ScrollAfter::Never => serializer.serialize_bool(false),
            ScrollAfter::Submission => serializer.serialize_str("submission"),
            ScrollAfter::Response => serializer.serialize_str("response"),
            ScrollAfter::Error => serializer.serialize_str("error"),
        }
    }
}

impl<'de> Deserialize<'de> for ScrollAfter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            // `true` 不对应任何时机
            Raw::Flag(_) => Ok(ScrollAfter::Never),
            Raw::Name(name) => name.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// 组件参数（对应 web component 的属性）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WrapperProps {
    pub config_token: Option<String>,
    pub client_environment: Option<String>,
    pub api_endpoint_url: Option<String>,
    pub submission_endpoint_url: Option<String>,
    pub container_visibility: ContainerVisibility,
    pub show_form_on_success: bool,
    pub method: FormMethod,
    pub scroll_after: ScrollAfter,
    pub inject_shadow_styles: Option<String>,
    pub analytics_name: String,
}

/// 从 `forms._defaults` 与 `forms.<token>` 合并出的配置包
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPacket {
    pub config_token: Option<String>,
    pub api_endpoint_url: Option<String>,
    pub submission_endpoint_url: Option<String>,
}

// ---- 表单 schema ----

/// schema 请求返回的 `data` 部分
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormConfig {
    pub csrf_token: String,
    pub fields: Vec<FieldDescriptor>,
}

impl FormConfig {
    /// 有 csrf token 且至少一个字段才能渲染
    pub fn is_renderable(&self) -> bool {
        !self.csrf_token.is_empty() && !self.fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
            || self.validators.iter().any(|v| v.kind == "required")
    }
}

/// 字段类型；section 递归包含子字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum FieldKind {
    Text,
    Hidden,
    Email,
    Password,
    Textarea,
    Select {
        #[serde(default)]
        options: Vec<OptionItem>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        option_text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        option_value: Option<String>,
    },
    Checkbox,
    Checkboxes {
        #[serde(default)]
        options: Vec<OptionItem>,
    },
    Radio {
        #[serde(default)]
        options: Vec<OptionItem>,
    },
    Autocomplete,
    Date,
    Time,
    Button,
    Html {
        #[serde(default)]
        html: String,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<f64>,
    },
    Section {
        #[serde(default)]
        child_field_refs: Vec<String>,
        #[serde(default)]
        children: Vec<FieldDescriptor>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        child_field_max_count: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        child_field_min_count: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        child_field_initial_count: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remove_button_text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        add_button_text: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Hidden => "hidden",
            FieldKind::Email => "email",
            FieldKind::Password => "password",
            FieldKind::Textarea => "textarea",
            FieldKind::Select { .. } => "select",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Checkboxes { .. } => "checkboxes",
            FieldKind::Radio { .. } => "radio",
            FieldKind::Autocomplete => "autocomplete",
            FieldKind::Date => "date",
            FieldKind::Time => "time",
            FieldKind::Button => "button",
            FieldKind::Html { .. } => "html",
            FieldKind::Number { .. } => "number",
            FieldKind::Section { .. } => "section",
            FieldKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionItem {
    pub label: String,
    #[serde(default, deserialize_with = "option_value")]
    pub value: String,
    #[serde(default)]
    pub default: bool,
}

/// 选项值统一为字符串：数字、布尔按字面量转换，null 视为空串
fn option_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ---- 提交响应 ----

/// 旧版响应：`{ success, data, message }`，没有 requestId
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LegacyResponse {
    pub success: bool,
    pub data: Value,
    pub message: Option<String>,
}

/// 新版响应：`{ requestId, success, errors[], data[] }`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VersionedResponse {
    pub request_id: String,
    pub success: Option<bool>,
    pub errors: Vec<ErrorDetail>,
    pub data: Vec<ResponseItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorDetail {
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseItem {
    pub success: Option<bool>,
    pub message: String,
}

/// 提交结果；同时作为 formSubmitted 事件的载荷
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubmissionResult {
    pub data: Value,
    pub error: Vec<String>,
    pub success: Vec<String>,
    pub other: Vec<String>,
}

// ---- 事件 ----

/// 分析事件信封
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HelixEventPayload {
    pub name: String,
    pub path: Vec<String>,
    pub meta: Vec<Value>,
}

impl HelixEventPayload {
    pub fn new(name: impl Into<String>, path: Vec<String>, meta: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            path,
            meta,
        }
    }
}

/// 包装器向宿主发出的事件
#[derive(Debug, Clone, PartialEq)]
pub enum WrapperEvent {
    FormSubmitted(SubmissionResult),
    Helix(HelixEventPayload),
    ScrollIntoView,
}
