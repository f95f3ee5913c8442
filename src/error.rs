use crate::models::RenderState;

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    /// token / 端点缺失或格式不对，本轮加载终止
    #[error("invalid parameters: {}", .0.join("; "))]
    ParameterValidation(Vec<String>),

    #[error("schema fetch failed: {0}")]
    SchemaFetch(String),

    #[error("submission failed: {0}")]
    Submission(String),

    /// 远程配置加载失败；调用方只会看到默认值
    #[error("config load failed: {0}")]
    ConfigLoad(String),

    #[error("config path not found: {0}")]
    PathNotFound(String),

    #[error("config not initialized: {0}")]
    NotInitialized(String),

    #[error("form not ready for submission (state: {0})")]
    NotReady(RenderState),

    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),

    /// token 等无法作为请求头发送
    #[error("invalid {0} header value")]
    InvalidHeader(&'static str),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FormError>;
