use axum::routing::get;
use axum::Router;

use super::handlers::{get_config_value, get_public_data, AppState};
use crate::core::resolver::DEFAULT_CONFIG_PATH;

/// 创建配置文档路由
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(DEFAULT_CONFIG_PATH, get(get_public_data))
        .route("/api/v1/config/{path}", get(get_config_value))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::{json, Value};
    use tempfile::NamedTempFile;
    use tokio::sync::RwLock;
    use url::Url;

    use crate::core::resolver::{ConfigResolver, LoadState};
    use crate::storage::Storage;
    use crate::testing::spawn_server;

    /// 辅助：用给定文档启动配置服务
    async fn serve(document: Value) -> (Url, NamedTempFile) {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), document.to_string()).unwrap();
        let storage = Storage::load(tmp.path()).unwrap();
        let base = spawn_server(create_router(Arc::new(RwLock::new(storage)))).await;
        (Url::parse(&base).unwrap(), tmp)
    }

    #[tokio::test]
    async fn test_public_data_served() {
        let (origin, _tmp) = serve(json!({"forms": {"_defaults": {"apiEndpointUrl": "/api/forms"}}})).await;
        let body: Value = reqwest::get(origin.join(DEFAULT_CONFIG_PATH).unwrap())
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["forms"]["_defaults"]["apiEndpointUrl"], json!("/api/forms"));
    }

    #[tokio::test]
    async fn test_config_value_lookup() {
        let (origin, _tmp) = serve(json!({"forms": {"contact": {"configToken": "c1"}}})).await;
        let resp = reqwest::get(origin.join("/api/v1/config/forms.contact.configToken").unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body, json!({"path": "forms.contact.configToken", "value": "c1"}));
    }

    #[tokio::test]
    async fn test_config_value_not_found() {
        let (origin, _tmp) = serve(json!({})).await;
        let resp = reqwest::get(origin.join("/api/v1/config/forms.nope").unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_resolver_reads_from_host() {
        let (origin, _tmp) = serve(json!({"forms": {"_defaults": {"apiEndpointUrl": "/api/forms"}}})).await;
        let resolver = ConfigResolver::new(reqwest::Client::new(), &origin).unwrap();

        let value = resolver.get("forms._defaults.apiEndpointUrl", Value::Null).await;
        assert_eq!(value, json!("/api/forms"));
        assert_eq!(resolver.load_state(), LoadState::Loaded);
    }
}
