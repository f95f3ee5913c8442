use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{FormError, Result};
use crate::models::WrapperProps;

/// 公共配置文档：启动时从 JSON 文件读入的只读副本
pub struct Storage {
    document: Map<String, Value>,
}

impl Storage {
    /// 从 JSON 文件加载配置文档。文件不存在、损坏或根不是对象时记录警告并使用空文档。
    pub fn load(file_path: &Path) -> Result<Self> {
        let document = if file_path.exists() {
            match std::fs::read_to_string(file_path) {
                Ok(content) => match serde_json::from_str::<Value>(&content) {
                    Ok(Value::Object(map)) => map,
                    Ok(_) => {
                        tracing::warn!("配置文档根节点不是对象，使用空文档: {}", file_path.display());
                        Map::new()
                    }
                    Err(e) => {
                        tracing::warn!("配置文档损坏，使用空文档: {}", e);
                        Map::new()
                    }
                },
                Err(e) => {
                    tracing::warn!("无法读取配置文档，使用空文档: {}", e);
                    Map::new()
                }
            }
        } else {
            Map::new()
        };

        Ok(Self { document })
    }

    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }
}

/// 读取组件参数文件。与配置文档不同，参数文件由用户显式指定，出错直接返回。
pub fn load_props(file_path: &Path) -> Result<WrapperProps> {
    let content = std::fs::read_to_string(file_path)?;
    serde_json::from_str(&content).map_err(|e| {
        FormError::ConfigLoad(format!("{}: {}", file_path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    use crate::models::{ContainerVisibility, ScrollAfter};

    #[test]
    fn test_missing_file_gives_empty_document() {
        let tmp = TempDir::new().unwrap();
        let storage = Storage::load(&tmp.path().join("public_data.json")).unwrap();
        assert!(storage.document().is_empty());
    }

    #[test]
    fn test_corrupt_file_gives_empty_document() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "{not json").unwrap();
        let storage = Storage::load(tmp.path()).unwrap();
        assert!(storage.document().is_empty());
    }

    #[test]
    fn test_non_object_root_gives_empty_document() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[1, 2, 3]").unwrap();
        let storage = Storage::load(tmp.path()).unwrap();
        assert!(storage.document().is_empty());
    }

    #[test]
    fn test_load_props() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            r#"{"configToken": "contact", "containerVisibility": "SHOW_ONLY_ERROR", "scrollAfter": true}"#,
        )
        .unwrap();

        let props = load_props(tmp.path()).unwrap();
        assert_eq!(props.config_token.as_deref(), Some("contact"));
        assert_eq!(props.container_visibility, ContainerVisibility::ShowOnlyError);
        assert_eq!(props.scroll_after, ScrollAfter::Never);
        assert!(!props.show_form_on_success);
    }

    #[test]
    fn test_load_props_invalid_is_error() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), r#"{"method": "PATCH"}"#).unwrap();
        let err = load_props(tmp.path()).unwrap_err();
        assert!(matches!(err, FormError::ConfigLoad(_)));
    }
}
