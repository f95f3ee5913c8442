use std::sync::{Arc, Mutex, RwLock};

use serde_json::{Map, Value};
use tokio::sync::watch;
use url::Url;

use crate::error::{FormError, Result};

/// 远程配置文档的默认位置（相对页面 origin）
pub const DEFAULT_CONFIG_PATH: &str = "/.well-known/public_data.json";

/// 远程加载的进度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotStarted,
    Loading,
    Loaded,
    Failed,
}

/// 配置解析器：远程 JSON 文档只拉取一次，按点分路径读写。
///
/// 所有组件共享同一个实例（通过 `Arc` 注入），并发的首次访问只会发出
/// 一个请求，所有等待者看到同一个结果。加载失败时静默降级为默认值。
///
/// 拉取在独立的 tokio 任务里执行，等待者被取消不会中断加载，也不会
/// 让下一个调用者重新发起请求。
pub struct ConfigResolver {
    shared: Arc<Shared>,
}

/// 加载任务与调用者共同持有的部分
struct Shared {
    client: reqwest::Client,
    config_url: Option<Url>,
    store: RwLock<Map<String, Value>>,
    state: Mutex<LoadState>,
    /// 加载结束（成功或失败）后置为 true
    done: watch::Sender<bool>,
}

impl ConfigResolver {
    /// 以页面 origin 为基准，从默认路径加载配置
    pub fn new(client: reqwest::Client, origin: &Url) -> Result<Self> {
        let url = origin
            .join(DEFAULT_CONFIG_PATH)
            .map_err(|e| FormError::InvalidUrl(e.to_string()))?;
        Ok(Self::with_config_url(client, url))
    }

    pub fn with_config_url(client: reqwest::Client, config_url: Url) -> Self {
        Self::build(client, Some(config_url), Map::new(), LoadState::NotStarted)
    }

    /// 不访问网络，直接以给定文档作为已加载的配置
    pub fn preloaded(document: Map<String, Value>) -> Self {
        Self::build(reqwest::Client::new(), None, document, LoadState::Loaded)
    }

    fn build(
        client: reqwest::Client,
        config_url: Option<Url>,
        document: Map<String, Value>,
        state: LoadState,
    ) -> Self {
        let (done, _) = watch::channel(state == LoadState::Loaded);
        Self {
            shared: Arc::new(Shared {
                client,
                config_url,
                store: RwLock::new(document),
                state: Mutex::new(state),
                done,
            }),
        }
    }

    pub fn load_state(&self) -> LoadState {
        self.shared.load_state()
    }

    /// 加载是否已结束（成功或失败）
    pub fn is_loaded(&self) -> bool {
        *self.shared.done.borrow()
    }

    /// 等待加载完成后查找；成功或失败都算“已结束”
    pub async fn get(&self, path: &str, default: Value) -> Value {
        self.ensure_loaded().await;
        self.fetch(path, default)
    }

    /// 同步查找，不关心加载进度，未命中返回默认值
    pub fn fetch(&self, path: &str, default: Value) -> Value {
        let Ok(store) = self.shared.store.read() else {
            return default;
        };
        lookup(&store, path).cloned().unwrap_or(default)
    }

    /// 等待加载完成后写入，避免被远程文档覆盖
    pub async fn set(&self, path: &str, value: Value) -> Result<&Self> {
        self.ensure_loaded().await;
        self.put(path, value)
    }

    /// 立即写入；远程文档若稍后加载完成，同名根键会被覆盖
    pub fn put(&self, path: &str, value: Value) -> Result<&Self> {
        let mut store = self
            .shared
            .store
            .write()
            .map_err(|_| FormError::NotInitialized("unable to set value".to_string()))?;
        write_path(&mut store, path, value);
        Ok(self)
    }

    /// 触发（或等待已在进行的）唯一一次远程加载
    pub async fn ensure_loaded(&self) {
        let mut done = self.shared.done.subscribe();
        if self.shared.begin_load() {
            let shared = self.shared.clone();
            tokio::spawn(async move {
                shared.load_remote().await;
                shared.done.send_replace(true);
            });
        }
        // 发送端由 self 持有，等待只会因加载结束而返回
        let _ = done.wait_for(|finished| *finished).await;
    }
}

impl Shared {
    fn load_state(&self) -> LoadState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(LoadState::Failed)
    }

    /// NotStarted -> Loading；只有第一个调用者得到 true
    fn begin_load(&self) -> bool {
        match self.state.lock() {
            Ok(mut state) if *state == LoadState::NotStarted => {
                *state = LoadState::Loading;
                true
            }
            Ok(_) => false,
            Err(_) => {
                // 状态锁已损坏，视为加载结束，避免等待者永远挂起
                self.done.send_replace(true);
                false
            }
        }
    }

    async fn load_remote(&self) {
        match self.fetch_document().await {
            Ok(document) => {
                tracing::debug!(keys = document.len(), "remote config loaded");
                match self.store.write() {
                    Ok(mut store) => {
                        // 根级浅合并
                        store.extend(document);
                        self.set_load_state(LoadState::Loaded);
                    }
                    Err(_) => {
                        tracing::warn!("config store poisoned, remote document dropped");
                        self.set_load_state(LoadState::Failed);
                    }
                }
            }
            Err(e) => {
                tracing::warn!("remote config unavailable, falling back to defaults: {}", e);
                self.set_load_state(LoadState::Failed);
            }
        }
    }

    async fn fetch_document(&self) -> Result<Map<String, Value>> {
        let url = self
            .config_url
            .clone()
            .ok_or_else(|| FormError::ConfigLoad("no config url".to_string()))?;
        let document: Value = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        match document {
            Value::Object(map) => Ok(map),
            _ => Err(FormError::ConfigLoad(
                "config document is not a JSON object".to_string(),
            )),
        }
    }

    fn set_load_state(&self, next: LoadState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
    }
}

/// 按点分路径查找。对象按键、数组按下标；中间节点不是容器则视为缺失。
pub fn lookup<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = root.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// 按点分路径写入，缺失或非对象的中间层替换为空对象
pub fn write_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut parts: Vec<&str> = path.split('.').collect();
    let Some(last) = parts.pop() else {
        return;
    };
    let mut cursor = root;
    for part in parts {
        let slot = cursor
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        match slot.as_object_mut() {
            Some(next) => cursor = next,
            None => return,
        }
    }
    cursor.insert(last.to_string(), value);
}
