use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{json, Map, Value};
use reqwest::header::{HeaderMap, HeaderValue};
use tokio::sync::mpsc;
use url::Url;
use uuid::Uuid;

use super::params::{self, ResolvedParams};
use super::resolver::ConfigResolver;
use super::response::{self, SchemaOutcome};
use super::styles::{HostDocument, ShadowScope, StyleNode};
use super::view::{self, RenderInput, View};
use crate::error::{FormError, Result};
use crate::models::{
    ConfigPacket, FormConfig, FormMethod, HelixEventPayload, RenderState, ScrollMoment,
    SubmissionResult, WrapperEvent, WrapperProps,
};

pub const RENDER_CHANGE_EVENT: &str = "HelixFormWrapperRenderChange";
pub const SUBMISSION_ANALYTICS_EVENT: &str = "HelixFormSubmissionAnalytics";
pub const DROPDOWN_CHANGE_EVENT: &str = "HelixDropdownChange";

/// 加载结束后才补上 formName 的字段交互事件
pub const TAGGED_FIELD_EVENTS: [&str; 5] = [
    "HelixInputFocus",
    "HelixCheckboxSelect",
    "HelixSelectChange",
    "HelixTextareaFocus",
    "HelixDatePickerFocus",
];

struct Inner {
    props: WrapperProps,
    state: RenderState,
    /// 每次发起 schema 加载或提交时递增，结算时不一致则丢弃
    generation: u64,
    packet: Option<ConfigPacket>,
    params: Option<ResolvedParams>,
    form: Option<FormConfig>,
    success: Vec<String>,
    error: Vec<String>,
    other: Vec<String>,
    scope: ShadowScope,
}

impl Inner {
    fn form_name(&self) -> String {
        if !self.props.analytics_name.is_empty() {
            return self.props.analytics_name.clone();
        }
        self.props
            .config_token
            .clone()
            .or_else(|| self.params.as_ref().map(|p| p.config_token.clone()))
            .unwrap_or_default()
    }
}

/// 远程表单包装器：解析参数、拉取 schema、提交并给出结果。
///
/// 方法都只需要 `&self`，可以放进 `Arc` 在多个任务间共享；内部状态锁
/// 不会跨越 `.await` 持有。
pub struct FormWrapper {
    id: Uuid,
    client: reqwest::Client,
    origin: Url,
    resolver: Arc<ConfigResolver>,
    host: HostDocument,
    events: mpsc::UnboundedSender<WrapperEvent>,
    inner: Mutex<Inner>,
}

impl FormWrapper {
    pub fn new(
        props: WrapperProps,
        resolver: Arc<ConfigResolver>,
        client: reqwest::Client,
        origin: Url,
    ) -> (Self, mpsc::UnboundedReceiver<WrapperEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let wrapper = Self {
            id: Uuid::new_v4(),
            client,
            origin,
            resolver,
            host: HostDocument::default(),
            events,
            inner: Mutex::new(Inner {
                props,
                state: RenderState::None,
                generation: 0,
                packet: None,
                params: None,
                form: None,
                success: Vec::new(),
                error: Vec::new(),
                other: Vec::new(),
                scope: ShadowScope::default(),
            }),
        };
        (wrapper, receiver)
    }

    pub fn with_host_document(mut self, host: HostDocument) -> Self {
        self.host = host;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> RenderState {
        self.lock().state
    }

    pub fn props(&self) -> WrapperProps {
        self.lock().props.clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.lock().error.clone()
    }

    pub fn successes(&self) -> Vec<String> {
        self.lock().success.clone()
    }

    pub fn others(&self) -> Vec<String> {
        self.lock().other.clone()
    }

    pub fn form_config(&self) -> Option<FormConfig> {
        self.lock().form.clone()
    }

    pub fn resolved_params(&self) -> Option<ResolvedParams> {
        self.lock().params.clone()
    }

    pub fn form_name(&self) -> String {
        self.lock().form_name()
    }

    pub fn render(&self) -> View {
        let inner = self.lock();
        view::render(&RenderInput {
            state: inner.state,
            visibility: inner.props.container_visibility,
            show_form_on_success: inner.props.show_form_on_success,
            form: inner.form.as_ref(),
            success: &inner.success,
            error: &inner.error,
        })
    }

    // ---- 生命周期 ----

    /// 挂载：加载 schema，然后注入宿主样式
    pub async fn mount(&self) {
        self.load_form_config().await;
        let refs = self.lock().props.inject_shadow_styles.clone();
        if refs.as_deref().is_some_and(|r| !r.is_empty()) {
            self.inject_styles(refs.as_deref());
        }
    }

    /// token 变化：丢弃配置包缓存并重新加载
    pub async fn set_config_token(&self, token: Option<String>) {
        {
            let mut inner = self.lock();
            inner.props.config_token = token;
            inner.packet = None;
        }
        self.load_form_config().await;
    }

    pub async fn set_api_endpoint_url(&self, url: Option<String>) {
        self.lock().props.api_endpoint_url = url;
        self.load_form_config().await;
    }

    /// 引用列表变了才重新注入
    pub fn set_inject_shadow_styles(&self, refs: Option<String>) {
        let changed = {
            let mut inner = self.lock();
            inner.props.inject_shadow_styles = refs.clone();
            inner.scope.injected_refs() != refs.as_deref()
        };
        if changed {
            self.inject_styles(refs.as_deref());
        }
    }

    pub fn shadow_styles(&self) -> Vec<StyleNode> {
        self.lock().scope.children().to_vec()
    }

    /// 其他样式进入隔离作用域
    pub fn append_shadow_style(&self, node: StyleNode) {
        self.lock().scope.append(node);
    }

    fn inject_styles(&self, refs: Option<&str>) {
        self.lock().scope.inject(refs, &self.host);
    }

    // ---- schema 加载 ----

    pub async fn load_form_config(&self) {
        let generation = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.error.clear();
            self.set_state(&mut inner, RenderState::Loading);
            inner.generation
        };

        let packet = self.configuration_packet().await;
        let props = self.props();

        let params = match params::validate(&props, &packet) {
            Ok(params) => params,
            Err(FormError::ParameterValidation(errors)) => {
                self.settle(generation, |inner| {
                    inner.params = None;
                    inner.error = errors;
                    RenderState::InvalidParameter
                });
                return;
            }
            Err(e) => {
                self.settle(generation, |inner| {
                    inner.params = None;
                    inner.error = vec![e.to_string()];
                    RenderState::InvalidParameter
                });
                return;
            }
        };

        {
            let mut inner = self.lock();
            if inner.generation == generation {
                inner.params = Some(params.clone());
            }
        }

        let outcome = match self.request_schema(&params, &props).await {
            Ok(body) => response::classify_schema(body),
            Err(e) => SchemaOutcome::Failed(vec![failure_message(&e)]),
        };

        self.settle(generation, |inner| match outcome {
            SchemaOutcome::Loaded(config) => {
                tracing::debug!(fields = config.fields.len(), "form schema loaded");
                inner.form = Some(config);
                RenderState::GetSuccess
            }
            SchemaOutcome::Failed(errors) => {
                inner.error.extend(errors);
                inner.form = None;
                RenderState::Error
            }
        });
    }

    /// 配置包在当前 token 生命周期内缓存
    async fn configuration_packet(&self) -> ConfigPacket {
        let token = {
            let inner = self.lock();
            if let Some(packet) = &inner.packet {
                return packet.clone();
            }
            inner.props.config_token.clone()
        };

        let packet = params::load_packet(&self.resolver, token.as_deref()).await;

        let mut inner = self.lock();
        // token 在等待期间变了，结果不再缓存
        if inner.props.config_token == token {
            inner.packet = Some(packet.clone());
        }
        packet
    }

    async fn request_schema(&self, params: &ResolvedParams, props: &WrapperProps) -> Result<Value> {
        let url = params::resolve_endpoint(&self.origin, &params.api_endpoint_url)?;
        tracing::debug!(instance = %self.id, %url, "fetching form schema");
        let headers = request_headers(params, props)?;
        let request = match props.method {
            FormMethod::Get => self.client.get(url),
            FormMethod::Post => self.client.post(url),
        };
        let body = request
            .headers(headers)
            .send()
            .await?
            .json::<Value>()
            .await
            .map_err(|e| FormError::SchemaFetch(e.to_string()))?;
        Ok(body)
    }

    // ---- 提交 ----

    /// 提交收集到的字段值。只有持有 schema 且不在加载中时才接受。
    pub async fn submit(&self, values: Map<String, Value>) -> Result<()> {
        let (generation, params, payload, props) = {
            let mut inner = self.lock();
            let ready = matches!(
                inner.state,
                RenderState::GetSuccess
                    | RenderState::PostSuccess
                    | RenderState::Error
                    | RenderState::SuccessAndError
            );
            let (Some(form), Some(params)) = (inner.form.clone(), inner.params.clone()) else {
                return Err(FormError::NotReady(inner.state));
            };
            if !ready || !form.is_renderable() {
                return Err(FormError::NotReady(inner.state));
            }

            self.emit(WrapperEvent::Helix(HelixEventPayload::new(
                SUBMISSION_ANALYTICS_EVENT,
                Vec::new(),
                vec![json!({ "formName": inner.form_name() })],
            )));

            let mut payload = values;
            payload.insert("csrfToken".to_string(), Value::String(form.csrf_token));

            inner.success.clear();
            inner.error.clear();
            inner.other.clear();
            inner.generation += 1;
            self.set_state(&mut inner, RenderState::Loading);
            (inner.generation, params, payload, inner.props.clone())
        };

        self.scroll_into_position(&props, ScrollMoment::Submission);

        let outcome = match self.post_submission(&params, &props, &payload).await {
            Ok(body) => response::classify_submission(body),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => {
                let applied = self.settle(generation, |inner| {
                    inner.success = result.success.clone();
                    inner.error = result.error.clone();
                    inner.other = result.other.clone();
                    response::settled_state(&result)
                });
                if applied {
                    self.scroll_into_position(&props, ScrollMoment::Response);
                    self.emit(WrapperEvent::FormSubmitted(result));
                }
            }
            Err(e) => {
                let message = failure_message(&e);
                tracing::warn!(instance = %self.id, "form submission failed: {}", message);
                let mut error = Vec::new();
                let applied = self.settle(generation, |inner| {
                    inner.error.push(message);
                    error = inner.error.clone();
                    RenderState::Error
                });
                if applied {
                    self.scroll_into_position(&props, ScrollMoment::Error);
                    self.emit(WrapperEvent::FormSubmitted(SubmissionResult {
                        data: Value::Null,
                        error,
                        success: Vec::new(),
                        other: Vec::new(),
                    }));
                }
            }
        }
        Ok(())
    }

    async fn post_submission(
        &self,
        params: &ResolvedParams,
        props: &WrapperProps,
        payload: &Map<String, Value>,
    ) -> Result<Value> {
        let url = params::resolve_endpoint(&self.origin, &params.submission_endpoint_url)?;
        tracing::debug!(instance = %self.id, %url, "posting form submission");
        let headers = request_headers(params, props)?;
        let body = self
            .client
            .post(url)
            .headers(headers)
            .json(payload)
            .send()
            .await?
            .json::<Value>()
            .await?;
        Ok(body)
    }

    // ---- 事件 ----

    /// 转发字段交互事件，按规则补上 formName
    pub fn forward_field_event(&self, mut payload: HelixEventPayload) {
        let (state, form_name) = {
            let inner = self.lock();
            (inner.state, inner.form_name())
        };

        let tag = if TAGGED_FIELD_EVENTS.contains(&payload.name.as_str()) {
            state != RenderState::Loading
        } else if payload.name == DROPDOWN_CHANGE_EVENT {
            // 初次加载时下拉框会触发一次空值变更，不计入
            payload
                .meta
                .first()
                .and_then(|m| m.get("value"))
                .is_some_and(|v| match v {
                    Value::String(s) => !s.is_empty(),
                    Value::Array(items) => !items.is_empty(),
                    Value::Null => false,
                    _ => true,
                })
        } else {
            false
        };

        if tag {
            if let Some(Value::Object(meta)) = payload.meta.first_mut() {
                meta.insert("formName".to_string(), Value::String(form_name));
            }
        }
        self.emit(WrapperEvent::Helix(payload));
    }

    fn emit(&self, event: WrapperEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!(instance = %self.id, "no event listener attached");
        }
    }

    fn scroll_into_position(&self, props: &WrapperProps, moment: ScrollMoment) {
        if props.scroll_after.should_scroll(moment) {
            self.emit(WrapperEvent::ScrollIntoView);
        }
    }

    fn set_state(&self, inner: &mut Inner, state: RenderState) {
        inner.state = state;
        tracing::debug!(instance = %self.id, %state, "render state changed");

        let mut meta = json!({ "renderState": state.as_str() });
        if matches!(state, RenderState::Error | RenderState::SuccessAndError) {
            meta["errorMessage"] = json!(inner.error);
        }
        if matches!(
            state,
            RenderState::Error
                | RenderState::SuccessAndError
                | RenderState::GetSuccess
                | RenderState::PostSuccess
        ) {
            meta["formName"] = Value::String(inner.form_name());
        }
        self.emit(WrapperEvent::Helix(HelixEventPayload::new(
            RENDER_CHANGE_EVENT,
            Vec::new(),
            vec![meta],
        )));
    }

    /// 仅当 generation 仍是最新时应用结果
    fn settle<F>(&self, generation: u64, apply: F) -> bool
    where
        F: FnOnce(&mut Inner) -> RenderState,
    {
        let mut inner = self.lock();
        if inner.generation != generation {
            tracing::debug!(
                instance = %self.id,
                stale = generation,
                current = inner.generation,
                "discarding stale settlement"
            );
            return false;
        }
        let state = apply(&mut *inner);
        self.set_state(&mut inner, state);
        true
    }
}

/// 请求头：token 必带，客户端环境可选；任何一个非法都让本次请求失败
fn request_headers(params: &ResolvedParams, props: &WrapperProps) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let token = HeaderValue::from_str(&params.config_token)
        .map_err(|_| FormError::InvalidHeader("x-config-token"))?;
    headers.insert("x-config-token", token);
    if let Some(env) = props.client_environment.as_deref().filter(|e| !e.is_empty()) {
        let value = HeaderValue::from_str(env)
            .map_err(|_| FormError::InvalidHeader("x-client-environment"))?;
        headers.insert("x-client-environment", value);
    }
    Ok(headers)
}

fn failure_message(error: &FormError) -> String {
    match error {
        FormError::SchemaFetch(message) | FormError::Submission(message) => message.clone(),
        FormError::Http(e) => e.to_string(),
        FormError::Serialization(e) => e.to_string(),
        other => other.to_string(),
    }
}
