use std::io;
use std::sync::Arc;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use ratatui::Terminal;
use serde_json::{json, Map, Value};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::core::view::{Control, FormView, Message, RenderedField, View, INVALID_CONFIG_MESSAGE};
use crate::core::FormWrapper;
use crate::models::{HelixEventPayload, OptionItem, WrapperEvent};

/// 事件面板保留的条数
const EVENT_LOG_LIMIT: usize = 50;

/// 输入模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// 浏览字段
    Normal,
    /// 编辑文本字段
    Editing,
    /// 输入新的 config token
    Token,
}

/// 等待交给包装器执行的异步动作
#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    Submit(Map<String, Value>),
    ChangeToken(Option<String>),
    Reload,
}

/// 字段当前的输入值
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Text {
        text: String,
        masked: bool,
        multiline: bool,
    },
    Flag(bool),
    Choice {
        options: Vec<OptionItem>,
        selected: usize,
    },
    Many {
        options: Vec<OptionItem>,
        selected: Vec<bool>,
        cursor: usize,
    },
    /// 不可编辑：hidden 原样提交，markup / button 不提交
    Fixed(Option<Value>),
}

/// 终端里的一个可交互字段
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInput {
    pub name: String,
    pub label: String,
    pub type_name: &'static str,
    pub required: bool,
    pub value: InputValue,
}

impl FieldInput {
    /// 从渲染结果构建输入，section 子字段展开到同一层
    pub fn from_rendered(field: &RenderedField) -> Vec<FieldInput> {
        let initial_text = match &field.value {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        let value = match &field.control {
            Control::Input { masked } => InputValue::Text {
                text: initial_text,
                masked: *masked,
                multiline: false,
            },
            Control::TextArea => InputValue::Text {
                text: initial_text,
                masked: false,
                multiline: true,
            },
            Control::Toggle => InputValue::Flag(is_truthy(field.value.as_ref())),
            Control::Choice { options, multiple: false } => {
                let selected = options
                    .iter()
                    .position(|o| o.default || o.value == initial_text)
                    .unwrap_or(0);
                InputValue::Choice {
                    options: options.clone(),
                    selected,
                }
            }
            Control::Choice { options, multiple: true } => InputValue::Many {
                selected: options.iter().map(|o| o.default).collect(),
                options: options.clone(),
                cursor: 0,
            },
            Control::Hidden => InputValue::Fixed(field.value.clone()),
            Control::Markup(_) | Control::Action => InputValue::Fixed(None),
            Control::Group(children) => {
                return children.iter().flat_map(FieldInput::from_rendered).collect();
            }
        };

        vec![FieldInput {
            name: field.name.clone(),
            label: field.label.clone(),
            type_name: field.type_name,
            required: field.required,
            value,
        }]
    }

    pub fn is_editable(&self) -> bool {
        !matches!(self.value, InputValue::Fixed(_))
    }

    /// 提交时使用的值；None 表示不提交
    pub fn submitted_value(&self) -> Option<Value> {
        match &self.value {
            InputValue::Text { text, .. } => Some(Value::String(text.clone())),
            InputValue::Flag(flag) => Some(Value::Bool(*flag)),
            InputValue::Choice { options, selected } => Some(Value::String(
                options
                    .get(*selected)
                    .map(|o| o.value.clone())
                    .unwrap_or_default(),
            )),
            InputValue::Many {
                options, selected, ..
            } => Some(Value::Array(
                options
                    .iter()
                    .zip(selected)
                    .filter(|(_, on)| **on)
                    .map(|(o, _)| Value::String(o.value.clone()))
                    .collect(),
            )),
            InputValue::Fixed(value) => value.clone(),
        }
    }

    fn display_value(&self) -> String {
        match &self.value {
            InputValue::Text { text, masked: true, .. } => "*".repeat(text.chars().count()),
            InputValue::Text { text, .. } => text.clone(),
            InputValue::Flag(flag) => (if *flag { "[x]" } else { "[ ]" }).to_string(),
            InputValue::Choice { options, selected } => options
                .get(*selected)
                .map(|o| format!("< {} >", o.label))
                .unwrap_or_else(|| "< >".to_string()),
            InputValue::Many {
                options,
                selected,
                cursor,
            } => options
                .iter()
                .zip(selected)
                .enumerate()
                .map(|(i, (o, on))| {
                    let mark = if *on { "x" } else { " " };
                    let cursor_mark = if i == *cursor { ">" } else { "" };
                    format!("{}[{}] {}", cursor_mark, mark, o.label)
                })
                .collect::<Vec<_>>()
                .join("  "),
            InputValue::Fixed(_) => String::new(),
        }
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true" || s == "on",
        _ => false,
    }
}

/// 在渲染树中找到表单
fn find_form(view: &View) -> Option<&FormView> {
    match view {
        View::Form(form) => Some(form),
        View::InvalidParameter(inner) => find_form(inner),
        View::Stack(parts) => parts.iter().find_map(find_form),
        _ => None,
    }
}

/// TUI 应用状态
pub struct App {
    wrapper: Arc<FormWrapper>,
    events: mpsc::UnboundedReceiver<WrapperEvent>,
    runtime: Handle,
    view: View,
    /// 当前表单的标识，变化时重建输入
    form_key: Option<(String, Vec<String>)>,
    inputs: Vec<FieldInput>,
    selected: usize,
    input_mode: InputMode,
    token_input: String,
    status_message: String,
    event_log: Vec<String>,
    pending: Option<PendingAction>,
    running: bool,
}

impl App {
    /// 包装器应当已经挂载；异步动作在 `runtime` 上执行
    pub fn new(
        wrapper: Arc<FormWrapper>,
        events: mpsc::UnboundedReceiver<WrapperEvent>,
        runtime: Handle,
    ) -> Self {
        let mut app = Self {
            wrapper,
            events,
            runtime,
            view: View::Nothing,
            form_key: None,
            inputs: Vec::new(),
            selected: 0,
            input_mode: InputMode::Normal,
            token_input: String::new(),
            status_message: "Ready".to_string(),
            event_log: Vec::new(),
            pending: None,
            running: true,
        };
        app.drain_events();
        app.refresh_view();
        app
    }

    pub fn wrapper(&self) -> &FormWrapper {
        &self.wrapper
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn inputs(&self) -> &[FieldInput] {
        &self.inputs
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    pub fn token_input(&self) -> &str {
        &self.token_input
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    pub fn event_log(&self) -> &[String] {
        &self.event_log
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// 收集全部字段值
    pub fn values(&self) -> Map<String, Value> {
        self.inputs
            .iter()
            .filter_map(|input| input.submitted_value().map(|v| (input.name.clone(), v)))
            .collect()
    }

    /// 从包装器取最新渲染结果；表单变了才重建输入，避免丢掉用户已填的内容
    pub fn refresh_view(&mut self) {
        self.view = self.wrapper.render();
        let key = find_form(&self.view).map(|form| {
            (
                form.csrf_token.clone(),
                form.fields.iter().map(|f| f.name.clone()).collect::<Vec<_>>(),
            )
        });
        if key != self.form_key {
            self.inputs = find_form(&self.view)
                .map(|form| form.fields.iter().flat_map(FieldInput::from_rendered).collect())
                .unwrap_or_default();
            self.form_key = key;
            self.selected = 0;
        }
        if self.selected >= self.inputs.len() {
            self.selected = self.inputs.len().saturating_sub(1);
        }
    }

    /// 读取包装器发出的事件
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                WrapperEvent::FormSubmitted(result) => {
                    let summary = if result.error.is_empty() {
                        format!("Submitted: {}", result.success.join(", "))
                    } else {
                        format!("Submission errors: {}", result.error.join(", "))
                    };
                    self.set_status(summary);
                }
                WrapperEvent::ScrollIntoView => {
                    self.selected = 0;
                }
                WrapperEvent::Helix(payload) => {
                    let meta = payload
                        .meta
                        .first()
                        .map(Value::to_string)
                        .unwrap_or_default();
                    self.event_log.push(format!("{} {}", payload.name, meta));
                    if self.event_log.len() > EVENT_LOG_LIMIT {
                        self.event_log.remove(0);
                    }
                }
            }
        }
    }

    /// 执行排队的异步动作。不能在 tokio 运行时内部调用。
    pub fn dispatch_pending(&mut self) {
        let Some(action) = self.pending.take() else {
            return;
        };
        let wrapper = self.wrapper.clone();
        match action {
            PendingAction::Submit(values) => {
                if let Err(e) = self.runtime.block_on(wrapper.submit(values)) {
                    self.set_status(format!("Error: {}", e));
                }
            }
            PendingAction::ChangeToken(token) => {
                self.runtime.block_on(wrapper.set_config_token(token));
                self.set_status(format!("Loaded form for token: {}", wrapper.form_name()));
            }
            PendingAction::Reload => {
                self.runtime.block_on(wrapper.load_form_config());
                self.set_status("Reloaded");
            }
        }
        self.drain_events();
        self.refresh_view();
    }

    /// 启动 TUI 事件循环
    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        while self.running {
            terminal.draw(|frame| self.render(frame))?;

            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                self.handle_key(key.code);
                if self.pending.is_some() {
                    terminal.draw(|frame| self.render(frame))?;
                    self.dispatch_pending();
                }
            }
        }
        Ok(())
    }

    /// 处理键盘输入
    fn handle_key(&mut self, code: KeyCode) {
        match self.input_mode {
            InputMode::Editing => {
                self.handle_edit_key(code);
                return;
            }
            InputMode::Token => {
                self.handle_token_key(code);
                return;
            }
            InputMode::Normal => {}
        }

        match code {
            KeyCode::Char('q') => self.running = false,
            KeyCode::Up => {
                if self.selected > 0 {
                    self.selected -= 1;
                }
            }
            KeyCode::Down => {
                if !self.inputs.is_empty() && self.selected < self.inputs.len() - 1 {
                    self.selected += 1;
                }
            }
            KeyCode::Enter => self.start_editing(),
            KeyCode::Char(' ') => self.toggle_selected(),
            KeyCode::Left => self.cycle_selected(false),
            KeyCode::Right => self.cycle_selected(true),
            KeyCode::Char('s') => {
                self.pending = Some(PendingAction::Submit(self.values()));
                self.set_status("Submitting...");
            }
            KeyCode::Char('t') => {
                self.token_input = self.wrapper.props().config_token.unwrap_or_default();
                self.input_mode = InputMode::Token;
                self.set_status("New config token... Enter=confirm, Esc=cancel");
            }
            KeyCode::Char('r') => {
                self.pending = Some(PendingAction::Reload);
                self.set_status("Reloading...");
            }
            _ => {}
        }
    }

    fn start_editing(&mut self) {
        let Some(input) = self.inputs.get(self.selected) else {
            return;
        };
        let InputValue::Text { multiline, .. } = input.value else {
            return;
        };
        let event = if multiline {
            "HelixTextareaFocus"
        } else {
            "HelixInputFocus"
        };
        let name = input.name.clone();
        self.input_mode = InputMode::Editing;
        self.set_status("Editing... Enter/Esc=done");
        self.forward(event, json!({ "name": name }));
    }

    /// 空格：勾选框切换，多选切换光标处选项，单选前进一项
    fn toggle_selected(&mut self) {
        let Some(input) = self.inputs.get_mut(self.selected) else {
            return;
        };
        let name = input.name.clone();
        match &mut input.value {
            InputValue::Flag(flag) => {
                *flag = !*flag;
                let value = *flag;
                self.forward("HelixCheckboxSelect", json!({ "name": name, "value": value }));
            }
            InputValue::Many {
                options,
                selected,
                cursor,
            } => {
                if let Some(on) = selected.get_mut(*cursor) {
                    *on = !*on;
                    let value = options.get(*cursor).map(|o| o.value.clone());
                    self.forward("HelixCheckboxSelect", json!({ "name": name, "value": value }));
                }
            }
            InputValue::Choice { .. } => self.cycle_selected(true),
            _ => {}
        }
    }

    fn cycle_selected(&mut self, forward: bool) {
        let Some(input) = self.inputs.get_mut(self.selected) else {
            return;
        };
        let name = input.name.clone();
        match &mut input.value {
            InputValue::Choice { options, selected } if !options.is_empty() => {
                *selected = if forward {
                    (*selected + 1) % options.len()
                } else {
                    (*selected + options.len() - 1) % options.len()
                };
                let value = options[*selected].value.clone();
                self.forward("HelixSelectChange", json!({ "name": name, "value": value }));
            }
            InputValue::Many {
                options, cursor, ..
            } if !options.is_empty() => {
                *cursor = if forward {
                    (*cursor + 1) % options.len()
                } else {
                    (*cursor + options.len() - 1) % options.len()
                };
            }
            _ => {}
        }
    }

    /// 字段交互交给包装器打标签后再发出
    fn forward(&mut self, name: &str, meta: Value) {
        self.wrapper.forward_field_event(HelixEventPayload::new(
            name,
            vec!["helix-form-wrapper".to_string()],
            vec![meta],
        ));
        self.drain_events();
    }

    fn handle_edit_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc | KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                self.set_status("Ready");
            }
            KeyCode::Backspace => {
                if let Some(InputValue::Text { text, .. }) =
                    self.inputs.get_mut(self.selected).map(|i| &mut i.value)
                {
                    text.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(InputValue::Text { text, .. }) =
                    self.inputs.get_mut(self.selected).map(|i| &mut i.value)
                {
                    text.push(c);
                }
            }
            _ => {}
        }
    }

    fn handle_token_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.token_input.clear();
                self.set_status("Cancelled");
            }
            KeyCode::Enter => {
                let token = self.token_input.trim().to_string();
                let token = if token.is_empty() { None } else { Some(token) };
                self.pending = Some(PendingAction::ChangeToken(token));
                self.input_mode = InputMode::Normal;
                self.token_input.clear();
                self.set_status("Loading...");
            }
            KeyCode::Backspace => {
                self.token_input.pop();
            }
            KeyCode::Char(c) => self.token_input.push(c),
            _ => {}
        }
    }

    // ---- 渲染 ----

    /// 渲染整个界面
    fn render(&self, frame: &mut ratatui::Frame) {
        let area = frame.area();

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(3),
            ])
            .split(area);

        self.render_title(frame, outer[0]);
        self.render_body(frame, outer[1]);
        self.render_status(frame, outer[2]);
    }

    fn render_title(&self, frame: &mut ratatui::Frame, area: Rect) {
        let title = match self.input_mode {
            InputMode::Token => format!("Config token: {}█", self.token_input),
            _ => format!(
                "Helix Form [{}] - {}",
                self.wrapper.form_name(),
                self.wrapper.state()
            ),
        };
        let title = Paragraph::new(title)
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(title, area);
    }

    fn render_body(&self, frame: &mut ratatui::Frame, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);

        let form = Paragraph::new(self.view_lines(&self.view))
            .wrap(Wrap { trim: false })
            .block(Block::default().title(" Form ").borders(Borders::ALL));
        frame.render_widget(form, cols[0]);

        let items: Vec<ListItem> = self
            .event_log
            .iter()
            .rev()
            .map(|e| ListItem::new(e.as_str()))
            .collect();
        let events = List::new(items).block(
            Block::default()
                .title(" Events ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        frame.render_widget(events, cols[1]);
    }

    fn view_lines(&self, view: &View) -> Vec<Line<'_>> {
        match view {
            View::Nothing => Vec::new(),
            View::Spinner => vec![Line::from(Span::styled(
                "Loading...",
                Style::default().fg(Color::Yellow),
            ))],
            View::InvalidParameter(inner) => {
                let mut lines = vec![Line::from(Span::styled(
                    "Invalid parameters",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ))];
                lines.extend(self.view_lines(inner));
                lines
            }
            View::Error(message) => message_lines(message.as_ref(), Color::Red),
            View::Success(message) => {
                let mut lines = message_lines(message.as_ref(), Color::Green);
                // 未标明成败的条目附在成功信息之后
                lines.extend(self.wrapper.others().into_iter().map(|item| {
                    Line::from(Span::styled(
                        format!("· {}", item),
                        Style::default().fg(Color::DarkGray),
                    ))
                }));
                lines
            }
            View::InvalidConfig => vec![Line::from(Span::styled(
                INVALID_CONFIG_MESSAGE,
                Style::default().fg(Color::Red),
            ))],
            View::Form(_) => self.input_lines(),
            View::Stack(parts) => {
                let mut lines = Vec::new();
                for part in parts {
                    if !lines.is_empty() {
                        lines.push(Line::from(""));
                    }
                    lines.extend(self.view_lines(part));
                }
                lines
            }
        }
    }

    fn input_lines(&self) -> Vec<Line<'_>> {
        self.inputs
            .iter()
            .enumerate()
            .filter(|(_, input)| input.is_editable())
            .map(|(i, input)| {
                let is_active = i == self.selected;
                let indicator = if is_active { "▶ " } else { "  " };
                let label_style = if is_active {
                    Style::default().fg(Color::Cyan)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                let required = if input.required { "*" } else { "" };
                let editing = is_active && self.input_mode == InputMode::Editing;
                Line::from(vec![
                    Span::raw(indicator),
                    Span::styled(format!("{}{}: ", input.label, required), label_style),
                    Span::styled(input.display_value(), Style::default().fg(Color::White)),
                    if editing {
                        Span::styled("█", Style::default().fg(Color::Cyan))
                    } else {
                        Span::raw("")
                    },
                ])
            })
            .collect()
    }

    fn render_status(&self, frame: &mut ratatui::Frame, area: Rect) {
        let status = Line::from(vec![
            Span::styled("Status: ", Style::default().fg(Color::DarkGray)),
            Span::styled(&self.status_message, Style::default().fg(Color::Green)),
            Span::raw(" | "),
            Span::styled(
                "q:Quit  ↑↓:Field  Enter:Edit  Space:Toggle  ←→:Option  s:Submit  t:Token  r:Reload",
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        let bar = Paragraph::new(status).block(Block::default().borders(Borders::ALL));
        frame.render_widget(bar, area);
    }
}

fn message_lines(message: Option<&Message>, color: Color) -> Vec<Line<'static>> {
    match message {
        None => Vec::new(),
        Some(Message::Text(text)) => vec![Line::from(Span::styled(
            text.clone(),
            Style::default().fg(color),
        ))],
        Some(Message::List(items)) => items
            .iter()
            .map(|item| Line::from(Span::styled(format!("• {}", item), Style::default().fg(color))))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use axum::extract::State;
    use axum::routing::get;
    use axum::{Json, Router};
    use tokio::runtime::Runtime;
    use url::Url;

    use crate::core::ConfigResolver;
    use crate::models::{RenderState, WrapperProps};
    use crate::testing::spawn_server;

    #[derive(Clone)]
    struct Fixture {
        submission: Value,
        received: Arc<Mutex<Vec<Value>>>,
    }

    async fn schema() -> Json<Value> {
        Json(json!({"data": {"csrfToken": "t1", "fields": [
            {"name": "email", "type": "email", "label": "Email", "order": 0,
             "validators": [{"type": "required"}]},
            {"name": "consent", "type": "checkbox", "label": "Consent", "order": 1},
            {"name": "color", "type": "select", "label": "Color", "order": 2,
             "options": [{"label": "Red", "value": "r"}, {"label": "Blue", "value": "b"}]},
            {"name": "source", "type": "hidden", "value": "tui", "order": 3}
        ]}}))
    }

    async fn submit(State(fx): State<Fixture>, Json(body): Json<Value>) -> Json<Value> {
        fx.received.lock().unwrap().push(body);
        Json(fx.submission.clone())
    }

    /// 辅助：启动表单服务并挂载包装器
    fn test_app() -> (App, Arc<Mutex<Vec<Value>>>, Runtime) {
        test_app_with(json!({"success": true, "data": ["ok"]}))
    }

    /// 辅助：同上，提交响应由调用方给出
    fn test_app_with(submission: Value) -> (App, Arc<Mutex<Vec<Value>>>, Runtime) {
        let rt = Runtime::new().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let fixture = Fixture {
            submission,
            received: received.clone(),
        };

        let wrapper = rt.block_on(async {
            let router = Router::new()
                .route("/forms", get(schema).post(submit))
                .with_state(fixture);
            let origin = Url::parse(&spawn_server(router).await).unwrap();
            let props = WrapperProps {
                config_token: Some("contact".to_string()),
                api_endpoint_url: Some("/forms".to_string()),
                ..WrapperProps::default()
            };
            let resolver = Arc::new(ConfigResolver::preloaded(Map::new()));
            let (wrapper, rx) = FormWrapper::new(props, resolver, reqwest::Client::new(), origin);
            wrapper.mount().await;
            (wrapper, rx)
        });

        let (wrapper, rx) = wrapper;
        let app = App::new(Arc::new(wrapper), rx, rt.handle().clone());
        (app, received, rt)
    }

    fn text_input(name: &str, text: &str) -> FieldInput {
        FieldInput {
            name: name.to_string(),
            label: name.to_string(),
            type_name: "text",
            required: false,
            value: InputValue::Text {
                text: text.to_string(),
                masked: false,
                multiline: false,
            },
        }
    }

    #[test]
    fn test_initial_state() {
        let (app, _received, _rt) = test_app();
        assert_eq!(app.wrapper().state(), RenderState::GetSuccess);
        assert_eq!(app.input_mode(), InputMode::Normal);
        assert_eq!(app.status_message(), "Ready");
        assert!(app.is_running());
        assert_eq!(app.inputs().len(), 4);
        assert_eq!(app.inputs()[0].name, "email");
        assert!(app.inputs()[0].required);
        assert!(!app.inputs()[3].is_editable());
        assert!(app
            .event_log()
            .iter()
            .any(|e| e.starts_with("HelixFormWrapperRenderChange")));
    }

    #[test]
    fn test_field_navigation_bounds() {
        let (mut app, _received, _rt) = test_app();
        app.handle_key(KeyCode::Up);
        assert_eq!(app.selected(), 0);
        for _ in 0..10 {
            app.handle_key(KeyCode::Down);
        }
        assert_eq!(app.selected(), 3);
        app.handle_key(KeyCode::Up);
        assert_eq!(app.selected(), 2);
    }

    #[test]
    fn test_edit_text_field() {
        let (mut app, _received, _rt) = test_app();
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.input_mode(), InputMode::Editing);
        for c in "a@b.coq".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        // 编辑模式下 q 是普通字符
        assert!(app.is_running());
        app.handle_key(KeyCode::Backspace);
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.input_mode(), InputMode::Normal);
        assert_eq!(app.values()["email"], json!("a@b.co"));

        let focus = app
            .event_log()
            .iter()
            .find(|e| e.starts_with("HelixInputFocus"))
            .cloned()
            .unwrap();
        assert!(focus.contains("\"formName\":\"contact\""));
    }

    #[test]
    fn test_toggle_checkbox_and_cycle_select() {
        let (mut app, _received, _rt) = test_app();
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Char(' '));
        assert_eq!(app.values()["consent"], json!(true));

        app.handle_key(KeyCode::Down);
        assert_eq!(app.values()["color"], json!("r"));
        app.handle_key(KeyCode::Right);
        assert_eq!(app.values()["color"], json!("b"));
        app.handle_key(KeyCode::Right);
        assert_eq!(app.values()["color"], json!("r"));
        app.handle_key(KeyCode::Left);
        assert_eq!(app.values()["color"], json!("b"));

        assert!(app.event_log().iter().any(|e| e.starts_with("HelixCheckboxSelect")));
        assert!(app.event_log().iter().any(|e| e.starts_with("HelixSelectChange")));
    }

    #[test]
    fn test_submit_via_tui() {
        let (mut app, received, _rt) = test_app();
        app.handle_key(KeyCode::Enter);
        for c in "x@y.io".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        app.handle_key(KeyCode::Esc);
        app.handle_key(KeyCode::Char('s'));
        assert!(matches!(app.pending(), Some(PendingAction::Submit(_))));

        app.dispatch_pending();
        assert!(app.pending().is_none());
        assert_eq!(app.wrapper().state(), RenderState::PostSuccess);
        assert_eq!(app.status_message(), "Submitted: ok");
        assert!(matches!(app.view(), View::Success(_)));

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["email"], json!("x@y.io"));
        assert_eq!(received[0]["source"], json!("tui"));
        assert_eq!(received[0]["csrfToken"], json!("t1"));
    }

    #[test]
    fn test_success_panel_lists_other_messages() {
        let (mut app, _received, _rt) = test_app_with(json!({
            "requestId": "r1",
            "success": true,
            "data": [
                {"success": true, "message": "saved"},
                {"message": "queued for review"}
            ]
        }));
        app.handle_key(KeyCode::Char('s'));
        app.dispatch_pending();
        assert_eq!(app.wrapper().state(), RenderState::PostSuccess);

        let text: Vec<String> = app
            .view_lines(app.view())
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert!(text.iter().any(|l| l.contains("saved")));
        assert!(text.iter().any(|l| l == "· queued for review"));
    }

    #[test]
    fn test_change_token_via_tui() {
        let (mut app, _received, _rt) = test_app();
        app.handle_key(KeyCode::Char('t'));
        assert_eq!(app.input_mode(), InputMode::Token);
        assert_eq!(app.token_input(), "contact");

        for _ in 0.."contact".len() {
            app.handle_key(KeyCode::Backspace);
        }
        for c in "other".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        app.handle_key(KeyCode::Enter);
        assert_eq!(
            app.pending(),
            Some(&PendingAction::ChangeToken(Some("other".to_string())))
        );

        app.dispatch_pending();
        assert_eq!(app.wrapper().props().config_token.as_deref(), Some("other"));
        assert_eq!(app.wrapper().state(), RenderState::GetSuccess);
    }

    #[test]
    fn test_token_cancel() {
        let (mut app, _received, _rt) = test_app();
        app.handle_key(KeyCode::Char('t'));
        app.handle_key(KeyCode::Esc);
        assert_eq!(app.input_mode(), InputMode::Normal);
        assert!(app.pending().is_none());
        assert_eq!(app.status_message(), "Cancelled");
    }

    #[test]
    fn test_quit() {
        let (mut app, _received, _rt) = test_app();
        app.handle_key(KeyCode::Char('q'));
        assert!(!app.is_running());
    }

    #[test]
    fn test_section_children_flattened() {
        let field = RenderedField {
            name: "group".to_string(),
            label: "Group".to_string(),
            type_name: "section",
            required: false,
            value: None,
            control: Control::Group(vec![RenderedField {
                name: "inner".to_string(),
                label: "Inner".to_string(),
                type_name: "text",
                required: true,
                value: Some(json!("seed")),
                control: Control::Input { masked: false },
            }]),
        };
        let inputs = FieldInput::from_rendered(&field);
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].name, "inner");
        assert_eq!(inputs[0].submitted_value(), Some(json!("seed")));
    }

    #[test]
    fn test_multi_choice_values() {
        let options = vec![
            OptionItem {
                label: "A".to_string(),
                value: "a".to_string(),
                default: true,
            },
            OptionItem {
                label: "B".to_string(),
                value: "b".to_string(),
                default: false,
            },
        ];
        let field = RenderedField {
            name: "letters".to_string(),
            label: "Letters".to_string(),
            type_name: "checkboxes",
            required: false,
            value: None,
            control: Control::Choice {
                options,
                multiple: true,
            },
        };
        let inputs = FieldInput::from_rendered(&field);
        assert_eq!(inputs[0].submitted_value(), Some(json!(["a"])));
        assert_eq!(inputs[0].display_value(), ">[x] A  [ ] B");
    }

    #[test]
    fn test_masked_display() {
        let mut input = text_input("pw", "secret");
        input.value = InputValue::Text {
            text: "secret".to_string(),
            masked: true,
            multiline: false,
        };
        assert_eq!(input.display_value(), "******");
        assert_eq!(text_input("q", "hi").display_value(), "hi");
    }
}
