use serde_json::Value;

use crate::models::{ContainerVisibility, FieldDescriptor, FieldKind, FormConfig, OptionItem, RenderState};

pub const INVALID_CONFIG_MESSAGE: &str = "Configuration is invalid, does it contain form fields?";

/// 消息块：一条显示为文本，多条显示为列表
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    List(Vec<String>),
}

impl Message {
    pub fn build(messages: &[String]) -> Option<Message> {
        match messages {
            [] => None,
            [single] => Some(Message::Text(single.clone())),
            many => Some(Message::List(many.to_vec())),
        }
    }
}

/// 字段对应的输入控件
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Input { masked: bool },
    TextArea,
    Toggle,
    Choice { options: Vec<OptionItem>, multiple: bool },
    Action,
    Markup(String),
    Hidden,
    Group(Vec<RenderedField>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedField {
    pub name: String,
    pub label: String,
    pub type_name: &'static str,
    pub required: bool,
    /// schema 给出的初始值
    pub value: Option<Value>,
    pub control: Control,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormView {
    pub csrf_token: String,
    pub fields: Vec<RenderedField>,
}

/// 渲染结果树
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Nothing,
    Spinner,
    InvalidParameter(Box<View>),
    Error(Option<Message>),
    Success(Option<Message>),
    Form(FormView),
    InvalidConfig,
    Stack(Vec<View>),
}

/// 渲染所需的包装器快照
pub struct RenderInput<'a> {
    pub state: RenderState,
    pub visibility: ContainerVisibility,
    pub show_form_on_success: bool,
    pub form: Option<&'a FormConfig>,
    pub success: &'a [String],
    pub error: &'a [String],
}

pub fn render(input: &RenderInput<'_>) -> View {
    match input.state {
        RenderState::None => View::Nothing,
        RenderState::Loading => View::Spinner,
        RenderState::InvalidParameter => View::InvalidParameter(Box::new(error_view(input))),
        RenderState::Error => error_view(input),
        RenderState::GetSuccess => match input.form {
            Some(form) if form.is_renderable() => View::Form(render_form(form)),
            _ => View::InvalidConfig,
        },
        RenderState::PostSuccess => {
            let success = View::Success(Message::build(input.success));
            if input.show_form_on_success {
                View::Stack(vec![success, form_view(input)])
            } else {
                success
            }
        }
        RenderState::SuccessAndError => View::Stack(vec![
            View::Success(Message::build(input.success)),
            error_view(input),
        ]),
    }
}

fn error_view(input: &RenderInput<'_>) -> View {
    match input.visibility {
        ContainerVisibility::ShowBoth => View::Stack(vec![
            View::Error(Message::build(input.error)),
            form_view(input),
        ]),
        ContainerVisibility::ShowOnlyError => View::Error(Message::build(input.error)),
        ContainerVisibility::ShowOnlyForm => form_view(input),
    }
}

fn form_view(input: &RenderInput<'_>) -> View {
    match input.form {
        Some(form) if form.is_renderable() => View::Form(render_form(form)),
        _ => View::Nothing,
    }
}

pub fn render_form(form: &FormConfig) -> FormView {
    FormView {
        csrf_token: form.csrf_token.clone(),
        fields: render_fields(&form.fields),
    }
}

/// 按 order 排序，未知类型跳过
pub fn render_fields(fields: &[FieldDescriptor]) -> Vec<RenderedField> {
    let mut ordered: Vec<&FieldDescriptor> = fields.iter().collect();
    ordered.sort_by_key(|f| f.order);
    ordered.into_iter().filter_map(render_field).collect()
}

pub fn render_field(field: &FieldDescriptor) -> Option<RenderedField> {
    let control = match &field.kind {
        FieldKind::Text
        | FieldKind::Email
        | FieldKind::Autocomplete
        | FieldKind::Date
        | FieldKind::Time
        | FieldKind::Number { .. } => Control::Input { masked: false },
        FieldKind::Password => Control::Input { masked: true },
        FieldKind::Textarea => Control::TextArea,
        FieldKind::Hidden => Control::Hidden,
        FieldKind::Checkbox => Control::Toggle,
        FieldKind::Select { options, .. } | FieldKind::Radio { options } => Control::Choice {
            options: options.clone(),
            multiple: false,
        },
        FieldKind::Checkboxes { options } => Control::Choice {
            options: options.clone(),
            multiple: true,
        },
        FieldKind::Button => Control::Action,
        FieldKind::Html { html } => Control::Markup(html.clone()),
        FieldKind::Section { children, .. } => Control::Group(render_fields(children)),
        FieldKind::Unknown => return None,
    };

    Some(RenderedField {
        name: field.name.clone(),
        label: if field.label.is_empty() {
            field.name.clone()
        } else {
            field.label.clone()
        },
        type_name: field.kind.type_name(),
        required: field.is_required(),
        value: field.value.clone(),
        control,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(fields: serde_json::Value) -> FormConfig {
        serde_json::from_value(json!({"csrfToken": "t1", "fields": fields})).unwrap()
    }

    fn input<'a>(
        state: RenderState,
        form: Option<&'a FormConfig>,
        success: &'a [String],
        error: &'a [String],
    ) -> RenderInput<'a> {
        RenderInput {
            state,
            visibility: ContainerVisibility::ShowBoth,
            show_form_on_success: false,
            form,
            success,
            error,
        }
    }

    #[test]
    fn test_message_build() {
        assert_eq!(Message::build(&[]), None);
        assert_eq!(
            Message::build(&["one".to_string()]),
            Some(Message::Text("one".to_string()))
        );
        assert_eq!(
            Message::build(&["a".to_string(), "b".to_string()]),
            Some(Message::List(vec!["a".to_string(), "b".to_string()]))
        );
    }

    #[test]
    fn test_none_and_loading() {
        assert_eq!(render(&input(RenderState::None, None, &[], &[])), View::Nothing);
        assert_eq!(render(&input(RenderState::Loading, None, &[], &[])), View::Spinner);
    }

    #[test]
    fn test_get_success_renders_single_email_field() {
        let config = form(json!([{"name": "email", "type": "email"}]));
        match render(&input(RenderState::GetSuccess, Some(&config), &[], &[])) {
            View::Form(view) => {
                assert_eq!(view.fields.len(), 1);
                assert_eq!(view.fields[0].name, "email");
                assert_eq!(view.fields[0].type_name, "email");
                assert_eq!(view.fields[0].control, Control::Input { masked: false });
            }
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[test]
    fn test_get_success_without_fields_is_invalid_config() {
        let config = form(json!([]));
        assert_eq!(
            render(&input(RenderState::GetSuccess, Some(&config), &[], &[])),
            View::InvalidConfig
        );
    }

    #[test]
    fn test_error_visibility_modes() {
        let config = form(json!([{"name": "q", "type": "text"}]));
        let errors = vec!["bad".to_string()];
        let mut i = input(RenderState::Error, Some(&config), &[], &errors);

        match render(&i) {
            View::Stack(parts) => {
                assert_eq!(parts[0], View::Error(Some(Message::Text("bad".to_string()))));
                assert!(matches!(parts[1], View::Form(_)));
            }
            other => panic!("unexpected view: {:?}", other),
        }

        i.visibility = ContainerVisibility::ShowOnlyError;
        assert_eq!(render(&i), View::Error(Some(Message::Text("bad".to_string()))));

        i.visibility = ContainerVisibility::ShowOnlyForm;
        assert!(matches!(render(&i), View::Form(_)));
    }

    #[test]
    fn test_invalid_parameter_wraps_error_view() {
        let errors = vec!["a".to_string(), "b".to_string()];
        let mut i = input(RenderState::InvalidParameter, None, &[], &errors);
        i.visibility = ContainerVisibility::ShowOnlyError;
        assert_eq!(
            render(&i),
            View::InvalidParameter(Box::new(View::Error(Some(Message::List(errors.clone())))))
        );
    }

    #[test]
    fn test_post_success_with_and_without_form() {
        let config = form(json!([{"name": "q", "type": "text"}]));
        let success = vec!["ok".to_string()];
        let mut i = input(RenderState::PostSuccess, Some(&config), &success, &[]);
        assert_eq!(render(&i), View::Success(Some(Message::Text("ok".to_string()))));

        i.show_form_on_success = true;
        match render(&i) {
            View::Stack(parts) => assert!(matches!(parts[1], View::Form(_))),
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[test]
    fn test_success_and_error_stacks_both() {
        let success = vec!["saved".to_string()];
        let errors = vec!["Request Id: r1".to_string(), "partial fail".to_string()];
        let mut i = input(RenderState::SuccessAndError, None, &success, &errors);
        i.visibility = ContainerVisibility::ShowOnlyError;
        assert_eq!(
            render(&i),
            View::Stack(vec![
                View::Success(Some(Message::Text("saved".to_string()))),
                View::Error(Some(Message::List(errors.clone()))),
            ])
        );
    }

    #[test]
    fn test_field_dispatch_and_ordering() {
        let config = form(json!([
            {"name": "consent", "type": "checkbox", "order": 3},
            {"name": "pw", "type": "password", "order": 1},
            {"name": "mystery", "type": "hologram", "order": 0},
            {"name": "color", "type": "select", "order": 2,
             "options": [{"label": "Red", "value": "r"}]},
            {"name": "group", "type": "section", "order": 4, "childFieldRefs": ["inner"],
             "children": [{"name": "inner", "type": "text", "label": "Inner",
                           "validators": [{"type": "required"}]}]}
        ]));
        let view = render_form(&config);
        let names: Vec<&str> = view.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["pw", "color", "consent", "group"]);
        assert_eq!(view.fields[0].control, Control::Input { masked: true });
        assert!(matches!(view.fields[1].control, Control::Choice { multiple: false, .. }));
        assert_eq!(view.fields[2].control, Control::Toggle);
        match &view.fields[3].control {
            Control::Group(children) => {
                assert_eq!(children.len(), 1);
                assert_eq!(children[0].label, "Inner");
                assert!(children[0].required);
            }
            other => panic!("unexpected control: {:?}", other),
        }
    }
}
