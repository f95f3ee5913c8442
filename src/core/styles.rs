pub const INJECTED_STYLE_ID: &str = "helix-form-wrapper-injected";

/// 宿主页面 `<head>` 里的一个 `<link>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylesheetLink {
    pub rel: String,
    pub href: String,
}

impl StylesheetLink {
    pub fn stylesheet(href: impl Into<String>) -> Self {
        Self {
            rel: "stylesheet".to_string(),
            href: href.into(),
        }
    }
}

/// 嵌入组件的宿主页面，只关心 head 中的 link
#[derive(Debug, Clone, Default)]
pub struct HostDocument {
    pub head_links: Vec<StylesheetLink>,
}

impl HostDocument {
    pub fn new(head_links: Vec<StylesheetLink>) -> Self {
        Self { head_links }
    }

    /// 逗号分隔的引用片段逐个按子串匹配 href，结果按首次出现去重
    pub fn matching_stylesheets(&self, refs: &str) -> Vec<String> {
        let mut hrefs: Vec<String> = Vec::new();
        for reference in refs.trim().split(',').map(str::trim).filter(|r| !r.is_empty()) {
            for link in &self.head_links {
                if link.href.contains(reference)
                    && link.rel.contains("stylesheet")
                    && !hrefs.contains(&link.href)
                {
                    hrefs.push(link.href.clone());
                }
            }
        }
        hrefs
    }
}

/// 隔离作用域中的一个 style 节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleNode {
    pub id: Option<String>,
    pub css: String,
}

impl StyleNode {
    pub fn new(css: impl Into<String>) -> Self {
        Self {
            id: None,
            css: css.into(),
        }
    }

    fn is_injected(&self) -> bool {
        self.id.as_deref() == Some(INJECTED_STYLE_ID)
    }
}

/// 组件隔离作用域内按顺序排列的 style 节点。
///
/// 注入节点必须保持在最后，其他 style 追加进来时把它重新挪到末尾。
#[derive(Debug, Default)]
pub struct ShadowScope {
    children: Vec<StyleNode>,
    injected_refs: Option<String>,
    observing: bool,
}

impl ShadowScope {
    pub fn children(&self) -> &[StyleNode] {
        &self.children
    }

    pub fn injected_refs(&self) -> Option<&str> {
        self.injected_refs.as_deref()
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    pub fn injected(&self) -> Option<&StyleNode> {
        self.children.iter().find(|node| node.is_injected())
    }

    /// 重新生成注入节点；没有匹配时移除节点并停止观察
    pub fn inject(&mut self, refs: Option<&str>, host: &HostDocument) {
        self.injected_refs = refs.map(String::from);
        self.children.retain(|node| !node.is_injected());

        let hrefs = refs
            .filter(|r| !r.trim().is_empty())
            .map(|r| host.matching_stylesheets(r))
            .unwrap_or_default();

        if hrefs.is_empty() {
            self.observing = false;
            return;
        }

        let css: String = hrefs
            .iter()
            .map(|href| format!("@import url({});", href))
            .collect();
        tracing::debug!(count = hrefs.len(), "injecting host stylesheets");
        self.children.push(StyleNode {
            id: Some(INJECTED_STYLE_ID.to_string()),
            css,
        });
        self.observing = true;
    }

    /// 追加一个 style 节点（对应子节点变化的观察回调）
    pub fn append(&mut self, node: StyleNode) {
        let is_injected = node.is_injected();
        self.children.push(node);
        if self.observing && !is_injected {
            if let Some(pos) = self.children.iter().position(|n| n.is_injected()) {
                let injected = self.children.remove(pos);
                self.children.push(injected);
            }
        }
    }
}
