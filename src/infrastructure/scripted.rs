//! 内存页面驱动
//!
//! 按 "URL → 选择器 → 元素" 预先编排页面内容，记录所有导航和交互。
//! 用于在没有浏览器的情况下演练整个流程（单元测试 / 集成测试）。

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{AppError, AppResult};
use crate::infrastructure::page_driver::{PageDriver, PageElement, Selector};

/// 页面上发生的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Navigate(String),
    Click(String),
    Type { element: String, text: String },
    Select(String),
    Release,
}

/// 编排好的元素
#[derive(Debug, Clone, Default)]
pub struct ScriptedNode {
    label: String,
    text: String,
    attributes: HashMap<String, String>,
    children: Vec<(String, ScriptedNode)>,
}

impl ScriptedNode {
    /// `label` 只用于事件记录
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// 添加可以用 CSS `css` 在本元素内找到的子元素
    pub fn child(mut self, css: impl Into<String>, node: ScriptedNode) -> Self {
        self.children.push((css.into(), node));
        self
    }
}

type NavigateHook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct PageState {
    current_url: Option<String>,
    release_count: usize,
}

/// 内存页面驱动
#[derive(Default)]
pub struct ScriptedPage {
    dom: HashMap<String, HashMap<Selector, Vec<ScriptedNode>>>,
    failing_urls: HashSet<String>,
    hooks: HashMap<String, NavigateHook>,
    state: Mutex<PageState>,
    events: Arc<Mutex<Vec<PageEvent>>>,
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在 `url` 页面上放置可以用 `selector` 找到的元素
    pub fn with_element(mut self, url: &str, selector: &Selector, node: ScriptedNode) -> Self {
        self.dom
            .entry(url.to_string())
            .or_default()
            .entry(selector.clone())
            .or_default()
            .push(node);
        self
    }

    /// 导航到 `url` 时失败
    pub fn with_failing_url(mut self, url: &str) -> Self {
        self.failing_urls.insert(url.to_string());
        self
    }

    /// 导航到 `url` 时执行回调（在页面切换完成后）
    pub fn on_navigate(mut self, url: &str, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hooks.insert(url.to_string(), Box::new(hook));
        self
    }

    pub fn events(&self) -> Vec<PageEvent> {
        lock(&self.events).clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PageEvent::Navigate(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    pub fn release_count(&self) -> usize {
        lock(&self.state).release_count
    }

    fn nodes_at_current_url(&self, selector: &Selector) -> Vec<ScriptedNode> {
        let state = lock(&self.state);
        state
            .current_url
            .as_ref()
            .and_then(|url| self.dom.get(url))
            .and_then(|selectors| selectors.get(selector))
            .cloned()
            .unwrap_or_default()
    }

    fn wrap(&self, node: ScriptedNode) -> ScriptedElement {
        ScriptedElement {
            node,
            events: Arc::clone(&self.events),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl PageDriver for ScriptedPage {
    type Element = ScriptedElement;

    async fn goto(&self, url: &str) -> AppResult<()> {
        lock(&self.events).push(PageEvent::Navigate(url.to_string()));
        if self.failing_urls.contains(url) {
            return Err(AppError::Navigation {
                url: url.to_string(),
                reason: "页面无法访问".to_string(),
            });
        }
        lock(&self.state).current_url = Some(url.to_string());
        if let Some(hook) = self.hooks.get(url) {
            hook();
        }
        Ok(())
    }

    async fn find(&self, selector: &Selector) -> AppResult<ScriptedElement> {
        self.nodes_at_current_url(selector)
            .into_iter()
            .next()
            .map(|node| self.wrap(node))
            .ok_or_else(|| AppError::interaction("find", format!("{} 不存在", selector)))
    }

    async fn find_all(&self, selector: &Selector) -> AppResult<Vec<ScriptedElement>> {
        Ok(self
            .nodes_at_current_url(selector)
            .into_iter()
            .map(|node| self.wrap(node))
            .collect())
    }

    async fn release(&self) -> AppResult<()> {
        lock(&self.state).release_count += 1;
        lock(&self.events).push(PageEvent::Release);
        Ok(())
    }
}

/// 内存元素
pub struct ScriptedElement {
    node: ScriptedNode,
    events: Arc<Mutex<Vec<PageEvent>>>,
}

impl ScriptedElement {
    fn record(&self, event: PageEvent) {
        lock(&self.events).push(event);
    }
}

#[async_trait]
impl PageElement for ScriptedElement {
    async fn click(&self) -> AppResult<()> {
        self.record(PageEvent::Click(self.node.label.clone()));
        Ok(())
    }

    async fn type_text(&self, text: &str) -> AppResult<()> {
        self.record(PageEvent::Type {
            element: self.node.label.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn text(&self) -> AppResult<String> {
        Ok(self.node.text.clone())
    }

    async fn attribute(&self, name: &str) -> AppResult<Option<String>> {
        Ok(self.node.attributes.get(name).cloned())
    }

    async fn select(&self) -> AppResult<()> {
        self.record(PageEvent::Select(self.node.label.clone()));
        Ok(())
    }

    async fn find_within(&self, css: &str) -> AppResult<Vec<ScriptedElement>> {
        Ok(self
            .node
            .children
            .iter()
            .filter(|(selector, _)| selector == css)
            .map(|(_, node)| ScriptedElement {
                node: node.clone(),
                events: Arc::clone(&self.events),
            })
            .collect())
    }
}
