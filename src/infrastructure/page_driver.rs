//! 页面驱动抽象 - 基础设施层
//!
//! 上层（services / workflow）只通过这两个 trait 操作页面，
//! 不直接接触 chromiumoxide，便于在没有浏览器的情况下测试。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AppResult;

/// 元素选择器
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Selector {
    XPath(String),
    Css(String),
}

impl Selector {
    pub fn xpath(expr: impl Into<String>) -> Self {
        Selector::XPath(expr.into())
    }

    pub fn css(expr: impl Into<String>) -> Self {
        Selector::Css(expr.into())
    }

    /// 以 `/` 或 `(` 开头的表达式视为 XPath，其余视为 CSS
    pub fn parse(expr: &str) -> Self {
        let expr = expr.trim();
        if expr.starts_with('/') || expr.starts_with('(') {
            Selector::XPath(expr.to_string())
        } else {
            Selector::Css(expr.to_string())
        }
    }

    pub fn expr(&self) -> &str {
        match self {
            Selector::XPath(expr) | Selector::Css(expr) => expr,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.expr().is_empty()
    }
}

impl From<String> for Selector {
    fn from(expr: String) -> Self {
        Selector::parse(&expr)
    }
}

impl From<&str> for Selector {
    fn from(expr: &str) -> Self {
        Selector::parse(expr)
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.expr().to_string()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::XPath(expr) => write!(f, "xpath={}", expr),
            Selector::Css(expr) => write!(f, "css={}", expr),
        }
    }
}

/// 页面上的一个元素
///
/// 元素句柄在页面导航后失效，调用方不得跨导航缓存。
#[async_trait]
pub trait PageElement: Send + Sync + Sized {
    async fn click(&self) -> AppResult<()>;

    async fn type_text(&self, text: &str) -> AppResult<()>;

    /// 元素的可见文本（未 trim）
    async fn text(&self) -> AppResult<String>;

    async fn attribute(&self, name: &str) -> AppResult<Option<String>>;

    /// 选中 `<option>` 元素并触发所属 `<select>` 的 change 事件
    async fn select(&self) -> AppResult<()>;

    /// 在当前元素内部查找（仅 CSS）
    async fn find_within(&self, css: &str) -> AppResult<Vec<Self>>;
}

/// 页面驱动
///
/// 唯一持有浏览器页面的对象，只暴露"导航 / 查找"能力，不认识记录和业务流程。
#[async_trait]
pub trait PageDriver: Send + Sync {
    type Element: PageElement;

    async fn goto(&self, url: &str) -> AppResult<()>;

    /// 查找第一个匹配的元素；找不到时返回错误
    async fn find(&self, selector: &Selector) -> AppResult<Self::Element>;

    /// 查找全部匹配的元素；找不到时返回空列表
    async fn find_all(&self, selector: &Selector) -> AppResult<Vec<Self::Element>>;

    /// 释放浏览器会话，重复调用无副作用
    async fn release(&self) -> AppResult<()>;
}
