//! chromiumoxide 页面驱动 - 基础设施层
//!
//! 持有唯一的 Browser / Page 资源，只暴露"导航 / 查找 / 交互"的能力

use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, Page};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{is_connection_lost, AppError, AppResult};
use crate::infrastructure::page_driver::{PageDriver, PageElement, Selector};

/// 选中 option 并通知所属 select
const SELECT_OPTION_JS: &str = r#"function() {
    this.selected = true;
    const select = this.closest('select');
    if (select) {
        select.value = this.value;
        select.dispatchEvent(new Event('input', { bubbles: true }));
        select.dispatchEvent(new Event('change', { bubbles: true }));
    }
}"#;

/// 浏览器会话
///
/// 职责：
/// - 持有 Browser、Page 和后台事件处理任务
/// - 实现 `PageDriver`
/// - `release()` 只真正关闭一次
pub struct ChromiumDriver {
    page: Page,
    browser: Mutex<Option<Browser>>,
    handler_task: Mutex<Option<JoinHandle<()>>>,
    /// 自行启动的浏览器在释放时关闭；附加到已有浏览器时只断开连接
    owns_browser: bool,
}

impl ChromiumDriver {
    pub fn new(browser: Browser, page: Page, handler_task: JoinHandle<()>, owns_browser: bool) -> Self {
        Self {
            page,
            browser: Mutex::new(Some(browser)),
            handler_task: Mutex::new(Some(handler_task)),
            owns_browser,
        }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 会话已释放或后台事件任务已退出时返回 `Session` 错误
    async fn ensure_connected(&self) -> AppResult<()> {
        if self.browser.lock().await.is_none() {
            return Err(AppError::session("浏览器会话已释放"));
        }
        let handler_alive = self
            .handler_task
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.is_finished());
        if !handler_alive {
            return Err(AppError::session("浏览器事件处理已停止，连接可能已断开"));
        }
        Ok(())
    }
}

/// 连接断开映射为 `Session`，其他映射为 `Interaction`
fn element_error(action: &str, err: CdpError) -> AppError {
    if is_connection_lost(&err) {
        AppError::from(err)
    } else {
        AppError::interaction(action, err)
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    type Element = ChromiumElement;

    async fn goto(&self, url: &str) -> AppResult<()> {
        self.ensure_connected().await?;
        debug!("导航到: {}", url);
        match self.page.goto(url).await {
            Ok(_) => Ok(()),
            Err(e) if is_connection_lost(&e) => Err(AppError::from(e)),
            Err(e) => Err(AppError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn find(&self, selector: &Selector) -> AppResult<ChromiumElement> {
        self.ensure_connected().await?;
        let element = match selector {
            Selector::XPath(expr) => self.page.find_xpath(expr.as_str()).await?,
            Selector::Css(expr) => self.page.find_element(expr.as_str()).await?,
        };
        Ok(ChromiumElement(element))
    }

    async fn find_all(&self, selector: &Selector) -> AppResult<Vec<ChromiumElement>> {
        self.ensure_connected().await?;
        let elements = match selector {
            Selector::XPath(expr) => self.page.find_xpaths(expr.as_str()).await,
            Selector::Css(expr) => self.page.find_elements(expr.as_str()).await,
        };
        match elements {
            Ok(elements) => Ok(elements.into_iter().map(ChromiumElement).collect()),
            Err(e) if is_connection_lost(&e) => Err(AppError::from(e)),
            Err(e) => {
                debug!("未找到元素 {}: {}", selector, e);
                Ok(Vec::new())
            }
        }
    }

    async fn release(&self) -> AppResult<()> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            debug!("浏览器会话已释放，忽略重复释放");
            return Ok(());
        };

        if self.owns_browser {
            info!("🧹 正在关闭浏览器...");
            if let Err(e) = browser.close().await {
                warn!("关闭浏览器失败: {}", e);
            }
            if let Err(e) = browser.wait().await {
                warn!("等待浏览器进程退出失败: {}", e);
            }
        } else {
            info!("🧹 断开与浏览器的连接");
        }
        drop(browser);

        if let Some(task) = self.handler_task.lock().await.take() {
            task.abort();
        }

        Ok(())
    }
}

/// chromiumoxide 元素
pub struct ChromiumElement(Element);

#[async_trait]
impl PageElement for ChromiumElement {
    async fn click(&self) -> AppResult<()> {
        self.0
            .click()
            .await
            .map_err(|e| element_error("click", e))?;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> AppResult<()> {
        self.0
            .click()
            .await
            .map_err(|e| element_error("focus", e))?;
        self.0
            .type_str(text)
            .await
            .map_err(|e| element_error("type", e))?;
        Ok(())
    }

    async fn text(&self) -> AppResult<String> {
        let text = self
            .0
            .inner_text()
            .await
            .map_err(|e| element_error("inner_text", e))?;
        Ok(text.unwrap_or_default())
    }

    async fn attribute(&self, name: &str) -> AppResult<Option<String>> {
        self.0
            .attribute(name)
            .await
            .map_err(|e| element_error(&format!("attribute:{}", name), e))
    }

    async fn select(&self) -> AppResult<()> {
        self.0
            .call_js_fn(SELECT_OPTION_JS, false)
            .await
            .map_err(|e| element_error("select", e))?;
        Ok(())
    }

    async fn find_within(&self, css: &str) -> AppResult<Vec<ChromiumElement>> {
        match self.0.find_elements(css).await {
            Ok(elements) => Ok(elements.into_iter().map(ChromiumElement).collect()),
            Err(e) if is_connection_lost(&e) => Err(AppError::from(e)),
            Err(e) => {
                debug!("元素内未找到 {}: {}", css, e);
                Ok(Vec::new())
            }
        }
    }
}
