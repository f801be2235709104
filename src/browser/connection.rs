use chromiumoxide::Browser;
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult};
use crate::infrastructure::ChromiumDriver;

/// 附加到已在调试端口上运行的浏览器
///
/// 优先复用 URL 包含 `url_hint` 的已有页面（通常是已登录的页面），否则新建空白页面。
/// 释放时只断开连接，不关闭浏览器。
pub async fn connect_to_browser(port: u16, url_hint: Option<&str>) -> AppResult<ChromiumDriver> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        AppError::session(format!("无法连接到浏览器 (端口: {}): {}", port, e))
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let pages = browser.pages().await.map_err(|e| AppError::session(format!("获取页面列表失败: {}", e)))?;
    debug!("获取到 {} 个页面", pages.len());

    if let Some(hint) = url_hint {
        for page in pages.iter() {
            if let Ok(Some(url)) = page.url().await {
                debug!("检查页面: {}", url);
                if url.contains(hint) {
                    info!("✓ 复用已打开的页面: {}", url);
                    return Ok(ChromiumDriver::new(browser, page.clone(), handler_task, false));
                }
            }
        }
        debug!("未找到匹配的页面，将创建新页面");
    }

    let page = match browser.new_page("about:blank").await {
        Ok(page) => page,
        Err(e) => {
            error!("创建空白页面失败: {}", e);
            handler_task.abort();
            return Err(AppError::session(format!("创建页面失败: {}", e)));
        }
    };

    Ok(ChromiumDriver::new(browser, page, handler_task, false))
}
