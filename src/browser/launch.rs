use std::path::{Path, PathBuf};

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult, PreconditionFailure};
use crate::infrastructure::ChromiumDriver;

/// 启动参数：目标系统使用自签名证书
const BROWSER_ARGS: [&str; 2] = ["--ignore-certificate-errors", "--allow-insecure-localhost"];

/// 检查浏览器可执行文件是否已指定且存在
pub fn verify_executable(path: Option<&Path>) -> Result<PathBuf, PreconditionFailure> {
    let path = path.ok_or(PreconditionFailure::MissingBrowserExecutable)?;
    if !path.is_file() {
        return Err(PreconditionFailure::BrowserExecutableNotFound(
            path.display().to_string(),
        ));
    }
    Ok(path.to_path_buf())
}

/// 使用指定的可执行文件启动浏览器，并打开一个空白页面
pub async fn launch_browser(executable: &Path, headless: bool) -> AppResult<ChromiumDriver> {
    info!("🚀 启动浏览器: {}", executable.display());

    let mut builder = BrowserConfig::builder()
        .chrome_executable(executable)
        .args(BROWSER_ARGS.to_vec());
    builder = if headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };

    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        AppError::session(format!("配置浏览器失败: {}", e))
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        AppError::session(format!("启动浏览器失败: {}", e))
    })?;
    debug!("浏览器启动成功");

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

    let page = match browser.new_page("about:blank").await {
        Ok(page) => page,
        Err(e) => {
            error!("创建页面失败: {}", e);
            handler_task.abort();
            return Err(AppError::session(format!("创建页面失败: {}", e)));
        }
    };

    info!("✅ 浏览器已就绪");
    Ok(ChromiumDriver::new(browser, page, handler_task, true))
}
