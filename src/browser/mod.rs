//! 浏览器会话
//!
//! - `launch` - 使用指定的可执行文件启动浏览器
//! - `connection` - 附加到已在调试端口上运行的浏览器

pub mod connection;
pub mod launch;

use tracing::info;

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::ChromiumDriver;

pub use connection::connect_to_browser;
pub use launch::{launch_browser, verify_executable};

/// 按配置创建浏览器会话
///
/// 设置了调试端口时附加到已有浏览器，否则启动新浏览器；
/// 启动前检查可执行文件，缺失时返回前置条件错误，不做任何导航。
pub async fn open_session(config: &Config) -> AppResult<ChromiumDriver> {
    match config.browser_debug_port {
        Some(port) => {
            info!("附加模式：使用调试端口 {}", port);
            connect_to_browser(port, config.login_url.as_deref()).await
        }
        None => {
            let executable = verify_executable(config.browser_executable.as_deref())?;
            launch_browser(&executable, config.headless).await
        }
    }
}
