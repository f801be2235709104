use chromiumoxide::error::CdpError;
use thiserror::Error;

/// 应用程序错误类型
///
/// 按照恢复方式分为两类：
/// - 单条记录级别（`NotFound` / `Extraction` / `TargetNotFound` / `Navigation` / `Interaction`）：
///   由 `WorkflowLoop` 在每条链接的边界捕获，记录日志后继续处理下一条
/// - 运行级别（`Precondition` / `Session`）：中止整个运行并释放浏览器会话
#[derive(Debug, Error)]
pub enum AppError {
    /// 重试次数用尽仍未找到元素
    #[error("元素未找到: {selector} (已尝试 {attempts} 次)")]
    NotFound { selector: String, attempts: u32 },

    /// 页面缺少必需的结构（Location 行 / Linked Drawings 表头）
    #[error("页面数据提取失败 ({url}): {source}")]
    Extraction {
        url: String,
        #[source]
        source: Box<AppError>,
    },

    /// 下拉列表中没有目标选项
    #[error("下拉列表中未找到目标选项: {target}")]
    TargetNotFound { target: String },

    /// 启动前置条件不满足
    #[error("前置条件不满足: {0}")]
    Precondition(#[from] PreconditionFailure),

    /// 浏览器会话无法创建或已失效
    #[error("浏览器会话错误: {reason}")]
    Session { reason: String },

    /// 页面导航失败
    #[error("导航到 {url} 失败: {reason}")]
    Navigation { url: String, reason: String },

    /// 元素交互失败（点击 / 输入 / 读取文本）
    #[error("元素交互失败 ({action}): {reason}")]
    Interaction { action: String, reason: String },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 导出更新日志失败
    #[error("导出更新日志失败 ({path}): {reason}")]
    Export { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// 前置条件失败原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionFailure {
    /// 未选择浏览器可执行文件
    #[error("未指定浏览器可执行文件路径")]
    MissingBrowserExecutable,

    /// 浏览器可执行文件不存在
    #[error("浏览器可执行文件不存在: {0}")]
    BrowserExecutableNotFound(String),

    /// 操作员尚未确认登录
    #[error("尚未确认登录认证")]
    AuthenticationNotConfirmed,
}

impl AppError {
    /// 是否为致命错误（需要中止整个运行）
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Precondition(_) | AppError::Session { .. })
    }

    /// 创建元素未找到错误
    pub fn not_found(selector: impl Into<String>, attempts: u32) -> Self {
        AppError::NotFound {
            selector: selector.into(),
            attempts,
        }
    }

    /// 将定位错误包装为提取错误；致命错误保持原样
    pub fn extraction(url: impl Into<String>, source: AppError) -> Self {
        if source.is_fatal() {
            return source;
        }
        AppError::Extraction {
            url: url.into(),
            source: Box::new(source),
        }
    }

    /// 创建元素交互错误
    pub fn interaction(action: impl Into<String>, reason: impl ToString) -> Self {
        AppError::Interaction {
            action: action.into(),
            reason: reason.to_string(),
        }
    }

    /// 创建会话错误
    pub fn session(reason: impl ToString) -> Self {
        AppError::Session {
            reason: reason.to_string(),
        }
    }
}

/// 与浏览器的连接已断开（浏览器崩溃或被关闭）
pub fn is_connection_lost(err: &CdpError) -> bool {
    matches!(
        err,
        CdpError::NoResponse | CdpError::ChannelSendError(_) | CdpError::Ws(_)
    )
}

impl From<CdpError> for AppError {
    fn from(err: CdpError) -> Self {
        if is_connection_lost(&err) {
            return AppError::session(format!("浏览器连接已断开: {}", err));
        }
        AppError::Interaction {
            action: "cdp".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Export {
            path: String::new(),
            reason: err.to_string(),
        }
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
