//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 持有浏览器会话，串起一次完整运行。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：启动日志、打开浏览器会话、导航到登录页
//! 2. **链接加载**：从 PDF / TOML / 文本文件读取目标链接
//! 3. **启动门控**：等待 `start` 命令（或 `AUTO_START`），并要求已确认登录
//! 4. **流程运行**：委托 `WorkflowLoop` 逐条处理
//! 5. **结果导出**：写出更新日志，输出最终统计

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::browser;
use crate::config::Config;
use crate::control::{ControlSignal, ControlSurface};
use crate::error::PreconditionFailure;
use crate::infrastructure::{ChromiumDriver, PageDriver};
use crate::models::load_links;
use crate::orchestrator::progress::ProgressCounter;
use crate::orchestrator::workflow_loop::WorkflowLoop;
use crate::services::UpdateLogWriter;
use crate::utils::logging::{log_links_loaded, log_startup, print_final_stats};
use crate::workflow::RecordFlow;

/// 应用主结构
pub struct App {
    config: Config,
    driver: ChromiumDriver,
    signal: Arc<ControlSignal>,
    progress: ProgressCounter,
    auth_confirmed: Arc<AtomicBool>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        // 无人值守模式必须在打开浏览器之前确认登录
        check_unattended_start(&config)?;

        let driver = browser::open_session(&config).await?;

        if let Some(login_url) = &config.login_url {
            info!("🔐 打开登录页: {}", login_url);
            if let Err(e) = driver.goto(login_url).await {
                warn!("打开登录页失败: {}", e);
            }
        }

        let auth_confirmed = Arc::new(AtomicBool::new(config.auth_confirmed));

        Ok(Self {
            config,
            driver,
            signal: ControlSignal::shared(),
            progress: ProgressCounter::new(0),
            auth_confirmed,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(self) -> Result<()> {
        info!("\n📁 正在读取链接来源...");
        let links = load_links(&self.config.links_source).await;

        if links.is_empty() {
            warn!("⚠️ 没有找到待处理的链接，程序结束");
            self.release().await;
            return Ok(());
        }

        log_links_loaded(links.len());
        self.progress.reset(links.len());

        let (start_tx, mut start_rx) = mpsc::channel(1);
        let console = ControlSurface::new(
            Arc::clone(&self.signal),
            Arc::clone(&self.auth_confirmed),
            self.progress.clone(),
            start_tx,
        )
        .spawn_stdin();

        match await_start(&mut start_rx, &self.auth_confirmed, self.config.auto_start).await {
            Ok(true) => {}
            Ok(false) => {
                info!("控制台已关闭，未开始处理");
                console.abort();
                self.release().await;
                return Ok(());
            }
            Err(e) => {
                console.abort();
                self.release().await;
                return Err(e.into());
            }
        }

        let flow = RecordFlow::from_config(&self.config);
        let workflow = WorkflowLoop::new(
            &self.driver,
            flow,
            Arc::clone(&self.signal),
            self.progress.clone(),
            self.config.timings(),
        );

        let report = workflow.run(&links).await;
        console.abort();
        let report = report?;

        let writer = UpdateLogWriter::new(&self.config.output_log_file);
        if let Err(e) = writer.write(&report.entries).await {
            error!("❌ 写入更新日志失败: {}", e);
            return Err(e.into());
        }

        print_final_stats(&report, writer.path());
        Ok(())
    }

    async fn release(&self) {
        if let Err(e) = self.driver.release().await {
            warn!("释放浏览器会话失败: {}", e);
        }
    }
}

/// `AUTO_START` 时要求已经确认登录
pub fn check_unattended_start(config: &Config) -> Result<(), PreconditionFailure> {
    if config.auto_start && !config.auth_confirmed {
        return Err(PreconditionFailure::AuthenticationNotConfirmed);
    }
    Ok(())
}

/// 等待启动请求
///
/// 返回 false 表示控制台在启动前关闭
pub async fn await_start(
    start_rx: &mut mpsc::Receiver<()>,
    auth_confirmed: &AtomicBool,
    auto_start: bool,
) -> Result<bool, PreconditionFailure> {
    if auto_start {
        if !auth_confirmed.load(Ordering::SeqCst) {
            return Err(PreconditionFailure::AuthenticationNotConfirmed);
        }
        info!("▶️ 自动开始处理");
        return Ok(true);
    }

    info!("请在浏览器中完成登录后输入 confirm，然后输入 start 开始处理");
    while start_rx.recv().await.is_some() {
        if auth_confirmed.load(Ordering::SeqCst) {
            info!("▶️ 开始处理");
            return Ok(true);
        }
        error!("{}，请先输入 confirm", PreconditionFailure::AuthenticationNotConfirmed);
    }
    Ok(false)
}
