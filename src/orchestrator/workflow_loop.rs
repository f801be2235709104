//! 流程循环 - 编排层
//!
//! ## 职责
//!
//! 按顺序遍历链接列表，是整个运行的主干。
//!
//! ## 核心功能
//!
//! 1. **信号检查**：每条链接开始前检查控制信号（暂停则等待，停止则退出）
//! 2. **流程调度**：委托 `RecordFlow` 处理单条记录
//! 3. **错误隔离**：单条记录的错误记录日志后继续，致命错误中止运行
//! 4. **进度统计**：更新进度计数器，收集更新日志
//! 5. **资源释放**：结束（完成 / 停止 / 中止）时恰好释放一次浏览器会话
//!
//! ## 状态机
//!
//! ```text
//! Idle → Running ⇄ Paused
//!          ↓         ↓
//!   Completed / Stopped / Aborted（终态）
//! ```

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::WorkflowTimings;
use crate::control::{ControlSignal, RunState};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{PageDriver, RetryingLocator};
use crate::models::record::{TargetLink, UpdateLogEntry};
use crate::orchestrator::progress::ProgressCounter;
use crate::workflow::{RecordCtx, RecordFlow, RecordOutcome};

/// 流程循环状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Paused,
    Stopped,
    Completed,
    Aborted,
}

impl LoopState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LoopState::Stopped | LoopState::Completed | LoopState::Aborted)
    }
}

pub fn allowed_transitions(from: LoopState) -> &'static [LoopState] {
    use LoopState::*;
    match from {
        Idle => &[Running, Aborted],
        Running => &[Paused, Stopped, Completed, Aborted],
        Paused => &[Running, Stopped, Aborted],
        Stopped | Completed | Aborted => &[],
    }
}

/// 单次运行的统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkStats {
    pub updated: usize,
    pub marked: usize,
    pub skipped: usize,
    pub target_not_found: usize,
    pub failed: usize,
}

/// 运行报告
#[derive(Debug, Clone)]
pub struct RunReport {
    pub state: LoopState,
    /// 按链接顺序排列的更新日志
    pub entries: Vec<UpdateLogEntry>,
    pub stats: LinkStats,
    pub processed: usize,
    pub total: usize,
}

/// 流程循环
pub struct WorkflowLoop<'a, D: PageDriver> {
    driver: &'a D,
    flow: RecordFlow,
    signal: Arc<ControlSignal>,
    progress: ProgressCounter,
    timings: WorkflowTimings,
    state: LoopState,
}

impl<'a, D: PageDriver> WorkflowLoop<'a, D> {
    pub fn new(
        driver: &'a D,
        flow: RecordFlow,
        signal: Arc<ControlSignal>,
        progress: ProgressCounter,
        timings: WorkflowTimings,
    ) -> Self {
        Self {
            driver,
            flow,
            signal,
            progress,
            timings,
            state: LoopState::Idle,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    fn transition(&mut self, to: LoopState) {
        if self.state == to {
            return;
        }
        debug_assert!(
            allowed_transitions(self.state).contains(&to),
            "illegal loop transition {:?} -> {:?}",
            self.state,
            to
        );
        debug!("流程状态: {:?} → {:?}", self.state, to);
        self.state = to;
    }

    /// 运行整个流程
    ///
    /// 正常完成或收到停止信号时返回报告；致命错误时释放会话后返回错误。
    pub async fn run(mut self, links: &[TargetLink]) -> AppResult<RunReport> {
        let total = links.len();
        self.progress.reset(total);
        self.transition(LoopState::Running);

        let watcher = self.signal.spawn_watcher(self.timings.pause_poll);
        let locator = RetryingLocator::new(self.driver, self.timings.retry);

        let mut entries = Vec::new();
        let mut stats = LinkStats::default();
        let mut fatal: Option<AppError> = None;

        for (idx, link) in links.iter().enumerate() {
            if !self.await_go_ahead().await {
                info!("⏹️ 收到停止信号，剩余 {} 条链接未处理", total - idx);
                break;
            }

            let ctx = RecordCtx::new(idx + 1, total, link.clone());
            info!("\n{} {}", ctx, "─".repeat(30));
            info!("{} 打开: {}", ctx, link);

            match self.flow.run(&locator, &ctx).await {
                Ok(outcome) => {
                    match &outcome {
                        RecordOutcome::Skipped => stats.skipped += 1,
                        RecordOutcome::MarkedNoLinkedDrawing(_) => stats.marked += 1,
                        RecordOutcome::Updated(_) => stats.updated += 1,
                    }
                    if let Some(entry) = outcome.entry() {
                        entries.push(entry.clone());
                    }
                }
                Err(AppError::TargetNotFound { target }) => {
                    warn!("{} ⚠️ 下拉列表中未找到 '{}'，未做修改: {}", ctx, target, link);
                    stats.target_not_found += 1;
                }
                Err(e) if e.is_fatal() => {
                    error!("{} ❌ 致命错误，中止运行 ({}): {}", ctx, link, e);
                    fatal = Some(e);
                    break;
                }
                Err(e) => {
                    error!("{} ❌ 处理失败 ({}): {}", ctx, link, e);
                    stats.failed += 1;
                }
            }

            let snapshot = self.progress.advance();
            info!(
                "📈 进度: {}/{} ({:.0}%)",
                snapshot.processed,
                snapshot.total,
                snapshot.percent()
            );
        }

        watcher.abort();

        if let Some(e) = fatal {
            self.transition(LoopState::Aborted);
            self.release_session().await;
            return Err(e);
        }

        if self.state == LoopState::Running {
            self.transition(LoopState::Completed);
        }
        self.release_session().await;

        Ok(RunReport {
            state: self.state,
            entries,
            stats,
            processed: self.progress.snapshot().processed,
            total,
        })
    }

    /// 检查控制信号；暂停时阻塞等待。返回 false 表示应当停止。
    async fn await_go_ahead(&mut self) -> bool {
        if self.signal.current_state() == RunState::Paused {
            self.transition(LoopState::Paused);
        }

        match self.signal.wait_while_paused(self.timings.pause_poll).await {
            RunState::Stopped => {
                self.transition(LoopState::Stopped);
                false
            }
            _ => {
                self.transition(LoopState::Running);
                true
            }
        }
    }

    async fn release_session(&self) {
        if let Err(e) = self.driver.release().await {
            warn!("释放浏览器会话失败: {}", e);
        }
    }
}
