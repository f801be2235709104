//! 记录处理流程 - 流程层
//!
//! 核心职责：定义"一条记录"的完整处理流程
//!
//! 流程顺序：
//! 1. 打开详情页，等待页面稳定
//! 2. 提取 Location / Linked Drawings
//! 3. 对账决策
//! 4. 执行决策（编辑 → 保存）

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{PageDriver, RetryingLocator};
use crate::models::record::{ReconciliationDecision, UpdateLogEntry};
use crate::services::{ActionExecutor, EntryDraft, PageExtractor, ReconciliationEngine};
use crate::workflow::record_ctx::RecordCtx;

/// 单条记录的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// 已一致或图纸页面，未修改
    Skipped,
    /// 已标记为无关联图纸
    MarkedNoLinkedDrawing(UpdateLogEntry),
    /// 已更新位置
    Updated(UpdateLogEntry),
}

impl RecordOutcome {
    pub fn entry(&self) -> Option<&UpdateLogEntry> {
        match self {
            RecordOutcome::Skipped => None,
            RecordOutcome::MarkedNoLinkedDrawing(entry) | RecordOutcome::Updated(entry) => Some(entry),
        }
    }
}

/// 记录处理流程
///
/// - 编排提取 → 决策 → 执行
/// - 不持有浏览器资源，只通过定位器使用页面
pub struct RecordFlow {
    extractor: PageExtractor,
    engine: ReconciliationEngine,
    executor: ActionExecutor,
    settle_delay: Duration,
}

impl RecordFlow {
    pub fn new(
        extractor: PageExtractor,
        engine: ReconciliationEngine,
        executor: ActionExecutor,
        settle_delay: Duration,
    ) -> Self {
        Self {
            extractor,
            engine,
            executor,
            settle_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            PageExtractor::new(config.selectors.clone()),
            ReconciliationEngine::new(config.rules.clone()),
            ActionExecutor::from_config(config),
            config.timings().settle_delay,
        )
    }

    pub async fn run<D: PageDriver>(
        &self,
        locator: &RetryingLocator<'_, D>,
        ctx: &RecordCtx,
    ) -> AppResult<RecordOutcome> {
        locator.driver().goto(ctx.link.as_str()).await?;
        sleep(self.settle_delay).await;

        let record = self.extractor.extract(locator, &ctx.link).await?;
        let location = self.engine.normalize_location(&record.raw_location_text);
        let decision = self.engine.decide(&record);

        let draft = match (&decision, record.linked_drawing_text()) {
            (ReconciliationDecision::Skip, _) => {
                info!("{} ⏭️ 跳过 (location: '{}')", ctx, location);
                return Ok(RecordOutcome::Skipped);
            }
            (ReconciliationDecision::MarkNoLinkedDrawing, _) => {
                info!("{} 未找到关联图纸，标记为 No linked drawing...", ctx);
                EntryDraft {
                    url: ctx.link.clone(),
                    original_location: location,
                    linked_drawing: String::new(),
                }
            }
            (ReconciliationDecision::UpdateLocation { target }, text) => {
                let drawing = text
                    .map(|t| self.engine.normalize_drawing_number(t))
                    .unwrap_or_default();
                info!(
                    "{} Location: {}, Linked Drawings: {} → 更新为 '{}'",
                    ctx, location, drawing, target
                );
                EntryDraft {
                    url: ctx.link.clone(),
                    original_location: location,
                    linked_drawing: drawing,
                }
            }
        };

        let entry = self.executor.execute(locator, &decision, &draft).await?;
        debug!("{} 执行结果: {:?}", ctx, entry);

        Ok(match (decision, entry) {
            (_, None) => RecordOutcome::Skipped,
            (ReconciliationDecision::MarkNoLinkedDrawing, Some(entry)) => {
                RecordOutcome::MarkedNoLinkedDrawing(entry)
            }
            (_, Some(entry)) => RecordOutcome::Updated(entry),
        })
    }
}
