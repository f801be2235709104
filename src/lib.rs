//! # Drawing Location Sync
//!
//! 一个用于核对并修正项目记录 Location 字段的浏览器自动化工具
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `PageDriver` - 页面能力抽象（导航、查找、点击、输入）
//! - `RetryingLocator` - 带重试的元素定位
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单条记录
//! - `PageExtractor` - 读取 Location / Linked Drawings
//! - `ReconciliationEngine` - 纯函数对账决策
//! - `ActionExecutor` - 编辑并保存记录
//! - `UpdateLogWriter` - 导出更新日志
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一条记录"的完整处理流程
//! - `RecordCtx` - 上下文封装（序号 + 链接）
//! - `RecordFlow` - 流程编排（extract → decide → execute）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 应用入口，管理会话和启动门控
//! - `orchestrator/workflow_loop` - 遍历链接列表，响应控制信号
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod control;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::open_session;
pub use config::{Config, WorkflowTimings};
pub use control::{ControlSignal, RunState};
pub use error::{AppError, AppResult, PreconditionFailure};
pub use infrastructure::{PageDriver, Selector};
pub use models::{ReconciliationDecision, TargetLink, UpdateLogEntry};
pub use orchestrator::{App, RunReport, WorkflowLoop};
pub use workflow::{RecordCtx, RecordFlow, RecordOutcome};
