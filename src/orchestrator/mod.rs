//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责运行生命周期和链接调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理应用生命周期（初始化、启动门控、导出）
//! - 持有浏览器会话
//! - 输出最终统计信息
//!
//! ### `workflow_loop` - 流程循环
//! - 遍历链接列表（Vec<TargetLink>）
//! - 响应暂停 / 恢复 / 停止
//! - 隔离单条记录的错误
//!
//! ### `progress` - 进度计数
//!
//! ## 层次关系
//!
//! ```text
//! app (一次运行)
//!     ↓
//! workflow_loop (处理 Vec<TargetLink>)
//!     ↓
//! workflow::RecordFlow (处理单条记录)
//!     ↓
//! services (能力层：extract / reconcile / execute / export)
//!     ↓
//! infrastructure (基础设施：PageDriver / RetryingLocator)
//! ```

pub mod app;
pub mod progress;
pub mod workflow_loop;

// 重新导出主要类型
pub use app::App;
pub use progress::{ProgressCounter, ProgressSnapshot};
pub use workflow_loop::{LinkStats, LoopState, RunReport, WorkflowLoop};
