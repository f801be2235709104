//! 运行控制信号
//!
//! 三态：Running / Paused / Stopped。
//! 外部（控制台命令）写入，流程循环读取；Stopped 是终态。

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info};

const RUNNING: u8 = 0;
const PAUSED: u8 = 1;
const STOPPED: u8 = 2;

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
    Stopped,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            RUNNING => RunState::Running,
            PAUSED => RunState::Paused,
            _ => RunState::Stopped,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Running => "运行中",
            RunState::Paused => "已暂停",
            RunState::Stopped => "已停止",
        };
        f.write_str(name)
    }
}

/// 控制信号
///
/// 通过 `Arc<ControlSignal>` 在流程循环、观察任务和控制台之间共享，
/// 不使用全局状态，多个流程实例互不影响。
#[derive(Debug)]
pub struct ControlSignal {
    state: AtomicU8,
    changed: Notify,
}

impl Default for ControlSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlSignal {
    /// 初始状态为 Running
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(RUNNING),
            changed: Notify::new(),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn current_state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_stopped(&self) -> bool {
        self.current_state() == RunState::Stopped
    }

    /// Running → Paused；其他状态下无效果
    pub fn pause(&self) -> bool {
        self.transition(RUNNING, PAUSED)
    }

    /// Paused → Running；其他状态下无效果
    pub fn resume(&self) -> bool {
        self.transition(PAUSED, RUNNING)
    }

    /// 进入终态 Stopped；返回本次调用是否真正改变了状态
    pub fn stop(&self) -> bool {
        let previous = self.state.swap(STOPPED, Ordering::SeqCst);
        self.changed.notify_waiters();
        previous != STOPPED
    }

    fn transition(&self, from: u8, to: u8) -> bool {
        let changed = self
            .state
            .compare_exchange(from, to, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if changed {
            self.changed.notify_waiters();
        }
        changed
    }

    /// 暂停期间阻塞，直到变为 Running 或 Stopped
    ///
    /// 每隔 `poll` 检查一次状态，状态变化时会被提前唤醒。
    pub async fn wait_while_paused(&self, poll: Duration) -> RunState {
        loop {
            let notified = self.changed.notified();
            let state = self.current_state();
            if state != RunState::Paused {
                return state;
            }
            let _ = timeout(poll, notified).await;
        }
    }

    /// 启动后台观察任务
    ///
    /// 只记录暂停 / 恢复，不做任何其他工作，也不访问浏览器；
    /// 信号进入 Stopped 后退出。
    pub fn spawn_watcher(self: &Arc<Self>, poll: Duration) -> JoinHandle<()> {
        let signal = Arc::clone(self);
        tokio::spawn(async move {
            debug!("控制信号观察任务已启动");
            loop {
                match signal.current_state() {
                    RunState::Stopped => break,
                    RunState::Paused => {
                        info!("⏸️ 已暂停，等待恢复...");
                        match signal.wait_while_paused(poll).await {
                            RunState::Running => info!("▶️ 已恢复运行"),
                            _ => break,
                        }
                    }
                    RunState::Running => {
                        let _ = timeout(poll, signal.changed.notified()).await;
                    }
                }
            }
            debug!("控制信号观察任务已退出");
        })
    }
}
