//! 控制台 - 外部控制入口
//!
//! 从标准输入读取命令并映射到控制信号：
//! `start` / `pause` / `resume` / `stop` / `confirm` / `status`

use std::io::{BufRead, BufReader, Read};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::control::signal::ControlSignal;
use crate::orchestrator::progress::ProgressCounter;

/// 控制命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Pause,
    Resume,
    Stop,
    /// 操作员确认已在浏览器中完成登录
    ConfirmAuth,
    Status,
}

impl FromStr for ControlCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" | "run" => Ok(ControlCommand::Start),
            "pause" | "p" => Ok(ControlCommand::Pause),
            "resume" | "r" => Ok(ControlCommand::Resume),
            "stop" | "quit" | "q" => Ok(ControlCommand::Stop),
            "confirm" | "auth" => Ok(ControlCommand::ConfirmAuth),
            "status" | "s" => Ok(ControlCommand::Status),
            other => Err(format!("未知命令: {}", other)),
        }
    }
}

/// 控制台
///
/// 只改变控制信号 / 认证确认 / 启动请求，不直接操作流程或浏览器
#[derive(Clone)]
pub struct ControlSurface {
    signal: Arc<ControlSignal>,
    auth_confirmed: Arc<AtomicBool>,
    progress: ProgressCounter,
    start_tx: mpsc::Sender<()>,
}

impl ControlSurface {
    pub fn new(
        signal: Arc<ControlSignal>,
        auth_confirmed: Arc<AtomicBool>,
        progress: ProgressCounter,
        start_tx: mpsc::Sender<()>,
    ) -> Self {
        Self {
            signal,
            auth_confirmed,
            progress,
            start_tx,
        }
    }

    /// 执行一条命令
    pub fn handle(&self, command: ControlCommand) {
        match command {
            ControlCommand::Start => {
                if self.start_tx.try_send(()).is_err() {
                    warn!("⚠️ 已有启动请求在等待处理");
                }
            }
            ControlCommand::Pause => {
                if self.signal.pause() {
                    info!("⏸️ 收到暂停命令");
                } else {
                    warn!("当前状态为 {}，暂停无效", self.signal.current_state());
                }
            }
            ControlCommand::Resume => {
                if self.signal.resume() {
                    info!("▶️ 收到恢复命令");
                } else {
                    warn!("当前状态为 {}，恢复无效", self.signal.current_state());
                }
            }
            ControlCommand::Stop => {
                if self.signal.stop() {
                    info!("⏹️ 收到停止命令，当前记录处理完后退出");
                }
            }
            ControlCommand::ConfirmAuth => {
                self.auth_confirmed.store(true, Ordering::SeqCst);
                info!("✓ 已确认登录认证");
            }
            ControlCommand::Status => {
                let snapshot = self.progress.snapshot();
                info!(
                    "📊 状态: {} | 进度 {}/{} ({:.0}%)",
                    self.signal.current_state(),
                    snapshot.processed,
                    snapshot.total,
                    snapshot.percent()
                );
            }
        }
    }

    /// 逐行读取命令直到输入结束或信号停止
    pub async fn run<R: AsyncBufRead + Unpin>(self, reader: R) {
        let mut lines = reader.lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("控制台输入已结束");
                    break;
                }
                Err(e) => {
                    warn!("读取控制台输入失败: {}", e);
                    break;
                }
            };
            if !self.handle_line(&line) {
                break;
            }
        }
    }

    /// 从通道接收命令行直到通道关闭或信号停止
    pub async fn listen(self, mut lines: mpsc::Receiver<String>) {
        while let Some(line) = lines.recv().await {
            if !self.handle_line(&line) {
                return;
            }
        }
        debug!("控制台输入已结束");
    }

    /// 处理一行输入；返回 false 表示应当停止读取
    fn handle_line(&self, line: &str) -> bool {
        if !line.trim().is_empty() {
            match line.parse::<ControlCommand>() {
                Ok(command) => self.handle(command),
                Err(e) => warn!("{} (可用: start / pause / resume / stop / confirm / status)", e),
            }
        }
        !self.signal.is_stopped()
    }

    /// 在后台读取标准输入
    ///
    /// 阻塞读取放在独立线程中，返回的任务可以随时 abort，不会拖住运行时退出
    pub fn spawn_stdin(self) -> JoinHandle<()> {
        let lines = spawn_line_reader(std::io::stdin());
        tokio::spawn(self.listen(lines))
    }
}

/// 在独立线程中逐行读取 `reader`，通过通道转发
///
/// 接收端关闭后线程在下一行到达时退出；一直阻塞的线程不会阻止进程退出
pub fn spawn_line_reader<R: Read + Send + 'static>(reader: R) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    let spawned = std::thread::Builder::new()
        .name("control-input".to_string())
        .spawn(move || {
            for line in BufReader::new(reader).lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("读取控制台输入失败: {}", e);
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        warn!("无法启动控制台读取线程: {}", e);
    }
    rx
}
