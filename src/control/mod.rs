//! 运行控制
//!
//! - `signal` - 三态控制信号（Running / Paused / Stopped）及观察任务
//! - `surface` - 控制台命令（start / pause / resume / stop / confirm / status）

pub mod signal;
pub mod surface;

pub use signal::{ControlSignal, RunState};
pub use surface::{ControlCommand, ControlSurface};
