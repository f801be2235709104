/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::orchestrator::workflow_loop::RunReport;

/// 初始化日志
///
/// 默认级别 info（`verbose` 时为 debug），可以用 `RUST_LOG` 覆盖
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - Location / Linked Drawings 对账");
    info!(
        "启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("📄 链接来源: {}", config.links_source.display());
    info!("📝 更新日志: {}", config.output_log_file.display());
    info!("{}", "=".repeat(60));
}

/// 记录链接加载信息
pub fn log_links_loaded(total: usize) {
    info!("✓ 找到 {} 条待处理的链接", total);
    info!("💡 命令: start / pause / resume / stop / confirm / status\n");
}

/// 打印最终统计信息
pub fn print_final_stats(report: &RunReport, log_file_path: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("📊 处理完成统计 ({:?})", report.state);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📈 已处理: {}/{}", report.processed, report.total);
    info!("✅ 更新位置: {}", report.stats.updated);
    info!("🏷️ 标记无关联图纸: {}", report.stats.marked);
    info!("⏭️ 跳过: {}", report.stats.skipped);
    info!("⚠️ 未找到目标选项: {}", report.stats.target_not_found);
    info!("❌ 失败: {}", report.stats.failed);
    info!("{}", "=".repeat(60));
    info!("\n更新日志已保存至: {}", log_file_path.display());
}
