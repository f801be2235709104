//! 更新日志导出 - 业务能力层
//!
//! 只负责把更新日志写到文件，不关心流程

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::record::UpdateLogEntry;

const CSV_HEADER: [&str; 4] = ["URL", "Original Location", "Linked Drawing", "Updated Location"];

/// 更新日志导出服务
///
/// 按扩展名选择格式：`.json` 写 JSON 数组，其他写 CSV
pub struct UpdateLogWriter {
    path: PathBuf,
}

impl UpdateLogWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 写入全部条目（覆盖已有文件）
    pub async fn write(&self, entries: &[UpdateLogEntry]) -> AppResult<()> {
        debug!("导出 {} 条更新日志到 {}", entries.len(), self.path.display());

        let is_json = self
            .path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let content = if is_json {
            serde_json::to_string_pretty(entries).map_err(|e| self.export_error(e))?
        } else {
            to_csv(entries)
        };

        fs::write(&self.path, content)
            .await
            .map_err(|e| self.export_error(e))
    }

    fn export_error(&self, reason: impl ToString) -> AppError {
        AppError::Export {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// 转换为 CSV 文本（RFC 4180 引号规则）
pub fn to_csv(entries: &[UpdateLogEntry]) -> String {
    let mut out = csv_line(&CSV_HEADER);
    for entry in entries {
        out.push_str(&csv_line(&[
            entry.url.as_str(),
            entry.original_location.as_str(),
            entry.linked_drawing.as_str(),
            entry.updated_location.as_str(),
        ]));
    }
    out
}

fn csv_line(fields: &[&str]) -> String {
    let mut line = fields
        .iter()
        .map(|field| csv_field(field))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
