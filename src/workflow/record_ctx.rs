//! 记录处理上下文
//!
//! 封装"我正在处理第几条链接"这一信息

use std::fmt::Display;

use crate::models::record::TargetLink;

/// 记录处理上下文
#[derive(Debug, Clone)]
pub struct RecordCtx {
    /// 链接在列表中的序号（从1开始）
    pub index: usize,

    /// 链接总数（仅用于日志显示）
    pub total: usize,

    /// 记录详情页
    pub link: TargetLink,
}

impl RecordCtx {
    pub fn new(index: usize, total: usize, link: TargetLink) -> Self {
        Self { index, total, link }
    }
}

impl Display for RecordCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[记录 {}/{}]", self.index, self.total)
    }
}
