//! 记录数据模型
//!
//! 链接、提取结果、对账决策和更新日志条目

use serde::{Deserialize, Serialize};
use std::fmt;

/// 记录详情页链接
///
/// 由外部链接提取器一次性生成，按列表顺序消费
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetLink(String);

impl TargetLink {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 编辑页地址（详情页 + 编辑后缀）
    pub fn edit_url(&self, suffix: &str) -> String {
        format!("{}{}", self.0.trim_end_matches('/'), suffix)
    }
}

impl fmt::Display for TargetLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetLink {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

/// 单个页面提取出的原始数据
///
/// `linked_drawing` 为 `Some` 当且仅当页面上存在关联图纸文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRecord {
    pub url: TargetLink,
    pub raw_location_text: String,
    linked_drawing: Option<String>,
}

impl ExtractedRecord {
    /// 创建记录；空白的关联图纸文本视为不存在
    pub fn new(url: TargetLink, raw_location_text: impl Into<String>, linked_drawing: Option<String>) -> Self {
        let linked_drawing = linked_drawing
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        Self {
            url,
            raw_location_text: raw_location_text.into().trim().to_string(),
            linked_drawing,
        }
    }

    pub fn linked_drawing_present(&self) -> bool {
        self.linked_drawing.is_some()
    }

    pub fn linked_drawing_text(&self) -> Option<&str> {
        self.linked_drawing.as_deref()
    }
}

/// 对账决策
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationDecision {
    /// 已一致，或者是图纸页面，不做任何修改
    Skip,
    /// 没有关联图纸，标记为 "No linked drawing"
    MarkNoLinkedDrawing,
    /// 把位置更新为目标值（如 "Level 9"）
    UpdateLocation { target: String },
}

/// 更新日志条目
///
/// 每条产生了实际操作的链接恰好写入一条；Skip 不写入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLogEntry {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Original Location")]
    pub original_location: String,
    #[serde(rename = "Linked Drawing")]
    pub linked_drawing: String,
    #[serde(rename = "Updated Location")]
    pub updated_location: String,
}
