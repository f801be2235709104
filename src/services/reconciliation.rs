//! 对账决策 - 业务能力层
//!
//! 纯函数：根据提取到的记录决定要做什么，不接触浏览器，没有内部状态。
//! 相同的输入永远得到相同的输出。

use serde::Deserialize;

use crate::models::record::{ExtractedRecord, ReconciliationDecision};

/// 对账规则
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReconcileRules {
    /// 位置文本的楼层前缀（"Level 12" → "12"）
    pub level_prefix: String,
    /// 图纸编号标记字符（"P09" → "09"）；出现在位置中时表示这是图纸页面
    pub drawing_marker: char,
    /// 生成目标位置时使用的前缀
    pub target_prefix: String,
}

impl Default for ReconcileRules {
    fn default() -> Self {
        Self {
            level_prefix: "Level".to_string(),
            drawing_marker: 'P',
            target_prefix: "Level ".to_string(),
        }
    }
}

/// 最多去掉一个前导零
pub fn strip_single_leading_zero(number: &str) -> &str {
    number.strip_prefix('0').unwrap_or(number)
}

/// 对账引擎
#[derive(Debug, Clone, Default)]
pub struct ReconciliationEngine {
    rules: ReconcileRules,
}

impl ReconciliationEngine {
    pub fn new(rules: ReconcileRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ReconcileRules {
        &self.rules
    }

    /// 规范化位置：去掉楼层前缀后 trim；没有前缀时原样返回
    pub fn normalize_location(&self, raw: &str) -> String {
        let raw = raw.trim();
        match raw.strip_prefix(self.rules.level_prefix.as_str()) {
            Some(rest) => rest.trim().to_string(),
            None => raw.to_string(),
        }
    }

    /// 规范化图纸编号
    ///
    /// 含标记字符时取第一次出现之后的部分，否则取最后两个字符；
    /// 然后最多去掉一个前导零（"007" → "07"）。
    pub fn normalize_drawing_number(&self, text: &str) -> String {
        let text = text.trim();
        let number = match text.split_once(self.rules.drawing_marker) {
            Some((_, after)) => after.to_string(),
            None => {
                let count = text.chars().count();
                text.chars().skip(count.saturating_sub(2)).collect()
            }
        };
        strip_single_leading_zero(&number).to_string()
    }

    /// 决定对一条记录执行的操作
    pub fn decide(&self, record: &ExtractedRecord) -> ReconciliationDecision {
        let location = self.normalize_location(&record.raw_location_text);

        // 图纸页面从不修改
        if location.contains(self.rules.drawing_marker) {
            return ReconciliationDecision::Skip;
        }

        let Some(text) = record.linked_drawing_text() else {
            return ReconciliationDecision::MarkNoLinkedDrawing;
        };

        let drawing = self.normalize_drawing_number(text);
        if location == drawing {
            ReconciliationDecision::Skip
        } else {
            ReconciliationDecision::UpdateLocation {
                target: format!("{}{}", self.rules.target_prefix, drawing),
            }
        }
    }
}
