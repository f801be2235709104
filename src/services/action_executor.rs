//! 操作执行 - 业务能力层
//!
//! 把对账决策转换成一系列页面交互。
//! 每一步都重新定位元素，不跨导航复用元素句柄。

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::{Config, PageSelectors};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{PageDriver, PageElement, RetryingLocator};
use crate::models::record::{ReconciliationDecision, TargetLink, UpdateLogEntry};

/// 标记无关联图纸后写入日志的值
pub const NO_LINKED_DRAWING_LABEL: &str = "No linked drawing";

/// 更新日志条目的草稿（执行成功后补上更新后的值）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub url: TargetLink,
    pub original_location: String,
    pub linked_drawing: String,
}

impl EntryDraft {
    fn finish(&self, updated_location: impl Into<String>) -> UpdateLogEntry {
        UpdateLogEntry {
            url: self.url.to_string(),
            original_location: self.original_location.clone(),
            linked_drawing: self.linked_drawing.clone(),
            updated_location: updated_location.into(),
        }
    }
}

/// 操作执行服务
pub struct ActionExecutor {
    selectors: PageSelectors,
    no_linked_drawing_option: String,
    edit_suffix: String,
    edit_form_delay: Duration,
    option_list_delay: Duration,
}

impl ActionExecutor {
    pub fn new(
        selectors: PageSelectors,
        no_linked_drawing_option: impl Into<String>,
        edit_suffix: impl Into<String>,
        edit_form_delay: Duration,
        option_list_delay: Duration,
    ) -> Self {
        Self {
            selectors,
            no_linked_drawing_option: no_linked_drawing_option.into(),
            edit_suffix: edit_suffix.into(),
            edit_form_delay,
            option_list_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let timings = config.timings();
        Self::new(
            config.selectors.clone(),
            config.no_linked_drawing_option.clone(),
            config.edit_suffix.clone(),
            timings.edit_form_delay,
            timings.option_list_delay,
        )
    }

    /// 执行决策
    ///
    /// # 返回
    /// - `Ok(None)`：Skip，没有任何操作
    /// - `Ok(Some(entry))`：已保存修改
    /// - `Err(AppError::TargetNotFound)`：下拉列表中没有目标值，未保存
    pub async fn execute<D: PageDriver>(
        &self,
        locator: &RetryingLocator<'_, D>,
        decision: &ReconciliationDecision,
        draft: &EntryDraft,
    ) -> AppResult<Option<UpdateLogEntry>> {
        match decision {
            ReconciliationDecision::Skip => Ok(None),
            ReconciliationDecision::MarkNoLinkedDrawing => {
                self.mark_no_linked_drawing(locator).await?;
                Ok(Some(draft.finish(NO_LINKED_DRAWING_LABEL)))
            }
            ReconciliationDecision::UpdateLocation { target } => {
                self.update_location(locator, &draft.url, target).await?;
                Ok(Some(draft.finish(target.as_str())))
            }
        }
    }

    /// 编辑 → 选择 "No linked drawing" → 保存
    async fn mark_no_linked_drawing<D: PageDriver>(&self, locator: &RetryingLocator<'_, D>) -> AppResult<()> {
        let edit_button = locator.locate(&self.selectors.edit_button).await?;
        edit_button.click().await?;
        debug!("已点击编辑按钮，等待表单加载");
        sleep(self.edit_form_delay).await;

        let select = locator.locate(&self.selectors.item_type_select).await?;
        let options = select.find_within(&self.selectors.select_option).await?;

        let mut selected = false;
        for option in &options {
            if option.attribute("value").await?.as_deref() == Some(self.no_linked_drawing_option.as_str()) {
                option.select().await?;
                selected = true;
                break;
            }
        }
        if !selected {
            return Err(AppError::not_found(
                format!(
                    "{} >> option[value={}]",
                    self.selectors.item_type_select, self.no_linked_drawing_option
                ),
                1,
            ));
        }
        info!("✓ 已选择 '{}' 选项", NO_LINKED_DRAWING_LABEL);

        self.click_save(locator).await
    }

    /// 打开编辑页 → 位置选择器 → 搜索目标 → 选中 → 保存
    async fn update_location<D: PageDriver>(
        &self,
        locator: &RetryingLocator<'_, D>,
        url: &TargetLink,
        target: &str,
    ) -> AppResult<()> {
        let driver = locator.driver();
        driver.goto(&url.edit_url(&self.edit_suffix)).await?;

        let picker = locator.locate(&self.selectors.location_picker).await?;
        picker.click().await?;

        let search_input = locator.locate(&self.selectors.search_input).await?;
        search_input.type_text(target).await?;
        sleep(self.option_list_delay).await;

        let items = driver.find_all(&self.selectors.location_options).await?;
        let mut matched = None;
        for item in items {
            let text = item.text().await?;
            let text = text.trim();
            debug!("候选项: {}", text);
            if text == target {
                matched = Some(item);
                break;
            }
        }

        let Some(item) = matched else {
            return Err(AppError::TargetNotFound {
                target: target.to_string(),
            });
        };
        item.click().await?;
        info!("✓ 已选择: {}", target);

        self.click_save(locator).await
    }

    async fn click_save<D: PageDriver>(&self, locator: &RetryingLocator<'_, D>) -> AppResult<()> {
        let save_button = locator.locate(&self.selectors.save_button).await?;
        save_button.click().await?;
        info!("✓ 已点击保存");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkflowTimings;
    use crate::infrastructure::{PageEvent, ScriptedNode, ScriptedPage};

    const DETAIL: &str = "https://app.test/punch_items/7";
    const EDIT: &str = "https://app.test/punch_items/7/edit";

    fn executor() -> ActionExecutor {
        ActionExecutor::new(
            PageSelectors::default(),
            "1743793",
            "/edit",
            Duration::ZERO,
            Duration::ZERO,
        )
    }

    fn draft(location: &str, drawing: &str) -> EntryDraft {
        EntryDraft {
            url: TargetLink::new(DETAIL),
            original_location: location.to_string(),
            linked_drawing: drawing.to_string(),
        }
    }

    fn edit_page(options: &[&str]) -> ScriptedPage {
        let s = PageSelectors::default();
        let mut page = ScriptedPage::new()
            .with_element(EDIT, &s.location_picker, ScriptedNode::new("picker"))
            .with_element(EDIT, &s.search_input, ScriptedNode::new("search"))
            .with_element(EDIT, &s.save_button, ScriptedNode::new("save"));
        for option in options {
            page = page.with_element(EDIT, &s.location_options, ScriptedNode::new(*option).text(*option));
        }
        page
    }

    #[tokio::test]
    async fn test_skip_does_nothing() {
        let page = ScriptedPage::new();
        let locator = RetryingLocator::new(&page, WorkflowTimings::immediate().retry);
        let result = executor()
            .execute(&locator, &ReconciliationDecision::Skip, &draft("12", "12"))
            .await
            .unwrap();
        assert_eq!(result, None);
        assert!(page.events().is_empty());
    }

    #[tokio::test]
    async fn test_update_location_selects_exact_match() {
        let page = edit_page(&["Level 19", " Level 9 ", "Level 9A"]);
        page.goto(DETAIL).await.unwrap();
        let locator = RetryingLocator::new(&page, WorkflowTimings::immediate().retry);

        let decision = ReconciliationDecision::UpdateLocation {
            target: "Level 9".to_string(),
        };
        let entry = executor()
            .execute(&locator, &decision, &draft("07", "9"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(entry.updated_location, "Level 9");
        assert_eq!(entry.original_location, "07");
        assert_eq!(
            page.events(),
            vec![
                PageEvent::Navigate(DETAIL.to_string()),
                PageEvent::Navigate(EDIT.to_string()),
                PageEvent::Click("picker".to_string()),
                PageEvent::Type {
                    element: "search".to_string(),
                    text: "Level 9".to_string()
                },
                PageEvent::Click(" Level 9 ".to_string()),
                PageEvent::Click("save".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_update_location_missing_target() {
        let page = edit_page(&["Level 19", "Level 10"]);
        let locator = RetryingLocator::new(&page, WorkflowTimings::immediate().retry);

        let decision = ReconciliationDecision::UpdateLocation {
            target: "Level 9".to_string(),
        };
        let err = executor()
            .execute(&locator, &decision, &draft("07", "9"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::TargetNotFound { ref target } if target == "Level 9"));
        assert!(!page.events().contains(&PageEvent::Click("save".to_string())));
    }

    #[tokio::test]
    async fn test_mark_no_linked_drawing() {
        let s = PageSelectors::default();
        let select = ScriptedNode::new("type-select")
            .child("option", ScriptedNode::new("opt-general").attr("value", "1000"))
            .child("option", ScriptedNode::new("opt-none").attr("value", "1743793"));
        let page = ScriptedPage::new()
            .with_element(DETAIL, &s.edit_button, ScriptedNode::new("edit"))
            .with_element(DETAIL, &s.item_type_select, select)
            .with_element(DETAIL, &s.save_button, ScriptedNode::new("save"));
        page.goto(DETAIL).await.unwrap();
        let locator = RetryingLocator::new(&page, WorkflowTimings::immediate().retry);

        let entry = executor()
            .execute(&locator, &ReconciliationDecision::MarkNoLinkedDrawing, &draft("3", ""))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(entry.updated_location, NO_LINKED_DRAWING_LABEL);
        assert_eq!(
            page.events()[1..],
            [
                PageEvent::Click("edit".to_string()),
                PageEvent::Select("opt-none".to_string()),
                PageEvent::Click("save".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_mark_no_linked_drawing_without_option_fails() {
        let s = PageSelectors::default();
        let page = ScriptedPage::new()
            .with_element(DETAIL, &s.edit_button, ScriptedNode::new("edit"))
            .with_element(DETAIL, &s.item_type_select, ScriptedNode::new("type-select"))
            .with_element(DETAIL, &s.save_button, ScriptedNode::new("save"));
        page.goto(DETAIL).await.unwrap();
        let locator = RetryingLocator::new(&page, WorkflowTimings::immediate().retry);

        let err = executor()
            .execute(&locator, &ReconciliationDecision::MarkNoLinkedDrawing, &draft("3", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
        assert!(!page.events().contains(&PageEvent::Click("save".to_string())));
    }
}
