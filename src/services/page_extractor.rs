//! 页面数据提取 - 业务能力层
//!
//! 只负责"从当前页面读出 Location 和 Linked Drawings"，不做判断

use tracing::debug;

use crate::config::PageSelectors;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{PageDriver, PageElement, RetryingLocator};
use crate::models::record::{ExtractedRecord, TargetLink};

/// 页面数据提取服务
pub struct PageExtractor {
    selectors: PageSelectors,
}

impl PageExtractor {
    pub fn new(selectors: PageSelectors) -> Self {
        Self { selectors }
    }

    /// 从当前页面提取记录
    ///
    /// Location 行或 Linked Drawings 表头 / 单元格缺失时返回 `AppError::Extraction`
    pub async fn extract<D: PageDriver>(
        &self,
        locator: &RetryingLocator<'_, D>,
        url: &TargetLink,
    ) -> AppResult<ExtractedRecord> {
        let raw_location = self
            .read_location(locator)
            .await
            .map_err(|e| AppError::extraction(url.as_str(), e))?;

        let linked_drawing = self
            .read_linked_drawing(locator)
            .await
            .map_err(|e| AppError::extraction(url.as_str(), e))?;

        debug!(
            "提取结果: location={:?}, linked_drawing={:?}",
            raw_location, linked_drawing
        );

        Ok(ExtractedRecord::new(url.clone(), raw_location, linked_drawing))
    }

    /// Location 行第一个数据单元格的文本
    async fn read_location<D: PageDriver>(&self, locator: &RetryingLocator<'_, D>) -> AppResult<String> {
        let row = locator.locate(&self.selectors.location_row).await?;
        let cells = row.find_within(&self.selectors.location_cell).await?;
        match cells.first() {
            Some(cell) => Ok(cell.text().await?.trim().to_string()),
            None => Err(AppError::not_found(
                format!("{} >> css={}", self.selectors.location_row, self.selectors.location_cell),
                1,
            )),
        }
    }

    /// Linked Drawings 单元格内链接的文本
    ///
    /// 单元格为空时返回 None；单元格有内容但找不到链接时返回 `NotFound`
    async fn read_linked_drawing<D: PageDriver>(
        &self,
        locator: &RetryingLocator<'_, D>,
    ) -> AppResult<Option<String>> {
        locator.locate(&self.selectors.linked_drawings_header).await?;
        let cell = locator.locate(&self.selectors.linked_drawings_cell).await?;

        if cell.text().await?.trim().is_empty() {
            return Ok(None);
        }

        let links = cell.find_within(&self.selectors.linked_drawings_link).await?;
        let Some(link) = links.first() else {
            return Err(AppError::not_found(
                format!(
                    "{} >> css={}",
                    self.selectors.linked_drawings_cell, self.selectors.linked_drawings_link
                ),
                1,
            ));
        };

        let text = link.text().await?;
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkflowTimings;
    use crate::infrastructure::{ScriptedNode, ScriptedPage};

    const URL: &str = "https://app.test/punch_items/5";

    fn page_with_cell(cell: ScriptedNode) -> ScriptedPage {
        let s = PageSelectors::default();
        ScriptedPage::new()
            .with_element(
                URL,
                &s.location_row,
                ScriptedNode::new("row").child("td", ScriptedNode::new("cell").text(" Level 05 ")),
            )
            .with_element(URL, &s.linked_drawings_header, ScriptedNode::new("header"))
            .with_element(URL, &s.linked_drawings_cell, cell)
    }

    async fn extract(page: &ScriptedPage) -> AppResult<ExtractedRecord> {
        page.goto(URL).await?;
        let locator = RetryingLocator::new(page, WorkflowTimings::immediate().retry);
        PageExtractor::new(PageSelectors::default())
            .extract(&locator, &TargetLink::new(URL))
            .await
    }

    #[tokio::test]
    async fn test_reads_location_and_linked_drawing() {
        let cell = ScriptedNode::new("drawing-cell")
            .text("A-P05")
            .child("a", ScriptedNode::new("link").text(" A-P05 "));
        let record = extract(&page_with_cell(cell)).await.unwrap();
        assert_eq!(record.raw_location_text, "Level 05");
        assert_eq!(record.linked_drawing_text(), Some("A-P05"));
    }

    #[tokio::test]
    async fn test_empty_cell_has_no_linked_drawing() {
        let record = extract(&page_with_cell(ScriptedNode::new("drawing-cell").text("  ")))
            .await
            .unwrap();
        assert!(!record.linked_drawing_present());
    }

    #[tokio::test]
    async fn test_cell_text_without_link_is_extraction_error() {
        let cell = ScriptedNode::new("drawing-cell").text("see sheet P05");
        let err = extract(&page_with_cell(cell)).await.unwrap_err();
        match err {
            AppError::Extraction { url, source } => {
                assert_eq!(url, URL);
                assert!(matches!(*source, AppError::NotFound { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_location_row_is_extraction_error() {
        let s = PageSelectors::default();
        let page = ScriptedPage::new()
            .with_element(URL, &s.linked_drawings_header, ScriptedNode::new("header"))
            .with_element(URL, &s.linked_drawings_cell, ScriptedNode::new("drawing-cell"));
        let err = extract(&page).await.unwrap_err();
        assert!(matches!(err, AppError::Extraction { .. }));
    }
}
