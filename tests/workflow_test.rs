use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use drawing_location_sync::config::PageSelectors;
use drawing_location_sync::infrastructure::scripted::ScriptedElement;
use drawing_location_sync::infrastructure::{PageDriver, PageEvent, ScriptedNode, ScriptedPage, Selector};
use drawing_location_sync::orchestrator::{LoopState, ProgressCounter, RunReport, WorkflowLoop};
use drawing_location_sync::services::{
    ActionExecutor, PageExtractor, ReconcileRules, ReconciliationEngine, UpdateLogWriter,
    NO_LINKED_DRAWING_LABEL,
};
use drawing_location_sync::{AppError, AppResult, ControlSignal, RecordFlow, TargetLink, WorkflowTimings};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const LINK_A: &str = "https://app.test/punch_items/12";
const LINK_B: &str = "https://app.test/punch_items/7";
const LINK_C: &str = "https://app.test/punch_items/3";
const LINK_D: &str = "https://app.test/punch_items/44";

fn edit_url(link: &str) -> String {
    format!("{}/edit", link)
}

/// 详情页：Location 行、Linked Drawings 单元格、编辑按钮、类型下拉框、保存按钮
fn with_detail(page: ScriptedPage, url: &str, location: &str, drawing: Option<&str>) -> ScriptedPage {
    let s = PageSelectors::default();
    let mut cell = ScriptedNode::new("drawing-cell");
    if let Some(text) = drawing {
        cell = cell
            .text(text)
            .child("a", ScriptedNode::new("drawing-link").text(text));
    }
    let type_select = ScriptedNode::new("type-select")
        .child("option", ScriptedNode::new("opt-general").attr("value", "1000"))
        .child("option", ScriptedNode::new("opt-none").attr("value", "1743793"));

    page.with_element(
        url,
        &s.location_row,
        ScriptedNode::new("location-row").child("td", ScriptedNode::new("location-cell").text(location)),
    )
    .with_element(url, &s.linked_drawings_header, ScriptedNode::new("drawing-header"))
    .with_element(url, &s.linked_drawings_cell, cell)
    .with_element(url, &s.edit_button, ScriptedNode::new("edit"))
    .with_element(url, &s.item_type_select, type_select)
    .with_element(url, &s.save_button, ScriptedNode::new("save"))
}

/// 编辑页：位置选择器、搜索框、候选项、保存按钮
fn with_edit_form(page: ScriptedPage, link: &str, options: &[&str]) -> ScriptedPage {
    let s = PageSelectors::default();
    let url = edit_url(link);
    let mut page = page
        .with_element(&url, &s.location_picker, ScriptedNode::new("picker"))
        .with_element(&url, &s.search_input, ScriptedNode::new("search"))
        .with_element(&url, &s.save_button, ScriptedNode::new("save"));
    for option in options {
        page = page.with_element(&url, &s.location_options, ScriptedNode::new(*option).text(*option));
    }
    page
}

fn flow() -> RecordFlow {
    RecordFlow::new(
        PageExtractor::new(PageSelectors::default()),
        ReconciliationEngine::new(ReconcileRules::default()),
        ActionExecutor::new(PageSelectors::default(), "1743793", "/edit", Duration::ZERO, Duration::ZERO),
        Duration::ZERO,
    )
}

fn links(urls: &[&str]) -> Vec<TargetLink> {
    urls.iter().map(|url| TargetLink::new(*url)).collect()
}

async fn run_loop<D: PageDriver>(
    driver: &D,
    signal: Arc<ControlSignal>,
    urls: &[&str],
) -> AppResult<RunReport> {
    WorkflowLoop::new(
        driver,
        flow(),
        signal,
        ProgressCounter::new(0),
        WorkflowTimings::immediate(),
    )
    .run(&links(urls))
    .await
}

#[tokio::test]
async fn test_matching_location_is_skipped() {
    let page = with_detail(ScriptedPage::new(), LINK_A, "Level 12", Some("P12"));

    let report = run_loop(&page, ControlSignal::shared(), &[LINK_A]).await.unwrap();

    assert_eq!(report.state, LoopState::Completed);
    assert!(report.entries.is_empty());
    assert_eq!(report.stats.skipped, 1);
    assert_eq!(page.navigations(), vec![LINK_A.to_string()]);
    assert!(!page.events().contains(&PageEvent::Click("save".to_string())));
    assert_eq!(page.release_count(), 1);
}

#[tokio::test]
async fn test_mismatched_location_is_updated() {
    let page = with_detail(ScriptedPage::new(), LINK_B, "Level 07", Some("P09"));
    let page = with_edit_form(page, LINK_B, &["Level 19", "Level 9"]);

    let report = run_loop(&page, ControlSignal::shared(), &[LINK_B]).await.unwrap();

    assert_eq!(report.stats.updated, 1);
    assert_eq!(report.entries.len(), 1);
    let entry = &report.entries[0];
    assert_eq!(entry.url, LINK_B);
    assert_eq!(entry.original_location, "07");
    assert_eq!(entry.linked_drawing, "9");
    assert_eq!(entry.updated_location, "Level 9");
    assert_eq!(page.navigations(), vec![LINK_B.to_string(), edit_url(LINK_B)]);
}

#[tokio::test]
async fn test_missing_target_option_leaves_record_unchanged() {
    let page = with_detail(ScriptedPage::new(), LINK_B, "Level 07", Some("P09"));
    let page = with_edit_form(page, LINK_B, &["Level 19", "Level 10"]);
    let page = with_detail(page, LINK_A, "Level 12", Some("P12"));

    let report = run_loop(&page, ControlSignal::shared(), &[LINK_B, LINK_A]).await.unwrap();

    assert_eq!(report.state, LoopState::Completed);
    assert!(report.entries.is_empty());
    assert_eq!(report.stats.target_not_found, 1);
    assert_eq!(report.stats.skipped, 1);
    assert!(!page.events().contains(&PageEvent::Click("save".to_string())));
}

#[tokio::test]
async fn test_empty_linked_drawing_is_marked() {
    let page = with_detail(ScriptedPage::new(), LINK_C, "Level 3", None);

    let report = run_loop(&page, ControlSignal::shared(), &[LINK_C]).await.unwrap();

    assert_eq!(report.stats.marked, 1);
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].updated_location, NO_LINKED_DRAWING_LABEL);
    assert_eq!(report.entries[0].linked_drawing, "");
    assert_eq!(report.entries[0].original_location, "3");

    let events = page.events();
    assert!(events.contains(&PageEvent::Select("opt-none".to_string())));
    assert!(events.contains(&PageEvent::Click("save".to_string())));
}

#[tokio::test]
async fn test_drawing_page_is_skipped_before_linked_drawing_check() {
    let page = with_detail(ScriptedPage::new(), LINK_C, "Level P1", None);

    let report = run_loop(&page, ControlSignal::shared(), &[LINK_C]).await.unwrap();

    assert_eq!(report.stats.skipped, 1);
    assert!(report.entries.is_empty());
    assert!(!page.events().contains(&PageEvent::Click("edit".to_string())));
}

#[tokio::test]
async fn test_stop_mid_run_finishes_current_link_only() {
    let signal = ControlSignal::shared();
    let stopper = Arc::clone(&signal);

    let page = with_detail(ScriptedPage::new(), LINK_C, "Level 3", None);
    let page = with_detail(page, LINK_B, "Level 07", Some("P09"));
    let page = with_edit_form(page, LINK_B, &["Level 9"]);
    let page = with_detail(page, LINK_A, "Level 12", Some("P12"));
    let page = page.on_navigate(LINK_B, move || {
        stopper.stop();
    });

    let report = run_loop(&page, signal, &[LINK_C, LINK_B, LINK_A]).await.unwrap();

    assert_eq!(report.state, LoopState::Stopped);
    assert_eq!(report.processed, 2);
    assert_eq!(report.total, 3);
    let updated: Vec<_> = report.entries.iter().map(|e| e.url.as_str()).collect();
    assert_eq!(updated, vec![LINK_C, LINK_B]);
    assert!(!page.navigations().contains(&LINK_A.to_string()));
    assert_eq!(page.release_count(), 1);
}

#[tokio::test]
async fn test_extraction_error_does_not_stop_the_run() {
    let s = PageSelectors::default();
    // LINK_D 缺少 Location 行
    let page = ScriptedPage::new()
        .with_element(LINK_D, &s.linked_drawings_header, ScriptedNode::new("drawing-header"))
        .with_element(LINK_D, &s.linked_drawings_cell, ScriptedNode::new("drawing-cell"));
    let page = with_detail(page, LINK_C, "Level 3", None);

    let report = run_loop(&page, ControlSignal::shared(), &[LINK_D, LINK_C]).await.unwrap();

    assert_eq!(report.state, LoopState::Completed);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.marked, 1);
    assert_eq!(report.processed, 2);
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].url, LINK_C);
}

#[tokio::test]
async fn test_navigation_failure_is_isolated() {
    let page = with_detail(ScriptedPage::new(), LINK_A, "Level 12", Some("P12")).with_failing_url(LINK_D);

    let report = run_loop(&page, ControlSignal::shared(), &[LINK_D, LINK_A]).await.unwrap();

    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.skipped, 1);
    assert_eq!(page.navigations(), vec![LINK_D.to_string(), LINK_A.to_string()]);
}

#[tokio::test]
async fn test_pause_blocks_until_resume() {
    let signal = ControlSignal::shared();
    signal.pause();

    let resumer = {
        let signal = Arc::clone(&signal);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            signal.resume();
        })
    };

    let page = with_detail(ScriptedPage::new(), LINK_A, "Level 12", Some("P12"));
    let report = run_loop(&page, signal, &[LINK_A]).await.unwrap();
    resumer.await.unwrap();

    assert_eq!(report.state, LoopState::Completed);
    assert_eq!(report.processed, 1);
}

#[tokio::test]
async fn test_stop_while_paused_never_navigates() {
    let signal = ControlSignal::shared();
    signal.pause();

    let stopper = {
        let signal = Arc::clone(&signal);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            signal.stop();
        })
    };

    let page = with_detail(ScriptedPage::new(), LINK_A, "Level 12", Some("P12"));
    let report = run_loop(&page, signal, &[LINK_A]).await.unwrap();
    stopper.await.unwrap();

    assert_eq!(report.state, LoopState::Stopped);
    assert_eq!(report.processed, 0);
    assert!(page.navigations().is_empty());
    assert_eq!(page.release_count(), 1);
}

/// 导航到包含 "expired" 的地址时会话失效
struct ExpiringSession {
    inner: ScriptedPage,
}

#[async_trait]
impl PageDriver for ExpiringSession {
    type Element = ScriptedElement;

    async fn goto(&self, url: &str) -> AppResult<()> {
        if url.contains("expired") {
            return Err(AppError::session("会话已失效"));
        }
        self.inner.goto(url).await
    }

    async fn find(&self, selector: &Selector) -> AppResult<ScriptedElement> {
        self.inner.find(selector).await
    }

    async fn find_all(&self, selector: &Selector) -> AppResult<Vec<ScriptedElement>> {
        self.inner.find_all(selector).await
    }

    async fn release(&self) -> AppResult<()> {
        self.inner.release().await
    }
}

#[tokio::test]
async fn test_session_error_aborts_and_releases() {
    let driver = ExpiringSession {
        inner: with_detail(ScriptedPage::new(), LINK_A, "Level 12", Some("P12")),
    };

    let result = run_loop(
        &driver,
        ControlSignal::shared(),
        &[LINK_A, "https://app.test/expired", LINK_B],
    )
    .await;

    assert!(matches!(result, Err(AppError::Session { .. })));
    assert_eq!(driver.inner.navigations(), vec![LINK_A.to_string()]);
    assert_eq!(driver.inner.release_count(), 1);
}

/// 打开 "crashed" 地址后浏览器连接断开，之后的查找都返回 CDP 连接错误
struct CrashingBrowser {
    inner: ScriptedPage,
    crashed: AtomicBool,
}

#[async_trait]
impl PageDriver for CrashingBrowser {
    type Element = ScriptedElement;

    async fn goto(&self, url: &str) -> AppResult<()> {
        if self.crashed.load(Ordering::SeqCst) {
            return Err(CdpError::NoResponse.into());
        }
        if url.contains("crashed") {
            self.crashed.store(true, Ordering::SeqCst);
        }
        self.inner.goto(url).await
    }

    async fn find(&self, selector: &Selector) -> AppResult<ScriptedElement> {
        if self.crashed.load(Ordering::SeqCst) {
            return Err(CdpError::NoResponse.into());
        }
        self.inner.find(selector).await
    }

    async fn find_all(&self, selector: &Selector) -> AppResult<Vec<ScriptedElement>> {
        self.inner.find_all(selector).await
    }

    async fn release(&self) -> AppResult<()> {
        self.inner.release().await
    }
}

#[tokio::test]
async fn test_browser_crash_during_extraction_aborts_run() {
    let crashed_url = "https://app.test/punch_items/crashed";
    let page = with_detail(ScriptedPage::new(), LINK_A, "Level 12", Some("P12"));
    let driver = CrashingBrowser {
        inner: with_detail(page, crashed_url, "Level 3", None),
        crashed: AtomicBool::new(false),
    };

    let result = run_loop(
        &driver,
        ControlSignal::shared(),
        &[LINK_A, crashed_url, LINK_B, LINK_C],
    )
    .await;

    assert!(matches!(result, Err(AppError::Session { .. })));
    assert_eq!(
        driver.inner.navigations(),
        vec![LINK_A.to_string(), crashed_url.to_string()]
    );
    assert_eq!(driver.inner.release_count(), 1);
}

#[tokio::test]
async fn test_entries_follow_link_order_in_export() {
    let page = with_detail(ScriptedPage::new(), LINK_C, "Level 3", None);
    let page = with_detail(page, LINK_B, "Level 07", Some("P09"));
    let page = with_edit_form(page, LINK_B, &["Level 9"]);
    let page = with_detail(page, LINK_A, "Level 12", Some("P12"));

    let report = run_loop(&page, ControlSignal::shared(), &[LINK_B, LINK_A, LINK_C]).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("updates.csv");
    UpdateLogWriter::new(&path).write(&report.entries).await.unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(
        lines,
        vec![
            "URL,Original Location,Linked Drawing,Updated Location",
            "https://app.test/punch_items/7,07,9,Level 9",
            "https://app.test/punch_items/3,3,,No linked drawing",
        ]
    );
}
