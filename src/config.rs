use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::infrastructure::{RetryPolicy, Selector};
use crate::services::reconciliation::ReconcileRules;

/// 配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "SYNC_CONFIG";

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 浏览器可执行文件路径
    pub browser_executable: Option<PathBuf>,
    /// 是否以无头模式启动
    pub headless: bool,
    /// 附加到已运行浏览器的调试端口（设置后不再启动新浏览器）
    pub browser_debug_port: Option<u16>,
    /// 登录页地址，会话创建后打开供操作员登录
    pub login_url: Option<String>,
    /// 链接来源文档（PDF / TOML / 文本）
    pub links_source: PathBuf,
    /// 更新日志输出文件（.csv 或 .json）
    pub output_log_file: PathBuf,
    /// 操作员是否已确认登录
    pub auth_confirmed: bool,
    /// 不等待 start 命令直接开始
    pub auto_start: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- 时间参数（毫秒） ---
    pub settle_delay_ms: u64,
    pub locate_attempts: u32,
    pub locate_delay_ms: u64,
    pub pause_poll_ms: u64,
    pub edit_form_delay_ms: u64,
    pub option_list_delay_ms: u64,
    // --- 页面约定 ---
    /// "No linked drawing" 选项的 value
    pub no_linked_drawing_option: String,
    /// 详情页 → 编辑页的后缀
    pub edit_suffix: String,
    pub rules: ReconcileRules,
    pub selectors: PageSelectors,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_executable: None,
            headless: false,
            browser_debug_port: None,
            login_url: None,
            links_source: PathBuf::from("links.pdf"),
            output_log_file: PathBuf::from("updates.csv"),
            auth_confirmed: false,
            auto_start: false,
            verbose_logging: false,
            settle_delay_ms: 3000,
            locate_attempts: 3,
            locate_delay_ms: 2000,
            pause_poll_ms: 1000,
            edit_form_delay_ms: 3000,
            option_list_delay_ms: 2000,
            no_linked_drawing_option: "1743793".to_string(),
            edit_suffix: "/edit".to_string(),
            rules: ReconcileRules::default(),
            selectors: PageSelectors::default(),
        }
    }
}

impl Config {
    /// 只从环境变量读取（未设置的使用默认值）
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 先读取 `SYNC_CONFIG` 指向的 TOML 文件（如果有），再应用环境变量
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_toml_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        let config = base.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("无法读取配置文件 {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        Ok(toml::from_str(content)?)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            browser_executable: env_var("BROWSER_EXECUTABLE")
                .map(PathBuf::from)
                .or(self.browser_executable),
            headless: env_parse("HEADLESS").unwrap_or(self.headless),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT").or(self.browser_debug_port),
            login_url: env_var("LOGIN_URL").or(self.login_url),
            links_source: env_var("LINKS_SOURCE").map(PathBuf::from).unwrap_or(self.links_source),
            output_log_file: env_var("OUTPUT_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or(self.output_log_file),
            auth_confirmed: env_parse("AUTH_CONFIRMED").unwrap_or(self.auth_confirmed),
            auto_start: env_parse("AUTO_START").unwrap_or(self.auto_start),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            settle_delay_ms: env_parse("SETTLE_DELAY_MS").unwrap_or(self.settle_delay_ms),
            locate_attempts: env_parse("LOCATE_ATTEMPTS").unwrap_or(self.locate_attempts),
            locate_delay_ms: env_parse("LOCATE_DELAY_MS").unwrap_or(self.locate_delay_ms),
            pause_poll_ms: env_parse("PAUSE_POLL_MS").unwrap_or(self.pause_poll_ms),
            edit_form_delay_ms: env_parse("EDIT_FORM_DELAY_MS").unwrap_or(self.edit_form_delay_ms),
            option_list_delay_ms: env_parse("OPTION_LIST_DELAY_MS").unwrap_or(self.option_list_delay_ms),
            no_linked_drawing_option: env_var("NO_LINKED_DRAWING_OPTION")
                .unwrap_or(self.no_linked_drawing_option),
            edit_suffix: env_var("EDIT_SUFFIX").unwrap_or(self.edit_suffix),
            rules: self.rules,
            selectors: self.selectors,
        }
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> AppResult<()> {
        if self.locate_attempts == 0 {
            return Err(AppError::Config("locate_attempts 必须大于 0".to_string()));
        }
        if self.no_linked_drawing_option.trim().is_empty() {
            return Err(AppError::Config("no_linked_drawing_option 不能为空".to_string()));
        }
        if self.rules.level_prefix.trim().is_empty() {
            return Err(AppError::Config("rules.level_prefix 不能为空".to_string()));
        }
        if let Some(name) = self.selectors.first_empty() {
            return Err(AppError::Config(format!("选择器 {} 不能为空", name)));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.locate_attempts,
            delay: Duration::from_millis(self.locate_delay_ms),
        }
    }

    pub fn timings(&self) -> WorkflowTimings {
        WorkflowTimings {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            pause_poll: Duration::from_millis(self.pause_poll_ms),
            edit_form_delay: Duration::from_millis(self.edit_form_delay_ms),
            option_list_delay: Duration::from_millis(self.option_list_delay_ms),
            retry: self.retry_policy(),
        }
    }
}

/// 流程中的各种等待时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowTimings {
    /// 每次导航后的稳定等待
    pub settle_delay: Duration,
    /// 暂停时的轮询间隔
    pub pause_poll: Duration,
    /// 点击编辑后等待表单加载
    pub edit_form_delay: Duration,
    /// 输入搜索词后等待下拉列表填充
    pub option_list_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for WorkflowTimings {
    fn default() -> Self {
        Config::default().timings()
    }
}

impl WorkflowTimings {
    /// 所有等待为零、重试间隔为零（用于测试）
    pub fn immediate() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            pause_poll: Duration::from_millis(5),
            edit_form_delay: Duration::ZERO,
            option_list_delay: Duration::ZERO,
            retry: RetryPolicy {
                max_attempts: 3,
                delay: Duration::ZERO,
            },
        }
    }
}

/// 目标页面的元素选择器
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageSelectors {
    /// 详情页 "Location:" 行
    pub location_row: Selector,
    /// Location 行内的数据单元格（CSS，取第一个）
    pub location_cell: String,
    /// "Linked Drawings:" 表头单元格
    pub linked_drawings_header: Selector,
    /// 表头右侧的数据单元格
    pub linked_drawings_cell: Selector,
    /// 数据单元格内的链接（CSS）
    pub linked_drawings_link: String,
    /// 详情页上的编辑按钮
    pub edit_button: Selector,
    /// 编辑表单上的类型下拉框
    pub item_type_select: Selector,
    /// 下拉框内的选项（CSS）
    pub select_option: String,
    /// 编辑表单的保存按钮
    pub save_button: Selector,
    /// 位置选择器
    pub location_picker: Selector,
    /// 位置选择器的搜索输入框
    pub search_input: Selector,
    /// 搜索后渲染出的选项
    pub location_options: Selector,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            location_row: Selector::xpath("//tr[th[normalize-space(text())='Location:']]"),
            location_cell: "td".to_string(),
            linked_drawings_header: Selector::xpath(
                "//th[@class='v-top' and contains(text(), 'Linked Drawings:')]",
            ),
            linked_drawings_cell: Selector::xpath(
                "//th[@class='v-top' and contains(text(), 'Linked Drawings:')]/following-sibling::td[1]",
            ),
            linked_drawings_link: "a".to_string(),
            edit_button: Selector::xpath("//form[@class='button_to']//input[@type='submit']"),
            item_type_select: Selector::xpath("//select[@name='punch_item[punch_item_type_id]']"),
            select_option: "option".to_string(),
            save_button: Selector::xpath(
                "//button[@type='submit' and contains(@class, 'punch-form-submit') and contains(text(), 'Save')]",
            ),
            location_picker: Selector::xpath(
                "//*[@id='punch-form']/section/table[1]/tbody/tr[6]/td[1]/div/div/div",
            ),
            search_input: Selector::xpath("//input[@data-qa='core-typeahead-input']"),
            location_options: Selector::xpath(
                "//div[@data-internal='menuimperative-options']//div[@class='sc-fXoxut caMcxa sc-hCMElv llLZDJ']",
            ),
        }
    }
}

impl PageSelectors {
    fn first_empty(&self) -> Option<&'static str> {
        let checks: [(&'static str, bool); 12] = [
            ("location_row", self.location_row.is_empty()),
            ("location_cell", self.location_cell.trim().is_empty()),
            ("linked_drawings_header", self.linked_drawings_header.is_empty()),
            ("linked_drawings_cell", self.linked_drawings_cell.is_empty()),
            ("linked_drawings_link", self.linked_drawings_link.trim().is_empty()),
            ("edit_button", self.edit_button.is_empty()),
            ("item_type_select", self.item_type_select.is_empty()),
            ("select_option", self.select_option.trim().is_empty()),
            ("save_button", self.save_button.is_empty()),
            ("location_picker", self.location_picker.is_empty()),
            ("search_input", self.search_input.is_empty()),
            ("location_options", self.location_options.is_empty()),
        ];
        checks.into_iter().find(|(_, empty)| *empty).map(|(name, _)| name)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env_var(name).and_then(|v| v.trim().parse().ok())
}
