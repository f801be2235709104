//! 基础设施层
//!
//! 持有稀缺资源（浏览器页面），只暴露能力：
//! - `page_driver` - `PageDriver` / `PageElement` 抽象和 `Selector`
//! - `chromium` - 基于 chromiumoxide 的实现
//! - `scripted` - 内存实现，用于演练和测试
//! - `locator` - 带重试的元素定位

pub mod chromium;
pub mod locator;
pub mod page_driver;
pub mod scripted;

pub use chromium::{ChromiumDriver, ChromiumElement};
pub use locator::{RetryPolicy, RetryingLocator};
pub use page_driver::{PageDriver, PageElement, Selector};
pub use scripted::{PageEvent, ScriptedNode, ScriptedPage};
