//! 带重试的元素定位
//!
//! 固定次数、固定间隔；次数用尽后返回 `NotFound`。

use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::infrastructure::page_driver::{PageDriver, Selector};

/// 默认最大尝试次数
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// 默认两次尝试之间的等待时间
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// 带重试的定位器
pub struct RetryingLocator<'a, D: PageDriver> {
    driver: &'a D,
    policy: RetryPolicy,
}

impl<'a, D: PageDriver> RetryingLocator<'a, D> {
    pub fn new(driver: &'a D, policy: RetryPolicy) -> Self {
        Self { driver, policy }
    }

    pub fn driver(&self) -> &'a D {
        self.driver
    }

    /// 使用默认策略定位元素
    pub async fn locate(&self, selector: &Selector) -> AppResult<D::Element> {
        self.locate_with(selector, self.policy).await
    }

    /// 定位元素，最多尝试 `policy.max_attempts` 次
    ///
    /// 第一次成功立即返回；最后一次失败后不再等待，直接返回 `NotFound`。
    /// 会话错误不重试，原样返回。
    pub async fn locate_with(&self, selector: &Selector, policy: RetryPolicy) -> AppResult<D::Element> {
        let attempts = policy.max_attempts.max(1);

        for attempt in 1..=attempts {
            match self.driver.find(selector).await {
                Ok(element) => return Ok(element),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!(
                        "定位元素失败 (尝试 {}/{}): {} - {}",
                        attempt, attempts, selector, e
                    );
                }
            }

            if attempt < attempts {
                sleep(policy.delay).await;
            }
        }

        Err(AppError::not_found(selector.to_string(), attempts))
    }
}
