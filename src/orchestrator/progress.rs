use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// 处理进度计数器
///
/// 只由流程循环写入；克隆出的句柄可以在任意任务中读取（进度条、status 命令）。
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    processed: AtomicUsize,
    total: AtomicUsize,
}

/// 某一时刻的进度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
}

impl ProgressSnapshot {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.processed as f64 * 100.0 / self.total as f64
        }
    }
}

impl ProgressCounter {
    pub fn new(total: usize) -> Self {
        let counter = Self::default();
        counter.reset(total);
        counter
    }

    pub fn reset(&self, total: usize) {
        self.inner.total.store(total, Ordering::SeqCst);
        self.inner.processed.store(0, Ordering::SeqCst);
    }

    /// 处理完一条，返回最新进度
    pub fn advance(&self) -> ProgressSnapshot {
        let processed = self.inner.processed.fetch_add(1, Ordering::SeqCst) + 1;
        ProgressSnapshot {
            processed,
            total: self.inner.total.load(Ordering::SeqCst),
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            processed: self.inner.processed.load(Ordering::SeqCst),
            total: self.inner.total.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_is_visible_through_clones() {
        let counter = ProgressCounter::new(4);
        let reader = counter.clone();
        counter.advance();
        let snapshot = counter.advance();
        assert_eq!(snapshot, ProgressSnapshot { processed: 2, total: 4 });
        assert_eq!(reader.snapshot().percent(), 50.0);
    }

    #[test]
    fn test_empty_total_percent() {
        assert_eq!(ProgressCounter::new(0).snapshot().percent(), 0.0);
    }
}
