//! 生命周期控制

use std::sync::atomic::{AtomicBool, Ordering};

/// 关闭标志
///
/// 只允许 false -> true 一次切换，每个公共操作入口都先检查它
#[derive(Debug, Default)]
pub struct Lifecycle {
    shutdown: AtomicBool,
}

impl Lifecycle {
    pub const fn new() -> Self {
        Self {
            shutdown: AtomicBool::new(false),
        }
    }

    /// 无锁读取
    #[inline]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// 执行关闭切换
    ///
    /// 只有完成切换的那个调用者会执行 `on_transition` 并返回 `true`，
    /// 其余调用者直接返回 `false`
    pub fn shutdown_with<F>(&self, on_transition: F) -> bool
    where
        F: FnOnce(),
    {
        if self
            .shutdown
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        on_transition();
        true
    }
}
