//! 带截止时间的目录查询
//!
//! 读取任务与定时器并发执行，先完成者通过单次投递保护调用回调：
//! 每次 `lookup` 恰好投递一个结果。

use parking_lot::Mutex;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::discovery::directory::InstanceDirectory;
use crate::discovery::lifecycle::Lifecycle;
use crate::error::{DiscoveryError, Result};

/// 查询结果回调
pub type LookupCallback<I> = Box<dyn FnOnce(Result<Vec<I>>) + Send + 'static>;

/// 查询数据源
///
/// `read` 可能在锁上阻塞，因此总是在阻塞线程池中执行
pub trait InstanceSource<S, I>: Send + Sync {
    fn read(&self, service: &S) -> Option<Vec<I>>;
}

impl<S, I> InstanceSource<S, I> for InstanceDirectory<S, I>
where
    S: Eq + Hash + Send,
    I: Clone + Send,
{
    fn read(&self, service: &S) -> Option<Vec<I>> {
        self.get(service)
    }
}

/// 单次投递保护
struct Delivery<I> {
    delivered: AtomicBool,
    callback: Mutex<Option<LookupCallback<I>>>,
}

impl<I> Delivery<I> {
    fn new(callback: LookupCallback<I>) -> Self {
        Self {
            delivered: AtomicBool::new(false),
            callback: Mutex::new(Some(callback)),
        }
    }

    /// 只有第一个调用者会真正执行回调
    fn deliver(&self, result: Result<Vec<I>>) -> bool {
        if self
            .delivered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let callback = self.callback.lock().take();
        match callback {
            Some(callback) => {
                callback(result);
                true
            }
            None => false,
        }
    }
}

impl<I> Drop for Delivery<I> {
    // 运行时已关闭时两个任务都不会执行，最后一个引用释放时补投 Unavailable
    fn drop(&mut self) {
        if let Some(callback) = self.callback.get_mut().take() {
            warn!("Lookup tasks dropped without a result, runtime is shut down");
            callback(Err(DiscoveryError::Unavailable));
        }
    }
}

/// 查询引擎
pub struct LookupEngine<S, I> {
    source: Arc<dyn InstanceSource<S, I>>,
    lifecycle: Arc<Lifecycle>,
    runtime: Handle,
    default_timeout: Duration,
}

impl<S, I> LookupEngine<S, I>
where
    S: Clone + Debug + Send + Sync + 'static,
    I: Send + 'static,
{
    pub fn new(
        source: Arc<dyn InstanceSource<S, I>>,
        lifecycle: Arc<Lifecycle>,
        runtime: Handle,
        default_timeout: Duration,
    ) -> Self {
        Self {
            source,
            lifecycle,
            runtime,
            default_timeout,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// 查询服务实例
    ///
    /// # 参数
    /// * `service` - 服务名
    /// * `deadline` - 相对截止时间，`None` 时使用默认超时
    /// * `callback` - 结果回调，恰好调用一次
    pub fn lookup(&self, service: &S, deadline: Option<Duration>, callback: LookupCallback<I>) {
        if self.lifecycle.is_shutdown() {
            callback(Err(DiscoveryError::Unavailable));
            return;
        }

        let delivery = Arc::new(Delivery::new(callback));
        let timeout = deadline.unwrap_or(self.default_timeout);

        let source = self.source.clone();
        let reader_delivery = delivery.clone();
        let reader_service = service.clone();
        let reader = self.runtime.spawn_blocking(move || {
            let result = source
                .read(&reader_service)
                .ok_or(DiscoveryError::UnknownService);
            reader_delivery.deliver(result);
        });

        let reader_abort = reader.abort_handle();
        let service = service.clone();
        self.runtime.spawn(async move {
            let mut reader = reader;
            tokio::select! {
                joined = &mut reader => {
                    // 读取任务被取消或崩溃时没有结果，仍需投递一次
                    if let Err(error) = joined {
                        if delivery.deliver(Err(DiscoveryError::Unavailable)) {
                            warn!(service = ?service, error = %error, "Lookup task did not complete");
                        }
                    }
                }
                _ = tokio::time::sleep(timeout) => {
                    // 尚未开始的读取任务会被取消，已在执行的任务会在投递时被拒绝
                    reader_abort.abort();
                    if delivery.deliver(Err(DiscoveryError::TimedOut)) {
                        debug!(service = ?service, timeout = ?timeout, "Lookup timed out");
                    }
                }
            }
        });
    }
}
